use crate::areas::repository::Repository;
use crate::artifacts::objects::object::AnyObject;
use std::io::Write;

/// What `cat-file` prints about an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatFileMode {
    /// The content, with trees shown one entry per line
    Pretty,
    Type,
    Size,
}

impl Repository {
    pub fn cat_file(
        &self,
        revision: &str,
        mode: CatFileMode,
        writer: &mut impl Write,
    ) -> anyhow::Result<()> {
        let object_id = self.resolve_revision(revision)?;

        match mode {
            CatFileMode::Type => {
                let (kind, _) = self.database().read_header(&object_id)?;
                writeln!(writer, "{kind}")?;
            }
            CatFileMode::Size => {
                let (_, size) = self.database().read_header(&object_id)?;
                writeln!(writer, "{size}")?;
            }
            CatFileMode::Pretty => match self.database().read(&object_id)? {
                AnyObject::Blob(blob) => writer.write_all(blob.raw_content())?,
                AnyObject::Tree(tree) => {
                    for entry in tree.entries() {
                        writeln!(
                            writer,
                            "{:0>6} {} {}\t{}",
                            entry.mode().as_str(),
                            entry.kind(),
                            entry.id(),
                            entry.name()
                        )?;
                    }
                }
                AnyObject::Commit(_) | AnyObject::Tag(_) => {
                    let (_, body) = self.database().read_raw(&object_id)?;
                    writer.write_all(&body)?;
                }
            },
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::index::entry_mode::EntryMode;
    use crate::artifacts::objects::blob::Blob;
    use crate::artifacts::objects::tree::Tree;
    use assert_fs::TempDir;
    use pretty_assertions::assert_eq;

    #[test]
    fn tree_is_printed_one_entry_per_line() {
        let dir = TempDir::new().unwrap();
        let repository = Repository::init(dir.path(), true).unwrap();
        let mut blob = Blob::default();
        blob.set_raw_content(b"hello".to_vec());
        let blob_id = blob.write(repository.database()).unwrap();
        let mut tree = Tree::new();
        tree.add_entry("a.txt", blob_id, EntryMode::REGULAR).unwrap();
        let tree_id = tree.write(repository.database()).unwrap();

        let mut output = Vec::new();
        repository
            .cat_file(&tree_id.to_hex(), CatFileMode::Pretty, &mut output)
            .unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            format!("100644 blob {blob_id}\ta.txt\n")
        );
    }

    #[test]
    fn type_and_size_come_from_the_header() {
        let dir = TempDir::new().unwrap();
        let repository = Repository::init(dir.path(), true).unwrap();
        let mut blob = Blob::default();
        blob.set_raw_content(b"hello".to_vec());
        let blob_id = blob.write(repository.database()).unwrap();

        let mut kind = Vec::new();
        let mut size = Vec::new();
        repository
            .cat_file(&blob_id.to_hex(), CatFileMode::Type, &mut kind)
            .unwrap();
        repository
            .cat_file(&blob_id.to_hex(), CatFileMode::Size, &mut size)
            .unwrap();

        assert_eq!(kind, b"blob\n");
        assert_eq!(size, b"5\n");
    }
}
