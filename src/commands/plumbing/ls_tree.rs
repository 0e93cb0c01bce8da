use crate::areas::repository::Repository;
use crate::artifacts::objects::object::AnyObject;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Tree;
use std::io::Write;

impl Repository {
    /// List a tree, or the tree of a commit or of what a tag points at
    pub fn ls_tree(
        &self,
        revision: &str,
        recursive: bool,
        writer: &mut impl Write,
    ) -> anyhow::Result<()> {
        let tree_id = self.peel_to_tree(self.resolve_revision(revision)?)?;
        self.print_tree(&tree_id, "", recursive, writer)
    }

    fn peel_to_tree(&self, mut object_id: ObjectId) -> anyhow::Result<ObjectId> {
        loop {
            match self.database().read(&object_id)? {
                AnyObject::Tree(_) => return Ok(object_id),
                AnyObject::Commit(commit) => return Ok(*commit.tree_id()),
                AnyObject::Tag(tag) => object_id = *tag.target_id(),
                AnyObject::Blob(_) => anyhow::bail!("object {} is not a tree", object_id),
            }
        }
    }

    fn print_tree(
        &self,
        tree_id: &ObjectId,
        prefix: &str,
        recursive: bool,
        writer: &mut impl Write,
    ) -> anyhow::Result<()> {
        let tree = self.database().lookup::<Tree>(tree_id)?;

        for entry in tree.entries() {
            let path = format!("{prefix}{}", entry.name());

            if recursive && entry.mode().is_tree() {
                self.print_tree(entry.id(), &format!("{path}/"), recursive, writer)?;
                continue;
            }

            writeln!(
                writer,
                "{:0>6} {} {}\t{}",
                entry.mode().as_str(),
                entry.kind(),
                entry.id(),
                path
            )?;
        }

        Ok(())
    }
}
