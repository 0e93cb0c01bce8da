use crate::areas::repository::Repository;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::object::Object;
use anyhow::Context;
use std::io::Write;
use std::path::Path;

impl Repository {
    /// Print the blob id of a file, storing the blob when `write` is set
    pub fn hash_object(
        &self,
        file: &Path,
        write: bool,
        writer: &mut impl Write,
    ) -> anyhow::Result<()> {
        let mut blob = Blob::from_file(file)
            .with_context(|| format!("Cannot open '{}'", file.display()))?;

        let object_id = if write {
            blob.write(self.database())?
        } else {
            blob.compute_id()?
        };

        writeln!(writer, "{object_id}")?;
        Ok(())
    }
}
