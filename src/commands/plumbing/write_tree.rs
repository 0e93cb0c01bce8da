use crate::areas::repository::Repository;
use std::io::Write;

impl Repository {
    /// Store the staged entries as trees and print the root tree id
    pub fn write_tree(&mut self, writer: &mut impl Write) -> anyhow::Result<()> {
        let database = self.shared_database();
        let tree_id = self.index()?.write_tree(&database)?;

        writeln!(writer, "{tree_id}")?;
        Ok(())
    }
}
