use crate::areas::repository::Repository;
use std::io::Write;

impl Repository {
    /// Print staged paths; with `stage`, also their mode, blob id and stage
    pub fn ls_files(&mut self, stage: bool, writer: &mut impl Write) -> anyhow::Result<()> {
        let index = self.index()?;

        for entry in index.entries() {
            if stage {
                writeln!(
                    writer,
                    "{} {} {}\t{}",
                    entry.mode.as_str(),
                    entry.oid,
                    entry.stage(),
                    entry.path()
                )?;
            } else {
                writeln!(writer, "{}", entry.path())?;
            }
        }

        Ok(())
    }
}
