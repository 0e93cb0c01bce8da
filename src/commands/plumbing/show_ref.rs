use crate::areas::repository::Repository;
use crate::artifacts::refs::HEAD_REF_NAME;
use crate::artifacts::refs::reference::RefFilter;
use std::io::Write;

impl Repository {
    /// Print `<id> <name>` for every reference in the selected categories
    ///
    /// Symbolic references are printed with the id they resolve to; those
    /// that dangle are skipped.
    pub fn show_ref(
        &self,
        filter: RefFilter,
        include_head: bool,
        writer: &mut impl Write,
    ) -> anyhow::Result<()> {
        let references = self.references().list_all(filter)?;

        let mut shown = 0;
        for reference in references {
            if reference.name().as_str() == HEAD_REF_NAME && !include_head {
                continue;
            }

            let Ok(resolved) = self.references().resolve(&reference) else {
                continue;
            };
            if let Some(oid) = resolved.target_id() {
                writeln!(writer, "{} {}", oid, reference.name())?;
                shown += 1;
            }
        }

        if shown == 0 {
            anyhow::bail!("no matching references");
        }
        Ok(())
    }
}
