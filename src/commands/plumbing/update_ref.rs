use crate::areas::repository::Repository;
use std::io::Write;

impl Repository {
    /// Point `name` at an object, creating or overwriting it
    pub fn update_ref(&self, name: &str, revision: &str) -> anyhow::Result<()> {
        let oid = self.resolve_revision(revision)?;
        if !self.database().exists(&oid)? {
            anyhow::bail!("trying to write ref '{}' with nonexistent object {}", name, oid);
        }

        self.references().create_direct(name, oid, true)?;
        Ok(())
    }

    pub fn delete_ref(&self, name: &str) -> anyhow::Result<()> {
        self.references().delete(name)?;
        Ok(())
    }

    /// Print the target of a symbolic reference, or set it when `target` is given
    pub fn symbolic_ref(
        &self,
        name: &str,
        target: Option<&str>,
        writer: &mut impl Write,
    ) -> anyhow::Result<()> {
        match target {
            Some(target) => {
                self.references().create_symbolic(name, target, true)?;
            }
            None => {
                let reference = self.references().lookup(name)?;
                let Some(target) = reference.symbolic_target() else {
                    anyhow::bail!("ref {} is not a symbolic ref", name);
                };
                writeln!(writer, "{target}")?;
            }
        }

        Ok(())
    }
}
