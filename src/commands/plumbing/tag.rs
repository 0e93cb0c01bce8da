use crate::areas::repository::Repository;
use crate::artifacts::objects::signature::{Role, Signature};
use crate::artifacts::objects::tag::Tag;
use crate::artifacts::refs::TAGS_PREFIX;
use anyhow::Context;
use std::io::Write;

impl Repository {
    /// Create an annotated tag object and a `refs/tags/<name>` reference to it
    pub fn tag(
        &self,
        name: &str,
        target: &str,
        message: &str,
        force: bool,
        writer: &mut impl Write,
    ) -> anyhow::Result<()> {
        let target_id = self.resolve_revision(target)?;
        let (target_kind, _) = self.database().read_header(&target_id)?;
        let tagger = Signature::from_env(Role::Committer).context("missing tagger identity")?;

        let mut message = message.to_string();
        if !message.ends_with('\n') {
            message.push('\n');
        }

        let mut tag = Tag::new(name, target_id, target_kind, tagger, message);
        let tag_id = tag.write(self.database())?;
        self.references()
            .create_direct(&format!("{TAGS_PREFIX}{name}"), tag_id, force)
            .with_context(|| format!("creating tag reference '{name}'"))?;

        writeln!(writer, "{tag_id}")?;
        Ok(())
    }
}
