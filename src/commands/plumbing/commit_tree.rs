use crate::areas::repository::Repository;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_kind::ObjectKind;
use crate::artifacts::objects::signature::{Role, Signature};
use anyhow::Context;
use std::io::Write;

impl Repository {
    /// Create a commit object for `tree` and print its id
    ///
    /// Author and committer come from the `GIT_AUTHOR_*` and
    /// `GIT_COMMITTER_*` environment variables.
    pub fn commit_tree(
        &self,
        tree: &str,
        parents: &[String],
        message: &str,
        writer: &mut impl Write,
    ) -> anyhow::Result<()> {
        let tree_id = self.resolve_revision(tree)?;
        let (kind, _) = self.database().read_header(&tree_id)?;
        if kind != ObjectKind::Tree {
            anyhow::bail!("{} is a {}, not a tree", tree_id, kind);
        }

        let author = Signature::from_env(Role::Author).context("missing author identity")?;
        let committer =
            Signature::from_env(Role::Committer).context("missing committer identity")?;

        let mut message = message.to_string();
        if !message.ends_with('\n') {
            message.push('\n');
        }

        let mut commit = Commit::new(tree_id, author, committer, message);
        for parent in parents {
            let parent_id = self.resolve_revision(parent)?;
            let (kind, _) = self.database().read_header(&parent_id)?;
            if kind != ObjectKind::Commit {
                anyhow::bail!("{} is a {}, not a commit", parent_id, kind);
            }
            commit.add_parent_id(parent_id);
        }

        let commit_id = commit.write(self.database())?;
        writeln!(writer, "{commit_id}")?;
        Ok(())
    }
}
