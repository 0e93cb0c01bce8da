use crate::areas::repository::Repository;
use crate::artifacts::objects::OBJECT_ID_HEX_LENGTH;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::refs::{HEADS_PREFIX, TAGS_PREFIX};

/// Shortest abbreviated id accepted on the command line
const MIN_PREFIX_LENGTH: usize = 4;

impl Repository {
    /// Turn a command-line object name into an id
    ///
    /// Accepts, in order of preference: a full hex id, a reference name
    /// (`HEAD`, `refs/heads/main`, `main`, `v1.0`), or an abbreviated hex id
    /// of at least four characters.
    pub fn resolve_revision(&self, revision: &str) -> anyhow::Result<ObjectId> {
        if revision.len() == OBJECT_ID_HEX_LENGTH
            && let Ok(oid) = ObjectId::from_hex(revision)
        {
            return Ok(oid);
        }

        let candidates = [
            revision.to_string(),
            format!("{HEADS_PREFIX}{revision}"),
            format!("{TAGS_PREFIX}{revision}"),
        ];
        for candidate in &candidates {
            if let Ok(oid) = self.references().resolve_name(candidate) {
                return Ok(oid);
            }
        }

        if revision.len() < MIN_PREFIX_LENGTH {
            anyhow::bail!("unknown revision '{}'", revision);
        }

        let matches = self.database().find_by_prefix(revision)?;
        match matches.as_slice() {
            [] => anyhow::bail!("unknown revision '{}'", revision),
            [oid] => Ok(*oid),
            _ => {
                let candidates = matches
                    .iter()
                    .map(|oid| format!("  {oid}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                anyhow::bail!(
                    "short object id {} is ambiguous\nThe candidates are:\n{}",
                    revision,
                    candidates
                )
            }
        }
    }
}
