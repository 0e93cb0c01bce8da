use crate::artifacts::refs::{
    HEADS_PREFIX, INVALID_REF_NAME_REGEX, REMOTES_PREFIX, TAGS_PREFIX,
};
use crate::errors::{ErrorKind, Result};
use regex::Regex;
use std::sync::LazyLock;

static INVALID_REF_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(INVALID_REF_NAME_REGEX).ok());

/// A reference name that passed git's naming rules
///
/// Either a top-level pseudo reference in capitals (`HEAD`, `ORIG_HEAD`,
/// `FETCH_HEAD`) or a hierarchical name under `refs/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefName(String);

impl RefName {
    pub fn try_parse(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let invalid = |name: String| ErrorKind::InvalidRefName { name }.during("RefName.parse");

        if name.is_empty() {
            return Err(invalid(name));
        }

        let is_pseudo_ref = name.bytes().all(|b| b.is_ascii_uppercase() || b == b'_');
        if !is_pseudo_ref && !name.starts_with("refs/") {
            return Err(invalid(name));
        }

        let Some(re) = INVALID_REF_NAME.as_ref() else {
            return Err(invalid(name));
        };
        if re.is_match(&name) {
            return Err(invalid(name));
        }

        Ok(Self(name))
    }

    /// `main` for `refs/heads/main`, `v1.0` for `refs/tags/v1.0`, ...
    pub fn shorthand(&self) -> &str {
        [HEADS_PREFIX, TAGS_PREFIX, REMOTES_PREFIX, "refs/"]
            .iter()
            .find_map(|prefix| self.0.strip_prefix(prefix))
            .unwrap_or(&self.0)
    }

    pub fn is_branch(&self) -> bool {
        self.0.starts_with(HEADS_PREFIX)
    }

    pub fn is_tag(&self) -> bool {
        self.0.starts_with(TAGS_PREFIX)
    }

    pub fn is_remote(&self) -> bool {
        self.0.starts_with(REMOTES_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Relative path of the loose file under the git directory
    pub fn as_ref_path(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
