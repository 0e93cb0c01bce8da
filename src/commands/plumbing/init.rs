use crate::areas::repository::Repository;
use anyhow::Context;
use std::io::Write;
use std::path::Path;

/// Create a repository at `path` and report where it lives
pub fn init(path: &Path, bare: bool, writer: &mut impl Write) -> anyhow::Result<Repository> {
    let repository = Repository::init(path, bare)
        .with_context(|| format!("Failed to initialize repository in {}", path.display()))?;

    writeln!(
        writer,
        "Initialized empty {}Git repository in {}",
        if bare { "bare " } else { "" },
        repository.path().display()
    )?;

    Ok(repository)
}
