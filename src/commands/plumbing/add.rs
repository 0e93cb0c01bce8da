use crate::areas::repository::Repository;
use anyhow::Context;
use std::io::Write;
use std::path::Path;
use walkdir::WalkDir;

impl Repository {
    /// Stage files (directories are expanded) and write the index back
    pub fn add(&mut self, paths: &[String], writer: &mut impl Write) -> anyhow::Result<()> {
        let workdir = self
            .workdir()
            .map(Path::to_path_buf)
            .context("this operation must be run in a work tree")?;

        let mut files = Vec::new();
        for path in paths {
            let full_path = workdir.join(path);
            if !full_path.exists() && !full_path.is_symlink() {
                anyhow::bail!("pathspec '{}' did not match any files", path);
            }

            if full_path.is_dir() {
                for entry in WalkDir::new(&full_path)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_entry(|entry| entry.file_name() != ".git")
                {
                    let entry = entry?;
                    if entry.file_type().is_dir() {
                        continue;
                    }
                    let relative = entry.path().strip_prefix(&workdir)?;
                    files.push(relative.to_string_lossy().into_owned());
                }
            } else {
                files.push(path.clone());
            }
        }

        let index = self.index()?;
        for file in &files {
            index
                .add(file, 0)
                .with_context(|| format!("adding '{file}' to the index"))?;
            writeln!(writer, "add '{file}'")?;
        }
        index.write()?;

        Ok(())
    }
}
