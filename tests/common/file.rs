use derive_new::new;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct FileSpec {
    pub path: PathBuf,
    pub content: String,
}

pub fn write_file(file_spec: FileSpec) {
    if let Some(parent) = file_spec.path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directories");
    }
    std::fs::write(&file_spec.path, file_spec.content).expect("Failed to write file");
}

/// Write `files_count` files with random names and lorem content under `dir`
pub fn write_generated_files(dir: &Path, files_count: usize) -> Vec<FileSpec> {
    use fake::Fake;
    use fake::faker::lorem::en::{Word, Words};

    let mut files: Vec<FileSpec> = (0..files_count)
        .map(|i| {
            let name = format!("{}-{}.txt", Word().fake::<String>(), i);
            let content = Words(3..8).fake::<Vec<String>>().join(" ");
            FileSpec::new(dir.join(name), content)
        })
        .collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));

    for file in &files {
        write_file(file.clone());
    }
    files
}
