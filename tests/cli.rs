use assert_fs::TempDir;
use assert_fs::prelude::*;
use fake::Fake;
use fake::faker::lorem::en::Words;
use predicates::prelude::*;
use rstest::rstest;

mod common;

use common::command::{
    repository_dir, run_bit_command, run_bit_command_as_author, staged_repository_dir, stdout_of,
};

#[rstest]
fn init_reports_git_directory(repository_dir: TempDir) {
    let git_dir = repository_dir.path().canonicalize().unwrap().join(".git");

    run_bit_command(repository_dir.path(), &["init"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "Initialized empty Git repository in",
        ))
        .stdout(predicate::str::contains(git_dir.display().to_string()));

    repository_dir
        .child(".git/HEAD")
        .assert("ref: refs/heads/master\n");
}

#[rstest]
fn init_twice_fails(repository_dir: TempDir) {
    run_bit_command(repository_dir.path(), &["init"])
        .assert()
        .success();

    run_bit_command(repository_dir.path(), &["init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[rstest]
fn commands_outside_a_repository_fail(repository_dir: TempDir) {
    run_bit_command(repository_dir.path(), &["write-tree"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a git repository"));
}

#[rstest]
fn hash_object_writes_blob_only_with_flag(repository_dir: TempDir) {
    run_bit_command(repository_dir.path(), &["init"])
        .assert()
        .success();
    let content = Words(5..10).fake::<Vec<String>>().join(" ");
    repository_dir.child("file.txt").write_str(&content).unwrap();

    let id = stdout_of(run_bit_command(
        repository_dir.path(),
        &["hash-object", "file.txt"],
    ));
    let object_path = repository_dir
        .path()
        .join(".git/objects")
        .join(&id[..2])
        .join(&id[2..]);
    assert!(!object_path.exists());

    let written = stdout_of(run_bit_command(
        repository_dir.path(),
        &["hash-object", "-w", "file.txt"],
    ));
    assert_eq!(written, id);
    assert!(object_path.is_file());

    run_bit_command(repository_dir.path(), &["cat-file", "-p", &id])
        .assert()
        .success()
        .stdout(predicate::eq(content.clone()));
    run_bit_command(repository_dir.path(), &["cat-file", "-t", &id[..8]])
        .assert()
        .success()
        .stdout("blob\n");
    run_bit_command(repository_dir.path(), &["cat-file", "-s", &id])
        .assert()
        .success()
        .stdout(format!("{}\n", content.len()));
}

#[rstest]
fn hello_blob_has_git_id(repository_dir: TempDir) {
    run_bit_command(repository_dir.path(), &["init"])
        .assert()
        .success();
    repository_dir.child("hello").write_str("hello").unwrap();

    run_bit_command(repository_dir.path(), &["hash-object", "hello"])
        .assert()
        .success()
        .stdout("b6fc4c620b67d95f953a5c1c1230aaab5db5a1b0\n");
}

#[rstest]
fn ls_files_lists_staged_paths(staged_repository_dir: TempDir) {
    run_bit_command(staged_repository_dir.path(), &["ls-files"])
        .assert()
        .success()
        .stdout("1.txt\na/2.txt\na/b/3.txt\n");

    run_bit_command(staged_repository_dir.path(), &["ls-files", "--stage"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "100644 43dd47ea691c90a5fa7827892c70241913351963 0\t1.txt",
        ));
}

#[rstest]
fn write_tree_matches_git(staged_repository_dir: TempDir) {
    run_bit_command(staged_repository_dir.path(), &["write-tree"])
        .assert()
        .success()
        .stdout("88484bd9e7919fa9b7dfeb008fb8f6c85743d171\n");

    run_bit_command(
        staged_repository_dir.path(),
        &["ls-tree", "-r", "88484bd9e7919fa9b7dfeb008fb8f6c85743d171"],
    )
    .assert()
    .success()
    .stdout(
        "100644 blob 43dd47ea691c90a5fa7827892c70241913351963\t1.txt\n\
         100644 blob 64c5e5885a4b06010b3a0c20edb7900dd0311025\ta/2.txt\n\
         100644 blob 1d19714ffbc272ba0da6eb419d66123c20527174\ta/b/3.txt\n",
    );
}

#[rstest]
fn commit_tree_tag_and_show_ref(staged_repository_dir: TempDir) {
    let dir = staged_repository_dir.path();
    let tree = stdout_of(run_bit_command(dir, &["write-tree"]));

    let commit = stdout_of(run_bit_command_as_author(
        dir,
        &["commit-tree", &tree, "-m", "Initial commit"],
    ));
    assert_eq!(commit, "e972be13fc5b660dd06f6de2e96b36a6b93bbcd7");

    run_bit_command(dir, &["update-ref", "refs/heads/master", &commit])
        .assert()
        .success();
    let child = stdout_of(run_bit_command_as_author(
        dir,
        &["commit-tree", &tree, "-p", "HEAD", "-m", "Second"],
    ));
    run_bit_command(dir, &["cat-file", "-p", &child])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("parent {commit}\n")));

    let tag = stdout_of(run_bit_command_as_author(
        dir,
        &["tag", "v1.0", &commit, "-m", "first release"],
    ));
    run_bit_command(dir, &["cat-file", "-t", "v1.0"])
        .assert()
        .success()
        .stdout("tag\n");

    run_bit_command(dir, &["show-ref"])
        .assert()
        .success()
        .stdout(format!(
            "{commit} refs/heads/master\n{tag} refs/tags/v1.0\n"
        ));
    run_bit_command(dir, &["show-ref", "--tags"])
        .assert()
        .success()
        .stdout(format!("{tag} refs/tags/v1.0\n"));
    run_bit_command(dir, &["ls-tree", "v1.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("040000 tree"));
}

#[rstest]
fn commit_tree_requires_identity(staged_repository_dir: TempDir) {
    let dir = staged_repository_dir.path();
    let tree = stdout_of(run_bit_command(dir, &["write-tree"]));

    run_bit_command(dir, &["commit-tree", &tree, "-m", "no author"])
        .env_remove("GIT_AUTHOR_NAME")
        .env_remove("GIT_AUTHOR_EMAIL")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing author identity"));
}

#[rstest]
fn symbolic_ref_reads_and_updates_head(repository_dir: TempDir) {
    let dir = repository_dir.path();
    run_bit_command(dir, &["init"]).assert().success();

    run_bit_command(dir, &["symbolic-ref", "HEAD"])
        .assert()
        .success()
        .stdout("refs/heads/master\n");
    run_bit_command(dir, &["symbolic-ref", "HEAD", "refs/heads/main"])
        .assert()
        .success();

    repository_dir
        .child(".git/HEAD")
        .assert("ref: refs/heads/main\n");
}

#[rstest]
fn update_ref_delete_removes_reference(staged_repository_dir: TempDir) {
    let dir = staged_repository_dir.path();
    let tree = stdout_of(run_bit_command(dir, &["write-tree"]));
    run_bit_command(dir, &["update-ref", "refs/heads/topic", &tree])
        .assert()
        .success();

    run_bit_command(dir, &["update-ref", "-d", "refs/heads/topic"])
        .assert()
        .success();

    staged_repository_dir
        .child(".git/refs/heads/topic")
        .assert(predicate::path::missing());
    run_bit_command(dir, &["update-ref", "-d", "refs/heads/topic"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[rstest]
fn unknown_revision_fails(repository_dir: TempDir) {
    run_bit_command(repository_dir.path(), &["init"])
        .assert()
        .success();

    run_bit_command(repository_dir.path(), &["cat-file", "-p", "deadbeef"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown revision"));
}
