use anyhow::{Context, Result};
use bit_store::Repository;
use bit_store::artifacts::refs::reference::RefFilter;
use bit_store::commands::plumbing::cat_file::CatFileMode;
use bit_store::commands::plumbing::init::init;
use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "BIT_STORE_LOG";

#[derive(Parser)]
#[command(
    name = "bit-store",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "Plumbing for a git-compatible object store",
    long_about = "Low-level commands over a content-addressable object store, \
    its staging index and its references, using git's on-disk layout.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "init",
        about = "Create an empty repository",
        long_about = "This command creates an empty repository in the current directory or at the specified path."
    )]
    Init {
        #[arg(long, help = "Create a bare repository")]
        bare: bool,
        #[arg(index = 1, help = "The path to the repository")]
        path: Option<PathBuf>,
    },
    #[command(
        name = "hash-object",
        about = "Compute the blob id of a file and optionally store it",
        long_about = "This command hashes a file as a blob and can write it to the object database."
    )]
    HashObject {
        #[arg(short, long, help = "Write the object to the object database")]
        write: bool,
        #[arg(index = 1)]
        file: PathBuf,
    },
    #[command(
        name = "cat-file",
        about = "Print the content, type or size of an object",
        group(ArgGroup::new("mode").required(true).args(["pretty", "kind", "size"]))
    )]
    CatFile {
        #[arg(short = 'p', help = "Pretty-print the object's content")]
        pretty: bool,
        #[arg(short = 't', help = "Print the object's type")]
        kind: bool,
        #[arg(short = 's', help = "Print the object's size")]
        size: bool,
        #[arg(index = 1, help = "Object id, abbreviated id or reference name")]
        object: String,
    },
    #[command(name = "ls-tree", about = "List the contents of a tree object")]
    LsTree {
        #[arg(short = 'r', help = "Recurse into subtrees")]
        recursive: bool,
        #[arg(index = 1)]
        object: String,
    },
    #[command(name = "add", about = "Stage files in the index")]
    Add {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    #[command(name = "ls-files", about = "Show the files staged in the index")]
    LsFiles {
        #[arg(short, long, help = "Show mode, object id and stage")]
        stage: bool,
    },
    #[command(name = "write-tree", about = "Create tree objects from the index")]
    WriteTree,
    #[command(name = "commit-tree", about = "Create a commit object for a tree")]
    CommitTree {
        #[arg(index = 1)]
        tree: String,
        #[arg(short = 'p', help = "A parent commit")]
        parents: Vec<String>,
        #[arg(short, long, help = "The commit message")]
        message: String,
    },
    #[command(name = "tag", about = "Create an annotated tag")]
    Tag {
        #[arg(index = 1)]
        name: String,
        #[arg(index = 2, default_value = "HEAD")]
        object: String,
        #[arg(short, long, help = "The tag message")]
        message: String,
        #[arg(short, long, help = "Replace an existing tag")]
        force: bool,
    },
    #[command(name = "show-ref", about = "List references and the objects they point at")]
    ShowRef {
        #[arg(long, help = "Only branches")]
        heads: bool,
        #[arg(long, help = "Only tags")]
        tags: bool,
        #[arg(long, help = "Include HEAD")]
        head: bool,
    },
    #[command(name = "update-ref", about = "Point a reference at an object, or delete it")]
    UpdateRef {
        #[arg(short, help = "Delete the reference")]
        delete: bool,
        #[arg(index = 1)]
        name: String,
        #[arg(index = 2, required_unless_present = "delete")]
        object: Option<String>,
    },
    #[command(name = "symbolic-ref", about = "Read or set a symbolic reference")]
    SymbolicRef {
        #[arg(index = 1)]
        name: String,
        #[arg(index = 2)]
        target: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut stdout = std::io::stdout().lock();

    if let Commands::Init { bare, path } = &cli.command {
        let path = match path {
            Some(path) => path.clone(),
            None => std::env::current_dir()?,
        };
        init(&path, *bare, &mut stdout)?;
        return Ok(());
    }

    let pwd = std::env::current_dir()?;
    let mut repository = Repository::open(&pwd).context("Failed to open repository")?;

    match &cli.command {
        Commands::Init { .. } => {}
        Commands::HashObject { write, file } => {
            repository.hash_object(file, *write, &mut stdout)?
        }
        Commands::CatFile {
            pretty: _,
            kind,
            size,
            object,
        } => {
            let mode = if *kind {
                CatFileMode::Type
            } else if *size {
                CatFileMode::Size
            } else {
                CatFileMode::Pretty
            };
            repository.cat_file(object, mode, &mut stdout)?
        }
        Commands::LsTree { recursive, object } => {
            repository.ls_tree(object, *recursive, &mut stdout)?
        }
        Commands::Add { paths } => repository.add(paths, &mut stdout)?,
        Commands::LsFiles { stage } => repository.ls_files(*stage, &mut stdout)?,
        Commands::WriteTree => repository.write_tree(&mut stdout)?,
        Commands::CommitTree {
            tree,
            parents,
            message,
        } => repository.commit_tree(tree, parents, message, &mut stdout)?,
        Commands::Tag {
            name,
            object,
            message,
            force,
        } => repository.tag(name, object, message, *force, &mut stdout)?,
        Commands::ShowRef { heads, tags, head } => {
            let mut filter = RefFilter::empty();
            filter.set(RefFilter::BRANCHES, *heads);
            filter.set(RefFilter::TAGS, *tags);
            if filter.is_empty() {
                filter = RefFilter::ALL;
            }
            repository.show_ref(filter, *head, &mut stdout)?
        }
        Commands::UpdateRef {
            delete,
            name,
            object,
        } => match (delete, object) {
            (true, _) => repository.delete_ref(name)?,
            (false, Some(object)) => repository.update_ref(name, object)?,
            (false, None) => anyhow::bail!("update-ref needs an object"),
        },
        Commands::SymbolicRef { name, target } => {
            repository.symbolic_ref(name, target.as_deref(), &mut stdout)?
        }
    }

    repository.free();
    Ok(())
}
