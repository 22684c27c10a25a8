use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use chunkodb::{fsck, repack, ObjectKind, Oid, Repository};

#[derive(Parser)]
#[command(
    name = "chunkodb",
    about = "Content-addressed object store with chunk de-duplication",
    version
)]
struct Cli {
    /// Repository to operate on (defaults to the current directory).
    #[arg(short = 'C', value_name = "REPO", global = true)]
    repo: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an empty repository at the given path.
    Init { path: PathBuf },
    /// Print the blob id a file's content would be stored under.
    HashObject { file: PathBuf },
    /// Stage a file; its content is stored chunked and de-duplicated.
    Add { pathspec: String },
    /// Record the staged tree as a new commit on HEAD.
    Commit {
        /// Commit message.
        #[arg(short = 'm', value_name = "MSG")]
        message: String,
    },
    /// Print the content of `<rev>[:<path>]`.
    Show { spec: String },
    /// Pack all reachable objects and drop their loose copies.
    Repack,
    /// Verify that every reachable object is readable.
    Fsck,
}

fn main() {
    chunkodb::init_env();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("chunkodb: {:#}", err);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let repo_path = cli.repo.unwrap_or_else(|| PathBuf::from("."));

    match cli.command {
        Command::Init { path } => {
            Repository::init(&path)
                .with_context(|| format!("init {}", path.display()))?;
        }
        Command::HashObject { file } => {
            let data = fs::read(&file)
                .with_context(|| format!("read {}", file.display()))?;
            println!("{}", Oid::hash(ObjectKind::Blob, &data));
        }
        Command::Add { pathspec } => {
            let mut repo = open(&repo_path)?;
            repo.attach_chunked_backend()?;
            repo.add_path(&pathspec)
                .with_context(|| format!("add {}", pathspec))?;
        }
        Command::Commit { message } => {
            let mut repo = open(&repo_path)?;
            repo.attach_chunked_backend()?;
            let oid = repo.commit(&message).context("commit")?;
            println!("{}", oid);
        }
        Command::Show { spec } => {
            let mut repo = open(&repo_path)?;
            repo.attach_chunked_backend()?;
            let oid = repo
                .revparse(&spec)
                .with_context(|| format!("resolve {}", spec))?;
            let (_, data) = repo
                .odb()
                .read(oid)
                .with_context(|| format!("read {}", oid))?;
            io::stdout().write_all(&data)?;
        }
        Command::Repack => {
            repack(&repo_path)
                .with_context(|| format!("repack {}", repo_path.display()))?;
        }
        Command::Fsck => {
            fsck(&repo_path)
                .with_context(|| format!("fsck {}", repo_path.display()))?;
        }
    }
    Ok(())
}

fn open(path: &Path) -> Result<Repository> {
    Repository::open(path)
        .with_context(|| format!("open repository {}", path.display()))
}
