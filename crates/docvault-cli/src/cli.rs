use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use docvault_store::BackendKind;
use docvault_verify::{MessageKind, Severity};

#[derive(Parser)]
#[command(
    name = "docvault",
    about = "Content-addressed documentation store and consistency verifier",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to ./docvault.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Store location: a directory root or an archive file
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    #[arg(long, global = true)]
    pub backend: Option<Backend>,

    /// Index file
    #[arg(long, global = true)]
    pub index: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    Memory,
    Directory,
    Archive,
}

impl From<Backend> for BackendKind {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Memory => BackendKind::Memory,
            Backend::Directory => BackendKind::Directory,
            Backend::Archive => BackendKind::Archive,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Add files (or every file under a directory) to the store
    Put(PutArgs),
    /// Print the bytes of a stored object
    Get(GetArgs),
    /// List every object id in the store
    Ls,
    /// Print the index tree
    Tree(TreeArgs),
    /// Look up an address and show its neighbours
    Resolve(ResolveArgs),
    /// Check the index and its content for consistency problems
    Verify(VerifyArgs),
}

#[derive(Args)]
pub struct PutArgs {
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(Args)]
pub struct GetArgs {
    /// 40-digit hex object id
    pub id: String,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct TreeArgs {
    /// Start below this address instead of the root
    pub address: Option<String>,

    #[arg(short, long)]
    pub depth: Option<usize>,
}

#[derive(Args)]
pub struct ResolveArgs {
    pub address: String,

    /// Levels of children to list
    #[arg(short, long, default_value = "1")]
    pub depth: usize,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// Group identical messages and count them
    #[arg(long)]
    pub aggregate: bool,

    /// Only report these kinds (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub kinds: Vec<MessageKind>,

    #[arg(long)]
    pub min_severity: Option<Severity>,
}
