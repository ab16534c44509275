use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "edgepack",
    version,
    about = "Deterministic edge code bundles and access-token injection"
)]
pub struct Cli {
    /// YAML or JSON file overriding the packaging defaults
    #[arg(long, global = true, env = "EDGEPACK_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build a bundle from a working directory
    Build(BuildArgs),
    /// Compute the identity of a prebuilt bundle
    Checksum(ChecksumArgs),
    /// Check a manifest file without building
    Validate(ValidateArgs),
    /// Bind an access token to namespaces inside a bundle or working directory
    Token(TokenArgs),
    /// List bundle members and check the embedded manifest
    Inspect(InspectArgs),
    Version,
}

#[derive(clap::Args, Clone, Debug)]
pub struct BuildArgs {
    /// Working directory holding the manifest and entry file
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Where the archive is written (overrides config)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// JSON list of published versions; fail if the bundle duplicates one
    #[arg(long)]
    pub versions: Option<PathBuf>,
}

#[derive(clap::Args, Clone, Debug)]
pub struct ChecksumArgs {
    pub archive: PathBuf,

    /// JSON list of published versions; fail if the bundle duplicates one
    #[arg(long)]
    pub versions: Option<PathBuf>,
}

#[derive(clap::Args, Clone, Debug)]
pub struct ValidateArgs {
    /// Manifest file to check
    pub manifest: PathBuf,
}

#[derive(clap::Args, Clone, Debug)]
pub struct TokenArgs {
    /// Bundle archive, or a working directory
    pub path: PathBuf,

    #[arg(long)]
    pub token_name: String,

    /// Opaque token reference
    #[arg(long)]
    pub reference: String,

    /// Namespace to bind (repeatable, or comma separated)
    #[arg(long = "namespace", required = true, value_delimiter = ',')]
    pub namespaces: Vec<String>,

    /// Replace an existing reference for the same token name
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(clap::Args, Clone, Debug)]
pub struct InspectArgs {
    pub archive: PathBuf,
}
