//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Read settings from this file
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Only log errors

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// githubfile - Manage single files in GitHub repositories through signed commits
#[derive(Parser, Debug)]
#[command(name = "githubfile")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Read settings from this file instead of the default locations
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "debug")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Log filter used when `RUST_LOG` is not set.
    pub fn default_log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Commit a new file and print it as JSON
    #[command(
        name = "create",
        after_help = "\
EXAMPLES:
    githubfile create --owner acme --repo infra --branch main \\
        --path teams/README.md --contents 'hello'

    githubfile create --owner acme --repo infra --branch main \\
        --path teams/CODEOWNERS --contents-file ./CODEOWNERS"
    )]
    Create(FileArgs),

    /// Print the file named by an id as JSON, or `null` if it is gone
    Read {
        /// File id, `<owner>/<repo>:<branch>:<path>`
        id: String,
    },

    /// Commit new contents over an existing file and print it as JSON
    Update(FileArgs),

    /// Delete the file named by an id
    #[command(
        long_about = "Delete the file named by an id.\n\n\
            Nothing is committed when the repository is archived or the file \
            is already gone; both count as success."
    )]
    Delete {
        /// File id, `<owner>/<repo>:<branch>:<path>`
        id: String,
    },

    /// Print an existing file as JSON; fails if it does not exist
    Import {
        /// File id, `<owner>/<repo>:<branch>:<path>`
        id: String,
    },

    /// Encode or decode file ids (offline)
    Id {
        #[command(subcommand)]
        action: IdAction,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
SETUP EXAMPLES:
    # Bash (add to ~/.bashrc)
    eval \"$(githubfile completion bash)\"

    # Zsh (add to ~/.zshrc)
    eval \"$(githubfile completion zsh)\"

    # Fish
    githubfile completion fish > ~/.config/fish/completions/githubfile.fish"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Identifies a file by its four key components.
#[derive(Args, Debug, Clone)]
pub struct KeyArgs {
    /// Repository owner (user or organization)
    #[arg(long)]
    pub owner: String,

    /// Repository name
    #[arg(long)]
    pub repo: String,

    /// Branch holding the file
    #[arg(long)]
    pub branch: String,

    /// Slash-separated path of the file in the repository
    #[arg(long)]
    pub path: String,
}

/// A file key plus its desired contents.
#[derive(Args, Debug, Clone)]
pub struct FileArgs {
    #[command(flatten)]
    pub key: KeyArgs,

    /// Desired contents
    #[arg(long, required_unless_present = "contents_file")]
    pub contents: Option<String>,

    /// Read the desired contents from this file
    #[arg(long, value_name = "FILE", conflicts_with = "contents")]
    pub contents_file: Option<PathBuf>,
}

/// File id subcommands.
#[derive(Subcommand, Debug)]
pub enum IdAction {
    /// Print the id of a file key
    Encode(KeyArgs),

    /// Print the key an id names as JSON
    Decode {
        /// File id, `<owner>/<repo>:<branch>:<path>`
        id: String,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
