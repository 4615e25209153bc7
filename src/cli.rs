use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cloudconfig")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Apply cloud-config files to this machine", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only report errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Apply cloud-config files in order (- reads standard input)
    Apply(ApplyArgs),

    /// Parse a cloud-config file and print it back as YAML
    Print {
        /// Cloud-config file
        file: PathBuf,
    },

    /// Check that cloud-config files parse
    Parse {
        /// Cloud-config files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List the packages of cloud-config files
    Packages {
        /// Cloud-config files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Apply
// ============================================================================

#[derive(Parser)]
pub struct ApplyArgs {
    /// OS type: alpine or debian (empty for none)
    #[arg(long, env = "CLOUDCONFIG_OS", default_value = "")]
    pub os: String,

    /// Show what would be done without doing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Merge all files into a single config before applying
    #[arg(short, long)]
    pub merge: bool,

    /// Cloud-config files, or - for standard input
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}
