use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Full report as JSON
    Json,
    /// One summary line
    Summary,
}

#[derive(Parser, Debug)]
#[command(name = "codetriage")]
#[command(about = "Prioritized security, performance and maintainability triage for source trees", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a project tree and report findings
    Analyze {
        /// Project root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "summary")]
        format: OutputFormat,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        scan: ScanArgs,
    },

    /// Suggest a conventional commit message for the working tree
    CommitMessage {
        /// Project root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Short description of the change, used as the subject
        #[arg(short, long)]
        description: Option<String>,

        #[command(flatten)]
        scan: ScanArgs,
    },

    /// Forget the stored fingerprints of a project
    ClearCache {
        /// Project root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Increase verbosity (-v debug, -vv trace)
        #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
        verbosity: u8,
    },
}

/// Flags shared by every command that runs an analysis.
#[derive(Args, Debug, Clone, Default)]
pub struct ScanArgs {
    /// Configuration file (default: nearest .codetriage.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Scan at most this many changed files
    #[arg(long = "max-files")]
    pub max_files: Option<usize>,

    /// Stop starting new files after this many seconds
    #[arg(long = "max-duration")]
    pub max_duration: Option<u64>,

    /// Extra glob patterns to ignore (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub ignore: Vec<String>,

    /// File name globs to include, replacing the defaults (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub include: Vec<String>,

    /// Skip files larger than this many megabytes (0 = no limit)
    #[arg(long = "max-file-size-mb")]
    pub max_file_size_mb: Option<u64>,

    /// Number of worker threads (0 = use all cores)
    #[arg(short = 'j', long = "jobs")]
    pub jobs: Option<usize>,

    /// Rescan every file and do not persist fingerprints
    #[arg(long = "no-cache")]
    pub no_cache: bool,

    /// Detector categories to run (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub categories: Vec<String>,

    /// Seconds one detector may spend on one file
    #[arg(long = "detector-timeout")]
    pub detector_timeout: Option<u64>,

    /// Hide progress bars
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
