//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::inventory::IdentityStrategy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// sbomdiff - compare SBOMs produced by different scanners
///
/// Pulls the component inventories of several scanners from
/// Dependency-Track or DefectDojo, reconciles them, labels every artifact
/// by majority vote and draws Venn diagrams and confusion matrices.
///
/// Examples:
///   sbomdiff projects --filter shop
///   sbomdiff collect --project shop --project-version 2.0 -o shop.json
///   sbomdiff compare --project shop --project-version 2.0
///   sbomdiff compare --project shop --input shop.json --identity normalized
///   sbomdiff diff --project shop --left syft_cont --right trivy_cont
///   sbomdiff search --project shop --input shop.json --column purl --contains npm
///   sbomdiff dojo engagements --product 12
///   sbomdiff init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .sbomdiff.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Write logs to a file instead of stderr
    #[arg(long, value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Dependency-Track base URL
    #[arg(long, value_name = "URL", env = "DEPENDENCY_TRACK_URL", global = true)]
    pub dt_url: Option<String>,

    /// Dependency-Track API key
    #[arg(
        long,
        value_name = "KEY",
        env = "DEPENDENCY_TRACK_API_KEY",
        hide_env_values = true,
        global = true
    )]
    pub dt_api_key: Option<String>,

    /// DefectDojo base URL
    #[arg(long, value_name = "URL", env = "DEFECT_DOJO_URL", global = true)]
    pub dojo_url: Option<String>,

    /// DefectDojo API token
    #[arg(
        long,
        value_name = "KEY",
        env = "DEFECT_DOJO_API_KEY",
        hide_env_values = true,
        global = true
    )]
    pub dojo_api_key: Option<String>,

    /// Skip TLS certificate verification for both APIs
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Number of scanner projects fetched in parallel
    #[arg(long, value_name = "NUM", global = true)]
    pub concurrency: Option<usize>,

    /// Root directory for plots and reports
    #[arg(long, value_name = "DIR", global = true)]
    pub output_dir: Option<PathBuf>,
}

/// Project selection shared by several subcommands.
#[derive(clap::Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Project name (scanner projects are named <project>_<scanner>)
    #[arg(short, long)]
    pub project: String,

    /// Project version; all versions match when omitted
    #[arg(long, value_name = "VERSION")]
    pub project_version: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List Dependency-Track projects
    Projects {
        /// Only show projects whose name contains this string
        #[arg(long)]
        filter: Option<String>,
    },

    /// Fetch all scanner SBOMs of a project and save them as a dataset
    Collect {
        #[command(flatten)]
        target: ProjectArgs,

        /// Dataset output file (JSON)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Reconcile scanners, draw plots and write a comparison report
    Compare {
        #[command(flatten)]
        target: ProjectArgs,

        /// Use a previously collected dataset instead of querying the API
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Report output format
        #[arg(long, default_value = "markdown", value_name = "FORMAT")]
        format: OutputFormat,

        /// Override the identity strategy from the config
        #[arg(long, value_name = "STRATEGY")]
        identity: Option<IdentityStrategy>,

        /// Scanners to compare (comma-separated, in order)
        #[arg(long, value_name = "NAMES", value_delimiter = ',')]
        scanners: Option<Vec<String>>,

        /// Skip SVG plot generation
        #[arg(long)]
        no_plots: bool,
    },

    /// List artifacts one scanner has and another lacks
    Diff {
        #[command(flatten)]
        target: ProjectArgs,

        /// Use a previously collected dataset instead of querying the API
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Scanner whose artifacts are listed
        #[arg(long, value_name = "SCANNER")]
        left: String,

        /// Scanner whose artifacts are subtracted
        #[arg(long, value_name = "SCANNER")]
        right: String,

        /// Flag value to select (1 = reported, 0 = missed)
        #[arg(long, default_value = "1")]
        flag: u8,

        /// Label value to select (1 = confirmed by majority, 0 = not)
        #[arg(long, default_value = "1")]
        label: u8,

        /// Override the identity strategy from the config
        #[arg(long, value_name = "STRATEGY")]
        identity: Option<IdentityStrategy>,
    },

    /// Search the component records of a collected dataset
    Search {
        #[command(flatten)]
        target: ProjectArgs,

        /// Dataset file produced by `collect`
        #[arg(long, value_name = "FILE")]
        input: PathBuf,

        /// Record column to search (name, purl, p_type, hash_sum, ...)
        #[arg(long, default_value = "name")]
        column: String,

        /// Substring the column must contain
        #[arg(long, value_name = "TEXT")]
        contains: String,

        /// Only search the records of this scanner
        #[arg(long, value_name = "SCANNER")]
        scanner: Option<String>,
    },

    /// Query DefectDojo
    Dojo {
        #[command(subcommand)]
        command: DojoCommand,
    },

    /// Generate a default .sbomdiff.toml configuration file
    InitConfig,
}

#[derive(Subcommand, Debug, Clone)]
pub enum DojoCommand {
    /// List products
    Products,

    /// Show one product
    Product {
        /// Product id
        id: u64,
    },

    /// List engagements of a product
    Engagements {
        #[arg(long, value_name = "ID")]
        product: u64,
    },

    /// List tests of an engagement
    Tests {
        #[arg(long, value_name = "ID")]
        engagement: u64,
    },

    /// List findings of a test
    Findings {
        #[arg(long, value_name = "ID")]
        test: u64,
    },

    /// Turn the findings of an engagement into a scanner dataset
    Collect {
        #[arg(long, value_name = "ID")]
        engagement: u64,

        #[command(flatten)]
        target: ProjectArgs,

        /// Dataset output file (JSON)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        for url in [&self.dt_url, &self.dojo_url].into_iter().flatten() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("URL must start with 'http://' or 'https://': {}", url));
            }
        }

        if let Some(concurrency) = self.concurrency {
            if concurrency == 0 {
                return Err("Concurrency must be at least 1".to_string());
            }
        }

        if let Some(path) = self.dataset_input() {
            if !path.is_file() {
                return Err(format!("Dataset file does not exist: {}", path.display()));
            }
        }

        match &self.command {
            Command::Diff {
                left,
                right,
                flag,
                label,
                ..
            } => {
                if left == right {
                    return Err("--left and --right must name different scanners".to_string());
                }
                if *flag > 1 || *label > 1 {
                    return Err("--flag and --label must be 0 or 1".to_string());
                }
            }
            Command::Compare {
                scanners: Some(names),
                ..
            } if names.is_empty() => {
                return Err("--scanners needs at least one name".to_string());
            }
            _ => {}
        }

        Ok(())
    }

    /// Dataset file the command reads instead of querying an API.
    pub fn dataset_input(&self) -> Option<&PathBuf> {
        match &self.command {
            Command::Compare { input, .. } | Command::Diff { input, .. } => input.as_ref(),
            Command::Search { input, .. } => Some(input),
            _ => None,
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
