use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "filescraper")]
#[command(author, version, about = "File format identification and well-formedness checking")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Identify a file, scrape its metadata and check well-formedness
    Scrape {
        /// File to scrape
        #[arg(required = true)]
        file: PathBuf,

        /// Skip well-formedness checks; only identify and collect metadata
        #[arg(long)]
        no_wellformed: bool,

        /// Force the MIME type
        #[arg(long)]
        mimetype: Option<String>,

        /// Force the version (ignored without --mimetype)
        #[arg(long = "version")]
        format_version: Option<String>,

        /// Extra scraper parameter, e.g. schematron=/path/rules.sch
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether a file is a text file
    IsText {
        /// File to check
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Compute a file checksum
    Checksum {
        /// File to hash
        #[arg(required = true)]
        file: PathBuf,

        /// Digest algorithm: sha224, sha256, sha384 or sha512
        #[arg(short, long, default_value = "sha256")]
        algorithm: String,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
