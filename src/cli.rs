//! Command line interface built on clap.
//!
//! Global flags override the configuration file and environment; the
//! subcommand picks what to run.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::SessionConfig;

/// quickapply: human-paced quick-apply automation.
#[derive(Debug, Parser)]
#[command(name = "quickapply", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (default: ./quickapply.toml if present).
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Search keywords.
    #[arg(long, global = true)]
    pub keywords: Option<String>,

    /// Search location.
    #[arg(long, global = true)]
    pub location: Option<String>,

    /// Stop after this many confirmed submissions.
    #[arg(long, global = true)]
    pub max_applications: Option<u32>,

    /// Debug-level logging unless RUST_LOG is set.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    /// Applies flag overrides on top of file and environment values.
    pub fn apply(&self, config: &mut SessionConfig) {
        if let Some(keywords) = &self.keywords {
            config.search.keywords = keywords.clone();
        }
        if let Some(location) = &self.location {
            config.search.location = location.clone();
        }
        if let Some(max) = self.max_applications {
            config.pacing.max_applications = max;
        }
        if self.verbose {
            config.log_level = "debug".into();
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Runs a session against the built-in scripted listing.
    Demo {
        /// Keep the configured waits instead of shortening them to 1-2s.
        #[arg(long)]
        real_pacing: bool,
    },

    /// Runs a session against a scripted listing loaded from JSON.
    Replay {
        /// Listing script file.
        fixture: PathBuf,

        /// Keep the configured waits instead of shortening them to 1-2s.
        #[arg(long)]
        real_pacing: bool,
    },

    /// Generates one cover letter through the configured backend.
    CoverLetter {
        #[arg(long)]
        title: String,

        #[arg(long)]
        company: String,

        /// Job description text.
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Prints the effective configuration with secrets masked.
    Config,
}
