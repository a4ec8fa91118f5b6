//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Subcommand, ValueEnum};

/// Identifier code commands.
#[derive(Debug, Subcommand)]
pub enum CodesCommand {
    /// Issue a batch of scannable codes
    Issue {
        /// How many codes to issue (clamped to 1..=500)
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },

    /// Look up one code by UUID or scan URL
    Show {
        /// Raw UUID or a full scan URL
        identifier: String,
    },

    /// List every code with its attached list, newest first
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

/// Collection-point intake commands.
#[derive(Debug, Subcommand)]
pub enum IntakeCommand {
    /// Extract the identifier from scanned text and print the registration URL
    Scan {
        /// The raw text a scanner decoded
        text: String,
    },

    /// Register an item list against a code
    Register {
        /// Code UUID (or scan URL) the list belongs to
        uuid: String,

        /// The item list text
        #[arg(short, long)]
        list: Option<String>,

        /// Read the item list from a file instead
        #[arg(short, long, value_name = "FILE", conflicts_with = "list")]
        file: Option<PathBuf>,
    },

    /// Parse queue text into item/quantity entries
    Queue {
        /// Queue text, one item per line
        text: Option<String>,

        /// Read the queue text from a file instead
        #[arg(short, long, value_name = "FILE", conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

/// Kit commands.
#[derive(Debug, Subcommand)]
pub enum KitsCommand {
    /// Show the fixed kit catalog
    Catalog,

    /// Register a delivered kit and mint its receipt URL
    Register {
        /// Catalog category name
        category: String,

        /// Supply list text (defaults to the catalog list for the category)
        #[arg(short, long)]
        list: Option<String>,
    },

    /// Confirm receipt of a kit
    Confirm {
        /// Kit id from the receipt URL
        id: String,

        /// The delivery was incomplete
        #[arg(long)]
        partial: bool,

        /// Notes (required with --partial)
        #[arg(short, long)]
        notes: Option<String>,

        /// Message to the donors
        #[arg(short, long)]
        message: Option<String>,

        /// Free-text address
        #[arg(short, long)]
        address: Option<String>,

        /// Attach an IP-based device position
        #[arg(long)]
        locate: bool,
    },

    /// List delivered kits grouped by category
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

/// Live-tracking commands.
#[derive(Debug, Subcommand)]
pub enum TrackCommand {
    /// List the tracked vehicles
    Vehicles {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Follow one vehicle's route, polling on a fixed interval
    Follow {
        /// Vehicle id to follow
        vehicle: i64,

        /// Stop after this many polling cycles (default: until interrupted)
        #[arg(long)]
        cycles: Option<u64>,

        /// Override the configured polling interval, in seconds
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },

    /// One-shot scatter view of all tag movements
    Scatter,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    Plain,
    /// Formatted table
    #[default]
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Table);
    }

    #[test]
    fn test_codes_command_debug() {
        let cmd = CodesCommand::Issue { count: 10 };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Issue"));
        assert!(debug_str.contains("10"));
    }

    #[test]
    fn test_kits_command_debug() {
        let cmd = KitsCommand::Catalog;
        assert!(format!("{cmd:?}").contains("Catalog"));
    }

    #[test]
    fn test_track_command_debug() {
        let cmd = TrackCommand::Follow {
            vehicle: 3,
            cycles: Some(5),
            interval: None,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Follow"));
        assert!(debug_str.contains("vehicle"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        assert!(format!("{cmd:?}").contains("Show"));
    }
}
