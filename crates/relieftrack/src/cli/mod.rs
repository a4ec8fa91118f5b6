//! Command-line interface for relieftrack.
//!
//! This module provides the CLI structure and command handlers for the
//! `reltrack` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    CodesCommand, ConfigCommand, IntakeCommand, KitsCommand, OutputFormat, TrackCommand,
};

/// reltrack - donation-logistics tracking toolkit
///
/// Issues scannable supply-kit and collection-point codes, registers item
/// lists against them, follows truck and tag positions on a map model, and
/// records receipt confirmations, all backed by a hosted tabular data API.
#[derive(Debug, Parser)]
#[command(name = "reltrack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Issue and look up identifier codes
    #[command(subcommand)]
    Codes(CodesCommand),

    /// Collection-point intake workflows
    #[command(subcommand)]
    Intake(IntakeCommand),

    /// Kit registration and receipt confirmation
    #[command(subcommand)]
    Kits(KitsCommand),

    /// Live vehicle and tag tracking
    #[command(subcommand)]
    Track(TrackCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_verify() {
        // Verify the CLI structure is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "reltrack");
    }

    #[test]
    fn test_parse_codes_issue() {
        let cli = Cli::try_parse_from(["reltrack", "codes", "issue", "--count", "25"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Codes(CodesCommand::Issue { count: 25 })
        ));
    }

    #[test]
    fn test_parse_codes_issue_short_count() {
        // `-c` stays reserved for the global config flag.
        let cli = Cli::try_parse_from([
            "reltrack", "codes", "issue", "-n", "5", "-c", "/custom/config.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
        assert!(matches!(
            cli.command,
            Command::Codes(CodesCommand::Issue { count: 5 })
        ));
    }

    #[test]
    fn test_parse_codes_show() {
        let cli = Cli::try_parse_from(["reltrack", "codes", "show", "abc-123"]).unwrap();
        assert!(matches!(cli.command, Command::Codes(CodesCommand::Show { .. })));
    }

    #[test]
    fn test_parse_intake_register_with_list() {
        let cli = Cli::try_parse_from([
            "reltrack", "intake", "register", "abc-123", "--list", "arroz 1kg",
        ])
        .unwrap();
        match cli.command {
            Command::Intake(IntakeCommand::Register { uuid, list, file }) => {
                assert_eq!(uuid, "abc-123");
                assert_eq!(list.as_deref(), Some("arroz 1kg"));
                assert!(file.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_intake_register_list_conflicts_with_file() {
        let result = Cli::try_parse_from([
            "reltrack", "intake", "register", "abc", "--list", "x", "--file", "y.txt",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_kits_confirm_partial() {
        let cli = Cli::try_parse_from([
            "reltrack", "kits", "confirm", "abc", "--partial", "--notes", "falta agua",
        ])
        .unwrap();
        match cli.command {
            Command::Kits(KitsCommand::Confirm { id, partial, notes, .. }) => {
                assert_eq!(id, "abc");
                assert!(partial);
                assert_eq!(notes.as_deref(), Some("falta agua"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_track_follow() {
        let cli =
            Cli::try_parse_from(["reltrack", "track", "follow", "3", "--cycles", "10"]).unwrap();
        match cli.command {
            Command::Track(TrackCommand::Follow { vehicle, cycles, interval }) => {
                assert_eq!(vehicle, 3);
                assert_eq!(cycles, Some(10));
                assert!(interval.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_track_scatter() {
        let cli = Cli::try_parse_from(["reltrack", "track", "scatter"]).unwrap();
        assert!(matches!(cli.command, Command::Track(TrackCommand::Scatter)));
    }

    #[test]
    fn test_parse_with_config_and_flags() {
        let cli = Cli::try_parse_from([
            "reltrack", "-c", "/custom/config.toml", "-v", "config", "path",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
        assert_eq!(cli.verbose, 1);
        assert_eq!(cli.verbosity(), crate::logging::Verbosity::Verbose);
    }

    #[test]
    fn test_verbosity_quiet_wins() {
        let cli = Cli::try_parse_from(["reltrack", "-q", "-vv", "config", "path"]).unwrap();
        assert_eq!(cli.verbosity(), crate::logging::Verbosity::Quiet);
    }

    #[test]
    fn test_verbosity_trace() {
        let cli = Cli::try_parse_from(["reltrack", "-vv", "config", "path"]).unwrap();
        assert_eq!(cli.verbosity(), crate::logging::Verbosity::Trace);
    }
}
