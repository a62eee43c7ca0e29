//! Command-line interface definitions.
//!
//! ```sh
//! # scheduler daemon (one cycle on start, then every check interval)
//! content-tracker run
//!
//! # single cycle, summary on stdout
//! content-tracker check-now
//!
//! # source lists
//! content-tracker sources list --platform twitter
//! content-tracker sources set twitter @alice bob
//!
//! # stored records
//! content-tracker records list --platform instagram --limit 5
//! content-tracker records get instagram_alice_Cx1ab
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::model::Platform;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to tracker.toml (defaults to config/tracker.toml)
    #[arg(short, long, env = "TRACKER_CONFIG_PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Emit JSON logs instead of the compact format
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run the scheduler until interrupted
    Run {
        /// Skip the cycle that normally runs at startup
        #[arg(long)]
        no_initial_check: bool,
    },
    /// Run one check cycle and print its summary
    CheckNow,
    /// Inspect or replace source lists
    #[command(subcommand)]
    Sources(SourcesCommand),
    /// Browse stored records
    #[command(subcommand)]
    Records(RecordsCommand),
    /// Show tracking status
    Status,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum SourcesCommand {
    /// List tracked handles
    List(PlatformFilter),
    /// Replace a platform's handle list
    Set {
        #[arg(value_parser = parse_platform)]
        platform: Platform,
        /// Handles, with or without a leading @
        handles: Vec<String>,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum RecordsCommand {
    /// List records, newest first
    List {
        #[command(flatten)]
        filter: PlatformFilter,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Print one record
    Get { id: String },
}

#[derive(Args, Debug, Default, PartialEq, Eq)]
pub struct PlatformFilter {
    /// youtube | twitter | instagram
    #[arg(short, long, value_parser = parse_platform)]
    pub platform: Option<Platform>,
}

fn parse_platform(s: &str) -> Result<Platform, String> {
    s.parse::<Platform>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_and_check_now_parse() {
        let cli = Cli::parse_from(["content-tracker", "run", "--no-initial-check"]);
        assert_eq!(
            cli.command,
            Command::Run {
                no_initial_check: true
            }
        );
        let cli = Cli::parse_from(["content-tracker", "--config", "/tmp/t.toml", "check-now"]);
        assert_eq!(cli.command, Command::CheckNow);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/t.toml")));
    }

    #[test]
    fn sources_set_takes_platform_and_handles() {
        let cli = Cli::parse_from(["content-tracker", "sources", "set", "x", "@alice", "bob"]);
        assert_eq!(
            cli.command,
            Command::Sources(SourcesCommand::Set {
                platform: Platform::Twitter,
                handles: vec!["@alice".into(), "bob".into()],
            })
        );
    }

    #[test]
    fn records_list_defaults_and_filters() {
        let cli = Cli::parse_from(["content-tracker", "records", "list", "-p", "instagram"]);
        assert_eq!(
            cli.command,
            Command::Records(RecordsCommand::List {
                filter: PlatformFilter {
                    platform: Some(Platform::Instagram)
                },
                limit: 20,
            })
        );
        assert!(Cli::try_parse_from(["content-tracker", "records", "list", "-p", "myspace"]).is_err());
    }
}
