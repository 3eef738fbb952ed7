//! CLI module for keygate
//!
//! Provides subcommands for running the service in different modes:
//! - `serve`: HTTP server with background replenishment (default)
//! - `maintain`: one replenishment pass
//! - `report`: one pass, then the status report as JSON

pub mod maintain;
pub mod serve;

use clap::{Parser, Subcommand};

/// keygate - time-limited license keys and a text generation proxy
#[derive(Parser)]
#[command(name = "keygate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server (default mode)
    Serve,

    /// Prune used and expired licenses and top up every category
    Maintain,

    /// Run a maintenance pass and print the license report
    Report,
}

impl Cli {
    /// The selected command, `serve` when none is given
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_serve() {
        let cli = Cli::try_parse_from(["keygate"]).unwrap();
        assert_eq!(cli.command(), Command::Serve);
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["keygate", "maintain"]).unwrap();
        assert_eq!(cli.command(), Command::Maintain);

        let cli = Cli::try_parse_from(["keygate", "report"]).unwrap();
        assert_eq!(cli.command(), Command::Report);
    }

    #[test]
    fn test_unknown_subcommand_fails() {
        assert!(Cli::try_parse_from(["keygate", "api"]).is_err());
    }
}
