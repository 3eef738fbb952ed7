use clap::Parser;
use keygate::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command() {
        Command::Serve => cli::serve::run().await,
        Command::Maintain => cli::maintain::run().await,
        Command::Report => cli::maintain::report().await,
    }
}
