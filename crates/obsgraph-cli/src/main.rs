//! obsgraph CLI main entry point

use anyhow::Result;
use clap::Parser;
use obsgraph_cli::{commands::{Cli, CommandExecutor}, interactive::start_interactive};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut executor = CommandExecutor::from_cli(&cli)?;

    // No subcommand: keep one session alive in the shell
    let Some(command) = cli.command else {
        start_interactive(executor).await?;
        return Ok(());
    };

    let result = executor.execute(command).await?;
    if !result.message.is_empty() {
        println!("{}", result.message);
    }

    if result.success {
        std::process::exit(0);
    } else {
        std::process::exit(1);
    }
}
