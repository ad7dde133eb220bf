//! Interactive CLI mode

use crate::commands::{Cli, CommandExecutor, CommandResult};
use anyhow::Result;
use clap::Parser;
use std::io::{self, Write};
use tracing::warn;

/// Interactive CLI session; the graph persists between lines
pub struct InteractiveSession {
    executor: CommandExecutor,
}

impl InteractiveSession {
    pub fn new(executor: CommandExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &CommandExecutor {
        &self.executor
    }

    /// Start interactive session
    pub async fn run(&mut self) -> Result<()> {
        println!("obsgraph interactive mode");
        println!("Type 'help' for available commands, 'quit' to exit");
        println!("{}", "=".repeat(50));

        loop {
            print!("obsgraph> ");
            io::stdout().flush()?;

            let mut input = String::new();
            if io::stdin().read_line(&mut input)? == 0 {
                break;
            }
            let input = input.trim();

            if input.is_empty() {
                continue;
            }

            match input {
                "quit" | "exit" | "q" => {
                    println!("Goodbye!");
                    break;
                }
                "help" | "h" => self.show_help(),
                "clear" => print!("\x1B[2J\x1B[1;1H"),
                _ => match self.execute_line(input).await {
                    Ok(Some(result)) if !result.message.is_empty() => println!("{}", result.message),
                    Ok(_) => {}
                    Err(e) => eprintln!("Error: {}", e),
                },
            }
        }

        Ok(())
    }

    /// Parse one line as a subcommand and run it.
    ///
    /// Returns `Ok(None)` when the line could not be parsed; the parse error
    /// has already been printed.
    pub async fn execute_line(&mut self, input: &str) -> Result<Option<CommandResult>> {
        let mut args = vec!["obsgraph".to_string()];
        args.extend(shell_words::split(input)?);

        let cli = match Cli::try_parse_from(args) {
            Ok(cli) => cli,
            Err(e) => {
                eprintln!("{}", e);
                return Ok(None);
            }
        };
        if cli.seed.is_some() || cli.config.is_some() {
            warn!("--seed and --config only apply at startup, ignoring");
        }

        match cli.command {
            Some(command) => Ok(Some(self.executor.execute(command).await?)),
            None => Ok(None),
        }
    }

    fn show_help(&self) {
        println!("Available commands:");
        println!("  generate [-n N] [--reuse P] [--bad]   Start a fresh graph");
        println!("  append [-n N] [--reuse P] [--bad]     Add observations");
        println!("  pin (--uuid U | --index I) -x X -y Y  Pin an observation's fields");
        println!("  play [--cycles N] [--interval-ms MS]  Append on a timer");
        println!("  show [--observations]                 Show the current graph");
        println!("  info                                  Show system information");
        println!("  help                                  Show this help");
        println!("  clear                                 Clear screen");
        println!("  quit                                  Exit interactive mode");
        println!();
        println!("Use '<command> --help' for detailed help on each command");
    }
}

/// Start interactive mode
pub async fn start_interactive(executor: CommandExecutor) -> Result<()> {
    let mut session = InteractiveSession::new(executor);
    session.run().await
}
