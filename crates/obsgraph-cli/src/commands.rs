//! CLI command definitions and handlers

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use obsgraph_core::GraphSnapshot;
use obsgraph_engine::{
    run_autoplay, AutoplaySettings, EngineConfig, GenerateOptions, GraphSession, Mode,
};
use serde_json::json;
use std::fmt::Write as _;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

/// Main CLI structure
#[derive(Parser, Debug)]
#[command(name = "obsgraph")]
#[command(about = "Synthetic security observations and the recurring actors they share")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Seed for a reproducible session
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// JSON engine configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Generation knobs shared by `generate` and `append`
#[derive(clap::Args, Debug, Clone, PartialEq)]
pub struct GenerationArgs {
    /// Number of observations (defaults to the configured batch size)
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Chance of reusing a known IP or username
    #[arg(short, long)]
    pub reuse: Option<f64>,

    /// Prefer known values with a high severity
    #[arg(long)]
    pub bad: bool,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replace the graph with freshly generated observations
    Generate(GenerationArgs),

    /// Add observations to the current graph
    Append(GenerationArgs),

    /// Pin the fields of one observation to a canvas position
    Pin {
        /// Observation uuid
        #[arg(long, conflicts_with = "index")]
        uuid: Option<Uuid>,

        /// Observation position in the history
        #[arg(long)]
        index: Option<usize>,

        #[arg(short, allow_negative_numbers = true)]
        x: f64,

        #[arg(short, allow_negative_numbers = true)]
        y: f64,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Append on a timer until the cycle limit or Ctrl+C
    Play {
        /// Number of cycles to run
        #[arg(long, default_value = "5")]
        cycles: usize,

        /// Delay between cycles in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Observations per cycle
        #[arg(short, long)]
        batch: Option<usize>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the current graph
    Show {
        /// Also list every observation
        #[arg(long)]
        observations: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show system information
    Info,
}

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    JsonPretty,
}

/// Command execution result
#[derive(Debug)]
pub struct CommandResult {
    pub success: bool,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// Execute CLI commands against one session
pub struct CommandExecutor {
    session: GraphSession,
}

impl CommandExecutor {
    pub fn new(config: EngineConfig, seed: Option<u64>) -> Result<Self> {
        let session = match seed {
            Some(seed) => GraphSession::seeded(config, seed)?,
            None => GraphSession::from_entropy(config)?,
        };
        Ok(Self { session })
    }

    /// Build an executor from the global `--config` and `--seed` options
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => {
                info!(path = %path.display(), "loading engine configuration");
                EngineConfig::from_json_file(path)?
            }
            None => EngineConfig::default(),
        };
        Self::new(config, cli.seed)
    }

    pub fn session(&self) -> &GraphSession {
        &self.session
    }

    /// Execute a CLI command
    pub async fn execute(&mut self, command: Commands) -> Result<CommandResult> {
        match command {
            Commands::Generate(args) => self.execute_generate(args, false),
            Commands::Append(args) => self.execute_generate(args, true),
            Commands::Pin { uuid, index, x, y, format } => self.execute_pin(uuid, index, x, y, format),
            Commands::Play { cycles, interval_ms, batch, format } => {
                self.execute_play(cycles, interval_ms, batch, format).await
            }
            Commands::Show { observations, format } => self.execute_show(observations, format),
            Commands::Info => self.execute_info(),
        }
    }

    fn options_from(&self, args: &GenerationArgs) -> GenerateOptions {
        let mut options = self.session.options();
        if let Some(reuse) = args.reuse {
            options.reuse_probability = reuse;
        }
        options.try_to_be_bad = args.bad;
        options
    }

    fn execute_generate(&mut self, args: GenerationArgs, append: bool) -> Result<CommandResult> {
        let count = args.count.unwrap_or(self.session.config().batch_size);
        let options = self.options_from(&args);

        let snapshot = if append {
            self.session.append_with(count, options)?
        } else {
            self.session.generate_with(count, options)?
        };

        let verb = if append { "Appended" } else { "Generated" };
        let headline = format!("{} {} observations", verb, count);
        let message = render(args.format, &headline, snapshot, false)?;

        Ok(CommandResult {
            success: true,
            message,
            data: Some(json!({ "count": count, "summary": snapshot.summary() })),
        })
    }

    fn execute_pin(
        &mut self,
        uuid: Option<Uuid>,
        index: Option<usize>,
        x: f64,
        y: f64,
        format: OutputFormat,
    ) -> Result<CommandResult> {
        let target = match (uuid, index) {
            (Some(uuid), _) => uuid,
            (None, Some(index)) => self
                .session
                .state()
                .observations
                .get(index)
                .map(|o| o.uuid)
                .ok_or_else(|| anyhow!("no observation at index {}", index))?,
            (None, None) => return Err(anyhow!("either --uuid or --index must be specified")),
        };

        let snapshot = self.session.pin_observation(target, x, y)?;
        let headline = format!("Pinned observation {} at ({}, {})", target, x, y);
        let message = render(format, &headline, snapshot, false)?;

        Ok(CommandResult {
            success: true,
            message,
            data: Some(json!({ "observation": target, "summary": snapshot.summary() })),
        })
    }

    async fn execute_play(
        &mut self,
        cycles: usize,
        interval_ms: Option<u64>,
        batch: Option<usize>,
        format: OutputFormat,
    ) -> Result<CommandResult> {
        let mut settings = AutoplaySettings::from(&self.session.config().autoplay);
        settings.max_cycles = Some(cycles);
        if let Some(interval_ms) = interval_ms {
            settings.interval = std::time::Duration::from_millis(interval_ms);
        }
        if let Some(batch) = batch {
            settings.batch_size = batch;
        }

        let (tx, rx) = watch::channel(Mode::Auto);
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, finishing the current cycle");
                let _ = tx.send(Mode::Manual);
            }
        });

        let completed = run_autoplay(&mut self.session, rx, settings, |snapshot| {
            if format == OutputFormat::Text {
                println!("{}", snapshot.summary());
            }
        })
        .await;
        interrupt.abort();
        let completed = completed?;
        self.session.set_mode(Mode::Manual);

        let headline = format!("Played {} cycles", completed);
        let message = render(format, &headline, self.session.snapshot(), false)?;

        Ok(CommandResult {
            success: true,
            message,
            data: Some(json!({ "cycles": completed, "summary": self.session.snapshot().summary() })),
        })
    }

    fn execute_show(&self, observations: bool, format: OutputFormat) -> Result<CommandResult> {
        let snapshot = self.session.snapshot();
        let headline = format!("Mode: {}", self.session.mode());
        let message = render(format, &headline, snapshot, observations)?;

        Ok(CommandResult {
            success: true,
            message,
            data: Some(json!({ "mode": self.session.mode(), "summary": snapshot.summary() })),
        })
    }

    fn execute_info(&self) -> Result<CommandResult> {
        let info = json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "description": env!("CARGO_PKG_DESCRIPTION"),
            "authors": env!("CARGO_PKG_AUTHORS"),
            "repository": env!("CARGO_PKG_REPOSITORY"),
            "config": self.session.config(),
            "features": ["generate", "append", "pin", "autoplay", "interactive"]
        });

        Ok(CommandResult {
            success: true,
            message: serde_json::to_string_pretty(&info)?,
            data: Some(info),
        })
    }
}

/// Format a snapshot for printing
pub fn render(
    format: OutputFormat,
    headline: &str,
    snapshot: &GraphSnapshot,
    list_observations: bool,
) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(snapshot)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(snapshot)?),
        OutputFormat::Text => {
            let mut out = String::new();
            writeln!(out, "{}", headline)?;
            writeln!(out, "  {}", snapshot.summary())?;

            for node in &snapshot.field_nodes {
                let pinned = snapshot
                    .state
                    .fields
                    .get(&node.label)
                    .is_some_and(|f| f.is_custom());
                writeln!(
                    out,
                    "  [{}] {} count={} r={:.1}{}",
                    node.field_type,
                    node.label,
                    node.count,
                    node.r,
                    if pinned { " (pinned)" } else { "" }
                )?;
            }

            if list_observations {
                for (i, o) in snapshot.state.observations.iter().enumerate() {
                    writeln!(
                        out,
                        "  {:>4} {} {} sev={:<2} {} -> {} user={}",
                        i,
                        o.uuid,
                        o.start_date.format("%Y-%m-%d %H:%M:%S"),
                        o.severity,
                        o.source_ip,
                        o.dest_ip,
                        o.username
                    )?;
                }
            }
            Ok(out.trim_end().to_string())
        }
    }
}
