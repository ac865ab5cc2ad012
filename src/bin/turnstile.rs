//! Turnstile scenario runner (feature-gated).

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;
use turnstile::harness::{
    run_dining, run_phased_barrier, run_producer_consumer, run_rendezvous, BarrierReport,
    QueueReport, RendezvousReport, RingReport,
};
use turnstile::{ConfigError, HarnessConfig};

/// Exit code for rejected configuration.
const EXIT_CONFIG: i32 = 2;
/// Exit code for a scenario whose report shows a broken invariant.
const EXIT_INVARIANT: i32 = 3;

#[derive(Parser, Debug)]
#[command(
    name = "turnstile",
    version,
    about = "Run classical semaphore synchronization scenarios"
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgsCli,

    #[command(flatten)]
    overrides: OverrideArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct CommonArgsCli {
    /// Output format: human, json, json-pretty
    #[arg(short = 'f', long = "format", value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbosity: u8,

    /// Suppress per-actor log lines
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue)]
    quiet: bool,
}

/// Flags that take precedence over `TURNSTILE_*` variables.
#[derive(Args, Debug, Default)]
struct OverrideArgs {
    /// Maximum random delay per step, in milliseconds
    #[arg(long = "max-delay-ms", global = true)]
    max_delay_ms: Option<u64>,

    /// Seed for the per-actor delay streams
    #[arg(long = "seed", global = true)]
    seed: Option<u64>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Human,
    Json,
    JsonPretty,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Producers and consumers over one bounded queue
    Queue(QueueArgs),

    /// Actors contending for neighbouring resources around a ring
    Ring(RingArgs),

    /// Single-use meeting point for N actors
    Rendezvous(RendezvousArgs),

    /// N actors stepping through phases of a reusable barrier
    Barrier(BarrierArgs),
}

#[derive(Args, Debug)]
struct QueueArgs {
    /// Queue capacity
    #[arg(long = "capacity")]
    capacity: Option<usize>,

    /// Number of producer threads
    #[arg(long = "producers")]
    producers: Option<usize>,

    /// Number of consumer threads
    #[arg(long = "consumers")]
    consumers: Option<usize>,

    /// Events put by each producer
    #[arg(long = "items")]
    items: Option<usize>,
}

#[derive(Args, Debug)]
struct RingArgs {
    /// Number of actors (and resources)
    #[arg(short = 'n', long = "participants")]
    participants: Option<usize>,

    /// Think/eat cycles per actor
    #[arg(long = "iterations")]
    iterations: Option<usize>,
}

#[derive(Args, Debug)]
struct RendezvousArgs {
    /// Number of actors
    #[arg(short = 'n', long = "participants")]
    participants: Option<usize>,
}

#[derive(Args, Debug)]
struct BarrierArgs {
    /// Number of actors
    #[arg(short = 'n', long = "participants")]
    participants: Option<usize>,

    /// Barrier phases
    #[arg(long = "phases")]
    phases: Option<usize>,
}

trait Outputtable: Serialize {
    fn human_format(&self) -> String;

    /// Whether the report satisfies its pattern's invariant.
    fn holds(&self) -> bool;
}

impl Outputtable for QueueReport {
    fn human_format(&self) -> String {
        [
            format!("Capacity: {}", self.capacity),
            format!("Produced: {}", self.produced),
            format!("Consumed: {}", self.consumed),
            format!("Duplicates: {}", self.duplicates),
            format!("Missing: {}", self.missing),
            format!("Peak length: {}", self.peak_len),
            format!("Elapsed: {} ms", self.elapsed_ms),
        ]
        .join("\n")
    }

    fn holds(&self) -> bool {
        self.is_consistent()
    }
}

impl Outputtable for RingReport {
    fn human_format(&self) -> String {
        let mut lines = vec![
            format!("Participants: {}", self.participants),
            format!("Reversed participant: {}", self.reversed_participant),
            format!("Iterations: {}", self.iterations),
        ];
        for (actor, meals) in self.meals.iter().enumerate() {
            lines.push(format!("  actor {actor}: {meals} meals"));
        }
        lines.push(format!("Elapsed: {} ms", self.elapsed_ms));
        lines.join("\n")
    }

    fn holds(&self) -> bool {
        self.is_complete()
    }
}

impl Outputtable for RendezvousReport {
    fn human_format(&self) -> String {
        let verdict = if self.is_ordered() {
            "every part A preceded every part B"
        } else {
            "ORDER VIOLATED"
        };
        [
            format!("Participants: {}", self.participants),
            format!("Last part A: #{}", self.last_part_a),
            format!("First part B: #{}", self.first_part_b),
            format!("Result: {verdict}"),
            format!("Elapsed: {} ms", self.elapsed_ms),
        ]
        .join("\n")
    }

    fn holds(&self) -> bool {
        self.is_ordered()
    }
}

impl Outputtable for BarrierReport {
    fn human_format(&self) -> String {
        [
            format!("Participants: {}", self.participants),
            format!("Generations: {}", self.generations),
            format!("Leaders per generation: {:?}", self.leaders_per_generation),
            format!("Early departures: {}", self.early_departures),
            format!("Elapsed: {} ms", self.elapsed_ms),
        ]
        .join("\n")
    }

    fn holds(&self) -> bool {
        self.is_consistent()
    }
}

fn init_logging(common: &CommonArgsCli) {
    let default_level = if common.quiet {
        "warn"
    } else {
        match common.verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("turnstile={default_level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_thread_ids(common.verbosity > 0)
        .with_target(false)
        .try_init();
}

fn resolve_config(cli: &Cli) -> Result<HarnessConfig, ConfigError> {
    let mut config = HarnessConfig::from_env()?;
    if let Some(max_delay_ms) = cli.overrides.max_delay_ms {
        config.max_delay_ms = max_delay_ms;
    }
    if let Some(seed) = cli.overrides.seed {
        config.seed = seed;
    }
    match &cli.command {
        Command::Queue(args) => {
            config.capacity = args.capacity.unwrap_or(config.capacity);
            config.producers = args.producers.unwrap_or(config.producers);
            config.consumers = args.consumers.unwrap_or(config.consumers);
            config.items_per_producer = args.items.unwrap_or(config.items_per_producer);
        }
        Command::Ring(args) => {
            config.participants = args.participants.unwrap_or(config.participants);
            config.iterations = args.iterations.unwrap_or(config.iterations);
        }
        Command::Rendezvous(args) => {
            config.participants = args.participants.unwrap_or(config.participants);
        }
        Command::Barrier(args) => {
            config.participants = args.participants.unwrap_or(config.participants);
            config.phases = args.phases.unwrap_or(config.phases);
        }
    }
    Ok(config)
}

fn emit<R: Outputtable>(report: &R, format: OutputFormat) -> io::Result<bool> {
    let mut stdout = io::stdout().lock();
    match format {
        OutputFormat::Human => writeln!(stdout, "{}", report.human_format())?,
        OutputFormat::Json => {
            serde_json::to_writer(&mut stdout, report)?;
            writeln!(stdout)?;
        }
        OutputFormat::JsonPretty => {
            serde_json::to_writer_pretty(&mut stdout, report)?;
            writeln!(stdout)?;
        }
    }
    Ok(report.holds())
}

fn run(command: &Command, config: &HarnessConfig, format: OutputFormat) -> Result<bool, String> {
    let outcome = match command {
        Command::Queue(_) => run_producer_consumer(config).map(|r| emit(&r, format)),
        Command::Ring(_) => run_dining(config).map(|r| emit(&r, format)),
        Command::Rendezvous(_) => run_rendezvous(config).map(|r| emit(&r, format)),
        Command::Barrier(_) => run_phased_barrier(config).map(|r| emit(&r, format)),
    };
    match outcome {
        Ok(written) => written.map_err(|err| format!("failed to write output: {err}")),
        Err(err) => Err(err.to_string()),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.common);

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            eprintln!("error: {err}");
            std::process::exit(EXIT_CONFIG);
        }
    };
    tracing::debug!(?config, "resolved configuration");

    match run(&cli.command, &config, cli.common.format) {
        Ok(true) => {}
        Ok(false) => std::process::exit(EXIT_INVARIANT),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(EXIT_CONFIG);
        }
    }
}
