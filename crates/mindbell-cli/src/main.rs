use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "mindbell", version, about = "Mindfulness bell")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Activate the bell and schedule the first ring
    On,
    /// Deactivate the bell
    Off,
    /// Print the next ring time as JSON
    Next {
        /// Reference time (RFC 3339), defaults to now
        #[arg(long)]
        now: Option<String>,
    },
    /// Print the persisted schedule
    Status,
    /// Fire the pending alarm and advance the schedule
    Tick {
        /// Reference time (RFC 3339), defaults to now
        #[arg(long)]
        now: Option<String>,
        /// Do not ring, only advance the schedule
        #[arg(long)]
        silent: bool,
    },
    /// Meditation sessions
    Meditate {
        #[command(subcommand)]
        action: commands::meditate::MeditateAction,
    },
    /// Mute the bell manually
    Mute {
        #[command(subcommand)]
        action: commands::mute::MuteAction,
    },
    /// End a manual mute
    Unmute,
    /// Ring the bell now
    Ring {
        /// Wait until the ring has finished
        #[arg(long)]
        wait: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_logging() {
    let filter = std::env::var("MINDBELL_LOG")
        .ok()
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Commands::On => commands::schedule::activate(),
        Commands::Off => commands::schedule::deactivate(),
        Commands::Next { now } => commands::schedule::next(now.as_deref()),
        Commands::Status => commands::schedule::status(),
        Commands::Tick { now, silent } => commands::schedule::tick(now.as_deref(), silent),
        Commands::Meditate { action } => commands::meditate::run(action),
        Commands::Mute { action } => commands::mute::run(action),
        Commands::Unmute => commands::mute::unmute(),
        Commands::Ring { wait } => commands::ring::run(wait),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
