use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "heatlog", version, about = "Water heater pre-heat advisor")]
struct Cli {
    /// Log pipeline details to stderr (overridden by HEATLOG_LOG)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend a heating time
    Predict(commands::predict::PredictArgs),
    /// Record how a shower felt
    Feedback(commands::feedback::FeedbackArgs),
    /// Show recorded observations
    History(commands::history::HistoryArgs),
    /// Delete observations
    Delete(commands::delete::DeleteArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Replay a synthetic owner to check convergence
    Simulate(commands::simulate::SimulateArgs),
}

fn init_logging(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "heatlog_core=debug,heatlog=debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_env("HEATLOG_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Predict(args) => commands::predict::run(args),
        Commands::Feedback(args) => commands::feedback::run(args),
        Commands::History(args) => commands::history::run(args),
        Commands::Delete(args) => commands::delete::run(args),
        Commands::Config { action } => commands::config::run(action),
        Commands::Simulate(args) => commands::simulate::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
