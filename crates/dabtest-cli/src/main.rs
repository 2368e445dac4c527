//! `dabtest`: DAB conformance batches against a device over MQTT.

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "dabtest", version, about = "DAB device conformance tester")]
struct Cli {
    /// Print informational output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Print debug output
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run conformance cases against a device
    Run(commands::run_cmd::RunCommand),
    /// List the cases in the catalog
    List(commands::list_cmd::ListCommand),
    /// Inspect a device's advertised operations without running cases
    Check(commands::check_cmd::CheckCommand),
    /// Show the configuration file, creating it first when missing
    Config(commands::config_cmd::ConfigCommand),
}

pub(crate) fn init_basic_tracing(verbose: bool, debug: bool) {
    let default = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let (verbose, debug) = (cli.verbose, cli.debug);
    let outcome = match cli.command {
        Commands::Run(cmd) => commands::run_cmd::execute(cmd, verbose, debug).await,
        Commands::List(cmd) => commands::list_cmd::execute(cmd, verbose, debug),
        Commands::Check(cmd) => commands::check_cmd::execute(cmd, verbose, debug).await,
        Commands::Config(cmd) => commands::config_cmd::execute(cmd, verbose, debug),
    };
    let code = match outcome {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            2
        }
    };
    std::process::exit(code);
}
