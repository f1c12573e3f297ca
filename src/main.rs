use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use taskdeck::cli::Cli;
use taskdeck::config::Config;

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("taskdeck=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging();

    let config = match Config::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    info!(url = %config.url, table = %config.table, "config loaded");

    if let Err(e) = taskdeck::app::run(cli.command, config).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
