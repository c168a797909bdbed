use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use a3s_sentinel::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    match cli.command {
        Commands::Serve(args) => {
            let config = args.resolve()?;
            let shutdown = CancellationToken::new();

            let signal = shutdown.clone();
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                    return;
                }
                tracing::info!("Shutdown requested");
                signal.cancel();
            });

            println!("A3S Sentinel starting...");
            println!("Streaming on ws://{}/ws", config.bind_address());
            println!("Press Ctrl+C to stop");

            let report = a3s_sentinel::server::start(config, shutdown).await?;
            println!(
                "Produced {} events ({} persisted, {} persistence failures)",
                report.produced, report.persisted, report.persist_failures
            );
        }
        Commands::Config(args) => {
            let config = args.resolve()?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
