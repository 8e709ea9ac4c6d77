//! Dilemma Machine - game backend entry point

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dilemma_machine::cli::{Cli, Commands};
use dilemma_machine::commands;
use dilemma_machine::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Initialize tracing once the environment and log format are known
    init_tracing(&config, cli.verbose);

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Serve { .. } => {
            commands::serve::run_serve(config).await?;
            Ok(())
        }
        Commands::Stats { dilemma_id, json } => {
            tracing::debug!("Showing stats for dilemma: {}", dilemma_id);
            tokio::task::spawn_blocking(move || {
                commands::stats::show_dilemma_stats(&config, &dilemma_id, json)
            })
            .await??;
            Ok(())
        }
        Commands::Summary { session_id, json } => {
            tracing::debug!("Showing summary for session: {}", session_id);
            tokio::task::spawn_blocking(move || {
                commands::stats::show_session_summary(&config, &session_id, json)
            })
            .await??;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins when set; otherwise production logs at info and every
/// other environment (or `--verbose`) at debug. Logs go to stderr so the
/// `--json` command output stays parseable.
fn init_tracing(config: &Config, verbose: bool) {
    let default_level = if config.app.is_production() && !verbose {
        "dilemma_machine=info"
    } else {
        "dilemma_machine=debug"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.logging.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
