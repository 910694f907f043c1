use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tempora::error::{Result, TemporaError};
use tempora::{AppConfig, Launcher};

/// Temporal sampling controller for A3C training on simulated market data
#[derive(Debug, Parser)]
#[command(name = "tempora", version)]
struct Cli {
    /// Config directory (default.toml plus TEMPORA_ENV overlay)
    #[arg(long, default_value = "config")]
    config: std::path::PathBuf,

    /// Override the worker count (task 0 is the chief)
    #[arg(long)]
    workers: Option<usize>,

    /// Override process() invocations per worker
    #[arg(long)]
    episodes: Option<usize>,

    /// Override the simulated feed seed
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_from(&cli.config)?;
    if let Some(workers) = cli.workers {
        config.launcher.num_workers = workers;
    }
    if let Some(episodes) = cli.episodes {
        config.launcher.episodes_per_worker = episodes;
    }
    if let Some(seed) = cli.seed {
        config.sim.seed = seed;
    }

    init_logging(&config.logging.level);

    config
        .validate()
        .map_err(|errors| TemporaError::InvalidConfig(errors.join("; ")))?;

    let launcher = Launcher::new(config)?;
    tokio::select! {
        result = launcher.run() => {
            let report = result?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
        }
    }

    Ok(())
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},tempora=debug")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
