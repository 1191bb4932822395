use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use warrant_core::LogConfig;
use warrant_server::WarrantServer;
use warrant_server::bootstrap::{self, DEFAULT_REPO};

/// Warrant credential authority server.
#[derive(Parser, Debug)]
#[command(name = "warrant-server", version, about)]
struct Cli {
    /// Repo directory holding config.toml and the data directory.
    #[arg(long, env = "WARRANT_HOME", default_value = DEFAULT_REPO)]
    repo: PathBuf,

    /// Config file path (defaults to <repo>/config.toml).
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Override the configured listen address.
    #[arg(long)]
    listen: Option<String>,

    /// Override the configured signing secret (base64).
    #[arg(long, env = "WARRANT_SECRET", hide_env_values = true)]
    secret: Option<String>,
}

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut boot = bootstrap::prepare(&cli.repo, cli.config.as_deref())
        .context("failed to prepare repo directory")?;
    init_tracing(&boot.config.log);

    if boot.created_config {
        tracing::info!(path = %boot.config_path.display(), "Wrote default configuration");
    }
    if let Some(listen) = cli.listen {
        boot.config.listen = listen;
    }
    if let Some(secret) = cli.secret {
        boot.config.secret = secret;
    }

    tracing::info!(
        repo = %boot.repo.display(),
        backend = ?boot.config.store.backend,
        "Loaded configuration"
    );

    let service = bootstrap::build_service(&boot.config, &boot.data_dir)?;
    WarrantServer::new(&boot.config, service).run().await
}
