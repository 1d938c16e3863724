use std::path::PathBuf;
use std::process::ExitCode;

use brentscope_core::BrentscopeConfig;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Serve the brentscope datasets to the dashboard.
#[derive(Debug, Parser)]
#[command(name = "brentscope-web", version, about)]
struct Args {
    /// JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the CSV datasets.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// Reload the datasets every N seconds.
    #[arg(long)]
    refresh_secs: Option<u64>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("brentscope=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    let mut config = match BrentscopeConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            return ExitCode::from(2);
        }
    };
    if let Some(dir) = args.data_dir {
        config.data.data_dir = dir;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.refresh_secs.is_some() {
        config.server.refresh_secs = args.refresh_secs;
    }

    match brentscope_web::serve(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "server stopped");
            ExitCode::FAILURE
        }
    }
}
