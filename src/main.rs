//! r0n-geolb binary entry point.

use clap::Parser;
use r0n_geolb::config::ConfigLoader;
use r0n_geolb::gateway::Gateway;
use r0n_geolb::logging;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "r0n-geolb",
    version,
    about = "Self-electing, geography-aware HTTP load balancer"
)]
struct Cli {
    /// Configuration file. Defaults apply when it does not exist.
    #[arg(short, long, default_value = "geolb.toml")]
    config: PathBuf,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let deployment = match ConfigLoader::with_default_validators().load_or_default(&cli.config) {
        Ok(deployment) => deployment,
        Err(e) => {
            eprintln!("r0n-geolb: {e}");
            return ExitCode::FAILURE;
        },
    };

    if cli.check {
        println!(
            "{}: configuration is valid ({} backends, advertising {})",
            deployment.source(),
            deployment.directory().len(),
            deployment.advertise_address()
        );
        return ExitCode::SUCCESS;
    }

    if let Err(e) = logging::init(&deployment.config().logging) {
        eprintln!("r0n-geolb: failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    info!(version = env!("CARGO_PKG_VERSION"), config = %deployment.source(), "r0n-geolb starting");

    let gateway = match Gateway::new(deployment) {
        Ok(gateway) => gateway,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        },
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    match gateway.run(shutdown_rx).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        },
    }
}

/// Resolve on Ctrl-C or, on Unix, SIGTERM.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
                return;
            },
            Err(e) => error!("Failed to install SIGTERM handler: {e}"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}
