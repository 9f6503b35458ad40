use clap::Parser;
use skillet::config::Args;
use skillet::{Application, Config, telemetry};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    let args = Args::parse();
    let config = Config::load(&args)?;
    config.validate()?;

    if args.validate {
        println!("Configuration file {} is valid", args.config);
        return Ok(());
    }

    telemetry::init_telemetry(&config)?;

    let app = Application::new(config)?;
    app.serve(shutdown_signal()).await?;

    telemetry::shutdown_telemetry();

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM so the server can drain in-flight requests.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
