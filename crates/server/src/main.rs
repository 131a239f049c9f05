mod api;
mod bootstrap;
mod console;
mod health;

use anyhow::Result;
use parley_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use parley_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config)?;

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    let router = api::router(app.state.clone()).merge(health::router());

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    tracing::info!(
        event_name = "system.server.started",
        bind_address = %address,
        console_enabled = app.config.console.enabled,
        "parley gateway started"
    );

    if app.config.console.enabled {
        let console_task = tokio::spawn(console::run(console::ConsoleOptions {
            gateway_url: format!("http://{address}/"),
            session_id: app.config.console.session_id.clone(),
        }));

        // Either signal ends the process: ctrl-c, or the console user typing
        // `exit`.
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = console_task => {}
        }
    } else {
        tokio::signal::ctrl_c().await?;
    }

    tracing::info!(event_name = "system.server.stopping", "parley gateway stopping");
    let _ = shutdown_tx.send(());
    server.await??;

    Ok(())
}
