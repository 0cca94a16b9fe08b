//! Scene Music Server - plays VLC background music for designated OBS scenes.
//!
//! Runs headless next to OBS. Music starts when a configured scene (or a
//! configured kind of audio source in the visible scene) goes on program and
//! fades out when it leaves.

mod config;

use std::path::PathBuf;
#[cfg(unix)]
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
#[cfg(unix)]
use scenemusic_core::Controller;
use scenemusic_core::{bootstrap_services, start_server};
use tokio::signal;

use crate::config::ServerConfig;

/// Scene Music Server - OBS scene driven VLC background music.
#[derive(Parser, Debug)]
#[command(name = "scenemusic-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE", env = "SCENEMUSIC_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "SCENEMUSIC_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// OBS websocket URL (overrides config file).
    #[arg(long, value_name = "URL")]
    obs_url: Option<String>,

    /// OBS websocket password (overrides config file).
    #[arg(long, value_name = "PASSWORD")]
    obs_password: Option<String>,

    /// Status API port (overrides config file).
    #[arg(short = 'p', long)]
    status_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Scene Music Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(url) = args.obs_url {
        config.obs.url = Some(url);
    }
    if let Some(password) = args.obs_password {
        config.obs.password = Some(password);
    }
    if let Some(port) = args.status_port {
        config.status_port = Some(port);
    }

    log::info!(
        "Configuration: obs={}, vlc={}:{}, {} music scenes, {} music source kinds",
        config.obs.url.as_deref().unwrap_or("auto"),
        config.vlc.host,
        config.vlc.port,
        config.music.scenes_with_music.len(),
        config.music.source_kinds_with_music.len()
    );
    if config.music.is_empty() {
        log::warn!("No music scenes or source kinds configured - music will never play");
    }

    let core_config = config.to_core_config();
    let services = bootstrap_services(&core_config).context("Failed to bootstrap services")?;

    log::info!("Services bootstrapped successfully");

    let server_handle = config.status_port.map(|port| {
        let app_state = services.app_state();
        let cancel = services.cancel_token.clone();
        tokio::spawn(async move {
            if let Err(e) = start_server(app_state, port, cancel).await {
                log::error!("Status server error: {}", e);
            }
        })
    });

    let mut controller_handle = services.start_background_tasks();

    #[cfg(unix)]
    {
        if let Some(path) = args.config.clone() {
            tokio::spawn(reload_on_hangup(path, Arc::clone(&services.controller)));
        }
    }

    log::info!("Background tasks started");

    // Wait for shutdown signal or for the controller to give up
    let failure = tokio::select! {
        _ = shutdown_signal() => {
            log::info!("Shutdown signal received, cleaning up...");
            None
        }
        joined = &mut controller_handle => match joined {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(anyhow!(e).context("Controller stopped")),
            Err(e) => Some(anyhow!(e).context("Controller task failed")),
        },
    };

    // Graceful shutdown
    services.shutdown().await;

    if let Some(handle) = server_handle {
        handle.abort();
    }

    if let Some(e) = failure {
        log::error!("{:#}", e);
        return Err(e);
    }

    log::info!("Shutdown complete");
    Ok(())
}

/// Reloads the configuration file on SIGHUP and applies its music selection.
///
/// Connection and player settings need a restart.
#[cfg(unix)]
async fn reload_on_hangup(path: PathBuf, controller: Arc<Controller>) {
    let mut hangup = match signal::unix::signal(signal::unix::SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            log::warn!("Failed to install SIGHUP handler, reload disabled: {}", e);
            return;
        }
    };

    while hangup.recv().await.is_some() {
        log::info!("SIGHUP received, reloading {}", path.display());
        match ServerConfig::load(Some(&path)) {
            Ok(config) => controller.update_selection(config.music).await,
            Err(e) => log::error!("Keeping current configuration: {:#}", e),
        }
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
