//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root - the single place where all
//! services are instantiated and wired together.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::AppState;
use crate::error::{SceneMusicError, SceneMusicResult};
use crate::obs::{CompositorClient, CompositorQueries, ObsWebSocketClient};
use crate::protocol_constants::VLC_HTTP_TIMEOUT_SECS;
use crate::runtime::TokioSpawner;
use crate::services::{
    Controller, PlaybackLifecycleManager, RemoteStateCache, SessionSettings, StateSync,
};
use crate::state::{Config, ControllerState};
use crate::utils::generate_password;
use crate::vlc::{PlayerControl, PlayerLauncher, VlcHttpClient, VlcLauncher};

/// Container for all bootstrapped services.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// OBS websocket client.
    pub obs: Arc<ObsWebSocketClient>,
    /// Last-known compositor state.
    pub cache: Arc<RemoteStateCache>,
    /// Owns the player process.
    pub playback: Arc<PlaybackLifecycleManager>,
    /// The controller loop.
    pub controller: Arc<Controller>,
    /// Observable controller state.
    pub controller_state: Arc<ControllerState>,
    /// Task spawner for background operations.
    pub spawner: TokioSpawner,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// State for the status API.
    pub fn app_state(&self) -> AppState {
        AppState {
            controller_state: Arc::clone(&self.controller_state),
            cache: Arc::clone(&self.cache),
        }
    }

    /// Spawns the controller loop.
    ///
    /// The handle resolves when the loop ends; an error means the service
    /// cannot continue.
    pub fn start_background_tasks(&self) -> JoinHandle<SceneMusicResult<()>> {
        log::info!("[Bootstrap] Starting controller");
        self.spawner
            .spawn_joinable(Arc::clone(&self.controller).run(self.cancel_token.clone()))
    }

    /// Initiates graceful shutdown of all services.
    pub async fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        // Signal cancellation to all background tasks
        self.cancel_token.cancel();

        self.playback.shutdown().await;
        self.obs.disconnect();

        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Bootstraps all services with proper dependency wiring.
///
/// Must be called from within a Tokio runtime.
pub fn bootstrap_services(config: &Config) -> SceneMusicResult<BootstrappedServices> {
    let spawner = TokioSpawner::current();

    let http_client = Client::builder()
        .timeout(Duration::from_secs(VLC_HTTP_TIMEOUT_SECS))
        .build()
        .map_err(|e| SceneMusicError::Internal(format!("Failed to create HTTP client: {e}")))?;

    let password = match config.vlc.password.clone() {
        Some(password) => password,
        None => {
            log::info!("[Bootstrap] Using a generated VLC HTTP password");
            generate_password()
        }
    };

    // Compositor side
    let obs = Arc::new(ObsWebSocketClient::new(spawner.clone()));
    let cache = Arc::new(RemoteStateCache::new());
    let queries: Arc<dyn CompositorQueries> = obs.clone();
    let sync = StateSync::new(queries, Arc::clone(&cache));

    // Player side
    let player: Arc<dyn PlayerControl> = Arc::new(VlcHttpClient::new(
        http_client,
        &config.vlc.host,
        config.vlc.port,
        password.clone(),
    ));
    let launcher: Arc<dyn PlayerLauncher> = Arc::new(VlcLauncher::new(
        config.vlc.clone(),
        password,
        spawner.clone(),
    ));
    let playback = PlaybackLifecycleManager::new(
        launcher,
        player,
        SessionSettings::from_config(&config.vlc),
        config.vlc.startup_timeout(),
        spawner.clone(),
    );

    let controller_state = Arc::new(ControllerState::default());
    let compositor: Arc<dyn CompositorClient> = obs.clone();
    let controller = Controller::new(
        compositor,
        sync,
        Arc::clone(&cache),
        Arc::clone(&playback),
        config.obs.clone(),
        config.music.clone(),
        Arc::clone(&controller_state),
        spawner.clone(),
    );

    Ok(BootstrappedServices {
        obs,
        cache,
        playback,
        controller,
        controller_state,
        spawner,
        cancel_token: CancellationToken::new(),
    })
}
