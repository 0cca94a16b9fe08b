//! Owns the single player process.
//!
//! # Lifecycle
//!
//! ```text
//! NoProcess -> Starting -> Running -> Stopping -> NoProcess
//!                 |
//!                 +-> NoProcess (spawn failed)
//! ```
//!
//! The slot lock is held while a process starts, so concurrent callers share
//! one instance. A watcher clears the slot when the process exits on its own.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{PlayerError, PlayerResult};
use crate::protocol_constants::VLC_READINESS_POLL_MS;
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::services::cancel_scope::CancelScope;
use crate::services::playback_session::{PlaybackSession, SessionSettings};
use crate::services::resolver::PlayAction;
use crate::vlc::{PlayerControl, PlayerLauncher, ProcessHandle};

/// A running player process and its session state.
pub struct PlayerInstance {
    id: u64,
    pub session: PlaybackSession,
    pub process: ProcessHandle,
}

impl PlayerInstance {
    pub fn id(&self) -> u64 {
        self.id
    }
}

pub struct PlaybackLifecycleManager {
    launcher: Arc<dyn PlayerLauncher>,
    player: Arc<dyn PlayerControl>,
    settings: Arc<SessionSettings>,
    slot: Mutex<Option<Arc<PlayerInstance>>>,
    scope: CancelScope,
    next_id: AtomicU64,
    startup_timeout: Duration,
    spawner: TokioSpawner,
}

impl PlaybackLifecycleManager {
    pub fn new(
        launcher: Arc<dyn PlayerLauncher>,
        player: Arc<dyn PlayerControl>,
        settings: SessionSettings,
        startup_timeout: Duration,
        spawner: TokioSpawner,
    ) -> Arc<Self> {
        Arc::new(Self {
            launcher,
            player,
            settings: Arc::new(settings),
            slot: Mutex::new(None),
            scope: CancelScope::new(),
            next_id: AtomicU64::new(1),
            startup_timeout,
            spawner,
        })
    }

    /// Starts a new request, cancelling the one before it.
    pub fn begin_request(&self) -> CancellationToken {
        self.scope.begin()
    }

    /// Returns the running instance, starting one if needed.
    pub async fn ensure_started(self: &Arc<Self>) -> PlayerResult<Arc<PlayerInstance>> {
        let mut slot = self.slot.lock().await;
        if let Some(instance) = slot.as_ref() {
            if !instance.process.has_exited() {
                return Ok(Arc::clone(instance));
            }
        }

        log::info!("[Playback] Starting player");
        let process = self.launcher.launch().await?;
        let instance = Arc::new(PlayerInstance {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            session: PlaybackSession::new(Arc::clone(&self.player), Arc::clone(&self.settings)),
            process,
        });
        self.wait_until_ready(&instance.process).await;

        *slot = Some(Arc::clone(&instance));
        self.watch_exit(&instance);
        Ok(instance)
    }

    /// Plays `action`, starting the player if needed.
    pub async fn play(self: &Arc<Self>, token: &CancellationToken, action: &PlayAction) -> PlayerResult<()> {
        if token.is_cancelled() {
            return Err(PlayerError::Cancelled);
        }
        let instance = self.ensure_started().await?;
        instance.session.play(token, action).await
    }

    /// Stops playback. Without a running player this does nothing.
    pub async fn stop(&self, token: &CancellationToken) -> PlayerResult<()> {
        match self.running().await {
            Some(instance) => instance.session.stop(token).await,
            None => {
                log::debug!("[Playback] No player running, nothing to stop");
                Ok(())
            }
        }
    }

    /// Stops playback, then closes the player process.
    ///
    /// A cancelled stop aborts the close and keeps the process.
    pub async fn ensure_closed(&self, token: &CancellationToken) -> PlayerResult<()> {
        match self.stop(token).await {
            Err(PlayerError::Cancelled) => return Err(PlayerError::Cancelled),
            Err(e) => log::warn!("[Playback] Stop before close failed: {}", e),
            Ok(()) => {}
        }

        let taken = {
            let mut slot = self.slot.lock().await;
            if token.is_cancelled() {
                return Err(PlayerError::Cancelled);
            }
            slot.take()
        };

        if let Some(instance) = taken {
            dispose(&instance).await;
        }
        Ok(())
    }

    /// Cancels in-flight requests and closes the player without fading.
    pub async fn shutdown(&self) {
        self.scope.cancel_all();
        let taken = self.slot.lock().await.take();
        if let Some(instance) = taken {
            dispose(&instance).await;
        }
    }

    /// The live instance, if any.
    pub async fn running(&self) -> Option<Arc<PlayerInstance>> {
        self.slot
            .lock()
            .await
            .as_ref()
            .filter(|instance| !instance.process.has_exited())
            .cloned()
    }

    /// Polls the control endpoint until it answers or the timeout passes.
    async fn wait_until_ready(&self, process: &ProcessHandle) {
        let deadline = Instant::now() + self.startup_timeout;
        loop {
            if self.player.status().await.is_ok() {
                log::debug!("[Playback] Player control interface is up");
                return;
            }
            if process.has_exited() {
                log::warn!("[Playback] Player exited during startup");
                return;
            }
            if Instant::now() >= deadline {
                log::warn!(
                    "[Playback] Player did not answer within {:?}",
                    self.startup_timeout
                );
                return;
            }
            tokio::time::sleep(Duration::from_millis(VLC_READINESS_POLL_MS)).await;
        }
    }

    fn watch_exit(self: &Arc<Self>, instance: &PlayerInstance) {
        let manager: Weak<Self> = Arc::downgrade(self);
        let exited = instance.process.exited_token();
        let id = instance.id;

        self.spawner.spawn(async move {
            exited.cancelled().await;
            let Some(manager) = manager.upgrade() else {
                return;
            };
            let mut slot = manager.slot.lock().await;
            if slot.as_ref().is_some_and(|current| current.id == id) {
                *slot = None;
                log::info!("[Playback] Player process exited");
            }
        });
    }
}

async fn dispose(instance: &PlayerInstance) {
    if instance.process.has_exited() {
        return;
    }
    log::info!("[Playback] Closing player");
    instance.process.close().await;
}
