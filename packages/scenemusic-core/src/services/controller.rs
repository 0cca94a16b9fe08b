//! The controller loop.
//!
//! Consumes compositor notifications, keeps the [`RemoteStateCache`] current,
//! re-resolves the program scene after every relevant change and dispatches
//! the outcome to the [`PlaybackLifecycleManager`]. A second loop keeps the
//! compositor session alive.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::error::{ObsError, SceneMusicError, SceneMusicResult};
use crate::events::{CompositorEvent, Subscription};
use crate::obs::{CompositorClient, LocalObsSettings};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::services::playback_manager::PlaybackLifecycleManager;
use crate::services::resolver::{resolve, PlayAction};
use crate::services::scene_cache::RemoteStateCache;
use crate::services::state_sync::StateSync;
use crate::state::{ConnectionState, ControllerState, Decision, MusicSelection, ObsConfig};

/// Work handed to the lifecycle manager.
#[derive(Debug, Clone)]
enum PlayerRequest {
    Play { scene: String, action: PlayAction },
    Stop { scene: String },
    Close,
}

impl fmt::Display for PlayerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Play { scene, .. } => write!(f, "play ({scene})"),
            Self::Stop { scene } => write!(f, "stop ({scene})"),
            Self::Close => f.write_str("close"),
        }
    }
}

pub struct Controller {
    compositor: Arc<dyn CompositorClient>,
    sync: StateSync,
    cache: Arc<RemoteStateCache>,
    manager: Arc<PlaybackLifecycleManager>,
    obs_config: ObsConfig,
    selection: RwLock<MusicSelection>,
    status: Arc<ControllerState>,
    /// Music inputs visible in the program scene as of the last resolution.
    candidates: RwLock<HashSet<String>>,
    spawner: TokioSpawner,
}

impl Controller {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        compositor: Arc<dyn CompositorClient>,
        sync: StateSync,
        cache: Arc<RemoteStateCache>,
        manager: Arc<PlaybackLifecycleManager>,
        obs_config: ObsConfig,
        selection: MusicSelection,
        status: Arc<ControllerState>,
        spawner: TokioSpawner,
    ) -> Arc<Self> {
        Arc::new(Self {
            compositor,
            sync,
            cache,
            manager,
            obs_config,
            selection: RwLock::new(selection),
            status,
            candidates: RwLock::new(HashSet::new()),
            spawner,
        })
    }

    pub fn state(&self) -> Arc<ControllerState> {
        Arc::clone(&self.status)
    }

    /// Runs the event and connection loops until `cancel` fires.
    ///
    /// Returns an error if the compositor's notification stream ends while
    /// the controller is still supposed to run.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) -> SceneMusicResult<()> {
        let mut events = self.compositor.subscribe();
        log::info!("[Controller] Started (subscription {})", events.id());

        let result = tokio::select! {
            _ = cancel.cancelled() => Ok(()),
            result = self.event_loop(&mut events) => result,
            _ = self.connection_loop(&cancel) => Ok(()),
        };

        drop(events);
        log::info!("[Controller] Stopped");
        result
    }

    /// Replaces the music selection and re-resolves.
    pub async fn update_selection(&self, selection: MusicSelection) {
        log::info!(
            "[Controller] Music selection updated ({} scenes, {} source kinds)",
            selection.scenes_with_music.len(),
            selection.source_kinds_with_music.len()
        );
        let kinds = selection.source_kinds_with_music.clone();
        *self.selection.write() = selection;

        if self.compositor.is_connected() {
            if let Err(e) = self.sync.refresh_inputs(&kinds).await {
                log_sync_failure("refresh inputs", &e);
            }
            self.recheck();
        }
    }

    async fn event_loop(&self, events: &mut Subscription) -> SceneMusicResult<()> {
        loop {
            match events.recv().await {
                Some(event) => self.handle_event(event).await,
                None => {
                    return Err(SceneMusicError::Internal(
                        "compositor event stream closed".into(),
                    ))
                }
            }
        }
    }

    async fn connection_loop(&self, cancel: &CancellationToken) {
        loop {
            if !self.compositor.is_connected() {
                self.try_connect().await;
            }
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(self.compositor.ws_timeout()) => {}
            }
        }
    }

    async fn try_connect(&self) {
        let Some((url, password)) = self.resolve_endpoint() else {
            log::warn!("[Controller] OBS websocket URL or password not configured");
            return;
        };

        self.status.set_connection(ConnectionState::Connecting);
        match self.compositor.connect(&url, &password).await {
            Ok(()) => log::info!("[Controller] Waiting for OBS..."),
            Err(e) => {
                log::warn!("[Controller] Cannot connect to {}: {}", url, e);
                self.status.set_connection(ConnectionState::Disconnected);
            }
        }
    }

    /// Explicit configuration first, then OBS's own settings on this machine.
    fn resolve_endpoint(&self) -> Option<(String, String)> {
        let config = &self.obs_config;
        let local = if config.url.is_none() || config.password.is_none() {
            LocalObsSettings::load(config.settings_path.as_deref())
        } else {
            LocalObsSettings::default()
        };

        let url = config.url.clone().or_else(|| local.websocket_url())?;
        let password = config.password.clone().or(local.password)?;
        Some((url, password))
    }

    async fn handle_event(&self, event: CompositorEvent) {
        log::debug!("[Controller] {}", event.kind());
        match event {
            CompositorEvent::Connected => {
                self.status.set_connection(ConnectionState::Connected);
                self.resync().await;
                self.recheck();
            }
            CompositorEvent::Disconnected => {
                self.status.set_connection(ConnectionState::Disconnected);
                self.cache.clear();
                self.candidates.write().clear();
                self.status.record_decision(Decision::Close);
                self.dispatch(PlayerRequest::Close);
            }
            CompositorEvent::ActiveSceneChanged { scene_name } => {
                log::info!("[Controller] Program scene is now {}", scene_name);
                self.cache.set_active_scene(Some(scene_name));
                self.recheck();
            }
            CompositorEvent::SceneListChanged
            | CompositorEvent::SceneItemCreated { .. }
            | CompositorEvent::SceneItemRemoved { .. } => {
                if let Err(e) = self.sync.refresh_scenes().await {
                    log_sync_failure("refresh scenes", &e);
                }
                self.recheck();
            }
            CompositorEvent::SceneItemEnabledChanged {
                scene_name,
                item_id,
                enabled,
            } => {
                self.cache
                    .apply_scene_item_enabled(&scene_name, item_id, enabled);
                self.recheck();
            }
            CompositorEvent::InputCreated { input_name } => {
                self.refresh_input(&input_name).await;
                self.recheck();
            }
            CompositorEvent::InputRenamed { old_name, new_name } => {
                self.cache.remove_input(&old_name);
                self.refresh_input(&new_name).await;
                self.recheck();
            }
            CompositorEvent::InputRemoved { input_name } => {
                self.cache.remove_input(&input_name);
                self.recheck();
            }
            CompositorEvent::InputVolumeChanged { input_name, volume } => {
                if self.cache.has_input(&input_name) {
                    self.cache.apply_input_volume(&input_name, volume);
                } else {
                    log::debug!(
                        "[Controller] Dropped volume change for untracked input {}",
                        input_name
                    );
                }
                if self.is_candidate(&input_name) {
                    self.recheck();
                }
            }
            CompositorEvent::InputMuteChanged { input_name, muted } => {
                if self.cache.has_input(&input_name) {
                    self.cache.apply_input_mute(&input_name, muted);
                } else {
                    log::debug!(
                        "[Controller] Dropped mute change for untracked input {}",
                        input_name
                    );
                }
                if self.is_candidate(&input_name) {
                    self.recheck();
                }
            }
        }
    }

    async fn resync(&self) {
        let kinds = self.selection.read().source_kinds_with_music.clone();
        if let Err(e) = self.sync.refresh_inputs(&kinds).await {
            log_sync_failure("refresh inputs", &e);
        }
        if let Err(e) = self.sync.refresh_scenes().await {
            log_sync_failure("refresh scenes", &e);
        }
        if let Err(e) = self.sync.refresh_active_scene().await {
            log_sync_failure("read program scene", &e);
        }
    }

    async fn refresh_input(&self, name: &str) {
        let kinds = self.selection.read().source_kinds_with_music.clone();
        if let Err(e) = self.sync.refresh_input(name, &kinds).await {
            log_sync_failure(&format!("fetch input {name}"), &e);
        }
    }

    fn is_candidate(&self, input_name: &str) -> bool {
        self.candidates.read().contains(input_name)
    }

    /// Re-resolves the program scene and dispatches the outcome.
    fn recheck(&self) {
        let Some(scene) = self.cache.active_scene() else {
            log::debug!("[Controller] No program scene yet");
            return;
        };

        let resolution = {
            let selection = self.selection.read();
            resolve(&self.cache, &scene, &selection)
        };
        *self.candidates.write() = resolution.candidates;

        let request = match resolution.action {
            Some(action) => {
                self.status.record_decision(Decision::Play {
                    scene: scene.clone(),
                    playlist: action.playlist.clone(),
                    volume: action.volume,
                });
                PlayerRequest::Play { scene, action }
            }
            None => {
                self.status.record_decision(Decision::Stop {
                    scene: scene.clone(),
                });
                PlayerRequest::Stop { scene }
            }
        };
        self.dispatch(request);
    }

    /// Takes the request token now, so dispatch order decides which request
    /// wins, and runs the request in the background.
    fn dispatch(&self, request: PlayerRequest) {
        let token = self.manager.begin_request();
        let manager = Arc::clone(&self.manager);
        log::debug!("[Controller] Dispatching player {}", request);

        self.spawner.spawn(async move {
            let result = match &request {
                PlayerRequest::Play { action, .. } => manager.play(&token, action).await,
                PlayerRequest::Stop { .. } => manager.stop(&token).await,
                PlayerRequest::Close => manager.ensure_closed(&token).await,
            };
            match result {
                Ok(()) => log::debug!("[Controller] Finished player {}", request),
                Err(e) if e.is_cancelled() => {
                    log::info!("[Controller] Cancelled player {}", request)
                }
                Err(e) => log::error!("[Controller] Error in player {}: {}", request, e),
            }
        });
    }
}

/// Connection loss logs at debug; the reconnect resyncs everything.
fn log_sync_failure(what: &str, err: &ObsError) {
    if err.is_connection_lost() {
        log::debug!("[Controller] Could not {} while disconnecting: {}", what, err);
    } else {
        log::warn!("[Controller] Failed to {}: {}", what, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::services::playback_session::SessionSettings;
    use crate::test_fixtures::{
        input_item, nested_item, wait_until, MockCompositor, MockLauncher, MockPlayer,
    };
    use crate::vlc::{ExtensionFilter, PlaybackState, PlayerCommand};

    struct Harness {
        compositor: Arc<MockCompositor>,
        launcher: Arc<MockLauncher>,
        player: Arc<MockPlayer>,
        controller: Arc<Controller>,
    }

    fn harness(selection: MusicSelection, obs_config: ObsConfig) -> Harness {
        let compositor = Arc::new(MockCompositor::new());
        let launcher = Arc::new(MockLauncher::new());
        let player = Arc::new(MockPlayer::stopped());
        let cache = Arc::new(RemoteStateCache::new());
        let spawner = TokioSpawner::current();

        let manager = PlaybackLifecycleManager::new(
            launcher.clone(),
            player.clone(),
            SessionSettings {
                folder_uri: Some("file:///music".into()),
                filter: ExtensionFilter::new(&["mp3"]),
                max_volume: 256,
                fade_duration: Duration::from_millis(200),
            },
            Duration::from_secs(5),
            spawner.clone(),
        );
        let controller = Controller::new(
            compositor.clone(),
            StateSync::new(compositor.clone(), cache.clone()),
            cache,
            manager,
            obs_config,
            selection,
            Arc::new(ControllerState::default()),
            spawner,
        );

        Harness {
            compositor,
            launcher,
            player,
            controller,
        }
    }

    fn dynamic() -> MusicSelection {
        MusicSelection {
            source_kinds_with_music: ["vlc_source".to_string()].into(),
            ..Default::default()
        }
    }

    fn stream_scene(compositor: &MockCompositor) {
        compositor.add_scene("Stream", vec![nested_item(1, "Overlay")]);
        compositor.add_scene("Overlay", vec![input_item(5, "MusicPlayer", "vlc_source")]);
        compositor.add_scene("Break", Vec::new());
        compositor.add_input("MusicPlayer", "vlc_source", 0.8, false, &["a.mp3", "b.mp3"]);
        compositor.set_program_scene("Stream");
    }

    #[tokio::test]
    async fn connected_event_syncs_and_plays() {
        let h = harness(dynamic(), ObsConfig::default());
        stream_scene(&h.compositor);

        h.controller.handle_event(CompositorEvent::Connected).await;

        let player = &h.player;
        wait_until(|| async move { player.volumes().last() == Some(&205) }).await;
        assert_eq!(player.enqueued(), vec!["file:///a.mp3", "file:///b.mp3"]);
        assert_eq!(h.launcher.launches(), 1);

        let snapshot = h.controller.state().snapshot();
        assert_eq!(snapshot.connection, ConnectionState::Connected);
        assert_eq!(
            snapshot.last_decision,
            Some(Decision::Play {
                scene: "Stream".into(),
                playlist: vec!["a.mp3".into(), "b.mp3".into()],
                volume: 0.8,
            })
        );
    }

    #[tokio::test]
    async fn switching_to_a_silent_scene_stops() {
        let h = harness(dynamic(), ObsConfig::default());
        stream_scene(&h.compositor);
        h.controller.handle_event(CompositorEvent::Connected).await;
        let player = &h.player;
        wait_until(|| async move { player.status_now().state == PlaybackState::Playing }).await;

        h.controller
            .handle_event(CompositorEvent::ActiveSceneChanged {
                scene_name: "Break".into(),
            })
            .await;

        wait_until(|| async move { player.status_now().state == PlaybackState::Stopped }).await;
        assert_eq!(player.commands().last(), Some(&PlayerCommand::Stop));
    }

    #[tokio::test]
    async fn disconnect_stops_then_closes() {
        let h = harness(dynamic(), ObsConfig::default());
        stream_scene(&h.compositor);
        h.controller.handle_event(CompositorEvent::Connected).await;
        let player = &h.player;
        wait_until(|| async move { player.volumes().last() == Some(&205) }).await;
        let instance = h.controller.manager.running().await.unwrap();

        h.controller.handle_event(CompositorEvent::Disconnected).await;

        let process = &instance.process;
        wait_until(|| async move { process.has_exited() }).await;
        assert_eq!(player.commands().last(), Some(&PlayerCommand::Stop));
        assert_eq!(player.status_now().volume, 0);
        assert!(h.controller.cache.active_scene().is_none());
        assert_eq!(h.controller.state().connection(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn volume_of_non_candidate_does_not_recompute() {
        let h = harness(dynamic(), ObsConfig::default());
        stream_scene(&h.compositor);
        h.controller.handle_event(CompositorEvent::Connected).await;
        let first = h.controller.state().snapshot().decided_at;

        h.controller
            .handle_event(CompositorEvent::InputVolumeChanged {
                input_name: "Mic".into(),
                volume: 0.1,
            })
            .await;

        assert_eq!(h.controller.state().snapshot().decided_at, first);
    }

    #[tokio::test]
    async fn changes_for_untracked_inputs_are_dropped() {
        let h = harness(dynamic(), ObsConfig::default());
        stream_scene(&h.compositor);
        h.controller.handle_event(CompositorEvent::Connected).await;
        let first = h.controller.state().snapshot().decided_at;

        h.controller
            .handle_event(CompositorEvent::InputVolumeChanged {
                input_name: "Mic".into(),
                volume: 0.1,
            })
            .await;
        h.controller
            .handle_event(CompositorEvent::InputMuteChanged {
                input_name: "Mic".into(),
                muted: true,
            })
            .await;

        let cache = &h.controller.cache;
        assert!(!cache.has_input("Mic"));
        assert_eq!(cache.input("MusicPlayer").unwrap().volume, Some(0.8));
        assert_eq!(h.controller.state().snapshot().decided_at, first);
    }

    #[tokio::test]
    async fn volume_of_candidate_retargets_the_fade() {
        let h = harness(dynamic(), ObsConfig::default());
        stream_scene(&h.compositor);
        h.controller.handle_event(CompositorEvent::Connected).await;
        let player = &h.player;
        wait_until(|| async move { player.volumes().last() == Some(&205) }).await;

        h.controller
            .handle_event(CompositorEvent::InputVolumeChanged {
                input_name: "MusicPlayer".into(),
                volume: 0.5,
            })
            .await;

        wait_until(|| async move { player.volumes().last() == Some(&128) }).await;
        assert_eq!(h.launcher.launches(), 1);
    }

    #[tokio::test]
    async fn slow_input_fetch_resolves_against_the_newest_volume() {
        let h = harness(dynamic(), ObsConfig::default());
        stream_scene(&h.compositor);
        h.controller.handle_event(CompositorEvent::Connected).await;
        let player = &h.player;
        wait_until(|| async move { player.volumes().last() == Some(&205) }).await;

        h.compositor.add_input("Jukebox", "vlc_source", 0.3, false, &["c.mp3"]);
        h.compositor.set_list_delay(Duration::from_millis(300));
        let created = {
            let controller = Arc::clone(&h.controller);
            tokio::spawn(async move {
                controller
                    .handle_event(CompositorEvent::InputCreated {
                        input_name: "Jukebox".into(),
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Lands while the Jukebox fetch is still waiting on OBS.
        h.controller
            .handle_event(CompositorEvent::InputVolumeChanged {
                input_name: "MusicPlayer".into(),
                volume: 0.5,
            })
            .await;
        wait_until(|| async move { player.volumes().last() == Some(&128) }).await;
        assert!(!created.is_finished());

        created.await.unwrap();
        let cache = &h.controller.cache;
        wait_until(|| async move { cache.has_input("Jukebox") }).await;

        assert_eq!(
            h.controller.state().snapshot().last_decision,
            Some(Decision::Play {
                scene: "Stream".into(),
                playlist: vec!["a.mp3".into(), "b.mp3".into()],
                volume: 0.5,
            })
        );
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(player.volumes().last(), Some(&128));
        assert_eq!(h.launcher.launches(), 1);
    }

    #[tokio::test]
    async fn muting_the_only_input_stops() {
        let h = harness(dynamic(), ObsConfig::default());
        stream_scene(&h.compositor);
        h.controller.handle_event(CompositorEvent::Connected).await;
        let player = &h.player;
        wait_until(|| async move { player.volumes().last() == Some(&205) }).await;

        h.controller
            .handle_event(CompositorEvent::InputMuteChanged {
                input_name: "MusicPlayer".into(),
                muted: true,
            })
            .await;

        wait_until(|| async move { player.status_now().state == PlaybackState::Stopped }).await;
        assert!(matches!(
            h.controller.state().snapshot().last_decision,
            Some(Decision::Stop { .. })
        ));
    }

    #[tokio::test]
    async fn allowlisted_scene_plays_the_folder() {
        let selection = MusicSelection {
            scenes_with_music: ["Intro".to_string()].into(),
            ..Default::default()
        };
        let h = harness(selection, ObsConfig::default());
        h.compositor.add_scene("Intro", Vec::new());
        h.compositor.set_program_scene("Intro");
        h.player.add_folder(
            "file:///music",
            vec![crate::vlc::BrowseElement::file("file:///music/intro.mp3")],
        );

        h.controller.handle_event(CompositorEvent::Connected).await;

        let player = &h.player;
        wait_until(|| async move { player.volumes().last() == Some(&256) }).await;
        assert_eq!(player.enqueued(), vec!["file:///music/intro.mp3"]);
    }

    #[tokio::test]
    async fn renamed_input_is_refetched() {
        let h = harness(dynamic(), ObsConfig::default());
        stream_scene(&h.compositor);
        h.controller.handle_event(CompositorEvent::Connected).await;

        h.compositor.rename_input("MusicPlayer", "Tunes");
        h.controller
            .handle_event(CompositorEvent::InputRenamed {
                old_name: "MusicPlayer".into(),
                new_name: "Tunes".into(),
            })
            .await;

        assert!(!h.controller.cache.has_input("MusicPlayer"));
        assert!(h.controller.cache.has_input("Tunes"));
    }

    #[tokio::test]
    async fn selection_update_resolves_again() {
        let h = harness(MusicSelection::default(), ObsConfig::default());
        stream_scene(&h.compositor);
        h.compositor.set_connected(true);
        h.controller.handle_event(CompositorEvent::Connected).await;
        assert!(matches!(
            h.controller.state().snapshot().last_decision,
            Some(Decision::Stop { .. })
        ));

        h.controller.update_selection(dynamic()).await;

        assert!(matches!(
            h.controller.state().snapshot().last_decision,
            Some(Decision::Play { .. })
        ));
    }

    #[tokio::test]
    async fn explicit_endpoint_wins_over_local_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"server_port": 4460, "server_password": "local", "auth_required": true}"#,
        )
        .unwrap();

        let h = harness(
            dynamic(),
            ObsConfig {
                url: None,
                password: Some("explicit".into()),
                settings_path: Some(path.clone()),
            },
        );
        assert_eq!(
            h.controller.resolve_endpoint(),
            Some(("ws://localhost:4460".into(), "explicit".into()))
        );

        let h = harness(
            dynamic(),
            ObsConfig {
                settings_path: Some(dir.path().join("missing.json")),
                ..Default::default()
            },
        );
        assert_eq!(h.controller.resolve_endpoint(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn connection_loop_retries_until_connected() {
        let h = harness(
            dynamic(),
            ObsConfig {
                url: Some("ws://localhost:4455".into()),
                password: Some("pw".into()),
                settings_path: None,
            },
        );
        let cancel = CancellationToken::new();
        let running = tokio::spawn(Arc::clone(&h.controller).run(cancel.clone()));

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(h.compositor.connect_attempts(), 3);

        h.compositor.set_connected(true);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(h.compositor.connect_attempts(), 3);

        cancel.cancel();
        assert!(running.await.unwrap().is_ok());
        assert_eq!(h.compositor.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn closed_event_stream_is_an_error() {
        let h = harness(dynamic(), ObsConfig::default());
        let cancel = CancellationToken::new();
        let running = tokio::spawn(Arc::clone(&h.controller).run(cancel));

        let compositor = &h.compositor;
        wait_until(|| async move { compositor.subscriber_count() == 1 }).await;
        h.compositor.close_events();

        assert!(running.await.unwrap().is_err());
    }
}
