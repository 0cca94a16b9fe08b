//! In-memory compositor and player fakes shared by the unit tests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{ObsError, ObsResult, PlayerError, PlayerResult};
use crate::events::{EventHub, Subscription};
use crate::obs::types::PlaylistEntry;
use crate::obs::{
    CompositorConnection, CompositorQueries, InputInfo, SceneItem, SourceSettings, SourceType,
};
use crate::services::scene_cache::AudioInput;
use crate::vlc::{
    BrowseElement, PlaybackState, PlayerCommand, PlayerControl, PlayerLauncher, PlaylistNode,
    ProcessHandle, Status,
};

// ─────────────────────────────────────────────────────────────────────────────
// Builders
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) fn input_item(item_id: i64, name: &str, kind: &str) -> SceneItem {
    SceneItem {
        item_id,
        source_name: name.to_string(),
        source_kind: Some(kind.to_string()),
        source_type: SourceType::Input,
        enabled: Some(true),
    }
}

pub(crate) fn nested_item(item_id: i64, scene: &str) -> SceneItem {
    SceneItem {
        item_id,
        source_name: scene.to_string(),
        source_kind: None,
        source_type: SourceType::NestedScene,
        enabled: Some(true),
    }
}

/// An unmuted input with the given volume and playlist.
pub(crate) fn playing_input(name: &str, volume: f64, playlist: &[&str]) -> AudioInput {
    AudioInput {
        name: name.to_string(),
        kind: "vlc_source".to_string(),
        volume: Some(volume),
        muted: Some(false),
        playlist_items: playlist.iter().map(|s| s.to_string()).collect(),
    }
}

/// Polls `condition` every 10 ms, panicking after 2 s.
pub(crate) async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s");
}

// ─────────────────────────────────────────────────────────────────────────────
// Compositor
// ─────────────────────────────────────────────────────────────────────────────

struct FakeInput {
    info: InputInfo,
    volume: f64,
    muted: bool,
    playlist: Vec<String>,
}

#[derive(Default)]
struct CompositorData {
    scenes: Vec<(String, Vec<SceneItem>)>,
    inputs: Vec<FakeInput>,
    program_scene: String,
}

pub(crate) struct MockCompositor {
    hub: Arc<EventHub>,
    data: Mutex<CompositorData>,
    connected: AtomicBool,
    failing: AtomicBool,
    connect_attempts: AtomicUsize,
    list_delay: Mutex<Duration>,
}

impl MockCompositor {
    pub fn new() -> Self {
        Self {
            hub: Arc::new(EventHub::new()),
            data: Mutex::new(CompositorData::default()),
            connected: AtomicBool::new(false),
            failing: AtomicBool::new(false),
            connect_attempts: AtomicUsize::new(0),
            list_delay: Mutex::new(Duration::ZERO),
        }
    }

    pub fn add_scene(&self, name: &str, items: Vec<SceneItem>) {
        self.data.lock().scenes.push((name.to_string(), items));
    }

    /// Sets the enabled flag reported alongside the item list.
    pub fn set_item_enabled(&self, scene: &str, item_id: i64, enabled: bool) {
        let mut data = self.data.lock();
        if let Some((_, items)) = data.scenes.iter_mut().find(|(name, _)| name == scene) {
            for item in items.iter_mut().filter(|item| item.item_id == item_id) {
                item.enabled = Some(enabled);
            }
        }
    }

    pub fn add_input(&self, name: &str, kind: &str, volume: f64, muted: bool, playlist: &[&str]) {
        self.data.lock().inputs.push(FakeInput {
            info: InputInfo {
                input_name: name.to_string(),
                input_kind: kind.to_string(),
            },
            volume,
            muted,
            playlist: playlist.iter().map(|s| s.to_string()).collect(),
        });
    }

    pub fn remove_input(&self, name: &str) {
        self.data.lock().inputs.retain(|input| input.info.input_name != name);
    }

    /// Renames the input and every scene item that shows it.
    pub fn rename_input(&self, old: &str, new: &str) {
        let mut data = self.data.lock();
        for input in data.inputs.iter_mut().filter(|i| i.info.input_name == old) {
            input.info.input_name = new.to_string();
        }
        for (_, items) in data.scenes.iter_mut() {
            for item in items.iter_mut().filter(|item| item.source_name == old) {
                item.source_name = new.to_string();
            }
        }
    }

    pub fn set_program_scene(&self, name: &str) {
        self.data.lock().program_scene = name.to_string();
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Makes every `GetInputList` answer only after `delay`.
    pub fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.lock() = delay;
    }

    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.hub.subscriber_count()
    }

    pub fn close_events(&self) {
        self.hub.close();
    }

    fn check(&self, request: &str) -> ObsResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ObsError::Timeout(request.to_string()));
        }
        Ok(())
    }

    fn with_input<T>(&self, name: &str, read: impl FnOnce(&FakeInput) -> T) -> ObsResult<T> {
        self.data
            .lock()
            .inputs
            .iter()
            .find(|input| input.info.input_name == name)
            .map(read)
            .ok_or_else(|| ObsError::RequestFailed {
                request_type: "GetInput".into(),
                code: 600,
                comment: format!("No source was found by the name of `{name}`"),
            })
    }
}

#[async_trait]
impl CompositorQueries for MockCompositor {
    async fn list_scenes(&self) -> ObsResult<Vec<String>> {
        self.check("GetSceneList")?;
        Ok(self
            .data
            .lock()
            .scenes
            .iter()
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn list_scene_items(&self, scene_name: &str) -> ObsResult<Vec<SceneItem>> {
        self.check("GetSceneItemList")?;
        Ok(self
            .data
            .lock()
            .scenes
            .iter()
            .find(|(name, _)| name == scene_name)
            .map(|(_, items)| items.clone())
            .unwrap_or_default())
    }

    async fn get_scene_item_enabled(&self, scene_name: &str, item_id: i64) -> ObsResult<bool> {
        self.check("GetSceneItemEnabled")?;
        let items = self.list_scene_items(scene_name).await?;
        Ok(items
            .iter()
            .find(|item| item.item_id == item_id)
            .and_then(|item| item.enabled)
            .unwrap_or(true))
    }

    async fn list_inputs(&self, kind: Option<&str>) -> ObsResult<Vec<InputInfo>> {
        self.check("GetInputList")?;
        let delay = *self.list_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .data
            .lock()
            .inputs
            .iter()
            .filter(|input| kind.map_or(true, |kind| input.info.input_kind == kind))
            .map(|input| input.info.clone())
            .collect())
    }

    async fn get_input_settings(&self, input_name: &str) -> ObsResult<SourceSettings> {
        self.check("GetInputSettings")?;
        self.with_input(input_name, |input| SourceSettings {
            playlist: Some(
                input
                    .playlist
                    .iter()
                    .map(|value| PlaylistEntry {
                        value: Some(value.clone()),
                    })
                    .collect(),
            ),
        })
    }

    async fn get_input_volume(&self, input_name: &str) -> ObsResult<f64> {
        self.check("GetInputVolume")?;
        self.with_input(input_name, |input| input.volume)
    }

    async fn get_input_mute(&self, input_name: &str) -> ObsResult<bool> {
        self.check("GetInputMute")?;
        self.with_input(input_name, |input| input.muted)
    }

    async fn get_current_program_scene(&self) -> ObsResult<String> {
        self.check("GetCurrentProgramScene")?;
        Ok(self.data.lock().program_scene.clone())
    }
}

#[async_trait]
impl CompositorConnection for MockCompositor {
    async fn connect(&self, _url: &str, _password: &str) -> ObsResult<()> {
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn ws_timeout(&self) -> Duration {
        Duration::from_secs(10)
    }

    fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Player
// ─────────────────────────────────────────────────────────────────────────────

struct PlayerData {
    status: Status,
    enqueued: Vec<String>,
    folders: HashMap<String, Vec<BrowseElement>>,
    commands: Vec<PlayerCommand>,
    reachable: bool,
}

/// A player that applies commands to an in-memory status.
pub(crate) struct MockPlayer {
    data: Mutex<PlayerData>,
}

impl MockPlayer {
    pub fn with_state(state: PlaybackState, volume: i64) -> Self {
        Self {
            data: Mutex::new(PlayerData {
                status: Status {
                    state,
                    volume,
                    random: false,
                    looping: true,
                },
                enqueued: Vec::new(),
                folders: HashMap::new(),
                commands: Vec::new(),
                reachable: true,
            }),
        }
    }

    pub fn stopped() -> Self {
        Self::with_state(PlaybackState::Stopped, 0)
    }

    pub fn set_random(&self, random: bool) {
        self.data.lock().status.random = random;
    }

    pub fn set_looping(&self, looping: bool) {
        self.data.lock().status.looping = looping;
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.data.lock().reachable = reachable;
    }

    pub fn enqueue_existing(&self, uri: &str) {
        self.data.lock().enqueued.push(uri.to_string());
    }

    pub fn add_folder(&self, uri: &str, elements: Vec<BrowseElement>) {
        self.data.lock().folders.insert(uri.to_string(), elements);
    }

    pub fn commands(&self) -> Vec<PlayerCommand> {
        self.data.lock().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.data.lock().commands.clear();
    }

    /// Every volume set, in order.
    pub fn volumes(&self) -> Vec<i64> {
        self.data
            .lock()
            .commands
            .iter()
            .filter_map(|command| match command {
                PlayerCommand::SetVolume(volume) => Some(*volume),
                _ => None,
            })
            .collect()
    }

    pub fn enqueued(&self) -> Vec<String> {
        self.data.lock().enqueued.clone()
    }

    pub fn status_now(&self) -> Status {
        self.data.lock().status.clone()
    }

    fn reachable(&self) -> PlayerResult<()> {
        if self.data.lock().reachable {
            Ok(())
        } else {
            Err(PlayerError::HttpStatus(503))
        }
    }
}

#[async_trait]
impl PlayerControl for MockPlayer {
    async fn status(&self) -> PlayerResult<Status> {
        self.reachable()?;
        Ok(self.status_now())
    }

    async fn command(&self, command: PlayerCommand) -> PlayerResult<Status> {
        self.reachable()?;
        let mut data = self.data.lock();
        match &command {
            PlayerCommand::ToggleRandom => data.status.random = !data.status.random,
            PlayerCommand::ToggleLoop => data.status.looping = !data.status.looping,
            PlayerCommand::Next | PlayerCommand::Play => data.status.state = PlaybackState::Playing,
            PlayerCommand::Stop => data.status.state = PlaybackState::Stopped,
            PlayerCommand::SetVolume(volume) => data.status.volume = *volume,
            PlayerCommand::Enqueue(uri) => data.enqueued.push(uri.clone()),
            PlayerCommand::SortRandom => {}
        }
        data.commands.push(command);
        Ok(data.status.clone())
    }

    async fn browse(&self, uri: &str) -> PlayerResult<Vec<BrowseElement>> {
        self.reachable()?;
        Ok(self.data.lock().folders.get(uri).cloned().unwrap_or_default())
    }

    async fn playlist(&self) -> PlayerResult<PlaylistNode> {
        self.reachable()?;
        let children = self
            .data
            .lock()
            .enqueued
            .iter()
            .enumerate()
            .map(|(index, uri)| PlaylistNode {
                name: uri.clone(),
                id: index as i64 + 3,
                children: None,
                uri: Some(uri.clone()),
            })
            .collect();

        Ok(PlaylistNode {
            name: String::new(),
            id: 0,
            children: Some(vec![PlaylistNode {
                name: "Playlist".into(),
                id: 1,
                children: Some(children),
                uri: None,
            }]),
            uri: None,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Launcher
// ─────────────────────────────────────────────────────────────────────────────

/// Hands out simulated process handles.
pub(crate) struct MockLauncher {
    launches: AtomicUsize,
    delay: Duration,
    failing: AtomicBool,
}

impl MockLauncher {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            launches: AtomicUsize::new(0),
            delay,
            failing: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let launcher = Self::new();
        launcher.set_failing(true);
        launcher
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlayerLauncher for MockLauncher {
    async fn launch(&self) -> PlayerResult<ProcessHandle> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(PlayerError::Spawn("vlc: not found".into()));
        }
        Ok(ProcessHandle::simulated())
    }
}
