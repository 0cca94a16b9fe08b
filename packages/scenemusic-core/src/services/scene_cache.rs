//! Last-known compositor state.
//!
//! The cache is a pure store: it never talks to the compositor. Wholesale
//! rebuilds are prepared off-cache and swapped in, so readers see either the
//! old mapping or the new one. Targeted updates go through per-key entry
//! locks.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;

use crate::obs::{SceneItem, SourceType};

/// Enabled flag of a scene item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemEnabled {
    /// Not reported yet.
    #[default]
    Unknown,
    Enabled,
    Disabled,
}

impl From<bool> for ItemEnabled {
    fn from(enabled: bool) -> Self {
        if enabled {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }
}

impl From<Option<bool>> for ItemEnabled {
    fn from(enabled: Option<bool>) -> Self {
        enabled.map_or(Self::Unknown, Self::from)
    }
}

/// A scene and the items it renders, in render order.
#[derive(Debug)]
pub struct Scene {
    pub name: String,
    pub items: Vec<SceneItem>,
    enabled: DashMap<i64, ItemEnabled>,
}

impl Scene {
    pub fn new(
        name: impl Into<String>,
        items: Vec<SceneItem>,
        enabled: impl IntoIterator<Item = (i64, ItemEnabled)>,
    ) -> Self {
        Self {
            name: name.into(),
            items,
            enabled: enabled.into_iter().collect(),
        }
    }

    pub fn item_enabled(&self, item_id: i64) -> ItemEnabled {
        self.enabled
            .get(&item_id)
            .map(|entry| *entry)
            .unwrap_or_default()
    }

    fn has_item(&self, item_id: i64) -> bool {
        self.items.iter().any(|item| item.item_id == item_id)
    }
}

/// An audio input of one of the music source kinds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioInput {
    pub name: String,
    pub kind: String,
    /// Linear gain; `None` until fetched.
    pub volume: Option<f64>,
    pub muted: Option<bool>,
    pub playlist_items: Vec<String>,
}

impl AudioInput {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            volume: None,
            muted: None,
            playlist_items: Vec::new(),
        }
    }

    /// Audible and has something to play.
    ///
    /// An input whose mute flag was never reported is not active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.volume.is_some_and(|volume| volume > 0.0)
            && self.muted == Some(false)
            && !self.playlist_items.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Snapshot
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneItemSnapshot {
    pub item_id: i64,
    pub source_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_kind: Option<String>,
    pub source_type: SourceType,
    pub enabled: ItemEnabled,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSnapshot {
    pub name: String,
    pub items: Vec<SceneItemSnapshot>,
}

/// Point-in-time copy of the cache, sorted by name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    pub active_scene: Option<String>,
    pub scenes: Vec<SceneSnapshot>,
    pub inputs: Vec<AudioInput>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RemoteStateCache {
    scenes: RwLock<Arc<HashMap<String, Arc<Scene>>>>,
    inputs: RwLock<Arc<DashMap<String, AudioInput>>>,
    active_scene: RwLock<Option<String>>,
}

impl RemoteStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swaps in a freshly fetched scene list.
    pub fn replace_scenes(&self, scenes: impl IntoIterator<Item = Scene>) {
        let scenes: HashMap<_, _> = scenes
            .into_iter()
            .map(|scene| (scene.name.clone(), Arc::new(scene)))
            .collect();
        log::debug!("[Cache] Replaced scenes ({} total)", scenes.len());
        *self.scenes.write() = Arc::new(scenes);
    }

    /// Swaps in a freshly fetched set of audio inputs.
    pub fn replace_inputs(&self, inputs: impl IntoIterator<Item = AudioInput>) {
        let inputs: DashMap<_, _> = inputs
            .into_iter()
            .map(|input| (input.name.clone(), input))
            .collect();
        log::debug!("[Cache] Replaced inputs ({} total)", inputs.len());
        *self.inputs.write() = Arc::new(inputs);
    }

    pub fn upsert_input(&self, input: AudioInput) {
        self.current_inputs().insert(input.name.clone(), input);
    }

    /// Returns true if the input was known.
    pub fn remove_input(&self, name: &str) -> bool {
        self.current_inputs().remove(name).is_some()
    }

    /// Updates one item's enabled flag in place.
    ///
    /// Returns false (and changes nothing) for an unreported scene or item.
    pub fn apply_scene_item_enabled(&self, scene_name: &str, item_id: i64, enabled: bool) -> bool {
        let Some(scene) = self.scene(scene_name) else {
            log::warn!(
                "[Cache] Enabled change for unknown scene {} (item {})",
                scene_name,
                item_id
            );
            return false;
        };
        if !scene.has_item(item_id) {
            log::warn!(
                "[Cache] Enabled change for unknown item {} in scene {}",
                item_id,
                scene_name
            );
            return false;
        }
        scene.enabled.insert(item_id, enabled.into());
        true
    }

    pub fn apply_input_volume(&self, name: &str, volume: f64) -> bool {
        self.update_input(name, "volume", |input| input.volume = Some(volume))
    }

    pub fn apply_input_mute(&self, name: &str, muted: bool) -> bool {
        self.update_input(name, "mute", |input| input.muted = Some(muted))
    }

    pub fn set_active_scene(&self, name: Option<String>) {
        *self.active_scene.write() = name;
    }

    pub fn active_scene(&self) -> Option<String> {
        self.active_scene.read().clone()
    }

    pub fn scene(&self, name: &str) -> Option<Arc<Scene>> {
        self.scenes.read().get(name).cloned()
    }

    pub fn input(&self, name: &str) -> Option<AudioInput> {
        self.current_inputs()
            .get(name)
            .map(|entry| entry.value().clone())
    }

    pub fn has_input(&self, name: &str) -> bool {
        self.current_inputs().contains_key(name)
    }

    /// Forgets everything. Called when the compositor session ends.
    pub fn clear(&self) {
        *self.scenes.write() = Arc::default();
        *self.inputs.write() = Arc::default();
        *self.active_scene.write() = None;
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        let scenes_map = Arc::clone(&self.scenes.read());
        let mut scenes: Vec<SceneSnapshot> = scenes_map
            .values()
            .map(|scene| SceneSnapshot {
                name: scene.name.clone(),
                items: scene
                    .items
                    .iter()
                    .map(|item| SceneItemSnapshot {
                        item_id: item.item_id,
                        source_name: item.source_name.clone(),
                        source_kind: item.source_kind.clone(),
                        source_type: item.source_type,
                        enabled: scene.item_enabled(item.item_id),
                    })
                    .collect(),
            })
            .collect();
        scenes.sort_by(|a, b| a.name.cmp(&b.name));

        let mut inputs: Vec<AudioInput> = self
            .current_inputs()
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        inputs.sort_by(|a, b| a.name.cmp(&b.name));

        CacheSnapshot {
            active_scene: self.active_scene(),
            scenes,
            inputs,
        }
    }

    fn current_inputs(&self) -> Arc<DashMap<String, AudioInput>> {
        Arc::clone(&self.inputs.read())
    }

    fn update_input(&self, name: &str, what: &str, apply: impl FnOnce(&mut AudioInput)) -> bool {
        let inputs = self.current_inputs();
        let Some(mut entry) = inputs.get_mut(name) else {
            log::warn!("[Cache] Dropped {} change for unknown input {}", what, name);
            return false;
        };
        apply(entry.value_mut());
        true
    }
}
