//! Compositor notifications.
//!
//! This module provides:
//! - [`CompositorEvent`], the notifications the controller reacts to
//! - [`EventHub`] and [`Subscription`] for delivering them to subscribers

mod hub;

pub use hub::{EventHub, Subscription};

/// Notifications pushed by the compositor session.
///
/// `Connected` is only published once the session is identified and can
/// answer requests. `Disconnected` is published once per lost session.
#[derive(Debug, Clone, PartialEq)]
pub enum CompositorEvent {
    Connected,
    Disconnected,
    ActiveSceneChanged {
        scene_name: String,
    },
    InputCreated {
        input_name: String,
    },
    InputRemoved {
        input_name: String,
    },
    InputRenamed {
        old_name: String,
        new_name: String,
    },
    InputVolumeChanged {
        input_name: String,
        volume: f64,
    },
    InputMuteChanged {
        input_name: String,
        muted: bool,
    },
    SceneItemEnabledChanged {
        scene_name: String,
        item_id: i64,
        enabled: bool,
    },
    SceneItemCreated {
        scene_name: String,
    },
    SceneItemRemoved {
        scene_name: String,
    },
    SceneListChanged,
}

impl CompositorEvent {
    /// Short name for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::ActiveSceneChanged { .. } => "active_scene_changed",
            Self::InputCreated { .. } => "input_created",
            Self::InputRemoved { .. } => "input_removed",
            Self::InputRenamed { .. } => "input_renamed",
            Self::InputVolumeChanged { .. } => "input_volume_changed",
            Self::InputMuteChanged { .. } => "input_mute_changed",
            Self::SceneItemEnabledChanged { .. } => "scene_item_enabled_changed",
            Self::SceneItemCreated { .. } => "scene_item_created",
            Self::SceneItemRemoved { .. } => "scene_item_removed",
            Self::SceneListChanged => "scene_list_changed",
        }
    }
}
