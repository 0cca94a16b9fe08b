//! OBS websocket v5 payload types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events::CompositorEvent;

/// What a scene item renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    #[serde(rename = "OBS_SOURCE_TYPE_INPUT")]
    Input,
    #[serde(rename = "OBS_SOURCE_TYPE_SCENE")]
    NestedScene,
    #[serde(other)]
    Other,
}

/// One entry of `GetSceneItemList`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneItem {
    #[serde(rename = "sceneItemId")]
    pub item_id: i64,
    pub source_name: String,
    /// Input kind (e.g. `vlc_source`); absent for nested scenes.
    #[serde(rename = "inputKind", default)]
    pub source_kind: Option<String>,
    pub source_type: SourceType,
    /// Enabled flag as reported alongside the item list, when present.
    #[serde(rename = "sceneItemEnabled", default, skip_serializing)]
    pub enabled: Option<bool>,
}

/// One entry of `GetInputList`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputInfo {
    pub input_name: String,
    #[serde(default)]
    pub input_kind: String,
}

/// The part of an input's settings that describes its playlist.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SourceSettings {
    #[serde(default)]
    pub playlist: Option<Vec<PlaylistEntry>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlaylistEntry {
    #[serde(default)]
    pub value: Option<String>,
}

impl SourceSettings {
    /// Playlist values in order, skipping entries without a value.
    pub fn playlist_items(&self) -> Vec<String> {
        self.playlist
            .iter()
            .flatten()
            .filter_map(|entry| entry.value.clone())
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request responses
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SceneListResponse {
    #[serde(default)]
    pub scenes: Vec<SceneEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SceneEntry {
    pub scene_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SceneItemListResponse {
    #[serde(default)]
    pub scene_items: Vec<SceneItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SceneItemEnabledResponse {
    pub scene_item_enabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InputListResponse {
    #[serde(default)]
    pub inputs: Vec<InputInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InputSettingsResponse {
    #[serde(default)]
    pub input_settings: SourceSettings,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InputVolumeResponse {
    pub input_volume_mul: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InputMuteResponse {
    pub input_muted: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CurrentProgramSceneResponse {
    pub current_program_scene_name: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handshake and envelopes
// ─────────────────────────────────────────────────────────────────────────────

/// Generic `{op, d}` frame.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Hello {
    #[serde(default)]
    pub authentication: Option<AuthChallenge>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthChallenge {
    pub challenge: String,
    pub salt: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RequestResponse {
    pub request_id: String,
    #[serde(default)]
    pub request_type: String,
    pub request_status: RequestStatus,
    #[serde(default)]
    pub response_data: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RequestStatus {
    pub result: bool,
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventFrame {
    pub event_type: String,
    #[serde(default)]
    pub event_data: Value,
}

/// Maps a websocket event to a [`CompositorEvent`].
///
/// Returns `None` for events the controller does not track or that are
/// missing required fields.
pub(crate) fn parse_event(event_type: &str, data: &Value) -> Option<CompositorEvent> {
    let text = |key: &str| data.get(key).and_then(Value::as_str).map(str::to_string);

    let event = match event_type {
        "CurrentProgramSceneChanged" => CompositorEvent::ActiveSceneChanged {
            scene_name: text("sceneName")?,
        },
        "InputCreated" => CompositorEvent::InputCreated {
            input_name: text("inputName")?,
        },
        "InputRemoved" => CompositorEvent::InputRemoved {
            input_name: text("inputName")?,
        },
        "InputNameChanged" => CompositorEvent::InputRenamed {
            old_name: text("oldInputName")?,
            new_name: text("inputName")?,
        },
        "InputVolumeChanged" => CompositorEvent::InputVolumeChanged {
            input_name: text("inputName")?,
            volume: data.get("inputVolumeMul").and_then(Value::as_f64)?,
        },
        "InputMuteStateChanged" => CompositorEvent::InputMuteChanged {
            input_name: text("inputName")?,
            muted: data.get("inputMuted").and_then(Value::as_bool)?,
        },
        "SceneItemEnableStateChanged" => CompositorEvent::SceneItemEnabledChanged {
            scene_name: text("sceneName")?,
            item_id: data.get("sceneItemId").and_then(Value::as_i64)?,
            enabled: data.get("sceneItemEnabled").and_then(Value::as_bool)?,
        },
        "SceneItemCreated" => CompositorEvent::SceneItemCreated {
            scene_name: text("sceneName")?,
        },
        "SceneItemRemoved" => CompositorEvent::SceneItemRemoved {
            scene_name: text("sceneName")?,
        },
        "SceneListChanged" => CompositorEvent::SceneListChanged,
        _ => return None,
    };
    Some(event)
}
