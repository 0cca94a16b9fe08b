//! Configuration and observable controller state.
//!
//! [`Config`] is what the server loads from YAML. [`ControllerState`] is the
//! runtime state the controller publishes for the status API.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::protocol_constants::VLC_FULL_VOLUME;
use crate::utils::now_millis;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// How to reach OBS.
///
/// Unset fields fall back to the websocket settings OBS itself stores on
/// this machine.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ObsConfig {
    /// Websocket URL, e.g. `ws://localhost:4455`.
    pub url: Option<String>,
    /// Websocket password.
    pub password: Option<String>,
    /// Path to OBS's own websocket `config.json` (overrides the default location).
    pub settings_path: Option<PathBuf>,
}

/// How to launch and drive VLC.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct VlcConfig {
    /// Executable path; environment variables are expanded.
    pub path: String,
    /// Host the HTTP interface binds to.
    pub host: String,
    /// Port the HTTP interface binds to.
    pub port: u16,
    /// HTTP interface password. Generated per run when unset.
    pub password: Option<String>,
    /// Folder browsed when a scene plays without an explicit playlist.
    pub folder_uri: Option<String>,
    /// File extensions accepted into the playlist (without the dot).
    pub extensions: Vec<String>,
    /// VLC volume used as 100% of a source's volume.
    pub max_volume: u32,
    /// Duration of a full 0 to `max_volume` fade (milliseconds).
    pub fade_duration_ms: u64,
    /// How long to wait for the HTTP interface after spawning (milliseconds).
    pub startup_timeout_ms: u64,
    /// Grace period between asking VLC to close and killing it (milliseconds).
    pub close_grace_ms: u64,
}

impl VlcConfig {
    pub fn fade_duration(&self) -> Duration {
        Duration::from_millis(self.fade_duration_ms)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    pub fn close_grace(&self) -> Duration {
        Duration::from_millis(self.close_grace_ms)
    }
}

impl Default for VlcConfig {
    fn default() -> Self {
        Self {
            path: default_vlc_path().to_string(),
            host: "127.0.0.1".to_string(),
            port: 8080,
            password: None,
            folder_uri: None,
            extensions: ["mp3", "flac", "ogg", "wav", "m4a"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_volume: VLC_FULL_VOLUME,
            fade_duration_ms: 2000,
            startup_timeout_ms: 5000,
            close_grace_ms: 500,
        }
    }
}

#[cfg(windows)]
fn default_vlc_path() -> &'static str {
    "%ProgramFiles%\\VideoLAN\\VLC\\vlc.exe"
}

#[cfg(not(windows))]
fn default_vlc_path() -> &'static str {
    "vlc"
}

/// Which scenes and sources call for music.
///
/// `scenes_with_music` is the static allowlist: those scenes play the
/// configured folder at full volume. `source_kinds_with_music` enables the
/// dynamic mode: any active input of those kinds visible in the program scene
/// contributes its playlist and volume.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct MusicSelection {
    pub scenes_with_music: HashSet<String>,
    pub source_kinds_with_music: HashSet<String>,
}

impl MusicSelection {
    /// Returns true if neither mode is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenes_with_music.is_empty() && self.source_kinds_with_music.is_empty()
    }
}

/// Configuration for the Scene Music service.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub obs: ObsConfig,
    pub vlc: VlcConfig,
    pub music: MusicSelection,
    /// Port for the read-only status API (disabled when unset).
    pub status_port: Option<u16>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Controller Runtime State
// ─────────────────────────────────────────────────────────────────────────────

/// Connection state of the compositor session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// The last request the controller dispatched to the player.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Decision {
    Play {
        scene: String,
        playlist: Vec<String>,
        volume: f64,
    },
    Stop {
        scene: String,
    },
    Close,
}

/// Point-in-time copy of [`ControllerState`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerSnapshot {
    pub connection: ConnectionState,
    pub last_decision: Option<Decision>,
    pub decided_at: Option<u64>,
}

/// Observable controller state, written by the controller and read by the API.
#[derive(Debug, Default)]
pub struct ControllerState {
    connection: RwLock<ConnectionState>,
    last_decision: RwLock<Option<(Decision, u64)>>,
}

impl ControllerState {
    pub fn connection(&self) -> ConnectionState {
        *self.connection.read()
    }

    pub fn set_connection(&self, state: ConnectionState) {
        *self.connection.write() = state;
    }

    pub fn record_decision(&self, decision: Decision) {
        *self.last_decision.write() = Some((decision, now_millis()));
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        let last = self.last_decision.read().clone();
        ControllerSnapshot {
            connection: self.connection(),
            decided_at: last.as_ref().map(|(_, at)| *at),
            last_decision: last.map(|(decision, _)| decision),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"vlc": {"port": 9090}, "music": {"scenes_with_music": ["Intro"]}}"#,
        )
        .unwrap();

        assert_eq!(config.vlc.port, 9090);
        assert_eq!(config.vlc.host, "127.0.0.1");
        assert_eq!(config.vlc.max_volume, 256);
        assert_eq!(config.vlc.fade_duration(), Duration::from_secs(2));
        assert!(config.music.scenes_with_music.contains("Intro"));
        assert!(config.music.source_kinds_with_music.is_empty());
        assert_eq!(config.obs, ObsConfig::default());
    }

    #[test]
    fn empty_selection_reports_empty() {
        assert!(MusicSelection::default().is_empty());
        let selection = MusicSelection {
            source_kinds_with_music: ["vlc_source".to_string()].into(),
            ..Default::default()
        };
        assert!(!selection.is_empty());
    }

    #[test]
    fn snapshot_reflects_latest_decision() {
        let state = ControllerState::default();
        assert!(state.snapshot().last_decision.is_none());

        state.set_connection(ConnectionState::Connected);
        state.record_decision(Decision::Stop {
            scene: "Break".into(),
        });

        let snapshot = state.snapshot();
        assert_eq!(snapshot.connection, ConnectionState::Connected);
        assert_eq!(
            snapshot.last_decision,
            Some(Decision::Stop {
                scene: "Break".into()
            })
        );
        assert!(snapshot.decided_at.is_some());
    }
}
