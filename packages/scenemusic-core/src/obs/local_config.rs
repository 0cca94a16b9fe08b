//! Discovery of OBS's own websocket settings on this machine.
//!
//! OBS stores its websocket server settings in
//! `<config dir>/obs-studio/plugin_config/obs-websocket/config.json`. When
//! the service runs next to OBS, the URL and password can be taken from there
//! instead of being configured twice.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Raw shape of the obs-websocket `config.json`.
#[derive(Debug, Default, Deserialize)]
struct WebSocketSettingsFile {
    #[serde(default)]
    server_port: Option<u16>,
    #[serde(default)]
    server_password: Option<String>,
    #[serde(default)]
    auth_required: Option<bool>,
}

/// Websocket settings read from OBS.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalObsSettings {
    pub port: Option<u16>,
    pub password: Option<String>,
}

impl LocalObsSettings {
    /// Loads the settings from `path`, or from the default location.
    ///
    /// A missing or unreadable file yields empty settings.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path.map(Path::to_path_buf).or_else(default_settings_path) else {
            return Self::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|| {
                log::warn!("[Obs] Could not parse websocket settings at {}", path.display());
                Self::default()
            }),
            Err(e) => {
                log::debug!(
                    "[Obs] No websocket settings at {}: {}",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    fn parse(content: &str) -> Option<Self> {
        let file: WebSocketSettingsFile = serde_json::from_str(content).ok()?;
        let password = match file.auth_required {
            Some(false) => Some(String::new()),
            _ => file.server_password,
        };
        Some(Self {
            port: file.server_port,
            password,
        })
    }

    /// Builds `ws://localhost:<port>` when a port is known.
    pub fn websocket_url(&self) -> Option<String> {
        self.port.map(|port| format!("ws://localhost:{port}"))
    }
}

/// Default location of the obs-websocket settings file.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| {
        dir.join("obs-studio")
            .join("plugin_config")
            .join("obs-websocket")
            .join("config.json")
    })
}
