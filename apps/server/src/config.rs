//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use scenemusic_core::{MusicSelection, ObsConfig, VlcConfig};

/// Server configuration loaded from YAML with environment overrides.
///
/// ```yaml
/// obs:
///   url: ws://localhost:4455
/// vlc:
///   port: 8080
///   folder_uri: file:///home/me/Music/stream
/// music:
///   scenes_with_music: [Starting Soon, BRB]
///   source_kinds_with_music: [ffmpeg_source]
/// status_port: 49500
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Override: `SCENEMUSIC_OBS_URL`, `SCENEMUSIC_OBS_PASSWORD`
    pub obs: ObsConfig,

    /// Override: `SCENEMUSIC_VLC_PATH`, `SCENEMUSIC_VLC_PORT`,
    /// `SCENEMUSIC_VLC_PASSWORD`, `SCENEMUSIC_MUSIC_FOLDER`
    pub vlc: VlcConfig,

    /// Override: `SCENEMUSIC_SCENES`, `SCENEMUSIC_SOURCE_KINDS`
    /// (comma-separated lists)
    pub music: MusicSelection,

    /// Port for the read-only status API. Disabled when unset.
    /// Override: `SCENEMUSIC_STATUS_PORT`
    pub status_port: Option<u16>,
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            Self::read(path)?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        // An empty file is a valid, all-defaults configuration.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Applies overrides looked up by variable name.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("SCENEMUSIC_OBS_URL") {
            self.obs.url = Some(url);
        }
        if let Some(password) = lookup("SCENEMUSIC_OBS_PASSWORD") {
            self.obs.password = Some(password);
        }

        if let Some(path) = lookup("SCENEMUSIC_VLC_PATH") {
            self.vlc.path = path;
        }
        if let Some(val) = lookup("SCENEMUSIC_VLC_PORT") {
            match val.parse() {
                Ok(port) => self.vlc.port = port,
                Err(_) => log::warn!("Ignoring invalid SCENEMUSIC_VLC_PORT: {}", val),
            }
        }
        if let Some(password) = lookup("SCENEMUSIC_VLC_PASSWORD") {
            self.vlc.password = Some(password);
        }
        if let Some(folder) = lookup("SCENEMUSIC_MUSIC_FOLDER") {
            self.vlc.folder_uri = Some(folder);
        }

        if let Some(val) = lookup("SCENEMUSIC_SCENES") {
            self.music.scenes_with_music = split_list(&val);
        }
        if let Some(val) = lookup("SCENEMUSIC_SOURCE_KINDS") {
            self.music.source_kinds_with_music = split_list(&val);
        }

        if let Some(val) = lookup("SCENEMUSIC_STATUS_PORT") {
            match val.parse() {
                Ok(port) => self.status_port = Some(port),
                Err(_) => log::warn!("Ignoring invalid SCENEMUSIC_STATUS_PORT: {}", val),
            }
        }
    }

    /// Converts to scenemusic-core's Config type.
    pub fn to_core_config(&self) -> scenemusic_core::Config {
        scenemusic_core::Config {
            obs: self.obs.clone(),
            vlc: self.vlc.clone(),
            music: self.music.clone(),
            status_port: self.status_port,
        }
    }
}

fn split_list(value: &str) -> HashSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}
