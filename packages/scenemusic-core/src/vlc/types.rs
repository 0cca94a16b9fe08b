//! VLC HTTP interface payload types.

use serde::{Deserialize, Deserializer};

use crate::protocol_constants::{PLAYLIST_ENQUEUED_ID, PLAYLIST_ROOT_ID};

/// Playback state reported by `status.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
    #[default]
    #[serde(other)]
    Unknown,
}

impl PlaybackState {
    /// Paused or stopped: the player is silent and can be ramped from zero.
    pub fn is_idle(self) -> bool {
        matches!(self, Self::Paused | Self::Stopped)
    }
}

/// The subset of `status.json` the playback session reads.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub state: PlaybackState,
    #[serde(default)]
    pub volume: i64,
    #[serde(default)]
    pub random: bool,
    #[serde(rename = "loop", default)]
    pub looping: bool,
}

/// A command sent through `status.json?command=...`.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    ToggleRandom,
    ToggleLoop,
    Next,
    Play,
    Stop,
    SetVolume(i64),
    Enqueue(String),
    SortRandom,
}

impl PlayerCommand {
    /// Query pairs for the command.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let command = |name: &str| ("command", name.to_string());
        match self {
            Self::ToggleRandom => vec![command("pl_random")],
            Self::ToggleLoop => vec![command("pl_loop")],
            Self::Next => vec![command("pl_next")],
            Self::Play => vec![command("pl_play")],
            Self::Stop => vec![command("pl_stop")],
            Self::SetVolume(value) => vec![command("volume"), ("val", value.to_string())],
            Self::Enqueue(uri) => vec![command("in_enqueue"), ("input", uri.clone())],
            Self::SortRandom => vec![
                command("pl_sort"),
                ("id", PLAYLIST_ROOT_ID.to_string()),
                ("val", "random".to_string()),
            ],
        }
    }
}

/// `browse.json` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrowseResult {
    #[serde(default)]
    pub element: Vec<BrowseElement>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BrowseElement {
    #[serde(rename = "type")]
    pub kind: String,
    pub uri: String,
    #[serde(default)]
    pub name: String,
}

impl BrowseElement {
    pub fn file(uri: impl Into<String>) -> Self {
        Self {
            kind: "file".to_string(),
            uri: uri.into(),
            name: String::new(),
        }
    }

    pub fn dir(uri: impl Into<String>) -> Self {
        Self {
            kind: "dir".to_string(),
            uri: uri.into(),
            name: String::new(),
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == "file"
    }
}

/// A node of the `playlist.json` tree.
///
/// The root (id 0) holds the "Playlist" node (id 1), whose children are the
/// enqueued items.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlaylistNode {
    #[serde(default)]
    pub name: String,
    #[serde(deserialize_with = "lenient_id")]
    pub id: i64,
    #[serde(default)]
    pub children: Option<Vec<PlaylistNode>>,
    #[serde(default)]
    pub uri: Option<String>,
}

impl PlaylistNode {
    /// Items currently enqueued, if the tree has the expected shape.
    pub fn enqueued_items(&self) -> Option<&[PlaylistNode]> {
        match self.id {
            PLAYLIST_ROOT_ID => self
                .children
                .as_deref()?
                .iter()
                .find(|child| child.id == PLAYLIST_ENQUEUED_ID)?
                .enqueued_items(),
            PLAYLIST_ENQUEUED_ID => self.children.as_deref(),
            _ => None,
        }
    }

    /// True when nothing is enqueued.
    pub fn is_empty(&self) -> bool {
        self.enqueued_items().map_or(true, <[PlaylistNode]>::is_empty)
    }
}

/// VLC reports node ids as strings; accept numbers too.
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(i64),
        Text(String),
    }

    match Id::deserialize(deserializer)? {
        Id::Number(n) => Ok(n),
        Id::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}
