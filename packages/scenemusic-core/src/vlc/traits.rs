//! Trait abstractions for player operations.
//!
//! The playback session and the lifecycle manager depend on these traits
//! rather than on the HTTP client and the process launcher.

use async_trait::async_trait;

use crate::error::PlayerResult;
use crate::vlc::process::ProcessHandle;
use crate::vlc::types::{BrowseElement, PlayerCommand, PlaylistNode, Status};

/// Player control endpoint.
#[async_trait]
pub trait PlayerControl: Send + Sync {
    /// Reads the current status without changing anything.
    async fn status(&self) -> PlayerResult<Status>;

    /// Sends a command and returns the status the player answers with.
    ///
    /// VLC answers with the status from before some commands took effect
    /// (volume in particular), so callers should not rely on it for those.
    async fn command(&self, command: PlayerCommand) -> PlayerResult<Status>;

    /// Lists a directory URI.
    async fn browse(&self, uri: &str) -> PlayerResult<Vec<BrowseElement>>;

    /// Reads the playlist tree.
    async fn playlist(&self) -> PlayerResult<PlaylistNode>;
}

/// Starts player processes.
#[async_trait]
pub trait PlayerLauncher: Send + Sync {
    /// Spawns a new player process with its control interface enabled.
    async fn launch(&self) -> PlayerResult<ProcessHandle>;
}
