//! Scene Music Core - keeps a VLC playlist in sync with the visible OBS scene.
//!
//! Background music plays only while a designated scene (or a designated kind
//! of audio source inside the visible scene) is on program, with volume fades
//! on every transition.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`obs`]: OBS websocket v5 client and the compositor traits
//! - [`vlc`]: VLC HTTP control client, process launcher and media helpers
//! - [`services`]: State cache, activation resolver, playback lifecycle and the controller loop
//! - [`events`]: Compositor notifications and RAII subscriptions
//! - [`state`]: Configuration and observable controller state
//! - [`api`]: Read-only HTTP status endpoints
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! Core logic depends on traits rather than on the concrete clients:
//!
//! - [`CompositorClient`](obs::CompositorClient): scene graph queries and notifications
//! - [`PlayerControl`](vlc::PlayerControl): player HTTP commands
//! - [`PlayerLauncher`](vlc::PlayerLauncher): spawning the player process
//! - [`TaskSpawner`](runtime::TaskSpawner): spawning background tasks

#![warn(clippy::all)]

pub mod api;
pub mod bootstrap;
pub mod error;
pub mod events;
pub mod obs;
pub mod protocol_constants;
pub mod runtime;
pub mod services;
pub mod state;
pub mod utils;
pub mod vlc;

#[cfg(test)]
pub(crate) mod test_fixtures;

// Re-export commonly used types at the crate root
pub use error::{ErrorCode, ObsError, ObsResult, PlayerError, PlayerResult, SceneMusicError, SceneMusicResult};
pub use events::{CompositorEvent, EventHub, Subscription};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use state::{
    Config, ConnectionState, ControllerSnapshot, ControllerState, MusicSelection, ObsConfig,
    VlcConfig,
};

// Re-export compositor and player types
pub use obs::{CompositorClient, ObsWebSocketClient};
pub use vlc::{PlayerControl, PlayerLauncher, VlcHttpClient, VlcLauncher};

// Re-export service types
pub use services::{
    Controller, PlayAction, PlaybackLifecycleManager, PlaybackSession, RemoteStateCache, StateSync,
};

// Re-export bootstrap types
pub use bootstrap::{bootstrap_services, BootstrappedServices};

// Re-export API types
pub use api::{start_server, AppState, ServerError};
