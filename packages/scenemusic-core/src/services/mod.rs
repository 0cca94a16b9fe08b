//! Application services layer.
//!
//! This module contains the logic that sits between the compositor client
//! (obs/) and the player (vlc/): the state cache and its sync, the
//! activation resolver, the playback session and lifecycle, and the
//! controller loop that drives them.

pub mod cancel_scope;
pub mod controller;
pub(crate) mod fade;
pub mod playback_manager;
pub mod playback_session;
pub mod resolver;
pub mod scene_cache;
pub mod state_sync;

pub use cancel_scope::CancelScope;
pub use controller::Controller;
pub use playback_manager::{PlaybackLifecycleManager, PlayerInstance};
pub use playback_session::{PlaybackSession, SessionSettings};
pub use resolver::{resolve, PlayAction, Resolution};
pub use scene_cache::{AudioInput, CacheSnapshot, ItemEnabled, RemoteStateCache, Scene};
pub use state_sync::StateSync;
