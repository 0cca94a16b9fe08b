//! Trait abstractions for compositor operations.
//!
//! The controller and the state sync depend on these traits rather than on
//! the websocket client, so both can be exercised against in-memory fakes.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ObsResult;
use crate::events::Subscription;
use crate::obs::types::{InputInfo, SceneItem, SourceSettings};

/// Compositor queries used to (re)build the state cache.
#[async_trait]
pub trait CompositorQueries: Send + Sync {
    /// Lists scene names.
    async fn list_scenes(&self) -> ObsResult<Vec<String>>;

    /// Lists the items of one scene in render order.
    async fn list_scene_items(&self, scene_name: &str) -> ObsResult<Vec<SceneItem>>;

    /// Reads one item's enabled flag.
    async fn get_scene_item_enabled(&self, scene_name: &str, item_id: i64) -> ObsResult<bool>;

    /// Lists inputs, optionally restricted to one input kind.
    async fn list_inputs(&self, kind: Option<&str>) -> ObsResult<Vec<InputInfo>>;

    /// Reads an input's settings (only the playlist part is decoded).
    async fn get_input_settings(&self, input_name: &str) -> ObsResult<SourceSettings>;

    /// Reads an input's linear volume multiplier.
    async fn get_input_volume(&self, input_name: &str) -> ObsResult<f64>;

    /// Reads an input's mute flag.
    async fn get_input_mute(&self, input_name: &str) -> ObsResult<bool>;

    /// Reads the scene currently on program.
    async fn get_current_program_scene(&self) -> ObsResult<String>;
}

/// Compositor session management.
#[async_trait]
pub trait CompositorConnection: Send + Sync {
    /// Starts a connection attempt and returns without waiting for it.
    ///
    /// Success is reported through a `Connected` event.
    async fn connect(&self, url: &str, password: &str) -> ObsResult<()>;

    /// Returns true while an identified session is open.
    fn is_connected(&self) -> bool;

    /// Timeout for connection attempts and requests.
    fn ws_timeout(&self) -> Duration;

    /// Subscribes to session notifications.
    fn subscribe(&self) -> Subscription;
}

/// Combined trait for everything the controller needs from the compositor.
pub trait CompositorClient: CompositorConnection + CompositorQueries {}

/// Blanket implementation for any type implementing both traits.
impl<T: CompositorConnection + CompositorQueries> CompositorClient for T {}
