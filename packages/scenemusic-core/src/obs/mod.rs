//! OBS integration over the websocket v5 protocol.
//!
//! - [`traits`]: compositor seams used by the services
//! - [`websocket`]: the websocket client implementing them
//! - [`types`]: request, response and event payloads
//! - [`auth`]: the Identify authentication string
//! - [`local_config`]: reading OBS's own websocket settings

pub mod auth;
pub mod local_config;
pub mod traits;
pub mod types;
pub mod websocket;

pub use local_config::LocalObsSettings;
pub use traits::{CompositorClient, CompositorConnection, CompositorQueries};
pub use types::{InputInfo, SceneItem, SourceSettings, SourceType};
pub use websocket::ObsWebSocketClient;
