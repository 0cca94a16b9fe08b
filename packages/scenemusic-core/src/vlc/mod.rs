//! VLC integration over its HTTP interface.
//!
//! - [`traits`]: player seams used by the services
//! - [`client`]: HTTP control client
//! - [`launcher`] and [`process`]: starting and closing the VLC process
//! - [`media`]: extension filter and playlist URI normalisation
//! - [`types`]: `status.json`, `browse.json` and `playlist.json` payloads

pub mod client;
pub mod launcher;
pub mod media;
pub mod process;
mod retry;
pub mod traits;
pub mod types;

pub use client::VlcHttpClient;
pub use launcher::VlcLauncher;
pub use media::{to_uri, ExtensionFilter};
pub use process::ProcessHandle;
pub use traits::{PlayerControl, PlayerLauncher};
pub use types::{BrowseElement, PlaybackState, PlayerCommand, PlaylistNode, Status};
