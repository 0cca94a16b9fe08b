//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by the OBS websocket v5 protocol and by the VLC
//! HTTP interface. Changing them would break compatibility.

// ─────────────────────────────────────────────────────────────────────────────
// OBS websocket v5
// ─────────────────────────────────────────────────────────────────────────────

/// Server greeting carrying the authentication challenge.
pub const OP_HELLO: u8 = 0;

/// Client identification (RPC version, auth string, event mask).
pub const OP_IDENTIFY: u8 = 1;

/// Server confirmation that the session is usable.
pub const OP_IDENTIFIED: u8 = 2;

/// Server push notification.
pub const OP_EVENT: u8 = 5;

/// Client request.
pub const OP_REQUEST: u8 = 6;

/// Server response to a client request.
pub const OP_REQUEST_RESPONSE: u8 = 7;

/// RPC version negotiated in `Identify`.
pub const OBS_RPC_VERSION: u32 = 1;

/// Event subscription bit for scene events.
pub const EVENT_SUB_SCENES: u32 = 1 << 2;

/// Event subscription bit for input events.
pub const EVENT_SUB_INPUTS: u32 = 1 << 3;

/// Event subscription bit for scene item events.
pub const EVENT_SUB_SCENE_ITEMS: u32 = 1 << 7;

/// Websocket timeout for connection attempts and requests (seconds).
///
/// Also used as the reconnection poll interval.
pub const OBS_WS_TIMEOUT_SECS: u64 = 10;

/// `sourceType` value of a scene item backed by an input.
pub const SOURCE_TYPE_INPUT: &str = "OBS_SOURCE_TYPE_INPUT";

/// `sourceType` value of a scene item backed by another scene.
pub const SOURCE_TYPE_SCENE: &str = "OBS_SOURCE_TYPE_SCENE";

// ─────────────────────────────────────────────────────────────────────────────
// VLC HTTP interface
// ─────────────────────────────────────────────────────────────────────────────

/// Status and command endpoint.
pub const VLC_STATUS_PATH: &str = "/requests/status.json";

/// Directory browsing endpoint.
pub const VLC_BROWSE_PATH: &str = "/requests/browse.json";

/// Playlist tree endpoint.
pub const VLC_PLAYLIST_PATH: &str = "/requests/playlist.json";

/// Playlist tree root node id.
pub const PLAYLIST_ROOT_ID: i64 = 0;

/// Playlist node id holding the enqueued items.
pub const PLAYLIST_ENQUEUED_ID: i64 = 1;

/// VLC volume that corresponds to 100%.
pub const VLC_FULL_VOLUME: u32 = 256;

/// Extra attempts for a request whose connection was reset.
pub const CONNECTION_RESET_RETRIES: usize = 2;

/// Timeout for VLC HTTP requests (seconds).
pub const VLC_HTTP_TIMEOUT_SECS: u64 = 10;

/// Interval between readiness probes after starting VLC (milliseconds).
pub const VLC_READINESS_POLL_MS: u64 = 100;

/// Random bytes in a generated VLC HTTP password.
pub const GENERATED_PASSWORD_BYTES: usize = 64;

// ─────────────────────────────────────────────────────────────────────────────
// Application Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Service identifier reported by the health endpoint.
pub const SERVICE_ID: &str = "scenemusic";
