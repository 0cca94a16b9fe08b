//! OBS websocket v5 authentication string.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Computes the `authentication` value for `Identify`.
///
/// `base64(sha256(base64(sha256(password + salt)) + challenge))`
pub fn authentication_string(password: &str, salt: &str, challenge: &str) -> String {
    let secret = STANDARD.encode(Sha256::digest(format!("{password}{salt}").as_bytes()));
    STANDARD.encode(Sha256::digest(format!("{secret}{challenge}").as_bytes()))
}
