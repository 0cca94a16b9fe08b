//! Retry logic for reset VLC connections.
//!
//! VLC's HTTP interface resets idle keep-alive connections. Requests that
//! fail that way are retried immediately; every other error is returned.

use crate::error::PlayerResult;
use crate::protocol_constants::CONNECTION_RESET_RETRIES;

/// Executes a VLC request, retrying it when the connection was reset.
///
/// # Arguments
/// * `action` - Request description for logging
/// * `operation` - Closure that performs the request
pub(crate) async fn with_reset_retry<T, F, Fut>(action: &str, mut operation: F) -> PlayerResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = PlayerResult<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Err(e) if e.is_connection_reset() && attempt < CONNECTION_RESET_RETRIES => {
                attempt += 1;
                log::warn!(
                    "[Vlc] Connection reset while sending {} (retry {}/{})",
                    action,
                    attempt,
                    CONNECTION_RESET_RETRIES
                );
            }
            result => return result,
        }
    }
}
