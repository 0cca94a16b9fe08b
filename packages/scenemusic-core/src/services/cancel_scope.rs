//! Newest-wins cancellation for player requests.

use std::future::Future;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::{PlayerError, PlayerResult};

/// Hands out one live token at a time.
///
/// Beginning a request cancels the token of the previous one before the new
/// token is returned, so an older sequence stops before the newer one issues
/// its first command.
pub struct CancelScope {
    current: Mutex<CancellationToken>,
}

impl CancelScope {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn begin(&self) -> CancellationToken {
        let mut current = self.current.lock();
        current.cancel();
        *current = CancellationToken::new();
        current.clone()
    }

    pub fn cancel_all(&self) {
        self.current.lock().cancel();
    }
}

impl Default for CancelScope {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `future` unless `token` is cancelled first.
///
/// A token that is already cancelled never polls the future.
pub async fn run_cancellable<T, F>(token: &CancellationToken, future: F) -> PlayerResult<T>
where
    F: Future<Output = PlayerResult<T>>,
{
    if token.is_cancelled() {
        return Err(PlayerError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(PlayerError::Cancelled),
        result = future => result,
    }
}
