//! Volume ramps.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::PlayerResult;
use crate::services::cancel_scope::run_cancellable;

/// Ramps from `from` to `to` at a constant rate.
///
/// The rate is `amplitude` volume units per `duration`: one unit per
/// `duration / amplitude` interval. Each step waits for both the volume call
/// and the interval, and the last call always sets `to` exactly. A zero
/// amplitude or duration sets `to` directly.
pub(crate) async fn fade_to<F, Fut>(
    token: &CancellationToken,
    mut set_volume: F,
    from: i64,
    to: i64,
    amplitude: i64,
    duration: Duration,
) -> PlayerResult<()>
where
    F: FnMut(i64) -> Fut,
    Fut: Future<Output = PlayerResult<()>>,
{
    let steps = u32::try_from(amplitude).unwrap_or(u32::MAX);
    if steps == 0 || duration.is_zero() || from == to {
        return run_cancellable(token, set_volume(to)).await;
    }

    let interval = duration / steps;
    if interval.is_zero() {
        return run_cancellable(token, set_volume(to)).await;
    }

    let distance = u32::try_from(from.abs_diff(to)).unwrap_or(u32::MAX);
    let ramp = interval.saturating_mul(distance);
    let direction = if to > from { 1 } else { -1 };
    let (low, high) = (from.min(to), from.max(to));
    let start = Instant::now();

    loop {
        let elapsed = start.elapsed();
        if elapsed >= ramp {
            break;
        }
        let travelled = elapsed.as_nanos() * u128::from(steps) / duration.as_nanos();
        let travelled = i64::try_from(travelled).unwrap_or(i64::MAX);
        let volume = from.saturating_add(direction * travelled).clamp(low, high);

        let (result, _) = tokio::join!(
            run_cancellable(token, set_volume(volume)),
            tokio::time::sleep(interval)
        );
        result?;
    }

    run_cancellable(token, set_volume(to)).await
}
