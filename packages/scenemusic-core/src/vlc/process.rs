//! Player process handle.
//!
//! A watcher task owns the child process. The handle only carries two
//! tokens: one the watcher cancels when the process is gone, one the owner
//! cancels to ask the process to close.

use std::time::Duration;

use tokio::process::Child;
use tokio_util::sync::CancellationToken;

use crate::runtime::{TaskSpawner, TokioSpawner};

/// Handle to a running player process.
pub struct ProcessHandle {
    pid: Option<u32>,
    exited: CancellationToken,
    close_requested: CancellationToken,
}

impl ProcessHandle {
    /// Takes ownership of `child` and watches it until it exits.
    ///
    /// On a close request the process is asked to terminate, given `grace`
    /// to exit on its own, then killed.
    pub fn watch(child: Child, grace: Duration, spawner: &TokioSpawner) -> Self {
        let handle = Self {
            pid: child.id(),
            exited: CancellationToken::new(),
            close_requested: CancellationToken::new(),
        };
        spawner.spawn(watch_child(
            child,
            handle.close_requested.clone(),
            handle.exited.clone(),
            grace,
        ));
        handle
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn has_exited(&self) -> bool {
        self.exited.is_cancelled()
    }

    /// Token cancelled once the process is gone.
    pub fn exited_token(&self) -> CancellationToken {
        self.exited.clone()
    }

    /// Asks the process to close and waits until it is gone.
    pub async fn close(&self) {
        if self.has_exited() {
            return;
        }
        self.close_requested.cancel();
        self.exited.cancelled().await;
    }

    /// A handle with no process behind it; closing it exits immediately.
    #[cfg(test)]
    pub(crate) fn simulated() -> Self {
        let handle = Self {
            pid: None,
            exited: CancellationToken::new(),
            close_requested: CancellationToken::new(),
        };
        let close_requested = handle.close_requested.clone();
        let exited = handle.exited.clone();
        tokio::spawn(async move {
            close_requested.cancelled().await;
            exited.cancel();
        });
        handle
    }

    /// Behaves as if the process exited on its own.
    #[cfg(test)]
    pub(crate) fn simulate_exit(&self) {
        self.exited.cancel();
    }

    #[cfg(test)]
    pub(crate) fn close_was_requested(&self) -> bool {
        self.close_requested.is_cancelled()
    }
}

async fn watch_child(
    mut child: Child,
    close_requested: CancellationToken,
    exited: CancellationToken,
    grace: Duration,
) {
    let pid = child.id().unwrap_or_default();

    let closing = tokio::select! {
        status = child.wait() => {
            match status {
                Ok(status) => log::info!("[Vlc] Process {} exited ({})", pid, status),
                Err(e) => log::warn!("[Vlc] Lost track of process {}: {}", pid, e),
            }
            false
        }
        _ = close_requested.cancelled() => true,
    };

    if closing {
        if request_terminate(pid) {
            match tokio::time::timeout(grace, child.wait()).await {
                Ok(_) => log::info!("[Vlc] Process {} closed", pid),
                Err(_) => {
                    log::warn!(
                        "[Vlc] Process {} still running after {:?}, killing it",
                        pid,
                        grace
                    );
                    kill(&mut child, pid).await;
                }
            }
        } else {
            kill(&mut child, pid).await;
        }
    }

    exited.cancel();
}

async fn kill(child: &mut Child, pid: u32) {
    if let Err(e) = child.kill().await {
        log::warn!("[Vlc] Failed to kill process {}: {}", pid, e);
    }
}

/// Sends SIGTERM. Returns false if the signal could not be delivered.
#[cfg(unix)]
fn request_terminate(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    // SAFETY: kill(2) has no memory-safety preconditions; the pid belongs to
    // a child we have not reaped yet.
    unsafe { libc::kill(pid, libc::SIGTERM) == 0 }
}

/// No portable graceful close outside unix; the caller kills instead.
#[cfg(not(unix))]
fn request_terminate(_pid: u32) -> bool {
    false
}
