//! Background task spawning.
//!
//! The websocket session, the process exit watchers and the player requests
//! all run as detached tasks on the runtime picked by [`bootstrap`]. Services
//! take a [`TokioSpawner`] instead of calling `tokio::spawn` so that choice
//! stays in one place.
//!
//! [`bootstrap`]: crate::bootstrap

use std::future::Future;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Spawns fire-and-forget background work.
pub trait TaskSpawner: Send + Sync {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Spawner bound to one Tokio runtime.
#[derive(Clone, Debug)]
pub struct TokioSpawner {
    handle: Handle,
}

impl TokioSpawner {
    /// Binds to the runtime the caller is running on.
    ///
    /// # Panics
    ///
    /// Panics outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: Handle::current(),
        }
    }

    /// Spawns a task whose result the caller awaits, such as the controller
    /// loop the server's exit status depends on.
    pub fn spawn_joinable<F, T>(&self, future: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.handle.spawn(future)
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // Detached: the handle is dropped, the task keeps running.
        drop(self.handle.spawn(future));
    }
}
