// State management module
//
// This module provides the StateManager which wraps the blog registry and the
// download queue with thread-safe read access, funnels every mutation through
// the owner thread, and emits change events for the presentation layer.

pub mod owner;
pub mod queue;
pub mod registry;

pub use owner::StateError;
pub use queue::{DownloadQueue, QueueItem};
pub use registry::{BlogRegistry, RegistryError};

use crate::models::Blog;
use owner::OwnerHandle;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Change events emitted when library state is modified
///
/// These events notify the presentation layer without it having to poll.
#[derive(Clone, Debug, PartialEq)]
pub enum LibraryChange {
    /// Blogs were added, removed or modified
    RegistryChanged { total: usize },

    /// Items were enqueued or removed from the download queue
    QueueChanged { total: usize },

    /// Startup load finished; fired once, even after a partial failure
    LibraryLoaded { total: usize, skipped: usize },

    /// An operation on one blog failed and the operator should be told
    OperationFailed { blog: String, message: String },
}

/// The registry and queue as seen by the presentation layer
#[derive(Clone, Debug, Default)]
pub struct LibraryState {
    pub registry: BlogRegistry,
    pub queue: DownloadQueue,
    pub is_loaded: bool,
    /// Index files skipped during the startup load
    pub skipped_on_load: usize,
}

impl LibraryState {
    /// Merge a freshly loaded library into the registry and mark loading done.
    ///
    /// Blogs already in the registry were committed with their index on disk
    /// and are kept as they are; the scan's copy of them is ignored. Returns the
    /// names of loaded files that collided with another loaded file.
    pub fn finish_loading(&mut self, blogs: Vec<Blog>, skipped: usize) -> Vec<String> {
        let committed: HashSet<String> = self.registry.names().into_iter().collect();
        let mut collisions = Vec::new();
        for blog in blogs {
            if committed.contains(&blog.name) {
                continue;
            }
            if let Err(RegistryError::Duplicate(name)) = self.registry.add(blog) {
                collisions.push(name);
            }
        }
        self.skipped_on_load = skipped + collisions.len();
        self.is_loaded = true;
        collisions
    }

    /// Append queue items for the named blogs that are in the registry.
    ///
    /// Returns how many items were added.
    pub fn enqueue(&mut self, names: Vec<String>) -> usize {
        let (known, unknown): (Vec<String>, Vec<String>) = names
            .into_iter()
            .partition(|name| self.registry.contains(name));
        for name in &unknown {
            tracing::warn!("Not enqueueing {}: not in the library", name);
        }
        self.queue.enqueue(known)
    }

    /// Drop a blog from the registry and purge its queue items.
    pub fn remove_blog(&mut self, name: &str) -> Option<Blog> {
        let removed = self.registry.remove(name);
        self.queue.remove_many(&[name.to_string()]);
        removed
    }

    /// Update a blog's online flag; returns false if the blog is gone.
    pub fn set_online(&mut self, name: &str, online: bool) -> bool {
        match self.registry.get_mut(name) {
            Some(blog) => {
                blog.online = online;
                true
            }
            None => false,
        }
    }
}

/// Thread-safe library state with owner-thread mutation and event emission
///
/// - [`read()`](Self::read) / [`snapshot()`](Self::snapshot) read from any thread
/// - [`update()`](Self::update) hands a mutation to the owner thread and waits for it
/// - [`subscribe()`](Self::subscribe) listens to [`LibraryChange`] events
///
/// Clones share the same state, owner thread and event channel.
#[derive(Clone)]
pub struct StateManager {
    state: Arc<RwLock<LibraryState>>,
    change_tx: broadcast::Sender<LibraryChange>,
    owner: OwnerHandle,
}

impl StateManager {
    /// Create an empty library and start its owner thread
    ///
    /// The broadcast channel buffers 100 events per subscriber.
    pub fn new() -> Self {
        let (change_tx, _) = broadcast::channel(100);
        let state = Arc::new(RwLock::new(LibraryState::default()));
        let owner = OwnerHandle::spawn(Arc::clone(&state), change_tx.clone());
        Self {
            state,
            change_tx,
            owner,
        }
    }

    /// Clone of the current state
    pub fn snapshot(&self) -> LibraryState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let known = state_manager.read(|s| s.registry.contains("example"));
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&LibraryState) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Apply a mutation on the owner thread and return its result.
    ///
    /// Change events are broadcast after the mutation is applied. When this
    /// future resolves the mutation is visible to every reader.
    pub async fn update<F, R>(&self, f: F) -> Result<R, StateError>
    where
        F: FnOnce(&mut LibraryState) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.owner.run(f).await
    }

    /// Subscribe to library change events
    pub fn subscribe(&self) -> broadcast::Receiver<LibraryChange> {
        self.change_tx.subscribe()
    }

    /// Tell the operator that an operation on `blog` failed
    pub fn report_failure(&self, blog: impl Into<String>, message: impl Into<String>) {
        let _ = self.change_tx.send(LibraryChange::OperationFailed {
            blog: blog.into(),
            message: message.into(),
        });
    }

    // Convenience methods for common mutations

    pub async fn enqueue(&self, names: Vec<String>) -> Result<usize, StateError> {
        self.update(move |s| s.enqueue(names)).await
    }

    pub async fn dequeue(&self, names: Vec<String>) -> Result<usize, StateError> {
        self.update(move |s| s.queue.remove_many(&names)).await
    }

    pub async fn set_online(&self, name: String, online: bool) -> Result<bool, StateError> {
        self.update(move |s| s.set_online(&name, online)).await
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Receive the next change event, skipping over events lost to lag.
///
/// Returns `None` once the channel has closed.
pub async fn next_change(rx: &mut broadcast::Receiver<LibraryChange>) -> Option<LibraryChange> {
    loop {
        match rx.recv().await {
            Ok(change) => return Some(change),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!("Change listener fell behind, {} events lost", missed);
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}
