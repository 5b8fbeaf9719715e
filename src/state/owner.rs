// Owner thread - the single place where library state is mutated
//
// Pipelines run on tokio workers and compute their results in parallel, but the
// registry and the queue are observed by the presentation layer. Every mutation
// is therefore sent as a job over a channel to one dedicated thread, which
// applies it under the write lock and broadcasts the resulting change events.

use crate::state::{LibraryChange, LibraryState};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};

/// Capacity of the job channel; senders wait when the owner falls behind.
const JOB_CHANNEL_CAPACITY: usize = 256;

pub(crate) type Job = Box<dyn FnOnce(&mut LibraryState) + Send>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("library owner thread has stopped")]
    OwnerStopped,
}

/// Sending half of the owner thread's job queue
#[derive(Clone)]
pub(crate) struct OwnerHandle {
    job_tx: mpsc::Sender<Job>,
}

impl OwnerHandle {
    /// Spawn the owner thread.
    ///
    /// The thread exits once every `OwnerHandle` clone has been dropped.
    pub(crate) fn spawn(
        state: Arc<RwLock<LibraryState>>,
        change_tx: broadcast::Sender<LibraryChange>,
    ) -> Self {
        let (job_tx, mut job_rx) = mpsc::channel::<Job>(JOB_CHANNEL_CAPACITY);

        std::thread::spawn(move || {
            tracing::debug!("Library owner thread started");

            while let Some(job) = job_rx.blocking_recv() {
                let changes = {
                    let mut guard = state.write().unwrap_or_else(PoisonError::into_inner);
                    let before = guard.clone();
                    job(&mut *guard);
                    detect_changes(&before, &guard)
                };

                for change in changes {
                    tracing::trace!("Library change: {:?}", change);
                    // Nobody listening is fine
                    let _ = change_tx.send(change);
                }
            }

            tracing::debug!("Library owner thread terminated");
        });

        Self { job_tx }
    }

    /// Run `f` on the owner thread and wait for its result
    pub(crate) async fn run<F, R>(&self, f: F) -> Result<R, StateError>
    where
        F: FnOnce(&mut LibraryState) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |state| {
            let _ = reply_tx.send(f(state));
        });

        self.job_tx
            .send(job)
            .await
            .map_err(|_| StateError::OwnerStopped)?;
        reply_rx.await.map_err(|_| StateError::OwnerStopped)
    }
}

/// Compare two states and produce the events the presentation layer needs
fn detect_changes(old: &LibraryState, new: &LibraryState) -> Vec<LibraryChange> {
    let mut changes = Vec::new();

    if old.registry != new.registry {
        changes.push(LibraryChange::RegistryChanged {
            total: new.registry.len(),
        });
    }

    if old.queue != new.queue {
        changes.push(LibraryChange::QueueChanged {
            total: new.queue.len(),
        });
    }

    if !old.is_loaded && new.is_loaded {
        changes.push(LibraryChange::LibraryLoaded {
            total: new.registry.len(),
            skipped: new.skipped_on_load,
        });
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Blog, BlogType, Settings};

    fn blog(name: &str) -> Blog {
        let url = BlogType::Tumblr
            .parse_url(&format!("https://{}.tumblr.com", name))
            .unwrap();
        Blog::new(url, &Settings::default())
    }

    #[test]
    fn test_detect_no_changes() {
        let state = LibraryState::default();
        assert!(detect_changes(&state, &state.clone()).is_empty());
    }

    #[test]
    fn test_detect_registry_and_queue_changes() {
        let old = LibraryState::default();
        let mut new = old.clone();
        new.registry.add(blog("alpha")).unwrap();
        new.queue.enqueue(["alpha"]);

        let changes = detect_changes(&old, &new);
        assert_eq!(
            changes,
            vec![
                LibraryChange::RegistryChanged { total: 1 },
                LibraryChange::QueueChanged { total: 1 },
            ]
        );
    }

    #[test]
    fn test_detect_loaded_once() {
        let old = LibraryState::default();
        let mut new = old.clone();
        new.is_loaded = true;
        new.skipped_on_load = 2;

        assert_eq!(
            detect_changes(&old, &new),
            vec![LibraryChange::LibraryLoaded { total: 0, skipped: 2 }]
        );
        assert!(detect_changes(&new, &new.clone()).is_empty());
    }

    #[tokio::test]
    async fn test_run_returns_job_result() {
        let state = Arc::new(RwLock::new(LibraryState::default()));
        let (change_tx, mut change_rx) = broadcast::channel(16);
        let owner = OwnerHandle::spawn(Arc::clone(&state), change_tx);

        let added = owner
            .run(|s| s.registry.add(blog("alpha")).is_ok())
            .await
            .unwrap();

        assert!(added);
        assert!(state.read().unwrap().registry.contains("alpha"));
        assert_eq!(
            change_rx.recv().await.unwrap(),
            LibraryChange::RegistryChanged { total: 1 }
        );
    }

    #[tokio::test]
    async fn test_jobs_run_on_one_thread() {
        let state = Arc::new(RwLock::new(LibraryState::default()));
        let (change_tx, _) = broadcast::channel(16);
        let owner = OwnerHandle::spawn(state, change_tx);

        let first = owner.run(|_| std::thread::current().id()).await.unwrap();
        let second = owner.run(|_| std::thread::current().id()).await.unwrap();

        assert_eq!(first, second);
        assert_ne!(first, std::thread::current().id());
    }
}
