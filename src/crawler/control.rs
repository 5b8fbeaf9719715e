use crate::crawler::CrawlControl;
use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;

/// Coarse state of the crawl engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrawlStatus {
    #[default]
    Idle,
    Running,
    Paused,
}

/// In-process crawl control.
///
/// Tracks idle/running/paused and publishes every transition on a watch
/// channel, which an embedded crawl engine follows to begin or continue
/// taking items off the download queue.
#[derive(Debug)]
pub struct CrawlSignal {
    status: Mutex<CrawlStatus>,
    status_tx: watch::Sender<CrawlStatus>,
}

impl CrawlSignal {
    pub fn new() -> Self {
        let (status_tx, _) = watch::channel(CrawlStatus::Idle);
        Self {
            status: Mutex::new(CrawlStatus::Idle),
            status_tx,
        }
    }

    pub fn status(&self) -> CrawlStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> watch::Receiver<CrawlStatus> {
        self.status_tx.subscribe()
    }

    /// Pause a running crawl
    pub fn pause(&self) {
        self.transition(|current| (current == CrawlStatus::Running).then_some(CrawlStatus::Paused));
    }

    /// Mark the crawl finished or stopped
    pub fn stop(&self) {
        self.transition(|current| (current != CrawlStatus::Idle).then_some(CrawlStatus::Idle));
    }

    fn transition(&self, next: impl FnOnce(CrawlStatus) -> Option<CrawlStatus>) {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(new_status) = next(*status) {
            tracing::info!("Crawl status {:?} -> {:?}", *status, new_status);
            *status = new_status;
            self.status_tx.send_replace(new_status);
        }
    }
}

impl Default for CrawlSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlControl for CrawlSignal {
    /// Running includes paused: the crawl is in progress but held
    fn is_running(&self) -> bool {
        self.status() != CrawlStatus::Idle
    }

    fn is_paused(&self) -> bool {
        self.status() == CrawlStatus::Paused
    }

    fn start(&self) {
        self.transition(|current| (current == CrawlStatus::Idle).then_some(CrawlStatus::Running));
    }

    fn resume(&self) {
        self.transition(|current| (current == CrawlStatus::Paused).then_some(CrawlStatus::Running));
    }
}
