// Manager controller - wires the library core to its collaborators
//
// This module contains the ManagerController which coordinates between:
// - StateManager (registry + queue, owner-thread mutation)
// - BlogStore (on-disk index)
// - the crawl engine (fetcher factory + crawl control)
// - the settings snapshot
//
// It handles:
// - Startup library load and the optional online check
// - Presentation commands: add, remove, enqueue, dequeue
// - Clipboard change signals feeding the batched add
// - Cancellation of in-flight batches on shutdown

use crate::crawler::{CrawlControl, FetcherFactory};
use crate::metrics::Metrics;
use crate::models::{Blog, Settings};
use crate::services::{
    AddBlogError, AdditionPipeline, BatchOutcome, CrawlTrigger, RemovalPipeline, RemovalReport,
    select_for_auto_enqueue, trigger_crawl,
};
use crate::state::{QueueItem, StateError, StateManager};
use crate::store::{BlogStore, LoadReport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinHandle;

/// Result of the startup load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: usize,
    pub skipped: usize,
}

/// Result of an auto-enqueue request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoEnqueueOutcome {
    pub enqueued: usize,
    /// `None` when the library was empty and nothing was attempted
    pub trigger: Option<CrawlTrigger>,
}

/// Top-level coordinator of the blog library
///
/// Presentation layers hold one of these and forward user intents to it. All
/// registry and queue mutations end up on the [`StateManager`] owner thread;
/// subscribe there for change events.
///
/// # Example
/// ```ignore
/// let controller = ManagerController::new(settings, fetchers, crawl);
/// controller.initialize().await?;
/// controller.add_blog("https://example.tumblr.com").await?;
/// controller.enqueue_auto().await?;
/// ```
pub struct ManagerController {
    state: StateManager,
    store: BlogStore,
    fetchers: Arc<dyn FetcherFactory>,
    crawl: Arc<dyn CrawlControl>,
    additions: Arc<AdditionPipeline>,
    removals: RemovalPipeline,
    metrics: Arc<Metrics>,

    /// Current snapshot; replaced whole, never edited in place
    settings: RwLock<Arc<Settings>>,

    clipboard_listening: AtomicBool,

    /// Send `true` to stop admitting URLs into running batches
    cancel_tx: watch::Sender<bool>,
}

impl ManagerController {
    pub fn new(
        settings: Settings,
        fetchers: Arc<dyn FetcherFactory>,
        crawl: Arc<dyn CrawlControl>,
    ) -> Self {
        let state = StateManager::new();
        let store = BlogStore::new();
        let metrics = Arc::new(Metrics::new());
        let additions = Arc::new(AdditionPipeline::new(
            state.clone(),
            store,
            Arc::clone(&fetchers),
            Arc::clone(&metrics),
        ));
        let removals = RemovalPipeline::new(state.clone(), store, Arc::clone(&metrics));
        let (cancel_tx, _) = watch::channel(false);

        tracing::info!("Manager controller initialized");

        Self {
            state,
            store,
            fetchers,
            crawl,
            additions,
            removals,
            metrics,
            clipboard_listening: AtomicBool::new(settings.check_clipboard),
            settings: RwLock::new(Arc::new(settings)),
            cancel_tx,
        }
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Current settings snapshot
    pub fn settings(&self) -> Arc<Settings> {
        Arc::clone(&self.settings.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Swap in new settings; blogs already created keep what they were built with
    pub fn update_settings(&self, settings: Settings) {
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(settings);
        tracing::info!("Settings updated");
    }

    /// Load the library, then probe every blog if the settings ask for it
    pub async fn initialize(&self) -> Result<LoadSummary, StateError> {
        let summary = self.load_library().await?;
        if self.settings().check_online_status_at_startup {
            self.check_online_status().await?;
        }
        Ok(summary)
    }

    /// Scan the index directory off the async workers and merge it into the registry.
    ///
    /// Additions wait from the scan until the loaded blogs are in the registry.
    /// The "library loaded" event fires exactly once per controller, even when
    /// the scan failed outright; a missing index directory is an empty library.
    pub async fn load_library(&self) -> Result<LoadSummary, StateError> {
        let _commits = self.additions.hold_commits().await;
        let index_dir = self.settings().index_dir();
        let store = self.store;

        tracing::info!("Loading library from {}", index_dir);
        let scan_dir = index_dir.clone();
        let scanned = tokio::task::spawn_blocking(move || {
            if !scan_dir.exists() {
                tracing::info!("Index directory {} does not exist yet", scan_dir);
                return Ok(LoadReport::default());
            }
            store.load(&scan_dir)
        })
        .await;

        let report = match scanned {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                tracing::error!("Library load failed: {}", e);
                self.state.report_failure(index_dir.as_str(), e.to_string());
                LoadReport::default()
            }
            Err(e) => {
                tracing::error!("Library load task failed: {}", e);
                LoadReport::default()
            }
        };

        let loaded = report.blogs.len();
        let skipped = report.skipped.len();
        let collisions = self
            .state
            .update(move |s| s.finish_loading(report.blogs, skipped))
            .await?;
        for name in &collisions {
            tracing::warn!("Dropped second index file for blog {}", name);
        }

        let summary = LoadSummary {
            loaded: loaded - collisions.len(),
            skipped: skipped + collisions.len(),
        };
        tracing::info!(
            "Library loaded: {} blogs, {} skipped",
            summary.loaded,
            summary.skipped
        );
        Ok(summary)
    }

    /// Probe every blog and record whether it is online.
    ///
    /// A failed probe counts as offline. Returns how many blogs are online.
    pub async fn check_online_status(&self) -> Result<usize, StateError> {
        let blogs = self.state.read(|s| s.registry.all());
        let semaphore = Arc::new(Semaphore::new(self.settings().max_concurrent_additions.max(1)));
        tracing::info!("Checking online status of {} blogs", blogs.len());

        let mut tasks = Vec::new();
        for blog in blogs {
            let fetcher = self.fetchers.fetcher_for(blog.blog_type);
            let semaphore = Arc::clone(&semaphore);
            tasks.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let online = match fetcher.probe_online(&blog).await {
                    Ok(online) => online,
                    Err(e) => {
                        tracing::warn!("Online check for {} failed: {}", blog.name, e);
                        false
                    }
                };
                (blog.name, online)
            }));
        }

        let mut online_count = 0;
        for task in tasks {
            match task.await {
                Ok((name, online)) => {
                    if online {
                        online_count += 1;
                    }
                    self.state.set_online(name, online).await?;
                }
                Err(e) => tracing::error!("Online check task join error: {}", e),
            }
        }

        tracing::info!("Online check finished: {} online", online_count);
        Ok(online_count)
    }

    pub async fn add_blog(&self, url: &str) -> Result<Blog, AddBlogError> {
        let settings = self.settings();
        self.additions.add(url, &settings).await
    }

    pub async fn add_blogs(&self, urls: Vec<String>) -> BatchOutcome {
        self.additions
            .add_batch(urls, self.settings(), self.cancel_tx.subscribe())
            .await
    }

    /// Handle a clipboard change: every whitespace-separated word is a candidate URL.
    ///
    /// Returns the spawned batch, or `None` while listening is switched off.
    /// Must be called from within the tokio runtime.
    pub fn on_clipboard_changed(&self, text: &str) -> Option<JoinHandle<BatchOutcome>> {
        if !self.is_clipboard_listening() {
            return None;
        }

        let urls: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        if urls.is_empty() {
            return None;
        }

        let additions = Arc::clone(&self.additions);
        let settings = self.settings();
        let cancel = self.cancel_tx.subscribe();
        Some(tokio::spawn(async move {
            additions.add_batch(urls, settings, cancel).await
        }))
    }

    pub fn set_clipboard_listening(&self, listening: bool) {
        self.clipboard_listening.store(listening, Ordering::Relaxed);
        tracing::info!("Clipboard listening {}", if listening { "on" } else { "off" });
    }

    pub fn is_clipboard_listening(&self) -> bool {
        self.clipboard_listening.load(Ordering::Relaxed)
    }

    /// Enqueue the online blogs among `names`
    pub async fn enqueue_selected(&self, names: Vec<String>) -> Result<usize, StateError> {
        self.state
            .update(move |s| {
                let online: Vec<String> = names
                    .into_iter()
                    .filter(|name| s.registry.get(name).is_some_and(|blog| blog.online))
                    .collect();
                s.enqueue(online)
            })
            .await
    }

    pub fn can_enqueue_auto(&self) -> bool {
        self.state.read(|s| !s.registry.is_empty())
    }

    /// Enqueue by the configured auto-enqueue mode, then start or resume the crawl
    pub async fn enqueue_auto(&self) -> Result<AutoEnqueueOutcome, StateError> {
        if !self.can_enqueue_auto() {
            tracing::info!("Auto-enqueue skipped: the library is empty");
            return Ok(AutoEnqueueOutcome {
                enqueued: 0,
                trigger: None,
            });
        }

        let mode = self.settings().auto_enqueue_mode;
        let enqueued = self
            .state
            .update(move |s| {
                let names: Vec<String> = select_for_auto_enqueue(mode, s.registry.iter())
                    .into_iter()
                    .map(|blog| blog.name.clone())
                    .collect();
                s.enqueue(names)
            })
            .await?;

        let trigger = trigger_crawl(self.crawl.as_ref());
        tracing::info!(
            "Auto-enqueued {} blogs ({:?}), crawl {:?}",
            enqueued,
            mode,
            trigger
        );
        Ok(AutoEnqueueOutcome {
            enqueued,
            trigger: Some(trigger),
        })
    }

    pub async fn dequeue(&self, names: Vec<String>) -> Result<usize, StateError> {
        self.state.dequeue(names).await
    }

    /// Hand the oldest queue item to the crawl engine
    pub async fn take_next(&self) -> Result<Option<QueueItem>, StateError> {
        self.state.update(|s| s.queue.take_next()).await
    }

    pub async fn remove_blogs(&self, names: &[String]) -> RemovalReport {
        let delete_only_index = self.settings().delete_only_index;
        self.removals.remove(names, delete_only_index).await
    }

    /// Stop admitting URLs into running batches and log the metrics summary
    pub fn shutdown(&self) {
        tracing::info!("Shutting down manager controller");
        self.cancel_tx.send_replace(true);
        self.metrics.log_summary();
    }
}
