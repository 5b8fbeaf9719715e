use crate::crawler::{CrawlError, FetcherFactory};
use crate::metrics::Metrics;
use crate::models::{Blog, BlogType, BlogUrlError, Settings};
use crate::state::{RegistryError, StateError, StateManager};
use crate::store::{BlogStore, StoreError};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard, Semaphore, watch};

/// Why a candidate URL did not become a blog
#[derive(Error, Debug)]
pub enum AddBlogError {
    #[error("{url} is not a valid blog URL: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: BlogUrlError,
    },

    #[error("could not reach {name}: {source}")]
    ProbeFailed {
        name: String,
        #[source]
        source: CrawlError,
    },

    #[error("a blog named {0} is already in the library")]
    DuplicateName(String),

    #[error("could not save the index of {name}: {source}")]
    Persistence {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("library state unavailable while adding {name}: {source}")]
    State {
        name: String,
        #[source]
        source: StateError,
    },
}

impl AddBlogError {
    /// Name of the offending blog, or the raw URL when no name could be derived
    pub fn blog_name(&self) -> &str {
        match self {
            AddBlogError::InvalidUrl { url, .. } => url,
            AddBlogError::ProbeFailed { name, .. }
            | AddBlogError::Persistence { name, .. }
            | AddBlogError::State { name, .. }
            | AddBlogError::DuplicateName(name) => name,
        }
    }
}

/// Result of a batched addition
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub added: Vec<Blog>,
    pub failures: Vec<AddBlogError>,
    /// Candidates dropped by validation before taking a concurrency slot
    pub invalid: Vec<String>,
    /// The batch was abandoned before every URL was admitted
    pub cancelled: bool,
}

/// Turns candidate URLs into committed blogs.
///
/// Validation and the network-bound probe run fully concurrent. Only the
/// uniqueness check, the index write and the registry insert run under the
/// commit lock, one candidate at a time.
pub struct AdditionPipeline {
    state: StateManager,
    store: BlogStore,
    fetchers: Arc<dyn FetcherFactory>,
    metrics: Arc<Metrics>,
    commit_lock: Mutex<()>,
}

impl AdditionPipeline {
    pub fn new(
        state: StateManager,
        store: BlogStore,
        fetchers: Arc<dyn FetcherFactory>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            state,
            store,
            fetchers,
            metrics,
            commit_lock: Mutex::new(()),
        }
    }

    /// Add one blog from `url` using the given settings snapshot.
    ///
    /// Failures are logged and broadcast to the presentation layer before
    /// being returned.
    pub async fn add(&self, url: &str, settings: &Settings) -> Result<Blog, AddBlogError> {
        let result = self.try_add(url, settings).await;
        if let Err(e) = &result {
            self.report(e);
        }
        result
    }

    async fn try_add(&self, url: &str, settings: &Settings) -> Result<Blog, AddBlogError> {
        let blog_url = BlogType::default()
            .parse_url(url)
            .map_err(|source| AddBlogError::InvalidUrl {
                url: url.to_string(),
                source,
            })?;

        let mut blog = Blog::new(blog_url, settings);
        let fetcher = self.fetchers.fetcher_for(blog.blog_type);

        let started = Instant::now();
        let probed = async {
            let online = fetcher.probe_online(&blog).await?;
            let metadata = fetcher.refresh_metadata(&blog).await?;
            Ok::<_, CrawlError>((online, metadata))
        }
        .await;
        self.metrics.record_probe_time(started.elapsed());

        let (online, metadata) = probed.map_err(|source| AddBlogError::ProbeFailed {
            name: blog.name.clone(),
            source,
        })?;
        blog.online = online;
        blog.apply_metadata(metadata);

        self.commit(blog).await
    }

    /// Block commits until the guard is dropped.
    ///
    /// The library load holds this from the scan until the loaded registry is
    /// in place, so no addition checks against a half-loaded library.
    pub(crate) async fn hold_commits(&self) -> MutexGuard<'_, ()> {
        self.commit_lock.lock().await
    }

    /// Uniqueness check, persist and registry insert as one exclusive step.
    ///
    /// The lock is held until the owner thread has applied the insert, so the
    /// next candidate's check always sees it. An index file already on disk
    /// counts as a duplicate even before the library has been loaded.
    async fn commit(&self, blog: Blog) -> Result<Blog, AddBlogError> {
        let _guard = self.commit_lock.lock().await;

        if self.state.read(|s| s.registry.contains(&blog.name)) {
            return Err(AddBlogError::DuplicateName(blog.name));
        }

        self.store.persist_new(&blog).map_err(|source| match source {
            StoreError::AlreadyExists { .. } => AddBlogError::DuplicateName(blog.name.clone()),
            source => AddBlogError::Persistence {
                name: blog.name.clone(),
                source,
            },
        })?;

        let committed = blog.clone();
        let inserted = match self.state.update(move |s| s.registry.add(committed)).await {
            Ok(inserted) => inserted,
            Err(source) => {
                // persist_new created this index
                if let Err(e) = self.store.delete(&blog) {
                    tracing::error!("Could not roll back index of {}: {}", blog.name, e);
                }
                return Err(AddBlogError::State {
                    name: blog.name,
                    source,
                });
            }
        };
        inserted.map_err(|RegistryError::Duplicate(name)| AddBlogError::DuplicateName(name))?;

        self.metrics.record_blog_added();
        tracing::info!("Added blog {} ({})", blog.name, blog.url);
        Ok(blog)
    }

    fn report(&self, error: &AddBlogError) {
        match error {
            AddBlogError::InvalidUrl { .. } => {
                self.metrics.record_invalid_url();
                tracing::warn!("{}", error);
            }
            AddBlogError::DuplicateName(_) => {
                self.metrics.record_duplicate();
                tracing::warn!("{}", error);
            }
            AddBlogError::ProbeFailed { .. } => {
                self.metrics.record_probe_failure();
                tracing::error!("{}", error);
            }
            AddBlogError::Persistence { .. } => {
                self.metrics.record_persistence_failure();
                tracing::error!("{}", error);
            }
            AddBlogError::State { .. } => tracing::error!("{}", error),
        }
        self.state.report_failure(error.blog_name(), error.to_string());
    }

    /// Add many blogs with at most `settings.max_concurrent_additions` pipelines in flight.
    ///
    /// Invalid URLs are dropped before taking a slot. A slot is released only
    /// when its pipeline has finished, successfully or not. Setting `cancel`
    /// to true stops admission of further URLs; admitted ones run to completion.
    pub async fn add_batch(
        self: &Arc<Self>,
        urls: Vec<String>,
        settings: Arc<Settings>,
        mut cancel: watch::Receiver<bool>,
    ) -> BatchOutcome {
        let semaphore = Arc::new(Semaphore::new(settings.max_concurrent_additions.max(1)));
        let mut outcome = BatchOutcome::default();
        let mut tasks = Vec::new();

        tracing::info!(
            "Adding {} candidate URLs (max concurrent: {})",
            urls.len(),
            settings.max_concurrent_additions
        );

        for url in urls {
            if *cancel.borrow() {
                outcome.cancelled = true;
                break;
            }

            if !BlogType::default().is_valid_url(&url) {
                tracing::debug!("Skipping invalid candidate URL: {}", url);
                self.metrics.record_invalid_url();
                outcome.invalid.push(url);
                continue;
            }

            let permit = tokio::select! {
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = cancelled(&mut cancel) => {
                    outcome.cancelled = true;
                    break;
                }
            };

            let pipeline = Arc::clone(self);
            let settings = Arc::clone(&settings);
            tasks.push(tokio::spawn(async move {
                let _permit = permit;
                pipeline.add(&url, &settings).await
            }));
        }

        if outcome.cancelled {
            tracing::warn!("Batch addition cancelled; waiting for {} admitted URLs", tasks.len());
        }

        for task in tasks {
            match task.await {
                Ok(Ok(blog)) => outcome.added.push(blog),
                Ok(Err(e)) => outcome.failures.push(e),
                Err(e) => tracing::error!("Addition task join error: {}", e),
            }
        }

        tracing::info!(
            "Batch addition finished: {} added, {} failed, {} invalid",
            outcome.added.len(),
            outcome.failures.len(),
            outcome.invalid.len()
        );
        outcome
    }
}

/// Resolves once cancellation is requested; never if the sender is gone
pub(crate) async fn cancelled(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|cancel| *cancel).await.is_err() {
        std::future::pending::<()>().await;
    }
}
