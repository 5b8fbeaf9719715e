//! Shared fakes for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use blogkeeper::crawler::CrawlError;
use blogkeeper::models::{Blog, BlogMetadata, BlogType};
use blogkeeper::{
    BlogFetcher, BlogStore, CrawlSignal, DefaultFetcherFactory, ManagerController, Settings,
};
use camino::Utf8PathBuf;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Fetcher that sleeps instead of doing network I/O and records how many
/// probes run at once
#[derive(Default)]
pub struct FakeFetcher {
    pub delay: Duration,
    pub offline: bool,
    pub failing: HashSet<String>,
    pub probes: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    pub fn failing_for(names: &[&str]) -> Self {
        Self {
            failing: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlogFetcher for FakeFetcher {
    async fn probe_online(&self, blog: &Blog) -> Result<bool, CrawlError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&blog.name) {
            return Err(CrawlError::Network("connection refused".to_string()));
        }
        Ok(!self.offline)
    }

    async fn refresh_metadata(&self, blog: &Blog) -> Result<BlogMetadata, CrawlError> {
        Ok(BlogMetadata {
            title: Some(format!("{} title", blog.name)),
            description: None,
        })
    }
}

pub fn temp_settings(dir: &TempDir) -> Settings {
    Settings {
        download_location: Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap(),
        ..Settings::default()
    }
}

pub fn controller_with(
    fetcher: Arc<FakeFetcher>,
    settings: Settings,
) -> (Arc<ManagerController>, Arc<CrawlSignal>) {
    let crawl = Arc::new(CrawlSignal::new());
    let controller = ManagerController::new(
        settings,
        Arc::new(DefaultFetcherFactory::new(fetcher)),
        crawl.clone(),
    );
    (Arc::new(controller), crawl)
}

/// Write a valid index file for `name` as if it had been added earlier
pub fn write_index(settings: &Settings, name: &str) -> Blog {
    let url = BlogType::Tumblr
        .parse_url(&format!("https://{}.tumblr.com", name))
        .unwrap();
    let blog = Blog::new(url, settings);
    BlogStore::new().persist(&blog).unwrap();
    blog
}

pub fn urls(names: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<String> {
    names
        .into_iter()
        .map(|n| format!("https://{}.tumblr.com", n.as_ref()))
        .collect()
}
