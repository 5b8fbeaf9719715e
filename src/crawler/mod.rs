//! Contract with the crawl engine.
//!
//! The library core never fetches content itself. It needs two things from the
//! crawl engine:
//!
//! - a per-source-type [`BlogFetcher`] to probe whether a blog is online and to
//!   refresh its metadata, picked through a [`FetcherFactory`] by [`BlogType`]
//! - a [`CrawlControl`] handle to start or resume crawling after auto-enqueue
//!
//! [`http::TumblrFetcher`] is the default fetcher and [`control::CrawlSignal`]
//! an in-process crawl control an embedded engine can follow.

pub mod control;
pub mod http;

pub use control::{CrawlSignal, CrawlStatus};
pub use http::TumblrFetcher;

use crate::models::{Blog, BlogMetadata, BlogType};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors from probing a blog or refreshing its metadata
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrawlError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("failed to parse response: {0}")]
    Parse(String),
}

/// Per-source-type capability object supplied by the crawl engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlogFetcher: Send + Sync {
    /// Check whether the blog is reachable right now
    async fn probe_online(&self, blog: &Blog) -> Result<bool, CrawlError>;

    /// Fetch the blog's current title and description
    async fn refresh_metadata(&self, blog: &Blog) -> Result<BlogMetadata, CrawlError>;
}

/// Picks the fetcher for a source type
pub trait FetcherFactory: Send + Sync {
    fn fetcher_for(&self, blog_type: BlogType) -> Arc<dyn BlogFetcher>;
}

/// One fetcher per source type
pub struct DefaultFetcherFactory {
    tumblr: Arc<dyn BlogFetcher>,
}

impl DefaultFetcherFactory {
    pub fn new(tumblr: Arc<dyn BlogFetcher>) -> Self {
        Self { tumblr }
    }
}

impl FetcherFactory for DefaultFetcherFactory {
    fn fetcher_for(&self, blog_type: BlogType) -> Arc<dyn BlogFetcher> {
        match blog_type {
            BlogType::Tumblr => Arc::clone(&self.tumblr),
        }
    }
}

/// Start/resume control over the crawl engine as a whole
pub trait CrawlControl: Send + Sync {
    fn is_running(&self) -> bool;
    fn is_paused(&self) -> bool;
    fn start(&self);
    fn resume(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Settings;

    fn blog() -> Blog {
        let url = BlogType::Tumblr.parse_url("https://example.tumblr.com").unwrap();
        Blog::new(url, &Settings::default())
    }

    #[tokio::test]
    async fn test_factory_dispatches_by_type() {
        let mut mock = MockBlogFetcher::new();
        mock.expect_probe_online().times(1).returning(|_| Ok(true));
        mock.expect_refresh_metadata().times(1).returning(|_| {
            Ok(BlogMetadata {
                title: Some("Example".to_string()),
                description: None,
            })
        });

        let factory = DefaultFetcherFactory::new(Arc::new(mock));
        let fetcher = factory.fetcher_for(BlogType::Tumblr);
        let blog = blog();

        assert!(fetcher.probe_online(&blog).await.unwrap());
        let metadata = fetcher.refresh_metadata(&blog).await.unwrap();
        assert_eq!(metadata.title.as_deref(), Some("Example"));
    }

    #[tokio::test]
    async fn test_mock_probe_failure() {
        let mut mock = MockBlogFetcher::new();
        mock.expect_probe_online()
            .returning(|_| Err(CrawlError::Status(404)));

        let result = mock.probe_online(&blog()).await;
        assert_eq!(result, Err(CrawlError::Status(404)));
    }
}
