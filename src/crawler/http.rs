use crate::crawler::{BlogFetcher, CrawlError};
use crate::models::{Blog, BlogMetadata};
use async_trait::async_trait;
use regex::Regex;
use reqwest::StatusCode;
use std::sync::LazyLock;
use std::time::Duration;

static TITLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid title regex")
});

// Attribute order varies between themes
static DESCRIPTION_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r#"(?is)<meta\s[^>]*name\s*=\s*["']description["'][^>]*content\s*=\s*["']([^"']*)["']"#)
            .expect("valid description regex"),
        Regex::new(r#"(?is)<meta\s[^>]*content\s*=\s*["']([^"']*)["'][^>]*name\s*=\s*["']description["']"#)
            .expect("valid description regex"),
    ]
});

/// Fetcher for tumblr blogs over plain HTTP(S)
pub struct TumblrFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl TumblrFetcher {
    pub fn new(timeout: Duration) -> Result<Self, CrawlError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CrawlError::Network(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    async fn get(&self, blog: &Blog) -> Result<reqwest::Response, CrawlError> {
        tracing::debug!("GET {}", blog.url);
        self.client
            .get(&blog.url)
            .send()
            .await
            .map_err(|e| self.map_error(e))
    }

    fn map_error(&self, error: reqwest::Error) -> CrawlError {
        if error.is_timeout() {
            CrawlError::Timeout(self.timeout)
        } else {
            CrawlError::Network(error.to_string())
        }
    }
}

#[async_trait]
impl BlogFetcher for TumblrFetcher {
    async fn probe_online(&self, blog: &Blog) -> Result<bool, CrawlError> {
        let response = self.get(blog).await?;
        let status = response.status();

        match status {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                tracing::info!("Blog {} is offline ({})", blog.name, status);
                Ok(false)
            }
            s => Err(CrawlError::Status(s.as_u16())),
        }
    }

    async fn refresh_metadata(&self, blog: &Blog) -> Result<BlogMetadata, CrawlError> {
        let response = self.get(blog).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| self.map_error(e))?;
        Ok(parse_metadata(&body))
    }
}

/// Pull the page title and description meta tag out of a blog's front page
pub fn parse_metadata(html: &str) -> BlogMetadata {
    let title = TITLE_PATTERN
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| decode_entities(m.as_str().trim()))
        .filter(|t| !t.is_empty());

    let description = DESCRIPTION_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(html))
        .and_then(|caps| caps.get(1))
        .map(|m| decode_entities(m.as_str().trim()))
        .filter(|d| !d.is_empty());

    BlogMetadata { title, description }
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
