use crate::models::settings::Settings;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;
use url::Url;

/// Marker in the file name of a blog's companion sub-index.
///
/// Index scans skip every file whose name contains this marker.
pub const COMPANION_MARKER: &str = "_files";

/// Valid tumblr blog name: letters, digits and inner hyphens.
static BLOG_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9](?:[a-z0-9-]*[a-z0-9])?$").expect("Invalid blog name regex")
});

/// Source type of a blog.
///
/// The tag doubles as the extension of the blog's index file
/// (`<root>/Index/<name>.<tag>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlogType {
    #[default]
    Tumblr,
}

impl BlogType {
    /// Every supported source type, used when scanning the index directory.
    pub const ALL: [BlogType; 1] = [BlogType::Tumblr];

    /// File-name tag for this source type
    pub fn tag(&self) -> &'static str {
        match self {
            BlogType::Tumblr => "tumblr",
        }
    }

    /// Validate a candidate URL for this source type and derive the blog name.
    pub fn parse_url(&self, raw: &str) -> Result<BlogUrl, BlogUrlError> {
        match self {
            BlogType::Tumblr => parse_tumblr_url(raw),
        }
    }

    /// Shorthand for `parse_url(raw).is_ok()`
    pub fn is_valid_url(&self, raw: &str) -> bool {
        self.parse_url(raw).is_ok()
    }
}

impl fmt::Display for BlogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for BlogType {
    type Err = BlogUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlogType::ALL
            .into_iter()
            .find(|t| t.tag() == s)
            .ok_or_else(|| BlogUrlError::UnknownType(s.to_string()))
    }
}

/// Why a candidate URL was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlogUrlError {
    #[error("not a URL: {0}")]
    Malformed(String),

    #[error("unsupported scheme: {0}")]
    Scheme(String),

    #[error("not a tumblr blog host: {0}")]
    Host(String),

    #[error("invalid blog name: {0}")]
    Name(String),

    #[error("unknown blog type: {0}")]
    UnknownType(String),
}

/// A validated blog URL together with the name derived from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlogUrl {
    pub name: String,
    pub url: String,
    pub blog_type: BlogType,
}

fn parse_tumblr_url(raw: &str) -> Result<BlogUrl, BlogUrlError> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed).map_err(|_| BlogUrlError::Malformed(trimmed.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(BlogUrlError::Scheme(parsed.scheme().to_string()));
    }

    // The url crate lowercases hosts, so names are case-normalized here.
    let host = parsed
        .host_str()
        .ok_or_else(|| BlogUrlError::Host(trimmed.to_string()))?;
    let name = host
        .strip_suffix(".tumblr.com")
        .ok_or_else(|| BlogUrlError::Host(host.to_string()))?;

    if name == "www" || !BLOG_NAME_PATTERN.is_match(name) {
        return Err(BlogUrlError::Name(name.to_string()));
    }

    Ok(BlogUrl {
        name: name.to_string(),
        url: format!("https://{}.tumblr.com/", name),
        blog_type: BlogType::Tumblr,
    })
}

/// Which post kinds get downloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentToggles {
    pub audio: bool,
    pub photo: bool,
    pub video: bool,
    pub text: bool,
    pub quote: bool,
    pub conversation: bool,
    pub link: bool,
}

impl Default for ContentToggles {
    fn default() -> Self {
        Self {
            audio: true,
            photo: true,
            video: true,
            text: true,
            quote: true,
            conversation: true,
            link: true,
        }
    }
}

/// Which post kinds get a metadata sidecar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaToggles {
    pub photo: bool,
    pub video: bool,
    pub audio: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferFlags {
    /// Skip animated images
    pub skip_gif: bool,
    pub force_size: bool,
    /// Scan the download directory for existing files before fetching
    pub check_directory_for_files: bool,
    /// Only write the list of URLs instead of fetching content
    pub download_url_list: bool,
}

/// Metadata returned by a fetcher's refresh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlogMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Persisted descriptor of one blog.
///
/// `name` is the identity key. It is unique across the registry once the
/// blog has been committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blog {
    pub name: String,
    pub url: String,

    /// Directory holding the blog's index file
    pub location: Utf8PathBuf,

    pub blog_type: BlogType,

    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub online: bool,

    /// `None` means the blog was never crawled to completion
    #[serde(default)]
    pub last_complete_crawl: Option<DateTime<Utc>>,

    pub date_added: DateTime<Utc>,

    #[serde(default)]
    pub download: ContentToggles,
    #[serde(default)]
    pub create_meta: MetaToggles,
    #[serde(default)]
    pub transfer: TransferFlags,
}

impl Blog {
    /// Build a new, not yet persisted blog from a validated URL and a settings snapshot.
    pub fn new(blog_url: BlogUrl, settings: &Settings) -> Self {
        Self {
            name: blog_url.name,
            url: blog_url.url,
            location: settings.index_dir(),
            blog_type: blog_url.blog_type,
            title: String::new(),
            description: String::new(),
            online: false,
            last_complete_crawl: None,
            date_added: Utc::now(),
            download: settings.download,
            create_meta: settings.create_meta,
            transfer: settings.transfer,
        }
    }

    /// Path of the index file, `<location>/<name>.<tag>`
    pub fn index_path(&self) -> Utf8PathBuf {
        self.location
            .join(format!("{}.{}", self.name, self.blog_type.tag()))
    }

    /// Path of the companion sub-index, `<location>/<name>_files.<tag>`
    pub fn companion_path(&self) -> Utf8PathBuf {
        self.location.join(format!(
            "{}{}.{}",
            self.name,
            COMPANION_MARKER,
            self.blog_type.tag()
        ))
    }

    /// Directory the crawl engine downloads this blog's content into.
    ///
    /// Sibling of the index directory: `<root>/<name>`.
    pub fn download_location(&self) -> Utf8PathBuf {
        let root: &Utf8Path = self.location.parent().unwrap_or(self.location.as_path());
        root.join(&self.name)
    }

    pub fn has_been_crawled(&self) -> bool {
        self.last_complete_crawl.is_some()
    }

    pub fn apply_metadata(&mut self, metadata: BlogMetadata) {
        if let Some(title) = metadata.title {
            self.title = title;
        }
        if let Some(description) = metadata.description {
            self.description = description;
        }
    }
}
