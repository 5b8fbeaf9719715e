//! Data models for the blog library.
//!
//! - [`Blog`]: persisted descriptor of one blog, keyed by name
//! - [`BlogType`]: source-type tag, drives URL validation and fetcher selection
//! - [`Settings`]: user settings consumed as an immutable snapshot
//! - [`AutoEnqueueMode`]: rule table used by auto-enqueue

pub mod blog;
pub mod settings;

pub use blog::{
    Blog, BlogMetadata, BlogType, BlogUrl, BlogUrlError, COMPANION_MARKER, ContentToggles,
    MetaToggles, TransferFlags,
};
pub use settings::{AutoEnqueueMode, DEFAULT_MAX_CONCURRENT_ADDITIONS, INDEX_DIR_NAME, Settings};
