//! Services module - the library's pipelines.
//!
//! Framework-agnostic business logic with no presentation dependencies. Every
//! registry or queue mutation goes through the [`StateManager`](crate::state::StateManager)
//! owner thread.
//!
//! # Components
//!
//! - [`AdditionPipeline`]: validate, probe, refresh metadata, then commit under
//!   one lock; [`AdditionPipeline::add_batch`] fans out with a concurrency ceiling
//! - [`select_for_auto_enqueue`] and [`trigger_crawl`]: pick blogs by
//!   [`AutoEnqueueMode`](crate::models::AutoEnqueueMode) and kick the crawl engine
//! - [`RemovalPipeline`]: content, index, then registry and queue, stopping a
//!   blog at the first failed step

pub mod addition;
pub mod enqueue;
pub mod removal;

pub use addition::{AddBlogError, AdditionPipeline, BatchOutcome};
pub use enqueue::{CrawlTrigger, select_for_auto_enqueue, trigger_crawl};
pub use removal::{RemovalPipeline, RemovalReport, RemoveBlogError};
