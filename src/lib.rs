// Blogkeeper - blog library registry and download queue orchestrator
//
// This is the library crate containing the core business logic and data structures.
// The binary crate (main.rs) provides a headless command-line front end.

pub mod config;
pub mod controller;
pub mod crawler;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;
pub mod store;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use controller::ManagerController;
pub use crawler::{BlogFetcher, CrawlControl, CrawlSignal, DefaultFetcherFactory, FetcherFactory};
pub use models::{AutoEnqueueMode, Blog, BlogType, Settings};
pub use state::{LibraryChange, StateManager};
pub use store::BlogStore;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
