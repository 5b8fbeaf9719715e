use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// One blog waiting in the download queue.
///
/// Refers to its blog by name; two items match when their names match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    pub blog_name: String,
    pub enqueued_at: DateTime<Utc>,
}

impl QueueItem {
    pub fn new(blog_name: impl Into<String>) -> Self {
        Self {
            blog_name: blog_name.into(),
            enqueued_at: Utc::now(),
        }
    }
}

/// FIFO of blogs handed to the crawl engine.
///
/// Consumption is from the front; removal may happen at any position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadQueue {
    items: VecDeque<QueueItem>,
}

impl DownloadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one item per name, in input order
    pub fn enqueue<I, S>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let before = self.items.len();
        self.items.extend(names.into_iter().map(QueueItem::new));
        self.items.len() - before
    }

    /// Remove every item whose blog name is in `names`.
    ///
    /// Returns how many items were removed.
    pub fn remove_many(&mut self, names: &[String]) -> usize {
        let before = self.items.len();
        self.items
            .retain(|item| !names.iter().any(|name| *name == item.blog_name));
        before - self.items.len()
    }

    /// Take the oldest item, for the crawl engine
    pub fn take_next(&mut self) -> Option<QueueItem> {
        self.items.pop_front()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|item| item.blog_name == name)
    }

    pub fn items(&self) -> impl Iterator<Item = &QueueItem> {
        self.items.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.items.iter().map(|item| item.blog_name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
