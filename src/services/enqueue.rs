use crate::crawler::CrawlControl;
use crate::models::{AutoEnqueueMode, Blog};

impl AutoEnqueueMode {
    /// Whether `blog` is picked by this mode
    pub fn selects(&self, blog: &Blog) -> bool {
        match self {
            AutoEnqueueMode::All => true,
            AutoEnqueueMode::Online => blog.online,
            AutoEnqueueMode::OnlineCrawled => blog.online && blog.has_been_crawled(),
            AutoEnqueueMode::OnlineNeverCrawled => blog.online && !blog.has_been_crawled(),
        }
    }
}

/// Filter a registry snapshot down to the blogs auto-enqueue should queue.
///
/// Registry order is kept.
pub fn select_for_auto_enqueue<'a, I>(mode: AutoEnqueueMode, blogs: I) -> Vec<&'a Blog>
where
    I: IntoIterator<Item = &'a Blog>,
{
    blogs.into_iter().filter(|blog| mode.selects(blog)).collect()
}

/// What [`trigger_crawl`] did to the crawl engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlTrigger {
    Resumed,
    Started,
    AlreadyRunning,
}

/// Resume a paused crawl, start an idle one, leave an active one alone
pub fn trigger_crawl(control: &dyn CrawlControl) -> CrawlTrigger {
    if control.is_paused() {
        control.resume();
        CrawlTrigger::Resumed
    } else if !control.is_running() {
        control.start();
        CrawlTrigger::Started
    } else {
        CrawlTrigger::AlreadyRunning
    }
}
