use crate::models::blog::{ContentToggles, MetaToggles, TransferFlags};
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Ceiling on simultaneous single-blog addition pipelines in a batch.
pub const DEFAULT_MAX_CONCURRENT_ADDITIONS: usize = 15;

/// Name of the directory under the download root that holds index files.
pub const INDEX_DIR_NAME: &str = "Index";

/// Rule used by auto-enqueue to pick blogs from the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoEnqueueMode {
    /// Every blog, no filter
    #[default]
    All,
    Online,
    OnlineCrawled,
    OnlineNeverCrawled,
}

/// User settings from `Settings.yaml`.
///
/// Read-only input to the library core. A clone is taken as the snapshot for
/// each operation, so later edits never reach already-created blogs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Download root; index files live in `<root>/Index`
    pub download_location: Utf8PathBuf,

    /// Keep downloaded content when removing a blog
    pub delete_only_index: bool,

    pub check_online_status_at_startup: bool,

    pub check_clipboard: bool,

    pub auto_enqueue_mode: AutoEnqueueMode,

    pub max_concurrent_additions: usize,

    /// Timeout handed to the fetchers' HTTP client
    pub request_timeout_secs: u64,

    pub download: ContentToggles,

    pub create_meta: MetaToggles,

    pub transfer: TransferFlags,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_location: Utf8PathBuf::from("Blogs"),
            delete_only_index: true,
            check_online_status_at_startup: false,
            check_clipboard: true,
            auto_enqueue_mode: AutoEnqueueMode::All,
            max_concurrent_additions: DEFAULT_MAX_CONCURRENT_ADDITIONS,
            request_timeout_secs: 30,
            download: ContentToggles::default(),
            create_meta: MetaToggles::default(),
            transfer: TransferFlags::default(),
        }
    }
}

impl Settings {
    /// Directory holding the per-blog index files
    pub fn index_dir(&self) -> Utf8PathBuf {
        self.download_location.join(INDEX_DIR_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.max_concurrent_additions, 15);
        assert_eq!(settings.auto_enqueue_mode, AutoEnqueueMode::All);
        assert!(settings.delete_only_index);
        assert!(!settings.check_online_status_at_startup);
        assert!(settings.download.photo);
    }

    #[test]
    fn test_index_dir() {
        let mut settings = Settings::default();
        settings.download_location = Utf8PathBuf::from("/srv/blogs");
        assert_eq!(settings.index_dir(), "/srv/blogs/Index");
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "delete_only_index: false\nauto_enqueue_mode: online_never_crawled\n";
        let settings: Settings = serde_yaml_ng::from_str(yaml).unwrap();

        assert!(!settings.delete_only_index);
        assert_eq!(settings.auto_enqueue_mode, AutoEnqueueMode::OnlineNeverCrawled);
        assert_eq!(settings.max_concurrent_additions, 15);
    }
}
