use crate::metrics::Metrics;
use crate::state::{StateError, StateManager};
use crate::store::{BlogStore, StoreError};
use camino::Utf8PathBuf;
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Why a blog stayed in the library after a removal request
#[derive(Error, Debug)]
pub enum RemoveBlogError {
    #[error("blog {0} is not in the library")]
    NotFound(String),

    #[error("could not delete downloaded content of {name} at {path}: {source}")]
    ContentDeletion {
        name: String,
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not delete the index of {name}: {source}")]
    IndexDeletion {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("library state unavailable while removing {name}: {source}")]
    State {
        name: String,
        #[source]
        source: StateError,
    },
}

impl RemoveBlogError {
    pub fn blog_name(&self) -> &str {
        match self {
            RemoveBlogError::NotFound(name)
            | RemoveBlogError::ContentDeletion { name, .. }
            | RemoveBlogError::IndexDeletion { name, .. }
            | RemoveBlogError::State { name, .. } => name,
        }
    }
}

#[derive(Debug, Default)]
pub struct RemovalReport {
    pub removed: Vec<String>,
    pub failures: Vec<RemoveBlogError>,
}

/// Deletes blogs from disk and from the library.
///
/// Each blog goes content, then index, then registry. A failed step stops that
/// blog where it is so the registry never loses track of files still on disk.
pub struct RemovalPipeline {
    state: StateManager,
    store: BlogStore,
    metrics: Arc<Metrics>,
}

impl RemovalPipeline {
    pub fn new(state: StateManager, store: BlogStore, metrics: Arc<Metrics>) -> Self {
        Self {
            state,
            store,
            metrics,
        }
    }

    /// Remove every named blog; one blog's failure does not stop the others.
    pub async fn remove(&self, names: &[String], delete_only_index: bool) -> RemovalReport {
        let mut report = RemovalReport::default();

        for name in names {
            match self.remove_one(name, delete_only_index).await {
                Ok(()) => {
                    self.metrics.record_blog_removed();
                    tracing::info!("Removed blog {}", name);
                    report.removed.push(name.clone());
                }
                Err(e) => {
                    self.metrics.record_removal_failure();
                    tracing::error!("{}", e);
                    self.state.report_failure(e.blog_name(), e.to_string());
                    report.failures.push(e);
                }
            }
        }

        report
    }

    async fn remove_one(&self, name: &str, delete_only_index: bool) -> Result<(), RemoveBlogError> {
        let blog = self
            .state
            .read(|s| s.registry.get(name).cloned())
            .ok_or_else(|| RemoveBlogError::NotFound(name.to_string()))?;

        if !delete_only_index {
            let path = blog.download_location();
            match tokio::fs::remove_dir_all(&path).await {
                Ok(()) => tracing::debug!("Deleted content directory {}", path),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!("No content directory for {} at {}", name, path);
                }
                Err(source) => {
                    return Err(RemoveBlogError::ContentDeletion {
                        name: blog.name,
                        path,
                        source,
                    });
                }
            }
        }

        self.store
            .delete(&blog)
            .map_err(|source| RemoveBlogError::IndexDeletion {
                name: blog.name.clone(),
                source,
            })?;

        let removed = blog.name.clone();
        self.state
            .update(move |s| {
                s.remove_blog(&removed);
            })
            .await
            .map_err(|source| RemoveBlogError::State {
                name: blog.name,
                source,
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Blog, BlogType, Settings};
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        state: StateManager,
        pipeline: RemovalPipeline,
        blog: Blog,
    }

    async fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            download_location: Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap(),
            ..Settings::default()
        };
        let url = BlogType::Tumblr.parse_url("https://doomed.tumblr.com").unwrap();
        let blog = Blog::new(url, &settings);
        BlogStore::new().persist(&blog).unwrap();

        let state = StateManager::new();
        let committed = blog.clone();
        state
            .update(move |s| {
                s.registry.add(committed).unwrap();
                s.enqueue(vec!["doomed".to_string(), "doomed".to_string()]);
            })
            .await
            .unwrap();

        let pipeline = RemovalPipeline::new(state.clone(), BlogStore::new(), Arc::new(Metrics::new()));
        Fixture {
            _dir: dir,
            state,
            pipeline,
            blog,
        }
    }

    #[tokio::test]
    async fn test_remove_deletes_everything() {
        let f = fixture().await;
        let content = f.blog.download_location();
        fs::create_dir_all(content.join("photos")).unwrap();
        fs::write(content.join("photos/1.jpg"), b"jpg").unwrap();

        let report = f.pipeline.remove(&["doomed".to_string()], false).await;

        assert_eq!(report.removed, vec!["doomed".to_string()]);
        assert!(!content.exists());
        assert!(!f.blog.index_path().exists());
        assert!(!f.blog.companion_path().exists());
        assert!(f.state.read(|s| s.registry.is_empty() && s.queue.is_empty()));
    }

    #[tokio::test]
    async fn test_delete_only_index_keeps_content() {
        let f = fixture().await;
        let content = f.blog.download_location();
        fs::create_dir_all(&content).unwrap();

        let report = f.pipeline.remove(&["doomed".to_string()], true).await;

        assert_eq!(report.removed.len(), 1);
        assert!(content.exists());
        assert!(!f.blog.index_path().exists());
    }

    #[tokio::test]
    async fn test_missing_content_directory_is_not_a_failure() {
        let f = fixture().await;

        let report = f.pipeline.remove(&["doomed".to_string()], false).await;

        assert!(report.failures.is_empty());
        assert_eq!(report.removed.len(), 1);
    }

    #[tokio::test]
    async fn test_content_failure_keeps_blog_and_index() {
        let f = fixture().await;
        // A plain file where the content directory should be
        fs::write(f.blog.download_location(), b"not a directory").unwrap();

        let report = f.pipeline.remove(&["doomed".to_string()], false).await;

        assert!(report.removed.is_empty());
        assert!(matches!(
            report.failures.as_slice(),
            [RemoveBlogError::ContentDeletion { name, .. }] if name == "doomed"
        ));
        assert!(f.blog.index_path().exists());
        assert!(f.state.read(|s| s.registry.contains("doomed")));
        assert_eq!(f.state.read(|s| s.queue.len()), 2);
    }

    #[tokio::test]
    async fn test_unknown_blog_does_not_block_others() {
        let f = fixture().await;

        let report = f
            .pipeline
            .remove(&["ghost".to_string(), "doomed".to_string()], true)
            .await;

        assert_eq!(report.removed, vec!["doomed".to_string()]);
        assert!(matches!(
            report.failures.as_slice(),
            [RemoveBlogError::NotFound(name)] if name == "ghost"
        ));
    }

    #[tokio::test]
    async fn test_owner_failure_names_the_blog() {
        let f = fixture().await;
        let mut events = f.state.subscribe();
        let stopped = f.state.update::<_, ()>(|_| panic!("owner thread gone")).await;
        assert!(stopped.is_err());

        let report = f.pipeline.remove(&["doomed".to_string()], true).await;

        assert!(matches!(
            report.failures.as_slice(),
            [RemoveBlogError::State { name, .. }] if name == "doomed"
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            crate::state::LibraryChange::OperationFailed { blog, .. } if blog == "doomed"
        ));
    }
}
