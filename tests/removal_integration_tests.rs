//! Integration tests for blog removal through the controller

mod common;

use blogkeeper::services::RemoveBlogError;
use common::{FakeFetcher, controller_with, temp_settings, write_index};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_remove_purges_every_queue_item() {
    let dir = TempDir::new().unwrap();
    let settings = temp_settings(&dir);
    write_index(&settings, "keep");
    let gone = write_index(&settings, "gone");
    let (controller, _) = controller_with(Arc::new(FakeFetcher::new()), settings);
    controller.initialize().await.unwrap();

    let names = vec![
        "gone".to_string(),
        "keep".to_string(),
        "gone".to_string(),
        "gone".to_string(),
    ];
    controller
        .state()
        .update(move |s| s.enqueue(names))
        .await
        .unwrap();

    let report = controller.remove_blogs(&["gone".to_string()]).await;

    assert_eq!(report.removed, vec!["gone".to_string()]);
    let state = controller.state().snapshot();
    assert!(state.queue.items().all(|item| item.blog_name != "gone"));
    assert_eq!(state.queue.names(), vec!["keep".to_string()]);
    assert!(!state.registry.contains("gone"));
    assert!(!gone.index_path().exists());
    assert!(!gone.companion_path().exists());
}

#[tokio::test]
async fn test_content_failure_keeps_blog_and_index() {
    let dir = TempDir::new().unwrap();
    let mut settings = temp_settings(&dir);
    settings.delete_only_index = false;
    let stuck = write_index(&settings, "stuck");
    let fine = write_index(&settings, "fine");
    fs::write(stuck.download_location(), b"a file, not a directory").unwrap();
    fs::create_dir_all(fine.download_location()).unwrap();
    fs::write(fine.download_location().join("post.txt"), b"hello").unwrap();

    let (controller, _) = controller_with(Arc::new(FakeFetcher::new()), settings);
    controller.initialize().await.unwrap();

    let report = controller
        .remove_blogs(&["stuck".to_string(), "fine".to_string()])
        .await;

    assert_eq!(report.removed, vec!["fine".to_string()]);
    assert!(matches!(
        report.failures.as_slice(),
        [RemoveBlogError::ContentDeletion { name, .. }] if name == "stuck"
    ));
    assert!(controller.state().read(|s| s.registry.contains("stuck")));
    assert!(stuck.index_path().exists());
    assert!(!fine.download_location().exists());
    assert!(!fine.index_path().exists());
}

#[tokio::test]
async fn test_index_failure_keeps_blog_in_registry() {
    let dir = TempDir::new().unwrap();
    let settings = temp_settings(&dir);
    let blog = write_index(&settings, "locked");
    let (controller, _) = controller_with(Arc::new(FakeFetcher::new()), settings);
    controller.initialize().await.unwrap();

    // Replace the index file with a non-empty directory so it cannot be unlinked
    fs::remove_file(blog.index_path()).unwrap();
    fs::create_dir_all(blog.index_path().join("inner")).unwrap();

    let report = controller.remove_blogs(&["locked".to_string()]).await;

    assert!(matches!(
        report.failures.as_slice(),
        [RemoveBlogError::IndexDeletion { name, .. }] if name == "locked"
    ));
    assert!(controller.state().read(|s| s.registry.contains("locked")));
}

#[tokio::test]
async fn test_default_settings_keep_downloaded_content() {
    let dir = TempDir::new().unwrap();
    let settings = temp_settings(&dir);
    assert!(settings.delete_only_index);
    let blog = write_index(&settings, "archive");
    fs::create_dir_all(blog.download_location()).unwrap();

    let (controller, _) = controller_with(Arc::new(FakeFetcher::new()), settings);
    controller.initialize().await.unwrap();
    let report = controller.remove_blogs(&["archive".to_string()]).await;

    assert_eq!(report.removed.len(), 1);
    assert!(blog.download_location().exists());
    assert!(!blog.index_path().exists());
}

#[tokio::test]
async fn test_removed_blog_can_be_added_again() {
    let dir = TempDir::new().unwrap();
    let (controller, _) = controller_with(Arc::new(FakeFetcher::new()), temp_settings(&dir));
    controller.add_blog("https://again.tumblr.com").await.unwrap();

    controller.remove_blogs(&["again".to_string()]).await;
    let readded = controller.add_blog("https://again.tumblr.com").await;

    assert!(readded.is_ok());
    assert_eq!(controller.state().read(|s| s.registry.len()), 1);
}
