//! Integration tests for ConfigManager and settings file handling
//!
//! These tests verify:
//! - Settings loading and saving
//! - Defaults for missing files and missing keys
//! - Environment overrides
//! - Settings snapshots reaching new blogs through the controller

mod common;

use blogkeeper::{AutoEnqueueMode, ConfigManager, Settings};
use camino::Utf8PathBuf;
use common::{FakeFetcher, controller_with};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, config_path)
}

fn empty_env() -> Option<config::Map<String, String>> {
    Some(config::Map::new())
}

#[test]
fn test_create_config_manager() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    assert_eq!(manager.config_dir(), &config_path);
    assert_eq!(manager.settings_path(), config_path.join("Settings.yaml"));
}

#[test]
fn test_config_directory_creation() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let nested = config_path.join("nested").join("config");

    ConfigManager::new(&nested).unwrap();

    assert!(nested.is_dir());
}

#[test]
fn test_partial_file_fills_defaults() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();
    fs::write(
        manager.settings_path(),
        "download_location: /srv/blogs\ncheck_online_status_at_startup: true\ndownload:\n  video: false\n",
    )
    .unwrap();

    let settings = manager.load_settings_with_env(empty_env()).unwrap();

    assert_eq!(settings.download_location, Utf8PathBuf::from("/srv/blogs"));
    assert_eq!(settings.index_dir(), Utf8PathBuf::from("/srv/blogs/Index"));
    assert!(settings.check_online_status_at_startup);
    assert!(!settings.download.video);
    assert!(settings.download.photo);
    assert_eq!(settings.max_concurrent_additions, 15);
}

#[test]
fn test_save_and_load_settings() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();
    let mut settings = Settings::default();
    settings.auto_enqueue_mode = AutoEnqueueMode::Online;
    settings.check_clipboard = false;
    settings.transfer.force_size = true;

    manager.save_settings(&settings).unwrap();
    let loaded = manager.load_settings_with_env(empty_env()).unwrap();

    assert_eq!(loaded, settings);
}

#[test]
fn test_env_override_wins() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();
    manager.save_settings(&Settings::default()).unwrap();

    let mut env = config::Map::new();
    env.insert(
        "BLOGKEEPER_MAX_CONCURRENT_ADDITIONS".to_string(),
        "5".to_string(),
    );
    let settings = manager.load_settings_with_env(Some(env)).unwrap();

    assert_eq!(settings.max_concurrent_additions, 5);
}

#[test]
fn test_invalid_yaml_handling() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();
    fs::write(manager.settings_path(), "invalid: yaml: content: {{").unwrap();

    let result = manager.load_settings_with_env(empty_env());
    assert!(result.is_err(), "Should fail to parse invalid YAML");
}

#[test]
fn test_concurrent_config_access() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = Arc::new(ConfigManager::new(&config_path).unwrap());
    manager.save_settings(&Settings::default()).unwrap();

    let mut handles = vec![];
    for _ in 0..10 {
        let manager_clone = manager.clone();
        handles.push(std::thread::spawn(move || {
            manager_clone.load_settings_with_env(empty_env()).unwrap()
        }));
    }

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Settings::default());
    }
}

#[tokio::test]
async fn test_loaded_settings_drive_the_controller() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();
    let mut settings = Settings::default();
    settings.download_location = config_path.join("library");
    settings.create_meta.photo = true;
    manager.save_settings(&settings).unwrap();

    let loaded = manager.load_settings_with_env(empty_env()).unwrap();
    let (controller, _) = controller_with(Arc::new(FakeFetcher::new()), loaded);
    let blog = controller.add_blog("https://meta.tumblr.com").await.unwrap();

    assert!(blog.create_meta.photo);
    assert!(config_path.join("library/Index/meta.tumblr").exists());
}
