use crate::config::{Config, DEFAULT_EXAMPLE_IMAGES_BUCKET, DEFAULT_PROBLEM_IMAGES_BUCKET};
use crate::storage::{factory::storage_config_from_env, StorageConfig};
use std::env;
use std::sync::Mutex;

// Tests in this module share the process environment
static ENV_LOCK: Mutex<()> = Mutex::new(());

// Helper function to clear environment variables
fn clear_storage_env_vars() {
    env::remove_var("STORAGE_ROOT");
    env::remove_var("PUBLIC_BASE_URL");
    env::remove_var("PROBLEM_IMAGES_BUCKET");
    env::remove_var("EXAMPLE_IMAGES_BUCKET");
    env::remove_var("S3_ENABLED");
    env::remove_var("S3_REGION");
    env::remove_var("S3_ACCESS_KEY_ID");
    env::remove_var("S3_SECRET_ACCESS_KEY");
    env::remove_var("S3_ENDPOINT_URL");
    env::remove_var("S3_PUBLIC_BASE_URL");
}

#[test]
fn test_all_storage_defaults_used() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
    clear_storage_env_vars();

    let config = Config::from_env().expect("Config should load successfully");

    assert_eq!(config.storage_root, "./storage");
    assert_eq!(config.problem_images_bucket, DEFAULT_PROBLEM_IMAGES_BUCKET);
    assert_eq!(config.example_images_bucket, DEFAULT_EXAMPLE_IMAGES_BUCKET);
    assert!(!config.s3_enabled);
    assert!(config.s3_config.is_none());
}

#[test]
fn test_overrides_from_env() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
    clear_storage_env_vars();

    env::set_var("STORAGE_ROOT", "/tmp/probdesk_storage");
    env::set_var("PUBLIC_BASE_URL", "https://cdn.example.com/public");
    env::set_var("PROBLEM_IMAGES_BUCKET", "problems");

    let config = Config::from_env().expect("Config should load successfully");

    assert_eq!(config.storage_root, "/tmp/probdesk_storage");
    assert_eq!(config.public_base_url, "https://cdn.example.com/public");
    assert_eq!(config.problem_images_bucket, "problems");
    assert_eq!(config.example_images_bucket, DEFAULT_EXAMPLE_IMAGES_BUCKET);

    match storage_config_from_env(&config, &config.problem_images_bucket) {
        StorageConfig::Local { root, bucket, public_base_url } => {
            assert_eq!(root, "/tmp/probdesk_storage");
            assert_eq!(bucket, "problems");
            assert_eq!(public_base_url, "https://cdn.example.com/public");
        }
        #[allow(unreachable_patterns)]
        other => panic!("expected local storage, got {:?}", other),
    }

    clear_storage_env_vars();
}

#[test]
fn test_s3_requires_credentials() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
    clear_storage_env_vars();

    env::set_var("S3_ENABLED", "true");
    let result = Config::from_env();
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("S3_ACCESS_KEY_ID"));

    clear_storage_env_vars();
}

#[test]
fn test_s3_config_loaded_when_enabled() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
    clear_storage_env_vars();

    env::set_var("S3_ENABLED", "1");
    env::set_var("S3_ACCESS_KEY_ID", "key");
    env::set_var("S3_SECRET_ACCESS_KEY", "secret");
    env::set_var("S3_ENDPOINT_URL", "http://localhost:9000");

    let config = Config::from_env().expect("Config should load successfully");
    let s3 = config.s3_config.clone().expect("S3 config should be present");

    assert!(config.s3_enabled);
    assert_eq!(s3.region, "us-east-1");
    assert_eq!(s3.endpoint_url.as_deref(), Some("http://localhost:9000"));
    assert!(s3.public_base_url.is_none());
    assert!(!format!("{:?}", s3).contains("secret\""));

    let storage = storage_config_from_env(&config, "problem-images");
    assert_eq!(storage.bucket(), "problem-images");
    #[cfg(feature = "s3")]
    assert!(matches!(storage, StorageConfig::S3 { .. }));
    #[cfg(not(feature = "s3"))]
    assert!(matches!(storage, StorageConfig::Local { .. }));

    clear_storage_env_vars();
}
