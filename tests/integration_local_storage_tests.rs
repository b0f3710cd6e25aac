//! Problem saves against the filesystem gateway

use std::sync::Arc;

use tempfile::TempDir;

use probdesk::config::Config;
use probdesk::models::{ImageRef, LocalFile, MdContent, Problem, ProblemDifficulty, ProblemDraft, ProblemType};
use probdesk::notification::Outcome;
use probdesk::services::{purge_images, ProblemService};
use probdesk::storage::factory::{create_storage_gateway, storage_config_from_env};
use probdesk::storage::local::LocalStorageGateway;
use probdesk::storage::StorageGateway;
use probdesk::test_helpers::RecordingProgressSink;

const BASE_URL: &str = "http://localhost:8000/public";
const BUCKET: &str = "problem-images";

fn local_gateway(dir: &TempDir) -> Arc<LocalStorageGateway> {
    Arc::new(LocalStorageGateway::new(dir.path(), BUCKET, BASE_URL))
}

fn url(name: &str) -> String {
    format!("{}/{}/{}", BASE_URL, BUCKET, name)
}

fn draft(text: &str, images: Vec<ImageRef>) -> ProblemDraft {
    ProblemDraft {
        id: 42,
        name: "Grid Paths".to_string(),
        difficulty: ProblemDifficulty::Medium,
        problem_type: ProblemType::Daily,
        problem_date: "2024-05-01".to_string(),
        week_number: None,
        content: MdContent {
            text: text.to_string(),
            images,
        },
    }
}

fn local_image(id: &str, file_name: &str, data: &[u8]) -> ImageRef {
    ImageRef::local(id, format!("blob:{}", id), LocalFile::new(file_name, data.to_vec()))
}

async fn save_new_problem(gateway: Arc<LocalStorageGateway>) -> Problem {
    let sink = RecordingProgressSink::new();
    let images = vec![
        local_image("grid.png", "grid.png", b"grid"),
        local_image("path.jpg", "path.jpg", b"path"),
    ];
    ProblemService::new(gateway)
        .save(
            &draft("Grid: ![grid.png](grid.png)\nPath: ![path.jpg](path.jpg)", images),
            None,
            &sink,
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_new_problem_writes_final_files() {
    let dir = TempDir::new().unwrap();
    let gateway = local_gateway(&dir);
    gateway.initialize().await.unwrap();

    let problem = save_new_problem(gateway.clone()).await;

    assert_eq!(problem.title, "42. Grid Paths");
    assert_eq!(
        problem.content.text,
        format!(
            "Grid: ![42-problem-1.png]({})\nPath: ![42-problem-2.jpg]({})",
            url("42-problem-1.png"),
            url("42-problem-2.jpg")
        )
    );

    let bucket = gateway.bucket_path();
    assert_eq!(std::fs::read(bucket.join("42-problem-1.png")).unwrap(), b"grid");
    assert_eq!(std::fs::read(bucket.join("42-problem-2.jpg")).unwrap(), b"path");

    let mut on_disk: Vec<String> = std::fs::read_dir(&bucket)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    on_disk.sort();
    assert_eq!(on_disk, vec!["42-problem-1.png", "42-problem-2.jpg"]);
}

#[tokio::test]
async fn test_reordering_swaps_files_on_disk() {
    let dir = TempDir::new().unwrap();
    let gateway = local_gateway(&dir);
    gateway.initialize().await.unwrap();

    let saved = save_new_problem(gateway.clone()).await;
    let first = saved.content.images[0].clone();
    let second = saved.content.images[1].clone();

    // Swap the two references (and the editor's list) and save again
    let text = format!("Path: ![p]({})\nGrid: ![g]({})", second.url, first.url);
    let mut edit = ProblemDraft::from_problem(&saved);
    edit.content = MdContent {
        text,
        images: vec![second, first],
    };

    let sink = RecordingProgressSink::new();
    let resaved = ProblemService::new(gateway.clone())
        .save(&edit, Some(&saved), &sink)
        .await
        .unwrap();

    let names: Vec<&str> = resaved.content.images.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["42-problem-1.jpg", "42-problem-2.png"]);

    let bucket = gateway.bucket_path();
    assert_eq!(std::fs::read(bucket.join("42-problem-1.jpg")).unwrap(), b"path");
    assert_eq!(std::fs::read(bucket.join("42-problem-2.png")).unwrap(), b"grid");
    assert!(!bucket.join("42-problem-1.png").exists());
    assert!(!bucket.join("42-problem-2.jpg").exists());
    assert_eq!(sink.outcome(), Some(Outcome::Success("Problem saved successfully".to_string())));
}

#[tokio::test]
async fn test_dropped_reference_deletes_file() {
    let dir = TempDir::new().unwrap();
    let gateway = local_gateway(&dir);
    gateway.initialize().await.unwrap();

    let saved = save_new_problem(gateway.clone()).await;
    let second = saved.content.images[1].clone();

    let mut edit = ProblemDraft::from_problem(&saved);
    edit.content = MdContent {
        text: format!("Only the path now: ![p]({})", second.url),
        images: vec![second.clone()],
    };

    let sink = RecordingProgressSink::new();
    let resaved = ProblemService::new(gateway.clone())
        .save(&edit, Some(&saved), &sink)
        .await
        .unwrap();

    assert_eq!(resaved.content.images.len(), 1);
    assert_eq!(resaved.content.images[0].name, "42-problem-1.jpg");

    let bucket = gateway.bucket_path();
    assert!(!bucket.join("42-problem-1.png").exists());
    assert_eq!(std::fs::read(bucket.join("42-problem-1.jpg")).unwrap(), b"path");
    assert!(sink.messages().iter().any(|m| m == "Deleting 1 removed image(s)..."));
}

#[tokio::test]
async fn test_purge_removes_every_image() {
    let dir = TempDir::new().unwrap();
    let gateway = local_gateway(&dir);
    gateway.initialize().await.unwrap();

    let saved = save_new_problem(gateway.clone()).await;
    let deleted = purge_images(gateway.as_ref(), &saved.content.images).await.unwrap();

    assert_eq!(deleted, 2);
    assert_eq!(std::fs::read_dir(gateway.bucket_path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_factory_builds_local_gateway_from_config() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        storage_root: dir.path().to_string_lossy().into_owned(),
        public_base_url: BASE_URL.to_string(),
        problem_images_bucket: BUCKET.to_string(),
        example_images_bucket: "example-images".to_string(),
        s3_enabled: false,
        s3_config: None,
    };

    let storage_config = storage_config_from_env(&config, &config.example_images_bucket);
    assert_eq!(storage_config.bucket(), "example-images");

    let gateway = create_storage_gateway(storage_config).await.unwrap();
    assert_eq!(gateway.storage_type(), "local");
    assert!(dir.path().join("example-images").is_dir());
    assert_eq!(
        gateway.public_url("7-example-1.png").await.unwrap(),
        format!("{}/example-images/7-example-1.png", BASE_URL)
    );
}

#[cfg(feature = "s3")]
#[test]
fn test_s3_gateway_requires_bucket() {
    use probdesk::config::S3Config;
    use probdesk::storage::s3::S3StorageGateway;

    let config = S3Config {
        region: "us-east-1".to_string(),
        access_key_id: "test-key".to_string(),
        secret_access_key: "test-secret".to_string(),
        endpoint_url: Some("http://localhost:9000".to_string()),
        public_base_url: None,
    };

    let result = S3StorageGateway::new(config, "");
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Bucket name is required"));
}
