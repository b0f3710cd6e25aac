//! Command line entry point for saving dashboard content against storage
//!
//! Usage:
//!   probdesk save-problem --input draft.json [--existing problem.json]
//!   probdesk save-example --input example.json [--existing example.json]
//!   probdesk purge --images images.json [--bucket problem-images]
//!
//! Draft files may carry a `files` map from image id to a local path; those
//! images are treated as new uploads. The saved record is printed as JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use probdesk::{
    config::Config,
    models::{Example, ImageRef, ImageSource, LocalFile, Problem, ProblemDraft},
    notification::TracingProgressSink,
    services::{purge_images, ExampleService, ProblemService},
    storage::{
        factory::{create_storage_gateway, storage_config_from_env},
        StorageGateway,
    },
};

#[derive(Parser)]
#[command(name = "probdesk")]
#[command(about = "Save problem content and keep its images in sync with storage")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile a problem draft's images and print the problem row to store
    SaveProblem {
        /// Draft JSON (problem form fields plus optional `files`)
        #[arg(short, long)]
        input: PathBuf,

        /// Stored problem JSON when editing an existing problem
        #[arg(short, long)]
        existing: Option<PathBuf>,
    },
    /// Reconcile an example's visualizations and print the example to store
    SaveExample {
        /// Example JSON (plus optional `files`)
        #[arg(short, long)]
        input: PathBuf,

        /// Stored example JSON when editing
        #[arg(short, long)]
        existing: Option<PathBuf>,
    },
    /// Delete every image listed in a JSON array
    Purge {
        #[arg(long)]
        images: PathBuf,

        /// Bucket to delete from (defaults to the problem images bucket)
        #[arg(long)]
        bucket: Option<String>,
    },
}

/// A draft record plus the local files backing its new images
#[derive(Deserialize)]
struct DraftFile<T> {
    #[serde(flatten)]
    record: T,
    #[serde(default)]
    files: BTreeMap<String, PathBuf>,
}

#[derive(Serialize)]
struct PurgeReport {
    deleted: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the JSON result, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("probdesk=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    match args.command {
        Command::SaveProblem { input, existing } => {
            let draft: DraftFile<ProblemDraft> = read_json(&input)?;
            let existing: Option<Problem> = existing.as_deref().map(read_json).transpose()?;

            let mut problem = draft.record;
            attach_files(&mut problem.content.images, &draft.files).await?;

            let gateway = gateway_for(&config, &config.problem_images_bucket).await?;
            let sink = TracingProgressSink::new(format!("problem {}", problem.id));
            let saved = ProblemService::new(gateway)
                .save(&problem, existing.as_ref(), &sink)
                .await?;

            print_json(&saved)
        }
        Command::SaveExample { input, existing } => {
            let draft: DraftFile<Example> = read_json(&input)?;
            let existing: Option<Example> = existing.as_deref().map(read_json).transpose()?;

            let mut example = draft.record;
            for vis in &mut example.visualizations {
                attach_file(&mut vis.image, &draft.files).await?;
            }

            let gateway = gateway_for(&config, &config.example_images_bucket).await?;
            let sink = TracingProgressSink::new(format!("example {}", example.solution_id));
            let saved = ExampleService::new(gateway)
                .save(&example, existing.as_ref(), &sink)
                .await?;

            print_json(&saved)
        }
        Command::Purge { images, bucket } => {
            let images: Vec<ImageRef> = read_json(&images)?;
            let bucket = bucket.unwrap_or_else(|| config.problem_images_bucket.clone());

            let gateway = gateway_for(&config, &bucket).await?;
            let deleted = purge_images(gateway.as_ref(), &images).await?;
            info!("Deleted {} image(s) from {}", deleted, bucket);

            print_json(&PurgeReport { deleted })
        }
    }
}

async fn gateway_for(config: &Config, bucket: &str) -> Result<Arc<dyn StorageGateway>> {
    let storage_config = storage_config_from_env(config, bucket);
    create_storage_gateway(storage_config)
        .await
        .with_context(|| format!("Failed to initialize storage for bucket {}", bucket))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn attach_files(images: &mut [ImageRef], files: &BTreeMap<String, PathBuf>) -> Result<()> {
    for image in images {
        attach_file(image, files).await?;
    }
    Ok(())
}

/// Load the local file for `image` if the draft lists one for its id
async fn attach_file(image: &mut ImageRef, files: &BTreeMap<String, PathBuf>) -> Result<()> {
    let Some(path) = files.get(&image.id) else {
        return Ok(());
    };

    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image file {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(&image.name)
        .to_string();

    if image.name.is_empty() {
        image.name = file_name.clone();
    }
    image.source = ImageSource::Local(LocalFile::new(file_name, data));
    Ok(())
}
