use std::sync::Arc;

use tracing::{error, info};

use crate::error::Result;
use crate::models::{images_changed, ImageRef, MdContent, Problem, ProblemDraft};
use crate::notification::{Outcome, ProgressSink};
use crate::reconcile::{ReconciliationRequest, Reconciler};
use crate::storage::StorageGateway;

/// Saves problem drafts, reconciling their embedded images first.
pub struct ProblemService {
    reconciler: Reconciler,
}

impl ProblemService {
    pub fn new(gateway: Arc<dyn StorageGateway>) -> Self {
        Self {
            reconciler: Reconciler::new(gateway),
        }
    }

    /// Turn a draft into the problem row to store.
    ///
    /// `existing` is the stored problem when editing. Its images are what the
    /// previous save persisted and its solution count carries over. Failures
    /// are reported to `progress` as well as returned; the draft is untouched
    /// so the save can be retried.
    pub async fn save(
        &self,
        draft: &ProblemDraft,
        existing: Option<&Problem>,
        progress: &dyn ProgressSink,
    ) -> Result<Problem> {
        match self.save_inner(draft, existing, progress).await {
            Ok(problem) => {
                progress.finish(Outcome::Success("Problem saved successfully".to_string()));
                Ok(problem)
            }
            Err(e) => {
                error!("Failed to save problem {}: {}", draft.id, e);
                progress.finish(Outcome::Error(e.to_string()));
                Err(e)
            }
        }
    }

    async fn save_inner(
        &self,
        draft: &ProblemDraft,
        existing: Option<&Problem>,
        progress: &dyn ProgressSink,
    ) -> Result<Problem> {
        draft.validate()?;
        progress.progress("Initializing problem save...");

        let original_images: &[ImageRef] = existing
            .map(|p| p.content.images.as_slice())
            .unwrap_or(&[]);

        let content = if images_changed(&draft.content.images, original_images) {
            progress.progress("Processing image changes...");
            let result = self
                .reconciler
                .reconcile(
                    ReconciliationRequest {
                        document: draft.content.text.clone(),
                        current_images: draft.content.images.clone(),
                        previous_images: original_images.to_vec(),
                        name_prefix: draft.image_prefix(),
                    },
                    progress,
                )
                .await?;
            progress.progress("Image processing complete. Preparing to save problem...");
            MdContent {
                text: result.document,
                images: result.final_images,
            }
        } else {
            progress.progress("No image changes detected. Preparing to save problem...");
            draft.content.clone()
        };

        let problem = Problem {
            id: draft.id,
            title: draft.title(),
            difficulty: draft.difficulty,
            problem_type: draft.problem_type,
            problem_date: draft.formatted_date()?,
            content: MdContent {
                text: content.text,
                images: content.images.into_iter().map(ImageRef::into_persisted).collect(),
            },
            solution_count: existing.map(|p| p.solution_count).unwrap_or(0),
        };

        info!("Prepared problem {} with {} image(s)", problem.id, problem.content.images.len());
        Ok(problem)
    }
}
