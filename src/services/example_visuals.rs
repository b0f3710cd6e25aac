use std::sync::Arc;

use tracing::{error, info};

use crate::error::{ReconcileError, Result};
use crate::models::{Example, ImageRef, Visualization};
use crate::notification::{Outcome, ProgressSink};
use crate::reconcile::Reconciler;
use crate::storage::StorageGateway;

/// Saves worked examples and the visualizations attached to their steps.
///
/// Visualizations have no surrounding document, so their list order decides
/// the final `<solution>-example-<n>` names.
pub struct ExampleService {
    reconciler: Reconciler,
}

impl ExampleService {
    pub fn new(gateway: Arc<dyn StorageGateway>) -> Self {
        Self {
            reconciler: Reconciler::new(gateway),
        }
    }

    pub async fn save(
        &self,
        draft: &Example,
        existing: Option<&Example>,
        progress: &dyn ProgressSink,
    ) -> Result<Example> {
        match self.save_inner(draft, existing, progress).await {
            Ok(example) => {
                progress.finish(Outcome::Success("Example saved successfully".to_string()));
                Ok(example)
            }
            Err(e) => {
                error!("Failed to save example for solution {}: {}", draft.solution_id, e);
                let message = match &e {
                    ReconcileError::Validation(_) => e.to_string(),
                    _ => format!("Error processing images: {}", e),
                };
                progress.finish(Outcome::Error(message));
                Err(e)
            }
        }
    }

    async fn save_inner(
        &self,
        draft: &Example,
        existing: Option<&Example>,
        progress: &dyn ProgressSink,
    ) -> Result<Example> {
        draft.validate()?;
        progress.progress("Processing example images...");

        let mut visualizations: Vec<&Visualization> = Vec::with_capacity(draft.visualizations.len());
        for vis in &draft.visualizations {
            if !visualizations.iter().any(|v| v.image.id == vis.image.id) {
                visualizations.push(vis);
            }
        }

        let current: Vec<ImageRef> = visualizations.iter().map(|v| v.image.clone()).collect();
        let previous: Vec<ImageRef> = existing
            .map(|e| e.visualizations.iter().map(|v| v.image.clone()).collect())
            .unwrap_or_default();

        let final_images = self
            .reconciler
            .reconcile_sequence(&current, &previous, &draft.image_prefix(), progress)
            .await?;

        let visualizations = visualizations
            .into_iter()
            .zip(final_images)
            .map(|(vis, image)| Visualization {
                image: image.into_persisted(),
                associated_steps: vis.associated_steps.clone(),
            })
            .collect::<Vec<_>>();

        info!(
            "Prepared example for solution {} with {} visualization(s)",
            draft.solution_id,
            visualizations.len()
        );

        Ok(Example {
            solution_id: draft.solution_id,
            input: draft.input.clone(),
            steps: draft.steps.clone(),
            visualizations,
        })
    }
}
