use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::image::ImageRef;
use crate::error::{ReconcileError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleStep {
    pub step_number: u32,
    pub description: String,
}

/// An example image and the steps it illustrates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visualization {
    #[serde(flatten)]
    pub image: ImageRef,
    #[serde(default)]
    pub associated_steps: Vec<u32>,
}

/// Worked example attached to a solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub solution_id: i64,
    pub input: String,
    #[serde(default)]
    pub steps: Vec<ExampleStep>,
    #[serde(default)]
    pub visualizations: Vec<Visualization>,
}

impl Example {
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(ReconcileError::Validation(
                "Example must have at least one step".to_string(),
            ));
        }
        if self.input.trim().is_empty() {
            return Err(ReconcileError::Validation(
                "Example must have an input".to_string(),
            ));
        }
        if self.visualizations.iter().any(|v| v.associated_steps.is_empty()) {
            return Err(ReconcileError::Validation(
                "All visualizations must be associated with at least one step".to_string(),
            ));
        }
        Ok(())
    }

    /// Storage prefix for this example's visualizations, e.g. `7-example`.
    pub fn image_prefix(&self) -> String {
        format!("{}-example", self.solution_id)
    }
}

static STEP_MARKER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\d+\.").expect("Step marker regex should be valid")
});

/// Splits numbered-list text into steps.
///
/// A line starting with `N.` opens a new step; other lines continue the
/// current one. Text before the first numbered line is dropped.
pub fn parse_steps(text: &str) -> Vec<ExampleStep> {
    let mut steps: Vec<ExampleStep> = Vec::new();
    let mut current: Option<ExampleStep> = None;

    for line in text.split('\n') {
        if let Some(m) = STEP_MARKER_REGEX.find(line) {
            if let Some(step) = current.take() {
                steps.push(step);
            }
            current = Some(ExampleStep {
                step_number: steps.len() as u32 + 1,
                description: line[m.end()..].trim_start().to_string(),
            });
        } else if let Some(step) = current.as_mut() {
            step.description.push('\n');
            step.description.push_str(line);
        }
    }

    if let Some(step) = current {
        steps.push(step);
    }
    steps
}
