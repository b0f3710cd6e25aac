use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use super::image::MdContent;
use crate::error::{ReconcileError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemType {
    Daily,
    Weekly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProblemDifficulty {
    Easy,
    Medium,
    Hard,
}

/// Weekly problems are numbered within their month.
pub const MAX_WEEK_NUMBER: u32 = 5;

/// A problem row as stored by the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub id: i64,
    pub title: String,
    pub difficulty: ProblemDifficulty,
    pub problem_type: ProblemType,
    pub problem_date: String,
    pub content: MdContent,
    #[serde(default)]
    pub solution_count: i64,
}

impl Problem {
    /// The name part of a `"<id>. <name>"` title.
    pub fn name(&self) -> String {
        split_title(&self.title)
    }

    /// Week of the month encoded in a weekly problem's `YYYY-MM-<week>` date.
    pub fn week_number(&self) -> Option<u32> {
        match self.problem_type {
            ProblemType::Weekly => self.problem_date.split('-').nth(2)?.parse().ok(),
            ProblemType::Daily => None,
        }
    }
}

/// Strips the `"<id>."` prefix from a stored title.
pub fn split_title(title: &str) -> String {
    title
        .split('.')
        .skip(1)
        .collect::<Vec<_>>()
        .join(".")
        .trim()
        .to_string()
}

/// Problem as edited in the admin form, before it is saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemDraft {
    pub id: i64,
    pub name: String,
    pub difficulty: ProblemDifficulty,
    pub problem_type: ProblemType,
    pub problem_date: String,
    #[serde(default)]
    pub week_number: Option<u32>,
    pub content: MdContent,
}

impl ProblemDraft {
    pub fn from_problem(problem: &Problem) -> Self {
        Self {
            id: problem.id,
            name: problem.name(),
            difficulty: problem.difficulty,
            problem_type: problem.problem_type,
            problem_date: problem.problem_date.clone(),
            week_number: problem.week_number(),
            content: problem.content.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.id < 1 {
            return Err(ReconcileError::Validation(
                "Problem number must be a positive integer".to_string(),
            ));
        }
        if self.content.text.trim().is_empty() {
            return Err(ReconcileError::Validation(
                "Problem content cannot be empty".to_string(),
            ));
        }
        self.formatted_date()?;
        Ok(())
    }

    pub fn title(&self) -> String {
        format!("{}. {}", self.id, self.name)
    }

    /// Storage prefix for this problem's images, e.g. `42-problem`.
    pub fn image_prefix(&self) -> String {
        format!("{}-problem", self.id)
    }

    /// Date as stored: `YYYY-MM-DD` for daily problems, `YYYY-MM-<week>` for weekly ones.
    pub fn formatted_date(&self) -> Result<String> {
        match self.problem_type {
            ProblemType::Daily => parse_date(&self.problem_date)
                .map(|date| date.format("%Y-%m-%d").to_string())
                .ok_or_else(|| {
                    ReconcileError::Validation(format!("Invalid problem date: {}", self.problem_date))
                }),
            ProblemType::Weekly => {
                let week = self
                    .week_number
                    .filter(|week| (1..=MAX_WEEK_NUMBER).contains(week))
                    .ok_or_else(|| {
                        ReconcileError::Validation(format!(
                            "Weekly problems need a week number between 1 and {}",
                            MAX_WEEK_NUMBER
                        ))
                    })?;
                let mut parts = self.problem_date.split('-');
                match (parts.next(), parts.next()) {
                    (Some(year), Some(month)) if !year.is_empty() && !month.is_empty() => {
                        Ok(format!("{}-{}-{}", year, month, week))
                    }
                    _ => Err(ReconcileError::Validation(format!(
                        "Invalid problem date: {}",
                        self.problem_date
                    ))),
                }
            }
        }
    }
}

fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(input).ok().map(|dt| dt.date_naive()))
}
