// Re-export all model types for ease of use

pub mod example;
pub mod image;
pub mod problem;

pub use example::{parse_steps, Example, ExampleStep, Visualization};
pub use image::{images_changed, ImageRef, ImageSource, LocalFile, MdContent};
pub use problem::{split_title, Problem, ProblemDifficulty, ProblemDraft, ProblemType, MAX_WEEK_NUMBER};
