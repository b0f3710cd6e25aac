pub mod editor_images;
pub mod example_visuals;
pub mod image_cleanup;
pub mod problem_content;

pub use editor_images::EditorImages;
pub use example_visuals::ExampleService;
pub use image_cleanup::purge_images;
pub use problem_content::ProblemService;
