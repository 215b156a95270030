pub mod project;

pub use project::{Lifecycle, Project};
