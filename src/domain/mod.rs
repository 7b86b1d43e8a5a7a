//! Domain logic - the version model, independent of any VCS

pub mod stage;
pub mod version;

pub use stage::Stage;
pub use version::{bump_version, Bump, Version};
