pub mod orchestration;

pub use orchestration::{resolve_options, run_check, run_from, run_from_with, FromResult, FromWorkflowArgs};
