pub mod git;
mod manager;

pub use manager::{FinalizeOutcome, Workspace};
