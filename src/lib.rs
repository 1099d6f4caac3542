pub mod config;
pub mod error;
pub mod patch;
pub mod pipeline;
pub mod platform;
pub mod process;
pub mod prompt;
pub mod shutdown;
pub mod workspace;
