//! CLI argument parsing and processing

pub mod args;
pub mod print;
pub mod process;

// Re-exports
pub use args::{Args, DownloadMode};
pub use print::PrintFlags;
pub use process::{process_args, ProcessedArgs};
