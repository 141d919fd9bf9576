//! CLI command implementations.
//!
//! - **analyze**: run the deadlock analysis and write the report
//! - **init**: write a default `.lockscope.toml`

pub mod analyze;
pub mod init;

pub use analyze::{handle_analyze, AnalyzeConfig};
pub use init::init_config;
