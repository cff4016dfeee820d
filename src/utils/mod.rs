//! Utility modules for azure-anthos

pub mod dryrun;
pub mod errors;
pub mod logger;
pub mod output;
pub mod prereqs;
pub mod progress;

// Re-export commonly used items
pub use errors::{AnthosError, display_error_and_exit, enhance_error};
pub use logger::{log_error, log_info, log_warn};
pub use output::OutputFormat;
pub use prereqs::{Prerequisite, Tool, check_prerequisites};
