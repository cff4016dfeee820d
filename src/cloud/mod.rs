//! Wrappers around the Azure and Google Cloud CLIs

pub mod az;
pub mod environment;
pub mod gcloud;
pub mod runner;
pub mod ssh;

pub use environment::Environment;
pub use runner::{CommandRunner, RunnerError, SystemRunner};
