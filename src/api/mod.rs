//! Multi-cloud cluster-management REST API

pub mod client;
pub mod types;

pub use client::{ApiError, HttpTransport, MultiCloudClient, Transport};
