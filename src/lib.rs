//! azure-anthos: create and manage Anthos clusters on Azure

pub mod api;
pub mod cloud;
pub mod commands;
pub mod config;
pub mod k8s;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
