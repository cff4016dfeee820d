//! Kubernetes client configuration

pub mod kubeconfig;
