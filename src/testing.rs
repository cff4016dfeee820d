//! Recording fakes for the process runner and HTTP transport

use anyhow::Result;
use reqwest::Method;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::VecDeque;

use crate::api::{ApiError, Transport};
use crate::cloud::runner::{CommandRunner, RunnerError, describe};
use crate::commands::Context;
use crate::config::Settings;
use crate::utils::output::OutputFormat;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Query,
    Mutation,
}

/// Answers commands by prefix and records every invocation
#[derive(Default)]
pub struct RecordingRunner {
    responses: Vec<(String, String)>,
    failures: Vec<String>,
    calls: RefCell<Vec<(CallKind, String)>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands whose rendered line starts with `prefix` print `output`.
    /// Later registrations take precedence.
    pub fn respond(mut self, prefix: &str, output: &str) -> Self {
        self.responses.push((prefix.to_string(), output.to_string()));
        self
    }

    /// Commands whose rendered line starts with `prefix` exit non-zero
    pub fn fail(mut self, prefix: &str) -> Self {
        self.failures.push(prefix.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(_, c)| c.clone()).collect()
    }

    pub fn mutations(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|(kind, _)| *kind == CallKind::Mutation)
            .map(|(_, c)| c.clone())
            .collect()
    }

    fn answer(&self, kind: CallKind, program: &str, args: &[&str]) -> Result<String> {
        let line = describe(program, args);
        self.calls.borrow_mut().push((kind, line.clone()));

        if self.failures.iter().any(|p| line.starts_with(p.as_str())) {
            return Err(RunnerError::Failed {
                command: line,
                status: "exit status: 1".to_string(),
                stderr: "simulated failure".to_string(),
            }
            .into());
        }

        Ok(self
            .responses
            .iter()
            .rev()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, out)| out.clone())
            .unwrap_or_default())
    }
}

impl CommandRunner for RecordingRunner {
    fn query(&self, program: &str, args: &[&str]) -> Result<String> {
        self.answer(CallKind::Query, program, args)
    }

    fn run(&self, program: &str, args: &[&str]) -> Result<()> {
        self.answer(CallKind::Mutation, program, args).map(|_| ())
    }

    fn run_output(&self, program: &str, args: &[&str]) -> Result<String> {
        self.answer(CallKind::Mutation, program, args)
    }
}

/// Runner answering every identifier lookup the operations make
pub fn cloud_runner() -> RecordingRunner {
    RecordingRunner::new()
        .respond("gcloud config get-value project", "my-proj\n")
        .respond("gcloud config get-value account", "admin@example.com\n")
        .respond("gcloud projects describe", "123456789012\n")
        .respond("gcloud auth print-access-token", "ya29.token\n")
        .respond(
            "az account show",
            r#"{"id": "sub-1", "tenantId": "tenant-1", "name": "Dev"}"#,
        )
        .respond("az group show", "/subscriptions/sub-1/resourceGroups/anthos-cluster-rg\n")
        .respond(
            "az network vnet show",
            "/subscriptions/sub-1/resourceGroups/anthos-vnet-rg/providers/Microsoft.Network/virtualNetworks/anthos-vnet\n",
        )
        .respond(
            "az network vnet subnet show",
            "/subscriptions/sub-1/resourceGroups/anthos-vnet-rg/providers/Microsoft.Network/virtualNetworks/anthos-vnet/subnets/default\n",
        )
        .respond("az ad app list", "app-1\n")
}

/// Context over the given fakes, with settings keeping SSH keys and kubeconfig in `dir`
pub fn context<'a>(
    settings: &'a Settings,
    runner: &'a RecordingRunner,
    transport: &'a FakeTransport,
    dir: &Path,
) -> Context<'a> {
    Context {
        settings,
        runner,
        transport,
        output: OutputFormat::Text,
        dry_run: false,
        kubeconfig: dir.join("kubeconfig"),
    }
}

/// Settings whose SSH key directory is `dir`
pub fn settings_in(dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.cluster.ssh_key_dir = dir.to_string_lossy().to_string();
    settings
}

/// One request seen by the fake transport
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub token: String,
    pub body: Option<Value>,
}

/// Replays queued responses in order and records requests
#[derive(Default)]
pub struct FakeTransport {
    responses: RefCell<VecDeque<std::result::Result<Value, u16>>>,
    requests: RefCell<Vec<RecordedRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, value: Value) -> Self {
        self.responses.borrow_mut().push_back(Ok(value));
        self
    }

    pub fn reply_status(self, status: u16) -> Self {
        self.responses.borrow_mut().push_back(Err(status));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.borrow().clone()
    }
}

impl Transport for FakeTransport {
    fn send(
        &self,
        method: Method,
        url: &str,
        token: &str,
        body: Option<&Value>,
    ) -> std::result::Result<Value, ApiError> {
        self.requests.borrow_mut().push(RecordedRequest {
            method: method.clone(),
            url: url.to_string(),
            token: token.to_string(),
            body: body.cloned(),
        });

        match self.responses.borrow_mut().pop_front() {
            Some(Ok(value)) => Ok(value),
            Some(Err(status)) => Err(ApiError::Status {
                method: method.to_string(),
                url: url.to_string(),
                status,
                message: "simulated".to_string(),
            }),
            None => Ok(Value::Object(Default::default())),
        }
    }
}
