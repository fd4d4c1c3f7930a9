//! Windows Firewall rules via `netsh advfirewall firewall`.
//!
//! Every invocation runs without a console window and under a hard timeout;
//! a hung netsh is killed when its wait is abandoned.
//!
//! An existing rule is never deleted on the way to re-creating it: `apply`
//! asks whether the rule is present and only adds when it is not.
//! Rule presence is read from `show rule`'s exit status, so it does not
//! depend on the language of netsh's messages.

use std::ffi::OsString;
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;

use super::RuleExecutor;
use crate::config;
use crate::core::{Direction, Endpoint};
use crate::error::AppError;

/// netsh's answer when a delete or show matches nothing (English locale only).
const NO_MATCH_MARKER: &str = "No rules match the specified criteria";

/// netsh's answer when an add collides with an existing rule (English locale only).
const ALREADY_EXISTS_MARKER: &str = "already exists";

#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// How a finished `delete rule` call ended.
#[derive(Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NoMatch,
    /// Nonzero exit without a recognizable message; the rule may still exist.
    Unrecognized(String),
}

pub struct NetshExecutor {
    program: OsString,
    /// Arguments placed before the netsh arguments (used to run a stand-in).
    leading_args: Vec<OsString>,
    add_timeout: Duration,
    delete_timeout: Duration,
}

impl Default for NetshExecutor {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(config::RULE_ADD_TIMEOUT_SECS),
            Duration::from_secs(config::RULE_DELETE_TIMEOUT_SECS),
        )
    }
}

impl NetshExecutor {
    pub fn new(add_timeout: Duration, delete_timeout: Duration) -> Self {
        Self::with_program("netsh", Vec::new(), add_timeout, delete_timeout)
    }

    pub fn with_program(
        program: impl Into<OsString>,
        leading_args: Vec<OsString>,
        add_timeout: Duration,
        delete_timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            leading_args,
            add_timeout,
            delete_timeout,
        }
    }

    async fn run(
        &self,
        verb: &str,
        name: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<Output, AppError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(target_os = "windows")]
        cmd.creation_flags(CREATE_NO_WINDOW);

        let child = cmd
            .spawn()
            .map_err(|e| AppError::ExecutionFailed(format!("failed to start netsh: {e}")))?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(AppError::ExecutionFailed(format!(
                "netsh {verb} rule {name} did not complete: {e}"
            ))),
            Err(_) => Err(AppError::TimedOut(format!(
                "netsh {verb} rule {name} timed out after {timeout:?}"
            ))),
        }
    }

    /// Whether a rule with this name exists, from `show rule`'s exit status.
    async fn rule_exists(&self, name: &str) -> Result<bool, AppError> {
        let output = self
            .run("show", name, &show_rule_args(name), self.delete_timeout)
            .await?;
        Ok(output.status.success())
    }

    async fn delete_rule(&self, name: &str) -> Result<(), AppError> {
        let output = self
            .run("delete", name, &delete_rule_args(name), self.delete_timeout)
            .await?;
        match classify_delete(output.status.success(), &output_text(&output)) {
            DeleteOutcome::Deleted | DeleteOutcome::NoMatch => {
                tracing::debug!("Deleted firewall rule {name}");
                Ok(())
            }
            // Localized netsh: confirm absence instead of reading the message.
            DeleteOutcome::Unrecognized(message) => {
                if self.rule_exists(name).await? {
                    Err(AppError::ExecutionFailed(format!(
                        "netsh delete rule {name} failed: {message}"
                    )))
                } else {
                    Ok(())
                }
            }
        }
    }
}

impl RuleExecutor for NetshExecutor {
    async fn apply(&self, endpoint: &Endpoint, direction: Direction) -> Result<(), AppError> {
        let name = endpoint.rule_name(direction);
        if self.rule_exists(&name).await? {
            tracing::debug!("Firewall rule {name} already present");
            return Ok(());
        }

        let output = self
            .run("add", &name, &add_rule_args(endpoint, direction), self.add_timeout)
            .await?;
        classify_add(&name, output.status.success(), &output_text(&output))?;
        tracing::debug!("Added firewall rule {name}");
        Ok(())
    }

    async fn remove(&self, endpoint: &Endpoint, direction: Direction) -> Result<(), AppError> {
        self.delete_rule(&endpoint.rule_name(direction)).await
    }
}

/// Map a finished `add rule` call to a result. A duplicate is success.
pub fn classify_add(name: &str, success: bool, text: &str) -> Result<(), AppError> {
    if success || text.contains(ALREADY_EXISTS_MARKER) {
        return Ok(());
    }
    Err(AppError::ExecutionFailed(format!(
        "netsh add rule {name} failed: {}",
        text.trim()
    )))
}

pub fn classify_delete(success: bool, text: &str) -> DeleteOutcome {
    if success {
        DeleteOutcome::Deleted
    } else if text.contains(NO_MATCH_MARKER) {
        DeleteOutcome::NoMatch
    } else {
        DeleteOutcome::Unrecognized(text.trim().to_string())
    }
}

/// `advfirewall firewall add rule ...` arguments for one endpoint and direction.
pub fn add_rule_args(endpoint: &Endpoint, direction: Direction) -> Vec<String> {
    vec![
        "advfirewall".to_string(),
        "firewall".to_string(),
        "add".to_string(),
        "rule".to_string(),
        format!("name={}", endpoint.rule_name(direction)),
        format!("dir={}", direction.as_netsh()),
        "action=block".to_string(),
        format!("remoteip={endpoint}"),
        "protocol=any".to_string(),
    ]
}

/// `advfirewall firewall delete rule name=...` arguments.
pub fn delete_rule_args(name: &str) -> Vec<String> {
    rule_name_args("delete", name)
}

/// `advfirewall firewall show rule name=...` arguments.
pub fn show_rule_args(name: &str) -> Vec<String> {
    rule_name_args("show", name)
}

fn rule_name_args(verb: &str, name: &str) -> Vec<String> {
    vec![
        "advfirewall".to_string(),
        "firewall".to_string(),
        verb.to_string(),
        "rule".to_string(),
        format!("name={name}"),
    ]
}

fn output_text(output: &Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}
