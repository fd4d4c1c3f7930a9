//! Pure presentation logic extracted from the command handlers.
//!
//! These functions take plain parameters (no `AppState`) and can be
//! unit-tested without an engine.

use std::net::Ipv4Addr;

use serde::Serialize;

use crate::config;
use crate::core::{BlockStatus, Endpoint, GlobalSummary, ToggleOutcome};
use crate::error::AppError;

/// One row of the entry list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryView {
    pub endpoint: String,
    pub kind: &'static str,
    pub in_blocked: bool,
    pub out_blocked: bool,
    pub label: &'static str,
    pub address_count: u64,
    /// Member addresses of small ranges; empty for large ones.
    pub addresses: Vec<Ipv4Addr>,
}

pub fn entry_view(endpoint: &Endpoint, status: BlockStatus) -> EntryView {
    EntryView {
        endpoint: endpoint.key(),
        kind: endpoint.kind(),
        in_blocked: status.in_blocked,
        out_blocked: status.out_blocked,
        label: status.label(),
        address_count: endpoint.address_count(),
        addresses: if endpoint.is_range() {
            endpoint.expand(config::RANGE_EXPAND_LIMIT)
        } else {
            Vec::new()
        },
    }
}

/// Parse an on/off switch argument.
pub fn parse_switch(text: &str) -> Result<bool, AppError> {
    match text.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => Err(AppError::InvalidInput(format!(
            "expected on or off, got '{other}'"
        ))),
    }
}

pub fn describe_outcome(outcome: &ToggleOutcome) -> String {
    format!(
        "{} {} {} ({})",
        outcome.endpoint,
        outcome.direction.text(),
        outcome.action.past_tense(),
        outcome.status.label()
    )
}

pub fn describe_summary(summary: &GlobalSummary) -> String {
    let mut text = format!(
        "All entries {} {}: {} processed, {} errors",
        summary.direction.text(),
        summary.action.past_tense(),
        summary.processed,
        summary.errors
    );
    for failed in &summary.failed {
        text.push_str(&format!("\n  {}: {}", failed.endpoint, failed.error));
    }
    text
}

/// Firewall changes need an elevated process.
pub fn require_elevation(elevated: bool) -> Result<(), AppError> {
    if elevated {
        Ok(())
    } else {
        Err(AppError::InvalidInput(
            "administrator privileges are required to change firewall rules".into(),
        ))
    }
}
