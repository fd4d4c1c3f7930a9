//! Entry listing, status and toggle commands.

use crate::core::{Action, GlobalSummary, ReconcileReport, ToggleDirection, ToggleOutcome};
use crate::error::AppError;
use crate::firewall::RuleExecutor;

use super::logic::{entry_view, EntryView};
use super::state::AppState;

pub fn list_entries<E: RuleExecutor>(state: &AppState<E>) -> Vec<EntryView> {
    state
        .engine
        .list_entries()
        .iter()
        .map(|(endpoint, status)| entry_view(endpoint, *status))
        .collect()
}

pub fn status<E: RuleExecutor>(state: &AppState<E>, entry: &str) -> Result<EntryView, AppError> {
    let endpoint = state.engine.resolve(entry)?;
    Ok(entry_view(
        &endpoint,
        state.engine.current_status(&endpoint.key()),
    ))
}

pub async fn toggle<E: RuleExecutor>(
    state: &AppState<E>,
    entry: &str,
    direction: ToggleDirection,
) -> Result<ToggleOutcome, AppError> {
    state.engine.toggle(entry, direction).await
}

pub async fn toggle_global<E: RuleExecutor>(
    state: &AppState<E>,
    direction: ToggleDirection,
    action: Action,
) -> GlobalSummary {
    state.engine.toggle_global(direction, action).await
}

/// Global toggle with the action `toggle(entry, direction)` would take.
pub async fn toggle_global_from<E: RuleExecutor>(
    state: &AppState<E>,
    entry: &str,
    direction: ToggleDirection,
) -> Result<GlobalSummary, AppError> {
    state.engine.toggle_global_from(entry, direction).await
}

pub async fn reconcile_on_startup<E: RuleExecutor>(
    state: &AppState<E>,
) -> Result<ReconcileReport, AppError> {
    state.engine.reconcile_on_startup().await
}
