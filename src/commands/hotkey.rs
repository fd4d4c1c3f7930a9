//! F1/F2/F3 hotkeys and the global-block switch.
//!
//! Hotkeys are just another producer of toggles: they go through the same
//! engine calls as explicit commands and never touch the store directly.

use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use serde::Serialize;

use crate::config;
use crate::core::{GlobalSummary, ToggleDirection, ToggleOutcome};
use crate::error::AppError;
use crate::firewall::RuleExecutor;

use super::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hotkey {
    F1,
    F2,
    F3,
}

impl Hotkey {
    pub fn direction(self) -> ToggleDirection {
        match self {
            Hotkey::F1 => ToggleDirection::Both,
            Hotkey::F2 => ToggleDirection::In,
            Hotkey::F3 => ToggleDirection::Out,
        }
    }
}

impl FromStr for Hotkey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "f1" => Ok(Hotkey::F1),
            "f2" => Ok(Hotkey::F2),
            "f3" => Ok(Hotkey::F3),
            other => Err(AppError::InvalidInput(format!("unknown hotkey '{other}'"))),
        }
    }
}

/// Drops repeated presses of the same key inside the minimum interval.
pub struct HotkeyGate {
    limiter: DefaultKeyedRateLimiter<Hotkey>,
}

impl Default for HotkeyGate {
    fn default() -> Self {
        Self::new(Duration::from_millis(config::HOTKEY_MIN_INTERVAL_MS))
    }
}

impl HotkeyGate {
    pub fn new(min_interval: Duration) -> Self {
        let quota = Quota::with_period(min_interval)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN));
        Self {
            limiter: RateLimiter::keyed(quota),
        }
    }

    /// True if this press should be acted on.
    pub fn admit(&self, key: Hotkey) -> bool {
        self.limiter.check_key(&key).is_ok()
    }
}

/// What a hotkey or `perform_action` ended up doing.
#[derive(Debug, Serialize)]
#[serde(tag = "scope", rename_all = "lowercase")]
pub enum ActionResult {
    Single(ToggleOutcome),
    Global(GlobalSummary),
}

/// Toggle `entry`, or every entry when the global switch is on.
///
/// In global mode the action is derived from `entry`'s stored status and
/// applied unchanged to the whole catalog.
pub async fn perform_action<E: RuleExecutor>(
    state: &AppState<E>,
    entry: &str,
    direction: ToggleDirection,
) -> Result<ActionResult, AppError> {
    let settings = state.database.load_settings()?;
    if settings.global_block_enabled {
        let summary = state.engine.toggle_global_from(entry, direction).await?;
        Ok(ActionResult::Global(summary))
    } else {
        let outcome = state.engine.toggle(entry, direction).await?;
        Ok(ActionResult::Single(outcome))
    }
}

/// Handle one hotkey press against the selected entry.
///
/// Returns `Ok(None)` when the press was throttled.
pub async fn press_hotkey<E: RuleExecutor>(
    state: &AppState<E>,
    key: Hotkey,
) -> Result<Option<ActionResult>, AppError> {
    let selected = state
        .selected()
        .ok_or_else(|| AppError::InvalidInput("select an entry first".into()))?;
    if !state.hotkeys.admit(key) {
        tracing::debug!("Dropped repeated {key:?}");
        return Ok(None);
    }
    perform_action(state, &selected.key(), key.direction())
        .await
        .map(Some)
}
