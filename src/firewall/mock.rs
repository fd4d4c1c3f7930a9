//! In-process executor for engine tests: records calls, fails on demand.

use std::collections::HashSet;
use std::sync::Mutex;

use super::RuleExecutor;
use crate::core::{Direction, Endpoint};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Apply,
    Remove,
}

#[derive(Default)]
pub struct MockExecutor {
    calls: Mutex<Vec<(Call, String, Direction)>>,
    failing: Mutex<HashSet<(String, Direction)>>,
    timing_out: Mutex<HashSet<(String, Direction)>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every future call for `endpoint`/`direction` fails with `ExecutionFailed`.
    pub fn fail_on(&self, endpoint: &str, direction: Direction) {
        self.failing
            .lock()
            .unwrap()
            .insert((endpoint.to_string(), direction));
    }

    /// Every future call for `endpoint`/`direction` fails with `TimedOut`.
    pub fn time_out_on(&self, endpoint: &str, direction: Direction) {
        self.timing_out
            .lock()
            .unwrap()
            .insert((endpoint.to_string(), direction));
    }

    pub fn calls(&self) -> Vec<(Call, String, Direction)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: Call, endpoint: &Endpoint, direction: Direction) -> Result<(), AppError> {
        let key = (endpoint.key(), direction);
        self.calls
            .lock()
            .unwrap()
            .push((call, key.0.clone(), direction));
        if self.timing_out.lock().unwrap().contains(&key) {
            return Err(AppError::TimedOut(format!("{} {direction} timed out", key.0)));
        }
        if self.failing.lock().unwrap().contains(&key) {
            return Err(AppError::ExecutionFailed(format!(
                "{} {direction} rejected",
                key.0
            )));
        }
        Ok(())
    }
}

impl RuleExecutor for MockExecutor {
    async fn apply(&self, endpoint: &Endpoint, direction: Direction) -> Result<(), AppError> {
        self.record(Call::Apply, endpoint, direction)
    }

    async fn remove(&self, endpoint: &Endpoint, direction: Direction) -> Result<(), AppError> {
        self.record(Call::Remove, endpoint, direction)
    }
}
