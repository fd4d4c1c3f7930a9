//! Shared application state handed to every command.

use std::sync::{Arc, Mutex};

use crate::core::{Endpoint, Engine};
use crate::db::Database;
use crate::error::AppError;
use crate::firewall::RuleExecutor;

use super::hotkey::HotkeyGate;

pub struct AppState<E: RuleExecutor> {
    pub engine: Arc<Engine<E>>,
    /// Settings live here; block intents are only written through `engine`.
    pub database: Arc<Database>,
    pub hotkeys: HotkeyGate,
    /// Entry the hotkeys act on.
    selected: Mutex<Option<Endpoint>>,
}

impl<E: RuleExecutor> AppState<E> {
    pub fn new(engine: Arc<Engine<E>>, database: Arc<Database>, hotkeys: HotkeyGate) -> Self {
        Self {
            engine,
            database,
            hotkeys,
            selected: Mutex::new(None),
        }
    }

    /// Select a catalog entry for hotkeys.
    pub fn select(&self, entry: &str) -> Result<Endpoint, AppError> {
        let endpoint = self.engine.resolve(entry)?;
        *self.selected.lock().unwrap_or_else(|e| e.into_inner()) = Some(endpoint);
        Ok(endpoint)
    }

    pub fn selected(&self) -> Option<Endpoint> {
        *self.selected.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use super::*;
    use crate::core::engine::tests::{engine_on, FEED};
    use crate::firewall::mock::MockExecutor;

    /// State over the standard test feed with a slow hotkey gate.
    pub(crate) fn test_state() -> AppState<MockExecutor> {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let engine = Arc::new(engine_on(FEED, Arc::clone(&db)));
        AppState::new(engine, db, HotkeyGate::new(Duration::from_secs(60)))
    }

    #[test]
    fn test_select_requires_catalog_entry() {
        let state = test_state();
        assert!(state.selected().is_none());
        assert!(state.select("8.8.8.8").is_err());
        assert!(state.selected().is_none());

        let endpoint = state.select("10.0.0.1").unwrap();
        assert_eq!(state.selected(), Some(endpoint));
    }
}
