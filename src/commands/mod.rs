//! Presentation-boundary command handlers, organized by functional domain.
//!
//! - `entries`: list, status, toggle, global toggle, reconciliation
//! - `hotkey`: F1/F2/F3 handling and the global-block switch
//! - `system`: settings and the privilege check
//! - `logic`: pure formatting and parsing helpers (unit-testable)
//! - `state`: shared `AppState` definition

pub(crate) mod entries;
pub(crate) mod hotkey;
pub(crate) mod logic;
pub(crate) mod state;
pub(crate) mod system;

pub use hotkey::{ActionResult, Hotkey, HotkeyGate};
pub use state::AppState;
