//! Core logic: endpoints, intent and the single-writer engine.
//!
//! - [`Endpoint`] / [`Catalog`]: validated endpoints under management
//! - [`BlockStatus`]: per-endpoint intent and toggle decisions
//! - [`IntentStore`]: durable `endpoint -> BlockStatus` map
//! - [`Engine`]: toggles, global toggles and startup reconciliation

pub mod catalog;
pub mod endpoint;
pub mod engine;
pub mod intent_store;
pub mod status;
pub mod sync;

pub use catalog::{Catalog, EndpointFeed, FileFeed, RejectedLine};
pub use endpoint::{Direction, Endpoint};
pub use engine::{Engine, FailedEntry, GlobalSummary, ToggleOutcome};
pub use intent_store::IntentStore;
pub use status::{Action, BlockStatus, ToggleDirection};
pub use sync::ReconcileReport;
