//! Toggle coordination: the single writer of block intent.
//!
//! All firewall calls and store writes happen while holding `writer`, so
//! hotkeys, explicit toggles and startup reconciliation are serialized into
//! one mutation path. Reads go to `mirror`, which only ever holds whole,
//! committed statuses.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::core::catalog::Catalog;
use crate::core::endpoint::Endpoint;
use crate::core::intent_store::IntentStore;
use crate::core::status::{Action, BlockStatus, ToggleDirection};
use crate::error::AppError;
use crate::firewall::RuleExecutor;

/// Result of a successful single-entry toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    pub endpoint: Endpoint,
    pub direction: ToggleDirection,
    pub action: Action,
    pub status: BlockStatus,
}

#[derive(Debug, Serialize)]
pub struct FailedEntry {
    pub endpoint: String,
    pub error: AppError,
}

/// Batch summary of a global toggle. `processed + errors == total`.
#[derive(Debug, Serialize)]
pub struct GlobalSummary {
    pub direction: ToggleDirection,
    pub action: Action,
    pub total: usize,
    pub processed: usize,
    pub errors: usize,
    pub failed: Vec<FailedEntry>,
}

pub struct Engine<E: RuleExecutor> {
    pub(super) executor: E,
    pub(super) catalog: Arc<Catalog>,
    pub(super) writer: Mutex<IntentStore>,
    pub(super) mirror: DashMap<String, BlockStatus>,
}

impl<E: RuleExecutor> Engine<E> {
    pub fn new(executor: E, catalog: Arc<Catalog>, store: IntentStore) -> Self {
        let mirror = store
            .iter()
            .map(|(key, status)| (key.clone(), *status))
            .collect();
        Self {
            executor,
            catalog,
            writer: Mutex::new(store),
            mirror,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Last committed status of `entry`; unblocked if unknown.
    pub fn current_status(&self, entry: &str) -> BlockStatus {
        self.mirror
            .get(&canonical_key(entry))
            .map(|status| *status)
            .unwrap_or_default()
    }

    /// Every catalog entry with its committed status, in catalog order.
    pub fn list_entries(&self) -> Vec<(Endpoint, BlockStatus)> {
        self.catalog
            .iter()
            .map(|endpoint| (*endpoint, self.current_status(&endpoint.key())))
            .collect()
    }

    /// Resolve user text to a catalog endpoint.
    pub fn resolve(&self, entry: &str) -> Result<Endpoint, AppError> {
        let endpoint: Endpoint = entry.parse()?;
        if self.catalog.contains(&endpoint.key()) {
            Ok(endpoint)
        } else {
            Err(AppError::InvalidInput(format!(
                "{endpoint} is not in the endpoint catalog"
            )))
        }
    }

    /// Flip `direction` of one entry.
    ///
    /// Every affected direction is attempted. If any of them fails nothing is
    /// committed and the first failure is returned.
    pub async fn toggle(
        &self,
        entry: &str,
        direction: ToggleDirection,
    ) -> Result<ToggleOutcome, AppError> {
        let endpoint = self.resolve(entry)?;
        let mut store = self.writer.lock().await;
        let action = store.get(&endpoint.key()).next_action(direction);
        let status = self
            .apply_locked(&mut store, &endpoint, direction, action)
            .await?;
        tracing::info!(
            "{endpoint} {} {}",
            direction.text(),
            action.past_tense()
        );
        Ok(ToggleOutcome {
            endpoint,
            direction,
            action,
            status,
        })
    }

    /// Apply one pre-computed `action` to every catalog entry.
    ///
    /// Per-entry failures are counted; the batch never stops early.
    pub async fn toggle_global(&self, direction: ToggleDirection, action: Action) -> GlobalSummary {
        let mut store = self.writer.lock().await;
        self.global_locked(&mut store, direction, action).await
    }

    /// Global toggle whose action is what `toggle(entry, direction)` would do.
    ///
    /// The action is decided from `entry`'s stored status under the same
    /// writer lock that runs the batch.
    pub async fn toggle_global_from(
        &self,
        entry: &str,
        direction: ToggleDirection,
    ) -> Result<GlobalSummary, AppError> {
        let endpoint = self.resolve(entry)?;
        let mut store = self.writer.lock().await;
        let action = store.get(&endpoint.key()).next_action(direction);
        Ok(self.global_locked(&mut store, direction, action).await)
    }

    async fn global_locked(
        &self,
        store: &mut IntentStore,
        direction: ToggleDirection,
        action: Action,
    ) -> GlobalSummary {
        let mut summary = GlobalSummary {
            direction,
            action,
            total: self.catalog.len(),
            processed: 0,
            errors: 0,
            failed: Vec::new(),
        };

        for endpoint in self.catalog.iter() {
            match self.apply_locked(store, endpoint, direction, action).await {
                Ok(_) => summary.processed += 1,
                Err(error) => {
                    summary.errors += 1;
                    summary.failed.push(FailedEntry {
                        endpoint: endpoint.key(),
                        error,
                    });
                }
            }
        }

        tracing::info!(
            "Global {} {}: {} processed, {} errors",
            direction.text(),
            action.past_tense(),
            summary.processed,
            summary.errors
        );
        summary
    }

    /// Run the executor for each direction, then commit. Caller holds `writer`.
    async fn apply_locked(
        &self,
        store: &mut IntentStore,
        endpoint: &Endpoint,
        direction: ToggleDirection,
        action: Action,
    ) -> Result<BlockStatus, AppError> {
        let mut first_error = None;
        for &dir in direction.directions() {
            let result = match action {
                Action::Block => self.executor.apply(endpoint, dir).await,
                Action::Unblock => self.executor.remove(endpoint, dir).await,
            };
            if let Err(e) = result {
                tracing::warn!("Firewall update for {endpoint} {dir} failed: {e}");
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        let key = endpoint.key();
        let next = store.get(&key).with_action(direction, action);
        store.set(&key, next)?;
        self.mirror.insert(key, next);
        Ok(next)
    }
}

/// Canonical store key for user text, or the trimmed text if it does not parse.
fn canonical_key(entry: &str) -> String {
    entry
        .parse::<Endpoint>()
        .map(|endpoint| endpoint.key())
        .unwrap_or_else(|_| entry.trim().to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::endpoint::Direction;
    use crate::db::Database;
    use crate::firewall::mock::{Call, MockExecutor};

    pub(crate) const FEED: &str = "10.0.0.1\n10.0.0.5-10.0.0.9\n192.168.1.20\n";

    const NONE: BlockStatus = BlockStatus { in_blocked: false, out_blocked: false };
    const IN_ONLY: BlockStatus = BlockStatus { in_blocked: true, out_blocked: false };
    const BOTH: BlockStatus = BlockStatus { in_blocked: true, out_blocked: true };

    /// Engine over `feed` with an in-memory database and a mock executor.
    pub(crate) fn test_engine(feed: &str) -> (Engine<MockExecutor>, Arc<Database>) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let engine = engine_on(feed, Arc::clone(&db));
        (engine, db)
    }

    pub(crate) fn engine_on(feed: &str, db: Arc<Database>) -> Engine<MockExecutor> {
        let (catalog, _) = Catalog::parse(feed);
        let store = IntentStore::load(db).unwrap();
        Engine::new(MockExecutor::new(), Arc::new(catalog), store)
    }

    #[tokio::test]
    async fn test_toggle_in_twice_round_trips() {
        let (engine, _db) = test_engine("10.0.0.1\n10.0.0.5-10.0.0.9\n");

        let first = engine.toggle("10.0.0.1", ToggleDirection::In).await.unwrap();
        assert_eq!(first.action, Action::Block);
        assert_eq!(first.status, IN_ONLY);
        assert_eq!(engine.current_status("10.0.0.1"), IN_ONLY);

        let second = engine.toggle("10.0.0.1", ToggleDirection::In).await.unwrap();
        assert_eq!(second.action, Action::Unblock);
        assert_eq!(engine.current_status("10.0.0.1"), NONE);

        assert_eq!(
            engine.executor().calls(),
            vec![
                (Call::Apply, "10.0.0.1".to_string(), Direction::In),
                (Call::Remove, "10.0.0.1".to_string(), Direction::In),
            ]
        );
    }

    #[tokio::test]
    async fn test_toggle_both_twice_returns_to_start() {
        let (engine, _db) = test_engine(FEED);

        engine.toggle("10.0.0.5-10.0.0.9", ToggleDirection::Both).await.unwrap();
        assert_eq!(engine.current_status("10.0.0.5-10.0.0.9"), BOTH);
        engine.toggle("10.0.0.5-10.0.0.9", ToggleDirection::Both).await.unwrap();
        assert_eq!(engine.current_status("10.0.0.5-10.0.0.9"), NONE);
    }

    #[tokio::test]
    async fn test_toggle_both_on_partial_blocks_fully() {
        let (engine, _db) = test_engine(FEED);
        engine.toggle("10.0.0.1", ToggleDirection::In).await.unwrap();
        engine.executor().clear_calls();

        let outcome = engine.toggle("10.0.0.1", ToggleDirection::Both).await.unwrap();
        assert_eq!(outcome.action, Action::Block);
        assert_eq!(outcome.status, BOTH);
        assert_eq!(
            engine.executor().calls(),
            vec![
                (Call::Apply, "10.0.0.1".to_string(), Direction::In),
                (Call::Apply, "10.0.0.1".to_string(), Direction::Out),
            ]
        );
    }

    #[tokio::test]
    async fn test_toggle_is_persisted() {
        let (engine, db) = test_engine(FEED);
        engine.toggle("192.168.1.20", ToggleDirection::Out).await.unwrap();

        let restarted = IntentStore::load(db).unwrap();
        assert_eq!(
            restarted.get("192.168.1.20"),
            BlockStatus { in_blocked: false, out_blocked: true }
        );
    }

    #[tokio::test]
    async fn test_toggle_accepts_untrimmed_entry_text() {
        let (engine, _db) = test_engine(FEED);
        engine.toggle("  10.0.0.1 ", ToggleDirection::In).await.unwrap();
        assert_eq!(engine.current_status(" 10.0.0.1"), IN_ONLY);
    }

    #[tokio::test]
    async fn test_toggle_rejects_unknown_and_malformed_entries() {
        let (engine, _db) = test_engine(FEED);

        let err = engine.toggle("8.8.8.8", ToggleDirection::In).await.unwrap_err();
        assert_eq!(err.kind(), "InvalidInput");

        let err = engine.toggle("not-an-ip", ToggleDirection::In).await.unwrap_err();
        assert_eq!(err.kind(), "Validation");

        assert!(engine.executor().calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_direction_commits_nothing() {
        let (engine, db) = test_engine(FEED);
        engine.executor().fail_on("10.0.0.1", Direction::In);

        let err = engine.toggle("10.0.0.1", ToggleDirection::Both).await.unwrap_err();
        assert_eq!(err.kind(), "ExecutionFailed");

        // Both directions were still attempted.
        assert_eq!(engine.executor().calls().len(), 2);
        assert_eq!(engine.current_status("10.0.0.1"), NONE);
        assert!(db
            .load_intents()
            .unwrap()
            .iter()
            .all(|(_, status)| *status == NONE));
    }

    #[tokio::test]
    async fn test_timeout_is_reported_and_not_committed() {
        let (engine, _db) = test_engine(FEED);
        engine.executor().time_out_on("10.0.0.1", Direction::Out);

        let err = engine.toggle("10.0.0.1", ToggleDirection::Out).await.unwrap_err();
        assert_eq!(err.kind(), "TimedOut");
        assert_eq!(engine.current_status("10.0.0.1"), NONE);
    }

    #[tokio::test]
    async fn test_persistence_failure_propagates_without_commit() {
        let (engine, db) = test_engine(FEED);
        db.execute_raw("DROP TABLE block_status").unwrap();

        let err = engine.toggle("10.0.0.1", ToggleDirection::In).await.unwrap_err();
        assert_eq!(err.kind(), "Persistence");
        assert_eq!(engine.current_status("10.0.0.1"), NONE);
    }

    #[tokio::test]
    async fn test_toggle_global_counts_one_failure() {
        let (engine, _db) = test_engine(FEED);
        engine.executor().fail_on("10.0.0.5-10.0.0.9", Direction::In);

        let summary = engine.toggle_global(ToggleDirection::In, Action::Block).await;

        assert_eq!(summary.total, 3);
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.failed[0].endpoint, "10.0.0.5-10.0.0.9");
        assert_eq!(engine.current_status("10.0.0.5-10.0.0.9"), NONE);
        assert_eq!(engine.current_status("10.0.0.1"), IN_ONLY);
        assert_eq!(engine.current_status("192.168.1.20"), IN_ONLY);
    }

    #[tokio::test]
    async fn test_toggle_global_uses_one_action_for_every_entry() {
        let (engine, _db) = test_engine(FEED);
        engine.toggle("10.0.0.1", ToggleDirection::In).await.unwrap();
        engine.executor().clear_calls();

        // Already-blocked entries are blocked again, not flipped.
        let summary = engine.toggle_global(ToggleDirection::In, Action::Block).await;
        assert_eq!(summary.processed, 3);
        assert!(engine
            .executor()
            .calls()
            .iter()
            .all(|(call, _, dir)| *call == Call::Apply && *dir == Direction::In));
        for (_, status) in engine.list_entries() {
            assert_eq!(status, IN_ONLY);
        }
    }

    #[tokio::test]
    async fn test_toggle_global_counts_persistence_failures() {
        let (engine, db) = test_engine(FEED);
        db.execute_raw("DROP TABLE block_status").unwrap();

        let summary = engine.toggle_global(ToggleDirection::Both, Action::Block).await;
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.errors, 3);
        assert!(summary
            .failed
            .iter()
            .all(|failed| failed.error.kind() == "Persistence"));
    }

    #[tokio::test]
    async fn test_toggle_global_from_decides_on_stored_status() {
        let (engine, _db) = test_engine(FEED);
        engine.toggle("10.0.0.1", ToggleDirection::Both).await.unwrap();

        // 10.0.0.1 is fully blocked, so everything is unblocked.
        let summary = engine
            .toggle_global_from("10.0.0.1", ToggleDirection::Both)
            .await
            .unwrap();
        assert_eq!(summary.action, Action::Unblock);
        assert_eq!(summary.processed, 3);
        for (_, status) in engine.list_entries() {
            assert_eq!(status, NONE);
        }

        let err = engine
            .toggle_global_from("8.8.8.8", ToggleDirection::In)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "InvalidInput");
    }

    #[tokio::test]
    async fn test_toggle_global_from_sees_toggle_queued_before_it() {
        let (engine, _db) = test_engine(FEED);
        let engine = Arc::new(engine);

        // Hold the writer so both calls queue behind it in order.
        let guard = engine.writer.lock().await;
        let toggle = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.toggle("10.0.0.1", ToggleDirection::In).await })
        };
        tokio::task::yield_now().await;
        let global = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine
                    .toggle_global_from("10.0.0.1", ToggleDirection::In)
                    .await
            })
        };
        tokio::task::yield_now().await;
        drop(guard);

        toggle.await.unwrap().unwrap();
        let summary = global.await.unwrap().unwrap();
        // Decided after the queued block landed, so the batch unblocks.
        assert_eq!(summary.action, Action::Unblock);
        assert_eq!(engine.current_status("10.0.0.1"), NONE);
    }

    #[tokio::test]
    async fn test_concurrent_toggles_are_serialized() {
        let (engine, _db) = test_engine(FEED);
        let engine = Arc::new(engine);

        let a = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.toggle("10.0.0.1", ToggleDirection::Both).await })
        };
        let b = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.toggle("10.0.0.1", ToggleDirection::Both).await })
        };
        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();

        // One blocked, the other unblocked; never both deciding from the same state.
        assert_ne!(a.action, b.action);
        assert_eq!(engine.current_status("10.0.0.1"), NONE);
    }

    #[tokio::test]
    async fn test_list_entries_follows_catalog_order() {
        let (engine, _db) = test_engine(FEED);
        engine.toggle("192.168.1.20", ToggleDirection::Both).await.unwrap();

        let entries = engine.list_entries();
        let keys: Vec<String> = entries.iter().map(|(e, _)| e.key()).collect();
        assert_eq!(keys, vec!["10.0.0.1", "10.0.0.5-10.0.0.9", "192.168.1.20"]);
        assert_eq!(entries[2].1, BOTH);
    }
}
