//! Background service lifecycle management.
//!
//! `BackgroundServices` owns the work scheduled after startup so interactive
//! use is never blocked on firewall calls. Exit never waits for it.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config;
use crate::core::{Engine, ReconcileReport};
use crate::error::AppError;
use crate::firewall::RuleExecutor;

pub struct BackgroundServices;

impl BackgroundServices {
    /// Run startup reconciliation on a tokio task after the start delay.
    pub fn start_reconciliation<E: RuleExecutor>(engine: Arc<Engine<E>>) -> ReconciliationTask {
        Self::start_reconciliation_after(
            engine,
            Duration::from_millis(config::RECONCILE_START_DELAY_MS),
        )
    }

    pub fn start_reconciliation_after<E: RuleExecutor>(
        engine: Arc<Engine<E>>,
        delay: Duration,
    ) -> ReconciliationTask {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let result = engine.reconcile_on_startup().await;
            if let Err(e) = &result {
                tracing::error!("Startup reconciliation failed: {e}");
            }
            result
        });
        ReconciliationTask {
            handle: Some(handle),
        }
    }
}

/// Handle to the background reconciliation. Dropping it unfinished aborts it.
pub struct ReconciliationTask {
    handle: Option<JoinHandle<Result<ReconcileReport, AppError>>>,
}

impl ReconciliationTask {
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the report. `None` if the task was aborted or panicked.
    pub async fn wait(mut self) -> Option<Result<ReconcileReport, AppError>> {
        let handle = self.handle.take()?;
        match handle.await {
            Ok(result) => Some(result),
            Err(e) => {
                if e.is_panic() {
                    tracing::error!("Reconciliation task panicked: {e}");
                }
                None
            }
        }
    }

    /// Abandon the task without waiting for in-flight firewall calls.
    pub fn shutdown(mut self) {
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                tracing::info!("Abandoning unfinished startup reconciliation");
            }
            handle.abort();
        }
    }
}

impl Drop for ReconciliationTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::tests::{engine_on, FEED};
    use crate::core::BlockStatus;
    use crate::db::Database;

    #[tokio::test]
    async fn test_background_reconciliation_reports() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.upsert_intent("10.0.0.1", BlockStatus { in_blocked: true, out_blocked: true })
            .unwrap();
        let engine = Arc::new(engine_on(FEED, db));

        let task = BackgroundServices::start_reconciliation(Arc::clone(&engine));
        let report = task.wait().await.unwrap().unwrap();
        assert_eq!(report.rules_applied, 2);
    }

    #[tokio::test]
    async fn test_shutdown_before_start_skips_reconciliation() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.upsert_intent("10.0.0.1", BlockStatus { in_blocked: true, out_blocked: false })
            .unwrap();
        let engine = Arc::new(engine_on(FEED, db));

        let task = BackgroundServices::start_reconciliation_after(
            Arc::clone(&engine),
            Duration::from_secs(60),
        );
        assert!(!task.is_finished());
        task.shutdown();

        tokio::task::yield_now().await;
        assert!(engine.executor().calls().is_empty());
    }

    #[tokio::test]
    async fn test_dropping_handle_aborts_task() {
        let (engine, _db) = crate::core::engine::tests::test_engine(FEED);
        let engine = Arc::new(engine);
        let task = BackgroundServices::start_reconciliation_after(
            Arc::clone(&engine),
            Duration::from_secs(60),
        );
        drop(task);
        tokio::task::yield_now().await;
        // The task held the only other reference; aborting released it.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(Arc::strong_count(&engine), 1);
    }
}
