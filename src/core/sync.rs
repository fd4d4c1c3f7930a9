//! Startup reconciliation between catalog, intent store and firewall.

use serde::Serialize;

use crate::core::endpoint::Endpoint;
use crate::core::engine::Engine;
use crate::error::AppError;
use crate::firewall::RuleExecutor;

/// What a startup reconciliation did. Rule failures are counted, never raised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Stored endpoints dropped because they left the catalog.
    pub orphans_removed: usize,
    pub rules_removed: usize,
    pub cleanup_failures: usize,
    pub rules_applied: usize,
    pub apply_failures: usize,
}

impl<E: RuleExecutor> Engine<E> {
    /// Align stored intent with the catalog, then the firewall with stored intent.
    ///
    /// 1. Orphans are removed from the store in one persisted step.
    /// 2. Their blocked directions are removed from the firewall, best effort.
    /// 3. Every blocked direction of each catalog entry is re-applied.
    ///
    /// The writer lock is taken per entry, so user toggles interleave with a
    /// long reconciliation instead of waiting for all of it.
    pub async fn reconcile_on_startup(&self) -> Result<ReconcileReport, AppError> {
        let orphans = {
            let mut store = self.writer.lock().await;
            let orphans = store.reconcile(&self.catalog.key_set())?;
            for (key, _) in &orphans {
                self.mirror.remove(key);
            }
            for endpoint in self.catalog.iter() {
                let key = endpoint.key();
                let status = store.get(&key);
                self.mirror.insert(key, status);
            }
            orphans
        };

        let mut report = ReconcileReport {
            orphans_removed: orphans.len(),
            ..ReconcileReport::default()
        };

        for (key, status) in orphans {
            let endpoint: Endpoint = match key.parse() {
                Ok(endpoint) => endpoint,
                Err(e) => {
                    tracing::warn!("Skipping firewall cleanup for unparseable entry '{key}': {e}");
                    continue;
                }
            };
            let _writer = self.writer.lock().await;
            for dir in status.blocked_directions() {
                match self.executor.remove(&endpoint, dir).await {
                    Ok(()) => report.rules_removed += 1,
                    Err(e) => {
                        tracing::warn!("Cleanup of orphan {endpoint} {dir} failed: {e}");
                        report.cleanup_failures += 1;
                    }
                }
            }
        }

        for endpoint in self.catalog.iter() {
            let store = self.writer.lock().await;
            // Read under the lock: a toggle may have landed since the first step.
            let status = store.get(&endpoint.key());
            for dir in status.blocked_directions() {
                match self.executor.apply(endpoint, dir).await {
                    Ok(()) => report.rules_applied += 1,
                    Err(e) => {
                        tracing::warn!("Re-applying {endpoint} {dir} failed: {e}");
                        report.apply_failures += 1;
                    }
                }
            }
        }

        tracing::info!(
            "Reconciliation finished: {} orphans removed, {} rules re-applied ({} failed)",
            report.orphans_removed,
            report.rules_applied,
            report.apply_failures
        );
        Ok(report)
    }
}
