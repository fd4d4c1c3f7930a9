//! Durable, authoritative map `endpoint -> BlockStatus`.
//!
//! Every mutation is written to the database first and applied to the
//! in-memory map only after the write succeeded, so the two never diverge.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::core::status::BlockStatus;
use crate::db::Database;
use crate::error::AppError;

pub struct IntentStore {
    db: Arc<Database>,
    statuses: HashMap<String, BlockStatus>,
}

impl IntentStore {
    /// Read durable state. Undecodable rows reset the store to empty and
    /// persist that empty state before returning.
    pub fn load(db: Arc<Database>) -> Result<Self, AppError> {
        let statuses = match db.load_intents() {
            Ok(rows) => rows.into_iter().collect(),
            Err(e) => {
                tracing::warn!("Stored block status is unreadable ({e:#}); starting empty");
                db.clear_intents()?;
                HashMap::new()
            }
        };
        tracing::info!("Loaded {} stored block intents", statuses.len());
        Ok(Self { db, statuses })
    }

    /// Status of `endpoint`, unblocked if unknown.
    pub fn get(&self, endpoint: &str) -> BlockStatus {
        self.statuses.get(endpoint).copied().unwrap_or_default()
    }

    /// Upsert and persist. Durable when this returns `Ok`.
    pub fn set(&mut self, endpoint: &str, status: BlockStatus) -> Result<(), AppError> {
        self.db.upsert_intent(endpoint, status)?;
        self.statuses.insert(endpoint.to_string(), status);
        Ok(())
    }

    /// Delete and persist. Returns whether the endpoint was stored.
    pub fn remove(&mut self, endpoint: &str) -> Result<bool, AppError> {
        if !self.statuses.contains_key(endpoint) {
            return Ok(false);
        }
        self.db.delete_intent(endpoint)?;
        self.statuses.remove(endpoint);
        Ok(true)
    }

    /// Drop every stored endpoint not in `valid` and seed missing valid ones
    /// with the default status, persisting once.
    ///
    /// Returns the removed endpoints with their last known status so the
    /// caller can clean up their firewall rules.
    pub fn reconcile(
        &mut self,
        valid: &HashSet<String>,
    ) -> Result<Vec<(String, BlockStatus)>, AppError> {
        let mut orphans: Vec<(String, BlockStatus)> = self
            .statuses
            .iter()
            .filter(|(key, _)| !valid.contains(*key))
            .map(|(key, status)| (key.clone(), *status))
            .collect();
        orphans.sort_by(|a, b| a.0.cmp(&b.0));

        let fresh: Vec<String> = valid
            .iter()
            .filter(|key| !self.statuses.contains_key(*key))
            .cloned()
            .collect();

        let orphan_keys: Vec<String> = orphans.iter().map(|(key, _)| key.clone()).collect();
        self.db.apply_reconciliation(&orphan_keys, &fresh)?;

        for key in &orphan_keys {
            self.statuses.remove(key);
        }
        for key in fresh {
            self.statuses.insert(key, BlockStatus::default());
        }

        if !orphans.is_empty() {
            tracing::info!("Removed {} orphaned endpoints from the store", orphans.len());
        }
        Ok(orphans)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BlockStatus)> {
        self.statuses.iter()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}
