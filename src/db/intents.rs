//! Block status table CRUD operations.

use anyhow::Result;
use rusqlite::params;

use super::Database;
use crate::core::BlockStatus;

impl Database {
    /// Load every stored intent, in key order.
    pub fn load_intents(&self) -> Result<Vec<(String, BlockStatus)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT endpoint, in_blocked, out_blocked FROM block_status ORDER BY endpoint",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                BlockStatus {
                    in_blocked: row.get::<_, i32>(1)? != 0,
                    out_blocked: row.get::<_, i32>(2)? != 0,
                },
            ))
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Insert or replace the intent for one endpoint.
    pub fn upsert_intent(&self, endpoint: &str, status: BlockStatus) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO block_status (endpoint, in_blocked, out_blocked)
             VALUES (?1, ?2, ?3)",
            params![endpoint, status.in_blocked as i32, status.out_blocked as i32],
        )?;
        Ok(())
    }

    /// Delete one intent. Returns whether a row existed.
    pub fn delete_intent(&self, endpoint: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM block_status WHERE endpoint = ?1",
            params![endpoint],
        )?;
        Ok(deleted > 0)
    }

    /// Remove `orphans` and seed `fresh` with the default status in one transaction.
    pub fn apply_reconciliation(&self, orphans: &[String], fresh: &[String]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut delete = tx.prepare_cached("DELETE FROM block_status WHERE endpoint = ?1")?;
            for endpoint in orphans {
                delete.execute(params![endpoint])?;
            }
            let mut seed = tx.prepare_cached(
                "INSERT OR IGNORE INTO block_status (endpoint, in_blocked, out_blocked)
                 VALUES (?1, 0, 0)",
            )?;
            for endpoint in fresh {
                seed.execute(params![endpoint])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Drop every stored intent.
    pub fn clear_intents(&self) -> Result<usize> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM block_status", [])?)
    }
}
