//! Settings table: persisted boolean flags.

use anyhow::Result;
use rusqlite::{params, OptionalExtension};
use serde::Serialize;

use super::Database;

const SOUNDS_ENABLED: &str = "sounds_enabled";
const GLOBAL_BLOCK_ENABLED: &str = "global_block_enabled";

/// User settings. Both flags default to enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub sounds_enabled: bool,
    /// When set, toggles and hotkeys apply to every catalog entry.
    pub global_block_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sounds_enabled: true,
            global_block_enabled: true,
        }
    }
}

impl Database {
    /// Load settings, falling back to defaults for missing or unreadable values.
    ///
    /// Fallback values are written back so the next start reads a complete section.
    pub fn load_settings(&self) -> Result<Settings> {
        let defaults = Settings::default();
        let sounds_enabled = self.read_flag(SOUNDS_ENABLED, defaults.sounds_enabled)?;
        let global_block_enabled =
            self.read_flag(GLOBAL_BLOCK_ENABLED, defaults.global_block_enabled)?;
        Ok(Settings {
            sounds_enabled,
            global_block_enabled,
        })
    }

    pub fn set_sounds_enabled(&self, enabled: bool) -> Result<()> {
        self.write_flag(SOUNDS_ENABLED, enabled)
    }

    pub fn set_global_block_enabled(&self, enabled: bool) -> Result<()> {
        self.write_flag(GLOBAL_BLOCK_ENABLED, enabled)
    }

    fn read_flag(&self, key: &str, default: bool) -> Result<bool> {
        let stored = {
            let conn = self.conn()?;
            let value = conn
                .query_row(
                    "SELECT value FROM settings WHERE key = ?1",
                    params![key],
                    |row| row.get::<_, i64>(0),
                )
                .optional();
            value
        };
        match stored {
            Ok(Some(value)) => Ok(value != 0),
            Ok(None) => {
                self.write_flag(key, default)?;
                Ok(default)
            }
            Err(e) => {
                tracing::warn!("Setting '{key}' is unreadable ({e}); resetting to {default}");
                self.write_flag(key, default)?;
                Ok(default)
            }
        }
    }

    fn write_flag(&self, key: &str, value: bool) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value as i64],
        )?;
        Ok(())
    }
}
