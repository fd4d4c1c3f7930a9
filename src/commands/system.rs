//! Settings and privilege commands.

use crate::db::{Database, Settings};
use crate::error::AppError;
use crate::firewall;

use super::logic::require_elevation;

pub fn get_settings(database: &Database) -> Result<Settings, AppError> {
    Ok(database.load_settings()?)
}

pub fn set_sounds_enabled(database: &Database, enabled: bool) -> Result<(), AppError> {
    database.set_sounds_enabled(enabled)?;
    tracing::info!("Sounds {}", if enabled { "enabled" } else { "disabled" });
    Ok(())
}

pub fn set_global_block_enabled(database: &Database, enabled: bool) -> Result<(), AppError> {
    database.set_global_block_enabled(enabled)?;
    tracing::info!("Global block {}", if enabled { "enabled" } else { "disabled" });
    Ok(())
}

/// Checked once, before any firewall call is attempted.
pub fn check_privileges() -> Result<(), AppError> {
    require_elevation(firewall::is_elevated())
}
