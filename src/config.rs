//! Centralized runtime constants for ipblocker.
//!
//! All tunable timeouts, delays, names, and limits are collected here so they
//! can be found and adjusted in a single place rather than scattered across modules.

/// Bounded wait for `netsh ... add rule` (seconds).
pub const RULE_ADD_TIMEOUT_SECS: u64 = 5;

/// Bounded wait for `netsh ... delete rule` (seconds). Deletes hang first under contention.
pub const RULE_DELETE_TIMEOUT_SECS: u64 = 2;

/// Delay before the background startup reconciliation begins (milliseconds).
pub const RECONCILE_START_DELAY_MS: u64 = 100;

/// Minimum interval between two accepted presses of the same hotkey (milliseconds).
pub const HOTKEY_MIN_INTERVAL_MS: u64 = 100;

/// Prefix of every firewall rule name created by this program.
pub const RULE_NAME_PREFIX: &str = "IPBlocker";

/// SQLite file holding block intents and settings, relative to the data dir.
pub const STATE_DB_FILE: &str = "block_status.db";

/// Default endpoint feed file, relative to the data dir.
pub const DEFAULT_FEED_FILE: &str = "endpoints.txt";

/// Ranges with more addresses than this are not expanded for display.
pub const RANGE_EXPAND_LIMIT: u64 = 100;

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "ipblocker=info";
