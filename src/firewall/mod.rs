//! Rule executors: the only code allowed to mutate the host firewall.
//!
//! - Windows: `netsh advfirewall` (`netsh`)
//!
//! Executors are stateless. `apply` is safe to repeat for the same endpoint
//! and direction; `remove` treats an absent rule as success.

#[cfg(test)]
pub(crate) mod mock;
pub mod netsh;

use std::future::Future;

use crate::core::{Direction, Endpoint};
use crate::error::AppError;

pub use netsh::NetshExecutor;

/// Creates and deletes the block rule for one endpoint and direction.
///
/// Failures are `AppError::ExecutionFailed` or `AppError::TimedOut`; neither is
/// fatal to the process.
pub trait RuleExecutor: Send + Sync + 'static {
    /// Block all protocols to/from `endpoint` in `direction`.
    fn apply(
        &self,
        endpoint: &Endpoint,
        direction: Direction,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Delete the block rule. "No matching rule" is success.
    fn remove(
        &self,
        endpoint: &Endpoint,
        direction: Direction,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Whether the current process may modify the firewall.
#[cfg(target_os = "windows")]
pub fn is_elevated() -> bool {
    #[link(name = "shell32")]
    extern "system" {
        fn IsUserAnAdmin() -> i32;
    }
    unsafe { IsUserAnAdmin() != 0 }
}

/// The netsh backend only exists on Windows.
#[cfg(not(target_os = "windows"))]
pub fn is_elevated() -> bool {
    false
}
