mod cli;
mod commands;
mod config;
mod core;
mod db;
mod error;
mod firewall;
mod services;

use clap::Parser;

pub use crate::core::{
    Action, BlockStatus, Catalog, Direction, Endpoint, EndpointFeed, Engine, FailedEntry,
    FileFeed, GlobalSummary, IntentStore, ReconcileReport, RejectedLine, ToggleDirection,
    ToggleOutcome,
};
pub use crate::db::{Database, Settings};
pub use crate::error::AppError;
pub use crate::firewall::{is_elevated, NetshExecutor, RuleExecutor};
pub use crate::services::{BackgroundServices, ReconciliationTask};

pub fn run() -> anyhow::Result<()> {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("PANIC in ipblocker: {info}");
        default_hook(info);
    }));

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config::DEFAULT_LOG_FILTER.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("ipblocker-worker")
        .build()?;
    let result = runtime.block_on(cli::execute(cli));
    // In-flight firewall commands are not awaited on exit.
    runtime.shutdown_background();
    result
}
