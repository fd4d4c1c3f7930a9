//! Command-line front end over the command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::commands::logic::{describe_outcome, describe_summary, parse_switch, EntryView};
use crate::commands::{entries, hotkey, system, ActionResult, AppState, Hotkey, HotkeyGate};
use crate::config;
use crate::core::{Catalog, Engine, FileFeed, IntentStore, ReconcileReport, ToggleDirection};
use crate::db::Database;
use crate::error::AppError;
use crate::firewall::{NetshExecutor, RuleExecutor};
use crate::services::BackgroundServices;

#[derive(Parser, Debug)]
#[command(name = "ipblocker", version, about = "Keep per-endpoint block intent in sync with the Windows Firewall")]
pub struct Cli {
    /// Directory holding the state database.
    #[arg(long, global = true, default_value = ".")]
    pub data_dir: PathBuf,

    /// Endpoint feed file. Defaults to `endpoints.txt` in the data directory.
    #[arg(long, global = true)]
    pub feed: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every catalog entry with its block status
    List,
    /// Show one entry
    Status { entry: String },
    /// Toggle blocking for an entry
    Toggle {
        entry: String,
        /// in, out or both
        #[arg(long = "dir", default_value = "both")]
        direction: ToggleDirection,
        /// Apply to every entry regardless of the global setting
        #[arg(long, conflicts_with = "single")]
        all: bool,
        /// Apply to this entry only regardless of the global setting
        #[arg(long)]
        single: bool,
    },
    /// Remove rules of dropped entries and re-apply stored blocks
    Sync,
    /// Show or change settings
    Settings {
        #[arg(long, value_parser = clap::builder::BoolishValueParser::new())]
        sounds: Option<bool>,
        #[arg(long, value_parser = clap::builder::BoolishValueParser::new())]
        global: Option<bool>,
    },
    /// Interactive session with F1/F2/F3 hotkeys
    Run,
}

impl Cli {
    fn feed_path(&self) -> PathBuf {
        self.feed
            .clone()
            .unwrap_or_else(|| self.data_dir.join(config::DEFAULT_FEED_FILE))
    }
}

pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    std::fs::create_dir_all(&cli.data_dir)
        .with_context(|| format!("failed to create {}", cli.data_dir.display()))?;
    let db_path = cli.data_dir.join(config::STATE_DB_FILE);
    let database = Arc::new(Database::open(&db_path)?);
    tracing::debug!("State database at {}", db_path.display());

    if let Command::Settings { sounds, global } = &cli.command {
        if let Some(enabled) = sounds {
            system::set_sounds_enabled(&database, *enabled)?;
        }
        if let Some(enabled) = global {
            system::set_global_block_enabled(&database, *enabled)?;
        }
        let settings = system::get_settings(&database)?;
        emit(cli.json, &settings, || {
            format!(
                "sounds: {}\nglobal block: {}",
                on_off(settings.sounds_enabled),
                on_off(settings.global_block_enabled)
            )
        })?;
        return Ok(());
    }

    if matches!(cli.command, Command::Toggle { .. } | Command::Sync | Command::Run) {
        system::check_privileges()?;
    }

    let state = Arc::new(build_state(&cli, database, NetshExecutor::default())?);

    match cli.command {
        Command::List => {
            let list = entries::list_entries(&state);
            emit(cli.json, &list, || format_entries(&list))?;
        }
        Command::Status { entry } => {
            let view = entries::status(&state, &entry)?;
            emit(cli.json, &view, || format_entries(std::slice::from_ref(&view)))?;
        }
        Command::Toggle {
            entry,
            direction,
            all,
            single,
        } => {
            let result = toggle_scoped(&state, &entry, direction, all, single).await?;
            emit(cli.json, &result, || describe_result(&result))?;
        }
        Command::Sync => {
            let report = entries::reconcile_on_startup(&state).await?;
            emit(cli.json, &report, || describe_report(&report))?;
        }
        Command::Run => run_session(state).await?,
        Command::Settings { .. } => {}
    }
    Ok(())
}

fn build_state<E: RuleExecutor>(
    cli: &Cli,
    database: Arc<Database>,
    executor: E,
) -> anyhow::Result<AppState<E>> {
    let feed = FileFeed::new(cli.feed_path());
    // Rejected lines are already logged by the loader.
    let (catalog, _rejected) = Catalog::load(&feed)?;
    let store = IntentStore::load(Arc::clone(&database))?;
    let engine = Arc::new(Engine::new(executor, Arc::new(catalog), store));
    Ok(AppState::new(engine, database, HotkeyGate::default()))
}

async fn toggle_scoped<E: RuleExecutor>(
    state: &AppState<E>,
    entry: &str,
    direction: ToggleDirection,
    all: bool,
    single: bool,
) -> Result<ActionResult, AppError> {
    if all {
        let summary = entries::toggle_global_from(state, entry, direction).await?;
        return Ok(ActionResult::Global(summary));
    }
    if single {
        let outcome = entries::toggle(state, entry, direction).await?;
        return Ok(ActionResult::Single(outcome));
    }
    hotkey::perform_action(state, entry, direction).await
}

/// Interactive loop. Reconciliation runs in the background and is abandoned on quit.
async fn run_session<E: RuleExecutor>(state: Arc<AppState<E>>) -> anyhow::Result<()> {
    let reconciliation = BackgroundServices::start_reconciliation(Arc::clone(&state.engine));
    println!("{}", SESSION_HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match handle_line(&state, &line).await {
            Ok(SessionStep::Output(text)) => println!("{text}"),
            Ok(SessionStep::Silent) => {}
            Ok(SessionStep::Quit) => break,
            Err(e) => eprintln!("error: {e}"),
        }
    }

    reconciliation.shutdown();
    tracing::info!("Session ended; block rules are left in place");
    Ok(())
}

const SESSION_HELP: &str = "commands: select <entry> | f1 (both) | f2 (in) | f3 (out) | \
list | status [entry] | global on|off | sounds on|off | help | quit";

#[derive(Debug, PartialEq, Eq)]
enum SessionStep {
    Output(String),
    Silent,
    Quit,
}

async fn handle_line<E: RuleExecutor>(
    state: &AppState<E>,
    line: &str,
) -> Result<SessionStep, AppError> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(SessionStep::Silent);
    };
    let argument = words.next();

    match command.to_ascii_lowercase().as_str() {
        "quit" | "exit" => Ok(SessionStep::Quit),
        "help" => Ok(SessionStep::Output(SESSION_HELP.to_string())),
        "list" => Ok(SessionStep::Output(format_entries(&entries::list_entries(state)))),
        "select" => {
            let entry = argument
                .ok_or_else(|| AppError::InvalidInput("usage: select <entry>".into()))?;
            let endpoint = state.select(entry)?;
            Ok(SessionStep::Output(format!("selected {endpoint}")))
        }
        "status" => {
            let endpoint = match argument {
                Some(entry) => state.engine.resolve(entry)?,
                None => state
                    .selected()
                    .ok_or_else(|| AppError::InvalidInput("select an entry first".into()))?,
            };
            let view = entries::status(state, &endpoint.key())?;
            Ok(SessionStep::Output(format_entries(std::slice::from_ref(&view))))
        }
        "global" | "sounds" => {
            let enabled = parse_switch(argument.unwrap_or_default())?;
            if command.eq_ignore_ascii_case("global") {
                system::set_global_block_enabled(&state.database, enabled)?;
            } else {
                system::set_sounds_enabled(&state.database, enabled)?;
            }
            Ok(SessionStep::Output(format!(
                "{} {}",
                command.to_ascii_lowercase(),
                on_off(enabled)
            )))
        }
        key => {
            let key: Hotkey = key.parse()?;
            match hotkey::press_hotkey(state, key).await? {
                Some(result) => {
                    let mut text = describe_result(&result);
                    if system::get_settings(&state.database)?.sounds_enabled {
                        text.push('\u{7}');
                    }
                    Ok(SessionStep::Output(text))
                }
                None => Ok(SessionStep::Silent),
            }
        }
    }
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

fn describe_result(result: &ActionResult) -> String {
    match result {
        ActionResult::Single(outcome) => describe_outcome(outcome),
        ActionResult::Global(summary) => describe_summary(summary),
    }
}

fn describe_report(report: &ReconcileReport) -> String {
    format!(
        "orphans removed: {}\norphan rules removed: {} ({} failed)\nrules re-applied: {} ({} failed)",
        report.orphans_removed,
        report.rules_removed,
        report.cleanup_failures,
        report.rules_applied,
        report.apply_failures
    )
}

fn format_entries(list: &[EntryView]) -> String {
    if list.is_empty() {
        return "no entries".to_string();
    }
    let width = list.iter().map(|v| v.endpoint.len()).max().unwrap_or(0);
    list.iter()
        .map(|v| {
            format!(
                "{:<width$}  {:<9}  in:{:<3}  out:{:<3}  {}",
                v.endpoint,
                v.kind,
                on_off(v.in_blocked),
                on_off(v.out_blocked),
                v.label
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
