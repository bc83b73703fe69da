//! unistate - drive the sync-engine and migration stores from the command line.
//!
//! Every state the store publishes is printed to stdout as one JSON line.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use unistate::config::Config;
use unistate::logging::init_tracing;
use unistate::migration::{migration_store, Migration, MigrationAction, MigrationRun};
use unistate::store::{Action, State, Store};
use unistate::sync::{
    sync_engines_store, EnablePolicy, SyncEngine, SyncEnginesAction, SyncStoreOptions,
};

#[derive(Parser, Debug)]
#[command(name = "unistate")]
#[command(about = "Dispatch actions into a state store and print every state", long_about = None)]
struct Args {
    /// Config file (default: <config dir>/unistate/config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sync-engine store. Ops: enable:<engine>, disable:<engine>, disable-all
    Sync {
        /// Keep at most one entry per engine
        #[arg(long)]
        dedupe: bool,

        /// Apply every history change to forms as well
        #[arg(long)]
        forms_follow_history: bool,

        #[arg(value_name = "OP", value_parser = parse_sync_op)]
        ops: Vec<SyncEnginesAction>,
    },
    /// Migration store. Ops: started, result:<migration>:<version>:<ok|failed>,
    /// completed, clear
    Migration {
        #[arg(value_name = "OP", value_parser = parse_migration_op)]
        ops: Vec<MigrationAction>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load().context("loading default config")?,
    };
    init_tracing(&config.logging);

    match args.command {
        Command::Sync {
            dedupe,
            forms_follow_history,
            ops,
        } => {
            let options = SyncStoreOptions {
                policy: if dedupe {
                    EnablePolicy::Deduplicate
                } else {
                    EnablePolicy::AllowDuplicates
                },
                forms_follow_history,
            };
            let store = sync_engines_store(config.store.scoped("sync-engines"), options);
            drive(store, ops).await
        }
        Command::Migration { ops } => {
            let store = migration_store(config.store.scoped("migration"));
            drive(store, ops).await
        }
    }
}

/// Print every published state, feed `ops` through the async dispatcher,
/// then tear the store down.
async fn drive<S, A>(store: Store<S, A>, ops: Vec<A>) -> Result<()>
where
    S: State + Serialize,
    A: Action,
{
    let printer = store.subscribe_with_action(|state: &S, action: Option<&A>| {
        match render(state, action) {
            Ok(line) => println!("{}", line),
            Err(err) => eprintln!("Warning: failed to render state: {}", err),
        }
    })?;

    let dispatcher = store.spawn_dispatcher();
    for op in ops {
        let description = format!("{:?}", op);
        dispatcher
            .dispatch(op)
            .await
            .with_context(|| format!("dispatching {}", description))?;
    }

    printer.unsubscribe();
    store.dispose();
    Ok(())
}

fn render<S: Serialize, A: std::fmt::Debug>(state: &S, action: Option<&A>) -> serde_json::Result<String> {
    serde_json::to_string(&serde_json::json!({
        "action": action.map(|action| format!("{:?}", action)),
        "state": state,
    }))
}

fn parse_sync_op(op: &str) -> Result<SyncEnginesAction> {
    if op == "disable-all" {
        return Ok(SyncEnginesAction::DisableAll);
    }
    let (verb, engine) = op
        .split_once(':')
        .ok_or_else(|| anyhow!("expected enable:<engine>, disable:<engine> or disable-all, got '{}'", op))?;
    if engine.is_empty() {
        bail!("missing engine name in '{}'", op);
    }
    let engine: SyncEngine = engine.parse()?;
    match verb {
        "enable" => Ok(SyncEnginesAction::Enable(engine)),
        "disable" => Ok(SyncEnginesAction::Disable(engine)),
        other => bail!("unknown sync op '{}'", other),
    }
}

fn parse_migration_op(op: &str) -> Result<MigrationAction> {
    match op {
        "started" => return Ok(MigrationAction::Started),
        "completed" => return Ok(MigrationAction::Completed),
        "clear" => return Ok(MigrationAction::Clear),
        _ => {}
    }

    let mut parts = op.split(':');
    let (Some("result"), Some(migration), Some(version), Some(outcome), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        bail!("expected started, completed, clear or result:<migration>:<version>:<ok|failed>, got '{}'", op);
    };

    let migration: Migration = migration.parse()?;
    let version: u32 = version
        .parse()
        .with_context(|| format!("invalid version '{}'", version))?;
    let success = match outcome {
        "ok" => true,
        "failed" => false,
        other => bail!("expected ok or failed, got '{}'", other),
    };

    Ok(MigrationAction::MigrationRunResult {
        migration,
        run: MigrationRun { version, success },
    })
}
