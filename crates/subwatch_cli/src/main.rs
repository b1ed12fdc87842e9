//! CLI entry point for smoke-testing the core.
//!
//! - `subwatch ping` / `subwatch version`: linkage checks.
//! - `subwatch demo [config.json]`: runs one toggle across two surfaces
//!   against the negotiated store and prints what each surface sees.

use serde_json::Value;
use std::process::ExitCode;
use std::sync::Arc;
use subwatch_core::model::action::CATEGORY_BALANCES;
use subwatch_core::{
    init_from_config, open_store_with_feeds, AccountRef, ChainClient, CoreConfig, EventSink,
    FeedRegistry, MemoryTransport, MutationOutcome, ScopeTarget, SubscriptionTask, Surface,
    SurfaceKind,
};

const DEMO_ACTION: &str = "subscribe:account:balance:free";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("ping") => {
            println!("subwatch_core ping={}", subwatch_core::ping());
            ExitCode::SUCCESS
        }
        Some("version") | None => {
            println!("subwatch_core version={}", subwatch_core::core_version());
            ExitCode::SUCCESS
        }
        Some("demo") => run_demo(args.get(1).map(String::as_str)),
        Some(other) => {
            eprintln!("unknown command `{other}`; expected ping|version|demo");
            ExitCode::from(2)
        }
    }
}

fn run_demo(config_path: Option<&str>) -> ExitCode {
    let config = match config_path {
        Some(path) => CoreConfig::load(path),
        None => Ok(CoreConfig::default()),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = init_from_config(&config) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start runtime: {err}");
            return ExitCode::FAILURE;
        }
    };
    match runtime.block_on(demo(&config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn demo(config: &CoreConfig) -> Result<(), Box<dyn std::error::Error>> {
    let registry = Arc::new(FeedRegistry::new(Arc::new(PrintClient), Arc::new(PrintSink)));
    let store = open_store_with_feeds(&config.store_selection()?, registry.clone()).await?;
    let transport = Arc::new(MemoryTransport::new(config.broadcast_capacity));

    let account = AccountRef::new("Polkadot", "15oF4uVJwmo4TdGW7VfQxNLavjCXviqxT9S1MgbjMNHr6Sp5");
    let targets = vec![ScopeTarget::Account(account.clone())];
    let main = Surface::new(
        SurfaceKind::Main,
        targets.clone(),
        store.clone(),
        transport.clone(),
        config.surface_options(),
    );
    let settings = Surface::new(
        SurfaceKind::Settings,
        targets,
        store.clone(),
        transport,
        config.surface_options(),
    );
    main.hydrate().await?;
    settings.hydrate().await?;

    let task = SubscriptionTask::new("Polkadot", DEMO_ACTION, CATEGORY_BALANCES)
        .with_account(account);
    let key = task.key();
    main.add_task(task).await?;
    if let MutationOutcome::Committed(tasks) = main.toggle_status(&key).await? {
        for task in tasks {
            println!(
                "main committed key={} status={} version={}",
                task.key(),
                task.status.as_str(),
                task.version
            );
        }
    }

    let applied = settings.drain_inbox().await?;
    let seen = settings.find(&key);
    println!(
        "settings applied={} status={}",
        applied,
        seen.as_ref().map_or("missing", |task| task.status.as_str())
    );
    println!(
        "store backend={} active={} feeds={}",
        store.backend_id(),
        store.get_active_count().await?,
        registry.active_feeds()
    );
    Ok(())
}

struct PrintClient;

impl ChainClient for PrintClient {
    fn start_feed(&self, chain_id: &str, action: &str) {
        println!("feed start chain={chain_id} action={action}");
    }

    fn stop_feed(&self, chain_id: &str, action: &str) {
        println!("feed stop chain={chain_id} action={action}");
    }
}

struct PrintSink;

impl EventSink for PrintSink {
    fn ui_event(&self, task: &SubscriptionTask, payload: &Value) {
        println!("ui key={} payload={payload}", task.key());
    }

    fn os_notification(&self, task: &SubscriptionTask, payload: &Value) {
        println!("notify key={} payload={payload}", task.key());
    }
}
