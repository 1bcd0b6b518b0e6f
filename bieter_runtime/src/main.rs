//! bieter-log: open the store described by a config file, replay its log
//! and print a summary.
//!
//! Usage: `bieter-log [config.toml]`

use std::path::PathBuf;

use anyhow::Context;
use bieter_runtime::drift::verify_determinism;
use bieter_runtime::event_log::EventLog;
use bieter_runtime::replay;
use bieter_runtime::{load_config, Store};

fn main() -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = load_config(config_path.as_deref()).context("loading configuration")?;

    let store = Store::from_config(&config)
        .with_context(|| format!("opening store at {}", config.store.log_path.display()))?;

    // Independent second replay straight from the file.
    let log = EventLog::open(&config.store.log_path)?;
    let events = replay::load_events(&log)?;
    let replay_hash = verify_determinism(&events)?;
    anyhow::ensure!(
        replay_hash == store.state_hash(),
        "replayed hash {} differs from store hash {}",
        replay_hash,
        store.state_hash()
    );

    let snapshot = store.snapshot();
    println!("log:      {}", config.store.log_path.display());
    println!("sequence: {}", store.sequence());
    println!("phase:    {} ({})", snapshot.phase.number(), snapshot.phase);
    println!("members:  {}", snapshot.members.len());
    println!("offers:   {}", snapshot.offers.len());
    println!("hash:     {}", replay_hash);
    Ok(())
}
