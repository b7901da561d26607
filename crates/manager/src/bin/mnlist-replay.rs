// Path: crates/manager/src/bin/mnlist-replay.rs
#![forbid(unsafe_code)]

//! Replays a JSON file of blocks through the registry manager against a redb
//! store and prints the resulting tip.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use mnlist_manager::config::load_config;
use mnlist_manager::{BlockTree, RegistryManager};
use mnlist_storage::RedbKvStore;
use mnlist_types::app::{BlockContents, Hash256};
use mnlist_types::config::RegistryConfig;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[clap(about = "Replay blocks through the participant registry")]
struct ReplayOpts {
    #[clap(long, help = "Path to the registry TOML config. Defaults apply when omitted.")]
    config: Option<PathBuf>,
    #[clap(long, help = "Path to the redb database file (created if missing).")]
    db: PathBuf,
    #[clap(long, help = "Path to a JSON array of blocks, in chain order.")]
    blocks: PathBuf,
    #[clap(long, help = "Hex quorum modifier. Defaults to the tip block hash.")]
    modifier: Option<String>,
    #[clap(long, default_value_t = 10, help = "Size of the printed quorum.")]
    quorum_size: usize,
    #[clap(long, help = "Print the Prometheus metrics after the replay.")]
    metrics: bool,
}

fn main() -> Result<()> {
    mnlist_telemetry::init::init_tracing_pretty()?;
    let opts = ReplayOpts::parse();

    if opts.metrics {
        mnlist_telemetry::prometheus::install_global()?;
    }

    let config = match &opts.config {
        Some(path) => load_config(path)?,
        None => RegistryConfig::default(),
    };
    tracing::info!(target: "registry", event = "startup", config = ?config);

    let blocks: Vec<BlockContents> = serde_json::from_str(
        &fs::read_to_string(&opts.blocks)
            .with_context(|| format!("reading {}", opts.blocks.display()))?,
    )
    .with_context(|| format!("parsing {}", opts.blocks.display()))?;

    let store = Arc::new(RedbKvStore::open(&opts.db)?);
    let chain = Arc::new(BlockTree::new());
    let manager = RegistryManager::new(config, store, chain.clone());

    let mut rejected = 0usize;
    for block in &blocks {
        let block_ref = chain.push(block);
        let outcome = manager
            .process_block(block, false)
            .with_context(|| format!("block {} at height {}", block.block_hash, block.height))?;
        rejected += outcome.rejected.len();
        manager.updated_block_tip(&block_ref)?;
        manager.do_maintenance();
    }

    let tip = manager.get_list_at_tip();
    let modifier = match &opts.modifier {
        Some(hex) => Hash256::from_hex(hex).map_err(|e| anyhow!("bad modifier: {}", e))?,
        None => tip.block_hash(),
    };
    println!("tip height:            {}", tip.height());
    println!("tip hash:              {}", tip.block_hash());
    println!("participants:          {}", tip.all_count());
    println!("valid participants:    {}", tip.valid_count());
    println!("total ever registered: {}", tip.total_registered_count());
    println!("rejected transactions: {}", rejected);
    if let Some(payee) = tip.next_payee() {
        println!("next payee:            {}", payee.participant_id);
    }
    println!("quorum ({}):", modifier.short());
    for record in tip.calculate_quorum(opts.quorum_size, &modifier) {
        println!("  {:>6}  {}", record.internal_id, record.participant_id);
    }

    if opts.metrics {
        print!("{}", mnlist_telemetry::prometheus::render());
    }
    Ok(())
}
