//! Load a multiblock data directory, report every broken structure and the
//! size of the resulting client sync payload.
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use codex_engine::{CodexConfig, MultiblockDataManager, PredicateRegistry};

#[derive(Parser)]
#[command(name = "codex-check", about = "Validate a multiblock data directory")]
struct Args {
    /// TOML config file; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Data directory, overriding the config's `data_dir`
    data_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => CodexConfig::load(path)?,
        None => CodexConfig::default(),
    };
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }

    let env = env_logger::Env::default().default_filter_or(config.log_filter.as_str());
    env_logger::Builder::from_env(env).init();

    let manager = MultiblockDataManager::from_config(&config, PredicateRegistry::with_builtins());
    let errors = manager
        .load_dir(&config.data_dir)
        .with_context(|| format!("loading {}", config.data_dir.display()))?;

    let registry = manager.registry();
    let payload = manager.sync_message().to_bytes()?;
    println!(
        "{} multiblocks loaded from {}",
        registry.len(),
        config.data_dir.display()
    );
    for (id, multiblock) in registry.iter() {
        let size = multiblock.size();
        println!(
            "  {} ({}x{}x{}, {} cells{})",
            id,
            size.x,
            size.y,
            size.z,
            multiblock.cell_count(),
            if multiblock.is_symmetrical() {
                ", symmetrical"
            } else {
                ""
            }
        );
    }
    println!("sync payload: {} bytes", payload.len());

    if !errors.is_empty() {
        eprint!("{}", errors);
        std::process::exit(1);
    }
    Ok(())
}
