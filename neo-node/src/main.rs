use anyhow::Context;
use clap::Parser;
use neo_config::NodeConfig;
use neo_node::{init_tracing, run};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "neo-node", version, about = "Neo dBFT validator node")]
struct NodeArgs {
    /// Path to the TOML configuration file
    #[arg(long, short, env = "NEO_CONFIG")]
    config: Option<PathBuf>,

    /// Storage directory, overriding `storage.path`
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log filter, overriding `logging.level`
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON log lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = NodeArgs::parse();

    let mut config = match &args.config {
        Some(path) => NodeConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => NodeConfig::default(),
    };
    if let Some(dir) = args.data_dir {
        config.storage.path = Some(dir);
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    config.logging.json |= args.json;

    init_tracing(&config.logging.level, config.logging.json)?;
    config.validate()?;

    run(config).await
}
