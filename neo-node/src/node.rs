//! Node runtime: storage, the chain and the consensus task wired together.

use crate::blockchain::{Blockchain, ChainStorage, DEFAULT_POOL_CAPACITY};
use anyhow::{bail, Context};
use neo_config::{ConsensusSettings, NodeConfig, StorageBackend, StorageSettings};
use neo_consensus::{
    ConsensusCommand, ConsensusEvent, ConsensusOptions, ConsensusRunner, ConsensusService,
};
use neo_crypto::{ECPoint, KeyPair};
use neo_storage::{CachedStorage, KeyValueStore, LedgerStore, MemoryStore};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Channel buffer sizes
const EVENT_CHANNEL_SIZE: usize = 1024;
const COMMAND_CHANNEL_SIZE: usize = 256;

/// The façade every node component reads and commits through.
pub type NodeStorage = CachedStorage<LedgerStore<dyn KeyValueStore>>;

pub fn open_storage(settings: &StorageSettings) -> anyhow::Result<Arc<NodeStorage>> {
    let backend: Arc<dyn KeyValueStore> = match settings.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::RocksDb => open_rocksdb(settings)?,
    };
    info!(backend = %settings.backend, cache_bytes = settings.cache_size_bytes, "Opened storage");
    Ok(Arc::new(CachedStorage::new(
        LedgerStore::new(backend),
        settings.cache_size_bytes,
    )))
}

#[cfg(feature = "rocksdb")]
fn open_rocksdb(settings: &StorageSettings) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    let path = settings
        .path
        .as_ref()
        .context("storage.path is required for the rocksdb backend")?;
    Ok(Arc::new(neo_storage::RocksDbStore::open(path)?))
}

#[cfg(not(feature = "rocksdb"))]
fn open_rocksdb(_settings: &StorageSettings) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    bail!("the rocksdb backend needs a build with the `rocksdb` feature")
}

pub fn parse_validators(settings: &ConsensusSettings) -> anyhow::Result<Vec<ECPoint>> {
    settings
        .validators
        .iter()
        .map(|hex| ECPoint::from_hex(hex).with_context(|| format!("invalid validator key {hex}")))
        .collect()
}

pub fn consensus_options(settings: &ConsensusSettings) -> ConsensusOptions {
    ConsensusOptions {
        seconds_per_block: settings.seconds_per_block,
        max_transactions_per_block: settings.max_transactions_per_block,
        max_future_views: settings.max_future_views,
        max_buffered_per_view: settings.max_buffered_per_view,
        view_change_alert_threshold: settings.view_change_alert_threshold,
        ..ConsensusOptions::default()
    }
}

/// Runs the node described by `config` until Ctrl-C.
pub async fn run(config: NodeConfig) -> anyhow::Result<()> {
    let storage = open_storage(&config.storage)?;
    let validators = parse_validators(&config.consensus)?;
    let blockchain = Arc::new(Blockchain::open(storage, validators, DEFAULT_POOL_CAPACITY)?);
    info!(height = blockchain.height(), hash = %blockchain.tip().hash(), "Node started");

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(%err, "Failed to listen for shutdown signal");
        }
        info!("Shutdown requested");
    };

    if !config.consensus.enabled {
        info!("Consensus disabled");
        shutdown.await;
        return Ok(());
    }
    run_consensus(blockchain, &config.consensus, shutdown).await
}

/// Runs consensus over `blockchain` until `shutdown` completes.
pub async fn run_consensus<S, F>(
    blockchain: Arc<Blockchain<S>>,
    settings: &ConsensusSettings,
    shutdown: F,
) -> anyhow::Result<()>
where
    S: ChainStorage + 'static,
    F: Future<Output = ()>,
{
    let key = settings
        .private_key
        .as_deref()
        .context("consensus.private_key is required when consensus is enabled")?;
    let key_pair = KeyPair::from_hex(key).context("invalid consensus.private_key")?;
    let validators = blockchain.validators().to_vec();
    if settings.private_net && validators.len() != 1 {
        bail!(
            "private_net produces blocks alone and needs exactly one validator, {} configured",
            validators.len()
        );
    }

    let (event_tx, mut event_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
    let tip = blockchain.tip();
    let service = ConsensusService::new(
        consensus_options(settings),
        key_pair,
        validators,
        Arc::clone(&blockchain),
        event_tx,
        &tip,
    )?;
    let runner = tokio::spawn(ConsensusRunner::new(service, command_rx).run());
    info!(private_net = settings.private_net, "Consensus started");

    tokio::pin!(shutdown);
    let outcome = loop {
        tokio::select! {
            _ = &mut shutdown => break Ok(()),
            event = event_rx.recv() => match event {
                Some(event) => {
                    if let Err(err) = handle_event(&blockchain, event, &command_tx).await {
                        break Err(err);
                    }
                }
                None => break Ok(()),
            },
        }
    };

    // the runner may already be gone after a failure
    let _ = command_tx.send(ConsensusCommand::Stop).await;
    runner.await.context("consensus task panicked")??;
    outcome
}

async fn handle_event<S: ChainStorage>(
    blockchain: &Blockchain<S>,
    event: ConsensusEvent,
    commands: &mpsc::Sender<ConsensusCommand>,
) -> anyhow::Result<()> {
    match event {
        ConsensusEvent::BlockCommitted(block) => {
            blockchain
                .persist_block(&block)
                .with_context(|| format!("failed to persist committed block {}", block.index()))?;
            commands
                .send(ConsensusCommand::BlockPersisted(block.header))
                .await
                .context("consensus task stopped")?;
        }
        ConsensusEvent::BroadcastMessage(payload) => {
            debug!(
                block_index = payload.block_index,
                validator = payload.validator_index,
                hash = %payload.hash(),
                "Outbound consensus payload"
            );
        }
        ConsensusEvent::ViewChanged {
            block_index,
            old_view,
            new_view,
        } => {
            info!(block_index, old_view, new_view, "View changed");
        }
        ConsensusEvent::ViewChangeStalled { block_index, view } => {
            warn!(block_index, view, "Consensus stalled");
        }
        ConsensusEvent::RequestTransactions { block_index, hashes } => {
            debug!(block_index, count = hashes.len(), "Consensus is missing transactions");
            for hash in &hashes {
                if let Some(transaction) = blockchain.mempool().get(hash) {
                    commands
                        .send(ConsensusCommand::Transaction(transaction))
                        .await
                        .context("consensus task stopped")?;
                }
            }
        }
    }
    Ok(())
}
