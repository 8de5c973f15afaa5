//! Async driver around [`ConsensusService`].
//!
//! The runner owns the service and multiplexes commands from the node with
//! the round timer. Timer deadlines are Unix seconds and are mapped onto the
//! tokio clock on every iteration.

use crate::{ConsensusPayload, ConsensusResult, ConsensusService, Ledger};
use neo_core::{Header, Transaction};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

/// Inputs the node feeds into the runner.
#[derive(Debug, Clone)]
pub enum ConsensusCommand {
    Payload(ConsensusPayload),
    Transaction(Transaction),
    BlockPersisted(Header),
    Stop,
}

/// Current Unix time in whole seconds; a clock before the epoch reads as 0.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

pub struct ConsensusRunner<L: ?Sized> {
    service: ConsensusService<L>,
    commands: mpsc::Receiver<ConsensusCommand>,
}

impl<L: Ledger + ?Sized> ConsensusRunner<L> {
    pub fn new(service: ConsensusService<L>, commands: mpsc::Receiver<ConsensusCommand>) -> Self {
        Self { service, commands }
    }

    /// Runs until [`ConsensusCommand::Stop`] arrives or the command channel
    /// closes.
    pub async fn run(mut self) -> ConsensusResult<()> {
        self.service.start(unix_now())?;

        loop {
            let wake = self.service.deadline().map(|deadline| {
                Instant::now() + Duration::from_secs(deadline.saturating_sub(unix_now()))
            });

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(ConsensusCommand::Payload(payload)) => {
                        self.service.process_message(payload, unix_now())?;
                    }
                    Some(ConsensusCommand::Transaction(transaction)) => {
                        self.service.on_transaction_received(transaction, unix_now())?;
                    }
                    Some(ConsensusCommand::BlockPersisted(header)) => {
                        self.service.on_block_persisted(&header, unix_now())?;
                    }
                    Some(ConsensusCommand::Stop) | None => break,
                },
                _ = sleep_until(wake) => {
                    debug!("Consensus timer fired");
                    self.service.on_timer(unix_now())?;
                }
            }
        }

        self.service.stop();
        info!("Consensus runner stopped");
        Ok(())
    }
}

async fn sleep_until(wake: Option<Instant>) {
    match wake {
        Some(instant) => tokio::time::sleep_until(instant).await,
        None => std::future::pending().await,
    }
}
