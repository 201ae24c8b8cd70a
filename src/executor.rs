// Copyright 2024 Janus Bridge Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Bridge Executor Module
//!
//! The chain-agnostic operations the half-bridge steps invoke. One executor
//! instance backs each half-bridge; `source` is the chain batches originate
//! from (and where statuses are reported), `destination` the chain the
//! transfer executes on. The executor is single-writer per half-bridge, so
//! its mutable state needs no internal locking.

use std::sync::Arc;
use std::time::Duration;

use crate::batch::TransferBatch;
use crate::chain::{ActionId, ChainClient, MessageHash, INVALID_ACTION_ID};
use crate::error::{Error, Result};
use crate::p2p::SignatureStore;
use crate::store::StatusHandler;
use crate::topology::TopologyProvider;

/// The operation set the half-bridge steps are written against.
///
/// Kept as a trait so step transitions can be exercised with a scripted
/// bridge in tests, the same way they are in production with the real
/// [`BridgeExecutor`].
#[async_trait::async_trait]
pub trait BridgeOperations: Send {
    /// Name of the half-bridge this executor backs.
    fn name(&self) -> &str;

    /// True if this relayer leads the current time window.
    fn my_turn_as_leader(&self) -> bool;

    /// The next pending batch on the source chain, or `None`. Empty and
    /// already-executed batches count as no pending batch.
    async fn get_pending_batch(&self) -> Result<Option<TransferBatch>>;

    /// Stores the batch as the current one and clears the signature set for
    /// the new round.
    fn store_batch(&mut self, batch: TransferBatch) -> Result<()>;

    /// The currently stored batch, if any.
    fn stored_batch(&self) -> Option<&TransferBatch>;

    /// Drops the current batch so it is re-fetched, and re-verified, from
    /// scratch.
    fn clear_stored_batch(&mut self);

    /// Checks the stored batch's deposit nonces against the last executed
    /// deposit nonce on the destination chain.
    async fn verify_deposit_nonces(&self) -> Result<()>;

    /// Fetches and stores the action ID for the transfer proposal.
    async fn get_and_store_action_id_for_transfer(&mut self) -> Result<ActionId>;

    /// Fetches and stores the action ID for the set-status proposal.
    async fn get_and_store_action_id_for_set_status(&mut self)
        -> Result<ActionId>;

    /// The stored action ID.
    fn stored_action_id(&self) -> ActionId;

    /// Whether the transfer was already proposed on the destination chain.
    async fn was_transfer_proposed(&self) -> Result<bool>;

    /// Proposes the transfer on the destination chain.
    async fn propose_transfer(&mut self) -> Result<()>;

    /// Whether the status vector was already proposed on the source chain.
    async fn was_set_status_proposed(&self) -> Result<bool>;

    /// Proposes the status vector on the source chain.
    async fn propose_set_status(&mut self) -> Result<()>;

    /// Whether the transfer action needs no further signature from this
    /// relayer.
    async fn was_transfer_action_signed(&self) -> Result<bool>;

    /// Signs the transfer action and broadcasts the signature to the peers.
    async fn sign_transfer_action(&mut self) -> Result<()>;

    /// Whether the set-status action needs no further signature from this
    /// relayer.
    async fn was_set_status_action_signed(&self) -> Result<bool>;

    /// Signs the set-status action and broadcasts the signature.
    async fn sign_set_status_action(&mut self) -> Result<()>;

    /// Polls the destination chain for transfer quorum.
    async fn process_quorum_reached_on_transfer(&mut self) -> Result<bool>;

    /// Polls the source chain for set-status quorum.
    async fn process_quorum_reached_on_set_status(&mut self) -> Result<bool>;

    /// Whether the transfer already executed on the destination chain.
    async fn was_transfer_performed(&self) -> Result<bool>;

    /// Executes the transfer on the destination chain.
    async fn perform_transfer(&mut self) -> Result<()>;

    /// Whether the set-status action already executed on the source chain.
    async fn was_set_status_performed(&self) -> Result<bool>;

    /// Executes the set-status action on the source chain.
    async fn perform_set_status(&mut self) -> Result<()>;

    /// Sleeps for at most the configured transfer-execution time.
    async fn wait_for_transfer_confirmation(&self);

    /// Reads the per-deposit statuses from the destination chain, refreshing
    /// the stored batch first if the source knows a newer shape of it.
    async fn fetch_batch_statuses(&mut self) -> Result<Vec<u8>>;

    /// Applies fetched statuses to the stored batch.
    fn resolve_statuses(&mut self, statuses: Vec<u8>);

    /// Marks every deposit of the stored batch rejected.
    fn mark_batch_rejected(&mut self);

    /// True once the stored batch carries a status byte per deposit.
    fn batch_is_resolved(&self) -> bool;

    /// Consumes one unit of the source-chain retry budget; true when the
    /// budget is exhausted.
    fn process_max_retries_on_source(&mut self) -> bool;

    /// Resets the source-chain retry budget.
    fn reset_retries_on_source(&mut self);

    /// Consumes one unit of the destination-chain retry budget; true when
    /// the budget is exhausted.
    fn process_max_retries_on_destination(&mut self) -> bool;

    /// Resets the destination-chain retry budget.
    fn reset_retries_on_destination(&mut self);
}

/// The production [`BridgeOperations`] implementation, which can be used for
/// both half-bridges.
pub struct BridgeExecutor {
    name: String,
    source: Arc<dyn ChainClient>,
    destination: Arc<dyn ChainClient>,
    topology: Arc<dyn TopologyProvider>,
    signatures: Arc<dyn SignatureStore>,
    status: StatusHandler,
    time_for_transfer_execution: Duration,
    batch: Option<TransferBatch>,
    action_id: ActionId,
    message_hash: Option<MessageHash>,
    retries_on_source: u64,
    retries_on_destination: u64,
}

impl BridgeExecutor {
    /// Creates an executor for one half-bridge.
    pub fn new(
        name: impl Into<String>,
        source: Arc<dyn ChainClient>,
        destination: Arc<dyn ChainClient>,
        topology: Arc<dyn TopologyProvider>,
        signatures: Arc<dyn SignatureStore>,
        status: StatusHandler,
        time_for_transfer_execution: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            destination,
            topology,
            signatures,
            status,
            time_for_transfer_execution,
            batch: None,
            action_id: INVALID_ACTION_ID,
            message_hash: None,
            retries_on_source: 0,
            retries_on_destination: 0,
        }
    }

    fn batch(&self) -> Result<&TransferBatch> {
        self.batch.as_ref().ok_or(Error::NilBatch)
    }

    /// The message hash for the current batch on the given chain, generated
    /// and cached on first use.
    fn message_hash_on(&mut self, client: Arc<dyn ChainClient>) -> Result<MessageHash> {
        if let Some(hash) = self.message_hash {
            return Ok(hash);
        }
        let hash = client.generate_message_hash(self.batch()?)?;
        self.message_hash = Some(hash);
        Ok(hash)
    }
}

#[async_trait::async_trait]
impl BridgeOperations for BridgeExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    fn my_turn_as_leader(&self) -> bool {
        self.topology.my_turn_as_leader()
    }

    async fn get_pending_batch(&self) -> Result<Option<TransferBatch>> {
        let Some(batch) = self.source.get_pending_batch().await? else {
            return Ok(None);
        };
        if batch.is_empty() {
            return Ok(None);
        }

        let last_executed = self.destination.get_last_executed_batch_id().await?;
        if batch.id <= last_executed {
            tracing::debug!(
                batch_id = batch.id,
                last_executed,
                "pending batch already executed on {}",
                self.destination.name(),
            );
            return Ok(None);
        }

        Ok(Some(batch))
    }

    fn store_batch(&mut self, batch: TransferBatch) -> Result<()> {
        if batch.is_empty() {
            return Err(Error::NilBatch);
        }
        self.status.set_last_batch_id(batch.id);
        self.signatures.clear_signatures();
        self.message_hash = None;
        self.action_id = INVALID_ACTION_ID;
        self.batch = Some(batch);
        Ok(())
    }

    fn stored_batch(&self) -> Option<&TransferBatch> {
        self.batch.as_ref()
    }

    fn clear_stored_batch(&mut self) {
        self.batch = None;
        self.message_hash = None;
        self.action_id = INVALID_ACTION_ID;
    }

    async fn verify_deposit_nonces(&self) -> Result<()> {
        let batch = self.batch()?;
        let last_nonce =
            self.destination.get_last_executed_deposit_nonce().await?;

        let mut expected = last_nonce + 1;
        for deposit in &batch.deposits {
            if deposit.nonce != expected {
                return Err(Error::InvalidDepositNonce {
                    deposit: deposit.to_string(),
                    expected,
                });
            }
            expected += 1;
        }

        Ok(())
    }

    async fn get_and_store_action_id_for_transfer(&mut self) -> Result<ActionId> {
        let batch = self.batch()?;
        let action_id = self
            .destination
            .get_action_id_for_propose_transfer(batch)
            .await?;
        if action_id != self.action_id {
            self.message_hash = None;
        }
        self.action_id = action_id;
        Ok(action_id)
    }

    async fn get_and_store_action_id_for_set_status(&mut self) -> Result<ActionId> {
        let batch = self.batch()?;
        let action_id = self.source.get_action_id_for_set_status(batch).await?;
        if action_id != self.action_id {
            // a new action means a new message hash to sign
            self.message_hash = None;
        }
        self.action_id = action_id;
        Ok(action_id)
    }

    fn stored_action_id(&self) -> ActionId {
        self.action_id
    }

    async fn was_transfer_proposed(&self) -> Result<bool> {
        self.destination.was_proposed_transfer(self.batch()?).await
    }

    async fn propose_transfer(&mut self) -> Result<()> {
        let batch = self.batch()?;
        let hash = self.destination.propose_transfer(batch).await?;
        self.status.inc_proposed();
        tracing::info!(
            tx_hash = %hash,
            batch_id = batch.id,
            "proposed transfer on {}",
            self.destination.name(),
        );
        Ok(())
    }

    async fn was_set_status_proposed(&self) -> Result<bool> {
        self.source.was_proposed_set_status(self.batch()?).await
    }

    async fn propose_set_status(&mut self) -> Result<()> {
        let batch = self.batch()?;
        let hash = self.source.propose_set_status(batch).await?;
        self.status.inc_proposed();
        tracing::info!(
            tx_hash = %hash,
            batch_id = batch.id,
            "proposed set status on {}",
            self.source.name(),
        );
        Ok(())
    }

    async fn was_transfer_action_signed(&self) -> Result<bool> {
        self.destination.was_action_executed(self.action_id).await
    }

    async fn sign_transfer_action(&mut self) -> Result<()> {
        let destination = self.destination.clone();
        let message_hash = self.message_hash_on(destination)?;
        self.destination
            .broadcast_signature_for_message_hash(message_hash);

        let hash = self.destination.sign_action(self.action_id).await?;
        self.status.inc_signed();
        tracing::info!(
            tx_hash = %hash,
            action_id = self.action_id,
            "signed proposed transfer",
        );
        Ok(())
    }

    async fn was_set_status_action_signed(&self) -> Result<bool> {
        self.source.was_action_executed(self.action_id).await
    }

    async fn sign_set_status_action(&mut self) -> Result<()> {
        let source = self.source.clone();
        let message_hash = self.message_hash_on(source)?;
        self.source
            .broadcast_signature_for_message_hash(message_hash);

        let hash = self.source.sign_action(self.action_id).await?;
        self.status.inc_signed();
        tracing::info!(
            tx_hash = %hash,
            action_id = self.action_id,
            "signed proposed set status",
        );
        Ok(())
    }

    async fn process_quorum_reached_on_transfer(&mut self) -> Result<bool> {
        let signers = self.destination.signers_count(self.action_id).await?;
        tracing::trace!(
            signers,
            action_id = self.action_id,
            "signer count on {}",
            self.destination.name(),
        );
        self.destination.quorum_reached(self.action_id).await
    }

    async fn process_quorum_reached_on_set_status(&mut self) -> Result<bool> {
        let signers = self.source.signers_count(self.action_id).await?;
        tracing::trace!(
            signers,
            action_id = self.action_id,
            "signer count on {}",
            self.source.name(),
        );
        self.source.quorum_reached(self.action_id).await
    }

    async fn was_transfer_performed(&self) -> Result<bool> {
        self.destination.was_batch_executed(self.batch()?.id).await
    }

    async fn perform_transfer(&mut self) -> Result<()> {
        let destination = self.destination.clone();
        let message_hash = self.message_hash_on(destination)?;

        let quorum = self.destination.get_quorum_size().await?;
        if !self
            .destination
            .is_quorum_reached_for_message_hash(&message_hash)
            .await?
        {
            return Err(Error::SignaturesNotReady);
        }

        let batch = self.batch.as_ref().ok_or(Error::NilBatch)?;
        let hash = self
            .destination
            .execute_transfer(&message_hash, batch, quorum)
            .await?;
        self.status.inc_executed();
        tracing::info!(
            tx_hash = %hash,
            batch_id = batch.id,
            "sent execute transfer on {}",
            self.destination.name(),
        );
        Ok(())
    }

    async fn was_set_status_performed(&self) -> Result<bool> {
        self.source.was_action_executed(self.action_id).await
    }

    async fn perform_set_status(&mut self) -> Result<()> {
        let batch = self.batch()?;
        let hash = self
            .source
            .perform_action(self.action_id, batch)
            .await?;
        self.status.inc_executed();
        tracing::info!(
            tx_hash = %hash,
            batch_id = batch.id,
            action_id = self.action_id,
            "sent perform action transaction on {}",
            self.source.name(),
        );
        Ok(())
    }

    async fn wait_for_transfer_confirmation(&self) {
        tokio::time::sleep(self.time_for_transfer_execution).await;
    }

    async fn fetch_batch_statuses(&mut self) -> Result<Vec<u8>> {
        let batch_id = self.batch()?.id;

        // the source may know a fresher shape of the batch than the one we
        // fetched at the start of the round
        if let Some(fresh) = self.source.get_batch(batch_id).await? {
            let stale = self
                .batch
                .as_ref()
                .map(|b| b.deposits != fresh.deposits)
                .unwrap_or(false);
            if stale {
                tracing::debug!(batch_id, "refreshed stored batch from source");
                self.batch = Some(fresh);
                self.message_hash = None;
            }
        }

        self.destination.get_transactions_statuses(batch_id).await
    }

    fn resolve_statuses(&mut self, statuses: Vec<u8>) {
        if let Some(batch) = self.batch.as_mut() {
            batch.apply_statuses(statuses);
        }
    }

    fn mark_batch_rejected(&mut self) {
        if let Some(batch) = self.batch.as_mut() {
            batch.mark_all_rejected();
            self.status.inc_rejected();
        }
    }

    fn batch_is_resolved(&self) -> bool {
        self.batch
            .as_ref()
            .map(TransferBatch::is_resolved)
            .unwrap_or(false)
    }

    fn process_max_retries_on_source(&mut self) -> bool {
        let max_retries = self.source.max_retries_on_quorum_reached();
        if self.retries_on_source < max_retries {
            self.retries_on_source += 1;
            self.status.inc_retries();
            return false;
        }
        true
    }

    fn reset_retries_on_source(&mut self) {
        self.retries_on_source = 0;
    }

    fn process_max_retries_on_destination(&mut self) -> bool {
        let max_retries = self.destination.max_retries_on_quorum_reached();
        if self.retries_on_destination < max_retries {
            self.retries_on_destination += 1;
            self.status.inc_retries();
            return false;
        }
        true
    }

    fn reset_retries_on_destination(&mut self) {
        self.retries_on_destination = 0;
    }
}

impl std::fmt::Debug for BridgeExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeExecutor")
            .field("name", &self.name)
            .field("batch", &self.batch)
            .field("action_id", &self.action_id)
            .finish()
    }
}
