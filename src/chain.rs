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

//! # Chain Client Module
//!
//! The chain-agnostic operation set implemented by the source and
//! destination adapters. The relayer core only ever talks to a chain
//! through this trait; everything wire-specific (ABIs, RPC transports, gas
//! handling) lives behind the adapters.

use crate::batch::TransferBatch;
use crate::error::Result;

/// Opaque identifier for a pending multisig action on a bridge contract.
pub type ActionId = u64;

/// Marker returned while no valid action ID is known.
pub const INVALID_ACTION_ID: ActionId = u64::MAX;

/// Contract-defined hash over `(action id, batch id, deposit vector)`,
/// produced by [`ChainClient::generate_message_hash`].
pub type MessageHash = [u8; 32];

/// Transaction hash as rendered by the chain adapter.
pub type TxHash = String;

/// The operation set shared by both bridge chains.
///
/// Implementations must be safe for concurrent use: both half-bridges hold
/// the same two clients.
#[async_trait::async_trait]
pub trait ChainClient: Send + Sync {
    /// Short chain name used in logs.
    fn name(&self) -> &str;

    /// Returns the next pending batch on this chain, if any.
    async fn get_pending_batch(&self) -> Result<Option<TransferBatch>>;

    /// Returns the batch with the given identifier, if it exists.
    async fn get_batch(&self, batch_id: u64) -> Result<Option<TransferBatch>>;

    /// The identifier of the last batch this chain fully executed.
    async fn get_last_executed_batch_id(&self) -> Result<u64>;

    /// The nonce of the last deposit this chain executed.
    async fn get_last_executed_deposit_nonce(&self) -> Result<u64>;

    /// Whether a transfer proposal for the batch is already on-chain.
    async fn was_proposed_transfer(&self, batch: &TransferBatch) -> Result<bool>;

    /// Submits the transfer proposal for the batch.
    async fn propose_transfer(&self, batch: &TransferBatch) -> Result<TxHash>;

    /// Whether a set-status proposal for the batch is already on-chain.
    async fn was_proposed_set_status(&self, batch: &TransferBatch) -> Result<bool>;

    /// Submits the set-status proposal carrying the batch's status vector.
    async fn propose_set_status(&self, batch: &TransferBatch) -> Result<TxHash>;

    /// Action ID the contract assigned to the transfer proposal.
    async fn get_action_id_for_propose_transfer(
        &self,
        batch: &TransferBatch,
    ) -> Result<ActionId>;

    /// Action ID the contract assigned to the set-status proposal.
    async fn get_action_id_for_set_status(
        &self,
        batch: &TransferBatch,
    ) -> Result<ActionId>;

    /// Whether the action already went through on-chain.
    async fn was_action_executed(&self, action: ActionId) -> Result<bool>;

    /// Whether the batch was already executed on this chain.
    async fn was_batch_executed(&self, batch_id: u64) -> Result<bool>;

    /// Submits this relayer's on-chain signature for the action.
    async fn sign_action(&self, action: ActionId) -> Result<TxHash>;

    /// Number of distinct relayers that signed the action so far.
    async fn signers_count(&self, action: ActionId) -> Result<u64>;

    /// Whether the signer count for the action reached the contract quorum.
    async fn quorum_reached(&self, action: ActionId) -> Result<bool>;

    /// The quorum parameter currently configured on the contract.
    async fn get_quorum_size(&self) -> Result<u64>;

    /// Executes the pending multisig action.
    async fn perform_action(
        &self,
        action: ActionId,
        batch: &TransferBatch,
    ) -> Result<TxHash>;

    /// Executes the transfer by submitting the quorum of collected
    /// signatures over the message hash.
    async fn execute_transfer(
        &self,
        hash: &MessageHash,
        batch: &TransferBatch,
        quorum: u64,
    ) -> Result<TxHash>;

    /// Retry budget granted per batch while waiting on this chain.
    fn max_retries_on_quorum_reached(&self) -> u64;

    /// Per-deposit status bytes recorded for the executed batch.
    async fn get_transactions_statuses(&self, batch_id: u64) -> Result<Vec<u8>>;

    /// The contract-defined hash over `(action id, batch id, deposits)`
    /// that relayers sign off-chain.
    fn generate_message_hash(&self, batch: &TransferBatch) -> Result<MessageHash>;

    /// Hands this relayer's signature over the message hash to the
    /// signature-broadcast layer.
    fn broadcast_signature_for_message_hash(&self, hash: MessageHash);

    /// Whether the gossiped signatures for the message hash cover the
    /// quorum.
    async fn is_quorum_reached_for_message_hash(
        &self,
        hash: &MessageHash,
    ) -> Result<bool>;
}
