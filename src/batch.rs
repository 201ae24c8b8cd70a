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

//! # Transfer Batch Module
//!
//! The data model moved across the bridge: deposits, transfer batches and
//! the per-deposit status vector filled in after execution.

use std::fmt::{self, Display};

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Status byte recorded on the source chain for an executed deposit.
///
/// Consumed by the source-chain contract; the value must be preserved
/// exactly.
pub const STATUS_EXECUTED: u8 = 0x03;
/// Status byte recorded on the source chain for a rejected deposit.
pub const STATUS_REJECTED: u8 = 0x04;

/// Smart-contract call payload attached to a deposit whose recipient is a
/// contract on the destination chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScCallData {
    /// Method to invoke on the recipient contract.
    pub method: String,
    /// Gas limit provided for the call.
    pub gas_limit: u64,
    /// Raw argument list, already encoded for the destination VM.
    pub arguments: Vec<Vec<u8>>,
}

/// One cross-chain transfer inside a [`TransferBatch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    /// Monotonically increasing per-batch nonce.
    pub nonce: u64,
    /// Sender address on the chain of origin.
    pub from: Vec<u8>,
    /// Recipient address bytes on the receiving chain.
    pub to: Vec<u8>,
    /// Converted token identifier on the receiving chain.
    pub token: Vec<u8>,
    /// Transferred amount.
    pub amount: BigUint,
    /// Optional SC-call payload, set when the recipient is a contract.
    pub sc_call: Option<ScCallData>,
}

impl Display for Deposit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "deposit nonce {} to 0x{} for {} of token 0x{}",
            self.nonce,
            hex::encode(&self.to),
            self.amount,
            hex::encode(&self.token),
        )
    }
}

/// An ordered, contiguous run of deposits fetched from one chain, to be
/// applied atomically on the other.
///
/// The batch is immutable once fetched; only the status vector (one byte per
/// deposit) may be filled in later.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferBatch {
    /// Batch identifier assigned by the chain of origin.
    pub id: u64,
    /// Block nonce the batch originates from.
    pub block_nonce: u64,
    /// The deposits, with strictly increasing nonces.
    pub deposits: Vec<Deposit>,
    /// Per-deposit status bytes; empty until the batch is resolved.
    pub statuses: Vec<u8>,
}

impl TransferBatch {
    /// An empty batch is treated identically to "no pending batch".
    pub fn is_empty(&self) -> bool {
        self.deposits.is_empty()
    }

    /// Applies the statuses fetched from the receiving chain.
    ///
    /// A status vector shorter than the batch means the tail deposits never
    /// executed; the missing entries are marked rejected. Extra entries are
    /// dropped.
    pub fn apply_statuses(&mut self, statuses: Vec<u8>) {
        self.statuses = statuses;
        self.statuses.resize(self.deposits.len(), STATUS_REJECTED);
    }

    /// Marks every deposit of the batch as rejected.
    pub fn mark_all_rejected(&mut self) {
        self.statuses = vec![STATUS_REJECTED; self.deposits.len()];
    }

    /// True once a status byte exists for every deposit.
    pub fn is_resolved(&self) -> bool {
        !self.deposits.is_empty() && self.statuses.len() == self.deposits.len()
    }
}

impl Display for TransferBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch {} ({} deposits)", self.id, self.deposits.len())
    }
}

/// The per-deposit on-chain call arguments of a batch, split into parallel
/// lists the way the bridge contracts consume them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchCallArgs {
    /// Recipient address bytes, one per deposit.
    pub recipients: Vec<Vec<u8>>,
    /// Converted token identifiers, one per deposit.
    pub tokens: Vec<Vec<u8>>,
    /// Amounts as big-endian unsigned bytes, one per deposit.
    pub amounts: Vec<Vec<u8>>,
    /// Deposit nonces, one per deposit.
    pub nonces: Vec<u64>,
}

/// Extracts the contract-call argument lists from a batch, preserving the
/// order mandated by the bridge contracts: recipient, token, amount
/// (big-endian), nonce.
pub fn extract_call_args(batch: &TransferBatch) -> BatchCallArgs {
    let mut args = BatchCallArgs::default();
    for deposit in &batch.deposits {
        args.recipients.push(deposit.to.clone());
        args.tokens.push(deposit.token.clone());
        args.amounts.push(deposit.amount.to_bytes_be());
        args.nonces.push(deposit.nonce);
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deposit(nonce: u64, amount: u64) -> Deposit {
        Deposit {
            nonce,
            from: vec![1, 2, 3],
            to: vec![4, 5, 6],
            token: vec![7, 8],
            amount: BigUint::from(amount),
            sc_call: None,
        }
    }

    fn batch_with_nonces(nonces: &[u64]) -> TransferBatch {
        TransferBatch {
            id: 12345,
            block_nonce: 2_000_000,
            deposits: nonces.iter().map(|n| deposit(*n, 1000 + n)).collect(),
            statuses: vec![],
        }
    }

    #[test]
    fn empty_batch_is_empty() {
        assert!(TransferBatch::default().is_empty());
        assert!(!batch_with_nonces(&[2]).is_empty());
    }

    #[test]
    fn apply_statuses_pads_missing_entries_with_rejected() {
        let mut batch = batch_with_nonces(&[2, 3, 4]);
        batch.apply_statuses(vec![STATUS_EXECUTED]);
        assert_eq!(
            batch.statuses,
            vec![STATUS_EXECUTED, STATUS_REJECTED, STATUS_REJECTED]
        );
        assert!(batch.is_resolved());
    }

    #[test]
    fn apply_statuses_drops_extra_entries() {
        let mut batch = batch_with_nonces(&[2]);
        batch.apply_statuses(vec![STATUS_EXECUTED, STATUS_EXECUTED]);
        assert_eq!(batch.statuses, vec![STATUS_EXECUTED]);
    }

    #[test]
    fn mark_all_rejected_fills_the_whole_vector() {
        let mut batch = batch_with_nonces(&[5, 6]);
        batch.mark_all_rejected();
        assert_eq!(batch.statuses, vec![STATUS_REJECTED, STATUS_REJECTED]);
    }

    #[test]
    fn deposit_with_sc_call_roundtrips_through_serde() {
        let mut deposit = deposit(2, 1000);
        deposit.sc_call = Some(ScCallData {
            method: "mintOnBehalf".into(),
            gas_limit: 5_000_000,
            arguments: vec![vec![0x01], vec![0x02, 0x03]],
        });
        let encoded = serde_json::to_vec(&deposit).unwrap();
        let decoded: Deposit = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded, deposit);
    }

    #[test]
    fn extract_call_args_preserves_order_and_encoding() {
        let batch = batch_with_nonces(&[2, 3]);
        let args = extract_call_args(&batch);

        assert_eq!(args.recipients, vec![vec![4, 5, 6], vec![4, 5, 6]]);
        assert_eq!(args.tokens, vec![vec![7, 8], vec![7, 8]]);
        assert_eq!(args.nonces, vec![2, 3]);
        assert_eq!(args.amounts[0], BigUint::from(1002u32).to_bytes_be());
        assert_eq!(args.amounts[1], BigUint::from(1003u32).to_bytes_be());
    }
}
