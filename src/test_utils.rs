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

//! Shared stubs for unit tests.

use std::collections::HashSet;

use num_bigint::BigUint;

use crate::batch::{Deposit, TransferBatch};
use crate::chain::ActionId;
use crate::error::{Error, Result};
use crate::executor::BridgeOperations;

/// Builds the two-deposit batch used throughout the step tests.
pub fn test_batch() -> TransferBatch {
    TransferBatch {
        id: 12345,
        block_nonce: 2_000_000,
        deposits: vec![
            Deposit {
                nonce: 2,
                from: b"from1".to_vec(),
                to: b"to1".to_vec(),
                token: b"token1".to_vec(),
                amount: BigUint::from(1000u32),
                sc_call: None,
            },
            Deposit {
                nonce: 3,
                from: b"from2".to_vec(),
                to: b"to2".to_vec(),
                token: b"token2".to_vec(),
                amount: BigUint::from(1001u32),
                sc_call: None,
            },
        ],
        statuses: vec![],
    }
}

/// A scripted [`BridgeOperations`] implementation for step-transition
/// tests. Flags select the answers, `fail_op` injects errors, and every
/// state-changing call is recorded.
pub struct BridgeStub {
    pub leader: bool,
    pub pending: Option<TransferBatch>,
    pub stored: Option<TransferBatch>,
    pub nonce_gap: bool,
    pub transfer_proposed: bool,
    pub set_status_proposed: bool,
    pub transfer_signed: bool,
    pub set_status_signed: bool,
    pub transfer_quorum: bool,
    pub set_status_quorum: bool,
    pub transfer_performed: bool,
    pub set_status_performed: bool,
    pub signatures_not_ready: bool,
    pub statuses: Vec<u8>,
    pub rejected: bool,
    pub source_retries_exhausted: bool,
    pub destination_retries_exhausted: bool,
    pub calls: Vec<&'static str>,
    fails: HashSet<&'static str>,
}

impl BridgeStub {
    pub fn new() -> Self {
        Self {
            leader: true,
            pending: None,
            stored: None,
            nonce_gap: false,
            transfer_proposed: false,
            set_status_proposed: false,
            transfer_signed: false,
            set_status_signed: false,
            transfer_quorum: false,
            set_status_quorum: false,
            transfer_performed: false,
            set_status_performed: false,
            signatures_not_ready: false,
            statuses: vec![],
            rejected: false,
            source_retries_exhausted: false,
            destination_retries_exhausted: false,
            calls: Vec::new(),
            fails: HashSet::new(),
        }
    }

    pub fn with_pending_batch() -> Self {
        let mut stub = Self::new();
        stub.pending = Some(test_batch());
        stub
    }

    pub fn with_stored_batch() -> Self {
        let mut stub = Self::new();
        stub.stored = Some(test_batch());
        stub
    }

    /// Makes the named operation return an error.
    pub fn fail_op(&mut self, op: &'static str) {
        self.fails.insert(op);
    }

    fn check(&self, op: &'static str) -> Result<()> {
        if self.fails.contains(op) {
            return Err(Error::chain("stub", op));
        }
        Ok(())
    }
}

impl Default for BridgeStub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl BridgeOperations for BridgeStub {
    fn name(&self) -> &str {
        "stub"
    }

    fn my_turn_as_leader(&self) -> bool {
        self.leader
    }

    async fn get_pending_batch(&self) -> Result<Option<TransferBatch>> {
        self.check("get_pending_batch")?;
        Ok(self.pending.clone().filter(|b| !b.is_empty()))
    }

    fn store_batch(&mut self, batch: TransferBatch) -> Result<()> {
        self.calls.push("store_batch");
        if batch.is_empty() {
            return Err(Error::NilBatch);
        }
        self.stored = Some(batch);
        Ok(())
    }

    fn stored_batch(&self) -> Option<&TransferBatch> {
        self.stored.as_ref()
    }

    fn clear_stored_batch(&mut self) {
        self.calls.push("clear_stored_batch");
        self.stored = None;
    }

    async fn verify_deposit_nonces(&self) -> Result<()> {
        self.check("verify_deposit_nonces")?;
        if self.nonce_gap {
            return Err(Error::InvalidDepositNonce {
                deposit: "stub deposit".into(),
                expected: 2,
            });
        }
        Ok(())
    }

    async fn get_and_store_action_id_for_transfer(&mut self) -> Result<ActionId> {
        self.calls.push("get_and_store_action_id_for_transfer");
        self.check("get_and_store_action_id_for_transfer")?;
        Ok(663_725)
    }

    async fn get_and_store_action_id_for_set_status(
        &mut self,
    ) -> Result<ActionId> {
        self.calls.push("get_and_store_action_id_for_set_status");
        self.check("get_and_store_action_id_for_set_status")?;
        Ok(343_553)
    }

    fn stored_action_id(&self) -> ActionId {
        663_725
    }

    async fn was_transfer_proposed(&self) -> Result<bool> {
        self.check("was_transfer_proposed")?;
        Ok(self.transfer_proposed)
    }

    async fn propose_transfer(&mut self) -> Result<()> {
        self.calls.push("propose_transfer");
        self.check("propose_transfer")?;
        self.transfer_proposed = true;
        Ok(())
    }

    async fn was_set_status_proposed(&self) -> Result<bool> {
        self.check("was_set_status_proposed")?;
        Ok(self.set_status_proposed)
    }

    async fn propose_set_status(&mut self) -> Result<()> {
        self.calls.push("propose_set_status");
        self.check("propose_set_status")?;
        self.set_status_proposed = true;
        Ok(())
    }

    async fn was_transfer_action_signed(&self) -> Result<bool> {
        self.check("was_transfer_action_signed")?;
        Ok(self.transfer_signed)
    }

    async fn sign_transfer_action(&mut self) -> Result<()> {
        self.calls.push("sign_transfer_action");
        self.check("sign_transfer_action")?;
        self.transfer_signed = true;
        Ok(())
    }

    async fn was_set_status_action_signed(&self) -> Result<bool> {
        self.check("was_set_status_action_signed")?;
        Ok(self.set_status_signed)
    }

    async fn sign_set_status_action(&mut self) -> Result<()> {
        self.calls.push("sign_set_status_action");
        self.check("sign_set_status_action")?;
        self.set_status_signed = true;
        Ok(())
    }

    async fn process_quorum_reached_on_transfer(&mut self) -> Result<bool> {
        self.calls.push("process_quorum_reached_on_transfer");
        self.check("process_quorum_reached_on_transfer")?;
        Ok(self.transfer_quorum)
    }

    async fn process_quorum_reached_on_set_status(&mut self) -> Result<bool> {
        self.calls.push("process_quorum_reached_on_set_status");
        self.check("process_quorum_reached_on_set_status")?;
        Ok(self.set_status_quorum)
    }

    async fn was_transfer_performed(&self) -> Result<bool> {
        self.check("was_transfer_performed")?;
        Ok(self.transfer_performed)
    }

    async fn perform_transfer(&mut self) -> Result<()> {
        self.calls.push("perform_transfer");
        if self.signatures_not_ready {
            return Err(Error::SignaturesNotReady);
        }
        self.check("perform_transfer")?;
        self.transfer_performed = true;
        Ok(())
    }

    async fn was_set_status_performed(&self) -> Result<bool> {
        self.check("was_set_status_performed")?;
        Ok(self.set_status_performed)
    }

    async fn perform_set_status(&mut self) -> Result<()> {
        self.calls.push("perform_set_status");
        self.check("perform_set_status")?;
        self.set_status_performed = true;
        Ok(())
    }

    async fn wait_for_transfer_confirmation(&self) {}

    async fn fetch_batch_statuses(&mut self) -> Result<Vec<u8>> {
        self.calls.push("fetch_batch_statuses");
        self.check("fetch_batch_statuses")?;
        Ok(self.statuses.clone())
    }

    fn resolve_statuses(&mut self, statuses: Vec<u8>) {
        if let Some(batch) = self.stored.as_mut() {
            batch.apply_statuses(statuses);
        }
    }

    fn mark_batch_rejected(&mut self) {
        self.rejected = true;
        if let Some(batch) = self.stored.as_mut() {
            batch.mark_all_rejected();
        }
    }

    fn batch_is_resolved(&self) -> bool {
        self.stored
            .as_ref()
            .map(TransferBatch::is_resolved)
            .unwrap_or(false)
    }

    fn process_max_retries_on_source(&mut self) -> bool {
        self.calls.push("process_max_retries_on_source");
        self.source_retries_exhausted
    }

    fn reset_retries_on_source(&mut self) {
        self.calls.push("reset_retries_on_source");
    }

    fn process_max_retries_on_destination(&mut self) -> bool {
        self.calls.push("process_max_retries_on_destination");
        self.destination_retries_exhausted
    }

    fn reset_retries_on_destination(&mut self) {
        self.calls.push("reset_retries_on_destination");
    }
}
