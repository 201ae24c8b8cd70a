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

//! Shared harness for the end-to-end scenario tests: an in-memory
//! messenger mesh and a pair of mock bridge contracts.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use num_bigint::BigUint;

use janus_relayer::batch::{Deposit, TransferBatch, STATUS_EXECUTED};
use janus_relayer::chain::{ActionId, ChainClient, MessageHash, TxHash};
use janus_relayer::error::{Error, Result};
use janus_relayer::keys::MessageSigner;
use janus_relayer::p2p::{
    Broadcaster, MessageProcessor, NetMessenger, PeerId, SignaturePayload,
};
use janus_relayer::roles::RoleProvider;

/// Builds the canonical two-deposit batch of the scenarios.
pub fn pending_batch(id: u64, nonces: &[u64]) -> TransferBatch {
    TransferBatch {
        id,
        block_nonce: 2_000_000,
        deposits: nonces
            .iter()
            .map(|nonce| Deposit {
                nonce: *nonce,
                from: b"from".to_vec(),
                to: b"to".to_vec(),
                token: b"token".to_vec(),
                amount: BigUint::from(1000u32 + *nonce as u32),
                sc_call: None,
            })
            .collect(),
        statuses: vec![],
    }
}

/// Deterministic test signer.
pub fn test_signer(seed: u8) -> Arc<MessageSigner> {
    let mut secret = [seed; 32];
    secret[0] = 0x01;
    Arc::new(MessageSigner::from_bytes(&secret).expect("valid key"))
}

// ---------------------------------------------------------------------------
// in-memory messenger mesh
// ---------------------------------------------------------------------------

type Subscribers = HashMap<String, Vec<(PeerId, Arc<dyn MessageProcessor>)>>;

/// A fully connected in-memory network of messengers.
#[derive(Default)]
pub struct TestNetwork {
    subscribers: Mutex<Subscribers>,
}

impl TestNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates a messenger attached to this network.
    pub fn messenger(self: &Arc<Self>, id: impl Into<PeerId>) -> Arc<TestMessenger> {
        Arc::new(TestMessenger {
            network: self.clone(),
            id: id.into(),
        })
    }

    fn deliver(&self, topic: &str, data: &[u8], from: &PeerId, only_to: Option<&PeerId>) {
        // snapshot under the lock, dispatch outside it: handlers may send
        // replies through the network
        let targets: Vec<(PeerId, Arc<dyn MessageProcessor>)> = {
            let guard = self.subscribers.lock().unwrap();
            guard.get(topic).cloned().unwrap_or_default()
        };
        for (peer, processor) in targets {
            if peer == *from {
                continue;
            }
            if let Some(only) = only_to {
                if peer != *only {
                    continue;
                }
            }
            processor.process_received_message(topic, data, from);
        }
    }
}

/// One node's view of the [`TestNetwork`].
pub struct TestMessenger {
    network: Arc<TestNetwork>,
    id: PeerId,
}

impl NetMessenger for TestMessenger {
    fn bootstrap(&self) -> Result<()> {
        Ok(())
    }

    fn create_topic(&self, _name: &str, _register: bool) -> Result<()> {
        Ok(())
    }

    fn register_message_processor(
        &self,
        topic: &str,
        _identifier: &str,
        processor: Arc<dyn MessageProcessor>,
    ) -> Result<()> {
        let mut guard = self.network.subscribers.lock().unwrap();
        guard
            .entry(topic.to_owned())
            .or_default()
            .push((self.id.clone(), processor));
        Ok(())
    }

    fn broadcast(&self, topic: &str, data: Vec<u8>) {
        self.network.deliver(topic, &data, &self.id, None);
    }

    fn send_to_connected_peer(
        &self,
        topic: &str,
        data: Vec<u8>,
        peer: &PeerId,
    ) -> Result<()> {
        self.network.deliver(topic, &data, &self.id, Some(peer));
        Ok(())
    }

    fn id(&self) -> PeerId {
        self.id.clone()
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Static whitelist for the scenarios.
pub struct StaticWhitelist(pub Vec<Vec<u8>>);

impl RoleProvider for StaticWhitelist {
    fn is_whitelisted(&self, public_key: &[u8]) -> bool {
        self.0.iter().any(|pk| pk == public_key)
    }
}

// ---------------------------------------------------------------------------
// mock bridge contracts
// ---------------------------------------------------------------------------

/// Shared on-chain state of one mock bridge contract. All relayers of a
/// scenario talk to the same instance through their own clients.
pub struct MockChain {
    pub name: &'static str,
    pub quorum: u64,
    pub max_retries: u64,
    pub state: Mutex<MockChainState>,
}

#[derive(Default)]
pub struct MockChainState {
    pub pending: Option<TransferBatch>,
    pub last_executed_batch_id: u64,
    pub last_executed_deposit_nonce: u64,
    pub proposed_transfer: Option<u64>,
    pub proposed_set_status: Option<(u64, Vec<u8>)>,
    pub on_chain_signers: HashMap<ActionId, HashSet<Vec<u8>>>,
    pub executed_actions: HashSet<ActionId>,
    pub executed_batches: HashSet<u64>,
    pub recorded_statuses: HashMap<u64, Vec<u8>>,
    pub propose_transfer_error: Option<&'static str>,
    pub invalid_setup: bool,
    pub propose_transfer_count: u64,
    pub execute_transfer_count: u64,
    pub perform_action_count: u64,
}

impl MockChain {
    pub fn new(name: &'static str, quorum: u64, max_retries: u64) -> Arc<Self> {
        Arc::new(Self {
            name,
            quorum,
            max_retries,
            state: Mutex::new(MockChainState::default()),
        })
    }

    pub fn set_pending(&self, batch: TransferBatch) {
        self.state.lock().unwrap().pending = Some(batch);
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut MockChainState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }
}

fn transfer_action_id(batch_id: u64) -> ActionId {
    batch_id + 600_000
}

fn set_status_action_id(batch_id: u64) -> ActionId {
    batch_id + 300_000
}

/// One relayer's client for a [`MockChain`]. Carries the relayer identity
/// for on-chain signatures and the relayer's broadcaster for the gossip
/// flavor of the interface.
pub struct MockChainClient {
    chain: Arc<MockChain>,
    relayer: Vec<u8>,
    broadcaster: Arc<Broadcaster>,
}

impl MockChainClient {
    pub fn new(
        chain: Arc<MockChain>,
        relayer: Vec<u8>,
        broadcaster: Arc<Broadcaster>,
    ) -> Arc<Self> {
        Arc::new(Self {
            chain,
            relayer,
            broadcaster,
        })
    }
}

#[async_trait::async_trait]
impl ChainClient for MockChainClient {
    fn name(&self) -> &str {
        self.chain.name
    }

    async fn get_pending_batch(&self) -> Result<Option<TransferBatch>> {
        Ok(self.chain.state.lock().unwrap().pending.clone())
    }

    async fn get_batch(&self, batch_id: u64) -> Result<Option<TransferBatch>> {
        let state = self.chain.state.lock().unwrap();
        Ok(state.pending.clone().filter(|b| b.id == batch_id))
    }

    async fn get_last_executed_batch_id(&self) -> Result<u64> {
        Ok(self.chain.state.lock().unwrap().last_executed_batch_id)
    }

    async fn get_last_executed_deposit_nonce(&self) -> Result<u64> {
        Ok(self.chain.state.lock().unwrap().last_executed_deposit_nonce)
    }

    async fn was_proposed_transfer(&self, batch: &TransferBatch) -> Result<bool> {
        let state = self.chain.state.lock().unwrap();
        Ok(state.proposed_transfer == Some(batch.id))
    }

    async fn propose_transfer(&self, batch: &TransferBatch) -> Result<TxHash> {
        let mut state = self.chain.state.lock().unwrap();
        if state.invalid_setup {
            return Err(Error::InvalidSetup(
                "token declared native on both chains".into(),
            ));
        }
        if let Some(message) = state.propose_transfer_error {
            return Err(Error::chain(self.chain.name, message));
        }
        state.propose_transfer_count += 1;
        state.proposed_transfer = Some(batch.id);
        Ok(format!("0xproposed-{}", batch.id))
    }

    async fn was_proposed_set_status(&self, batch: &TransferBatch) -> Result<bool> {
        let state = self.chain.state.lock().unwrap();
        Ok(state
            .proposed_set_status
            .as_ref()
            .map(|(id, _)| *id == batch.id)
            .unwrap_or(false))
    }

    async fn propose_set_status(&self, batch: &TransferBatch) -> Result<TxHash> {
        let mut state = self.chain.state.lock().unwrap();
        state.proposed_set_status = Some((batch.id, batch.statuses.clone()));
        Ok(format!("0xproposed-status-{}", batch.id))
    }

    async fn get_action_id_for_propose_transfer(
        &self,
        batch: &TransferBatch,
    ) -> Result<ActionId> {
        Ok(transfer_action_id(batch.id))
    }

    async fn get_action_id_for_set_status(
        &self,
        batch: &TransferBatch,
    ) -> Result<ActionId> {
        Ok(set_status_action_id(batch.id))
    }

    async fn was_action_executed(&self, action: ActionId) -> Result<bool> {
        Ok(self
            .chain
            .state
            .lock()
            .unwrap()
            .executed_actions
            .contains(&action))
    }

    async fn was_batch_executed(&self, batch_id: u64) -> Result<bool> {
        Ok(self
            .chain
            .state
            .lock()
            .unwrap()
            .executed_batches
            .contains(&batch_id))
    }

    async fn sign_action(&self, action: ActionId) -> Result<TxHash> {
        let mut state = self.chain.state.lock().unwrap();
        state
            .on_chain_signers
            .entry(action)
            .or_default()
            .insert(self.relayer.clone());
        Ok(format!("0xsigned-{action}"))
    }

    async fn signers_count(&self, action: ActionId) -> Result<u64> {
        let state = self.chain.state.lock().unwrap();
        Ok(state
            .on_chain_signers
            .get(&action)
            .map(|signers| signers.len() as u64)
            .unwrap_or(0))
    }

    async fn quorum_reached(&self, action: ActionId) -> Result<bool> {
        Ok(self.signers_count(action).await? >= self.chain.quorum)
    }

    async fn get_quorum_size(&self) -> Result<u64> {
        Ok(self.chain.quorum)
    }

    async fn perform_action(
        &self,
        action: ActionId,
        batch: &TransferBatch,
    ) -> Result<TxHash> {
        let mut state = self.chain.state.lock().unwrap();
        state.perform_action_count += 1;
        state.executed_actions.insert(action);
        if action == set_status_action_id(batch.id) {
            state
                .recorded_statuses
                .insert(batch.id, batch.statuses.clone());
            // the batch is terminal on this chain once its statuses land
            state.pending = None;
        }
        Ok(format!("0xperformed-{action}"))
    }

    async fn execute_transfer(
        &self,
        _hash: &MessageHash,
        batch: &TransferBatch,
        quorum: u64,
    ) -> Result<TxHash> {
        // the contract consumes the per-deposit argument lists
        let args = janus_relayer::batch::extract_call_args(batch);
        assert_eq!(args.nonces.len(), batch.deposits.len());

        let mut state = self.chain.state.lock().unwrap();
        assert!(quorum >= self.chain.quorum, "executed with a short quorum");
        state.execute_transfer_count += 1;
        state.executed_batches.insert(batch.id);
        state.executed_actions.insert(transfer_action_id(batch.id));
        state.last_executed_batch_id = batch.id;
        if let Some(last) = batch.deposits.last() {
            state.last_executed_deposit_nonce = last.nonce;
        }
        state
            .recorded_statuses
            .insert(batch.id, vec![STATUS_EXECUTED; batch.deposits.len()]);
        Ok(format!("0xexecuted-{}", batch.id))
    }

    fn max_retries_on_quorum_reached(&self) -> u64 {
        self.chain.max_retries
    }

    async fn get_transactions_statuses(&self, batch_id: u64) -> Result<Vec<u8>> {
        let state = self.chain.state.lock().unwrap();
        state
            .recorded_statuses
            .get(&batch_id)
            .cloned()
            .ok_or_else(|| Error::chain(self.chain.name, "statuses not recorded"))
    }

    fn generate_message_hash(&self, batch: &TransferBatch) -> Result<MessageHash> {
        // same hash for every relayer: derived from the chain and batch only
        let mut hash = [0u8; 32];
        hash[..8].copy_from_slice(&batch.id.to_be_bytes());
        hash[8..8 + self.chain.name.len().min(24)].copy_from_slice(
            &self.chain.name.as_bytes()[..self.chain.name.len().min(24)],
        );
        Ok(hash)
    }

    fn broadcast_signature_for_message_hash(&self, hash: MessageHash) {
        let mut signature = b"chain-sig-".to_vec();
        signature.extend_from_slice(&self.relayer);
        self.broadcaster.broadcast_signature(SignaturePayload {
            message_hash: hash,
            signature,
        });
    }

    async fn is_quorum_reached_for_message_hash(
        &self,
        hash: &MessageHash,
    ) -> Result<bool> {
        Ok(self.broadcaster.signatures(hash).len() as u64 >= self.chain.quorum)
    }
}
