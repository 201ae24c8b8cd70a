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

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use crate::chain::MessageHash;
use crate::error::{Error, Result};
use crate::keys::MessageSigner;
use crate::polling::PollingExecutor;
use crate::roles::RoleProvider;
use crate::topology::PublicKeysProvider;

use super::messages::{
    SignaturePayload, SignedMessage, JOIN_MESSAGE, JOIN_TOPIC, SIGN_TOPIC,
};
use super::signatures::SignatureHolder;

/// Identifier of a connected peer, assigned by the messenger transport.
pub type PeerId = String;

const TOPIC_IDENTIFIER: &str = "default";

/// Receives raw messages from the messenger for one registered topic.
pub trait MessageProcessor: Send + Sync {
    /// Called by the network messenger whenever a new message is received.
    fn process_received_message(&self, topic: &str, data: &[u8], from: &PeerId);
}

/// The long-lived peer-to-peer messenger the broadcaster owns. Implemented
/// outside the core (e.g. over a gossipsub swarm).
pub trait NetMessenger: Send + Sync {
    /// Joins the network.
    fn bootstrap(&self) -> Result<()>;
    /// Creates (or joins) a broadcast topic.
    fn create_topic(&self, name: &str, register: bool) -> Result<()>;
    /// Registers the handler receiving messages for a topic.
    fn register_message_processor(
        &self,
        topic: &str,
        identifier: &str,
        processor: Arc<dyn MessageProcessor>,
    ) -> Result<()>;
    /// Broadcasts to every peer on the topic.
    fn broadcast(&self, topic: &str, data: Vec<u8>);
    /// Sends to a single connected peer.
    fn send_to_connected_peer(
        &self,
        topic: &str,
        data: Vec<u8>,
        peer: &PeerId,
    ) -> Result<()>;
    /// This node's peer identifier.
    fn id(&self) -> PeerId;
    /// Tears the messenger down.
    fn close(&self) -> Result<()>;
}

/// Clears the per-batch signature set; handed to the executor so a new
/// batch starts from a clean slate.
pub trait SignatureStore: Send + Sync {
    /// Empties the store.
    fn clear_signatures(&self);
}

/// Passes messages and signatures between whitelisted relayers.
///
/// Outgoing messages are wrapped with this relayer's public key, a
/// monotonically increasing nonce and a signature over `payload || nonce`.
/// Incoming messages are dropped unless the sender is whitelisted, the
/// signature verifies and the nonce is strictly greater than the last one
/// accepted from that sender on that topic.
pub struct Broadcaster {
    messenger: Arc<dyn NetMessenger>,
    role_provider: Arc<dyn RoleProvider>,
    holder: SignatureHolder,
    signer: Arc<MessageSigner>,
    counter: AtomicU64,
    // (sender public key, topic) -> last accepted nonce
    last_nonces: Mutex<HashMap<(Vec<u8>, String), u64>>,
}

impl Broadcaster {
    /// Creates a new broadcaster able to pass messages and signatures.
    ///
    /// The outgoing message counter is seeded from the wall clock so a
    /// restarted relayer keeps its nonces monotonic.
    pub fn new(
        messenger: Arc<dyn NetMessenger>,
        role_provider: Arc<dyn RoleProvider>,
        signer: Arc<MessageSigner>,
    ) -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Self {
            messenger,
            role_provider,
            holder: SignatureHolder::new(),
            signer,
            counter: AtomicU64::new(seed),
            last_nonces: Mutex::new(HashMap::new()),
        }
    }

    /// Registers the messenger on all required topics.
    pub fn register_on_topics(self: &Arc<Self>) -> Result<()> {
        for topic in [JOIN_TOPIC, SIGN_TOPIC] {
            self.messenger.create_topic(topic, true)?;
            self.messenger.register_message_processor(
                topic,
                TOPIC_IDENTIFIER,
                self.clone() as Arc<dyn MessageProcessor>,
            )?;
            tracing::info!(topic, "registered");
        }
        Ok(())
    }

    /// This relayer's identity bytes.
    pub fn own_public_key(&self) -> &[u8] {
        self.signer.public_key()
    }

    fn create_message(&self, payload: Vec<u8>) -> SignedMessage {
        let nonce = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let signature = self
            .signer
            .sign(&SignedMessage::signable_bytes(&payload, nonce));
        SignedMessage {
            public_key: self.signer.public_key().to_vec(),
            payload,
            nonce,
            signature,
        }
    }

    /// Announces this relayer on the join topic and records itself in the
    /// active peer set.
    pub fn broadcast_join(&self) {
        self.holder
            .add_joined_peer(self.signer.public_key().to_vec());
        let message = self.create_message(JOIN_MESSAGE.to_vec());
        match message.to_bytes() {
            Ok(bytes) => self.messenger.broadcast(JOIN_TOPIC, bytes),
            Err(error) => tracing::error!(%error, "error sending join message"),
        }
    }

    /// Wraps a chain-level signature and gossips it on the sign topic.
    ///
    /// The wrapped message is also delivered to the local holder, so this
    /// relayer's own signature is present without a network round-trip.
    pub fn broadcast_signature(&self, payload: SignaturePayload) {
        let bytes = match payload.to_bytes() {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::error!(%error, "error encoding signature payload");
                return;
            }
        };
        let message = self.create_message(bytes);
        self.holder.add_signed_message(message.clone(), &payload);
        match message.to_bytes() {
            Ok(bytes) => self.messenger.broadcast(SIGN_TOPIC, bytes),
            Err(error) => tracing::error!(%error, "error sending signature"),
        }
    }

    /// The chain-level signatures collected for a message hash.
    pub fn signatures(&self, message_hash: &MessageHash) -> Vec<Vec<u8>> {
        self.holder.signatures(message_hash)
    }

    /// Closes the underlying messenger.
    pub fn close(&self) -> Result<()> {
        self.messenger.close()
    }

    /// Validates an inbound message. On any failure the signature set and
    /// the nonce trackers are left untouched.
    fn validate_message(&self, topic: &str, data: &[u8]) -> Result<SignedMessage> {
        let message = SignedMessage::from_bytes(data)?;

        if !self.role_provider.is_whitelisted(&message.public_key) {
            return Err(Error::PeerNotWhitelisted {
                public_key: hex::encode(&message.public_key),
            });
        }

        MessageSigner::verify(
            &message.public_key,
            &SignedMessage::signable_bytes(&message.payload, message.nonce),
            &message.signature,
        )?;

        // The nonce tracker is only advanced once every other check passed.
        let mut nonces = self.last_nonces.lock();
        let key = (message.public_key.clone(), topic.to_owned());
        if let Some(last) = nonces.get(&key) {
            if message.nonce <= *last {
                return Err(Error::StaleMessageNonce {
                    received: message.nonce,
                    last: *last,
                });
            }
        }
        nonces.insert(key, message.nonce);

        Ok(message)
    }

    fn handle_join(&self, message: SignedMessage, from: &PeerId) {
        tracing::debug!(
            peer = %hex::encode(&message.public_key),
            "relayer joined",
        );
        self.holder.add_joined_peer(message.public_key);

        // Bootstrap the joiner with everything gossiped so far.
        for stored in self.holder.stored_messages() {
            let bytes = match stored.to_bytes() {
                Ok(bytes) => bytes,
                Err(error) => {
                    tracing::error!(%error, "error encoding stored signature");
                    continue;
                }
            };
            if let Err(error) =
                self.messenger.send_to_connected_peer(SIGN_TOPIC, bytes, from)
            {
                tracing::debug!(
                    %error,
                    peer = %from,
                    "error sending current stored signatures",
                );
            }
        }
    }

    fn handle_sign(&self, message: SignedMessage) {
        let payload = match SignaturePayload::from_bytes(&message.payload) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(%error, "malformed signature payload");
                return;
            }
        };
        self.holder.add_signed_message(message, &payload);
    }
}

impl MessageProcessor for Broadcaster {
    fn process_received_message(&self, topic: &str, data: &[u8], from: &PeerId) {
        let message = match self.validate_message(topic, data) {
            Ok(message) => message,
            Err(error) => {
                tracing::debug!(%error, topic, peer = %from, "dropped message");
                return;
            }
        };

        tracing::trace!(
            topic,
            nonce = message.nonce,
            sender = %hex::encode(&message.public_key),
            "got message",
        );

        match topic {
            JOIN_TOPIC => self.handle_join(message, from),
            SIGN_TOPIC => self.handle_sign(message),
            other => tracing::warn!(topic = other, "message on unknown topic"),
        }
    }
}

impl PublicKeysProvider for Broadcaster {
    fn sorted_public_keys(&self) -> Vec<Vec<u8>> {
        self.holder.sorted_public_keys()
    }
}

impl SignatureStore for Broadcaster {
    fn clear_signatures(&self) {
        self.holder.clear_signatures();
    }
}

/// Polling task re-announcing this relayer on the join topic, so peers that
/// restarted still know about it.
pub struct JoinRebroadcaster {
    broadcaster: Arc<Broadcaster>,
}

impl JoinRebroadcaster {
    /// Wraps the broadcaster for periodic join announcements.
    pub fn new(broadcaster: Arc<Broadcaster>) -> Self {
        Self { broadcaster }
    }
}

#[async_trait::async_trait]
impl PollingExecutor for JoinRebroadcaster {
    fn name(&self) -> &str {
        "join-rebroadcaster"
    }

    async fn execute(&mut self) -> Result<()> {
        self.broadcaster.broadcast_join();
        Ok(())
    }
}
