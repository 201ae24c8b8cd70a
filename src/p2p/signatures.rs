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

use std::collections::{BTreeSet, HashMap};

use parking_lot::RwLock;

use crate::chain::MessageHash;

use super::messages::{SignaturePayload, SignedMessage};

/// The shared signature store owned by the broadcaster.
///
/// Keyed by message hash, then by sender public key, so a late signature
/// from the same sender is an O(1) replace. Writers serialise on the inner
/// lock; readers snapshot under the read half.
#[derive(Debug, Default)]
pub struct SignatureHolder {
    inner: RwLock<HolderState>,
}

#[derive(Debug, Default)]
struct HolderState {
    // message hash -> sender public key -> full signed message
    signatures: HashMap<MessageHash, HashMap<Vec<u8>, SignedMessage>>,
    // every peer observed on join or sign, lexicographically ordered
    public_keys: BTreeSet<Vec<u8>>,
}

impl SignatureHolder {
    /// Creates an empty holder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a peer observed on the join topic.
    pub fn add_joined_peer(&self, public_key: Vec<u8>) {
        let mut state = self.inner.write();
        state.public_keys.insert(public_key);
    }

    /// Stores a signature message, overwriting any prior signature from the
    /// same sender for the same message hash.
    pub fn add_signed_message(
        &self,
        message: SignedMessage,
        payload: &SignaturePayload,
    ) {
        let mut state = self.inner.write();
        state.public_keys.insert(message.public_key.clone());
        state
            .signatures
            .entry(payload.message_hash)
            .or_default()
            .insert(message.public_key.clone(), message);
    }

    /// The chain-level signatures collected so far for a message hash.
    pub fn signatures(&self, message_hash: &MessageHash) -> Vec<Vec<u8>> {
        let state = self.inner.read();
        let Some(per_sender) = state.signatures.get(message_hash) else {
            return Vec::new();
        };
        per_sender
            .values()
            .filter_map(|msg| {
                SignaturePayload::from_bytes(&msg.payload)
                    .ok()
                    .map(|p| p.signature)
            })
            .collect()
    }

    /// Every stored signature message, used to bootstrap a joining peer.
    pub fn stored_messages(&self) -> Vec<SignedMessage> {
        let state = self.inner.read();
        state
            .signatures
            .values()
            .flat_map(|per_sender| per_sender.values().cloned())
            .collect()
    }

    /// The active peer set, sorted lexicographically.
    pub fn sorted_public_keys(&self) -> Vec<Vec<u8>> {
        let state = self.inner.read();
        state.public_keys.iter().cloned().collect()
    }

    /// Drops every stored signature. The peer set survives; membership only
    /// changes through the whitelist.
    pub fn clear_signatures(&self) {
        let mut state = self.inner.write();
        state.signatures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed(pk: &[u8], hash: [u8; 32], sig: &[u8], nonce: u64) -> (SignedMessage, SignaturePayload) {
        let payload = SignaturePayload {
            message_hash: hash,
            signature: sig.to_vec(),
        };
        let message = SignedMessage {
            public_key: pk.to_vec(),
            payload: payload.to_bytes().unwrap(),
            nonce,
            signature: vec![0xFF],
        };
        (message, payload)
    }

    #[test]
    fn stores_one_signature_per_sender_per_hash() {
        let holder = SignatureHolder::new();
        let hash = [7u8; 32];

        let (m1, p1) = signed(b"aaa", hash, b"sig-1", 1);
        holder.add_signed_message(m1, &p1);
        let (m2, p2) = signed(b"aaa", hash, b"sig-2", 2);
        holder.add_signed_message(m2, &p2);

        let sigs = holder.signatures(&hash);
        assert_eq!(sigs, vec![b"sig-2".to_vec()]);
    }

    #[test]
    fn signatures_are_scoped_to_their_hash() {
        let holder = SignatureHolder::new();
        let (m1, p1) = signed(b"aaa", [1u8; 32], b"sig-a", 1);
        let (m2, p2) = signed(b"bbb", [2u8; 32], b"sig-b", 1);
        holder.add_signed_message(m1, &p1);
        holder.add_signed_message(m2, &p2);

        assert_eq!(holder.signatures(&[1u8; 32]), vec![b"sig-a".to_vec()]);
        assert_eq!(holder.signatures(&[2u8; 32]), vec![b"sig-b".to_vec()]);
        assert!(holder.signatures(&[3u8; 32]).is_empty());
    }

    #[test]
    fn clear_drops_signatures_but_keeps_peers() {
        let holder = SignatureHolder::new();
        holder.add_joined_peer(b"bbb".to_vec());
        let (m, p) = signed(b"aaa", [1u8; 32], b"sig", 1);
        holder.add_signed_message(m, &p);

        holder.clear_signatures();
        assert!(holder.signatures(&[1u8; 32]).is_empty());
        assert!(holder.stored_messages().is_empty());
        assert_eq!(
            holder.sorted_public_keys(),
            vec![b"aaa".to_vec(), b"bbb".to_vec()]
        );
    }

    #[test]
    fn public_keys_are_sorted() {
        let holder = SignatureHolder::new();
        holder.add_joined_peer(b"ccc".to_vec());
        holder.add_joined_peer(b"aaa".to_vec());
        holder.add_joined_peer(b"bbb".to_vec());
        holder.add_joined_peer(b"aaa".to_vec());

        assert_eq!(
            holder.sorted_public_keys(),
            vec![b"aaa".to_vec(), b"bbb".to_vec(), b"ccc".to_vec()]
        );
    }
}
