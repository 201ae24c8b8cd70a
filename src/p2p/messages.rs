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

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Topic carrying join announcements and bootstrap requests.
pub const JOIN_TOPIC: &str = "join/1";
/// Topic carrying per-batch signatures.
pub const SIGN_TOPIC: &str = "sign/1";
/// Fixed payload of a join announcement.
pub(crate) const JOIN_MESSAGE: &[u8] = b"join topic";

/// One authenticated relayer-to-relayer message.
///
/// The signature covers `payload || nonce` (nonce as 8 big-endian bytes);
/// the outer framing is JSON, length-delimited by the messenger transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMessage {
    /// The sender's identity bytes.
    pub public_key: Vec<u8>,
    /// Topic-specific payload.
    pub payload: Vec<u8>,
    /// Monotonic per-sender counter.
    pub nonce: u64,
    /// Signature over [`signable_bytes`](SignedMessage::signable_bytes).
    pub signature: Vec<u8>,
}

impl SignedMessage {
    /// The byte string the sender signs: `payload || nonce (big-endian)`.
    pub fn signable_bytes(payload: &[u8], nonce: u64) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(payload.len() + 8);
        bytes.extend_from_slice(payload);
        bytes.extend_from_slice(&nonce.to_be_bytes());
        bytes
    }

    /// Serialises the message for the wire.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses a message off the wire.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// Payload of a `sign/1` message: this relayer's signature over a
/// contract-defined message hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaturePayload {
    /// The message hash the signature belongs to.
    pub message_hash: [u8; 32],
    /// The chain-level signature bytes.
    pub signature: Vec<u8>,
}

impl SignaturePayload {
    /// Serialises the payload for embedding in a [`SignedMessage`].
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses the payload of a `sign/1` message.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}
