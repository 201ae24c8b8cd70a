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

//! Process-wide message signer. Initialised once at startup from the
//! configured key material; a pure function of its inputs thereafter.

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};

use crate::error::{Error, Result};

/// Signs and verifies relayer-to-relayer messages with the node identity
/// key. Public keys travel as SEC1-compressed bytes and double as the
/// relayer address in the whitelist and the leader rotation.
pub struct MessageSigner {
    signing_key: SigningKey,
    public_key: Vec<u8>,
}

impl MessageSigner {
    /// Builds the signer from raw 32-byte secret key material.
    pub fn from_bytes(secret: &[u8]) -> Result<Self> {
        let signing_key = SigningKey::from_slice(secret)?;
        let public_key = signing_key
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec();
        Ok(Self {
            signing_key,
            public_key,
        })
    }

    /// Builds the signer from the hex-encoded secret key found in the
    /// configuration. Failure here is fatal at startup.
    pub fn from_hex(secret_hex: &str) -> Result<Self> {
        let trimmed = secret_hex.trim().trim_start_matches("0x");
        if trimmed.is_empty() {
            return Err(Error::MissingSecrets);
        }
        let bytes = hex::decode(trimmed)
            .map_err(|e| Error::InvalidConfig(format!("private-key: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// This relayer's identity bytes (SEC1-compressed public key).
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Signs arbitrary data with the identity key.
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        let signature: Signature = self.signing_key.sign(data);
        signature.to_bytes().to_vec()
    }

    /// Verifies `signature` over `data` under the declared public key
    /// bytes.
    pub fn verify(public_key: &[u8], data: &[u8], signature: &[u8]) -> Result<()> {
        let key = VerifyingKey::from_sec1_bytes(public_key)
            .map_err(|_| Error::InvalidMessageSignature)?;
        let signature = Signature::from_slice(signature)
            .map_err(|_| Error::InvalidMessageSignature)?;
        key.verify(data, &signature)
            .map_err(|_| Error::InvalidMessageSignature)
    }
}

impl std::fmt::Debug for MessageSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageSigner")
            .field("public_key", &hex::encode(&self.public_key))
            .finish()
    }
}
