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

/// An enum of all possible errors that could be encountered during the
/// execution of the relayer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An Io error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// JSON Error occurred.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Config loading error.
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    /// Sled database error.
    #[error(transparent)]
    Sled(#[from] sled::Error),
    /// Prometheus registry error.
    #[error(transparent)]
    Prometheus(#[from] prometheus::Error),
    /// ECDSA key / signature error.
    #[error(transparent)]
    Ecdsa(#[from] k256::ecdsa::Error),
    /// An error reported by a chain client adapter.
    #[error("chain client error on {chain}: {message}")]
    Chain {
        /// Name of the chain the adapter talks to.
        chain: String,
        /// Adapter-provided description of the failure.
        message: String,
    },
    /// A batch was required but none is stored.
    #[error("no transfer batch is stored")]
    NilBatch,
    /// The deposit nonces of the fetched batch are not contiguous.
    #[error("invalid deposit nonce for {deposit}, expected: {expected}")]
    InvalidDepositNonce {
        /// Display form of the offending deposit.
        deposit: String,
        /// The nonce the deposit should have carried.
        expected: u64,
    },
    /// The bridge setup for this batch is unusable (e.g. a token declared
    /// native on both chains, or on neither).
    #[error("invalid bridge setup: {0}")]
    InvalidSetup(String),
    /// A peer sent a message but is not part of the whitelist.
    #[error("peer not whitelisted: {public_key}")]
    PeerNotWhitelisted {
        /// Hex form of the declared public key.
        public_key: String,
    },
    /// A message carried a nonce lower or equal to the last accepted one.
    #[error("stale message nonce {received}, last accepted {last}")]
    StaleMessageNonce {
        /// The nonce carried by the rejected message.
        received: u64,
        /// The highest nonce accepted from the sender on the topic.
        last: u64,
    },
    /// A message signature did not verify under the declared public key.
    #[error("message signature verification failed")]
    InvalidMessageSignature,
    /// The gossiped signatures do not yet cover the quorum.
    #[error("not enough broadcast signatures to execute the action")]
    SignaturesNotReady,
    /// Missing required private key in the configuration.
    #[error("missing required private-key in the config")]
    MissingSecrets,
    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Generic error.
    #[error("{0}")]
    Generic(&'static str),
}

/// A type alias for the result used across the relayer, that uses the
/// [`Error`] enum.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Helper for adapters and stubs to build a chain error.
    pub fn chain(chain: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Chain {
            chain: chain.into(),
            message: message.into(),
        }
    }
}
