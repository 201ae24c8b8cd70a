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

//! # Topology Module
//!
//! Leader rotation over the sorted set of whitelisted relayer public keys.
//! All relayers run the same deterministic predicate against a shared wall
//! clock, so at any instant they agree on which one of them initiates write
//! transactions.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sha3::{Digest, Keccak256};

use crate::error::{Error, Result};

/// A monotonic second-granularity time source. Injected so tests can pin
/// the clock; production uses [`SystemTimer`].
pub trait Timer: Send + Sync {
    /// Seconds since the unix epoch.
    fn now_unix(&self) -> i64;
}

/// [`Timer`] backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimer;

impl Timer for SystemTimer {
    fn now_unix(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default()
    }
}

/// Source of the lexicographically-sorted active relayer public keys,
/// implemented by the broadcaster.
pub trait PublicKeysProvider: Send + Sync {
    /// The active relayer public keys, sorted lexicographically.
    fn sorted_public_keys(&self) -> Vec<Vec<u8>>;
}

/// Answers whether this relayer should initiate write transactions right
/// now.
pub trait TopologyProvider: Send + Sync {
    /// True if the current relayer is the leader of this time window.
    fn my_turn_as_leader(&self) -> bool;
}

/// Implements [`TopologyProvider`] for one relayer process.
pub struct TopologyHandler {
    public_keys_provider: Arc<dyn PublicKeysProvider>,
    timer: Arc<dyn Timer>,
    interval_for_leader: Duration,
    own_public_key: Vec<u8>,
}

impl TopologyHandler {
    /// Creates a new TopologyHandler instance.
    pub fn new(
        public_keys_provider: Arc<dyn PublicKeysProvider>,
        timer: Arc<dyn Timer>,
        interval_for_leader: Duration,
        own_public_key: Vec<u8>,
    ) -> Result<Self> {
        if interval_for_leader.as_secs() == 0 {
            return Err(Error::InvalidConfig(
                "interval-for-leader must be at least one second".into(),
            ));
        }
        if own_public_key.is_empty() {
            return Err(Error::InvalidConfig(
                "own public key must not be empty".into(),
            ));
        }

        Ok(Self {
            public_keys_provider,
            timer,
            interval_for_leader,
            own_public_key,
        })
    }
}

impl TopologyProvider for TopologyHandler {
    fn my_turn_as_leader(&self) -> bool {
        let sorted_public_keys = self.public_keys_provider.sorted_public_keys();
        if sorted_public_keys.is_empty() {
            return false;
        }

        let seed =
            (self.timer.now_unix() / self.interval_for_leader.as_secs() as i64) as u64;
        let index = random_index(seed, sorted_public_keys.len() as u64);

        sorted_public_keys[index as usize] == self.own_public_key
    }
}

/// Deterministic pseudo-random index over the 64-bit window seed, identical
/// across all relayers.
fn random_index(seed: u64, count: u64) -> u64 {
    let digest = Keccak256::digest(seed.to_be_bytes());
    let mut word = [0u8; 8];
    word.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(word) % count
}
