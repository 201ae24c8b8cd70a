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

//! Metrics functionality

use prometheus::proto::MetricFamily;
use prometheus::{IntCounterVec, IntGaugeVec, Opts, Registry};

use crate::error::Result;

/// A struct definition for collecting metrics in the relayer.
///
/// Every counter carries a `half_bridge` label so both directions share one
/// registry.
#[derive(Debug, Clone)]
pub struct Metrics {
    registry: Registry,
    /// Transfer proposals submitted by this relayer.
    pub transfers_proposed: IntCounterVec,
    /// Actions signed by this relayer.
    pub actions_signed: IntCounterVec,
    /// Transfers executed on-chain by this relayer.
    pub transfers_executed: IntCounterVec,
    /// Batches that ended up rejected.
    pub batches_rejected: IntCounterVec,
    /// Retries consumed while waiting for quorum.
    pub quorum_retries: IntCounterVec,
    /// Identifier of the batch currently in flight.
    pub current_batch_id: IntGaugeVec,
}

impl Metrics {
    /// Instantiates the various metrics and their counters, creates a
    /// registry for the counters and registers them.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let transfers_proposed = IntCounterVec::new(
            Opts::new(
                "bridge_transfers_proposed",
                "The total number of transfer proposals submitted",
            ),
            &["half_bridge"],
        )?;
        let actions_signed = IntCounterVec::new(
            Opts::new(
                "bridge_actions_signed",
                "The total number of multisig actions signed",
            ),
            &["half_bridge"],
        )?;
        let transfers_executed = IntCounterVec::new(
            Opts::new(
                "bridge_transfers_executed",
                "The total number of transfers executed on-chain",
            ),
            &["half_bridge"],
        )?;
        let batches_rejected = IntCounterVec::new(
            Opts::new(
                "bridge_batches_rejected",
                "The total number of batches that were rejected",
            ),
            &["half_bridge"],
        )?;
        let quorum_retries = IntCounterVec::new(
            Opts::new(
                "bridge_quorum_retries",
                "How many polls were spent waiting for quorum",
            ),
            &["half_bridge"],
        )?;
        let current_batch_id = IntGaugeVec::new(
            Opts::new(
                "bridge_current_batch_id",
                "The identifier of the batch currently being processed",
            ),
            &["half_bridge"],
        )?;

        registry.register(Box::new(transfers_proposed.clone()))?;
        registry.register(Box::new(actions_signed.clone()))?;
        registry.register(Box::new(transfers_executed.clone()))?;
        registry.register(Box::new(batches_rejected.clone()))?;
        registry.register(Box::new(quorum_retries.clone()))?;
        registry.register(Box::new(current_batch_id.clone()))?;

        Ok(Self {
            registry,
            transfers_proposed,
            actions_signed,
            transfers_executed,
            batches_rejected,
            quorum_retries,
            current_batch_id,
        })
    }

    /// Gathers the current metric families, ready for text encoding by the
    /// embedder.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}
