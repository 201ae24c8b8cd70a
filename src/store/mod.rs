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

//! # Relayer Store Module
//!
//! Durable status counters, indexed by half-bridge name and keyed by ASCII
//! metric names. The store survives restarts so operators can track how far
//! each half-bridge progressed.

use std::sync::Arc;

use crate::error::Result;
use crate::metrics::Metrics;

/// A module for managing in-memory storage of the relayer.
pub mod mem;
/// A module for setting up and managing a [Sled](https://sled.rs)-based
/// database.
pub mod sled;

/// The ASCII metric names persisted by the status store.
pub mod metric_names {
    /// Transfer proposals submitted.
    pub const TRANSFERS_PROPOSED: &str = "transfers proposed";
    /// Multisig actions signed.
    pub const ACTIONS_SIGNED: &str = "actions signed";
    /// Transfers executed on-chain.
    pub const TRANSFERS_EXECUTED: &str = "transfers executed";
    /// Batches that ended up rejected.
    pub const BATCHES_REJECTED: &str = "batches rejected";
    /// Polls spent waiting for quorum.
    pub const QUORUM_RETRIES: &str = "quorum retries";
    /// Identifier of the last batch picked up.
    pub const LAST_BATCH_ID: &str = "last batch id";
}

/// StatusStore is a simple trait for persisting per-half-bridge counters.
pub trait StatusStore: Send + Sync {
    /// Adds one to the counter and returns the new value.
    fn increment(&self, half_bridge: &str, metric: &str) -> Result<u64>;
    /// Overwrites the counter with `value`.
    fn set_value(&self, half_bridge: &str, metric: &str, value: u64) -> Result<()>;
    /// Reads the counter, defaulting to zero when absent.
    fn get_value(&self, half_bridge: &str, metric: &str) -> Result<u64>;
}

impl<S: StatusStore + ?Sized> StatusStore for Arc<S> {
    fn increment(&self, half_bridge: &str, metric: &str) -> Result<u64> {
        S::increment(self, half_bridge, metric)
    }

    fn set_value(&self, half_bridge: &str, metric: &str, value: u64) -> Result<()> {
        S::set_value(self, half_bridge, metric, value)
    }

    fn get_value(&self, half_bridge: &str, metric: &str) -> Result<u64> {
        S::get_value(self, half_bridge, metric)
    }
}

/// Bundles the durable counters and the prometheus counters of one
/// half-bridge behind a single handle the executor can update.
///
/// Accounting must never take a half-bridge down, so store failures are
/// logged and swallowed here.
#[derive(Clone)]
pub struct StatusHandler {
    half_bridge: String,
    store: Arc<dyn StatusStore>,
    metrics: Arc<Metrics>,
}

impl StatusHandler {
    /// Creates the handler for the named half-bridge.
    pub fn new(
        half_bridge: impl Into<String>,
        store: Arc<dyn StatusStore>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            half_bridge: half_bridge.into(),
            store,
            metrics,
        }
    }

    /// The half-bridge this handler accounts for.
    pub fn half_bridge(&self) -> &str {
        &self.half_bridge
    }

    fn bump(&self, metric: &str) {
        if let Err(error) = self.store.increment(&self.half_bridge, metric) {
            tracing::warn!(%error, metric, "failed to persist status counter");
        }
    }

    /// Records a submitted transfer proposal.
    pub fn inc_proposed(&self) {
        self.bump(metric_names::TRANSFERS_PROPOSED);
        self.metrics
            .transfers_proposed
            .with_label_values(&[&self.half_bridge])
            .inc();
    }

    /// Records a signed action.
    pub fn inc_signed(&self) {
        self.bump(metric_names::ACTIONS_SIGNED);
        self.metrics
            .actions_signed
            .with_label_values(&[&self.half_bridge])
            .inc();
    }

    /// Records an executed transfer or set-status action.
    pub fn inc_executed(&self) {
        self.bump(metric_names::TRANSFERS_EXECUTED);
        self.metrics
            .transfers_executed
            .with_label_values(&[&self.half_bridge])
            .inc();
    }

    /// Records a rejected batch.
    pub fn inc_rejected(&self) {
        self.bump(metric_names::BATCHES_REJECTED);
        self.metrics
            .batches_rejected
            .with_label_values(&[&self.half_bridge])
            .inc();
    }

    /// Records one poll spent waiting for quorum.
    pub fn inc_retries(&self) {
        self.bump(metric_names::QUORUM_RETRIES);
        self.metrics
            .quorum_retries
            .with_label_values(&[&self.half_bridge])
            .inc();
    }

    /// Records the identifier of the batch being worked on.
    pub fn set_last_batch_id(&self, batch_id: u64) {
        if let Err(error) = self.store.set_value(
            &self.half_bridge,
            metric_names::LAST_BATCH_ID,
            batch_id,
        ) {
            tracing::warn!(%error, batch_id, "failed to persist last batch id");
        }
        self.metrics
            .current_batch_id
            .with_label_values(&[&self.half_bridge])
            .set(batch_id as i64);
    }
}

impl std::fmt::Debug for StatusHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusHandler")
            .field("half_bridge", &self.half_bridge)
            .finish()
    }
}
