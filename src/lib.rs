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
//
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # Janus Relayer Crate
//!
//! The relayer engine of the Janus bridge: a fixed federation of relayer
//! nodes cooperates to move token transfer batches between two chains, each
//! holding a multi-signature bridge contract.
//!
//! ## Overview
//!
//! Every relayer process runs the same deterministic program. Two
//! half-bridge state machines run concurrently, one per direction. Each is
//! driven by a polling loop firing one step per configured interval; a step
//! consults the bridge executor, which talks to the two chain clients and
//! the shared signature store. Only the leader of the current time window,
//! elected deterministically from the sorted whitelist, issues write
//! transactions; all relayers sign independently and gossip their
//! signatures peer-to-peer.
//!
//! The crate is transport-agnostic: chain RPC clients, the peer-to-peer
//! messenger and the on-chain relayer registry are supplied by the embedder
//! through the narrow traits in [`chain`], [`p2p`] and [`roles`].

/// The data model moved across the bridge.
pub mod batch;
/// The chain-client operation set implemented by the adapters.
pub mod chain;
/// Relayer configuration.
pub mod config;
/// A module for managing the context of the relayer.
pub mod context;
/// Error types.
pub mod error;
/// The chain-agnostic bridge executor backing the half-bridge steps.
pub mod executor;
/// Process-wide message signer.
pub mod keys;
/// Metrics functionality.
pub mod metrics;
/// The signature-broadcast layer.
pub mod p2p;
/// Cadenced execution of long-running tasks.
pub mod polling;
/// The relayer whitelist.
pub mod roles;
/// Wiring and task spawning.
pub mod service;
/// The step-driven half-bridge machine.
pub mod state_machine;
/// The two directional step sets.
pub mod steps;
/// Durable status counters.
pub mod store;
/// Leader rotation.
pub mod topology;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{Error, Result};
