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

//! # Half-Bridge Steps Module
//!
//! The two directional state machines. States are disjoint variants of one
//! sum per direction; a transition is a function from the current state and
//! the bridge executor to the next state. Every propose/perform first asks
//! "was this already done?" and every sign asks "did I already sign?", so a
//! late or duplicate leader can never double-execute, and a half-bridge
//! that lost its in-memory state resynchronises by re-reading the chain.

use crate::executor::BridgeOperations;

pub mod dest_to_source;
pub mod source_to_dest;

pub use dest_to_source::DestToSourceStep;
pub use source_to_dest::SourceToDestStep;

/// One directional step set, executable by the state machine.
#[async_trait::async_trait]
pub trait StepSet:
    Copy + PartialEq + Eq + std::fmt::Display + Send + Sync + 'static
{
    /// The step a half-bridge starts from and resets to.
    fn initial() -> Self;

    /// Executes this step against the bridge and returns the next step.
    async fn execute<B: BridgeOperations>(self, bridge: &mut B) -> Self;
}
