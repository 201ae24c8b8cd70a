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

//! # State Machine Module
//!
//! Drives one half-bridge: executes the current step against the attached
//! bridge executor and follows the returned transition. Step transitions
//! within one machine are totally ordered; the two machines of a relayer
//! run concurrently and share only the signature store and the chain
//! clients.

use crate::error::Result;
use crate::executor::BridgeOperations;
use crate::polling::PollingExecutor;
use crate::steps::StepSet;

/// A step-driven half-bridge machine.
pub struct StateMachine<S: StepSet, B: BridgeOperations> {
    name: String,
    current: S,
    bridge: B,
}

impl<S: StepSet, B: BridgeOperations> StateMachine<S, B> {
    /// Creates the machine at its initial step.
    pub fn new(name: impl Into<String>, bridge: B) -> Self {
        Self {
            name: name.into(),
            current: S::initial(),
            bridge,
        }
    }

    /// The step the machine currently sits on.
    pub fn current_step(&self) -> S {
        self.current
    }

    /// Immutable access to the attached bridge, mainly for inspection in
    /// tests.
    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    /// Executes one step and records the transition.
    pub async fn execute_step(&mut self) {
        let next = self.current.execute(&mut self.bridge).await;
        if next == self.current {
            return;
        }

        tracing::debug!(
            machine = %self.name,
            from = %self.current,
            to = %next,
            "step transition",
        );

        if next == S::initial() {
            // Whatever brought us back here, the batch is re-fetched and
            // re-verified from scratch on the next visit.
            self.bridge.clear_stored_batch();
        } else {
            // A successful hand-over refills the retry budgets.
            self.bridge.reset_retries_on_source();
            self.bridge.reset_retries_on_destination();
        }
        self.current = next;
    }
}

#[async_trait::async_trait]
impl<S: StepSet, B: BridgeOperations> PollingExecutor for StateMachine<S, B> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&mut self) -> Result<()> {
        self.execute_step().await;
        Ok(())
    }
}
