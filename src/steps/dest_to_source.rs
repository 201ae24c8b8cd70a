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

//! The destination→source half-bridge. Mirror image of the
//! source→destination direction without the status-report tail: in this
//! direction the receiving chain's contract itself records the final
//! status.

use std::fmt;

use crate::error::Error;
use crate::executor::BridgeOperations;

use super::StepSet;

/// States of the destination→source half-bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestToSourceStep {
    /// Fetch, store and verify the next pending batch from the
    /// destination chain.
    GettingPendingBatch,
    /// Get the transfer proposed on the source chain (leader only).
    ProposingTransfer,
    /// Acquire the action ID and contribute this relayer's signature.
    SigningProposedTransfer,
    /// Poll the signer count until quorum.
    WaitingForQuorumOnTransfer,
    /// Execute the transfer on the source chain (leader only).
    PerformingTransfer,
    /// Give the transfer time to settle, then complete the round.
    WaitingTransferConfirmation,
}

impl fmt::Display for DestToSourceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[async_trait::async_trait]
impl StepSet for DestToSourceStep {
    fn initial() -> Self {
        Self::GettingPendingBatch
    }

    async fn execute<B: BridgeOperations>(self, bridge: &mut B) -> Self {
        match self {
            Self::GettingPendingBatch => getting_pending_batch(bridge).await,
            Self::ProposingTransfer => proposing_transfer(bridge).await,
            Self::SigningProposedTransfer => {
                signing_proposed_transfer(bridge).await
            }
            Self::WaitingForQuorumOnTransfer => {
                waiting_for_quorum_on_transfer(bridge).await
            }
            Self::PerformingTransfer => performing_transfer(bridge).await,
            Self::WaitingTransferConfirmation => {
                bridge.wait_for_transfer_confirmation().await;
                tracing::info!("batch completed");
                Self::GettingPendingBatch
            }
        }
    }
}

async fn getting_pending_batch<B: BridgeOperations>(
    bridge: &mut B,
) -> DestToSourceStep {
    bridge.reset_retries_on_source();
    bridge.reset_retries_on_destination();

    let batch = match bridge.get_pending_batch().await {
        Ok(Some(batch)) => batch,
        Ok(None) => return DestToSourceStep::GettingPendingBatch,
        Err(error) => {
            tracing::warn!(%error, "error fetching pending batch");
            return DestToSourceStep::GettingPendingBatch;
        }
    };

    tracing::info!(%batch, "fetched new pending batch");
    if let Err(error) = bridge.store_batch(batch) {
        tracing::warn!(%error, "error storing pending batch");
        return DestToSourceStep::GettingPendingBatch;
    }

    match bridge.verify_deposit_nonces().await {
        Ok(()) => DestToSourceStep::ProposingTransfer,
        Err(error @ Error::InvalidDepositNonce { .. }) => {
            // no status tail in this direction: drop the batch and let the
            // operator-visible log carry the reason
            tracing::error!(%error, "discarding batch");
            bridge.clear_stored_batch();
            DestToSourceStep::GettingPendingBatch
        }
        Err(error) => {
            tracing::warn!(%error, "error verifying deposit nonces");
            bridge.clear_stored_batch();
            DestToSourceStep::GettingPendingBatch
        }
    }
}

async fn proposing_transfer<B: BridgeOperations>(
    bridge: &mut B,
) -> DestToSourceStep {
    if bridge.stored_batch().is_none() {
        tracing::error!("no batch found on proposing transfer");
        return DestToSourceStep::GettingPendingBatch;
    }

    match bridge.was_transfer_proposed().await {
        Ok(true) => return DestToSourceStep::SigningProposedTransfer,
        Ok(false) => {}
        Err(error) => {
            tracing::warn!(%error, "error querying proposal state");
            return DestToSourceStep::GettingPendingBatch;
        }
    }

    if !bridge.my_turn_as_leader() {
        tracing::debug!("not leader, waiting for the transfer proposal");
        return DestToSourceStep::ProposingTransfer;
    }

    match bridge.propose_transfer().await {
        Ok(()) => DestToSourceStep::SigningProposedTransfer,
        Err(error) => {
            tracing::warn!(%error, "error proposing transfer");
            DestToSourceStep::GettingPendingBatch
        }
    }
}

async fn signing_proposed_transfer<B: BridgeOperations>(
    bridge: &mut B,
) -> DestToSourceStep {
    if bridge.stored_batch().is_none() {
        tracing::error!("no batch found on signing proposed transfer");
        return DestToSourceStep::GettingPendingBatch;
    }

    let action_id = match bridge.get_and_store_action_id_for_transfer().await {
        Ok(action_id) => action_id,
        Err(error) => {
            tracing::warn!(%error, "error fetching transfer action id");
            return DestToSourceStep::GettingPendingBatch;
        }
    };
    tracing::debug!(action_id, "got action id for transfer");

    match bridge.was_transfer_action_signed().await {
        Ok(true) => {}
        Ok(false) => {
            if let Err(error) = bridge.sign_transfer_action().await {
                tracing::warn!(%error, "error signing transfer action");
                return DestToSourceStep::GettingPendingBatch;
            }
        }
        Err(error) => {
            tracing::warn!(%error, "error querying signed state");
            return DestToSourceStep::GettingPendingBatch;
        }
    }

    DestToSourceStep::WaitingForQuorumOnTransfer
}

async fn waiting_for_quorum_on_transfer<B: BridgeOperations>(
    bridge: &mut B,
) -> DestToSourceStep {
    if bridge.process_max_retries_on_destination() {
        tracing::error!("max retries reached while waiting for transfer quorum");
        return DestToSourceStep::GettingPendingBatch;
    }

    match bridge.process_quorum_reached_on_transfer().await {
        Ok(true) => DestToSourceStep::PerformingTransfer,
        Ok(false) => DestToSourceStep::WaitingForQuorumOnTransfer,
        Err(error) => {
            tracing::warn!(%error, "error querying transfer quorum");
            DestToSourceStep::GettingPendingBatch
        }
    }
}

async fn performing_transfer<B: BridgeOperations>(
    bridge: &mut B,
) -> DestToSourceStep {
    match bridge.was_transfer_performed().await {
        Ok(true) => {
            tracing::debug!("transfer already performed");
            return DestToSourceStep::WaitingTransferConfirmation;
        }
        Ok(false) => {}
        Err(error) => {
            tracing::warn!(%error, "error querying performed state");
            return DestToSourceStep::GettingPendingBatch;
        }
    }

    if bridge.my_turn_as_leader() {
        match bridge.perform_transfer().await {
            Ok(()) => {}
            Err(Error::SignaturesNotReady) => {
                tracing::debug!("broadcast signatures not yet complete");
                return DestToSourceStep::PerformingTransfer;
            }
            Err(error) => {
                tracing::warn!(%error, "error performing transfer");
                return DestToSourceStep::GettingPendingBatch;
            }
        }
    }

    DestToSourceStep::WaitingTransferConfirmation
}
