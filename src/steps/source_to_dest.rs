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

//! The source→destination half-bridge: move the pending batch onto the
//! destination chain, then report the per-deposit statuses back on the
//! source chain.

use std::fmt;

use crate::error::Error;
use crate::executor::BridgeOperations;

use super::StepSet;

/// States of the source→destination half-bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceToDestStep {
    /// Fetch, store and verify the next pending batch from the source.
    GettingPendingBatch,
    /// Get the transfer proposed on the destination (leader only).
    ProposingTransfer,
    /// Acquire the action ID and contribute this relayer's signature.
    SigningProposedTransfer,
    /// Poll the destination signer count until quorum.
    WaitingForQuorumOnTransfer,
    /// Execute the transfer on the destination (leader only).
    PerformingTransfer,
    /// Give the destination time to settle the transfer.
    WaitingTransferConfirmation,
    /// Pull the post-execution statuses from the destination.
    ResolvingSetStatus,
    /// Get the status vector proposed on the source (leader only).
    ProposingSetStatus,
    /// Acquire the set-status action ID and sign it.
    SigningProposedSetStatus,
    /// Poll the source signer count until quorum.
    WaitingForQuorumOnSetStatus,
    /// Execute the set-status action on the source, completing the batch.
    PerformingSetStatus,
}

impl fmt::Display for SourceToDestStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[async_trait::async_trait]
impl StepSet for SourceToDestStep {
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
                Self::ResolvingSetStatus
            }
            Self::ResolvingSetStatus => resolving_set_status(bridge).await,
            Self::ProposingSetStatus => proposing_set_status(bridge).await,
            Self::SigningProposedSetStatus => {
                signing_proposed_set_status(bridge).await
            }
            Self::WaitingForQuorumOnSetStatus => {
                waiting_for_quorum_on_set_status(bridge).await
            }
            Self::PerformingSetStatus => performing_set_status(bridge).await,
        }
    }
}

async fn getting_pending_batch<B: BridgeOperations>(
    bridge: &mut B,
) -> SourceToDestStep {
    bridge.reset_retries_on_source();
    bridge.reset_retries_on_destination();

    let batch = match bridge.get_pending_batch().await {
        Ok(Some(batch)) => batch,
        Ok(None) => return SourceToDestStep::GettingPendingBatch,
        Err(error) => {
            tracing::warn!(%error, "error fetching pending batch");
            return SourceToDestStep::GettingPendingBatch;
        }
    };

    tracing::info!(%batch, "fetched new pending batch");
    if let Err(error) = bridge.store_batch(batch) {
        tracing::warn!(%error, "error storing pending batch");
        return SourceToDestStep::GettingPendingBatch;
    }

    match bridge.verify_deposit_nonces().await {
        Ok(()) => SourceToDestStep::ProposingTransfer,
        Err(error @ Error::InvalidDepositNonce { .. }) => {
            tracing::error!(%error, "rejecting batch");
            bridge.mark_batch_rejected();
            SourceToDestStep::ResolvingSetStatus
        }
        Err(error) => {
            tracing::warn!(%error, "error verifying deposit nonces");
            bridge.clear_stored_batch();
            SourceToDestStep::GettingPendingBatch
        }
    }
}

async fn proposing_transfer<B: BridgeOperations>(
    bridge: &mut B,
) -> SourceToDestStep {
    if bridge.stored_batch().is_none() {
        tracing::error!("no batch found on proposing transfer");
        return SourceToDestStep::GettingPendingBatch;
    }

    match bridge.was_transfer_proposed().await {
        Ok(true) => return SourceToDestStep::SigningProposedTransfer,
        Ok(false) => {}
        Err(error) => {
            tracing::warn!(%error, "error querying proposal state");
            return SourceToDestStep::GettingPendingBatch;
        }
    }

    if !bridge.my_turn_as_leader() {
        tracing::debug!("not leader, waiting for the transfer proposal");
        return SourceToDestStep::ProposingTransfer;
    }

    match bridge.propose_transfer().await {
        Ok(()) => SourceToDestStep::SigningProposedTransfer,
        Err(error) => {
            // A transfer that cannot even be proposed (bad bridge setup,
            // contract refusal) is terminal for the batch: report it
            // rejected on the source so the half-bridge can move on.
            tracing::error!(%error, "error proposing transfer, rejecting batch");
            bridge.mark_batch_rejected();
            SourceToDestStep::ResolvingSetStatus
        }
    }
}

async fn signing_proposed_transfer<B: BridgeOperations>(
    bridge: &mut B,
) -> SourceToDestStep {
    if bridge.stored_batch().is_none() {
        tracing::error!("no batch found on signing proposed transfer");
        return SourceToDestStep::GettingPendingBatch;
    }

    let action_id = match bridge.get_and_store_action_id_for_transfer().await {
        Ok(action_id) => action_id,
        Err(error) => {
            tracing::warn!(%error, "error fetching transfer action id");
            return SourceToDestStep::GettingPendingBatch;
        }
    };
    tracing::debug!(action_id, "got action id for transfer");

    match bridge.was_transfer_action_signed().await {
        Ok(true) => {}
        Ok(false) => {
            if let Err(error) = bridge.sign_transfer_action().await {
                tracing::warn!(%error, "error signing transfer action");
                return SourceToDestStep::GettingPendingBatch;
            }
        }
        Err(error) => {
            tracing::warn!(%error, "error querying signed state");
            return SourceToDestStep::GettingPendingBatch;
        }
    }

    SourceToDestStep::WaitingForQuorumOnTransfer
}

async fn waiting_for_quorum_on_transfer<B: BridgeOperations>(
    bridge: &mut B,
) -> SourceToDestStep {
    if bridge.process_max_retries_on_destination() {
        tracing::error!("max retries reached while waiting for transfer quorum");
        return SourceToDestStep::GettingPendingBatch;
    }

    match bridge.process_quorum_reached_on_transfer().await {
        Ok(true) => SourceToDestStep::PerformingTransfer,
        Ok(false) => SourceToDestStep::WaitingForQuorumOnTransfer,
        Err(error) => {
            tracing::warn!(%error, "error querying transfer quorum");
            SourceToDestStep::GettingPendingBatch
        }
    }
}

async fn performing_transfer<B: BridgeOperations>(
    bridge: &mut B,
) -> SourceToDestStep {
    match bridge.was_transfer_performed().await {
        Ok(true) => {
            tracing::debug!("transfer already performed");
            return SourceToDestStep::WaitingTransferConfirmation;
        }
        Ok(false) => {}
        Err(error) => {
            tracing::warn!(%error, "error querying performed state");
            return SourceToDestStep::GettingPendingBatch;
        }
    }

    if bridge.my_turn_as_leader() {
        match bridge.perform_transfer().await {
            Ok(()) => {}
            Err(Error::SignaturesNotReady) => {
                // the gossiped signatures lag the on-chain quorum; try again
                // on the next poll
                tracing::debug!("broadcast signatures not yet complete");
                return SourceToDestStep::PerformingTransfer;
            }
            Err(error) => {
                tracing::warn!(%error, "error performing transfer");
                return SourceToDestStep::GettingPendingBatch;
            }
        }
    }

    SourceToDestStep::WaitingTransferConfirmation
}

async fn resolving_set_status<B: BridgeOperations>(
    bridge: &mut B,
) -> SourceToDestStep {
    if bridge.stored_batch().is_none() {
        tracing::error!("no batch found on resolving set status");
        return SourceToDestStep::GettingPendingBatch;
    }

    // A batch rejected earlier in the round already carries its statuses.
    if !bridge.batch_is_resolved() {
        let statuses = match bridge.fetch_batch_statuses().await {
            Ok(statuses) => statuses,
            Err(error) => {
                tracing::warn!(%error, "error fetching batch statuses");
                if bridge.process_max_retries_on_destination() {
                    tracing::error!(
                        "max retries reached while resolving statuses"
                    );
                    return SourceToDestStep::GettingPendingBatch;
                }
                return SourceToDestStep::ResolvingSetStatus;
            }
        };
        bridge.resolve_statuses(statuses);
    }

    SourceToDestStep::ProposingSetStatus
}

async fn proposing_set_status<B: BridgeOperations>(
    bridge: &mut B,
) -> SourceToDestStep {
    if bridge.stored_batch().is_none() {
        tracing::error!("no batch found on proposing set status");
        return SourceToDestStep::GettingPendingBatch;
    }

    match bridge.was_set_status_proposed().await {
        Ok(true) => return SourceToDestStep::SigningProposedSetStatus,
        Ok(false) => {}
        Err(error) => {
            tracing::warn!(%error, "error querying set-status proposal state");
            return SourceToDestStep::GettingPendingBatch;
        }
    }

    if !bridge.my_turn_as_leader() {
        tracing::debug!("not leader, waiting for the set-status proposal");
        return SourceToDestStep::ProposingSetStatus;
    }

    match bridge.propose_set_status().await {
        Ok(()) => SourceToDestStep::SigningProposedSetStatus,
        Err(error) => {
            tracing::warn!(%error, "error proposing set status");
            SourceToDestStep::GettingPendingBatch
        }
    }
}

async fn signing_proposed_set_status<B: BridgeOperations>(
    bridge: &mut B,
) -> SourceToDestStep {
    if bridge.stored_batch().is_none() {
        tracing::error!("no batch found on signing proposed set status");
        return SourceToDestStep::GettingPendingBatch;
    }

    let action_id = match bridge.get_and_store_action_id_for_set_status().await
    {
        Ok(action_id) => action_id,
        Err(error) => {
            tracing::warn!(%error, "error fetching set-status action id");
            return SourceToDestStep::GettingPendingBatch;
        }
    };
    tracing::debug!(action_id, "got action id for set status");

    match bridge.was_set_status_action_signed().await {
        Ok(true) => {}
        Ok(false) => {
            if let Err(error) = bridge.sign_set_status_action().await {
                tracing::warn!(%error, "error signing set-status action");
                return SourceToDestStep::GettingPendingBatch;
            }
        }
        Err(error) => {
            tracing::warn!(%error, "error querying signed state");
            return SourceToDestStep::GettingPendingBatch;
        }
    }

    SourceToDestStep::WaitingForQuorumOnSetStatus
}

async fn waiting_for_quorum_on_set_status<B: BridgeOperations>(
    bridge: &mut B,
) -> SourceToDestStep {
    if bridge.process_max_retries_on_source() {
        tracing::error!(
            "max retries reached while waiting for set-status quorum"
        );
        return SourceToDestStep::GettingPendingBatch;
    }

    match bridge.process_quorum_reached_on_set_status().await {
        Ok(true) => SourceToDestStep::PerformingSetStatus,
        Ok(false) => SourceToDestStep::WaitingForQuorumOnSetStatus,
        Err(error) => {
            tracing::warn!(%error, "error querying set-status quorum");
            SourceToDestStep::GettingPendingBatch
        }
    }
}

async fn performing_set_status<B: BridgeOperations>(
    bridge: &mut B,
) -> SourceToDestStep {
    match bridge.was_set_status_performed().await {
        Ok(true) => {
            tracing::info!("batch completed, statuses recorded on source");
            return SourceToDestStep::GettingPendingBatch;
        }
        Ok(false) => {}
        Err(error) => {
            tracing::warn!(%error, "error querying set-status performed state");
            return SourceToDestStep::GettingPendingBatch;
        }
    }

    if !bridge.my_turn_as_leader() {
        tracing::debug!("not leader, waiting for the set-status execution");
        return SourceToDestStep::PerformingSetStatus;
    }

    match bridge.perform_set_status().await {
        Ok(()) => {
            tracing::info!("batch completed, statuses recorded on source");
            SourceToDestStep::GettingPendingBatch
        }
        Err(error) => {
            tracing::warn!(%error, "error performing set status");
            SourceToDestStep::GettingPendingBatch
        }
    }
}
