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

//! # Service Module
//!
//! Wires the relayer together and spawns its long-running tasks: the two
//! half-bridge state machines, the whitelist refresh and the periodic join
//! re-broadcast. The embedder supplies the chain clients, the network
//! messenger and the whitelist registry adapter; everything else is built
//! here from the configuration.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::chain::ChainClient;
use crate::context::RelayerContext;
use crate::error::Result;
use crate::executor::BridgeExecutor;
use crate::keys::MessageSigner;
use crate::p2p::{Broadcaster, JoinRebroadcaster, NetMessenger};
use crate::polling::{PollingExecutor, PollingHandler};
use crate::roles::{WhitelistProvider, WhitelistRefresher, WhitelistSource};
use crate::state_machine::StateMachine;
use crate::steps::{DestToSourceStep, SourceToDestStep};
use crate::store::StatusHandler;
use crate::topology::{SystemTimer, Timer, TopologyHandler};

/// Name under which the source→destination half-bridge reports status.
pub const SOURCE_TO_DEST: &str = "source-to-destination";
/// Name under which the destination→source half-bridge reports status.
pub const DEST_TO_SOURCE: &str = "destination-to-source";

/// The externally supplied collaborators of the relayer core.
pub struct ExternalComponents {
    /// Adapter for the chain batches originate from.
    pub source: Arc<dyn ChainClient>,
    /// Adapter for the chain transfers execute on.
    pub destination: Arc<dyn ChainClient>,
    /// The peer-to-peer messenger.
    pub messenger: Arc<dyn NetMessenger>,
    /// The on-chain relayer registry.
    pub whitelist: Arc<dyn WhitelistSource>,
    /// Clock used for leader rotation; `None` selects the system clock.
    pub timer: Option<Arc<dyn Timer>>,
}

/// Handles of the spawned background tasks.
pub struct Service {
    broadcaster: Arc<Broadcaster>,
    tasks: Vec<JoinHandle<()>>,
}

impl Service {
    /// The broadcaster, exposed so chain adapters can read collected
    /// signatures and gossip their own.
    pub fn broadcaster(&self) -> Arc<Broadcaster> {
        self.broadcaster.clone()
    }

    /// Signals shutdown through the context and drains every task.
    pub async fn close(self, ctx: &RelayerContext) {
        ctx.shutdown();
        for result in futures::future::join_all(self.tasks).await {
            if let Err(error) = result {
                tracing::warn!(%error, "task ended abnormally");
            }
        }
        if let Err(error) = self.broadcaster.close() {
            tracing::warn!(%error, "error closing the messenger");
        }
        tracing::info!("relayer stopped");
    }
}

/// Builds the relayer and starts its background services.
///
/// Key or configuration problems surface here and refuse startup.
pub async fn start(
    ctx: &RelayerContext,
    components: ExternalComponents,
) -> Result<Service> {
    ctx.config.validate()?;
    let signer = Arc::new(MessageSigner::from_hex(&ctx.config.relayer.private_key)?);
    tracing::info!(
        public_key = %hex::encode(signer.public_key()),
        "starting relayer",
    );

    let role_provider = Arc::new(WhitelistProvider::new(components.whitelist));
    // without the whitelist nothing can be authenticated
    role_provider.refresh().await?;

    let broadcaster = Arc::new(Broadcaster::new(
        components.messenger.clone(),
        role_provider.clone(),
        signer.clone(),
    ));
    broadcaster.register_on_topics()?;
    components.messenger.bootstrap()?;

    // give the messenger time to find peers before announcing ourselves
    let mut shutdown = ctx.shutdown_signal();
    tokio::select! {
        _ = shutdown.recv() => return Ok(Service { broadcaster, tasks: vec![] }),
        _ = tokio::time::sleep(ctx.config.time_for_bootstrap()) => {}
    }
    broadcaster.broadcast_join();

    let timer = components
        .timer
        .unwrap_or_else(|| Arc::new(SystemTimer) as Arc<dyn Timer>);
    let topology = Arc::new(TopologyHandler::new(
        broadcaster.clone(),
        timer,
        ctx.config.interval_for_leader(),
        signer.public_key().to_vec(),
    )?);

    let store = Arc::new(ctx.store().clone());
    let mut tasks = Vec::new();

    let source_to_dest: StateMachine<SourceToDestStep, _> = StateMachine::new(
        SOURCE_TO_DEST,
        BridgeExecutor::new(
            SOURCE_TO_DEST,
            components.source.clone(),
            components.destination.clone(),
            topology.clone(),
            broadcaster.clone(),
            StatusHandler::new(SOURCE_TO_DEST, store.clone(), ctx.metrics.clone()),
            ctx.config.time_for_transfer_execution(),
        ),
    );
    tasks.push(spawn_polling(
        ctx,
        source_to_dest,
        Duration::from_millis(
            ctx.config.bridge.source_to_destination.step_duration_millis,
        ),
    ));

    let dest_to_source: StateMachine<DestToSourceStep, _> = StateMachine::new(
        DEST_TO_SOURCE,
        BridgeExecutor::new(
            DEST_TO_SOURCE,
            components.destination.clone(),
            components.source.clone(),
            topology.clone(),
            broadcaster.clone(),
            StatusHandler::new(DEST_TO_SOURCE, store.clone(), ctx.metrics.clone()),
            ctx.config.time_for_transfer_execution(),
        ),
    );
    tasks.push(spawn_polling(
        ctx,
        dest_to_source,
        Duration::from_millis(
            ctx.config.bridge.destination_to_source.step_duration_millis,
        ),
    ));

    tasks.push(spawn_polling(
        ctx,
        WhitelistRefresher::new(role_provider),
        ctx.config.whitelist_refresh(),
    ));
    tasks.push(spawn_polling(
        ctx,
        JoinRebroadcaster::new(broadcaster.clone()),
        ctx.config.rejoin_interval(),
    ));

    Ok(Service { broadcaster, tasks })
}

fn spawn_polling<E>(
    ctx: &RelayerContext,
    executor: E,
    interval: Duration,
) -> JoinHandle<()>
where
    E: PollingExecutor + 'static,
{
    let handler = PollingHandler::new(interval, ctx.config.polling_when_error());
    tokio::spawn(handler.run(executor, ctx.shutdown_signal()))
}
