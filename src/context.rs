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

//! # Relayer Context Module
//!
//! A module for managing the context of the relayer.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::RelayerConfig;
use crate::error::Result;
use crate::metrics::Metrics;
use crate::store::sled::SledStatusStore;

/// RelayerContext contains the relayer's configuration and shutdown signal.
#[derive(Clone)]
pub struct RelayerContext {
    /// The configuration of the relayer.
    pub config: RelayerConfig,
    /// Fan-out side of the stop signal. Every spawned task holds a
    /// [`Shutdown`] subscribed here; one `shutdown()` call reaches all of
    /// them and each task winds down at its next await point.
    notify_shutdown: broadcast::Sender<()>,
    /// Represents the metrics for the relayer.
    pub metrics: Arc<Metrics>,
    store: SledStatusStore,
}

impl RelayerContext {
    /// Creates a new RelayerContext.
    pub fn new(config: RelayerConfig, store: SledStatusStore) -> Result<Self> {
        let (notify_shutdown, _) = broadcast::channel(2);
        let metrics = Arc::new(Metrics::new()?);
        Ok(Self {
            config,
            notify_shutdown,
            metrics,
            store,
        })
    }

    /// Returns a broadcast receiver handle for the shutdown signal.
    pub fn shutdown_signal(&self) -> Shutdown {
        Shutdown::new(self.notify_shutdown.subscribe())
    }

    /// Sends a shutdown signal to all subscribed tasks.
    pub fn shutdown(&self) {
        let _ = self.notify_shutdown.send(());
    }

    /// Returns the [Sled](https://sled.rs)-based status store.
    pub fn store(&self) -> &SledStatusStore {
        &self.store
    }

    /// Context over a default config and a temporary store, for tests.
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self::new(
            RelayerConfig::default(),
            SledStatusStore::temporary().expect("temporary store"),
        )
        .expect("test context")
    }
}

/// One task's view of the stop signal.
///
/// Polling loops select against [`Shutdown::recv`] in several places per
/// iteration, so the first delivery is latched: after the signal fired,
/// every further `recv` call resolves immediately instead of parking on a
/// drained channel.
#[derive(Debug)]
pub struct Shutdown {
    /// Latched once the signal was observed.
    fired: bool,
    /// Subscription to the context's stop broadcast.
    receiver: broadcast::Receiver<()>,
}

impl Shutdown {
    /// Wraps a receiver obtained from [`RelayerContext::shutdown_signal`].
    pub fn new(receiver: broadcast::Receiver<()>) -> Shutdown {
        Shutdown {
            fired: false,
            receiver,
        }
    }

    /// Completes once the relayer is asked to stop.
    pub async fn recv(&mut self) {
        if self.fired {
            return;
        }

        // a closed channel means the context is gone, which is as good a
        // reason to stop as the signal itself
        let _ = self.receiver.recv().await;
        self.fired = true;
    }
}
