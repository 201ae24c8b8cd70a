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

//! # Roles Module
//!
//! The relayer whitelist. Membership lives in an on-chain registry; this
//! module keeps a periodically refreshed snapshot of it and answers the
//! broadcaster's "is this sender allowed?" question without a round-trip.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use parking_lot::RwLock;

use crate::error::Result;
use crate::polling::PollingExecutor;

/// Answers whether an address participates in the bridge.
pub trait RoleProvider: Send + Sync {
    /// True if the public-key bytes belong to a whitelisted relayer.
    fn is_whitelisted(&self, public_key: &[u8]) -> bool;
}

/// The on-chain registry adapter the whitelist snapshot is refreshed from.
#[async_trait::async_trait]
pub trait WhitelistSource: Send + Sync {
    /// Fetches the full set of whitelisted relayer public keys.
    async fn fetch_whitelisted(&self) -> Result<Vec<Vec<u8>>>;
}

/// [`RoleProvider`] holding a cached snapshot of the registry.
pub struct WhitelistProvider {
    source: Arc<dyn WhitelistSource>,
    cache: RwLock<HashSet<Vec<u8>>>,
}

impl WhitelistProvider {
    /// Creates a provider with an empty snapshot; call
    /// [`WhitelistProvider::refresh`] before serving queries.
    pub fn new(source: Arc<dyn WhitelistSource>) -> Self {
        Self {
            source,
            cache: RwLock::new(HashSet::new()),
        }
    }

    /// Re-reads the registry. Transient registry failures are retried on a
    /// short pause until a small time budget runs out; the caller decides
    /// what an exhausted refresh means (fatal at startup, logged once the
    /// relayer is up).
    pub async fn refresh(&self) -> Result<()> {
        let source = self.source.clone();
        let fetch = || {
            let source = source.clone();
            async move {
                source
                    .fetch_whitelisted()
                    .await
                    .map_err(backoff::Error::transient)
            }
        };
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(50))
            .with_multiplier(1.0)
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(Some(Duration::from_secs(2)))
            .build();
        let keys = backoff::future::retry(backoff, fetch).await?;

        let mut cache = self.cache.write();
        *cache = keys.into_iter().collect();
        tracing::debug!(members = cache.len(), "refreshed relayer whitelist");
        Ok(())
    }
}

impl RoleProvider for WhitelistProvider {
    fn is_whitelisted(&self, public_key: &[u8]) -> bool {
        self.cache.read().contains(public_key)
    }
}

/// Polling task that keeps a [`WhitelistProvider`] snapshot fresh.
pub struct WhitelistRefresher {
    provider: Arc<WhitelistProvider>,
}

impl WhitelistRefresher {
    /// Wraps the provider for periodic refresh.
    pub fn new(provider: Arc<WhitelistProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait::async_trait]
impl PollingExecutor for WhitelistRefresher {
    fn name(&self) -> &str {
        "whitelist-refresher"
    }

    async fn execute(&mut self) -> Result<()> {
        self.provider.refresh().await
    }
}
