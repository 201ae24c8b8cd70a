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

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::StatusStore;
use crate::error::Result;

/// A non-persistent status store, mainly used for testing and dry runs.
#[derive(Clone, Debug, Default)]
pub struct InMemoryStatusStore {
    inner: Arc<RwLock<HashMap<(String, String), u64>>>,
}

impl InMemoryStatusStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusStore for InMemoryStatusStore {
    fn increment(&self, half_bridge: &str, metric: &str) -> Result<u64> {
        let mut guard = self.inner.write();
        let entry = guard
            .entry((half_bridge.to_owned(), metric.to_owned()))
            .or_insert(0);
        *entry += 1;
        Ok(*entry)
    }

    fn set_value(&self, half_bridge: &str, metric: &str, value: u64) -> Result<()> {
        let mut guard = self.inner.write();
        guard.insert((half_bridge.to_owned(), metric.to_owned()), value);
        Ok(())
    }

    fn get_value(&self, half_bridge: &str, metric: &str) -> Result<u64> {
        let guard = self.inner.read();
        Ok(guard
            .get(&(half_bridge.to_owned(), metric.to_owned()))
            .copied()
            .unwrap_or_default())
    }
}
