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

use std::path::Path;

use super::StatusStore;
use crate::error::Result;

/// SledStatusStore keeps the per-half-bridge counters in a
/// [Sled](https://sled.rs)-based database, one tree per half-bridge.
#[derive(Clone)]
pub struct SledStatusStore {
    db: sled::Db,
}

impl std::fmt::Debug for SledStatusStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStatusStore").finish()
    }
}

impl SledStatusStore {
    /// Create a new SledStatusStore.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::Config::new()
            .path(path)
            .temporary(cfg!(test))
            .mode(sled::Mode::HighThroughput)
            .open()?;
        Ok(Self { db })
    }

    /// Creates a temporary SledStatusStore.
    pub fn temporary() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        Self::open(dir.path())
    }

    fn tree(&self, half_bridge: &str) -> Result<sled::Tree> {
        Ok(self.db.open_tree(format!("status/{half_bridge}"))?)
    }
}

fn decode(value: Option<&[u8]>) -> u64 {
    match value {
        Some(bytes) if bytes.len() == 8 => {
            let mut output = [0u8; 8];
            output.copy_from_slice(bytes);
            u64::from_le_bytes(output)
        }
        _ => 0,
    }
}

impl StatusStore for SledStatusStore {
    fn increment(&self, half_bridge: &str, metric: &str) -> Result<u64> {
        let tree = self.tree(half_bridge)?;
        let new = tree.update_and_fetch(metric, |old| {
            let next = decode(old).saturating_add(1);
            Some(next.to_le_bytes().to_vec())
        })?;
        Ok(decode(new.as_deref()))
    }

    fn set_value(&self, half_bridge: &str, metric: &str, value: u64) -> Result<()> {
        let tree = self.tree(half_bridge)?;
        tree.insert(metric, &value.to_le_bytes())?;
        Ok(())
    }

    fn get_value(&self, half_bridge: &str, metric: &str) -> Result<u64> {
        let tree = self.tree(half_bridge)?;
        Ok(decode(tree.get(metric)?.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::metric_names;

    #[test]
    fn counters_start_at_zero_and_increment() {
        let store = SledStatusStore::temporary().expect("temp store");
        let name = "source-to-destination";

        assert_eq!(
            store
                .get_value(name, metric_names::TRANSFERS_PROPOSED)
                .unwrap(),
            0
        );
        assert_eq!(
            store
                .increment(name, metric_names::TRANSFERS_PROPOSED)
                .unwrap(),
            1
        );
        assert_eq!(
            store
                .increment(name, metric_names::TRANSFERS_PROPOSED)
                .unwrap(),
            2
        );
        assert_eq!(
            store
                .get_value(name, metric_names::TRANSFERS_PROPOSED)
                .unwrap(),
            2
        );
    }

    #[test]
    fn half_bridges_do_not_share_counters() {
        let store = SledStatusStore::temporary().expect("temp store");
        store
            .set_value("a", metric_names::LAST_BATCH_ID, 42)
            .unwrap();

        assert_eq!(store.get_value("a", metric_names::LAST_BATCH_ID).unwrap(), 42);
        assert_eq!(store.get_value("b", metric_names::LAST_BATCH_ID).unwrap(), 0);
    }
}
