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

//! # Relayer Configuration Module
//!
//! A module for configuring the relayer. Values come from a TOML or JSON
//! file layered with `JANUS`-prefixed environment variables; timing bounds
//! are validated before the process starts and violations are fatal.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The leader window defaults to two minutes.
const fn default_interval_for_leader_seconds() -> u64 {
    120
}
/// Transfers get one minute to settle by default.
const fn default_time_for_transfer_execution_seconds() -> u64 {
    60
}
/// Bootstrap wait before the first join broadcast.
const fn default_time_for_bootstrap_millis() -> u64 {
    1_000
}
/// Join messages are re-broadcast every minute by default.
const fn default_rejoin_interval_seconds() -> u64 {
    60
}
/// One state-machine step every twelve seconds by default.
const fn default_step_duration_millis() -> u64 {
    12_000
}
/// Failed polls back off for five seconds.
const fn default_polling_when_error_seconds() -> u64 {
    5
}
/// The whitelist snapshot is refreshed every minute by default.
const fn default_whitelist_refresh_seconds() -> u64 {
    60
}

/// RelayerConfig is the configuration for the relayer process.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct RelayerConfig {
    /// Identity and key material.
    #[serde(default)]
    pub relayer: RelayerSettings,
    /// Timings and half-bridge cadence.
    #[serde(default)]
    pub bridge: BridgeSettings,
}

/// Identity settings of this relayer node.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct RelayerSettings {
    /// Hex-encoded secret key the relayer signs messages with.
    #[serde(default, skip_serializing)]
    pub private_key: String,
}

/// Timings governing both half-bridges and the broadcast layer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BridgeSettings {
    /// Length of one leader window, in seconds. Must be >= 1.
    #[serde(default = "default_interval_for_leader_seconds")]
    pub interval_for_leader_seconds: u64,
    /// Upper bound waited for a transfer to settle, in seconds.
    #[serde(default = "default_time_for_transfer_execution_seconds")]
    pub time_for_transfer_execution_seconds: u64,
    /// Sleep after messenger bootstrap before the first join broadcast,
    /// in milliseconds. Must be >= 100.
    #[serde(default = "default_time_for_bootstrap_millis")]
    pub time_for_bootstrap_millis: u64,
    /// Interval between join re-broadcasts, in seconds. Must be >= 30.
    #[serde(default = "default_rejoin_interval_seconds")]
    pub rejoin_interval_seconds: u64,
    /// Backoff applied when a polling iteration errors, in seconds.
    #[serde(default = "default_polling_when_error_seconds")]
    pub polling_when_error_seconds: u64,
    /// Interval between whitelist refreshes, in seconds.
    #[serde(default = "default_whitelist_refresh_seconds")]
    pub whitelist_refresh_seconds: u64,
    /// Cadence of the source-to-destination half-bridge.
    #[serde(default)]
    pub source_to_destination: HalfBridgeSettings,
    /// Cadence of the destination-to-source half-bridge.
    #[serde(default)]
    pub destination_to_source: HalfBridgeSettings,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            interval_for_leader_seconds: default_interval_for_leader_seconds(),
            time_for_transfer_execution_seconds:
                default_time_for_transfer_execution_seconds(),
            time_for_bootstrap_millis: default_time_for_bootstrap_millis(),
            rejoin_interval_seconds: default_rejoin_interval_seconds(),
            polling_when_error_seconds: default_polling_when_error_seconds(),
            whitelist_refresh_seconds: default_whitelist_refresh_seconds(),
            source_to_destination: HalfBridgeSettings::default(),
            destination_to_source: HalfBridgeSettings::default(),
        }
    }
}

/// Per-half-bridge cadence settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct HalfBridgeSettings {
    /// Pause between two state-machine steps, in milliseconds.
    #[serde(default = "default_step_duration_millis")]
    pub step_duration_millis: u64,
}

impl Default for HalfBridgeSettings {
    fn default() -> Self {
        Self {
            step_duration_millis: default_step_duration_millis(),
        }
    }
}

impl RelayerConfig {
    /// Checks the timing tolerances. Violations refuse startup.
    pub fn validate(&self) -> Result<()> {
        let bridge = &self.bridge;
        if bridge.interval_for_leader_seconds < 1 {
            return Err(Error::InvalidConfig(
                "interval-for-leader-seconds must be at least 1".into(),
            ));
        }
        if bridge.time_for_bootstrap_millis < 100 {
            return Err(Error::InvalidConfig(
                "time-for-bootstrap-millis must be at least 100".into(),
            ));
        }
        if bridge.rejoin_interval_seconds < 30 {
            return Err(Error::InvalidConfig(
                "rejoin-interval-seconds must be at least 30".into(),
            ));
        }
        if self.relayer.private_key.trim().is_empty() {
            return Err(Error::MissingSecrets);
        }
        Ok(())
    }

    /// Length of one leader window.
    pub fn interval_for_leader(&self) -> Duration {
        Duration::from_secs(self.bridge.interval_for_leader_seconds)
    }

    /// Upper bound waited for a transfer to settle.
    pub fn time_for_transfer_execution(&self) -> Duration {
        Duration::from_secs(self.bridge.time_for_transfer_execution_seconds)
    }

    /// Sleep after messenger bootstrap.
    pub fn time_for_bootstrap(&self) -> Duration {
        Duration::from_millis(self.bridge.time_for_bootstrap_millis)
    }

    /// Interval between join re-broadcasts.
    pub fn rejoin_interval(&self) -> Duration {
        Duration::from_secs(self.bridge.rejoin_interval_seconds)
    }

    /// Backoff applied when a polling iteration errors.
    pub fn polling_when_error(&self) -> Duration {
        Duration::from_secs(self.bridge.polling_when_error_seconds)
    }

    /// Interval between whitelist refreshes.
    pub fn whitelist_refresh(&self) -> Duration {
        Duration::from_secs(self.bridge.whitelist_refresh_seconds)
    }
}

/// Loads the configuration from a file, layered with `JANUS`-prefixed
/// environment variables, and validates it.
pub fn load<P: AsRef<Path>>(path: P) -> Result<RelayerConfig> {
    tracing::trace!("loading config from {}", path.as_ref().display());
    let cfg = config::Config::builder()
        .add_source(config::File::from(path.as_ref()))
        .add_source(config::Environment::with_prefix("JANUS").separator("_"))
        .build()?;
    let parsed: RelayerConfig = cfg.try_deserialize()?;
    parsed.validate()?;
    Ok(parsed)
}
