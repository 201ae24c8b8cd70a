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

//! # Polling Module
//!
//! Drives a unit of work on a fixed cadence: execute, sleep, repeat. One
//! handler backs each half-bridge state machine, the whitelist refresh and
//! the periodic join re-broadcast. Errors back the loop off for a longer,
//! fixed interval instead of the regular one.

use std::time::Duration;

use crate::context::Shutdown;
use crate::error::Result;

/// A unit of work a [`PollingHandler`] repeatedly executes.
#[async_trait::async_trait]
pub trait PollingExecutor: Send {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Runs one iteration.
    async fn execute(&mut self) -> Result<()>;
}

/// Repeatedly executes its attached [`PollingExecutor`] until shutdown.
#[derive(Debug, Clone, Copy)]
pub struct PollingHandler {
    interval: Duration,
    polling_when_error: Duration,
}

impl PollingHandler {
    /// Creates a handler with the regular `interval` and the longer
    /// `polling_when_error` backoff.
    pub fn new(interval: Duration, polling_when_error: Duration) -> Self {
        Self {
            interval,
            polling_when_error,
        }
    }

    /// Runs the loop. Returns once the shutdown signal fires; the currently
    /// executing iteration is abandoned at its next await point, so no new
    /// work starts after cancellation is observed.
    #[tracing::instrument(skip_all, fields(task = %executor.name()))]
    pub async fn run<E: PollingExecutor>(
        self,
        mut executor: E,
        mut shutdown: Shutdown,
    ) {
        tracing::debug!(
            interval = ?self.interval,
            "polling task started",
        );
        loop {
            let sleep_for = tokio::select! {
                _ = shutdown.recv() => break,
                result = executor.execute() => match result {
                    Ok(()) => self.interval,
                    Err(error) => {
                        tracing::error!(%error, "polling iteration failed");
                        self.polling_when_error
                    }
                },
            };

            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(sleep_for) => {}
            }
        }
        tracing::debug!("polling task stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RelayerContext;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Ticker {
        ticks: Arc<AtomicUsize>,
        fail_every_other: bool,
    }

    #[async_trait::async_trait]
    impl PollingExecutor for Ticker {
        fn name(&self) -> &str {
            "ticker"
        }

        async fn execute(&mut self) -> Result<()> {
            let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
            if self.fail_every_other && tick % 2 == 1 {
                return Err(Error::Generic("tick failed"));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn runs_until_shutdown() {
        let ctx = RelayerContext::for_tests();
        let ticks = Arc::new(AtomicUsize::new(0));
        let handler = PollingHandler::new(
            Duration::from_millis(5),
            Duration::from_millis(5),
        );
        let task = tokio::spawn(handler.run(
            Ticker {
                ticks: ticks.clone(),
                fail_every_other: false,
            },
            ctx.shutdown_signal(),
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        ctx.shutdown();
        task.await.expect("task joins");

        assert!(ticks.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn errors_do_not_stop_the_loop() {
        let ctx = RelayerContext::for_tests();
        let ticks = Arc::new(AtomicUsize::new(0));
        let handler = PollingHandler::new(
            Duration::from_millis(2),
            Duration::from_millis(2),
        );
        let task = tokio::spawn(handler.run(
            Ticker {
                ticks: ticks.clone(),
                fail_every_other: true,
            },
            ctx.shutdown_signal(),
        ));

        tokio::time::sleep(Duration::from_millis(40)).await;
        ctx.shutdown();
        task.await.expect("task joins");

        assert!(ticks.load(Ordering::SeqCst) >= 4);
    }
}
