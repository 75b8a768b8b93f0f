//! Background autosave.
//!
//! A tokio task runs the save body every `interval`. A failed tick is logged
//! and the schedule continues. [`AutoSaver::stop`] signals the task and joins
//! it, so no tick starts after `stop` returns.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::error::Result;

/// Shortest period between ticks; shorter intervals are raised to it.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Boxed future returned by the save body.
pub type SaveFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// Handle to a running autosave task.
#[derive(Debug)]
pub struct AutoSaver {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<u64>,
}

impl AutoSaver {
    /// Spawn the task. The first tick fires one `interval` after start.
    pub fn start<F>(interval: Duration, save: F) -> Self
    where
        F: Fn() -> SaveFuture + Send + Sync + 'static,
    {
        let interval = if interval < MIN_INTERVAL {
            tracing::warn!(?interval, min = ?MIN_INTERVAL, "autosave interval too short, clamping");
            MIN_INTERVAL
        } else {
            interval
        };
        let (shutdown, mut stopped) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks = 0u64;

            loop {
                tokio::select! {
                    biased;
                    _ = stopped.changed() => break,
                    _ = ticker.tick() => {
                        ticks += 1;
                        match save().await {
                            Ok(()) => tracing::debug!(tick = ticks, "autosave completed"),
                            Err(e) => tracing::warn!(tick = ticks, error = %e, "autosave failed"),
                        }
                    }
                }
            }

            ticks
        });

        Self { shutdown, handle }
    }

    /// Stop the task and wait for it. Returns the number of ticks run.
    pub async fn stop(self) -> u64 {
        let _ = self.shutdown.send(true);
        match self.handle.await {
            Ok(ticks) => ticks,
            Err(e) => {
                tracing::warn!(error = %e, "autosave task ended abnormally");
                0
            }
        }
    }
}
