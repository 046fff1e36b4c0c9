// Scheduler: drives sampling cycles on a runtime-adjustable cadence.
// Cycles run back to back in one task, never overlapping; the wait between
// them is cancellable by shutdown.

use crate::error::MonitorError;
use crate::feed::{FeedPublisher, FeedReceiver, StopReason};
use crate::models::Snapshot;
use std::future::Future;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tracing::Instrument;

pub const MIN_INTERVAL_SECS: u64 = 1;
pub const MAX_INTERVAL_SECS: u64 = 60;

/// Validated sampling interval (1..=60 seconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingConfig {
    interval_secs: u64,
}

impl SamplingConfig {
    pub fn new(interval_secs: u64) -> Result<Self, MonitorError> {
        if !(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&interval_secs) {
            return Err(MonitorError::ConfigurationOutOfRange {
                requested: interval_secs,
                min: MIN_INTERVAL_SECS,
                max: MAX_INTERVAL_SECS,
            });
        }
        Ok(Self { interval_secs })
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_secs: MIN_INTERVAL_SECS,
        }
    }
}

/// Produces one Snapshot per call. `close` runs once, after the last cycle.
pub trait Collector: Send + 'static {
    fn collect(&mut self) -> impl Future<Output = Snapshot> + Send;

    fn close(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Stopped,
}

/// Handle to a running sampling loop. Dropping it stops the loop as if
/// `shutdown` had been called, without waiting.
pub struct Scheduler {
    config_tx: watch::Sender<SamplingConfig>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<StopReason>,
    feed: FeedPublisher,
}

impl Scheduler {
    /// Starts the loop on the current tokio runtime. The first cycle runs
    /// immediately.
    pub fn start<C: Collector>(collector: C, config: SamplingConfig, feed: FeedPublisher) -> Self {
        let (config_tx, config_rx) = watch::channel(config);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let publisher = feed.clone();
        let handle = tokio::spawn(async move {
            let run = tokio::spawn(run(collector, config_rx, shutdown_rx, publisher.clone()));
            let reason = match run.await {
                Ok(()) => StopReason::Requested,
                Err(e) => {
                    tracing::error!(error = %e, "scheduler loop failed; monitoring stopped");
                    StopReason::TimerFailed(e.to_string())
                }
            };
            publisher.stop(reason.clone());
            reason
        });

        Self {
            config_tx,
            shutdown_tx: Some(shutdown_tx),
            handle,
            feed,
        }
    }

    /// Changes the interval used from the next wait on. Out-of-range values
    /// are rejected and the current interval stays in effect.
    pub fn set_interval(&self, interval_secs: u64) -> Result<(), MonitorError> {
        let config = SamplingConfig::new(interval_secs)?;
        let previous = self.config_tx.send_replace(config);
        if previous != config {
            tracing::info!(
                interval_secs,
                previous_secs = previous.interval_secs(),
                "sampling interval changed"
            );
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        self.config_tx.borrow().interval()
    }

    pub fn state(&self) -> SchedulerState {
        if self.handle.is_finished() {
            SchedulerState::Stopped
        } else {
            SchedulerState::Running
        }
    }

    pub fn subscribe(&self) -> FeedReceiver {
        self.feed.subscribe()
    }

    /// Stops the loop: a pending wait ends at once, an in-flight cycle is
    /// allowed to finish. Returns after the collector has been closed.
    pub async fn shutdown(mut self) -> StopReason {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        match (&mut self.handle).await {
            Ok(reason) => reason,
            Err(e) => StopReason::TimerFailed(e.to_string()),
        }
    }
}

async fn run<C: Collector>(
    mut collector: C,
    mut config_rx: watch::Receiver<SamplingConfig>,
    mut shutdown_rx: oneshot::Receiver<()>,
    feed: FeedPublisher,
) {
    let span = tracing::info_span!("scheduler", interval_secs = tracing::field::Empty);
    async move {
        let initial_secs = config_rx.borrow().interval_secs();
        tracing::Span::current().record("interval_secs", initial_secs);
        tracing::info!("scheduler started");
        loop {
            let cycle_started = Instant::now();
            let snapshot = collector.collect().await;
            feed.publish(snapshot);

            // Read once per wait: a change made during this wait applies to the next one
            let period = config_rx.borrow_and_update().interval();
            tracing::Span::current().record("interval_secs", period.as_secs());
            let deadline = cycle_started + period;
            if deadline <= Instant::now() {
                tracing::debug!(
                    interval_secs = period.as_secs(),
                    "cycle overran interval; next cycle starts immediately"
                );
            }

            tokio::select! {
                biased;
                _ = &mut shutdown_rx => break,
                _ = tokio::time::sleep_until(deadline) => {}
            }
        }
        collector.close();
        tracing::info!("scheduler stopped");
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_config_bounds() {
        assert!(SamplingConfig::new(1).is_ok());
        assert!(SamplingConfig::new(60).is_ok());
        assert_eq!(
            SamplingConfig::new(0),
            Err(MonitorError::ConfigurationOutOfRange {
                requested: 0,
                min: 1,
                max: 60
            })
        );
        assert!(SamplingConfig::new(61).is_err());
    }

    #[test]
    fn sampling_config_default_is_one_second() {
        assert_eq!(SamplingConfig::default().interval(), Duration::from_secs(1));
    }
}
