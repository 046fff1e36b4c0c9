// Metric source adapters: one per metric family, each turning a provider
// reading (or failure) into a typed value.

mod counters;
mod sensors;

pub use counters::{CpuLoadAdapter, DiskAdapter, DiskThroughput, MemoryAdapter, bytes_to_mb};
pub use sensors::{CpuTemperatureAdapter, GpuAdapter, GpuReading, SensorRules};

use crate::error::MonitorError;
use crate::models::Metric;

/// A thin wrapper around one metric provider.
///
/// `read` may fail and may block; `sample` is the adapter boundary and never
/// fails: any provider error becomes `None` (unavailable).
pub trait MetricAdapter: Send + Sync + 'static {
    type Output: Send + 'static;

    const METRIC: Metric;

    fn read(&self) -> Result<Self::Output, MonitorError>;

    fn sample(&self) -> Option<Self::Output> {
        match self.read() {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::debug!(metric = %Self::METRIC, error = %e, "metric unavailable");
                None
            }
        }
    }
}
