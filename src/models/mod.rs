// Domain models

mod snapshot;

pub use snapshot::{Metric, Snapshot, TOTAL_MEMORY_SENTINEL, memory_used_percent};
