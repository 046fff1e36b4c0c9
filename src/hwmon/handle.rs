// Lazily opened, process-lifetime handle to the hardware monitor.

use super::HardwareMonitor;
use crate::error::MonitorError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

const PROVIDER: &str = "hardware_monitor";

type Opener = Box<dyn FnOnce() -> Result<Arc<dyn HardwareMonitor>, MonitorError> + Send>;

/// Opens the monitor on first use and caches the outcome. A failed open is
/// cached too: every later `get` returns the same `ProviderInitialization`
/// error without retrying. `close` runs the monitor's close at most once and
/// makes every later `get` fail.
pub struct HardwareHandle {
    opener: Mutex<Option<Opener>>,
    monitor: OnceLock<Result<Arc<dyn HardwareMonitor>, MonitorError>>,
    closed: AtomicBool,
}

impl HardwareHandle {
    pub fn new<F>(opener: F) -> Self
    where
        F: FnOnce() -> Result<Arc<dyn HardwareMonitor>, MonitorError> + Send + 'static,
    {
        Self {
            opener: Mutex::new(Some(Box::new(opener))),
            monitor: OnceLock::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn get(&self) -> Result<Arc<dyn HardwareMonitor>, MonitorError> {
        if self.is_closed() {
            return Err(MonitorError::unavailable(PROVIDER, "handle closed"));
        }
        match self.monitor.get_or_init(|| self.open()) {
            Ok(monitor) => Ok(monitor.clone()),
            Err(e) => Err(e.clone()),
        }
    }

    fn open(&self) -> Result<Arc<dyn HardwareMonitor>, MonitorError> {
        let opener = self.opener.lock().ok().and_then(|mut guard| guard.take());
        let result = match opener {
            Some(open) => open(),
            None => Err(MonitorError::ProviderInitialization {
                provider: PROVIDER,
                reason: "previous open attempt aborted".into(),
            }),
        };
        match &result {
            Ok(_) => tracing::info!(provider = PROVIDER, "hardware monitor opened"),
            Err(e) => tracing::warn!(
                provider = PROVIDER,
                error = %e,
                "hardware monitor unavailable; temperature and GPU metrics disabled"
            ),
        }
        result
    }

    pub fn is_open(&self) -> bool {
        matches!(self.monitor.get(), Some(Ok(_)))
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(Ok(monitor)) = self.monitor.get() {
            monitor.close();
            tracing::debug!(provider = PROVIDER, "hardware monitor closed");
        }
    }
}

impl Drop for HardwareHandle {
    fn drop(&mut self) {
        self.close();
    }
}
