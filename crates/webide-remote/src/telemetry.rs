//! Usage telemetry sink

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Local};
use tracing::{debug, info};

use webide_core::RuntimeType;

/// Histogram of connection attempt results.
pub const CONNECTION_RESULT: &str = "DEVTOOLS_WEBIDE_CONNECTION_RESULT";

/// Timer measuring how long a connection stays up.
pub const CONNECTION_TIME: &str = "DEVTOOLS_WEBIDE_CONNECTION_TIME_SECONDS";

/// Per-runtime-type connection result histogram id.
pub fn connection_result_for(runtime_type: RuntimeType) -> String {
    format!("DEVTOOLS_WEBIDE_{}_CONNECTION_RESULT", runtime_type.as_str())
}

/// Records boolean histograms and timers.
#[cfg_attr(any(test, feature = "test-helpers"), mockall::automock)]
pub trait Telemetry: Send + Sync {
    fn log(&self, histogram: &str, value: bool);

    fn start_timer(&self, timer: &str);

    fn stop_timer(&self, timer: &str);
}

/// Telemetry sink that writes measurements to the tracing log.
#[derive(Debug, Default)]
pub struct TracingTelemetry {
    timers: Mutex<HashMap<String, DateTime<Local>>>,
}

impl TracingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Telemetry for TracingTelemetry {
    fn log(&self, histogram: &str, value: bool) {
        info!(target: "webide::telemetry", histogram, value, "telemetry");
    }

    fn start_timer(&self, timer: &str) {
        self.timers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(timer.to_string(), Local::now());
    }

    fn stop_timer(&self, timer: &str) {
        let started = self
            .timers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(timer);
        match started {
            Some(start) => {
                let seconds = (Local::now() - start).num_seconds();
                info!(target: "webide::telemetry", timer, seconds, "telemetry timer");
            }
            None => debug!("Telemetry timer {} stopped without being started", timer),
        }
    }
}
