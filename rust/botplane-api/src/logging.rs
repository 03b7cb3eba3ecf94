//! Structured logging helpers.
//!
//! Startup is staged; these helpers keep the stages visible and timed in
//! the logs without scattering ad-hoc `tracing::info!` lines around.

use std::time::Instant;

/// Operation timer: logs start on creation, duration on finish.
#[derive(Debug)]
pub struct OpTimer {
    /// Component being timed (e.g. "server", "dispatcher").
    component: String,
    /// Operation being performed (e.g. "startup", "tick").
    operation: String,
    /// Start time.
    start: Instant,
}

impl OpTimer {
    /// Start timing an operation.
    #[must_use]
    pub fn new(component: impl Into<String>, operation: impl Into<String>) -> Self {
        let component = component.into();
        let operation = operation.into();

        tracing::debug!(
            component = %component,
            operation = %operation,
            "Operation started"
        );

        Self {
            component,
            operation,
            start: Instant::now(),
        }
    }

    /// Finish the timer and log the duration.
    pub fn finish(self) {
        let duration_ms = self.start.elapsed().as_millis();

        tracing::info!(
            component = %self.component,
            operation = %self.operation,
            duration_ms = duration_ms,
            "Operation completed"
        );
    }
}

/// Log one numbered initialization step.
#[macro_export]
macro_rules! log_init_step {
    ($step:expr, $total:expr, $name:expr, $detail:expr) => {
        tracing::info!(
            step = $step,
            total = $total,
            "[{}/{}] {} - {}",
            $step,
            $total,
            $name,
            $detail
        );
    };
    ($step:expr, $total:expr, $name:expr) => {
        tracing::info!(step = $step, total = $total, "[{}/{}] {}", $step, $total, $name);
    };
}

/// Log successful completion of a major phase.
#[macro_export]
macro_rules! log_success {
    ($msg:expr) => {
        tracing::info!("✅ {}", $msg);
    };
    ($msg:expr, $($arg:tt)*) => {
        tracing::info!("✅ {}", format!($msg, $($arg)*));
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_timer_records_its_labels() {
        let timer = OpTimer::new("test_component", "test_operation");
        assert_eq!(timer.component, "test_component");
        assert_eq!(timer.operation, "test_operation");
        timer.finish();
    }
}
