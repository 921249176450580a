use prometheus::{HistogramTimer, IntGauge};

// Produced by the before hook and handed back to exactly one after hook.
// Opaque to callers. For websocket upgrades it is always empty.
#[derive(Debug)]
pub struct RequestMetricsState {
    timer: Option<HistogramTimer>,
    in_progress: Option<IntGauge>,
}

impl RequestMetricsState {
    pub(crate) fn new(timer: Option<HistogramTimer>, in_progress: Option<IntGauge>) -> Self {
        Self { timer, in_progress }
    }

    pub fn empty() -> Self {
        Self {
            timer: None,
            in_progress: None,
        }
    }

    pub(crate) fn complete(self) {
        if let Some(timer) = self.timer {
            timer.observe_duration();
        }

        if let Some(in_progress) = self.in_progress {
            in_progress.dec();
        }
    }
}
