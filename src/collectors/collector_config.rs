pub const DEFAULT_LATENCY_NAME: &str = "sttp_request_latency";
pub const DEFAULT_IN_PROGRESS_NAME: &str = "sttp_requests_in_progress";
pub const DEFAULT_SUCCESS_COUNTER_NAME: &str = "sttp_requests_success_count";
pub const DEFAULT_ERROR_COUNTER_NAME: &str = "sttp_requests_error_count";
pub const DEFAULT_FAILURE_COUNTER_NAME: &str = "sttp_requests_failure_count";

pub const DEFAULT_LATENCY_BUCKETS: [f64; 14] = [
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

// For a given collector name the set and order of label keys has to be the
// same across every request which maps to it. The registry rejects a second
// registration under the same name with a different label schema.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorConfig {
    pub name: String,
    pub labels: Vec<(String, String)>,
}

impl CollectorConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: Vec::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((key.into(), value.into()));
        self
    }
}

// Buckets apply at the first creation of the name only. Later requests which
// map to the same name reuse the already registered histogram as is.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramCollectorConfig {
    pub name: String,
    pub labels: Vec<(String, String)>,
    pub buckets: Vec<f64>,
}

impl HistogramCollectorConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: Vec::new(),
            buckets: DEFAULT_LATENCY_BUCKETS.to_vec(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((key.into(), value.into()));
        self
    }

    pub fn with_buckets(mut self, buckets: Vec<f64>) -> Self {
        self.buckets = buckets;
        self
    }
}
