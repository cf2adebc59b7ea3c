use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 300;
pub const DEFAULT_MAX_RESULTS: u32 = 20;
pub const DEFAULT_THRESHOLD: f64 = 0.7;

/// Everything a client needs to reach the question-answering service.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    /// Attempt budget of the submit-and-wait path. The polling engine ignores it.
    pub max_attempts: u32,
}

impl ClientSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn polling(&self) -> PollingOptions {
        PollingOptions {
            poll_interval: self.poll_interval,
            max_attempts: self.max_attempts,
        }
    }
}

/// Pacing of the submit-and-wait path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingOptions {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollingOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Retrieval tunables sent with a query. Unset or non-positive values fall
/// back to the service defaults.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QueryOptions {
    pub max_results: Option<u32>,
    pub threshold: Option<f64>,
}

impl QueryOptions {
    pub fn resolved_max_results(&self) -> u32 {
        match self.max_results {
            Some(n) if n > 0 => n,
            _ => DEFAULT_MAX_RESULTS,
        }
    }

    pub fn resolved_threshold(&self) -> f64 {
        match self.threshold {
            Some(t) if t.is_finite() && t > 0.0 => t,
            _ => DEFAULT_THRESHOLD,
        }
    }
}
