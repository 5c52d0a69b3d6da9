use crate::client::consts::{DALI_WS_URL, DEFAULT_CAPACITY, DEFAULT_URL};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TransportConfig {
    url: String,
    capacity: usize,
    ping_interval: Option<Duration>,
}

pub struct TransportConfigBuilder {
    config: TransportConfig,
}

impl TransportConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: TransportConfig::new(),
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.config.url = url.to_string();
        self
    }

    /// Bound of the outbound frame queue.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity.max(1);
        self
    }

    /// Sends an application `ping` frame on this interval while open.
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.config.ping_interval = Some(interval).filter(|i| !i.is_zero());
        self
    }

    pub fn build(self) -> TransportConfig {
        self.config
    }
}

impl Default for TransportConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportConfig {
    // Endpoint comes from `DALI_WS_URL` when set.
    pub fn new() -> Self {
        Self {
            url: std::env::var(DALI_WS_URL).unwrap_or_else(|_| DEFAULT_URL.to_string()),
            capacity: DEFAULT_CAPACITY,
            ping_interval: None,
        }
    }

    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::new()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ping_interval(&self) -> Option<Duration> {
        self.ping_interval
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new()
    }
}
