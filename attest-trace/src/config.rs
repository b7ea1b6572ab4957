//! Wrapper configuration.

use attest_codec::METHOD_SEND;
use std::time::Duration;

/// How long a single ledger write may hold up the primary call.
pub const DEFAULT_LOG_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment key overriding [`DEFAULT_LOG_TIMEOUT`], in milliseconds.
pub const LOG_TIMEOUT_ENV: &str = "ATTEST_LOG_TIMEOUT_MS";

/// Settings shared by the outbound and inbound wrappers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceConfig {
    pub(crate) log_timeout: Duration,
    pub(crate) method: String,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            log_timeout: DEFAULT_LOG_TIMEOUT,
            method: METHOD_SEND.to_owned(),
        }
    }
}

impl TraceConfig {
    /// Defaults: 30 s log timeout, `message/send`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, overridden by whatever `lookup` returns for
    /// [`LOG_TIMEOUT_ENV`]. Pass `|k| std::env::var(k).ok()` to read the
    /// process environment. Values that are not a positive integer are
    /// ignored.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        match lookup(LOG_TIMEOUT_ENV).map(|raw| raw.trim().parse::<u64>()) {
            Some(Ok(ms)) if ms > 0 => config.log_timeout = Duration::from_millis(ms),
            Some(_) => tracing::warn!(key = LOG_TIMEOUT_ENV, "ignoring invalid log timeout"),
            None => {}
        }
        config
    }

    /// Override the log timeout.
    #[must_use]
    pub fn log_timeout(mut self, timeout: Duration) -> Self {
        self.log_timeout = timeout;
        self
    }

    /// Override the method name hashed with unary requests. Both sides of
    /// an exchange must agree on it.
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// The configured log timeout.
    pub fn timeout(&self) -> Duration {
        self.log_timeout
    }
}
