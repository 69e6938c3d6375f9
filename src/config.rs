//! Client and stream configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for an [`App`](crate::App).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL for the REST API (default: `https://api.twitter.com`).
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base URL for the public streams (default: `https://stream.twitter.com`).
    #[serde(default = "default_stream_url")]
    pub stream_url: String,

    /// Base URL for the user stream (default: `https://userstream.twitter.com`).
    #[serde(default = "default_userstream_url")]
    pub userstream_url: String,

    /// Timeout for bounded REST requests.
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub timeout: Duration,

    /// User agent sent on every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Stream session configuration, shared by the three built-in sessions.
    #[serde(default)]
    pub stream: StreamConfig,
}

fn default_api_url() -> String {
    "https://api.twitter.com".into()
}

fn default_stream_url() -> String {
    "https://stream.twitter.com".into()
}

fn default_userstream_url() -> String {
    "https://userstream.twitter.com".into()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("tweetline/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            stream_url: default_stream_url(),
            userstream_url: default_userstream_url(),
            timeout: default_timeout(),
            user_agent: default_user_agent(),
            stream: StreamConfig::default(),
        }
    }
}

impl ClientConfig {
    /// The token-exchange endpoint derived from the API base URL.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.api_url.trim_end_matches('/'))
    }
}

/// Per-session stream configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Disconnect when no bytes (data or keep-alive) arrive within this window.
    #[serde(default = "default_keepalive_timeout", with = "duration_secs")]
    pub keepalive_timeout: Duration,

    /// Reconnect backoff policy.
    #[serde(default)]
    pub backoff: BackoffConfig,
}

fn default_keepalive_timeout() -> Duration {
    Duration::from_secs(90)
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            keepalive_timeout: default_keepalive_timeout(),
            backoff: BackoffConfig::default(),
        }
    }
}

/// Which backoff track a disconnect falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffClass {
    /// Network-layer failure: linear growth from a small delay.
    Network,
    /// Explicit rate-limit signal: exponential growth from a larger delay.
    RateLimit,
}

/// Reconnect backoff policy for a stream session.
///
/// Defaults follow the platform's published reconnection guidance:
/// network-layer failures back off linearly from 250ms in 250ms steps up
/// to 16s; rate limiting backs off exponentially from 60s, doubling up to
/// 960s. After `max_failures` consecutive failed reconnects the session
/// stops and reports [`StreamError::GaveUp`](crate::StreamError::GaveUp).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// First delay on the network track.
    #[serde(default = "default_network_initial", with = "duration_ms")]
    pub network_initial: Duration,

    /// Linear increment per consecutive failure on the network track.
    #[serde(default = "default_network_step", with = "duration_ms")]
    pub network_step: Duration,

    /// Ceiling for the network track.
    #[serde(default = "default_network_ceiling", with = "duration_ms")]
    pub network_ceiling: Duration,

    /// First delay on the rate-limit track.
    #[serde(default = "default_ratelimit_initial", with = "duration_ms")]
    pub ratelimit_initial: Duration,

    /// Ceiling for the rate-limit track.
    #[serde(default = "default_ratelimit_ceiling", with = "duration_ms")]
    pub ratelimit_ceiling: Duration,

    /// Maximum consecutive failed reconnects before giving up.
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,
}

fn default_network_initial() -> Duration {
    Duration::from_millis(250)
}

fn default_network_step() -> Duration {
    Duration::from_millis(250)
}

fn default_network_ceiling() -> Duration {
    Duration::from_secs(16)
}

fn default_ratelimit_initial() -> Duration {
    Duration::from_secs(60)
}

fn default_ratelimit_ceiling() -> Duration {
    Duration::from_secs(960)
}

fn default_max_failures() -> u32 {
    10
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            network_initial: default_network_initial(),
            network_step: default_network_step(),
            network_ceiling: default_network_ceiling(),
            ratelimit_initial: default_ratelimit_initial(),
            ratelimit_ceiling: default_ratelimit_ceiling(),
            max_failures: default_max_failures(),
        }
    }
}

impl BackoffConfig {
    /// Delay before reconnect attempt `attempt` (0-based) on the given track.
    #[must_use]
    pub fn delay_for_attempt(&self, class: BackoffClass, attempt: u32) -> Duration {
        match class {
            BackoffClass::Network => {
                let delay = self.network_initial + self.network_step * attempt;
                delay.min(self.network_ceiling)
            }
            BackoffClass::RateLimit => {
                let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
                let delay = self
                    .ratelimit_initial
                    .checked_mul(factor)
                    .unwrap_or(self.ratelimit_ceiling);
                delay.min(self.ratelimit_ceiling)
            }
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
