//! Resilience at the backend boundary.
//!
//! [`ResilientClient`] adds an optional per-call timeout and retry with
//! exponential backoff for transient backend errors. The default policy
//! does neither.

mod client;

pub use client::ResilientClient;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeout and retry settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResiliencePolicy {
    /// Limit for one backend call, e.g. `30s`
    #[serde(with = "duration_str::option", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    /// Retries after the first attempt
    pub max_retries: usize,

    /// First backoff delay, doubled per retry
    #[serde(with = "duration_str")]
    pub initial_backoff: Duration,
}

impl Default for ResiliencePolicy {
    fn default() -> Self {
        Self {
            timeout: None,
            max_retries: 0,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

impl ResiliencePolicy {
    /// Whether wrapping a client changes its behavior at all.
    pub fn is_enabled(&self) -> bool {
        self.timeout.is_some() || self.max_retries > 0
    }
}

/// Durations as humantime strings (`500ms`, `1m 30s`).
mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(d) => super::serialize(d, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| humantime::parse_duration(&raw).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
