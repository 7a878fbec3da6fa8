//! Shared serialization/deserialization utilities for configuration
//!
//! Durations are written as plain integers so TOML files stay readable.
//! Timeouts use whole seconds; backoff delays need sub-second precision
//! and use milliseconds.

/// Serialize a `Duration` as whole seconds (u64)
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Serialize a `Duration` as milliseconds (u64)
pub mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Timeouts {
        #[serde(with = "duration_secs")]
        connect: Duration,
        #[serde(with = "duration_millis")]
        retry: Duration,
    }

    #[test]
    fn test_durations_serialize_as_integers() {
        let timeouts = Timeouts {
            connect: Duration::from_secs(30),
            retry: Duration::from_millis(250),
        };
        let json = serde_json::to_string(&timeouts).unwrap();
        assert_eq!(json, r#"{"connect":30,"retry":250}"#);
    }

    #[test]
    fn test_secs_truncate_subsecond_part() {
        let timeouts = Timeouts {
            connect: Duration::from_millis(1999),
            retry: Duration::from_millis(1999),
        };
        let json = serde_json::to_string(&timeouts).unwrap();
        assert_eq!(json, r#"{"connect":1,"retry":1999}"#);
    }

    #[test]
    fn test_durations_deserialize() {
        let parsed: Timeouts = serde_json::from_str(r#"{"connect":10,"retry":1500}"#).unwrap();
        assert_eq!(parsed.connect, Duration::from_secs(10));
        assert_eq!(parsed.retry, Duration::from_millis(1500));
    }
}
