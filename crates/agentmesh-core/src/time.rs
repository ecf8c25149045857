//! Timestamp helpers
//!
//! All timestamps in the trust layer are UTC, truncated to microsecond
//! precision at creation so that in-memory values survive the RFC 3339
//! wire encoding without loss.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

/// Current UTC time truncated to microseconds.
pub fn utc_now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// RFC 3339 rendering with exactly microsecond precision and a `Z` suffix.
///
/// This is the timestamp format used in canonical (signable) serializations
/// and on the wire; implementations in other languages must produce the
/// same bytes for the same instant.
pub fn rfc3339_micros(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Serde adapter serializing `DateTime<Utc>` as RFC 3339 with microseconds
pub mod serde_micros {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::rfc3339_micros(ts))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(de::Error::custom)
    }
}

/// Serde adapter for optional timestamps
pub mod serde_micros_opt {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match ts {
            Some(ts) => serializer.serialize_some(&super::rfc3339_micros(ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(de::Error::custom),
            None => Ok(None),
        }
    }
}
