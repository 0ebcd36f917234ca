//! Time utilities shared by the wire protocol and the simulation core

use chrono::{DateTime, Utc};

/// Milliseconds since the Unix epoch, as f64 so drift arithmetic stays in a
/// single numeric domain.
pub fn epoch_millis(t: DateTime<Utc>) -> f64 {
    t.timestamp_millis() as f64
}

/// Elapsed seconds between two instants (negative if `to` precedes `from`).
pub fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

/// Serde adapter for ISO-8601 timestamps at millisecond precision with a `Z`
/// suffix, the format the server speaks. Parsing accepts any RFC 3339 offset.
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(t: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&t.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Stamp {
        #[serde(with = "iso_millis")]
        at: DateTime<Utc>,
    }

    #[test]
    fn iso_millis_round_trips_to_the_same_instant() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 12, 30, 45).unwrap()
            + chrono::Duration::milliseconds(250);
        let json = serde_json::to_string(&Stamp { at }).unwrap();
        assert!(json.contains("2024-03-07T12:30:45.250Z"));

        let back: Stamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back.at, at);
    }

    #[test]
    fn iso_millis_accepts_offset_timestamps() {
        let back: Stamp =
            serde_json::from_str(r#"{"at":"2024-03-07T13:30:45.250+01:00"}"#).unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 3, 7, 12, 30, 45).unwrap()
            + chrono::Duration::milliseconds(250);
        assert_eq!(back.at, expected);
    }

    #[test]
    fn elapsed_secs_is_signed() {
        let a = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let b = a + chrono::Duration::milliseconds(1500);
        assert_eq!(elapsed_secs(a, b), 1.5);
        assert_eq!(elapsed_secs(b, a), -1.5);
    }
}
