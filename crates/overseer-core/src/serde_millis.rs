//! Serde adapter representing `std::time::Duration` as integer milliseconds.
//!
//! For `#[serde(with = "overseer_core::serde_millis")]` fields.

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Serializes a duration as `u64` milliseconds.
pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Deserializes a duration from `u64` milliseconds.
pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
    Ok(Duration::from_millis(u64::deserialize(d)?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "super")]
        d: Duration,
    }

    #[test]
    fn test_roundtrip() {
        let json = serde_json::to_string(&Wrapper {
            d: Duration::from_millis(1234),
        })
        .unwrap();
        assert_eq!(json, r#"{"d":1234}"#);
        let parsed: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.d, Duration::from_millis(1234));
    }
}
