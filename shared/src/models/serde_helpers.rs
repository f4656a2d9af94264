//! Serde helpers for wire-format quirks.

use chrono::{DateTime, Utc};

/// Fixed-width ISO-8601 UTC with millisecond precision.
///
/// Constant width matters: date strings are also secondary-index keys, and
/// the sandwich download compares them lexicographically.
pub const ISO_MILLIS: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Format a timestamp the way it appears on the wire and in index keys.
pub fn to_wire(date: &DateTime<Utc>) -> String {
    date.format(ISO_MILLIS).to_string()
}

/// `DateTime<Utc>` as a fixed-width ISO-8601 string.
pub mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&super::to_wire(date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(de)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| Error::custom(format!("invalid timestamp '{s}': {e}")))
    }
}

/// `Option<DateTime<Utc>>` variant of [`iso_millis`].
pub mod option_iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(
        date: &Option<DateTime<Utc>>,
        ser: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => ser.serialize_some(&super::to_wire(d)),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        de: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let opt = Option::<String>::deserialize(de)?;
        match opt {
            None => Ok(None),
            Some(s) => DateTime::parse_from_rfc3339(&s)
                .map(|d| Some(d.with_timezone(&Utc)))
                .map_err(|e| Error::custom(format!("invalid timestamp '{s}': {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn wire_format_is_fixed_width() {
        let whole = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let sub = whole + chrono::Duration::milliseconds(7);
        let a = to_wire(&whole);
        let b = to_wire(&sub);
        assert_eq!(a.len(), b.len());
        // Lexicographic order agrees with chronological order.
        assert!(a < b);
    }
}
