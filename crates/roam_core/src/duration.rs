//! Duration text formats
//!
//! Two encodings show up at the edges of the server:
//! - the provider's wire form, seconds with an `s` suffix (`"86400s"`, `"1.5s"`)
//! - ISO-8601 (`"PT86400S"`, `"PT5M"`, `"P1DT2H"`), used for persisted TTLs
//!   and for durations in reference data
//!
//! Both parse into a signed [`chrono::Duration`] with millisecond precision.

use crate::error::{CoreError, CoreResult};
use chrono::Duration;

const MILLIS_PER_SECOND: f64 = 1_000.0;
const MILLIS_PER_MINUTE: f64 = 60_000.0;
const MILLIS_PER_HOUR: f64 = 3_600_000.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;
/// Magnitude past which a millisecond count no longer fits a duration.
const MILLIS_LIMIT: f64 = i64::MAX as f64;

/// Parse an ISO-8601 duration (`PnDTnHnMn.nS`), case-insensitive.
///
/// A leading sign negates the whole value; individual components may also
/// carry their own sign (`PT-5S`).
pub fn parse_iso8601(input: &str) -> CoreResult<Duration> {
    let invalid = || CoreError::InvalidDuration {
        input: input.to_string(),
    };

    let text = input.trim().to_ascii_uppercase();
    let (negate, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(&text)),
    };
    let body = body.strip_prefix('P').ok_or_else(invalid)?;
    let (date, time) = match body.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (body, None),
    };

    let mut millis = 0.0;
    let mut components = 0;

    for (value, unit) in split_components(date).ok_or_else(invalid)? {
        match unit {
            'D' => millis += value * MILLIS_PER_DAY,
            _ => return Err(invalid()),
        }
        components += 1;
    }

    if let Some(time) = time {
        if time.is_empty() {
            return Err(invalid());
        }
        for (value, unit) in split_components(time).ok_or_else(invalid)? {
            match unit {
                'H' => millis += value * MILLIS_PER_HOUR,
                'M' => millis += value * MILLIS_PER_MINUTE,
                'S' => millis += value * MILLIS_PER_SECOND,
                _ => return Err(invalid()),
            }
            components += 1;
        }
    }

    if components == 0 {
        return Err(invalid());
    }
    let millis = if negate { -millis } else { millis };
    from_millis(millis).ok_or_else(invalid)
}

/// Render a duration as `PT<seconds>S`, keeping millisecond precision.
pub fn format_iso8601(duration: Duration) -> String {
    let millis = duration.num_milliseconds();
    let sign = if millis < 0 { "-" } else { "" };
    let abs = millis.unsigned_abs();
    let (seconds, fraction) = (abs / 1_000, abs % 1_000);
    if fraction == 0 {
        format!("PT{sign}{seconds}S")
    } else {
        let fraction = format!("{fraction:03}");
        format!("PT{sign}{seconds}.{}S", fraction.trim_end_matches('0'))
    }
}

/// Parse the provider's wire form: decimal seconds followed by `s`.
pub fn parse_wire_seconds(input: &str) -> CoreResult<Duration> {
    let invalid = || CoreError::InvalidDuration {
        input: input.to_string(),
    };

    let text = input.trim();
    let number = text
        .strip_suffix('s')
        .or_else(|| text.strip_suffix('S'))
        .ok_or_else(invalid)?;
    let seconds: f64 = number.parse().map_err(|_| invalid())?;
    from_millis(seconds * MILLIS_PER_SECOND).ok_or_else(invalid)
}

/// `None` for non-finite values and anything a duration cannot hold.
fn from_millis(millis: f64) -> Option<Duration> {
    let millis = millis.round();
    if !millis.is_finite() || millis.abs() >= MILLIS_LIMIT {
        return None;
    }
    Duration::try_milliseconds(millis as i64)
}

/// Split `1H30M5.5S` into `[(1, 'H'), (30, 'M'), (5.5, 'S')]`.
fn split_components(text: &str) -> Option<Vec<(f64, char)>> {
    let mut out = Vec::new();
    let mut number = String::new();
    for ch in text.chars() {
        if ch.is_ascii_digit() || matches!(ch, '.' | ',' | '-' | '+') {
            number.push(if ch == ',' { '.' } else { ch });
        } else if ch.is_ascii_alphabetic() {
            if number.is_empty() {
                return None;
            }
            out.push((number.parse().ok()?, ch));
            number.clear();
        } else {
            return None;
        }
    }
    number.is_empty().then_some(out)
}

/// Serde adapters storing durations as ISO-8601 text.
pub mod iso8601 {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_iso8601(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_iso8601(&text).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::Duration;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(duration) => {
                    serializer.serialize_str(&super::super::format_iso8601(*duration))
                }
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|text| super::super::parse_iso8601(&text).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
