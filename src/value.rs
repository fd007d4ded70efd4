//! Parsing and rendering of raw option values.
//!
//! Every option value is stored as text. These functions turn that text into
//! typed values (and back) for the scalar [`OptionType`](crate::OptionType)s.
//! Rendering always produces text the matching parser accepts.

use std::time::Duration;

use crate::error::ConfError;

const TRUE_TOKENS: [&str; 6] = ["1", "yes", "y", "true", "t", "on"];
const FALSE_TOKENS: [&str; 6] = ["0", "no", "n", "false", "f", "off"];

/// Parse a boolean. Accepts `1 yes y true t on` and `0 no n false f off`,
/// compared case-insensitively.
pub fn parse_bool(raw: &str) -> Result<bool, ConfError> {
    if TRUE_TOKENS.iter().any(|t| raw.eq_ignore_ascii_case(t)) {
        return Ok(true);
    }
    if FALSE_TOKENS.iter().any(|t| raw.eq_ignore_ascii_case(t)) {
        return Ok(false);
    }
    Err(ConfError::InvalidBoolean {
        value: raw.to_string(),
    })
}

/// Parse a signed 64-bit integer.
///
/// Decimal, `0x` hexadecimal, `0o` octal, `0b` binary and C-style leading-zero
/// octal (`0600`) are accepted, each with an optional sign. Digits may be
/// grouped with single underscores (`1_000`, `0x_ff`); an underscore must sit
/// between digits or right after the base prefix.
pub fn parse_int(raw: &str) -> Result<i64, ConfError> {
    let invalid = || ConfError::InvalidNumber {
        value: raw.to_string(),
    };

    let (negative, unsigned) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };

    let (radix, digits) = if let Some(rest) = strip_radix_prefix(unsigned, 'x') {
        (16, rest)
    } else if let Some(rest) = strip_radix_prefix(unsigned, 'o') {
        (8, rest)
    } else if let Some(rest) = strip_radix_prefix(unsigned, 'b') {
        (2, rest)
    } else if unsigned.len() > 1 && unsigned.starts_with('0') {
        (8, &unsigned[1..])
    } else {
        (10, unsigned)
    };

    let digits = if digits.contains('_') {
        if (radix == 10 && digits.starts_with('_')) || digits.ends_with('_') || digits.contains("__") {
            return Err(invalid());
        }
        digits.replace('_', "")
    } else {
        digits.to_string()
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(invalid());
    }

    let magnitude = u64::from_str_radix(&digits, radix).map_err(|_| invalid())?;
    if negative {
        if magnitude > i64::MAX as u64 + 1 {
            return Err(invalid());
        }
        Ok((magnitude as i64).wrapping_neg())
    } else {
        i64::try_from(magnitude).map_err(|_| invalid())
    }
}

fn strip_radix_prefix(s: &str, marker: char) -> Option<&str> {
    let rest = s.strip_prefix('0')?;
    rest.strip_prefix(marker)
        .or_else(|| rest.strip_prefix(marker.to_ascii_uppercase()))
}

/// Parse a floating point number in standard or exponential notation.
pub fn parse_float(raw: &str) -> Result<f64, ConfError> {
    raw.parse::<f64>().map_err(|_| ConfError::InvalidFloat {
        value: raw.to_string(),
    })
}

const NANOS_PER_SEC: u128 = 1_000_000_000;
// Fraction digits beyond this cannot change a nanosecond count.
const MAX_FRACTION_DIGITS: usize = 18;

/// Parse a duration such as `10h6s`, `1.5m` or `300ms`.
///
/// A duration is a sequence of decimal numbers, each with an optional fraction
/// and a mandatory unit: `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`. A bare `0`
/// is accepted. Negative durations are rejected except for `-0`: the result
/// is a [`Duration`], which has no sign.
pub fn parse_duration(raw: &str) -> Result<Duration, ConfError> {
    let invalid = || ConfError::InvalidDuration {
        value: raw.to_string(),
    };

    let (negative, mut rest) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (int_part, after_int) = rest.split_at(int_end);

        let (frac_part, after_number) = match after_int.strip_prefix('.') {
            Some(after_dot) => {
                let frac_end = after_dot
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(after_dot.len());
                after_dot.split_at(frac_end)
            }
            None => ("", after_int),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }

        let unit_end = after_number
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(after_number.len());
        let (unit, remainder) = after_number.split_at(unit_end);

        let unit_nanos: u128 = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => NANOS_PER_SEC,
            "m" => 60 * NANOS_PER_SEC,
            "h" => 3_600 * NANOS_PER_SEC,
            _ => return Err(invalid()),
        };

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid())?
        };
        total = whole
            .checked_mul(unit_nanos)
            .and_then(|n| total.checked_add(n))
            .ok_or_else(invalid)?;

        if !frac_part.is_empty() {
            let mut fraction: u128 = 0;
            let mut scale: u128 = 1;
            for digit in frac_part.bytes().take(MAX_FRACTION_DIGITS) {
                fraction = fraction * 10 + u128::from(digit - b'0');
                scale *= 10;
            }
            total = total
                .checked_add(fraction * unit_nanos / scale)
                .ok_or_else(invalid)?;
        }

        rest = remainder;
    }

    if negative && total != 0 {
        return Err(invalid());
    }

    let secs = u64::try_from(total / NANOS_PER_SEC).map_err(|_| invalid())?;
    Ok(Duration::new(secs, (total % NANOS_PER_SEC) as u32))
}

/// Render a duration in the compact form accepted by [`parse_duration`],
/// e.g. `10h6s` or `1m0.5s`. The zero duration renders as `0s`.
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let nanos = duration.subsec_nanos();
    if total_secs == 0 && nanos == 0 {
        return "0s".to_string();
    }

    let hours = total_secs / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let secs = total_secs % 60;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    if nanos > 0 {
        let fraction = format!("{nanos:09}");
        out.push_str(&format!("{secs}.{}s", fraction.trim_end_matches('0')));
    } else if secs > 0 {
        out.push_str(&format!("{secs}s"));
    }
    out
}

/// Serde helpers for `std::time::Duration` fields, rendered as duration text.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct LogFile {
///     #[serde(with = "unitconf::duration")]
///     max_age: Duration,
/// }
/// ```
pub mod duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    use super::{format_duration, parse_duration};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_duration(&raw).map_err(serde::de::Error::custom)
    }

    /// For `Option<Duration>` fields. Combine with `#[serde(default)]`.
    pub mod option {
        use std::time::Duration;

        use serde::{Deserialize, Deserializer, Serializer};

        use crate::value::{format_duration, parse_duration};

        pub fn serialize<S: Serializer>(
            value: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(d) => serializer.serialize_some(&format_duration(*d)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| parse_duration(&raw).map_err(serde::de::Error::custom))
                .transpose()
        }
    }

    /// For `Vec<Duration>` fields.
    pub mod seq {
        use std::time::Duration;

        use serde::ser::SerializeSeq;
        use serde::{Deserialize, Deserializer, Serializer};

        use crate::value::{format_duration, parse_duration};

        pub fn serialize<S: Serializer>(
            values: &[Duration],
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            let mut seq = serializer.serialize_seq(Some(values.len()))?;
            for d in values {
                seq.serialize_element(&format_duration(*d))?;
            }
            seq.end()
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<Duration>, D::Error> {
            Vec::<String>::deserialize(deserializer)?
                .iter()
                .map(|raw| parse_duration(raw).map_err(serde::de::Error::custom))
                .collect()
        }
    }
}
