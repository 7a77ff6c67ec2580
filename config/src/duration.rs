//! Duration strings in the `336h`, `1h30m`, `1.5s` form used by relayer configs.

use std::time::Duration;

use crate::ConfigError;

const NANOS_PER_UNIT: &[(&str, u128)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("μs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60 * 1_000_000_000),
    ("h", 60 * 60 * 1_000_000_000),
];

/// Largest representable duration, matching a signed 64-bit nanosecond count
const MAX_NANOS: u128 = i64::MAX as u128;

/// Parse a sequence of decimal numbers each followed by a unit suffix.
///
/// A bare `0` is accepted. Negative durations are rejected since a trusting
/// period must move forward in time.
pub fn parse_duration(input: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidDuration(input.to_string());

    let mut rest = input;
    if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    } else if rest.starts_with('-') {
        return Err(invalid());
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_part, after_int) = rest.split_at(int_len);

        let (frac_part, after_num) = match after_int.strip_prefix('.') {
            Some(after_dot) => {
                let frac_len = after_dot.bytes().take_while(u8::is_ascii_digit).count();
                after_dot.split_at(frac_len)
            }
            None => ("", after_int),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }

        let unit_len = after_num
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() || *c == '.')
            .map(|(i, _)| i)
            .unwrap_or(after_num.len());
        let (unit, remainder) = after_num.split_at(unit_len);
        let scale = NANOS_PER_UNIT
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, nanos)| *nanos)
            .ok_or_else(invalid)?;

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid())?
        };
        let mut nanos = whole.checked_mul(scale).ok_or_else(invalid)?;

        if !frac_part.is_empty() {
            // digits past 1ns resolution carry no weight
            let digits = &frac_part[..frac_part.len().min(18)];
            let numerator: u128 = digits.parse().map_err(|_| invalid())?;
            let denominator = 10u128.pow(digits.len() as u32);
            nanos += numerator * scale / denominator;
        }

        total = total.checked_add(nanos).ok_or_else(invalid)?;
        if total > MAX_NANOS {
            return Err(invalid());
        }
        rest = remainder;
    }

    Ok(Duration::from_nanos(total as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hours() {
        assert_eq!(
            parse_duration("336h").unwrap(),
            Duration::from_secs(336 * 3600)
        );
    }

    #[test]
    fn test_parse_compound() {
        assert_eq!(
            parse_duration("1h30m").unwrap(),
            Duration::from_secs(90 * 60)
        );
        assert_eq!(
            parse_duration("2m3.5s").unwrap(),
            Duration::from_millis(123_500)
        );
    }

    #[test]
    fn test_parse_small_units() {
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("3us").unwrap(), Duration::from_micros(3));
        assert_eq!(parse_duration("3µs").unwrap(), Duration::from_micros(3));
        assert_eq!(parse_duration("7ns").unwrap(), Duration::from_nanos(7));
    }

    #[test]
    fn test_parse_fraction_without_integer() {
        assert_eq!(parse_duration(".5h").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_duration("1.h").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn test_parse_zero() {
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("+0s").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_rejects_malformed() {
        for input in ["", "h", "10", "1x", "-1h", "1h-5m", ".h", "1..5s"] {
            assert!(
                matches!(parse_duration(input), Err(ConfigError::InvalidDuration(_))),
                "accepted {input:?}"
            );
        }
    }

    #[test]
    fn test_rejects_overflow() {
        assert!(parse_duration("9999999999999h").is_err());
    }
}
