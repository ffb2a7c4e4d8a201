use chrono::{DateTime, SecondsFormat, Utc};

/// Live timer display format: `HH:MM:SS`, hours unbounded.
pub fn format_elapsed(total_seconds: u64) -> String {
    let hrs = total_seconds / 3600;
    let mins = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    format!("{hrs:02}:{mins:02}:{secs:02}")
}

/// Persisted duration format: `HHH:MM`. Accumulation works in whole minutes,
/// so seconds below a full minute are dropped.
pub fn format_duration(total_seconds: u64) -> String {
    format_minutes(total_seconds / 60)
}

pub fn format_minutes(total_minutes: u64) -> String {
    format!("{:03}:{:02}", total_minutes / 60, total_minutes % 60)
}

/// Inverse of [`format_minutes`]. Rejects anything that is not `H:M` with
/// numeric components instead of coercing to zero.
pub fn parse_minutes(value: &str) -> Result<u64, String> {
    let mut split = value.split(':');
    let (Some(hours_str), Some(minutes_str), None) = (split.next(), split.next(), split.next())
    else {
        return Err(format!("duration '{value}' must be HHH:MM"));
    };

    let hours = hours_str
        .parse::<u64>()
        .map_err(|_| format!("duration '{value}' must be HHH:MM"))?;
    let minutes = minutes_str
        .parse::<u64>()
        .map_err(|_| format!("duration '{value}' must be HHH:MM"))?;
    if minutes > 59 {
        return Err(format!("duration '{value}' has minute component > 59"));
    }
    Ok(hours * 60 + minutes)
}

pub fn to_iso(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now_iso() -> String {
    to_iso(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn elapsed_pads_components() {
        assert_eq!(format_elapsed(0), "00:00:00");
        assert_eq!(format_elapsed(125), "00:02:05");
        assert_eq!(format_elapsed(3661), "01:01:01");
    }

    #[test]
    fn elapsed_hours_do_not_wrap_at_24() {
        assert_eq!(format_elapsed(26 * 3600), "26:00:00");
    }

    #[test]
    fn duration_uses_three_digit_hours() {
        assert_eq!(format_duration(0), "000:00");
        assert_eq!(format_duration(125), "000:02");
        assert_eq!(format_duration(3600), "001:00");
        assert_eq!(format_minutes(61), "001:01");
    }

    #[test]
    fn parse_minutes_rejects_malformed_input() {
        assert!(parse_minutes("").is_err());
        assert!(parse_minutes("000").is_err());
        assert!(parse_minutes("0:0:0").is_err());
        assert!(parse_minutes("abc:00").is_err());
        assert!(parse_minutes("000:61").is_err());
    }

    #[test]
    fn to_iso_is_utc_with_z_suffix() {
        let instant = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .expect("valid datetime")
            .with_timezone(&chrono::Utc);
        assert_eq!(to_iso(instant), "2024-01-01T00:00:00.000Z");
    }

    proptest! {
        #[test]
        fn duration_format_shape_and_components(total_seconds in 0u64..10_000_000u64) {
            let formatted = format_duration(total_seconds);
            let (hours_str, minutes_str) = formatted.split_once(':').expect("colon separator");
            prop_assert!(hours_str.len() >= 3);
            prop_assert_eq!(minutes_str.len(), 2);
            if total_seconds / 3600 < 1000 {
                prop_assert_eq!(hours_str.len(), 3);
            }

            let hours: u64 = hours_str.parse().expect("numeric hours");
            let minutes: u64 = minutes_str.parse().expect("numeric minutes");
            prop_assert!(minutes < 60);
            prop_assert_eq!(minutes, (total_seconds / 60) % 60);
            prop_assert_eq!(hours, total_seconds / 3600);
        }

        #[test]
        fn minutes_roundtrip(total_minutes in 0u64..1_000_000u64) {
            let formatted = format_minutes(total_minutes);
            prop_assert_eq!(parse_minutes(&formatted).expect("roundtrip"), total_minutes);
        }
    }
}
