/// Millisecond value of 2100-01-01T00:00:00Z. Raw timestamps above this are
/// read as nanoseconds.
pub const NANO_THRESHOLD_MS: f64 = 4_102_444_800_000.0;

const NANOS_PER_MILLI: f64 = 1_000_000.0;

/// Normalizes a raw timestamp of unknown unit to milliseconds.
///
/// Each value is classified on its own: anything strictly above
/// [`NANO_THRESHOLD_MS`] is treated as nanoseconds, everything else as
/// milliseconds already. Non-finite input yields `0.0`.
pub fn to_ms(timestamp: f64) -> f64 {
    if !timestamp.is_finite() {
        return 0.0;
    }
    if timestamp > NANO_THRESHOLD_MS {
        timestamp / NANOS_PER_MILLI
    } else {
        timestamp
    }
}

/// Duration between two raw timestamps in milliseconds, never negative.
pub fn calculate_duration_ms(start: f64, end: f64) -> f64 {
    let duration = to_ms(end) - to_ms(start);
    if duration < 0.0 {
        tracing::trace!(start, end, "clamping negative span duration to zero");
        return 0.0;
    }
    if !duration.is_finite() {
        return 0.0;
    }
    duration
}

pub fn format_duration_ms(ms: f64) -> String {
    if !ms.is_finite() || ms <= 0.0 {
        return "0ms".to_string();
    }
    if ms < 1.0 {
        format!("{:.0}µs", ms * 1000.0)
    } else if ms < 1000.0 {
        format!("{:.2}ms", ms)
    } else {
        format!("{:.2}s", ms / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive_on_millis_side() {
        assert_eq!(to_ms(4_102_444_800_000.0), 4_102_444_800_000.0);
        assert_eq!(to_ms(4_102_444_800_001.0), 4_102_444_800_001.0 / 1_000_000.0);
    }

    #[test]
    fn converts_nanos() {
        assert_eq!(to_ms(1_700_000_000_000_000_000.0), 1_700_000_000_000.0);
        assert_eq!(to_ms(1_700_000_000_123.0), 1_700_000_000_123.0);
    }

    #[test]
    fn non_finite_is_zero() {
        assert_eq!(to_ms(f64::NAN), 0.0);
        assert_eq!(to_ms(f64::INFINITY), 0.0);
        assert_eq!(to_ms(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn duration_clamps_end_before_start() {
        assert_eq!(calculate_duration_ms(100.0, 50.0), 0.0);
        assert_eq!(calculate_duration_ms(50.0, 100.0), 50.0);
    }

    #[test]
    fn duration_mixes_units_per_value() {
        let start = 1_700_000_000_000_000_000.0;
        let end = 1_700_000_000_250_000_000.0;
        assert!((calculate_duration_ms(start, end) - 250.0).abs() < 1e-3);
        assert_eq!(calculate_duration_ms(f64::NAN, 10.0), 10.0);
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration_ms(0.5), "500µs");
        assert_eq!(format_duration_ms(12.0), "12.00ms");
        assert_eq!(format_duration_ms(1500.0), "1.50s");
        assert_eq!(format_duration_ms(-3.0), "0ms");
    }
}
