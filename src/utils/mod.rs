// utils/mod.rs - Shared infrastructure helpers

pub mod compress;
pub mod credentials;
pub mod rate_limiter;

pub use credentials::Credentials;
pub use rate_limiter::RateLimiter;

/// Parse an exchange numeric string, falling back to 0.0 on garbage.
/// Upstream payloads mix numbers, numeric strings and empty strings.
pub fn parse_f64(s: &str) -> f64 {
    s.trim().parse::<f64>().unwrap_or(0.0)
}

/// Parse an epoch-milliseconds string, 0 on garbage.
pub fn parse_i64(s: &str) -> i64 {
    s.trim().parse::<i64>().unwrap_or(0)
}

/// Parse an RFC3339-ish timestamp string to epoch milliseconds, 0 on failure.
/// Some exchanges emit offsets without a colon ("+0800"), which strict
/// RFC3339 parsing rejects.
pub fn parse_time_ms(s: &str) -> i64 {
    if let Ok(t) = chrono::DateTime::parse_from_rfc3339(s) {
        return t.timestamp_millis();
    }
    if let Ok(t) = chrono::DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.3f%z") {
        return t.timestamp_millis();
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_f64() {
        assert_eq!(parse_f64("1.5"), 1.5);
        assert_eq!(parse_f64(" -0.25 "), -0.25);
        assert_eq!(parse_f64(""), 0.0);
        assert_eq!(parse_f64("abc"), 0.0);
    }

    #[test]
    fn test_parse_i64() {
        assert_eq!(parse_i64("1700000000000"), 1_700_000_000_000);
        assert_eq!(parse_i64(""), 0);
    }

    #[test]
    fn test_parse_time_ms() {
        assert_eq!(parse_time_ms("1970-01-01T00:00:01.000Z"), 1000);
        assert_eq!(parse_time_ms("1970-01-01T08:00:01.000+0800"), 1000);
        assert_eq!(parse_time_ms("not a date"), 0);
    }
}
