//! Wall-clock reads for event timestamps.

use time::OffsetDateTime;

/// Current unix time in milliseconds.
pub fn now_unix_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_millis_resolution() {
        // 2024-01-01T00:00:00Z in unix milliseconds.
        assert!(now_unix_millis() > 1_704_067_200_000);
    }
}
