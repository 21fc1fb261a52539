use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

static SAVED_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"saved-(\d{4})(\d{2})(\d{2})_(\d{2})(\d{2})(\d{2})").expect("timestamp pattern is valid")
});

/// Find the first `saved-YYYYMMDD_HHMMSS` token in `s` and turn it into a
/// calendar timestamp.
///
/// Returns `None` when the token is missing or its digits do not form a real
/// date/time (month 13, day 32, hour 24 and so on).
pub fn extract_timestamp(s: &str) -> Option<NaiveDateTime> {
    let caps = SAVED_TIMESTAMP.captures(s)?;
    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    let year = i32::try_from(num(1)?).ok()?;
    NaiveDate::from_ymd_opt(year, num(2)?, num(3)?)?.and_hms_opt(num(4)?, num(5)?, num(6)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, mi, s).unwrap()
    }

    #[test]
    fn extracts_from_resolved_photo_url() {
        let url = "https://cdn.example.com/photos/2024/saved-20240101_104500.jpg";
        assert_eq!(extract_timestamp(url), Some(ts(2024, 1, 1, 10, 45, 0)));
    }

    #[test]
    fn first_match_wins() {
        let s = "saved-20230505_010203/saved-20240606_040506";
        assert_eq!(extract_timestamp(s), Some(ts(2023, 5, 5, 1, 2, 3)));
    }

    #[test]
    fn missing_marker_is_none() {
        assert_eq!(extract_timestamp("https://example.com/get-photo-url/45964825/"), None);
        assert_eq!(extract_timestamp(""), None);
        assert_eq!(extract_timestamp("20240101_104500"), None);
    }

    #[test]
    fn invalid_calendar_values_are_none() {
        assert_eq!(extract_timestamp("saved-20241301_000000"), None);
        assert_eq!(extract_timestamp("saved-20240132_000000"), None);
        assert_eq!(extract_timestamp("saved-20230229_000000"), None);
        assert_eq!(extract_timestamp("saved-20240101_250000"), None);
        assert_eq!(extract_timestamp("saved-20240101_106000"), None);
    }

    #[test]
    fn leap_day_is_accepted() {
        assert_eq!(extract_timestamp("x_saved-20240229_235959_y"), Some(ts(2024, 2, 29, 23, 59, 59)));
    }

    #[test]
    fn short_tokens_do_not_match() {
        assert_eq!(extract_timestamp("saved-2024011_104500"), None);
        assert_eq!(extract_timestamp("saved-20240101-104500"), None);
    }
}
