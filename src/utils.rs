use crate::models::SortOrder;

/// Parse ISO8601 date string to Unix timestamp for sorting
pub fn parse_iso8601_to_timestamp(date_str: &str) -> i64 {
    if date_str.is_empty() {
        return 0;
    }

    use chrono::{DateTime, Utc};
    if let Ok(dt) = date_str.parse::<DateTime<Utc>>() {
        return dt.timestamp();
    }

    0
}

/// Integer coercion for count columns: trimmed parse, 0 on anything else.
pub fn parse_count(raw: &str) -> i64 {
    raw.trim().parse::<i64>().unwrap_or(0)
}

/// Float coercion for score columns. NaN and infinities collapse to 0 so no
/// non-finite value survives normalization.
pub fn parse_score(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

pub fn compare_with_order_float(a: f64, b: f64, order: &SortOrder) -> std::cmp::Ordering {
    match order {
        SortOrder::Asc => a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal),
        // Custom-range sorting orders descending within the range
        SortOrder::Desc | SortOrder::Custom => {
            b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
        }
    }
}

pub fn compare_with_order_int(a: i64, b: i64, order: &SortOrder) -> std::cmp::Ordering {
    match order {
        SortOrder::Asc => a.cmp(&b),
        SortOrder::Desc | SortOrder::Custom => b.cmp(&a),
    }
}

pub fn compare_with_order_str(a: &str, b: &str, order: &SortOrder) -> std::cmp::Ordering {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    match order {
        SortOrder::Asc => a.cmp(&b),
        SortOrder::Desc | SortOrder::Custom => b.cmp(&a),
    }
}

pub fn youtube_watch_url(video_id: &str) -> String {
    if video_id.is_empty() {
        return String::new();
    }

    use url::Url;
    match Url::parse_with_params("https://www.youtube.com/watch", &[("v", video_id)]) {
        Ok(url) => url.to_string(),
        Err(_) => format!("https://www.youtube.com/watch?v={video_id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_coercion_defaults_to_zero() {
        assert_eq!(parse_count("100"), 100);
        assert_eq!(parse_count(" 42 "), 42);
        assert_eq!(parse_count("bad"), 0);
        assert_eq!(parse_count(""), 0);
    }

    #[test]
    fn score_coercion_never_produces_nan() {
        assert_eq!(parse_score("45.5"), 45.5);
        assert_eq!(parse_score("NaN"), 0.0);
        assert_eq!(parse_score("inf"), 0.0);
        assert_eq!(parse_score(""), 0.0);
    }

    #[test]
    fn timestamp_parse_handles_garbage() {
        assert!(parse_iso8601_to_timestamp("2024-01-15T10:00:00Z") > 0);
        assert_eq!(parse_iso8601_to_timestamp("not a date"), 0);
        assert_eq!(parse_iso8601_to_timestamp(""), 0);
    }

    #[test]
    fn watch_url_from_id() {
        assert_eq!(
            youtube_watch_url("dQw4w9WgXcQ"),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
        assert_eq!(youtube_watch_url(""), "");
    }
}
