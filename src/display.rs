//! Small presentation helpers used by the page templates.

use chrono::{DateTime, TimeZone, Utc};

/// Upper-cases the first character and leaves the rest alone.
pub fn capitalize_first_letter(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Splits post text into paragraphs, one per line.
pub fn paragraphs(text: &str) -> Vec<&str> {
    text.split('\n').map(|line| line.trim_end_matches('\r')).collect()
}

/// Relative time of a millisecond timestamp, e.g. "5 minutes ago".
pub fn time_ago(timestamp_ms: i64, now: DateTime<Utc>) -> String {
    let Some(then) = Utc.timestamp_millis_opt(timestamp_ms).single() else {
        return String::new();
    };
    let seconds = (now - then).num_seconds();
    if seconds < 45 {
        return "just now".to_string();
    }

    const MINUTE: i64 = 60;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;
    const WEEK: i64 = 7 * DAY;
    const MONTH: i64 = 30 * DAY;
    const YEAR: i64 = 365 * DAY;

    let (count, unit) = if seconds < HOUR {
        (seconds as f64 / MINUTE as f64, "minute")
    } else if seconds < DAY {
        (seconds as f64 / HOUR as f64, "hour")
    } else if seconds < WEEK {
        (seconds as f64 / DAY as f64, "day")
    } else if seconds < MONTH {
        (seconds as f64 / WEEK as f64, "week")
    } else if seconds < YEAR {
        (seconds as f64 / MONTH as f64, "month")
    } else {
        (seconds as f64 / YEAR as f64, "year")
    };
    let count = (count.round() as i64).max(1);
    if count == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", count, unit)
    }
}

/// Masonry column counts by viewport width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Breakpoints {
    pub default: usize,
    /// `(max_width, columns)` pairs, narrowest last.
    pub steps: [(u32, usize); 2],
}

/// Three columns, two at 1200px and below, one at 800px and below.
pub const BREAKPOINT_COLUMNS: Breakpoints = Breakpoints {
    default: 3,
    steps: [(1200, 2), (800, 1)],
};

impl Breakpoints {
    /// Every column count a layout can take, widest first.
    pub fn column_counts(&self) -> Vec<usize> {
        let mut counts = vec![self.default];
        for (_, columns) in self.steps {
            if !counts.contains(&columns) {
                counts.push(columns);
            }
        }
        counts
    }
}

/// Distributes items into `columns` columns, item `i` landing in column
/// `i % columns`.
pub fn masonry_columns<T: Clone>(items: &[T], columns: usize) -> Vec<Vec<T>> {
    let columns = columns.max(1);
    let mut out: Vec<Vec<T>> = vec![Vec::new(); columns];
    for (i, item) in items.iter().enumerate() {
        out[i % columns].push(item.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_capitalize_first_letter() {
        assert_eq!(capitalize_first_letter("images"), "Images");
        assert_eq!(capitalize_first_letter(""), "");
        assert_eq!(capitalize_first_letter("éclair"), "Éclair");
    }

    #[test]
    fn test_paragraphs() {
        assert_eq!(paragraphs("a\r\nb\n\nc"), vec!["a", "b", "", "c"]);
    }

    #[test]
    fn test_time_ago() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let ms = |d: Duration| (now - d).timestamp_millis();
        assert_eq!(time_ago(ms(Duration::seconds(10)), now), "just now");
        assert_eq!(time_ago(ms(Duration::seconds(70)), now), "1 minute ago");
        assert_eq!(time_ago(ms(Duration::minutes(5)), now), "5 minutes ago");
        assert_eq!(time_ago(ms(Duration::hours(3)), now), "3 hours ago");
        assert_eq!(time_ago(ms(Duration::days(2)), now), "2 days ago");
        assert_eq!(time_ago(ms(Duration::days(14)), now), "2 weeks ago");
        assert_eq!(time_ago(ms(Duration::days(400)), now), "1 year ago");
        assert_eq!(time_ago(ms(Duration::seconds(-30)), now), "just now");
    }

    #[test]
    fn test_breakpoint_column_counts() {
        assert_eq!(BREAKPOINT_COLUMNS.column_counts(), vec![3, 2, 1]);
        let flat = Breakpoints {
            default: 2,
            steps: [(1200, 2), (800, 1)],
        };
        assert_eq!(flat.column_counts(), vec![2, 1]);
    }

    #[test]
    fn test_masonry_columns_round_robin() {
        let columns = masonry_columns(&[1, 2, 3, 4, 5], 3);
        assert_eq!(columns, vec![vec![1, 4], vec![2, 5], vec![3]]);
        assert_eq!(masonry_columns::<u8>(&[], 0), vec![Vec::<u8>::new()]);
    }
}
