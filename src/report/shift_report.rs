use crate::error::{AppError, Result};
use crate::models::{Incident, Shift, TimeRange};
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

/// Separates the category title from its title needle, as in `"Database--db"`
pub const CATEGORY_SEPARATOR: &str = "--";

/// Data handed to a shift report template
#[derive(Debug, Clone, Serialize)]
pub struct ShiftReport {
    pub username: String,
    pub date: String,
    pub start_of_own_shift: String,
    pub end_of_own_shift: String,
    pub incidents: Vec<Incident>,
}

impl ShiftReport {
    pub fn new(username: &str, date: NaiveDate, own_shift: &Shift, incidents: Vec<Incident>) -> Self {
        Self {
            username: username.to_string(),
            date: date.format("%Y-%m-%d").to_string(),
            start_of_own_shift: own_shift.start.to_string(),
            end_of_own_shift: own_shift.end.to_string(),
            incidents,
        }
    }

    /// Window covered by a report day, `00:00:01` to `23:59:59` UTC
    pub fn window(date: NaiveDate) -> Result<TimeRange> {
        let bound = |h, m, s| {
            NaiveTime::from_hms_opt(h, m, s)
                .map(|time| date.and_time(time).and_utc())
                .ok_or_else(|| AppError::Internal(format!("invalid report bound for {}", date)))
        };
        Ok(TimeRange::new(bound(0, 0, 1)?, bound(23, 59, 59)?))
    }

    /// Parse the `YYYY-MM-DD` report date
    pub fn parse_date(value: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
            AppError::Validation(format!(
                "invalid report date {:?}, expected YYYY-MM-DD",
                value
            ))
        })
    }
}

/// Items of a report category split by title
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryMatch<T> {
    pub title: String,
    pub relevant: Vec<T>,
    pub other: Vec<T>,
}

/// Split items for a `"Title--needle"` category.
///
/// Items whose title contains the needle are relevant. Without a separator the
/// whole name is the title and every item is relevant.
pub fn categorize<T, F>(name: &str, items: &[T], title_of: F) -> CategoryMatch<T>
where
    T: Clone,
    F: Fn(&T) -> &str,
{
    let Some((title, needle)) = name.split_once(CATEGORY_SEPARATOR) else {
        return CategoryMatch {
            title: name.to_string(),
            relevant: items.to_vec(),
            other: Vec::new(),
        };
    };

    let (relevant, other) = items
        .iter()
        .cloned()
        .partition(|item| title_of(item).contains(needle));

    CategoryMatch {
        title: title.to_string(),
        relevant,
        other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeOfDay;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_categorize_by_needle() {
        let titles = strings(&["db-1 disk full", "api latency", "db-2 replication lag"]);
        let category = categorize("Database--db-", &titles, String::as_str);

        assert_eq!(category.title, "Database");
        assert_eq!(category.relevant, strings(&["db-1 disk full", "db-2 replication lag"]));
        assert_eq!(category.other, strings(&["api latency"]));
    }

    #[test]
    fn test_categorize_without_separator_keeps_everything() {
        let titles = strings(&["a", "b"]);
        let category = categorize("All incidents", &titles, String::as_str);

        assert_eq!(category.title, "All incidents");
        assert_eq!(category.relevant, titles);
        assert!(category.other.is_empty());
    }

    #[test]
    fn test_report_window() {
        let date = ShiftReport::parse_date("2024-01-15").unwrap();
        let window = ShiftReport::window(date).unwrap();
        assert_eq!(window.start.to_rfc3339(), "2024-01-15T00:00:01+00:00");
        assert_eq!(window.end.to_rfc3339(), "2024-01-15T23:59:59+00:00");
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(matches!(
            ShiftReport::parse_date("15.01.2024"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_report_formats_own_shift() {
        let shift = Shift::new(
            "EU",
            TimeOfDay::new(480).unwrap(),
            TimeOfDay::new(960).unwrap(),
        );
        let date = ShiftReport::parse_date("2024-01-15").unwrap();
        let report = ShiftReport::new("Jane Doe", date, &shift, vec![]);

        assert_eq!(report.date, "2024-01-15");
        assert_eq!(report.start_of_own_shift, "08:00");
        assert_eq!(report.end_of_own_shift, "16:00");
    }
}
