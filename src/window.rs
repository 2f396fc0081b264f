//! Report window resolution.
//!
//! Turns the optional `sday`/`smonth`/`syear`/`range` request parameters
//! into a `ReportWindow`: local midnight of the resolved date plus a length
//! in days, forming the half-open interval `[start, start + range)`.
//!
//! # Clock injection
//! `resolve_window_at` takes `today` explicitly so tests are deterministic;
//! `resolve_window` reads the local clock.

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};

use crate::model::DashboardError;

/// Range used when the request carries none.
pub const DEFAULT_RANGE_DAYS: u32 = 1;

/// Longest window a request may ask for.
pub const MAX_RANGE_DAYS: u32 = 366;

/// Range choices offered by the picker form, with their labels.
pub const RANGE_CHOICES: &[(u32, &str)] = &[(1, "Day"), (7, "Week"), (31, "Month")];

/// Raw window parameters exactly as they arrived on the query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowParams {
    pub day: Option<String>,
    pub month: Option<String>,
    pub year: Option<String>,
    pub range: Option<String>,
}

/// Request-scoped reporting window.
///
/// Both bounds are computed once at construction, so a window that exists
/// always has a representable end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
    range_days: u32,
}

impl ReportWindow {
    /// `None` when `date + range_days` falls outside the supported calendar.
    pub fn new(date: NaiveDate, range_days: u32) -> Option<Self> {
        let start = date.and_time(NaiveTime::MIN);
        let end = start.checked_add_signed(Duration::days(i64::from(range_days)))?;
        Some(Self { start, end, range_days })
    }

    /// Inclusive lower bound, local midnight.
    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// Exclusive upper bound.
    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn range_days(&self) -> u32 {
        self.range_days
    }

    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn contains(&self, time: NaiveDateTime) -> bool {
        time >= self.start && time < self.end
    }

    /// Query-string fragment that reproduces this window in a link.
    pub fn query_fragment(&self) -> String {
        let date = self.date();
        format!(
            "sday={}&smonth={}&syear={}&range={}",
            date.day(),
            date.month(),
            date.year(),
            self.range_days
        )
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolves a window against the local clock.
pub fn resolve_window(params: &WindowParams) -> Result<ReportWindow, DashboardError> {
    resolve_window_at(params, Local::now().date_naive())
}

/// Resolves a window with each missing date field taken from `today`.
///
/// A supplied field that is not a number, or a supplied combination that is
/// not a real date, fails with `InvalidDate`. When only the day was left to
/// default and today's day does not exist in the requested month, the day is
/// clamped to that month's last day.
pub fn resolve_window_at(
    params: &WindowParams,
    today: NaiveDate,
) -> Result<ReportWindow, DashboardError> {
    let invalid = || DashboardError::InvalidDate {
        day: display_field(&params.day, today.day()),
        month: display_field(&params.month, today.month()),
        year: display_field(&params.year, today.year()),
    };

    let day = parse_field::<u32>(&params.day).map_err(|_| invalid())?;
    let month = parse_field::<u32>(&params.month).map_err(|_| invalid())?;
    let year = parse_field::<i32>(&params.year).map_err(|_| invalid())?;

    let year = year.unwrap_or(today.year());
    let month = month.unwrap_or(today.month());

    let date = match day {
        Some(day) => NaiveDate::from_ymd_opt(year, month, day),
        None => NaiveDate::from_ymd_opt(year, month, today.day())
            .or_else(|| last_day_of_month(year, month)),
    }
    .ok_or_else(invalid)?;

    let range_days = resolve_range(params.range.as_deref())?;

    ReportWindow::new(date, range_days).ok_or_else(invalid)
}

/// Parses `range`, defaulting to one day.
pub fn resolve_range(raw: Option<&str>) -> Result<u32, DashboardError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(DEFAULT_RANGE_DAYS);
    };

    let days: i64 = raw.parse().map_err(|_| DashboardError::InvalidParameter {
        name: "range",
        value: raw.to_string(),
    })?;

    if days < 1 || days > i64::from(MAX_RANGE_DAYS) {
        return Err(DashboardError::InvalidRange(days));
    }

    Ok(days as u32)
}

fn parse_field<T: std::str::FromStr>(raw: &Option<String>) -> Result<Option<T>, ()> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(|_| ()),
    }
}

fn display_field<T: std::fmt::Display>(raw: &Option<String>, fallback: T) -> String {
    match raw.as_deref().map(str::trim) {
        None | Some("") => fallback.to_string(),
        Some(s) => s.to_string(),
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    (28..=31)
        .rev()
        .find_map(|day| NaiveDate::from_ymd_opt(year, month, day))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn params(day: Option<&str>, month: Option<&str>, year: Option<&str>, range: Option<&str>) -> WindowParams {
        WindowParams {
            day: day.map(String::from),
            month: month.map(String::from),
            year: year.map(String::from),
            range: range.map(String::from),
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
        ymd(y, m, d).and_hms_opt(0, 0, 0).unwrap()
    }

    // --- Defaults -----------------------------------------------------------

    #[test]
    fn test_no_parameters_yields_today_one_day() {
        let window = resolve_window_at(&WindowParams::default(), ymd(2024, 6, 1))
            .expect("defaults should resolve");
        assert_eq!(window.start(), midnight(2024, 6, 1));
        assert_eq!(window.end(), midnight(2024, 6, 2));
        assert_eq!(window.range_days(), 1);
    }

    #[test]
    fn test_explicit_week_window() {
        let p = params(Some("15"), Some("3"), Some("2024"), Some("7"));
        let window = resolve_window_at(&p, ymd(2024, 6, 1)).expect("valid date");
        assert_eq!(window.start(), midnight(2024, 3, 15));
        assert_eq!(window.end(), midnight(2024, 3, 22));
    }

    #[test]
    fn test_window_is_half_open_for_each_picker_range() {
        for &(days, _) in RANGE_CHOICES {
            let p = params(Some("31"), Some("1"), Some("2024"), Some(days.to_string().as_str()));
            let window = resolve_window_at(&p, ymd(2024, 6, 1)).expect("valid");
            let end = midnight(2024, 1, 31) + Duration::days(i64::from(days));
            assert_eq!(window.end(), end);
            assert!(window.contains(window.start()), "lower bound is inclusive");
            assert!(!window.contains(end), "upper bound is exclusive");
            assert!(window.contains(end - Duration::seconds(1)));
        }
    }

    #[test]
    fn test_partial_override_combines_with_today() {
        // Only the year is supplied; day and month come from today.
        let p = params(None, None, Some("2023"), None);
        let window = resolve_window_at(&p, ymd(2024, 6, 12)).expect("valid");
        assert_eq!(window.start(), midnight(2023, 6, 12));
    }

    #[test]
    fn test_defaulted_day_is_clamped_to_month_end() {
        // Today is the 31st, requested month is February.
        let p = params(None, Some("2"), Some("2024"), None);
        let window = resolve_window_at(&p, ymd(2024, 3, 31)).expect("clamped");
        assert_eq!(window.start(), midnight(2024, 2, 29));
    }

    #[test]
    fn test_whitespace_and_empty_fields_count_as_missing() {
        let p = params(Some(""), Some(" 4 "), Some("2024"), Some(""));
        let window = resolve_window_at(&p, ymd(2024, 6, 10)).expect("valid");
        assert_eq!(window.start(), midnight(2024, 4, 10));
        assert_eq!(window.range_days(), DEFAULT_RANGE_DAYS);
    }

    // --- Invalid dates ------------------------------------------------------

    #[test]
    fn test_supplied_impossible_date_is_rejected() {
        let p = params(Some("30"), Some("2"), Some("2024"), None);
        let result = resolve_window_at(&p, ymd(2024, 6, 1));
        assert!(
            matches!(result, Err(DashboardError::InvalidDate { .. })),
            "Feb 30 should be rejected, got {:?}",
            result
        );
    }

    #[test]
    fn test_month_out_of_range_is_rejected() {
        let p = params(Some("1"), Some("13"), Some("2024"), None);
        assert!(matches!(
            resolve_window_at(&p, ymd(2024, 6, 1)),
            Err(DashboardError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_non_numeric_day_is_rejected() {
        let p = params(Some("1; drop table samples"), None, None, None);
        match resolve_window_at(&p, ymd(2024, 6, 1)) {
            Err(DashboardError::InvalidDate { day, month, year }) => {
                assert_eq!(day, "1; drop table samples");
                assert_eq!(month, "6");
                assert_eq!(year, "2024");
            }
            other => panic!("expected InvalidDate, got {:?}", other),
        }
    }

    #[test]
    fn test_window_ending_past_the_calendar_is_rejected() {
        let p = params(Some("31"), Some("12"), Some("262142"), Some("7"));
        match resolve_window_at(&p, ymd(2024, 6, 1)) {
            Err(DashboardError::InvalidDate { day, month, year }) => {
                assert_eq!((day.as_str(), month.as_str(), year.as_str()), ("31", "12", "262142"));
            }
            other => panic!("expected InvalidDate, got {:?}", other),
        }
        assert!(ReportWindow::new(NaiveDate::MAX, 1).is_none());
    }

    // --- Range --------------------------------------------------------------

    #[test]
    fn test_range_accepts_values_beyond_picker_choices() {
        assert_eq!(resolve_range(Some("14")).unwrap(), 14);
        assert_eq!(resolve_range(Some("366")).unwrap(), 366);
    }

    #[test]
    fn test_range_rejects_zero_negative_and_oversized() {
        assert!(matches!(resolve_range(Some("0")), Err(DashboardError::InvalidRange(0))));
        assert!(matches!(resolve_range(Some("-7")), Err(DashboardError::InvalidRange(-7))));
        assert!(matches!(resolve_range(Some("367")), Err(DashboardError::InvalidRange(367))));
    }

    #[test]
    fn test_range_rejects_garbage() {
        assert!(matches!(
            resolve_range(Some("week")),
            Err(DashboardError::InvalidParameter { name: "range", .. })
        ));
    }

    #[test]
    fn test_query_fragment_carries_date_and_range() {
        let window = ReportWindow::new(ymd(2024, 3, 15), 7).unwrap();
        assert_eq!(window.query_fragment(), "sday=15&smonth=3&syear=2024&range=7");
    }
}
