//! HTML rendering.
//!
//! Pure string builders: no I/O, no store access. Handlers pass in
//! already-loaded data and get a complete page back.
//!
//! Submodules:
//! - `table`: the latest-snapshot status table.
//! - `charts`: the chart page embedding chart images by URL.

pub mod charts;
pub mod table;

use chrono::{Datelike, Month, NaiveDateTime};
use std::fmt::Write;

use crate::model::DashboardError;
use crate::window::{ReportWindow, RANGE_CHOICES};

pub use self::charts::render_chart_page;
pub use self::table::render_table_page;

/// Background of every other table row.
pub const HIGHLIGHT_COLOR: &str = "#83AFFF";

/// Header row background.
pub const HEADER_COLOR: &str = "#000099";

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// e.g. `15. March 2024   10:05`
pub fn pretty_timestamp(time: NaiveDateTime) -> String {
    time.format("%d. %B %Y   %H:%M").to_string()
}

/// Wraps a body fragment in the shared page chrome.
pub fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <title>{title}</title>
    <meta http-equiv="content-type" content="text/html; charset=UTF-8">
    <style type="text/css">
      body {{ font-family: sans-serif; }}
      #aSelect {{ position:static; width:500px; background-color:{highlight}; border:1px solid #804000; padding:10px; border-radius:10px; }}
      nav a {{ margin-right: 1em; }}
    </style>
  </head>
  <body>
    <nav><a href="/">Status</a><a href="/chart">Charts</a></nav>
{body}
  </body>
</html>
"#,
        title = escape_html(title),
        highlight = HIGHLIGHT_COLOR,
        body = body
    )
}

/// GET form with day/month/year/range selects, current values pre-selected.
pub fn picker_form(window: &ReportWindow) -> String {
    let date = window.date();
    let mut html = String::new();

    html.push_str("  <div id=\"aSelect\">\n  <form name=\"navigation\" method=\"get\">\n");
    html.push_str("    Start: ");

    html.push_str("    <select name=\"sday\">\n");
    for day in 1..=31 {
        let _ = writeln!(html, "      {}", option(day, &day.to_string(), day == date.day()));
    }
    html.push_str("    </select>\n");

    html.push_str("    <select name=\"smonth\">\n");
    for month in std::iter::successors(Some(Month::January), |m| Some(m.succ())).take(12) {
        let number = month.number_from_month();
        let _ = writeln!(html, "      {}", option(number, month.name(), number == date.month()));
    }
    html.push_str("    </select>\n");

    html.push_str("    <select name=\"syear\">\n");
    for year in (date.year() - 5)..=(date.year() + 1) {
        let _ = writeln!(html, "      {}", option(year, &year.to_string(), year == date.year()));
    }
    html.push_str("    </select>\n");

    html.push_str("    Range: <select name=\"range\">\n");
    for &(days, label) in RANGE_CHOICES {
        let _ = writeln!(html, "      {}", option(days, label, days == window.range_days()));
    }
    // keep a linked custom range selected so resubmitting does not reset it
    if !RANGE_CHOICES.iter().any(|&(days, _)| days == window.range_days()) {
        let days = window.range_days();
        let _ = writeln!(html, "      {}", option(days, &format!("{} days", days), true));
    }
    html.push_str("    </select>\n");

    html.push_str("    <input type=\"submit\" value=\"Go\">\n  </form>\n  </div>\n");
    html
}

fn option<T: std::fmt::Display>(value: T, label: &str, selected: bool) -> String {
    format!(
        "<option value=\"{}\"{}>{}</option>",
        value,
        if selected { " selected" } else { "" },
        escape_html(label)
    )
}

/// Deterministic error page; the message is the error's `Display`.
pub fn error_page(err: &DashboardError) -> String {
    let heading = match err {
        _ if err.is_client_error() => "Invalid request",
        DashboardError::StoreUnavailable { .. } => "Service unavailable",
        _ => "Internal error",
    };
    page(
        heading,
        &format!(
            "    <h1>{}</h1>\n    <p class=\"error\">{}</p>\n",
            heading,
            escape_html(&err.to_string())
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn test_pretty_timestamp() {
        let t = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(9, 7, 0).unwrap();
        assert_eq!(pretty_timestamp(t), "05. March 2024   09:07");
    }

    #[test]
    fn test_picker_preselects_window() {
        let window = ReportWindow::new(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(), 7).unwrap();
        let html = picker_form(&window);
        assert!(html.contains(r#"<option value="15" selected>15</option>"#));
        assert!(html.contains(r#"<option value="3" selected>March</option>"#));
        assert!(html.contains(r#"<option value="2024" selected>2024</option>"#));
        assert!(html.contains(r#"<option value="7" selected>Week</option>"#));
        assert!(html.contains(r#"<option value="1">Day</option>"#));
        assert_eq!(html.matches(" selected").count(), 4);
        assert!(html.contains(r#"method="get""#));
    }

    #[test]
    fn test_picker_keeps_custom_range_selected() {
        let window = ReportWindow::new(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(), 14).unwrap();
        let html = picker_form(&window);
        assert!(html.contains(r#"<option value="14" selected>14 days</option>"#));
        assert!(html.contains(r#"<option value="7">Week</option>"#));
        assert_eq!(html.matches(" selected").count(), 4);
    }

    #[test]
    fn test_picker_lists_months_in_order() {
        let window = ReportWindow::new(NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(), 1).unwrap();
        let html = picker_form(&window);
        assert!(html.contains(r#"<option value="1">January</option>"#));
        assert!(html.contains(r#"<option value="12" selected>December</option>"#));
        assert!(html.find("January") < html.find("December"));
    }

    #[test]
    fn test_error_page_heading_follows_error_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(error_page(&DashboardError::store("connect", io)).contains("<h1>Service unavailable</h1>"));
        assert!(error_page(&DashboardError::Internal("worker panicked".into())).contains("<h1>Internal error</h1>"));
    }

    #[test]
    fn test_error_page_escapes_message() {
        let err = DashboardError::InvalidParameter { name: "range", value: "<script>".to_string() };
        let html = error_page(&err);
        assert!(html.contains("Invalid request"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }
}
