//! Latest-snapshot status table.
//!
//! One body row per `SnapshotRow`, in the order the store returned them.
//! Odd rows (zero-indexed) get the highlight background. Each sensor title
//! links to the single-sensor chart for the current window.

use std::fmt::Write;

use crate::model::SnapshotRow;
use crate::render::{escape_html, page, picker_form, pretty_timestamp, HEADER_COLOR, HIGHLIGHT_COLOR};
use crate::store::{SampleFilter, TableSnapshot};
use crate::window::ReportWindow;

/// Canvas size of the chart opened from a table row.
pub const DETAIL_WIDTH: u32 = 1200;
pub const DETAIL_HEIGHT: u32 = 600;

pub fn detail_link(row: &SnapshotRow, window: &ReportWindow) -> String {
    format!(
        "/detail?width={}&height={}&{}&{}",
        DETAIL_WIDTH,
        DETAIL_HEIGHT,
        SampleFilter::sensor(row.address, &row.kind).query_fragment(),
        window.query_fragment()
    )
}

/// Renders only the `<table>` element.
pub fn render_table(snapshot: &TableSnapshot, window: &ReportWindow) -> String {
    let mut html = String::new();
    let latest = snapshot.latest.map(pretty_timestamp).unwrap_or_default();

    html.push_str("  <table class=\"snapshot\" width=\"70%\" border=\"1\" cellspacing=\"0\" rules=\"rows\">\n");
    let _ = writeln!(
        html,
        "    <tr style=\"color:white\" bgcolor=\"{}\"><td colspan=\"5\"><center>{}</center></td></tr>",
        HEADER_COLOR, latest
    );
    let _ = writeln!(
        html,
        "    <tr style=\"color:white\" bgcolor=\"{}\"><td>Id</td><td>Type</td><td>Sensor</td><td>Value</td><td>Unit</td></tr>",
        HEADER_COLOR
    );

    for (index, row) in snapshot.rows.iter().enumerate() {
        if index % 2 == 1 {
            let _ = writeln!(html, "    <tr class=\"sample highlight\" bgcolor=\"{}\">", HIGHLIGHT_COLOR);
        } else {
            html.push_str("    <tr class=\"sample\">\n");
        }
        let _ = writeln!(html, "      <td>{}</td>", row.address);
        let _ = writeln!(html, "      <td>{}</td>", escape_html(&row.kind));
        let _ = writeln!(
            html,
            "      <td><a href=\"{}\" target=\"_blank\">{}</a></td>",
            escape_html(&detail_link(row, window)),
            escape_html(&row.title)
        );
        let _ = writeln!(html, "      <td>{}</td>", row.value);
        let _ = writeln!(html, "      <td>{}</td>", escape_html(&row.unit));
        html.push_str("    </tr>\n");
    }

    html.push_str("  </table>\n");
    html
}

/// Full table view: status line, picker form, snapshot table.
pub fn render_table_page(snapshot: &TableSnapshot, window: &ReportWindow) -> String {
    let mut body = String::new();

    if let Some(status) = &snapshot.status_text {
        let _ = writeln!(body, "  <p class=\"status\">Status: {}</p>", escape_html(status));
    }
    body.push_str(&picker_form(window));
    body.push_str("  <br>\n");
    body.push_str(&render_table(snapshot, window));

    page("Sensor status", &body)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
