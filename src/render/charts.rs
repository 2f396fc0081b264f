//! Chart page: the picker form plus one `<img>` per configured address
//! group. Images are referenced by URL; `/detail` draws them on demand.

use std::fmt::Write;

use crate::config::ChartGroup;
use crate::render::{escape_html, page, picker_form};
use crate::window::ReportWindow;

pub fn chart_image_url(group: &ChartGroup, window: &ReportWindow, width: u32, height: u32) -> String {
    format!(
        "/detail?width={}&height={}&{}&{}",
        width,
        height,
        window.query_fragment(),
        group.filter().query_fragment()
    )
}

pub fn render_chart_page(groups: &[ChartGroup], window: &ReportWindow, width: u32, height: u32) -> String {
    let mut body = String::new();

    body.push_str("  <br>\n");
    body.push_str(&picker_form(window));
    body.push_str("  <br>\n");

    for group in groups {
        let _ = writeln!(body, "  <h3>{}</h3>", escape_html(&group.title));
        let _ = writeln!(
            body,
            "  <img class=\"chart\" src=\"{}\" width=\"{}\" height=\"{}\" alt=\"{}\">",
            escape_html(&chart_image_url(group, window, width, height)),
            width,
            height,
            escape_html(&group.title)
        );
        body.push_str("  <br><br>\n");
    }

    page("Sensor charts", &body)
}
