/// End-to-end tests for the dashboard routes.
///
/// Each test starts the real router on an ephemeral port, backed by an
/// in-memory store, and talks to it over HTTP. No database needed.
///
/// Run with: cargo test --test dashboard_http

use sensor_dashboard::chart::SvgChart;
use sensor_dashboard::config::DashboardConfig;
use sensor_dashboard::model::{Sample, ValueFact, ValueState};
use sensor_dashboard::store::{MemoryConnector, MemoryStore};
use sensor_dashboard::web::{self, AppState};

use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const MARCH_15: &str = "sday=15&smonth=3&syear=2024";

fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap().and_hms_opt(h, m, 0).unwrap()
}

fn sample(time: NaiveDateTime, address: i32, kind: &str, value: f64, text: Option<&str>) -> Sample {
    Sample { time, address, kind: kind.to_string(), value, text: text.map(String::from) }
}

fn fact(address: i32, kind: &str, title: &str, unit: &str, state: ValueState) -> ValueFact {
    ValueFact {
        address,
        kind: kind.to_string(),
        title: title.to_string(),
        unit: unit.to_string(),
        state,
    }
}

fn fixture() -> MemoryStore {
    MemoryStore::new(
        vec![
            sample(at(9, 0), 0, "VA", 20.0, None),
            sample(at(9, 2), 0, "VA", 22.0, None),
            sample(at(10, 0), 0, "VA", 21.5, None),
            sample(at(10, 0), 1, "UD", 0.0, Some("Heating <day>")),
            sample(at(10, 0), 2, "DO", 1.0, None),
            sample(at(10, 0), 4, "VA", 55.0, None),
            sample(at(10, 0), 9, "VA", 3.0, None),
        ],
        vec![
            fact(0, "VA", "Outside", "°C", ValueState::Active),
            fact(1, "UD", "Status", "", ValueState::Active),
            fact(2, "DO", "Pump", "", ValueState::Active),
            fact(4, "VA", "Boiler", "°C", ValueState::Active),
            fact(9, "VA", "Retired sensor", "°C", ValueState::Inactive),
        ],
    )
}

/// Serves the router on 127.0.0.1 from a background runtime and returns
/// the base url.
fn spawn_server(connector: MemoryConnector) -> String {
    let (tx, rx) = std::sync::mpsc::channel();

    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .expect("Failed to build runtime");

        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("Failed to bind test listener");
            tx.send(listener.local_addr().expect("local addr"))
                .expect("Failed to report address");

            let state = AppState::new(
                Arc::new(connector),
                Arc::new(SvgChart::new()),
                DashboardConfig::default(),
            );
            let _ = web::serve(listener, state).await;
        });
    });

    format!("http://{}", rx.recv().expect("server did not start"))
}

fn get(url: &str) -> (u16, String, String) {
    let response = reqwest::blocking::get(url).expect("request failed");
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = response.text().expect("body");
    (status, content_type, body)
}

// ---------------------------------------------------------------------------
// Table view
// ---------------------------------------------------------------------------

#[test]
fn test_table_shows_latest_snapshot() {
    let base = spawn_server(MemoryConnector::new(fixture()));
    let (status, content_type, body) = get(&format!("{}/?{}", base, MARCH_15));

    assert_eq!(status, 200);
    assert!(content_type.starts_with("text/html"));
    assert!(body.contains("15. March 2024   10:00"), "latest timestamp heading");
    assert!(body.contains("Status: Heating &lt;day&gt;"), "status line is escaped");

    // 0/VA, 1/UD, 2/DO, 4/VA; the inactive sensor is left out
    assert_eq!(body.matches("<tr class=\"sample").count(), 4);
    assert_eq!(body.matches("class=\"sample highlight\"").count(), 2);
    assert!(!body.contains("Retired sensor"));

    let outside = body.find("Outside").expect("Outside row");
    let boiler = body.find("Boiler").expect("Boiler row");
    assert!(outside < boiler, "rows ordered by address");

    assert!(body.contains("<option value=\"15\" selected>15</option>"));
    assert!(body.contains("<option value=\"3\" selected>March</option>"));
}

#[test]
fn test_table_with_empty_store_has_header_only() {
    let base = spawn_server(MemoryConnector::new(MemoryStore::default()));
    let (status, _, body) = get(&format!("{}/", base));

    assert_eq!(status, 200);
    assert!(body.contains("<td>Id</td>"));
    assert!(body.contains("<table class=\"snapshot\""));
    assert!(!body.contains("<tr class=\"sample"));
    assert!(!body.contains("Status:"));
}

#[test]
fn test_invalid_window_parameters_are_rejected() {
    let base = spawn_server(MemoryConnector::new(fixture()));

    for query in [
        "range=0",
        "range=367",
        "range=week",
        "sday=31&smonth=2&syear=2024",
        "smonth=13",
        "syear=soon",
    ] {
        let (status, _, body) = get(&format!("{}/?{}", base, query));
        assert_eq!(status, 400, "query {} should be rejected", query);
        assert!(body.contains("Invalid request"));
    }
}

#[test]
fn test_unreachable_store_is_service_unavailable() {
    let base = spawn_server(MemoryConnector::unavailable());

    let (status, _, body) = get(&format!("{}/", base));
    assert_eq!(status, 503);
    assert!(body.contains("Service unavailable"));

    let (status, _, _) = get(&format!("{}/detail?addresses=0&{}", base, MARCH_15));
    assert_eq!(status, 503);
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------

#[test]
fn test_chart_page_embeds_one_image_per_group() {
    let base = spawn_server(MemoryConnector::unavailable());
    let (status, _, body) = get(&format!("{}/chart?{}&range=7", base, MARCH_15));

    // the chart page itself never touches the store
    assert_eq!(status, 200);
    assert_eq!(body.matches("<img class=\"chart\"").count(), 2);
    assert!(body.contains("addresses=0,1,2,3"));
    assert!(body.contains("addresses=4,5,6,7"));
    assert!(body.contains("range=7"));
}

#[test]
fn test_detail_draws_svg() {
    let base = spawn_server(MemoryConnector::new(fixture()));
    let (status, content_type, body) = get(&format!(
        "{}/detail?address=0&type=VA&width=600&height=300&{}",
        base, MARCH_15
    ));

    assert_eq!(status, 200);
    assert_eq!(content_type, "image/svg+xml");
    assert!(body.starts_with("<svg"));
    assert!(body.contains("width=\"600\""));
    assert_eq!(body.matches("<polyline").count(), 1);
    assert!(body.contains("Outside"));
}

#[test]
fn test_detail_with_no_samples_is_still_an_image() {
    let base = spawn_server(MemoryConnector::new(fixture()));
    let (status, content_type, body) =
        get(&format!("{}/detail?addresses=0&sday=1&smonth=1&syear=2020", base));

    assert_eq!(status, 200);
    assert_eq!(content_type, "image/svg+xml");
    assert!(body.contains("no data"));
}

#[test]
fn test_window_past_the_calendar_is_a_client_error() {
    let base = spawn_server(MemoryConnector::new(fixture()));
    let late = "sday=31&smonth=12&syear=262142&range=7";

    for path in ["/", "/chart", "/detail?addresses=0", "/api/series?addresses=0"] {
        let sep = if path.contains('?') { '&' } else { '?' };
        let (status, _, body) = get(&format!("{}{}{}{}", base, path, sep, late));
        assert_eq!(status, 400, "{} should reject the window", path);
        assert!(body.contains("Invalid request"));
    }
}

#[test]
fn test_detail_parameter_errors() {
    let base = spawn_server(MemoryConnector::new(fixture()));

    for query in ["", "address=0", "address=x&type=VA", "addresses=1,b", "addresses=0&width=9"] {
        let (status, _, _) = get(&format!("{}/detail?{}&{}", base, query, MARCH_15));
        assert_eq!(status, 400, "query '{}' should be rejected", query);
    }
}

#[test]
fn test_series_endpoint_buckets_by_range() {
    let base = spawn_server(MemoryConnector::new(fixture()));

    let (status, content_type, body) =
        get(&format!("{}/api/series?addresses=0,1,2,3&{}", base, MARCH_15));
    assert_eq!(status, 200);
    assert!(content_type.starts_with("application/json"));

    let json: serde_json::Value = serde_json::from_str(&body).expect("valid json");
    assert_eq!(json["start"], "2024-03-15T00:00:00");
    assert_eq!(json["end"], "2024-03-16T00:00:00");
    assert_eq!(json["bucket_minutes"], 5);

    let series = json["series"].as_array().expect("series array");
    let labels: Vec<&str> = series.iter().filter_map(|s| s["label"].as_str()).collect();
    assert_eq!(labels, vec!["Outside", "Status", "Pump"]);

    let outside = series[0]["points"].as_array().expect("points");
    assert_eq!(outside.len(), 2);
    assert_eq!(outside[0]["value"], 21.0);
    assert_eq!(outside[0]["max"], 22.0);

    let (_, _, body) = get(&format!("{}/api/series?addresses=0&range=7&{}", base, MARCH_15));
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid json");
    assert_eq!(json["bucket_minutes"], 60);
    assert_eq!(json["range_days"], 7);
}
