//! HTTP surface.
//!
//! Routes:
//!   GET /            latest snapshot table with status line and picker
//!   GET /chart       picker plus one chart image per configured group
//!   GET /detail      chart image for `address`+`type` or `addresses`
//!   GET /api/series  the series behind a chart, as JSON
//!
//! Window resolution happens on the async side; everything that touches the
//! store runs on a blocking worker with its own store handle, which is
//! dropped before the response is sent.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;

use crate::chart::{self, bucket_minutes, build_series, ChartBackend, ChartRequest, ChartSeries};
use crate::config::DashboardConfig;
use crate::logging::{self, Component};
use crate::model::{DashboardError, SensorKey};
use crate::render::{error_page, render_chart_page, render_table_page};
use crate::store::{load_chart_data, load_table_snapshot, SampleFilter, StoreConnector};
use crate::window::{resolve_window, ReportWindow, WindowParams};

// ---------------------------------------------------------------------------
// State and parameters
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub connector: Arc<dyn StoreConnector>,
    pub charts: Arc<dyn ChartBackend>,
    pub config: Arc<DashboardConfig>,
}

impl AppState {
    pub fn new(
        connector: Arc<dyn StoreConnector>,
        charts: Arc<dyn ChartBackend>,
        config: DashboardConfig,
    ) -> Self {
        Self { connector, charts, config: Arc::new(config) }
    }
}

/// Every query parameter any page understands, unparsed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub sday: Option<String>,
    pub smonth: Option<String>,
    pub syear: Option<String>,
    pub range: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub addresses: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
}

impl PageParams {
    pub fn window_params(&self) -> WindowParams {
        WindowParams {
            day: self.sday.clone(),
            month: self.smonth.clone(),
            year: self.syear.clone(),
            range: self.range.clone(),
        }
    }

    fn filter(&self) -> Result<SampleFilter, DashboardError> {
        SampleFilter::from_params(self.address.as_deref(), self.kind.as_deref(), self.addresses.as_deref())?
            .ok_or(DashboardError::InvalidParameter { name: "addresses", value: String::new() })
    }

    fn chart_request(&self, config: &DashboardConfig, window: ReportWindow) -> Result<ChartRequest, DashboardError> {
        ChartRequest::from_params(
            self.width.as_deref(),
            self.height.as_deref(),
            (config.charts.width, config.charts.height),
            window,
            self.filter()?,
        )
    }
}

#[derive(Debug, Serialize)]
pub struct SeriesResponse {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub range_days: u32,
    pub bucket_minutes: u32,
    pub series: Vec<ChartSeries>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match &self {
            DashboardError::InvalidDate { .. }
            | DashboardError::InvalidRange(_)
            | DashboardError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            DashboardError::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            DashboardError::Chart(_) | DashboardError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Html(error_page(&self))).into_response()
    }
}

/// Runs store-bound work on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T, DashboardError>
where
    F: FnOnce() -> Result<T, DashboardError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| DashboardError::Internal(format!("request worker failed: {}", e)))?
}

fn finish<T: IntoResponse>(route: &str, started: Instant, result: Result<(T, usize), DashboardError>) -> Response {
    match result {
        Ok((response, rows)) => {
            logging::log_request_summary(route, rows, started.elapsed().as_millis());
            response.into_response()
        }
        Err(err) => {
            logging::log_request_failure(route, &err);
            err.into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn table_handler(State(state): State<AppState>, Query(params): Query<PageParams>) -> Response {
    let started = Instant::now();
    let result = async {
        let window = resolve_window(&params.window_params())?;
        let status_key = SensorKey::new(state.config.status.address, &state.config.status.kind);
        let connector = state.connector.clone();

        blocking(move || {
            let mut store = connector.connect()?;
            let snapshot = load_table_snapshot(store.as_mut(), &status_key)?;
            let rows = snapshot.rows.len();
            Ok((Html(render_table_page(&snapshot, &window)), rows))
        })
        .await
    }
    .await;

    finish("/", started, result)
}

async fn chart_page_handler(State(state): State<AppState>, Query(params): Query<PageParams>) -> Response {
    let started = Instant::now();
    let result = (|| -> Result<_, DashboardError> {
        let window = resolve_window(&params.window_params())?;
        let charts = &state.config.charts;
        let width = chart::parse_dimension("width", params.width.as_deref(), charts.width)?;
        let height = chart::parse_dimension("height", params.height.as_deref(), charts.height)?;
        let html = render_chart_page(&charts.groups, &window, width, height);
        Ok((Html(html), charts.groups.len()))
    })();

    finish("/chart", started, result)
}

/// Loads, buckets and returns the series for a chart request.
async fn load_series(state: &AppState, request: &ChartRequest) -> Result<Vec<ChartSeries>, DashboardError> {
    let connector = state.connector.clone();
    let window = request.window;
    let filter = request.filter.clone();

    blocking(move || {
        let mut store = connector.connect()?;
        let data = load_chart_data(store.as_mut(), &window, &filter, bucket_minutes(window.range_days()))?;
        Ok(build_series(&data, &window))
    })
    .await
}

async fn detail_handler(State(state): State<AppState>, Query(params): Query<PageParams>) -> Response {
    let started = Instant::now();
    let result = async {
        let window = resolve_window(&params.window_params())?;
        let request = params.chart_request(&state.config, window)?;
        let series = load_series(&state, &request).await?;
        let points: usize = series.iter().map(|s| s.points.len()).sum();

        let backend = state.charts.clone();
        let image = blocking(move || backend.render(&request, &series)).await?;

        let response = (
            [(header::CONTENT_TYPE, image.content_type), (header::CACHE_CONTROL, "no-cache")],
            image.body,
        );
        Ok::<_, DashboardError>((response, points))
    }
    .await;

    finish("/detail", started, result)
}

async fn series_handler(State(state): State<AppState>, Query(params): Query<PageParams>) -> Response {
    let started = Instant::now();
    let result = async {
        let window = resolve_window(&params.window_params())?;
        let request = params.chart_request(&state.config, window)?;
        let series = load_series(&state, &request).await?;
        let points: usize = series.iter().map(|s| s.points.len()).sum();

        let body = SeriesResponse {
            start: window.start(),
            end: window.end(),
            range_days: window.range_days(),
            bucket_minutes: bucket_minutes(window.range_days()),
            series,
        };
        Ok::<_, DashboardError>((Json(body), points))
    }
    .await;

    finish("/api/series", started, result)
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(table_handler))
        .route("/chart", get(chart_page_handler))
        .route("/detail", get(detail_handler))
        .route("/api/series", get(series_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        logging::info(Component::Http, None, &format!("Dashboard live at http://{}", addr));
    }
    axum::serve(listener, router(state)).await
}
