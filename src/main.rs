//! Dashboard entry point: load config, install logging, serve HTTP.

use anyhow::Result;
use std::sync::Arc;

use sensor_dashboard::chart::SvgChart;
use sensor_dashboard::config::DashboardConfig;
use sensor_dashboard::logging::{self, Component, LogLevel};
use sensor_dashboard::store::PgConnector;
use sensor_dashboard::web::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let config = DashboardConfig::load_or_default();

    logging::init_logger(
        LogLevel::parse(&config.logging.level),
        config.logging.file.as_deref(),
        config.logging.console_timestamps,
    );
    config.log_summary();

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", config.server.bind, e))?;

    let state = AppState::new(
        Arc::new(PgConnector::new(&config.database.url)),
        Arc::new(SvgChart::new()),
        config,
    );

    if let Err(e) = web::serve(listener, state).await {
        logging::error(Component::Http, None, &format!("server stopped: {}", e));
        return Err(e.into());
    }
    Ok(())
}
