use axum::{routing::get, routing::post, Router};
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{Config, ConfigError};
use crate::feed::{spawn_feeds, FeedError};
use crate::radar::{RadarManager, RadarService, SweepAnimator, YamlFilterStore};
use crate::render::{CanvasSize, IconSet};

use super::api::radar as radar_handlers;
use super::api_doc::ApiDoc;
use super::state::{AppState, Renderers};
use super::ui::handlers as ui_handlers;

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // UI routes
        .route("/", get(ui_handlers::dashboard))
        .route("/settings", post(ui_handlers::update_settings))
        // Radar API endpoints
        .route("/api/radar/frame", get(radar_handlers::frame))
        .route("/api/radar/frame.png", get(radar_handlers::frame_png))
        .route("/api/radar/snapshot", get(radar_handlers::snapshot))
        .route("/api/radar/report", get(radar_handlers::report))
        .route("/api/radar/status", post(radar_handlers::push_status))
        .route(
            "/api/radar/filter",
            get(radar_handlers::get_filter).put(radar_handlers::put_filter),
        )
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: Config) -> Result<(), ServeError> {
    let bind_addr = config.web.bind.clone();
    let options = config.radar.render_options()?;
    let display = CanvasSize::new(config.radar.width, config.radar.height);
    let icons = match &config.radar.icons_dir {
        Some(dir) => IconSet::load(dir),
        None => IconSet::default(),
    };

    let store = YamlFilterStore::new(config.preferences.path.clone());
    let manager = Arc::new(RadarManager::new(Box::new(store)));
    let animator = SweepAnimator::new(config.sweep.step_deg, config.sweep.interval);
    let mut service = RadarService::new(manager.clone(), animator);
    let status_tx = service.start();
    let feeds = spawn_feeds(&config.feed, &status_tx).await?;

    let state = AppState {
        config: Arc::new(config),
        manager,
        sweep: service.sweep(),
        status_tx,
        renderers: Arc::new(Renderers::new(options, display)),
        icons: Arc::new(icons),
    };

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    for feed in feeds {
        feed.stop().await;
    }
    service.stop().await;
    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}
