use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::radar::{FilterState, RawSatellite, Snapshot};
use crate::render::{encode_png, CanvasSize, Frame, RadarRenderer, MAX_CANVAS_SIDE};
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::auth::{Authorized, Configure, PushStatus};
use crate::web::state::AppState;

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct FrameQuery {
    /// Canvas width in pixels, defaults to the configured width.
    pub width: Option<u32>,
    /// Canvas height in pixels, defaults to the configured height.
    pub height: Option<u32>,
}

impl FrameQuery {
    fn canvas(&self, state: &AppState) -> ApiResult<CanvasSize> {
        let width = self.width.unwrap_or(state.config.radar.width);
        let height = self.height.unwrap_or(state.config.radar.height);
        let valid = 1..=MAX_CANVAS_SIDE;
        if !valid.contains(&width) || !valid.contains(&height) {
            return Err(ApiError::Validation(format!(
                "canvas {}x{} outside 1..={}",
                width, height, MAX_CANVAS_SIDE
            )));
        }
        Ok(CanvasSize::new(width, height))
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusAccepted {
    pub satellites: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FilterResponse {
    pub filter: FilterState,
    pub visible: usize,
    pub used: usize,
}

/// Renders the current snapshot on a blocking thread; `finish` runs there
/// too, with the renderer that drew the frame.
async fn render_blocking<T: Send + 'static>(
    state: AppState,
    size: CanvasSize,
    finish: impl FnOnce(&RadarRenderer, Frame) -> T + Send + 'static,
) -> ApiResult<T> {
    tokio::task::spawn_blocking(move || {
        let snapshot = state.manager.snapshot();
        let filter = state.manager.filter();
        state.renderers.with_renderer(size, |renderer| {
            let frame = renderer.render(&snapshot, &filter, state.sweep.angle(), size);
            finish(renderer, frame)
        })
    })
    .await
    .map_err(|_| ApiError::Unavailable("renderer_unavailable"))
}

#[utoipa::path(
    get,
    path = "/api/radar/frame",
    params(FrameQuery),
    responses(
        (status = 200, description = "Display list for the current radar frame", body = Frame),
        (status = 400, description = "Invalid canvas size", body = ErrorResponse)
    ),
    tag = "radar"
)]
pub async fn frame(
    State(state): State<AppState>,
    Query(query): Query<FrameQuery>,
) -> ApiResult<Json<Frame>> {
    let size = query.canvas(&state)?;
    let frame = render_blocking(state, size, |_, frame| frame).await?;
    Ok(Json(frame))
}

#[utoipa::path(
    get,
    path = "/api/radar/frame.png",
    params(FrameQuery),
    responses(
        (status = 200, description = "Rendered radar frame", body = Vec<u8>, content_type = "image/png"),
        (status = 400, description = "Invalid canvas size", body = ErrorResponse),
        (status = 500, description = "Encoding failed", body = ErrorResponse)
    ),
    tag = "radar"
)]
pub async fn frame_png(
    State(state): State<AppState>,
    Query(query): Query<FrameQuery>,
) -> ApiResult<impl IntoResponse> {
    let size = query.canvas(&state)?;
    let icons = state.icons.clone();
    let png = render_blocking(state, size, move |renderer, frame| {
        encode_png(&renderer.rasterize(&frame, &icons))
    })
    .await??;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        png,
    ))
}

#[utoipa::path(
    get,
    path = "/api/radar/snapshot",
    responses(
        (status = 200, description = "Satellites currently shown", body = Snapshot)
    ),
    tag = "radar"
)]
pub async fn snapshot(State(state): State<AppState>) -> Json<Snapshot> {
    Json(state.manager.snapshot().as_ref().clone())
}

#[utoipa::path(
    get,
    path = "/api/radar/report",
    responses(
        (status = 200, description = "Plain-text satellite listing", body = String, content_type = "text/plain")
    ),
    tag = "radar"
)]
pub async fn report(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.manager.listing().to_string(),
    )
}

#[utoipa::path(
    post,
    path = "/api/radar/status",
    request_body = Vec<RawSatellite>,
    security(("api_key" = [])),
    responses(
        (status = 202, description = "Status queued", body = StatusAccepted),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Insufficient permissions"),
        (status = 503, description = "Radar is shutting down", body = ErrorResponse)
    ),
    tag = "radar"
)]
pub async fn push_status(
    State(state): State<AppState>,
    caller: Authorized<PushStatus>,
    Json(raw): Json<Vec<RawSatellite>>,
) -> ApiResult<impl IntoResponse> {
    let satellites = raw.len();
    state
        .status_tx
        .send(raw)
        .await
        .map_err(|_| ApiError::Unavailable("radar_stopped"))?;
    log::debug!("{} pushed {} satellites", caller.key_name, satellites);

    Ok((StatusCode::ACCEPTED, Json(StatusAccepted { satellites })))
}

#[utoipa::path(
    get,
    path = "/api/radar/filter",
    responses(
        (status = 200, description = "Active filter", body = FilterResponse)
    ),
    tag = "radar"
)]
pub async fn get_filter(State(state): State<AppState>) -> Json<FilterResponse> {
    let snapshot = state.manager.snapshot();
    Json(FilterResponse {
        filter: state.manager.filter(),
        visible: snapshot.visible(),
        used: snapshot.used(),
    })
}

#[utoipa::path(
    put,
    path = "/api/radar/filter",
    request_body = FilterState,
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Filter applied and saved", body = FilterResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Insufficient permissions"),
        (status = 500, description = "Filter applied but not saved", body = ErrorResponse)
    ),
    tag = "radar"
)]
pub async fn put_filter(
    State(state): State<AppState>,
    caller: Authorized<Configure>,
    Json(request): Json<FilterState>,
) -> ApiResult<Json<FilterResponse>> {
    log::debug!("{} updates the radar filter", caller.key_name);
    let filter = FilterState::new(request.enabled, request.show_unused);
    let snapshot = state.manager.update_filter(filter)?;
    Ok(Json(FilterResponse {
        filter: state.manager.filter(),
        visible: snapshot.visible(),
        used: snapshot.used(),
    }))
}

#[cfg(test)]
mod test {
    use super::{frame, frame_png, get_filter, push_status, put_filter, report, FrameQuery};
    use crate::radar::{Constellation, FilterState, RawSatellite};
    use crate::web::auth::Authorized;
    use crate::web::test::app_state;
    use axum::extract::{Query, State};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::Json;

    #[tokio::test]
    async fn frame_reflects_current_snapshot() {
        let (state, _rx) = app_state();
        state.manager.apply_status(vec![RawSatellite {
            azimuth_deg: 0.0,
            elevation_deg: 90.0,
            svid: 5,
            constellation: 1,
            used_in_fix: true,
        }]);

        let query = FrameQuery {
            width: Some(200),
            height: Some(100),
        };
        let Json(frame) = frame(State(state.clone()), Query(query)).await.ok().unwrap();
        assert_eq!((frame.width, frame.height), (200, 100));
        assert_eq!((frame.visible, frame.used), (1, 1));

        let bad = FrameQuery {
            width: Some(0),
            height: None,
        };
        assert!(super::frame(State(state), Query(bad)).await.is_err());
    }

    #[tokio::test]
    async fn png_frames_are_opaque() {
        let (state, _rx) = app_state();
        state.manager.apply_status(vec![RawSatellite {
            azimuth_deg: 130.0,
            elevation_deg: 25.0,
            svid: 12,
            constellation: 3,
            used_in_fix: false,
        }]);
        // default size: the display renderer, whose trail builds up
        let mut last = None;
        for _ in 0..30 {
            let response = frame_png(State(state.clone()), Query(FrameQuery::default()))
                .await
                .ok()
                .unwrap()
                .into_response();
            let body = axum::body::to_bytes(response.into_body(), usize::MAX).await;
            last = Some(body.unwrap());
        }
        let img = image::load_from_memory(&last.unwrap()).unwrap().to_rgba8();
        let translucent = img.pixels().filter(|px| px[3] != 255).count();
        assert_eq!(translucent, 0);
    }

    #[tokio::test]
    async fn push_queues_status() {
        let (state, mut rx) = app_state();
        let accepted = push_status(
            State(state.clone()),
            Authorized::new("phone"),
            Json(Vec::new()),
        )
        .await;
        assert!(accepted.is_ok());
        assert_eq!(rx.recv().await, Some(Vec::new()));
    }

    #[tokio::test]
    async fn filter_update_is_visible_through_get() {
        let (state, _rx) = app_state();
        let request = FilterState::new([Constellation::Galileo], false);
        let Json(updated) = put_filter(
            State(state.clone()),
            Authorized::new("admin"),
            Json(request.clone()),
        )
        .await
        .ok()
        .unwrap();
        assert_eq!(updated.filter, request);

        let Json(current) = get_filter(State(state.clone())).await;
        assert_eq!(current.filter, request);

        let body = report(State(state)).await.into_response();
        assert_eq!(body.status(), StatusCode::OK);
    }
}
