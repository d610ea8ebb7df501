use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

use super::api::error::ErrorResponse;
use super::api::radar::{FilterResponse, FrameQuery, StatusAccepted};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::radar::frame,
        super::api::radar::frame_png,
        super::api::radar::snapshot,
        super::api::radar::report,
        super::api::radar::push_status,
        super::api::radar::get_filter,
        super::api::radar::put_filter,
    ),
    components(
        schemas(
            FilterResponse,
            FrameQuery,
            StatusAccepted,
            ErrorResponse,
            crate::radar::Constellation,
            crate::radar::FilterState,
            crate::radar::RawSatellite,
            crate::radar::SatelliteRecord,
            crate::radar::Snapshot,
            crate::render::Frame,
            crate::render::DrawCommand,
            crate::render::Color,
            crate::render::Point,
        )
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Sky Radar API",
        description = "Live GNSS sky plot: satellite status in, radar frames out",
        version = "0.1.0"
    ),
    tags(
        (name = "radar", description = "Satellite status, filter and rendering")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
