use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
    Form,
};
use serde::Deserialize;

use crate::config::Permission;
use crate::radar::{Constellation, FilterState};
use crate::web::auth::{authorize, AuthError};
use crate::web::state::AppState;

use super::templates::{ConstellationOption, DashboardTemplate};

/// Browser refresh of the radar image; the sweep itself moves faster.
const MIN_REFRESH_MS: u64 = 100;

pub async fn dashboard(State(state): State<AppState>) -> impl IntoResponse {
    let filter = state.manager.filter();
    let snapshot = state.manager.snapshot();
    let refresh_ms = (state.config.sweep.interval.as_millis() as u64).max(MIN_REFRESH_MS);

    DashboardTemplate {
        options: Constellation::KNOWN
            .into_iter()
            .map(|c| ConstellationOption {
                field: c.icon_name(),
                label: c.display_name(),
                checked: filter.is_enabled(c),
            })
            .collect(),
        show_unused: filter.show_unused,
        visible: snapshot.visible(),
        used: snapshot.used(),
        width: state.config.radar.width,
        height: state.config.radar.height,
        refresh_ms,
        listing: state.manager.listing().to_string(),
    }
}

/// Unchecked boxes are absent from the form body.
#[derive(Debug, Default, Deserialize)]
pub struct SettingsForm {
    pub gps: Option<String>,
    pub glonass: Option<String>,
    pub galileo: Option<String>,
    pub beidou: Option<String>,
    pub show_unused: Option<String>,
    /// Key with the `configure` permission.
    #[serde(default)]
    pub api_key: String,
}

impl SettingsForm {
    pub fn to_filter(&self) -> FilterState {
        let enabled = [
            (Constellation::Gps, &self.gps),
            (Constellation::Glonass, &self.glonass),
            (Constellation::Galileo, &self.galileo),
            (Constellation::Beidou, &self.beidou),
        ]
        .into_iter()
        .filter(|(_, field)| field.is_some())
        .map(|(c, _)| c);
        FilterState::new(enabled, self.show_unused.is_some())
    }
}

/// Applies the settings form. Needs the same `configure` key as
/// `PUT /api/radar/filter`.
pub async fn update_settings(
    State(state): State<AppState>,
    Form(form): Form<SettingsForm>,
) -> Result<Redirect, AuthError> {
    let name = authorize(&state.config, form.api_key.trim(), Permission::Configure)?;
    log::debug!("{} updates the radar filter from the dashboard", name);
    if let Err(e) = state.manager.update_filter(form.to_filter()) {
        log::warn!("Radar settings applied but not saved: {}", e);
    }
    Ok(Redirect::to("/"))
}
