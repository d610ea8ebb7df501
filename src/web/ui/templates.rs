use askama::Template;
use askama_web::WebTemplate;

/// One checkbox of the settings form.
pub struct ConstellationOption {
    pub field: &'static str,
    pub label: &'static str,
    pub checked: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub options: Vec<ConstellationOption>,
    pub show_unused: bool,
    pub visible: usize,
    pub used: usize,
    pub width: u32,
    pub height: u32,
    pub refresh_ms: u64,
    pub listing: String,
}
