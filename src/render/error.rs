use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("image encoding error: {0}")]
    Encode(#[from] image::ImageError),
}
