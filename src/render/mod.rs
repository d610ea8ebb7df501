mod error;
mod font;
mod frame;
mod icons;
mod raster;
mod renderer;
mod trail;

pub use error::RenderError;
pub use frame::{CanvasSize, Color, DrawCommand, Frame, Point, MAX_CANVAS_SIDE};
pub use icons::IconSet;
pub use raster::encode_png;
pub use renderer::{RadarRenderer, RenderOptions};
