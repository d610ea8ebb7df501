//! Label typeface: DejaVu Sans, embedded and rasterized with rusttype.
//!
//! Text `size` is the pixel height of the line; the text box starts at the
//! top of the ascent.

use std::sync::OnceLock;

use rusttype::{point, Font, Scale};

static FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");
static FONT: OnceLock<Option<Font<'static>>> = OnceLock::new();

fn font() -> Option<&'static Font<'static>> {
    FONT.get_or_init(|| {
        let font = Font::try_from_bytes(FONT_DATA);
        if font.is_none() {
            log::error!("Embedded label font is unreadable, labels are not drawn");
        }
        font
    })
    .as_ref()
}

/// Width in pixels of `text` drawn at `size`.
pub fn text_width(text: &str, size: f32) -> f32 {
    let Some(font) = font() else {
        return 0.0;
    };
    font.layout(text, Scale::uniform(size), point(0.0, 0.0))
        .last()
        .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
        .unwrap_or(0.0)
}

/// Calls `plot(x, y, coverage)` for every pixel `text` touches, relative to
/// the top-left corner of the text box.
pub fn for_each_pixel(text: &str, size: f32, mut plot: impl FnMut(i64, i64, f32)) {
    let Some(font) = font() else {
        return;
    };
    let scale = Scale::uniform(size);
    let ascent = font.v_metrics(scale).ascent;
    for glyph in font.layout(text, scale, point(0.0, ascent)) {
        if let Some(bb) = glyph.pixel_bounding_box() {
            glyph.draw(|gx, gy, v| {
                plot(bb.min.x as i64 + gx as i64, bb.min.y as i64 + gy as i64, v)
            });
        }
    }
}
