use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};

use super::error::RenderError;
use super::font;
use super::frame::{Color, DrawCommand, Frame, Point};
use super::icons::IconSet;
use super::trail::TrailBuffer;

/// Rasterizes `frame`, taking the sweep trail and icons from outside the
/// display list.
pub fn rasterize(frame: &Frame, trail: &TrailBuffer, icons: &IconSet) -> RgbaImage {
    let mut img = RgbaImage::new(frame.width.max(1), frame.height.max(1));

    for command in &frame.commands {
        match command {
            DrawCommand::Fill { color } => fill(&mut img, *color),
            DrawCommand::Trail => {
                if trail.dimensions() == img.dimensions() {
                    composite(&mut img, trail.image(), 0, 0);
                }
            }
            DrawCommand::Circle {
                center,
                radius,
                width,
                color,
            } => stroke_circle(&mut img, *center, *radius, *width, *color),
            DrawCommand::Line {
                from,
                to,
                width,
                color,
            } => draw_line(&mut img, *from, *to, *width, *color),
            DrawCommand::Disc {
                center,
                radius,
                color,
            } => fill_disc(&mut img, *center, *radius, *color),
            DrawCommand::Triangle { points, color } => {
                if let [a, b, c] = points.as_slice() {
                    fill_triangle(&mut img, [*a, *b, *c], *color);
                }
            }
            DrawCommand::Text {
                origin,
                text,
                size,
                color,
            } => draw_text(&mut img, *origin, text, *size, *color),
            DrawCommand::Icon {
                constellation,
                origin,
                size,
            } => {
                if let Some(icon) = icons.get(*constellation) {
                    blit_icon(&mut img, icon, *origin, *size);
                }
            }
        }
    }

    img
}

pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, RenderError> {
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, ImageFormat::Png)?;
    Ok(bytes.into_inner())
}

/// Source-over of `src` with opacity `alpha` (0..1) onto `dst`.
///
/// An opaque destination stays exactly opaque.
fn over(dst: &mut Rgba<u8>, src: [u8; 3], alpha: f32) {
    if alpha <= 0.0 {
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = alpha + da * (1.0 - alpha);
    for i in 0..3 {
        let c = (src[i] as f32 * alpha + dst[i] as f32 * da * (1.0 - alpha)) / out_a;
        dst[i] = c.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Blends `color` at `coverage` (0..1) into one pixel.
fn blend(img: &mut RgbaImage, x: i64, y: i64, color: Color, coverage: f32) {
    if x < 0 || y < 0 || x >= img.width() as i64 || y >= img.height() as i64 {
        return;
    }
    let alpha = color.a as f32 / 255.0 * coverage.clamp(0.0, 1.0);
    over(
        img.get_pixel_mut(x as u32, y as u32),
        [color.r, color.g, color.b],
        alpha,
    );
}

/// Draws `layer` over `img` with its top-left corner at (`x`, `y`).
fn composite(img: &mut RgbaImage, layer: &RgbaImage, x: i64, y: i64) {
    let (w, h) = img.dimensions();
    for (lx, ly, px) in layer.enumerate_pixels() {
        let (tx, ty) = (x + lx as i64, y + ly as i64);
        if tx < 0 || ty < 0 || tx >= w as i64 || ty >= h as i64 {
            continue;
        }
        over(
            img.get_pixel_mut(tx as u32, ty as u32),
            [px[0], px[1], px[2]],
            px[3] as f32 / 255.0,
        );
    }
}

/// Pixel range covering `[lo, hi]`, clipped to `len`.
fn span(lo: f32, hi: f32, len: u32) -> std::ops::Range<i64> {
    let start = (lo.floor() as i64).max(0);
    let end = (hi.ceil() as i64 + 1).min(len as i64);
    start..end.max(start)
}

pub fn fill(img: &mut RgbaImage, color: Color) {
    let alpha = color.a as f32 / 255.0;
    for px in img.pixels_mut() {
        over(px, [color.r, color.g, color.b], alpha);
    }
}

pub fn fill_disc(img: &mut RgbaImage, center: Point, radius: f32, color: Color) {
    let (w, h) = img.dimensions();
    for y in span(center.y - radius - 1.0, center.y + radius + 1.0, h) {
        for x in span(center.x - radius - 1.0, center.x + radius + 1.0, w) {
            let d = distance(pixel_center(x, y), center);
            blend(img, x, y, color, radius + 0.5 - d);
        }
    }
}

pub fn stroke_circle(img: &mut RgbaImage, center: Point, radius: f32, width: f32, color: Color) {
    let (w, h) = img.dimensions();
    let outer = radius + width / 2.0 + 1.0;
    for y in span(center.y - outer, center.y + outer, h) {
        for x in span(center.x - outer, center.x + outer, w) {
            let d = distance(pixel_center(x, y), center);
            blend(img, x, y, color, width / 2.0 + 0.5 - (d - radius).abs());
        }
    }
}

pub fn draw_line(img: &mut RgbaImage, from: Point, to: Point, width: f32, color: Color) {
    let (w, h) = img.dimensions();
    let pad = width / 2.0 + 1.0;
    for y in span(from.y.min(to.y) - pad, from.y.max(to.y) + pad, h) {
        for x in span(from.x.min(to.x) - pad, from.x.max(to.x) + pad, w) {
            let d = segment_distance(pixel_center(x, y), from, to);
            blend(img, x, y, color, width / 2.0 + 0.5 - d);
        }
    }
}

pub fn fill_triangle(img: &mut RgbaImage, pts: [Point; 3], color: Color) {
    let (w, h) = img.dimensions();
    let [a, b, c] = pts;
    let area = edge(a, b, c);
    if area == 0.0 {
        return;
    }
    let min_x = a.x.min(b.x).min(c.x);
    let max_x = a.x.max(b.x).max(c.x);
    let min_y = a.y.min(b.y).min(c.y);
    let max_y = a.y.max(b.y).max(c.y);

    for y in span(min_y, max_y, h) {
        for x in span(min_x, max_x, w) {
            let p = pixel_center(x, y);
            let w0 = edge(b, c, p) / area;
            let w1 = edge(c, a, p) / area;
            let w2 = edge(a, b, p) / area;
            if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                blend(img, x, y, color, 1.0);
            }
        }
    }
}

pub fn draw_text(img: &mut RgbaImage, origin: Point, text: &str, size: f32, color: Color) {
    let (x0, y0) = (origin.x.round() as i64, origin.y.round() as i64);
    font::for_each_pixel(text, size, |x, y, coverage| {
        blend(img, x0 + x, y0 + y, color, coverage)
    });
}

pub fn blit_icon(img: &mut RgbaImage, icon: &RgbaImage, origin: Point, size: f32) {
    let side = size.round().max(1.0) as u32;
    let scaled = imageops::resize(icon, side, side, FilterType::Triangle);
    composite(img, &scaled, origin.x.round() as i64, origin.y.round() as i64);
}

fn pixel_center(x: i64, y: i64) -> Point {
    Point::new(x as f32 + 0.5, y as f32 + 0.5)
}

fn distance(a: Point, b: Point) -> f32 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

fn segment_distance(p: Point, a: Point, b: Point) -> f32 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return distance(p, a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    distance(p, Point::new(a.x + t * dx, a.y + t * dy))
}

fn edge(a: Point, b: Point, p: Point) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

#[cfg(test)]
mod test {
    use super::{draw_line, draw_text, encode_png, fill, fill_disc, fill_triangle, stroke_circle};
    use crate::render::frame::{Color, Point};
    use image::{Rgba, RgbaImage};

    const WHITE: Color = Color::rgb(255, 255, 255);
    const BLACK: Color = Color::rgb(0, 0, 0);

    fn canvas() -> RgbaImage {
        let mut img = RgbaImage::new(40, 40);
        fill(&mut img, BLACK);
        img
    }

    fn lit(img: &RgbaImage, x: u32, y: u32) -> bool {
        img.get_pixel(x, y)[0] > 127
    }

    #[test]
    fn disc_covers_center_only() {
        let mut img = canvas();
        fill_disc(&mut img, Point::new(20.0, 20.0), 5.0, WHITE);
        assert!(lit(&img, 20, 20));
        assert!(lit(&img, 23, 20));
        assert!(!lit(&img, 27, 20));
        assert!(!lit(&img, 0, 0));
    }

    #[test]
    fn circle_is_hollow() {
        let mut img = canvas();
        stroke_circle(&mut img, Point::new(20.0, 20.0), 10.0, 2.0, WHITE);
        assert!(!lit(&img, 20, 20));
        assert!(lit(&img, 29, 19) || lit(&img, 30, 19));
    }

    #[test]
    fn line_and_clipping() {
        let mut img = canvas();
        draw_line(&mut img, Point::new(-10.0, 20.5), Point::new(60.0, 20.5), 2.0, WHITE);
        assert!(lit(&img, 0, 20));
        assert!(lit(&img, 39, 20));
        assert!(!lit(&img, 20, 10));
    }

    #[test]
    fn triangle_either_winding() {
        for pts in [
            [Point::new(20.0, 5.0), Point::new(5.0, 35.0), Point::new(35.0, 35.0)],
            [Point::new(20.0, 5.0), Point::new(35.0, 35.0), Point::new(5.0, 35.0)],
        ] {
            let mut img = canvas();
            fill_triangle(&mut img, pts, WHITE);
            assert!(lit(&img, 20, 25));
            assert!(!lit(&img, 3, 8));
        }
    }

    #[test]
    fn text_lands_in_its_box() {
        let mut img = canvas();
        draw_text(&mut img, Point::new(4.0, 4.0), "N", 20.0, WHITE);
        let lit_in = |xs: std::ops::Range<u32>, ys: std::ops::Range<u32>| {
            ys.clone()
                .flat_map(|y| xs.clone().map(move |x| (x, y)))
                .filter(|&(x, y)| lit(&img, x, y))
                .count()
        };
        assert!(lit_in(4..24, 4..24) > 10);
        assert_eq!(lit_in(28..40, 0..40), 0);
        assert_eq!(lit_in(0..40, 28..40), 0);
    }

    #[test]
    fn blended_pixels_stay_opaque() {
        let mut img = canvas();
        draw_text(&mut img, Point::new(2.0, 2.0), "G07", 13.0, WHITE);
        fill_disc(&mut img, Point::new(20.3, 20.7), 4.2, Color::argb(90, 0, 255, 0));
        draw_line(&mut img, Point::new(0.0, 0.0), Point::new(39.0, 31.0), 1.3, WHITE);
        for _ in 0..30 {
            fill(&mut img, Color::argb(40, 10, 25, 50));
        }
        assert!(img.pixels().all(|px| px[3] == 255));
    }

    #[test]
    fn layers_composite_over_opaque_canvas() {
        let mut img = canvas();
        let mut layer = RgbaImage::new(10, 10);
        fill(&mut layer, Color::argb(77, 0, 255, 255));
        super::composite(&mut img, &layer, 35, -5);
        assert_eq!(img.get_pixel(36, 2)[3], 255);
        assert!(img.get_pixel(36, 2)[1] > 50);
        assert_eq!(*img.get_pixel(30, 2), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn translucent_fill_blends() {
        let mut img = canvas();
        fill(&mut img, Color::argb(128, 255, 255, 255));
        let px = *img.get_pixel(5, 5);
        assert!(px[0] > 100 && px[0] < 160);
        assert_eq!(px, Rgba([px[0], px[0], px[0], 255]));
    }

    #[test]
    fn png_signature() {
        let bytes = encode_png(&canvas()).unwrap();
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
    }
}
