use image::RgbaImage;

use crate::radar::{filter_records, FilterState, Projection, Snapshot, SweepAngle};

use super::font;
use super::frame::{CanvasSize, Color, DrawCommand, Frame, Point};
use super::icons::IconSet;
use super::raster;
use super::trail::{TrailBuffer, TRAIL_WASH};

/// Radius the base sizes below are tuned for; everything scales with the
/// actual radar radius.
const REFERENCE_RADIUS: f32 = 480.0;

const RING_WIDTH: f32 = 4.0;
const AXIS_WIDTH: f32 = 2.0;
const SWEEP_WIDTH: f32 = 4.0;
const MARKER_RADIUS: f32 = 12.0;
const LABEL_SIZE: f32 = 28.0;
const LABEL_OFFSET_X: f32 = 22.0;
const NORTH_SIZE: f32 = 36.0;
const COUNTER_SIZE: f32 = 22.0;
const COUNTER_SPACING: f32 = 30.0;
const COUNTER_MARGIN: f32 = 16.0;
const ICON_GAP: f32 = 23.0;

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub projection: Projection,
    pub background: Color,
    pub ring_color: Color,
    pub axis_color: Color,
    pub north_color: Color,
    pub label_color: Color,
    pub sweep_color: Color,
    pub used_color: Color,
    pub unused_color: Color,
    /// Prefix svid labels with the constellation abbreviation.
    pub label_constellation: bool,
    pub draw_icons: bool,
    pub icon_size: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            projection: Projection::Cosine,
            background: Color::rgb(10, 24, 48),
            ring_color: Color::rgb(0xCC, 0xCC, 0xCC),
            axis_color: Color::rgb(0x44, 0x44, 0x44),
            north_color: Color::rgb(0x88, 0x88, 0x88),
            label_color: Color::rgb(0xFF, 0xFF, 0xFF),
            sweep_color: Color::rgb(0x00, 0xFF, 0xFF),
            used_color: Color::rgb(0x4C, 0xAF, 0x50),
            unused_color: Color::rgb(0x88, 0x88, 0x88),
            label_constellation: false,
            draw_icons: false,
            icon_size: 55.0,
        }
    }
}

/// Draws radar frames. Keeps the sweep trail between frames, so one
/// renderer serves one display.
#[derive(Default)]
pub struct RadarRenderer {
    options: RenderOptions,
    trail: TrailBuffer,
}

impl RadarRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            trail: TrailBuffer::default(),
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn trail(&self) -> &TrailBuffer {
        &self.trail
    }

    pub fn render(
        &mut self,
        snapshot: &Snapshot,
        filter: &FilterState,
        sweep: SweepAngle,
        size: CanvasSize,
    ) -> Frame {
        let opts = &self.options;
        let records = filter_records(snapshot.records(), filter);
        let used = records.iter().filter(|r| r.used_in_fix).count();

        let c = size.center();
        let radius = size.radius();
        let unit = radius / REFERENCE_RADIUS;
        let mut commands = Vec::with_capacity(16 + records.len() * 3);

        commands.push(DrawCommand::Fill {
            color: opts.background,
        });

        let angle = sweep.degrees().to_radians() as f32;
        let tip = Point::new(c.x + radius * angle.sin(), c.y - radius * angle.cos());
        self.trail.ensure_size(size);
        self.trail.fade(TRAIL_WASH);
        self.trail.stroke(c, tip, SWEEP_WIDTH * unit, opts.sweep_color);
        commands.push(DrawCommand::Trail);

        for ring in [radius, radius * 2.0 / 3.0, radius / 3.0] {
            commands.push(DrawCommand::Circle {
                center: c,
                radius: ring,
                width: RING_WIDTH * unit,
                color: opts.ring_color,
            });
        }
        commands.push(DrawCommand::Line {
            from: Point::new(c.x, c.y - radius),
            to: Point::new(c.x, c.y + radius),
            width: AXIS_WIDTH * unit,
            color: opts.axis_color,
        });
        commands.push(DrawCommand::Line {
            from: Point::new(c.x - radius, c.y),
            to: Point::new(c.x + radius, c.y),
            width: AXIS_WIDTH * unit,
            color: opts.axis_color,
        });

        let north_size = NORTH_SIZE * unit;
        commands.push(DrawCommand::Text {
            origin: Point::new(
                c.x - font::text_width("N", north_size) / 2.0,
                (c.y - radius - north_size - 4.0 * unit).max(0.0),
            ),
            text: "N".to_string(),
            size: north_size,
            color: opts.north_color,
        });

        for record in &records {
            let (dx, dy) =
                opts.projection
                    .project(record.elevation_deg, record.azimuth_deg, radius as f64);
            let p = Point::new(c.x + dx as f32, c.y + dy as f32);
            let marker = MARKER_RADIUS * unit;

            if record.used_in_fix {
                commands.push(DrawCommand::Disc {
                    center: p,
                    radius: marker,
                    color: opts.used_color,
                });
            } else {
                commands.push(DrawCommand::Triangle {
                    points: vec![
                        Point::new(p.x, p.y - marker),
                        Point::new(p.x - marker, p.y + marker),
                        Point::new(p.x + marker, p.y + marker),
                    ],
                    color: opts.unused_color,
                });
            }

            let label = if opts.label_constellation {
                format!("{}-{}", record.constellation.abbreviation(), record.svid)
            } else {
                record.svid.to_string()
            };
            let label_size = LABEL_SIZE * unit;
            commands.push(DrawCommand::Text {
                origin: Point::new(p.x + LABEL_OFFSET_X * unit, p.y - label_size / 2.0),
                text: label,
                size: label_size,
                color: opts.label_color,
            });

            if opts.draw_icons {
                let icon = opts.icon_size * unit;
                commands.push(DrawCommand::Icon {
                    constellation: record.constellation,
                    origin: Point::new(p.x - icon - ICON_GAP * unit, p.y - icon / 2.0),
                    size: icon,
                });
            }
        }

        // top-left corner stays clear of the disk for any aspect ratio
        let counter_size = COUNTER_SIZE * unit;
        let x = COUNTER_MARGIN * unit;
        let y = COUNTER_MARGIN * unit;
        for (i, text) in [
            format!("VISIBLE: {}", records.len()),
            format!("USED IN FIX: {}", used),
        ]
        .into_iter()
        .enumerate()
        {
            commands.push(DrawCommand::Text {
                origin: Point::new(x, y + i as f32 * COUNTER_SPACING * unit),
                text,
                size: counter_size,
                color: opts.label_color,
            });
        }

        Frame {
            width: size.width,
            height: size.height,
            sweep_deg: sweep.degrees(),
            visible: records.len(),
            used,
            commands,
        }
    }

    pub fn rasterize(&self, frame: &Frame, icons: &IconSet) -> RgbaImage {
        raster::rasterize(frame, &self.trail, icons)
    }
}

#[cfg(test)]
mod test {
    use super::{RadarRenderer, RenderOptions};
    use crate::radar::{apply_status, Constellation, FilterState, RawSatellite, Snapshot, SweepAngle};
    use crate::render::{CanvasSize, DrawCommand, IconSet, Point};
    use image::{Rgba, RgbaImage};

    const SIZE: CanvasSize = CanvasSize {
        width: 400,
        height: 400,
    };

    fn raw(az: f64, el: f64, svid: u32, code: i32, used: bool) -> RawSatellite {
        RawSatellite {
            azimuth_deg: az,
            elevation_deg: el,
            svid,
            constellation: code,
            used_in_fix: used,
        }
    }

    #[test]
    fn empty_snapshot_draws_background_and_zero_counts() {
        let mut renderer = RadarRenderer::default();
        let frame = renderer.render(
            &Snapshot::empty(),
            &FilterState::default(),
            SweepAngle::default(),
            SIZE,
        );
        assert_eq!((frame.visible, frame.used), (0, 0));
        assert_eq!(frame.markers().count(), 0);
        let texts: Vec<&str> = frame.texts().collect();
        assert_eq!(texts, vec!["N", "VISIBLE: 0", "USED IN FIX: 0"]);
        let circles = frame
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Circle { .. }))
            .count();
        assert_eq!(circles, 3);
    }

    #[test]
    fn zenith_satellite_sits_at_center() {
        let filter = FilterState::new([Constellation::Gps], true);
        let snapshot = apply_status(&[raw(0.0, 90.0, 5, 1, true)], &filter);
        let mut renderer = RadarRenderer::default();
        let frame = renderer.render(&snapshot, &filter, SweepAngle::default(), SIZE);

        assert_eq!((frame.visible, frame.used), (1, 1));
        let center = frame
            .markers()
            .find_map(|c| match c {
                DrawCommand::Disc { center, .. } => Some(*center),
                _ => None,
            })
            .unwrap();
        assert!((center.x - 200.0).abs() < 1e-3 && (center.y - 200.0).abs() < 1e-3);
        assert!(frame.texts().any(|t| t == "5"));
    }

    #[test]
    fn unused_satellites_are_triangles() {
        let filter = FilterState::default();
        let snapshot = apply_status(&[raw(90.0, 0.0, 7, 3, false)], &filter);
        let mut renderer = RadarRenderer::new(RenderOptions {
            label_constellation: true,
            ..Default::default()
        });
        let frame = renderer.render(&snapshot, &filter, SweepAngle::default(), SIZE);

        match frame.markers().next() {
            Some(DrawCommand::Triangle { points, .. }) => {
                // horizon, east: on the right rim
                let apex: Point = points[0];
                assert!((apex.x - (200.0 + SIZE.radius())).abs() < 1e-3);
            }
            other => panic!("expected triangle, got {:?}", other),
        }
        assert!(frame.texts().any(|t| t == "GLO-7"));
        assert_eq!((frame.visible, frame.used), (1, 0));
    }

    #[test]
    fn renderer_reapplies_filter() {
        let snapshot = apply_status(
            &[raw(10.0, 10.0, 1, 1, true), raw(20.0, 20.0, 2, 6, false)],
            &FilterState::default(),
        );
        let mut renderer = RadarRenderer::default();
        let frame = renderer.render(
            &snapshot,
            &FilterState::new([], true),
            SweepAngle::default(),
            SIZE,
        );
        assert_eq!(frame.markers().count(), 0);
        assert!(frame.texts().any(|t| t == "VISIBLE: 0"));
        assert!(frame.texts().any(|t| t == "USED IN FIX: 0"));
    }

    #[test]
    fn icons_are_optional() {
        let filter = FilterState::default();
        let snapshot = apply_status(&[raw(45.0, 45.0, 3, 6, true)], &filter);
        let mut renderer = RadarRenderer::new(RenderOptions {
            draw_icons: true,
            ..Default::default()
        });
        let frame = renderer.render(&snapshot, &filter, SweepAngle::new(90.0), SIZE);
        assert!(frame
            .commands
            .iter()
            .any(|c| matches!(c, DrawCommand::Icon { .. })));

        // no icons loaded: marker still drawn
        let img = renderer.rasterize(&frame, &IconSet::default());
        assert_eq!(img.dimensions(), (400, 400));

        let mut icons = IconSet::default();
        icons.insert(
            Constellation::Galileo,
            RgbaImage::from_pixel(16, 16, Rgba([255, 0, 0, 255])),
        );
        let with_icon = renderer.rasterize(&frame, &icons);
        assert_ne!(img, with_icon);
    }

    #[test]
    fn sweep_line_leaves_trail() {
        let mut renderer = RadarRenderer::default();
        let snapshot = Snapshot::empty();
        let filter = FilterState::default();
        // sweep pointing east, sample halfway along the ray
        let frame = renderer.render(&snapshot, &filter, SweepAngle::new(90.0), SIZE);
        let fresh = renderer.trail().image().get_pixel(200 + 90, 200)[1];
        assert!(fresh > 150);

        let img = renderer.rasterize(&frame, &IconSet::default());
        assert!(img.get_pixel(200 + 90, 200)[1] > 100);

        for step in 1..=20 {
            renderer.render(&snapshot, &filter, SweepAngle::new(90.0 + step as f64 * 3.0), SIZE);
        }
        assert!(renderer.trail().image().get_pixel(200 + 90, 200)[1] < fresh);
    }
}
