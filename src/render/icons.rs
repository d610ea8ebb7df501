use std::collections::HashMap;
use std::path::Path;

use image::{Rgba, RgbaImage};

use crate::radar::Constellation;

/// Constellation badges drawn next to markers. Any of them may be missing.
#[derive(Default)]
pub struct IconSet {
    icons: HashMap<Constellation, RgbaImage>,
}

impl IconSet {
    /// Loads `<name>.png` for every constellation found in `dir`, e.g.
    /// `gps.png` or `unknown.png`. Unreadable files are skipped.
    pub fn load(dir: &Path) -> Self {
        let mut icons = HashMap::new();
        for constellation in Constellation::KNOWN
            .into_iter()
            .chain([Constellation::Unknown])
        {
            let path = dir.join(format!("{}.png", constellation.icon_name()));
            match image::open(&path) {
                Ok(img) => {
                    icons.insert(constellation, circular(img.into_rgba8()));
                }
                Err(e) => log::debug!("No icon for {} at {}: {}", constellation, path.display(), e),
            }
        }
        log::info!("Loaded {} constellation icons from {}", icons.len(), dir.display());
        Self { icons }
    }

    pub fn insert(&mut self, constellation: Constellation, icon: RgbaImage) {
        self.icons.insert(constellation, circular(icon));
    }

    /// Icon for `constellation`, falling back to the unknown badge.
    pub fn get(&self, constellation: Constellation) -> Option<&RgbaImage> {
        self.icons
            .get(&constellation)
            .or_else(|| self.icons.get(&Constellation::Unknown))
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}

/// Crops `img` to the disc inscribed in its shorter side.
fn circular(img: RgbaImage) -> RgbaImage {
    let side = img.width().min(img.height());
    let radius = side as f32 / 2.0;
    let mut out = RgbaImage::new(side, side);
    for (x, y, px) in out.enumerate_pixels_mut() {
        let dx = x as f32 + 0.5 - radius;
        let dy = y as f32 + 0.5 - radius;
        if dx * dx + dy * dy <= radius * radius {
            *px = *img.get_pixel(x, y);
        } else {
            *px = Rgba([0, 0, 0, 0]);
        }
    }
    out
}
