use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use sgp4::{Constants, Elements};

use super::error::FeedError;
use crate::radar::Constellation;

pub struct TleEntry {
    pub name: String,
    pub norad_id: u32,
    pub constellation: Constellation,
    pub svid: u32,
    pub elements: Elements,
    pub constants: Constants,
}

/// Navigation satellites loaded from `.tle`/`.txt` files.
pub struct TleCatalog {
    tle_dir: PathBuf,
    satellites: BTreeMap<u32, TleEntry>,
}

impl TleCatalog {
    pub fn new(tle_dir: PathBuf) -> Self {
        Self {
            tle_dir,
            satellites: BTreeMap::new(),
        }
    }

    pub fn load_all(&mut self) -> Result<(), FeedError> {
        if !self.tle_dir.is_dir() {
            return Err(FeedError::DirectoryNotFound(
                self.tle_dir.display().to_string(),
            ));
        }

        self.satellites.clear();
        for entry in fs::read_dir(&self.tle_dir)? {
            let path = entry?.path();
            let is_tle = path
                .extension()
                .is_some_and(|ext| ext == "tle" || ext == "txt");
            if !path.is_file() || !is_tle {
                continue;
            }
            match parse_tle_file(&path) {
                Ok(entries) => {
                    for tle in entries {
                        self.satellites.insert(tle.norad_id, tle);
                    }
                }
                Err(e) => log::warn!("Failed to parse TLE file {}: {}", path.display(), e),
            }
        }

        log::info!(
            "Loaded {} satellites from {}",
            self.satellites.len(),
            self.tle_dir.display()
        );
        Ok(())
    }

    pub fn satellites(&self) -> impl Iterator<Item = &TleEntry> {
        self.satellites.values()
    }

    pub fn len(&self) -> usize {
        self.satellites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.satellites.is_empty()
    }
}

fn parse_tle_file(path: &Path) -> Result<Vec<TleEntry>, FeedError> {
    let content = fs::read_to_string(path)?;
    let filename = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    parse_tle_text(&content, &filename)
}

pub fn parse_tle_text(content: &str, source: &str) -> Result<Vec<TleEntry>, FeedError> {
    let invalid = |message: String| FeedError::InvalidTle {
        file: source.to_string(),
        message,
    };

    split_tles(content)
        .into_iter()
        .map(|(name, line1, line2)| {
            let elements = Elements::from_tle(name.clone(), line1.as_bytes(), line2.as_bytes())
                .map_err(|e| invalid(e.to_string()))?;
            let constants =
                Constants::from_elements(&elements).map_err(|e| invalid(e.to_string()))?;
            let norad_id = elements.norad_id as u32;
            let name = name.unwrap_or_else(|| format!("NORAD {}", norad_id));
            let (constellation, svid) = identify(&name, norad_id);
            Ok(TleEntry {
                name,
                norad_id,
                constellation,
                svid,
                elements,
                constants,
            })
        })
        .collect()
}

/// Splits 2-line and 3-line TLE sets.
fn split_tles(content: &str) -> Vec<(Option<String>, &str, &str)> {
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut result = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if lines[i].starts_with("1 ") && i + 1 < lines.len() && lines[i + 1].starts_with("2 ") {
            result.push((None, lines[i], lines[i + 1]));
            i += 2;
        } else if i + 2 < lines.len()
            && lines[i + 1].starts_with("1 ")
            && lines[i + 2].starts_with("2 ")
        {
            let name = lines[i].trim_start_matches("0 ").to_string();
            result.push((Some(name), lines[i + 1], lines[i + 2]));
            i += 3;
        } else {
            i += 1;
        }
    }
    result
}

/// Derives constellation and svid from the catalog names used by CelesTrak,
/// e.g. `GPS BIIR-2  (PRN 13)`, `COSMOS 2456 (716)`, `GSAT0101 (GALILEO-PRN E11)`
/// or `BEIDOU-3 M1 (C19)`. Falls back to the NORAD id.
pub fn identify(name: &str, norad_id: u32) -> (Constellation, u32) {
    let upper = name.to_ascii_uppercase();
    let constellation = if upper.starts_with("GPS") || upper.starts_with("NAVSTAR") {
        Constellation::Gps
    } else if upper.contains("GLONASS") || upper.starts_with("COSMOS") {
        Constellation::Glonass
    } else if upper.contains("GALILEO") || upper.starts_with("GSAT") {
        Constellation::Galileo
    } else if upper.contains("BEIDOU") || upper.starts_with("COMPASS") {
        Constellation::Beidou
    } else {
        Constellation::Unknown
    };

    (constellation, prn_from_name(&upper).unwrap_or(norad_id))
}

/// `PRN 13`, `PRN E11`, `(C19)`, `(R07)`.
fn prn_from_name(upper: &str) -> Option<u32> {
    if let Some(pos) = upper.find("PRN") {
        let rest = upper[pos + 3..].trim_start().trim_start_matches(['G', 'E', 'C', 'R']);
        return leading_number(rest);
    }
    let open = upper.rfind('(')?;
    let inner = &upper[open + 1..];
    let mut chars = inner.chars();
    match chars.next()? {
        'G' | 'E' | 'C' | 'R' => leading_number(chars.as_str()),
        _ => None,
    }
}

fn leading_number(s: &str) -> Option<u32> {
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

#[cfg(test)]
pub(crate) mod test {
    use super::{identify, parse_tle_text, TleCatalog};
    use crate::radar::Constellation;
    use rstest::rstest;

    pub const GPS_TLE: &str = "GPS BIIR-2  (PRN 13)
1 24876U 97035A   24001.50000000  .00000023  00000-0  00000-0 0  9998
2 24876  55.5000 100.0000 0050000  90.0000 270.0000  2.00563000 12344
";

    #[rstest]
    #[case("GPS BIIR-2  (PRN 13)", Constellation::Gps, 13)]
    #[case("GSAT0101 (GALILEO-PRN E11)", Constellation::Galileo, 11)]
    #[case("BEIDOU-3 M1 (C19)", Constellation::Beidou, 19)]
    #[case("COSMOS 2456 (R07)", Constellation::Glonass, 7)]
    #[case("COSMOS 2500 (755)", Constellation::Glonass, 41000)]
    #[case("ISS (ZARYA)", Constellation::Unknown, 41000)]
    fn identifies_navigation_satellites(
        #[case] name: &str,
        #[case] constellation: Constellation,
        #[case] svid: u32,
    ) {
        assert_eq!(identify(name, 41000), (constellation, svid));
    }

    #[test]
    fn parses_named_and_bare_sets() {
        let bare = GPS_TLE.lines().skip(1).collect::<Vec<_>>().join("\n");
        let text = format!("{}\n{}\n", GPS_TLE, bare);
        let entries = parse_tle_text(&text, "gps.tle").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "GPS BIIR-2  (PRN 13)");
        assert_eq!(entries[0].svid, 13);
        assert_eq!(entries[1].name, "NORAD 24876");
        assert_eq!(entries[1].constellation, Constellation::Unknown);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let mut catalog = TleCatalog::new(std::env::temp_dir().join("sky-radar-no-tles"));
        assert!(catalog.load_all().is_err());
        assert!(catalog.is_empty());
    }
}
