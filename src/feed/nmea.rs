use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::oneshot;
use tokio::time::sleep;

use super::error::FeedError;
use crate::radar::{Constellation, RawSatellite, StatusSender};

/// Sentence source, from the two letters after `$`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Talker {
    Gps,
    Glonass,
    Galileo,
    Beidou,
    /// `GN`: combined fix, constellation from the PRN.
    Combined,
    Other,
}

impl Talker {
    fn parse(id: &str) -> Self {
        match id {
            "GP" => Talker::Gps,
            "GL" => Talker::Glonass,
            "GA" => Talker::Galileo,
            "GB" | "BD" => Talker::Beidou,
            "GN" => Talker::Combined,
            _ => Talker::Other,
        }
    }
}

/// NMEA 4.1 GSA system id.
fn system_talker(system_id: &str) -> Option<Talker> {
    match system_id.trim() {
        "1" => Some(Talker::Gps),
        "2" => Some(Talker::Glonass),
        "3" => Some(Talker::Galileo),
        "4" => Some(Talker::Beidou),
        _ => None,
    }
}

/// Maps a talker-relative PRN to a constellation and its own svid.
fn classify(talker: Talker, prn: u32) -> (Constellation, u32) {
    match talker {
        Talker::Gps => match prn {
            1..=32 => (Constellation::Gps, prn),
            65..=96 => (Constellation::Glonass, prn - 64),
            _ => (Constellation::Unknown, prn),
        },
        Talker::Glonass => match prn {
            65..=96 => (Constellation::Glonass, prn - 64),
            _ => (Constellation::Glonass, prn),
        },
        Talker::Galileo => match prn {
            301..=399 => (Constellation::Galileo, prn - 300),
            _ => (Constellation::Galileo, prn),
        },
        Talker::Beidou => match prn {
            201..=299 => (Constellation::Beidou, prn - 200),
            401..=499 => (Constellation::Beidou, prn - 400),
            _ => (Constellation::Beidou, prn),
        },
        Talker::Combined => match prn {
            1..=32 => (Constellation::Gps, prn),
            65..=96 => (Constellation::Glonass, prn - 64),
            201..=299 => (Constellation::Beidou, prn - 200),
            301..=399 => (Constellation::Galileo, prn - 300),
            _ => (Constellation::Unknown, prn),
        },
        Talker::Other => (Constellation::Unknown, prn),
    }
}

/// Validates `$...*HH` and returns the body between `$` and `*`.
fn sentence_body(line: &str) -> Option<&str> {
    let line = line.trim();
    let rest = line.strip_prefix('$')?;
    match rest.split_once('*') {
        Some((body, checksum)) => {
            let expected = u8::from_str_radix(checksum.get(..2)?, 16).ok()?;
            let actual = body.bytes().fold(0u8, |acc, b| acc ^ b);
            (expected == actual).then_some(body)
        }
        None => Some(rest),
    }
}

#[derive(Debug, Clone)]
struct InView {
    talker: Talker,
    constellation: Constellation,
    svid: u32,
    elevation_deg: f64,
    azimuth_deg: f64,
}

/// Turns a stream of NMEA sentences into status epochs.
///
/// GSV sentences list satellites in view, GSA sentences list the PRNs used in
/// the fix, and every GGA/RMC closes an epoch if any GSV arrived since the
/// previous one.
#[derive(Debug, Default)]
pub struct NmeaParser {
    in_view: Vec<InView>,
    gsv_talkers: HashSet<Talker>,
    used: BTreeSet<(Constellation, u32)>,
    gsa_since_epoch: bool,
    rejected: usize,
}

impl NmeaParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sentences dropped for a bad checksum or framing.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Feeds one line; returns a completed epoch when the line closes one.
    pub fn push_line(&mut self, line: &str) -> Option<Vec<RawSatellite>> {
        if line.trim().is_empty() {
            return None;
        }
        let Some(body) = sentence_body(line) else {
            self.rejected += 1;
            log::debug!("Rejected NMEA sentence: {}", line.trim());
            return None;
        };

        let mut fields = body.split(',');
        let address = fields.next().unwrap_or_default();
        if address.len() < 5 || !address.is_ascii() {
            self.rejected += 1;
            return None;
        }
        let talker = Talker::parse(&address[..2]);
        let fields: Vec<&str> = fields.collect();

        match &address[2..] {
            "GSV" => {
                self.parse_gsv(talker, &fields);
                None
            }
            "GSA" => {
                self.parse_gsa(talker, &fields);
                None
            }
            "GGA" | "RMC" => self.close_epoch(),
            _ => None,
        }
    }

    /// Closes a trailing epoch at end of input.
    pub fn finish(&mut self) -> Option<Vec<RawSatellite>> {
        self.close_epoch()
    }

    fn parse_gsv(&mut self, talker: Talker, fields: &[&str]) {
        // total, index, in view, then groups of prn/el/az/snr, optional signal id
        if fields.len() < 3 {
            self.rejected += 1;
            return;
        }
        if self.gsv_talkers.insert(talker) {
            self.in_view.retain(|sat| sat.talker != talker);
        }

        for group in fields[3..].chunks(4) {
            if group.len() < 3 {
                break;
            }
            let (Ok(prn), Ok(el), Ok(az)) = (
                group[0].trim().parse::<u32>(),
                group[1].trim().parse::<f64>(),
                group[2].trim().parse::<f64>(),
            ) else {
                continue;
            };
            let (constellation, svid) = classify(talker, prn);
            let entry = InView {
                talker,
                constellation,
                svid,
                elevation_deg: el,
                azimuth_deg: az,
            };
            // multi-signal receivers repeat satellites once per band
            match self
                .in_view
                .iter_mut()
                .find(|s| s.constellation == constellation && s.svid == svid)
            {
                Some(existing) => *existing = entry,
                None => self.in_view.push(entry),
            }
        }
    }

    fn parse_gsa(&mut self, talker: Talker, fields: &[&str]) {
        // mode, fix type, 12 prns, pdop, hdop, vdop, optional system id
        if fields.len() < 14 {
            self.rejected += 1;
            return;
        }
        let talker = match (talker, fields.get(17)) {
            (Talker::Combined, Some(id)) => system_talker(id).unwrap_or(Talker::Combined),
            (t, _) => t,
        };
        if !self.gsa_since_epoch {
            self.used.clear();
            self.gsa_since_epoch = true;
        }
        for prn in fields[2..14].iter().filter_map(|f| f.trim().parse::<u32>().ok()) {
            self.used.insert(classify(talker, prn));
        }
    }

    fn close_epoch(&mut self) -> Option<Vec<RawSatellite>> {
        if self.gsv_talkers.is_empty() {
            return None;
        }
        let talkers = std::mem::take(&mut self.gsv_talkers);
        self.in_view.retain(|sat| talkers.contains(&sat.talker));
        self.gsa_since_epoch = false;

        Some(
            self.in_view
                .iter()
                .map(|sat| RawSatellite {
                    azimuth_deg: sat.azimuth_deg,
                    elevation_deg: sat.elevation_deg,
                    svid: sat.svid,
                    constellation: sat.constellation.code(),
                    used_in_fix: self.used.contains(&(sat.constellation, sat.svid)),
                })
                .collect(),
        )
    }
}

/// Parses a whole NMEA log into epochs.
pub fn parse_epochs(text: &str) -> Vec<Vec<RawSatellite>> {
    let mut parser = NmeaParser::new();
    let mut epochs: Vec<_> = text.lines().filter_map(|l| parser.push_line(l)).collect();
    epochs.extend(parser.finish());
    if parser.rejected() > 0 {
        log::warn!("Skipped {} malformed NMEA sentences", parser.rejected());
    }
    epochs
}

/// Reads NMEA lines from `reader` and pushes every epoch to `status_tx`,
/// pausing `epoch_interval` between epochs.
pub async fn run_nmea_loop<R>(
    reader: R,
    epoch_interval: Duration,
    status_tx: StatusSender,
    mut stop_rx: oneshot::Receiver<()>,
) -> Result<(), FeedError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut parser = NmeaParser::new();
    let mut epochs = 0usize;

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = &mut stop_rx => break,
        };
        let epoch = match line {
            Some(line) => parser.push_line(&line),
            None => {
                if let Some(last) = parser.finish() {
                    status_tx
                        .send(last)
                        .await
                        .map_err(|_| FeedError::ChannelClosed)?;
                    epochs += 1;
                }
                break;
            }
        };
        let Some(epoch) = epoch else { continue };

        status_tx
            .send(epoch)
            .await
            .map_err(|_| FeedError::ChannelClosed)?;
        epochs += 1;

        if !epoch_interval.is_zero() {
            tokio::select! {
                _ = sleep(epoch_interval) => {}
                _ = &mut stop_rx => break,
            }
        }
    }

    log::info!(
        "NMEA feed finished after {} epochs ({} sentences rejected)",
        epochs,
        parser.rejected()
    );
    Ok(())
}
