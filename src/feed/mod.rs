mod error;
mod nmea;
mod simulated;
mod station;
mod tle;

pub use error::FeedError;

use nmea::{parse_epochs, run_nmea_loop};
use simulated::{run_simulation_loop, SkySimulator};

use std::path::Path;

use serde::Deserialize;
use tokio::io::{AsyncBufRead, BufReader};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::FeedConfig;
use crate::radar::{RawSatellite, StatusSender};

/// A running feed task.
pub struct FeedHandle {
    name: &'static str,
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<Result<(), FeedError>>,
}

impl FeedHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn stop(self) {
        let _ = self.stop_tx.send(());
        match self.join.await {
            Ok(Ok(())) => log::info!("{} feed stopped", self.name),
            Ok(Err(e)) => log::warn!("{} feed failed: {}", self.name, e),
            Err(e) => log::warn!("{} feed panicked: {}", self.name, e),
        }
    }
}

/// Starts every configured feed; each pushes epochs into `status_tx`.
pub async fn spawn_feeds(
    config: &FeedConfig,
    status_tx: &StatusSender,
) -> Result<Vec<FeedHandle>, FeedError> {
    let mut handles = Vec::new();

    if let Some(nmea) = &config.nmea {
        let reader: Box<dyn AsyncBufRead + Send + Unpin> = if nmea.path == "-" {
            Box::new(BufReader::new(tokio::io::stdin()))
        } else {
            Box::new(BufReader::new(tokio::fs::File::open(&nmea.path).await?))
        };
        let (stop_tx, stop_rx) = oneshot::channel();
        let join = tokio::spawn(run_nmea_loop(
            reader,
            nmea.epoch_interval,
            status_tx.clone(),
            stop_rx,
        ));
        log::info!("NMEA feed reading from {}", nmea.path);
        handles.push(FeedHandle {
            name: "nmea",
            stop_tx,
            join,
        });
    }

    if let Some(sim) = &config.simulation {
        let simulator = SkySimulator::from_config(sim)?;
        let (stop_tx, stop_rx) = oneshot::channel();
        let join = tokio::spawn(run_simulation_loop(
            simulator,
            sim.interval,
            status_tx.clone(),
            stop_rx,
        ));
        log::info!("Simulation feed every {}", humantime::format_duration(sim.interval));
        handles.push(FeedHandle {
            name: "simulation",
            stop_tx,
            join,
        });
    }

    if handles.is_empty() {
        log::info!("No feeds configured, waiting for pushed status");
    }
    Ok(handles)
}

/// JSON status input: one epoch or a list of epochs.
#[derive(Deserialize)]
#[serde(untagged)]
enum StatusDocument {
    Single(Vec<RawSatellite>),
    Epochs(Vec<Vec<RawSatellite>>),
}

pub fn parse_status_json(text: &str) -> Result<Vec<Vec<RawSatellite>>, FeedError> {
    Ok(match serde_json::from_str(text)? {
        StatusDocument::Single(epoch) => vec![epoch],
        StatusDocument::Epochs(epochs) => epochs,
    })
}

/// Loads status epochs from a JSON file or an NMEA log, told apart by the
/// first non-blank character.
pub fn load_epochs(path: &Path) -> Result<Vec<Vec<RawSatellite>>, FeedError> {
    let text = std::fs::read_to_string(path)?;
    let epochs = match text.trim_start().chars().next() {
        Some('[') | Some('{') => parse_status_json(&text)?,
        _ => parse_epochs(&text),
    };
    log::info!("Loaded {} epochs from {}", epochs.len(), path.display());
    Ok(epochs)
}

#[cfg(test)]
mod test {
    use super::{load_epochs, parse_status_json, FeedError};

    #[test]
    fn json_single_and_multiple_epochs() {
        let single = r#"[{"azimuth_deg": 0, "elevation_deg": 90, "svid": 5, "constellation": 1, "used_in_fix": true}]"#;
        let epochs = parse_status_json(single).unwrap();
        assert_eq!(epochs.len(), 1);
        assert_eq!(epochs[0][0].svid, 5);

        let multiple = format!("[{}, []]", single);
        let epochs = parse_status_json(&multiple).unwrap();
        assert_eq!(epochs.len(), 2);
        assert!(epochs[1].is_empty());

        assert!(matches!(
            parse_status_json("[{\"svid\": 1}]"),
            Err(FeedError::Json(_))
        ));
    }

    #[test]
    fn empty_json_list_is_one_empty_epoch() {
        let epochs = parse_status_json("[]").unwrap();
        assert_eq!(epochs, vec![Vec::new()]);
    }

    #[test]
    fn loads_files_by_content() {
        let dir = std::env::temp_dir().join(format!("sky-radar-load-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let json = dir.join("status.json");
        std::fs::write(&json, "  [[], []]").unwrap();
        assert_eq!(load_epochs(&json).unwrap().len(), 2);

        let log = dir.join("drive.nmea");
        std::fs::write(&log, "$GPGSV,1,1,01,05,85,010,45\n$GPGGA,1\n").unwrap();
        let epochs = load_epochs(&log).unwrap();
        assert_eq!(epochs.len(), 1);
        assert_eq!(epochs[0][0].svid, 5);

        assert!(matches!(
            load_epochs(&dir.join("missing.json")),
            Err(FeedError::Io(_))
        ));
    }
}
