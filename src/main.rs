mod config;
mod feed;
mod radar;
mod render;
mod web;


use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::feed::FeedError;
use crate::radar::{
    FilterStore, MemoryFilterStore, RadarManager, RawSatellite, SweepAngle, SweepAnimator,
    YamlFilterStore,
};
use crate::render::{encode_png, CanvasSize, IconSet, RadarRenderer, RenderError};
use crate::web::server::ServeError;

#[derive(Parser)]
#[command(name = "sky-radar")]
#[command(about = "Live GNSS sky plot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the radar web service
    Serve {
        #[arg(short, long, default_value = "sky-radar.yaml")]
        config: PathBuf,
    },
    /// Render radar frames from a JSON status file or an NMEA log
    Render {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        /// Animate the sweep over this many frames
        #[arg(long, default_value_t = 1)]
        frames: u32,
    },
    /// Print the satellite listing of every epoch
    Inspect {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Serve(#[from] ServeError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0} holds no status epochs")]
    NoEpochs(String),
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { config } => serve(&config),
        Commands::Render {
            input,
            output,
            config,
            width,
            height,
            frames,
        } => render(&input, &output, config.as_deref(), width, height, frames),
        Commands::Inspect { input, config } => inspect(&input, config.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn serve(path: &Path) -> Result<(), CliError> {
    let config = Config::from_file(path)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(web::run_server(config))?;
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config, CliError> {
    Ok(match path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    })
}

/// Filter preferences come from the configured file when a config is given.
fn manager_for(config_path: Option<&Path>, config: &Config) -> RadarManager {
    let store: Box<dyn FilterStore> = match config_path {
        Some(_) => Box::new(YamlFilterStore::new(config.preferences.path.clone())),
        None => Box::new(MemoryFilterStore::default()),
    };
    RadarManager::new(store)
}

fn load_epochs(input: &Path) -> Result<Vec<Vec<RawSatellite>>, CliError> {
    let epochs = feed::load_epochs(input)?;
    if epochs.is_empty() {
        return Err(CliError::NoEpochs(input.display().to_string()));
    }
    Ok(epochs)
}

fn inspect(input: &Path, config_path: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let manager = manager_for(config_path, &config);

    for (i, epoch) in load_epochs(input)?.into_iter().enumerate() {
        let snapshot = manager.apply_status(epoch);
        println!("== Epoch {} ==", i + 1);
        println!("Shown on the radar: {} ({} used)", snapshot.visible(), snapshot.used());
        println!("{}", manager.listing());
    }
    Ok(())
}

fn render(
    input: &Path,
    output: &Path,
    config_path: Option<&Path>,
    width: Option<u32>,
    height: Option<u32>,
    frames: u32,
) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let size = CanvasSize::new(
        width.unwrap_or(config.radar.width),
        height.unwrap_or(config.radar.height),
    );
    let icons = match &config.radar.icons_dir {
        Some(dir) => IconSet::load(dir),
        None => IconSet::default(),
    };
    let mut renderer = RadarRenderer::new(config.radar.render_options()?);
    let manager = Arc::new(manager_for(config_path, &config));
    let epochs = load_epochs(input)?;

    if frames <= 1 {
        if let Some(last) = epochs.last() {
            manager.apply_status(last.clone());
        }
        let frame = renderer.render(
            &manager.snapshot(),
            &manager.filter(),
            SweepAngle::default(),
            size,
        );
        std::fs::write(output, encode_png(&renderer.rasterize(&frame, &icons))?)?;
        log::info!(
            "Wrote {} ({} visible, {} used)",
            output.display(),
            frame.visible,
            frame.used
        );
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(async {
        let mut animator = SweepAnimator::new(config.sweep.step_deg, config.sweep.interval);
        let sweep = animator.handle();
        let mut redraw = manager.subscribe();
        animator.start(manager.redraw_sender());

        let mut current_epoch = None;
        let mut result = Ok(());
        for i in 0..frames {
            // spread the epochs evenly over the animation
            let index = i as usize * epochs.len() / frames as usize;
            if current_epoch != Some(index) {
                manager.apply_status(epochs[index].clone());
                current_epoch = Some(index);
            }
            if redraw.changed().await.is_err() {
                break;
            }

            let frame = renderer.render(&manager.snapshot(), &manager.filter(), sweep.angle(), size);
            let path = numbered_path(output, i);
            let written = encode_png(&renderer.rasterize(&frame, &icons))
                .map_err(CliError::from)
                .and_then(|png| std::fs::write(&path, png).map_err(CliError::from));
            if let Err(e) = written {
                result = Err(e);
                break;
            }
            log::debug!("Wrote {} at {:.0}°", path.display(), frame.sweep_deg);
        }

        animator.stop().await;
        result
    })?;

    log::info!("Wrote {} frames next to {}", frames, output.display());
    Ok(())
}

/// `out/radar.png` becomes `out/radar_007.png`.
fn numbered_path(output: &Path, index: u32) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "frame".to_string());
    let ext = output
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_else(|| "png".to_string());
    output.with_file_name(format!("{}_{:03}.{}", stem, index, ext))
}
