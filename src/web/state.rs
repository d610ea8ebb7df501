use std::sync::{Arc, Mutex as StdMutex};

use crate::config::Config;
use crate::radar::{RadarManager, StatusSender, SweepHandle};
use crate::render::{CanvasSize, IconSet, RadarRenderer, RenderOptions};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub manager: Arc<RadarManager>,
    pub sweep: SweepHandle,
    pub status_tx: StatusSender,
    pub renderers: Arc<Renderers>,
    pub icons: Arc<IconSet>,
}

/// Renderers for HTTP frames.
///
/// The configured canvas size is the dashboard's and keeps its sweep trail
/// between requests. Any other size gets a fresh renderer per request, so
/// odd-sized clients never reset the dashboard trail.
pub struct Renderers {
    options: RenderOptions,
    display: CanvasSize,
    shared: StdMutex<RadarRenderer>,
}

impl Renderers {
    pub fn new(options: RenderOptions, display: CanvasSize) -> Self {
        Self {
            shared: StdMutex::new(RadarRenderer::new(options.clone())),
            options,
            display,
        }
    }

    /// Runs `f` with the renderer for `size`. Blocks on the shared renderer,
    /// call it off the async executor.
    pub fn with_renderer<T>(
        &self,
        size: CanvasSize,
        f: impl FnOnce(&mut RadarRenderer) -> T,
    ) -> T {
        if size == self.display {
            let mut renderer = self.shared.lock().unwrap_or_else(|e| e.into_inner());
            f(&mut renderer)
        } else {
            f(&mut RadarRenderer::new(self.options.clone()))
        }
    }
}
