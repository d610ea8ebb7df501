use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

pub const DEFAULT_STEP_DEG: f64 = 3.0;
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(30);

/// Rotation of the radar sweep, in [0, 360).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SweepAngle(f64);

impl SweepAngle {
    pub fn new(degrees: f64) -> Self {
        if degrees.is_finite() {
            Self(degrees.rem_euclid(360.0))
        } else {
            Self(0.0)
        }
    }

    pub fn degrees(&self) -> f64 {
        self.0
    }

    pub fn advance(self, step_deg: f64) -> Self {
        Self::new(self.0 + step_deg)
    }
}

/// Angle shared between the animator task and renderers.
#[derive(Debug, Clone, Default)]
pub struct SweepHandle {
    bits: Arc<AtomicU64>,
}

impl SweepHandle {
    pub fn angle(&self) -> SweepAngle {
        SweepAngle(f64::from_bits(self.bits.load(Ordering::Relaxed)))
    }

    fn store(&self, angle: SweepAngle) {
        self.bits.store(angle.0.to_bits(), Ordering::Relaxed);
    }
}

#[derive(Debug)]
struct WorkerHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

/// Rotates the sweep by a fixed step on a fixed cadence and asks for a
/// redraw after every step.
pub struct SweepAnimator {
    step_deg: f64,
    period: Duration,
    handle: SweepHandle,
    worker: Option<WorkerHandle>,
}

impl SweepAnimator {
    pub fn new(step_deg: f64, period: Duration) -> Self {
        Self {
            step_deg,
            period,
            handle: SweepHandle::default(),
            worker: None,
        }
    }

    pub fn handle(&self) -> SweepHandle {
        self.handle.clone()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Time for one full revolution.
    pub fn revolution(&self) -> Duration {
        if self.step_deg <= 0.0 {
            return Duration::MAX;
        }
        self.period.mul_f64(360.0 / self.step_deg)
    }

    /// Starts ticking. Each tick bumps the generation held by `redraw`.
    /// Calling it while already running does nothing.
    pub fn start(&mut self, redraw: watch::Sender<u64>) {
        if self.worker.is_some() {
            return;
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = self.handle.clone();
        let step = self.step_deg;
        let period = self.period;
        let join = tokio::spawn(run_sweep_loop(handle, step, period, redraw, stop_rx));

        log::debug!(
            "Sweep animator started ({} deg every {:?})",
            self.step_deg,
            self.period
        );
        self.worker = Some(WorkerHandle { stop_tx, join });
    }

    /// Stops ticking and waits for the task to finish. Safe to call twice.
    pub async fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            let _ = worker.join.await;
            log::debug!("Sweep animator stopped at {:.1} deg", self.handle.angle().degrees());
        }
    }
}

async fn run_sweep_loop(
    handle: SweepHandle,
    step_deg: f64,
    period: Duration,
    redraw: watch::Sender<u64>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // the first tick of an interval completes immediately
    ticker.tick().await;

    loop {
        let should_stop = tokio::select! {
            _ = ticker.tick() => false,
            _ = &mut stop_rx => true,
        };
        if should_stop {
            return;
        }

        handle.store(handle.angle().advance(step_deg));
        redraw.send_modify(|generation| *generation = generation.wrapping_add(1));
    }
}
