use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::manager::{run_ingest_loop, status_channel, RadarManager, StatusSender};
use super::sweep::{SweepAnimator, SweepHandle};

#[derive(Debug)]
struct WorkerHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

/// Running radar: status ingest plus sweep animation around one manager.
pub struct RadarService {
    manager: Arc<RadarManager>,
    animator: SweepAnimator,
    status_tx: Option<StatusSender>,
    ingest: Option<WorkerHandle>,
}

impl RadarService {
    pub fn new(manager: Arc<RadarManager>, animator: SweepAnimator) -> Self {
        Self {
            manager,
            animator,
            status_tx: None,
            ingest: None,
        }
    }

    pub fn manager(&self) -> Arc<RadarManager> {
        self.manager.clone()
    }

    pub fn sweep(&self) -> SweepHandle {
        self.animator.handle()
    }

    /// Starts the ingest task and the animator, returning the sender feeds
    /// push statuses into. Starting twice hands out the same channel.
    pub fn start(&mut self) -> StatusSender {
        if let Some(tx) = &self.status_tx {
            return tx.clone();
        }

        let (status_tx, status_rx) = status_channel();
        let (stop_tx, stop_rx) = oneshot::channel();
        let join = tokio::spawn(run_ingest_loop(self.manager.clone(), status_rx, stop_rx));
        self.ingest = Some(WorkerHandle { stop_tx, join });
        self.status_tx = Some(status_tx.clone());

        self.animator.start(self.manager.redraw_sender());
        log::info!("Radar service started");
        status_tx
    }

    /// Stops receiving statuses and stops the sweep. Safe to call twice.
    pub async fn stop(&mut self) {
        self.status_tx = None;
        if let Some(worker) = self.ingest.take() {
            let _ = worker.stop_tx.send(());
            let _ = worker.join.await;
            log::info!("Radar service stopped");
        }
        self.animator.stop().await;
    }
}
