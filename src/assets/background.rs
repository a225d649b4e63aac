// Background loading worker
//
// A single worker thread pulls jobs off a channel, runs the CPU half of the
// asset lifecycle, and pushes finished jobs onto a completion channel for
// the owning thread to finalize. With one worker, completions come back in
// exactly the order jobs were queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::io::FileSource;

use super::asset::Asset;
use super::{AssetError, AssetKind};

/// One asset queued for background loading
pub(crate) struct LoadJob {
    pub kind: AssetKind,
    /// Registry key the placeholder was inserted under
    pub key: String,
    /// Source file name
    pub name: String,
    pub asset: Arc<Mutex<dyn Asset>>,
}

impl LoadJob {
    pub fn new(kind: AssetKind, key: &str, name: &str, asset: Arc<Mutex<dyn Asset>>) -> Self {
        Self {
            kind,
            key: key.to_string(),
            name: name.to_string(),
            asset,
        }
    }
}

/// Owner of the loader thread and its two channels
///
/// `stop` is synchronous: it lets the job currently being loaded finish,
/// discards everything still queued, and joins the worker. Dropping the
/// loader stops it, so a half-torn-down manager cannot leave the thread
/// running.
pub(crate) struct BackgroundLoader {
    jobs: Option<Sender<LoadJob>>,
    completed: Receiver<LoadJob>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    pending: usize,
}

impl BackgroundLoader {
    pub fn spawn(io: Arc<FileSource>) -> Self {
        let (job_tx, job_rx) = unbounded::<LoadJob>();
        let (done_tx, done_rx) = unbounded::<LoadJob>();
        let stop = Arc::new(AtomicBool::new(false));

        let worker_stop = stop.clone();
        let worker = std::thread::Builder::new()
            .name("asset-loader".to_string())
            .spawn(move || worker_loop(job_rx, done_tx, io, worker_stop));

        // If the thread cannot start, come up already stopped: background
        // requests fail fast and blocking loads still work.
        let (jobs, worker) = match worker {
            Ok(handle) => (Some(job_tx), Some(handle)),
            Err(e) => {
                log::error!("Failed to spawn asset loader thread: {e}");
                (None, None)
            }
        };

        Self {
            jobs,
            completed: done_rx,
            stop,
            worker,
            pending: 0,
        }
    }

    /// Hand a job to the worker
    pub fn queue(&mut self, job: LoadJob) -> Result<(), AssetError> {
        let Some(jobs) = &self.jobs else {
            return Err(AssetError::LoaderStopped);
        };
        log::debug!("Queueing background load of '{}'", job.key);
        jobs.send(job).map_err(|_| AssetError::LoaderStopped)?;
        self.pending += 1;
        Ok(())
    }

    /// Jobs whose load step has finished, oldest first, without blocking
    pub fn drain_completed(&mut self) -> Vec<LoadJob> {
        self.completed.try_iter().collect()
    }

    /// Record that a drained job has been finalized
    pub fn mark_finalized(&mut self) {
        self.pending = self.pending.saturating_sub(1);
    }

    /// Number of queued jobs not yet finalized
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// True when every queued job has been finalized
    pub fn idle(&self) -> bool {
        self.pending == 0
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Stop the worker, blocking until it has exited
    ///
    /// Jobs that were queued but never started are dropped; their assets
    /// keep whatever state they had.
    pub fn stop(&mut self) {
        if self.worker.is_none() {
            return;
        }

        self.stop.store(true, Ordering::SeqCst);
        // Closing the job channel wakes the worker if it is parked on recv
        self.jobs.take();

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Asset loader thread panicked during shutdown");
            }
        }

        let discarded = self.pending;
        self.pending = 0;
        if discarded > 0 {
            log::debug!("Stopped loader with {discarded} unfinalized jobs");
        }
    }
}

impl Drop for BackgroundLoader {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(
    jobs: Receiver<LoadJob>,
    done: Sender<LoadJob>,
    io: Arc<FileSource>,
    stop: Arc<AtomicBool>,
) {
    log::debug!("Asset loader thread started");

    for job in jobs.iter() {
        if stop.load(Ordering::SeqCst) {
            break;
        }

        {
            let mut asset = job.asset.lock();
            if let Err(e) = asset.load(&io) {
                log::error!("Background load of '{}' failed: {e}", job.key);
            }
        }

        if done.send(job).is_err() {
            break;
        }
    }

    log::debug!("Asset loader thread exited");
}
