//! Background prefetching of frame ranges into the shared cache.
//!
//! A prefetcher owns one worker thread fed through a command channel.
//! Jobs decode frames through the same pipeline as foreground requests,
//! so a later foreground hit is free. Cancellation is cooperative and
//! edge-triggered: the flag is checked between frames, aborts the job
//! that observes it, and resets so later jobs run normally.

use crate::source::VideoSource;
use crossbeam_channel::{unbounded, Receiver, Sender};
use rawscope_core::PixelFormat;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};

/// Handle for cancelling an in-progress prefetch job.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create a new cancel handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Check if cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// A range of frames to warm up in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchJob {
    /// First frame index, inclusive.
    pub start: u32,
    /// Last frame index, exclusive.
    pub end: u32,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

/// Outcome of one prefetch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchReport {
    /// Frames the job asked for.
    pub requested: u32,
    /// Frames actually decoded into the cache.
    pub decoded: u32,
    /// Whether the job was cut short by cancellation.
    pub cancelled: bool,
}

/// Background worker that fills the frame cache ahead of playback.
pub struct Prefetcher {
    commands: Option<Sender<PrefetchJob>>,
    reports: Receiver<PrefetchReport>,
    cancel: CancelFlag,
    worker: Option<JoinHandle<()>>,
}

impl Prefetcher {
    /// Spawn a worker decoding through the given source.
    pub fn new(source: Arc<VideoSource>) -> Self {
        let (command_tx, command_rx) = unbounded();
        let (report_tx, report_rx) = unbounded();
        let cancel = CancelFlag::new();
        let flag = cancel.clone();
        let worker = std::thread::spawn(move || worker_loop(source, command_rx, report_tx, flag));
        Self {
            commands: Some(command_tx),
            reports: report_rx,
            cancel,
            worker: Some(worker),
        }
    }

    /// Submit a job. Jobs run in submission order.
    pub fn queue(&self, job: PrefetchJob) {
        if let Some(commands) = &self.commands {
            let _ = commands.send(job);
        }
    }

    /// Cancel the job in progress. The worker returns within one frame;
    /// if no job is running, the next one aborts immediately instead.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Take the next job report if one is ready.
    pub fn try_recv_report(&self) -> Option<PrefetchReport> {
        self.reports.try_recv().ok()
    }

    /// Wait up to `timeout` for the next job report.
    pub fn recv_report_timeout(&self, timeout: Duration) -> Option<PrefetchReport> {
        self.reports.recv_timeout(timeout).ok()
    }
}

impl Drop for Prefetcher {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.commands.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(
    source: Arc<VideoSource>,
    commands: Receiver<PrefetchJob>,
    reports: Sender<PrefetchReport>,
    cancel: CancelFlag,
) {
    while let Ok(job) = commands.recv() {
        let requested = job.end.saturating_sub(job.start);
        let mut decoded = 0;
        let mut cancelled = false;

        for index in job.start..job.end {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            match source.get_one_frame(index, job.width, job.height, job.format) {
                Ok(_) => decoded += 1,
                Err(e) => {
                    warn!(frame = index, error = %e, "prefetch stopped");
                    break;
                }
            }
        }

        if cancelled {
            cancel.reset();
        }
        debug!(requested, decoded, cancelled, "prefetch job finished");
        let _ = reports.send(PrefetchReport {
            requested,
            decoded,
            cancelled,
        });
    }
}
