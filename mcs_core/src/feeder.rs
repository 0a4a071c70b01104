//! Wall-clock demand feeder for paced replay.
//!
//! Spawns a thread that owns a recorded demand stream and releases each
//! demand over a bounded channel once its send time has elapsed relative to
//! the feeder epoch. The thread is shut down and joined on drop.

use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::ingest::DemandSample;

/// Longest single sleep, so shutdown is seen promptly.
const MAX_NAP: Duration = Duration::from_millis(10);

pub struct DemandFeeder {
    rx: xch::Receiver<DemandSample>,
    epoch: Instant,
    t0: f64,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl DemandFeeder {
    /// Release `demands` in real time; `t0` is the send time mapped to the
    /// moment of the call.
    pub fn spawn(demands: Vec<DemandSample>, t0: f64) -> Self {
        let (tx, rx) = xch::bounded(64);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let epoch = Instant::now();

        let join_handle = std::thread::spawn(move || {
            for d in demands {
                let due = Duration::from_secs_f64((d.send_time - t0).max(0.0));
                loop {
                    if shutdown_clone.load(Ordering::Relaxed) {
                        tracing::debug!("demand feeder received shutdown signal");
                        return;
                    }
                    let elapsed = epoch.elapsed();
                    if elapsed >= due {
                        break;
                    }
                    std::thread::sleep((due - elapsed).min(MAX_NAP));
                }
                if tx.send(d).is_err() {
                    tracing::debug!("demand consumer disconnected, exiting feeder");
                    return;
                }
            }
            tracing::trace!("demand feeder exhausted");
        });

        Self {
            rx,
            epoch,
            t0,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Demands released since the last call, oldest first.
    pub fn drain(&self) -> Vec<DemandSample> {
        self.rx.try_iter().collect()
    }

    /// Stream time corresponding to now.
    pub fn stream_time(&self) -> f64 {
        self.t0 + self.epoch.elapsed().as_secs_f64()
    }

    /// True once every demand has been sent and received.
    pub fn is_exhausted(&self) -> bool {
        self.rx.is_empty() && self.join_handle.as_ref().is_none_or(|h| h.is_finished())
    }
}

impl Drop for DemandFeeder {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // Disconnect so a send blocked on a full channel returns.
        self.rx = xch::never();
        if let Some(handle) = self.join_handle.take() {
            if let Err(e) = handle.join() {
                tracing::warn!(?e, "demand feeder panicked during shutdown");
            }
        }
    }
}
