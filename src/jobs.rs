//! Background loading. Loads run on a worker thread fed by a channel; each
//! job carries a ticket so the panel can drop results it no longer wants.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::data::loader::{self, LoadOptions, Source};
use crate::data::model::Table;
use crate::error::LoadError;

const LOADER_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Identifies one load request.
#[derive(Debug, Clone, Default)]
pub struct LoadTicket {
    pub generation: u64,
    pub cancel: CancelToken,
}

impl LoadTicket {
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            cancel: CancelToken::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadJob {
    pub ticket: LoadTicket,
    pub source: Source,
    pub options: LoadOptions,
}

#[derive(Debug)]
pub struct LoadResult {
    pub ticket: LoadTicket,
    pub result: Result<Table, LoadError>,
    pub elapsed: Duration,
}

/// Join handle and shutdown signal for the loader thread.
pub struct LoaderHandle {
    shutdown: Arc<AtomicBool>,
    join_handle: Option<thread::JoinHandle<()>>,
}

impl LoaderHandle {
    /// Signal the loader thread to exit and wait for it to finish.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take() {
            if handle.join().is_err() {
                warn!("Loader thread panicked");
            }
        }
    }
}

impl Drop for LoaderHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Spawn the loader worker and return its job channel, result channel and
/// shutdown handle.
pub fn spawn_loader() -> (Sender<LoadJob>, Receiver<LoadResult>, LoaderHandle) {
    let (tx, rx) = mpsc::channel::<LoadJob>();
    let (result_tx, result_rx) = mpsc::channel::<LoadResult>();
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_worker = Arc::clone(&shutdown);
    let handle = thread::spawn(move || {
        while !shutdown_worker.load(Ordering::Relaxed) {
            match rx.recv_timeout(LOADER_POLL_INTERVAL) {
                Ok(job) => {
                    let result = run_job(&job);
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    });
    (
        tx,
        result_rx,
        LoaderHandle {
            shutdown,
            join_handle: Some(handle),
        },
    )
}

/// Execute a single job on the current thread.
pub fn run_job(job: &LoadJob) -> LoadResult {
    let start = Instant::now();
    debug!(
        "Load #{} started for {}",
        job.ticket.generation,
        job.source.describe()
    );
    let result = loader::load_cancellable(&job.source, &job.options, &job.ticket.cancel);
    LoadResult {
        ticket: job.ticket.clone(),
        result,
        elapsed: start.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(generation: u64, csv: &str) -> LoadJob {
        LoadJob {
            ticket: LoadTicket::new(generation),
            source: Source::Bytes(csv.as_bytes().to_vec()),
            options: LoadOptions::default(),
        }
    }

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::default();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn worker_returns_tagged_results() {
        let (tx, rx, mut handle) = spawn_loader();
        tx.send(job(1, "a,b\n1,2\n")).unwrap();
        tx.send(job(2, "a\nx\ny\n")).unwrap();
        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first.ticket.generation, 1);
        assert_eq!(first.result.unwrap().len(), 1);
        assert_eq!(second.ticket.generation, 2);
        assert_eq!(second.result.unwrap().len(), 2);
        handle.shutdown();
    }

    #[test]
    fn cancelled_job_reports_cancelled() {
        let job = job(3, "a\n1\n");
        job.ticket.cancel.cancel();
        assert_eq!(run_job(&job).result.unwrap_err(), LoadError::Cancelled);
    }
}
