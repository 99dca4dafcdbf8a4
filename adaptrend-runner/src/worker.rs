//! Background worker thread for engine computations.
//!
//! Communication with the caller is via `mpsc` channels. Every request
//! carries its own `CancelToken`; [`WorkerHandle::submit`] cancels the
//! previous request's token, so a newer request always supersedes an older
//! one. Completed results are published as `Arc<AdaptiveResult>`.
//!
//! The worker runs the engine inside a private rayon pool, never the global
//! one.

use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use adaptrend_core::{AdaptiveEngine, AdaptiveResult, Bar, CancelToken, EngineConfig, EngineError};

use crate::cache::{CacheKey, ResultCache};

/// One computation request.
#[derive(Debug, Clone)]
pub struct ComputeRequest {
    pub id: u64,
    pub symbol: String,
    pub timeframe: String,
    pub bars: Arc<Vec<Bar>>,
    pub config: EngineConfig,
}

impl ComputeRequest {
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(&self.symbol, &self.timeframe, &self.bars, &self.config)
    }
}

/// Commands sent to the worker.
#[derive(Debug)]
pub enum WorkerCommand {
    Compute {
        request: ComputeRequest,
        cancel: CancelToken,
    },
    Shutdown,
}

/// Responses sent from the worker.
#[derive(Debug, Clone)]
pub enum WorkerResponse {
    Completed {
        id: u64,
        result: Arc<AdaptiveResult>,
        cached: bool,
    },
    Cancelled {
        id: u64,
    },
    Failed {
        id: u64,
        error: String,
    },
}

impl WorkerResponse {
    pub fn id(&self) -> u64 {
        match self {
            WorkerResponse::Completed { id, .. }
            | WorkerResponse::Cancelled { id }
            | WorkerResponse::Failed { id, .. } => *id,
        }
    }
}

/// Spawn the background worker thread.
///
/// `threads` sizes the worker's private rayon pool (0 lets rayon decide).
pub fn spawn_worker(
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
    cache: Arc<ResultCache>,
    threads: usize,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("adaptrend-worker".into())
        .spawn(move || worker_loop(rx, tx, cache, threads))
}

fn worker_loop(
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
    cache: Arc<ResultCache>,
    threads: usize,
) {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("adaptrend-pool-{i}"))
        .build();
    let pool = match pool {
        Ok(pool) => Some(pool),
        Err(e) => {
            warn!(error = %e, "failed to build worker pool, using the global pool");
            None
        }
    };

    loop {
        match rx.recv() {
            Ok(WorkerCommand::Shutdown) | Err(_) => break,
            Ok(WorkerCommand::Compute { request, cancel }) => {
                let id = request.id;
                let response = match &pool {
                    Some(pool) => pool.install(|| handle_compute(request, &cancel, &cache)),
                    None => handle_compute(request, &cancel, &cache),
                };
                if tx.send(response).is_err() {
                    debug!(id, "response receiver dropped, stopping worker");
                    break;
                }
            }
        }
    }
}

fn handle_compute(
    request: ComputeRequest,
    cancel: &CancelToken,
    cache: &ResultCache,
) -> WorkerResponse {
    let id = request.id;
    // Superseded before it started.
    if cancel.is_cancelled() {
        return WorkerResponse::Cancelled { id };
    }

    let key = request.cache_key();
    if let Some(result) = cache.get(&key) {
        return WorkerResponse::Completed {
            id,
            result,
            cached: true,
        };
    }

    let engine = match AdaptiveEngine::new(request.config) {
        Ok(engine) => engine,
        Err(e) => {
            return WorkerResponse::Failed {
                id,
                error: e.to_string(),
            }
        }
    };

    match engine.run_with_cancel(&request.bars, cancel) {
        Ok(result) => {
            let result = Arc::new(result);
            cache.put(key, Arc::clone(&result));
            WorkerResponse::Completed {
                id,
                result,
                cached: false,
            }
        }
        Err(EngineError::Cancelled) => {
            debug!(id, "computation superseded");
            WorkerResponse::Cancelled { id }
        }
        Err(e) => WorkerResponse::Failed {
            id,
            error: e.to_string(),
        },
    }
}

/// Owning handle to a running worker.
///
/// Dropping the handle shuts the worker down and joins its thread.
pub struct WorkerHandle {
    commands: Sender<WorkerCommand>,
    responses: Receiver<WorkerResponse>,
    current: Option<CancelToken>,
    next_id: u64,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Spawn a worker sharing `cache`.
    pub fn spawn(cache: Arc<ResultCache>, threads: usize) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        let thread = spawn_worker(cmd_rx, resp_tx, cache, threads)?;
        Ok(Self {
            commands: cmd_tx,
            responses: resp_rx,
            current: None,
            next_id: 1,
            thread: Some(thread),
        })
    }

    /// Queue a computation, cancelling whatever was submitted before.
    ///
    /// Returns the request id that the matching response will carry.
    pub fn submit(
        &mut self,
        symbol: impl Into<String>,
        timeframe: impl Into<String>,
        bars: Arc<Vec<Bar>>,
        config: EngineConfig,
    ) -> u64 {
        self.cancel();

        let id = self.next_id;
        self.next_id += 1;
        let cancel = CancelToken::new();
        self.current = Some(cancel.clone());

        let request = ComputeRequest {
            id,
            symbol: symbol.into(),
            timeframe: timeframe.into(),
            bars,
            config,
        };
        if self
            .commands
            .send(WorkerCommand::Compute { request, cancel })
            .is_err()
        {
            warn!(id, "worker is gone, request dropped");
        }
        id
    }

    /// Cancel the most recent request, if any.
    pub fn cancel(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
        }
    }

    /// Block until the next response. `None` once the worker has stopped.
    pub fn recv(&self) -> Option<WorkerResponse> {
        self.responses.recv().ok()
    }

    /// Wait up to `timeout` for the next response.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<WorkerResponse> {
        self.responses.recv_timeout(timeout).ok()
    }

    /// Non-blocking poll.
    pub fn try_recv(&self) -> Option<WorkerResponse> {
        self.responses.try_recv().ok()
    }

    /// Block until the response for request `id`, discarding older ones.
    pub fn wait_for(&self, id: u64) -> Option<WorkerResponse> {
        loop {
            let response = self.recv()?;
            if response.id() == id {
                return Some(response);
            }
        }
    }

    /// Cancel outstanding work, stop the thread and wait for it.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.cancel();
        let _ = self.commands.send(WorkerCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("worker thread panicked");
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
