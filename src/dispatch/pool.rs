//! Fixed-size trial worker pool.
//!
//! Each worker owns a capacity-1 channel and an in-flight flag, so a worker is
//! never addressed by more than one outstanding request. The pool is sized
//! once and torn down on drop: senders are closed first, then every thread is
//! joined.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use log::debug;

use super::simulator::{SimulationOutcome, SimulationRequest, Simulator};
use crate::error::{ExecutionError, ExplorerError, ExplorerResult};

/// Upper bound on pool size.
pub const MAX_WORKERS: usize = 8;

/// Pool size for this machine: `min(cpus, MAX_WORKERS)`, at least 1.
#[must_use]
pub fn default_pool_size() -> usize {
    num_cpus::get().clamp(1, MAX_WORKERS)
}

enum Job {
    Simulate {
        request: SimulationRequest,
        reply: Sender<ExplorerResult<SimulationOutcome>>,
    },

    #[cfg(test)]
    Stall {
        duration: Duration,
        reply: Sender<()>,
    },
}

struct Worker {
    tx: Sender<Job>,
    busy: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// A fixed set of simulator threads.
pub struct TrialPool {
    workers: Vec<Worker>,
}

impl TrialPool {
    /// Starts `size` workers (at least 1) sharing `simulator`.
    pub fn start(size: usize, simulator: Arc<dyn Simulator>) -> ExplorerResult<Self> {
        let size = size.clamp(1, MAX_WORKERS);
        let mut workers = Vec::with_capacity(size);

        for idx in 0..size {
            let (tx, rx) = bounded::<Job>(1);
            let busy = Arc::new(AtomicBool::new(false));
            let simulator = Arc::clone(&simulator);
            let flag = Arc::clone(&busy);

            let handle = thread::Builder::new()
                .name(format!("deckexplorer-trial-{idx}"))
                .spawn(move || run_worker(&rx, &flag, simulator.as_ref()))
                .map_err(|e| ExecutionError::WorkerSpawn {
                    message: e.to_string(),
                })?;
            workers.push(Worker { tx, busy, handle });
        }

        debug!("started trial pool with {size} workers");
        Ok(Self { workers })
    }

    /// Number of workers.
    #[must_use]
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Indices of workers with no request in flight.
    #[must_use]
    pub fn idle_workers(&self) -> Vec<usize> {
        self.workers
            .iter()
            .enumerate()
            .filter(|(_, w)| !w.busy.load(Ordering::Acquire))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Sends `request` to `worker`.
    ///
    /// Fails with [`ExecutionError::WorkerBusy`] if that worker still has a
    /// request in flight.
    pub fn submit(&self, worker: usize, request: SimulationRequest) -> ExplorerResult<TrialHandle> {
        let (reply, rx) = bounded(1);
        self.dispatch(worker, Job::Simulate { request, reply })?;
        Ok(TrialHandle { worker, rx })
    }

    fn dispatch(&self, worker: usize, job: Job) -> ExplorerResult<()> {
        let w = self
            .workers
            .get(worker)
            .ok_or(ExecutionError::Disconnected { worker })?;

        if w
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ExecutionError::WorkerBusy { worker }.into());
        }

        match w.tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                w.busy.store(false, Ordering::Release);
                Err(ExecutionError::WorkerBusy { worker }.into())
            }
            Err(TrySendError::Disconnected(_)) => {
                w.busy.store(false, Ordering::Release);
                Err(ExecutionError::Disconnected { worker }.into())
            }
        }
    }

    /// Closes every channel and joins every thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let workers = std::mem::take(&mut self.workers);
        let mut handles = Vec::with_capacity(workers.len());
        // Close all channels before joining so idle workers exit together.
        for Worker { tx, handle, .. } in workers {
            drop(tx);
            handles.push(handle);
        }
        for handle in handles {
            let _ = handle.join();
        }
    }

    #[cfg(test)]
    fn submit_stall(&self, worker: usize, duration: Duration) -> ExplorerResult<Receiver<()>> {
        let (reply, rx) = bounded(1);
        self.dispatch(worker, Job::Stall { duration, reply })?;
        Ok(rx)
    }
}

impl Drop for TrialPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(rx: &Receiver<Job>, busy: &AtomicBool, simulator: &dyn Simulator) {
    while let Ok(job) = rx.recv() {
        match job {
            Job::Simulate { request, reply } => {
                let result = simulator.simulate(&request.config, &request.strategy_name, request.num_runs);
                busy.store(false, Ordering::Release);
                let _ = reply.send(result);
            }

            #[cfg(test)]
            Job::Stall { duration, reply } => {
                thread::sleep(duration);
                busy.store(false, Ordering::Release);
                let _ = reply.send(());
            }
        }
    }
}

/// Reply handle of one submitted request.
#[derive(Debug)]
pub struct TrialHandle {
    worker: usize,
    rx: Receiver<ExplorerResult<SimulationOutcome>>,
}

impl TrialHandle {
    /// Worker the request was sent to.
    #[must_use]
    pub const fn worker(&self) -> usize {
        self.worker
    }

    /// Waits for the reply.
    pub fn join(self) -> ExplorerResult<SimulationOutcome> {
        self.rx
            .recv()
            .map_err(|_| ExplorerError::from(ExecutionError::Disconnected { worker: self.worker }))?
    }

    /// Waits for the reply for at most `timeout`.
    pub fn join_timeout(self, timeout: Duration) -> ExplorerResult<SimulationOutcome> {
        let worker = self.worker;
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => ExplorerError::from(ExecutionError::Timeout {
                duration_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
            }),
            RecvTimeoutError::Disconnected => ExecutionError::Disconnected { worker }.into(),
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::simulator::SimulationConfig;
    use crate::loadout::Loadout;

    fn request(num_runs: usize) -> SimulationRequest {
        SimulationRequest {
            config: Arc::new(SimulationConfig::new(Loadout::default(), serde_json::Value::Null)),
            strategy_name: "HeuristicStrategy".to_string(),
            num_runs,
        }
    }

    fn counting_pool(size: usize) -> TrialPool {
        let sim = |_: &SimulationConfig, _: &str, runs: usize| -> ExplorerResult<SimulationOutcome> {
            Ok(SimulationOutcome::new((0..runs).map(|i| i as f64).collect()))
        };
        TrialPool::start(size, Arc::new(sim)).unwrap()
    }

    #[test]
    fn pool_size_is_clamped() {
        assert_eq!(counting_pool(0).size(), 1);
        assert_eq!(counting_pool(3).size(), 3);
        assert_eq!(counting_pool(100).size(), MAX_WORKERS);
        assert!((1..=MAX_WORKERS).contains(&default_pool_size()));
    }

    #[test]
    fn submit_and_join() {
        let pool = counting_pool(2);
        let handle = pool.submit(1, request(4)).unwrap();
        assert_eq!(handle.worker(), 1);
        let outcome = handle.join_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(outcome.scores, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn busy_worker_rejects_second_request() {
        let pool = counting_pool(2);
        let stall = pool.submit_stall(0, Duration::from_millis(200)).unwrap();

        assert_eq!(pool.idle_workers(), vec![1]);
        let err = pool.submit(0, request(1)).unwrap_err();
        assert!(matches!(err, ExplorerError::Execution(ExecutionError::WorkerBusy { worker: 0 })));
        assert!(err.is_retryable());

        // The other worker is unaffected.
        pool.submit(1, request(1)).unwrap().join().unwrap();

        stall.recv_timeout(Duration::from_secs(2)).unwrap();
        // Flag is cleared before the reply is sent.
        assert_eq!(pool.idle_workers(), vec![0, 1]);
    }

    #[test]
    fn unknown_worker_is_disconnected() {
        let pool = counting_pool(1);
        let err = pool.submit(5, request(1)).unwrap_err();
        assert!(matches!(err, ExplorerError::Execution(ExecutionError::Disconnected { worker: 5 })));
    }

    #[test]
    fn join_timeout_reports_timeout_while_worker_runs() {
        let sim = |_: &SimulationConfig, _: &str, _: usize| -> ExplorerResult<SimulationOutcome> {
            thread::sleep(Duration::from_millis(300));
            Ok(SimulationOutcome::new(vec![1.0]))
        };
        let pool = TrialPool::start(1, Arc::new(sim)).unwrap();
        let err = pool
            .submit(0, request(1))
            .unwrap()
            .join_timeout(Duration::from_millis(20))
            .unwrap_err();
        assert!(matches!(
            err,
            ExplorerError::Execution(ExecutionError::Timeout { duration_ms: 20 })
        ));
    }

    #[test]
    fn join_reports_disconnected_when_reply_sender_dropped() {
        let (tx, rx) = bounded::<ExplorerResult<SimulationOutcome>>(1);
        drop(tx);

        let handle = TrialHandle { worker: 3, rx };
        let err = handle.join().unwrap_err();
        assert!(matches!(err, ExplorerError::Execution(ExecutionError::Disconnected { worker: 3 })));
    }

    #[test]
    fn join_timeout_reports_disconnected_not_timeout_when_reply_sender_dropped() {
        let (tx, rx) = bounded::<ExplorerResult<SimulationOutcome>>(1);
        drop(tx);

        let handle = TrialHandle { worker: 0, rx };
        let err = handle.join_timeout(Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, ExplorerError::Execution(ExecutionError::Disconnected { worker: 0 })));
    }

    #[test]
    fn simulator_errors_are_forwarded() {
        let sim = |_: &SimulationConfig, _: &str, _: usize| -> ExplorerResult<SimulationOutcome> {
            Err(ExecutionError::Simulator {
                message: "bad stage".to_string(),
            }
            .into())
        };
        let pool = TrialPool::start(1, Arc::new(sim)).unwrap();
        let err = pool.submit(0, request(1)).unwrap().join().unwrap_err();
        assert!(err.to_string().contains("bad stage"));
    }

    #[test]
    fn shutdown_joins_workers() {
        let pool = counting_pool(4);
        pool.shutdown();
    }
}
