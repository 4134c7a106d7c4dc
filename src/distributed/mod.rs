//! Coordinator/worker distribution of frontier jobs.
//!
//! # Protocol
//!
//! - The coordinator sends [`ToWorker::Setup`] to every worker before any
//!   job: a copy of the problem plus the worker's identifier.
//! - It expands the search tree into a queue of jobs and hands one job to
//!   each idle worker, then waits for whichever worker reports first.
//! - A worker answers every [`ToWorker::Job`] with [`FromWorker::Report`],
//!   carrying its identifier and the best solution it has seen so far.
//! - Once the queue is empty and no job is outstanding, every worker gets a
//!   single [`ToWorker::Terminate`] and exits.
//!
//! Workers never share bounds with each other or with the coordinator
//! while jobs run; the coordinator's fold over all reports yields the optimum.
//!
//! Transports are traits so the same logic runs over in-memory channels
//! ([`channel`]) or TCP connections ([`tcp`]).

pub mod channel;
pub mod coordinator;
pub mod tcp;
pub mod worker;

pub use coordinator::Coordinator;
pub use worker::{Worker, WorkerConfig};

use crate::parallel::SolverConfig;
use crate::{frontier_levels, BestCell, Job, Problem, ProtocolError, Solution, SolveError};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(pub usize);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Messages from the coordinator to one worker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ToWorker {
    Setup { worker: WorkerId, problem: Problem },
    Job(Job),
    /// No more jobs will follow.
    Terminate,
}

impl ToWorker {
    pub fn kind(&self) -> &'static str {
        match self {
            ToWorker::Setup { .. } => "setup",
            ToWorker::Job(_) => "job",
            ToWorker::Terminate => "terminate",
        }
    }
}

/// Messages from a worker to the coordinator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FromWorker {
    /// `best` is `None` while the worker has not completed any assignment.
    Report { worker: WorkerId, best: Option<Solution> },
}

/// Coordinator side of a transport: addressed sends, receive from anyone.
pub trait CoordinatorTransport {
    fn worker_count(&self) -> usize;
    fn send(&mut self, worker: WorkerId, message: ToWorker) -> Result<(), ProtocolError>;
    /// Blocks until any worker sends something.
    fn recv(&mut self) -> Result<FromWorker, ProtocolError>;
}

/// Worker side of a transport, connected to the coordinator only.
pub trait WorkerTransport {
    fn recv(&mut self) -> Result<ToWorker, ProtocolError>;
    fn send(&mut self, message: FromWorker) -> Result<(), ProtocolError>;
}

impl<T: CoordinatorTransport + ?Sized> CoordinatorTransport for &mut T {
    fn worker_count(&self) -> usize {
        (**self).worker_count()
    }

    fn send(&mut self, worker: WorkerId, message: ToWorker) -> Result<(), ProtocolError> {
        (**self).send(worker, message)
    }

    fn recv(&mut self) -> Result<FromWorker, ProtocolError> {
        (**self).recv()
    }
}

impl<T: WorkerTransport + ?Sized> WorkerTransport for &mut T {
    fn recv(&mut self) -> Result<ToWorker, ProtocolError> {
        (**self).recv()
    }

    fn send(&mut self, message: FromWorker) -> Result<(), ProtocolError> {
        (**self).send(message)
    }
}

/// Runs one coordinator and `config.workers` workers as threads joined by
/// in-memory channels. Workers share nothing but the channels.
pub fn run_local(problem: &Problem, config: &SolverConfig) -> Result<Solution, SolveError> {
    let workers = config.workers.max(1);
    let (coordinator_side, worker_sides) = channel::local_transports(workers);

    let worker_config = WorkerConfig {
        threads: config.threads,
        frontier_levels: None,
        pruning: config.pruning,
    };
    let handles: Vec<_> = worker_sides
        .into_iter()
        .map(|transport| {
            let worker_config = worker_config.clone();
            std::thread::spawn(move || Worker::new(transport, worker_config).run())
        })
        .collect();

    let best = BestCell::new();
    let levels = config.frontier_levels.unwrap_or_else(|| frontier_levels(workers));
    let outcome = Coordinator::new(coordinator_side)
        .with_pruning(config.pruning)
        .run(problem, &best, levels);

    // Join before looking at the outcome so no worker outlives the call.
    for (i, handle) in handles.into_iter().enumerate() {
        match handle.join() {
            Ok(Ok(jobs)) => log::debug!("worker {} handled {} jobs", i, jobs),
            Ok(Err(e)) => log::warn!("worker {} stopped: {}", i, e),
            Err(_) => return Err(SolveError::WorkerPanicked(i)),
        }
    }
    outcome?;

    best.into_inner().ok_or(SolveError::NoSolution)
}
