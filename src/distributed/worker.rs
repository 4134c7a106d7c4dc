use super::{FromWorker, ToWorker, WorkerTransport};
use crate::parallel::{build_pool, solve_data_parallel};
use crate::{frontier_levels, BestCell, BranchAndBound, ProtocolError, Pruning, SolveError};

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Threads used to solve each received job.
    pub threads: usize,
    /// Levels each received job is re-expanded by. Derived from `threads` when `None`.
    pub frontier_levels: Option<usize>,
    pub pruning: Pruning,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            threads: num_cpus::get(),
            frontier_levels: None,
            pruning: Pruning::Enabled,
        }
    }
}

/// Receives the problem once, then solves jobs until told to terminate.
pub struct Worker<T> {
    transport: T,
    config: WorkerConfig,
}

impl<T: WorkerTransport> Worker<T> {
    pub fn new(transport: T, config: WorkerConfig) -> Self {
        Self { transport, config }
    }

    /// Runs the worker loop and returns the number of jobs handled.
    ///
    /// The best solution is kept for the worker's whole lifetime, so later
    /// jobs are pruned against everything this worker found before.
    pub fn run(mut self) -> Result<usize, SolveError> {
        let (id, problem) = match self.transport.recv()? {
            ToWorker::Setup { worker, problem } => (worker, problem),
            other => {
                return Err(ProtocolError::Unexpected {
                    expected: "setup",
                    received: other.kind(),
                }
                .into())
            }
        };
        log::debug!(
            "worker {} received problem {} with {} nodes",
            id,
            problem.name,
            problem.node_count()
        );

        let pool = build_pool(self.config.threads)?;
        let levels = self
            .config
            .frontier_levels
            .unwrap_or_else(|| frontier_levels(pool.current_num_threads()));
        let best = BestCell::new();
        let kernel = BranchAndBound::new(&problem, &best).with_pruning(self.config.pruning);

        let mut handled = 0;
        loop {
            match self.transport.recv()? {
                ToWorker::Job(job) => {
                    job.check(&problem)?;
                    log::trace!("worker {} got job at position {} weight {}", id, job.position, job.weight);
                    solve_data_parallel(&kernel, &pool, job, levels);
                    handled += 1;
                    self.transport.send(FromWorker::Report {
                        worker: id,
                        best: best.snapshot(),
                    })?;
                }
                ToWorker::Terminate => break,
                other => {
                    return Err(ProtocolError::Unexpected {
                        expected: "job or terminate",
                        received: other.kind(),
                    }
                    .into())
                }
            }
        }
        log::debug!("worker {} terminating after {} jobs", id, handled);
        Ok(handled)
    }
}
