use crate::distributed;
use crate::{frontier_levels, BestCell, BranchAndBound, ForkPolicy, Job, Problem, Pruning, Solution, SolveError};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::fmt;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Strategy {
    /// Plain recursion on the calling thread.
    Sequential,
    /// Expand a frontier up front, then solve its jobs on a thread pool.
    DataParallel,
    /// Fork both children of each branch point until the fork policy says stop.
    TaskParallel,
    /// Hand frontier jobs to independent workers over message channels.
    Distributed,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Sequential => "Sequential",
            Strategy::DataParallel => "Data parallelism",
            Strategy::TaskParallel => "Task parallelism",
            Strategy::Distributed => "Distributed",
        };
        f.write_str(name)
    }
}

pub struct SolverConfig {
    /// How the search tree is spread over threads or workers.
    pub strategy: Strategy,
    /// Threads of the local pool. For `Distributed` this is the pool size of each worker.
    pub threads: usize,
    /// Number of workers for `Distributed`.
    pub workers: usize,
    /// Free branch levels expanded before handing out jobs. Derived from
    /// `threads` (or `workers`) when `None`.
    pub frontier_levels: Option<usize>,
    /// When `TaskParallel` stops forking.
    pub fork_policy: ForkPolicy,
    /// Turning pruning off visits every complete assignment; only useful for checking results.
    pub pruning: Pruning,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::DataParallel,
            threads: num_cpus::get(),
            workers: num_cpus::get(),
            frontier_levels: None,
            fork_policy: ForkPolicy::default(),
            pruning: Pruning::Enabled,
        }
    }
}

/// Finds a minimum-weight assignment of `problem` with the configured strategy.
pub fn solve(problem: &Problem, config: &SolverConfig) -> Result<Solution, SolveError> {
    let best = BestCell::new();
    let kernel = BranchAndBound::new(problem, &best).with_pruning(config.pruning);
    match config.strategy {
        Strategy::Distributed => return distributed::run_local(problem, config),
        Strategy::Sequential => kernel.search(Job::root(problem)),
        Strategy::DataParallel => {
            let pool = build_pool(config.threads)?;
            let levels = config.frontier_levels.unwrap_or_else(|| frontier_levels(config.threads));
            solve_data_parallel(&kernel, &pool, Job::root(problem), levels);
        }
        Strategy::TaskParallel => {
            let pool = build_pool(config.threads)?;
            log::debug!("forking until {} nodes remain", config.fork_policy.sequential_tail);
            pool.install(|| kernel.search_forking(Job::root(problem), config.fork_policy));
        }
    }

    let solution = best.into_inner().ok_or(SolveError::NoSolution)?;
    log::info!("{} finished with weight {}", config.strategy, solution.weight);
    Ok(solution)
}

pub(crate) fn build_pool(threads: usize) -> Result<ThreadPool, SolveError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()?;
    log::debug!("thread pool with {} threads", pool.current_num_threads());
    Ok(pool)
}

/// Expands `job` into a frontier and runs every frontier job on `pool`.
/// Jobs are claimed one at a time so long subtrees do not hold up short ones.
pub(crate) fn solve_data_parallel(kernel: &BranchAndBound<'_>, pool: &ThreadPool, job: Job, levels: usize) {
    let jobs = kernel.expand(job, levels);
    log::trace!("solving {} frontier jobs", jobs.len());
    pool.install(|| {
        jobs.into_par_iter()
            .with_max_len(1)
            .for_each(|job| kernel.search(job))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::{random_problem, GeneratorConfig};

    fn config(strategy: Strategy) -> SolverConfig {
        SolverConfig {
            strategy,
            threads: 3,
            workers: 2,
            ..Default::default()
        }
    }

    #[test]
    fn strategy_names() {
        assert_eq!(Strategy::DataParallel.to_string(), "Data parallelism");
        assert_eq!(Strategy::TaskParallel.to_string(), "Task parallelism");
    }

    #[test]
    fn local_strategies_agree() {
        let problem = random_problem(&GeneratorConfig {
            nodes: 14,
            degree: 4,
            exclusions: 3,
            rng_seed: 7,
            ..Default::default()
        })
        .unwrap();
        let reference = solve(&problem, &config(Strategy::Sequential)).unwrap();
        for strategy in [Strategy::DataParallel, Strategy::TaskParallel] {
            let s = solve(&problem, &config(strategy)).unwrap();
            assert_eq!(s.weight, reference.weight, "{strategy}");
            assert_eq!(problem.cut_weight(&s.assignment), s.weight);
        }
    }

    #[test]
    fn explicit_frontier_levels_are_honoured() {
        let problem = random_problem(&GeneratorConfig {
            nodes: 10,
            degree: 3,
            rng_seed: 3,
            ..Default::default()
        })
        .unwrap();
        let reference = solve(&problem, &config(Strategy::Sequential)).unwrap();
        for levels in [0, 1, 4, 20] {
            let s = solve(
                &problem,
                &SolverConfig {
                    frontier_levels: Some(levels),
                    ..config(Strategy::DataParallel)
                },
            )
            .unwrap();
            assert_eq!(s.weight, reference.weight, "levels {levels}");
        }
    }
}
