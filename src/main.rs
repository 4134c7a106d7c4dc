use anyhow::{Context, Result};
use bnb_partition::distributed::tcp::{TcpCoordinator, TcpWorker};
use bnb_partition::distributed::{Coordinator, Worker, WorkerConfig};
use bnb_partition::generate::{random_problem, GeneratorConfig};
use bnb_partition::{frontier_levels, BestCell, ForkPolicy, Problem, Pruning, SolveError, Solution, SolverConfig, Strategy};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::net::TcpListener;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "bnb-partition")]
#[command(about = "Exact minimum-weight graph bisection with exclusion constraints")]
#[command(version)]
#[command(subcommand_required = true)]
#[command(arg_required_else_help = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliStrategy {
    /// Single thread, no frontier
    Sequential,
    /// Frontier jobs on a thread pool
    Data,
    /// Fork both branches near the root
    Task,
    /// Coordinator and in-process workers over channels
    Distributed,
}

impl From<CliStrategy> for Strategy {
    fn from(cli: CliStrategy) -> Self {
        match cli {
            CliStrategy::Sequential => Strategy::Sequential,
            CliStrategy::Data => Strategy::DataParallel,
            CliStrategy::Task => Strategy::TaskParallel,
            CliStrategy::Distributed => Strategy::Distributed,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a problem file in this process
    Solve {
        /// Problem file
        problem: PathBuf,
        /// Threads; per worker for the distributed strategy
        threads: Option<usize>,
        #[arg(long, value_enum, default_value = "data")]
        strategy: CliStrategy,
        /// Number of workers for the distributed strategy
        #[arg(long)]
        workers: Option<usize>,
        /// Nodes left unforked at the bottom of the tree (task strategy)
        #[arg(long, default_value_t = ForkPolicy::default().sequential_tail)]
        threshold: usize,
        /// Free branch levels expanded before handing out jobs
        #[arg(long)]
        levels: Option<usize>,
        /// Visit every complete assignment
        #[arg(long)]
        no_pruning: bool,
    },
    /// Serve a problem to workers connecting over TCP
    Coordinate {
        /// Problem file
        problem: PathBuf,
        #[arg(long, default_value = "127.0.0.1:7878")]
        listen: String,
        /// Connections to wait for before starting
        #[arg(long)]
        workers: usize,
        #[arg(long)]
        levels: Option<usize>,
        #[arg(long)]
        no_pruning: bool,
    },
    /// Connect to a coordinator and solve the jobs it sends
    Work {
        #[arg(long, default_value = "127.0.0.1:7878")]
        connect: String,
        #[arg(long)]
        threads: Option<usize>,
        #[arg(long)]
        no_pruning: bool,
    },
    /// Write a random problem in the text format
    Generate {
        #[arg(long, default_value_t = 20)]
        nodes: u32,
        #[arg(long, default_value_t = 4)]
        degree: u32,
        #[arg(long, default_value_t = 0)]
        exclusions: u32,
        #[arg(long, default_value_t = 1234)]
        seed: u64,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn pruning(disabled: bool) -> Pruning {
    if disabled {
        Pruning::Disabled
    } else {
        Pruning::Enabled
    }
}

fn print_result(variant: &str, problem: &Problem, parallelism: &str, solution: &Solution, started: Instant) {
    println!("Variant: {variant}");
    println!("Problem: {}", problem.name);
    println!("{parallelism}");
    println!("Solution: {}", solution.assignment);
    println!("Weight: {}", solution.weight);
    println!("Elapsed time: {:.3}s", started.elapsed().as_secs_f64());
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Commands::Solve {
            problem,
            threads,
            strategy,
            workers,
            threshold,
            levels,
            no_pruning,
        } => {
            let problem = Problem::deserialize(&problem)?;
            let strategy = Strategy::from(strategy);
            let defaults = SolverConfig::default();
            let config = SolverConfig {
                strategy,
                // Distributed workers each get one thread unless told otherwise.
                threads: threads.unwrap_or(match strategy {
                    Strategy::Distributed => 1,
                    _ => defaults.threads,
                }),
                workers: workers.unwrap_or(defaults.workers),
                frontier_levels: levels,
                fork_policy: ForkPolicy {
                    sequential_tail: threshold,
                },
                pruning: pruning(no_pruning),
            };

            let started = Instant::now();
            let solution = bnb_partition::solve(&problem, &config)
                .with_context(|| format!("could not solve {}", problem.name))?;
            let parallelism = match strategy {
                Strategy::Sequential => "Threads: 1".to_string(),
                Strategy::Distributed => format!("Workers: {}", config.workers),
                _ => format!("Threads: {}", config.threads),
            };
            print_result(&strategy.to_string(), &problem, &parallelism, &solution, started);
        }
        Commands::Coordinate {
            problem,
            listen,
            workers,
            levels,
            no_pruning,
        } => {
            let problem = Problem::deserialize(&problem)?;
            let listener = TcpListener::bind(&listen).with_context(|| format!("could not listen on {listen}"))?;
            log::info!("waiting for {} workers on {}", workers, listener.local_addr()?);
            let transport = TcpCoordinator::accept(&listener, workers)?;

            let started = Instant::now();
            let best = BestCell::new();
            Coordinator::new(transport)
                .with_pruning(pruning(no_pruning))
                .run(&problem, &best, levels.unwrap_or_else(|| frontier_levels(workers)))?;
            let solution = best.into_inner().ok_or(SolveError::NoSolution)?;
            print_result(
                &Strategy::Distributed.to_string(),
                &problem,
                &format!("Workers: {workers}"),
                &solution,
                started,
            );
        }
        Commands::Work {
            connect,
            threads,
            no_pruning,
        } => {
            let transport =
                TcpWorker::connect(&connect).with_context(|| format!("could not connect to {connect}"))?;
            let config = WorkerConfig {
                threads: threads.unwrap_or_else(|| WorkerConfig::default().threads),
                frontier_levels: None,
                pruning: pruning(no_pruning),
            };
            let jobs = Worker::new(transport, config).run()?;
            log::info!("handled {} jobs", jobs);
        }
        Commands::Generate {
            nodes,
            degree,
            exclusions,
            seed,
            output,
        } => {
            let problem = random_problem(&GeneratorConfig {
                rng_seed: seed,
                nodes,
                degree,
                exclusions,
                ..Default::default()
            })?;
            match output {
                Some(path) => fs::write(&path, problem.to_string())
                    .with_context(|| format!("could not write {}", path.display()))?,
                None => print!("{problem}"),
            }
        }
    }
    Ok(())
}
