//! Every strategy must find the same optimum as an exhaustive check.

use bnb_partition::generate::{random_problem, GeneratorConfig};
use bnb_partition::{solve, Assignment, Edge, Group, Problem, Pruning, Solution, SolverConfig, Strategy};

const STRATEGIES: [Strategy; 4] = [
    Strategy::Sequential,
    Strategy::DataParallel,
    Strategy::TaskParallel,
    Strategy::Distributed,
];

fn config(strategy: Strategy) -> SolverConfig {
    SolverConfig {
        strategy,
        threads: 3,
        workers: 3,
        ..Default::default()
    }
}

/// Minimum cut over every rooted assignment that honours all exclusions.
fn exhaustive_minimum(problem: &Problem) -> f64 {
    let n = problem.node_count();
    let mut minimum = f64::INFINITY;
    for mask in 0u64..(1 << (n - 1)) {
        let groups = (0..n)
            .map(|v| {
                if v > 0 && mask & (1 << (v - 1)) != 0 {
                    Group::Second
                } else {
                    Group::First
                }
            })
            .collect::<Vec<_>>();
        let assignment = Assignment::from(groups);
        if problem.violated_exclusions(&assignment).is_empty() {
            minimum = minimum.min(problem.cut_weight(&assignment));
        }
    }
    minimum
}

fn check(problem: &Problem, solution: &Solution) {
    assert!(solution.assignment.is_complete());
    assert_eq!(solution.assignment[0], Group::First);
    assert!(problem.violated_exclusions(&solution.assignment).is_empty());
    assert_eq!(problem.cut_weight(&solution.assignment), solution.weight);
}

fn random(seed: u64, nodes: u32, exclusions: u32) -> Problem {
    random_problem(&GeneratorConfig {
        rng_seed: seed,
        nodes,
        degree: 4,
        exclusions,
        ..Default::default()
    })
    .unwrap()
}

#[test]
fn strategies_agree_with_exhaustive_search() {
    for seed in 0..6 {
        let problem = random(seed, 12, (seed % 4) as u32);
        let expected = exhaustive_minimum(&problem);
        for strategy in STRATEGIES {
            let solution = solve(&problem, &config(strategy)).unwrap();
            check(&problem, &solution);
            assert_eq!(solution.weight, expected, "{strategy} on seed {seed}");
        }
    }
}

#[test]
fn pruning_does_not_change_the_optimum() {
    for seed in 10..14 {
        let problem = random(seed, 11, 2);
        for strategy in STRATEGIES {
            let pruned = solve(&problem, &config(strategy)).unwrap();
            let full = solve(
                &problem,
                &SolverConfig {
                    pruning: Pruning::Disabled,
                    ..config(strategy)
                },
            )
            .unwrap();
            assert_eq!(pruned.weight, full.weight, "{strategy} on seed {seed}");
        }
    }
}

#[test]
fn zero_weights_give_zero() {
    let edges = vec![
        Edge::new(0, 1, 0.0),
        Edge::new(1, 2, 0.0),
        Edge::new(2, 3, 0.0),
        Edge::new(3, 0, 0.0),
    ];
    let problem = Problem::new("zeros", 4, 2, edges, vec![(0, 2), (1, 3)]).unwrap();
    for strategy in STRATEGIES {
        let solution = solve(&problem, &config(strategy)).unwrap();
        assert_eq!(solution.weight, 0.0, "{strategy}");
        check(&problem, &solution);
    }
}

#[test]
fn chained_exclusions_alternate_groups() {
    // 0 -> 2 -> 4: the forced nodes alternate, so both heavy edges are cut.
    let edges = vec![
        Edge::new(0, 2, 7.0),
        Edge::new(2, 4, 5.0),
        Edge::new(1, 3, 1.0),
        Edge::new(3, 4, 1.0),
        Edge::new(0, 1, 0.0),
    ];
    let problem = Problem::new("chain", 5, 2, edges, vec![(0, 2), (2, 4)]).unwrap();
    for strategy in STRATEGIES {
        let solution = solve(&problem, &config(strategy)).unwrap();
        check(&problem, &solution);
        assert_eq!(solution.weight, 12.0, "{strategy}");
        assert_eq!(solution.assignment[2], Group::Second);
        assert_eq!(solution.assignment[4], Group::First);
    }
}

#[test]
fn flipped_solution_has_the_same_weight() {
    let problem = random(21, 10, 3);
    let solution = solve(&problem, &config(Strategy::Sequential)).unwrap();
    let flipped = solution.assignment.flipped();
    assert_eq!(flipped[0], Group::Second);
    assert_eq!(problem.cut_weight(&flipped), solution.weight);
    assert!(problem.violated_exclusions(&flipped).is_empty());
}

#[test]
fn repeated_runs_agree() {
    let problem = random(33, 13, 2);
    for strategy in STRATEGIES {
        let first = solve(&problem, &config(strategy)).unwrap();
        for _ in 0..3 {
            let again = solve(&problem, &config(strategy)).unwrap();
            assert_eq!(again.weight, first.weight, "{strategy}");
        }
    }
}

#[test]
fn more_workers_than_jobs() {
    let problem = random(5, 4, 0);
    let solution = solve(
        &problem,
        &SolverConfig {
            workers: 16,
            threads: 1,
            ..config(Strategy::Distributed)
        },
    )
    .unwrap();
    assert_eq!(solution.weight, exhaustive_minimum(&problem));
}

#[test]
fn single_node_problem() {
    let problem = Problem::new("single", 1, 0, vec![], vec![]).unwrap();
    for strategy in STRATEGIES {
        let solution = solve(&problem, &config(strategy)).unwrap();
        assert_eq!(solution.weight, 0.0);
        assert_eq!(solution.assignment.groups(), &[Group::First]);
    }
}
