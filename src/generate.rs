use crate::{Edge, Node, Problem, ProblemError};
use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

pub struct GeneratorConfig {
    /// The seed for the random number generator.
    pub rng_seed: u64,
    /// Number of nodes.
    pub nodes: u32,
    /// Average degree, capped at `nodes - 1`; the problem gets
    /// `nodes * degree / 2` distinct edges.
    pub degree: u32,
    /// Number of exclusion pairs. Capped at `nodes - 1`.
    pub exclusions: u32,
    /// Smallest edge weight (inclusive).
    pub min_weight: u32,
    /// Largest edge weight (inclusive).
    pub max_weight: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            rng_seed: 1234,
            nodes: 20,
            degree: 4,
            exclusions: 0,
            min_weight: 1,
            max_weight: 100,
        }
    }
}

/// Builds a random problem. Weights are whole numbers so that every
/// summation order yields exactly the same total.
pub fn random_problem(config: &GeneratorConfig) -> Result<Problem, ProblemError> {
    let mut rng = StdRng::seed_from_u64(config.rng_seed);
    let n = config.nodes;

    // A simple graph has no node of degree `n` or more.
    let degree = config.degree.min(n.saturating_sub(1));
    let edge_count = n as usize * degree as usize / 2;
    let mut seen = HashSet::with_capacity(edge_count);
    let mut edges = Vec::with_capacity(edge_count);
    while edges.len() < edge_count {
        let a = rng.gen_range(0..n);
        let b = rng.gen_range(0..n);
        if a == b || !seen.insert((a.min(b), a.max(b))) {
            continue;
        }
        let weight = rng.gen_range(config.min_weight..=config.max_weight.max(config.min_weight));
        edges.push(Edge::new(a.min(b), a.max(b), weight as f64));
    }

    // Take distinct dependents, then give each, smallest first, an unused
    // trigger below it. The i-th smallest dependent is at least i + 1, so a
    // free trigger always exists.
    let exclusion_count = config.exclusions.min(n.saturating_sub(1)) as usize;
    let mut dependents: Vec<Node> = index::sample(&mut rng, n.saturating_sub(1) as usize, exclusion_count)
        .into_iter()
        .map(|i| i as Node + 1)
        .collect();
    dependents.sort_unstable();

    let mut triggers = HashSet::with_capacity(exclusion_count);
    let mut exclusions = Vec::with_capacity(exclusion_count);
    for d in dependents {
        let free: Vec<Node> = (0..d).filter(|t| !triggers.contains(t)).collect();
        if let Some(&t) = free.choose(&mut rng) {
            triggers.insert(t);
            exclusions.push((t, d));
        }
    }
    exclusions.shuffle(&mut rng);

    log::debug!(
        "generated problem with {} nodes, {} edges, {} exclusions",
        n,
        edges.len(),
        exclusions.len()
    );
    Problem::new(
        format!("random-{}-{}-{}", n, degree, config.rng_seed),
        n,
        degree,
        edges,
        exclusions,
    )
}
