//! Suspended search states and the bounded expansion that produces them.

use crate::bisection::{split, Visit};
use crate::{ceil_log2, Assignment, BranchAndBound, Problem, ProtocolError};
use serde::{Deserialize, Serialize};

/// A suspended branch of the search: nodes `0..position` are set and
/// `weight` covers every edge completed before node `position - 1`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub position: usize,
    pub assignment: Assignment,
    pub weight: f64,
}

impl Job {
    /// The root of the search tree: node 0 in the first group, nothing else set.
    pub fn root(problem: &Problem) -> Self {
        Self {
            position: 1,
            assignment: Assignment::rooted(problem.node_count()),
            weight: 0.0,
        }
    }
}

impl Job {
    /// Rejects jobs the kernel cannot resume on `problem`: the position must
    /// lie in `1..=n`, every node before it must be set and the weight must be
    /// a valid partial cost.
    pub fn check(&self, problem: &Problem) -> Result<(), ProtocolError> {
        let nodes = problem.node_count();
        let fits = self.assignment.len() == nodes
            && (1..=nodes).contains(&self.position)
            && self.assignment.groups()[..self.position].iter().all(|g| g.is_set())
            && self.weight.is_finite()
            && self.weight >= 0.0;
        if fits {
            Ok(())
        } else {
            Err(ProtocolError::InvalidJob {
                position: self.position,
                len: self.assignment.len(),
                nodes,
            })
        }
    }
}

/// Number of free branching levels to expand so the frontier has a few jobs
/// per unit of parallelism.
pub fn frontier_levels(parallelism: usize) -> usize {
    ceil_log2(parallelism.max(1)) + 1
}

impl BranchAndBound<'_> {
    /// Expands `job` through `levels` free branch points and returns the
    /// states reached, at most `2^levels` of them. Pruned branches produce
    /// nothing; branches that complete early are offered to the best cell.
    pub fn expand(&self, job: Job, levels: usize) -> Vec<Job> {
        if levels == 0 {
            return vec![job];
        }
        let Job { position, assignment, weight } = job;
        let mut frontier = Vec::new();
        self.unfold(position, assignment, weight, levels, &mut frontier);
        log::debug!(
            "expanded {} levels from position {} into {} jobs",
            levels,
            position,
            frontier.len()
        );
        frontier
    }

    fn unfold(
        &self,
        position: usize,
        mut assignment: Assignment,
        weight: f64,
        levels: usize,
        frontier: &mut Vec<Job>,
    ) {
        match self.visit(position, &mut assignment, weight) {
            Visit::Pruned => {}
            Visit::Complete(weight) => self.complete(assignment, weight),
            Visit::Forced(weight) => self.unfold(position + 1, assignment, weight, levels, frontier),
            Visit::Branch(weight) => {
                let (first, second) = split(assignment, position);
                if levels == 1 {
                    frontier.push(Job { position: position + 1, assignment: first, weight });
                    frontier.push(Job { position: position + 1, assignment: second, weight });
                } else {
                    self.unfold(position + 1, first, weight, levels - 1, frontier);
                    self.unfold(position + 1, second, weight, levels - 1, frontier);
                }
            }
        }
    }
}
