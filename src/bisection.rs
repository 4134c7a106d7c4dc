use crate::{Assignment, BestCell, Group, Job, Problem, Solution};

/// Whether partial weights are checked against the best complete weight.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum Pruning {
    /// Branches whose accumulated weight reaches the best weight are dropped.
    #[default]
    Enabled,
    /// Every branch is followed to a complete assignment.
    Disabled,
}

/// Decides when a branch point forks into two concurrent tasks.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ForkPolicy {
    /// Branch points within this many nodes of the end run inline.
    pub sequential_tail: usize,
}

impl Default for ForkPolicy {
    fn default() -> Self {
        Self { sequential_tail: 10 }
    }
}

impl ForkPolicy {
    pub fn should_fork(&self, position: usize, n: usize) -> bool {
        position + self.sequential_tail < n
    }
}

/// Outcome of fixing node `position - 1`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum Visit {
    Pruned,
    Complete(f64),
    /// Node `position` was already set by an exclusion.
    Forced(f64),
    Branch(f64),
}

/// Splits a problem into two groups while minimizing the cut weight.
///
/// Nodes are fixed in index order. Fixing a node propagates its exclusion,
/// then adds the weight of every cut edge whose higher endpoint is that
/// node, so each edge is counted exactly once.
#[derive(Copy, Clone, Debug)]
pub struct BranchAndBound<'a> {
    problem: &'a Problem,
    best: &'a BestCell,
    pruning: Pruning,
}

impl<'a> BranchAndBound<'a> {
    pub fn new(problem: &'a Problem, best: &'a BestCell) -> Self {
        Self {
            problem,
            best,
            pruning: Pruning::Enabled,
        }
    }

    pub fn with_pruning(mut self, pruning: Pruning) -> Self {
        self.pruning = pruning;
        self
    }

    /// Exhausts the subtree below `job` on the calling thread.
    pub fn search(&self, job: Job) {
        self.descend(job.position, job.assignment, job.weight);
    }

    /// Like [`search`](Self::search), but forks both children of a branch
    /// point as rayon tasks while `policy` allows it. Call it inside a pool.
    pub fn search_forking(&self, job: Job, policy: ForkPolicy) {
        self.descend_forking(job.position, job.assignment, job.weight, policy);
    }

    pub(crate) fn visit(&self, position: usize, assignment: &mut Assignment, mut weight: f64) -> Visit {
        debug_assert!(position > 0);
        let fixed = position - 1;

        if let Some(dependent) = self.problem.dependent_of(fixed) {
            assignment[dependent] = assignment[fixed].opposite();
        }

        for e in self.problem.closing_edges(fixed) {
            if assignment[e.a as usize] != assignment[e.b as usize] {
                weight += e.weight;
            }
        }

        if self.pruning == Pruning::Enabled && weight >= self.best.weight() {
            return Visit::Pruned;
        }

        if position == self.problem.node_count() {
            Visit::Complete(weight)
        } else if assignment[position].is_set() {
            Visit::Forced(weight)
        } else {
            Visit::Branch(weight)
        }
    }

    pub(crate) fn complete(&self, assignment: Assignment, weight: f64) {
        self.best.try_improve(Solution::new(assignment, weight));
    }

    fn descend(&self, position: usize, mut assignment: Assignment, weight: f64) {
        match self.visit(position, &mut assignment, weight) {
            Visit::Pruned => {}
            Visit::Complete(weight) => self.complete(assignment, weight),
            Visit::Forced(weight) => self.descend(position + 1, assignment, weight),
            Visit::Branch(weight) => {
                let (first, second) = split(assignment, position);
                self.descend(position + 1, first, weight);
                self.descend(position + 1, second, weight);
            }
        }
    }

    fn descend_forking(&self, position: usize, mut assignment: Assignment, weight: f64, policy: ForkPolicy) {
        match self.visit(position, &mut assignment, weight) {
            Visit::Pruned => {}
            Visit::Complete(weight) => self.complete(assignment, weight),
            Visit::Forced(weight) => self.descend_forking(position + 1, assignment, weight, policy),
            Visit::Branch(weight) => {
                let (first, second) = split(assignment, position);
                if policy.should_fork(position, self.problem.node_count()) {
                    rayon::join(
                        || self.descend_forking(position + 1, first, weight, policy),
                        || self.descend_forking(position + 1, second, weight, policy),
                    );
                } else {
                    self.descend(position + 1, first, weight);
                    self.descend(position + 1, second, weight);
                }
            }
        }
    }
}

/// The two children of a branch point, each owning its own buffer.
pub(crate) fn split(mut assignment: Assignment, position: usize) -> (Assignment, Assignment) {
    let mut second = assignment.clone();
    assignment[position] = Group::First;
    second[position] = Group::Second;
    (assignment, second)
}
