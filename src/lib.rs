// Minimum-weight two-way graph partitioning with exclusion constraints,
// solved exactly by branch-and-bound.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

pub mod bisection;
pub mod distributed;
pub mod error;
pub mod frontier;
pub mod generate;
pub mod incumbent;
pub mod parallel;
pub mod partition_util;

pub use bisection::{BranchAndBound, ForkPolicy, Pruning};
pub use error::{ProblemError, ProtocolError, SolveError};
pub use frontier::{frontier_levels, Job};
pub use incumbent::BestCell;
pub use parallel::{solve, SolverConfig, Strategy};
pub use partition_util::{Assignment, Group, Solution};

pub type Node = u32;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub a: Node,
    pub b: Node,
    pub weight: f64,
}

impl Edge {
    pub fn new(a: Node, b: Node, weight: f64) -> Self {
        Self { a, b, weight }
    }

    /// The endpoint whose assignment completes this edge.
    pub fn upper(&self) -> Node {
        self.a.max(self.b)
    }
}

/// Wire form of a problem; every received copy is validated again.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct ProblemData {
    name: String,
    n: u32,
    k: u32,
    edges: Vec<Edge>,
    exclusions: Vec<(Node, Node)>,
}

/// An immutable partitioning instance: `n` nodes, weighted edges and
/// exclusion pairs `(trigger, dependent)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProblemData", into = "ProblemData")]
pub struct Problem {
    pub name: String,
    n: u32,
    k: u32,
    edges: Vec<Edge>,
    exclusions: Vec<(Node, Node)>,
    /// `closing[v]` holds the edges whose higher endpoint is `v`.
    closing: Vec<Vec<Edge>>,
    dependents: Vec<Option<Node>>,
}

impl Problem {
    pub fn new(
        name: impl Into<String>,
        n: u32,
        k: u32,
        edges: Vec<Edge>,
        exclusions: Vec<(Node, Node)>,
    ) -> Result<Self, ProblemError> {
        if n == 0 {
            return Err(ProblemError::NoNodes);
        }
        // The text format derives the edge count from the header.
        let expected = n as usize * k as usize / 2;
        if edges.len() != expected {
            return Err(ProblemError::EdgeCount { n, k, expected, found: edges.len() });
        }

        let mut closing = vec![Vec::new(); n as usize];
        for (index, e) in edges.iter().enumerate() {
            if e.a >= n || e.b >= n {
                return Err(ProblemError::EdgeOutOfRange { index, a: e.a, b: e.b, n });
            }
            if !e.weight.is_finite() || e.weight < 0.0 {
                return Err(ProblemError::InvalidWeight { index, weight: e.weight });
            }
            closing[e.upper() as usize].push(*e);
        }

        let mut dependents = vec![None; n as usize];
        let mut forced = HashSet::new();
        for &(trigger, dependent) in exclusions.iter() {
            if trigger >= n || dependent >= n {
                return Err(ProblemError::ExclusionOutOfRange { trigger, dependent, n });
            }
            if dependent <= trigger {
                return Err(ProblemError::BackwardExclusion { trigger, dependent });
            }
            if dependents[trigger as usize].is_some() {
                return Err(ProblemError::DuplicateTrigger(trigger));
            }
            if !forced.insert(dependent) {
                return Err(ProblemError::DuplicateDependent(dependent));
            }
            dependents[trigger as usize] = Some(dependent);
        }

        Ok(Self {
            name: name.into(),
            n,
            k,
            edges,
            exclusions,
            closing,
            dependents,
        })
    }

    /// Loads a problem from its text form, using the path as its name.
    pub fn deserialize<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("could not read problem file {}", path.display()))?;
        Self::parse(path.display().to_string(), &text)
    }

    /// Parses the text format: a `n k b` header, `n*k/2` lines `a b weight`
    /// and `b` lines `trigger dependent`. Lines starting with `%` or `#` are skipped.
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty() && !l.starts_with('%') && !l.starts_with('#'));

        let (line_no, header) = lines.next().context("could not get header line")?;
        let header = parse_fields::<u32>(header, 3)
            .with_context(|| format!("line {line_no}: could not parse header"))?;
        let (n, k, b) = (header[0], header[1], header[2]);

        let edge_count = (n as usize * k as usize) / 2;
        let mut edges = Vec::with_capacity(edge_count);
        for _ in 0..edge_count {
            let (line_no, line) = lines.next().context("file ended before all edges were read")?;
            let parts = line.split_ascii_whitespace().collect::<Vec<_>>();
            if parts.len() != 3 {
                bail!("line {line_no}: expected `a b weight`, found {} fields", parts.len());
            }
            let a = parts[0]
                .parse()
                .with_context(|| format!("line {line_no}: could not parse edge endpoint"))?;
            let b = parts[1]
                .parse()
                .with_context(|| format!("line {line_no}: could not parse edge endpoint"))?;
            let weight = parts[2]
                .parse()
                .with_context(|| format!("line {line_no}: could not parse edge weight"))?;
            edges.push(Edge::new(a, b, weight));
        }

        let mut exclusions = Vec::with_capacity(b as usize);
        for _ in 0..b {
            let (line_no, line) = lines
                .next()
                .context("file ended before all exclusions were read")?;
            let pair = parse_fields::<Node>(line, 2)
                .with_context(|| format!("line {line_no}: could not parse exclusion"))?;
            exclusions.push((pair[0], pair[1]));
        }

        Ok(Self::new(name, n, k, edges, exclusions)?)
    }

    pub fn node_count(&self) -> usize {
        self.n as usize
    }

    pub fn degree(&self) -> u32 {
        self.k
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn exclusions(&self) -> &[(Node, Node)] {
        &self.exclusions
    }

    /// Edges completed once node `v` has a group.
    pub fn closing_edges(&self, v: usize) -> &[Edge] {
        &self.closing[v]
    }

    /// The node forced into the opposite group once `v` is fixed.
    pub fn dependent_of(&self, v: usize) -> Option<usize> {
        self.dependents[v].map(|d| d as usize)
    }
}

impl TryFrom<ProblemData> for Problem {
    type Error = ProblemError;

    fn try_from(data: ProblemData) -> Result<Self, Self::Error> {
        Problem::new(data.name, data.n, data.k, data.edges, data.exclusions)
    }
}

impl From<Problem> for ProblemData {
    fn from(p: Problem) -> Self {
        Self {
            name: p.name,
            n: p.n,
            k: p.k,
            edges: p.edges,
            exclusions: p.exclusions,
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {} {}", self.n, self.k, self.exclusions.len())?;
        for e in self.edges.iter() {
            writeln!(f, "{} {} {}", e.a, e.b, e.weight)?;
        }
        for (trigger, dependent) in self.exclusions.iter() {
            writeln!(f, "{trigger} {dependent}")?;
        }
        Ok(())
    }
}

fn parse_fields<T: std::str::FromStr>(line: &str, count: usize) -> Result<Vec<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let fields = line
        .split_ascii_whitespace()
        .map(|s| s.parse::<T>())
        .collect::<Result<Vec<_>, _>>()?;
    if fields.len() != count {
        bail!("expected {count} fields, found {}", fields.len());
    }
    Ok(fields)
}

/// `ceil(log2(x))`, with `ceil_log2(0) == ceil_log2(1) == 0`.
pub fn ceil_log2(x: usize) -> usize {
    if x <= 1 {
        0
    } else {
        (usize::BITS - (x - 1).leading_zeros()) as usize
    }
}
