use crate::distributed::WorkerId;
use crate::Node;
use thiserror::Error;

/// Reasons a problem description is rejected before any search starts.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProblemError {
    #[error("problem has no nodes")]
    NoNodes,
    #[error("{n} nodes of degree {k} need {expected} edges, found {found}")]
    EdgeCount { n: u32, k: u32, expected: usize, found: usize },
    #[error("edge {index} ({a}, {b}) has an endpoint outside [0, {n})")]
    EdgeOutOfRange { index: usize, a: Node, b: Node, n: u32 },
    #[error("edge {index} has weight {weight}, weights must be finite and non-negative")]
    InvalidWeight { index: usize, weight: f64 },
    #[error("exclusion ({trigger}, {dependent}) has an endpoint outside [0, {n})")]
    ExclusionOutOfRange { trigger: Node, dependent: Node, n: u32 },
    #[error("exclusion ({trigger}, {dependent}) forces a node at or before its trigger")]
    BackwardExclusion { trigger: Node, dependent: Node },
    #[error("node {0} triggers more than one exclusion")]
    DuplicateTrigger(Node),
    #[error("node {0} is the dependent of more than one exclusion")]
    DuplicateDependent(Node),
}

/// Failures of the coordinator/worker exchange.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("peer disconnected")]
    Disconnected,
    #[error("expected {expected}, received {received}")]
    Unexpected {
        expected: &'static str,
        received: &'static str,
    },
    #[error("report from unknown worker {0}")]
    UnknownWorker(WorkerId),
    #[error("report from worker {0} which had no job assigned")]
    IdleWorkerReported(WorkerId),
    #[error("job at position {position} with {len} labels does not fit a problem of {nodes} nodes")]
    InvalidJob { position: usize, len: usize, nodes: usize },
    #[error("{pending} jobs queued but no workers are connected")]
    NoWorkers { pending: usize },
    #[error("transport i/o failed")]
    Io(#[from] std::io::Error),
    #[error("could not encode or decode a message")]
    Codec(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SolveError {
    #[error("could not build thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("worker thread {0} panicked")]
    WorkerPanicked(usize),
    #[error("search finished without a complete assignment")]
    NoSolution,
}
