//! In-memory transport for running coordinator and workers as threads.

use super::{CoordinatorTransport, FromWorker, ToWorker, WorkerId, WorkerTransport};
use crate::ProtocolError;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Channel endpoints for the coordinator.
pub struct LocalCoordinator {
    /// One sender per worker, indexed by worker id.
    to_workers: Vec<Sender<ToWorker>>,
    /// Shared by all workers.
    from_workers: Receiver<FromWorker>,
}

/// Channel endpoints for a worker.
pub struct LocalWorker {
    to_coordinator: Sender<FromWorker>,
    from_coordinator: Receiver<ToWorker>,
}

/// Creates connected endpoints for one coordinator and `workers` workers.
pub fn local_transports(workers: usize) -> (LocalCoordinator, Vec<LocalWorker>) {
    let (worker_tx, coordinator_rx) = unbounded();

    let mut to_workers = Vec::with_capacity(workers);
    let mut worker_sides = Vec::with_capacity(workers);
    for _ in 0..workers {
        let (coordinator_tx, worker_rx) = unbounded();
        to_workers.push(coordinator_tx);
        worker_sides.push(LocalWorker {
            to_coordinator: worker_tx.clone(),
            from_coordinator: worker_rx,
        });
    }

    let coordinator = LocalCoordinator {
        to_workers,
        from_workers: coordinator_rx,
    };
    (coordinator, worker_sides)
}

impl CoordinatorTransport for LocalCoordinator {
    fn worker_count(&self) -> usize {
        self.to_workers.len()
    }

    fn send(&mut self, worker: WorkerId, message: ToWorker) -> Result<(), ProtocolError> {
        self.to_workers
            .get(worker.0)
            .ok_or(ProtocolError::UnknownWorker(worker))?
            .send(message)
            .map_err(|_| ProtocolError::Disconnected)
    }

    fn recv(&mut self) -> Result<FromWorker, ProtocolError> {
        self.from_workers.recv().map_err(|_| ProtocolError::Disconnected)
    }
}

impl WorkerTransport for LocalWorker {
    fn recv(&mut self) -> Result<ToWorker, ProtocolError> {
        self.from_coordinator.recv().map_err(|_| ProtocolError::Disconnected)
    }

    fn send(&mut self, message: FromWorker) -> Result<(), ProtocolError> {
        self.to_coordinator
            .send(message)
            .map_err(|_| ProtocolError::Disconnected)
    }
}
