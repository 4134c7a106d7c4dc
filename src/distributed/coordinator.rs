use super::{CoordinatorTransport, FromWorker, ToWorker, WorkerId};
use crate::{BestCell, BranchAndBound, Job, Problem, ProtocolError, Pruning};
use std::collections::VecDeque;

/// Hands out frontier jobs to idle workers and folds their reports.
pub struct Coordinator<T> {
    transport: T,
    pruning: Pruning,
}

impl<T: CoordinatorTransport> Coordinator<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            pruning: Pruning::Enabled,
        }
    }

    /// Pruning used while the coordinator expands its own frontier.
    pub fn with_pruning(mut self, pruning: Pruning) -> Self {
        self.pruning = pruning;
        self
    }

    /// Full run: problem broadcast, frontier expansion to `levels`, then
    /// distribution until every job has been reported.
    pub fn run(mut self, problem: &Problem, best: &BestCell, levels: usize) -> Result<(), ProtocolError> {
        self.broadcast(problem)?;
        let jobs = BranchAndBound::new(problem, best)
            .with_pruning(self.pruning)
            .expand(Job::root(problem), levels);
        self.distribute(jobs, best)
    }

    /// Sends every worker its own copy of the problem.
    pub fn broadcast(&mut self, problem: &Problem) -> Result<(), ProtocolError> {
        for w in 0..self.transport.worker_count() {
            log::trace!("sending problem to worker {}", w);
            self.transport.send(
                WorkerId(w),
                ToWorker::Setup {
                    worker: WorkerId(w),
                    problem: problem.clone(),
                },
            )?;
        }
        Ok(())
    }

    /// Dispatches `jobs`, one per idle worker, folding each report into
    /// `best`. Terminates every worker once the queue is drained and
    /// nothing is outstanding.
    pub fn distribute(mut self, jobs: Vec<Job>, best: &BestCell) -> Result<(), ProtocolError> {
        let workers = self.transport.worker_count();
        if workers == 0 && !jobs.is_empty() {
            return Err(ProtocolError::NoWorkers { pending: jobs.len() });
        }
        log::debug!("distributing {} jobs over {} workers", jobs.len(), workers);

        let mut queue = VecDeque::from(jobs);
        let mut idle: VecDeque<WorkerId> = (0..workers).map(WorkerId).collect();
        let mut busy = vec![false; workers];

        while !queue.is_empty() || idle.len() < workers {
            while !queue.is_empty() && !idle.is_empty() {
                let (Some(job), Some(worker)) = (queue.pop_front(), idle.pop_front()) else {
                    break;
                };
                log::trace!("job at position {} to worker {}", job.position, worker);
                self.transport.send(worker, ToWorker::Job(job))?;
                busy[worker.0] = true;
            }

            let FromWorker::Report { worker, best: report } = self.transport.recv()?;
            match busy.get_mut(worker.0) {
                None => return Err(ProtocolError::UnknownWorker(worker)),
                Some(false) => return Err(ProtocolError::IdleWorkerReported(worker)),
                Some(slot) => *slot = false,
            }
            if let Some(solution) = report {
                let weight = solution.weight;
                if best.try_improve(solution) {
                    log::debug!("worker {} improved the best weight to {}", worker, weight);
                }
            }
            idle.push_back(worker);
        }

        for worker in idle {
            self.transport.send(worker, ToWorker::Terminate)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Assignment, Group, Solution};

    #[derive(Debug, PartialEq)]
    enum Event {
        Sent(WorkerId, &'static str),
        Received(WorkerId),
    }

    /// Workers that answer in the order jobs were sent, each reporting a
    /// weight one lower than the previous report.
    struct ScriptedWorkers {
        count: usize,
        outstanding: VecDeque<WorkerId>,
        next_weight: f64,
        events: Vec<Event>,
    }

    impl ScriptedWorkers {
        fn new(count: usize) -> Self {
            Self {
                count,
                outstanding: VecDeque::new(),
                next_weight: 100.0,
                events: Vec::new(),
            }
        }
    }

    impl CoordinatorTransport for ScriptedWorkers {
        fn worker_count(&self) -> usize {
            self.count
        }

        fn send(&mut self, worker: WorkerId, message: ToWorker) -> Result<(), ProtocolError> {
            if let ToWorker::Job(_) = message {
                self.outstanding.push_back(worker);
            }
            self.events.push(Event::Sent(worker, message.kind()));
            Ok(())
        }

        fn recv(&mut self) -> Result<FromWorker, ProtocolError> {
            let worker = self.outstanding.pop_front().ok_or(ProtocolError::Disconnected)?;
            self.events.push(Event::Received(worker));
            self.next_weight -= 1.0;
            Ok(FromWorker::Report {
                worker,
                best: Some(Solution::new(Assignment::from(vec![Group::First]), self.next_weight)),
            })
        }
    }

    fn jobs(count: usize) -> Vec<Job> {
        (0..count)
            .map(|i| Job {
                position: 1,
                assignment: Assignment::rooted(1),
                weight: i as f64,
            })
            .collect()
    }

    #[test]
    fn three_workers_ten_jobs() {
        let mut transport = ScriptedWorkers::new(3);
        let best = BestCell::new();
        Coordinator::new(&mut transport).distribute(jobs(10), &best).unwrap();

        let events = &transport.events;
        let first_recv = events
            .iter()
            .position(|e| matches!(e, Event::Received(_)))
            .unwrap();
        assert_eq!(
            &events[..first_recv],
            &[
                Event::Sent(WorkerId(0), "job"),
                Event::Sent(WorkerId(1), "job"),
                Event::Sent(WorkerId(2), "job"),
            ]
        );

        let received = events.iter().filter(|e| matches!(e, Event::Received(_))).count();
        assert_eq!(received, 10);
        let jobs_sent = events.iter().filter(|e| matches!(e, Event::Sent(_, "job"))).count();
        assert_eq!(jobs_sent, 10);

        let last_recv = events
            .iter()
            .rposition(|e| matches!(e, Event::Received(_)))
            .unwrap();
        let mut terminated: Vec<_> = events[last_recv + 1..]
            .iter()
            .map(|e| match e {
                Event::Sent(w, "terminate") => w.0,
                other => panic!("unexpected {other:?} after the last report"),
            })
            .collect();
        terminated.sort_unstable();
        assert_eq!(terminated, vec![0, 1, 2]);
        assert_eq!(
            events.iter().filter(|e| matches!(e, Event::Sent(_, "terminate"))).count(),
            3
        );

        assert_eq!(best.weight(), 90.0);
    }

    #[test]
    fn broadcast_reaches_every_worker_first() {
        let mut transport = ScriptedWorkers::new(2);
        let problem = Problem::new("p", 3, 0, vec![], vec![]).unwrap();
        let best = BestCell::new();
        Coordinator::new(&mut transport).run(&problem, &best, 1).unwrap();

        assert_eq!(transport.events[0], Event::Sent(WorkerId(0), "setup"));
        assert_eq!(transport.events[1], Event::Sent(WorkerId(1), "setup"));
        assert!(transport.events[2..]
            .iter()
            .all(|e| !matches!(e, Event::Sent(_, "setup"))));
    }

    #[test]
    fn empty_queue_terminates_immediately() {
        let mut transport = ScriptedWorkers::new(2);
        let best = BestCell::new();
        Coordinator::new(&mut transport).distribute(Vec::new(), &best).unwrap();
        assert_eq!(
            transport.events,
            vec![
                Event::Sent(WorkerId(0), "terminate"),
                Event::Sent(WorkerId(1), "terminate"),
            ]
        );
        assert!(best.snapshot().is_none());
    }

    #[test]
    fn jobs_without_workers_fail() {
        let mut transport = ScriptedWorkers::new(0);
        let err = Coordinator::new(&mut transport)
            .distribute(jobs(2), &BestCell::new())
            .unwrap_err();
        assert!(matches!(err, ProtocolError::NoWorkers { pending: 2 }));
    }

    struct Misbehaving(WorkerId);

    impl CoordinatorTransport for Misbehaving {
        fn worker_count(&self) -> usize {
            2
        }

        fn send(&mut self, _: WorkerId, _: ToWorker) -> Result<(), ProtocolError> {
            Ok(())
        }

        fn recv(&mut self) -> Result<FromWorker, ProtocolError> {
            Ok(FromWorker::Report { worker: self.0, best: None })
        }
    }

    #[test]
    fn reports_from_unknown_or_idle_workers_fail() {
        let err = Coordinator::new(Misbehaving(WorkerId(7)))
            .distribute(jobs(1), &BestCell::new())
            .unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownWorker(WorkerId(7))));

        // Only worker 0 received a job.
        let err = Coordinator::new(Misbehaving(WorkerId(1)))
            .distribute(jobs(1), &BestCell::new())
            .unwrap_err();
        assert!(matches!(err, ProtocolError::IdleWorkerReported(WorkerId(1))));
    }
}
