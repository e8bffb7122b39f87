//! Guidance worker: runs [`guidance::step`](crate::guidance::step) on its own thread.
//!
//! The caller and the worker share no simulation state. Each request owns a copy of the
//! projectile list and target snapshot; each response owns the results. Requests are
//! processed one at a time in send order, so responses arrive in send order too.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;

use crate::guidance::{step, GuidanceParams, HitEvent, ProjectileState, TargetSnapshot};

/// Errors from the guidance worker. None of them concern the simulation itself; they
/// mean homing is unavailable.
#[derive(Debug, Error)]
pub enum GuidanceError {
    #[error("failed to spawn guidance worker: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("guidance worker is no longer running")]
    Disconnected,
}

/// Payload of an update request.
#[derive(Debug, Clone)]
pub struct UpdateMissiles {
    pub sequence: u64,
    pub projectiles: Vec<ProjectileState>,
    pub targets: Vec<TargetSnapshot>,
    pub delta: f32,
}

/// Payload of an update response.
#[derive(Debug, Clone, PartialEq)]
pub struct MissilesUpdated {
    /// Sequence number of the request this answers.
    pub sequence: u64,
    pub projectiles: Vec<ProjectileState>,
    pub hits: Vec<HitEvent>,
}

/// Messages sent to the worker.
#[derive(Debug, Clone)]
pub enum WorkerRequest {
    UpdateMissiles(UpdateMissiles),
}

/// Messages sent back by the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerResponse {
    MissilesUpdated(MissilesUpdated),
}

/// Handle to a running guidance thread. Dropping it terminates the thread and discards
/// any request that has not started yet.
pub struct GuidanceWorker {
    requests: Option<Sender<WorkerRequest>>,
    responses: Receiver<WorkerResponse>,
    cancelled: Arc<AtomicBool>,
    /// Yields the number of steps the thread completed.
    handle: Option<JoinHandle<u64>>,
    next_sequence: u64,
    in_flight: usize,
}

impl GuidanceWorker {
    /// Start a worker thread using `params` for every step.
    pub fn spawn(params: GuidanceParams) -> Result<Self, GuidanceError> {
        Self::spawn_with_limit(params, None)
    }

    /// A worker whose thread exits, without replying, on the request after the first
    /// `replies` it answers. The caller then sees [`GuidanceError::Disconnected`].
    #[cfg(any(test, feature = "test-util"))]
    pub fn spawn_failing_after(params: GuidanceParams, replies: u64) -> Result<Self, GuidanceError> {
        Self::spawn_with_limit(params, Some(replies))
    }

    fn spawn_with_limit(params: GuidanceParams, reply_limit: Option<u64>) -> Result<Self, GuidanceError> {
        let (request_tx, request_rx) = mpsc::channel();
        let (response_tx, response_rx) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&cancelled);
        let handle = thread::Builder::new()
            .name("guidance".into())
            .spawn(move || run(request_rx, response_tx, flag, params, reply_limit))?;

        log::info!("Guidance worker started");
        Ok(Self {
            requests: Some(request_tx),
            responses: response_rx,
            cancelled,
            handle: Some(handle),
            next_sequence: 0,
            in_flight: 0,
        })
    }

    /// Queue one step. Returns the request's sequence number without waiting.
    pub fn submit(
        &mut self,
        projectiles: Vec<ProjectileState>,
        targets: Vec<TargetSnapshot>,
        delta: f32,
    ) -> Result<u64, GuidanceError> {
        debug_assert!(
            delta.is_finite() && delta >= 0.0,
            "guidance delta must be finite and non-negative, got {}",
            delta
        );
        let sender = self.requests.as_ref().ok_or(GuidanceError::Disconnected)?;
        let sequence = self.next_sequence;
        sender
            .send(WorkerRequest::UpdateMissiles(UpdateMissiles {
                sequence,
                projectiles,
                targets,
                delta,
            }))
            .map_err(|_| GuidanceError::Disconnected)?;
        self.next_sequence += 1;
        self.in_flight += 1;
        Ok(sequence)
    }

    /// Next finished response, if one is ready. Never blocks.
    pub fn try_recv(&mut self) -> Result<Option<MissilesUpdated>, GuidanceError> {
        match self.responses.try_recv() {
            Ok(response) => Ok(Some(self.accept(response))),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(GuidanceError::Disconnected),
        }
    }

    /// Wait up to `timeout` for the next response. For tools and tests; the frame loop
    /// should use [`Self::try_recv`].
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<MissilesUpdated>, GuidanceError> {
        match self.responses.recv_timeout(timeout) {
            Ok(response) => Ok(Some(self.accept(response))),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(GuidanceError::Disconnected),
        }
    }

    fn accept(&mut self, response: WorkerResponse) -> MissilesUpdated {
        self.in_flight = self.in_flight.saturating_sub(1);
        match response {
            WorkerResponse::MissilesUpdated(update) => update,
        }
    }

    /// Requests sent whose responses have not been received yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Stop the thread, discarding queued requests. A step already running finishes first.
    /// Returns how many submitted requests were never stepped.
    pub fn terminate(mut self) -> u64 {
        self.shutdown()
    }

    fn shutdown(&mut self) -> u64 {
        self.cancelled.store(true, Ordering::Release);
        // Closing the channel wakes the worker if it is idle.
        self.requests = None;
        let Some(handle) = self.handle.take() else {
            return 0;
        };
        match handle.join() {
            Ok(completed) => {
                let discarded = self.next_sequence.saturating_sub(completed);
                log::info!("Guidance worker stopped ({} request(s) discarded)", discarded);
                discarded
            }
            Err(_) => {
                log::warn!("Guidance worker panicked before shutdown");
                0
            }
        }
    }
}

impl Drop for GuidanceWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Worker loop. Returns the number of steps completed.
fn run(
    requests: Receiver<WorkerRequest>,
    responses: Sender<WorkerResponse>,
    cancelled: Arc<AtomicBool>,
    params: GuidanceParams,
    reply_limit: Option<u64>,
) -> u64 {
    let mut completed = 0;
    while let Ok(request) = requests.recv() {
        if cancelled.load(Ordering::Acquire) || reply_limit == Some(completed) {
            break;
        }
        match request {
            WorkerRequest::UpdateMissiles(update) => {
                let outcome = step(update.projectiles, &update.targets, update.delta, &params);
                if !outcome.hits.is_empty() || outcome.expired > 0 {
                    log::debug!(
                        "guidance step {}: {} hit(s), {} expired",
                        update.sequence,
                        outcome.hits.len(),
                        outcome.expired
                    );
                }
                let reply = WorkerResponse::MissilesUpdated(MissilesUpdated {
                    sequence: update.sequence,
                    projectiles: outcome.projectiles,
                    hits: outcome.hits,
                });
                completed += 1;
                if responses.send(reply).is_err() {
                    break;
                }
            }
        }
    }
    completed
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    const WAIT: Duration = Duration::from_secs(5);

    fn missile(id: u64) -> ProjectileState {
        ProjectileState::new(
            id,
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, -40.0),
            Some("Earth".to_string()),
        )
    }

    fn targets() -> Vec<TargetSnapshot> {
        vec![TargetSnapshot::new("Earth", Vec3::new(0.0, 0.0, -50.0), 0.55)]
    }

    #[test]
    fn response_matches_direct_step() {
        let params = GuidanceParams::default();
        let mut worker = GuidanceWorker::spawn(params).unwrap();
        let seq = worker.submit(vec![missile(1), missile(2)], targets(), 0.1).unwrap();
        assert_eq!(worker.in_flight(), 1);

        let update = worker.recv_timeout(WAIT).unwrap().expect("worker reply");
        let expected = step(vec![missile(1), missile(2)], &targets(), 0.1, &params);
        assert_eq!(update.sequence, seq);
        assert_eq!(update.projectiles, expected.projectiles);
        assert_eq!(update.hits, expected.hits);
        assert_eq!(worker.in_flight(), 0);
    }

    #[test]
    fn responses_arrive_in_send_order() {
        let mut worker = GuidanceWorker::spawn(GuidanceParams::default()).unwrap();
        for i in 0..10 {
            worker.submit(vec![missile(i)], targets(), 0.016).unwrap();
        }
        for expected in 0..10 {
            let update = worker.recv_timeout(WAIT).unwrap().expect("worker reply");
            assert_eq!(update.sequence, expected);
            assert_eq!(update.projectiles[0].id, expected);
        }
        assert_eq!(worker.in_flight(), 0);
    }

    #[test]
    fn try_recv_does_not_block_when_idle() {
        let mut worker = GuidanceWorker::spawn(GuidanceParams::default()).unwrap();
        assert!(worker.try_recv().unwrap().is_none());
    }

    #[test]
    fn terminate_discards_queued_requests() {
        let mut worker = GuidanceWorker::spawn(GuidanceParams::default()).unwrap();
        // One slow step keeps the thread busy while the rest queue up behind it.
        let decoys: Vec<_> = (0..200)
            .map(|i| TargetSnapshot::new(format!("Decoy {}", i), Vec3::ZERO, 1.0))
            .collect();
        let heavy: Vec<_> = (0..100_000)
            .map(|i| ProjectileState::new(i, Vec3::ZERO, Vec3::Z, Some("Nobody".to_string())))
            .collect();
        worker.submit(heavy, decoys, 0.01).unwrap();
        for i in 0..19 {
            worker.submit(vec![missile(i)], targets(), 0.01).unwrap();
        }
        let discarded = worker.terminate();
        assert!(discarded >= 19, "only {} of 20 requests discarded", discarded);
    }

    #[test]
    fn cancelled_loop_steps_nothing() {
        let (request_tx, request_rx) = mpsc::channel();
        let (response_tx, response_rx) = mpsc::channel();
        for sequence in 0..20 {
            request_tx
                .send(WorkerRequest::UpdateMissiles(UpdateMissiles {
                    sequence,
                    projectiles: vec![missile(sequence)],
                    targets: targets(),
                    delta: 0.01,
                }))
                .unwrap();
        }
        drop(request_tx);

        let completed = run(
            request_rx,
            response_tx,
            Arc::new(AtomicBool::new(true)),
            GuidanceParams::default(),
            None,
        );
        assert_eq!(completed, 0);
        assert!(response_rx.try_recv().is_err());
    }

    #[test]
    fn failing_worker_disconnects_after_its_replies() {
        let mut worker = GuidanceWorker::spawn_failing_after(GuidanceParams::default(), 1).unwrap();
        worker.submit(vec![missile(0)], targets(), 0.1).unwrap();
        assert!(worker.recv_timeout(WAIT).unwrap().is_some());

        worker.submit(vec![missile(0)], targets(), 0.1).unwrap();
        assert!(matches!(worker.recv_timeout(WAIT), Err(GuidanceError::Disconnected)));
        assert!(matches!(
            worker.submit(Vec::new(), Vec::new(), 0.1),
            Err(GuidanceError::Disconnected)
        ));
        // The request that found the thread gone was never stepped.
        assert_eq!(worker.terminate(), 1);
    }

    #[test]
    fn empty_request_round_trips() {
        let mut worker = GuidanceWorker::spawn(GuidanceParams::default()).unwrap();
        worker.submit(Vec::new(), Vec::new(), 0.0).unwrap();
        let update = worker.recv_timeout(WAIT).unwrap().expect("worker reply");
        assert!(update.projectiles.is_empty() && update.hits.is_empty());
    }
}
