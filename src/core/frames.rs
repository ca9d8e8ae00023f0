//! Frame-request serializer.
//!
//! Guarantees at most one in-flight set-frame operation per trajectory.
//! A request that arrives while one is outstanding is dropped silently -
//! the scrubber or player tick simply retries on its next event. This is
//! coalescing backpressure, not a queue, and there is no cancellation.
//!
//! The decode itself happens in an external [`FrameProvider`]; completions
//! come back over a channel and are drained by [`FramePump::pump`] on the
//! host's cooperative turn loop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use crossbeam_channel::{unbounded, Receiver, Sender};
use uuid::Uuid;

use crate::entities::Trajectory;

/// Completion of one asynchronous set-frame operation.
#[derive(Clone, Debug)]
pub struct FrameDone {
    pub trajectory: Uuid,
    pub frame: i32,
    pub ok: bool,
}

/// External collaborator that decodes and applies a frame.
///
/// Implementations must eventually send exactly one [`FrameDone`] per
/// `fetch_frame` call, from any thread.
pub trait FrameProvider: Send + Sync {
    fn fetch_frame(&self, trajectory: Uuid, frame: i32, done: Sender<FrameDone>);
}

type InflightMap = Arc<Mutex<HashMap<Uuid, Weak<Trajectory>>>>;

/// Request side of the serializer. Cheap to clone; players and trajectory
/// bindings each hold one.
#[derive(Clone)]
pub struct FrameQueue {
    provider: Arc<dyn FrameProvider>,
    tx: Sender<FrameDone>,
    inflight: InflightMap,
}

/// Completion side, owned by the stage and drained once per turn.
pub struct FramePump {
    rx: Receiver<FrameDone>,
    inflight: InflightMap,
}

/// Build a connected queue/pump pair around a provider.
pub fn frame_channel(provider: Arc<dyn FrameProvider>) -> (FrameQueue, FramePump) {
    let (tx, rx) = unbounded();
    let inflight: InflightMap = Arc::new(Mutex::new(HashMap::new()));
    (
        FrameQueue {
            provider,
            tx,
            inflight: Arc::clone(&inflight),
        },
        FramePump { rx, inflight },
    )
}

impl FrameQueue {
    /// Issue a set-frame request. Returns false if the trajectory already
    /// has a request in flight (the request is dropped, nothing changes).
    pub fn request(&self, traj: &Arc<Trajectory>, frame: i32) -> bool {
        let Some(frame) = traj.begin_request(frame) else {
            log::trace!("frame request for {} dropped, one in flight", traj.id());
            return false;
        };
        // Held weakly so a trajectory removed mid-flight is not kept alive,
        // while its in_progress flag still gets cleared on completion.
        self.inflight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(traj.id(), Arc::downgrade(traj));
        self.provider.fetch_frame(traj.id(), frame, self.tx.clone());
        true
    }
}

impl std::fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inflight = self
            .inflight
            .lock()
            .map(|g| g.len())
            .unwrap_or(0);
        f.debug_struct("FrameQueue")
            .field("inflight", &inflight)
            .finish()
    }
}

impl FramePump {
    /// Drain pending completions. Returns how many were processed.
    pub fn pump(&self) -> usize {
        let mut processed = 0;
        for done in self.rx.try_iter() {
            let traj = self
                .inflight
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&done.trajectory)
                .and_then(|weak| weak.upgrade());
            match traj {
                Some(traj) => traj.finish_request(done.frame, done.ok),
                None => log::trace!(
                    "frame completion for dropped trajectory {} ignored",
                    done.trajectory
                ),
            }
            processed += 1;
        }
        processed
    }
}
