//! Trajectory entity - frame bookkeeping and the in-flight request flag.
//!
//! The frame data itself is decoded by an external collaborator (disk or
//! network backed); all this entity tracks is the last confirmed frame,
//! whether a set-frame request is outstanding, and the trajectory-level
//! parameters. `current_frame` only ever holds a confirmed value, never a
//! speculative one.

use std::sync::{Mutex, Weak};

use uuid::Uuid;

use crate::core::player::TrajectoryPlayer;
use crate::core::signal::Signal;

/// Frame index meaning "nothing loaded yet".
pub const NO_FRAME: i32 = -1;

/// Trajectory-level parameters mirrored by the trajectory binding.
#[derive(Clone, Copy, Debug)]
pub struct TrajectoryParams {
    pub center_pbc: bool,
    pub remove_pbc: bool,
    pub superpose: bool,
}

impl Default for TrajectoryParams {
    fn default() -> Self {
        Self {
            center_pbc: true,
            remove_pbc: true,
            superpose: false,
        }
    }
}

/// Channels owned by every trajectory.
#[derive(Default)]
pub struct TrajectorySignals {
    /// Confirmed frame index, published when a set-frame request resolves.
    pub frame_changed: Signal<i32>,
    /// Frame count, published once the data layer has counted frames.
    pub got_numframes: Signal<usize>,
    pub center_pbc_param_changed: Signal<bool>,
    pub remove_pbc_param_changed: Signal<bool>,
    pub superpose_param_changed: Signal<bool>,
}

struct TrajectoryState {
    numframes: Option<usize>,
    current_frame: i32,
    in_progress: bool,
    player: Option<Weak<TrajectoryPlayer>>,
}

pub struct Trajectory {
    id: Uuid,
    name: String,
    path: String,
    state: Mutex<TrajectoryState>,
    params: Mutex<TrajectoryParams>,
    pub signals: TrajectorySignals,
}

impl Trajectory {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            path: path.into(),
            state: Mutex::new(TrajectoryState {
                numframes: None,
                current_frame: NO_FRAME,
                in_progress: false,
                player: None,
            }),
            params: Mutex::new(TrajectoryParams::default()),
            signals: TrajectorySignals::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// None until the data layer has reported a count.
    pub fn numframes(&self) -> Option<usize> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).numframes
    }

    /// Last confirmed frame, [`NO_FRAME`] if nothing has loaded yet.
    pub fn current_frame(&self) -> i32 {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .current_frame
    }

    pub fn in_progress(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .in_progress
    }

    pub fn params(&self) -> TrajectoryParams {
        *self.params.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Called by the data layer once the frame count is known.
    pub fn set_numframes(&self, numframes: usize) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.numframes = Some(numframes);
        }
        self.signals.got_numframes.publish(numframes);
    }

    pub fn set_center_pbc(&self, value: bool) {
        {
            let mut params = self.params.lock().unwrap_or_else(|e| e.into_inner());
            if params.center_pbc == value {
                return;
            }
            params.center_pbc = value;
        }
        self.signals.center_pbc_param_changed.publish(value);
    }

    pub fn set_remove_pbc(&self, value: bool) {
        {
            let mut params = self.params.lock().unwrap_or_else(|e| e.into_inner());
            if params.remove_pbc == value {
                return;
            }
            params.remove_pbc = value;
        }
        self.signals.remove_pbc_param_changed.publish(value);
    }

    pub fn set_superpose(&self, value: bool) {
        {
            let mut params = self.params.lock().unwrap_or_else(|e| e.into_inner());
            if params.superpose == value {
                return;
            }
            params.superpose = value;
        }
        self.signals.superpose_param_changed.publish(value);
    }

    /// Attach or detach the playback controller back-reference.
    pub fn set_player(&self, player: Option<Weak<TrajectoryPlayer>>) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).player = player;
    }

    /// Upgraded playback controller, if one is attached and alive.
    pub fn player(&self) -> Option<std::sync::Arc<TrajectoryPlayer>> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .player
            .as_ref()
            .and_then(Weak::upgrade)
    }

    /// Check-and-set for the frame-request serializer. Returns the clamped
    /// index to request, or None if a request is already outstanding.
    /// Check and set happen under one lock acquisition.
    pub(crate) fn begin_request(&self, frame: i32) -> Option<i32> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.in_progress {
            return None;
        }
        let hi = state
            .numframes
            .map(|n| n as i32 - 1)
            .unwrap_or(NO_FRAME)
            .max(NO_FRAME);
        let clamped = frame.clamp(NO_FRAME, hi);
        state.in_progress = true;
        Some(clamped)
    }

    /// Completion path. Clears `in_progress` unconditionally; on success
    /// records the confirmed frame and publishes `frame_changed`.
    pub(crate) fn finish_request(&self, frame: i32, ok: bool) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.in_progress = false;
            if ok {
                state.current_frame = frame;
            }
        }
        if ok {
            self.signals.frame_changed.publish(frame);
        }
    }
}

impl std::fmt::Debug for Trajectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trajectory")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("numframes", &self.numframes())
            .field("current_frame", &self.current_frame())
            .field("in_progress", &self.in_progress())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_begin_request_clamps_to_frame_range() {
        let traj = Trajectory::new("md", "md.xtc");
        traj.set_numframes(10);

        assert_eq!(traj.begin_request(25), Some(9));
        traj.finish_request(9, true);
        assert_eq!(traj.begin_request(-5), Some(NO_FRAME));
    }

    #[test]
    fn test_begin_request_rejects_while_in_flight() {
        let traj = Trajectory::new("md", "md.xtc");
        traj.set_numframes(10);

        assert_eq!(traj.begin_request(3), Some(3));
        assert!(traj.in_progress());
        assert_eq!(traj.begin_request(4), None);

        traj.finish_request(3, true);
        assert!(!traj.in_progress());
        assert_eq!(traj.current_frame(), 3);
    }

    #[test]
    fn test_failed_request_clears_flag_without_confirming() {
        let traj = Trajectory::new("md", "md.xtc");
        traj.set_numframes(10);

        let fired = Arc::new(Mutex::new(Vec::new()));
        let f = Arc::clone(&fired);
        let _sub = traj
            .signals
            .frame_changed
            .subscribe(move |v| f.lock().unwrap().push(*v));

        assert_eq!(traj.begin_request(3), Some(3));
        traj.finish_request(3, false);

        assert!(!traj.in_progress());
        assert_eq!(traj.current_frame(), NO_FRAME);
        assert!(fired.lock().unwrap().is_empty());
    }

    #[test]
    fn test_param_setters_publish_on_change_only() {
        let traj = Trajectory::new("md", "md.xtc");
        let fired = Arc::new(Mutex::new(0usize));
        let f = Arc::clone(&fired);
        let _sub = traj
            .signals
            .superpose_param_changed
            .subscribe(move |_| *f.lock().unwrap() += 1);

        traj.set_superpose(false); // default, no publish
        traj.set_superpose(true);
        traj.set_superpose(true);
        assert_eq!(*fired.lock().unwrap(), 1);
    }
}
