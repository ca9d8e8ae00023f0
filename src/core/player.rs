//! Trajectory playback controller.
//!
//! A timer-driven two-state machine (Stopped/Running) advancing a bounded
//! frame index. The host loop calls [`TrajectoryPlayer::update`] with the
//! current instant; when the deadline passes a tick fires and the deadline
//! re-arms at `now + timeout`. Timeout governs tick cadence only - a slow
//! frame load never stretches the cadence, it just makes ticks skip their
//! advance until the in-flight request resolves. Playback never queues
//! pending advances.

use std::sync::{Mutex, Weak};
use std::time::{Duration, Instant};

use crate::core::frames::FrameQueue;
use crate::core::signal::Signal;
use crate::entities::Trajectory;

/// Channels owned by every player.
#[derive(Default)]
pub struct PlayerSignals {
    pub started_running: Signal<()>,
    pub halted_running: Signal<()>,
}

struct PlayerState {
    step: i32,
    timeout: Duration,
    start: i32,
    end: i32,
    running: bool,
    next_tick: Option<Instant>,
}

/// Playback controller for one trajectory. Holds the trajectory weakly -
/// the data layer owns the entity.
pub struct TrajectoryPlayer {
    traj: Weak<Trajectory>,
    frames: FrameQueue,
    state: Mutex<PlayerState>,
    pub signals: PlayerSignals,
}

impl TrajectoryPlayer {
    /// `start..end` is the playable range; `end` is the index wrap fires at,
    /// set from `numframes - 1` once the count is known.
    pub fn new(
        traj: &std::sync::Arc<Trajectory>,
        frames: FrameQueue,
        step: i32,
        timeout_ms: u64,
        start: i32,
        end: i32,
    ) -> Self {
        Self {
            traj: std::sync::Arc::downgrade(traj),
            frames,
            state: Mutex::new(PlayerState {
                step: step.max(1),
                timeout: Duration::from_millis(timeout_ms.max(1)),
                start,
                end: end.max(start),
                running: false,
                next_tick: None,
            }),
            signals: PlayerSignals::default(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).running
    }

    pub fn step(&self) -> i32 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).step
    }

    pub fn timeout_ms(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .timeout
            .as_millis() as u64
    }

    pub fn range(&self) -> (i32, i32) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        (state.start, state.end)
    }

    /// Effective from the next scheduled tick; a deadline already armed is
    /// left alone.
    pub fn set_step(&self, step: i32) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).step = step.max(1);
    }

    /// Effective from the next scheduled tick.
    pub fn set_timeout(&self, timeout_ms: u64) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).timeout =
            Duration::from_millis(timeout_ms.max(1));
    }

    pub fn set_range(&self, start: i32, end: i32) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.start = start;
        state.end = end.max(start);
    }

    /// Flip between Stopped and Running, publishing the matching signal.
    /// The first deadline is armed by the next [`update`] call, so the whole
    /// machine runs on the host's injected clock.
    ///
    /// [`update`]: TrajectoryPlayer::update
    pub fn toggle(&self) {
        let started = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if state.running {
                state.running = false;
                state.next_tick = None;
                false
            } else {
                state.running = true;
                state.next_tick = None;
                true
            }
        };
        if started {
            log::trace!("player started");
            self.signals.started_running.publish(());
        } else {
            log::trace!("player halted");
            self.signals.halted_running.publish(());
        }
    }

    /// Force Stopped without publishing. Disposal path only: by the time a
    /// binding tears its player down its listeners are already detached.
    pub fn stop(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.running = false;
        state.next_tick = None;
    }

    /// Timer pump. Fires at most one tick per call and re-arms the deadline
    /// at `now + timeout` regardless of request completion. The first call
    /// after a start arms the deadline without firing.
    pub fn update(&self, now: Instant) {
        let due = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if !state.running {
                return;
            }
            match state.next_tick {
                None => {
                    state.next_tick = Some(now + state.timeout);
                    false
                }
                Some(deadline) if now >= deadline => {
                    state.next_tick = Some(now + state.timeout);
                    true
                }
                _ => false,
            }
        };
        if due {
            self.tick();
        }
    }

    /// One playback step: advance the target frame and issue the request.
    /// If a request is in flight the advance is skipped entirely - the next
    /// tick retries from whatever frame is confirmed by then.
    pub fn tick(&self) {
        let Some(traj) = self.traj.upgrade() else {
            self.stop();
            return;
        };

        let (start, end, step, running) = {
            let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            (state.start, state.end, state.step, state.running)
        };
        if !running {
            return;
        }
        if traj.in_progress() {
            log::trace!("tick skipped, frame request in flight");
            return;
        }

        let raw = traj.current_frame().saturating_add(step);
        let next = if raw >= end {
            if end > start {
                start + (raw - start).rem_euclid(end - start)
            } else {
                start
            }
        } else {
            raw
        };

        let _ = self.frames.request(&traj, next);
    }
}

impl std::fmt::Debug for TrajectoryPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("TrajectoryPlayer")
            .field("running", &state.running)
            .field("step", &state.step)
            .field("timeout", &state.timeout)
            .field("range", &(state.start, state.end))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frames::{frame_channel, FrameDone, FrameProvider};
    use crossbeam_channel::Sender;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use uuid::Uuid;

    struct InstantProvider {
        requested: Mutex<Vec<i32>>,
    }

    impl InstantProvider {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                requested: Mutex::new(Vec::new()),
            })
        }

        fn requested(&self) -> Vec<i32> {
            self.requested.lock().unwrap().clone()
        }
    }

    impl FrameProvider for InstantProvider {
        fn fetch_frame(&self, trajectory: Uuid, frame: i32, done: Sender<FrameDone>) {
            self.requested.lock().unwrap().push(frame);
            let _ = done.send(FrameDone {
                trajectory,
                frame,
                ok: true,
            });
        }
    }

    struct StalledProvider;

    impl FrameProvider for StalledProvider {
        fn fetch_frame(&self, _trajectory: Uuid, _frame: i32, _done: Sender<FrameDone>) {}
    }

    fn traj_with_frames(n: usize) -> Arc<Trajectory> {
        let traj = Arc::new(Trajectory::new("md", "md.xtc"));
        traj.set_numframes(n);
        traj
    }

    #[test]
    fn test_toggle_twice_round_trips_with_matched_signals() {
        let provider = InstantProvider::new();
        let (queue, _pump) = frame_channel(provider);
        let traj = traj_with_frames(10);
        let player = TrajectoryPlayer::new(&traj, queue, 1, 50, 0, 9);

        let started = Arc::new(AtomicUsize::new(0));
        let halted = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&started);
        let _s1 = player.signals.started_running.subscribe(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });
        let h = Arc::clone(&halted);
        let _s2 = player.signals.halted_running.subscribe(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!player.is_running());
        player.toggle();
        assert!(player.is_running());
        player.toggle();
        assert!(!player.is_running());

        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(halted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wraparound_arithmetic() {
        let provider = InstantProvider::new();
        let (queue, pump) = frame_channel(provider.clone());
        let traj = traj_with_frames(20);
        let player = TrajectoryPlayer::new(&traj, queue.clone(), 7, 50, 0, 10);

        // Bring the confirmed frame to 8 first.
        assert!(queue.request(&traj, 8));
        pump.pump();
        assert_eq!(traj.current_frame(), 8);

        player.toggle();
        player.tick();
        pump.pump();

        // 8 + 7 = 15 wraps within [0, 10) to 5, never 15 or negative.
        assert_eq!(traj.current_frame(), 5);
        assert_eq!(provider.requested(), vec![8, 5]);
    }

    #[test]
    fn test_tick_skips_advance_while_request_in_flight() {
        let (queue, _pump) = frame_channel(Arc::new(StalledProvider));
        let traj = traj_with_frames(10);
        let player = TrajectoryPlayer::new(&traj, queue.clone(), 1, 50, 0, 9);

        player.toggle();
        player.tick(); // requests frame 0, never completes
        assert!(traj.in_progress());

        player.tick();
        player.tick();
        // Still exactly one outstanding request, no queued advances.
        assert!(traj.in_progress());
        assert_eq!(traj.current_frame(), -1);
    }

    #[test]
    fn test_update_honors_timeout_cadence() {
        let provider = InstantProvider::new();
        let (queue, pump) = frame_channel(provider.clone());
        let traj = traj_with_frames(10);
        let player = TrajectoryPlayer::new(&traj, queue, 1, 50, 0, 9);

        player.toggle();
        let armed = Instant::now();

        player.update(armed + Duration::from_millis(10));
        assert!(provider.requested().is_empty());

        player.update(armed + Duration::from_millis(60));
        pump.pump();
        assert_eq!(provider.requested(), vec![0]);

        // Deadline re-armed from the firing instant.
        player.update(armed + Duration::from_millis(70));
        assert_eq!(provider.requested(), vec![0]);
        player.update(armed + Duration::from_millis(120));
        pump.pump();
        assert_eq!(provider.requested(), vec![0, 1]);
    }

    #[test]
    fn test_first_deadline_armed_from_injected_clock() {
        let provider = InstantProvider::new();
        let (queue, pump) = frame_channel(provider.clone());
        let traj = traj_with_frames(10);
        let player = TrajectoryPlayer::new(&traj, queue, 1, 50, 0, 9);

        player.toggle();
        // A base instant far from the toggle call: the deadline must come
        // from the update clock, not from when toggle happened to run.
        let t0 = Instant::now() + Duration::from_secs(3600);

        player.update(t0);
        assert!(provider.requested().is_empty());
        player.update(t0 + Duration::from_millis(49));
        assert!(provider.requested().is_empty());

        player.update(t0 + Duration::from_millis(50));
        pump.pump();
        assert_eq!(provider.requested(), vec![0]);
    }

    #[test]
    fn test_stop_is_silent() {
        let provider = InstantProvider::new();
        let (queue, _pump) = frame_channel(provider);
        let traj = traj_with_frames(10);
        let player = TrajectoryPlayer::new(&traj, queue, 1, 50, 0, 9);

        let halted = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&halted);
        let _sub = player.signals.halted_running.subscribe(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        player.toggle();
        player.stop();
        assert!(!player.is_running());
        assert_eq!(halted.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_player_stops_when_trajectory_is_dropped() {
        let provider = InstantProvider::new();
        let (queue, _pump) = frame_channel(provider);
        let traj = traj_with_frames(10);
        let player = TrajectoryPlayer::new(&traj, queue, 1, 50, 0, 9);

        player.toggle();
        drop(traj);
        player.tick();
        assert!(!player.is_running());
    }

    #[test]
    fn test_step_clamped_to_one() {
        let provider = InstantProvider::new();
        let (queue, _pump) = frame_channel(provider);
        let traj = traj_with_frames(10);
        let player = TrajectoryPlayer::new(&traj, queue, 0, 50, 0, 9);

        assert_eq!(player.step(), 1);
        player.set_step(-3);
        assert_eq!(player.step(), 1);
    }
}
