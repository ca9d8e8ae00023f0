//! Trajectory binding - frame field, scrubber, playback controls.
//!
//! Owns the playback controller for its trajectory and mirrors every
//! confirmed frame into the view state. The displayed frame only ever
//! moves on `frame_changed`, so it can never show a speculative index.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use uuid::Uuid;

use super::{Binding, BindingCtx};
use crate::core::frames::FrameQueue;
use crate::core::player::TrajectoryPlayer;
use crate::core::signal::Subscriptions;
use crate::entities::trajectory::NO_FRAME;
use crate::entities::Trajectory;

const DEFAULT_TIMEOUT_MS: u64 = 50;

/// Default scrubber step so roughly a hundred stops span the trajectory.
fn default_step(numframes: usize) -> i32 {
    (((numframes + 1) as f64) / 100.0).ceil() as i32
}

/// What a trajectory panel would render.
#[derive(Clone, Debug)]
pub struct TrajectoryView {
    pub name: String,
    /// Last confirmed frame; drives both the integer field and the scrubber.
    pub frame: i32,
    /// Upper scrubber bound, `numframes - 1` once the count is known.
    pub frame_max: i32,
    /// True until `got_numframes` arrives (spinner in place of the field).
    pub counting: bool,
    pub step: i32,
    pub timeout_ms: u64,
    pub playing: bool,
    pub center_pbc: bool,
    pub remove_pbc: bool,
    pub superpose: bool,
    pub collapsed: bool,
}

pub struct TrajectoryBinding {
    traj: Arc<Trajectory>,
    player: Arc<TrajectoryPlayer>,
    frames: FrameQueue,
    view: Arc<Mutex<TrajectoryView>>,
    subs: Subscriptions,
    ctx: BindingCtx,
}

impl TrajectoryBinding {
    pub fn new(traj: Arc<Trajectory>, ctx: &BindingCtx) -> Self {
        let params = traj.params();
        let numframes = traj.numframes();
        let end = numframes.map(|n| n as i32 - 1).unwrap_or(0);
        let step = numframes.map(default_step).unwrap_or(1);

        let player = Arc::new(TrajectoryPlayer::new(
            &traj,
            ctx.frames.clone(),
            step,
            DEFAULT_TIMEOUT_MS,
            0,
            end,
        ));
        traj.set_player(Some(Arc::downgrade(&player)));

        let view = Arc::new(Mutex::new(TrajectoryView {
            name: traj.name().to_string(),
            frame: traj.current_frame(),
            frame_max: numframes.map(|n| n as i32 - 1).unwrap_or(NO_FRAME),
            counting: numframes.is_none(),
            step,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            playing: false,
            center_pbc: params.center_pbc,
            remove_pbc: params.remove_pbc,
            superpose: params.superpose,
            collapsed: false,
        }));
        let mut subs = Subscriptions::new();

        let v = Arc::clone(&view);
        let p = Arc::clone(&player);
        subs.track(traj.signals.got_numframes.subscribe(move |n| {
            let step = default_step(*n);
            {
                let mut view = v.lock().unwrap_or_else(|e| e.into_inner());
                view.counting = false;
                view.frame_max = *n as i32 - 1;
                view.step = step;
            }
            p.set_step(step);
            p.set_range(0, *n as i32 - 1);
        }));

        let v = Arc::clone(&view);
        subs.track(traj.signals.frame_changed.subscribe(move |frame| {
            v.lock().unwrap_or_else(|e| e.into_inner()).frame = *frame;
        }));

        let v = Arc::clone(&view);
        subs.track(player.signals.started_running.subscribe(move |_| {
            v.lock().unwrap_or_else(|e| e.into_inner()).playing = true;
        }));

        let v = Arc::clone(&view);
        subs.track(player.signals.halted_running.subscribe(move |_| {
            v.lock().unwrap_or_else(|e| e.into_inner()).playing = false;
        }));

        let v = Arc::clone(&view);
        subs.track(traj.signals.center_pbc_param_changed.subscribe(move |b| {
            v.lock().unwrap_or_else(|e| e.into_inner()).center_pbc = *b;
        }));

        let v = Arc::clone(&view);
        subs.track(traj.signals.remove_pbc_param_changed.subscribe(move |b| {
            v.lock().unwrap_or_else(|e| e.into_inner()).remove_pbc = *b;
        }));

        let v = Arc::clone(&view);
        subs.track(traj.signals.superpose_param_changed.subscribe(move |b| {
            v.lock().unwrap_or_else(|e| e.into_inner()).superpose = *b;
        }));

        Self {
            traj,
            player,
            frames: ctx.frames.clone(),
            view,
            subs,
            ctx: ctx.clone(),
        }
    }

    pub fn view(&self) -> TrajectoryView {
        self.view.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn player(&self) -> &Arc<TrajectoryPlayer> {
        &self.player
    }

    /// Scrubber drag or frame-field edit. Pre-empts autoplay: a running
    /// player is stopped before the request is issued. A value equal to the
    /// confirmed frame is ignored.
    pub fn scrub(&self, frame: i32) {
        if frame == self.traj.current_frame() {
            return;
        }
        if self.player.is_running() {
            self.player.toggle();
        }
        let _ = self.frames.request(&self.traj, frame);
    }

    /// Play/pause button.
    pub fn toggle_play(&self) {
        self.player.toggle();
    }

    pub fn set_step(&self, step: i32) {
        let step = step.max(1);
        self.view.lock().unwrap_or_else(|e| e.into_inner()).step = step;
        self.player.set_step(step);
    }

    pub fn set_timeout_ms(&self, timeout_ms: u64) {
        let timeout_ms = timeout_ms.max(1);
        self.view
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .timeout_ms = timeout_ms;
        self.player.set_timeout(timeout_ms);
    }

    pub fn set_center_pbc(&self, value: bool) {
        self.traj.set_center_pbc(value);
    }

    pub fn set_remove_pbc(&self, value: bool) {
        self.traj.set_remove_pbc(value);
    }

    pub fn set_superpose(&self, value: bool) {
        self.traj.set_superpose(value);
    }
}

impl Binding for TrajectoryBinding {
    fn entity(&self) -> Uuid {
        self.traj.id()
    }

    fn update(&mut self, now: Instant) {
        self.player.update(now);
    }

    fn set_collapsed(&mut self, collapsed: bool) {
        self.view
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .collapsed = collapsed;
    }

    fn dispose(&mut self) {
        // Listeners are detached below, so the forced stop stays silent.
        self.player.stop();
        self.traj.set_player(None);
        self.subs.dispose();
        self.ctx.binding_disposed.publish(self.traj.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frames::{FrameDone, FrameProvider};
    use crate::entities::{Component, EntityKind, Stage};
    use crate::widgets::sidebar::tests::ctx_with_provider;
    use crossbeam_channel::Sender;

    struct InstantProvider {
        requested: Mutex<Vec<i32>>,
    }

    impl InstantProvider {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                requested: Mutex::new(Vec::new()),
            })
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

    fn setup(numframes: usize) -> (Arc<Stage>, Arc<Trajectory>, TrajectoryBinding) {
        let (stage, ctx) = ctx_with_provider(InstantProvider::new());
        let comp = Arc::new(Component::new("1crn.pdb", EntityKind::Structure));
        stage.add_component(Arc::clone(&comp));
        let traj = stage.load_trajectory(&comp, "md.xtc").unwrap();
        let binding = TrajectoryBinding::new(Arc::clone(&traj), &ctx);
        traj.set_numframes(numframes);
        (stage, traj, binding)
    }

    #[test]
    fn test_got_numframes_resizes_range_and_step() {
        let (_stage, _traj, binding) = setup(250);
        let view = binding.view();
        assert!(!view.counting);
        assert_eq!(view.frame_max, 249);
        assert_eq!(view.step, 3); // ceil(251 / 100)
        assert_eq!(binding.player().range(), (0, 249));
        assert_eq!(binding.player().step(), 3);
    }

    #[test]
    fn test_scrub_while_running_stops_player() {
        let (stage, traj, binding) = setup(10);

        binding.toggle_play();
        assert!(binding.player().is_running());
        assert!(binding.view().playing);

        binding.scrub(4);
        assert!(!binding.player().is_running());
        assert!(!binding.view().playing);

        stage.update();
        assert_eq!(traj.current_frame(), 4);
        assert_eq!(binding.view().frame, 4);
    }

    #[test]
    fn test_scrub_to_current_frame_is_ignored() {
        let (stage, traj, binding) = setup(10);
        binding.scrub(4);
        stage.update();
        assert_eq!(traj.current_frame(), 4);

        binding.toggle_play();
        binding.scrub(4); // same frame: no pre-emption, no request
        assert!(binding.player().is_running());
    }

    #[test]
    fn test_playback_end_to_end_with_wrap() {
        let (stage, traj, binding) = setup(5);
        let confirmed = Arc::new(Mutex::new(Vec::new()));
        let c = Arc::clone(&confirmed);
        let _sub = traj
            .signals
            .frame_changed
            .subscribe(move |f| c.lock().unwrap().push(*f));

        binding.toggle_play();
        for _ in 0..4 {
            binding.player().tick();
            stage.update();
        }
        assert_eq!(&*confirmed.lock().unwrap(), &[0, 1, 2, 3]);

        binding.player().tick();
        stage.update();
        assert_eq!(&*confirmed.lock().unwrap(), &[0, 1, 2, 3, 0]);
    }

    #[test]
    fn test_dispose_stops_player_and_detaches() {
        let (_stage, traj, mut binding) = setup(10);
        binding.toggle_play();
        binding.dispose();

        assert!(!binding.player().is_running());
        assert!(traj.player().is_none());
        assert_eq!(traj.signals.frame_changed.subscriber_count(), 0);
        assert_eq!(traj.signals.got_numframes.subscriber_count(), 0);
    }
}
