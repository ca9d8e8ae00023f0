//! Core engine modules - signals, playback, frame serialization.
//!
//! Everything here is UI-independent; the widget bindings sit on top.

pub mod frames;
pub mod player;
pub mod signal;

pub use frames::{frame_channel, FrameDone, FramePump, FrameProvider, FrameQueue};
pub use player::TrajectoryPlayer;
pub use signal::{Signal, Subscription, Subscriptions};
