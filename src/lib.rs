//! MOLSTAGE - Control surface for a molecular viewer
//!
//! Headless UI-side state for a molecular-visualization stage: per-entity
//! bindings, trajectory playback, serialized frame requests, directory
//! browsing. Rendering and data parsing live behind collaborator seams.

// Core plumbing (signals, frame serializer, playback controller)
pub mod core;

// App modules
pub mod dirlist;
pub mod entities;
pub mod utils;
pub mod widgets;

// Re-export commonly used types from core
pub use core::frames::{frame_channel, FrameDone, FrameProvider, FramePump, FrameQueue};
pub use core::player::TrajectoryPlayer;
pub use core::signal::{Signal, Subscription, Subscriptions};

// Re-export entities
pub use entities::{Component, EntityKind, Representation, Stage, Trajectory};

// Re-export the binding layer
pub use widgets::{Binding, BindingCtx, Sidebar};
