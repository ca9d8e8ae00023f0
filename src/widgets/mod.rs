//! UI bindings - headless per-entity state mirrors.
//!
//! A binding is the UI-side twin of one live entity: created when the
//! entity's "added" signal fires, destroyed exactly once when the entity is
//! removed or the user disposes it. Each binding owns its subscriptions and
//! releases them all on disposal. The actual pixels are the embedding
//! toolkit's problem; bindings expose the state a view would render.

pub mod browser;
pub mod component;
pub mod confirm;
pub mod representation;
pub mod sidebar;
pub mod structure;
pub mod trajectory;

pub use browser::DirectoryBrowser;
pub use component::ComponentBinding;
pub use confirm::{ConfirmButton, ConfirmClick};
pub use representation::RepresentationBinding;
pub use sidebar::Sidebar;
pub use structure::{StructureBinding, SurfaceBinding};
pub use trajectory::TrajectoryBinding;

use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::core::frames::FrameQueue;
use crate::core::signal::Signal;
use crate::entities::Stage;

/// Shared context handed to binding constructors.
#[derive(Clone)]
pub struct BindingCtx {
    pub stage: Arc<Stage>,
    pub frames: FrameQueue,
    /// Published with the entity id whenever a binding finishes disposal.
    pub binding_disposed: Signal<Uuid>,
}

/// One UI binding, 1:1 with a live entity.
pub trait Binding: Send {
    /// Id of the bound entity.
    fn entity(&self) -> Uuid;

    /// Host-loop tick for timers owned by the binding.
    fn update(&mut self, _now: Instant) {}

    /// Expand/collapse the binding's panel.
    fn set_collapsed(&mut self, _collapsed: bool) {}

    /// One click on the binding's delete button, if it has one.
    fn delete_click(&mut self, _now: Instant) -> Option<ConfirmClick> {
        None
    }

    /// Release all subscriptions and child bindings. Children are disposed
    /// before the binding itself reports disposal.
    fn dispose(&mut self);
}
