//! Observed domain objects - components, representations, trajectories.
//!
//! These are the control surface's view of objects owned by the external
//! data/viewer layer: a small read/command surface plus the signal channels
//! UI bindings subscribe to. Structure parsing, surface generation and
//! frame decoding all live behind collaborator seams.

pub mod component;
pub mod representation;
pub mod stage;
pub mod trajectory;

pub use component::Component;
pub use representation::Representation;
pub use stage::Stage;
pub use trajectory::{Trajectory, TrajectoryParams};

/// Tagged component kind, dispatched through a constructor lookup table
/// when the sidebar builds bindings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Structure-bearing: representations plus optional trajectories.
    Structure,
    /// Surface-bearing: representations only.
    Surface,
    /// Script-bearing.
    Script,
    /// Plain component with name/status only.
    Generic,
    /// Reported by collaborators we do not recognize. No binding is built.
    Unknown,
}

impl EntityKind {
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Structure => "structure",
            EntityKind::Surface => "surface",
            EntityKind::Script => "script",
            EntityKind::Generic => "component",
            EntityKind::Unknown => "unknown",
        }
    }
}
