//! Component entity - name, status, kind, and the owned representation and
//! trajectory lists.

use std::sync::{Arc, Mutex};

use uuid::Uuid;

use super::representation::Representation;
use super::trajectory::Trajectory;
use super::EntityKind;
use crate::core::signal::Signal;

/// Channels owned by every component.
#[derive(Default)]
pub struct ComponentSignals {
    pub name_changed: Signal<String>,
    /// Status string from the loading layer, possibly a bare code ("404").
    pub status_changed: Signal<String>,
    pub visibility_changed: Signal<bool>,
    /// Sidebar-wide expand/collapse requests.
    pub request_gui_visibility: Signal<bool>,
    pub representation_added: Signal<Arc<Representation>>,
    pub representation_removed: Signal<Uuid>,
    pub trajectory_added: Signal<Arc<Trajectory>>,
    pub trajectory_removed: Signal<Uuid>,
}

struct ComponentState {
    name: String,
    status: String,
    visible: bool,
}

pub struct Component {
    id: Uuid,
    kind: EntityKind,
    state: Mutex<ComponentState>,
    representations: Mutex<Vec<Arc<Representation>>>,
    trajectories: Mutex<Vec<Arc<Trajectory>>>,
    pub signals: ComponentSignals,
}

impl Component {
    pub fn new(name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            state: Mutex::new(ComponentState {
                name: name.into(),
                status: String::new(),
                visible: true,
            }),
            representations: Mutex::new(Vec::new()),
            trajectories: Mutex::new(Vec::new()),
            signals: ComponentSignals::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn name(&self) -> String {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .name
            .clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.name = name.clone();
        }
        self.signals.name_changed.publish(name);
    }

    pub fn status(&self) -> String {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .status
            .clone()
    }

    /// Called by the loading layer. Failure codes ("404") land here too;
    /// the binding maps them to display text, the entity stays registered.
    pub fn set_status(&self, status: impl Into<String>) {
        let status = status.into();
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.status = status.clone();
        }
        self.signals.status_changed.publish(status);
    }

    pub fn visible(&self) -> bool {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).visible
    }

    pub fn set_visibility(&self, visible: bool) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if state.visible == visible {
                return;
            }
            state.visible = visible;
        }
        self.signals.visibility_changed.publish(visible);
    }

    /// Ask the component's binding to expand or collapse.
    pub fn request_gui_visibility(&self, visible: bool) {
        self.signals.request_gui_visibility.publish(visible);
    }

    pub fn representations(&self) -> Vec<Arc<Representation>> {
        self.representations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn add_representation(&self, repr: Arc<Representation>) {
        self.representations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::clone(&repr));
        self.signals.representation_added.publish(repr);
    }

    pub fn remove_representation(&self, id: Uuid) {
        let removed = {
            let mut reprs = self
                .representations
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            let before = reprs.len();
            reprs.retain(|r| r.id() != id);
            reprs.len() != before
        };
        if removed {
            self.signals.representation_removed.publish(id);
        }
    }

    pub fn trajectories(&self) -> Vec<Arc<Trajectory>> {
        self.trajectories
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn add_trajectory(&self, traj: Arc<Trajectory>) {
        self.trajectories
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::clone(&traj));
        self.signals.trajectory_added.publish(traj);
    }

    pub fn remove_trajectory(&self, id: Uuid) {
        let removed = {
            let mut trajs = self.trajectories.lock().unwrap_or_else(|e| e.into_inner());
            let before = trajs.len();
            trajs.retain(|t| t.id() != id);
            trajs.len() != before
        };
        if removed {
            self.signals.trajectory_removed.publish(id);
        }
    }

    /// Trajectory lookup across this component.
    pub fn trajectory(&self, id: Uuid) -> Option<Arc<Trajectory>> {
        self.trajectories
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|t| t.id() == id)
            .cloned()
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("name", &self.name())
            .finish()
    }
}
