//! Representation entity - visibility flag plus a JSON parameter map.

use std::sync::Mutex;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::core::signal::Signal;

/// Channels owned by every representation.
#[derive(Default)]
pub struct RepresentationSignals {
    pub visibility_changed: Signal<bool>,
    /// Carries the parameter patch that was applied, not the full map.
    pub parameters_changed: Signal<Value>,
}

struct ReprState {
    name: String,
    visible: bool,
    params: Map<String, Value>,
}

/// A rendering representation attached to a component (cartoon, surface,
/// licorice, ...). The renderer itself is external; this is the control
/// surface the bindings observe and command.
pub struct Representation {
    id: Uuid,
    state: Mutex<ReprState>,
    pub signals: RepresentationSignals,
}

impl Representation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: Mutex::new(ReprState {
                name: name.into(),
                visible: true,
                params: Map::new(),
            }),
            signals: RepresentationSignals::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> String {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .name
            .clone()
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

    /// Current parameter map as a JSON object.
    pub fn parameters(&self) -> Value {
        Value::Object(
            self.state
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .params
                .clone(),
        )
    }

    /// Merge a JSON-object patch into the parameter map and publish it.
    /// Non-object patches are ignored with a warning.
    pub fn set_parameters(&self, patch: Value) {
        let Value::Object(fields) = patch else {
            log::warn!("representation {}: non-object parameter patch ignored", self.id);
            return;
        };
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            for (key, value) in &fields {
                state.params.insert(key.clone(), value.clone());
            }
        }
        self.signals.parameters_changed.publish(Value::Object(fields));
    }
}

impl std::fmt::Debug for Representation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Representation")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("visible", &self.visible())
            .finish()
    }
}
