//! Representation binding - mirrors visibility and the parameter map.

use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use uuid::Uuid;

use super::{Binding, BindingCtx};
use crate::core::signal::Subscriptions;
use crate::entities::Representation;

/// What a representation row would render.
#[derive(Clone, Debug, Default)]
pub struct RepresentationDisplay {
    pub name: String,
    pub visible: bool,
    pub params: Map<String, Value>,
    pub collapsed: bool,
}

pub struct RepresentationBinding {
    repr: Arc<Representation>,
    display: Arc<Mutex<RepresentationDisplay>>,
    subs: Subscriptions,
    ctx: BindingCtx,
}

impl RepresentationBinding {
    pub fn new(repr: Arc<Representation>, ctx: &BindingCtx) -> Self {
        let display = Arc::new(Mutex::new(RepresentationDisplay {
            name: repr.name(),
            visible: repr.visible(),
            params: match repr.parameters() {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            collapsed: false,
        }));
        let mut subs = Subscriptions::new();

        let d = Arc::clone(&display);
        subs.track(repr.signals.visibility_changed.subscribe(move |visible| {
            d.lock().unwrap_or_else(|e| e.into_inner()).visible = *visible;
        }));

        let d = Arc::clone(&display);
        subs.track(repr.signals.parameters_changed.subscribe(move |patch| {
            if let Value::Object(fields) = patch {
                let mut display = d.lock().unwrap_or_else(|e| e.into_inner());
                for (key, value) in fields {
                    display.params.insert(key.clone(), value.clone());
                }
            }
        }));

        Self {
            repr,
            display,
            subs,
            ctx: ctx.clone(),
        }
    }

    pub fn display(&self) -> RepresentationDisplay {
        self.display
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Toggle-visibility button.
    pub fn toggle_visibility(&self) {
        self.repr.set_visibility(!self.repr.visible());
    }
}

impl Binding for RepresentationBinding {
    fn entity(&self) -> Uuid {
        self.repr.id()
    }

    fn set_collapsed(&mut self, collapsed: bool) {
        self.display
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .collapsed = collapsed;
    }

    fn dispose(&mut self) {
        self.subs.dispose();
        self.ctx.binding_disposed.publish(self.repr.id());
    }
}
