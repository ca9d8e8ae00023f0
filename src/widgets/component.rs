//! Generic component binding - name, status, collapse state, delete button.
//!
//! Also serves script-bearing components, whose panel is the same
//! name/status surface.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use uuid::Uuid;

use super::confirm::{ConfirmButton, ConfirmClick};
use super::{Binding, BindingCtx};
use crate::core::signal::Subscriptions;
use crate::entities::Component;

/// Map a raw status string from the loading layer to display text.
pub fn status_label(status: &str) -> String {
    match status {
        "404" => "Error: file not found".to_string(),
        other => other.to_string(),
    }
}

/// What a component panel would render.
#[derive(Clone, Debug, Default)]
pub struct ComponentDisplay {
    pub name: String,
    pub status: String,
    /// Loading spinner shown until the first status arrives.
    pub loading: bool,
    /// Set when the loading layer reported an error code. The entity stays
    /// in the registry in this failed display state.
    pub failed: bool,
    pub collapsed: bool,
}

pub struct ComponentBinding {
    component: Arc<Component>,
    display: Arc<Mutex<ComponentDisplay>>,
    delete: ConfirmButton,
    subs: Subscriptions,
    ctx: BindingCtx,
}

impl ComponentBinding {
    pub fn new(component: Arc<Component>, ctx: &BindingCtx) -> Self {
        let display = Arc::new(Mutex::new(ComponentDisplay {
            name: component.name(),
            loading: true,
            ..ComponentDisplay::default()
        }));
        let mut subs = Subscriptions::new();

        let d = Arc::clone(&display);
        subs.track(component.signals.name_changed.subscribe(move |name| {
            d.lock().unwrap_or_else(|e| e.into_inner()).name = name.clone();
        }));

        let d = Arc::clone(&display);
        subs.track(component.signals.status_changed.subscribe(move |status| {
            let mut display = d.lock().unwrap_or_else(|e| e.into_inner());
            display.loading = false;
            display.failed = status.parse::<u16>().is_ok_and(|code| code >= 400);
            display.status = status_label(status);
            // A status message forces the panel open so it is visible.
            display.collapsed = false;
        }));

        let d = Arc::clone(&display);
        subs.track(
            component
                .signals
                .request_gui_visibility
                .subscribe(move |visible| {
                    d.lock().unwrap_or_else(|e| e.into_inner()).collapsed = !visible;
                }),
        );

        Self {
            component,
            display,
            delete: ConfirmButton::new(),
            subs,
            ctx: ctx.clone(),
        }
    }

    pub(crate) fn construct(component: Arc<Component>, ctx: &BindingCtx) -> Box<dyn Binding> {
        Box::new(Self::new(component, ctx))
    }

    pub fn display(&self) -> ComponentDisplay {
        self.display
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn delete_armed(&self) -> bool {
        self.delete.is_armed()
    }

    /// One click on the trash button. The caller (sidebar) performs the
    /// actual removal when this returns `Confirmed`.
    pub fn delete_click(&mut self, now: Instant) -> ConfirmClick {
        self.delete.click(now)
    }
}

impl Binding for ComponentBinding {
    fn entity(&self) -> Uuid {
        self.component.id()
    }

    fn update(&mut self, now: Instant) {
        self.delete.tick(now);
    }

    fn set_collapsed(&mut self, collapsed: bool) {
        self.display
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .collapsed = collapsed;
    }

    fn delete_click(&mut self, now: Instant) -> Option<ConfirmClick> {
        Some(self.delete.click(now))
    }

    fn dispose(&mut self) {
        self.subs.dispose();
        self.ctx.binding_disposed.publish(self.component.id());
    }
}
