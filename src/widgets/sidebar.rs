//! Sidebar - the lifecycle registry keeping bindings 1:1 with components.
//!
//! Subscribes to the stage's `component_added/removed` signals and keeps an
//! insertion-ordered map of bindings. Which binding a component gets is
//! decided by a first-match constructor table keyed on [`EntityKind`];
//! components with no matching row are logged and skipped, so the map can
//! legitimately be smaller than the stage.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use indexmap::IndexMap;
use uuid::Uuid;

use super::component::ComponentBinding;
use super::confirm::ConfirmClick;
use super::structure::{StructureBinding, SurfaceBinding};
use super::{Binding, BindingCtx};
use crate::core::signal::{Signal, Subscriptions};
use crate::entities::{Component, EntityKind, Stage};

type Constructor = fn(Arc<Component>, &BindingCtx) -> Box<dyn Binding>;

/// First match wins. Order matters: more specific kinds come first.
const CONSTRUCTORS: &[(EntityKind, Constructor)] = &[
    (EntityKind::Structure, StructureBinding::construct),
    (EntityKind::Surface, SurfaceBinding::construct),
    (EntityKind::Script, ComponentBinding::construct),
    (EntityKind::Generic, ComponentBinding::construct),
];

fn construct_binding(component: Arc<Component>, ctx: &BindingCtx) -> Option<Box<dyn Binding>> {
    let kind = component.kind();
    for (row_kind, construct) in CONSTRUCTORS {
        if *row_kind == kind {
            return Some(construct(component, ctx));
        }
    }
    log::warn!(
        "sidebar: no binding for kind {kind:?}, skipping {:?}",
        component.name()
    );
    None
}

type Bindings = Arc<Mutex<IndexMap<Uuid, Box<dyn Binding>>>>;

pub struct Sidebar {
    stage: Arc<Stage>,
    ctx: BindingCtx,
    bindings: Bindings,
    subs: Subscriptions,
}

impl Sidebar {
    pub fn new(stage: Arc<Stage>) -> Self {
        let ctx = BindingCtx {
            stage: Arc::clone(&stage),
            frames: stage.frames(),
            binding_disposed: Signal::new(),
        };
        let bindings: Bindings = Arc::new(Mutex::new(IndexMap::new()));
        let mut subs = Subscriptions::new();

        // Components loaded before the sidebar existed still get bindings.
        {
            let mut map = bindings.lock().unwrap_or_else(|e| e.into_inner());
            for component in stage.components() {
                if let Some(binding) = construct_binding(Arc::clone(&component), &ctx) {
                    map.insert(component.id(), binding);
                }
            }
        }

        let b = Arc::clone(&bindings);
        let cx = ctx.clone();
        subs.track(stage.signals.component_added.subscribe(move |component| {
            if let Some(binding) = construct_binding(Arc::clone(component), &cx) {
                b.lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(component.id(), binding);
            }
        }));

        let b = Arc::clone(&bindings);
        subs.track(stage.signals.component_removed.subscribe(move |component| {
            // Dispose outside the map lock: disposal publishes signals whose
            // handlers may look the registry up again.
            let binding = b
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .shift_remove(&component.id());
            if let Some(mut binding) = binding {
                binding.dispose();
            }
        }));

        Self {
            stage,
            ctx,
            bindings,
            subs,
        }
    }

    /// Context for bindings created outside the registry (browser panes,
    /// tests). Cheap to clone.
    pub fn ctx(&self) -> &BindingCtx {
        &self.ctx
    }

    /// Published with the entity id each time a binding finishes disposal.
    pub fn binding_disposed(&self) -> &Signal<Uuid> {
        &self.ctx.binding_disposed
    }

    pub fn binding_count(&self) -> usize {
        self.bindings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn has_binding(&self, id: Uuid) -> bool {
        self.bindings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&id)
    }

    /// Host-loop tick: forwards the clock to every binding.
    pub fn update(&self, now: Instant) {
        let mut bindings = self.bindings.lock().unwrap_or_else(|e| e.into_inner());
        for binding in bindings.values_mut() {
            binding.update(now);
        }
    }

    pub fn expand_all(&self) {
        self.set_all_collapsed(false);
    }

    pub fn collapse_all(&self) {
        self.set_all_collapsed(true);
    }

    fn set_all_collapsed(&self, collapsed: bool) {
        let mut bindings = self.bindings.lock().unwrap_or_else(|e| e.into_inner());
        for binding in bindings.values_mut() {
            binding.set_collapsed(collapsed);
        }
    }

    /// One click on a binding's delete button. The second click inside the
    /// confirm window removes the component from the stage, which in turn
    /// tears the binding down through `component_removed`.
    ///
    /// Returns `None` when the id is unknown or the binding has no delete
    /// button.
    pub fn click_delete(&self, id: Uuid, now: Instant) -> Option<ConfirmClick> {
        let click = {
            let mut bindings = self.bindings.lock().unwrap_or_else(|e| e.into_inner());
            bindings.get_mut(&id)?.delete_click(now)?
        };
        // The removal signal re-enters the registry, so the map lock must be
        // released first.
        if click == ConfirmClick::Confirmed {
            self.stage.remove_component(id);
        }
        Some(click)
    }

    /// Detach from the stage and dispose every binding.
    pub fn dispose(&mut self) {
        self.subs.dispose();
        let drained: Vec<Box<dyn Binding>> = {
            let mut bindings = self.bindings.lock().unwrap_or_else(|e| e.into_inner());
            bindings.drain(..).map(|(_, binding)| binding).collect()
        };
        for mut binding in drained {
            binding.dispose();
        }
    }
}

impl Drop for Sidebar {
    fn drop(&mut self) {
        self.dispose();
    }
}
