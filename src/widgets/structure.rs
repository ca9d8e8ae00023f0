//! Structure and surface component bindings.
//!
//! Both own child sub-bindings created and destroyed in reaction to the
//! component's `representation_added/removed` (and, for structures,
//! `trajectory_added/removed`) signals. Disposal runs children before the
//! parent reports its own disposal.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use uuid::Uuid;

use super::component::ComponentBinding;
use super::confirm::ConfirmClick;
use super::representation::RepresentationBinding;
use super::trajectory::TrajectoryBinding;
use super::{Binding, BindingCtx};
use crate::core::signal::Subscriptions;
use crate::entities::Component;

type Children = Arc<Mutex<Vec<Box<dyn Binding>>>>;

fn dispose_child(children: &Children, entity: Uuid) {
    let child = {
        let mut children = children.lock().unwrap_or_else(|e| e.into_inner());
        children
            .iter()
            .position(|c| c.entity() == entity)
            .map(|idx| children.remove(idx))
    };
    if let Some(mut child) = child {
        child.dispose();
    }
}

fn dispose_all(children: &Children) {
    let drained: Vec<Box<dyn Binding>> = {
        let mut children = children.lock().unwrap_or_else(|e| e.into_inner());
        children.drain(..).collect()
    };
    for mut child in drained {
        child.dispose();
    }
}

/// Binding for structure-bearing components: representations plus
/// trajectories as child sub-bindings.
pub struct StructureBinding {
    core: ComponentBinding,
    component: Arc<Component>,
    children: Children,
    subs: Subscriptions,
}

impl StructureBinding {
    pub fn new(component: Arc<Component>, ctx: &BindingCtx) -> Self {
        let core = ComponentBinding::new(Arc::clone(&component), ctx);
        let children: Children = Arc::new(Mutex::new(Vec::new()));
        let mut subs = Subscriptions::new();

        // Entities attached before this binding existed still get children.
        {
            let mut list = children.lock().unwrap_or_else(|e| e.into_inner());
            for repr in component.representations() {
                list.push(Box::new(RepresentationBinding::new(repr, ctx)));
            }
            for traj in component.trajectories() {
                list.push(Box::new(TrajectoryBinding::new(traj, ctx)));
            }
        }

        let c = Arc::clone(&children);
        let cx = ctx.clone();
        subs.track(
            component
                .signals
                .representation_added
                .subscribe(move |repr| {
                    c.lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .push(Box::new(RepresentationBinding::new(
                            Arc::clone(repr),
                            &cx,
                        )));
                }),
        );

        let c = Arc::clone(&children);
        subs.track(
            component
                .signals
                .representation_removed
                .subscribe(move |id| dispose_child(&c, *id)),
        );

        let c = Arc::clone(&children);
        let cx = ctx.clone();
        subs.track(component.signals.trajectory_added.subscribe(move |traj| {
            c.lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(Box::new(TrajectoryBinding::new(Arc::clone(traj), &cx)));
        }));

        let c = Arc::clone(&children);
        subs.track(
            component
                .signals
                .trajectory_removed
                .subscribe(move |id| dispose_child(&c, *id)),
        );

        Self {
            core,
            component,
            children,
            subs,
        }
    }

    pub(crate) fn construct(component: Arc<Component>, ctx: &BindingCtx) -> Box<dyn Binding> {
        Box::new(Self::new(component, ctx))
    }

    pub fn child_count(&self) -> usize {
        self.children.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn delete_click(&mut self, now: Instant) -> ConfirmClick {
        self.core.delete_click(now)
    }
}

impl Binding for StructureBinding {
    fn entity(&self) -> Uuid {
        self.component.id()
    }

    fn update(&mut self, now: Instant) {
        self.core.update(now);
        let mut children = self.children.lock().unwrap_or_else(|e| e.into_inner());
        for child in children.iter_mut() {
            child.update(now);
        }
    }

    fn set_collapsed(&mut self, collapsed: bool) {
        self.core.set_collapsed(collapsed);
    }

    fn delete_click(&mut self, now: Instant) -> Option<ConfirmClick> {
        Some(self.core.delete_click(now))
    }

    fn dispose(&mut self) {
        dispose_all(&self.children);
        self.subs.dispose();
        self.core.dispose();
    }
}

/// Binding for surface-bearing components: representation children only.
pub struct SurfaceBinding {
    core: ComponentBinding,
    component: Arc<Component>,
    children: Children,
    subs: Subscriptions,
}

impl SurfaceBinding {
    pub fn new(component: Arc<Component>, ctx: &BindingCtx) -> Self {
        let core = ComponentBinding::new(Arc::clone(&component), ctx);
        let children: Children = Arc::new(Mutex::new(Vec::new()));
        let mut subs = Subscriptions::new();

        {
            let mut list = children.lock().unwrap_or_else(|e| e.into_inner());
            for repr in component.representations() {
                list.push(Box::new(RepresentationBinding::new(repr, ctx)));
            }
        }

        let c = Arc::clone(&children);
        let cx = ctx.clone();
        subs.track(
            component
                .signals
                .representation_added
                .subscribe(move |repr| {
                    c.lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .push(Box::new(RepresentationBinding::new(
                            Arc::clone(repr),
                            &cx,
                        )));
                }),
        );

        let c = Arc::clone(&children);
        subs.track(
            component
                .signals
                .representation_removed
                .subscribe(move |id| dispose_child(&c, *id)),
        );

        Self {
            core,
            component,
            children,
            subs,
        }
    }

    pub(crate) fn construct(component: Arc<Component>, ctx: &BindingCtx) -> Box<dyn Binding> {
        Box::new(Self::new(component, ctx))
    }

    pub fn child_count(&self) -> usize {
        self.children.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Binding for SurfaceBinding {
    fn entity(&self) -> Uuid {
        self.component.id()
    }

    fn update(&mut self, now: Instant) {
        self.core.update(now);
    }

    fn set_collapsed(&mut self, collapsed: bool) {
        self.core.set_collapsed(collapsed);
    }

    fn delete_click(&mut self, now: Instant) -> Option<ConfirmClick> {
        Some(self.core.delete_click(now))
    }

    fn dispose(&mut self) {
        dispose_all(&self.children);
        self.subs.dispose();
        self.core.dispose();
    }
}
