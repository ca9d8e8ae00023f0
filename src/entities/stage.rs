//! Stage - the live set of components and the file loading entry point.
//!
//! Owns the frame-request plumbing: [`Stage::frames`] hands out request
//! handles and [`Stage::update`] drains completions once per host turn.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use indexmap::IndexMap;
use uuid::Uuid;

use super::component::Component;
use super::trajectory::Trajectory;
use crate::core::frames::{frame_channel, FramePump, FrameProvider, FrameQueue};
use crate::core::signal::Signal;
use crate::utils::media;

/// Stage-level channels.
#[derive(Default)]
pub struct StageSignals {
    pub component_added: Signal<Arc<Component>>,
    pub component_removed: Signal<Arc<Component>>,
}

pub struct Stage {
    components: Mutex<IndexMap<Uuid, Arc<Component>>>,
    frames: FrameQueue,
    pump: FramePump,
    pub signals: StageSignals,
}

impl Stage {
    pub fn new(provider: Arc<dyn FrameProvider>) -> Arc<Self> {
        let (frames, pump) = frame_channel(provider);
        Arc::new(Self {
            components: Mutex::new(IndexMap::new()),
            frames,
            pump,
            signals: StageSignals::default(),
        })
    }

    /// Request handle for the frame serializer. Cheap to clone.
    pub fn frames(&self) -> FrameQueue {
        self.frames.clone()
    }

    /// Drain asynchronous completions. Call once per host turn.
    pub fn update(&self) -> usize {
        self.pump.pump()
    }

    pub fn add_component(&self, component: Arc<Component>) {
        self.components
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(component.id(), Arc::clone(&component));
        self.signals.component_added.publish(component);
    }

    /// Remove a component. Lifecycle bindings react to the published
    /// `component_removed` signal.
    pub fn remove_component(&self, id: Uuid) -> Option<Arc<Component>> {
        let removed = self
            .components
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .shift_remove(&id);
        if let Some(component) = &removed {
            self.signals.component_removed.publish(Arc::clone(component));
        }
        removed
    }

    pub fn component(&self, id: Uuid) -> Option<Arc<Component>> {
        self.components
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
    }

    pub fn components(&self) -> Vec<Arc<Component>> {
        self.components
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }

    pub fn component_count(&self) -> usize {
        self.components
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Create a component for a file and add it to the stage. The kind is
    /// taken from the extension; content loading is the data layer's job.
    /// Unknown extensions abort with no state change.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Arc<Component>> {
        let path = path.as_ref();
        let Some(kind) = media::kind_for_path(path) else {
            log::warn!("load_file: unknown extension, ignoring {}", path.display());
            bail!("unknown file extension: {}", path.display());
        };
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("unnamed")
            .to_string();
        let component = Arc::new(Component::new(name, kind));
        self.add_component(Arc::clone(&component));
        Ok(component)
    }

    /// Attach a trajectory file to a component. Unknown trajectory
    /// extensions abort with no state change.
    pub fn load_trajectory(
        &self,
        component: &Arc<Component>,
        path: impl AsRef<Path>,
    ) -> Result<Arc<Trajectory>> {
        let path = path.as_ref();
        if !media::is_trajectory(path) {
            log::warn!(
                "load_trajectory: unknown extension, ignoring {}",
                path.display()
            );
            bail!("unknown trajectory extension: {}", path.display());
        }
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("unnamed")
            .to_string();
        let traj = Arc::new(Trajectory::new(name, path.display().to_string()));
        component.add_trajectory(Arc::clone(&traj));
        Ok(traj)
    }

    /// Trajectory lookup across all live components.
    pub fn trajectory(&self, id: Uuid) -> Option<Arc<Trajectory>> {
        let components = self.components.lock().unwrap_or_else(|e| e.into_inner());
        components.values().find_map(|c| c.trajectory(id))
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("components", &self.component_count())
            .finish()
    }
}
