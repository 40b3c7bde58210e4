//! In-memory host environment.

use tracing::debug;

use crate::dom;
use crate::env::{HostEnvironment, HostFeature};
use crate::event_loop::EventLoop;
use crate::object::{ObjectKind, ObjectRef};

/// Toggles for optional host capabilities. Everything is on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostFeatures {
    pub idle_callbacks: bool,
    pub animation_frames: bool,
    pub performance: bool,
}

impl Default for HostFeatures {
    fn default() -> Self {
        Self {
            idle_callbacks: true,
            animation_frames: true,
            performance: true,
        }
    }
}

/// A window with a document, a performance clock and an event loop.
pub struct MemHost {
    window: ObjectRef,
    document: Option<ObjectRef>,
    performance: ObjectRef,
    event_loop: EventLoop,
    features: HostFeatures,
}

impl Default for MemHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemHost {
    pub fn new() -> Self {
        Self::with_features(HostFeatures::default())
    }

    pub fn with_features(features: HostFeatures) -> Self {
        let mut event_loop = EventLoop::new();
        event_loop.set_idle_enabled(features.idle_callbacks);
        debug!(?features, "memory host created");
        Self {
            window: ObjectRef::new(ObjectKind::Window),
            document: Some(dom::new_document()),
            performance: ObjectRef::new(ObjectKind::Performance),
            event_loop,
            features,
        }
    }

    /// A worker-like host: a global but no document.
    pub fn without_document() -> Self {
        Self {
            document: None,
            ..Self::new()
        }
    }

    pub fn features(&self) -> HostFeatures {
        self.features
    }
}

impl HostEnvironment for MemHost {
    fn global(&self) -> ObjectRef {
        self.window.clone()
    }

    fn document(&self) -> Option<ObjectRef> {
        self.document.clone()
    }

    fn performance(&self) -> Option<ObjectRef> {
        self.features.performance.then(|| self.performance.clone())
    }

    fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    fn event_loop_mut(&mut self) -> &mut EventLoop {
        &mut self.event_loop
    }

    fn supports(&self, feature: HostFeature) -> bool {
        match feature {
            HostFeature::IdleCallback => self.features.idle_callbacks,
            HostFeature::AnimationFrame => self.features.animation_frames,
            HostFeature::Performance => self.features.performance,
        }
    }
}
