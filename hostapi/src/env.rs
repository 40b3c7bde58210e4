//! The host environment seam.
//!
//! The sandbox runtime talks to the host only through [`HostEnvironment`].
//! [`MemHost`](crate::mem_host::MemHost) is the deterministic in-memory
//! implementation used by the runtime and its tests.

use crate::event_loop::EventLoop;
use crate::object::ObjectRef;

/// Optional host capabilities a module may depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostFeature {
    IdleCallback,
    AnimationFrame,
    Performance,
}

impl HostFeature {
    pub fn name(self) -> &'static str {
        match self {
            Self::IdleCallback => "requestIdleCallback",
            Self::AnimationFrame => "requestAnimationFrame",
            Self::Performance => "performance",
        }
    }
}

pub trait HostEnvironment {
    /// The canonical global object. Every global accessor returns this same
    /// object.
    fn global(&self) -> ObjectRef;

    /// The window's document, if the host has one.
    fn document(&self) -> Option<ObjectRef>;

    /// `performance`, if supported.
    fn performance(&self) -> Option<ObjectRef>;

    fn event_loop(&self) -> &EventLoop;

    fn event_loop_mut(&mut self) -> &mut EventLoop;

    fn supports(&self, feature: HostFeature) -> bool;

    /// `performance.now()` / the virtual clock.
    fn now(&self) -> f64 {
        self.event_loop().now()
    }
}
