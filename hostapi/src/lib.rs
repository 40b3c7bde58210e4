//! `boundary-hostapi`: the host side of the sandbox boundary.
//!
//! This crate knows nothing about WebAssembly. It provides:
//!
//! - `HostValue` / `ObjectRef`: host values and the object tree
//! - `RefTable`: integer handles for host values, with sentinel slots
//! - `Closure`: the reference-counted state machine for sandbox callbacks
//! - `EventLoop`: deterministic timers, frames, idle callbacks, microtasks
//! - `HostEnvironment`: the seam the runtime talks to, and `MemHost`
//! - `HostError`: host exceptions, captured by the sandbox layer

pub mod closure;
pub mod dom;
pub mod env;
pub mod error;
pub mod event;
pub mod event_loop;
pub mod kind;
pub mod mem_host;
pub mod object;
pub mod promise;
pub mod ref_table;
pub mod value;

// Re-export commonly used types at the crate root.
pub use closure::{Closure, ClosureKind, ClosurePhase, Destructor, DropOutcome, FinalizationQueue};
pub use env::{HostEnvironment, HostFeature};
pub use error::{HostError, HostErrorKind};
pub use event::Event;
pub use event_loop::{EventLoop, Task, TaskSource};
pub use kind::HostKind;
pub use mem_host::{HostFeatures, MemHost};
pub use object::{ObjectKind, ObjectRef, ShadowRootMode};
pub use ref_table::RefTable;
pub use value::HostValue;
