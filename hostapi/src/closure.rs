//! Host-side state machine for sandbox closures.
//!
//! A [`Closure`] stands for a callback that lives in the sandbox: an opaque
//! `(context, data)` pair plus the indices of the sandbox functions that
//! invoke and destroy it. The host only tracks *when* the destructor may
//! run:
//!
//! ```text
//!            begin_invoke (+1)          end_invoke (-1, reaching 0)
//! Active(n) ──────────────▶ Active(n+1) ───────────────────────────▶ Inert
//!     │                                                               ▲
//!     └── release() with n == 1 ──────────────────────────────────────┘
//! ```
//!
//! The count starts at 1 for the creator's hold. Every in-flight invocation
//! holds one more, so a drop requested from inside a callback defers the
//! destructor until the outermost invocation unwinds. Once `Inert`, a closure
//! can never be invoked or destroyed again.
//!
//! If every host holder lets go of a closure that is still active, the
//! destructor is queued on the [`FinalizationQueue`] instead; the runtime
//! drains it at a safe point.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{trace, warn};

use crate::error::HostError;

/// Shared closures may be invoked reentrantly; mutable ones may not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosureKind {
    Shared,
    Mutable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosurePhase {
    /// Live, with the number of outstanding holds (creator + invocations).
    Active(u32),
    /// Destroyed or released; permanently unusable.
    Inert,
}

/// Result of the sandbox dropping its hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// The caller held the last reference; it must destroy its side now.
    Released,
    /// An invocation is still running (or the closure was already inert).
    StillHeld,
}

/// Everything needed to call into the sandbox for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation {
    pub context: u32,
    pub data: u32,
    pub invoke: u32,
}

/// A destructor call owed to the sandbox: `dtor_<slot>(context, data)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destructor {
    pub slot: u32,
    pub context: u32,
    pub data: u32,
}

struct ClosureState {
    kind: ClosureKind,
    context: u32,
    data: u32,
    dtor: u32,
    invoke: u32,
    phase: ClosurePhase,
}

struct ClosureCell {
    state: RefCell<ClosureState>,
    finalizer: Weak<RefCell<Vec<Destructor>>>,
}

impl Drop for ClosureCell {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if !matches!(state.phase, ClosurePhase::Active(_)) || state.context == 0 {
            return;
        }
        let record = Destructor {
            slot: state.dtor,
            context: state.context,
            data: state.data,
        };
        state.phase = ClosurePhase::Inert;
        let Some(queue) = self.finalizer.upgrade() else {
            warn!(dtor = record.slot, "closure collected after its store; destructor skipped");
            return;
        };
        match queue.try_borrow_mut() {
            Ok(mut pending) => {
                trace!(dtor = record.slot, context = record.context, "closure queued for finalization");
                pending.push(record);
            }
            Err(_) => warn!(dtor = record.slot, "finalization queue busy; destructor skipped"),
        };
    }
}

/// Reference-counted handle to a sandbox closure.
///
/// Cloning the handle shares the same state; the host-side holders (table
/// slots, listeners, timers) are exactly the live clones.
#[derive(Clone)]
pub struct Closure(Rc<ClosureCell>);

impl Closure {
    /// Wrap a sandbox callback. A zero context is rejected: zero is the
    /// "taken" marker of mutable closures.
    pub fn new(
        kind: ClosureKind,
        context: u32,
        data: u32,
        dtor: u32,
        invoke: u32,
        finalizer: &FinalizationQueue,
    ) -> Result<Self, HostError> {
        if context == 0 {
            return Err(HostError::type_error("closure context must be non-zero"));
        }
        trace!(?kind, context, data, dtor, invoke, "closure created");
        Ok(Self(Rc::new(ClosureCell {
            state: RefCell::new(ClosureState {
                kind,
                context,
                data,
                dtor,
                invoke,
                phase: ClosurePhase::Active(1),
            }),
            finalizer: Rc::downgrade(&finalizer.0),
        })))
    }

    pub fn ptr_eq(&self, other: &Closure) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn kind(&self) -> ClosureKind {
        self.0.state.borrow().kind
    }

    pub fn phase(&self) -> ClosurePhase {
        self.0.state.borrow().phase
    }

    pub fn is_inert(&self) -> bool {
        self.phase() == ClosurePhase::Inert
    }

    /// Current context; `0` while a mutable invocation has it taken or once
    /// inert.
    pub fn context(&self) -> u32 {
        self.0.state.borrow().context
    }

    pub fn invoke_slot(&self) -> u32 {
        self.0.state.borrow().invoke
    }

    /// Start an invocation. `None` means the call must be refused: the
    /// closure is inert, or it is mutable and already running.
    pub fn begin_invoke(&self) -> Option<Invocation> {
        let mut state = self.0.state.borrow_mut();
        let ClosurePhase::Active(count) = state.phase else {
            return None;
        };
        if state.context == 0 {
            return None;
        }
        state.phase = ClosurePhase::Active(count + 1);
        let invocation = Invocation {
            context: state.context,
            data: state.data,
            invoke: state.invoke,
        };
        if state.kind == ClosureKind::Mutable {
            state.context = 0;
        }
        Some(invocation)
    }

    /// Finish an invocation started with [`begin_invoke`](Self::begin_invoke).
    ///
    /// Returns the destructor to run if this invocation released the last
    /// hold.
    pub fn end_invoke(&self, invocation: &Invocation) -> Option<Destructor> {
        let mut state = self.0.state.borrow_mut();
        let ClosurePhase::Active(count) = state.phase else {
            return None;
        };
        if count <= 1 {
            state.phase = ClosurePhase::Inert;
            state.context = 0;
            trace!(dtor = state.dtor, "closure released after invocation");
            return Some(Destructor {
                slot: state.dtor,
                context: invocation.context,
                data: state.data,
            });
        }
        state.phase = ClosurePhase::Active(count - 1);
        if state.kind == ClosureKind::Mutable {
            state.context = invocation.context;
        }
        None
    }

    /// Drop the sandbox's creator hold.
    pub fn release(&self) -> DropOutcome {
        let mut state = self.0.state.borrow_mut();
        match state.phase {
            ClosurePhase::Active(1) => {
                state.phase = ClosurePhase::Inert;
                state.context = 0;
                trace!(dtor = state.dtor, "closure fully released");
                DropOutcome::Released
            }
            ClosurePhase::Active(count) => {
                state.phase = ClosurePhase::Active(count - 1);
                DropOutcome::StillHeld
            }
            ClosurePhase::Inert => {
                warn!(dtor = state.dtor, "drop of an inert closure ignored");
                DropOutcome::StillHeld
            }
        }
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.state.try_borrow() {
            Ok(state) => f
                .debug_struct("Closure")
                .field("kind", &state.kind)
                .field("phase", &state.phase)
                .field("dtor", &state.dtor)
                .field("invoke", &state.invoke)
                .finish(),
            Err(_) => f.write_str("Closure(<borrowed>)"),
        }
    }
}

/// Destructors owed for closures the host let go of while still active.
#[derive(Clone, Default)]
pub struct FinalizationQueue(Rc<RefCell<Vec<Destructor>>>);

impl FinalizationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every pending record.
    pub fn drain(&self) -> Vec<Destructor> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}
