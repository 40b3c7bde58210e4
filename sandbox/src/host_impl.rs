//! Per-instance mutable state held in the Wasmtime Store.
//!
//! `HostState` combines the host environment, the reference table, the
//! memory view record, the closure finalization queue and the exception
//! slot into a single struct that lives inside `Store<HostState>` for the
//! lifetime of one instance.

use std::rc::Rc;

use tracing::trace;
use wasmtime::{StoreLimits, StoreLimitsBuilder};

use boundary_hostapi::{
    Closure, FinalizationQueue, HostEnvironment, HostError, HostValue, ObjectRef, RefTable,
};

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::exports::GuestExports;
use crate::memory::MemoryView;

/// Counters describing closure traffic across the boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Calls made into invoke trampolines.
    pub invocations: u64,
    /// Invocations refused because the closure was inert or busy.
    pub refused: u64,
    /// Destructors run, explicit and finalized.
    pub destructors_run: u64,
    /// Destructors run from the finalization queue.
    pub finalized: u64,
}

/// Per-instance mutable state held in the Wasmtime `Store`.
pub struct HostState {
    /// The host: global object, document, event loop.
    pub env: Box<dyn HostEnvironment>,
    /// Handles the sandbox holds on host values.
    pub table: RefTable,
    /// Identity of the linear memory buffer last observed.
    pub view: MemoryView,
    /// Destructors owed for closures collected while still active.
    pub finalizers: FinalizationQueue,
    /// Exception slot waiting for `exception_take`.
    pub pending_exception: Option<u32>,
    /// Value thrown by the guest, waiting to unwind to the nearest guard.
    pub thrown: Option<HostValue>,
    /// The one handle every global accessor returns. Never freed.
    pub global_slot: u32,
    /// Wasmtime resource limits (memory growth).
    pub limits: StoreLimits,
    pub stats: BridgeStats,
    exports: Option<Rc<GuestExports>>,
}

impl HostState {
    /// Create the state for a new instance and pin the global handle.
    pub fn new(env: Box<dyn HostEnvironment>, config: &BridgeConfig) -> Result<Self, BridgeError> {
        let mut table = RefTable::new(config.max_table_slots);
        let global_slot = table.allocate(HostValue::from(env.global()))?;
        let limits = StoreLimitsBuilder::new()
            .memory_size(config.max_memory_bytes())
            .instances(1)
            .build();
        Ok(Self {
            env,
            table,
            view: MemoryView::default(),
            finalizers: FinalizationQueue::new(),
            pending_exception: None,
            thrown: None,
            global_slot,
            limits,
            stats: BridgeStats::default(),
            exports: None,
        })
    }

    pub fn set_exports(&mut self, exports: GuestExports) {
        self.exports = Some(Rc::new(exports));
    }

    /// The guest exports, once resolved.
    pub fn exports(&self) -> Result<Rc<GuestExports>, BridgeError> {
        self.exports
            .clone()
            .ok_or_else(|| BridgeError::MissingExport("exports used before instantiation finished".into()))
    }

    // ── Handles ──

    /// Resolve a handle to a clone of its value.
    pub fn value(&self, handle: i32) -> Result<HostValue, BridgeError> {
        let index = handle as u32;
        self.table.get(index).cloned().ok_or(BridgeError::BadHandle(index))
    }

    /// Resolve a handle that must name an object.
    pub fn object(&self, handle: i32) -> Result<ObjectRef, BridgeError> {
        match self.value(handle)? {
            HostValue::Object(obj) => Ok(obj),
            other => Err(HostError::type_error(format!(
                "expected an object, got {}",
                other.type_name()
            ))
            .into()),
        }
    }

    /// Resolve a handle that must name a function.
    pub fn function(&self, handle: i32) -> Result<Closure, BridgeError> {
        match self.value(handle)? {
            HostValue::Function(closure) => Ok(closure),
            other => Err(HostError::type_error(format!(
                "{} is not a function",
                other.debug_string()
            ))
            .into()),
        }
    }

    /// Resolve a handle as a target for global functions. `undefined` and
    /// `null` mean the global object.
    pub fn receiver(&self, handle: i32) -> Result<ObjectRef, BridgeError> {
        match self.value(handle)? {
            HostValue::Undefined | HostValue::Null => Ok(self.env.global()),
            HostValue::Object(obj) => Ok(obj),
            other => Err(HostError::type_error(format!(
                "expected an object, got {}",
                other.type_name()
            ))
            .into()),
        }
    }

    /// Hand a value to the sandbox. Sentinels and the global object reuse
    /// their fixed handles.
    pub fn expose(&mut self, value: HostValue) -> Result<i32, BridgeError> {
        if let HostValue::Object(obj) = &value {
            if obj.ptr_eq(&self.env.global()) {
                return Ok(self.global_slot as i32);
            }
        }
        Ok(self.table.expose(value)? as i32)
    }

    /// Resolve and release a handle the sandbox gave up.
    pub fn take(&mut self, handle: i32) -> Result<HostValue, BridgeError> {
        let index = handle as u32;
        if index == self.global_slot {
            return self.value(handle);
        }
        self.table.take(index).ok_or(BridgeError::BadHandle(index))
    }

    /// `ref_drop`: release a handle. The global handle stays pinned.
    pub fn drop_handle(&mut self, handle: i32) -> Result<(), BridgeError> {
        let index = handle as u32;
        if index == self.global_slot {
            trace!(index, "drop of the global handle ignored");
            return Ok(());
        }
        if self.table.free(index) {
            Ok(())
        } else {
            Err(BridgeError::BadHandle(index))
        }
    }

    /// Record an exception for `exception_take`, releasing any previous one
    /// that was never taken.
    pub fn set_pending_exception(&mut self, slot: u32) {
        if let Some(previous) = self.pending_exception.replace(slot) {
            self.table.free(previous);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boundary_hostapi::ref_table::{NULL_SLOT, RESERVED_SLOTS, TRUE_SLOT, UNDEFINED_SLOT};
    use boundary_hostapi::{MemHost, ObjectKind};

    fn test_host_state() -> HostState {
        HostState::new(Box::new(MemHost::new()), &BridgeConfig::default()).unwrap()
    }

    #[test]
    fn test_global_handle_is_first_allocation() {
        let state = test_host_state();
        assert_eq!(state.global_slot, RESERVED_SLOTS);
        assert!(state.object(state.global_slot as i32).unwrap().is_window());
    }

    #[test]
    fn test_expose_reuses_fixed_handles() {
        let mut state = test_host_state();
        let global = state.env.global();
        assert_eq!(state.expose(HostValue::from(global)).unwrap(), state.global_slot as i32);
        assert_eq!(state.expose(HostValue::Undefined).unwrap(), UNDEFINED_SLOT as i32);
        assert_eq!(state.expose(HostValue::Bool(true)).unwrap(), TRUE_SLOT as i32);
        assert_eq!(state.expose(HostValue::from(None::<f64>)).unwrap(), UNDEFINED_SLOT as i32);
        assert_eq!(state.table.live(), 1);
    }

    #[test]
    fn test_global_handle_is_pinned() {
        let mut state = test_host_state();
        let global = state.global_slot as i32;
        state.drop_handle(global).unwrap();
        assert!(state.take(global).unwrap().is_object());
        assert!(state.value(global).is_ok());
    }

    #[test]
    fn test_bad_handles() {
        let mut state = test_host_state();
        assert!(matches!(state.value(500), Err(BridgeError::BadHandle(500))));
        let handle = state.expose(HostValue::from(1.5)).unwrap();
        state.drop_handle(handle).unwrap();
        assert!(matches!(state.drop_handle(handle), Err(BridgeError::BadHandle(_))));
        // sentinels can always be dropped
        state.drop_handle(NULL_SLOT as i32).unwrap();
    }

    #[test]
    fn test_object_and_function_narrowing() {
        let mut state = test_host_state();
        let number = state.expose(HostValue::from(3.0)).unwrap();
        let err = state.object(number).unwrap_err();
        assert!(err.is_catchable());
        let err = state.function(number).unwrap_err();
        assert_eq!(err.to_string(), "host exception: TypeError: 3 is not a function");

        let plain = state.expose(HostValue::from(ObjectRef::new(ObjectKind::Plain))).unwrap();
        assert!(state.object(plain).is_ok());
        assert!(state.receiver(UNDEFINED_SLOT as i32).unwrap().is_window());
    }

    #[test]
    fn test_pending_exception_replaces_previous() {
        let mut state = test_host_state();
        let first = state.table.allocate(HostValue::from("first")).unwrap();
        let second = state.table.allocate(HostValue::from("second")).unwrap();
        state.set_pending_exception(first);
        state.set_pending_exception(second);
        assert_eq!(state.pending_exception, Some(second));
        assert!(state.table.get(first).is_none());
    }
}
