//! Host function registration via Wasmtime linker.
//!
//! Registers every `boundary` import with the Wasmtime `Linker`. Each
//! function:
//! 1. Resolves handle arguments against the reference table
//! 2. Decodes string arguments from linear memory (or a table slot)
//! 3. Performs the host operation
//! 4. Hands results back as new handles or through a return area
//!
//! Guarded imports capture host exceptions into the reference table and
//! return zero; everything else (bad pointers, bad handles, missing
//! exports, unsupported features) traps.

mod dom;
mod events;
mod globals;
mod timing;
mod values;

pub use events::dispatch;
pub(crate) use events::report;

use tracing::debug;
use wasmtime::{AsContextMut, Caller, Extern, Linker, Memory};

use boundary_hostapi::{HostValue, ObjectRef};

use crate::codec::{self, StringArg};
use crate::error::BridgeError;
use crate::exports::{StoreAllocator, MEMORY_EXPORT};
use crate::host_impl::HostState;
use crate::memory;

/// The import module every boundary function lives in.
pub const MODULE: &str = "boundary";

/// Register all `boundary` functions with the linker.
pub fn register_imports(linker: &mut Linker<HostState>) -> Result<(), BridgeError> {
    values::register(linker)?;
    globals::register(linker)?;
    dom::register(linker)?;
    events::register(linker)?;
    timing::register(linker)?;
    Ok(())
}

/// Run `f`, turning catchable errors into a sandbox exception.
///
/// The exception value goes to `__boundary_exn_store` when the guest exports
/// it, otherwise it waits for `exception_take`. The import then returns
/// `R::default()`.
pub(crate) fn guarded<'c, R, F>(caller: &mut Caller<'c, HostState>, f: F) -> anyhow::Result<R>
where
    R: Default,
    F: FnOnce(&mut Caller<'c, HostState>) -> Result<R, BridgeError>,
{
    match f(caller) {
        Ok(value) => Ok(value),
        Err(err) if err.is_catchable() => {
            capture(caller, err)?;
            Ok(R::default())
        }
        Err(err) => Err(err.into()),
    }
}

fn capture(caller: &mut Caller<'_, HostState>, err: BridgeError) -> Result<(), BridgeError> {
    let thrown = match &err {
        BridgeError::GuestThrow(_) => caller.data_mut().thrown.take(),
        _ => None,
    };
    let value = thrown.unwrap_or_else(|| err.exception_value());
    debug!(error = %err, "host exception captured");

    let state = caller.data_mut();
    let slot = state.table.allocate(value)?;
    let exn_store = state.exports()?.exn_store.clone();
    match exn_store {
        Some(exn_store) => {
            exn_store
                .call(&mut *caller, slot as i32)
                .map_err(BridgeError::from_trap)?;
            caller.data_mut().view.invalidate();
        }
        None => state.set_pending_exception(slot),
    }
    Ok(())
}

// ── Argument helpers ──

/// Get the guest's exported memory from a Caller.
pub(crate) fn get_memory(caller: &mut Caller<'_, HostState>) -> Result<Memory, BridgeError> {
    caller
        .get_export(MEMORY_EXPORT)
        .and_then(Extern::into_memory)
        .ok_or_else(|| BridgeError::MissingExport(MEMORY_EXPORT.to_string()))
}

/// Decode a string argument that must be text.
pub(crate) fn str_arg(caller: &mut Caller<'_, HostState>, ptr: i32, len: i32) -> Result<String, BridgeError> {
    let mem = get_memory(caller)?;
    let (bytes, state) = memory::view_mut(&mem, caller.as_context_mut());
    codec::decode_str_arg(bytes, &state.table, StringArg::from_abi(ptr, len))
}

/// Decode an optional string argument; the `undefined`/`null` slots are
/// absent.
pub(crate) fn opt_str_arg(
    caller: &mut Caller<'_, HostState>,
    ptr: i32,
    len: i32,
) -> Result<Option<String>, BridgeError> {
    let mem = get_memory(caller)?;
    let (bytes, state) = memory::view_mut(&mem, caller.as_context_mut());
    codec::decode_opt_str_arg(bytes, &state.table, StringArg::from_abi(ptr, len))
}

/// Decode a string argument to a value: text from memory, or any value from
/// a table slot.
pub(crate) fn value_arg(caller: &mut Caller<'_, HostState>, ptr: i32, len: i32) -> Result<HostValue, BridgeError> {
    let mem = get_memory(caller)?;
    let (bytes, state) = memory::view_mut(&mem, caller.as_context_mut());
    codec::decode_string_or_slot(bytes, &state.table, StringArg::from_abi(ptr, len))
}

pub(crate) fn object_arg(caller: &mut Caller<'_, HostState>, handle: i32) -> Result<ObjectRef, BridgeError> {
    caller.data().object(handle)
}

pub(crate) fn expose(caller: &mut Caller<'_, HostState>, value: impl Into<HostValue>) -> Result<i32, BridgeError> {
    caller.data_mut().expose(value.into())
}

// ── Return helpers ──

/// Encode `value` into guest memory and write the `(ptr, len)` return area.
/// `None` writes `(0, 0)`.
pub(crate) fn return_string(
    caller: &mut Caller<'_, HostState>,
    ret_ptr: i32,
    value: Option<&str>,
) -> Result<(), BridgeError> {
    let mem = get_memory(caller)?;
    let encoded = match value {
        Some(s) => {
            let mut alloc = StoreAllocator::new(&mut *caller, mem)?;
            Some(codec::encode_string(s, &mut alloc)?)
        }
        None => None,
    };
    let (bytes, _) = memory::view_mut(&mem, caller.as_context_mut());
    codec::write_string_ret(bytes, ret_ptr as u32, encoded)
}

pub(crate) fn return_option_f64(
    caller: &mut Caller<'_, HostState>,
    ret_ptr: i32,
    value: Option<f64>,
) -> Result<(), BridgeError> {
    let mem = get_memory(caller)?;
    let (bytes, _) = memory::view_mut(&mem, caller.as_context_mut());
    codec::write_option_f64(bytes, ret_ptr as u32, value)
}
