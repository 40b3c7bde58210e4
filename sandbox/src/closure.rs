//! Closure bridge: calling sandbox callbacks from the host.
//!
//! The lifetime bookkeeping lives in [`boundary_hostapi::Closure`]; this
//! module performs the calls it asks for. Every invocation that starts is
//! ended, whatever the guest does, and the destructor it releases runs
//! before the result is returned.

use tracing::{debug, trace, warn};
use wasmtime::AsContextMut;

use boundary_hostapi::ref_table::UNDEFINED_SLOT;
use boundary_hostapi::{Closure, ClosureKind, Destructor, HostError, HostValue};

use crate::error::BridgeError;
use crate::exports::{self, Trampoline};
use crate::host_impl::HostState;

/// Wrap a sandbox callback and hand its handle to the sandbox.
///
/// The destructor and invoke entry points must both be exported.
pub fn create(
    state: &mut HostState,
    kind: ClosureKind,
    context: u32,
    data: u32,
    dtor: u32,
    invoke: u32,
) -> Result<i32, BridgeError> {
    let exports = state.exports()?;
    exports.destructor(dtor)?;
    exports.trampoline(invoke)?;
    let closure = Closure::new(kind, context, data, dtor, invoke, &state.finalizers)?;
    state.expose(HostValue::Function(closure))
}

/// Call `callback` with `args`. Anything other than a function is a
/// `TypeError`.
pub fn invoke_value(
    store: impl AsContextMut<Data = HostState>,
    callback: &HostValue,
    args: &[HostValue],
) -> Result<HostValue, BridgeError> {
    match callback {
        HostValue::Function(closure) => invoke(store, closure, args),
        other => Err(HostError::type_error(format!(
            "{} is not a function",
            other.debug_string()
        ))
        .into()),
    }
}

/// Invoke a closure.
///
/// Argument handles are owned by the trampoline; missing arguments are
/// `undefined` and extra ones are not passed. A returned handle is taken.
pub fn invoke(
    mut store: impl AsContextMut<Data = HostState>,
    closure: &Closure,
    args: &[HostValue],
) -> Result<HostValue, BridgeError> {
    let mut store = store.as_context_mut();
    let trampoline = store.data().exports()?.trampoline(closure.invoke_slot())?;

    let Some(invocation) = closure.begin_invoke() else {
        store.data_mut().stats.refused += 1;
        debug!(invoke = closure.invoke_slot(), "closure invocation refused");
        return Err(BridgeError::InertClosure);
    };
    store.data_mut().stats.invocations += 1;

    let outcome = call(
        &mut store,
        &trampoline,
        invocation.context,
        invocation.data,
        args,
    );

    match closure.end_invoke(&invocation) {
        Some(dtor) => {
            let released = run_destructor(&mut store, dtor);
            let value = outcome?;
            released?;
            Ok(value)
        }
        None => outcome,
    }
}

fn call(
    mut store: impl AsContextMut<Data = HostState>,
    trampoline: &Trampoline,
    context: u32,
    data: u32,
    args: &[HostValue],
) -> Result<HostValue, BridgeError> {
    let mut store = store.as_context_mut();
    let mut params = Vec::with_capacity(trampoline.arity + 2);
    params.push(context as i32);
    params.push(data as i32);
    for index in 0..trampoline.arity {
        let handle = match args.get(index) {
            Some(arg) => match store.data_mut().expose(arg.clone()) {
                Ok(handle) => handle,
                Err(err) => {
                    for handle in &params[2..] {
                        let _ = store.data_mut().drop_handle(*handle);
                    }
                    return Err(err);
                }
            },
            None => UNDEFINED_SLOT as i32,
        };
        params.push(handle);
    }

    match exports::call_trampoline(&mut store, trampoline, &params)? {
        Some(handle) => store.data_mut().take(handle),
        None => Ok(HostValue::Undefined),
    }
}

/// Run `__boundary_dtor_<slot>(context, data)`.
pub fn run_destructor(
    mut store: impl AsContextMut<Data = HostState>,
    dtor: Destructor,
) -> Result<(), BridgeError> {
    let mut store = store.as_context_mut();
    let func = store.data().exports()?.destructor(dtor.slot)?;
    trace!(dtor = dtor.slot, context = dtor.context, data = dtor.data, "running closure destructor");
    func.call(&mut store, (dtor.context as i32, dtor.data as i32))
        .map_err(BridgeError::from_trap)?;
    let state = store.data_mut();
    state.view.invalidate();
    state.stats.destructors_run += 1;
    Ok(())
}

/// Run destructors for closures the host let go of while still active.
/// Destructors may release more closures; the queue is drained until empty.
///
/// A failing destructor does not stop the drain: every queued record is
/// run, and the first error is returned afterwards.
pub fn drain_finalizers(mut store: impl AsContextMut<Data = HostState>) -> Result<usize, BridgeError> {
    let mut store = store.as_context_mut();
    let mut total = 0;
    let mut first_error = None;
    loop {
        let pending = store.data().finalizers.drain();
        if pending.is_empty() {
            break;
        }
        for dtor in pending {
            match run_destructor(&mut store, dtor) {
                Ok(()) => {
                    store.data_mut().stats.finalized += 1;
                    total += 1;
                }
                Err(err) => {
                    warn!(dtor = dtor.slot, context = dtor.context, error = %err, "closure destructor failed");
                    first_error.get_or_insert(err);
                }
            }
        }
    }
    if total > 0 {
        debug!(count = total, "finalized closures");
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(total),
    }
}
