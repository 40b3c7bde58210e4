//! Value inspection and construction, exceptions, closures.

use tracing::trace;
use wasmtime::{Caller, Linker};

use boundary_hostapi::ref_table::UNDEFINED_SLOT;
use boundary_hostapi::{ClosureKind, DropOutcome, HostError, HostKind, HostValue, ObjectKind, ObjectRef};

use super::{expose, guarded, object_arg, return_option_f64, return_string, str_arg, value_arg, MODULE};
use crate::closure;
use crate::error::BridgeError;
use crate::host_impl::HostState;

pub(super) fn register(linker: &mut Linker<HostState>) -> Result<(), BridgeError> {
    register_handles(linker)?;
    register_primitives(linker)?;
    register_objects(linker)?;
    register_exceptions(linker)?;
    register_closures(linker)?;
    Ok(())
}

// ── Handles ──

fn register_handles(linker: &mut Linker<HostState>) -> Result<(), BridgeError> {
    linker.func_wrap(
        MODULE,
        "ref_drop",
        |mut caller: Caller<'_, HostState>, handle: i32| -> anyhow::Result<()> {
            Ok(caller.data_mut().drop_handle(handle)?)
        },
    )?;

    linker.func_wrap(
        MODULE,
        "ref_clone",
        |mut caller: Caller<'_, HostState>, handle: i32| -> anyhow::Result<i32> {
            let state = caller.data_mut();
            let value = state.value(handle)?;
            Ok(state.expose(value)?)
        },
    )?;
    Ok(())
}

// ── Primitives ──

fn register_primitives(linker: &mut Linker<HostState>) -> Result<(), BridgeError> {
    linker.func_wrap(
        MODULE,
        "string_new",
        |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let value = value_arg(caller, ptr, len)?;
                expose(caller, value)
            })
        },
    )?;

    // Non-strings read as absent.
    linker.func_wrap(
        MODULE,
        "string_get",
        |mut caller: Caller<'_, HostState>, handle: i32, ret_ptr: i32| -> anyhow::Result<()> {
            let value = caller.data().value(handle)?;
            Ok(return_string(&mut caller, ret_ptr, value.as_str())?)
        },
    )?;

    linker.func_wrap(
        MODULE,
        "number_new",
        |mut caller: Caller<'_, HostState>, n: f64| -> anyhow::Result<i32> {
            Ok(expose(&mut caller, n)?)
        },
    )?;

    linker.func_wrap(
        MODULE,
        "number_get",
        |mut caller: Caller<'_, HostState>, handle: i32, ret_ptr: i32| -> anyhow::Result<()> {
            let value = caller.data().value(handle)?;
            Ok(return_option_f64(&mut caller, ret_ptr, value.as_number())?)
        },
    )?;

    // 1 = true, 0 = false, 2 = not a boolean.
    linker.func_wrap(
        MODULE,
        "boolean_get",
        |caller: Caller<'_, HostState>, handle: i32| -> anyhow::Result<i32> {
            Ok(match caller.data().value(handle)?.as_bool() {
                Some(b) => b as i32,
                None => 2,
            })
        },
    )?;

    register_predicate(linker, "is_undefined", HostValue::is_undefined)?;
    register_predicate(linker, "is_null", HostValue::is_null)?;
    register_predicate(linker, "is_function", HostValue::is_function)?;
    register_predicate(linker, "is_object", |v| v.is_object() && !v.is_function())?;
    register_predicate(linker, "is_string", |v| v.as_str().is_some())?;

    linker.func_wrap(
        MODULE,
        "object_is",
        |caller: Caller<'_, HostState>, a: i32, b: i32| -> anyhow::Result<i32> {
            let state = caller.data();
            Ok(state.value(a)?.same_value(&state.value(b)?) as i32)
        },
    )?;

    linker.func_wrap(
        MODULE,
        "debug_string",
        |mut caller: Caller<'_, HostState>, handle: i32, ret_ptr: i32| -> anyhow::Result<()> {
            let text = caller.data().value(handle)?.debug_string();
            Ok(return_string(&mut caller, ret_ptr, Some(&text))?)
        },
    )?;

    linker.func_wrap(
        MODULE,
        "instance_of",
        |mut caller: Caller<'_, HostState>, handle: i32, kind: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let kind = HostKind::from_i32(kind)
                    .ok_or_else(|| HostError::type_error(format!("unknown host kind {}", kind)))?;
                Ok(kind.matches(&caller.data().value(handle)?) as i32)
            })
        },
    )?;
    Ok(())
}

fn register_predicate(
    linker: &mut Linker<HostState>,
    name: &'static str,
    predicate: fn(&HostValue) -> bool,
) -> Result<(), BridgeError> {
    linker.func_wrap(
        MODULE,
        name,
        move |caller: Caller<'_, HostState>, handle: i32| -> anyhow::Result<i32> {
            Ok(predicate(&caller.data().value(handle)?) as i32)
        },
    )?;
    Ok(())
}

// ── Objects ──

fn register_objects(linker: &mut Linker<HostState>) -> Result<(), BridgeError> {
    linker.func_wrap(
        MODULE,
        "object_new",
        |mut caller: Caller<'_, HostState>| -> anyhow::Result<i32> {
            Ok(expose(&mut caller, ObjectRef::new(ObjectKind::Plain))?)
        },
    )?;

    linker.func_wrap(
        MODULE,
        "get_property",
        |mut caller: Caller<'_, HostState>, obj: i32, key_ptr: i32, key_len: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let obj = object_arg(caller, obj)?;
                let key = str_arg(caller, key_ptr, key_len)?;
                expose(caller, obj.property(&key))
            })
        },
    )?;

    // The value handle is borrowed; the sandbox keeps its own.
    linker.func_wrap(
        MODULE,
        "set_property",
        |mut caller: Caller<'_, HostState>, obj: i32, key_ptr: i32, key_len: i32, value: i32| -> anyhow::Result<()> {
            guarded(&mut caller, |caller| {
                let obj = object_arg(caller, obj)?;
                let key = str_arg(caller, key_ptr, key_len)?;
                let value = caller.data().value(value)?;
                obj.set_property(&key, value);
                Ok(())
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "get_index",
        |mut caller: Caller<'_, HostState>, obj: i32, index: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let obj = object_arg(caller, obj)?;
                let value = obj.property(&(index as u32).to_string());
                expose(caller, value)
            })
        },
    )?;

    // `Function.prototype.call(this, arg)`. Sandbox closures do not observe
    // `this`.
    linker.func_wrap(
        MODULE,
        "call",
        |mut caller: Caller<'_, HostState>, func: i32, this: i32, arg: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let state = caller.data();
                let func = state.function(func)?;
                state.value(this)?;
                let arg = state.value(arg)?;
                let result = closure::invoke(&mut *caller, &func, &[arg])?;
                expose(caller, result)
            })
        },
    )?;
    Ok(())
}

// ── Exceptions ──

fn register_exceptions(linker: &mut Linker<HostState>) -> Result<(), BridgeError> {
    // Throws an Error with the given message, or rethrows the value of a
    // slot, unwinding to the nearest guarded import or to the host.
    linker.func_wrap(
        MODULE,
        "throw",
        |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| -> anyhow::Result<()> {
            let value = match value_arg(&mut caller, ptr, len)? {
                HostValue::String(message) => HostError::error(message.to_string()).to_value(),
                other => other,
            };
            let message = value.debug_string();
            caller.data_mut().thrown = Some(value);
            Err(BridgeError::GuestThrow(message).into())
        },
    )?;

    linker.func_wrap(
        MODULE,
        "exception_take",
        |mut caller: Caller<'_, HostState>| -> i32 {
            caller
                .data_mut()
                .pending_exception
                .take()
                .unwrap_or(UNDEFINED_SLOT) as i32
        },
    )?;
    Ok(())
}

// ── Closures ──

fn register_closures(linker: &mut Linker<HostState>) -> Result<(), BridgeError> {
    register_closure_new(linker, "closure_new", ClosureKind::Shared)?;
    register_closure_new(linker, "closure_new_mut", ClosureKind::Mutable)?;

    // 1 if this drop released the last hold; the sandbox then frees its
    // side. 0 while an invocation still runs.
    linker.func_wrap(
        MODULE,
        "cb_drop",
        |mut caller: Caller<'_, HostState>, handle: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let state = caller.data_mut();
                let closure = state.function(handle)?;
                state.take(handle)?;
                let outcome = closure.release();
                trace!(handle, ?outcome, "cb_drop");
                Ok((outcome == DropOutcome::Released) as i32)
            })
        },
    )?;
    Ok(())
}

fn register_closure_new(
    linker: &mut Linker<HostState>,
    name: &'static str,
    kind: ClosureKind,
) -> Result<(), BridgeError> {
    linker.func_wrap(
        MODULE,
        name,
        move |mut caller: Caller<'_, HostState>, context: i32, data: i32, dtor: i32, invoke: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                closure::create(
                    caller.data_mut(),
                    kind,
                    context as u32,
                    data as u32,
                    dtor as u32,
                    invoke as u32,
                )
            })
        },
    )?;
    Ok(())
}
