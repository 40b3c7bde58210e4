//! Event plumbing: listeners, dispatch, event objects.

use tracing::{debug, warn};
use wasmtime::{AsContextMut, Caller, Linker};

use boundary_hostapi::event::EventDetail;
use boundary_hostapi::{Event, HostError, HostValue, ObjectRef};

use super::{expose, guarded, object_arg, return_string, str_arg, MODULE};
use crate::closure;
use crate::error::BridgeError;
use crate::host_impl::HostState;

/// Dispatch `event` at `target`, running listeners along the propagation
/// path. Returns `false` if a listener cancelled the event.
///
/// Each node's listeners are snapshotted before they run. A listener that
/// throws or traps is reported and dispatch continues; any other failure
/// ends the dispatch and propagates.
pub fn dispatch(
    mut store: impl AsContextMut<Data = HostState>,
    target: &ObjectRef,
    event: &ObjectRef,
) -> Result<bool, BridgeError> {
    let mut store = store.as_context_mut();
    let path = event.begin_dispatch(target)?;
    let event_type = event.with_event(|e| e.event_type.clone())?;
    debug!(event_type = %event_type, path = path.len(), "dispatching event");

    let outcome = run_listeners(&mut store, &path, &event_type, event);
    let not_cancelled = event.finish_dispatch()?;
    outcome?;
    Ok(not_cancelled)
}

fn run_listeners(
    mut store: impl AsContextMut<Data = HostState>,
    path: &[ObjectRef],
    event_type: &str,
    event: &ObjectRef,
) -> Result<(), BridgeError> {
    let mut store = store.as_context_mut();
    for node in path {
        event.set_current_target(Some(node))?;
        for listener in node.listeners_for(event_type) {
            let arg = HostValue::from(event.clone());
            match closure::invoke_value(&mut store, &listener, &[arg]) {
                Ok(_) => {}
                Err(err) if err.is_reportable() => {
                    report(store.data_mut(), "event listener", &err);
                }
                Err(err) => return Err(err),
            }
        }
    }
    Ok(())
}

/// Log an error that a listener or task raised without stopping the loop.
pub(crate) fn report(state: &mut HostState, source: &str, err: &BridgeError) {
    match state.thrown.take() {
        Some(value) => warn!(source, exception = %value.debug_string(), "uncaught exception"),
        None => warn!(source, error = %err, "uncaught exception"),
    }
}

fn event_arg(caller: &mut Caller<'_, HostState>, handle: i32) -> Result<ObjectRef, BridgeError> {
    let obj = object_arg(caller, handle)?;
    if !obj.is_event() {
        return Err(HostError::type_error("value is not an Event").into());
    }
    Ok(obj)
}

pub(super) fn register(linker: &mut Linker<HostState>) -> Result<(), BridgeError> {
    register_listeners(linker)?;
    register_constructors(linker)?;
    register_accessors(linker)?;
    Ok(())
}

// ── Listeners ──

fn register_listeners(linker: &mut Linker<HostState>) -> Result<(), BridgeError> {
    // The callback handle is borrowed; the listener list holds its own
    // reference.
    linker.func_wrap(
        MODULE,
        "add_event_listener",
        |mut caller: Caller<'_, HostState>, target: i32, ptr: i32, len: i32, callback: i32| -> anyhow::Result<()> {
            guarded(&mut caller, |caller| {
                let target = object_arg(caller, target)?;
                let event_type = str_arg(caller, ptr, len)?;
                let callback = caller.data().value(callback)?;
                Ok(target.add_event_listener(&event_type, callback)?)
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "remove_event_listener",
        |mut caller: Caller<'_, HostState>, target: i32, ptr: i32, len: i32, callback: i32| -> anyhow::Result<()> {
            guarded(&mut caller, |caller| {
                let target = object_arg(caller, target)?;
                let event_type = str_arg(caller, ptr, len)?;
                let callback = caller.data().value(callback)?;
                target.remove_event_listener(&event_type, &callback);
                Ok(())
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "dispatch_event",
        |mut caller: Caller<'_, HostState>, target: i32, event: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let target = object_arg(caller, target)?;
                let event = event_arg(caller, event)?;
                Ok(dispatch(&mut *caller, &target, &event)? as i32)
            })
        },
    )?;
    Ok(())
}

// ── Constructors ──

fn register_constructors(linker: &mut Linker<HostState>) -> Result<(), BridgeError> {
    linker.func_wrap(
        MODULE,
        "event_new",
        |mut caller: Caller<'_, HostState>, ptr: i32, len: i32, bubbles: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let event_type = str_arg(caller, ptr, len)?;
                let event = Event::new(event_type).with_bubbles(bubbles != 0);
                expose(caller, ObjectRef::new_event(event))
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "keyboard_event_new",
        |mut caller: Caller<'_, HostState>, type_ptr: i32, type_len: i32, key_ptr: i32, key_len: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let event_type = str_arg(caller, type_ptr, type_len)?;
                let key = str_arg(caller, key_ptr, key_len)?;
                expose(caller, ObjectRef::new_event(Event::keyboard(event_type, key)))
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "mouse_event_new",
        |mut caller: Caller<'_, HostState>, ptr: i32, len: i32, client_x: i32, client_y: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let event_type = str_arg(caller, ptr, len)?;
                expose(caller, ObjectRef::new_event(Event::mouse(event_type, client_x, client_y)))
            })
        },
    )?;
    Ok(())
}

// ── Accessors ──

fn register_accessors(linker: &mut Linker<HostState>) -> Result<(), BridgeError> {
    linker.func_wrap(
        MODULE,
        "event_type",
        |mut caller: Caller<'_, HostState>, event: i32, ret_ptr: i32| -> anyhow::Result<()> {
            guarded(&mut caller, |caller| {
                let event_type = event_arg(caller, event)?.with_event(|e| e.event_type.clone())?;
                return_string(caller, ret_ptr, Some(&event_type))
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "key",
        |mut caller: Caller<'_, HostState>, event: i32, ret_ptr: i32| -> anyhow::Result<()> {
            guarded(&mut caller, |caller| {
                let key = event_arg(caller, event)?.with_event(|e| match &e.detail {
                    EventDetail::Keyboard { key } => Ok(key.clone()),
                    _ => Err(HostError::type_error("value is not a KeyboardEvent")),
                })??;
                return_string(caller, ret_ptr, Some(&key))
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "client_x",
        |mut caller: Caller<'_, HostState>, event: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| Ok(mouse_position(caller, event)?.0))
        },
    )?;

    linker.func_wrap(
        MODULE,
        "client_y",
        |mut caller: Caller<'_, HostState>, event: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| Ok(mouse_position(caller, event)?.1))
        },
    )?;

    linker.func_wrap(
        MODULE,
        "prevent_default",
        |mut caller: Caller<'_, HostState>, event: i32| -> anyhow::Result<()> {
            guarded(&mut caller, |caller| Ok(event_arg(caller, event)?.prevent_default()?))
        },
    )?;

    linker.func_wrap(
        MODULE,
        "default_prevented",
        |mut caller: Caller<'_, HostState>, event: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let prevented = event_arg(caller, event)?.with_event(|e| e.default_prevented)?;
                Ok(prevented as i32)
            })
        },
    )?;
    Ok(())
}

fn mouse_position(caller: &mut Caller<'_, HostState>, event: i32) -> Result<(i32, i32), BridgeError> {
    let position = event_arg(caller, event)?.with_event(|e| match e.detail {
        EventDetail::Mouse { client_x, client_y } => Ok((client_x, client_y)),
        _ => Err(HostError::type_error("value is not a MouseEvent")),
    })??;
    Ok(position)
}
