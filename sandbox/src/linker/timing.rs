//! Timers, animation frames, idle callbacks, microtasks and promises.
//!
//! Scheduling stores a clone of the callback in the event loop; the
//! sandbox keeps its own handle. Cancelling only unschedules.

use wasmtime::{Caller, Linker};

use boundary_hostapi::{promise, Closure, HostError, HostFeature, HostValue};

use super::{guarded, object_arg, MODULE};
use crate::error::BridgeError;
use crate::host_impl::HostState;

fn callback_arg(caller: &mut Caller<'_, HostState>, handle: i32) -> Result<HostValue, BridgeError> {
    let closure: Closure = caller.data().function(handle)?;
    Ok(HostValue::Function(closure))
}

fn require(caller: &Caller<'_, HostState>, feature: HostFeature) -> Result<(), BridgeError> {
    if caller.data().env.supports(feature) {
        Ok(())
    } else {
        Err(BridgeError::UnsupportedHostFeature(feature.name()))
    }
}

/// Schedule a timer on the receiver's event loop.
fn schedule(
    caller: &mut Caller<'_, HostState>,
    receiver: Option<i32>,
    callback: i32,
    delay: i32,
    repeat: bool,
) -> Result<i32, BridgeError> {
    if let Some(receiver) = receiver {
        caller.data().receiver(receiver)?;
    }
    let callback = callback_arg(caller, callback)?;
    let delay = delay.max(0) as f64;
    let event_loop = caller.data_mut().env.event_loop_mut();
    let id = if repeat {
        event_loop.set_interval(callback, delay)
    } else {
        event_loop.set_timeout(callback, delay)
    };
    Ok(id as i32)
}

pub(super) fn register(linker: &mut Linker<HostState>) -> Result<(), BridgeError> {
    register_timers(linker)?;
    register_frames(linker)?;
    register_idle(linker)?;
    register_microtasks(linker)?;
    register_promises(linker)?;
    Ok(())
}

// ── Timers ──

fn register_timers(linker: &mut Linker<HostState>) -> Result<(), BridgeError> {
    linker.func_wrap(
        MODULE,
        "set_timeout",
        |mut caller: Caller<'_, HostState>, window: i32, callback: i32, delay: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| schedule(caller, Some(window), callback, delay, false))
        },
    )?;

    linker.func_wrap(
        MODULE,
        "set_timeout_global",
        |mut caller: Caller<'_, HostState>, callback: i32, delay: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| schedule(caller, None, callback, delay, false))
        },
    )?;

    linker.func_wrap(
        MODULE,
        "set_interval",
        |mut caller: Caller<'_, HostState>, window: i32, callback: i32, delay: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| schedule(caller, Some(window), callback, delay, true))
        },
    )?;

    for name in ["clear_timeout", "clear_interval"] {
        linker.func_wrap(
            MODULE,
            name,
            |mut caller: Caller<'_, HostState>, window: i32, id: i32| -> anyhow::Result<()> {
                guarded(&mut caller, |caller| {
                    caller.data().receiver(window)?;
                    caller.data_mut().env.event_loop_mut().clear_timer(id as u32);
                    Ok(())
                })
            },
        )?;
    }

    linker.func_wrap(
        MODULE,
        "clear_timeout_global",
        |mut caller: Caller<'_, HostState>, id: i32| {
            caller.data_mut().env.event_loop_mut().clear_timer(id as u32);
        },
    )?;
    Ok(())
}

// ── Animation frames ──

fn register_frames(linker: &mut Linker<HostState>) -> Result<(), BridgeError> {
    linker.func_wrap(
        MODULE,
        "request_animation_frame",
        |mut caller: Caller<'_, HostState>, window: i32, callback: i32| -> anyhow::Result<i32> {
            require(&caller, HostFeature::AnimationFrame)?;
            guarded(&mut caller, |caller| {
                caller.data().receiver(window)?;
                let callback = callback_arg(caller, callback)?;
                Ok(caller.data_mut().env.event_loop_mut().request_animation_frame(callback) as i32)
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "cancel_animation_frame",
        |mut caller: Caller<'_, HostState>, window: i32, id: i32| -> anyhow::Result<()> {
            require(&caller, HostFeature::AnimationFrame)?;
            guarded(&mut caller, |caller| {
                caller.data().receiver(window)?;
                caller.data_mut().env.event_loop_mut().cancel_animation_frame(id as u32);
                Ok(())
            })
        },
    )?;
    Ok(())
}

// ── Idle callbacks ──

fn register_idle(linker: &mut Linker<HostState>) -> Result<(), BridgeError> {
    linker.func_wrap(
        MODULE,
        "request_idle_callback",
        |mut caller: Caller<'_, HostState>, window: i32, callback: i32| -> anyhow::Result<i32> {
            require(&caller, HostFeature::IdleCallback)?;
            guarded(&mut caller, |caller| {
                caller.data().receiver(window)?;
                let callback = callback_arg(caller, callback)?;
                Ok(caller.data_mut().env.event_loop_mut().request_idle_callback(callback) as i32)
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "cancel_idle_callback",
        |mut caller: Caller<'_, HostState>, window: i32, id: i32| -> anyhow::Result<()> {
            require(&caller, HostFeature::IdleCallback)?;
            guarded(&mut caller, |caller| {
                caller.data().receiver(window)?;
                caller.data_mut().env.event_loop_mut().cancel_idle_callback(id as u32);
                Ok(())
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "did_timeout",
        |mut caller: Caller<'_, HostState>, deadline: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let deadline = object_arg(caller, deadline)?
                    .idle_deadline()
                    .ok_or_else(|| HostError::type_error("value is not an IdleDeadline"))?;
                Ok(deadline.did_timeout as i32)
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "time_remaining",
        |mut caller: Caller<'_, HostState>, deadline: i32| -> anyhow::Result<f64> {
            guarded(&mut caller, |caller| {
                let deadline = object_arg(caller, deadline)?
                    .idle_deadline()
                    .ok_or_else(|| HostError::type_error("value is not an IdleDeadline"))?;
                Ok(deadline.time_remaining)
            })
        },
    )?;
    Ok(())
}

// ── Microtasks ──

fn register_microtasks(linker: &mut Linker<HostState>) -> Result<(), BridgeError> {
    linker.func_wrap(
        MODULE,
        "queue_microtask",
        |mut caller: Caller<'_, HostState>, callback: i32| -> anyhow::Result<()> {
            guarded(&mut caller, |caller| {
                let callback = callback_arg(caller, callback)?;
                caller.data_mut().env.event_loop_mut().queue_microtask(callback);
                Ok(())
            })
        },
    )?;

    linker.func_wrap(
        MODULE,
        "queue_microtask_on",
        |mut caller: Caller<'_, HostState>, window: i32, callback: i32| -> anyhow::Result<()> {
            guarded(&mut caller, |caller| {
                caller.data().receiver(window)?;
                let callback = callback_arg(caller, callback)?;
                caller.data_mut().env.event_loop_mut().queue_microtask(callback);
                Ok(())
            })
        },
    )?;
    Ok(())
}

// ── Promises ──

fn register_promises(linker: &mut Linker<HostState>) -> Result<(), BridgeError> {
    linker.func_wrap(
        MODULE,
        "promise_resolve",
        |mut caller: Caller<'_, HostState>, value: i32| -> anyhow::Result<i32> {
            let state = caller.data_mut();
            let value = state.value(value)?;
            let promise = promise::promise_resolve(value, state.env.event_loop_mut());
            Ok(state.expose(HostValue::from(promise))?)
        },
    )?;

    linker.func_wrap(
        MODULE,
        "promise_then",
        |mut caller: Caller<'_, HostState>, promise: i32, callback: i32| -> anyhow::Result<i32> {
            guarded(&mut caller, |caller| {
                let source = object_arg(caller, promise)?;
                let state = caller.data_mut();
                let callback = state.value(callback)?;
                let derived = promise::then(&source, callback, state.env.event_loop_mut())?;
                state.expose(HostValue::from(derived))
            })
        },
    )?;
    Ok(())
}
