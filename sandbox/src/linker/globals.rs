//! Global and environment accessors.
//!
//! The four global accessors all return the handle pinned at
//! instantiation, so the sandbox sees one canonical global object.

use wasmtime::{Caller, Linker};

use boundary_hostapi::{dom, HostFeature};

use super::{expose, object_arg, MODULE};
use crate::error::BridgeError;
use crate::host_impl::HostState;

const GLOBAL_ACCESSORS: &[&str] = &["global_self", "global_window", "global_global", "global_this"];

pub(super) fn register(linker: &mut Linker<HostState>) -> Result<(), BridgeError> {
    for &name in GLOBAL_ACCESSORS {
        linker.func_wrap(MODULE, name, |caller: Caller<'_, HostState>| -> i32 {
            caller.data().global_slot as i32
        })?;
    }

    // The handles below are `undefined` (0) when the host lacks the object.

    linker.func_wrap(
        MODULE,
        "document",
        |mut caller: Caller<'_, HostState>, _window: i32| -> anyhow::Result<i32> {
            let document = caller.data().env.document();
            Ok(expose(&mut caller, document)?)
        },
    )?;

    linker.func_wrap(
        MODULE,
        "body",
        |mut caller: Caller<'_, HostState>, document: i32| -> anyhow::Result<i32> {
            let document = object_arg(&mut caller, document)?;
            Ok(expose(&mut caller, dom::body(&document))?)
        },
    )?;

    linker.func_wrap(
        MODULE,
        "head",
        |mut caller: Caller<'_, HostState>, document: i32| -> anyhow::Result<i32> {
            let document = object_arg(&mut caller, document)?;
            Ok(expose(&mut caller, dom::head(&document))?)
        },
    )?;

    linker.func_wrap(
        MODULE,
        "performance",
        |mut caller: Caller<'_, HostState>, _window: i32| -> anyhow::Result<i32> {
            let performance = caller.data().env.performance();
            Ok(expose(&mut caller, performance)?)
        },
    )?;

    linker.func_wrap(
        MODULE,
        "now",
        |caller: Caller<'_, HostState>, _performance: i32| -> anyhow::Result<f64> {
            let env = &caller.data().env;
            if !env.supports(HostFeature::Performance) {
                return Err(BridgeError::UnsupportedHostFeature(HostFeature::Performance.name()).into());
            }
            Ok(env.now())
        },
    )?;
    Ok(())
}
