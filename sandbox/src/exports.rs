//! Guest exports the bridge calls into.
//!
//! Resolved once after instantiation. Destructor and invoke entry points
//! are numbered: `__boundary_dtor_<n>` and `__boundary_invoke_<n>`, and a
//! closure refers to them by `n`.

use std::collections::HashMap;

use tracing::debug;
use wasmtime::{AsContextMut, Func, Instance, Memory, TypedFunc, Val, ValType};

use crate::codec::GuestAllocator;
use crate::error::BridgeError;
use crate::host_impl::HostState;
use crate::memory;

pub const MEMORY_EXPORT: &str = "memory";
pub const START_EXPORT: &str = "start";
pub const MALLOC_EXPORT: &str = "__boundary_malloc";
pub const REALLOC_EXPORT: &str = "__boundary_realloc";
pub const EXN_STORE_EXPORT: &str = "__boundary_exn_store";
pub const DTOR_PREFIX: &str = "__boundary_dtor_";
pub const INVOKE_PREFIX: &str = "__boundary_invoke_";

/// Parse the index of a numbered export (`<prefix><n>`).
pub fn numbered(name: &str, prefix: &str) -> Option<u32> {
    let digits = name.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// A closure invoke entry point: `(context, data, arg handles…) -> () | handle`.
#[derive(Clone)]
pub struct Trampoline {
    pub func: Func,
    /// Number of argument handles after `(context, data)`.
    pub arity: usize,
    pub returns_value: bool,
}

#[derive(Clone)]
pub struct GuestExports {
    pub start: TypedFunc<(), ()>,
    pub malloc: TypedFunc<(i32, i32), i32>,
    pub realloc: Option<TypedFunc<(i32, i32, i32, i32), i32>>,
    pub exn_store: Option<TypedFunc<i32, ()>>,
    destructors: HashMap<u32, TypedFunc<(i32, i32), ()>>,
    trampolines: HashMap<u32, Trampoline>,
}

impl GuestExports {
    /// Look up every export the bridge uses.
    pub fn resolve(
        mut store: impl AsContextMut<Data = HostState>,
        instance: &Instance,
    ) -> Result<Self, BridgeError> {
        let mut store = store.as_context_mut();
        let start = instance.get_typed_func::<(), ()>(&mut store, START_EXPORT)?;
        let malloc = instance.get_typed_func::<(i32, i32), i32>(&mut store, MALLOC_EXPORT)?;
        let realloc = match instance.get_func(&mut store, REALLOC_EXPORT) {
            Some(func) => Some(func.typed::<(i32, i32, i32, i32), i32>(&store)?),
            None => None,
        };
        let exn_store = match instance.get_func(&mut store, EXN_STORE_EXPORT) {
            Some(func) => Some(func.typed::<i32, ()>(&store)?),
            None => None,
        };

        let names: Vec<String> = instance
            .exports(&mut store)
            .map(|export| export.name().to_string())
            .collect();

        let mut destructors = HashMap::new();
        let mut trampolines = HashMap::new();
        for name in names {
            if let Some(n) = numbered(&name, DTOR_PREFIX) {
                let dtor = instance.get_typed_func::<(i32, i32), ()>(&mut store, &name)?;
                destructors.insert(n, dtor);
            } else if let Some(n) = numbered(&name, INVOKE_PREFIX) {
                let func = instance
                    .get_func(&mut store, &name)
                    .ok_or_else(|| BridgeError::MissingExport(name.clone()))?;
                let ty = func.ty(&store);
                let params: Vec<ValType> = ty.params().collect();
                let results: Vec<ValType> = ty.results().collect();
                if params.len() < 2 || results.len() > 1 {
                    return Err(BridgeError::Validation(format!(
                        "export '{}' must take (context, data, args…) and return at most one handle",
                        name
                    )));
                }
                trampolines.insert(
                    n,
                    Trampoline {
                        func,
                        arity: params.len() - 2,
                        returns_value: results.len() == 1,
                    },
                );
            }
        }
        debug!(
            destructors = destructors.len(),
            trampolines = trampolines.len(),
            realloc = realloc.is_some(),
            exn_store = exn_store.is_some(),
            "guest exports resolved"
        );

        Ok(Self {
            start,
            malloc,
            realloc,
            exn_store,
            destructors,
            trampolines,
        })
    }

    pub fn destructor(&self, slot: u32) -> Result<TypedFunc<(i32, i32), ()>, BridgeError> {
        self.destructors
            .get(&slot)
            .cloned()
            .ok_or_else(|| BridgeError::MissingExport(format!("{}{}", DTOR_PREFIX, slot)))
    }

    pub fn trampoline(&self, slot: u32) -> Result<Trampoline, BridgeError> {
        self.trampolines
            .get(&slot)
            .cloned()
            .ok_or_else(|| BridgeError::MissingExport(format!("{}{}", INVOKE_PREFIX, slot)))
    }
}

/// Call a trampoline with raw i32 parameters.
pub(crate) fn call_trampoline(
    mut store: impl AsContextMut<Data = HostState>,
    trampoline: &Trampoline,
    params: &[i32],
) -> Result<Option<i32>, BridgeError> {
    let params: Vec<Val> = params.iter().map(|p| Val::I32(*p)).collect();
    let mut results = vec![Val::I32(0); trampoline.returns_value as usize];
    trampoline
        .func
        .call(&mut store, &params, &mut results)
        .map_err(BridgeError::from_trap)?;
    store.as_context_mut().data_mut().view.invalidate();
    Ok(results.first().and_then(Val::i32))
}

/// [`GuestAllocator`] backed by the guest's exported allocator.
pub struct StoreAllocator<S> {
    store: S,
    memory: Memory,
    malloc: TypedFunc<(i32, i32), i32>,
    realloc: Option<TypedFunc<(i32, i32, i32, i32), i32>>,
}

impl<S: AsContextMut<Data = HostState>> StoreAllocator<S> {
    pub fn new(mut store: S, memory: Memory) -> Result<Self, BridgeError> {
        let exports = store.as_context_mut().data().exports()?;
        Ok(Self {
            store,
            memory,
            malloc: exports.malloc.clone(),
            realloc: exports.realloc.clone(),
        })
    }

    fn after_call(&mut self, ptr: i32, size: u32) -> Result<u32, BridgeError> {
        self.store.as_context_mut().data_mut().view.invalidate();
        if ptr == 0 && size > 0 {
            return Err(BridgeError::GuestTrapped(format!(
                "guest allocator failed to provide {} bytes",
                size
            )));
        }
        Ok(ptr as u32)
    }
}

impl<S: AsContextMut<Data = HostState>> GuestAllocator for StoreAllocator<S> {
    fn malloc(&mut self, size: u32, align: u32) -> Result<u32, BridgeError> {
        let ptr = self
            .malloc
            .call(&mut self.store, (size as i32, align as i32))
            .map_err(BridgeError::from_trap)?;
        self.after_call(ptr, size)
    }

    fn has_realloc(&self) -> bool {
        self.realloc.is_some()
    }

    fn realloc(&mut self, ptr: u32, old_size: u32, new_size: u32, align: u32) -> Result<u32, BridgeError> {
        let Some(realloc) = self.realloc.clone() else {
            return Err(BridgeError::MissingExport(REALLOC_EXPORT.to_string()));
        };
        let ptr = realloc
            .call(
                &mut self.store,
                (ptr as i32, old_size as i32, new_size as i32, align as i32),
            )
            .map_err(BridgeError::from_trap)?;
        self.after_call(ptr, new_size)
    }

    fn memory(&mut self) -> &mut [u8] {
        memory::view_mut(&self.memory, self.store.as_context_mut()).0
    }
}
