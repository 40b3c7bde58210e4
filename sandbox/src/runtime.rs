//! Bridge runtime: Wasmtime engine, module loading, instances and the
//! event-loop driver.
//!
//! A [`Bridge`] holds a validated module. Each [`Bridge::instantiate`] call
//! creates a fresh store with its own reference table, memory and host
//! environment, and returns a [`BridgeInstance`] that runs `start` and then
//! drives the host event loop.

use std::path::Path;

use tracing::{debug, trace};
use wasmtime::{Config, Engine, Instance, Linker, Memory, Module, Store, WasmParams, WasmResults};

use boundary_hostapi::{promise, EventLoop, HostEnvironment, HostValue, ObjectRef, RefTable, Task};

use crate::closure;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::exports::{GuestExports, MEMORY_EXPORT};
use crate::host_impl::{BridgeStats, HostState};
use crate::linker::{self, register_imports};
use crate::memory::{self, Words};
use crate::validation::validate_module;

/// A compiled and validated sandbox module.
pub struct Bridge {
    engine: Engine,
    module: Module,
    config: BridgeConfig,
}

impl Bridge {
    /// Create a bridge from WASM bytecode (binary or text).
    ///
    /// Validates the module's exports and imports before accepting.
    pub fn new(wasm_bytes: &[u8], config: BridgeConfig) -> Result<Self, BridgeError> {
        let engine = create_engine(&config)?;
        let module = Module::new(&engine, wasm_bytes)?;
        validate_module(&module)?;
        Ok(Self {
            engine,
            module,
            config,
        })
    }

    /// Load from a `.wasm` file path.
    pub fn from_file(path: &Path, config: BridgeConfig) -> Result<Self, BridgeError> {
        let engine = create_engine(&config)?;
        let module = Module::from_file(&engine, path)?;
        validate_module(&module)?;
        Ok(Self {
            engine,
            module,
            config,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Instantiate the module against `env`.
    ///
    /// `start` is not called; see [`BridgeInstance::start`].
    pub fn instantiate(&self, env: impl HostEnvironment + 'static) -> Result<BridgeInstance, BridgeError> {
        // 1. Host state with the global handle pinned
        let host_state = HostState::new(Box::new(env), &self.config)?;

        // 2. Store with memory limits and optional fuel
        let mut store = Store::new(&self.engine, host_state);
        store.limiter(|state| &mut state.limits);
        if let Some(fuel) = self.config.fuel_limit {
            store.set_fuel(fuel)?;
        }

        // 3. Linker with every boundary import
        let mut linker = Linker::new(&self.engine);
        register_imports(&mut linker)?;

        // 4. Instantiate and resolve the exports the bridge calls
        let instance = handle_trap(linker.instantiate(&mut store, &self.module))?;
        let memory = instance
            .get_memory(&mut store, MEMORY_EXPORT)
            .ok_or_else(|| BridgeError::MissingExport(MEMORY_EXPORT.to_string()))?;
        let exports = GuestExports::resolve(&mut store, &instance)?;
        store.data_mut().set_exports(exports);

        debug!(
            pages = memory.size(&store),
            fuel = ?self.config.fuel_limit,
            "bridge instance created"
        );
        Ok(BridgeInstance {
            store,
            instance,
            memory,
            max_tasks_per_turn: self.config.max_tasks_per_turn,
            started: false,
        })
    }
}

/// One running sandbox.
pub struct BridgeInstance {
    store: Store<HostState>,
    instance: Instance,
    memory: Memory,
    max_tasks_per_turn: usize,
    started: bool,
}

impl BridgeInstance {
    /// Call the guest's `start` export. May only be called once.
    pub fn start(&mut self) -> Result<(), BridgeError> {
        if self.started {
            return Err(BridgeError::AlreadyStarted);
        }
        self.started = true;
        let start = self.store.data().exports()?.start.clone();
        handle_trap(start.call(&mut self.store, ()))?;
        self.store.data_mut().view.invalidate();
        closure::drain_finalizers(&mut self.store)?;
        Ok(())
    }

    // ── Event loop ──

    /// Run every task that is ready at the current virtual time.
    ///
    /// Finalizers are drained between tasks. Fails with
    /// [`BridgeError::TaskLimit`] if the loop keeps producing work past
    /// `max_tasks_per_turn`.
    pub fn run_until_idle(&mut self) -> Result<usize, BridgeError> {
        let max_tasks = self.max_tasks_per_turn;
        let mut ran = 0;
        loop {
            closure::drain_finalizers(&mut self.store)?;
            let Some(task) = self.event_loop_mut().next_ready() else {
                break;
            };
            if ran >= max_tasks {
                return Err(BridgeError::TaskLimit(max_tasks));
            }
            self.run_task(task)?;
            ran += 1;
        }
        trace!(ran, "event loop idle");
        Ok(ran)
    }

    /// Move the virtual clock forward by `ms`, running timers and frames in
    /// due order along the way.
    pub fn advance(&mut self, ms: f64) -> Result<usize, BridgeError> {
        let target = self.event_loop().now() + ms.max(0.0);
        let mut ran = self.run_until_idle()?;
        while let Some(deadline) = self.event_loop().next_deadline() {
            if deadline > target {
                break;
            }
            let now = self.event_loop().now();
            self.event_loop_mut().set_now(deadline.max(now));
            ran += self.run_until_idle()?;
        }
        self.event_loop_mut().set_now(target);
        ran += self.run_until_idle()?;
        Ok(ran)
    }

    fn run_task(&mut self, task: Task) -> Result<(), BridgeError> {
        debug!(source = ?task.source, "running task");
        let outcome = closure::invoke_value(&mut self.store, &task.callback, &task.args);
        match (outcome, task.settles) {
            (Ok(value), Some(derived)) => {
                promise::resolve(&derived, value, self.event_loop_mut());
            }
            (Ok(_), None) => {}
            (Err(err), Some(derived)) if err.is_reportable() => {
                let reason = self
                    .store
                    .data_mut()
                    .thrown
                    .take()
                    .unwrap_or_else(|| err.exception_value());
                promise::reject(&derived, reason, self.event_loop_mut());
            }
            (Err(err), None) if err.is_reportable() => {
                linker::report(self.store.data_mut(), "task", &err);
            }
            (Err(err), _) => return Err(err),
        }
        Ok(())
    }

    pub fn event_loop(&self) -> &EventLoop {
        self.store.data().env.event_loop()
    }

    pub fn event_loop_mut(&mut self) -> &mut EventLoop {
        self.store.data_mut().env.event_loop_mut()
    }

    // ── Calls ──

    /// Invoke a host-held callback, as a task would.
    pub fn call_function(&mut self, callback: &HostValue, args: &[HostValue]) -> Result<HostValue, BridgeError> {
        let result = closure::invoke_value(&mut self.store, callback, args);
        closure::drain_finalizers(&mut self.store)?;
        result
    }

    /// Dispatch an event from the host side.
    pub fn dispatch_event(&mut self, target: &ObjectRef, event: &ObjectRef) -> Result<bool, BridgeError> {
        let result = linker::dispatch(&mut self.store, target, event);
        closure::drain_finalizers(&mut self.store)?;
        result
    }

    /// Run destructors for closures the host no longer holds.
    pub fn collect_garbage(&mut self) -> Result<usize, BridgeError> {
        closure::drain_finalizers(&mut self.store)
    }

    /// Call any typed export by name.
    pub fn call_export<P, R>(&mut self, name: &str, params: P) -> Result<R, BridgeError>
    where
        P: WasmParams,
        R: WasmResults,
    {
        let func = self.instance.get_typed_func::<P, R>(&mut self.store, name)?;
        let result = handle_trap(func.call(&mut self.store, params));
        self.store.data_mut().view.invalidate();
        result
    }

    // ── Host state ──

    pub fn table(&self) -> &RefTable {
        &self.store.data().table
    }

    /// Value behind a handle the sandbox holds.
    pub fn value(&self, handle: u32) -> Option<HostValue> {
        self.table().get(handle).cloned()
    }

    /// Hand a value to the sandbox; the sandbox owns the returned handle.
    pub fn expose(&mut self, value: HostValue) -> Result<u32, BridgeError> {
        Ok(self.store.data_mut().expose(value)? as u32)
    }

    /// Take the exception the sandbox has not collected, if any.
    pub fn take_exception(&mut self) -> Option<HostValue> {
        let state = self.store.data_mut();
        let slot = state.pending_exception.take()?;
        state.table.take(slot)
    }

    pub fn env(&self) -> &dyn HostEnvironment {
        self.store.data().env.as_ref()
    }

    pub fn global(&self) -> ObjectRef {
        self.env().global()
    }

    pub fn document(&self) -> Option<ObjectRef> {
        self.env().document()
    }

    pub fn stats(&self) -> BridgeStats {
        self.store.data().stats
    }

    /// Fuel left, when metering is enabled.
    pub fn fuel_remaining(&self) -> Option<u64> {
        self.store.get_fuel().ok()
    }

    // ── Linear memory ──

    /// The live linear memory. Valid until the next call into the sandbox.
    pub fn bytes(&mut self) -> &[u8] {
        memory::view_mut(&self.memory, &mut self.store).0
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        memory::view_mut(&self.memory, &mut self.store).0
    }

    /// Little-endian word access to the live linear memory.
    pub fn words(&mut self) -> Words<'_> {
        Words::new(self.bytes_mut())
    }

    /// Current linear memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.memory.data_size(&self.store)
    }

    /// How many times the memory view has been re-derived.
    pub fn memory_generation(&self) -> u64 {
        self.store.data().view.generation()
    }
}

/// Create a Wasmtime engine with deterministic configuration.
fn create_engine(config: &BridgeConfig) -> Result<Engine, BridgeError> {
    let mut wasm_config = Config::new();

    // Fuel metering, only when a limit is configured
    wasm_config.consume_fuel(config.fuel_limit.is_some());

    // Determinism enforcement
    wasm_config.wasm_threads(false);
    wasm_config.wasm_simd(false);
    wasm_config.wasm_relaxed_simd(false);
    wasm_config.wasm_multi_memory(false);
    wasm_config.cranelift_nan_canonicalization(true);

    // Memory limits
    let max_bytes = config.max_memory_bytes() as u64;
    wasm_config.memory_guaranteed_dense_image_size(max_bytes.min(16 * 1024 * 1024));

    Ok(Engine::new(&wasm_config)?)
}

/// Handle a guest function call result, converting traps to `BridgeError`.
///
/// Errors raised by imports come back unchanged; fuel exhaustion becomes
/// `BridgeError::FuelExhausted`, other traps `BridgeError::GuestTrapped`.
fn handle_trap<R>(result: Result<R, anyhow::Error>) -> Result<R, BridgeError> {
    result.map_err(BridgeError::from_trap)
}
