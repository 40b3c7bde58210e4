//! Shared test helpers for integration tests.
//!
//! Provides the WAT prelude every guest shares (bump allocator, recording
//! closure entry points), guest builders, bridge factory functions and
//! memory readers used across all integration test files.

#![allow(dead_code)]

use boundary_hostapi::{HostValue, MemHost, ObjectRef};
use boundary_sandbox::{Bridge, BridgeConfig, BridgeInstance};

// ── Guest memory layout ──
//
// 16..256   data segments (strings)
// 256..300  counters written by the recording entry points
// 300..400  handles the guest stores for the host to read
// 400..512  invocation order log (context per call)
// 512..1024 return areas
// 1024..    bump heap

/// Times `__boundary_dtor_0` ran.
pub const DTOR_COUNT: u32 = 256;
/// Times `__boundary_invoke_0` ran.
pub const INVOKE_COUNT: u32 = 260;
/// Last argument handle `__boundary_invoke_0` received.
pub const LAST_ARG: u32 = 264;
/// Context `__boundary_dtor_0` last ran with.
pub const LAST_CONTEXT: u32 = 268;
/// Free counters for test-specific entry points.
pub const COUNTER_A: u32 = 272;
pub const COUNTER_B: u32 = 276;
/// Exception slot recorded by a guest `__boundary_exn_store`.
pub const EXN_SLOT: u32 = 284;

pub const HANDLE_A: u32 = 300;
pub const HANDLE_B: u32 = 304;
pub const HANDLE_C: u32 = 308;
pub const HANDLE_D: u32 = 312;

pub const ORDER_LOG: u32 = 400;
pub const RET_AREA: u32 = 512;
pub const RET_AREA_2: u32 = 528;

/// Bump allocator that grows memory on demand.
const ALLOCATOR: &str = r#"
    (memory (export "memory") 1)
    (global $heap (mut i32) (i32.const 1024))
    (func $malloc (export "__boundary_malloc") (param $size i32) (param $align i32) (result i32)
        (local $ptr i32)
        (local $end i32)
        (local.set $ptr (global.get $heap))
        (local.set $end (i32.add (local.get $ptr) (local.get $size)))
        (block $fits
            (loop $grow
                (br_if $fits (i32.le_u (local.get $end) (i32.mul (memory.size) (i32.const 65536))))
                (if (i32.eq (memory.grow (i32.const 1)) (i32.const -1))
                    (then (unreachable)))
                (br $grow)))
        (global.set $heap (local.get $end))
        (local.get $ptr))
"#;

/// Copying reallocator on top of the bump allocator.
const REALLOC: &str = r#"
    (func (export "__boundary_realloc") (param $ptr i32) (param $old i32) (param $new i32) (param $align i32) (result i32)
        (local $dst i32)
        (local.set $dst (call $malloc (local.get $new) (local.get $align)))
        (memory.copy
            (local.get $dst)
            (local.get $ptr)
            (select (local.get $old) (local.get $new) (i32.lt_u (local.get $old) (local.get $new))))
        (local.get $dst))
"#;

/// Closure entry points 0: the destructor counts and records its context,
/// the trampoline counts, logs its context and keeps its argument handle.
const RECORDER: &str = r#"
    (func (export "__boundary_dtor_0") (param $ctx i32) (param $data i32)
        (i32.store (i32.const 256) (i32.add (i32.load (i32.const 256)) (i32.const 1)))
        (i32.store (i32.const 268) (local.get $ctx)))
    (func (export "__boundary_invoke_0") (param $ctx i32) (param $data i32) (param $arg i32)
        (i32.store
            (i32.add (i32.const 400) (i32.shl (i32.load (i32.const 260)) (i32.const 2)))
            (local.get $ctx))
        (i32.store (i32.const 260) (i32.add (i32.load (i32.const 260)) (i32.const 1)))
        (i32.store (i32.const 264) (local.get $arg)))
"#;

/// Build a guest module. Imports must come before any definition, so they
/// are passed separately from the body.
pub fn guest(imports: &str, body: &str) -> String {
    format!("(module {imports} {ALLOCATOR} {REALLOC} {RECORDER} {body})")
}

/// Like [`guest`], without `__boundary_realloc`.
pub fn guest_without_realloc(imports: &str, body: &str) -> String {
    format!("(module {imports} {ALLOCATOR} {RECORDER} {body})")
}

/// Install a test subscriber; `RUST_LOG` controls the output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

// ── Bridge factories ──

pub fn load_bridge(wat: &str, config: BridgeConfig) -> Bridge {
    init_tracing();
    Bridge::new(wat.as_bytes(), config).expect("guest module should validate")
}

/// Instantiate against a default `MemHost` without calling `start`.
pub fn instantiate(wat: &str) -> BridgeInstance {
    instantiate_with(wat, BridgeConfig::default(), MemHost::new())
}

pub fn instantiate_with(wat: &str, config: BridgeConfig, host: MemHost) -> BridgeInstance {
    load_bridge(wat, config)
        .instantiate(host)
        .expect("instantiation should succeed")
}

/// Instantiate and run `start`.
pub fn started(wat: &str) -> BridgeInstance {
    let mut instance = instantiate(wat);
    instance.start().expect("start should succeed");
    instance
}

// ── Memory readers ──

pub fn read_i32(instance: &mut BridgeInstance, addr: u32) -> i32 {
    instance.words().i32(addr).expect("address in bounds")
}

pub fn read_f64(instance: &mut BridgeInstance, addr: u32) -> f64 {
    instance.words().f64(addr).expect("address in bounds")
}

/// Read a `(ptr, len)` string return area. `None` for `(0, 0)`.
pub fn read_ret_string(instance: &mut BridgeInstance, ret_ptr: u32) -> Option<String> {
    let ptr = instance.words().u32(ret_ptr).expect("address in bounds") as usize;
    let len = instance.words().u32(ret_ptr + 4).expect("address in bounds") as usize;
    if ptr == 0 && len == 0 {
        return None;
    }
    let bytes = instance.bytes()[ptr..ptr + len].to_vec();
    Some(String::from_utf8(bytes).expect("guest string is UTF-8"))
}

/// Value behind the handle the guest stored at `addr`.
pub fn stored_value(instance: &mut BridgeInstance, addr: u32) -> HostValue {
    let handle = read_i32(instance, addr) as u32;
    instance
        .value(handle)
        .unwrap_or_else(|| panic!("handle {} at {:#x} is not live", handle, addr))
}

pub fn stored_object(instance: &mut BridgeInstance, addr: u32) -> ObjectRef {
    stored_value(instance, addr)
        .as_object()
        .cloned()
        .expect("stored handle names an object")
}
