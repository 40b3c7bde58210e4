//! `boundary-sandbox`: Wasmtime-based boundary between a WASM sandbox and
//! its host.
//!
//! This crate loads, validates, and runs a sandbox module that drives a host
//! object model through integer handles. It provides:
//!
//! - **Linear memory views:** bounds-checked access re-derived after every
//!   call into the sandbox, so memory growth never leaves a stale view
//! - **Value bridge:** UTF-8 strings, optional numbers, and handles crossing
//!   the boundary through the `boundary` import module
//! - **Reference table:** handles for host values with fixed sentinel slots
//! - **Closure bridge:** host-callable functions backed by sandbox state,
//!   with re-entrancy refusal and exactly-once destructors
//! - **Exception capture:** host exceptions become sandbox exception slots
//!   instead of traps
//! - **Memory and fuel limits:** bounded growth, optional instruction fuel
//!
//! The primary entry points are [`Bridge::instantiate`] and
//! [`BridgeInstance::run_until_idle`].

pub mod error;
pub mod config;
pub mod memory;
pub mod codec;
pub mod exports;
pub mod host_impl;
pub mod closure;
pub mod validation;
pub mod linker;
pub mod runtime;

pub use error::{BridgeError, DecodeError};
pub use config::BridgeConfig;
pub use host_impl::{BridgeStats, HostState};
pub use runtime::{Bridge, BridgeInstance};
