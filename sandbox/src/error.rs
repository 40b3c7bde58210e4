//! Bridge error types.

use std::str::Utf8Error;

use boundary_hostapi::{HostError, HostValue};
use wasmtime::Trap;

/// Invalid UTF-8 in sandbox memory. Never corrected, never partially applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid UTF-8 in sandbox memory at {ptr:#x} (+{len})")]
pub struct DecodeError {
    pub ptr: u32,
    pub len: u32,
    #[source]
    pub source: Utf8Error,
}

/// Top-level error type for the sandbox crate.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Wasmtime engine, compilation, or instantiation error.
    #[error("wasmtime error: {0}")]
    Wasmtime(#[from] anyhow::Error),

    /// Module validation failed (missing exports, bad imports, etc.).
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// A host operation threw.
    #[error("host exception: {0}")]
    Host(#[from] HostError),

    /// Sandbox text was not valid UTF-8.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Pointer range outside linear memory.
    #[error("pointer out of bounds: {ptr:#x} (+{len})")]
    BadPointer { ptr: u32, len: u32 },

    /// Reference table handle that is not live.
    #[error("invalid reference handle {0}")]
    BadHandle(u32),

    /// A guest export the bridge needs is absent.
    #[error("missing guest export: {0}")]
    MissingExport(String),

    /// Invocation refused: the closure was dropped or is already running.
    #[error("closure invoked recursively or after being dropped")]
    InertClosure,

    /// The module needs a host capability this environment lacks.
    #[error("unsupported host feature: {0}")]
    UnsupportedHostFeature(&'static str),

    /// The guest threw an exception through the `throw` import.
    #[error("guest threw: {0}")]
    GuestThrow(String),

    /// Fuel exhausted during execution.
    #[error("fuel exhausted (instruction limit)")]
    FuelExhausted,

    /// WASM guest trapped.
    #[error("guest trapped: {0}")]
    GuestTrapped(String),

    /// The event loop kept producing work past the per-turn task limit.
    #[error("task limit of {0} reached in one turn")]
    TaskLimit(usize),

    /// `start` was already called on this instance.
    #[error("instance already started")]
    AlreadyStarted,
}

impl BridgeError {
    /// Errors that a guarded import turns into a sandbox exception instead
    /// of a trap.
    pub fn is_catchable(&self) -> bool {
        matches!(
            self,
            Self::Host(_) | Self::Decode(_) | Self::InertClosure | Self::GuestThrow(_)
        )
    }

    /// Errors that a listener or task may raise without stopping the
    /// surrounding dispatch; they are logged and the loop moves on.
    pub fn is_reportable(&self) -> bool {
        self.is_catchable() || matches!(self, Self::GuestTrapped(_))
    }

    /// Recover a bridge error from a failed guest call.
    ///
    /// Host functions return `BridgeError`s wrapped in `anyhow`; they come
    /// back out of the call unchanged. Fuel exhaustion and other traps are
    /// classified.
    pub fn from_trap(err: anyhow::Error) -> Self {
        let err = match err.downcast::<BridgeError>() {
            Ok(bridge) => return bridge,
            Err(err) => err,
        };
        match err.downcast_ref::<Trap>() {
            Some(Trap::OutOfFuel) => Self::FuelExhausted,
            Some(_) => Self::GuestTrapped(format!("{:#}", err)),
            None => Self::Wasmtime(err),
        }
    }

    /// The exception value a guarded import hands to the sandbox.
    pub(crate) fn exception_value(&self) -> HostValue {
        match self {
            Self::Host(err) => err.to_value(),
            Self::Decode(err) => HostError::type_error(err.to_string()).to_value(),
            other => HostError::error(other.to_string()).to_value(),
        }
    }
}
