//! WASM module validation: ABI compatibility checks.
//!
//! Validates that a compiled module can cross the boundary before it is
//! instantiated. Checks:
//!
//! 1. `memory`, `start` and the allocator are exported with correct signatures
//! 2. Optional entry points (`realloc`, exception store, numbered
//!    destructors and invoke trampolines) have correct signatures when present
//! 3. All imports are functions from the `boundary` module
//! 4. No WASI imports

use wasmtime::{ExternType, FuncType, Module, ValType};

use crate::error::BridgeError;
use crate::exports::{
    numbered, DTOR_PREFIX, EXN_STORE_EXPORT, INVOKE_PREFIX, MALLOC_EXPORT, MEMORY_EXPORT,
    REALLOC_EXPORT, START_EXPORT,
};
use crate::linker::MODULE;

/// Check if a ValType is i32.
fn is_i32(vt: &ValType) -> bool {
    matches!(vt, ValType::I32)
}

/// Expected export: (name, param_count_of_i32, result_count_of_i32).
const REQUIRED_EXPORTS: &[(&str, usize, usize)] = &[(START_EXPORT, 0, 0), (MALLOC_EXPORT, 2, 1)];

/// Exports checked only when present.
const OPTIONAL_EXPORTS: &[(&str, usize, usize)] = &[(REALLOC_EXPORT, 4, 1), (EXN_STORE_EXPORT, 1, 0)];

/// Validate that a module meets the boundary ABI.
pub fn validate_module(module: &Module) -> Result<(), BridgeError> {
    validate_exports(module)?;
    validate_imports(module)?;
    Ok(())
}

fn func_type(module: &Module, name: &str) -> Result<Option<FuncType>, BridgeError> {
    let Some(export) = module.exports().find(|e| e.name() == name) else {
        return Ok(None);
    };
    match export.ty() {
        ExternType::Func(ft) => Ok(Some(ft)),
        _ => Err(BridgeError::Validation(format!(
            "export '{}' must be a function",
            name
        ))),
    }
}

fn check_signature(name: &str, ty: &FuncType, params: usize, results: usize) -> Result<(), BridgeError> {
    let actual_params: Vec<ValType> = ty.params().collect();
    let actual_results: Vec<ValType> = ty.results().collect();

    if actual_params.len() != params || !actual_params.iter().all(is_i32) {
        return Err(BridgeError::Validation(format!(
            "export '{}' has wrong param signature: expected {} i32 params, got {} params",
            name,
            params,
            actual_params.len()
        )));
    }

    if actual_results.len() != results || !actual_results.iter().all(is_i32) {
        return Err(BridgeError::Validation(format!(
            "export '{}' has wrong result signature: expected {} i32 results, got {} results",
            name,
            results,
            actual_results.len()
        )));
    }
    Ok(())
}

fn validate_exports(module: &Module) -> Result<(), BridgeError> {
    let has_memory = module
        .exports()
        .any(|e| e.name() == MEMORY_EXPORT && matches!(e.ty(), ExternType::Memory(_)));
    if !has_memory {
        return Err(BridgeError::Validation(format!(
            "module must export '{}'",
            MEMORY_EXPORT
        )));
    }

    for &(name, params, results) in REQUIRED_EXPORTS {
        let ty = func_type(module, name)?
            .ok_or_else(|| BridgeError::Validation(format!("missing required export: {}", name)))?;
        check_signature(name, &ty, params, results)?;
    }

    for &(name, params, results) in OPTIONAL_EXPORTS {
        if let Some(ty) = func_type(module, name)? {
            check_signature(name, &ty, params, results)?;
        }
    }

    let names: Vec<String> = module.exports().map(|e| e.name().to_string()).collect();
    for name in &names {
        if numbered(name, DTOR_PREFIX).is_some() {
            if let Some(ty) = func_type(module, name)? {
                check_signature(name, &ty, 2, 0)?;
            }
        } else if numbered(name, INVOKE_PREFIX).is_some() {
            if let Some(ty) = func_type(module, name)? {
                validate_trampoline(name, &ty)?;
            }
        }
    }

    Ok(())
}

/// Trampolines take `(context, data, arg handles…)` and return nothing or
/// one handle.
fn validate_trampoline(name: &str, ty: &FuncType) -> Result<(), BridgeError> {
    let params: Vec<ValType> = ty.params().collect();
    let results: Vec<ValType> = ty.results().collect();
    if params.len() < 2 || !params.iter().all(is_i32) {
        return Err(BridgeError::Validation(format!(
            "export '{}' must take (context, data) followed by i32 handles",
            name
        )));
    }
    if results.len() > 1 || !results.iter().all(is_i32) {
        return Err(BridgeError::Validation(format!(
            "export '{}' must return nothing or one i32 handle",
            name
        )));
    }
    Ok(())
}

/// Check that all imports are functions from the `boundary` module.
fn validate_imports(module: &Module) -> Result<(), BridgeError> {
    for import in module.imports() {
        let module_name = import.module();

        if module_name.starts_with("wasi") {
            return Err(BridgeError::Validation(format!(
                "WASI import not allowed: {}::{}",
                module_name,
                import.name()
            )));
        }

        if module_name != MODULE {
            return Err(BridgeError::Validation(format!(
                "import from unknown module '{}' (only '{}' allowed): {}",
                module_name,
                MODULE,
                import.name()
            )));
        }

        if !matches!(import.ty(), ExternType::Func(_)) {
            return Err(BridgeError::Validation(format!(
                "non-function import not allowed: {}::{}",
                module_name,
                import.name()
            )));
        }
    }

    Ok(())
}
