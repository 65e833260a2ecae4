//! WASM module validation, run once when code is saved.
//!
//! Checks:
//!
//! 1. `memory` is exported
//! 2. Entry points are exported with the expected signatures
//! 3. Imports come from `env`, are functions, and name a host function
//! 4. Every `requires_<feature>` export names a supported feature

use std::collections::BTreeSet;

use wasmtime::{ExternType, Module, ValType};

use crate::error::SandboxError;
use crate::linker::{HOST_FUNCTIONS, IMPORT_MODULE};

/// Entry export: (name, i32 param count, required).
/// Every entry point returns a single i32 status.
const ENTRY_EXPORTS: &[(&str, usize, bool)] = &[
    ("instantiate", 6, true),
    ("handle", 6, true),
    ("migrate", 6, false),
    ("query", 4, true),
];

const REQUIRES_PREFIX: &str = "requires_";

fn is_i32(vt: &ValType) -> bool {
    matches!(vt, ValType::I32)
}

/// Validate a compiled module against the contract ABI.
pub fn validate_module(module: &Module, supported: &BTreeSet<String>) -> Result<(), SandboxError> {
    validate_exports(module)?;
    validate_imports(module)?;
    validate_features(module, supported)?;
    Ok(())
}

/// Features the module declares it needs.
pub fn required_features(module: &Module) -> BTreeSet<String> {
    module
        .exports()
        .filter_map(|e| e.name().strip_prefix(REQUIRES_PREFIX))
        .map(str::to_owned)
        .collect()
}

fn validate_exports(module: &Module) -> Result<(), SandboxError> {
    let has_memory = module
        .exports()
        .any(|e| e.name() == "memory" && matches!(e.ty(), ExternType::Memory(_)));
    if !has_memory {
        return Err(SandboxError::Validation("module must export 'memory'".into()));
    }

    for &(name, param_count, required) in ENTRY_EXPORTS {
        let export = match module.exports().find(|e| e.name() == name) {
            Some(e) => e,
            None if required => {
                return Err(SandboxError::Validation(format!(
                    "missing required export: {}",
                    name
                )));
            }
            None => continue,
        };

        let func_ty = match export.ty() {
            ExternType::Func(ft) => ft,
            _ => {
                return Err(SandboxError::Validation(format!(
                    "export '{}' must be a function",
                    name
                )));
            }
        };

        let params: Vec<ValType> = func_ty.params().collect();
        let results: Vec<ValType> = func_ty.results().collect();

        if params.len() != param_count || !params.iter().all(is_i32) {
            return Err(SandboxError::Validation(format!(
                "export '{}' has wrong param signature: expected {} i32 params, got {} params",
                name,
                param_count,
                params.len()
            )));
        }
        if results.len() != 1 || !is_i32(&results[0]) {
            return Err(SandboxError::Validation(format!(
                "export '{}' must return a single i32 status",
                name
            )));
        }
    }

    Ok(())
}

fn validate_imports(module: &Module) -> Result<(), SandboxError> {
    for import in module.imports() {
        let module_name = import.module();

        if module_name != IMPORT_MODULE {
            return Err(SandboxError::Validation(format!(
                "import from unknown module '{}' (only '{}' allowed): {}",
                module_name,
                IMPORT_MODULE,
                import.name()
            )));
        }
        if !matches!(import.ty(), ExternType::Func(_)) {
            return Err(SandboxError::Validation(format!(
                "non-function import not allowed: {}::{}",
                module_name,
                import.name()
            )));
        }
        if !HOST_FUNCTIONS.contains(&import.name()) {
            return Err(SandboxError::Validation(format!(
                "unknown host function: {}::{}",
                module_name,
                import.name()
            )));
        }
    }

    Ok(())
}

fn validate_features(module: &Module, supported: &BTreeSet<String>) -> Result<(), SandboxError> {
    let missing: Vec<String> = required_features(module)
        .difference(supported)
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(SandboxError::Validation(format!(
            "unsupported features: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::features_from_csv;
    use wasmtime::Engine;

    const ENTRIES: &str = r#"
        (func (export "instantiate") (param i32 i32 i32 i32 i32 i32) (result i32)
            i32.const 0)
        (func (export "handle") (param i32 i32 i32 i32 i32 i32) (result i32)
            i32.const 0)
        (func (export "query") (param i32 i32 i32 i32) (result i32)
            i32.const 0)
    "#;

    fn compile(body: &str) -> Module {
        let wat = format!("(module {})", body);
        Module::new(&Engine::default(), wat).unwrap()
    }

    fn validate(body: &str) -> Result<(), SandboxError> {
        validate_module(&compile(body), &features_from_csv("staking"))
    }

    #[test]
    fn test_validate_minimal_valid_module() {
        validate(&format!(r#"(memory (export "memory") 1) {}"#, ENTRIES)).unwrap();
    }

    #[test]
    fn test_migrate_is_optional_but_checked() {
        let good = r#"(func (export "migrate") (param i32 i32 i32 i32 i32 i32) (result i32)
            i32.const 0)"#;
        validate(&format!(r#"(memory (export "memory") 1) {} {}"#, ENTRIES, good)).unwrap();

        let bad = r#"(func (export "migrate") (param i32 i32) (result i32) i32.const 0)"#;
        let err = validate(&format!(r#"(memory (export "memory") 1) {} {}"#, ENTRIES, bad));
        assert!(matches!(err, Err(SandboxError::Validation(_))));
    }

    #[test]
    fn test_reject_missing_export() {
        let err = validate(
            r#"
            (memory (export "memory") 1)
            (func (export "instantiate") (param i32 i32 i32 i32 i32 i32) (result i32)
                i32.const 0)
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("handle"));
    }

    #[test]
    fn test_reject_wrong_signature() {
        let err = validate(
            r#"
            (memory (export "memory") 1)
            (func (export "instantiate") (param i32 i32 i32 i32 i32 i32) (result i32)
                i32.const 0)
            (func (export "handle") (param i32 i32 i32 i32 i32 i32))
            (func (export "query") (param i32 i32 i32 i32) (result i32)
                i32.const 0)
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, SandboxError::Validation(_)));
    }

    #[test]
    fn test_reject_missing_memory() {
        let err = validate(ENTRIES).unwrap_err();
        assert!(err.to_string().contains("memory"));
    }

    #[test]
    fn test_accept_host_import() {
        validate(&format!(
            r#"(import "env" "db_read" (func (param i32 i32 i32 i32) (result i32)))
               (memory (export "memory") 1) {}"#,
            ENTRIES
        ))
        .unwrap();
    }

    #[test]
    fn test_reject_wasi_import() {
        let err = validate(&format!(
            r#"(import "wasi_snapshot_preview1" "fd_write"
                   (func (param i32 i32 i32 i32) (result i32)))
               (memory (export "memory") 1) {}"#,
            ENTRIES
        ))
        .unwrap_err();
        assert!(matches!(err, SandboxError::Validation(_)));
    }

    #[test]
    fn test_reject_unknown_host_function() {
        let err = validate(&format!(
            r#"(import "env" "abort" (func))
               (memory (export "memory") 1) {}"#,
            ENTRIES
        ))
        .unwrap_err();
        assert!(err.to_string().contains("env::abort"));
    }

    #[test]
    fn test_reject_imported_memory() {
        let err = validate(&format!(
            r#"(import "env" "memory" (memory 1))
               (export "memory" (memory 0)) {}"#,
            ENTRIES
        ))
        .unwrap_err();
        assert!(err.to_string().contains("non-function"));
    }

    #[test]
    fn test_required_features() {
        let module = compile(&format!(
            r#"(memory (export "memory") 1)
               (func (export "requires_staking"))
               (func (export "requires_stargate")) {}"#,
            ENTRIES
        ));
        let features: Vec<String> = required_features(&module).into_iter().collect();
        assert_eq!(features, vec!["staking".to_string(), "stargate".to_string()]);

        let err = validate_module(&module, &features_from_csv("staking")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "validation error: unsupported features: stargate"
        );
        validate_module(&module, &features_from_csv("staking,stargate")).unwrap();
    }
}
