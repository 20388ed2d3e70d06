//! Host import table: the functions a module may call back into.
//!
//! The table holds exactly one entry, `env::js_putn(i32)`, which renders its
//! argument as one decimal line on the configured [`NumberSink`].

use crate::controller::HarnessState;
use crate::error::HarnessError;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tracing::debug;
use wasmtime::{Caller, ExternType, FuncType, Linker, Module, ValType};

/// Output target for `js_putn`.
pub trait NumberSink: Send + Sync {
    /// Emit one value as one observable unit of output.
    fn emit(&self, value: i32) -> io::Result<()>;
}

/// Writes each value as a decimal line on stdout, flushed per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl NumberSink for StdoutSink {
    fn emit(&self, value: i32) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{value}")?;
        out.flush()
    }
}

/// Keeps every emitted value in memory, in call order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    values: Mutex<Vec<i32>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> Vec<i32> {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// The recorded values rendered exactly as [`StdoutSink`] would print them.
    pub fn rendered(&self) -> String {
        self.values().iter().map(|v| format!("{v}\n")).collect()
    }
}

impl NumberSink for RecordingSink {
    fn emit(&self, value: i32) -> io::Result<()> {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(value);
        Ok(())
    }
}

/// Value types that appear in host import signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    I32,
    I64,
    F32,
    F64,
}

impl ValueKind {
    fn matches(self, ty: &ValType) -> bool {
        matches!(
            (self, ty),
            (ValueKind::I32, ValType::I32)
                | (ValueKind::I64, ValType::I64)
                | (ValueKind::F32, ValType::F32)
                | (ValueKind::F64, ValType::F64)
        )
    }

    fn as_str(self) -> &'static str {
        match self {
            ValueKind::I32 => "i32",
            ValueKind::I64 => "i64",
            ValueKind::F32 => "f32",
            ValueKind::F64 => "f64",
        }
    }
}

/// Declared shape of one host function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostImportSignature {
    pub module: &'static str,
    pub name: &'static str,
    pub params: &'static [ValueKind],
    pub results: &'static [ValueKind],
}

impl HostImportSignature {
    pub fn matches(&self, ty: &FuncType) -> bool {
        ty.params().len() == self.params.len()
            && ty.results().len() == self.results.len()
            && ty.params().zip(self.params).all(|(t, k)| k.matches(&t))
            && ty.results().zip(self.results).all(|(t, k)| k.matches(&t))
    }
}

impl fmt::Display for HostImportSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<&str> = self.params.iter().map(|k| k.as_str()).collect();
        let results: Vec<&str> = self.results.iter().map(|k| k.as_str()).collect();
        f.write_str(&render_func(&params, &results))
    }
}

/// `env::js_putn`: one i32 in, nothing out.
pub const PUTN_IMPORT: HostImportSignature = HostImportSignature {
    module: "env",
    name: "js_putn",
    params: &[ValueKind::I32],
    results: &[],
};

const HOST_IMPORTS: &[HostImportSignature] = &[PUTN_IMPORT];

/// The fixed set of host functions offered to the module.
///
/// Built once, before any module is compiled, and only read afterwards.
#[derive(Clone)]
pub struct HostImports {
    sink: Arc<dyn NumberSink>,
}

impl fmt::Debug for HostImports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostImports")
            .field("signatures", &HOST_IMPORTS)
            .finish_non_exhaustive()
    }
}

impl HostImports {
    pub fn new(sink: Arc<dyn NumberSink>) -> Self {
        Self { sink }
    }

    pub fn stdout() -> Self {
        Self::new(Arc::new(StdoutSink))
    }

    pub fn signatures(&self) -> &'static [HostImportSignature] {
        HOST_IMPORTS
    }

    /// Check every import the module declares against the table.
    ///
    /// Runs before linking so a mismatch is reported by name and type rather
    /// than as a generic instantiation failure.
    pub(crate) fn check_module(&self, module: &Module) -> Result<(), HarnessError> {
        for import in module.imports() {
            let (namespace, name) = (import.module(), import.name());
            let unresolved = |detail: String| HarnessError::ImportResolutionError {
                module: namespace.to_string(),
                name: name.to_string(),
                detail,
            };

            let Some(signature) = HOST_IMPORTS
                .iter()
                .find(|s| s.module == namespace && s.name == name)
            else {
                return Err(unresolved("no host function is provided under this name".into()));
            };

            match import.ty() {
                ExternType::Func(ty) if signature.matches(&ty) => {
                    debug!(module = namespace, name = name, "Import resolved");
                }
                ExternType::Func(ty) => {
                    return Err(unresolved(format!(
                        "signature mismatch: host provides {signature}, module expects {}",
                        describe_func_type(&ty)
                    )));
                }
                other => {
                    return Err(unresolved(format!(
                        "host provides {signature}, module expects a {} import",
                        extern_type_kind(&other)
                    )));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn add_to_linker(
        &self,
        linker: &mut Linker<HarnessState>,
    ) -> Result<(), HarnessError> {
        let sink = Arc::clone(&self.sink);
        linker
            .func_wrap(
                PUTN_IMPORT.module,
                PUTN_IMPORT.name,
                move |mut caller: Caller<'_, HarnessState>, value: i32| -> wasmtime::Result<()> {
                    caller.data_mut().host_calls += 1;
                    debug!(value = value, "js_putn");
                    sink.emit(value).map_err(|e| {
                        wasmtime::Error::msg(format!("js_putn failed to write output: {e}"))
                    })
                },
            )
            .map_err(|e| {
                HarnessError::InstantiationValidationError(format!(
                    "failed to define {}::{}: {e:#}",
                    PUTN_IMPORT.module, PUTN_IMPORT.name
                ))
            })?;
        Ok(())
    }
}

fn render_func(params: &[&str], results: &[&str]) -> String {
    let mut out = String::from("(func");
    if !params.is_empty() {
        out.push_str(&format!(" (param {})", params.join(" ")));
    }
    if !results.is_empty() {
        out.push_str(&format!(" (result {})", results.join(" ")));
    }
    out.push(')');
    out
}

/// Text-format rendering of a function type, e.g. `(func (param i64))`.
pub(crate) fn describe_func_type(ty: &FuncType) -> String {
    let params: Vec<String> = ty.params().map(|t| t.to_string()).collect();
    let results: Vec<String> = ty.results().map(|t| t.to_string()).collect();
    let params: Vec<&str> = params.iter().map(String::as_str).collect();
    let results: Vec<&str> = results.iter().map(String::as_str).collect();
    render_func(&params, &results)
}

fn extern_type_kind(ty: &ExternType) -> &'static str {
    match ty {
        ExternType::Func(_) => "function",
        ExternType::Global(_) => "global",
        ExternType::Table(_) => "table",
        ExternType::Memory(_) => "memory",
        _ => "tag",
    }
}
