//! Instantiation and invocation of the single module.
//!
//! Each stage consumes the previous one, so the entry point only exists as a
//! value once instantiation has succeeded and can be invoked at most once:
//!
//! ```text
//! BinaryModule --instantiate--> Instantiated --resolve_entry--> EntryResolved --invoke--> Completion
//! ```
//!
//! Every failure is terminal and is returned as a [`HarnessError`].

use crate::artifact::{ArtifactLoader, BinaryModule};
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::imports::{HostImports, describe_func_type};
use crate::limits::TrackingLimiter;
use tracing::{debug, info};
use wasmtime::{Engine, Extern, Func, Instance, Linker, Module, Store, Trap, Val};

/// Data stored in the module's `wasmtime::Store`.
pub(crate) struct HarnessState {
    pub(crate) limiter: TrackingLimiter,
    /// Number of host import calls made by the module so far.
    pub(crate) host_calls: u64,
}

/// Outcome of a normal return from the entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub host_calls: u64,
    pub peak_memory_bytes: usize,
}

/// Owns the engine and the import table; produces the one module instance.
pub struct Controller {
    engine: Engine,
    imports: HostImports,
    config: HarnessConfig,
}

impl Controller {
    pub fn new(config: HarnessConfig, imports: HostImports) -> Result<Self, HarnessError> {
        let engine = Engine::new(&wasmtime::Config::new()).map_err(|e| {
            HarnessError::InstantiationValidationError(format!(
                "failed to create Wasmtime engine: {e:#}"
            ))
        })?;
        Ok(Self {
            engine,
            imports,
            config,
        })
    }

    /// Validate, link and instantiate the module.
    ///
    /// The bytes are dropped once compiled, whether or not instantiation
    /// succeeds.
    pub fn instantiate(&self, artifact: BinaryModule) -> Result<Instantiated, HarnessError> {
        debug!(size_bytes = artifact.len(), "Compiling module");
        let module = Module::from_binary(&self.engine, artifact.as_bytes())
            .map_err(|e| HarnessError::InstantiationValidationError(format!("{e:#}")))?;
        drop(artifact);

        self.imports.check_module(&module)?;

        let mut linker = Linker::new(&self.engine);
        self.imports.add_to_linker(&mut linker)?;

        let state = HarnessState {
            limiter: TrackingLimiter::new(self.config.limits.clone()),
            host_calls: 0,
        };
        let mut store = Store::new(&self.engine, state);
        store.limiter(|s| &mut s.limiter);

        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(|e| HarnessError::InstantiationValidationError(format!("{e:#}")))?;

        info!(
            imports = module.imports().len(),
            exports = module.exports().len(),
            memory_bytes = store.data().limiter.current_memory_bytes(),
            "Module instantiated"
        );

        Ok(Instantiated {
            store,
            instance,
            entry_point: self.config.entry_point.clone(),
        })
    }
}

/// A live module instance whose entry point has not been looked up yet.
pub struct Instantiated {
    store: Store<HarnessState>,
    instance: Instance,
    entry_point: String,
}

impl Instantiated {
    /// Host calls made so far; nonzero only if the module's start function
    /// called back into the host.
    pub fn host_calls(&self) -> u64 {
        self.store.data().host_calls
    }

    /// Look up the entry point export and check it takes no parameters.
    /// Declared results are allowed and ignored on return.
    pub fn resolve_entry(mut self) -> Result<EntryResolved, HarnessError> {
        let export = self
            .instance
            .get_export(&mut self.store, &self.entry_point)
            .ok_or_else(|| HarnessError::EntryPointNotFound(self.entry_point.clone()))?;

        let entry = match export {
            Extern::Func(func) => func,
            other => {
                return Err(HarnessError::EntryPointSignatureMismatch {
                    name: self.entry_point,
                    found: format!("a {} export", extern_kind(&other)),
                });
            }
        };

        let ty = entry.ty(&self.store);
        if ty.params().len() > 0 {
            return Err(HarnessError::EntryPointSignatureMismatch {
                name: self.entry_point,
                found: describe_func_type(&ty),
            });
        }

        debug!(entry = %self.entry_point, ty = %describe_func_type(&ty), "Entry point resolved");

        Ok(EntryResolved {
            store: self.store,
            entry,
            result_count: ty.results().len(),
            entry_point: self.entry_point,
        })
    }
}

/// The resolved entry point, ready for its single invocation.
pub struct EntryResolved {
    store: Store<HarnessState>,
    entry: Func,
    result_count: usize,
    entry_point: String,
}

impl EntryResolved {
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Call the entry point once and wait for it to return or trap.
    pub fn invoke(mut self) -> Result<Completion, HarnessError> {
        info!(entry = %self.entry_point, "Invoking entry point");

        let mut results = vec![Val::I32(0); self.result_count];
        if let Err(e) = self.entry.call(&mut self.store, &[], &mut results) {
            debug!(entry = %self.entry_point, error = ?e, "Entry point trapped");
            return Err(HarnessError::ExecutionTrap {
                entry: self.entry_point,
                reason: describe_trap(&e),
            });
        }
        if !results.is_empty() {
            debug!(entry = %self.entry_point, results = ?results, "Ignoring entry point results");
        }

        let state = self.store.data();
        Ok(Completion {
            host_calls: state.host_calls,
            peak_memory_bytes: state.limiter.peak_memory_bytes(),
        })
    }
}

/// Load the artifact and drive it through every stage.
pub fn run(
    loader: &ArtifactLoader,
    config: HarnessConfig,
    imports: HostImports,
) -> Result<Completion, HarnessError> {
    let artifact = loader.load()?;
    let controller = Controller::new(config, imports)?;
    controller.instantiate(artifact)?.resolve_entry()?.invoke()
}

/// [`run`] against the artifact installed next to the executable.
pub fn run_installed(imports: HostImports) -> Result<Completion, HarnessError> {
    let config = HarnessConfig::default();
    let loader = ArtifactLoader::beside_executable(&config.artifact_file_name)?;
    run(&loader, config, imports)
}

fn describe_trap(err: &wasmtime::Error) -> String {
    match err.downcast_ref::<Trap>() {
        Some(trap) => trap.to_string(),
        None => format!("{err:#}"),
    }
}

fn extern_kind(ext: &Extern) -> &'static str {
    match ext {
        Extern::Func(_) => "function",
        Extern::Global(_) => "global",
        Extern::Table(_) => "table",
        Extern::Memory(_) => "memory",
        Extern::SharedMemory(_) => "shared memory",
        _ => "tag",
    }
}
