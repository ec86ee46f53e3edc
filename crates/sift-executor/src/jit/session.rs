//! Process-wide JIT session: host ISA, linked modules, symbol table.
//!
//! Module finalization and removal are serialized behind one lock. Symbol
//! lookups go through a `DashMap` and never take that lock, so worker threads
//! can resolve kernels while another kernel is being linked.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock};

use cranelift_codegen::ir::Type;
use cranelift_codegen::isa::OwnedTargetIsa;
use cranelift_codegen::settings::{self, Configurable};
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{FuncId, Module, default_libcall_names};
use dashmap::DashMap;
use sift_common::{JitConfig, SiftError, SiftResult};
use smol_str::SmolStr;
use tracing::debug;

static GLOBAL_SESSION: OnceLock<SiftResult<JitSession>> = OnceLock::new();

/// Opaque handle to a module linked into a [`JitSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleHandle(u64);

#[derive(Clone, Copy)]
struct Symbol {
    module: ModuleHandle,
    addr: usize,
}

struct LoadedModule {
    module: JITModule,
    symbols: Vec<SmolStr>,
}

// SAFETY: A loaded module is finalized before it is stored. Its code pages are
// immutable from then on and the module is only touched again when it is
// removed, under the session's compile lock.
unsafe impl Send for LoadedModule {}
unsafe impl Sync for LoadedModule {}

/// A module under construction. Obtained from [`JitSession::new_module`],
/// handed back to [`JitSession::add_module`] to be linked.
pub struct ModuleBuilder {
    name: SmolStr,
    module: JITModule,
    exports: Vec<(SmolStr, FuncId)>,
}

impl ModuleBuilder {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&mut self) -> &mut JITModule {
        &mut self.module
    }

    pub fn pointer_type(&self) -> Type {
        self.module.target_config().pointer_type()
    }

    /// Register `func` under `name` in the session symbol table once linked.
    pub fn export(&mut self, name: impl Into<SmolStr>, func: FuncId) {
        self.exports.push((name.into(), func));
    }
}

pub struct JitSession {
    isa: OwnedTargetIsa,
    config: JitConfig,
    modules: DashMap<ModuleHandle, LoadedModule>,
    symbols: DashMap<SmolStr, Symbol>,
    compile_lock: Mutex<()>,
    next_handle: AtomicU64,
    next_kernel: AtomicU64,
}

impl JitSession {
    /// Detect the host ISA and bring up a fresh session.
    pub fn new(config: JitConfig) -> SiftResult<Self> {
        let isa = build_isa(&config)?;
        debug!(triple = %isa.triple(), opt_level = config.opt_level.as_setting(), "jit session ready");
        Ok(Self {
            isa,
            config,
            modules: DashMap::new(),
            symbols: DashMap::new(),
            compile_lock: Mutex::new(()),
            next_handle: AtomicU64::new(1),
            next_kernel: AtomicU64::new(1),
        })
    }

    /// The process-wide session, created on first use from `config`. Later
    /// callers share it regardless of the config they pass.
    pub fn global(config: &JitConfig) -> SiftResult<&'static JitSession> {
        GLOBAL_SESSION
            .get_or_init(|| JitSession::new(config.clone()))
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn config(&self) -> &JitConfig {
        &self.config
    }

    /// Unique id for naming the symbols of one kernel.
    pub fn next_kernel_id(&self) -> u64 {
        self.next_kernel.fetch_add(1, Ordering::Relaxed)
    }

    pub fn new_module(&self, name: impl Into<SmolStr>) -> ModuleBuilder {
        let builder = JITBuilder::with_isa(self.isa.clone(), default_libcall_names());
        ModuleBuilder {
            name: name.into(),
            module: JITModule::new(builder),
            exports: Vec::new(),
        }
    }

    /// Finalize `builder` and publish its exported symbols.
    pub fn add_module(&self, builder: ModuleBuilder) -> SiftResult<ModuleHandle> {
        let _guard = self.lock()?;
        let ModuleBuilder {
            name,
            mut module,
            exports,
        } = builder;

        if let Some((dup, _)) = exports.iter().find(|(n, _)| self.symbols.contains_key(n)) {
            return Err(SiftError::Jit(format!("duplicate symbol '{dup}'")));
        }

        module
            .finalize_definitions()
            .map_err(|e| SiftError::Jit(e.to_string()))?;

        let handle = ModuleHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let mut symbols = Vec::with_capacity(exports.len());
        for (symbol, func) in exports {
            let addr = module.get_finalized_function(func) as usize;
            self.symbols.insert(symbol.clone(), Symbol { module: handle, addr });
            symbols.push(symbol);
        }
        debug!(module = %name, handle = handle.0, symbols = symbols.len(), "linked jit module");
        self.modules.insert(handle, LoadedModule { module, symbols });
        Ok(handle)
    }

    /// Address of an exported function.
    pub fn find_symbol(&self, name: &str) -> SiftResult<*const u8> {
        self.symbols
            .get(name)
            .map(|s| s.addr as *const u8)
            .ok_or_else(|| SiftError::Jit(format!("unresolved symbol '{name}'")))
    }

    /// Module that exports `name`, if any.
    pub fn owner_of(&self, name: &str) -> Option<ModuleHandle> {
        self.symbols.get(name).map(|s| s.module)
    }

    /// Unload a module and free its code. Unknown handles are ignored.
    pub fn remove_module(&self, handle: ModuleHandle) -> SiftResult<()> {
        let _guard = self.lock()?;
        let Some((_, loaded)) = self.modules.remove(&handle) else {
            return Ok(());
        };
        for symbol in &loaded.symbols {
            self.symbols.remove(symbol);
        }
        // SAFETY: the module's symbols are gone from the table, and kernels
        // only drop their handle once no call into the module can be in flight.
        unsafe { loaded.module.free_memory() };
        debug!(handle = handle.0, "removed jit module");
        Ok(())
    }

    pub fn num_modules(&self) -> usize {
        self.modules.len()
    }

    pub fn contains_module(&self, handle: ModuleHandle) -> bool {
        self.modules.contains_key(&handle)
    }

    fn lock(&self) -> SiftResult<MutexGuard<'_, ()>> {
        self.compile_lock
            .lock()
            .map_err(|_| SiftError::Jit("jit compile lock poisoned".into()))
    }
}

impl std::fmt::Debug for JitSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JitSession")
            .field("triple", &self.isa.triple().to_string())
            .field("modules", &self.modules.len())
            .field("symbols", &self.symbols.len())
            .finish()
    }
}

fn build_isa(config: &JitConfig) -> SiftResult<OwnedTargetIsa> {
    let setup = |e: settings::SetError| SiftError::Jit(format!("setup: {e}"));
    let mut flag_builder = settings::builder();
    flag_builder
        .set("opt_level", config.opt_level.as_setting())
        .map_err(setup)?;
    flag_builder.set("is_pic", "false").map_err(setup)?;
    flag_builder
        .set("enable_verifier", if config.verify_ir { "true" } else { "false" })
        .map_err(setup)?;

    let isa_builder =
        cranelift_native::builder().map_err(|e| SiftError::Jit(format!("setup: {e}")))?;
    isa_builder
        .finish(settings::Flags::new(flag_builder))
        .map_err(|e| SiftError::Jit(format!("setup: {e}")))
}
