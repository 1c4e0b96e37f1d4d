//! Script execution host: compile and run a spec file to obtain its live spec tree.
//!
//! `execute` resolves directives, compiles the unit once per absolute path, and runs the compiled program with a
//! fresh [`SpecBuilder`] owned by a [`BuilderScope`]. The compiled artifact is reused until any file in the unit
//! changes on disk.
//!
//! ## Notes
//! - Faults are returned, never swallowed: callers decide whether a fault is recoverable.
//! - The host is single-threaded (`Rc` inside); concurrent use is a type error rather than a runtime hazard.

pub mod builder;
pub mod compiler;
pub mod interpreter;
pub mod natives;
pub mod origin;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

pub use builder::{BuilderScope, ContextItem, ContextNode, Hooks, SpecBuilder, SpecNode};
pub use compiler::{CompileDiagnostic, CompiledScript};
pub use interpreter::{Interpreter, RuntimeError};

use crate::source::{self, SourceUnit};

/// Why running a script failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HostFault {
    /// The unit does not compile. Discovery may recover through the static structural parser.
    #[error("compilation failed: {message}")]
    Compile {
        message: String,
        diagnostics: Vec<CompileDiagnostic>,
        /// Text of the compiled unit; diagnostic spans index into it.
        unit_text: Arc<str>,
    },
    /// The top-level statements raised an error.
    #[error("runtime error: {message}")]
    Runtime { message: String, trace: Vec<String> },
    /// The file or one of its includes could not be read.
    #[error("{message}")]
    Source { message: String },
}

impl HostFault {
    pub fn message(&self) -> &str {
        match self {
            HostFault::Compile { message, .. }
            | HostFault::Runtime { message, .. }
            | HostFault::Source { message } => message,
        }
    }

    pub fn trace(&self) -> &[String] {
        match self {
            HostFault::Runtime { trace, .. } => trace,
            HostFault::Compile { .. } | HostFault::Source { .. } => &[],
        }
    }
}

impl From<RuntimeError> for HostFault {
    fn from(err: RuntimeError) -> Self {
        HostFault::Runtime {
            message: err.message,
            trace: err.trace,
        }
    }
}

struct CacheEntry {
    fingerprint: String,
    outcome: Result<Rc<CompiledScript>, HostFault>,
}

/// Compiles and runs spec scripts, caching compiled units per absolute path.
#[derive(Default)]
pub struct ScriptExecutionHost {
    compiled: RefCell<HashMap<PathBuf, CacheEntry>>,
    compilations: Cell<usize>,
}

impl ScriptExecutionHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of real compilations performed so far.
    pub fn compilation_count(&self) -> usize {
        self.compilations.get()
    }

    /// Compile `path` (or reuse the cached artifact) without running it.
    ///
    /// ## Errors
    /// [`HostFault::Source`] if the file cannot be read, [`HostFault::Compile`] if it does not compile.
    pub fn compile(&self, path: &Path) -> Result<Rc<CompiledScript>, HostFault> {
        let unit = source::resolve(path).map_err(|err| HostFault::Source {
            message: err.to_string(),
        })?;
        self.compiled_unit(&unit)
    }

    fn compiled_unit(&self, unit: &SourceUnit) -> Result<Rc<CompiledScript>, HostFault> {
        let fingerprint = unit.fingerprint();
        if let Some(entry) = self.compiled.borrow().get(&unit.root) {
            if entry.fingerprint == fingerprint {
                tracing::debug!(path = %unit.root.display(), "reusing compiled script");
                return entry.outcome.clone();
            }
        }

        self.compilations.set(self.compilations.get() + 1);
        let outcome = compiler::compile(unit).map(Rc::new);
        if let Err(fault) = &outcome {
            tracing::debug!(path = %unit.root.display(), %fault, "compilation failed");
        }
        self.compiled.borrow_mut().insert(
            unit.root.clone(),
            CacheEntry {
                fingerprint,
                outcome: outcome.clone(),
            },
        );
        outcome
    }

    /// Compile and run `path`, returning the root context of the spec tree it declares.
    ///
    /// Returns `Ok(None)` for a valid file that declares no specs.
    ///
    /// ## Errors
    /// Any [`HostFault`]; see its variants.
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub fn execute(&self, path: &Path) -> Result<Option<ContextNode>, HostFault> {
        let script = self.compile(path)?;

        let mut scope = BuilderScope::acquire();
        {
            let mut interpreter = Interpreter::new(Some(scope.builder()));
            for library in script.libraries.iter().copied() {
                interpreter.define_library(library);
            }
            interpreter.run_program(&script.program, Rc::clone(&script.origin))?;
        }
        Ok(scope.finish())
    }
}
