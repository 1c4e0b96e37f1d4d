//! Tree-walking interpreter for compiled spec scripts.
//!
//! The interpreter is `Rc`-based and therefore `!Send`: one interpreter, and every closure it creates, stays on the
//! thread that made it. DSL calls write into the [`SpecBuilder`] passed to [`Interpreter::new`]; an interpreter
//! created without a builder can run spec bodies and hooks but rejects new declarations.

mod builtins;
mod eval;
mod value;

use std::rc::Rc;
use std::sync::Arc;

use specrun_core::lang::builtins::BUILTIN_FUNCTIONS;
use specrun_core::lang::dsl::DSL_CALLS;
use specrun_syntax::ast::{Block, ElseBranch, IfStmt, Program, Span, Spanned, Stmt};

use super::builder::SpecBuilder;
use super::natives::NativeLibrary;
use super::origin::ScriptOrigin;

pub use value::{Closure, Env, Scope, Value};

/// Nested user calls allowed before a run is aborted.
const MAX_CALL_DEPTH: usize = 64;

/// An uncaught error raised while a script or spec body ran.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct RuntimeError {
    pub message: String,
    /// Innermost frame first, one `at name (file:line:column)` entry per frame.
    pub trace: Vec<String>,
}

/// Statement completion.
pub(crate) enum Flow {
    Next,
    Return(Value),
    Break,
    Continue,
}

struct Frame {
    name: String,
    origin: Rc<ScriptOrigin>,
    /// Span currently executing in this frame.
    span: Span,
}

pub struct Interpreter<'b> {
    builder: Option<&'b mut SpecBuilder>,
    globals: Env,
    frames: Vec<Frame>,
}

impl<'b> Interpreter<'b> {
    pub fn new(builder: Option<&'b mut SpecBuilder>) -> Self {
        let globals = Scope::root();
        for info in BUILTIN_FUNCTIONS {
            globals.define(info.canonical, Value::Builtin(info.id));
        }
        for info in DSL_CALLS {
            globals.define(info.canonical, Value::Dsl(info));
            for alias in info.aliases {
                globals.define(*alias, Value::Dsl(info));
            }
        }
        Self {
            builder,
            globals,
            frames: Vec::new(),
        }
    }

    /// Make a referenced native library visible under its own name.
    pub fn define_library(&mut self, library: &'static NativeLibrary) {
        self.globals.define(library.name, Value::Library(library));
    }

    /// Run a program's top-level statements.
    pub fn run_program(&mut self, program: &Program, origin: Rc<ScriptOrigin>) -> Result<(), RuntimeError> {
        let env = Scope::child(&self.globals);
        self.frames.push(Frame {
            name: "<script>".to_string(),
            origin,
            span: Span::default(),
        });
        let result = self.exec_statements(&program.statements, &env);
        self.frames.pop();
        result.map(|_| ())
    }

    /// Call a zero-parameter closure (spec body or hook).
    pub fn call(&mut self, closure: &Rc<Closure>) -> Result<Value, RuntimeError> {
        self.call_closure(closure, Vec::new(), closure.def.span)
    }

    fn builder_mut(&mut self) -> Option<&mut SpecBuilder> {
        self.builder.as_deref_mut()
    }

    fn current_origin(&self) -> Option<&Rc<ScriptOrigin>> {
        self.frames.last().map(|f| &f.origin)
    }

    /// Build an error located at `span` in the innermost frame.
    fn error_at(&mut self, span: Span, message: impl Into<String>) -> RuntimeError {
        if let Some(frame) = self.frames.last_mut() {
            frame.span = span;
        }
        RuntimeError {
            message: message.into(),
            trace: self
                .frames
                .iter()
                .rev()
                .map(|f| format!("at {} ({})", f.name, f.origin.locate(f.span)))
                .collect(),
        }
    }

    fn exec_statements(&mut self, statements: &[Spanned<Stmt>], env: &Env) -> Result<Flow, RuntimeError> {
        // Function declarations are hoisted so siblings can call each other in any order.
        for stmt in statements {
            if let Stmt::Fn(def) = &stmt.node {
                if let Some(name) = &def.name {
                    let closure = self.make_closure(Arc::clone(def), env);
                    env.define(name.clone(), closure);
                }
            }
        }

        for stmt in statements {
            if let Some(frame) = self.frames.last_mut() {
                frame.span = stmt.span;
            }
            match self.exec_stmt(stmt, env)? {
                Flow::Next => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Next)
    }

    fn exec_block(&mut self, block: &Block, env: &Env) -> Result<Flow, RuntimeError> {
        let scope = Scope::child(env);
        self.exec_statements(&block.statements, &scope)
    }

    fn exec_stmt(&mut self, stmt: &Spanned<Stmt>, env: &Env) -> Result<Flow, RuntimeError> {
        match &stmt.node {
            Stmt::Let(let_stmt) => {
                let value = match &let_stmt.value {
                    Some(expr) => self.eval(expr, env)?,
                    None => Value::Nil,
                };
                env.define(let_stmt.name.node.clone(), value);
            }
            Stmt::Assign(assign) => {
                let value = self.eval(&assign.value, env)?;
                self.assign(&assign.target, value, env)?;
            }
            Stmt::Fn(_) => {}
            Stmt::If(if_stmt) => return self.exec_if(if_stmt, env),
            Stmt::While(while_stmt) => {
                while self.eval(&while_stmt.condition, env)?.is_truthy() {
                    match self.exec_block(&while_stmt.body, env)? {
                        Flow::Break => break,
                        Flow::Next | Flow::Continue => {}
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
            }
            Stmt::For(for_stmt) => {
                let iterable = self.eval(&for_stmt.iterable, env)?;
                let items: Vec<Value> = match &iterable {
                    Value::List(items) => items.borrow().clone(),
                    Value::Str(s) => s.chars().map(|c| Value::str(c.to_string())).collect(),
                    other => {
                        let message = format!("cannot iterate over {}", other.type_name());
                        return Err(self.error_at(for_stmt.iterable.span, message));
                    }
                };
                for item in items {
                    let scope = Scope::child(env);
                    scope.define(for_stmt.binding.node.clone(), item);
                    match self.exec_statements(&for_stmt.body.statements, &scope)? {
                        Flow::Break => break,
                        Flow::Next | Flow::Continue => {}
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr, env)?,
                    None => Value::Nil,
                };
                return Ok(Flow::Return(value));
            }
            Stmt::Throw(expr) => {
                let value = self.eval(expr, env)?;
                return Err(self.error_at(stmt.span, value.to_string()));
            }
            Stmt::Break => return Ok(Flow::Break),
            Stmt::Continue => return Ok(Flow::Continue),
            Stmt::Expr(expr) => {
                self.eval(expr, env)?;
            }
        }
        Ok(Flow::Next)
    }

    fn exec_if(&mut self, if_stmt: &IfStmt, env: &Env) -> Result<Flow, RuntimeError> {
        if self.eval(&if_stmt.condition, env)?.is_truthy() {
            return self.exec_block(&if_stmt.then_block, env);
        }
        match &if_stmt.else_branch {
            Some(ElseBranch::If(nested)) => self.exec_if(&nested.node, env),
            Some(ElseBranch::Block(block)) => self.exec_block(block, env),
            None => Ok(Flow::Next),
        }
    }
}
