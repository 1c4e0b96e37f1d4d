//! Compilation: directive checks, lexing, parsing and name resolution.
//!
//! A script that compiles is guaranteed to reference only names that exist (builtins, DSL calls, referenced
//! libraries and their members, or user bindings in scope) and to call builtins and DSL shapes with a valid number
//! of arguments. Everything else is left to runtime.

use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use specrun_core::lang::builtins::{self, BUILTIN_FUNCTIONS};
use specrun_core::lang::dsl::{CallShape, DSL_CALLS, DslCallInfo};
use specrun_syntax::ast::{Block, CallExpr, ElseBranch, Expr, FunctionDef, IfStmt, Program, Span, Spanned, Stmt};
use specrun_syntax::diagnostics::{CompileError, errors};
use specrun_syntax::{lexer, parser};

use super::HostFault;
use super::natives::{self, NativeLibrary};
use super::origin::ScriptOrigin;
use crate::source::{DirectiveProblemKind, SourceUnit};

/// A compile error resolved to its owning file.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileDiagnostic {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
    pub error: CompileError,
}

impl std::fmt::Display for CompileDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}: {}", self.file.display(), self.line, self.column, self.error)
    }
}

/// The reusable product of compiling one unit.
#[derive(Debug)]
pub struct CompiledScript {
    pub program: Program,
    pub origin: Rc<ScriptOrigin>,
    pub libraries: Vec<&'static NativeLibrary>,
    /// Content fingerprint of every file that went into the unit.
    pub fingerprint: String,
}

/// Compile a resolved unit.
///
/// ## Errors
/// - [`HostFault::Source`] if an included file could not be read.
/// - [`HostFault::Compile`] for directive, syntax and name resolution errors, all reported together.
#[tracing::instrument(skip_all, fields(root = %unit.root.display()))]
pub fn compile(unit: &SourceUnit) -> Result<CompiledScript, HostFault> {
    if let Some(missing) = unit
        .problems
        .iter()
        .find(|p| p.kind == DirectiveProblemKind::MissingInclude)
    {
        return Err(HostFault::Source {
            message: format!("{}:{}: {}", missing.file.display(), missing.line, missing.message),
        });
    }

    let origin = Rc::new(ScriptOrigin::new(unit));
    let mut errors: Vec<CompileError> = Vec::new();

    for problem in &unit.problems {
        let span = unit_line_span(unit, &problem.file, problem.line);
        errors.push(CompileError::new(problem.message.clone(), span));
    }

    let mut libraries = Vec::new();
    for reference in unit.references.iter().filter(|r| !r.is_package) {
        match natives::library(&reference.name) {
            Some(library) => {
                if !libraries.iter().any(|l: &&NativeLibrary| l.name == library.name) {
                    libraries.push(library);
                }
            }
            None => {
                let span = unit_line_span(unit, &reference.file, reference.line);
                errors.push(
                    CompileError::resolve(format!("Unknown reference '{}'", reference.name), span)
                        .with_hint("Available libraries: math, strings. Package references use the `pkg:` prefix."),
                );
            }
        }
    }
    for reference in unit.references.iter().filter(|r| r.is_package) {
        tracing::debug!(reference = %reference.name, "skipping package reference");
    }

    let program = match lexer::lex(&unit.text) {
        Ok(tokens) => match parser::parse(&tokens) {
            Ok(program) => Some(program),
            Err(parse_errors) => {
                errors.extend(parse_errors);
                None
            }
        },
        Err(lex_errors) => {
            errors.extend(lex_errors);
            None
        }
    };

    if let Some(program) = &program {
        errors.extend(resolve_names(program, &libraries));
    }

    match program {
        Some(program) if errors.is_empty() => Ok(CompiledScript {
            program,
            origin,
            libraries,
            fingerprint: unit.fingerprint(),
        }),
        _ => Err(compile_fault(&origin, errors)),
    }
}

fn compile_fault(origin: &ScriptOrigin, errors: Vec<CompileError>) -> HostFault {
    let mut diagnostics: Vec<CompileDiagnostic> = errors
        .into_iter()
        .map(|error| {
            let location = origin.locate(error.span);
            CompileDiagnostic {
                file: location.file,
                line: location.line,
                column: location.column,
                error,
            }
        })
        .collect();
    diagnostics.sort_by_key(|d| d.error.span.start);

    let message = match diagnostics.as_slice() {
        [] => "compilation failed".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{} (and {} more)", first, rest.len()),
    };
    HostFault::Compile {
        message,
        diagnostics,
        unit_text: Arc::clone(&origin.text),
    }
}

/// Span of a whole line of the unit, given its owning file and line.
fn unit_line_span(unit: &SourceUnit, file: &std::path::Path, line: usize) -> Span {
    let Some(unit_line) = unit.line_map.unit_line(file, line) else {
        return Span::default();
    };
    let start: usize = unit
        .text
        .split_inclusive('\n')
        .take(unit_line - 1)
        .map(str::len)
        .sum();
    let len = unit.text[start..].find('\n').unwrap_or(unit.text.len() - start);
    Span::new(start, start + len)
}

// ============================================================================
// Name resolution
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Symbol {
    Builtin(&'static builtins::BuiltinFnInfo),
    Dsl(&'static DslCallInfo),
    Library(&'static NativeLibrary),
    Local,
}

struct NameResolver {
    scopes: Vec<HashMap<String, Symbol>>,
    errors: Vec<CompileError>,
    function_depth: usize,
    loop_depth: usize,
}

fn resolve_names(program: &Program, libraries: &[&'static NativeLibrary]) -> Vec<CompileError> {
    let mut globals = HashMap::new();
    for info in BUILTIN_FUNCTIONS {
        globals.insert(info.canonical.to_string(), Symbol::Builtin(info));
    }
    for info in DSL_CALLS {
        globals.insert(info.canonical.to_string(), Symbol::Dsl(info));
        for alias in info.aliases {
            globals.insert(alias.to_string(), Symbol::Dsl(info));
        }
    }
    for library in libraries {
        globals.insert(library.name.to_string(), Symbol::Library(library));
    }

    let mut resolver = NameResolver {
        scopes: vec![globals],
        errors: Vec::new(),
        function_depth: 0,
        loop_depth: 0,
    };
    resolver.statements(&program.statements);
    resolver.errors
}

impl NameResolver {
    fn lookup(&self, name: &str) -> Option<Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name).copied())
    }

    fn declare(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), Symbol::Local);
        }
    }

    /// Resolve statements in a fresh scope, hoisting function declarations first.
    fn statements(&mut self, statements: &[Spanned<Stmt>]) {
        self.scopes.push(HashMap::new());

        let mut declared: Vec<&str> = Vec::new();
        for stmt in statements {
            if let Stmt::Fn(def) = &stmt.node {
                if let Some(name) = def.name.as_deref() {
                    if declared.contains(&name) {
                        self.errors.push(errors::duplicate_function(name, stmt.span));
                    }
                    declared.push(name);
                    self.declare(name);
                }
            }
        }

        for stmt in statements {
            self.statement(stmt);
        }
        self.scopes.pop();
    }

    fn block(&mut self, block: &Block) {
        self.statements(&block.statements);
    }

    fn statement(&mut self, stmt: &Spanned<Stmt>) {
        match &stmt.node {
            Stmt::Let(let_stmt) => {
                if let Some(value) = &let_stmt.value {
                    self.expr(value);
                }
                self.declare(&let_stmt.name.node);
            }
            Stmt::Assign(assign) => {
                self.expr(&assign.target);
                self.expr(&assign.value);
            }
            Stmt::Fn(def) => self.function(def),
            Stmt::If(if_stmt) => self.if_stmt(if_stmt),
            Stmt::While(while_stmt) => {
                self.expr(&while_stmt.condition);
                self.loop_body(&while_stmt.body, None);
            }
            Stmt::For(for_stmt) => {
                self.expr(&for_stmt.iterable);
                self.loop_body(&for_stmt.body, Some(&for_stmt.binding.node));
            }
            Stmt::Return(value) => {
                if self.function_depth == 0 {
                    self.errors
                        .push(CompileError::syntax("'return' outside of a function".to_string(), stmt.span));
                }
                if let Some(value) = value {
                    self.expr(value);
                }
            }
            Stmt::Throw(value) => self.expr(value),
            Stmt::Break | Stmt::Continue => {
                if self.loop_depth == 0 {
                    let keyword = if matches!(stmt.node, Stmt::Break) { "break" } else { "continue" };
                    self.errors
                        .push(CompileError::syntax(format!("'{}' outside of a loop", keyword), stmt.span));
                }
            }
            Stmt::Expr(expr) => self.expr(expr),
        }
    }

    fn if_stmt(&mut self, if_stmt: &IfStmt) {
        self.expr(&if_stmt.condition);
        self.block(&if_stmt.then_block);
        match &if_stmt.else_branch {
            Some(ElseBranch::If(nested)) => self.if_stmt(&nested.node),
            Some(ElseBranch::Block(block)) => self.block(block),
            None => {}
        }
    }

    fn loop_body(&mut self, body: &Block, binding: Option<&str>) {
        self.scopes.push(HashMap::new());
        if let Some(binding) = binding {
            self.declare(binding);
        }
        self.loop_depth += 1;
        self.block(body);
        self.loop_depth -= 1;
        self.scopes.pop();
    }

    fn function(&mut self, def: &FunctionDef) {
        self.scopes.push(HashMap::new());
        for param in &def.params {
            self.declare(&param.node);
        }
        let outer_loops = std::mem::replace(&mut self.loop_depth, 0);
        self.function_depth += 1;
        self.block(&def.body);
        self.function_depth -= 1;
        self.loop_depth = outer_loops;
        self.scopes.pop();
    }

    fn expr(&mut self, expr: &Spanned<Expr>) {
        match &expr.node {
            Expr::Literal(_) => {}
            Expr::Ident(name) => {
                if self.lookup(name).is_none() {
                    self.errors.push(errors::unknown_symbol(name, expr.span));
                }
            }
            Expr::List(items) => items.iter().for_each(|item| self.expr(item)),
            Expr::Unary(_, operand) => self.expr(operand),
            Expr::Binary(lhs, _, rhs) => {
                self.expr(lhs);
                self.expr(rhs);
            }
            Expr::Call(call) => self.call(call, expr.span),
            Expr::Index(target, index) => {
                self.expr(target);
                self.expr(index);
            }
            Expr::Field(target, field) => {
                self.expr(target);
                if let Expr::Ident(name) = &target.node {
                    if let Some(Symbol::Library(library)) = self.lookup(name) {
                        if library.function(&field.node).is_none() {
                            self.errors
                                .push(errors::unknown_symbol(&format!("{}.{}", name, field.node), field.span));
                        }
                    }
                }
            }
            Expr::Lambda(def) => self.function(def),
            Expr::Paren(inner) => self.expr(inner),
        }
    }

    fn call(&mut self, call: &CallExpr, span: Span) {
        self.expr(&call.callee);
        for arg in &call.args {
            self.expr(arg);
        }
        if let Some(trailing) = &call.trailing {
            self.function(trailing);
        }

        let argc = call.arity();
        match &call.callee.node {
            Expr::Ident(name) => match self.lookup(name) {
                Some(Symbol::Builtin(info)) if !info.accepts(argc) => {
                    self.errors.push(errors::wrong_arity(name, &info.expected(), argc, span));
                }
                Some(Symbol::Dsl(info)) => {
                    if let Some(expected) = dsl_arity_mismatch(info.shape, argc) {
                        self.errors.push(errors::wrong_arity(name, expected, argc, span));
                    }
                }
                _ => {}
            },
            Expr::Field(target, field) => {
                if let Expr::Ident(name) = &target.node {
                    if let Some(Symbol::Library(library)) = self.lookup(name) {
                        if let Some(native) = library.function(&field.node) {
                            if !native.accepts(argc) {
                                let qualified = format!("{}.{}", name, field.node);
                                self.errors
                                    .push(errors::wrong_arity(&qualified, &native.expected(), argc, span));
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

/// Expected-arity text when `argc` does not fit a DSL call shape.
fn dsl_arity_mismatch(shape: CallShape, argc: usize) -> Option<&'static str> {
    match shape {
        CallShape::BeginContext if argc != 2 => Some("2 (a description and a block)"),
        CallShape::LeafSpec if !(1..=2).contains(&argc) => Some("1 to 2 (a description and an optional body)"),
        CallShape::Hook(_) if argc != 1 => Some("1 (a block)"),
        CallShape::TagScope if argc < 2 => Some("at least 2 (tags and a block)"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source;
    use std::path::Path;

    fn compile_text(dir: &Path, text: &str) -> Result<CompiledScript, HostFault> {
        let path = dir.join("unit.spec");
        std::fs::write(&path, text).unwrap();
        compile(&source::resolve(&path).unwrap())
    }

    fn messages(fault: HostFault) -> Vec<String> {
        match fault {
            HostFault::Compile { diagnostics, .. } => diagnostics.into_iter().map(|d| d.error.message).collect(),
            other => panic!("expected compile fault, got {:?}", other),
        }
    }

    #[test]
    fn valid_script_compiles() {
        let dir = tempfile::tempdir().unwrap();
        let script = compile_text(
            dir.path(),
            "#ref \"math\"\nfn twice(x) { return x * 2 }\ncontext(\"A\") { spec(\"b\") { assert_eq(math.abs(twice(-1)), 2) } }\n",
        )
        .unwrap();
        assert_eq!(script.libraries.len(), 1);
        assert_eq!(script.program.statements.len(), 2);
    }

    #[test]
    fn hoisted_functions_resolve_before_declaration() {
        let dir = tempfile::tempdir().unwrap();
        assert!(compile_text(dir.path(), "spec(\"x\") { helper() }\nfn helper() {}\n").is_ok());
    }

    #[test]
    fn unknown_symbols_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let fault = compile_text(dir.path(), "spec(\"x\") { missing_helper() }\nlet y = undefined_value\n").unwrap_err();
        let messages = messages(fault);
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("missing_helper"));
        assert!(messages[1].contains("undefined_value"));
    }

    #[test]
    fn let_binding_is_not_visible_in_its_own_initializer() {
        let dir = tempfile::tempdir().unwrap();
        assert!(compile_text(dir.path(), "let x = x + 1").is_err());
    }

    #[test]
    fn arity_errors() {
        let dir = tempfile::tempdir().unwrap();
        let fault = compile_text(dir.path(), "assert_eq(1)\ncontext(\"no block\")\nbefore_each()\n").unwrap_err();
        let messages = messages(fault);
        assert_eq!(messages.len(), 3, "{:?}", messages);
        assert!(messages[0].contains("'assert_eq' expects 2 to 3"));
    }

    #[test]
    fn duplicate_functions_and_misplaced_control_flow() {
        let dir = tempfile::tempdir().unwrap();
        let fault = compile_text(dir.path(), "fn a() {}\nfn a() {}\nbreak\nreturn 1\n").unwrap_err();
        let messages = messages(fault);
        assert_eq!(messages.len(), 3, "{:?}", messages);
        assert!(messages[0].contains("defined more than once"));
    }

    #[test]
    fn break_inside_closure_inside_loop_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(compile_text(dir.path(), "for x in [1] { let f = fn() { break } }").is_err());
        assert!(compile_text(dir.path(), "for x in [1] { if x == 1 { break } }").is_ok());
    }

    #[test]
    fn user_definitions_shadow_dsl_names() {
        let dir = tempfile::tempdir().unwrap();
        // A user-defined `spec` takes three arguments without tripping the DSL arity check.
        assert!(compile_text(dir.path(), "fn spec(a, b, c) {}\nspec(1, 2, 3)\n").is_ok());
    }

    #[test]
    fn references_are_checked() {
        let dir = tempfile::tempdir().unwrap();
        assert!(compile_text(dir.path(), "#ref \"pkg:anything\"\nspec(\"a\")\n").is_ok());

        let fault = compile_text(dir.path(), "#ref \"nosuchlib\"\nspec(\"a\")\n").unwrap_err();
        assert!(messages(fault)[0].contains("Unknown reference 'nosuchlib'"));

        let fault = compile_text(dir.path(), "#ref \"math\"\nmath.nope(1)\n").unwrap_err();
        assert!(messages(fault)[0].contains("math.nope"));

        let fault = compile_text(dir.path(), "math.abs(1)\n").unwrap_err();
        assert!(messages(fault)[0].contains("'math'"));
    }

    #[test]
    fn syntax_errors_map_to_file_lines() {
        let dir = tempfile::tempdir().unwrap();
        let fault = compile_text(dir.path(), "// header\n\ncontext(\"A\" {\n").unwrap_err();
        match fault {
            HostFault::Compile { diagnostics, message, .. } => {
                assert_eq!(diagnostics[0].line, 3);
                assert!(diagnostics[0].file.ends_with("unit.spec"));
                assert!(message.contains(":3:"));
            }
            other => panic!("expected compile fault, got {:?}", other),
        }
    }

    #[test]
    fn missing_include_is_a_source_fault() {
        let dir = tempfile::tempdir().unwrap();
        let fault = compile_text(dir.path(), "#load \"gone.spec\"\n").unwrap_err();
        assert!(matches!(fault, HostFault::Source { .. }));
    }

    #[test]
    fn unknown_directive_is_a_compile_error_on_its_line() {
        let dir = tempfile::tempdir().unwrap();
        let fault = compile_text(dir.path(), "spec(\"a\")\n#pragma \"x\"\n").unwrap_err();
        match fault {
            HostFault::Compile { diagnostics, .. } => {
                assert_eq!(diagnostics.len(), 1);
                assert_eq!(diagnostics[0].line, 2);
            }
            other => panic!("expected compile fault, got {:?}", other),
        }
    }
}
