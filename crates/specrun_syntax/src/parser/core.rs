/// Parser core types and entrypoint.
///
/// This chunk defines the [`Parser`] type and its top-level `parse()` entrypoint.
///
/// ## Notes
/// - This file is `include!`'d into `crate::parser` to keep all parser methods in a
///   single module while avoiding a single "god file".
///
/// Parser state.
///
/// ## Notes
/// - The parser is single-pass and recovers from errors by synchronizing at statement
///   boundaries, so one pass reports every independent syntax error.
/// - `no_trailing_block` is set while parsing `if`/`while`/`for` headers, where a `{`
///   opens the statement body rather than a trailing-block argument.
/// - `depth` counts open expressions and blocks; past [`MAX_NESTING_DEPTH`] the parser reports an error instead
///   of recursing further.
pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    errors: Vec<CompileError>,
    no_trailing_block: bool,
    depth: usize,
}

/// Deepest nesting of expressions and blocks a script may use.
///
/// Later stages (name resolution, evaluation) walk the tree recursively, so this bound keeps them within the
/// stack as well.
pub const MAX_NESTING_DEPTH: usize = 64;

impl<'a> Parser<'a> {
    /// Create a new parser for a token stream.
    ///
    /// ## Parameters
    /// - `tokens`: Token stream produced by `specrun_syntax::lexer`. It must end with `Eof`.
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
            no_trailing_block: false,
            depth: 0,
        }
    }

    /// Parse the entire token stream into a [`Program`].
    ///
    /// ## Errors
    /// Returns a list of [`CompileError`]s if parsing fails. The parser attempts
    /// to recover and continue after an error to report multiple issues in one pass.
    pub fn parse(mut self) -> Result<Program, Vec<CompileError>> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            match self.statement() {
                Ok(stmt) => statements.push(stmt),
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize(false);
                }
            }
        }

        if self.errors.is_empty() {
            Ok(Program { statements })
        } else {
            Err(self.errors)
        }
    }

    /// Run `f` one nesting level deeper.
    fn descend<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, CompileError>) -> Result<T, CompileError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(CompileError::syntax(
                "Expression nested too deeply".to_string(),
                self.current_span(),
            )
            .with_note(format!("at most {} levels of nesting are allowed", MAX_NESTING_DEPTH)));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}
