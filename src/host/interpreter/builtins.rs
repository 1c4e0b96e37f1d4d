//! Core builtin functions and DSL calls.

use std::rc::Rc;

use specrun_core::lang::builtins::{self, BuiltinFnId};
use specrun_core::lang::dsl::{CallShape, DslCallInfo};
use specrun_syntax::ast::Span;

use super::{Closure, Interpreter, RuntimeError, Value};

/// Largest list `range` will build.
const MAX_RANGE_LEN: i64 = 10_000_000;

impl<'b> Interpreter<'b> {
    pub(super) fn call_builtin(&mut self, id: BuiltinFnId, args: Vec<Value>, span: Span) -> Result<Value, RuntimeError> {
        let info = builtins::info_for(id);
        if !info.accepts(args.len()) {
            let message = format!(
                "'{}' expects {} argument(s), found {}",
                info.canonical,
                info.expected(),
                args.len()
            );
            return Err(self.error_at(span, message));
        }

        let outcome = match id {
            BuiltinFnId::Print => {
                let parts: Vec<String> = args.iter().map(Value::to_string).collect();
                eprintln!("{}", parts.join(" "));
                Ok(Value::Nil)
            }
            BuiltinFnId::Len => match &args[0] {
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                Value::List(items) => Ok(Value::Int(items.borrow().len() as i64)),
                other => Err(format!("len() of {}", other.type_name())),
            },
            BuiltinFnId::Str => Ok(Value::str(args[0].to_string())),
            BuiltinFnId::Assert => {
                if args[0].is_truthy() {
                    Ok(Value::Nil)
                } else {
                    Err(with_detail("assertion failed".to_string(), args.get(1)))
                }
            }
            BuiltinFnId::AssertEq => {
                if args[0] == args[1] {
                    Ok(Value::Nil)
                } else {
                    let message = format!("expected {} but got {}", args[1].repr(), args[0].repr());
                    Err(with_detail(message, args.get(2)))
                }
            }
            BuiltinFnId::AssertNe => {
                if args[0] != args[1] {
                    Ok(Value::Nil)
                } else {
                    let message = format!("expected a value other than {}", args[1].repr());
                    Err(with_detail(message, args.get(2)))
                }
            }
            BuiltinFnId::Fail => Err(args.first().map_or_else(|| "failed".to_string(), Value::to_string)),
            BuiltinFnId::Push => match &args[0] {
                Value::List(items) => {
                    items.borrow_mut().push(args[1].clone());
                    Ok(Value::Nil)
                }
                other => Err(format!("push() expects a list, got {}", other.type_name())),
            },
            BuiltinFnId::Range => range(&args),
            BuiltinFnId::Contains => match (&args[0], &args[1]) {
                (Value::List(items), needle) => Ok(Value::Bool(items.borrow().iter().any(|v| v == needle))),
                (Value::Str(haystack), Value::Str(needle)) => Ok(Value::Bool(haystack.contains(needle.as_ref()))),
                (other, _) => Err(format!("contains() expects a list or string, got {}", other.type_name())),
            },
        };

        outcome.map_err(|message| self.error_at(span, message))
    }

    pub(super) fn call_dsl(
        &mut self,
        info: &'static DslCallInfo,
        args: Vec<Value>,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        if self.builder.is_none() {
            let message = format!("'{}' cannot be used while specs are running", info.canonical);
            return Err(self.error_at(span, message));
        }
        let line = self.current_origin().map_or(0, |origin| origin.line_of(span));

        match info.shape {
            CallShape::BeginContext => {
                let [description, block] = self.dsl_args::<2>(info, args, span)?;
                let description = self.description(info, description, span)?;
                let block = self.block_arg(info, block, span)?;
                if let Some(builder) = self.builder_mut() {
                    builder.begin_context(description, info.variant, line);
                }
                let result = self.call_closure(&block, Vec::new(), span);
                if let Some(builder) = self.builder_mut() {
                    builder.end_context();
                }
                result?;
            }
            CallShape::LeafSpec => {
                if !(1..=2).contains(&args.len()) {
                    let message = format!("'{}' expects 1 to 2 argument(s), found {}", info.canonical, args.len());
                    return Err(self.error_at(span, message));
                }
                let mut args = args.into_iter();
                let description = match args.next() {
                    Some(description) => self.description(info, description, span)?,
                    None => return Err(self.error_at(span, "missing description")),
                };
                let body = match args.next() {
                    None | Some(Value::Nil) => None,
                    Some(value) => Some(self.block_arg(info, value, span)?),
                };
                if let Some(builder) = self.builder_mut() {
                    builder.add_spec(description, info.variant, line, body);
                }
            }
            CallShape::Hook(kind) => {
                let [block] = self.dsl_args::<1>(info, args, span)?;
                let block = self.block_arg(info, block, span)?;
                if let Some(builder) = self.builder_mut() {
                    builder.add_hook(kind, block);
                }
            }
            CallShape::TagScope => {
                let mut args = args;
                let block = match args.pop() {
                    Some(block) if !args.is_empty() => self.block_arg(info, block, span)?,
                    _ => {
                        let message = format!("'{}' expects at least one tag and a block", info.canonical);
                        return Err(self.error_at(span, message));
                    }
                };
                let mut tags = Vec::with_capacity(args.len());
                for tag in args {
                    tags.push(self.description(info, tag, span)?);
                }
                if let Some(builder) = self.builder_mut() {
                    builder.push_tags(tags);
                }
                let result = self.call_closure(&block, Vec::new(), span);
                if let Some(builder) = self.builder_mut() {
                    builder.pop_tags();
                }
                result?;
            }
        }
        Ok(Value::Nil)
    }

    fn dsl_args<const N: usize>(
        &mut self,
        info: &DslCallInfo,
        args: Vec<Value>,
        span: Span,
    ) -> Result<[Value; N], RuntimeError> {
        let found = args.len();
        <[Value; N]>::try_from(args).map_err(|_| {
            let message = format!("'{}' expects {} argument(s), found {}", info.canonical, N, found);
            self.error_at(span, message)
        })
    }

    fn description(&mut self, info: &DslCallInfo, value: Value, span: Span) -> Result<String, RuntimeError> {
        match value {
            Value::Str(s) => Ok(s.to_string()),
            other => {
                let message = format!("'{}' expects a string, got {}", info.canonical, other.type_name());
                Err(self.error_at(span, message))
            }
        }
    }

    fn block_arg(&mut self, info: &DslCallInfo, value: Value, span: Span) -> Result<Rc<Closure>, RuntimeError> {
        match value {
            Value::Function(closure) if closure.def.params.is_empty() => Ok(closure),
            Value::Function(closure) => {
                let message = format!(
                    "'{}' block must take no parameters, '{}' takes {}",
                    info.canonical,
                    closure.name(),
                    closure.def.params.len()
                );
                Err(self.error_at(span, message))
            }
            other => {
                let message = format!("'{}' expects a block, got {}", info.canonical, other.type_name());
                Err(self.error_at(span, message))
            }
        }
    }
}

fn with_detail(message: String, detail: Option<&Value>) -> String {
    match detail {
        Some(detail) => format!("{}: {}", message, detail),
        None => message,
    }
}

fn range(args: &[Value]) -> Result<Value, String> {
    let ints: Vec<i64> = args
        .iter()
        .map(|v| match v {
            Value::Int(i) => Ok(*i),
            other => Err(format!("range() expects ints, got {}", other.type_name())),
        })
        .collect::<Result<_, _>>()?;
    let (start, end) = match ints.as_slice() {
        [end] => (0, *end),
        [start, end] => (*start, *end),
        _ => return Err("range() expects 1 or 2 arguments".to_string()),
    };
    if end.saturating_sub(start) > MAX_RANGE_LEN {
        return Err(format!("range() longer than {} elements", MAX_RANGE_LEN));
    }
    Ok(Value::list((start..end).map(Value::Int).collect()))
}
