//! Expression evaluation and calls.

use std::rc::Rc;
use std::sync::Arc;

use specrun_syntax::ast::{BinaryOp, CallExpr, Expr, FunctionDef, Literal, Span, Spanned, UnaryOp};

use super::{Closure, Env, Interpreter, MAX_CALL_DEPTH, RuntimeError, Scope, Value};
use super::{Flow, Frame};

impl<'b> Interpreter<'b> {
    pub(super) fn eval(&mut self, expr: &Spanned<Expr>, env: &Env) -> Result<Value, RuntimeError> {
        match &expr.node {
            Expr::Literal(literal) => Ok(match literal {
                Literal::Int(i) => Value::Int(*i),
                Literal::Float(f) => Value::Float(*f),
                Literal::String(s) => Value::str(s),
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Nil => Value::Nil,
            }),
            Expr::Ident(name) => match env.get(name) {
                Some(value) => Ok(value),
                None => Err(self.error_at(expr.span, format!("Unknown symbol '{}'", name))),
            },
            Expr::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item, env)?);
                }
                Ok(Value::list(values))
            }
            Expr::Unary(op, operand) => {
                let value = self.eval(operand, env)?;
                match (op, value) {
                    (UnaryOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
                    (UnaryOp::Neg, Value::Int(i)) => i
                        .checked_neg()
                        .map(Value::Int)
                        .ok_or_else(|| self.error_at(expr.span, "integer overflow")),
                    (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
                    (UnaryOp::Neg, other) => {
                        let message = format!("cannot negate {}", other.type_name());
                        Err(self.error_at(expr.span, message))
                    }
                }
            }
            Expr::Binary(lhs, BinaryOp::And, rhs) => {
                let left = self.eval(lhs, env)?.is_truthy();
                Ok(Value::Bool(left && self.eval(rhs, env)?.is_truthy()))
            }
            Expr::Binary(lhs, BinaryOp::Or, rhs) => {
                let left = self.eval(lhs, env)?.is_truthy();
                Ok(Value::Bool(left || self.eval(rhs, env)?.is_truthy()))
            }
            Expr::Binary(lhs, op, rhs) => {
                let left = self.eval(lhs, env)?;
                let right = self.eval(rhs, env)?;
                binary(*op, &left, &right).map_err(|message| self.error_at(expr.span, message))
            }
            Expr::Call(call) => self.eval_call(call, expr.span, env),
            Expr::Index(target, index) => {
                let target = self.eval(target, env)?;
                let index = self.eval(index, env)?;
                index_value(&target, &index).map_err(|message| self.error_at(expr.span, message))
            }
            Expr::Field(target, field) => {
                let target = self.eval(target, env)?;
                match target {
                    Value::Library(lib) => lib.function(&field.node).map(Value::Native).ok_or_else(|| {
                        self.error_at(field.span, format!("Library '{}' has no function '{}'", lib.name, field.node))
                    }),
                    other => {
                        let message = format!("{} has no field '{}'", other.type_name(), field.node);
                        Err(self.error_at(field.span, message))
                    }
                }
            }
            Expr::Lambda(def) => Ok(self.make_closure(Arc::clone(def), env)),
            Expr::Paren(inner) => self.eval(inner, env),
        }
    }

    pub(super) fn make_closure(&self, def: Arc<FunctionDef>, env: &Env) -> Value {
        let origin = Rc::clone(
            self.current_origin()
                .expect("INVARIANT: closures are only created while a frame is active"),
        );
        Value::Function(Rc::new(Closure {
            def,
            env: Rc::clone(env),
            origin,
        }))
    }

    fn eval_call(&mut self, call: &CallExpr, span: Span, env: &Env) -> Result<Value, RuntimeError> {
        let callee = self.eval(&call.callee, env)?;
        let mut args = Vec::with_capacity(call.arity());
        for arg in &call.args {
            args.push(self.eval(arg, env)?);
        }
        if let Some(trailing) = &call.trailing {
            args.push(self.make_closure(Arc::clone(trailing), env));
        }
        self.call_value(callee, args, span)
    }

    pub(super) fn call_value(&mut self, callee: Value, args: Vec<Value>, span: Span) -> Result<Value, RuntimeError> {
        match callee {
            Value::Function(closure) => self.call_closure(&closure, args, span),
            Value::Builtin(id) => self.call_builtin(id, args, span),
            Value::Dsl(info) => self.call_dsl(info, args, span),
            Value::Native(native) => {
                if !native.accepts(args.len()) {
                    let message = format!(
                        "'{}' expects {} argument(s), found {}",
                        native.name,
                        native.expected(),
                        args.len()
                    );
                    return Err(self.error_at(span, message));
                }
                (native.call)(&args).map_err(|message| self.error_at(span, message))
            }
            other => {
                let message = format!("{} is not callable", other.type_name());
                Err(self.error_at(span, message))
            }
        }
    }

    pub(super) fn call_closure(
        &mut self,
        closure: &Rc<Closure>,
        args: Vec<Value>,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        let params = &closure.def.params;
        if params.len() != args.len() {
            let message = format!(
                "'{}' expects {} argument(s), found {}",
                closure.name(),
                params.len(),
                args.len()
            );
            return Err(self.error_at(span, message));
        }
        if self.frames.len() >= MAX_CALL_DEPTH {
            return Err(self.error_at(span, "maximum call depth exceeded"));
        }

        let scope = Scope::child(&closure.env);
        for (param, arg) in params.iter().zip(args) {
            scope.define(param.node.clone(), arg);
        }

        self.frames.push(Frame {
            name: closure.name().to_string(),
            origin: Rc::clone(&closure.origin),
            span: closure.def.span,
        });
        let result = self.exec_statements(&closure.def.body.statements, &scope);
        match result {
            Ok(flow) => {
                self.frames.pop();
                Ok(match flow {
                    Flow::Return(value) => value,
                    Flow::Next | Flow::Break | Flow::Continue => Value::Nil,
                })
            }
            Err(err) => {
                self.frames.pop();
                Err(err)
            }
        }
    }

    pub(super) fn assign(&mut self, target: &Spanned<Expr>, value: Value, env: &Env) -> Result<(), RuntimeError> {
        match &target.node {
            Expr::Ident(name) => {
                if env.assign(name, value) {
                    Ok(())
                } else {
                    Err(self.error_at(target.span, format!("Unknown symbol '{}'", name)))
                }
            }
            Expr::Index(list, index) => {
                let list = self.eval(list, env)?;
                let index = self.eval(index, env)?;
                let items = match list {
                    Value::List(items) => items,
                    other => {
                        let message = format!("cannot assign into {}", other.type_name());
                        return Err(self.error_at(target.span, message));
                    }
                };
                let slot = list_index(&index, items.borrow().len());
                match slot {
                    Ok(i) => {
                        items.borrow_mut()[i] = value;
                        Ok(())
                    }
                    Err(message) => Err(self.error_at(target.span, message)),
                }
            }
            _ => Err(self.error_at(target.span, "invalid assignment target")),
        }
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, String> {
    use Value::{Float, Int, Str};

    let mismatch = || {
        format!(
            "unsupported operand types for {}: {} and {}",
            op,
            left.type_name(),
            right.type_name()
        )
    };

    match op {
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::NotEq => Ok(Value::Bool(left != right)),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = match (left, right) {
                (Str(a), Str(b)) => a.cmp(b),
                _ => {
                    let (a, b) = numbers(left, right).ok_or_else(mismatch)?;
                    a.partial_cmp(&b).ok_or_else(|| "cannot compare NaN".to_string())?
                }
            };
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::LtEq => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        BinaryOp::Add => match (left, right) {
            (Int(a), Int(b)) => a.checked_add(*b).map(Int).ok_or_else(|| "integer overflow".to_string()),
            (Str(_), _) | (_, Str(_)) => Ok(Value::str(format!("{}{}", left, right))),
            (Value::List(a), Value::List(b)) => {
                let mut items = a.borrow().clone();
                items.extend(b.borrow().iter().cloned());
                Ok(Value::list(items))
            }
            _ => numbers(left, right).map(|(a, b)| Float(a + b)).ok_or_else(mismatch),
        },
        BinaryOp::Sub => match (left, right) {
            (Int(a), Int(b)) => a.checked_sub(*b).map(Int).ok_or_else(|| "integer overflow".to_string()),
            _ => numbers(left, right).map(|(a, b)| Float(a - b)).ok_or_else(mismatch),
        },
        BinaryOp::Mul => match (left, right) {
            (Int(a), Int(b)) => a.checked_mul(*b).map(Int).ok_or_else(|| "integer overflow".to_string()),
            _ => numbers(left, right).map(|(a, b)| Float(a * b)).ok_or_else(mismatch),
        },
        BinaryOp::Div => match (left, right) {
            (Int(_), Int(0)) => Err("division by zero".to_string()),
            (Int(a), Int(b)) => a.checked_div(*b).map(Int).ok_or_else(|| "integer overflow".to_string()),
            _ => numbers(left, right).map(|(a, b)| Float(a / b)).ok_or_else(mismatch),
        },
        BinaryOp::Mod => match (left, right) {
            (Int(_), Int(0)) => Err("division by zero".to_string()),
            (Int(a), Int(b)) => a.checked_rem(*b).map(Int).ok_or_else(|| "integer overflow".to_string()),
            _ => numbers(left, right).map(|(a, b)| Float(a % b)).ok_or_else(mismatch),
        },
        // Short-circuiting operators are evaluated before operands reach this point.
        BinaryOp::And => Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
        BinaryOp::Or => Ok(Value::Bool(left.is_truthy() || right.is_truthy())),
    }
}

fn numbers(left: &Value, right: &Value) -> Option<(f64, f64)> {
    let as_f64 = |v: &Value| match v {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    };
    Some((as_f64(left)?, as_f64(right)?))
}

fn list_index(index: &Value, len: usize) -> Result<usize, String> {
    match index {
        Value::Int(i) => usize::try_from(*i)
            .ok()
            .filter(|i| *i < len)
            .ok_or_else(|| format!("index {} out of range for length {}", i, len)),
        other => Err(format!("index must be an int, got {}", other.type_name())),
    }
}

fn index_value(target: &Value, index: &Value) -> Result<Value, String> {
    match target {
        Value::List(items) => {
            let items = items.borrow();
            let i = list_index(index, items.len())?;
            Ok(items[i].clone())
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = list_index(index, chars.len())?;
            Ok(Value::str(chars[i].to_string()))
        }
        other => Err(format!("cannot index into {}", other.type_name())),
    }
}
