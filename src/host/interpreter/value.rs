//! Runtime values and lexical environments.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use specrun_core::lang::builtins::{self, BuiltinFnId};
use specrun_core::lang::dsl::DslCallInfo;
use specrun_syntax::ast::FunctionDef;

use crate::host::natives::{NativeFn, NativeLibrary};
use crate::host::origin::ScriptOrigin;

/// A dynamically typed script value.
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<RefCell<Vec<Value>>>),
    Function(Rc<Closure>),
    Builtin(BuiltinFnId),
    Dsl(&'static DslCallInfo),
    Native(&'static NativeFn),
    Library(&'static NativeLibrary),
}

impl Value {
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    /// `nil` and `false` are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Function(_) | Value::Builtin(_) | Value::Dsl(_) | Value::Native(_) => "function",
            Value::Library(_) => "library",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Quoted rendering used inside lists and assertion messages.
    pub fn repr(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_repr(&mut out, &mut Vec::new());
        out
    }

    fn write_repr(&self, f: &mut impl fmt::Write, open: &mut Vec<ListPtr>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s.as_ref()),
            other => other.write_plain(f, open),
        }
    }

    /// `open` holds the lists currently being rendered; a list that reaches itself renders as `[...]`.
    fn write_plain(&self, f: &mut impl fmt::Write, open: &mut Vec<ListPtr>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => {
                if x.fract() == 0.0 && x.is_finite() {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{}", x)
                }
            }
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                let ptr = Rc::as_ptr(items);
                if open.contains(&ptr) {
                    return write!(f, "[...]");
                }
                open.push(ptr);
                write!(f, "[")?;
                for (idx, item) in items.borrow().iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    item.write_repr(f, open)?;
                }
                open.pop();
                write!(f, "]")
            }
            Value::Function(closure) => write!(f, "<fn {}>", closure.name()),
            Value::Builtin(id) => write!(f, "<builtin {}>", builtins::as_str(*id)),
            Value::Dsl(info) => write!(f, "<builtin {}>", info.canonical),
            Value::Native(native) => write!(f, "<fn {}>", native.name),
            Value::Library(lib) => write!(f, "<library {}>", lib.name),
        }
    }

    /// Structural equality. A pair of lists already being compared further up counts as equal, so cyclic lists
    /// terminate.
    fn eq_guarded(&self, other: &Self, open: &mut Vec<(ListPtr, ListPtr)>) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let pair = (Rc::as_ptr(a), Rc::as_ptr(b));
                if open.contains(&pair) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                if a.len() != b.len() {
                    return false;
                }
                open.push(pair);
                let equal = a.iter().zip(b.iter()).all(|(x, y)| x.eq_guarded(y, open));
                open.pop();
                equal
            }
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::Dsl(a), Value::Dsl(b)) => a.id == b.id,
            (Value::Native(a), Value::Native(b)) => std::ptr::eq(*a, *b),
            (Value::Library(a), Value::Library(b)) => a.name == b.name,
            _ => false,
        }
    }
}

type ListPtr = *const RefCell<Vec<Value>>;

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_plain(f, &mut Vec::new())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_name(), self.repr())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.eq_guarded(other, &mut Vec::new())
    }
}

/// A user function together with the environment it closes over.
pub struct Closure {
    pub def: Arc<FunctionDef>,
    pub env: Env,
    pub origin: Rc<ScriptOrigin>,
}

impl Closure {
    pub fn name(&self) -> &str {
        self.def.name.as_deref().unwrap_or("<anonymous>")
    }
}

impl fmt::Debug for Closure {
    // Environments can be cyclic (a function stored in its own scope), so only the name is printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure").field("name", &self.name()).finish_non_exhaustive()
    }
}

pub type Env = Rc<Scope>;

/// One lexical scope.
#[derive(Default)]
pub struct Scope {
    vars: RefCell<HashMap<String, Value>>,
    parent: Option<Env>,
}

impl Scope {
    pub fn root() -> Env {
        Rc::new(Scope::default())
    }

    pub fn child(parent: &Env) -> Env {
        Rc::new(Scope {
            vars: RefCell::new(HashMap::new()),
            parent: Some(Rc::clone(parent)),
        })
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.get(name))
    }

    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.vars.borrow_mut().insert(name.into(), value);
    }

    /// Update an existing binding in the nearest scope that has it.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.vars.borrow_mut().get_mut(name) {
            *slot = value;
            return true;
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => false,
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.vars.borrow().keys().cloned().collect();
        names.sort();
        f.debug_struct("Scope")
            .field("names", &names)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Int(0).is_truthy());
        assert!(Value::str("").is_truthy());
    }

    #[test]
    fn numeric_equality_crosses_int_and_float() {
        assert_eq!(Value::Int(2), Value::Float(2.0));
        assert_ne!(Value::Int(2), Value::str("2"));
    }

    #[test]
    fn list_display_quotes_strings() {
        let list = Value::list(vec![Value::Int(1), Value::str("a"), Value::Nil, Value::Float(2.0)]);
        assert_eq!(list.to_string(), "[1, \"a\", nil, 2.0]");
    }

    #[test]
    fn self_containing_list_renders_and_compares() {
        let xs = Value::list(vec![Value::Int(1)]);
        if let Value::List(items) = &xs {
            items.borrow_mut().push(xs.clone());
        }
        assert_eq!(xs.to_string(), "[1, [...]]");
        assert_eq!(xs.repr(), "[1, [...]]");
        assert_eq!(format!("{:?}", xs), "list([1, [...]])");

        let ys = Value::list(vec![Value::Int(1)]);
        if let Value::List(items) = &ys {
            items.borrow_mut().push(ys.clone());
        }
        assert_eq!(xs, ys);
        assert_ne!(xs, Value::list(vec![Value::Int(1), Value::Nil]));
    }

    #[test]
    fn scopes_shadow_and_assign_through_parents() {
        let root = Scope::root();
        root.define("x", Value::Int(1));
        let child = Scope::child(&root);
        assert!(child.assign("x", Value::Int(2)));
        assert_eq!(root.get("x"), Some(Value::Int(2)));

        child.define("x", Value::Int(3));
        assert_eq!(child.get("x"), Some(Value::Int(3)));
        assert_eq!(root.get("x"), Some(Value::Int(2)));
        assert!(!child.assign("missing", Value::Nil));
    }
}
