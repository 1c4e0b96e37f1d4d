//! Native libraries reachable through `#ref "name"`.
//!
//! A script that references a library gets a global of the same name; its functions are called with field syntax
//! (`math.abs(-2)`). The name resolver checks references and member names against [`LIBRARIES`] before a script runs.

use super::interpreter::Value;

pub type NativeFnPtr = fn(&[Value]) -> Result<Value, String>;

/// A host-provided function.
#[derive(Debug)]
pub struct NativeFn {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: usize,
    pub call: NativeFnPtr,
}

impl NativeFn {
    pub fn accepts(&self, argc: usize) -> bool {
        (self.min_args..=self.max_args).contains(&argc)
    }

    pub fn expected(&self) -> String {
        if self.min_args == self.max_args {
            self.min_args.to_string()
        } else {
            format!("{} to {}", self.min_args, self.max_args)
        }
    }
}

/// A named set of native functions.
#[derive(Debug)]
pub struct NativeLibrary {
    pub name: &'static str,
    pub functions: &'static [NativeFn],
}

impl NativeLibrary {
    pub fn function(&'static self, name: &str) -> Option<&'static NativeFn> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// Every library the host can provide.
pub static LIBRARIES: &[NativeLibrary] = &[
    NativeLibrary {
        name: "math",
        functions: &[
            native("abs", 1, 1, math::abs),
            native("min", 2, 2, math::min),
            native("max", 2, 2, math::max),
            native("floor", 1, 1, math::floor),
            native("ceil", 1, 1, math::ceil),
            native("sqrt", 1, 1, math::sqrt),
            native("pow", 2, 2, math::pow),
        ],
    },
    NativeLibrary {
        name: "strings",
        functions: &[
            native("upper", 1, 1, strings::upper),
            native("lower", 1, 1, strings::lower),
            native("trim", 1, 1, strings::trim),
            native("split", 2, 2, strings::split),
            native("join", 2, 2, strings::join),
            native("starts_with", 2, 2, strings::starts_with),
            native("ends_with", 2, 2, strings::ends_with),
            native("replace", 3, 3, strings::replace),
            native("repeat", 2, 2, strings::repeat),
        ],
    },
];

/// Look up a library by reference name.
pub fn library(name: &str) -> Option<&'static NativeLibrary> {
    LIBRARIES.iter().find(|lib| lib.name == name)
}

const fn native(name: &'static str, min_args: usize, max_args: usize, call: NativeFnPtr) -> NativeFn {
    NativeFn {
        name,
        min_args,
        max_args,
        call,
    }
}

fn number(value: &Value, what: &str) -> Result<f64, String> {
    match value {
        Value::Int(i) => Ok(*i as f64),
        Value::Float(f) => Ok(*f),
        other => Err(format!("{} expects a number, got {}", what, other.type_name())),
    }
}

fn text<'a>(value: &'a Value, what: &str) -> Result<&'a str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("{} expects a string, got {}", what, value.type_name()))
}

mod math {
    use super::{Value, number};

    pub(super) fn abs(args: &[Value]) -> Result<Value, String> {
        match &args[0] {
            Value::Int(i) => i
                .checked_abs()
                .map(Value::Int)
                .ok_or_else(|| "math.abs overflowed".to_string()),
            other => Ok(Value::Float(number(other, "math.abs")?.abs())),
        }
    }

    pub(super) fn min(args: &[Value]) -> Result<Value, String> {
        pick(args, "math.min", |a, b| a <= b)
    }

    pub(super) fn max(args: &[Value]) -> Result<Value, String> {
        pick(args, "math.max", |a, b| a >= b)
    }

    fn pick(args: &[Value], what: &str, keep_first: fn(f64, f64) -> bool) -> Result<Value, String> {
        let a = number(&args[0], what)?;
        let b = number(&args[1], what)?;
        Ok(if keep_first(a, b) { args[0].clone() } else { args[1].clone() })
    }

    pub(super) fn floor(args: &[Value]) -> Result<Value, String> {
        Ok(Value::Int(number(&args[0], "math.floor")?.floor() as i64))
    }

    pub(super) fn ceil(args: &[Value]) -> Result<Value, String> {
        Ok(Value::Int(number(&args[0], "math.ceil")?.ceil() as i64))
    }

    pub(super) fn sqrt(args: &[Value]) -> Result<Value, String> {
        let x = number(&args[0], "math.sqrt")?;
        if x < 0.0 {
            return Err("math.sqrt of a negative number".to_string());
        }
        Ok(Value::Float(x.sqrt()))
    }

    pub(super) fn pow(args: &[Value]) -> Result<Value, String> {
        match (&args[0], &args[1]) {
            (Value::Int(base), Value::Int(exp)) if *exp >= 0 => u32::try_from(*exp)
                .ok()
                .and_then(|exp| base.checked_pow(exp))
                .map(Value::Int)
                .ok_or_else(|| "math.pow overflowed".to_string()),
            (base, exp) => Ok(Value::Float(number(base, "math.pow")?.powf(number(exp, "math.pow")?))),
        }
    }
}

mod strings {
    use super::{Value, text};

    pub(super) fn upper(args: &[Value]) -> Result<Value, String> {
        Ok(Value::str(text(&args[0], "strings.upper")?.to_uppercase()))
    }

    pub(super) fn lower(args: &[Value]) -> Result<Value, String> {
        Ok(Value::str(text(&args[0], "strings.lower")?.to_lowercase()))
    }

    pub(super) fn trim(args: &[Value]) -> Result<Value, String> {
        Ok(Value::str(text(&args[0], "strings.trim")?.trim()))
    }

    pub(super) fn split(args: &[Value]) -> Result<Value, String> {
        let s = text(&args[0], "strings.split")?;
        let sep = text(&args[1], "strings.split")?;
        if sep.is_empty() {
            return Err("strings.split separator must not be empty".to_string());
        }
        Ok(Value::list(s.split(sep).map(Value::str).collect()))
    }

    pub(super) fn join(args: &[Value]) -> Result<Value, String> {
        let Value::List(items) = &args[0] else {
            return Err(format!("strings.join expects a list, got {}", args[0].type_name()));
        };
        let sep = text(&args[1], "strings.join")?;
        let parts: Vec<String> = items.borrow().iter().map(Value::to_string).collect();
        Ok(Value::str(parts.join(sep)))
    }

    pub(super) fn starts_with(args: &[Value]) -> Result<Value, String> {
        let s = text(&args[0], "strings.starts_with")?;
        Ok(Value::Bool(s.starts_with(text(&args[1], "strings.starts_with")?)))
    }

    pub(super) fn ends_with(args: &[Value]) -> Result<Value, String> {
        let s = text(&args[0], "strings.ends_with")?;
        Ok(Value::Bool(s.ends_with(text(&args[1], "strings.ends_with")?)))
    }

    pub(super) fn replace(args: &[Value]) -> Result<Value, String> {
        let s = text(&args[0], "strings.replace")?;
        let from = text(&args[1], "strings.replace")?;
        let to = text(&args[2], "strings.replace")?;
        Ok(Value::str(s.replace(from, to)))
    }

    pub(super) fn repeat(args: &[Value]) -> Result<Value, String> {
        let s = text(&args[0], "strings.repeat")?;
        match &args[1] {
            Value::Int(n) if *n >= 0 => Ok(Value::str(s.repeat(*n as usize))),
            other => Err(format!("strings.repeat expects a non-negative int, got {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(lib: &str, name: &str, args: &[Value]) -> Result<Value, String> {
        let f = library(lib).unwrap().function(name).unwrap();
        assert!(f.accepts(args.len()));
        (f.call)(args)
    }

    #[test]
    fn library_names_are_unique() {
        for (i, a) in LIBRARIES.iter().enumerate() {
            for b in &LIBRARIES[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }

    #[test]
    fn math_functions() {
        assert_eq!(call("math", "abs", &[Value::Int(-3)]).unwrap(), Value::Int(3));
        assert_eq!(call("math", "max", &[Value::Int(2), Value::Float(2.5)]).unwrap(), Value::Float(2.5));
        assert_eq!(call("math", "pow", &[Value::Int(2), Value::Int(10)]).unwrap(), Value::Int(1024));
        assert!(call("math", "abs", &[Value::Int(i64::MIN)]).is_err());
        assert!(call("math", "sqrt", &[Value::str("x")]).is_err());
    }

    #[test]
    fn string_functions() {
        assert_eq!(call("strings", "upper", &[Value::str("ab")]).unwrap(), Value::str("AB"));
        let parts = call("strings", "split", &[Value::str("a,b"), Value::str(",")]).unwrap();
        assert_eq!(parts, Value::list(vec![Value::str("a"), Value::str("b")]));
        assert_eq!(
            call("strings", "join", &[parts, Value::str("-")]).unwrap(),
            Value::str("a-b")
        );
    }

    #[test]
    fn unknown_library() {
        assert!(library("json").is_none());
        assert!(library("math").unwrap().function("nope").is_none());
    }
}
