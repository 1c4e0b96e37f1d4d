//! Core builtin functions available to every spec script.
//!
//! The name resolver treats these as always in scope; native libraries brought in with `#ref` add more names on top.
//!
//! ## Examples
//! ```rust
//! use specrun_core::lang::builtins::{self, BuiltinFnId};
//!
//! assert_eq!(builtins::from_str("assert_eq"), Some(BuiltinFnId::AssertEq));
//! assert!(builtins::info_for(BuiltinFnId::AssertEq).accepts(2));
//! assert!(!builtins::info_for(BuiltinFnId::AssertEq).accepts(1));
//! ```

/// Stable identifier for every core builtin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinFnId {
    Print,
    Len,
    Str,
    Assert,
    AssertEq,
    AssertNe,
    Fail,
    Push,
    Range,
    Contains,
}

/// Metadata for a builtin function.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinFnInfo {
    pub id: BuiltinFnId,
    pub canonical: &'static str,
    pub min_args: usize,
    /// `None` means variadic.
    pub max_args: Option<usize>,
    pub summary: &'static str,
}

impl BuiltinFnInfo {
    /// Return `true` if a call with `argc` arguments is well-formed.
    pub fn accepts(&self, argc: usize) -> bool {
        argc >= self.min_args && self.max_args.is_none_or(|max| argc <= max)
    }

    /// Human-readable arity, e.g. `1`, `2 to 3`, `at least 0`.
    pub fn expected(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{} to {}", self.min_args, max),
            None => format!("at least {}", self.min_args),
        }
    }
}

/// Registry of all core builtins.
pub const BUILTIN_FUNCTIONS: &[BuiltinFnInfo] = &[
    info(BuiltinFnId::Print, "print", 0, None, "Write values to stdout, space separated."),
    info(BuiltinFnId::Len, "len", 1, Some(1), "Length of a string or list."),
    info(BuiltinFnId::Str, "str", 1, Some(1), "Render a value as a string."),
    info(
        BuiltinFnId::Assert,
        "assert",
        1,
        Some(2),
        "Fail the current spec unless the condition is truthy.",
    ),
    info(
        BuiltinFnId::AssertEq,
        "assert_eq",
        2,
        Some(3),
        "Fail the current spec unless both values are equal.",
    ),
    info(
        BuiltinFnId::AssertNe,
        "assert_ne",
        2,
        Some(3),
        "Fail the current spec if both values are equal.",
    ),
    info(BuiltinFnId::Fail, "fail", 0, Some(1), "Fail the current spec unconditionally."),
    info(BuiltinFnId::Push, "push", 2, Some(2), "Append a value to a list in place."),
    info(BuiltinFnId::Range, "range", 1, Some(2), "List of integers in a half-open range."),
    info(
        BuiltinFnId::Contains,
        "contains",
        2,
        Some(2),
        "Membership test for lists and substrings.",
    ),
];

/// Canonical spelling.
pub fn as_str(id: BuiltinFnId) -> &'static str {
    info_for(id).canonical
}

/// Full metadata.
///
/// ## Panics
/// - If the registry is missing an entry for `id` (this indicates a programming error).
pub fn info_for(id: BuiltinFnId) -> &'static BuiltinFnInfo {
    BUILTIN_FUNCTIONS
        .iter()
        .find(|b| b.id == id)
        .expect("builtin info missing")
}

/// Lookup by spelling.
pub fn from_str(name: &str) -> Option<BuiltinFnId> {
    BUILTIN_FUNCTIONS.iter().find(|b| b.canonical == name).map(|b| b.id)
}

// --- helpers -----------------------------------------------------------------

const fn info(
    id: BuiltinFnId,
    canonical: &'static str,
    min_args: usize,
    max_args: Option<usize>,
    summary: &'static str,
) -> BuiltinFnInfo {
    BuiltinFnInfo {
        id,
        canonical,
        min_args,
        max_args,
        summary,
    }
}
