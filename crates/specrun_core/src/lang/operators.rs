//! Operator vocabulary.
//!
//! This module defines the canonical operator set along with precedence, associativity, and fixity. The parser's
//! precedence-climbing loop reads binding strength from here rather than hard-coding a ladder of functions.
//!
//! ## Notes
//! - Lookup via [`from_str`] is **case-sensitive**.
//! - `-` is registered once as an infix operator; the parser also accepts it in prefix position.
//!
//! ## Examples
//! ```rust
//! use specrun_core::lang::operators::{self, OperatorId};
//!
//! assert_eq!(operators::from_str("&&"), Some(OperatorId::AndAnd));
//! assert!(operators::info_for(OperatorId::Star).precedence > operators::info_for(OperatorId::Plus).precedence);
//! ```

/// Define how operators associate when chained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Associativity {
    Left,
    Right,
}

/// Define whether an operator is infix (binary) or prefix (unary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fixity {
    Infix,
    Prefix,
}

/// Stable identifier for every operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorId {
    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    // Comparison
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Logical
    AndAnd,
    OrOr,
    Bang,

    // Assignment
    Eq,
}

/// Metadata for an operator.
///
/// ## Notes
/// - `precedence` is a relative ordering where higher binds tighter. Assignment is not an expression operator; its
///   precedence only documents that it binds loosest.
#[derive(Debug, Clone, Copy)]
pub struct OperatorInfo {
    pub id: OperatorId,
    pub spelling: &'static str,
    pub precedence: u8,
    pub associativity: Associativity,
    pub fixity: Fixity,
}

/// Registry of all operators.
pub const OPERATORS: &[OperatorInfo] = &[
    op(OperatorId::Plus, "+", 50, Associativity::Left, Fixity::Infix),
    op(OperatorId::Minus, "-", 50, Associativity::Left, Fixity::Infix),
    op(OperatorId::Star, "*", 60, Associativity::Left, Fixity::Infix),
    op(OperatorId::Slash, "/", 60, Associativity::Left, Fixity::Infix),
    op(OperatorId::Percent, "%", 60, Associativity::Left, Fixity::Infix),
    op(OperatorId::EqEq, "==", 35, Associativity::Left, Fixity::Infix),
    op(OperatorId::NotEq, "!=", 35, Associativity::Left, Fixity::Infix),
    op(OperatorId::Lt, "<", 40, Associativity::Left, Fixity::Infix),
    op(OperatorId::LtEq, "<=", 40, Associativity::Left, Fixity::Infix),
    op(OperatorId::Gt, ">", 40, Associativity::Left, Fixity::Infix),
    op(OperatorId::GtEq, ">=", 40, Associativity::Left, Fixity::Infix),
    op(OperatorId::AndAnd, "&&", 30, Associativity::Left, Fixity::Infix),
    op(OperatorId::OrOr, "||", 20, Associativity::Left, Fixity::Infix),
    op(OperatorId::Bang, "!", 70, Associativity::Right, Fixity::Prefix),
    op(OperatorId::Eq, "=", 10, Associativity::Right, Fixity::Infix),
];

/// Return the full metadata entry for an operator.
///
/// ## Panics
/// - If the registry is missing an entry for `id` (this indicates a programming error).
pub fn info_for(id: OperatorId) -> &'static OperatorInfo {
    OPERATORS.iter().find(|o| o.id == id).expect("INVARIANT: every operator id has a registry entry")
}

/// Canonical spelling.
pub fn as_str(id: OperatorId) -> &'static str {
    info_for(id).spelling
}

/// Resolve an operator spelling to its identifier.
pub fn from_str(spelling: &str) -> Option<OperatorId> {
    OPERATORS.iter().find(|o| o.spelling == spelling).map(|o| o.id)
}

/// Return the binding strength of `id` when used as a binary operator.
///
/// ## Returns
/// - `Some(precedence)` for infix expression operators.
/// - `None` for prefix-only operators and assignment (which the parser handles at statement level).
pub fn binary_precedence(id: OperatorId) -> Option<u8> {
    let info = info_for(id);
    match (info.fixity, id) {
        (_, OperatorId::Eq) => None,
        (Fixity::Infix, _) => Some(info.precedence),
        (Fixity::Prefix, _) => None,
    }
}

// --- helpers -----------------------------------------------------------------

const fn op(
    id: OperatorId,
    spelling: &'static str,
    precedence: u8,
    associativity: Associativity,
    fixity: Fixity,
) -> OperatorInfo {
    OperatorInfo {
        id,
        spelling,
        precedence,
        associativity,
        fixity,
    }
}
