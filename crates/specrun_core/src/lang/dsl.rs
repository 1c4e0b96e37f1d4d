//! Spec DSL vocabulary: the call shapes that build a spec tree.
//!
//! Both discovery strategies depend on this table. The interpreter dispatches DSL calls by [`DslCallId`], and the
//! static structural parser recognizes the same spellings while walking tokens, so the two can never disagree about
//! which names open a context or declare a leaf.
//!
//! ## Notes
//! - Every begin-context and leaf-spec shape has a skipped (`x` prefix) and focused (`f` prefix) variant.
//! - `describe`/`it` are accepted as aliases of `context`/`spec`.
//!
//! ## Examples
//! ```rust
//! use specrun_core::lang::dsl::{self, CallShape, DslCallId, Variant};
//!
//! let info = dsl::lookup("xit").unwrap();
//! assert_eq!(info.id, DslCallId::XSpec);
//! assert_eq!(info.shape, CallShape::LeafSpec);
//! assert_eq!(info.variant, Variant::Skipped);
//! ```

/// Stable identifier for every DSL call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DslCallId {
    Context,
    XContext,
    FContext,
    Spec,
    XSpec,
    FSpec,
    BeforeAll,
    BeforeEach,
    AfterEach,
    AfterAll,
    Tag,
}

/// Structural role of a DSL call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallShape {
    /// `context("desc") { ... }`: pushes a context for the duration of its block.
    BeginContext,
    /// `spec("desc") { ... }` / `spec("desc")`: declares a leaf.
    LeafSpec,
    /// `before_each { ... }` and friends: attaches a hook to the current context.
    Hook(HookKind),
    /// `tag("a", "b") { ... }`: tags every spec declared inside the block.
    TagScope,
}

/// Lifecycle hook position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    BeforeAll,
    BeforeEach,
    AfterEach,
    AfterAll,
}

/// Focus/skip variant of a context or leaf call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Variant {
    #[default]
    Regular,
    Skipped,
    Focused,
}

/// Metadata for a DSL call.
#[derive(Debug, Clone, Copy)]
pub struct DslCallInfo {
    pub id: DslCallId,
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
    pub shape: CallShape,
    pub variant: Variant,
}

/// Registry of all DSL calls.
pub const DSL_CALLS: &[DslCallInfo] = &[
    info(
        DslCallId::Context,
        "context",
        &["describe"],
        CallShape::BeginContext,
        Variant::Regular,
    ),
    info(
        DslCallId::XContext,
        "xcontext",
        &["xdescribe"],
        CallShape::BeginContext,
        Variant::Skipped,
    ),
    info(
        DslCallId::FContext,
        "fcontext",
        &["fdescribe"],
        CallShape::BeginContext,
        Variant::Focused,
    ),
    info(DslCallId::Spec, "spec", &["it"], CallShape::LeafSpec, Variant::Regular),
    info(DslCallId::XSpec, "xspec", &["xit"], CallShape::LeafSpec, Variant::Skipped),
    info(DslCallId::FSpec, "fspec", &["fit"], CallShape::LeafSpec, Variant::Focused),
    info(
        DslCallId::BeforeAll,
        "before_all",
        &[],
        CallShape::Hook(HookKind::BeforeAll),
        Variant::Regular,
    ),
    info(
        DslCallId::BeforeEach,
        "before_each",
        &[],
        CallShape::Hook(HookKind::BeforeEach),
        Variant::Regular,
    ),
    info(
        DslCallId::AfterEach,
        "after_each",
        &[],
        CallShape::Hook(HookKind::AfterEach),
        Variant::Regular,
    ),
    info(
        DslCallId::AfterAll,
        "after_all",
        &[],
        CallShape::Hook(HookKind::AfterAll),
        Variant::Regular,
    ),
    info(DslCallId::Tag, "tag", &[], CallShape::TagScope, Variant::Regular),
];

/// Canonical spelling.
pub fn as_str(id: DslCallId) -> &'static str {
    info_for(id).canonical
}

/// Full metadata.
///
/// ## Panics
/// - If the registry is missing an entry for `id` (this indicates a programming error).
pub fn info_for(id: DslCallId) -> &'static DslCallInfo {
    DSL_CALLS.iter().find(|d| d.id == id).expect("dsl call info missing")
}

/// Lookup by spelling (canonical or alias).
pub fn lookup(name: &str) -> Option<&'static DslCallInfo> {
    DSL_CALLS
        .iter()
        .find(|d| d.canonical == name)
        .or_else(|| DSL_CALLS.iter().find(|d| d.aliases.contains(&name)))
}

/// Lookup by spelling, returning only the identifier.
pub fn from_str(name: &str) -> Option<DslCallId> {
    lookup(name).map(|d| d.id)
}

/// Combine an enclosing context's variant with a nested call's own variant.
///
/// Skipped wins over focused: a focused spec inside a skipped context never runs.
pub fn inherit(outer: Variant, inner: Variant) -> Variant {
    match (outer, inner) {
        (Variant::Skipped, _) | (_, Variant::Skipped) => Variant::Skipped,
        (Variant::Focused, _) | (_, Variant::Focused) => Variant::Focused,
        _ => Variant::Regular,
    }
}

// --- helpers -----------------------------------------------------------------

const fn info(
    id: DslCallId,
    canonical: &'static str,
    aliases: &'static [&'static str],
    shape: CallShape,
    variant: Variant,
) -> DslCallInfo {
    DslCallInfo {
        id,
        canonical,
        aliases,
        shape,
        variant,
    }
}
