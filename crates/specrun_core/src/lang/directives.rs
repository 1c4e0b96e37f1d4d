//! Source directive vocabulary.
//!
//! Directives are whole lines beginning with `#`. They are processed before compilation: inclusion directives inline
//! another file, reference directives name a native library the host must provide.
//!
//! ## Examples
//! ```rust
//! use specrun_core::lang::directives::{self, DirectiveId};
//!
//! assert_eq!(directives::from_str("load"), Some(DirectiveId::Load));
//! assert_eq!(directives::from_str("r"), Some(DirectiveId::Ref));
//! assert!(directives::is_package_reference("pkg: serde"));
//! ```

/// Stable identifier for every directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveId {
    /// `#load "path"`: inline another source file.
    Load,
    /// `#ref "name"`: reference a native library.
    Ref,
}

/// Metadata for a directive.
#[derive(Debug, Clone, Copy)]
pub struct DirectiveInfo {
    pub id: DirectiveId,
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
}

/// Registry of all directives.
pub const DIRECTIVES: &[DirectiveInfo] = &[
    DirectiveInfo {
        id: DirectiveId::Load,
        canonical: "load",
        aliases: &[],
    },
    DirectiveInfo {
        id: DirectiveId::Ref,
        canonical: "ref",
        aliases: &["r"],
    },
];

/// Leading marker of a directive line.
pub const DIRECTIVE_MARKER: char = '#';

/// Prefix of references resolved by an external package manager.
///
/// Such references are assumed to be resolvable by the ambient build and are never checked by the host.
pub const PACKAGE_REFERENCE_PREFIX: &str = "pkg:";

/// Canonical spelling.
pub fn as_str(id: DirectiveId) -> &'static str {
    info_for(id).canonical
}

/// Full metadata.
///
/// ## Panics
/// - If the registry is missing an entry for `id` (this indicates a programming error).
pub fn info_for(id: DirectiveId) -> &'static DirectiveInfo {
    DIRECTIVES.iter().find(|d| d.id == id).expect("INVARIANT: every directive id has a registry entry")
}

/// Lookup by spelling (canonical or alias).
pub fn from_str(s: &str) -> Option<DirectiveId> {
    DIRECTIVES
        .iter()
        .find(|d| d.canonical == s || d.aliases.contains(&s))
        .map(|d| d.id)
}

/// Return `true` if a reference target is owned by the external package manager.
pub fn is_package_reference(target: &str) -> bool {
    target.trim_start().starts_with(PACKAGE_REFERENCE_PREFIX)
}
