//! Depth-first flattening of a spec tree into leaf specs with their context paths.
//!
//! Discovery flattens two kinds of tree: the live tree a script run builds, and a tree reconstructed from a static
//! parse result. Both go through [`flatten_specs`] so ids and inherited flags are computed in exactly one place.

use std::rc::Rc;

use specrun_core::lang::dsl::{self, Variant};

use crate::host::{ContextItem, ContextNode, SpecNode};
use crate::structural::{StaticParseResult, StaticSpec};

/// A leaf of some spec tree.
pub trait SpecView {
    fn description(&self) -> &str;
    /// The leaf's own variant, before enclosing contexts are folded in.
    fn variant(&self) -> Variant;
    fn tags(&self) -> &[String];
    fn line(&self) -> usize;
    fn is_pending(&self) -> bool;
}

/// A grouping node of some spec tree.
pub trait ContextView: Sized {
    type Spec: SpecView;

    fn description(&self) -> &str;
    fn variant(&self) -> Variant;
    fn tags(&self) -> &[String];
    fn items(&self) -> Vec<TreeItem<'_, Self>>;
}

pub enum TreeItem<'a, C: ContextView> {
    Context(&'a C),
    Spec(&'a C::Spec),
}

/// One leaf with everything inherited from its ancestors.
#[derive(Debug)]
pub struct FlatSpec<'a, S> {
    pub spec: &'a S,
    /// Ancestor descriptions, outermost first; the root is not included.
    pub context_path: Vec<String>,
    pub variant: Variant,
    /// Own tags followed by inherited ones, without duplicates.
    pub tags: Vec<String>,
}

/// Flatten the tree below `root` in declaration order.
pub fn flatten_specs<C: ContextView>(root: &C) -> Vec<FlatSpec<'_, C::Spec>> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    walk(root, &mut path, Variant::Regular, &[], &mut out);
    out
}

fn walk<'a, C: ContextView>(
    ctx: &'a C,
    path: &mut Vec<String>,
    inherited: Variant,
    inherited_tags: &[String],
    out: &mut Vec<FlatSpec<'a, C::Spec>>,
) {
    for item in ctx.items() {
        match item {
            TreeItem::Context(child) => {
                let variant = dsl::inherit(inherited, child.variant());
                let tags = merge_tags(child.tags(), inherited_tags);
                path.push(child.description().to_string());
                walk(child, path, variant, &tags, out);
                path.pop();
            }
            TreeItem::Spec(spec) => out.push(FlatSpec {
                spec,
                context_path: path.clone(),
                variant: dsl::inherit(inherited, spec.variant()),
                tags: merge_tags(spec.tags(), inherited_tags),
            }),
        }
    }
}

fn merge_tags(own: &[String], inherited: &[String]) -> Vec<String> {
    let mut tags = own.to_vec();
    for tag in inherited {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }
    tags
}

// ---- live tree -------------------------------------------------------------

impl SpecView for Rc<SpecNode> {
    fn description(&self) -> &str {
        &self.description
    }

    fn variant(&self) -> Variant {
        self.variant
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn line(&self) -> usize {
        self.line
    }

    fn is_pending(&self) -> bool {
        SpecNode::is_pending(self)
    }
}

impl ContextView for ContextNode {
    type Spec = Rc<SpecNode>;

    fn description(&self) -> &str {
        &self.description
    }

    fn variant(&self) -> Variant {
        self.variant
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn items(&self) -> Vec<TreeItem<'_, Self>> {
        self.items
            .iter()
            .map(|item| match item {
                ContextItem::Context(ctx) => TreeItem::Context(ctx),
                ContextItem::Spec(spec) => TreeItem::Spec(spec),
            })
            .collect()
    }
}

// ---- static tree -----------------------------------------------------------

impl SpecView for StaticSpec {
    fn description(&self) -> &str {
        &self.description
    }

    /// Static specs already carry the variant inherited from their contexts.
    fn variant(&self) -> Variant {
        self.kind.into()
    }

    fn tags(&self) -> &[String] {
        &[]
    }

    fn line(&self) -> usize {
        self.line
    }

    fn is_pending(&self) -> bool {
        self.pending
    }
}

/// Context tree rebuilt from the flat list of a [`StaticParseResult`].
#[derive(Debug, Default)]
pub struct StaticTree<'a> {
    description: String,
    items: Vec<StaticItem<'a>>,
}

#[derive(Debug)]
enum StaticItem<'a> {
    Context(StaticTree<'a>),
    Spec(&'a StaticSpec),
}

impl<'a> StaticTree<'a> {
    /// Rebuild the nesting. Consecutive specs sharing a context prefix land in the same context node, which
    /// reproduces declaration order.
    pub fn from_result(result: &'a StaticParseResult) -> Self {
        let mut root = StaticTree::default();
        for spec in &result.specs {
            root.insert(&spec.context_path, spec);
        }
        root
    }

    fn insert(&mut self, path: &[String], spec: &'a StaticSpec) {
        let Some((head, rest)) = path.split_first() else {
            self.items.push(StaticItem::Spec(spec));
            return;
        };
        let reuse = matches!(self.items.last(), Some(StaticItem::Context(ctx)) if ctx.description == *head);
        if !reuse {
            self.items.push(StaticItem::Context(StaticTree {
                description: head.clone(),
                items: Vec::new(),
            }));
        }
        if let Some(StaticItem::Context(ctx)) = self.items.last_mut() {
            ctx.insert(rest, spec);
        }
    }
}

impl<'a> ContextView for StaticTree<'a> {
    type Spec = StaticSpec;

    fn description(&self) -> &str {
        &self.description
    }

    fn variant(&self) -> Variant {
        Variant::Regular
    }

    fn tags(&self) -> &[String] {
        &[]
    }

    fn items(&self) -> Vec<TreeItem<'_, Self>> {
        self.items
            .iter()
            .map(|item| match item {
                StaticItem::Context(ctx) => TreeItem::Context(ctx),
                StaticItem::Spec(spec) => TreeItem::Spec(*spec),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SpecBuilder;
    use crate::structural::StaticSpecKind;

    fn summary<S: SpecView>(flat: &[FlatSpec<'_, S>]) -> Vec<String> {
        flat.iter()
            .map(|f| {
                format!(
                    "{}/{} {:?} {:?}",
                    f.context_path.join("/"),
                    f.spec.description(),
                    f.variant,
                    f.tags
                )
            })
            .collect()
    }

    #[test]
    fn live_tree_inherits_variants_and_tags() {
        let mut builder = SpecBuilder::new();
        builder.add_spec("top".into(), Variant::Regular, 1, None);
        builder.push_tags(vec!["slow".into()]);
        builder.begin_context("Outer".into(), Variant::Skipped, 2);
        builder.add_spec("a".into(), Variant::Focused, 3, None);
        builder.pop_tags();
        builder.begin_context("Inner".into(), Variant::Regular, 4);
        builder.add_spec("b".into(), Variant::Regular, 5, None);
        builder.end_context();
        builder.end_context();
        builder.begin_context("Focus".into(), Variant::Focused, 8);
        builder.add_spec("c".into(), Variant::Regular, 9, None);
        builder.end_context();
        let root = builder.finish().unwrap();

        insta::assert_debug_snapshot!(summary(&flatten_specs(&root)), @r#"
        [
            "/top Regular []",
            "Outer/a Skipped [\"slow\"]",
            "Outer/Inner/b Skipped [\"slow\"]",
            "Focus/c Focused []",
        ]
        "#);
    }

    fn static_spec(path: &[&str], description: &str, kind: StaticSpecKind) -> StaticSpec {
        StaticSpec {
            description: description.into(),
            context_path: path.iter().map(|s| s.to_string()).collect(),
            line: 1,
            kind,
            pending: false,
        }
    }

    #[test]
    fn static_tree_round_trips_paths() {
        let result = StaticParseResult {
            specs: vec![
                static_spec(&["A"], "one", StaticSpecKind::Regular),
                static_spec(&["A", "B"], "two", StaticSpecKind::Skipped),
                static_spec(&["A"], "three", StaticSpecKind::Focused),
                static_spec(&[], "four", StaticSpecKind::Regular),
                static_spec(&["A"], "five", StaticSpecKind::Regular),
            ],
            warnings: Vec::new(),
            is_complete: true,
        };

        let tree = StaticTree::from_result(&result);
        let flat = flatten_specs(&tree);
        let got: Vec<(Vec<String>, &str, Variant)> = flat
            .iter()
            .map(|f| (f.context_path.clone(), f.spec.description.as_str(), f.variant))
            .collect();
        let expected: Vec<(Vec<String>, &str, Variant)> = result
            .specs
            .iter()
            .map(|s| (s.context_path.clone(), s.description.as_str(), s.kind.into()))
            .collect();
        assert_eq!(got, expected);
    }
}
