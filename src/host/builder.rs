//! Live spec tree and the builder that assembles it while a script runs.
//!
//! A [`SpecBuilder`] is an explicit value handed to the interpreter for one run. DSL calls push and pop contexts on
//! it; when the top-level statements finish, the host takes the finished root [`ContextNode`] out of it. Nothing is
//! shared between runs or files.

use std::rc::Rc;

use specrun_core::lang::dsl::{HookKind, Variant};

use super::interpreter::Closure;

/// One entry of a context body, in declaration order.
#[derive(Debug, Clone)]
pub enum ContextItem {
    Context(ContextNode),
    Spec(Rc<SpecNode>),
}

/// Lifecycle hooks attached to one context, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Hooks {
    pub before_all: Vec<Rc<Closure>>,
    pub before_each: Vec<Rc<Closure>>,
    pub after_each: Vec<Rc<Closure>>,
    pub after_all: Vec<Rc<Closure>>,
}

impl Hooks {
    pub fn push(&mut self, kind: HookKind, hook: Rc<Closure>) {
        match kind {
            HookKind::BeforeAll => self.before_all.push(hook),
            HookKind::BeforeEach => self.before_each.push(hook),
            HookKind::AfterEach => self.after_each.push(hook),
            HookKind::AfterAll => self.after_all.push(hook),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.before_all.is_empty()
            && self.before_each.is_empty()
            && self.after_each.is_empty()
            && self.after_all.is_empty()
    }
}

/// A named grouping node. The root context of a file has an empty description.
#[derive(Debug, Clone, Default)]
pub struct ContextNode {
    pub description: String,
    pub variant: Variant,
    pub tags: Vec<String>,
    pub line: usize,
    pub hooks: Hooks,
    pub items: Vec<ContextItem>,
}

impl ContextNode {
    fn new(description: String, variant: Variant, tags: Vec<String>, line: usize) -> Self {
        Self {
            description,
            variant,
            tags,
            line,
            ..Self::default()
        }
    }

    pub fn contexts(&self) -> impl Iterator<Item = &ContextNode> {
        self.items.iter().filter_map(|item| match item {
            ContextItem::Context(ctx) => Some(ctx),
            ContextItem::Spec(_) => None,
        })
    }

    pub fn specs(&self) -> impl Iterator<Item = &Rc<SpecNode>> {
        self.items.iter().filter_map(|item| match item {
            ContextItem::Spec(spec) => Some(spec),
            ContextItem::Context(_) => None,
        })
    }

    /// Number of leaf specs in this subtree.
    pub fn spec_count(&self) -> usize {
        self.items
            .iter()
            .map(|item| match item {
                ContextItem::Context(ctx) => ctx.spec_count(),
                ContextItem::Spec(_) => 1,
            })
            .sum()
    }
}

/// A leaf spec as declared by a run of the script.
#[derive(Debug)]
pub struct SpecNode {
    pub description: String,
    /// The call's own variant; enclosing contexts are folded in when the tree is flattened.
    pub variant: Variant,
    pub tags: Vec<String>,
    /// 1-based line of the declaring call within its own file.
    pub line: usize,
    pub body: Option<Rc<Closure>>,
}

impl SpecNode {
    pub fn is_pending(&self) -> bool {
        self.body.is_none()
    }
}

/// Assembles a [`ContextNode`] tree from DSL calls.
#[derive(Debug)]
pub struct SpecBuilder {
    stack: Vec<ContextNode>,
    tag_scopes: Vec<Vec<String>>,
}

impl Default for SpecBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SpecBuilder {
    pub fn new() -> Self {
        Self {
            stack: vec![ContextNode::default()],
            tag_scopes: Vec::new(),
        }
    }

    /// Number of contexts currently open below the root.
    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    fn current(&mut self) -> &mut ContextNode {
        self.stack.last_mut().expect("INVARIANT: builder stack always holds the root context")
    }

    fn active_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for tag in self.tag_scopes.iter().flatten() {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
        tags
    }

    pub fn begin_context(&mut self, description: String, variant: Variant, line: usize) {
        let tags = self.active_tags();
        self.stack.push(ContextNode::new(description, variant, tags, line));
    }

    /// Close the innermost context. Closing with no open context is a no-op.
    pub fn end_context(&mut self) {
        if self.stack.len() > 1 {
            if let Some(ctx) = self.stack.pop() {
                self.current().items.push(ContextItem::Context(ctx));
            }
        }
    }

    pub fn add_spec(&mut self, description: String, variant: Variant, line: usize, body: Option<Rc<Closure>>) {
        let spec = SpecNode {
            description,
            variant,
            tags: self.active_tags(),
            line,
            body,
        };
        self.current().items.push(ContextItem::Spec(Rc::new(spec)));
    }

    pub fn add_hook(&mut self, kind: HookKind, hook: Rc<Closure>) {
        self.current().hooks.push(kind, hook);
    }

    pub fn push_tags(&mut self, tags: Vec<String>) {
        self.tag_scopes.push(tags);
    }

    pub fn pop_tags(&mut self) {
        self.tag_scopes.pop();
    }

    /// Close any contexts left open and return the root, or `None` when no spec was declared.
    pub fn finish(mut self) -> Option<ContextNode> {
        while self.stack.len() > 1 {
            self.end_context();
        }
        let root = self.stack.pop()?;
        (root.spec_count() > 0).then_some(root)
    }
}

/// Owns the [`SpecBuilder`] for one script run.
///
/// The builder is released when the scope ends, whichever way the run exits: `finish` hands the tree out, and
/// dropping an unfinished scope (runtime fault, early return, unwinding) discards the partial tree.
#[derive(Debug, Default)]
pub struct BuilderScope {
    builder: Option<SpecBuilder>,
}

impl BuilderScope {
    pub fn acquire() -> Self {
        Self {
            builder: Some(SpecBuilder::new()),
        }
    }

    pub fn builder(&mut self) -> &mut SpecBuilder {
        self.builder.get_or_insert_with(SpecBuilder::new)
    }

    pub fn finish(mut self) -> Option<ContextNode> {
        self.builder.take().and_then(SpecBuilder::finish)
    }
}

impl Drop for BuilderScope {
    fn drop(&mut self) {
        if let Some(builder) = self.builder.take() {
            tracing::debug!(open_contexts = builder.depth(), "discarding unfinished spec tree");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptions(ctx: &ContextNode) -> Vec<String> {
        ctx.items
            .iter()
            .map(|item| match item {
                ContextItem::Context(c) => format!("ctx:{}", c.description),
                ContextItem::Spec(s) => format!("spec:{}", s.description),
            })
            .collect()
    }

    #[test]
    fn nested_contexts_keep_declaration_order() {
        let mut builder = SpecBuilder::new();
        builder.add_spec("top".into(), Variant::Regular, 1, None);
        builder.begin_context("Outer".into(), Variant::Regular, 2);
        builder.add_spec("a".into(), Variant::Regular, 3, None);
        builder.begin_context("Inner".into(), Variant::Skipped, 4);
        builder.add_spec("b".into(), Variant::Focused, 5, None);
        builder.end_context();
        builder.add_spec("c".into(), Variant::Regular, 7, None);
        builder.end_context();

        let root = builder.finish().unwrap();
        assert_eq!(root.description, "");
        assert_eq!(descriptions(&root), vec!["spec:top", "ctx:Outer"]);
        let outer = root.contexts().next().unwrap();
        assert_eq!(descriptions(outer), vec!["spec:a", "ctx:Inner", "spec:c"]);
        assert_eq!(root.spec_count(), 4);
    }

    #[test]
    fn empty_tree_finishes_as_none() {
        let mut builder = SpecBuilder::new();
        builder.begin_context("Empty".into(), Variant::Regular, 1);
        builder.end_context();
        assert!(builder.finish().is_none());
    }

    #[test]
    fn unclosed_contexts_are_folded_into_the_root() {
        let mut builder = SpecBuilder::new();
        builder.begin_context("A".into(), Variant::Regular, 1);
        builder.begin_context("B".into(), Variant::Regular, 2);
        builder.add_spec("x".into(), Variant::Regular, 3, None);
        assert_eq!(builder.depth(), 2);

        let root = builder.finish().unwrap();
        let a = root.contexts().next().unwrap();
        let b = a.contexts().next().unwrap();
        assert_eq!(b.specs().count(), 1);
    }

    #[test]
    fn tag_scopes_apply_to_nested_declarations() {
        let mut builder = SpecBuilder::new();
        builder.push_tags(vec!["slow".into()]);
        builder.begin_context("A".into(), Variant::Regular, 1);
        builder.push_tags(vec!["db".into(), "slow".into()]);
        builder.add_spec("x".into(), Variant::Regular, 2, None);
        builder.pop_tags();
        builder.add_spec("y".into(), Variant::Regular, 3, None);
        builder.end_context();
        builder.pop_tags();

        let root = builder.finish().unwrap();
        let a = root.contexts().next().unwrap();
        assert_eq!(a.tags, vec!["slow"]);
        let specs: Vec<_> = a.specs().collect();
        assert_eq!(specs[0].tags, vec!["slow", "db"]);
        assert_eq!(specs[1].tags, vec!["slow"]);
    }

    #[test]
    fn dropped_scope_discards_partial_tree() {
        let mut scope = BuilderScope::acquire();
        scope.builder().begin_context("A".into(), Variant::Regular, 1);
        drop(scope);

        let mut scope = BuilderScope::acquire();
        scope.builder().add_spec("fresh".into(), Variant::Regular, 1, None);
        let root = scope.finish().unwrap();
        assert_eq!(descriptions(&root), vec!["spec:fresh"]);
    }
}
