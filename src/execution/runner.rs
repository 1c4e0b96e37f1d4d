//! Runs one live spec tree: hooks, bodies, focus and skip handling.

use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::host::{ContextItem, ContextNode, Interpreter, RuntimeError, SpecNode};

use super::reporter::SpecReporter;
use super::{SpecResult, SpecStatus};

/// What happens to an included spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Disposition {
    Run,
    Skip,
    Pending,
}

pub(super) struct Planned {
    pub id: String,
    pub description: String,
    pub context_path: Vec<String>,
    pub disposition: Disposition,
}

#[derive(Debug, Clone)]
struct Failure {
    message: String,
    trace: Vec<String>,
}

impl Failure {
    fn hook(kind: &str, err: RuntimeError) -> Self {
        Self {
            message: format!("{} hook failed: {}", kind, err.message),
            trace: err.trace,
        }
    }
}

impl From<RuntimeError> for Failure {
    fn from(err: RuntimeError) -> Self {
        Self {
            message: err.message,
            trace: err.trace,
        }
    }
}

/// Walks the tree once, reporting every planned spec.
pub(super) struct TreeRun<'r> {
    interpreter: Interpreter<'static>,
    /// Keyed by node address; entries are consumed as specs are reported.
    plan: HashMap<*const SpecNode, Planned>,
    reporter: &'r mut dyn SpecReporter,
}

impl<'r> TreeRun<'r> {
    pub fn new(plan: HashMap<*const SpecNode, Planned>, reporter: &'r mut dyn SpecReporter) -> Self {
        Self {
            interpreter: Interpreter::new(None),
            plan,
            reporter,
        }
    }

    pub fn run(mut self, root: &ContextNode) {
        let mut chain = Vec::new();
        self.run_context(root, &mut chain, None);
    }

    fn runnable_in(&self, ctx: &ContextNode) -> bool {
        ctx.items.iter().any(|item| match item {
            ContextItem::Context(child) => self.runnable_in(child),
            ContextItem::Spec(spec) => self
                .plan
                .get(&Rc::as_ptr(spec))
                .is_some_and(|p| p.disposition == Disposition::Run),
        })
    }

    fn run_context<'t>(&mut self, ctx: &'t ContextNode, chain: &mut Vec<&'t ContextNode>, inherited: Option<Failure>) {
        chain.push(ctx);

        // before_all / after_all only run for contexts that will execute at least one spec.
        let hooks_active = inherited.is_none() && self.runnable_in(ctx);
        let mut failure = inherited;
        if hooks_active {
            for hook in &ctx.hooks.before_all {
                if let Err(err) = self.interpreter.call(hook) {
                    failure = Some(Failure::hook("before_all", err));
                    break;
                }
            }
        }

        for item in &ctx.items {
            match item {
                ContextItem::Context(child) => self.run_context(child, chain, failure.clone()),
                ContextItem::Spec(spec) => self.run_spec(spec, chain, failure.as_ref()),
            }
        }

        if hooks_active {
            for hook in &ctx.hooks.after_all {
                if let Err(err) = self.interpreter.call(hook) {
                    tracing::warn!(context = %ctx.description, error = %err, "after_all hook failed");
                }
            }
        }
        chain.pop();
    }

    fn run_spec(&mut self, spec: &Rc<SpecNode>, chain: &[&ContextNode], failure: Option<&Failure>) {
        let Some(planned) = self.plan.remove(&Rc::as_ptr(spec)) else {
            return;
        };

        let start = Instant::now();
        let outcome = match planned.disposition {
            Disposition::Skip => Ok(SpecStatus::Skipped),
            Disposition::Pending => Ok(SpecStatus::Pending),
            Disposition::Run => match failure {
                Some(failure) => Err(failure.clone()),
                None => self.run_body(spec, chain).map(|()| SpecStatus::Passed),
            },
        };
        let duration = match planned.disposition {
            Disposition::Run => start.elapsed(),
            Disposition::Skip | Disposition::Pending => Duration::ZERO,
        };

        let (status, message, trace) = match outcome {
            Ok(status) => (status, None, Vec::new()),
            Err(failure) => (SpecStatus::Failed, Some(failure.message), failure.trace),
        };
        let result = SpecResult {
            display_name: super::display_path(&planned.context_path, &planned.description),
            id: planned.id,
            description: planned.description,
            context_path: planned.context_path,
            status,
            duration,
            message,
            trace,
        };
        self.reporter.on_spec_complete(&result);
    }

    /// `before_each` outermost first, the body, then `after_each` innermost first. After-hooks always run; the
    /// first failure wins.
    fn run_body(&mut self, spec: &SpecNode, chain: &[&ContextNode]) -> Result<(), Failure> {
        let mut failure = None;

        'before: for ctx in chain {
            for hook in &ctx.hooks.before_each {
                if let Err(err) = self.interpreter.call(hook) {
                    failure = Some(Failure::hook("before_each", err));
                    break 'before;
                }
            }
        }

        if failure.is_none() {
            if let Some(body) = &spec.body {
                if let Err(err) = self.interpreter.call(body) {
                    failure = Some(Failure::from(err));
                }
            }
        }

        for ctx in chain.iter().rev() {
            for hook in &ctx.hooks.after_each {
                if let Err(err) = self.interpreter.call(hook) {
                    failure.get_or_insert(Failure::hook("after_each", err));
                }
            }
        }

        match failure {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}
