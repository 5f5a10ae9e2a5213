//! Call stack and memoization frames shared by the evaluator and expander.

use std::collections::HashMap;

use lg_expression::Value;

use crate::error::TemplateError;

/// One template invocation in progress.
///
/// The memo holds results of templates called from this frame, keyed by
/// callee name and scope fingerprint. It is discarded when the frame is
/// popped.
#[derive(Debug)]
pub(crate) struct EvaluationTarget {
    pub(crate) name: String,
    memo: HashMap<String, Value>,
}

/// Stack of template invocations, innermost last.
#[derive(Debug, Default)]
pub(crate) struct CallStack {
    frames: Vec<EvaluationTarget>,
    memo_disabled: bool,
}

impl CallStack {
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.frames.iter().any(|frame| frame.name == name)
    }

    /// Fails with the full invocation chain if `name` is already running.
    pub(crate) fn check(&self, name: &str) -> Result<(), TemplateError> {
        if !self.contains(name) {
            return Ok(());
        }
        let mut chain: Vec<String> = self.frames.iter().map(|f| f.name.clone()).collect();
        chain.push(name.to_string());
        Err(TemplateError::LoopDetected { chain })
    }

    pub(crate) fn push(&mut self, name: &str) {
        self.frames.push(EvaluationTarget {
            name: name.to_string(),
            memo: HashMap::new(),
        });
    }

    pub(crate) fn pop(&mut self) {
        self.frames.pop();
    }

    pub(crate) fn current(&self) -> Option<&EvaluationTarget> {
        self.frames.last()
    }

    /// Turn memoization off: every call evaluates its callee afresh.
    pub(crate) fn disable_memo(&mut self) {
        self.memo_disabled = true;
    }

    /// A result memoized in the innermost frame.
    pub(crate) fn cached(&self, key: &str) -> Option<&Value> {
        if self.memo_disabled {
            return None;
        }
        self.frames.last()?.memo.get(key)
    }

    /// Memoize a result in the innermost frame. No-op outside any frame.
    pub(crate) fn store(&mut self, key: String, value: Value) {
        if self.memo_disabled {
            return;
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.memo.insert(key, value);
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// Where an expression sits in a template, for error messages.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Site<'s> {
    Text,
    Condition(&'s str),
    Switch(&'s str),
    Case(&'s str),
    Property(&'s str),
}

impl Site<'_> {
    /// `[name]` followed by the site, e.g. `[greet] Condition 'x > 1'`.
    pub(crate) fn describe(self, template: &str) -> String {
        match self {
            Site::Text => format!("[{template}]"),
            Site::Condition(source) => format!("[{template}] Condition '{source}'"),
            Site::Switch(source) => format!("[{template}] Switch '{source}'"),
            Site::Case(source) => format!("[{template}] Case '{source}'"),
            Site::Property(key) => format!("[{template}] Property '{key}'"),
        }
    }
}
