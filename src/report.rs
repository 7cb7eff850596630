//! Recoverable parse conditions and where they go.
//!
//! The parser never aborts on malformed structure. Every tolerated defect
//! (missing blank line, boundary-less multipart, truncated input, ...) is
//! turned into a [`Condition`] and handed to the parser's [`Report`] sink,
//! then parsing continues and a best-effort partial tree is still returned.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::warn;

/// Classification of a recoverable structural defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKind {
    /// End of input or a boundary delimiter arrived before the blank line
    /// that should terminate a header block.
    MissingHeaderTerminator,
    /// A header line had no colon and was not a folded continuation.
    MalformedHeader,
    /// A `Content-Type` value could not be parsed; `text/plain` was assumed.
    InvalidContentType,
    /// A `multipart/*` type had no `boundary` parameter and was kept opaque.
    MissingBoundary,
    /// End of scope arrived before the multipart's closing delimiter.
    TruncatedMultipart,
    /// End of scope arrived inside an embedded message.
    TruncatedMessage,
    /// Nesting went past the depth cap; the entity was kept opaque.
    DepthExceeded,
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MissingHeaderTerminator => "missing header terminator",
            Self::MalformedHeader => "malformed header",
            Self::InvalidContentType => "invalid content type",
            Self::MissingBoundary => "missing boundary",
            Self::TruncatedMultipart => "truncated multipart",
            Self::TruncatedMessage => "truncated message",
            Self::DepthExceeded => "nesting depth exceeded",
        };
        f.write_str(name)
    }
}

/// One recoverable defect, located by stream offset.
#[derive(Debug, Clone)]
pub struct Condition {
    pub kind: ConditionKind,
    pub offset: u64,
    pub description: String,
}

impl Condition {
    pub fn new(kind: ConditionKind, offset: u64, description: impl Into<String>) -> Self {
        Self {
            kind,
            offset,
            description: description.into(),
        }
    }
}

/// Sink for recoverable conditions.
pub trait Report {
    fn report(&mut self, condition: &Condition);
}

/// Default sink: emits each condition as a `tracing` warning.
#[derive(Debug, Default)]
pub struct LogReport;

impl Report for LogReport {
    fn report(&mut self, condition: &Condition) {
        warn!(
            kind = %condition.kind,
            offset = condition.offset,
            "{}",
            condition.description
        );
    }
}

/// Collecting sink with a cloneable handle.
///
/// Clone one handle into the parser and keep the other; after construction
/// the kept handle sees every condition the parse produced.
#[derive(Debug, Clone, Default)]
pub struct CollectReport {
    inner: Rc<RefCell<Vec<Condition>>>,
}

impl CollectReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the conditions reported so far.
    pub fn conditions(&self) -> Vec<Condition> {
        self.inner.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

impl Report for CollectReport {
    fn report(&mut self, condition: &Condition) {
        self.inner.borrow_mut().push(condition.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_report_shares_state_across_clones() {
        let collector = CollectReport::new();
        let mut handle = collector.clone();
        handle.report(&Condition::new(
            ConditionKind::MissingBoundary,
            42,
            "multipart without boundary parameter",
        ));
        assert_eq!(collector.len(), 1);
        assert_eq!(collector.conditions()[0].offset, 42);
        assert_eq!(
            collector.conditions()[0].kind,
            ConditionKind::MissingBoundary
        );
    }

    #[test]
    fn test_condition_kind_display() {
        assert_eq!(
            ConditionKind::TruncatedMultipart.to_string(),
            "truncated multipart"
        );
    }
}
