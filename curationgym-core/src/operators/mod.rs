//! operators/mod.rs - The operator bank (§4.1): annotators, filters, and
//! transformers applied to a document.
//!
//! Per the spec's design notes, operators are re-cast as a small sum type
//! (`OperatorKind`) with variants `Annotate`, `Filter`, `Transform` rather
//! than a single trait with run-time branching on shape: the pipeline
//! driver matches on the variant to decide emit/reject/rewrite semantics.
//! The five operators wired into the fixed `§4.6` execution order
//! (language id, token count, quality, PII mask, slice assignment) are
//! concrete typed stages on [`crate::pipeline::Pipeline`]; `OperatorKind`
//! additionally lets callers build an ad hoc bank (e.g. HTML extraction or
//! URL filtering run ahead of the fixed pipeline, as a reader-side
//! preprocessing step).

pub mod html_extract;
pub mod lang_id;
pub mod pii_mask;
pub mod quality;
pub mod token_count;
pub mod url_filter;

use crate::document::Document;

/// Outcome of running any operator over a document: it is kept (possibly
/// annotated or rewritten) or rejected with a reason.
#[derive(Debug)]
pub enum OperatorOutcome {
    Keep(Document),
    Reject { doc: Document, reason: String },
}

pub enum OperatorKind {
    Annotate(Box<dyn Fn(&mut Document) + Send + Sync>),
    Filter(Box<dyn Fn(Document) -> OperatorOutcome + Send + Sync>),
    Transform(Box<dyn Fn(&mut Document) + Send + Sync>),
}

impl OperatorKind {
    pub fn apply(&self, doc: Document) -> OperatorOutcome {
        match self {
            OperatorKind::Annotate(f) => {
                let mut doc = doc;
                f(&mut doc);
                OperatorOutcome::Keep(doc)
            }
            OperatorKind::Filter(f) => f(doc),
            OperatorKind::Transform(f) => {
                let mut doc = doc;
                f(&mut doc);
                OperatorOutcome::Keep(doc)
            }
        }
    }
}

/// Runs a bank of operators over a document in order, short-circuiting on
/// the first rejection.
pub fn run_bank(bank: &[OperatorKind], mut doc: Document) -> OperatorOutcome {
    for op in bank {
        doc = match op.apply(doc) {
            OperatorOutcome::Keep(d) => d,
            rejected @ OperatorOutcome::Reject { .. } => return rejected,
        };
    }
    OperatorOutcome::Keep(doc)
}
