//! Diagnostics over the syntax tree and the registry
//!
//!     Two sources: anomaly nodes the parser left in the tree (error and
//!     missing nodes), and prefixed tags that resolve to no known control.
//!     Everything is advisory; a document full of diagnostics still answers
//!     completion and hover queries.

use std::ops::Range;

use dothtml_metadata::ControlRegistry;
use dothtml_syntax::{Document, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentDiagnostic {
    pub span: Range<usize>,
    pub severity: Severity,
    pub message: String,
}

pub fn collect_diagnostics(
    document: &Document,
    registry: &ControlRegistry,
) -> Vec<DocumentDiagnostic> {
    let Some(tree) = document.tree() else {
        return Vec::new();
    };
    let text = document.text();
    let mut diagnostics = Vec::new();

    for node in tree.preorder() {
        let Some(span) = tree.span(node) else {
            continue;
        };
        match tree.kind(node) {
            Some(NodeKind::Error) => diagnostics.push(DocumentDiagnostic {
                span,
                severity: Severity::Error,
                message: "unexpected markup".to_owned(),
            }),
            Some(NodeKind::Missing) => {
                let message = match tree.parent(node).and_then(|parent| tree.kind(parent)) {
                    Some(NodeKind::Element) => "missing end tag",
                    Some(NodeKind::StartTag) => "unterminated start tag",
                    Some(NodeKind::Binding) => "unterminated binding",
                    Some(NodeKind::AttributeValue) => "unterminated attribute value",
                    Some(NodeKind::Attribute) => "missing attribute value",
                    _ => "incomplete markup",
                };
                diagnostics.push(DocumentDiagnostic {
                    span,
                    severity: Severity::Error,
                    message: message.to_owned(),
                });
            }
            Some(NodeKind::TagName) => {
                let tag = &text[span.clone()];
                if tag.contains(':') && registry.resolve_control(tag).is_none() {
                    diagnostics.push(DocumentDiagnostic {
                        span,
                        severity: Severity::Warning,
                        message: format!("unknown control `{tag}`"),
                    });
                }
            }
            _ => {}
        }
    }

    diagnostics
}
