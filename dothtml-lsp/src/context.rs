//! Completion context classification
//!
//!     Nothing here is stateful: every query re-derives the context from the
//!     current tree, starting at the node covering `offset - 1` (the
//!     character just typed). The classification decides which completion
//!     producer runs and computes the byte range the accepted item should
//!     replace, so "completing over" a half-typed name behaves the same as
//!     completing into empty space.

use std::ops::Range;

use dothtml_syntax::{Document, NodeHandle, NodeKind, SyntaxTree};

/// Where the caret sits, from the completion engine's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionContext {
    /// At a binding's name (possibly not yet typed). `closer` is the closing
    /// delimiter to append when none is in reach of the caret.
    BindingStart {
        target: Range<usize>,
        closer: Option<&'static str>,
    },
    /// Inside a binding expression; the expression language is out of scope.
    BindingBody,
    /// Typing a tag name. `anchor` is the nearest enclosing element whose own
    /// start tag is already complete, i.e. the parent the new tag will live
    /// in. `written` is the name text typed so far.
    TagStart {
        anchor: Option<NodeHandle>,
        target: Range<usize>,
        written: String,
    },
    /// In a start tag's attribute region. `target` is the span of the
    /// attribute name under the caret, when one exists.
    AttributeName {
        element: NodeHandle,
        target: Option<Range<usize>>,
    },
    Unknown,
}

/// Classify the caret position at byte `offset`. `lookahead` bounds how far
/// past the caret to search for an existing binding-closing delimiter.
pub fn classify(document: &Document, offset: usize, lookahead: usize) -> CompletionContext {
    let text = document.text();
    let Some(tree) = document.tree() else {
        return CompletionContext::Unknown;
    };
    if offset == 0 || offset > text.len() {
        return CompletionContext::Unknown;
    }
    let Some(node) = tree.deepest_at(offset - 1) else {
        return CompletionContext::Unknown;
    };
    let chain = tree.ancestors(node);

    if let Some(&binding) = chain
        .iter()
        .find(|&&n| tree.kind(n) == Some(NodeKind::Binding))
    {
        return classify_binding(tree, binding, offset, text, lookahead);
    }

    // A caret inside a plain (non-binding) attribute value completes nothing.
    if chain
        .iter()
        .any(|&n| tree.kind(n) == Some(NodeKind::AttributeValue))
    {
        return CompletionContext::Unknown;
    }

    if let Some(&start_tag) = chain
        .iter()
        .find(|&&n| tree.kind(n) == Some(NodeKind::StartTag))
    {
        return classify_start_tag(tree, start_tag, offset, text);
    }

    // A bare `<` parses as an error node; treat the caret after it as the
    // beginning of a tag name.
    if tree.kind(node) == Some(NodeKind::Error) {
        if let Some(span) = tree.span(node) {
            if text[span.clone()].starts_with('<') && offset > span.start {
                let written = text[span.start + 1..offset.min(span.end)].to_owned();
                if is_tag_name_text(&written) {
                    return CompletionContext::TagStart {
                        anchor: anchor_element(tree, node, offset),
                        target: span.start + 1..offset,
                        written,
                    };
                }
            }
        }
    }

    CompletionContext::Unknown
}

fn classify_binding(
    tree: &SyntaxTree,
    binding: NodeHandle,
    offset: usize,
    text: &str,
    lookahead: usize,
) -> CompletionContext {
    let Some(binding_span) = tree.span(binding) else {
        return CompletionContext::Unknown;
    };
    let double = text[binding_span.start..].starts_with("{{");
    let open_len = if double { 2 } else { 1 };

    let Some(name) = tree.child_of_kind(binding, NodeKind::BindingName) else {
        return CompletionContext::BindingBody;
    };
    let Some(name_span) = tree.span(name) else {
        return CompletionContext::BindingBody;
    };

    // At the name: anywhere from just past the opening delimiter through the
    // end of the (possibly empty) name token.
    let at_name = offset >= binding_span.start + open_len && offset <= name_span.end;
    if !at_name {
        return CompletionContext::BindingBody;
    }

    // Byte scan: `}` is ASCII, and the window edge may fall inside a
    // multibyte character.
    let expected = if double { "}}" } else { "}" };
    let window_end = (offset + lookahead + expected.len()).min(text.len());
    let closer = if text.as_bytes()[offset..window_end].contains(&b'}') {
        None
    } else {
        Some(expected)
    };

    let target_end = tree
        .child_of_kind(binding, NodeKind::BindingExpression)
        .and_then(|expression| tree.span(expression))
        .map(|span| span.start)
        .unwrap_or_else(|| name_span.end.max(offset));

    CompletionContext::BindingStart {
        target: name_span.start..target_end,
        closer,
    }
}

fn classify_start_tag(
    tree: &SyntaxTree,
    start_tag: NodeHandle,
    offset: usize,
    text: &str,
) -> CompletionContext {
    let Some(tag_span) = tree.span(start_tag) else {
        return CompletionContext::Unknown;
    };
    // Caret after the tag's closing `>` belongs to the content, not the tag.
    if offset >= tag_span.end && text[..tag_span.end].ends_with('>') {
        return CompletionContext::Unknown;
    }

    let written = &text[tag_span.start + 1..offset.min(tag_span.end)];
    if is_tag_name_text(written) {
        let element = tree.ancestor_of_kind(start_tag, NodeKind::Element);
        let anchor = element.and_then(|element| {
            tree.parent(element)
                .and_then(|parent| anchor_element(tree, parent, offset))
        });
        let name_span = tree
            .child_of_kind(start_tag, NodeKind::TagName)
            .and_then(|name| tree.span(name))
            .unwrap_or(tag_span.start + 1..offset);
        return CompletionContext::TagStart {
            anchor,
            target: name_span.start..name_span.end.max(offset),
            written: written.to_owned(),
        };
    }

    let Some(element) = tree.ancestor_of_kind(start_tag, NodeKind::Element) else {
        return CompletionContext::Unknown;
    };
    let target = tree
        .children_of_kind(start_tag, NodeKind::Attribute)
        .into_iter()
        .filter_map(|attribute| tree.child_of_kind(attribute, NodeKind::AttributeName))
        .filter_map(|name| tree.span(name))
        .find(|span| span.start <= offset && offset <= span.end);
    CompletionContext::AttributeName { element, target }
}

/// Nearest element at or above `from` whose start tag is complete before the
/// caret. That element is the parent a freshly typed tag belongs to.
fn anchor_element(tree: &SyntaxTree, from: NodeHandle, offset: usize) -> Option<NodeHandle> {
    tree.ancestors(from).into_iter().find(|&node| {
        tree.kind(node) == Some(NodeKind::Element)
            && tree
                .child_of_kind(node, NodeKind::StartTag)
                .and_then(|start_tag| tree.span(start_tag))
                .map(|span| span.end <= offset && tree_tag_terminated(tree, node))
                .unwrap_or(false)
    })
}

fn tree_tag_terminated(tree: &SyntaxTree, element: NodeHandle) -> bool {
    // An unterminated start tag has a Missing child where `>` should be.
    tree.child_of_kind(element, NodeKind::StartTag)
        .map(|start_tag| tree.child_of_kind(start_tag, NodeKind::Missing).is_none())
        .unwrap_or(false)
}

fn is_tag_name_text(written: &str) -> bool {
    written
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '-' | '.'))
}
