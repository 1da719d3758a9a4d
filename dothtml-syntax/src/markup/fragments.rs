//! Sublanguage classification and fragment coordinate mapping
//!
//!     A dothtml document hosts several embedded languages: binding
//!     expressions and directives belong to the host framework, `style`
//!     attributes and `<style>` bodies are CSS, event-handler attributes and
//!     `<script>` bodies are JavaScript. External language engines work on a
//!     virtual document containing just the fragment text, so every fragment
//!     carries an affine offset mapping between host and virtual coordinates.

use crate::markup::document::Document;
use crate::markup::range::Position;
use crate::markup::tree::{NodeHandle, NodeKind, SyntaxTree};

/// A contiguous byte range of the host document owned by an embedded
/// language, plus the element it hangs off (the `<style>` element, or the
/// element carrying the attribute).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment {
    pub start: usize,
    pub end: usize,
    pub element: NodeHandle,
}

impl Fragment {
    /// Map a virtual-document offset back to the host document.
    pub fn original_position(&self, generated: usize) -> usize {
        self.start + generated
    }

    /// Map a host-document offset into the virtual document.
    pub fn generated_position(&self, original: usize) -> usize {
        original.saturating_sub(self.start)
    }

    /// Whether a host offset falls inside this fragment.
    pub fn is_in_generated(&self, original: usize) -> bool {
        self.start <= original && original < self.end
    }

    /// The fragment's slice of the host text, i.e. the whole content of the
    /// virtual document handed to the embedded-language engine.
    pub fn virtual_text<'a>(&self, text: &'a str) -> &'a str {
        let end = self.end.min(text.len());
        let start = self.start.min(end);
        &text[start..end]
    }
}

/// Which language owns a given position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sublanguage {
    /// Binding expressions and directives. Terminal for embedded engines.
    Host,
    /// Plain element markup.
    Markup,
    Style(Fragment),
    Script(Fragment),
}

fn is_event_handler_name(name: &str) -> bool {
    name.len() > 2 && name[..2].eq_ignore_ascii_case("on")
}

fn element_tag_name<'a>(tree: &SyntaxTree, element: NodeHandle, text: &'a str) -> Option<&'a str> {
    let start_tag = tree.child_of_kind(element, NodeKind::StartTag)?;
    let name = tree.child_of_kind(start_tag, NodeKind::TagName)?;
    tree.span(name).map(|span| &text[span])
}

/// The body range of an element: end of start tag to start of end tag. For an
/// element without an end tag the body runs to the element's end.
fn element_body_span(tree: &SyntaxTree, element: NodeHandle) -> Option<(usize, usize)> {
    let start_tag = tree.child_of_kind(element, NodeKind::StartTag)?;
    let body_start = tree.span(start_tag)?.end;
    let body_end = match tree.child_of_kind(element, NodeKind::EndTag) {
        Some(end_tag) => tree.span(end_tag)?.start,
        None => tree.span(element)?.end,
    };
    (body_start <= body_end).then_some((body_start, body_end))
}

/// Classify the sublanguage owning `position`.
///
/// Ancestor rules apply innermost-first: bindings and directives always win,
/// then style/event attributes, then style/script element bodies, and
/// anything else is plain markup.
pub fn determine_sublanguage(document: &Document, position: Position) -> Sublanguage {
    let offset = document.line_index().offset_at(position);
    let Some(tree) = document.tree() else {
        return Sublanguage::Markup;
    };
    let Some(node) = tree.deepest_at(offset) else {
        return Sublanguage::Markup;
    };
    let text = document.text();

    for ancestor in tree.ancestors(node) {
        match tree.kind(ancestor) {
            Some(NodeKind::Binding) | Some(NodeKind::Directive) => return Sublanguage::Host,
            Some(NodeKind::Attribute) => {
                if let Some(classified) = classify_attribute(tree, ancestor, offset, text) {
                    return classified;
                }
            }
            Some(NodeKind::Element) => {
                if let Some(classified) = classify_element_body(tree, ancestor, offset, text) {
                    return classified;
                }
            }
            _ => {}
        }
    }
    Sublanguage::Markup
}

fn classify_attribute(
    tree: &SyntaxTree,
    attribute: NodeHandle,
    offset: usize,
    text: &str,
) -> Option<Sublanguage> {
    let name_node = tree.child_of_kind(attribute, NodeKind::AttributeName)?;
    let name = &text[tree.span(name_node)?];
    let value = tree.child_of_kind(attribute, NodeKind::AttributeValue)?;
    // Bindings inside the value already classified as Host on the way up.
    if tree.child_of_kind(value, NodeKind::Binding).is_some() {
        return None;
    }
    let span = tree.span(value)?;
    let (start, end) = unquoted_bounds(text, span.start, span.end);
    if offset < start || offset > end {
        return None;
    }
    let element = tree.ancestor_of_kind(attribute, NodeKind::Element)?;
    let fragment = Fragment { start, end, element };
    if name.eq_ignore_ascii_case("style") {
        Some(Sublanguage::Style(fragment))
    } else if is_event_handler_name(name) {
        Some(Sublanguage::Script(fragment))
    } else {
        None
    }
}

fn classify_element_body(
    tree: &SyntaxTree,
    element: NodeHandle,
    offset: usize,
    text: &str,
) -> Option<Sublanguage> {
    let tag = element_tag_name(tree, element, text)?;
    let language = if tag.eq_ignore_ascii_case("style") {
        Sublanguage::Style
    } else if tag.eq_ignore_ascii_case("script") {
        Sublanguage::Script
    } else {
        return None;
    };
    let (start, end) = element_body_span(tree, element)?;
    if offset < start || offset > end {
        return None;
    }
    Some(language(Fragment { start, end, element }))
}

/// Strip the surrounding quotes off an attribute value span, if present.
fn unquoted_bounds(text: &str, start: usize, end: usize) -> (usize, usize) {
    let bytes = text.as_bytes();
    let mut start = start;
    let mut end = end;
    if start < end && (bytes[start] == b'"' || bytes[start] == b'\'') {
        let quote = bytes[start];
        start += 1;
        if end > start && bytes[end - 1] == quote {
            end -= 1;
        }
    }
    (start, end)
}
