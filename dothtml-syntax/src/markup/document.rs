//! Document buffer with versioning and incremental reparse
//!
//!     A [`Document`] owns the text of one open editor buffer, a version
//!     counter bumped on every mutation, the current syntax tree and a lazily
//!     built line index. Edits arrive either as a full-text replacement or as
//!     a batch of ranged changes; ranged batches are patched into the tree
//!     incrementally when the damage is confined to a single element, and
//!     fall back to a full reparse otherwise.
//!
//!     The incremental path must be indistinguishable from a full reparse:
//!     the splice is only kept when the damaged element reparses cleanly and
//!     covers its slice exactly. Anything else (new anomalies, structural
//!     spill-over, edits at element boundaries) takes the full-reparse path,
//!     so both paths always produce structurally equivalent trees.

use crate::markup::parser::{parse_document_gen, parse_element_slice};
use crate::markup::range::{LineIndex, Position};
use crate::markup::tree::{NodeHandle, NodeKind, SyntaxTree};

/// One edit from the editor. `range` is `None` for a whole-document
/// replacement. Ranged edits in a batch apply sequentially, each against the
/// text produced by the previous one.
#[derive(Debug, Clone)]
pub struct TextChange {
    pub range: Option<(Position, Position)>,
    pub text: String,
}

impl TextChange {
    pub fn full(text: impl Into<String>) -> Self {
        Self {
            range: None,
            text: text.into(),
        }
    }

    pub fn ranged(start: Position, end: Position, text: impl Into<String>) -> Self {
        Self {
            range: Some((start, end)),
            text: text.into(),
        }
    }
}

/// A ranged edit expressed in byte offsets of the pre-edit text.
#[derive(Debug, Clone, Copy)]
struct TreeEdit {
    start: usize,
    old_end: usize,
    new_end: usize,
}

#[derive(Debug)]
pub struct Document {
    text: String,
    version: u64,
    tree: Option<SyntaxTree>,
    line_index: Option<LineIndex>,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        let mut document = Self {
            text: String::new(),
            version: 0,
            tree: None,
            line_index: None,
        };
        document.set_text(text);
        document
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn tree(&self) -> Option<&SyntaxTree> {
        self.tree.as_ref()
    }

    fn next_generation(&self) -> u32 {
        self.tree
            .as_ref()
            .map(|tree| tree.generation() + 1)
            .unwrap_or(0)
    }

    /// Replace the whole document text and reparse from scratch.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.version += 1;
        self.line_index = None;
        self.tree = Some(parse_document_gen(&self.text, self.next_generation()));
    }

    /// Apply a batch of edits, then update the tree either incrementally or
    /// with a full reparse.
    pub fn apply_changes(&mut self, changes: &[TextChange]) {
        let mut force_full = false;
        let mut edits: Vec<TreeEdit> = Vec::new();

        for change in changes {
            match change.range {
                None => {
                    self.text = change.text.clone();
                    force_full = true;
                    edits.clear();
                }
                Some((start, end)) => {
                    let index = LineIndex::new(&self.text);
                    let start_offset = index.offset_at(start);
                    let end_offset = index.offset_at(end).max(start_offset);
                    self.text
                        .replace_range(start_offset..end_offset, &change.text);
                    edits.push(TreeEdit {
                        start: start_offset,
                        old_end: end_offset,
                        new_end: start_offset + change.text.len(),
                    });
                }
            }
        }

        self.version += 1;
        self.line_index = None;

        if force_full || self.tree.is_none() {
            self.tree = Some(parse_document_gen(&self.text, self.next_generation()));
            return;
        }

        // Multi-edit batches are rare; patching a single damaged region is
        // the case worth optimizing.
        if edits.len() != 1 || !self.try_incremental(edits[0]) {
            self.tree = Some(parse_document_gen(&self.text, self.next_generation()));
        }
    }

    /// Patch the current tree in place for one edit. Returns false when the
    /// edit cannot be represented as a clean element-local splice.
    fn try_incremental(&mut self, edit: TreeEdit) -> bool {
        let Some(tree) = self.tree.as_ref() else {
            return false;
        };
        let Some(target) = containing_element(tree, edit) else {
            return false;
        };
        let Some(old_span) = tree.span(target) else {
            return false;
        };

        let delta = edit.new_end as isize - edit.old_end as isize;
        let new_end = (old_span.end as isize + delta) as usize;
        if new_end > self.text.len() || old_span.start >= new_end {
            return false;
        }

        let Some(replacement) = parse_element_slice(&self.text[old_span.start..new_end], old_span.start)
        else {
            return false;
        };
        match tree.splice(target, &replacement, delta) {
            Some(patched) => {
                self.tree = Some(patched);
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Position math

    fn ensure_line_index(&mut self) -> &LineIndex {
        if self.line_index.is_none() {
            self.line_index = Some(LineIndex::new(&self.text));
        }
        self.line_index.as_ref().expect("index was just built")
    }

    pub fn offset_at(&mut self, position: Position) -> usize {
        self.ensure_line_index().offset_at(position)
    }

    pub fn position_at(&mut self, offset: usize) -> Position {
        self.ensure_line_index().position_at(offset)
    }

    /// A fresh line index for the current text, for callers that need many
    /// conversions without holding the document mutably.
    pub fn line_index(&self) -> LineIndex {
        match &self.line_index {
            Some(index) => index.clone(),
            None => LineIndex::new(&self.text),
        }
    }
}

/// The innermost element strictly containing the whole damage range. Strict
/// containment keeps boundary tokens (`<`, the closing `>`) out of the
/// damage, so the surrounding structure cannot be affected by the edit.
fn containing_element(tree: &SyntaxTree, edit: TreeEdit) -> Option<NodeHandle> {
    let start_node = tree.deepest_at(edit.start)?;
    tree.ancestors(start_node).into_iter().find(|&node| {
        tree.kind(node) == Some(NodeKind::Element)
            && tree
                .span(node)
                .map(|span| span.start < edit.start && edit.old_end < span.end)
                .unwrap_or(false)
    })
}
