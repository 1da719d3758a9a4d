//! Arena-backed concrete syntax tree
//!
//!     Nodes live in a flat arena and reference each other by index, so the
//!     parent/child graph needs no shared ownership. Handles carry the arena
//!     generation they were minted for; a reparse produces a new generation and
//!     every accessor refuses handles from older generations by returning
//!     `None` instead of dereferencing stale indices.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Directive,
    DirectiveName,
    DirectiveValue,
    Element,
    StartTag,
    EndTag,
    TagName,
    Attribute,
    AttributeName,
    AttributeValue,
    Binding,
    BindingName,
    BindingExpression,
    Text,
    Comment,
    Error,
    Missing,
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub kind: NodeKind,
    pub span: Range<usize>,
    pub parent: Option<u32>,
    pub children: Vec<u32>,
}

/// A generation-tagged reference to a node in a [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone)]
pub struct SyntaxTree {
    generation: u32,
    nodes: Vec<NodeData>,
    root: u32,
}

impl SyntaxTree {
    pub(crate) fn new(generation: u32, nodes: Vec<NodeData>, root: u32) -> Self {
        Self {
            generation,
            nodes,
            root,
        }
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn root(&self) -> NodeHandle {
        NodeHandle {
            index: self.root,
            generation: self.generation,
        }
    }

    fn get(&self, handle: NodeHandle) -> Option<&NodeData> {
        if handle.generation != self.generation {
            return None;
        }
        self.nodes.get(handle.index as usize)
    }

    fn handle(&self, index: u32) -> NodeHandle {
        NodeHandle {
            index,
            generation: self.generation,
        }
    }

    pub fn kind(&self, handle: NodeHandle) -> Option<NodeKind> {
        self.get(handle).map(|node| node.kind)
    }

    pub fn span(&self, handle: NodeHandle) -> Option<Range<usize>> {
        self.get(handle).map(|node| node.span.clone())
    }

    pub fn parent(&self, handle: NodeHandle) -> Option<NodeHandle> {
        self.get(handle)?.parent.map(|index| self.handle(index))
    }

    pub fn children(&self, handle: NodeHandle) -> Vec<NodeHandle> {
        self.get(handle)
            .map(|node| node.children.iter().map(|&i| self.handle(i)).collect())
            .unwrap_or_default()
    }

    /// First direct child of the given kind.
    pub fn child_of_kind(&self, handle: NodeHandle, kind: NodeKind) -> Option<NodeHandle> {
        self.get(handle)?
            .children
            .iter()
            .map(|&i| self.handle(i))
            .find(|&child| self.kind(child) == Some(kind))
    }

    pub fn children_of_kind(&self, handle: NodeHandle, kind: NodeKind) -> Vec<NodeHandle> {
        self.children(handle)
            .into_iter()
            .filter(|&child| self.kind(child) == Some(kind))
            .collect()
    }

    /// The node itself followed by its ancestors up to the root.
    pub fn ancestors(&self, handle: NodeHandle) -> Vec<NodeHandle> {
        let mut chain = Vec::new();
        let mut current = Some(handle);
        while let Some(node) = current {
            if self.get(node).is_none() {
                break;
            }
            chain.push(node);
            current = self.parent(node);
        }
        chain
    }

    /// Nearest ancestor (including the node itself) of the given kind.
    pub fn ancestor_of_kind(&self, handle: NodeHandle, kind: NodeKind) -> Option<NodeHandle> {
        self.ancestors(handle)
            .into_iter()
            .find(|&node| self.kind(node) == Some(kind))
    }

    /// Deepest node whose span contains the offset (start inclusive, end
    /// exclusive). Zero-width nodes match when the offset sits exactly on them.
    pub fn deepest_at(&self, offset: usize) -> Option<NodeHandle> {
        let mut current = self.root();
        let root_span = self.span(current)?;
        if !span_contains(&root_span, offset) {
            return None;
        }
        'descend: loop {
            for child in self.children(current) {
                let span = self.span(child)?;
                if span_contains(&span, offset) {
                    current = child;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }

    /// Pre-order traversal of the whole tree.
    pub fn preorder(&self) -> Vec<NodeHandle> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(index) = stack.pop() {
            out.push(self.handle(index));
            let node = &self.nodes[index as usize];
            for &child in node.children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Structural equality: same node kinds and spans in the same shape.
    /// Generations are ignored; this is the invariant checked by the
    /// incremental-vs-full reparse tests.
    pub fn structurally_equal(&self, other: &SyntaxTree) -> bool {
        fn eq(a: &SyntaxTree, ai: u32, b: &SyntaxTree, bi: u32) -> bool {
            let an = &a.nodes[ai as usize];
            let bn = &b.nodes[bi as usize];
            an.kind == bn.kind
                && an.span == bn.span
                && an.children.len() == bn.children.len()
                && an
                    .children
                    .iter()
                    .zip(bn.children.iter())
                    .all(|(&ac, &bc)| eq(a, ac, b, bc))
        }
        eq(self, self.root, other, other.root)
    }

    /// True if any node in the subtree is an Error or Missing node.
    pub fn subtree_has_anomalies(&self, handle: NodeHandle) -> bool {
        let Some(node) = self.get(handle) else {
            return false;
        };
        if matches!(node.kind, NodeKind::Error | NodeKind::Missing) {
            return true;
        }
        node.children
            .iter()
            .any(|&child| self.subtree_has_anomalies(self.handle(child)))
    }

    /// Replace the subtree rooted at `target` with the root subtree of
    /// `replacement`, producing a new generation. Nodes entirely after the old
    /// subtree shift by `delta`; ancestors of the target grow by `delta`.
    ///
    /// The caller guarantees that `replacement` spans exactly the target's old
    /// span adjusted by `delta` and that no other node overlaps the target.
    pub(crate) fn splice(
        &self,
        target: NodeHandle,
        replacement: &SyntaxTree,
        delta: isize,
    ) -> Option<SyntaxTree> {
        let target_data = self.get(target)?.clone();
        let old_end = target_data.span.end;
        let generation = self.generation + 1;

        // Indices of the target subtree in the old arena; these are dropped.
        let mut dropped = vec![false; self.nodes.len()];
        mark_subtree(&self.nodes, target.index, &mut dropped);

        // Ancestors of the target need their end offsets extended.
        let mut is_ancestor = vec![false; self.nodes.len()];
        let mut cursor = target_data.parent;
        while let Some(index) = cursor {
            is_ancestor[index as usize] = true;
            cursor = self.nodes[index as usize].parent;
        }

        let mut nodes: Vec<NodeData> = Vec::with_capacity(self.nodes.len());
        let mut remap: Vec<Option<u32>> = vec![None; self.nodes.len()];
        for (index, node) in self.nodes.iter().enumerate() {
            if dropped[index] {
                continue;
            }
            let mut copied = node.clone();
            if is_ancestor[index] {
                copied.span.end = shift(copied.span.end, delta);
            } else if copied.span.start >= old_end {
                copied.span.start = shift(copied.span.start, delta);
                copied.span.end = shift(copied.span.end, delta);
            }
            remap[index] = Some(nodes.len() as u32);
            nodes.push(copied);
        }

        // Rewrite surviving parent/child indices.
        for node in nodes.iter_mut() {
            node.parent = node.parent.and_then(|p| remap[p as usize]);
            // The dropped target keeps its slot in its parent's child list for
            // now; it is patched to the replacement root below.
            node.children = node
                .children
                .iter()
                .filter_map(|&c| {
                    if c == target.index {
                        None
                    } else {
                        remap[c as usize]
                    }
                })
                .collect();
        }

        // Graft the replacement subtree.
        let base = nodes.len() as u32;
        for node in replacement.nodes.iter() {
            let mut copied = node.clone();
            copied.parent = copied.parent.map(|p| p + base);
            copied.children = copied.children.iter().map(|&c| c + base).collect();
            nodes.push(copied);
        }
        let new_subtree_root = base + replacement.root;

        match target_data.parent {
            Some(parent) => {
                let new_parent = remap[parent as usize]?;
                nodes[new_subtree_root as usize].parent = Some(new_parent);
                // Restore the replacement at the target's original position
                // among its siblings.
                let position = self.nodes[parent as usize]
                    .children
                    .iter()
                    .position(|&c| c == target.index)?;
                // Count surviving siblings before the target to find the
                // insertion point in the rewritten child list.
                let surviving_before = self.nodes[parent as usize].children[..position]
                    .iter()
                    .filter(|&&c| remap[c as usize].is_some())
                    .count();
                nodes[new_parent as usize]
                    .children
                    .insert(surviving_before, new_subtree_root);
                let root = remap[self.root as usize]?;
                Some(SyntaxTree::new(generation, nodes, root))
            }
            // Replacing the root wholesale is a full reparse, not a splice.
            None => None,
        }
    }
}

fn span_contains(span: &Range<usize>, offset: usize) -> bool {
    if span.start == span.end {
        return span.start == offset;
    }
    span.start <= offset && offset < span.end
}

fn shift(value: usize, delta: isize) -> usize {
    if delta >= 0 {
        value + delta as usize
    } else {
        value - (-delta) as usize
    }
}

fn mark_subtree(nodes: &[NodeData], index: u32, marks: &mut [bool]) {
    marks[index as usize] = true;
    for &child in &nodes[index as usize].children {
        mark_subtree(nodes, child, marks);
    }
}

/// Incremental builder used by the parser. Children are created before their
/// parent; `add` wires the parent links when the parent node is created.
#[derive(Debug, Default)]
pub(crate) struct TreeBuilder {
    nodes: Vec<NodeData>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn leaf(&mut self, kind: NodeKind, span: Range<usize>) -> u32 {
        self.nodes.push(NodeData {
            kind,
            span,
            parent: None,
            children: Vec::new(),
        });
        (self.nodes.len() - 1) as u32
    }

    pub fn node(&mut self, kind: NodeKind, span: Range<usize>, children: Vec<u32>) -> u32 {
        let index = self.nodes.len() as u32;
        for &child in &children {
            self.nodes[child as usize].parent = Some(index);
        }
        self.nodes.push(NodeData {
            kind,
            span,
            parent: None,
            children,
        });
        index
    }

    pub fn span_of(&self, index: u32) -> Range<usize> {
        self.nodes[index as usize].span.clone()
    }

    pub fn kind_of(&self, index: u32) -> NodeKind {
        self.nodes[index as usize].kind
    }

    pub fn finish(self, root: u32, generation: u32) -> SyntaxTree {
        SyntaxTree::new(generation, self.nodes, root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_tree(generation: u32) -> SyntaxTree {
        let mut builder = TreeBuilder::new();
        let name = builder.leaf(NodeKind::TagName, 1..4);
        let start = builder.node(NodeKind::StartTag, 0..5, vec![name]);
        let text = builder.leaf(NodeKind::Text, 5..9);
        let element = builder.node(NodeKind::Element, 0..9, vec![start, text]);
        let root = builder.node(NodeKind::Document, 0..9, vec![element]);
        builder.finish(root, generation)
    }

    #[test]
    fn stale_generation_handles_resolve_to_none() {
        let old = small_tree(1);
        let new = small_tree(2);
        let stale = old.root();
        assert!(new.kind(stale).is_none());
        assert!(new.span(stale).is_none());
        assert!(new.children(stale).is_empty());
    }

    #[test]
    fn deepest_at_descends_to_leaves() {
        let tree = small_tree(1);
        let node = tree.deepest_at(2).unwrap();
        assert_eq!(tree.kind(node), Some(NodeKind::TagName));
        let node = tree.deepest_at(6).unwrap();
        assert_eq!(tree.kind(node), Some(NodeKind::Text));
    }

    #[test]
    fn child_spans_stay_inside_parents() {
        let tree = small_tree(1);
        for handle in tree.preorder() {
            if let Some(parent) = tree.parent(handle) {
                let child_span = tree.span(handle).unwrap();
                let parent_span = tree.span(parent).unwrap();
                assert!(parent_span.start <= child_span.start);
                assert!(child_span.end <= parent_span.end);
            }
        }
    }

    #[test]
    fn structural_equality_ignores_generations() {
        assert!(small_tree(1).structurally_equal(&small_tree(7)));
    }
}
