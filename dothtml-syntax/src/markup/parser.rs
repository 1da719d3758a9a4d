//! Recursive-descent parser for dothtml markup
//!
//!     The parser consumes the token stream from [`crate::markup::lexer`] and
//!     builds the arena tree from [`crate::markup::tree`]. It is written for
//!     editor buffers, so recovery is the default mode of operation:
//!
//!         - unterminated tags, bindings and comments produce Missing nodes at
//!           the point where the closing token should have been;
//!         - stray tokens become Error nodes and parsing continues;
//!         - an end tag that matches an open ancestor closes the intermediate
//!           elements (each gets a Missing end tag) instead of derailing the
//!           rest of the document.
//!
//!     Directives (`@name value` lines) are only recognized before the first
//!     piece of markup content. `<style>` and `<script>` bodies are kept as raw
//!     text so embedded CSS/JS never confuses the markup grammar; the fragment
//!     mapper hands those ranges to the dedicated sublanguage engines.

use std::ops::Range;

use crate::markup::lexer::{tokenize, Token};
use crate::markup::tree::{NodeKind, SyntaxTree, TreeBuilder};

/// HTML elements that never have content or an end tag.
const VOID_ELEMENTS: &[&str] = &["area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr"];

/// Elements whose body is raw text owned by an embedded language.
const RAW_TEXT_ELEMENTS: &[&str] = &["style", "script"];

pub fn parse_document(text: &str) -> SyntaxTree {
    parse_document_gen(text, 0)
}

pub(crate) fn parse_document_gen(text: &str, generation: u32) -> SyntaxTree {
    let mut parser = Parser::new(text, 0);
    let root = parser.parse_document();
    parser.builder.finish(root, generation)
}

/// Parse a text slice that is expected to hold exactly one well-formed
/// element (used for incremental reparse). Returns `None` when the slice does
/// not parse to a single clean element covering the whole slice; the caller
/// falls back to a full reparse in that case.
pub(crate) fn parse_element_slice(slice: &str, base: usize) -> Option<SyntaxTree> {
    let mut parser = Parser::new(slice, base);
    if parser.peek() != Some(Token::Lt) || parser.peek_at(1) != Some(Token::Ident) {
        return None;
    }
    let element = parser.parse_element();
    if !parser.at_eof() {
        return None;
    }
    if parser.builder.kind_of(element) != NodeKind::Element {
        return None;
    }
    let tree = parser.builder.finish(element, 0);
    if tree.subtree_has_anomalies(tree.root()) {
        return None;
    }
    Some(tree)
}

enum Step {
    Continue,
    CloseParent,
}

struct Parser<'a> {
    src: &'a str,
    base: usize,
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
    builder: TreeBuilder,
    open_elements: Vec<String>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, base: usize) -> Self {
        Self {
            src,
            base,
            tokens: tokenize(src),
            pos: 0,
            builder: TreeBuilder::new(),
            open_elements: Vec::new(),
        }
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|(t, _)| *t)
    }

    fn peek_at(&self, ahead: usize) -> Option<Token> {
        self.tokens.get(self.pos + ahead).map(|(t, _)| *t)
    }

    /// Current offset in the slice's local coordinates.
    fn cursor_rel(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.start)
            .unwrap_or(self.src.len())
    }

    /// Current offset in absolute document coordinates.
    fn cursor(&self) -> usize {
        self.base + self.cursor_rel()
    }

    fn bump(&mut self) -> (Token, Range<usize>) {
        let (token, span) = self.tokens[self.pos].clone();
        self.pos += 1;
        (token, self.base + span.start..self.base + span.end)
    }

    fn skip_whitespace(&mut self) {
        while self.peek() == Some(Token::Whitespace) {
            self.pos += 1;
        }
    }

    fn skip_to_rel(&mut self, offset: usize) {
        while self
            .tokens
            .get(self.pos)
            .map(|(_, span)| span.start < offset)
            .unwrap_or(false)
        {
            self.pos += 1;
        }
    }

    fn missing_here(&mut self) -> u32 {
        let at = self.cursor();
        self.builder.leaf(NodeKind::Missing, at..at)
    }

    // ------------------------------------------------------------------
    // Document level

    fn parse_document(&mut self) -> u32 {
        let mut children = Vec::new();

        // Directive block: `@name value` lines before any markup content.
        loop {
            let mark = self.pos;
            self.skip_whitespace();
            if self.peek() == Some(Token::At) {
                children.push(self.parse_directive());
            } else {
                self.pos = mark;
                break;
            }
        }

        while !self.at_eof() {
            match self.parse_content_item(&mut children, None) {
                Step::Continue => {}
                Step::CloseParent => {
                    // An end tag with no matching ancestor at document level.
                    children.push(self.parse_end_tag_as_error());
                }
            }
        }

        self.builder
            .node(NodeKind::Document, self.base..self.base + self.src.len(), children)
    }

    fn parse_directive(&mut self) -> u32 {
        let (_, at_span) = self.bump();
        let mut children = Vec::new();

        let name_end_rel = if self.peek() == Some(Token::Ident) {
            let (_, span) = self.bump();
            children.push(self.builder.leaf(NodeKind::DirectiveName, span.clone()));
            span.end - self.base
        } else {
            children.push(self.missing_here());
            self.cursor_rel()
        };

        let eol_rel = self.src[name_end_rel..]
            .find('\n')
            .map(|i| name_end_rel + i)
            .unwrap_or(self.src.len());

        let rest = &self.src[name_end_rel..eol_rel];
        let trimmed = rest.trim();
        let mut end_rel = name_end_rel;
        if !trimmed.is_empty() {
            let value_start = name_end_rel + (rest.len() - rest.trim_start().len());
            let value_end = value_start + trimmed.len();
            children.push(self.builder.leaf(
                NodeKind::DirectiveValue,
                self.base + value_start..self.base + value_end,
            ));
            end_rel = value_end;
        }

        self.skip_to_rel(eol_rel);
        self.builder
            .node(NodeKind::Directive, at_span.start..self.base + end_rel, children)
    }

    // ------------------------------------------------------------------
    // Content

    fn parse_content_item(&mut self, out: &mut Vec<u32>, parent: Option<&str>) -> Step {
        match self.peek() {
            None => Step::CloseParent,
            Some(Token::Lt) => {
                if self.peek_at(1) == Some(Token::Ident) {
                    let element = self.parse_element();
                    out.push(element);
                } else {
                    // A bare `<` the user is still typing.
                    let (_, span) = self.bump();
                    out.push(self.builder.leaf(NodeKind::Error, span));
                }
                Step::Continue
            }
            Some(Token::LtSlash) => {
                let end_name = self.peek_end_tag_name();
                let closes_parent = parent.map(|p| end_name.as_deref() == Some(p)).unwrap_or(false);
                let closes_ancestor = end_name
                    .as_deref()
                    .map(|n| self.open_elements.iter().any(|open| open == n))
                    .unwrap_or(false);
                if closes_parent || closes_ancestor {
                    Step::CloseParent
                } else {
                    out.push(self.parse_end_tag_as_error());
                    Step::Continue
                }
            }
            Some(Token::CommentOpen) => {
                out.push(self.parse_comment());
                Step::Continue
            }
            Some(Token::BraceOpen) | Some(Token::DoubleBraceOpen) => {
                out.push(self.parse_binding());
                Step::Continue
            }
            Some(_) => {
                out.push(self.parse_text_run());
                Step::Continue
            }
        }
    }

    fn parse_text_run(&mut self) -> u32 {
        let start = self.cursor();
        let mut end = start;
        while let Some(token) = self.peek() {
            match token {
                Token::Lt
                | Token::LtSlash
                | Token::CommentOpen
                | Token::BraceOpen
                | Token::DoubleBraceOpen => break,
                _ => {
                    let (_, span) = self.bump();
                    end = span.end;
                }
            }
        }
        self.builder.leaf(NodeKind::Text, start..end)
    }

    fn parse_comment(&mut self) -> u32 {
        let (_, open_span) = self.bump();
        let mut children = Vec::new();
        let mut end = open_span.end;
        loop {
            match self.peek() {
                None => {
                    children.push(self.missing_here());
                    break;
                }
                Some(Token::CommentClose) => {
                    let (_, span) = self.bump();
                    end = span.end;
                    break;
                }
                Some(_) => {
                    let (_, span) = self.bump();
                    end = span.end;
                }
            }
        }
        self.builder
            .node(NodeKind::Comment, open_span.start..end, children)
    }

    // ------------------------------------------------------------------
    // Elements

    fn parse_element(&mut self) -> u32 {
        let start_tag = self.parse_start_tag();
        let StartTagInfo {
            node: start_node,
            name,
            self_closing,
            terminated,
        } = start_tag;

        let start = self.builder.span_of(start_node).start;
        let mut children = vec![start_node];

        let lowercase = name.to_ascii_lowercase();
        let is_void = VOID_ELEMENTS.contains(&lowercase.as_str());
        if self_closing || !terminated || is_void {
            let end = self.builder.span_of(start_node).end;
            return self.builder.node(NodeKind::Element, start..end, children);
        }

        if RAW_TEXT_ELEMENTS.contains(&lowercase.as_str()) {
            self.parse_raw_text_body(&name, &mut children);
        } else {
            self.open_elements.push(name.clone());
            let mut content = Vec::new();
            loop {
                match self.parse_content_item(&mut content, Some(&name)) {
                    Step::Continue => {}
                    Step::CloseParent => break,
                }
            }
            self.open_elements.pop();
            children.extend(content);

            if self.peek() == Some(Token::LtSlash)
                && self.peek_end_tag_name().as_deref() == Some(name.as_str())
            {
                children.push(self.parse_end_tag());
            } else {
                children.push(self.missing_here());
            }
        }

        let end = children
            .last()
            .map(|&c| self.builder.span_of(c).end)
            .unwrap_or(start);
        self.builder.node(NodeKind::Element, start..end, children)
    }

    fn parse_raw_text_body(&mut self, name: &str, children: &mut Vec<u32>) {
        let from_rel = self.cursor_rel();
        let needle = format!("</{}", name.to_ascii_lowercase());
        let found = find_case_insensitive(&self.src[from_rel..], &needle).map(|i| from_rel + i);
        match found {
            Some(close_rel) => {
                if close_rel > from_rel {
                    children.push(self.builder.leaf(
                        NodeKind::Text,
                        self.base + from_rel..self.base + close_rel,
                    ));
                }
                self.skip_to_rel(close_rel);
                if self.peek() == Some(Token::LtSlash) {
                    children.push(self.parse_end_tag());
                } else {
                    children.push(self.missing_here());
                }
            }
            None => {
                if self.src.len() > from_rel {
                    children.push(self.builder.leaf(
                        NodeKind::Text,
                        self.base + from_rel..self.base + self.src.len(),
                    ));
                }
                self.skip_to_rel(self.src.len());
                children.push(self.missing_here());
            }
        }
    }

    fn parse_start_tag(&mut self) -> StartTagInfo {
        let (_, lt_span) = self.bump();
        let mut children = Vec::new();

        let (name_node, name) = self.parse_tag_name();
        children.push(name_node);

        let mut self_closing = false;
        let mut terminated = false;
        let end = loop {
            self.skip_whitespace();
            match self.peek() {
                Some(Token::Gt) => {
                    let (_, span) = self.bump();
                    terminated = true;
                    break span.end;
                }
                Some(Token::SlashGt) => {
                    let (_, span) = self.bump();
                    terminated = true;
                    self_closing = true;
                    break span.end;
                }
                None | Some(Token::Lt) | Some(Token::LtSlash) => {
                    children.push(self.missing_here());
                    break self.cursor();
                }
                Some(Token::Ident) => {
                    children.push(self.parse_attribute());
                }
                Some(_) => {
                    let (_, span) = self.bump();
                    children.push(self.builder.leaf(NodeKind::Error, span));
                }
            }
        };

        let node = self
            .builder
            .node(NodeKind::StartTag, lt_span.start..end, children);
        StartTagInfo {
            node,
            name,
            self_closing,
            terminated,
        }
    }

    /// Tag names are `Ident` or `Ident ':' Ident` (prefixed controls).
    fn parse_tag_name(&mut self) -> (u32, String) {
        if self.peek() != Some(Token::Ident) {
            return (self.missing_here(), String::new());
        }
        let (_, first) = self.bump();
        let mut span = first;
        if self.peek() == Some(Token::Colon) && self.peek_at(1) == Some(Token::Ident) {
            self.bump();
            let (_, second) = self.bump();
            span = span.start..second.end;
        }
        let text = self.src[span.start - self.base..span.end - self.base].to_string();
        (self.builder.leaf(NodeKind::TagName, span), text)
    }

    fn peek_end_tag_name(&self) -> Option<String> {
        // Positioned at LtSlash; look at the identifier(s) that follow.
        let mut ahead = 1;
        let (token, span) = self.tokens.get(self.pos + ahead)?;
        if *token != Token::Ident {
            return None;
        }
        let mut end = span.end;
        let start = span.start;
        ahead += 1;
        if self.tokens.get(self.pos + ahead).map(|(t, _)| *t) == Some(Token::Colon) {
            if let Some((Token::Ident, second)) = self.tokens.get(self.pos + ahead + 1) {
                end = second.end;
            }
        }
        Some(self.src[start..end].to_string())
    }

    fn parse_end_tag(&mut self) -> u32 {
        let (_, lt_span) = self.bump();
        let mut children = Vec::new();
        let (name_node, _) = self.parse_tag_name();
        children.push(name_node);
        self.skip_whitespace();
        let end = if self.peek() == Some(Token::Gt) {
            let (_, span) = self.bump();
            span.end
        } else {
            children.push(self.missing_here());
            self.cursor()
        };
        self.builder
            .node(NodeKind::EndTag, lt_span.start..end, children)
    }

    /// An end tag with no matching open element becomes an Error node.
    fn parse_end_tag_as_error(&mut self) -> u32 {
        if self.at_eof() {
            return self.missing_here();
        }
        let (_, lt_span) = self.bump();
        let mut end = lt_span.end;
        while let Some(token) = self.peek() {
            match token {
                Token::Ident | Token::Colon | Token::Whitespace => {
                    let (_, span) = self.bump();
                    end = span.end;
                }
                Token::Gt => {
                    let (_, span) = self.bump();
                    end = span.end;
                    break;
                }
                _ => break,
            }
        }
        self.builder.leaf(NodeKind::Error, lt_span.start..end)
    }

    // ------------------------------------------------------------------
    // Attributes and bindings

    fn parse_attribute(&mut self) -> u32 {
        let (name_node, name_span) = self.parse_attribute_name();
        let mut children = vec![name_node];
        let mut end = name_span.end;

        let mark = self.pos;
        self.skip_whitespace();
        if self.peek() == Some(Token::Eq) {
            self.bump();
            self.skip_whitespace();
            let value = self.parse_attribute_value();
            end = self.builder.span_of(value).end.max(end);
            children.push(value);
        } else {
            self.pos = mark;
        }

        self.builder
            .node(NodeKind::Attribute, name_span.start..end, children)
    }

    fn parse_attribute_name(&mut self) -> (u32, Range<usize>) {
        let (_, first) = self.bump();
        let mut span = first;
        if self.peek() == Some(Token::Colon) && self.peek_at(1) == Some(Token::Ident) {
            self.bump();
            let (_, second) = self.bump();
            span = span.start..second.end;
        }
        (
            self.builder.leaf(NodeKind::AttributeName, span.clone()),
            span,
        )
    }

    fn parse_attribute_value(&mut self) -> u32 {
        match self.peek() {
            Some(quote @ (Token::DoubleQuote | Token::SingleQuote)) => {
                self.bump();
                let start = self.cursor();
                let mut children = Vec::new();
                let end = loop {
                    match self.peek() {
                        Some(t) if t == quote => {
                            let at = self.cursor();
                            self.bump();
                            break at;
                        }
                        None | Some(Token::Lt) | Some(Token::LtSlash) => {
                            children.push(self.missing_here());
                            break self.cursor();
                        }
                        Some(Token::BraceOpen) | Some(Token::DoubleBraceOpen) => {
                            children.push(self.parse_binding());
                        }
                        Some(_) => {
                            self.bump();
                        }
                    }
                };
                self.builder.node(NodeKind::AttributeValue, start..end, children)
            }
            Some(Token::BraceOpen) | Some(Token::DoubleBraceOpen) => {
                let binding = self.parse_binding();
                let span = self.builder.span_of(binding);
                self.builder
                    .node(NodeKind::AttributeValue, span, vec![binding])
            }
            Some(Token::Ident) | Some(Token::Text) => {
                let (_, span) = self.bump();
                self.builder.leaf(NodeKind::AttributeValue, span)
            }
            _ => self.missing_here(),
        }
    }

    fn parse_binding(&mut self) -> u32 {
        let (_, open_span) = self.bump();
        let mut children = Vec::new();

        self.skip_whitespace();

        // The first identifier is always the binding name; the colon may not
        // be typed yet in an editor buffer.
        if self.peek() == Some(Token::Ident) {
            let (_, span) = self.bump();
            children.push(self.builder.leaf(NodeKind::BindingName, span));
            self.skip_whitespace();
            if self.peek() == Some(Token::Colon) {
                self.bump();
                self.skip_whitespace();
            }
        } else {
            let at = self.cursor();
            children.push(self.builder.leaf(NodeKind::BindingName, at..at));
        }

        let expr_start = self.cursor();
        let mut depth: i32 = 1;
        let mut close_span: Option<Range<usize>> = None;
        loop {
            match self.peek() {
                None | Some(Token::Lt) | Some(Token::LtSlash) => break,
                Some(Token::BraceOpen) | Some(Token::DoubleBraceOpen) => {
                    depth += 1;
                    self.bump();
                }
                Some(Token::BraceClose) => {
                    depth -= 1;
                    let (_, span) = self.bump();
                    if depth == 0 {
                        close_span = Some(span);
                        break;
                    }
                }
                Some(Token::DoubleBraceClose) => {
                    depth -= 1;
                    let (_, span) = self.bump();
                    if depth <= 0 {
                        // `}}` closes a single-brace binding too; the stray
                        // brace is tolerated rather than fatal.
                        close_span = Some(span);
                        break;
                    }
                }
                Some(_) => {
                    self.bump();
                }
            }
        }

        let expr_end = close_span
            .as_ref()
            .map(|span| span.start)
            .unwrap_or_else(|| self.cursor());
        if expr_end > expr_start {
            children.push(
                self.builder
                    .leaf(NodeKind::BindingExpression, expr_start..expr_end),
            );
        }

        let end = match close_span {
            Some(span) => span.end,
            None => {
                children.push(self.missing_here());
                self.cursor()
            }
        };

        self.builder
            .node(NodeKind::Binding, open_span.start..end, children)
    }
}

struct StartTagInfo {
    node: u32,
    name: String,
    self_closing: bool,
    terminated: bool,
}

fn find_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let haystack = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).find(|&i| {
        haystack[i..i + needle.len()]
            .iter()
            .zip(needle)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::tree::NodeHandle;

    fn kind_at(tree: &SyntaxTree, offset: usize) -> NodeKind {
        tree.kind(tree.deepest_at(offset).unwrap()).unwrap()
    }

    fn find_first(tree: &SyntaxTree, kind: NodeKind) -> Option<NodeHandle> {
        tree.preorder()
            .into_iter()
            .find(|&h| tree.kind(h) == Some(kind))
    }

    #[test]
    fn parses_directives_before_content() {
        let source = "@viewModel Sample.ViewModels.HomeViewModel, Sample\n<div></div>";
        let tree = parse_document(source);
        let directive = find_first(&tree, NodeKind::Directive).expect("directive node");
        let name = tree
            .child_of_kind(directive, NodeKind::DirectiveName)
            .unwrap();
        assert_eq!(&source[tree.span(name).unwrap()], "viewModel");
        let value = tree
            .child_of_kind(directive, NodeKind::DirectiveValue)
            .unwrap();
        assert_eq!(
            &source[tree.span(value).unwrap()],
            "Sample.ViewModels.HomeViewModel, Sample"
        );
    }

    #[test]
    fn parses_nested_elements_with_attributes() {
        let source = r#"<div class="row"><dot:Button Text="Go" /></div>"#;
        let tree = parse_document(source);
        let button = tree
            .preorder()
            .into_iter()
            .filter(|&h| tree.kind(h) == Some(NodeKind::TagName))
            .find(|&h| &source[tree.span(h).unwrap()] == "dot:Button")
            .expect("button tag name");
        let start_tag = tree.parent(button).unwrap();
        assert_eq!(tree.kind(start_tag), Some(NodeKind::StartTag));
        let attrs = tree.children_of_kind(start_tag, NodeKind::Attribute);
        assert_eq!(attrs.len(), 1);
        let name = tree
            .child_of_kind(attrs[0], NodeKind::AttributeName)
            .unwrap();
        assert_eq!(&source[tree.span(name).unwrap()], "Text");
        assert!(!tree.subtree_has_anomalies(tree.root()));
    }

    #[test]
    fn parses_bindings_with_name_and_expression() {
        let source = "<span>{{value: Customer.Name}}</span>";
        let tree = parse_document(source);
        let binding = find_first(&tree, NodeKind::Binding).unwrap();
        let name = tree.child_of_kind(binding, NodeKind::BindingName).unwrap();
        assert_eq!(&source[tree.span(name).unwrap()], "value");
        let expr = tree
            .child_of_kind(binding, NodeKind::BindingExpression)
            .unwrap();
        assert_eq!(&source[tree.span(expr).unwrap()], "Customer.Name");
        assert_eq!(&source[tree.span(binding).unwrap()], "{{value: Customer.Name}}");
    }

    #[test]
    fn attribute_value_bindings_are_nested() {
        let source = "<dot:Repeater DataSource={value: Items}></dot:Repeater>";
        let tree = parse_document(source);
        let value = find_first(&tree, NodeKind::AttributeValue).unwrap();
        let binding = tree.child_of_kind(value, NodeKind::Binding).unwrap();
        let name = tree.child_of_kind(binding, NodeKind::BindingName).unwrap();
        assert_eq!(&source[tree.span(name).unwrap()], "value");
    }

    #[test]
    fn unterminated_start_tag_and_value_end_before_the_next_tag() {
        let source = "<div class=\"row<span>";
        let tree = parse_document(source);
        let value = find_first(&tree, NodeKind::AttributeValue).unwrap();
        assert_eq!(&source[tree.span(value).unwrap()], "row");
        let start_tag = find_first(&tree, NodeKind::StartTag).unwrap();
        assert_eq!(tree.span(start_tag).unwrap().end, source.find("<span").unwrap());
        assert!(tree.subtree_has_anomalies(start_tag));
    }

    #[test]
    fn unterminated_binding_gets_missing_close() {
        let source = "<span>{value: Items</span>";
        let tree = parse_document(source);
        let binding = find_first(&tree, NodeKind::Binding).unwrap();
        assert!(tree.subtree_has_anomalies(binding));
    }

    #[test]
    fn unclosed_element_is_closed_by_ancestor_end_tag() {
        let source = "<div><p>text</div>";
        let tree = parse_document(source);
        // The <p> is retained, closed with a Missing end tag, and the <div>
        // still finds its end tag.
        let root = tree.root();
        assert!(tree.subtree_has_anomalies(root));
        let div = tree.children_of_kind(root, NodeKind::Element)[0];
        let end_tags = tree.children_of_kind(div, NodeKind::EndTag);
        assert_eq!(end_tags.len(), 1);
    }

    #[test]
    fn bare_open_angle_becomes_error_node() {
        let source = "<div>< </div>";
        let tree = parse_document(source);
        assert!(find_first(&tree, NodeKind::Error).is_some());
    }

    #[test]
    fn raw_text_elements_do_not_parse_braces() {
        let source = "<script>if (a) { b(); }</script>";
        let tree = parse_document(source);
        assert!(find_first(&tree, NodeKind::Binding).is_none());
        let text = find_first(&tree, NodeKind::Text).unwrap();
        assert_eq!(&source[tree.span(text).unwrap()], "if (a) { b(); }");
        assert!(!tree.subtree_has_anomalies(tree.root()));
    }

    #[test]
    fn comments_are_single_nodes() {
        let source = "<div><!-- <dot:Button /> --></div>";
        let tree = parse_document(source);
        let comment = find_first(&tree, NodeKind::Comment).unwrap();
        assert_eq!(
            &source[tree.span(comment).unwrap()],
            "<!-- <dot:Button /> -->"
        );
        // Nothing inside the comment was parsed as an element.
        assert_eq!(tree.children_of_kind(comment, NodeKind::Element).len(), 0);
    }

    #[test]
    fn every_span_is_contained_in_its_parent() {
        let source = "@viewModel X.Y, Z\n<div class=\"a\"><dot:Repeater DataSource={value: Items}><p>{{value: _this}}</p></dot:Repeater></div>";
        let tree = parse_document(source);
        for handle in tree.preorder() {
            if let Some(parent) = tree.parent(handle) {
                let child = tree.span(handle).unwrap();
                let parent = tree.span(parent).unwrap();
                assert!(parent.start <= child.start && child.end <= parent.end);
            }
        }
    }

    #[test]
    fn element_slice_parse_rejects_leftovers_and_anomalies() {
        assert!(parse_element_slice("<div>x</div>", 0).is_some());
        assert!(parse_element_slice("<div>x</div> tail", 0).is_none());
        assert!(parse_element_slice("<div>x", 0).is_none());
        assert!(parse_element_slice("plain text", 0).is_none());
    }

    #[test]
    fn element_slice_parse_rebases_spans() {
        let tree = parse_element_slice("<b>hi</b>", 100).unwrap();
        assert_eq!(tree.span(tree.root()).unwrap(), 100..109);
    }

    #[test]
    fn void_elements_need_no_end_tag() {
        let source = "<div><br><img src=\"x.png\"></div>";
        let tree = parse_document(source);
        assert!(!tree.subtree_has_anomalies(tree.root()));
    }
}
