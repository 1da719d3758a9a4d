//! Completion production
//!
//!     Candidates are produced per completion context and then run through a
//!     second pass that (a) appends a scheduled binding-closing delimiter as
//!     a snippet tail and (b) turns plain insertions into range-replacing
//!     edits when the context computed a replacement target. Keeping the two
//!     passes separate means every producer can think purely in "what are
//!     the names here" terms.

use std::collections::HashSet;
use std::ops::Range;

use dothtml_config::CompletionConfig;
use dothtml_metadata::{
    properties, property_groups, ControlRegistry, FoundControl, MappingMode, PropertyDefinition,
};
use dothtml_syntax::{Document, NodeHandle, NodeKind};
use lsp_types::CompletionItemKind;

use crate::context::{classify, CompletionContext};

/// A protocol-agnostic completion candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionCandidate {
    pub label: String,
    pub detail: Option<String>,
    pub kind: CompletionItemKind,
    pub insert_text: Option<String>,
    /// Insert text contains `$n` placeholders.
    pub is_snippet: bool,
    /// Byte range of the host document the insertion replaces.
    pub replace_range: Option<Range<usize>>,
}

impl CompletionCandidate {
    fn new(label: impl Into<String>, kind: CompletionItemKind) -> Self {
        Self {
            label: label.into(),
            detail: None,
            kind,
            insert_text: None,
            is_snippet: false,
            replace_range: None,
        }
    }

    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    fn with_insert_text(mut self, text: impl Into<String>) -> Self {
        self.insert_text = Some(text.into());
        self
    }

    fn with_snippet(mut self, text: impl Into<String>) -> Self {
        self.insert_text = Some(text.into());
        self.is_snippet = true;
        self
    }
}

/// Produce completion candidates at `offset`.
pub fn completion_items(
    document: &Document,
    offset: usize,
    registry: &ControlRegistry,
    config: &CompletionConfig,
) -> Vec<CompletionCandidate> {
    let context = classify(document, offset, config.close_binding_lookahead);
    let mut items = match &context {
        CompletionContext::BindingStart { .. } => binding_name_items(),
        CompletionContext::TagStart {
            written, target, ..
        } => tag_items(registry, written, target, config),
        CompletionContext::AttributeName { element, .. } => {
            attribute_items(document, *element, registry)
        }
        CompletionContext::BindingBody | CompletionContext::Unknown => Vec::new(),
    };
    apply_context_edits(&mut items, &context);
    items
}

/// Second pass over emitted items: closing-delimiter tails and replacement
/// ranges, driven entirely by the classified context.
fn apply_context_edits(items: &mut [CompletionCandidate], context: &CompletionContext) {
    let (target, closer) = match context {
        CompletionContext::BindingStart { target, closer } => (Some(target.clone()), *closer),
        CompletionContext::TagStart { target, .. } => (Some(target.clone()), None),
        CompletionContext::AttributeName { target, .. } => (target.clone(), None),
        _ => (None, None),
    };

    for item in items.iter_mut() {
        if let Some(closer) = closer {
            let text = item.insert_text.take().unwrap_or_else(|| item.label.clone());
            item.insert_text = Some(format!("{text}$0{closer}"));
            item.is_snippet = true;
        }
        if item.replace_range.is_none() {
            item.replace_range = target.clone();
        }
    }
}

const BINDING_NAMES: [(&str, &str); 4] = [
    ("value", "two-way value binding"),
    ("command", "server command binding"),
    ("resource", "resource lookup binding"),
    ("staticCommand", "client-side command binding"),
];

fn binding_name_items() -> Vec<CompletionCandidate> {
    BINDING_NAMES
        .iter()
        .map(|(name, detail)| {
            CompletionCandidate::new(*name, CompletionItemKind::KEYWORD)
                .with_detail(*detail)
                .with_insert_text(format!("{name}: "))
        })
        .collect()
}

fn tag_items(
    registry: &ControlRegistry,
    written: &str,
    target: &Range<usize>,
    config: &CompletionConfig,
) -> Vec<CompletionCandidate> {
    let mut items = Vec::new();

    // Once a prefix is typed, only that prefix's controls are offered, the
    // insertion text omits the prefix, and the replacement range shrinks to
    // the local part of the name.
    let typed_prefix = written.split_once(':').map(|(prefix, _)| prefix);
    let local_target =
        typed_prefix.map(|prefix| target.start + prefix.len() + 1..target.end.max(target.start + prefix.len() + 1));

    for prefix in registry.tag_prefixes() {
        if typed_prefix.is_some_and(|typed| typed != prefix) {
            continue;
        }
        for (local, control) in registry.controls_in_prefix(&prefix) {
            let label = format!("{prefix}:{local}");
            let inserted = if typed_prefix.is_some() {
                local.clone()
            } else {
                label.clone()
            };
            let snippet = control_snippet(registry, &inserted, &control, config);
            let mut item = CompletionCandidate::new(&label, CompletionItemKind::CLASS)
                .with_detail(control.full_name.clone());
            item = match snippet {
                Some(snippet) => item.with_snippet(snippet),
                None => item.with_insert_text(inserted),
            };
            item.replace_range = local_target.clone();
            items.push(item);
        }
    }

    for (tag, src) in registry.markup_tags() {
        let tag_prefix = tag.split_once(':').map(|(prefix, _)| prefix);
        if typed_prefix.is_some() && tag_prefix != typed_prefix {
            continue;
        }
        let inserted = match (typed_prefix, tag.split_once(':')) {
            (Some(_), Some((_, local))) => local.to_owned(),
            _ => tag.clone(),
        };
        let mut item = CompletionCandidate::new(&tag, CompletionItemKind::MODULE)
            .with_detail(src)
            .with_insert_text(inserted);
        item.replace_range = local_target.clone();
        items.push(item);
    }

    items
}

/// Tag insertion snippet with required properties auto-filled:
/// `dot:Repeater DataSource={value: $1} $0`. Returns `None` when there is
/// nothing to auto-fill (plain-text insertion is enough).
fn control_snippet(
    registry: &ControlRegistry,
    label: &str,
    control: &FoundControl,
    config: &CompletionConfig,
) -> Option<String> {
    if !config.auto_required_properties {
        return None;
    }
    let required: Vec<(String, PropertyDefinition)> =
        properties(registry, control, MappingMode::Attribute)
            .filter(|(_, _, property)| property.required)
            .map(|(name, _, property)| (name, property))
            .collect();
    if required.is_empty() {
        return None;
    }

    let mut snippet = label.to_owned();
    for (placeholder, (name, property)) in required.iter().enumerate() {
        let n = placeholder + 1;
        snippet.push(' ');
        snippet.push_str(name);
        if property.is_command {
            snippet.push_str(&format!("={{command: ${n}}}"));
        } else if property.only_bindings {
            snippet.push_str(&format!("={{value: ${n}}}"));
        } else {
            snippet.push_str(&format!("=\"${n}\""));
        }
    }
    snippet.push_str(" $0");
    Some(snippet)
}

fn attribute_items(
    document: &Document,
    element: NodeHandle,
    registry: &ControlRegistry,
) -> Vec<CompletionCandidate> {
    let Some(control) = resolve_element_control(document, element, registry) else {
        return Vec::new();
    };
    let existing = existing_attribute_names(document, element);

    let mut items = Vec::new();
    let mut seen = HashSet::new();
    for (name, declaring_type, property) in
        properties(registry, &control, MappingMode::Attribute)
    {
        if existing.contains(&name) || !seen.insert(name.clone()) {
            continue;
        }
        let mut detail = format!("{}: {}", declaring_type, property.type_name);
        if property.required {
            detail.push_str(" (required)");
        }
        items.push(
            CompletionCandidate::new(&name, CompletionItemKind::PROPERTY)
                .with_detail(detail)
                .with_insert_text(name.clone()),
        );
    }
    for (group_name, group) in property_groups(registry, &control, MappingMode::Attribute) {
        for prefix in &group.prefixes {
            if prefix.is_empty() || !seen.insert(prefix.clone()) {
                continue;
            }
            items.push(
                CompletionCandidate::new(prefix, CompletionItemKind::PROPERTY)
                    .with_detail(format!("{group_name} group ({})", group.value_type))
                    .with_insert_text(prefix.clone()),
            );
        }
    }
    items
}

/// The control a markup element resolves to, from its start-tag name.
pub(crate) fn resolve_element_control(
    document: &Document,
    element: NodeHandle,
    registry: &ControlRegistry,
) -> Option<FoundControl> {
    let tag = element_tag_name(document, element)?;
    registry.resolve_control(&tag).map(|resolved| resolved.control)
}

pub(crate) fn element_tag_name(document: &Document, element: NodeHandle) -> Option<String> {
    let tree = document.tree()?;
    let start_tag = tree.child_of_kind(element, NodeKind::StartTag)?;
    let name = tree.child_of_kind(start_tag, NodeKind::TagName)?;
    tree.span(name)
        .map(|span| document.text()[span].to_owned())
}

fn existing_attribute_names(document: &Document, element: NodeHandle) -> HashSet<String> {
    let Some(tree) = document.tree() else {
        return HashSet::new();
    };
    let Some(start_tag) = tree.child_of_kind(element, NodeKind::StartTag) else {
        return HashSet::new();
    };
    tree.children_of_kind(start_tag, NodeKind::Attribute)
        .into_iter()
        .filter_map(|attribute| tree.child_of_kind(attribute, NodeKind::AttributeName))
        .filter_map(|name| tree.span(name))
        .map(|span| document.text()[span].to_owned())
        .collect()
}
