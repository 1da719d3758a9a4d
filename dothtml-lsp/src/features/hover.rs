//! Hover summaries for controls and properties

use std::ops::Range;

use dothtml_metadata::{resolve_control_property, ControlRegistry, MappingMode, ResolvedProperty};
use dothtml_syntax::{Document, NodeKind};

use crate::features::completion::resolve_element_control;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverResult {
    pub span: Range<usize>,
    /// Markdown.
    pub contents: String,
}

/// Hover at a byte offset: control summary over a tag name, property summary
/// over an attribute name.
pub fn hover(document: &Document, offset: usize, registry: &ControlRegistry) -> Option<HoverResult> {
    let tree = document.tree()?;
    let node = tree.deepest_at(offset)?;
    let text = document.text();

    match tree.kind(node)? {
        NodeKind::TagName => {
            let span = tree.span(node)?;
            let tag = &text[span.clone()];
            let resolved = registry.resolve_control(tag)?;
            let definition = &resolved.control.definition;
            let mut contents = format!("**<{tag}>**: `{}`", resolved.control.full_name);
            if let Some(assembly) = &definition.assembly {
                contents.push_str(&format!(" ({assembly})"));
            }
            if let Some(base) = &definition.base_type {
                contents.push_str(&format!("\n\nbase: `{base}`"));
            }
            Some(HoverResult { span, contents })
        }
        NodeKind::AttributeName => {
            let span = tree.span(node)?;
            let name = &text[span.clone()];
            let element = tree.ancestor_of_kind(node, NodeKind::Element)?;
            let control = resolve_element_control(document, element, registry)?;
            let resolved =
                resolve_control_property(registry, &control, name, MappingMode::Attribute);
            let contents = match resolved {
                ResolvedProperty::Property {
                    name,
                    declaring_type,
                    definition,
                } => {
                    let mut contents =
                        format!("**{name}**: `{}`\n\ndeclared on `{declaring_type}`", definition.type_name);
                    let mut flags = Vec::new();
                    if definition.required {
                        flags.push("required");
                    }
                    if definition.only_bindings {
                        flags.push("bindings only");
                    }
                    if definition.only_hardcoded {
                        flags.push("hardcoded only");
                    }
                    if definition.is_command {
                        flags.push("command");
                    }
                    if !flags.is_empty() {
                        contents.push_str(&format!("\n\n{}", flags.join(", ")));
                    }
                    contents
                }
                ResolvedProperty::Group {
                    group_name,
                    prefix,
                    member,
                    definition,
                } => format!(
                    "**{prefix}{member}**: member `{member}` of the `{group_name}` group, `{}`",
                    definition.value_type
                ),
                ResolvedProperty::Unknown => return None,
            };
            Some(HoverResult { span, contents })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hover_at(text: &str, needle: &str) -> Option<HoverResult> {
        let registry = ControlRegistry::with_default_snapshot();
        let document = Document::new(text);
        let offset = text.find(needle).expect("needle present");
        hover(&document, offset, &registry)
    }

    #[test]
    fn tag_name_hover_names_the_control_type() {
        let result = hover_at("<dot:Repeater></dot:Repeater>", "dot:Repeater").expect("hover");
        assert!(result.contents.contains("DotHtml.Controls.Repeater"));
        assert!(result.contents.contains("DotHtml.Controls.HtmlControl"));
    }

    #[test]
    fn attribute_hover_shows_the_property_type_and_flags() {
        let source = "<dot:Repeater DataSource={value: Items}></dot:Repeater>";
        let result = hover_at(source, "DataSource").expect("hover");
        assert!(result.contents.contains("System.Collections.IEnumerable"));
        assert!(result.contents.contains("required"));
        assert!(result.contents.contains("bindings only"));
        assert_eq!(&source[result.span.clone()], "DataSource");
    }

    #[test]
    fn group_member_hover_names_the_group() {
        // The catch-all Attributes group has the shorter (empty) prefix, so
        // it wins over Class- for every attribute-shaped name.
        let result =
            hover_at("<div Class-active={value: On}></div>", "Class-active").expect("hover");
        assert!(result.contents.contains("Attributes"));
    }

    #[test]
    fn unknown_attribute_on_a_groupless_control_has_no_hover() {
        assert!(hover_at("<dot:Literal Bogus=\"1\" />", "Bogus").is_none());
    }

    #[test]
    fn text_content_has_no_hover() {
        assert!(hover_at("<div>words</div>", "words").is_none());
    }
}
