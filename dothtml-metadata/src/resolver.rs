//! Property resolution along the control inheritance chain
//!
//!     A control's usable properties are its own declarations plus everything
//!     inherited through `base_type`, resolved by repeated registry lookups.
//!     When no declared property matches an attribute name, property groups
//!     take over: the attribute is split into a registered group prefix and a
//!     member key.
//!
//!     The base chain comes from snapshot data and can be broken (missing
//!     base type) or even cyclic; every walk carries a visited set and treats
//!     both cases as "no more base".

use std::collections::HashSet;
use std::sync::Arc;

use crate::registry::{ControlRegistry, FoundControl};
use crate::snapshot::{ControlDefinition, MappingMode, PropertyDefinition, PropertyGroupDefinition};

/// Whether a property declared with `declared` may appear in a `context`
/// position. An absent declared mode counts as `Attribute`.
pub fn is_compatible_mapping_mode(declared: Option<MappingMode>, context: MappingMode) -> bool {
    let declared = declared.unwrap_or_default();
    match context {
        MappingMode::Exclude => true,
        MappingMode::Attribute => matches!(declared, MappingMode::Attribute | MappingMode::Both),
        MappingMode::InnerElement => {
            matches!(declared, MappingMode::InnerElement | MappingMode::Both)
        }
        MappingMode::Both => declared == MappingMode::Both,
    }
}

/// Outcome of resolving an attribute name against a control.
#[derive(Debug, Clone)]
pub enum ResolvedProperty {
    /// A declared property, possibly inherited.
    Property {
        name: String,
        declaring_type: String,
        definition: PropertyDefinition,
    },
    /// A property-group member: `prefix` + `member` reassemble the written
    /// attribute name.
    Group {
        group_name: String,
        prefix: String,
        member: String,
        definition: PropertyGroupDefinition,
    },
    Unknown,
}

impl ResolvedProperty {
    pub fn is_unknown(&self) -> bool {
        matches!(self, ResolvedProperty::Unknown)
    }
}

/// Walk `start` and its base chain, yielding each definition once. Missing
/// base types and cycles end the walk.
struct BaseChain<'r> {
    registry: &'r ControlRegistry,
    current: Option<FoundControl>,
    visited: HashSet<String>,
}

impl<'r> BaseChain<'r> {
    fn new(registry: &'r ControlRegistry, start: FoundControl) -> Self {
        Self {
            registry,
            current: Some(start),
            visited: HashSet::new(),
        }
    }
}

impl Iterator for BaseChain<'_> {
    type Item = FoundControl;

    fn next(&mut self) -> Option<FoundControl> {
        let control = self.current.take()?;
        if !self.visited.insert(control.full_name.clone()) {
            return None;
        }
        self.current = control
            .definition
            .base_type
            .as_deref()
            .and_then(|base| self.registry.find_control(base))
            .filter(|base| !self.visited.contains(&base.full_name));
        Some(control)
    }
}

/// Resolve attribute/inner-element `name` on `control`.
///
/// Declared properties win regardless of mapping mode (a property used in
/// the wrong position is a diagnostic concern, not an unknown name). Groups
/// are filtered by `context` compatibility, and when several group prefixes
/// match, the shortest registered prefix wins.
pub fn resolve_control_property(
    registry: &ControlRegistry,
    control: &FoundControl,
    name: &str,
    context: MappingMode,
) -> ResolvedProperty {
    for ancestor in BaseChain::new(registry, control.clone()) {
        if let Some(definition) = ancestor.definition.properties.get(name) {
            return ResolvedProperty::Property {
                name: name.to_owned(),
                declaring_type: ancestor.full_name.clone(),
                definition: definition.clone(),
            };
        }
    }

    let mut prefixes: Vec<(String, String, Arc<ControlDefinition>)> = Vec::new();
    for ancestor in BaseChain::new(registry, control.clone()) {
        for (group_name, group) in &ancestor.definition.property_groups {
            if !is_compatible_mapping_mode(group.mapping_mode, context) {
                continue;
            }
            for prefix in &group.prefixes {
                prefixes.push((
                    prefix.clone(),
                    group_name.clone(),
                    Arc::clone(&ancestor.definition),
                ));
            }
        }
    }
    prefixes.sort_by_key(|(prefix, _, _)| prefix.len());

    for (prefix, group_name, definition) in prefixes {
        if let Some(member) = name.strip_prefix(prefix.as_str()) {
            let group = definition.property_groups[&group_name].clone();
            return ResolvedProperty::Group {
                group_name,
                prefix,
                member: member.to_owned(),
                definition: group,
            };
        }
    }
    ResolvedProperty::Unknown
}

/// Own-then-inherited declared properties compatible with `context`. Lazy;
/// each base link is looked up only when the iteration reaches it.
pub fn properties<'r>(
    registry: &'r ControlRegistry,
    control: &FoundControl,
    context: MappingMode,
) -> impl Iterator<Item = (String, String, PropertyDefinition)> + 'r {
    BaseChain::new(registry, control.clone()).flat_map(move |ancestor| {
        let declaring_type = ancestor.full_name.clone();
        let definition = Arc::clone(&ancestor.definition);
        definition
            .properties
            .iter()
            .filter(|(_, property)| is_compatible_mapping_mode(property.mapping_mode, context))
            .map(|(name, property)| (name.clone(), declaring_type.clone(), property.clone()))
            .collect::<Vec<_>>()
    })
}

/// Own-then-inherited property groups compatible with `context`.
pub fn property_groups<'r>(
    registry: &'r ControlRegistry,
    control: &FoundControl,
    context: MappingMode,
) -> impl Iterator<Item = (String, PropertyGroupDefinition)> + 'r {
    BaseChain::new(registry, control.clone()).flat_map(move |ancestor| {
        ancestor
            .definition
            .property_groups
            .iter()
            .filter(|(_, group)| is_compatible_mapping_mode(group.mapping_mode, context))
            .map(|(name, group)| (name.clone(), group.clone()))
            .collect::<Vec<_>>()
    })
}
