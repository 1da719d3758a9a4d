//! Control metadata for the dothtml markup format
//!
//!     Three concerns live here: parsing .NET type-name strings into a
//!     structured form, deserializing control metadata snapshots, and
//!     answering "what control is this tag" / "what property is this
//!     attribute" queries over the loaded snapshots.
//!
//!     Everything is text-in, data-out; nothing in this crate touches
//!     document buffers or syntax trees.

pub mod registry;
pub mod resolver;
pub mod snapshot;
pub mod typename;

pub use registry::{
    ControlRegistry, FoundControl, ResolvedControl, ResolvedControlKind, HTML_GENERIC_CONTROL,
    JS_COMPONENT, MARKUP_CONTROL,
};
pub use resolver::{
    is_compatible_mapping_mode, properties, property_groups, resolve_control_property,
    ResolvedProperty,
};
pub use snapshot::{
    CapabilityDefinition, ControlDefinition, ControlRegistration, MappingMode, MetadataSnapshot,
    PropertyDefinition, PropertyGroupDefinition,
};
pub use typename::TypeName;
