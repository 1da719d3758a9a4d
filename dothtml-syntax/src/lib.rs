//! Syntax layer for the dothtml markup format
//!
//!     This crate owns everything that can be derived from document text alone:
//!     the document buffer with versioning and incremental reparse, the concrete
//!     syntax tree over that text, and the classification of embedded sublanguage
//!     fragments (bindings, inline styles, inline scripts).
//!
//!     Nothing in here consults control metadata. The metadata-aware layers build
//!     on top of the handles and spans exposed from this crate.

pub mod markup;

pub use markup::document::{Document, TextChange};
pub use markup::parser::parse_document;
pub use markup::fragments::{determine_sublanguage, Fragment, Sublanguage};
pub use markup::range::{LineIndex, Position};
pub use markup::tree::{NodeHandle, NodeKind, SyntaxTree};
