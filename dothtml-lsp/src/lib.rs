//! Language Server Protocol (LSP) implementation for DotHtml markup
//!
//!     This crate provides language server capabilities for DotHtml markup pages,
//!     enabling rich editor support in any LSP-compatible editor (VSCode, Neovim,
//!     Emacs, Sublime, etc.).
//!
//! Feature Set
//!
//!     DotHtml markup mixes HTML, server controls, binding expressions, and
//!     embedded CSS/JS, so the feature set centers on markup authoring:
//!
//!         1. Completion (textDocument/completion):
//!             - Control tags by prefix, with snippet bodies that pre-fill the
//!               required properties
//!             - Attribute and property-group names on the containing control
//!             - Binding names ({value: ...}, {command: ...}, ...) with the
//!               closing braces appended when the author has not typed them
//!
//!         2. Hover Information (textDocument/hover):
//!             - Control summary over a tag name (type, assembly, base type)
//!             - Property summary over an attribute name (type, declaring
//!               control, flags such as required or bindings-only)
//!
//!         3. Diagnostics (textDocument/publishDiagnostics):
//!             - Parser anomalies: missing end tags, unterminated bindings and
//!               attribute values, stray markup
//!             - Prefixed tags that resolve to no registered control
//!
//!         4. Selection Ranges (textDocument/selectionRange):
//!             - Expand-selection steps along the syntax tree ancestor chain
//!
//!     Beyond the standard protocol, the server accepts `dothtml/updateMetadata`
//!     so a host build process can push refreshed control metadata snapshots
//!     without restarting the server.
//!
//! Architecture
//!
//!     The server follows a layered architecture:
//!
//!     LSP Layer (tower-lsp):
//!         - Handles JSON-RPC communication
//!         - Protocol handshaking and capability negotiation
//!
//!     Server Layer (this crate):
//!         - Implements the LanguageServer trait
//!         - Owns open documents (incremental sync) and the control registry
//!         - Translates byte spans to protocol positions and back
//!         - Thin tests asserting the right feature calls happen
//!
//!     Feature Layer:
//!         - Each feature is a pure function over a Document plus the registry
//!         - Context classification (where is the caret, syntactically?) is
//!           shared by completion in `context`
//!         - All logic and dense unit tests live here
//!
//! Usage
//!
//!     Binary:
//!         $ dothtml-lsp
//!         Starts the language server on stdin/stdout for editor integration.

pub mod context;
pub mod features;
pub mod server;

pub use server::{DotHtmlLanguageServer, UpdateMetadataParams};
