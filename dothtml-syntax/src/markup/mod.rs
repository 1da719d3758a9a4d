//! Markup processing pipeline for dothtml documents
//!
//!     The pipeline runs in three stages:
//!         1. Lexing: tokenization of source text. See [lexer].
//!         2. Parsing: recursive descent over the token stream, producing an
//!            arena-backed concrete syntax tree with error recovery. See [parser]
//!            and [tree].
//!         3. Document bookkeeping: text buffer, version counter, line index and
//!            incremental reparse. See [document].
//!
//!     Malformed input never aborts the pipeline. The parser records Error and
//!     Missing nodes in place so position-based queries keep working while the
//!     user is mid-edit, which is the normal state of an editor buffer.

pub mod document;
pub mod fragments;
pub mod lexer;
pub mod parser;
pub mod range;
pub mod tree;
