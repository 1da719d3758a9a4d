//! Tokenization of dothtml source
//!
//!     The token set covers the structural surface of the format: tag
//!     delimiters, attribute punctuation, binding braces, directive markers and
//!     identifier/text runs. Everything the lexer cannot classify is folded
//!     into [`Token::Text`], so lexing never fails; structure recovery is the
//!     parser's job.

use logos::Logos;
use std::ops::Range;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    #[token("<!--")]
    CommentOpen,
    #[token("-->")]
    CommentClose,
    #[token("</")]
    LtSlash,
    #[token("<")]
    Lt,
    #[token("/>")]
    SlashGt,
    #[token(">")]
    Gt,
    #[token("=")]
    Eq,
    #[token("{{")]
    DoubleBraceOpen,
    #[token("}}")]
    DoubleBraceClose,
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token(":")]
    Colon,
    #[token("@")]
    At,
    #[token("\"")]
    DoubleQuote,
    #[token("'")]
    SingleQuote,
    #[token("/")]
    Slash,
    #[regex(r"[A-Za-z_][A-Za-z0-9_\-.]*", priority = 3)]
    Ident,
    #[regex(r"[ \t\r\n]+")]
    Whitespace,
    #[regex(r"[^<>{}=:@\x22'/ \t\r\n]+", priority = 1)]
    Text,
}

/// Tokenize the whole input. Unrecognized byte runs come back as [`Token::Text`]
/// with their exact spans, so the concatenation of all spans always covers the
/// input without gaps.
pub fn tokenize(source: &str) -> Vec<(Token, Range<usize>)> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let token = result.unwrap_or(Token::Text);
        tokens.push((token, lexer.span()));
    }
    tokens
}
