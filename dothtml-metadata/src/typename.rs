//! Parsing of .NET assembly-qualified type names
//!
//!     Control metadata refers to types as strings like
//!     `System.Collections.Generic.List`1[[System.String, mscorlib]], mscorlib`.
//!     The parser turns those into a structured [`TypeName`] tree: a qualified
//!     name head followed by any number of suffixes (array ranks, `&`, `*`,
//!     generic argument lists, trailing assembly qualifiers).
//!
//!     Input comes from IDE buffers and is frequently incomplete, so the
//!     parser is best-effort: an unmatchable head is "no parse" (`None`),
//!     while a malformed tail just ends suffix consumption early. The
//!     canonical form produced by [`TypeName::full_name`] always drops
//!     assembly qualifiers, so differently-qualified spellings of one type
//!     compare equal in registry lookups.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// A parsed .NET type reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeName {
    Simple {
        namespace: Option<String>,
        name: String,
        assembly: Option<String>,
    },
    Array {
        element: Box<TypeName>,
        dimensions: usize,
    },
    Generic {
        base: Box<TypeName>,
        arguments: Vec<TypeName>,
    },
    Reference(Box<TypeName>),
    Pointer(Box<TypeName>),
}

// Dotted identifier segments, with an optional generic-arity backtick on the
// last segment (`List`1`).
static QUALIFIED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*(?:`[0-9]+)?")
        .expect("qualified-name pattern is valid")
});

static ASSEMBLY_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^,\[\]]+").expect("assembly pattern is valid"));

impl TypeName {
    pub fn simple(namespace: Option<&str>, name: &str) -> Self {
        TypeName::Simple {
            namespace: namespace.map(str::to_owned),
            name: name.to_owned(),
            assembly: None,
        }
    }

    /// Parse a type-name string. Returns `None` when the input does not start
    /// with a qualified name; trailing text after the last recognizable
    /// suffix is ignored.
    pub fn parse(input: &str) -> Option<TypeName> {
        parse_at(input.trim_start()).map(|(ty, _)| ty)
    }

    /// Canonical, assembly-free rendering. Parsing the result back yields a
    /// structurally identical tree.
    pub fn full_name(&self) -> String {
        let mut out = String::new();
        self.write_full_name(&mut out);
        out
    }

    fn write_full_name(&self, out: &mut String) {
        match self {
            TypeName::Simple {
                namespace, name, ..
            } => {
                if let Some(namespace) = namespace {
                    out.push_str(namespace);
                    out.push('.');
                }
                out.push_str(name);
            }
            TypeName::Array {
                element,
                dimensions,
            } => {
                element.write_full_name(out);
                out.push('[');
                for _ in 1..*dimensions {
                    out.push(',');
                }
                out.push(']');
            }
            TypeName::Generic { base, arguments } => {
                base.write_full_name(out);
                out.push_str("[[");
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        out.push_str("],[");
                    }
                    argument.write_full_name(out);
                }
                out.push_str("]]");
            }
            TypeName::Reference(element) => {
                element.write_full_name(out);
                out.push('&');
            }
            TypeName::Pointer(element) => {
                element.write_full_name(out);
                out.push('*');
            }
        }
    }

    /// The unqualified name of the underlying simple type.
    pub fn name(&self) -> &str {
        match self {
            TypeName::Simple { name, .. } => name,
            TypeName::Array { element, .. } => element.name(),
            TypeName::Generic { base, .. } => base.name(),
            TypeName::Reference(element) | TypeName::Pointer(element) => element.name(),
        }
    }

    /// The assembly qualifier of the underlying simple type, if any.
    pub fn assembly(&self) -> Option<&str> {
        match self {
            TypeName::Simple { assembly, .. } => assembly.as_deref(),
            TypeName::Array { element, .. } => element.assembly(),
            TypeName::Generic { base, .. } => base.assembly(),
            TypeName::Reference(element) | TypeName::Pointer(element) => element.assembly(),
        }
    }

    // A trailing `, Assembly` qualifies the simple type at the core of the
    // wrapper stack; additional comma segments extend the same qualifier.
    fn append_assembly(&mut self, segment: &str) {
        match self {
            TypeName::Simple { assembly, .. } => match assembly {
                Some(existing) => {
                    existing.push_str(", ");
                    existing.push_str(segment);
                }
                None => *assembly = Some(segment.to_owned()),
            },
            TypeName::Array { element, .. } => element.append_assembly(segment),
            TypeName::Generic { base, .. } => base.append_assembly(segment),
            TypeName::Reference(element) | TypeName::Pointer(element) => {
                element.append_assembly(segment)
            }
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// Parse one type at the start of `input`, returning it and the number of
/// bytes consumed.
fn parse_at(input: &str) -> Option<(TypeName, usize)> {
    let head = QUALIFIED_NAME.find(input)?;
    let (namespace, name) = match head.as_str().rsplit_once('.') {
        Some((namespace, name)) => (Some(namespace.to_owned()), name.to_owned()),
        None => (None, head.as_str().to_owned()),
    };
    let mut ty = TypeName::Simple {
        namespace,
        name,
        assembly: None,
    };
    let mut pos = head.end();

    loop {
        let rest = &input[pos..];
        if let Some(stripped) = rest.strip_prefix("[[") {
            let (arguments, used) = parse_generic_arguments(stripped);
            if arguments.is_empty() {
                break;
            }
            ty = TypeName::Generic {
                base: Box::new(ty),
                arguments,
            };
            pos += 2 + used;
        } else if rest.starts_with('[') {
            let Some(dimensions) = parse_array_rank(&rest[1..]) else {
                break;
            };
            ty = TypeName::Array {
                element: Box::new(ty),
                dimensions,
            };
            // rank commas plus both brackets
            pos += dimensions + 1;
        } else if rest.starts_with('&') {
            ty = TypeName::Reference(Box::new(ty));
            pos += 1;
        } else if rest.starts_with('*') {
            ty = TypeName::Pointer(Box::new(ty));
            pos += 1;
        } else if let Some(after_comma) = rest.strip_prefix(',') {
            let trimmed = after_comma.trim_start();
            let Some(segment) = ASSEMBLY_SEGMENT.find(trimmed) else {
                break;
            };
            ty.append_assembly(segment.as_str().trim_end());
            pos += 1 + (after_comma.len() - trimmed.len()) + segment.end();
        } else {
            break;
        }
    }
    Some((ty, pos))
}

/// Rank of an array qualifier whose `[` has been consumed: a run of commas
/// followed by `]`. Returns the dimension count, or `None` when the bracket
/// holds anything else.
fn parse_array_rank(rest: &str) -> Option<usize> {
    let close = rest.find(']')?;
    if rest[..close].bytes().all(|b| b == b',') {
        Some(close + 1)
    } else {
        None
    }
}

/// Parse `T],[T],...]]` (the opening `[[` already consumed). Each argument
/// re-enters the full parser. A missing terminator ends the list early with
/// the arguments gathered so far.
fn parse_generic_arguments(input: &str) -> (Vec<TypeName>, usize) {
    let mut arguments = Vec::new();
    let mut pos = 0;
    loop {
        let Some((argument, used)) = parse_at(input[pos..].trim_start_matches(' ')) else {
            break;
        };
        let skipped = input[pos..].len() - input[pos..].trim_start_matches(' ').len();
        arguments.push(argument);
        pos += skipped + used;
        if input[pos..].starts_with("],[") {
            pos += 3;
            continue;
        }
        if input[pos..].starts_with("]]") {
            pos += 2;
        } else if input[pos..].starts_with(']') {
            // tolerated malformed terminator
            pos += 1;
        }
        break;
    }
    (arguments, pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> TypeName {
        TypeName::parse(input).unwrap_or_else(|| panic!("{input:?} should parse"))
    }

    #[test]
    fn parses_a_plain_qualified_name() {
        let ty = parse("System.String");
        assert_eq!(ty, TypeName::simple(Some("System"), "String"));
        assert_eq!(ty.full_name(), "System.String");
    }

    #[test]
    fn parses_a_bare_name_without_namespace() {
        let ty = parse("String");
        assert_eq!(ty, TypeName::simple(None, "String"));
    }

    #[test]
    fn array_suffix_wraps_the_element_type() {
        let ty = parse("System.String[]");
        assert_eq!(
            ty,
            TypeName::Array {
                element: Box::new(TypeName::simple(Some("System"), "String")),
                dimensions: 1,
            }
        );
        assert_eq!(parse("System.String[,,]").full_name(), "System.String[,,]");
    }

    #[test]
    fn reference_and_pointer_suffixes() {
        assert_eq!(
            parse("System.Int32&"),
            TypeName::Reference(Box::new(TypeName::simple(Some("System"), "Int32")))
        );
        assert_eq!(parse("System.Void*").full_name(), "System.Void*");
    }

    #[test]
    fn nullable_example_drops_argument_assembly_in_full_name() {
        let ty = parse("System.Nullable`1[[System.Boolean, X]]");
        let TypeName::Generic { base, arguments } = &ty else {
            panic!("expected a generic type, got {ty:?}");
        };
        assert_eq!(base.name(), "Nullable`1");
        assert_eq!(arguments.len(), 1);
        assert_eq!(arguments[0].name(), "Boolean");
        assert_eq!(arguments[0].assembly(), Some("X"));
        assert_eq!(ty.full_name(), "System.Nullable`1[[System.Boolean]]");
    }

    #[test]
    fn assembly_continuations_accumulate_on_the_core_type() {
        let ty = parse("System.String, mscorlib, Version=4.0.0.0, Culture=neutral");
        assert_eq!(
            ty.assembly(),
            Some("mscorlib, Version=4.0.0.0, Culture=neutral")
        );
        assert_eq!(ty.full_name(), "System.String");
    }

    #[test]
    fn assembly_after_suffixes_reaches_the_inner_simple_type() {
        let ty = parse("System.String[], mscorlib");
        assert!(matches!(ty, TypeName::Array { .. }));
        assert_eq!(ty.assembly(), Some("mscorlib"));
        assert_eq!(ty.full_name(), "System.String[]");
    }

    #[test]
    fn suffixes_compose_left_to_right() {
        let ty = parse("System.Int32[]&");
        assert_eq!(
            ty,
            TypeName::Reference(Box::new(TypeName::Array {
                element: Box::new(TypeName::simple(Some("System"), "Int32")),
                dimensions: 1,
            }))
        );
    }

    #[test]
    fn generic_with_multiple_arguments() {
        let ty = parse(
            "System.Collections.Generic.Dictionary`2[[System.String, A],[System.Int32, B]]",
        );
        let TypeName::Generic { arguments, .. } = &ty else {
            panic!("expected a generic type");
        };
        assert_eq!(arguments.len(), 2);
        assert_eq!(
            ty.full_name(),
            "System.Collections.Generic.Dictionary`2[[System.String],[System.Int32]]"
        );
    }

    #[test]
    fn nested_generic_arguments_recurse() {
        let ty = parse("A.Outer`1[[B.Inner`1[[System.Int32]]]]");
        assert_eq!(ty.full_name(), "A.Outer`1[[B.Inner`1[[System.Int32]]]]");
    }

    #[test]
    fn malformed_generic_terminator_is_tolerated() {
        let ty = parse("System.Nullable`1[[System.Boolean");
        assert_eq!(ty.full_name(), "System.Nullable`1[[System.Boolean]]");
    }

    #[test]
    fn garbage_head_is_no_parse() {
        assert_eq!(TypeName::parse(""), None);
        assert_eq!(TypeName::parse("[]"), None);
        assert_eq!(TypeName::parse("123"), None);
    }

    #[test]
    fn full_name_reparse_is_idempotent() {
        for input in [
            "System.String",
            "System.String[]",
            "System.Nullable`1[[System.Boolean, X]]",
            "System.Int32&",
            "N.T`2[[A.B],[C.D[]]]*",
        ] {
            let canonical = parse(input).full_name();
            assert_eq!(parse(&canonical).full_name(), canonical);
        }
    }
}
