//! Expanding selection ranges
//!
//!     The chain of ancestor spans at a position, innermost first, with
//!     duplicate spans collapsed so each expansion step actually grows the
//!     selection.

use std::ops::Range;

use dothtml_syntax::Document;

pub fn selection_ranges(document: &Document, offset: usize) -> Vec<Range<usize>> {
    let Some(tree) = document.tree() else {
        return Vec::new();
    };
    let Some(node) = tree.deepest_at(offset) else {
        return Vec::new();
    };

    let mut ranges: Vec<Range<usize>> = Vec::new();
    for ancestor in tree.ancestors(node) {
        let Some(span) = tree.span(ancestor) else {
            continue;
        };
        if ranges.last() != Some(&span) {
            ranges.push(span);
        }
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_expand_from_the_leaf_to_the_document() {
        let source = "<div><span>word</span></div>";
        let document = Document::new(source);
        let offset = source.find("word").unwrap();
        let ranges = selection_ranges(&document, offset);

        assert!(ranges.len() >= 3);
        assert_eq!(&source[ranges[0].clone()], "word");
        assert_eq!(ranges.last().unwrap().clone(), 0..source.len());
        for pair in ranges.windows(2) {
            assert!(
                pair[1].start <= pair[0].start && pair[0].end <= pair[1].end,
                "each step must contain the previous: {ranges:?}"
            );
        }
    }

    #[test]
    fn binding_selection_steps_through_the_attribute() {
        let source = "<dot:Button Click={command: Save} />";
        let document = Document::new(source);
        let offset = source.find("Save").unwrap();
        let ranges = selection_ranges(&document, offset);
        assert!(ranges
            .iter()
            .any(|range| &source[range.clone()] == "{command: Save}"));
        assert!(ranges
            .iter()
            .any(|range| &source[range.clone()] == "Click={command: Save}"));
    }

    #[test]
    fn empty_documents_have_no_ranges() {
        let document = Document::new("");
        // the root document node is zero-width at offset 0
        let ranges = selection_ranges(&document, 0);
        assert!(ranges.len() <= 1);
    }
}
