//! Fragment mapping over realistic documents
//!
//! Exercises sublanguage classification through the public API, including
//! the reversibility contract embedded engines rely on.

use dothtml_syntax::{determine_sublanguage, Document, Position, Sublanguage};

const PAGE: &str = "@viewModel App.PageViewModel, App\n\
<div style=\"display: flex\" onmouseover=\"hover(this)\">\n\
  <dot:Button Click={command: Save}>{{value: Label}}</dot:Button>\n\
  <script>init();</script>\n\
</div>\n";

fn sublanguage_at(document: &Document, needle: &str) -> Sublanguage {
    let offset = document.text().find(needle).expect("needle present");
    let position = document.line_index().position_at(offset);
    determine_sublanguage(document, position)
}

#[test]
fn classifies_every_region_of_a_page() {
    let document = Document::new(PAGE);

    assert!(matches!(
        sublanguage_at(&document, "PageViewModel"),
        Sublanguage::Host
    ));
    assert!(matches!(
        sublanguage_at(&document, "command: Save"),
        Sublanguage::Host
    ));
    assert!(matches!(
        sublanguage_at(&document, "value: Label"),
        Sublanguage::Host
    ));
    assert!(matches!(
        sublanguage_at(&document, "display: flex"),
        Sublanguage::Style(_)
    ));
    assert!(matches!(
        sublanguage_at(&document, "hover(this)"),
        Sublanguage::Script(_)
    ));
    assert!(matches!(
        sublanguage_at(&document, "init();"),
        Sublanguage::Script(_)
    ));
    assert!(matches!(
        sublanguage_at(&document, "dot:Button"),
        Sublanguage::Markup
    ));
}

#[test]
fn fragment_round_trip_holds_for_every_interior_offset() {
    let document = Document::new(PAGE);
    for needle in ["display: flex", "hover(this)", "init();"] {
        let fragment = match sublanguage_at(&document, needle) {
            Sublanguage::Style(f) | Sublanguage::Script(f) => f,
            other => panic!("expected a fragment at {needle:?}, got {other:?}"),
        };
        for original in fragment.start..fragment.end {
            let generated = fragment.generated_position(original);
            assert_eq!(
                fragment.original_position(generated),
                original,
                "round trip failed at offset {original} of {needle:?}"
            );
        }
    }
}

#[test]
fn fragments_survive_edits() {
    let mut document = Document::new(PAGE);
    let at = document.text().find("flex").unwrap();
    let index = document.line_index();
    document.apply_changes(&[dothtml_syntax::TextChange::ranged(
        index.position_at(at),
        index.position_at(at + "flex".len()),
        "grid",
    )]);

    match sublanguage_at(&document, "display: grid") {
        Sublanguage::Style(fragment) => {
            assert_eq!(fragment.virtual_text(document.text()), "display: grid");
        }
        other => panic!("expected style fragment after edit, got {other:?}"),
    }
}

#[test]
fn empty_document_is_markup_everywhere() {
    let document = Document::new("");
    assert!(matches!(
        determine_sublanguage(&document, Position::new(0, 0)),
        Sublanguage::Markup
    ));
}
