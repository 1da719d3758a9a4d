//! Compatibility matrix for property mapping modes
//!
//! Each case pairs a declared mode with a usage context. `Exclude` as a
//! context accepts everything (the caller asked for "all members"), while a
//! declared `Exclude` is never placeable in markup.

use dothtml_metadata::{is_compatible_mapping_mode, MappingMode};
use rstest::rstest;

use MappingMode::{Attribute, Both, Exclude, InnerElement};

#[rstest]
#[case(Exclude, Exclude, true)]
#[case(Attribute, Exclude, true)]
#[case(InnerElement, Exclude, true)]
#[case(Both, Exclude, true)]
#[case(Exclude, Attribute, false)]
#[case(Attribute, Attribute, true)]
#[case(InnerElement, Attribute, false)]
#[case(Both, Attribute, true)]
#[case(Exclude, InnerElement, false)]
#[case(Attribute, InnerElement, false)]
#[case(InnerElement, InnerElement, true)]
#[case(Both, InnerElement, true)]
#[case(Exclude, Both, false)]
#[case(Attribute, Both, false)]
#[case(InnerElement, Both, false)]
#[case(Both, Both, true)]
fn declared_mode_against_context(
    #[case] declared: MappingMode,
    #[case] context: MappingMode,
    #[case] compatible: bool,
) {
    assert_eq!(
        is_compatible_mapping_mode(Some(declared), context),
        compatible,
        "declared {declared:?} in {context:?} context"
    );
}

#[rstest]
#[case(Exclude, true)]
#[case(Attribute, true)]
#[case(InnerElement, false)]
#[case(Both, false)]
fn absent_declared_mode_behaves_like_attribute(
    #[case] context: MappingMode,
    #[case] compatible: bool,
) {
    assert_eq!(is_compatible_mapping_mode(None, context), compatible);
}
