//! Business-key normalization properties
//!
//! Keys must be stable under re-normalization and must merge the spellings
//! users actually type for the same organization, person or part number.

use inventory_common::normalize::{canonical_key, canonical_key_opt, canonical_part_number};

const SAMPLES: &[&str] = &[
    "Acme Corp",
    "  acme   corp  ",
    "ACME\u{00A0}CORP",
    "Cafe\u{0301} Müller",
    "Café Müller",
    "\tWeyland-Yutani\n Corporation",
    "AB–100",
    "ab - 100",
    "AB_100",
    "x__--__y",
    "ß straße",
    "İstanbul Ltd",
];

#[test]
fn test_canonical_key_is_idempotent() {
    for sample in SAMPLES {
        for fold in [false, true] {
            let once = canonical_key(sample, fold).unwrap();
            let twice = canonical_key(&once, fold).unwrap();
            assert_eq!(once, twice, "not idempotent for {:?} (fold={})", sample, fold);
        }
    }
}

#[test]
fn test_canonical_part_number_is_idempotent() {
    for sample in SAMPLES {
        let once = canonical_part_number(sample).unwrap();
        let twice = canonical_part_number(&once).unwrap();
        assert_eq!(once, twice, "not idempotent for {:?}", sample);
    }
}

#[test]
fn test_organization_spellings_share_one_key() {
    let a = canonical_key("Acme Corp", true);
    assert_eq!(a, canonical_key("  acme   corp  ", true));
    assert_eq!(a, canonical_key("ACME\u{00A0}CORP", true));
}

#[test]
fn test_composed_and_decomposed_forms_match() {
    assert_eq!(
        canonical_key("Cafe\u{0301} Müller", false),
        canonical_key("Café Müller", false)
    );
}

#[test]
fn test_part_number_dash_variants_match() {
    let expected = Some("AB-100".to_string());
    assert_eq!(canonical_part_number("AB–100"), expected);
    assert_eq!(canonical_part_number("ab - 100"), expected);
    assert_eq!(canonical_part_number("AB_100"), expected);
    assert_eq!(canonical_part_number("ab—100"), expected);
}

#[test]
fn test_blank_input_has_no_key() {
    assert_eq!(canonical_key("", true), None);
    assert_eq!(canonical_key(" \u{00A0}\t", false), None);
    assert_eq!(canonical_key_opt(None, true), None);
    assert_eq!(canonical_part_number("   "), None);
}
