//! Rounding Detection Tests.
//!
//! A sum followed by `>> k` that also adds exactly `1 << (k - 1)` selects the
//! rounding variant of the base template, reporting the constant add as consumed.

use isax_core::config::MatcherConfig;
use isax_core::pattern::{Bound, MatchOutcome, Matcher};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::{analyze, full_registry, matcher, registry};

const MAC: &[&str] = &["acc:u32", "x:u16", "y:u16"];

const ROUNDED: &str = "((uint64_t)acc + (uint64_t)x * y + ((uint64_t)1 << 6)) >> 7";

#[test]
fn rounding_constant_selects_the_rounding_variant() {
    let registry = registry(&["xcorev"]);
    let tree = analyze(ROUNDED, MAC);
    let outcome = matcher(&registry).select(&tree).unwrap();
    let candidate = outcome.candidate().unwrap();

    assert_eq!(registry.name(candidate.def()), "cv.macurn");
    assert_eq!(candidate.binding("is3"), Some(Bound::Imm(7)));
    assert!(matches!(candidate.binding("rd"), Some(Bound::Value(_))));
    assert_eq!(candidate.root, tree.root());

    // The outer add carries the rounding constant.
    let outer_add = tree.tree().children(tree.root())[0];
    assert_eq!(candidate.consumed, vec![outer_add]);
    assert!(candidate.absorbed.contains(&outer_add));
}

#[test]
fn rounding_variant_beats_every_plain_match() {
    let registry = full_registry();
    let tree = analyze(ROUNDED, MAC);
    let found = matcher(&registry).match_at(&tree, tree.root());
    let names: Vec<String> = found.iter().map(|c| registry.name(c.def())).collect();
    assert_eq!(names, vec!["cv.macurn".to_owned()]);
}

#[rstest]
#[case("((uint64_t)acc + (uint64_t)x * y + ((uint64_t)1 << 5)) >> 7")]
#[case("((uint64_t)acc + (uint64_t)x * y + 63) >> 7")]
#[case("((uint64_t)acc + (uint64_t)x * y + 65) >> 7")]
#[case("((uint64_t)acc + (uint64_t)x * y + 128) >> 7")]
fn other_constants_are_not_rounding(#[case] text: &str) {
    let registry = registry(&["xcorev"]);
    let tree = analyze(text, MAC);
    assert_eq!(matcher(&registry).select(&tree).unwrap(), MatchOutcome::NoMatch, "{text}");
}

#[test]
fn wrapping_sum_is_not_rounded() {
    let registry = registry(&["xcorev"]);
    let tree = analyze("(acc + x * y + (1 << 6)) >> 7", MAC);
    assert_eq!(matcher(&registry).select(&tree).unwrap(), MatchOutcome::NoMatch);
}

#[test]
fn lossless_mask_around_the_sum_is_ignored() {
    let registry = registry(&["xcorev"]);
    let tree = analyze(
        "(((uint64_t)acc + (uint64_t)x * y + ((uint64_t)1 << 6)) & 0x3ffffffff) >> 7",
        MAC,
    );
    let outcome = matcher(&registry).select(&tree).unwrap();
    let candidate = outcome.candidate().unwrap();
    assert_eq!(registry.name(candidate.def()), "cv.macurn");
    assert_eq!(candidate.consumed.len(), 1);

    // A mask that drops the carry bit is real work.
    let truncated = analyze(
        "(((uint64_t)acc + (uint64_t)x * y + ((uint64_t)1 << 6)) & 0x1ffffffff) >> 7",
        MAC,
    );
    assert_eq!(matcher(&registry).select(&truncated).unwrap(), MatchOutcome::NoMatch);
}

#[test]
fn detection_can_be_disabled() {
    let registry = registry(&["xcorev"]);
    let config = MatcherConfig {
        rounding_detection: false,
        ..MatcherConfig::default()
    };
    let tree = analyze(ROUNDED, MAC);
    let outcome = Matcher::new(&registry, config).select(&tree).unwrap();
    assert_eq!(outcome, MatchOutcome::NoMatch);
}

#[test]
fn rounding_form_encodes_like_its_base() {
    let registry = registry(&["xcorev"]);
    let tree = analyze(ROUNDED, MAC);
    let outcome = matcher(&registry).select(&tree).unwrap();
    let mut regs = isax_core::pattern::FixedRegisters::from([("rd", 10), ("rs1", 11), ("rs2", 12)]);
    let word = outcome.candidate().unwrap().lower(&registry, &mut regs).unwrap();
    let encoded = registry.encode(outcome.candidate().unwrap().def(), &word).unwrap();
    assert_eq!(encoded.bits(), 0xcec5_e55b);
}
