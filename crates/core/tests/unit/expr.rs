//! Expression Front End Tests.
//!
//! Verifies parsing (precedence, casts, literal typing, error offsets) and the
//! width analyzer's exact/reachable widths and overflow flags.

use isax_core::Error;
use isax_core::expr::{ExprBuilder, ExprKind, IntType, parse_expr};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::{analyze, var_types};

// ══════════════════════════════════════════════════════════
// 1. Parsing
// ══════════════════════════════════════════════════════════

#[rstest]
#[case("x + y * 2", "(x + (y * 2))")]
#[case("x - y - 1", "((x - y) - 1)")]
#[case("x << 1 + y", "(x << (1 + y))")]
#[case("x & y | x ^ y", "((x & y) | (x ^ y))")]
#[case("x < y ? x : y", "((x < y) ? x : y)")]
#[case("~(x & 31)", "~(x & 31)")]
#[case("(uint64_t)x + y", "((u64)x + y)")]
#[case("(unsigned long long)x", "(u64)x")]
fn parses_with_c_precedence(#[case] text: &str, #[case] rendered: &str) {
    let tree = parse_expr(text, &var_types(&["x:u32", "y:u32"])).unwrap();
    assert_eq!(tree.to_string(), rendered);
}

#[test]
fn applies_c_typing() {
    let vars = var_types(&["a:u8", "b:u8", "x:u32", "s:i32"]);
    let root_ty = |text: &str| {
        let tree = parse_expr(text, &vars).unwrap();
        tree.node(tree.root()).ty
    };
    assert_eq!(root_ty("a + b"), IntType::U32);
    assert_eq!(root_ty("x + s"), IntType::U32);
    assert_eq!(root_ty("(uint64_t)x + s"), IntType::U64);
    assert_eq!(root_ty("a << 3"), IntType::U32);
    assert_eq!(root_ty("x < s"), IntType::I32);
    assert_eq!(root_ty("1"), IntType::I32);
    assert_eq!(root_ty("1u"), IntType::U32);
    assert_eq!(root_ty("0xffffffff"), IntType::U32);
    assert_eq!(root_ty("0x1ffffffff"), IntType::I64);
    assert_eq!(root_ty("1ul"), IntType::U64);
}

#[test]
fn parenthesized_variables_are_not_casts() {
    let vars = var_types(&["x:u32", "int8:u8"]);
    let tree = parse_expr("(int8) + x", &vars).unwrap();
    assert!(matches!(tree.node(tree.root()).kind, ExprKind::Binary(..)));
}

#[rstest]
#[case("x / y", 2)]
#[case("z + 1", 0)]
#[case("(x + y", 6)]
#[case("x +", 3)]
#[case("x y", 2)]
#[case("99999999999999999999999", 0)]
fn reports_parse_errors_with_offsets(#[case] text: &str, #[case] at: usize) {
    match parse_expr(text, &var_types(&["x:u32", "y:u32"])) {
        Err(Error::Parse { offset, .. }) => assert_eq!(offset, at, "{text}"),
        other => panic!("expected a parse error for {text}, got {other:?}"),
    }
}

#[test]
fn builder_rejects_foreign_roots() {
    let mut other = ExprBuilder::new();
    let _ = other.var("x", IntType::U32);
    let id = other.var("y", IntType::U32);
    assert!(ExprBuilder::new().finish(id).is_err());
}

// ══════════════════════════════════════════════════════════
// 2. Width analysis
// ══════════════════════════════════════════════════════════

/// (width, exact, overflow) of the root.
fn root_widths(text: &str, vars: &[&str]) -> (u32, u32, bool) {
    let tree = analyze(text, vars);
    let info = tree.info(tree.root());
    (info.width, info.exact, info.overflow)
}

#[rstest]
#[case("x + y", &["x:u32", "y:u32"], (32, 33, true))]
#[case("(uint64_t)x + y", &["x:u32", "y:u32"], (33, 33, false))]
#[case("((uint64_t)x + y) >> 1", &["x:u32", "y:u32"], (32, 32, false))]
#[case("x + y", &["x:u8", "y:u8"], (9, 9, false))]
#[case("x * y", &["x:u16", "y:u16"], (32, 32, false))]
#[case("acc + x * y", &["acc:u32", "x:u16", "y:u16"], (32, 33, true))]
#[case("(uint64_t)acc + x * y", &["acc:u32", "x:u16", "y:u16"], (33, 33, false))]
#[case("x << 8", &["x:u8"], (16, 16, false))]
#[case("x << 8", &["x:u32"], (32, 40, true))]
#[case("(uint8_t)x", &["x:u32"], (8, 32, true))]
#[case("x & 31", &["x:u32"], (5, 5, false))]
#[case("x < y", &["x:u32", "y:u32"], (1, 1, false))]
fn computes_widths(#[case] text: &str, #[case] vars: &[&str], #[case] expected: (u32, u32, bool)) {
    assert_eq!(root_widths(text, vars), expected, "{text}");
}

#[test]
fn negation_of_unsigned_wraps() {
    let tree = analyze("-x", &["x:u32"]);
    let info = tree.info(tree.root());
    assert!(info.overflow);
    assert!(!info.signed);

    let tree = analyze("-x", &["x:i16"]);
    let info = tree.info(tree.root());
    assert_eq!((info.width, info.signed, info.overflow), (17, true, false));
}

#[test]
fn widening_casts_are_sufficient() {
    let tree = analyze("(uint64_t)x", &["x:u32"]);
    let info = tree.info(tree.root());
    assert!(info.sufficient);
    assert_eq!(info.width, 32);

    let tree = analyze("(int32_t)x", &["x:u32"]);
    assert!(!tree.info(tree.root()).sufficient);
}

#[test]
fn every_node_is_annotated() {
    let tree = analyze("((uint64_t)x + y + 1) >> 1", &["x:u32", "y:u32"]);
    for id in tree.tree().ids() {
        let info = tree.info(id);
        assert!(info.width >= 1);
        assert!(info.width <= info.exact);
        assert!(info.width <= tree.tree().node(id).ty.bits);
    }
}
