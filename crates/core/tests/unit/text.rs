//! Assembly Text Tests.
//!
//! Covers the assembler front end, disassembly formatting options, and the
//! byte-stream walker with mixed 16/32-bit words and undecodable data.

use isax_core::codec::EncodedWord;
use isax_core::config::DisasmConfig;
use isax_core::{Error, Registry};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::{full_registry, registry};

#[rstest]
#[case("xexample.subincacc x21, x11, x27", 0x51b5_baab)]
#[case("xexample.subincacc s5, a1, s11", 0x51b5_baab)]
#[case("xexample.subincacc x21,x11,x27   # acc -= x27 - x11 - 1", 0x51b5_baab)]
#[case("xopenasip.max a0, a0, a1", 0x2ab5_050b)]
#[case("xrv.nand x10, x10, x11", 0x92b5_652b)]
#[case("chacha.xorrol8 gp, tp, t0", 0x0052_218b)]
#[case("cv.macun a0, a1, a2, 7", 0x8ec5_e55b)]
#[case("cv.addun x10, x11, x12, 0x1", 0x82c5_a55b)]
#[case("xrvc.nandi a0, 31", 0x817c)]
fn assembles_lines(#[case] line: &str, #[case] expected: u32) {
    let registry = full_registry();
    assert_eq!(registry.assemble(line).unwrap().bits(), expected, "{line}");
}

#[rstest]
#[case(0x51b5_baab, "xexample.subincacc x21, x11, x27")]
#[case(0x2bb5_8a8b, "xopenasip.max x21, x11, x27")]
#[case(0x93b5_eaab, "xrv.nand x21, x11, x27")]
#[case(0xcec5_e55b, "cv.macurn x10, x11, x12, 7")]
fn disassembles_words(#[case] word: u32, #[case] expected: &str) {
    let registry = full_registry();
    let text = registry.disassemble(EncodedWord::word(word)).unwrap();
    assert_eq!(text, expected);
    assert_eq!(registry.assemble(&text).unwrap().bits(), word);
}

#[test]
fn compressed_words_disassemble() {
    let registry = full_registry();
    assert_eq!(
        registry.disassemble(EncodedWord::half(0x817c)).unwrap(),
        "xrvc.nandi x10, 31"
    );
}

#[test]
fn formatting_options() {
    let registry = full_registry();
    let abi = DisasmConfig {
        abi_names: true,
        hex_immediates: false,
    };
    let hex = DisasmConfig {
        abi_names: false,
        hex_immediates: true,
    };
    let word = EncodedWord::word(0x51b5_baab);
    assert_eq!(
        registry.disassemble_with(word, &abi).unwrap(),
        "xexample.subincacc s5, a1, s11"
    );
    assert_eq!(
        registry.disassemble_with(EncodedWord::half(0x817c), &hex).unwrap(),
        "xrvc.nandi x10, 0x1f"
    );
    assert_eq!(
        registry.disassemble_with(EncodedWord::word(0x8ec5_e55b), &abi).unwrap(),
        "cv.macun a0, a1, a2, 7"
    );
}

#[test]
fn standard_instructions_do_not_decode() {
    let registry = full_registry();
    // add x3, x4, x5
    assert!(matches!(
        registry.disassemble(EncodedWord::word(0x0052_01b3)),
        Err(Error::DecodeNoMatch(_))
    ));
}

// ══════════════════════════════════════════════════════════
// Assembler errors
// ══════════════════════════════════════════════════════════

#[test]
fn unknown_mnemonics_are_reported() {
    let registry = full_registry();
    match registry.assemble("xexample.nope x1, x2, x3") {
        Err(Error::UnknownMnemonic(name)) => assert_eq!(name, "xexample.nope"),
        other => panic!("expected UnknownMnemonic, got {other:?}"),
    }
    // Mnemonics are always namespace-qualified.
    assert!(matches!(registry.assemble("subincacc x1, x2, x3"), Err(Error::UnknownMnemonic(_))));
}

#[rstest]
#[case("xexample.subincacc x1, x2", "takes 3 operand(s), got 2")]
#[case("xexample.subincacc x1, x2, x3, x4", "takes 3 operand(s), got 4")]
#[case("xexample.subincacc x1, x2, 7", "expected a register")]
#[case("xexample.subincacc x1, x2, x32", "expected a register")]
#[case("cv.addun x10, x11, x12, seven", "expected an integer")]
#[case("cv.addun x10, x11, x12, x1", "expected an integer")]
fn invalid_operands_are_reported(#[case] line: &str, #[case] reason: &str) {
    let registry = full_registry();
    match registry.assemble(line) {
        Err(err @ Error::InvalidOperand { .. }) => {
            assert!(err.to_string().contains(reason), "{err}");
            assert!(!err.is_fatal());
        }
        other => panic!("expected InvalidOperand for {line}, got {other:?}"),
    }
}

#[test]
fn parsed_values_still_go_through_the_codec() {
    let registry = full_registry();
    assert!(matches!(
        registry.assemble("cv.addun x10, x11, x12, 32"),
        Err(Error::EncodingOverflow { value: 32, .. })
    ));
    assert!(matches!(
        registry.assemble("xrvc.nandi x7, 1"),
        Err(Error::EncodingOverflow { value: 7, .. })
    ));
}

// ══════════════════════════════════════════════════════════
// Byte streams
// ══════════════════════════════════════════════════════════

fn stream() -> Vec<u8> {
    let mut bytes = Vec::new();
    for word in [
        EncodedWord::word(0x51b5_baab),
        EncodedWord::half(0x817c),
        EncodedWord::word(0x0052_01b3),
        EncodedWord::word(0x2ab5_050b),
    ] {
        bytes.extend(word.to_le_bytes());
    }
    bytes.push(0xab);
    bytes
}

#[test]
fn byte_stream_walk_continues_past_bad_words() {
    let registry = full_registry();
    let lines = registry.disassemble_bytes(&stream(), &DisasmConfig::default());

    let offsets: Vec<usize> = lines.iter().map(|l| l.offset).collect();
    assert_eq!(offsets, vec![0, 4, 6, 10, 14]);

    assert_eq!(lines[0].result.as_deref().unwrap(), "xexample.subincacc x21, x11, x27");
    assert_eq!(lines[1].result.as_deref().unwrap(), "xrvc.nandi x10, 31");
    assert_eq!(lines[1].bytes, vec![0x7c, 0x81]);
    assert!(matches!(lines[2].result, Err(Error::DecodeNoMatch(_))));
    assert_eq!(lines[3].result.as_deref().unwrap(), "xopenasip.max x10, x10, x11");
    assert!(matches!(
        lines[4].result,
        Err(Error::Truncated { offset: 14, needed: 4, available: 1 })
    ));
}

#[test]
fn listing_lines_render() {
    let registry = full_registry();
    let lines = registry.disassemble_bytes(&stream(), &DisasmConfig::default());
    assert_eq!(
        lines[0].to_string(),
        "     0:  ab ba b5 51 xexample.subincacc x21, x11, x27"
    );
    assert_eq!(lines[1].to_string(), "     4:  7c 81       xrvc.nandi x10, 31");
    assert!(lines[2].to_string().contains("<invalid: no instruction matches 0x005201b3>"));
}

#[test]
fn empty_stream_has_no_lines() {
    let registry: Registry = registry(&["xrv"]);
    assert!(registry.disassemble_bytes(&[], &DisasmConfig::default()).is_empty());
}
