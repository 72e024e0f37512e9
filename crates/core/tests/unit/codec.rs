//! Codec Unit Tests.
//!
//! Verifies the encoder against known machine words, decode specificity for
//! overlapping masks, immediate sign handling, and the encode/decode round trip
//! over every bundled definition.

use isax_core::codec::{self, Bindings, EncodedWord};
use isax_core::config::RegistryConfig;
use isax_core::isa::{
    Direction, EncodingLayout, ExtensionSpec, FieldSegment, FixedBits, InstructionDef, OperandDesc,
    OperandKind, Variant,
};
use isax_core::{Error, Registry};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

use crate::common::{full_registry, rv64_registry};

// ══════════════════════════════════════════════════════════
// 1. Known encodings
// ══════════════════════════════════════════════════════════

#[rstest]
#[case("xexample.subincacc", &[("rd", 21), ("rs1", 11), ("rs2", 27)], 0x51b5_baab)]
#[case("xexample.subincacc", &[("rd", 10), ("rs1", 12), ("rs2", 15)], 0x50f6_352b)]
#[case("xexample.subincacc", &[("rd", 11), ("rs1", 14), ("rs2", 17)], 0x5117_35ab)]
#[case("xopenasip.max", &[("rd", 21), ("rs1", 11), ("rs2", 27)], 0x2bb5_8a8b)]
#[case("xopenasip.max", &[("rd", 10), ("rs1", 10), ("rs2", 11)], 0x2ab5_050b)]
#[case("xrv.nand", &[("rd", 10), ("rs1", 10), ("rs2", 11)], 0x92b5_652b)]
#[case("xrv.nand", &[("rd", 21), ("rs1", 11), ("rs2", 27)], 0x93b5_eaab)]
#[case("chacha.xorrol8", &[("rd", 3), ("rs1", 4), ("rs2", 5)], 0x0052_218b)]
#[case("cv.addun", &[("rd", 10), ("rs1", 11), ("rs2", 12), ("is3", 1)], 0x82c5_a55b)]
#[case("cv.macun", &[("rd", 10), ("rs1", 11), ("rs2", 12), ("is3", 7)], 0x8ec5_e55b)]
#[case("cv.macurn", &[("rd", 10), ("rs1", 11), ("rs2", 12), ("is3", 7)], 0xcec5_e55b)]
fn encodes_known_words(#[case] name: &str, #[case] operands: &[(&str, i64)], #[case] expected: u32) {
    let registry = full_registry();
    let id = registry.find(name).unwrap();
    let bindings: Bindings = operands.iter().map(|&(n, v)| (n, v)).collect();

    let word = registry.encode(id, &bindings).unwrap();
    assert_eq!(word, EncodedWord::word(expected));

    let decoded = registry.decode(word).unwrap();
    assert_eq!(registry.name(decoded.def), name);
    assert_eq!(decoded.bindings, bindings);
}

#[test]
fn subincacc_bytes_are_little_endian() {
    let registry = full_registry();
    let id = registry.find("xexample.subincacc").unwrap();
    let word = registry
        .encode(id, &Bindings::from([("rd", 21), ("rs1", 11), ("rs2", 27)]))
        .unwrap();
    assert_eq!(word.to_le_bytes(), vec![0xab, 0xba, 0xb5, 0x51]);
}

#[test]
fn rv64_variant_encodes_like_its_rv32_twin() {
    let registry = rv64_registry(&["xexample64"]);
    let id = registry.find("xexample64.subincacc").unwrap();
    let word = registry
        .encode(id, &Bindings::from([("rd", 12), ("rs1", 10), ("rs2", 11)]))
        .unwrap();
    assert_eq!(word.bits(), 0x50b5_362b);
}

#[test]
fn compressed_nandi_packs_split_immediate() {
    let registry = full_registry();
    let id = registry.find("xrvc.nandi").unwrap();
    let word = registry.encode(id, &Bindings::from([("rd", 10), ("imm", 31)])).unwrap();
    assert_eq!(word, EncodedWord::half(0x817c));
    assert_eq!(word.to_le_bytes(), vec![0x7c, 0x81]);

    let high = registry.encode(id, &Bindings::from([("rd", 15), ("imm", 32)])).unwrap();
    assert_eq!(high.bits() & (1 << 12), 1 << 12);
    let decoded = registry.decode(high).unwrap();
    assert_eq!(decoded.bindings.get("imm"), Some(32));
    assert_eq!(decoded.bindings.get("rd"), Some(15));
}

// ══════════════════════════════════════════════════════════
// 2. Encoding errors
// ══════════════════════════════════════════════════════════

#[rstest]
#[case(&[("rd", 10), ("imm", 64)], "imm")]
#[case(&[("rd", 10), ("imm", -1)], "imm")]
#[case(&[("rd", 7), ("imm", 1)], "rd")]
#[case(&[("rd", 16), ("imm", 1)], "rd")]
fn nandi_rejects_out_of_range_operands(#[case] operands: &[(&str, i64)], #[case] field: &str) {
    let registry = full_registry();
    let id = registry.find("xrvc.nandi").unwrap();
    let bindings: Bindings = operands.iter().map(|&(n, v)| (n, v)).collect();
    match registry.encode(id, &bindings) {
        Err(Error::EncodingOverflow { operand, .. }) => assert_eq!(operand, field),
        other => panic!("expected overflow of {field}, got {other:?}"),
    }
}

#[test]
fn register_numbers_stop_at_x31() {
    let registry = full_registry();
    let id = registry.find("xexample.subincacc").unwrap();
    let err = registry
        .encode(id, &Bindings::from([("rd", 32), ("rs1", 1), ("rs2", 2)]))
        .unwrap_err();
    assert!(matches!(err, Error::EncodingOverflow { value: 32, .. }), "{err}");
}

#[test]
fn missing_and_unknown_bindings() {
    let registry = full_registry();
    let def = registry.def(registry.find("xexample.subincacc").unwrap());

    let err = codec::encode(def, &Bindings::from([("rd", 1), ("rs1", 2)])).unwrap_err();
    assert!(matches!(err, Error::MissingOperand { ref operand, .. } if operand == "rs2"));

    let err = codec::encode(def, &Bindings::from([("rd", 1), ("rs1", 2), ("rs2", 3), ("rs3", 4)]))
        .unwrap_err();
    assert!(matches!(err, Error::UnknownOperand { ref operand, .. } if operand == "rs3"));
}

// ══════════════════════════════════════════════════════════
// 3. Decode specificity and signed immediates
// ══════════════════════════════════════════════════════════

fn operand(name: &str, kind: OperandKind, width: u32, signed: bool) -> OperandDesc {
    OperandDesc {
        name: name.to_owned(),
        kind,
        width,
        signed,
        direction: Direction::In,
        bias: 0,
    }
}

fn custom3(mnemonic: &str, fixed: Vec<FixedBits>, fields: Vec<FieldSegment>, operands: Vec<OperandDesc>) -> InstructionDef {
    InstructionDef {
        mnemonic: mnemonic.to_owned(),
        variant: Variant::Standard,
        operands,
        encoding: EncodingLayout { fixed, fields },
        template: None,
        marker: None,
        intrinsic: None,
    }
}

/// `wide` fixes only the opcode; `narrow` additionally fixes funct3 = 5.
fn overlapping_registry() -> Registry {
    let opcode = FixedBits { hi: 6, lo: 0, value: 0x7b };
    let wide = custom3(
        "wide",
        vec![opcode],
        vec![FieldSegment::whole("payload", 31, 7)],
        vec![operand("payload", OperandKind::Immediate, 25, false)],
    );
    let narrow = custom3(
        "narrow",
        vec![opcode, FixedBits { hi: 14, lo: 12, value: 5 }],
        vec![
            FieldSegment {
                operand: "imm".to_owned(),
                hi: 31,
                lo: 25,
                offset: 5,
            },
            FieldSegment::whole("rs2", 24, 20),
            FieldSegment::whole("rs1", 19, 15),
            FieldSegment::whole("imm", 11, 7),
        ],
        vec![
            operand("rs1", OperandKind::Register, 32, false),
            operand("rs2", OperandKind::Register, 32, false),
            operand("imm", OperandKind::Immediate, 12, true),
        ],
    );
    let spec = ExtensionSpec {
        namespace: "xtest".to_owned(),
        name: "Overlap".to_owned(),
        instructions: vec![wide, narrow],
    };
    Registry::load([spec], &RegistryConfig::default()).unwrap()
}

#[test]
fn fewer_free_bits_wins_decode() {
    let registry = overlapping_registry();
    let narrow = registry.find("xtest.narrow").unwrap();
    let wide = registry.find("xtest.wide").unwrap();

    let word = registry
        .encode(narrow, &Bindings::from([("rs1", 3), ("rs2", 4), ("imm", -5)]))
        .unwrap();
    assert_eq!(registry.decode(word).unwrap().def, narrow);

    let other = EncodedWord::word(word.bits() & !(0b111 << 12));
    assert_eq!(registry.decode(other).unwrap().def, wide);
}

#[test]
fn shadowed_words_are_rejected_by_the_registry_only() {
    let registry = overlapping_registry();
    let wide = registry.find("xtest.wide").unwrap();
    // payload bits [14:12] land on narrow's funct3.
    let bindings = Bindings::from([("payload", 5 << 5)]);

    assert!(codec::encode(registry.def(wide), &bindings).is_ok());
    let err = registry.encode(wide, &bindings).unwrap_err();
    assert!(
        matches!(err, Error::ShadowedEncoding { ref shadowed_by, .. } if shadowed_by == "xtest.narrow"),
        "{err}"
    );
}

#[rstest]
#[case(-5)]
#[case(-2048)]
#[case(2047)]
#[case(0)]
fn signed_split_immediates_sign_extend(#[case] imm: i64) {
    let registry = overlapping_registry();
    let narrow = registry.find("xtest.narrow").unwrap();
    let bindings = Bindings::from([("rs1", 1), ("rs2", 2), ("imm", imm)]);
    let word = registry.encode(narrow, &bindings).unwrap();
    assert_eq!(registry.decode(word).unwrap().bindings, bindings);
}

#[test]
fn signed_immediate_range_is_enforced() {
    let registry = overlapping_registry();
    let narrow = registry.find("xtest.narrow").unwrap();
    for imm in [2048, -2049] {
        let err = registry
            .encode(narrow, &Bindings::from([("rs1", 1), ("rs2", 2), ("imm", imm)]))
            .unwrap_err();
        assert!(matches!(err, Error::EncodingOverflow { .. }), "{err}");
    }
}

#[test]
fn unknown_words_do_not_decode() {
    let registry = full_registry();
    // Standard `add x3, x4, x5`.
    let err = registry.decode(EncodedWord::word(0x0052_01b3)).unwrap_err();
    assert!(matches!(err, Error::DecodeNoMatch(_)));
    assert!(!err.is_fatal());
}

#[test]
fn decode_bytes_follows_length_prefix() {
    let registry = full_registry();
    let (decoded, len) = registry.decode_bytes(&[0x7c, 0x81, 0xab, 0xba]).unwrap();
    assert_eq!(len, 2);
    assert_eq!(registry.name(decoded.def), "xrvc.nandi");

    let err = registry.decode_bytes(&[0xab, 0xba, 0xb5]).unwrap_err();
    assert!(matches!(err, Error::Truncated { needed: 4, available: 3, .. }));
}

// ══════════════════════════════════════════════════════════
// 4. Round trip over every definition
// ══════════════════════════════════════════════════════════

/// Picks a legal value for every operand from raw seeds.
fn legal_bindings(def: &InstructionDef, seeds: &[u64]) -> Bindings {
    def.operands
        .iter()
        .zip(seeds)
        .map(|(op, &seed)| {
            let (lo, hi) = match op.kind {
                OperandKind::Register => {
                    let bits = def.encoding.coverage(&op.name).0;
                    let lo = i64::from(op.bias);
                    (lo, (lo + (1 << bits) - 1).min(31))
                }
                OperandKind::Immediate => op.immediate_range(),
            };
            let span = (hi - lo) as u64 + 1;
            (op.name.as_str(), lo + (seed % span) as i64)
        })
        .collect()
}

proptest! {
    #[test]
    fn decode_inverts_encode(index in 0usize..64, seeds in prop::collection::vec(any::<u64>(), 8)) {
        let registry = full_registry();
        let ids: Vec<_> = registry.ids().collect();
        let id = ids[index % ids.len()];
        let bindings = legal_bindings(registry.def(id), &seeds);

        let word = registry.encode(id, &bindings).unwrap();
        let decoded = registry.decode(word).unwrap();
        prop_assert_eq!(decoded.def, id);
        prop_assert_eq!(decoded.bindings, bindings);

        let (from_bytes, len) = registry.decode_bytes(&word.to_le_bytes()).unwrap();
        prop_assert_eq!(from_bytes.def, id);
        prop_assert_eq!(len, word.size().bytes());
    }
}
