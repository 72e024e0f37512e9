//! Registry Loading Tests.
//!
//! Every malformed-spec rule has a rejecting case; the remaining tests cover
//! RV64 skipping, intrinsic alias generation, lookups, and the load report.

use isax_core::config::RegistryConfig;
use isax_core::isa::{
    Direction, EncodingLayout, ExtensionSpec, FieldSegment, FixedBits, InstructionDef, Marker,
    MajorOpcode, OperandDesc, OperandKind, Variant,
};
use isax_core::{Error, Registry};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;

use crate::common::{full_registry, registry, rv64_registry, spec};

fn reg(name: &str, direction: Direction) -> OperandDesc {
    OperandDesc {
        name: name.to_owned(),
        kind: OperandKind::Register,
        width: 32,
        signed: false,
        direction,
        bias: 0,
    }
}

/// `rd = rs1 ^ rs2` on custom-0 with the given funct3.
fn xor_def(mnemonic: &str, funct3: u32) -> InstructionDef {
    InstructionDef {
        mnemonic: mnemonic.to_owned(),
        variant: Variant::Standard,
        operands: vec![
            reg("rd", Direction::Out),
            reg("rs1", Direction::In),
            reg("rs2", Direction::In),
        ],
        encoding: EncodingLayout::r_type(0x0b, funct3, 0x11),
        template: Some("(xor rs1 rs2)".to_owned()),
        marker: None,
        intrinsic: None,
    }
}

fn ext(namespace: &str, instructions: Vec<InstructionDef>) -> ExtensionSpec {
    ExtensionSpec {
        namespace: namespace.to_owned(),
        name: String::new(),
        instructions,
    }
}

/// Loads one definition (mutated by `edit`) and returns the rejection reason.
fn rejection(edit: impl FnOnce(&mut InstructionDef)) -> String {
    let mut def = xor_def("op", 0);
    edit(&mut def);
    rejection_of(vec![ext("xt", vec![def])])
}

fn rejection_of(specs: Vec<ExtensionSpec>) -> String {
    match Registry::load(specs, &RegistryConfig::default()) {
        Err(err @ Error::MalformedSpec { .. }) => {
            assert!(err.is_fatal());
            err.to_string()
        }
        Err(other) => panic!("expected MalformedSpec, got {other}"),
        Ok(_) => panic!("expected MalformedSpec, registry loaded"),
    }
}

#[test]
fn the_baseline_definition_is_valid() {
    let registry = Registry::load([ext("xt", vec![xor_def("op", 0)])], &RegistryConfig::default()).unwrap();
    assert_eq!(registry.len(), 1);
}

// ══════════════════════════════════════════════════════════
// 1-2. Ranges, overlap, coverage
// ══════════════════════════════════════════════════════════

#[test]
fn rejects_inverted_ranges() {
    let msg = rejection(|d| d.encoding.fields[0] = FieldSegment::whole("rs2", 20, 24));
    assert!(msg.contains("hi < lo"), "{msg}");
}

#[test]
fn rejects_ranges_outside_the_word() {
    let msg = rejection(|d| d.encoding.fixed[0] = FixedBits { hi: 32, lo: 25, value: 0 });
    assert!(msg.contains("exceeds the 32-bit word"), "{msg}");
}

#[test]
fn rejects_fixed_values_that_do_not_fit() {
    let msg = rejection(|d| d.encoding.fixed[0].value = 0x80);
    assert!(msg.contains("does not fit"), "{msg}");
}

#[test]
fn rejects_overlapping_ranges() {
    let msg = rejection(|d| d.encoding.fields[0].lo = 19);
    assert!(msg.contains("overlaps"), "{msg}");
}

#[test]
fn rejects_uncovered_bits() {
    let msg = rejection(|d| {
        let _ = d.encoding.fields.pop();
    });
    assert!(msg.contains("not covered"), "{msg}");
}

// ══════════════════════════════════════════════════════════
// 3. Operands and fields
// ══════════════════════════════════════════════════════════

#[test]
fn rejects_fields_of_undeclared_operands() {
    let msg = rejection(|d| d.encoding.fields[0].operand = "rs3".to_owned());
    assert!(msg.contains("undeclared operand `rs3`"), "{msg}");
}

#[test]
fn rejects_operands_without_fields() {
    let msg = rejection(|d| {
        d.operands.push(reg("rs3", Direction::In));
        d.template = Some("(xor rs1 (xor rs2 rs3))".to_owned());
    });
    assert!(msg.contains("`rs3` has no field"), "{msg}");
}

#[test]
fn rejects_immediate_segments_beyond_the_operand_width() {
    let msg = rejection(|d| {
        d.operands[2] = imm("rs2", 4);
    });
    assert!(msg.contains("exceeds its 4-bit width"), "{msg}");
}

#[test]
fn rejects_biased_fields_past_x31() {
    let msg = rejection(|d| d.operands[1].bias = 8);
    assert!(msg.contains("reaches past x31"), "{msg}");
}

#[test]
fn rejects_duplicate_operands_and_bad_widths() {
    let msg = rejection(|d| d.operands[2].name = "rs1".to_owned());
    assert!(msg.contains("duplicate operand"), "{msg}");
    let msg = rejection(|d| d.operands[1].width = 0);
    assert!(msg.contains("width 0"), "{msg}");
}

// ══════════════════════════════════════════════════════════
// 4. Length prefix
// ══════════════════════════════════════════════════════════

#[test]
fn rejects_32_bit_words_without_the_length_prefix() {
    let msg = rejection(|d| d.encoding.fixed[2].value = 0x08);
    assert!(msg.contains("[1:0] = 0b11"), "{msg}");
}

#[test]
fn rejects_16_bit_words_with_the_32_bit_prefix() {
    let mut nandi = spec("xrvc");
    nandi.instructions[0].encoding.fixed[2].value = 0b11;
    let msg = rejection_of(vec![nandi]);
    assert!(msg.contains("16-bit encodings"), "{msg}");
}

// ══════════════════════════════════════════════════════════
// 5. Names
// ══════════════════════════════════════════════════════════

#[test]
fn rejects_duplicate_mnemonics() {
    let msg = rejection_of(vec![ext("xt", vec![xor_def("op", 0), xor_def("op", 1)])]);
    assert!(msg.contains("duplicate mnemonic"), "{msg}");
}

#[test]
fn same_mnemonic_in_another_namespace_is_fine() {
    let registry = Registry::load(
        [ext("xa", vec![xor_def("op", 0)]), ext("xb", vec![xor_def("op", 1)])],
        &RegistryConfig::default(),
    )
    .unwrap();
    assert!(registry.find("xa.op").is_some());
    assert!(registry.find("xb.op").is_some());
}

#[test]
fn rejects_duplicate_intrinsic_aliases() {
    let mut a = xor_def("a", 0);
    let mut b = xor_def("b", 1);
    a.intrinsic = Some("__builtin_same".to_owned());
    b.intrinsic = Some("__builtin_same".to_owned());
    let msg = rejection_of(vec![ext("xt", vec![a, b])]);
    assert!(msg.contains("declared twice"), "{msg}");
}

// ══════════════════════════════════════════════════════════
// 6. Decode uniqueness
// ══════════════════════════════════════════════════════════

#[test]
fn rejects_identical_masks() {
    let msg = rejection_of(vec![ext("xt", vec![xor_def("a", 0), xor_def("b", 0)])]);
    assert!(msg.contains("decodes ambiguously with `xt.a`"), "{msg}");
}

fn imm(name: &str, width: u32) -> OperandDesc {
    OperandDesc {
        name: name.to_owned(),
        kind: OperandKind::Immediate,
        width,
        signed: false,
        direction: Direction::In,
        bias: 0,
    }
}

#[test]
fn rejects_equally_specific_overlapping_masks() {
    // `b` fixes funct7[6:2] and rd instead of funct3: both fix 17 bits and agree
    // on every bit they share.
    let a = xor_def("a", 0);
    let b = InstructionDef {
        mnemonic: "b".to_owned(),
        variant: Variant::Standard,
        operands: vec![
            reg("rs1", Direction::In),
            reg("rs2", Direction::In),
            imm("lo", 2),
            imm("k", 3),
        ],
        encoding: EncodingLayout {
            fixed: vec![
                FixedBits { hi: 31, lo: 27, value: 0x11 >> 2 },
                FixedBits { hi: 11, lo: 7, value: 0 },
                FixedBits { hi: 6, lo: 0, value: 0x0b },
            ],
            fields: vec![
                FieldSegment::whole("lo", 26, 25),
                FieldSegment::whole("rs2", 24, 20),
                FieldSegment::whole("rs1", 19, 15),
                FieldSegment::whole("k", 14, 12),
            ],
        },
        template: None,
        marker: None,
        intrinsic: None,
    };
    assert_eq!(a.free_bits(), b.free_bits());
    let msg = rejection_of(vec![ext("xt", vec![a, b])]);
    assert!(msg.contains("decodes ambiguously"), "{msg}");
}

#[test]
fn more_specific_overlaps_are_allowed() {
    let mut wide = xor_def("wide", 0);
    wide.operands.push(imm("f", 3));
    let _ = wide.encoding.fixed.remove(1);
    wide.encoding.fields.push(FieldSegment::whole("f", 14, 12));
    wide.template = None;
    let registry = Registry::load([ext("xt", vec![wide, xor_def("narrow", 2)])], &RegistryConfig::default()).unwrap();
    assert_eq!(registry.len(), 2);
}

#[test]
fn loading_both_subincacc_flavours_on_rv64_conflicts() {
    let result = Registry::load([spec("xexample"), spec("xexample64")], &RegistryConfig::rv64());
    assert!(matches!(result, Err(Error::MalformedSpec { .. })));
}

// ══════════════════════════════════════════════════════════
// 7. Templates
// ══════════════════════════════════════════════════════════

#[rstest]
#[case("(xor rs1 rs2", "missing `)`")]
#[case("(xor rs1 rd)", "output-only")]
#[case("(xor rs1 rs9)", "unknown operand")]
#[case("(xor rs1 rs1)", "never uses input operand `rs2`")]
#[case("(rotl rs1 rs2)", "unknown operator")]
#[case("(xor:fast rs1 rs2)", "unknown guard")]
#[case("(xor rs1 rs2) rs1", "after template")]
fn rejects_bad_templates(#[case] template: &str, #[case] expected: &str) {
    let msg = rejection(|d| d.template = Some(template.to_owned()));
    assert!(msg.contains(expected), "{msg}");
}

#[test]
fn rejects_immediates_that_are_subtracted() {
    let mut cv = spec("xcorev");
    cv.instructions[0].template = Some("(shr (sub rs1 is3) rs2)".to_owned());
    let msg = rejection_of(vec![cv]);
    assert!(msg.contains("must be added"), "{msg}");
}

// ══════════════════════════════════════════════════════════
// 8. Rounding markers
// ══════════════════════════════════════════════════════════

fn corev_with(edit: impl FnOnce(&mut Vec<InstructionDef>)) -> String {
    let mut cv = spec("xcorev");
    edit(&mut cv.instructions);
    rejection_of(vec![cv])
}

#[test]
fn rejects_rounding_markers_naming_missing_bases() {
    let msg = corev_with(|defs| defs[3].marker = Some(Marker::Rounding("macx".to_owned())));
    assert!(msg.contains("`cv.macx` does not exist"), "{msg}");
}

#[test]
fn rejects_rounding_bases_without_templates() {
    let msg = corev_with(|defs| defs[2].template = None);
    assert!(msg.contains("`cv.macun` has no template"), "{msg}");
}

#[test]
fn rejects_rounding_variants_with_different_operands() {
    let msg = corev_with(|defs| defs[3].operands[1].width = 32);
    assert!(msg.contains("operands differ"), "{msg}");
}

#[test]
fn rejects_rounding_variants_with_their_own_template() {
    let msg = corev_with(|defs| defs[3].template = defs[2].template.clone());
    assert!(msg.contains("takes its base's template"), "{msg}");
}

// ══════════════════════════════════════════════════════════
// Loading behaviour
// ══════════════════════════════════════════════════════════

#[test]
fn rv64_definitions_are_skipped_on_rv32() {
    let registry = registry(&["xexample", "xexample64"]);
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.report().skipped, vec!["xexample64.subincacc".to_owned()]);
    assert!(registry.find("xexample64.subincacc").is_none());

    let rv64 = rv64_registry(&["xexample64"]);
    assert_eq!(rv64.xlen(), 64);
    assert!(rv64.find("xexample64.subincacc").is_some());
}

#[test]
fn unsupported_xlen_is_rejected() {
    let config = RegistryConfig {
        xlen: 128,
        ..RegistryConfig::default()
    };
    assert!(matches!(Registry::load([spec("xrv")], &config), Err(Error::MalformedSpec { .. })));
}

#[test]
fn auto_intrinsics_follow_the_naming_scheme() {
    let registry = full_registry();
    let addun = registry.find("cv.addun").unwrap();
    assert_eq!(registry.intrinsic(addun), Some("__builtin_riscv_cv_addun"));
    assert_eq!(registry.by_intrinsic("__builtin_riscv_cv_addun"), Some(addun));

    // Explicit aliases win over generated ones.
    let xorrol8 = registry.find("chacha.xorrol8").unwrap();
    assert_eq!(registry.intrinsic(xorrol8), Some("__builtin_riscv_xchacha_xorrol8"));
    assert_eq!(registry.by_intrinsic("__builtin_riscv_chacha_xorrol8"), None);

    let disabled = Registry::load(
        [spec("xcorev")],
        &RegistryConfig {
            auto_intrinsics: false,
            ..RegistryConfig::default()
        },
    )
    .unwrap();
    assert_eq!(disabled.intrinsic(disabled.find("cv.addun").unwrap()), None);
}

#[test]
fn signatures_use_power_of_two_storage_types() {
    let registry = full_registry();
    let macun = registry.signature(registry.find("cv.macun").unwrap()).unwrap();
    assert_eq!(
        macun.to_string(),
        "uint32_t __builtin_riscv_cv_macun(uint32_t, uint16_t, uint16_t, uint8_t)"
    );
    let max = registry.signature(registry.find("xopenasip.max").unwrap()).unwrap();
    assert_eq!(max.to_string(), "int32_t __builtin_riscv_xopenasip_max(int32_t, int32_t)");
}

#[test]
fn rounding_variants_are_linked() {
    let registry = registry(&["xcorev"]);
    let macun = registry.find("cv.macun").unwrap();
    let macurn = registry.find("cv.macurn").unwrap();
    assert_eq!(registry.rounding_variant(macun), Some(macurn));
    assert_eq!(registry.rounding_variant(macurn), None);
    assert_eq!(registry.def(macurn).rounds(), Some("macun"));
}

#[test]
fn major_opcodes_are_classified() {
    let registry = full_registry();
    let major = |name| registry.major_opcode(registry.find(name).unwrap());
    assert_eq!(major("xopenasip.max"), Some(MajorOpcode::Custom0));
    assert_eq!(major("xexample.subincacc"), Some(MajorOpcode::Custom1));
    assert_eq!(major("cv.addun"), Some(MajorOpcode::Custom2));
    assert_eq!(major("xrvc.nandi"), None);
    assert!(registry.report().non_custom.is_empty());
}

#[test]
fn non_custom_opcodes_load_with_a_warning() {
    let mut def = xor_def("op", 0);
    def.encoding.fixed[2].value = 0x33;
    let registry = Registry::load([ext("xt", vec![def])], &RegistryConfig::default()).unwrap();
    assert_eq!(registry.report().non_custom, vec!["xt.op".to_owned()]);
}

#[test]
fn load_report_counts() {
    let registry = full_registry();
    let report = registry.report();
    assert_eq!(report.extensions.len(), 7);
    assert_eq!(report.instructions, registry.len());
    assert_eq!(report.instructions, 13);
    assert_eq!(report.templates, 12);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.to_string().starts_with("13 instructions from 7 extension(s)"));
}

#[test]
fn registry_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Registry>();
}

#[test]
fn specs_load_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("xrv.json");
    std::fs::write(&path, spec("xrv").to_json().unwrap()).unwrap();

    let registry = Registry::load_paths(&[&path], &RegistryConfig::default()).unwrap();
    assert!(registry.find("xrv.nand").is_some());

    let missing = Registry::load_paths(&[dir.path().join("nope.json")], &RegistryConfig::default());
    assert!(matches!(missing, Err(Error::Io(_))));

    std::fs::write(&path, "{ not json").unwrap();
    let broken = Registry::load_paths(&[&path], &RegistryConfig::default()).unwrap_err();
    assert!(matches!(broken, Error::SpecFormat { ref origin, .. } if *origin == path.display().to_string()));
    let msg = broken.to_string();
    assert!(msg.starts_with("invalid extension spec "), "{msg}");
    assert!(msg.contains("xrv.json"), "{msg}");
    assert!(!broken.is_fatal());
}

#[test]
fn inline_specs_report_their_origin() {
    let err = ExtensionSpec::from_json(r#"{ "namespace": 7 }"#).unwrap_err();
    assert!(matches!(err, Error::SpecFormat { ref origin, .. } if origin == "<inline>"));
    assert!(!err.to_string().contains("configuration"), "{err}");
}
