//! Instruction Set Architecture (ISA) definitions for custom extensions.
//!
//! Contains the declarative model of vendor instructions and the registry that
//! validates and indexes it.
//!
//! # Components
//!
//! * `operand` / `encoding` / `instruction`: one definition, its operands and bit layout.
//! * `extension`: a namespace of definitions as loaded from JSON.
//! * `registry`: the validated, immutable catalog shared by every other component.
//! * `opcodes`: RISC-V major opcode classification.
//! * `asm` / `disasm`: the assembly text layer.

/// Application Binary Interface (ABI) register name mappings.
pub mod abi;

/// Assembly text parsing.
pub mod asm;

/// Instruction disassembler for listings and diagnostics.
pub mod disasm;

/// Fixed bits and operand field segments.
pub mod encoding;

/// Extension specs (JSON input).
pub mod extension;

/// Instruction definitions and intrinsic signatures.
pub mod instruction;

/// Major opcode map of the 32-bit encoding space.
pub mod opcodes;

/// Operand descriptors.
pub mod operand;

/// Validated extension registry.
pub mod registry;

pub use disasm::DisasmLine;
pub use encoding::{EncodingLayout, FieldSegment, FixedBits};
pub use extension::ExtensionSpec;
pub use instruction::{InstructionDef, IntrinsicSignature, Marker, Variant};
pub use opcodes::MajorOpcode;
pub use operand::{Direction, OperandDesc, OperandKind};
pub use registry::{DefId, LoadReport, Registry};
