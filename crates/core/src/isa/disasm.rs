//! Instruction disassembler.
//!
//! Renders decoded words as `<namespace>.<mnemonic> <operands>` with operands
//! in declared order, for listings, diagnostics, and tests.
//!
//! # Usage
//!
//! ```
//! use isax_core::config::{DisasmConfig, RegistryConfig};
//! use isax_core::{EncodedWord, ExtensionSpec, Registry};
//!
//! let specs = [
//!     include_str!("../../specs/xexample.json"),
//!     include_str!("../../specs/xrvc.json"),
//! ];
//! let specs = specs.map(|text| ExtensionSpec::from_json(text).unwrap());
//! let registry = Registry::load(specs, &RegistryConfig::default()).unwrap();
//!
//! let text = registry.disassemble(EncodedWord::word(0x51b5_baab)).unwrap();
//! assert_eq!(text, "xexample.subincacc x21, x11, x27");
//!
//! // 32-bit and 16-bit words in one little-endian stream.
//! let lines = registry.disassemble_bytes(&[0xab, 0xba, 0xb5, 0x51, 0x7c, 0x81], &DisasmConfig::default());
//! assert_eq!(lines[1].offset, 4);
//! assert_eq!(lines[1].result.as_deref().unwrap(), "xrvc.nandi x10, 31");
//! ```

use std::fmt;

use crate::codec::{Bindings, EncodedWord};
use crate::common::{Error, Result};
use crate::config::DisasmConfig;
use crate::isa::abi::abi_name;
use crate::isa::operand::OperandKind;
use crate::isa::registry::{DefId, Registry};

/// One instruction of a disassembled byte stream.
#[derive(Debug)]
pub struct DisasmLine {
    /// Byte offset in the stream.
    pub offset: usize,
    /// Raw bytes of the word (or of what was left of it).
    pub bytes: Vec<u8>,
    /// Text, or why the word could not be decoded.
    pub result: Result<String>,
}

impl fmt::Display for DisasmLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:6x}:  ", self.offset)?;
        let hex: Vec<String> = self.bytes.iter().map(|b| format!("{b:02x}")).collect();
        write!(f, "{:<12}", hex.join(" "))?;
        match &self.result {
            Ok(text) => write!(f, "{text}"),
            Err(e) => write!(f, "<invalid: {e}>"),
        }
    }
}

impl Registry {
    /// Renders bindings of `id` as assembly text.
    pub fn format_instruction(&self, id: DefId, bindings: &Bindings, config: &DisasmConfig) -> String {
        let def = self.def(id);
        let operands: Vec<String> = def
            .operands
            .iter()
            .map(|op| {
                let value = bindings.get(&op.name).unwrap_or_default();
                match op.kind {
                    OperandKind::Register => {
                        let abi = u32::try_from(value).ok().and_then(abi_name);
                        match abi {
                            Some(name) if config.abi_names => name.to_owned(),
                            _ => format!("x{value}"),
                        }
                    }
                    OperandKind::Immediate if config.hex_immediates && value < 0 => {
                        format!("-{:#x}", value.unsigned_abs())
                    }
                    OperandKind::Immediate if config.hex_immediates => format!("{value:#x}"),
                    OperandKind::Immediate => value.to_string(),
                }
            })
            .collect();
        if operands.is_empty() {
            self.name(id)
        } else {
            format!("{} {}", self.name(id), operands.join(", "))
        }
    }

    /// Disassembles one word with default formatting.
    ///
    /// # Errors
    ///
    /// [`Error::DecodeNoMatch`].
    pub fn disassemble(&self, word: EncodedWord) -> Result<String> {
        self.disassemble_with(word, &DisasmConfig::default())
    }

    /// Disassembles one word.
    ///
    /// # Errors
    ///
    /// [`Error::DecodeNoMatch`].
    pub fn disassemble_with(&self, word: EncodedWord, config: &DisasmConfig) -> Result<String> {
        let decoded = self.decode(word)?;
        Ok(self.format_instruction(decoded.def, &decoded.bindings, config))
    }

    /// Walks a little-endian byte stream.
    ///
    /// Undecodable words become error lines and the walk resumes after them;
    /// a truncated tail ends the walk.
    pub fn disassemble_bytes(&self, bytes: &[u8], config: &DisasmConfig) -> Vec<DisasmLine> {
        let mut lines = Vec::new();
        let mut offset = 0;
        while offset < bytes.len() {
            match EncodedWord::read_at(bytes, offset) {
                Ok(word) => {
                    let len = word.size().bytes();
                    lines.push(DisasmLine {
                        offset,
                        bytes: bytes[offset..offset + len].to_vec(),
                        result: self.disassemble_with(word, config),
                    });
                    offset += len;
                }
                Err(e @ Error::Truncated { .. }) => {
                    lines.push(DisasmLine {
                        offset,
                        bytes: bytes[offset..].to_vec(),
                        result: Err(e),
                    });
                    break;
                }
                Err(e) => {
                    lines.push(DisasmLine {
                        offset,
                        bytes: Vec::new(),
                        result: Err(e),
                    });
                    break;
                }
            }
        }
        lines
    }
}
