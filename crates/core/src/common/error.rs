//! Error taxonomy for registry loading, matching, and the instruction codec.
//!
//! This module defines the single error type returned by every fallible operation in
//! the crate. It provides:
//! 1. **Fatal errors:** `MalformedSpec`, raised only while the registry loads.
//! 2. **Recoverable errors:** match, intrinsic, codec, and text-layer failures that
//!    affect one subtree or one instruction and never abort a whole run.
//! 3. **Ambient errors:** configuration and spec file parsing, and I/O while reading them.
//!
//! An expression that simply matches nothing is not an error; see
//! [`MatchOutcome::NoMatch`](crate::pattern::MatchOutcome::NoMatch).

use thiserror::Error;

use crate::codec::EncodedWord;
use crate::expr::NodeId;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the registry, matcher, binder, and codec.
#[derive(Debug, Error)]
pub enum Error {
    /// A registry entry is inconsistent: overlapping or out-of-range bit fields,
    /// unknown operands, bad templates, duplicate names.
    ///
    /// Raised at load time, before any matching or encoding may run.
    #[error("malformed extension spec `{instruction}`: {reason}")]
    MalformedSpec {
        /// Qualified name of the offending definition (or the namespace).
        instruction: String,
        /// Human readable description of the violated rule.
        reason: String,
    },

    /// Two or more different definitions matched the same subtree with equal
    /// specificity; no substitution is made.
    #[error("ambiguous match at {root}: {}", candidates.join(", "))]
    AmbiguousMatch {
        /// Root of the contested subtree.
        root: NodeId,
        /// Qualified names of the tied definitions.
        candidates: Vec<String>,
    },

    /// No definition declares the given intrinsic alias.
    #[error("unknown intrinsic `{0}`")]
    UnknownIntrinsic(String),

    /// The intrinsic exists but the call does not fit its signature.
    #[error("invalid call to `{alias}`: {reason}")]
    InvalidIntrinsicCall {
        /// Intrinsic alias that was called.
        alias: String,
        /// What was wrong with the arguments.
        reason: String,
    },

    /// An operand value does not fit the field(s) it is packed into.
    #[error("operand `{operand}` of `{instruction}` does not fit its encoding: {value}")]
    EncodingOverflow {
        /// Mnemonic being encoded.
        instruction: String,
        /// Operand name.
        operand: String,
        /// Offending value.
        value: i64,
    },

    /// An operand declared by the definition has no binding.
    #[error("missing operand `{operand}` for `{instruction}`")]
    MissingOperand {
        /// Mnemonic being encoded.
        instruction: String,
        /// Operand name.
        operand: String,
    },

    /// A binding names an operand the definition does not declare.
    #[error("`{instruction}` has no operand named `{operand}`")]
    UnknownOperand {
        /// Mnemonic being encoded.
        instruction: String,
        /// The unexpected binding name.
        operand: String,
    },

    /// The encoded word would decode as a different, more specific definition.
    #[error("encoding {word} of `{instruction}` is captured by `{shadowed_by}`")]
    ShadowedEncoding {
        /// Definition that was encoded.
        instruction: String,
        /// Definition that wins decode for the produced word.
        shadowed_by: String,
        /// The produced word.
        word: EncodedWord,
    },

    /// No definition's fixed-bit mask matches the word.
    #[error("no instruction matches {0}")]
    DecodeNoMatch(EncodedWord),

    /// The byte stream ends in the middle of an instruction.
    #[error("truncated instruction at offset {offset}: need {needed} bytes, {available} available")]
    Truncated {
        /// Byte offset of the partial instruction.
        offset: usize,
        /// Bytes required by the length prefix.
        needed: usize,
        /// Bytes remaining in the stream.
        available: usize,
    },

    /// Assembly text names an instruction the registry does not know.
    #[error("unknown mnemonic `{0}`")]
    UnknownMnemonic(String),

    /// Assembly text has an operand that cannot be parsed for its slot.
    #[error("invalid operand `{text}`: {reason}")]
    InvalidOperand {
        /// The operand text as written.
        text: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Expression or template text could not be parsed.
    #[error("parse error at offset {offset}: {message}")]
    Parse {
        /// Byte offset into the input.
        offset: usize,
        /// Description of the problem.
        message: String,
    },

    /// Configuration JSON could not be deserialized.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// An extension spec document is not valid spec JSON.
    #[error("invalid extension spec {origin}: {source}")]
    SpecFormat {
        /// File path, or `<inline>` for specs parsed from a string.
        origin: String,
        /// Deserializer error with line and column.
        source: serde_json::Error,
    },

    /// Reading a spec or configuration file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` for errors that must abort the run.
    ///
    /// Only a malformed registry is fatal; everything else concerns a single
    /// subtree or instruction and is reported to the caller.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::MalformedSpec { .. })
    }

    pub(crate) fn malformed(instruction: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedSpec {
            instruction: instruction.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn parse(offset: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            offset,
            message: message.into(),
        }
    }
}
