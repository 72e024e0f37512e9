//! Semantic-to-instruction compiler for custom RISC-V extensions.
//!
//! This crate maps arithmetic expression trees onto vendor instructions and
//! encodes them, with the following:
//! 1. **ISA:** Declarative extension specs validated into an immutable registry.
//! 2. **Expressions:** Typed expression trees, a C-like parser, and width/overflow analysis.
//! 3. **Matching:** Canonicalization, guarded template matching, specificity ranking,
//!    and rounding-variant detection.
//! 4. **Codec:** Encoding, mask-ordered decoding, and the assembly text layer.
//! 5. **Intrinsics:** Direct binding of intrinsic calls to definitions.
//! 6. **Batch:** Parallel matching of independent functions.
//!
//! # Example
//!
//! ```
//! use isax_core::{Bindings, ExtensionSpec, Registry};
//! use isax_core::config::RegistryConfig;
//!
//! let spec = ExtensionSpec::from_json(include_str!("../specs/xexample.json")).unwrap();
//! let registry = Registry::load([spec], &RegistryConfig::default()).unwrap();
//! let id = registry.find("xexample.subincacc").unwrap();
//!
//! let word = registry
//!     .encode(id, &Bindings::from([("rd", 21), ("rs1", 11), ("rs2", 27)]))
//!     .unwrap();
//! assert_eq!(word.to_le_bytes(), [0xab, 0xba, 0xb5, 0x51]);
//! ```

/// Parallel matching of independent functions.
pub mod batch;
/// Instruction words, bindings, encoder, and decoder.
pub mod codec;
/// Error type, bit helpers, and architectural constants.
pub mod common;
/// Run configuration (registry, matcher, disassembly sections).
pub mod config;
/// Expression trees, parser, and width analysis.
pub mod expr;
/// Intrinsic call binding.
pub mod intrinsic;
/// Definitions, extension specs, registry, and the assembly text layer.
pub mod isa;
/// Template matching.
pub mod pattern;

/// Bindings of operand names to values; see [`codec::Bindings`].
pub use crate::codec::{Bindings, EncodedWord};
/// Crate error and result alias.
pub use crate::common::{Error, Result};
/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Intrinsic binder.
pub use crate::intrinsic::IntrinsicBinder;
/// Registry types.
pub use crate::isa::{DefId, ExtensionSpec, InstructionDef, Registry};
/// Matcher entry points.
pub use crate::pattern::{MatchCandidate, MatchOutcome, Matcher};
