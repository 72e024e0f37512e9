//! Configuration for the registry, matcher, and disassembler.
//!
//! This module defines the configuration structures used to parameterize a run. It provides:
//! 1. **Defaults:** Baseline values (XLEN, intrinsic prefix, sum-matching bound).
//! 2. **Structures:** One section per component: registry, matcher, and disassembly.
//! 3. **Loading:** JSON deserialization from a string or a file; every field is optional.
//!
//! Use `Config::default()` when no file is given.

use std::path::Path;

use serde::Deserialize;

use crate::common::Result;

/// Default configuration constants.
///
/// These values apply whenever a field is absent from the JSON document.
mod defaults {
    /// Target register width in bits.
    ///
    /// Definitions flagged `rv64` are skipped unless this is 64, and the `native`
    /// template guard compares against it.
    pub const XLEN: u32 = 32;

    /// Generate `__builtin_riscv_*` aliases for definitions without an explicit one.
    pub const AUTO_INTRINSICS: bool = true;

    /// Prefix of generated intrinsic aliases.
    pub const INTRINSIC_PREFIX: &str = "__builtin_riscv_";

    /// Detect the `+ (1 << (k - 1))` rounding idiom before a final shift.
    pub const ROUNDING_DETECTION: bool = true;

    /// Largest sum (in terms) the multiset matcher will attempt.
    ///
    /// Sum matching backtracks over term permutations, so this bounds the
    /// worst-case time per node.
    pub const MAX_SUM_TERMS: usize = 8;
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use isax_core::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.registry.xlen, 32);
/// assert!(config.matcher.rounding_detection);
/// ```
///
/// Deserializing from JSON; absent sections and fields fall back to defaults:
///
/// ```
/// use isax_core::config::Config;
///
/// let json = r#"{
///     "registry": { "xlen": 64 },
///     "disasm": { "abi_names": true }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.registry.xlen, 64);
/// assert!(config.registry.auto_intrinsics);
/// assert!(config.disasm.abi_names);
/// assert_eq!(config.matcher.max_sum_terms, 8);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Registry loading options
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Pattern matcher options
    #[serde(default)]
    pub matcher: MatcherConfig,
    /// Disassembly text options
    #[serde(default)]
    pub disasm: DisasmConfig,
}

impl Config {
    /// Parses a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the JSON is invalid.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the file cannot be read, or
    /// [`Error::Config`](crate::Error::Config) if its contents are invalid.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

/// Registry loading options.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Target XLEN (32 or 64)
    #[serde(default = "RegistryConfig::default_xlen")]
    pub xlen: u32,

    /// Generate intrinsic aliases for definitions that do not declare one
    #[serde(default = "RegistryConfig::default_auto_intrinsics")]
    pub auto_intrinsics: bool,

    /// Prefix used for generated aliases
    #[serde(default = "RegistryConfig::default_intrinsic_prefix")]
    pub intrinsic_prefix: String,
}

impl RegistryConfig {
    fn default_xlen() -> u32 {
        defaults::XLEN
    }

    fn default_auto_intrinsics() -> bool {
        defaults::AUTO_INTRINSICS
    }

    fn default_intrinsic_prefix() -> String {
        defaults::INTRINSIC_PREFIX.to_owned()
    }

    /// Default configuration targeting RV64.
    pub fn rv64() -> Self {
        Self {
            xlen: crate::common::constants::XLEN_64,
            ..Self::default()
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            xlen: Self::default_xlen(),
            auto_intrinsics: Self::default_auto_intrinsics(),
            intrinsic_prefix: Self::default_intrinsic_prefix(),
        }
    }
}

/// Pattern matcher options.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MatcherConfig {
    /// Detect rounding constants and prefer rounding variants
    #[serde(default = "MatcherConfig::default_rounding_detection")]
    pub rounding_detection: bool,

    /// Sums with more terms than this are never matched; at most 64
    #[serde(default = "MatcherConfig::default_max_sum_terms")]
    pub max_sum_terms: usize,
}

impl MatcherConfig {
    fn default_rounding_detection() -> bool {
        defaults::ROUNDING_DETECTION
    }

    fn default_max_sum_terms() -> usize {
        defaults::MAX_SUM_TERMS
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            rounding_detection: Self::default_rounding_detection(),
            max_sum_terms: Self::default_max_sum_terms(),
        }
    }
}

/// Disassembly rendering options.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DisasmConfig {
    /// Render registers with ABI names (`a0`) instead of `x10`
    #[serde(default)]
    pub abi_names: bool,

    /// Render immediates in hexadecimal
    #[serde(default)]
    pub hex_immediates: bool,
}
