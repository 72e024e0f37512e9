//! Common utilities and types used throughout the crate.
//!
//! This module provides the building blocks shared by every component. It includes:
//! 1. **Constants:** Instruction sizes, length prefixes, and register counts.
//! 2. **Bit Helpers:** Field masks, sign extension, and range checks.
//! 3. **Error Handling:** The crate-wide error enum and `Result` alias.

/// Bit-field helpers (masks, sign extension, range checks).
pub mod bits;

/// Architectural constants for instruction words.
pub mod constants;

/// Error taxonomy and result alias.
pub mod error;

pub use error::{Error, Result};
