//! Semantic pattern matching.
//!
//! This module turns annotated expression trees into instruction candidates:
//! 1. **Templates:** S-expression semantics compiled per definition at load.
//! 2. **Match Table:** `(operator, arity)` dispatch to ordered, commutative, or
//!    sum alignment.
//! 3. **Matcher:** Guarded structural matching with specificity ranking,
//!    single-best selection, and greedy tiling.
//! 4. **Rounding:** Detection of the `+ (1 << (k - 1))` idiom before a shift.

/// Match results, bound instructions, and register assignment.
pub mod candidate;

/// Matcher and tiling.
pub mod matcher;

pub(crate) mod rounding;

pub(crate) mod table;

pub(crate) mod template;

pub use candidate::{
    Bound, BoundInstruction, FixedRegisters, MatchCandidate, MatchOutcome, RegisterAssigner,
    Specificity,
};
pub use matcher::{Ambiguity, Cover, Matcher};
