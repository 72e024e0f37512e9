//! Expression front end.
//!
//! This module provides the input side of the matcher:
//! 1. **Trees:** An arena of typed expression nodes and a builder.
//! 2. **Parsing:** A C-like expression parser for tests, tools, and the CLI.
//! 3. **Width Analysis:** Minimal lossless width, signedness, and overflow per node.
//! 4. **Canonical Form:** Algebraic normalization used before structural matching.

/// Algebraic normalization (sums, folding, cast and mask removal).
pub(crate) mod canon;

/// C-like expression parser.
pub mod parse;

/// Arena tree, node ids, operators, and builder.
pub mod tree;

/// Native integer types.
pub mod types;

/// Width/range analyzer.
pub mod width;

pub use parse::{VarTypes, parse_expr};
pub use tree::{BinaryOp, ExprBuilder, ExprKind, ExprNode, ExprTree, NodeId, UnaryOp};
pub use types::IntType;
pub use width::{AnnotatedTree, WidthAnalyzer, WidthInfo};
