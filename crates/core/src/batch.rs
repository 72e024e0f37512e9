//! Batch matching across independent functions.
//!
//! Functions share nothing but the registry, so they are matched on the rayon
//! pool; each function's trees are still processed in order on one worker.

use rayon::prelude::*;
use tracing::debug;

use crate::expr::{ExprTree, WidthAnalyzer};
use crate::pattern::{Cover, Matcher};

/// Expression trees of one function.
#[derive(Debug, Clone)]
pub struct FunctionExprs {
    /// Function name, for reports.
    pub name: String,
    /// Trees in source order.
    pub trees: Vec<ExprTree>,
}

/// Tiling of every tree of one function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionReport {
    /// Function name.
    pub name: String,
    /// One cover per input tree, same order.
    pub covers: Vec<Cover>,
}

impl FunctionReport {
    /// Matched instructions over all trees.
    pub fn matched(&self) -> usize {
        self.covers.iter().map(|c| c.matches.len()).sum()
    }
}

/// Analyzes and covers every tree of every function; output order follows input.
pub fn match_functions(matcher: &Matcher<'_>, functions: Vec<FunctionExprs>) -> Vec<FunctionReport> {
    functions
        .into_par_iter()
        .map(|function| {
            let covers: Vec<Cover> = function
                .trees
                .into_iter()
                .map(|tree| matcher.cover(&WidthAnalyzer::analyze(tree)))
                .collect();
            let report = FunctionReport {
                name: function.name,
                covers,
            };
            debug!(function = %report.name, matched = report.matched(), "function covered");
            report
        })
        .collect()
}
