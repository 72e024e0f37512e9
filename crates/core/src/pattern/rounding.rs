//! Rounding-variant detection.
//!
//! `(sum + (1 << (k - 1))) >> k` is the round-to-nearest form of `sum >> k`.
//! When a definition carries a rounding marker, its base template is matched
//! against the shift with the rounding constant stripped from the sum; on
//! success the rounding definition is selected and the constant-add nodes are
//! reported as consumed. Any other constant leaves the sum untouched, so it
//! can never match the base template either.

use crate::expr::canon::{CanonId, CanonKind, CanonTree, OpKind, Sum};
use crate::pattern::candidate::MatchCandidate;
use crate::pattern::matcher::Matcher;

/// Rounding candidates rooted at `node`, one per rounding pair that matches.
pub(crate) fn detect(matcher: &Matcher<'_>, canon: &CanonTree<'_>, node: CanonId) -> Vec<MatchCandidate> {
    let CanonKind::Op(OpKind::Shr, args) = &canon.node(node).kind else {
        return Vec::new();
    };
    let &[value, amount] = args.as_slice() else {
        return Vec::new();
    };
    let Some(shift) = canon.constant(amount).filter(|k| (1..=127).contains(k)) else {
        return Vec::new();
    };
    let CanonKind::Sum(sum) = &canon.node(value).kind else {
        return Vec::new();
    };
    if sum.terms.is_empty() || sum.constant != 1i128 << (shift - 1) {
        return Vec::new();
    }

    let mut scratch = canon.clone();
    let stripped = match sum.terms.as_slice() {
        [only] if !only.negated => only.node,
        terms => scratch.push_synthetic(
            CanonKind::Sum(Sum {
                terms: terms.to_vec(),
                constant: 0,
                const_adds: Vec::new(),
            }),
            value,
        ),
    };
    let shr = scratch.push_synthetic(CanonKind::Op(OpKind::Shr, vec![stripped, amount]), node);

    matcher
        .registry()
        .rounding_pairs()
        .filter_map(|(base, variant)| {
            let mut candidate = matcher.try_def(&scratch, shr, base)?;
            candidate.instruction.def = variant;
            candidate.consumed.clone_from(&sum.const_adds);
            candidate.absorbed.extend_from_slice(&canon.node(value).absorbed);
            candidate.absorbed.sort_unstable();
            candidate.absorbed.dedup();
            candidate.score.absorbed = candidate.absorbed.len();
            Some(candidate)
        })
        .collect()
}
