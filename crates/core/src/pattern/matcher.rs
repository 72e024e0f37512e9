//! Template matching over canonical trees.
//!
//! For each canonical node the matcher looks up the definitions whose template
//! root has the same `(operator, arity)` shape and aligns the template against
//! the node. Alignment produces every consistent binding state; a state is
//! rejected as soon as a guard fails, a placeholder is rebound to a different
//! value, or an immediate does not fit. Surviving candidates are ranked by
//! [`Specificity`].

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::common::constants::SUM_TERMS_LIMIT;
use crate::common::{Error, Result};
use crate::config::MatcherConfig;
use crate::expr::canon::{CanonId, CanonKind, CanonTree, Term};
use crate::expr::{AnnotatedTree, IntType, NodeId};
use crate::isa::instruction::InstructionDef;
use crate::isa::registry::{DefId, Registry};
use crate::pattern::candidate::{Bound, BoundInstruction, MatchCandidate, MatchOutcome, Specificity};
use crate::pattern::rounding;
use crate::pattern::table::{Rule, Shape, ShapeKey, rule};
use crate::pattern::template::{Guard, Template, TemplateId, TemplateKind};

/// Matches expression trees against a registry.
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'r> {
    registry: &'r Registry,
    config: MatcherConfig,
}

/// A subtree left unmatched because different definitions tied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ambiguity {
    /// Root of the contested subtree.
    pub root: NodeId,
    /// Qualified names of the tied definitions.
    pub candidates: Vec<String>,
}

impl From<Ambiguity> for Error {
    fn from(a: Ambiguity) -> Self {
        Self::AmbiguousMatch {
            root: a.root,
            candidates: a.candidates,
        }
    }
}

/// Result of tiling a tree with instructions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cover {
    /// Disjoint matches, outermost first.
    pub matches: Vec<MatchCandidate>,
    /// Subtrees skipped because of ties.
    pub ambiguous: Vec<Ambiguity>,
}

impl<'r> Matcher<'r> {
    /// Creates a matcher over a loaded registry.
    ///
    /// `max_sum_terms` is capped at [`SUM_TERMS_LIMIT`].
    pub const fn new(registry: &'r Registry, mut config: MatcherConfig) -> Self {
        if config.max_sum_terms > SUM_TERMS_LIMIT {
            config.max_sum_terms = SUM_TERMS_LIMIT;
        }
        Self { registry, config }
    }

    /// Options in effect.
    pub const fn config(&self) -> MatcherConfig {
        self.config
    }

    /// The registry being matched against.
    pub const fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Candidates rooted at `id`, best first, at most one per definition.
    pub fn match_at(&self, tree: &AnnotatedTree, id: NodeId) -> Vec<MatchCandidate> {
        let canon = CanonTree::build_at(tree, id);
        self.candidates(&canon, canon.root())
    }

    /// The single best candidate over every subtree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AmbiguousMatch`] when the best score is shared by
    /// different definitions at the same root.
    pub fn select(&self, tree: &AnnotatedTree) -> Result<MatchOutcome> {
        let canon = CanonTree::build(tree);
        let mut best: Option<(MatchCandidate, Vec<String>)> = None;
        for node in canon.reachable() {
            let found = self.candidates(&canon, node);
            let Some(top) = found.first() else {
                continue;
            };
            if best.as_ref().is_some_and(|(b, _)| b.score >= top.score) {
                continue;
            }
            best = Some((top.clone(), self.tied(&found)));
        }

        match best {
            None => {
                debug!(root = %tree.root(), "no match");
                Ok(MatchOutcome::NoMatch)
            }
            Some((candidate, tied)) if tied.len() > 1 => {
                debug!(root = %candidate.root, candidates = ?tied, "ambiguous match");
                Err(Ambiguity {
                    root: candidate.root,
                    candidates: tied,
                }
                .into())
            }
            Some((candidate, _)) => {
                debug!(
                    instruction = %self.registry.name(candidate.def()),
                    root = %candidate.root,
                    score = ?candidate.score,
                    "selected"
                );
                Ok(MatchOutcome::Matched(Box::new(candidate)))
            }
        }
    }

    /// Greedy top-down tiling.
    ///
    /// A matched node is replaced by its instruction and tiling continues
    /// inside its register operands; an unmatched or ambiguous node is skipped
    /// and tiling continues inside its children.
    pub fn cover(&self, tree: &AnnotatedTree) -> Cover {
        let canon = CanonTree::build(tree);
        let by_source = canon.by_source();
        let mut cover = Cover::default();
        let mut stack = vec![canon.root()];
        while let Some(node) = stack.pop() {
            let found = self.candidates(&canon, node);
            let Some(top) = found.first() else {
                stack.extend(canon.children(node).into_iter().rev());
                continue;
            };
            let tied = self.tied(&found);
            if tied.len() > 1 {
                debug!(root = %top.root, candidates = ?tied, "ambiguous subtree left unmatched");
                cover.ambiguous.push(Ambiguity {
                    root: top.root,
                    candidates: tied,
                });
                stack.extend(canon.children(node).into_iter().rev());
                continue;
            }
            let operands: Vec<CanonId> = top
                .instruction
                .operands
                .values()
                .filter_map(|b| match b {
                    Bound::Value(src) => by_source.get(src).copied(),
                    Bound::Imm(_) => None,
                })
                .collect();
            stack.extend(operands.into_iter().rev());
            cover.matches.push(top.clone());
        }
        cover
    }

    /// Qualified names of the definitions sharing the top score.
    fn tied(&self, found: &[MatchCandidate]) -> Vec<String> {
        let Some(top) = found.first() else {
            return Vec::new();
        };
        found
            .iter()
            .take_while(|c| c.score == top.score)
            .map(|c| self.registry.name(c.def()))
            .collect()
    }

    pub(crate) fn candidates(&self, canon: &CanonTree<'_>, node: CanonId) -> Vec<MatchCandidate> {
        let mut found = Vec::new();
        if let Some(key) = shape_of(canon, node) {
            for &def in self.registry.table().candidates(key) {
                found.extend(self.try_def(canon, node, def));
            }
        }
        if self.config.rounding_detection {
            found.extend(rounding::detect(self, canon, node));
        }
        found.sort_by(|a, b| b.score.cmp(&a.score));
        found
    }

    /// Aligns the template of `def` at `node`; the first consistent binding wins.
    pub(crate) fn try_def(&self, canon: &CanonTree<'_>, node: CanonId, def: DefId) -> Option<MatchCandidate> {
        let template = self.registry.template(def)?;
        let definition = self.registry.def(def);
        let attempt = Attempt {
            canon,
            template,
            def: definition,
            xlen: self.registry.xlen(),
            max_terms: self.config.max_sum_terms,
        };
        let start = State {
            slots: vec![None; definition.operands.len()],
            absorbed: Vec::new(),
            guards: 0,
        };
        let candidate = attempt
            .node(template.root(), node, start)
            .into_iter()
            .find_map(|state| attempt.candidate(def, node, state));
        trace!(
            instruction = %self.registry.name(def),
            node = %canon.node(node).source,
            matched = candidate.is_some(),
            "template attempt"
        );
        candidate
    }
}

fn shape_of(canon: &CanonTree<'_>, node: CanonId) -> Option<ShapeKey> {
    match &canon.node(node).kind {
        CanonKind::Op(op, args) => Some(ShapeKey::new(Shape::Op(*op), args.len())),
        CanonKind::Sum(sum) => Some(ShapeKey::new(Shape::Sum, sum.terms.len())),
        CanonKind::Var(_) | CanonKind::Const(_) => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Node(CanonId),
    Imm(i128),
}

#[derive(Debug, Clone)]
struct State {
    slots: Vec<Option<Slot>>,
    absorbed: Vec<NodeId>,
    guards: usize,
}

struct Attempt<'a, 't> {
    canon: &'a CanonTree<'t>,
    template: &'a Template,
    def: &'a InstructionDef,
    xlen: u32,
    max_terms: usize,
}

impl Attempt<'_, '_> {
    fn node(&self, t: TemplateId, c: CanonId, state: State) -> Vec<State> {
        let tnode = self.template.node(t);
        let Some(mut state) = self.guards(&tnode.guards, c, state) else {
            return Vec::new();
        };
        match &tnode.kind {
            TemplateKind::Reg(i) => self.bind_reg(*i, c, state).into_iter().collect(),
            TemplateKind::Imm(i) => match self.canon.constant(c) {
                Some(v) => self.bind_imm(*i, v, Some(c), state).into_iter().collect(),
                None => Vec::new(),
            },
            TemplateKind::Const(v) => {
                if self.canon.constant(c) != Some(*v) {
                    return Vec::new();
                }
                state.absorbed.extend_from_slice(&self.canon.node(c).absorbed);
                vec![state]
            }
            TemplateKind::Op(op, targs) => {
                let CanonKind::Op(sop, sargs) = &self.canon.node(c).kind else {
                    return Vec::new();
                };
                if sop != op || sargs.len() != targs.len() {
                    return Vec::new();
                }
                state.absorbed.extend_from_slice(&self.canon.node(c).absorbed);
                match rule(ShapeKey::new(Shape::Op(*op), targs.len())) {
                    Some(Rule::Ordered) => self.sequence(targs, sargs, state),
                    Some(Rule::Commutative) => {
                        let swapped: Vec<CanonId> = sargs.iter().rev().copied().collect();
                        let mut out = self.sequence(targs, sargs, state.clone());
                        out.extend(self.sequence(targs, &swapped, state));
                        out
                    }
                    Some(Rule::Sum) | None => Vec::new(),
                }
            }
            TemplateKind::Sum {
                terms,
                constant,
                absorber,
            } => {
                let CanonKind::Sum(sum) = &self.canon.node(c).kind else {
                    return Vec::new();
                };
                if sum.terms.len() != terms.len() || sum.terms.len() > self.max_terms {
                    return Vec::new();
                }
                let state = match absorber {
                    None if sum.constant == *constant => Some(state),
                    None => None,
                    Some(i) => match sum.constant - constant {
                        0 => None,
                        rest => self.bind_imm(*i, rest, None, state),
                    },
                };
                let Some(mut state) = state else {
                    return Vec::new();
                };
                state.absorbed.extend_from_slice(&self.canon.node(c).absorbed);
                self.terms(terms, &sum.terms, 0, state)
            }
        }
    }

    fn sequence(&self, targs: &[TemplateId], sargs: &[CanonId], state: State) -> Vec<State> {
        targs
            .iter()
            .zip(sargs)
            .fold(vec![state], |states, (&t, &c)| {
                states.into_iter().flat_map(|s| self.node(t, c, s)).collect()
            })
    }

    /// Multiset alignment of signed terms; `used` marks taken subject terms.
    fn terms(&self, tterms: &[(bool, TemplateId)], sterms: &[Term], used: u64, state: State) -> Vec<State> {
        let Some(((negated, t), rest)) = tterms.split_first() else {
            return vec![state];
        };
        let mut out = Vec::new();
        for (j, term) in sterms.iter().enumerate() {
            if used & (1 << j) != 0 || term.negated != *negated {
                continue;
            }
            for next in self.node(*t, term.node, state.clone()) {
                out.extend(self.terms(rest, sterms, used | (1 << j), next));
            }
        }
        out
    }

    fn guards(&self, guards: &[Guard], c: CanonId, mut state: State) -> Option<State> {
        let info = self.canon.info(c);
        let ty = self.canon.ty(c);
        if guards.iter().all(|g| g.holds(info, ty, self.xlen)) {
            state.guards += guards.len();
            Some(state)
        } else {
            None
        }
    }

    fn bind_reg(&self, i: usize, c: CanonId, mut state: State) -> Option<State> {
        let op = &self.def.operands[i];
        let info = self.canon.info(c);
        let fits = if op.width >= self.xlen {
            info.width <= op.width
        } else {
            IntType::new(op.width, op.signed).holds(info.width, info.signed)
        };
        if !fits {
            return None;
        }
        match state.slots[i] {
            Some(Slot::Node(prev)) => self.canon.same(prev, c).then_some(state),
            Some(Slot::Imm(_)) => None,
            None => {
                state.slots[i] = Some(Slot::Node(c));
                Some(state)
            }
        }
    }

    fn bind_imm(&self, i: usize, value: i128, from: Option<CanonId>, mut state: State) -> Option<State> {
        let (lo, hi) = self.def.operands[i].immediate_range();
        if value < i128::from(lo) || value > i128::from(hi) {
            return None;
        }
        match state.slots[i] {
            Some(Slot::Imm(prev)) if prev != value => return None,
            Some(Slot::Node(_)) => return None,
            _ => state.slots[i] = Some(Slot::Imm(value)),
        }
        if let Some(c) = from {
            state.absorbed.extend_from_slice(&self.canon.node(c).absorbed);
        }
        Some(state)
    }

    fn candidate(&self, def: DefId, root: CanonId, state: State) -> Option<MatchCandidate> {
        let mut operands = BTreeMap::new();
        for (op, slot) in self.def.operands.iter().zip(&state.slots) {
            let bound = match *slot {
                Some(Slot::Node(c)) if self.canon.node(c).synthetic => return None,
                Some(Slot::Node(c)) => Bound::Value(self.canon.node(c).source),
                Some(Slot::Imm(v)) => Bound::Imm(i64::try_from(v).ok()?),
                None => continue,
            };
            let _ = operands.insert(op.name.clone(), bound);
        }
        let mut absorbed = state.absorbed;
        absorbed.sort_unstable();
        absorbed.dedup();
        let source = self.canon.node(root).source;
        Some(MatchCandidate {
            score: Specificity {
                covered: self.canon.source_tree().tree().subtree_size(source),
                absorbed: absorbed.len(),
                guards: state.guards,
            },
            instruction: BoundInstruction { def, operands },
            root: source,
            absorbed,
            consumed: Vec::new(),
        })
    }
}
