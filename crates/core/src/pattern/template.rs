//! Semantic templates.
//!
//! A template is an S-expression over the operands of its definition:
//!
//! ```text
//! (shr:unsigned (add:nowrap rd (mul:nowrap rs1 rs2)) is3)
//! ```
//!
//! Operators take optional guards after `:` (`nowrap`, `native`, `signed`,
//! `unsigned`, `w<=N`), which may also annotate placeholders. Templates are
//! compiled once at registry load into the same canonical shape the
//! canonicalizer produces for expressions: `add`/`sub`/`neg` become one sum with
//! a folded constant, and an added immediate placeholder absorbs the constant
//! of the matched sum.

use crate::common::bits::fits_signed;
use crate::expr::canon::OpKind;
use crate::expr::{IntType, WidthInfo};
use crate::isa::instruction::InstructionDef;
use crate::isa::operand::OperandKind;
use crate::pattern::table::{Shape, ShapeKey};

/// A condition on the annotated node a template node matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Guard {
    /// The node did not overflow its native type.
    NoWrap,
    /// The node is computed at the registry XLEN.
    Native,
    /// The node's value may be negative.
    Signed,
    /// The node's value is non-negative.
    Unsigned,
    /// The node's reachable width is at most N.
    MaxWidth(u32),
}

impl Guard {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "nowrap" => Some(Self::NoWrap),
            "native" => Some(Self::Native),
            "signed" => Some(Self::Signed),
            "unsigned" => Some(Self::Unsigned),
            _ => text
                .strip_prefix("w<=")
                .and_then(|n| n.parse().ok())
                .map(Self::MaxWidth),
        }
    }

    pub(crate) const fn holds(self, info: WidthInfo, ty: IntType, xlen: u32) -> bool {
        match self {
            Self::NoWrap => !info.overflow,
            Self::Native => ty.bits == xlen,
            Self::Signed => info.signed,
            Self::Unsigned => !info.signed,
            Self::MaxWidth(n) => info.width <= n,
        }
    }
}

pub(crate) type TemplateId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TemplateKind {
    /// Register placeholder, by operand index.
    Reg(usize),
    /// Immediate placeholder, by operand index.
    Imm(usize),
    Const(i128),
    Op(OpKind, Vec<TemplateId>),
    Sum {
        terms: Vec<(bool, TemplateId)>,
        constant: i128,
        /// Immediate operand receiving the matched constant.
        absorber: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TemplateNode {
    pub kind: TemplateKind,
    pub guards: Vec<Guard>,
}

/// A compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Template {
    nodes: Vec<TemplateNode>,
    root: TemplateId,
}

impl Template {
    /// Parses and compiles `text` against the operands of `def`.
    ///
    /// Returns a description of the first problem found.
    pub(crate) fn compile(text: &str, def: &InstructionDef) -> Result<Self, String> {
        let raw = Raw::parse(text)?;
        let mut compiler = Compiler {
            def,
            nodes: Vec::new(),
            used: vec![false; def.operands.len()],
        };
        let root = compiler.node(&raw)?;
        if let Some(op) = def
            .operands
            .iter()
            .zip(&compiler.used)
            .find(|(op, used)| op.is_input() && !**used)
            .map(|(op, _)| op)
        {
            return Err(format!("template never uses input operand `{}`", op.name));
        }
        let template = Self {
            nodes: compiler.nodes,
            root,
        };
        if template.root_shape().is_none() {
            return Err("template root must be an operator".to_owned());
        }
        Ok(template)
    }

    pub(crate) const fn root(&self) -> TemplateId {
        self.root
    }

    pub(crate) fn node(&self, id: TemplateId) -> &TemplateNode {
        &self.nodes[id]
    }

    /// Match-table key of the root.
    pub(crate) fn root_shape(&self) -> Option<ShapeKey> {
        match &self.nodes[self.root].kind {
            TemplateKind::Op(op, args) => Some(ShapeKey::new(Shape::Op(*op), args.len())),
            TemplateKind::Sum { terms, .. } => Some(ShapeKey::new(Shape::Sum, terms.len())),
            TemplateKind::Reg(_) | TemplateKind::Imm(_) | TemplateKind::Const(_) => None,
        }
    }
}

/// Parsed S-expression before compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Raw {
    Atom(String, Vec<Guard>),
    List(String, Vec<Guard>, Vec<Raw>),
}

impl Raw {
    fn parse(text: &str) -> Result<Self, String> {
        let spaced = text.replace('(', " ( ").replace(')', " ) ");
        let mut tokens = spaced.split_whitespace().peekable();
        let raw = Self::parse_one(&mut tokens)?;
        if let Some(extra) = tokens.next() {
            return Err(format!("unexpected `{extra}` after template"));
        }
        Ok(raw)
    }

    fn parse_one<'a>(
        tokens: &mut std::iter::Peekable<impl Iterator<Item = &'a str>>,
    ) -> Result<Self, String> {
        match tokens.next() {
            None => Err("unexpected end of template".to_owned()),
            Some(")") => Err("unbalanced `)`".to_owned()),
            Some("(") => {
                let head = tokens
                    .next()
                    .filter(|t| *t != "(" && *t != ")")
                    .ok_or("expected an operator after `(`")?;
                let (name, guards) = split_guards(head)?;
                let mut args = Vec::new();
                loop {
                    match tokens.peek() {
                        Some(&")") => {
                            let _ = tokens.next();
                            break;
                        }
                        None => return Err("missing `)`".to_owned()),
                        Some(_) => args.push(Self::parse_one(tokens)?),
                    }
                }
                Ok(Self::List(name, guards, args))
            }
            Some(atom) => {
                let (name, guards) = split_guards(atom)?;
                Ok(Self::Atom(name, guards))
            }
        }
    }
}

fn split_guards(token: &str) -> Result<(String, Vec<Guard>), String> {
    let mut parts = token.split(':');
    let name = parts.next().unwrap_or_default().to_owned();
    let guards = parts
        .map(|g| Guard::parse(g).ok_or_else(|| format!("unknown guard `{g}`")))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((name, guards))
}

fn parse_literal(text: &str) -> Option<i128> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = match digits.strip_prefix("0x") {
        Some(hex) => i128::from_str_radix(hex, 16).ok()?,
        None if digits.bytes().all(|b| b.is_ascii_digit()) && !digits.is_empty() => {
            digits.parse().ok()?
        }
        None => return None,
    };
    let value = if negative { -value } else { value };
    fits_signed(value, 65).then_some(value)
}

struct Compiler<'d> {
    def: &'d InstructionDef,
    nodes: Vec<TemplateNode>,
    used: Vec<bool>,
}

impl Compiler<'_> {
    fn push(&mut self, kind: TemplateKind, guards: Vec<Guard>) -> TemplateId {
        self.nodes.push(TemplateNode { kind, guards });
        self.nodes.len() - 1
    }

    fn node(&mut self, raw: &Raw) -> Result<TemplateId, String> {
        match raw {
            Raw::Atom(name, guards) => {
                if let Some(value) = parse_literal(name) {
                    return Ok(self.push(TemplateKind::Const(value), guards.clone()));
                }
                let kind = self.placeholder(name)?;
                Ok(self.push(kind, guards.clone()))
            }
            Raw::List(head, guards, args) => self.list(head, guards, args),
        }
    }

    fn placeholder(&mut self, name: &str) -> Result<TemplateKind, String> {
        let index = self
            .def
            .operand_index(name)
            .ok_or_else(|| format!("template references unknown operand `{name}`"))?;
        let op = &self.def.operands[index];
        if !op.is_input() {
            return Err(format!("template reads output-only operand `{name}`"));
        }
        self.used[index] = true;
        Ok(match op.kind {
            OperandKind::Register => TemplateKind::Reg(index),
            OperandKind::Immediate => TemplateKind::Imm(index),
        })
    }

    fn list(&mut self, head: &str, guards: &[Guard], args: &[Raw]) -> Result<TemplateId, String> {
        let arity = |n: usize| {
            if args.len() == n {
                Ok(())
            } else {
                Err(format!("`{head}` takes {n} operand(s), got {}", args.len()))
            }
        };
        let op = match head {
            "add" | "sub" | "neg" => {
                match head {
                    "add" if args.len() < 2 => return Err("`add` takes at least 2 operands".to_owned()),
                    "sub" => arity(2)?,
                    "neg" => arity(1)?,
                    _ => {}
                }
                return self.sum(head, guards, args);
            }
            "mul" => OpKind::Mul,
            "and" => OpKind::And,
            "or" => OpKind::Or,
            "xor" => OpKind::Xor,
            "shl" => OpKind::Shl,
            "shr" => OpKind::Shr,
            "max" => OpKind::Max,
            "min" => OpKind::Min,
            "lt" => OpKind::Lt,
            "le" => OpKind::Le,
            "gt" => OpKind::Gt,
            "ge" => OpKind::Ge,
            "eq" => OpKind::Eq,
            "ne" => OpKind::Ne,
            "not" => OpKind::Not,
            _ => match head.strip_prefix("trunc").and_then(|n| n.parse::<u32>().ok()) {
                Some(bits) if (1..=64).contains(&bits) => OpKind::Trunc(bits),
                _ => return Err(format!("unknown operator `{head}`")),
            },
        };
        arity(if matches!(op, OpKind::Not | OpKind::Trunc(_)) { 1 } else { 2 })?;
        let children = args
            .iter()
            .map(|a| self.node(a))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.push(TemplateKind::Op(op, children), guards.to_vec()))
    }

    fn sum(&mut self, head: &str, guards: &[Guard], args: &[Raw]) -> Result<TemplateId, String> {
        let mut terms = Vec::new();
        let mut constant = 0i128;
        let mut absorber = None;
        for (i, arg) in args.iter().enumerate() {
            let negated = (head == "sub" && i == 1) || head == "neg";
            self.collect(arg, negated, &mut terms, &mut constant, &mut absorber)?;
        }
        if terms.is_empty() {
            return Err("a sum needs at least one non-constant term".to_owned());
        }
        if let ([(false, only)], 0, None) = (terms.as_slice(), constant, absorber) {
            let only = *only;
            self.nodes[only].guards.extend_from_slice(guards);
            return Ok(only);
        }
        Ok(self.push(
            TemplateKind::Sum {
                terms,
                constant,
                absorber,
            },
            guards.to_vec(),
        ))
    }

    fn collect(
        &mut self,
        raw: &Raw,
        negated: bool,
        terms: &mut Vec<(bool, TemplateId)>,
        constant: &mut i128,
        absorber: &mut Option<usize>,
    ) -> Result<(), String> {
        match raw {
            Raw::List(head, guards, args)
                if guards.is_empty() && matches!(head.as_str(), "add" | "sub" | "neg") =>
            {
                for (i, arg) in args.iter().enumerate() {
                    let flip = (head == "sub" && i == 1) || head == "neg";
                    self.collect(arg, negated ^ flip, terms, constant, absorber)?;
                }
                Ok(())
            }
            Raw::Atom(name, guards) if guards.is_empty() && parse_literal(name).is_some() => {
                let value = parse_literal(name).unwrap_or_default();
                *constant += if negated { -value } else { value };
                Ok(())
            }
            Raw::Atom(name, _) if self.def.operand(name).is_some_and(|op| !op.is_register()) => {
                let index = match self.placeholder(name)? {
                    TemplateKind::Imm(index) => index,
                    _ => return Err(format!("`{name}` is not an immediate")),
                };
                if negated {
                    return Err(format!("immediate `{name}` must be added, not subtracted"));
                }
                if absorber.replace(index).is_some() {
                    return Err("a sum may absorb its constant into one immediate only".to_owned());
                }
                Ok(())
            }
            _ => {
                let id = self.node(raw)?;
                terms.push((negated, id));
                Ok(())
            }
        }
    }
}
