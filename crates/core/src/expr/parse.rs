//! A small C expression parser.
//!
//! Accepts the integer subset the matcher understands: declared variables,
//! decimal/hex literals with `u`/`l` suffixes, casts to fixed-width or classic C
//! integer types, unary `- ~ +`, binary `* + - << >> < <= > >= == != & ^ |`
//! and the conditional operator. Precedence and associativity follow C.

use std::collections::BTreeMap;

use crate::common::bits::{fits_signed, fits_unsigned};
use crate::common::{Error, Result};
use crate::expr::tree::{BinaryOp, ExprBuilder, ExprTree, NodeId};
use crate::expr::types::IntType;

/// Declared variable types, by name.
pub type VarTypes = BTreeMap<String, IntType>;

/// Parses `text` into a tree, typing variables from `vars`.
///
/// # Errors
///
/// Returns [`Error::Parse`] on syntax errors, undeclared variables, unsupported
/// operators, or literals that do not fit 64 bits.
///
/// ```
/// use isax_core::expr::{parse_expr, IntType, VarTypes};
///
/// let vars = VarTypes::from([("x".into(), IntType::U32), ("y".into(), IntType::U32)]);
/// let tree = parse_expr("((uint64_t)x + y) >> 1", &vars).unwrap();
/// assert_eq!(tree.node(tree.root()).ty, IntType::U64);
/// ```
pub fn parse_expr(text: &str, vars: &VarTypes) -> Result<ExprTree> {
    let tokens = lex(text)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        vars,
        builder: ExprBuilder::new(),
        end: text.len(),
    };
    let root = parser.expr(0)?;
    if let Some(tok) = parser.tokens.get(parser.pos) {
        return Err(Error::parse(tok.offset, "unexpected trailing input"));
    }
    parser.builder.finish(root)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Ident(String),
    Int { value: i128, hex: bool, unsigned: bool, long: bool },
    Punct(&'static str),
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    offset: usize,
}

const PUNCT: [&str; 19] = [
    "<<", ">>", "<=", ">=", "==", "!=", "+", "-", "*", "&", "|", "^", "~", "(", ")", "?", ":", "<",
    ">",
];

fn lex(text: &str) -> Result<Vec<Token>> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        if c.is_ascii_alphabetic() || c == b'_' {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            out.push(Token {
                tok: Tok::Ident(text[start..i].to_owned()),
                offset: start,
            });
            continue;
        }
        if c.is_ascii_digit() {
            let hex = text[i..].starts_with("0x") || text[i..].starts_with("0X");
            let digits_start = if hex { i + 2 } else { i };
            i = digits_start;
            while i < bytes.len() && bytes[i].is_ascii_hexdigit() && (hex || bytes[i].is_ascii_digit()) {
                i += 1;
            }
            let radix = if hex { 16 } else { 10 };
            let value = i128::from_str_radix(&text[digits_start..i], radix)
                .map_err(|_| Error::parse(start, "malformed integer literal"))?;
            let (mut unsigned, mut long) = (false, false);
            while i < bytes.len() && matches!(bytes[i], b'u' | b'U' | b'l' | b'L') {
                if bytes[i].eq_ignore_ascii_case(&b'u') {
                    unsigned = true;
                } else {
                    long = true;
                }
                i += 1;
            }
            out.push(Token {
                tok: Tok::Int { value, hex, unsigned, long },
                offset: start,
            });
            continue;
        }
        match PUNCT.iter().find(|p| text[i..].starts_with(**p)) {
            Some(p) => {
                i += p.len();
                out.push(Token {
                    tok: Tok::Punct(p),
                    offset: start,
                });
            }
            None => {
                let what = text[i..].chars().next().unwrap_or('?');
                return Err(Error::parse(start, format!("unsupported character `{what}`")));
            }
        }
    }
    Ok(out)
}

fn binary_op(p: &str) -> Option<(BinaryOp, u8)> {
    let op = match p {
        "|" => (BinaryOp::Or, 3),
        "^" => (BinaryOp::Xor, 4),
        "&" => (BinaryOp::And, 5),
        "==" => (BinaryOp::Eq, 6),
        "!=" => (BinaryOp::Ne, 6),
        "<" => (BinaryOp::Lt, 7),
        "<=" => (BinaryOp::Le, 7),
        ">" => (BinaryOp::Gt, 7),
        ">=" => (BinaryOp::Ge, 7),
        "<<" => (BinaryOp::Shl, 8),
        ">>" => (BinaryOp::Shr, 8),
        "+" => (BinaryOp::Add, 9),
        "-" => (BinaryOp::Sub, 9),
        "*" => (BinaryOp::Mul, 10),
        _ => return None,
    };
    Some(op)
}

const TERNARY_PREC: u8 = 1;

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    vars: &'a VarTypes,
    builder: ExprBuilder,
    end: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|t| &t.tok)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |t| t.offset)
    }

    fn expect(&mut self, punct: &str) -> Result<()> {
        if matches!(self.peek(), Some(Tok::Punct(p)) if *p == punct) {
            self.pos += 1;
            Ok(())
        } else {
            Err(Error::parse(self.offset(), format!("expected `{punct}`")))
        }
    }

    fn expr(&mut self, min_prec: u8) -> Result<NodeId> {
        let mut lhs = self.unary()?;
        loop {
            let Some(Tok::Punct(p)) = self.peek() else {
                break;
            };
            let p = *p;
            if p == "?" {
                if min_prec > TERNARY_PREC {
                    break;
                }
                self.pos += 1;
                let then = self.expr(0)?;
                self.expect(":")?;
                let otherwise = self.expr(TERNARY_PREC)?;
                lhs = self.builder.select(lhs, then, otherwise);
                continue;
            }
            let Some((op, prec)) = binary_op(p) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let rhs = self.expr(prec + 1)?;
            lhs = self.builder.binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<NodeId> {
        let offset = self.offset();
        let Some(tok) = self.peek().cloned() else {
            return Err(Error::parse(offset, "unexpected end of expression"));
        };
        self.pos += 1;
        match tok {
            Tok::Punct("-") => {
                let a = self.unary()?;
                Ok(self.builder.neg(a))
            }
            Tok::Punct("~") => {
                let a = self.unary()?;
                Ok(self.builder.not(a))
            }
            Tok::Punct("+") => self.unary(),
            Tok::Punct("(") => {
                if let Some(ty) = self.cast_type() {
                    let a = self.unary()?;
                    return Ok(self.builder.cast(a, ty));
                }
                let inner = self.expr(0)?;
                self.expect(")")?;
                Ok(inner)
            }
            Tok::Ident(name) => match self.vars.get(&name) {
                Some(&ty) => Ok(self.builder.var(&name, ty)),
                None => Err(Error::parse(offset, format!("undeclared variable `{name}`"))),
            },
            Tok::Int { value, hex, unsigned, long } => {
                let ty = literal_type(value, hex, unsigned, long)
                    .ok_or_else(|| Error::parse(offset, "integer literal does not fit 64 bits"))?;
                Ok(self.builder.constant(value, ty))
            }
            Tok::Punct(p) => Err(Error::parse(offset, format!("unexpected `{p}`"))),
        }
    }

    /// After an opening parenthesis: consumes `type-name )` if present.
    fn cast_type(&mut self) -> Option<IntType> {
        let mut words = Vec::new();
        let mut i = self.pos;
        while let Some(Token {
            tok: Tok::Ident(word),
            ..
        }) = self.tokens.get(i)
        {
            if words.is_empty() && self.vars.contains_key(word) {
                return None;
            }
            words.push(word.as_str());
            i += 1;
        }
        let closes = matches!(self.tokens.get(i), Some(Token { tok: Tok::Punct(")"), .. }));
        if words.is_empty() || !closes {
            return None;
        }
        let ty = IntType::from_c_name(&words.join(" "))?;
        self.pos = i + 1;
        Some(ty)
    }
}

/// C rules for the type of an integer literal.
fn literal_type(value: i128, hex: bool, unsigned: bool, long: bool) -> Option<IntType> {
    let candidates: &[IntType] = match (unsigned, long, hex) {
        (false, false, false) => &[IntType::I32, IntType::I64],
        (false, false, true) => &[IntType::I32, IntType::U32, IntType::I64, IntType::U64],
        (true, false, _) => &[IntType::U32, IntType::U64],
        (false, true, false) => &[IntType::I64],
        (false, true, true) => &[IntType::I64, IntType::U64],
        (true, true, _) => &[IntType::U64],
    };
    candidates.iter().copied().find(|ty| {
        if ty.signed {
            fits_signed(value, ty.bits)
        } else {
            fits_unsigned(value, ty.bits)
        }
    })
}
