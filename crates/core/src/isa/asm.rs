//! Assembly text parsing.
//!
//! Lines have the form `<namespace>.<mnemonic> op, op, ...` with operands in
//! declared order. Registers are written `x<N>` or by ABI name; immediates are
//! decimal, negative decimal, or `0x` hex. A `#` starts a comment.

use crate::codec::{Bindings, EncodedWord};
use crate::common::{Error, Result};
use crate::isa::abi::parse_register;
use crate::isa::operand::OperandKind;
use crate::isa::registry::{DefId, Registry};

impl Registry {
    /// Parses one assembly line into a definition and its bindings.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownMnemonic`] or [`Error::InvalidOperand`].
    pub fn parse_line(&self, line: &str) -> Result<(DefId, Bindings)> {
        let line = line.split('#').next().unwrap_or_default().trim();
        let (mnemonic, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let id = self
            .find(mnemonic)
            .ok_or_else(|| Error::UnknownMnemonic(mnemonic.to_owned()))?;
        let def = self.def(id);

        let texts: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split(',').map(str::trim).collect()
        };
        if texts.len() != def.operands.len() {
            return Err(Error::InvalidOperand {
                text: rest.to_owned(),
                reason: format!(
                    "`{mnemonic}` takes {} operand(s), got {}",
                    def.operands.len(),
                    texts.len()
                ),
            });
        }

        let mut bindings = Bindings::new();
        for (op, text) in def.operands.iter().zip(texts) {
            let invalid = |reason: &str| Error::InvalidOperand {
                text: text.to_owned(),
                reason: format!("{reason} for `{}`", op.name),
            };
            let value = match op.kind {
                OperandKind::Register => {
                    i64::from(parse_register(text).ok_or_else(|| invalid("expected a register"))?)
                }
                OperandKind::Immediate => {
                    parse_immediate(text).ok_or_else(|| invalid("expected an integer"))?
                }
            };
            let _ = bindings.insert(&op.name, value);
        }
        Ok((id, bindings))
    }

    /// Assembles one line.
    ///
    /// # Errors
    ///
    /// Text errors from [`Registry::parse_line`], then codec errors from
    /// [`Registry::encode`].
    pub fn assemble(&self, line: &str) -> Result<EncodedWord> {
        let (id, bindings) = self.parse_line(line)?;
        self.encode(id, &bindings)
    }
}

/// Parses `42`, `-7`, `0x1f` or `-0x10`.
pub fn parse_immediate(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i128::from_str_radix(hex, 16).ok()?,
        None if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            digits.parse::<i128>().ok()?
        }
        None => return None,
    };
    i64::try_from(if negative { -magnitude } else { magnitude }).ok()
}
