//! Extension specs: a namespace plus its instruction definitions.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};
use crate::isa::instruction::InstructionDef;

/// One instruction set extension as declared by a vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionSpec {
    /// Namespace prefix of every mnemonic (`xexample`).
    pub namespace: String,
    /// Display name (`XExample`).
    #[serde(default)]
    pub name: String,
    /// Instructions in declaration order.
    #[serde(default)]
    pub instructions: Vec<InstructionDef>,
}

impl ExtensionSpec {
    /// Parses a spec from JSON.
    ///
    /// Only the shape is checked here; [`Registry::load`](crate::Registry::load)
    /// validates the definitions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SpecFormat`] if the JSON is invalid.
    pub fn from_json(text: &str) -> Result<Self> {
        Self::parse(text, "<inline>")
    }

    /// Reads a spec file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`], or [`Error::SpecFormat`] naming the file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, &path.display().to_string())
    }

    fn parse(text: &str, origin: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|source| Error::SpecFormat {
            origin: origin.to_owned(),
            source,
        })
    }

    /// Serializes the spec back to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
