//! Extension registry.
//!
//! The registry is the immutable, validated catalog every other component reads.
//! Loading it:
//! 1. **Validates** every definition (bit layout, operands, templates, names,
//!    decode uniqueness, rounding markers); any violation is a fatal
//!    [`Error::MalformedSpec`].
//! 2. **Indexes** definitions by qualified mnemonic, intrinsic alias, template
//!    root shape, and rounding base.
//! 3. **Orders** definitions for decoding once: fewest free bits first, then
//!    most fixed bits, then declaration order.
//!
//! After `load` returns nothing mutates the registry, so one instance can be
//! shared by reference across worker threads.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::codec::{self, Bindings, Decoded, EncodedWord, WordSize};
use crate::common::constants::{REGISTER_COUNT, XLEN_32, XLEN_64};
use crate::common::{Error, Result};
use crate::config::RegistryConfig;
use crate::isa::extension::ExtensionSpec;
use crate::isa::instruction::{InstructionDef, IntrinsicSignature, Variant};
use crate::isa::opcodes::MajorOpcode;
use crate::isa::operand::OperandKind;
use crate::pattern::candidate::{BoundInstruction, RegisterAssigner};
use crate::pattern::table::{MatchTable, rule};
use crate::pattern::template::Template;

/// Handle of a definition inside one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DefId(usize);

impl DefId {
    /// Position in load order.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for DefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    namespace: String,
    def: InstructionDef,
    template: Option<Template>,
    intrinsic: Option<String>,
    major: Option<MajorOpcode>,
}

impl Entry {
    fn name(&self) -> String {
        format!("{}.{}", self.namespace, self.def.mnemonic)
    }
}

/// One row of the precomputed decode order.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DecodeEntry {
    pub id: DefId,
    pub mask: u32,
    pub bits: u32,
    pub size: WordSize,
}

/// Summary of a registry load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Namespaces in load order.
    pub extensions: Vec<String>,
    /// Definitions loaded.
    pub instructions: usize,
    /// Qualified names of RV64-only definitions skipped for XLEN=32.
    pub skipped: Vec<String>,
    /// Definitions with a semantic template.
    pub templates: usize,
    /// Intrinsic aliases generated automatically.
    pub auto_intrinsics: usize,
    /// 32-bit definitions outside the custom opcode spaces.
    pub non_custom: Vec<String>,
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} instructions from {} extension(s) [{}]; {} templates, {} auto intrinsics, {} skipped",
            self.instructions,
            self.extensions.len(),
            self.extensions.join(", "),
            self.templates,
            self.auto_intrinsics,
            self.skipped.len(),
        )
    }
}

/// Validated catalog of custom instructions.
#[derive(Debug, Clone)]
pub struct Registry {
    xlen: u32,
    entries: Vec<Entry>,
    by_name: HashMap<String, DefId>,
    by_intrinsic: HashMap<String, DefId>,
    decode: Vec<DecodeEntry>,
    table: MatchTable,
    rounding: BTreeMap<DefId, DefId>,
    report: LoadReport,
}

impl Registry {
    /// Validates and indexes a set of extension specs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedSpec`] for the first violated rule.
    pub fn load(
        specs: impl IntoIterator<Item = ExtensionSpec>,
        config: &RegistryConfig,
    ) -> Result<Self> {
        if config.xlen != XLEN_32 && config.xlen != XLEN_64 {
            return Err(Error::malformed(
                "<registry>",
                format!("unsupported xlen {}", config.xlen),
            ));
        }

        let mut report = LoadReport::default();
        let mut entries: Vec<Entry> = Vec::new();
        let mut by_name = HashMap::new();

        for spec in specs {
            if spec.namespace.is_empty() || spec.namespace.contains(char::is_whitespace) {
                return Err(Error::malformed(&spec.namespace, "invalid namespace"));
            }
            report.extensions.push(spec.namespace.clone());
            for def in spec.instructions {
                let name = format!("{}.{}", spec.namespace, def.mnemonic);
                if def.variant == Variant::Rv64 && config.xlen < XLEN_64 {
                    warn!(instruction = %name, "skipping RV64-only definition");
                    report.skipped.push(name);
                    continue;
                }
                check_def(&def).map_err(|reason| Error::malformed(&name, reason))?;

                let major = (def.variant != Variant::Compressed && def.mask() & 0x7f == 0x7f)
                    .then(|| MajorOpcode::from_word(def.match_bits()))
                    .flatten();
                if let Some(major) = major.filter(|m| !m.is_custom()) {
                    warn!(instruction = %name, %major, "definition outside the custom opcode spaces");
                    report.non_custom.push(name.clone());
                }

                let id = DefId(entries.len());
                if by_name.insert(name.clone(), id).is_some() {
                    return Err(Error::malformed(&name, "duplicate mnemonic"));
                }
                entries.push(Entry {
                    namespace: spec.namespace.clone(),
                    intrinsic: def.intrinsic.clone(),
                    def,
                    template: None,
                    major,
                });
            }
        }
        report.instructions = entries.len();

        let by_intrinsic = assign_intrinsics(&mut entries, config, &mut report)?;
        check_decode_uniqueness(&entries)?;

        let mut table = MatchTable::default();
        for (i, entry) in entries.iter_mut().enumerate() {
            let Some(text) = &entry.def.template else {
                continue;
            };
            let template = Template::compile(text, &entry.def)
                .map_err(|reason| Error::malformed(entry.name(), format!("template: {reason}")))?;
            let shape = template
                .root_shape()
                .filter(|&key| rule(key).is_some())
                .ok_or_else(|| Error::malformed(entry.name(), "template root cannot be matched"))?;
            table.insert(shape, DefId(i));
            entry.template = Some(template);
            report.templates += 1;
        }

        let rounding = link_rounding(&entries, &by_name)?;

        let mut decode: Vec<DecodeEntry> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| DecodeEntry {
                id: DefId(i),
                mask: e.def.mask(),
                bits: e.def.match_bits(),
                size: WordSize::of(e.def.variant),
            })
            .collect();
        decode.sort_by_key(|d| {
            let def = &entries[d.id.0].def;
            (def.free_bits(), Reverse(def.encoding.fixed_bit_count()), d.id)
        });

        info!(
            extensions = report.extensions.len(),
            instructions = report.instructions,
            templates = report.templates,
            auto_intrinsics = report.auto_intrinsics,
            skipped = report.skipped.len(),
            "registry loaded"
        );

        Ok(Self {
            xlen: config.xlen,
            entries,
            by_name,
            by_intrinsic,
            decode,
            table,
            rounding,
            report,
        })
    }

    /// Reads and loads spec files.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] / [`Error::SpecFormat`] for unreadable files, then as [`Registry::load`].
    pub fn load_paths<P: AsRef<Path>>(paths: &[P], config: &RegistryConfig) -> Result<Self> {
        let specs = paths
            .iter()
            .map(ExtensionSpec::from_path)
            .collect::<Result<Vec<_>>>()?;
        Self::load(specs, config)
    }

    /// Definition behind a handle.
    pub fn def(&self, id: DefId) -> &InstructionDef {
        &self.entries[id.0].def
    }

    /// Namespace of a definition.
    pub fn namespace(&self, id: DefId) -> &str {
        &self.entries[id.0].namespace
    }

    /// Qualified mnemonic, `<namespace>.<mnemonic>`.
    pub fn name(&self, id: DefId) -> String {
        self.entries[id.0].name()
    }

    /// Looks up a qualified mnemonic.
    pub fn find(&self, qualified: &str) -> Option<DefId> {
        self.by_name.get(qualified).copied()
    }

    /// Looks up an intrinsic alias.
    pub fn by_intrinsic(&self, alias: &str) -> Option<DefId> {
        self.by_intrinsic.get(alias).copied()
    }

    /// Intrinsic alias of a definition, explicit or generated.
    pub fn intrinsic(&self, id: DefId) -> Option<&str> {
        self.entries[id.0].intrinsic.as_deref()
    }

    /// C signature of a definition's intrinsic.
    pub fn signature(&self, id: DefId) -> Option<IntrinsicSignature> {
        self.intrinsic(id).map(|alias| self.def(id).signature(alias))
    }

    /// Rounding variant declared for a base definition.
    pub fn rounding_variant(&self, base: DefId) -> Option<DefId> {
        self.rounding.get(&base).copied()
    }

    /// Major opcode of a 32-bit definition with a fixed `[6:0]`.
    pub fn major_opcode(&self, id: DefId) -> Option<MajorOpcode> {
        self.entries[id.0].major
    }

    /// Every definition, in load order.
    pub fn ids(&self) -> impl Iterator<Item = DefId> + '_ {
        (0..self.entries.len()).map(DefId)
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no definition was loaded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Target register width.
    pub const fn xlen(&self) -> u32 {
        self.xlen
    }

    /// Summary of the load.
    pub const fn report(&self) -> &LoadReport {
        &self.report
    }

    pub(crate) fn template(&self, id: DefId) -> Option<&Template> {
        self.entries[id.0].template.as_ref()
    }

    pub(crate) const fn table(&self) -> &MatchTable {
        &self.table
    }

    pub(crate) fn rounding_pairs(&self) -> impl Iterator<Item = (DefId, DefId)> + '_ {
        self.rounding.iter().map(|(&base, &variant)| (base, variant))
    }

    /// First definition in decode order whose fixed bits match `word`.
    pub(crate) fn lookup_word(&self, word: EncodedWord) -> Option<DefId> {
        self.decode
            .iter()
            .find(|d| d.size == word.size() && word.bits() & d.mask == d.bits)
            .map(|d| d.id)
    }

    /// Encodes `bindings` for `id` and checks the word decodes back to `id`.
    ///
    /// # Errors
    ///
    /// Codec errors from [`codec::encode`], or [`Error::ShadowedEncoding`]
    /// when a more specific definition captures the word.
    pub fn encode(&self, id: DefId, bindings: &Bindings) -> Result<EncodedWord> {
        let word = codec::encode(self.def(id), bindings)?;
        match self.lookup_word(word) {
            Some(winner) if winner != id => Err(Error::ShadowedEncoding {
                instruction: self.name(id),
                shadowed_by: self.name(winner),
                word,
            }),
            _ => Ok(word),
        }
    }

    /// See [`codec::decode`].
    ///
    /// # Errors
    ///
    /// [`Error::DecodeNoMatch`].
    pub fn decode(&self, word: EncodedWord) -> Result<Decoded> {
        codec::decode(word, self)
    }

    /// See [`codec::decode_bytes`].
    ///
    /// # Errors
    ///
    /// [`Error::Truncated`] or [`Error::DecodeNoMatch`].
    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<(Decoded, usize)> {
        codec::decode_bytes(bytes, self)
    }

    /// Lowers a bound instruction and encodes it.
    ///
    /// Matched and intrinsic-bound instructions both reach machine code here.
    ///
    /// # Errors
    ///
    /// Assigner errors, then as [`Registry::encode`].
    pub fn emit(
        &self,
        instruction: &BoundInstruction,
        assigner: &mut impl RegisterAssigner,
    ) -> Result<EncodedWord> {
        let bindings = instruction.lower(self, assigner)?;
        self.encode(instruction.def, &bindings)
    }
}

/// Bit layout and operand rules of a single definition.
fn check_def(def: &InstructionDef) -> std::result::Result<(), String> {
    if def.mnemonic.is_empty() || def.mnemonic.contains(char::is_whitespace) {
        return Err("invalid mnemonic".to_owned());
    }
    def.encoding.check(def.variant.word_bits())?;

    let mut seen = HashSet::new();
    for op in &def.operands {
        if !seen.insert(op.name.as_str()) {
            return Err(format!("duplicate operand `{}`", op.name));
        }
        if !(1..=64).contains(&op.width) {
            return Err(format!("operand `{}` has width {}", op.name, op.width));
        }
        if op.bias != 0 && !op.is_register() {
            return Err(format!("immediate `{}` cannot have a register bias", op.name));
        }
        if op.bias >= REGISTER_COUNT {
            return Err(format!("register bias {} of `{}` is out of range", op.bias, op.name));
        }
    }

    if let Some(seg) = def.encoding.fields.iter().find(|s| def.operand(&s.operand).is_none()) {
        return Err(format!("field names undeclared operand `{}`", seg.operand));
    }

    for op in &def.operands {
        let segments: Vec<_> = def.encoding.segments(&op.name).collect();
        if segments.is_empty() {
            return Err(format!("operand `{}` has no field", op.name));
        }
        match op.kind {
            OperandKind::Immediate => {
                let mut covered = 0u64;
                for seg in &segments {
                    if seg.offset.saturating_add(seg.len()) > op.width {
                        return Err(format!(
                            "segment [{}:{}] of `{}` exceeds its {}-bit width",
                            seg.hi, seg.lo, op.name, op.width
                        ));
                    }
                    if covered & seg.value_mask() != 0 {
                        return Err(format!("segments of `{}` carry the same bits", op.name));
                    }
                    covered |= seg.value_mask();
                }
            }
            OperandKind::Register => {
                let [seg] = segments.as_slice() else {
                    return Err(format!("register `{}` must use one field", op.name));
                };
                if seg.offset != 0 || seg.len() > 5 {
                    return Err(format!("register field of `{}` must be 1..=5 bits at offset 0", op.name));
                }
                if op.bias + (1 << seg.len()) - 1 >= REGISTER_COUNT {
                    return Err(format!(
                        "register field of `{}` with bias {} reaches past x31",
                        op.name, op.bias
                    ));
                }
            }
        }
    }
    Ok(())
}

fn assign_intrinsics(
    entries: &mut [Entry],
    config: &RegistryConfig,
    report: &mut LoadReport,
) -> Result<HashMap<String, DefId>> {
    let mut by_intrinsic = HashMap::new();
    for (i, entry) in entries.iter().enumerate() {
        if let Some(alias) = &entry.intrinsic
            && by_intrinsic.insert(alias.clone(), DefId(i)).is_some()
        {
            return Err(Error::malformed(
                entry.name(),
                format!("intrinsic `{alias}` is declared twice"),
            ));
        }
    }
    if !config.auto_intrinsics {
        return Ok(by_intrinsic);
    }
    for (i, entry) in entries.iter_mut().enumerate() {
        let eligible = entry.intrinsic.is_none()
            && entry.def.register_output().is_some()
            && entry.def.intrinsic_inputs().next().is_some();
        if !eligible {
            continue;
        }
        let alias = format!(
            "{}{}_{}",
            config.intrinsic_prefix,
            entry.namespace,
            entry.def.mnemonic.replace('.', "_")
        );
        if by_intrinsic.contains_key(&alias) {
            debug!(%alias, instruction = %entry.name(), "generated alias already taken");
            continue;
        }
        let _ = by_intrinsic.insert(alias.clone(), DefId(i));
        entry.intrinsic = Some(alias);
        report.auto_intrinsics += 1;
    }
    Ok(by_intrinsic)
}

/// Two definitions with the same free-bit count must never match one word.
fn check_decode_uniqueness(entries: &[Entry]) -> Result<()> {
    for (i, a) in entries.iter().enumerate() {
        for b in &entries[i + 1..] {
            if WordSize::of(a.def.variant) != WordSize::of(b.def.variant)
                || a.def.free_bits() != b.def.free_bits()
            {
                continue;
            }
            let shared = a.def.mask() & b.def.mask();
            if (a.def.match_bits() ^ b.def.match_bits()) & shared == 0 {
                return Err(Error::malformed(
                    b.name(),
                    format!("decodes ambiguously with `{}`", a.name()),
                ));
            }
        }
    }
    Ok(())
}

fn link_rounding(entries: &[Entry], by_name: &HashMap<String, DefId>) -> Result<BTreeMap<DefId, DefId>> {
    let mut rounding = BTreeMap::new();
    for (i, entry) in entries.iter().enumerate() {
        let Some(base) = entry.def.rounds() else {
            continue;
        };
        let fail = |reason: String| Error::malformed(entry.name(), reason);
        if entry.def.template.is_some() {
            return Err(fail("a rounding variant takes its base's template".to_owned()));
        }
        let base_name = format!("{}.{}", entry.namespace, base);
        let &base_id = by_name
            .get(&base_name)
            .ok_or_else(|| fail(format!("rounding base `{base_name}` does not exist")))?;
        let base_entry = &entries[base_id.0];
        if base_entry.template.is_none() {
            return Err(fail(format!("rounding base `{base_name}` has no template")));
        }
        if base_entry.def.operands != entry.def.operands {
            return Err(fail(format!("operands differ from rounding base `{base_name}`")));
        }
        if rounding.insert(base_id, DefId(i)).is_some() {
            return Err(fail(format!("`{base_name}` already has a rounding variant")));
        }
    }
    Ok(rounding)
}
