//! Custom RISC-V extension toolkit CLI.
//!
//! Loads one or more extension spec files into a registry and then:
//! 1. **Check:** Validate the registry and print the load report (optionally as JSON).
//! 2. **Assemble:** Encode assembly lines into instruction words.
//! 3. **Disassemble:** Decode hex words or byte streams into assembly text.
//! 4. **Match:** Select custom instructions for C-like expressions.
//!
//! A malformed registry aborts with a non-zero exit status; failures of single
//! lines, words or expressions are reported and the run moves on.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use isax_core::codec::{EncodedWord, WordSize};
use isax_core::expr::{AnnotatedTree, IntType, NodeId, VarTypes, WidthAnalyzer, parse_expr};
use isax_core::isa::OperandDesc;
use isax_core::isa::abi::{REG_A0, abi_name};
use isax_core::pattern::{Bound, MatchCandidate, MatchOutcome};
use isax_core::{Config, Error, Matcher, Registry};

#[derive(Parser, Debug)]
#[command(
    name = "isax",
    author,
    version,
    about = "Custom RISC-V extension compiler toolkit",
    long_about = "Validate extension specs, assemble and disassemble custom instructions, and \
                  select instructions for C expressions.\n\nExamples:\n  \
                  isax --spec specs/xcorev.json check\n  \
                  isax --spec specs/xexample.json asm \"xexample.subincacc x21, x11, x27\"\n  \
                  isax --spec specs/xexample.json disasm 0x51b5baab \"7c 81\"\n  \
                  isax --spec specs/xcorev.json match --var x:u32 --var y:u32 \"((uint64_t)x + y) >> 1\""
)]
struct Cli {
    /// JSON configuration file (registry, matcher and disassembler sections).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Extension spec file; repeat to load several extensions.
    #[arg(short, long = "spec", global = true)]
    specs: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load the registry and print what was loaded.
    Check {
        /// Print the report and every definition as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Assemble lines such as "cv.addun a0, a1, a2, 1".
    Asm {
        /// Assembly lines.
        #[arg(required = true)]
        lines: Vec<String>,
    },

    /// Disassemble words ("0x51b5baab") or little-endian byte strings ("ab ba b5 51").
    Disasm {
        /// Words or byte strings; all inputs form one stream.
        #[arg(required = true)]
        inputs: Vec<String>,
    },

    /// Select custom instructions for C expressions.
    Match {
        /// Variable declaration, e.g. `x:u32` or `acc:uint64_t`.
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, IntType)>,

        /// Print every disjoint match instead of only the best one.
        #[arg(long)]
        cover: bool,

        /// Expressions.
        #[arg(required = true)]
        exprs: Vec<String>,
    },
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match Config::from_path(path) {
            Ok(config) => config,
            Err(e) => {
                error!(path = %path.display(), "{e}");
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };

    if cli.specs.is_empty() {
        eprintln!("Error: pass at least one --spec <file.json>");
        return ExitCode::FAILURE;
    }

    let registry = match Registry::load_paths(&cli.specs, &config.registry) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("[!] registry rejected: {e}");
            return ExitCode::FAILURE;
        }
    };
    debug!(report = %registry.report(), "registry ready");

    match cli.command {
        Commands::Check { json } => cmd_check(&registry, json),
        Commands::Asm { lines } => cmd_asm(&registry, &lines),
        Commands::Disasm { inputs } => cmd_disasm(&registry, &config, &inputs),
        Commands::Match { vars, cover, exprs } => {
            let vars: VarTypes = vars.into_iter().collect();
            cmd_match(&registry, &config, &vars, cover, &exprs);
        }
    }
    ExitCode::SUCCESS
}

/// Parses a `name:type` variable declaration.
fn parse_var(text: &str) -> Result<(String, IntType), String> {
    let (name, ty) = text
        .split_once(':')
        .ok_or_else(|| format!("`{text}` is not name:type"))?;
    let ty = IntType::from_c_name(ty.trim()).ok_or_else(|| format!("unknown type `{ty}`"))?;
    Ok((name.trim().to_owned(), ty))
}

fn cmd_check(registry: &Registry, json: bool) {
    let report = registry.report();
    if json {
        let defs: Vec<_> = registry
            .ids()
            .map(|id| {
                let def = registry.def(id);
                serde_json::json!({
                    "name": registry.name(id),
                    "mask": format!("{:#010x}", def.encoding.mask()),
                    "match": format!("{:#010x}", def.encoding.match_bits()),
                    "opcode": registry.major_opcode(id).map(|op| op.to_string()),
                    "template": def.template,
                    "intrinsic": registry.signature(id).map(|sig| sig.to_string()),
                })
            })
            .collect();
        let doc = serde_json::json!({
            "extensions": report.extensions,
            "instructions": report.instructions,
            "templates": report.templates,
            "auto_intrinsics": report.auto_intrinsics,
            "skipped": report.skipped,
            "non_custom": report.non_custom,
            "definitions": defs,
        });
        match serde_json::to_string_pretty(&doc) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("[!] {e}"),
        }
        return;
    }

    println!("{report}");
    for name in &report.skipped {
        println!("  skipped {name} (RV64 only)");
    }
    for name in &report.non_custom {
        println!("  warning: {name} is outside the custom opcode space");
    }
    for id in registry.ids() {
        let def = registry.def(id);
        let opcode = registry.major_opcode(id).map_or_else(|| "-".to_owned(), |op| op.to_string());
        println!(
            "  {:<24} mask {:#010x} match {:#010x} {:<8} {}",
            registry.name(id),
            def.encoding.mask(),
            def.encoding.match_bits(),
            opcode,
            registry.signature(id).map_or_else(String::new, |sig| sig.to_string()),
        );
    }
}

fn cmd_asm(registry: &Registry, lines: &[String]) {
    for line in lines {
        match registry.assemble(line) {
            Ok(word) => {
                let bytes: Vec<String> = word.to_le_bytes().iter().map(|b| format!("{b:02x}")).collect();
                println!("{word}  {:<11}  {}", bytes.join(" "), line.trim());
            }
            Err(e) => eprintln!("[!] {}: {e}", line.trim()),
        }
    }
}

fn cmd_disasm(registry: &Registry, config: &Config, inputs: &[String]) {
    let mut stream = Vec::new();
    for input in inputs {
        match parse_hex(input) {
            Ok(bytes) => stream.extend(bytes),
            Err(reason) => eprintln!("[!] {input}: {reason}"),
        }
    }
    for line in registry.disassemble_bytes(&stream, &config.disasm) {
        println!("{line}");
    }
}

/// Decodes one disassembler input into little-endian bytes.
///
/// `0x`-prefixed inputs are whole words sized by their length prefix; anything
/// else is a string of hex byte pairs, spaces allowed.
fn parse_hex(input: &str) -> Result<Vec<u8>, String> {
    let text = input.trim();
    if let Some(digits) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        let bits = u32::from_str_radix(&digits.replace('_', ""), 16).map_err(|e| e.to_string())?;
        let size = WordSize::from_prefix(bits);
        if size == WordSize::Half && bits > 0xFFFF {
            return Err("16-bit prefix on a value wider than 16 bits".to_owned());
        }
        return Ok(EncodedWord::new(bits, size).to_le_bytes());
    }
    let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err("not a hex string".to_owned());
    }
    if digits.len() % 2 != 0 {
        return Err("odd number of hex digits".to_owned());
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|e| e.to_string()))
        .collect()
}

fn cmd_match(registry: &Registry, config: &Config, vars: &VarTypes, cover: bool, exprs: &[String]) {
    let matcher = Matcher::new(registry, config.matcher);
    for text in exprs {
        let tree = match parse_expr(text, vars) {
            Ok(tree) => WidthAnalyzer::analyze(tree),
            Err(e) => {
                eprintln!("[!] {text}: {e}");
                continue;
            }
        };
        println!("{text}");
        if cover {
            let found = matcher.cover(&tree);
            if found.matches.is_empty() {
                println!("  no match");
            }
            for candidate in &found.matches {
                print_candidate(registry, &tree, candidate);
            }
            for ambiguity in found.ambiguous {
                println!("  {}", Error::from(ambiguity));
            }
            continue;
        }
        match matcher.select(&tree) {
            Ok(MatchOutcome::Matched(candidate)) => print_candidate(registry, &tree, &candidate),
            Ok(MatchOutcome::NoMatch) => println!("  no match"),
            Err(e) => println!("  {e}"),
        }
    }
}

fn print_candidate(registry: &Registry, tree: &AnnotatedTree, candidate: &MatchCandidate) {
    let operands: Vec<String> = registry
        .def(candidate.def())
        .operands
        .iter()
        .map(|op| match candidate.binding(&op.name) {
            Some(Bound::Value(id)) => format!("{}={}", op.name, tree.tree().render(id)),
            Some(Bound::Imm(v)) => format!("{}={v}", op.name),
            None => format!("{}=<out>", op.name),
        })
        .collect();
    println!(
        "  {} at {}: {}",
        registry.name(candidate.def()),
        tree.tree().render(candidate.root),
        operands.join(" ")
    );

    // Show one possible encoding with values placed in a0, a1, ... in order.
    let mut assigned: BTreeMap<NodeId, u32> = BTreeMap::new();
    let mut next = REG_A0;
    let mut assigner = |op: &OperandDesc, value: Option<Bound>| -> isax_core::Result<u32> {
        let fresh = |next: &mut u32| {
            *next += 1;
            *next - 1
        };
        let reg = match value {
            Some(Bound::Value(id)) => *assigned.entry(id).or_insert_with(|| fresh(&mut next)),
            _ => fresh(&mut next),
        };
        if abi_name(reg).is_none() {
            return Err(Error::InvalidOperand {
                text: op.name.clone(),
                reason: "ran out of sample registers".to_owned(),
            });
        }
        Ok(reg)
    };
    match registry.emit(&candidate.instruction, &mut assigner) {
        Ok(word) => println!("    {word}  {}", registry.disassemble(word).unwrap_or_default()),
        Err(e) => println!("    not encodable: {e}"),
    }
}
