//! CLI: declare types from a schema file, then validate or create documents.
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde::Deserialize;
use serde_json::Value;

use crate::error::MessageOverrides;
use crate::path_de::{from_slice_with_path, from_str_with_path};
use crate::registry::{Registry, RegistryConfig, TypeHandle};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// declare JSON types from a schema file and validate documents against them
#[derive(Parser, Debug)]
#[command(name = "json-decl", version, about)]
pub struct CommandLineInterface {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// validate documents against a declared type and print the extracted values
    Validate(ValidateOut),
    /// print a default-populated instance of a declared type
    Create(CreateOut),
    /// parse a compact field spec (e.g. "String|@optional|len,1,20") and print it
    ParseSpec(ParseSpecOut),
    /// list the types a schema file declares
    Types(TypesOut),
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// schema file: `{"strict": .., "messages": {..}, "types": [..]}` or a bare array of declarations
    #[arg(long, short)]
    schema: PathBuf,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct ValidateOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// declared type every document must satisfy
    #[arg(long = "type", short = 't')]
    type_name: String,

    /// disable coercion for every type, regardless of the schema file
    #[arg(long)]
    strict: bool,

    /// keep undeclared keys and write coerced fields back into each document
    #[arg(long)]
    in_place: bool,

    /// JSON file of message template overrides
    #[arg(long)]
    messages: Option<PathBuf>,

    /// output file for the accepted documents, one per line (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct CreateOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    #[arg(long = "type", short = 't')]
    type_name: String,

    /// JSON file whose values seed the instance
    #[arg(long)]
    from: Option<PathBuf>,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct ParseSpecOut {
    spec: String,
}

#[derive(clap::Parser, Debug)]
struct TypesOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,
}

/// One input document and where it came from, for error reports.
#[derive(Debug)]
struct Document {
    source: String,
    value: Value,
}

/// Object form of a schema file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SchemaFile {
    #[serde(flatten)]
    pub config: RegistryConfig,
    pub types: Vec<Value>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SchemaFile {
    pub fn parse(src: &str) -> Result<Self> {
        // a bare array is shorthand for `{"types": [...]}`
        if src.trim_start().starts_with('[') {
            let types = from_str_with_path::<Vec<Value>>(src)?;
            return Ok(Self { types, ..Self::default() });
        }
        Ok(from_str_with_path::<Self>(src)?)
    }

    pub fn into_registry(self) -> Result<Registry> {
        let mut registry = Registry::with_config(self.config);
        for (index, decl) in self.types.into_iter().enumerate() {
            let name = decl.get("name").and_then(Value::as_str).unwrap_or("<anonymous>").to_string();
            registry
                .declare_json(decl)
                .with_context(|| format!("types[{index}] ({name})"))?;
        }
        Ok(registry)
    }
}

impl SchemaSettings {
    fn load(&self) -> Result<Registry> {
        let src = std::fs::read_to_string(&self.schema)
            .with_context(|| format!("failed to read schema file {}", self.schema.display()))?;
        let registry = SchemaFile::parse(&src)
            .and_then(SchemaFile::into_registry)
            .with_context(|| format!("invalid schema file {}", self.schema.display()))?;
        tracing::info!(schema = %self.schema.display(), types = registry.types().count(), "schema loaded");
        Ok(registry)
    }
}

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let mut out = Vec::new();
        for pattern in &self.input {
            if pattern == "-" {
                let mut bytes = Vec::new();
                std::io::stdin()
                    .read_to_end(&mut bytes)
                    .context("failed to read stdin")?;
                self.load_source("<stdin>", &bytes, &mut out)?;
                continue;
            }
            for source_path in resolve_file_path_patterns([pattern])? {
                let bytes = std::fs::read(&source_path)
                    .with_context(|| format!("failed to read source file {}", source_path.display()))?;
                self.load_source(&source_path.to_string_lossy(), &bytes, &mut out)?;
            }
        }
        Ok(out)
    }

    fn load_source(&self, source: &str, bytes: &[u8], out: &mut Vec<Document>) -> Result<()> {
        if self.ndjson {
            let text = std::str::from_utf8(bytes).with_context(|| format!("{source} is not UTF-8"))?;
            for (line_no, line) in text.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let label = format!("{source}:{}", line_no + 1);
                let value = from_str_with_path::<Value>(line)
                    .with_context(|| format!("failed to parse JSON ({label})"))?;
                self.apply(label, value, out)?;
            }
            return Ok(());
        }
        let value = from_slice_with_path::<Value>(bytes)
            .with_context(|| format!("failed to parse JSON source file ({source})"))?;
        self.apply(source.to_string(), value, out)
    }

    fn apply(&self, source: String, value: Value, out: &mut Vec<Document>) -> Result<()> {
        let value = match self.json_pointer.as_deref() {
            None => value,
            Some(pointer) => value
                .pointer(pointer)
                .cloned()
                .ok_or_else(|| anyhow!("JSON pointer {pointer} selects nothing in {source}"))?,
        };
        match self.jq_expr.as_ref() {
            None => out.push(Document { source, value }),
            Some(jq_expr) => {
                let results = crate::jq_exec::run_jaq(jq_expr, &value)
                    .with_context(|| format!("failed to apply jq expression to {source}"))?;
                let many = results.len() > 1;
                for (i, value) in results.into_iter().enumerate() {
                    let source = if many { format!("{source}#{i}") } else { source.clone() };
                    out.push(Document { source, value });
                }
            }
        }
        Ok(())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// `Ok(false)` when some document failed validation.
    pub fn run(&self) -> Result<bool> {
        match &self.cmd {
            Command::Validate(target) => target.run(),
            Command::Create(target) => {
                let registry = target.schema_settings.load()?;
                let handle = lookup(&registry, &target.type_name)?;
                let seed = match target.from.as_ref() {
                    Some(path) => {
                        let src = std::fs::read_to_string(path)
                            .with_context(|| format!("failed to read {}", path.display()))?;
                        Some(from_str_with_path::<Value>(&src)?)
                    }
                    None => None,
                };
                let instance = handle.create(seed.as_ref());
                write_output(target.out.as_deref(), &serde_json::to_string_pretty(&instance)?)?;
                Ok(true)
            }
            Command::ParseSpec(target) => {
                let spec = crate::compact::parse(&target.spec)?;
                println!("{}", serde_json::to_string_pretty(&spec)?);
                Ok(true)
            }
            Command::Types(target) => {
                let registry = target.schema_settings.load()?;
                for handle in registry.types() {
                    let kind = format!("{:?}", handle.data_type()).to_lowercase();
                    let strict = if handle.is_strict() { " strict" } else { "" };
                    println!("{:<16} {}{}", handle.name().bold(), kind.cyan(), strict.yellow());
                }
                Ok(true)
            }
        }
    }
}

impl ValidateOut {
    fn run(&self) -> Result<bool> {
        let mut registry = self.schema_settings.load()?;
        if self.strict {
            registry.set_strict(true);
        }
        if let Some(path) = self.messages.as_ref() {
            let src = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let overrides = from_str_with_path::<MessageOverrides>(&src)
                .with_context(|| format!("invalid messages file {}", path.display()))?;
            registry.set_messages(overrides);
        }
        let handle = lookup(&registry, &self.type_name)?;
        let documents = self.input_settings.load_documents()?;
        tracing::info!(documents = documents.len(), ty = handle.name(), "validating");

        let results = documents
            .into_par_iter()
            .map(|doc| {
                let outcome = if self.in_place {
                    let mut value = doc.value;
                    handle.check_in_place(&mut value).map(|()| value)
                } else {
                    handle.extract(&doc.value)
                };
                (doc.source, outcome)
            })
            .collect::<Vec<_>>();

        let mut accepted = Vec::new();
        let mut failures = 0usize;
        for (source, outcome) in results {
            match outcome {
                Ok(value) => accepted.push(serde_json::to_string(&value)?),
                Err(err) => {
                    failures += 1;
                    let at = err.path.as_deref().map(|p| format!(" at {p}")).unwrap_or_default();
                    eprintln!("{} {}{}: {}", "✗".red().bold(), source, at.dimmed(), err);
                }
            }
        }
        let passed = accepted.len();
        if !accepted.is_empty() {
            let mut text = accepted.join("\n");
            text.push('\n');
            write_output(self.out.as_deref(), &text)?;
        }
        let summary = format!("{passed} passed, {failures} failed");
        if failures == 0 {
            eprintln!("{}", summary.green());
        } else {
            eprintln!("{}", summary.red());
        }
        Ok(failures == 0)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn lookup<'r>(registry: &'r Registry, name: &str) -> Result<TypeHandle<'r>> {
    registry
        .get(name)
        .ok_or_else(|| anyhow!("type '{name}' is not declared in the schema"))
}

fn write_output(out: Option<&Path>, text: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, text).with_context(|| format!("failed to write {}", out.display()))
        }
        None => {
            print!("{text}");
            if !text.ends_with('\n') {
                println!();
            }
            Ok(())
        }
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
