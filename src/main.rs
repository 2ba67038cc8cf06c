//! jit-coupons CLI
//!
//! Usage:
//!   jit-coupons [OPTIONS] <COMMAND>
//!
//! Commands:
//!   references       Print the reference registry
//!   set-references   Replace the registry from a TOML file
//!   add-template     Create a template record
//!   resolve          Resolve a code, synthesizing its record if needed
//!   show             Print a record and its attributes
//!   parse-line       Parse one child line and print the result
//!
//! State lives in a JSON store file (default `jit-store.json`) holding both
//! the configuration slots and the record table.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use jit_coupons::{
    ChildLine, CreationOutcome, MemoryConfigStore, MemoryRecordStore, NewRecord, RecordStatus,
    RecordStore, ReferenceRegistry, SynthesisEngine, DEFAULT_RECORD_KIND, DEFAULT_REGISTRY_KEY,
};

#[derive(Parser)]
#[command(name = "jit-coupons")]
#[command(about = "Just-in-time coupon synthesis from reference templates")]
struct Cli {
    /// Store file holding configuration and records
    #[arg(short, long, default_value = "jit-store.json")]
    store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the reference registry
    References,

    /// Replace the reference registry from a TOML file
    SetReferences {
        /// TOML file with `[[reference]]` tables (`template`, `codes`)
        file: PathBuf,
    },

    /// Create a template record
    AddTemplate {
        /// Record title, used as the template id in references
        title: String,

        /// Descriptive text; may contain {placeholders}
        #[arg(short, long)]
        description: String,

        /// Attributes as KEY=VALUE pairs; values parse as JSON when possible
        #[arg(short, long)]
        attribute: Vec<String>,
    },

    /// Resolve a code against the registry, creating its record if needed
    Resolve {
        /// The coupon code to resolve
        code: String,
    },

    /// Print a record and its attributes
    Show {
        /// Title of the record
        code: String,
    },

    /// Parse one child line and print the code and variables
    ParseLine {
        /// The line, e.g. 'Darko25 {"presentername": "Darko Novak"}'
        line: String,
    },
}

/// On-disk shape of the store file
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    config: MemoryConfigStore,
    records: MemoryRecordStore,
}

impl StoreState {
    fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// TOML shape accepted by `set-references`
#[derive(Debug, Deserialize)]
struct ReferencesFile {
    #[serde(default, rename = "reference")]
    references: Vec<ReferenceRow>,
}

#[derive(Debug, Deserialize)]
struct ReferenceRow {
    #[serde(default)]
    template: String,
    #[serde(default)]
    codes: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // parse-line touches no state, so handle it before loading the store
    if let Command::ParseLine { line } = &cli.command {
        let parsed = ChildLine::parse(line);
        println!("code: {}", parsed.code);
        let mut variables: Vec<_> = parsed.variables.iter().collect();
        variables.sort();
        for (key, value) in variables {
            println!("  {} = {}", key, value);
        }
        return;
    }

    let mut state = match StoreState::load(&cli.store) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Error reading store '{}': {}", cli.store.display(), e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::References => print_references(&state),
        Command::SetReferences { file } => set_references(&mut state, &file),
        Command::AddTemplate {
            title,
            description,
            attribute,
        } => add_template(&mut state, title, description, &attribute),
        Command::Resolve { code } => resolve(&mut state, &code),
        Command::Show { code } => show(&state, &code),
        Command::ParseLine { .. } => unreachable!("handled above"),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = state.save(&cli.store) {
        eprintln!("Error writing store '{}': {}", cli.store.display(), e);
        std::process::exit(1);
    }
}

fn print_references(state: &StoreState) -> Result<(), Box<dyn std::error::Error>> {
    let registry = ReferenceRegistry::load(&state.config, DEFAULT_REGISTRY_KEY)?;
    if registry.is_empty() {
        println!("(no references)");
        return Ok(());
    }
    for reference in registry.references() {
        println!("template: {}", reference.template_id);
        for line in reference.raw_codes.lines() {
            println!("  {}", line);
        }
    }
    Ok(())
}

fn set_references(state: &mut StoreState, file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let content = fs::read_to_string(file)?;
    let parsed: ReferencesFile = toml::from_str(&content)?;
    let rows: Vec<(String, String)> = parsed
        .references
        .into_iter()
        .map(|row| (row.template, row.codes))
        .collect();

    let registry = ReferenceRegistry::save(&mut state.config, DEFAULT_REGISTRY_KEY, &rows)?;
    println!("{} reference(s) saved", registry.len());
    Ok(())
}

fn add_template(
    state: &mut StoreState,
    title: String,
    description: String,
    attributes: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let id = state.records.create(NewRecord {
        kind: DEFAULT_RECORD_KIND.to_string(),
        title,
        status: RecordStatus::Published,
        description,
    })?;

    for pair in attributes {
        let Some((key, raw)) = pair.split_once('=') else {
            return Err(format!("attribute '{}' is not KEY=VALUE", pair).into());
        };
        let value = serde_json::from_str(raw)
            .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
        state.records.add_attribute(id, key, value)?;
    }

    println!("created template record {}", id);
    Ok(())
}

fn resolve(state: &mut StoreState, code: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = std::mem::take(&mut state.config);
    let records = std::mem::take(&mut state.records);

    let mut engine = SynthesisEngine::new(config, records);
    let outcome = engine.resolve_and_create(code);
    let (config, records) = engine.into_parts();
    state.config = config;
    state.records = records;

    match outcome? {
        CreationOutcome::Created(id) => println!("created record {} for code {}", id, code),
        CreationOutcome::NoMatch => println!("no reference matches code {}", code),
        CreationOutcome::TemplateMissing => {
            println!("code {} matched, but its template record is missing", code)
        }
        CreationOutcome::AlreadyExists => println!("record {} already exists", code),
    }
    Ok(())
}

fn show(state: &StoreState, code: &str) -> Result<(), Box<dyn std::error::Error>> {
    let Some(record) = state.records.find_by_title(DEFAULT_RECORD_KIND, code)? else {
        return Err(format!("no record titled '{}'", code).into());
    };

    println!("id:          {}", record.id);
    println!("title:       {}", record.title);
    println!("status:      {}", record.status);
    println!("description: {}", record.description);

    let attributes = state.records.attributes(record.id)?;
    if !attributes.is_empty() {
        println!("attributes:");
        for (key, values) in &attributes {
            for value in values {
                println!("  {} = {}", key, value);
            }
        }
    }
    Ok(())
}
