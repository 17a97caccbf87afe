//! csvdml CLI - apply CSV statement documents to an entity store

use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

use csvdml::config::{ConfigFile, Overrides, ParserKind, Settings};
use csvdml::repository::{JsonFileRepository, MemoryRepository, Repository};
use csvdml::serialization::{write_entities, write_outcomes};
use csvdml::{Document, ExecutionReport, Executor, FanOutPolicy, NameResolution, SchemaRegistry};

#[derive(Parser)]
#[command(name = "csvdml")]
#[command(version, about = "Apply CSV insert/update/delete documents to an entity store", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct CommonArgs {
    /// Path to csvdml.yaml (default: ./csvdml.yaml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Schema YAML file or directory of schema files
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// JSON store file; omitted means an in-memory store
    #[arg(long)]
    store: Option<PathBuf>,

    /// Namespace for bare type names in headers
    #[arg(short, long)]
    namespace: Option<String>,

    /// Header name resolution (simple, camel_case, verbatim)
    #[arg(long)]
    naming: Option<NameResolution>,

    /// Literal rule set (basic, typed)
    #[arg(long)]
    parser: Option<ParserKind>,
}

impl CommonArgs {
    fn settings(&self, fan_out: Option<FanOutPolicy>) -> Result<Settings, String> {
        let file = ConfigFile::discover(self.config.as_deref())?;
        let overrides = Overrides {
            schema: self.schema.clone(),
            store: self.store.clone(),
            namespace: self.namespace.clone(),
            naming: self.naming,
            parser: self.parser,
            fan_out,
        };
        Settings::resolve(overrides, file)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Execute documents and print (inserted, updated, deleted, total)
    Apply {
        #[command(flatten)]
        common: CommonArgs,

        /// Update/delete behavior when keys match several rows (apply_all, reject)
        #[arg(long)]
        fan_out: Option<FanOutPolicy>,

        /// Write per-statement outcomes as NDJSON to this file ("-" for stdout)
        #[arg(long)]
        outcomes: Option<PathBuf>,

        /// Documents to apply, in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Parse documents without executing them
    Check {
        #[command(flatten)]
        common: CommonArgs,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print stored rows of an entity type as a JSON array
    Dump {
        #[command(flatten)]
        common: CommonArgs,

        /// Qualified or bare type name
        entity: String,
    },
}

fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Apply { common, fan_out, outcomes, files } => apply(common, fan_out, outcomes, files),
        Commands::Check { common, files } => check(common, files),
        Commands::Dump { common, entity } => dump(common, entity),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn load_registry(settings: &Settings) -> Result<SchemaRegistry, String> {
    let registry = SchemaRegistry::load(&settings.schema).map_err(|e| e.to_string())?;
    tracing::info!(
        "Loaded {} entity types from {}",
        registry.types().count(),
        settings.schema.display()
    );
    Ok(registry)
}

fn apply(
    common: CommonArgs,
    fan_out: Option<FanOutPolicy>,
    outcomes: Option<PathBuf>,
    files: Vec<PathBuf>,
) -> Result<(), String> {
    let settings = common.settings(fan_out)?;
    let registry = load_registry(&settings)?;
    let parse_options = settings.parse_options();

    let mut repository: Box<dyn Repository> = match &settings.store {
        Some(path) => Box::new(JsonFileRepository::open(path, &registry).map_err(|e| e.to_string())?),
        None => Box::new(MemoryRepository::new()),
    };
    let mut executor = Executor::with_options(repository.as_mut(), settings.execute_options());

    let mut report = ExecutionReport::default();
    for file in &files {
        tracing::info!("Applying {}", file.display());
        let document = Document::from_path(file, &registry, &parse_options).map_err(|e| e.to_string())?;
        report.merge(executor.execute(&document));
    }

    let (inserted, updated, deleted, total) = report.counts();
    println!("({}, {}, {}, {})", inserted, updated, deleted, total);

    if let Some(path) = outcomes {
        write_report(&path, &report)?;
    }

    let failed = report.failures().count();
    if failed > 0 {
        for outcome in report.failures() {
            if let Some(error) = &outcome.error {
                eprintln!("  line {}: {} ({})", outcome.line_number, error, outcome.content);
            }
        }
        return Err(format!("{} of {} statements failed", failed, report.outcomes.len()));
    }
    Ok(())
}

fn write_report(path: &Path, report: &ExecutionReport) -> Result<(), String> {
    let result = if path == Path::new("-") {
        write_outcomes(io::stdout().lock(), report)
    } else {
        let file = File::create(path).map_err(|e| format!("Failed to create {}: {}", path.display(), e))?;
        write_outcomes(BufWriter::new(file), report)
    };
    result.map_err(|e| e.to_string())
}

fn check(common: CommonArgs, files: Vec<PathBuf>) -> Result<(), String> {
    let settings = common.settings(None)?;
    let registry = load_registry(&settings)?;
    let parse_options = settings.parse_options();

    for file in &files {
        let document = Document::from_path(file, &registry, &parse_options).map_err(|e| e.to_string())?;
        println!("{}: {} groups, {} statements", file.display(), document.groups().len(), document.statement_count());
        for group in document.groups() {
            let keys: Vec<&str> = group.key_columns().values().map(String::as_str).collect();
            println!(
                "  line {}: {} keys=[{}] statements={}",
                group.location().line_number,
                group.entity_type().qualified_name(),
                keys.join(", "),
                group.statements().len()
            );
        }
    }
    Ok(())
}

fn dump(common: CommonArgs, entity: String) -> Result<(), String> {
    use csvdml::TypeNamespace;

    let settings = common.settings(None)?;
    let registry = load_registry(&settings)?;
    let store = settings
        .store
        .as_ref()
        .ok_or_else(|| "dump needs a store (--store, CSVDML_STORE or csvdml.yaml)".to_string())?;

    let entity_type = registry
        .resolve_type(&entity, settings.namespace.as_deref())
        .map_err(|e| e.to_string())?;
    let repository = JsonFileRepository::open(store, &registry).map_err(|e| e.to_string())?;

    let rows = repository.memory().rows(&entity_type.qualified_name());
    write_entities(io::stdout().lock(), rows).map_err(|e| e.to_string())?;
    println!();
    Ok(())
}
