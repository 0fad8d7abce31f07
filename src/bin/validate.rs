//! Schema Validation CLI
//!
//! Parses a schema document and validates instance files against it.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use jsonschema_engine::{Context, ContextOptions, DirectoryLoader, ValidationMode};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "validate")]
#[command(about = "Validate JSON instances against a JSON Schema")]
struct Cli {
    /// Path to the schema document
    #[arg(short, long)]
    schema: PathBuf,

    /// Directory of schema documents served to external $refs (indexed by $id)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Default dialect URI for documents without $schema
    #[arg(short, long)]
    dialect: Option<Url>,

    /// Format validation mode
    #[arg(short, long, value_enum, default_value = "off")]
    mode: Mode,

    /// Print the full output tree as JSON instead of flattened errors
    #[arg(long)]
    json: bool,

    /// Instance files to validate
    instances: Vec<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Off,
    Known,
    Strict,
}

impl From<Mode> for ValidationMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Off => ValidationMode::Off,
            Mode::Known => ValidationMode::Known,
            Mode::Strict => ValidationMode::Strict,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(all_valid) => {
            if !all_valid {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut options = ContextOptions::default().with_mode(cli.mode.into());
    if let Some(dialect) = cli.dialect {
        options = options.with_default_dialect(dialect);
    }
    if let Some(root) = &cli.root {
        options = options.with_loader(Arc::new(DirectoryLoader::new(root)?));
    }

    let mut ctx = Context::with_options(options);
    let document = serde_json::from_str(&std::fs::read_to_string(&cli.schema)?)?;
    let schema = ctx.parse(document).await?;

    let mut all_valid = true;
    for path in &cli.instances {
        let instance = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        let output = schema.validate(&ctx, &instance)?;

        if cli.json {
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else if output.valid {
            println!("✅ {} - valid", path.display());
        } else {
            println!("❌ {} - INVALID", path.display());
            for row in output.flattened() {
                let at = if row.instance_location.is_empty() {
                    "/".to_string()
                } else {
                    row.instance_location.clone()
                };
                println!("   └─ {} at {} ({})", row.error, at, row.keyword_location);
            }
        }
        all_valid &= output.valid;
    }

    Ok(all_valid)
}
