//! Risreport CLI - turn RIS portal exports into the reading report
//!
//! # Main Commands
//!
//! ```bash
//! risreport transform export.xlsx "Dr. Ruiz"   # writes export-r.xlsx
//! risreport latest --user ddavila               # newest download in ./downloads
//! risreport batch downloads/                    # every export in a directory
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! risreport inspect export.xlsx                 # banner, columns, row count
//! risreport schema                              # print the default output schema
//! risreport validate-schema my-schema.json      # check a custom schema
//! ```

use clap::{Parser, Subcommand};
use risreport::{
    downloads, logs, read_sheet, transform_dir, transform_with_options, OutputSchema, Settings,
    TransformOptions, TransformReport, WriteMode,
};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "risreport")]
#[command(about = "Transform RIS portal spreadsheet exports into the reading report", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by the transforming commands
#[derive(clap::Args, Clone)]
struct OutputArgs {
    /// Custom output schema JSON (default: built-in 14-column report)
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Write through a temporary file, then rename over the destination
    #[arg(long)]
    atomic: bool,

    /// Print a JSON report (with captured logs) to stdout
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform one spreadsheet into <name>-r.<ext>
    Transform {
        /// Source spreadsheet
        input: PathBuf,

        /// Reading physician (default: $RISREPORT_PHYSICIAN or TBD)
        physician: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Transform the newest export in the downloads directory
    Latest {
        /// Downloads directory (default: $RISREPORT_DOWNLOADS_DIR or ./downloads)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Reading physician
        #[arg(short, long)]
        physician: Option<String>,

        /// Rename the export to <user>-leidos-<today> before transforming
        #[arg(short, long)]
        user: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Transform every spreadsheet in a directory
    Batch {
        /// Directory to scan
        dir: PathBuf,

        /// Reading physician
        #[arg(short, long)]
        physician: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show what the reader sees in a source spreadsheet
    Inspect {
        /// Source spreadsheet
        input: PathBuf,
    },

    /// Print the default output schema
    Schema {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a custom output schema file
    ValidateSchema {
        /// Schema JSON file
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let settings = Settings::from_env();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Transform { input, physician, output } => {
            cmd_transform(&settings, &input, physician, &output)
        }

        Commands::Latest { dir, physician, user, output } => {
            cmd_latest(&settings, dir, physician, user.as_deref(), &output)
        }

        Commands::Batch { dir, physician, output } => {
            cmd_batch(&settings, &dir, physician, &output).await
        }

        Commands::Inspect { input } => cmd_inspect(&input),

        Commands::Schema { output } => cmd_schema(output.as_deref()),

        Commands::ValidateSchema { input } => cmd_validate_schema(&input),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn build_options(
    settings: &Settings,
    physician: Option<String>,
    args: &OutputArgs,
) -> Result<TransformOptions, Box<dyn std::error::Error>> {
    let mut options = TransformOptions::from_settings(settings)?;
    if let Some(path) = &args.schema {
        options.schema = OutputSchema::load(path)?;
    }
    if let Some(physician) = physician {
        options.physician = Some(physician);
    }
    if args.atomic {
        options.write_mode = WriteMode::Atomic;
    }
    Ok(options)
}

/// Run one transform, printing a JSON report when asked.
fn run_one(
    source: &Path,
    options: &TransformOptions,
    json_output: bool,
) -> Result<TransformReport, Box<dyn std::error::Error>> {
    let mut rx = json_output.then(|| logs::LOG_BROADCASTER.subscribe());

    let report = transform_with_options(source, options)?;

    if let Some(rx) = rx.as_mut() {
        let entries = logs::drain(rx);
        let out = json!({ "report": &report, "logs": entries });
        println!("{}", serde_json::to_string_pretty(&out)?);
    }
    Ok(report)
}

fn cmd_transform(
    settings: &Settings,
    input: &Path,
    physician: Option<String>,
    args: &OutputArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());
    let options = build_options(settings, physician, args)?;
    let report = run_one(input, &options, args.json)?;

    eprintln!("\n✨ Done! {} rows → {}", report.rows, report.output.display());
    Ok(())
}

fn cmd_latest(
    settings: &Settings,
    dir: Option<PathBuf>,
    physician: Option<String>,
    user: Option<&str>,
    args: &OutputArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = dir.unwrap_or_else(|| settings.downloads_dir.clone());
    eprintln!("🔎 Looking for the newest export in {}", dir.display());

    let mut source = downloads::latest_spreadsheet(&dir)?;
    eprintln!("   Found: {}", source.display());

    if let Some(user) = user {
        let today = chrono::Local::now().date_naive();
        source = downloads::rename_download(&source, user, today)?;
        eprintln!("   Renamed to: {}", source.display());
    }

    let options = build_options(settings, physician, args)?;
    let report = run_one(&source, &options, args.json)?;

    eprintln!("\n✨ Done! {} rows → {}", report.rows, report.output.display());
    Ok(())
}

async fn cmd_batch(
    settings: &Settings,
    dir: &Path,
    physician: Option<String>,
    args: &OutputArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = build_options(settings, physician, args)?;
    let outcomes = transform_dir(dir, &options).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    }

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    eprintln!("\n📊 Results: {} transformed, {} failed", outcomes.len() - failed, failed);

    if failed > 0 {
        return Err(format!("{} file(s) failed", failed).into());
    }
    Ok(())
}

fn cmd_inspect(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let raw = read_sheet(input)?;

    println!("📄 {} (sheet \"{}\")", input.display(), raw.name);
    if let Some(banner) = raw.banner() {
        let text: Vec<String> = banner
            .iter()
            .filter(|c| !c.is_empty())
            .map(|c| c.to_string())
            .collect();
        println!("   Banner: {}", text.join(" | "));
    }

    let columns = raw.column_names()?;
    println!("   Columns ({}):", columns.len());
    for (i, col) in columns.iter().enumerate() {
        println!("   [{:2}] {}", i + 1, col);
    }
    println!("   Data rows: {}", raw.data_rows().len());
    Ok(())
}

fn cmd_schema(output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let json = OutputSchema::report().to_json()?;
    match output {
        Some(p) => {
            fs::write(p, &json)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn cmd_validate_schema(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Validating: {}", input.display());
    let schema = OutputSchema::load(input)?;
    eprintln!(
        "✅ Valid: {} columns, sheet \"{}\"",
        schema.len(),
        schema.sheet_name
    );
    for (i, header) in schema.headers().iter().enumerate() {
        println!("   [{:2}] {}", i + 1, header);
    }
    Ok(())
}
