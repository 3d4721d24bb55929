//! snadmin CLI - Ingest organizational charts into bulk-import tables
//!
//! # Main Commands
//!
//! ```bash
//! snadmin ingest organigramme.txt          # Text chart to CSV tables
//! snadmin ingest annuaire.xlsx --format xml
//! snadmin ingest annuaire.xlsx --list-sheets
//! ```
//!
//! # Post-processing Commands
//!
//! ```bash
//! snadmin mapping-template data/generated  # Write ministry_codes.csv
//! snadmin remap data/generated --mapping ministry_codes.csv
//! snadmin polish data/generated            # Title case, codes, duplicates
//! snadmin normalize data/generated         # Re-validate contact fields
//! ```

use clap::{Parser, Subcommand};
use snadmin::logs::set_verbose;
use snadmin::{
    ingest, list_source_sheets, normalize_tables, polish_tables, remap_tables,
    write_mapping_template, FixMode, Level, OutputFormat, PipelineError, PipelineOptions,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "snadmin")]
#[command(about = "Ingest Senegal's administration hierarchy into bulk-import tables", long_about = None)]
struct Cli {
    /// Print debug messages
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a chart, document or workbook and write the import tables
    Ingest {
        /// Input file (.txt, .docx, .xlsx, .xls, .ods, .csv) or directory of CSV sheets
        input: PathBuf,

        /// Output directory
        #[arg(short, long, env = "SNADMIN_OUTPUT_DIR", default_value = "data/generated")]
        output_dir: PathBuf,

        /// Level to write: all, ministry, category, direction, service or agent
        #[arg(short, long, default_value = "all")]
        level: String,

        /// Output format: csv or xml
        #[arg(short, long, default_value = "csv")]
        format: OutputFormat,

        /// Keep invalid contact values instead of blanking them
        #[arg(long)]
        strict: bool,

        /// Title-case names (acronyms, French function words)
        #[arg(long)]
        smart_case: bool,

        /// Ministry code mapping applied after extraction
        #[arg(short, long)]
        mapping: Option<PathBuf>,

        /// Also write the flat four-column dump
        #[arg(long)]
        with_levels: bool,

        /// Only list the sheets of the source and exit
        #[arg(long)]
        list_sheets: bool,
    },

    /// Write the ministry code-mapping template from generated tables
    MappingTemplate {
        /// Directory of generated tables
        dir: PathBuf,

        /// Template file (default: <dir>/ministry_codes.csv)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Apply a ministry code mapping to generated tables
    Remap {
        /// Directory of generated tables
        dir: PathBuf,

        /// Filled-in code mapping
        #[arg(short, long)]
        mapping: PathBuf,
    },

    /// Clean names and codes, drop duplicates in generated tables
    Polish {
        /// Directory of generated tables
        dir: PathBuf,
    },

    /// Re-validate contact fields of generated tables
    Normalize {
        /// Directory of generated tables
        dir: PathBuf,

        /// Keep invalid contact values instead of blanking them
        #[arg(long)]
        strict: bool,
    },
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    set_verbose(cli.verbose);

    let result = match cli.command {
        Commands::Ingest {
            input,
            output_dir,
            level,
            format,
            strict,
            smart_case,
            mapping,
            with_levels,
            list_sheets,
        } => {
            if list_sheets {
                cmd_list_sheets(&input)
            } else {
                parse_level(&level).and_then(|level| {
                    let options = PipelineOptions {
                        fix_mode: fix_mode(strict),
                        smart_case,
                        level,
                        format,
                        with_levels,
                        mapping,
                    };
                    cmd_ingest(&input, &output_dir, &options)
                })
            }
        }

        Commands::MappingTemplate { dir, out } => cmd_mapping_template(&dir, out.as_deref()),

        Commands::Remap { dir, mapping } => cmd_remap(&dir, &mapping),

        Commands::Polish { dir } => cmd_polish(&dir),

        Commands::Normalize { dir, strict } => cmd_normalize(&dir, fix_mode(strict)),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        let code = e.downcast_ref::<PipelineError>().map_or(1, PipelineError::exit_code);
        std::process::exit(code);
    }
}

fn fix_mode(strict: bool) -> FixMode {
    if strict {
        FixMode::Strict
    } else {
        FixMode::Fix
    }
}

fn parse_level(level: &str) -> Result<Option<Level>, Box<dyn std::error::Error>> {
    if level.trim().eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    Ok(Some(level.parse::<Level>()?))
}

fn cmd_list_sheets(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📋 Sheets in: {}", input.display());
    for name in list_source_sheets(input)? {
        println!("{}", name);
    }
    Ok(())
}

fn cmd_ingest(input: &Path, output_dir: &Path, options: &PipelineOptions) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());
    if let Some(level) = options.level {
        eprintln!("   Level: {}", level);
    }
    if let Some(ref mapping) = options.mapping {
        eprintln!("   Mapping: {}", mapping.display());
    }

    let outcome = ingest(input, output_dir, options)?;

    eprintln!("\n📊 {}", outcome.report.summary());
    for path in &outcome.written {
        eprintln!("   💾 {}", path.display());
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_mapping_template(dir: &Path, out: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let (path, rows) = write_mapping_template(dir, out)?;
    eprintln!("✅ {} ministries written to: {}", rows, path.display());
    eprintln!("   Fill in the desired_code column, then run 'snadmin remap'.");
    Ok(())
}

fn cmd_remap(dir: &Path, mapping: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("🔁 Remapping: {}", dir.display());
    let summary = remap_tables(dir, mapping)?;

    eprintln!("   Ministries remapped: {}", summary.remapped);
    eprintln!("   References updated: {}", summary.references_updated);
    if !summary.conflicts.is_empty() {
        eprintln!("   ⚠️  {} conflicts:", summary.conflicts.len());
        for conflict in summary.conflicts.iter().take(10) {
            eprintln!("     - {}", conflict);
        }
    }
    Ok(())
}

fn cmd_polish(dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✨ Polishing: {}", dir.display());
    let summary = polish_tables(dir)?;

    eprintln!("   Names retitled: {}", summary.renamed);
    eprintln!("   Codes fixed: {}", summary.codes_fixed);
    eprintln!("   Duplicates removed: {}", summary.duplicates_removed);
    eprintln!("   References moved: {}", summary.references_moved);
    Ok(())
}

fn cmd_normalize(dir: &Path, mode: FixMode) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Normalizing: {}", dir.display());
    let report = normalize_tables(dir, mode)?;
    eprintln!("\n📊 {}", report.summary());
    Ok(())
}
