//! Costplan CLI - extraction reports over a workbook dump
//!
//! Workbook loading from native spreadsheet formats lives elsewhere;
//! this tool consumes an already-extracted grid dumped as JSON:
//!
//! ```json
//! {
//!   "sheets": [
//!     {
//!       "name": "Плитн. материалы",
//!       "cells": [
//!         { "ref": "A1", "value": "Бок" },
//!         { "ref": "M8", "formula": "=SUM(M1:M6)", "value": 1210 }
//!       ]
//!     }
//!   ]
//! }
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use costplan_core::{CellValue, Workbook};
use costplan_extract::{
    build_breakdown, build_summary, resolve_anchors, trace_leaves, AnchorKey, BreakdownOptions,
    CoverageBand, SummaryOptions, TraceOptions,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "costplan")]
#[command(author, version, about = "Cost-model extraction from spreadsheet dumps")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the summary anchors of a workbook
    Anchors {
        /// Workbook JSON dump
        input: PathBuf,
    },

    /// Reconstruct the cost breakdown behind an anchor
    Breakdown {
        /// Workbook JSON dump
        input: PathBuf,

        /// Anchor cell reference (e.g. "'Плитн. материалы'!B14")
        #[arg(short, long)]
        anchor: Option<String>,

        /// Resolve the anchor by key instead (e.g. board_cost)
        #[arg(short, long)]
        key: Option<AnchorKey>,

        /// Coverage acceptance band
        #[arg(short, long, default_value = "standard")]
        band: Band,

        /// Default sheet for an unqualified --anchor reference
        #[arg(short, long)]
        sheet: Option<String>,
    },

    /// Trace a reference down to its leaf cells
    Trace {
        /// Workbook JSON dump
        input: PathBuf,

        /// Root reference (e.g. "Расчет!D92")
        reference: String,

        /// Maximum trace depth
        #[arg(short, long, default_value_t = costplan_extract::config::DEFAULT_MAX_TRACE_DEPTH)]
        max_depth: usize,

        /// Default sheet for an unqualified root reference
        #[arg(short, long)]
        sheet: Option<String>,
    },

    /// Run the full extraction summary
    Summary {
        /// Workbook JSON dump
        input: PathBuf,
    },

    /// Show information about a workbook dump
    Info {
        /// Workbook JSON dump
        input: PathBuf,
    },
}

/// Coverage band presets, selectable per invocation
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Band {
    /// 0.99 - 1.01
    Tight,
    /// 0.95 - 1.05
    Standard,
    /// 0.85 - 1.15
    Relaxed,
}

impl From<Band> for CoverageBand {
    fn from(band: Band) -> Self {
        match band {
            Band::Tight => CoverageBand::TIGHT,
            Band::Standard => CoverageBand::STANDARD,
            Band::Relaxed => CoverageBand::RELAXED,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Anchors { input } => anchors(&input),
        Commands::Breakdown {
            input,
            anchor,
            key,
            band,
            sheet,
        } => breakdown(&input, anchor.as_deref(), key, band, sheet),
        Commands::Trace {
            input,
            reference,
            max_depth,
            sheet,
        } => trace(&input, &reference, max_depth, sheet.as_deref()),
        Commands::Summary { input } => summary(&input),
        Commands::Info { input } => info(&input),
    }
}

// === Workbook dump model ===

#[derive(Deserialize)]
struct WorkbookDoc {
    sheets: Vec<SheetDoc>,
}

#[derive(Deserialize)]
struct SheetDoc {
    name: String,
    #[serde(default)]
    cells: Vec<CellDoc>,
}

#[derive(Deserialize)]
struct CellDoc {
    #[serde(rename = "ref")]
    cell_ref: String,
    #[serde(default)]
    value: Option<serde_json::Value>,
    #[serde(default)]
    formula: Option<String>,
}

fn json_to_cell_value(value: &serde_json::Value) -> CellValue {
    match value {
        serde_json::Value::Null => CellValue::Empty,
        serde_json::Value::Number(n) => n
            .as_f64()
            .map(CellValue::Number)
            .unwrap_or(CellValue::Empty),
        serde_json::Value::String(s) => CellValue::Text(s.clone()),
        serde_json::Value::Bool(b) => CellValue::Number(if *b { 1.0 } else { 0.0 }),
        other => CellValue::Text(other.to_string()),
    }
}

fn load_workbook(path: &Path) -> Result<Workbook> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    let doc: WorkbookDoc = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse '{}'", path.display()))?;

    let mut workbook = Workbook::empty();
    for sheet_doc in doc.sheets {
        workbook
            .add_worksheet_with_name(&sheet_doc.name)
            .with_context(|| format!("Bad sheet '{}'", sheet_doc.name))?;
        let sheet = workbook
            .worksheet_by_name_mut(&sheet_doc.name)
            .expect("sheet just added");

        for cell in sheet_doc.cells {
            let result = match (&cell.formula, &cell.value) {
                (Some(formula), Some(value)) => sheet.set_formula_with_cached(
                    &cell.cell_ref,
                    formula,
                    json_to_cell_value(value),
                ),
                (Some(formula), None) => sheet.set_formula(&cell.cell_ref, formula),
                (None, Some(value)) => sheet.set_value(&cell.cell_ref, json_to_cell_value(value)),
                (None, None) => Ok(()),
            };
            result.with_context(|| {
                format!("Bad cell '{}' on sheet '{}'", cell.cell_ref, sheet_doc.name)
            })?;
        }
    }

    Ok(workbook)
}

// === Commands ===

fn anchors(input: &Path) -> Result<()> {
    let workbook = load_workbook(input)?;
    let resolved = resolve_anchors(&workbook);

    let mut report = serde_json::Map::new();
    for key in AnchorKey::ALL {
        let value = resolved
            .get(&key)
            .map(|r| serde_json::Value::String(r.to_string()))
            .unwrap_or(serde_json::Value::Null);
        report.insert(key.as_str().to_string(), value);
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn breakdown(
    input: &Path,
    anchor: Option<&str>,
    key: Option<AnchorKey>,
    band: Band,
    sheet: Option<String>,
) -> Result<()> {
    let workbook = load_workbook(input)?;

    let anchor_ref = match (anchor, key) {
        (Some(reference), None) => reference.to_string(),
        (None, Some(key)) => {
            let resolved = resolve_anchors(&workbook);
            match resolved.get(&key) {
                Some(r) => r.to_string(),
                None => bail!("anchor key '{}' did not resolve in this workbook", key),
            }
        }
        (Some(_), Some(_)) => bail!("pass either --anchor or --key, not both"),
        (None, None) => bail!("one of --anchor or --key is required"),
    };

    let options = BreakdownOptions {
        coverage_band: band.into(),
        default_sheet: sheet,
    };
    let result = build_breakdown(&workbook, &anchor_ref, &options);

    if !result.usable {
        eprintln!(
            "warning: breakdown of {} is not usable (coverage {:?}); rows are best-effort",
            anchor_ref, result.coverage
        );
    }
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn trace(input: &Path, reference: &str, max_depth: usize, sheet: Option<&str>) -> Result<()> {
    let workbook = load_workbook(input)?;
    let result = trace_leaves(&workbook, reference, sheet, &TraceOptions { max_depth });

    if result.tree.is_empty() {
        eprintln!("warning: '{}' did not resolve to any cell", reference);
    }
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn summary(input: &Path) -> Result<()> {
    let workbook = load_workbook(input)?;
    let result = build_summary(&workbook, &SummaryOptions::default());
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn info(input: &Path) -> Result<()> {
    let workbook = load_workbook(input)?;

    println!("File: {}", input.display());
    println!("Sheets: {}", workbook.sheet_count());

    for (i, sheet) in workbook.worksheets().enumerate() {
        let formula_count = sheet.formula_cells().count();

        println!();
        println!("  Sheet {}: \"{}\"", i, sheet.name());
        match sheet.used_range() {
            Some(range) => println!(
                "    Used range: {} ({} cells stored)",
                range,
                sheet.cell_count()
            ),
            None => println!("    Used range: empty"),
        }
        println!("    Formulas: {}", formula_count);
    }

    Ok(())
}
