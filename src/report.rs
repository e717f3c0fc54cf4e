//! Score report export (CSV, TSV or JSON).

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::Serialize;

use crate::collocation::{CollocationResult, ScoreRecord};
use crate::error::Result;

/// Fixed header of the collocate report.
pub const HEADER: [&str; 3] = ["collocate", "raw_frequency", "MI"];
/// Extra columns written with `--contingency`.
pub const CONTINGENCY_HEADER: [&str; 5] = ["O12", "O21", "C1", "R1", "N"];

/// Output format for export.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, ValueEnum)]
pub enum ExportFormat {
    #[default]
    Csv,
    Tsv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
            ExportFormat::Json => "json",
        }
    }

    fn delimiter(self) -> u8 {
        match self {
            ExportFormat::Tsv => b'\t',
            _ => b',',
        }
    }
}

/// Report options beyond the format.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    pub format: ExportFormat,
    /// Append O12, O21, C1, R1 and N after the fixed columns (or fields, for JSON).
    pub contingency: bool,
}

///Output path for a keyword/window pair: `<out_dir>/<keyword>_<window>.<ext>`.
/// # Example
/// ```
/// use corpus_stats::{ExportFormat, output_path};
/// use std::path::Path;
/// let p = output_path(Path::new("output"), "whale", 5, ExportFormat::Csv);
/// assert_eq!(p, Path::new("output").join("whale_5.csv"));
/// ```
pub fn output_path(
    out_dir: &Path,
    keyword: &str,
    window_size: usize,
    fmt: ExportFormat,
) -> PathBuf {
    out_dir.join(format!("{keyword}_{window_size}.{}", fmt.extension()))
}

/// One element of the JSON array; contingency fields only with `--contingency`.
#[derive(Serialize)]
struct JsonRow<'a> {
    collocate: &'a str,
    raw_frequency: usize,
    #[serde(rename = "MI")]
    mi: f64,
    #[serde(rename = "O12", skip_serializing_if = "Option::is_none")]
    o12: Option<i64>,
    #[serde(rename = "O21", skip_serializing_if = "Option::is_none")]
    o21: Option<i64>,
    #[serde(rename = "C1", skip_serializing_if = "Option::is_none")]
    c1: Option<usize>,
    #[serde(rename = "R1", skip_serializing_if = "Option::is_none")]
    r1: Option<usize>,
    #[serde(rename = "N", skip_serializing_if = "Option::is_none")]
    n: Option<usize>,
}

impl<'a> JsonRow<'a> {
    fn new(r: &'a ScoreRecord, result: &CollocationResult, contingency: bool) -> Self {
        JsonRow {
            collocate: &r.collocate,
            raw_frequency: r.raw_frequency,
            mi: r.mi,
            o12: contingency.then_some(r.o12),
            o21: contingency.then_some(r.o21),
            c1: contingency.then_some(r.c1),
            r1: contingency.then_some(result.r1),
            n: contingency.then_some(result.n),
        }
    }
}

/// Write the report for `result` into any writer.
pub fn write_report_to<W: Write>(
    result: &CollocationResult,
    opts: &ReportOptions,
    mut writer: W,
) -> Result<()> {
    match opts.format {
        ExportFormat::Json => {
            let rows: Vec<JsonRow> = result
                .records
                .iter()
                .map(|r| JsonRow::new(r, result, opts.contingency))
                .collect();
            serde_json::to_writer_pretty(&mut writer, &rows)?;
            writeln!(writer)?;
            writer.flush()?;
        }
        ExportFormat::Csv | ExportFormat::Tsv => {
            let mut wtr = csv::WriterBuilder::new()
                .delimiter(opts.format.delimiter())
                .has_headers(false)
                .from_writer(writer);
            if opts.contingency {
                wtr.write_record(HEADER.iter().chain(CONTINGENCY_HEADER.iter()))?;
                for r in &result.records {
                    wtr.serialize((
                        &r.collocate,
                        r.raw_frequency,
                        r.mi,
                        r.o12,
                        r.o21,
                        r.c1,
                        result.r1,
                        result.n,
                    ))?;
                }
            } else {
                wtr.write_record(HEADER)?;
                for r in &result.records {
                    wtr.serialize((&r.collocate, r.raw_frequency, r.mi))?;
                }
            }
            wtr.flush()?;
        }
    }
    Ok(())
}

/// Write the report to `path`, creating parent directories and replacing any
/// existing file.
pub fn write_report(result: &CollocationResult, opts: &ReportOptions, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file: File = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    write_report_to(result, opts, BufWriter::new(file))
}
