use crate::error::{PipelineError, PipelineResult};
use crate::types::{RawRow, ESSENTIAL_COLUMNS};
use calamine::{open_workbook_auto, Data, Reader};
use csv::{ReaderBuilder, Trim};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_rows: usize,
    pub parse_errors: usize,
    /// Worksheet name for workbooks, file name for CSV.
    pub source: String,
}

/// Read the raw table, restricted to the essential columns.
///
/// Workbooks (`xlsx`, `xls`, `xlsb`, `ods`) go through calamine and use the
/// first worksheet; `csv` goes through the csv reader. The header row must
/// name every essential column.
pub fn load(path: &Path) -> PipelineResult<(Vec<RawRow>, LoadReport)> {
    if !path.exists() {
        return Err(PipelineError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} not found", path.display()),
        )));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let (rows, report) = match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => load_workbook(path)?,
        "csv" => load_csv(path)?,
        other => {
            return Err(PipelineError::UnsupportedFormat(format!(
                "'{}' ({})",
                other,
                path.display()
            )))
        }
    };
    info!(
        rows = report.total_rows,
        parse_errors = report.parse_errors,
        source = %report.source,
        "raw table loaded"
    );
    Ok((rows, report))
}

fn load_workbook(path: &Path) -> PipelineResult<(Vec<RawRow>, LoadReport)> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| PipelineError::Spreadsheet(format!("failed to open workbook: {}", e)))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let sheet_name = sheet_names
        .first()
        .cloned()
        .ok_or_else(|| PipelineError::Spreadsheet("workbook has no sheets".to_string()))?;
    debug!(sheet = %sheet_name, sheets = sheet_names.len(), "reading first worksheet");

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| PipelineError::Spreadsheet(format!("failed to read '{}': {}", sheet_name, e)))?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = rows_iter
        .next()
        .map(|row| {
            row.iter()
                .map(|cell| cell_to_string(cell).unwrap_or_default())
                .collect()
        })
        .unwrap_or_default();
    let idx = column_indices(&headers)?;

    let mut rows = Vec::new();
    for row in rows_iter {
        let cell = |i: usize| row.get(i).and_then(cell_to_string);
        rows.push(RawRow {
            year: cell(idx[0]),
            state: cell(idx[1]),
            homicides: cell(idx[2]),
            latrocinios: cell(idx[3]),
            injury_deaths: cell(idx[4]),
        });
    }

    let report = LoadReport {
        total_rows: rows.len(),
        parse_errors: 0,
        source: sheet_name,
    };
    Ok((rows, report))
}

fn load_csv(path: &Path) -> PipelineResult<(Vec<RawRow>, LoadReport)> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)?;
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    column_indices(&headers)?;

    let mut rows = Vec::new();
    let mut parse_errors = 0usize;
    for result in rdr.deserialize::<RawRow>() {
        match result {
            Ok(r) => rows.push(normalize(r)),
            Err(e) => {
                debug!(error = %e, "skipping malformed CSV record");
                parse_errors += 1;
            }
        }
    }

    let report = LoadReport {
        total_rows: rows.len(),
        parse_errors,
        source: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    Ok((rows, report))
}

/// Position of each essential column in the header, in `ESSENTIAL_COLUMNS`
/// order.
fn column_indices(headers: &[String]) -> PipelineResult<[usize; 5]> {
    let mut idx = [0usize; 5];
    let mut missing = Vec::new();
    for (slot, name) in ESSENTIAL_COLUMNS.iter().enumerate() {
        match headers.iter().position(|h| h.trim() == *name) {
            Some(i) => idx[slot] = i,
            None => missing.push(name.to_string()),
        }
    }
    if missing.is_empty() {
        Ok(idx)
    } else {
        Err(PipelineError::Schema { missing })
    }
}

/// Cell text as the cleaner expects it: integral floats lose their `.0`,
/// blanks and error cells become `None`.
fn cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => non_blank(s),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", *f as i64)),
        Data::Float(f) => Some(f.to_string()),
        other => non_blank(&other.to_string()),
    }
}

fn non_blank(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}

fn normalize(r: RawRow) -> RawRow {
    let clean = |v: Option<String>| v.as_deref().and_then(non_blank);
    RawRow {
        year: clean(r.year),
        state: clean(r.state),
        homicides: clean(r.homicides),
        latrocinios: clean(r.latrocinios),
        injury_deaths: clean(r.injury_deaths),
    }
}
