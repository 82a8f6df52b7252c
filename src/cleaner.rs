use crate::error::{PipelineError, PipelineResult};
use crate::types::{CleanRecord, RawRow, COL_STATE, COL_YEAR};
use crate::util::{parse_f64_safe, parse_year};
use std::collections::HashSet;
use tracing::info;

pub const HOMICIDE_CEILING: f64 = 1_000_000.0;
pub const LATROCINIO_CEILING: f64 = 100_000.0;

#[derive(Debug, Clone, Copy)]
pub struct CleanOptions {
    pub min_year: i32,
    /// Inclusive upper bound; callers pass the current year unless a run has
    /// to be reproducible.
    pub max_year: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub input_rows: usize,
    pub missing_key: usize,
    pub invalid_year: usize,
    pub out_of_range: usize,
    pub duplicates: usize,
    pub clipped_values: usize,
    pub output_rows: usize,
}

/// Turn the raw table into the cleaned table.
///
/// Rows without year or state are dropped, years that do not coerce to an
/// integer are dropped, homicide and latrocínio counts are clipped to their
/// ceilings, rows outside `[min_year, max_year]` are dropped and exact
/// duplicates are removed (first one wins).
pub fn clean(
    raw: &[RawRow],
    opts: &CleanOptions,
) -> PipelineResult<(Vec<CleanRecord>, CleanReport)> {
    let mut report = CleanReport {
        input_rows: raw.len(),
        ..Default::default()
    };

    if !raw.is_empty() {
        if raw.iter().all(|r| r.year.is_none()) {
            return Err(PipelineError::EmptyColumn(COL_YEAR.to_string()));
        }
        if raw.iter().all(|r| r.state.is_none()) {
            return Err(PipelineError::EmptyColumn(COL_STATE.to_string()));
        }
    }

    let keyed: Vec<&RawRow> = raw
        .iter()
        .filter(|r| r.year.is_some() && r.state.is_some())
        .collect();
    report.missing_key = raw.len() - keyed.len();

    let mut typed = Vec::with_capacity(keyed.len());
    for row in &keyed {
        let Some(year) = parse_year(row.year.as_deref()) else {
            report.invalid_year += 1;
            continue;
        };
        let state = match row.state.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => continue,
        };
        let (homicides, h_clipped) = clip(
            parse_f64_safe(row.homicides.as_deref()),
            HOMICIDE_CEILING,
        );
        let (latrocinios, l_clipped) = clip(
            parse_f64_safe(row.latrocinios.as_deref()),
            LATROCINIO_CEILING,
        );
        report.clipped_values += h_clipped as usize + l_clipped as usize;
        typed.push(CleanRecord {
            year,
            state,
            homicides,
            latrocinios,
            injury_deaths: parse_f64_safe(row.injury_deaths.as_deref()).map(normalize_zero),
        });
    }
    if !keyed.is_empty() && report.invalid_year == keyed.len() {
        return Err(PipelineError::InvalidYearColumn);
    }

    let typed_rows = typed.len();
    let in_range: Vec<CleanRecord> = typed
        .into_iter()
        .filter(|r| (opts.min_year..=opts.max_year).contains(&r.year))
        .collect();
    report.out_of_range = typed_rows - in_range.len();

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(in_range.len());
    for r in in_range {
        if seen.insert(dedup_key(&r)) {
            out.push(r);
        } else {
            report.duplicates += 1;
        }
    }
    report.output_rows = out.len();

    info!(
        input = report.input_rows,
        output = report.output_rows,
        missing_key = report.missing_key,
        invalid_year = report.invalid_year,
        out_of_range = report.out_of_range,
        duplicates = report.duplicates,
        clipped = report.clipped_values,
        "cleaning finished"
    );
    Ok((out, report))
}

/// Clamp to `[0, ceiling]`, reporting whether the value moved.
fn clip(v: Option<f64>, ceiling: f64) -> (Option<f64>, bool) {
    match v {
        Some(x) => {
            let c = normalize_zero(x.clamp(0.0, ceiling));
            (Some(c), c != x)
        }
        None => (None, false),
    }
}

// -0.0 would otherwise hash differently from 0.0.
fn normalize_zero(x: f64) -> f64 {
    x + 0.0
}

type DedupKey = (i32, String, Option<u64>, Option<u64>, Option<u64>);

fn dedup_key(r: &CleanRecord) -> DedupKey {
    (
        r.year,
        r.state.clone(),
        r.homicides.map(f64::to_bits),
        r.latrocinios.map(f64::to_bits),
        r.injury_deaths.map(f64::to_bits),
    )
}
