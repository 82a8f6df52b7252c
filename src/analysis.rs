use crate::types::{
    CleanRecord, ColumnSummary, CorrelationMatrix, StateTotal, YearStatePivot, YearTotal,
    COL_HOMICIDE, COL_INJURY_DEATH, COL_LATROCINIO, COL_YEAR,
};
use crate::util::{average, format_opt, pearson, quantile, std_dev};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Geographic aggregate: homicide and latrocínio sums per state, ordered by
/// state code. Missing counts add nothing.
pub fn aggregate_by_state(data: &[CleanRecord]) -> Vec<StateTotal> {
    let mut map: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    for r in data {
        let e = map.entry(r.state.as_str()).or_insert((0.0, 0.0));
        e.0 += r.homicides.unwrap_or(0.0);
        e.1 += r.latrocinios.unwrap_or(0.0);
    }
    map.into_iter()
        .map(|(state, (homicides, latrocinios))| StateTotal {
            state: state.to_string(),
            homicides,
            latrocinios,
        })
        .collect()
}

/// Same totals sorted for the bar chart: largest homicide sum first, ties by
/// state code.
pub fn states_by_homicides_desc(data: &[CleanRecord]) -> Vec<StateTotal> {
    let mut totals = aggregate_by_state(data);
    totals.sort_by(|a, b| {
        b.homicides
            .partial_cmp(&a.homicides)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.state.cmp(&b.state))
    });
    totals
}

/// Homicide sum per year, ascending.
pub fn aggregate_by_year(data: &[CleanRecord]) -> Vec<YearTotal> {
    let mut map: BTreeMap<i32, f64> = BTreeMap::new();
    for r in data {
        *map.entry(r.year).or_insert(0.0) += r.homicides.unwrap_or(0.0);
    }
    map.into_iter()
        .map(|(year, homicides)| YearTotal { year, homicides })
        .collect()
}

pub fn pivot_year_state(data: &[CleanRecord]) -> YearStatePivot {
    let years: Vec<i32> = data
        .iter()
        .map(|r| r.year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let states: Vec<String> = data
        .iter()
        .map(|r| r.state.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let year_idx: HashMap<i32, usize> = years.iter().enumerate().map(|(i, y)| (*y, i)).collect();
    let state_idx: HashMap<&str, usize> = states
        .iter()
        .enumerate()
        .map(|(i, s)| (s.as_str(), i))
        .collect();

    let mut cells = vec![vec![None; states.len()]; years.len()];
    for r in data {
        let (Some(&row), Some(&col)) = (year_idx.get(&r.year), state_idx.get(r.state.as_str()))
        else {
            continue;
        };
        let cell: &mut Option<f64> = &mut cells[row][col];
        *cell = Some(cell.unwrap_or(0.0) + r.homicides.unwrap_or(0.0));
    }
    YearStatePivot {
        years,
        states,
        cells,
    }
}

/// The numeric columns of the cleaned table, by name.
pub fn numeric_columns(data: &[CleanRecord]) -> Vec<(&'static str, Vec<Option<f64>>)> {
    vec![
        (COL_YEAR, data.iter().map(|r| Some(r.year as f64)).collect()),
        (COL_HOMICIDE, data.iter().map(|r| r.homicides).collect()),
        (COL_LATROCINIO, data.iter().map(|r| r.latrocinios).collect()),
        (COL_INJURY_DEATH, data.iter().map(|r| r.injury_deaths).collect()),
    ]
}

/// Pairwise Pearson correlation among the numeric columns, using only rows
/// where both values are present.
pub fn correlation_matrix(data: &[CleanRecord]) -> CorrelationMatrix {
    let cols = numeric_columns(data);
    let n = cols.len();
    let mut values = vec![vec![None; n]; n];
    for i in 0..n {
        for j in i..n {
            let pairs: Vec<(f64, f64)> = cols[i]
                .1
                .iter()
                .zip(cols[j].1.iter())
                .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
                .collect();
            let r = pearson(&pairs);
            values[i][j] = r;
            values[j][i] = r;
        }
    }
    CorrelationMatrix {
        columns: cols.into_iter().map(|(name, _)| name.to_string()).collect(),
        values,
    }
}

/// count / mean / std / min / quartiles / max per numeric column.
pub fn describe(data: &[CleanRecord]) -> Vec<ColumnSummary> {
    numeric_columns(data)
        .into_iter()
        .map(|(name, col)| {
            let present: Vec<f64> = col.into_iter().flatten().collect();
            let mean = (!present.is_empty()).then(|| average(&present));
            ColumnSummary {
                column: name.to_string(),
                count: present.len(),
                mean: format_opt(mean, 2),
                std: format_opt(std_dev(&present), 2),
                min: format_opt(quantile(present.clone(), 0.0), 2),
                p25: format_opt(quantile(present.clone(), 0.25), 2),
                p50: format_opt(quantile(present.clone(), 0.5), 2),
                p75: format_opt(quantile(present.clone(), 0.75), 2),
                max: format_opt(quantile(present, 1.0), 2),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rec(year: i32, state: &str, hom: Option<f64>, lat: Option<f64>) -> CleanRecord {
        CleanRecord {
            year,
            state: state.to_string(),
            homicides: hom,
            latrocinios: lat,
            injury_deaths: Some(1.0),
        }
    }

    fn sample() -> Vec<CleanRecord> {
        vec![
            rec(2019, "SP", Some(100.0), Some(5.0)),
            rec(2020, "SP", Some(120.0), Some(6.0)),
            rec(2021, "SP", Some(90.0), None),
            rec(2019, "RJ", Some(80.0), Some(3.0)),
            rec(2021, "RJ", None, Some(2.0)),
            rec(2021, "AC", Some(10.0), Some(1.0)),
        ]
    }

    #[test]
    fn state_aggregate_has_one_row_per_state_with_sums() {
        let data = sample();
        let totals = aggregate_by_state(&data);
        assert_eq!(totals.len(), 3);
        let sp = totals.iter().find(|t| t.state == "SP").unwrap();
        assert_eq!(sp.homicides, 310.0);
        assert_eq!(sp.latrocinios, 11.0);
        let rj = totals.iter().find(|t| t.state == "RJ").unwrap();
        assert_eq!(rj.homicides, 80.0);
        assert_eq!(rj.latrocinios, 5.0);
    }

    #[test]
    fn bar_order_is_descending() {
        let order: Vec<String> = states_by_homicides_desc(&sample())
            .into_iter()
            .map(|t| t.state)
            .collect();
        assert_eq!(order, vec!["SP", "RJ", "AC"]);
    }

    #[test]
    fn year_totals_ascending() {
        let totals = aggregate_by_year(&sample());
        let years: Vec<i32> = totals.iter().map(|t| t.year).collect();
        assert_eq!(years, vec![2019, 2020, 2021]);
        assert_eq!(totals[0].homicides, 180.0);
        assert_eq!(totals[2].homicides, 100.0);
    }

    #[test]
    fn pivot_sums_and_leaves_gaps_empty() {
        let mut data = sample();
        data.push(rec(2019, "SP", Some(1.0), None));
        let p = pivot_year_state(&data);
        assert_eq!(p.years, vec![2019, 2020, 2021]);
        assert_eq!(p.states, vec!["AC", "RJ", "SP"]);
        // 2019/SP summed over the duplicate pair
        assert_eq!(p.cells[0][2], Some(101.0));
        // RJ never reported 2020
        assert_eq!(p.cells[1][1], None);
        // RJ 2021 present with a missing count
        assert_eq!(p.cells[2][1], Some(0.0));
    }

    #[test]
    fn correlation_is_symmetric_with_unit_diagonal() {
        let m = correlation_matrix(&sample());
        assert_eq!(m.columns.len(), 4);
        for i in 0..3 {
            assert!((m.values[i][i].unwrap() - 1.0).abs() < 1e-12);
        }
        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(m.values[i][j], m.values[j][i]);
            }
        }
    }

    #[test]
    fn constant_column_has_undefined_correlation() {
        let m = correlation_matrix(&sample());
        // injury deaths is constant in the sample
        assert_eq!(m.values[0][3], None);
    }

    #[test]
    fn describe_counts_present_values() {
        let summary = describe(&sample());
        let hom = summary.iter().find(|s| s.column == COL_HOMICIDE).unwrap();
        assert_eq!(hom.count, 5);
        assert_eq!(hom.max, "120.00");
        assert_eq!(hom.min, "10.00");
    }

    #[test]
    fn empty_table_aggregates_to_nothing() {
        assert!(aggregate_by_state(&[]).is_empty());
        assert!(aggregate_by_year(&[]).is_empty());
        let p = pivot_year_state(&[]);
        assert!(p.cells.is_empty());
    }
}
