use crate::error::PipelineResult;
use crate::types::{CleanRecord, ForecastRow, ESSENTIAL_COLUMNS};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

fn write_header(ws: &mut Worksheet, headers: &[&str]) -> PipelineResult<()> {
    let bold = Format::new().set_bold();
    for (col, h) in headers.iter().enumerate() {
        ws.write_string_with_format(0, col as u16, *h, &bold)?;
    }
    Ok(())
}

fn write_opt(ws: &mut Worksheet, row: u32, col: u16, v: Option<f64>) -> PipelineResult<()> {
    if let Some(v) = v {
        ws.write_number(row, col, v)?;
    }
    Ok(())
}

/// Cleaned table, one row per record under the essential column names.
/// Missing counts are left as blank cells. Overwrites `path`.
pub fn write_cleaned(path: &Path, rows: &[CleanRecord]) -> PipelineResult<()> {
    let mut workbook = Workbook::new();
    let ws = workbook.add_worksheet();
    ws.set_name("dados_processados")?;
    write_header(ws, &ESSENTIAL_COLUMNS)?;
    for (i, r) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        ws.write_number(row, 0, r.year as f64)?;
        ws.write_string(row, 1, &r.state)?;
        write_opt(ws, row, 2, r.homicides)?;
        write_opt(ws, row, 3, r.latrocinios)?;
        write_opt(ws, row, 4, r.injury_deaths)?;
    }
    workbook.save(path)?;
    Ok(())
}

pub fn write_forecast(path: &Path, rows: &[ForecastRow]) -> PipelineResult<()> {
    let mut workbook = Workbook::new();
    let ws = workbook.add_worksheet();
    ws.set_name("previsoes")?;
    write_header(ws, &["ano", "Regressão Linear", "Random Forest"])?;
    for (i, r) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        ws.write_number(row, 0, r.year as f64)?;
        ws.write_number(row, 1, r.linear)?;
        ws.write_number(row, 2, r.random_forest)?;
    }
    workbook.save(path)?;
    Ok(())
}

/// Print the first `max_rows` rows as a markdown table.
pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook, Data, Reader, Xlsx};
    use tempfile::tempdir;

    fn read_back(path: &Path) -> Vec<Vec<Data>> {
        let mut wb: Xlsx<_> = open_workbook(path).unwrap();
        let name = wb.sheet_names()[0].clone();
        let range = wb.worksheet_range(&name).unwrap();
        range.rows().map(|r| r.to_vec()).collect()
    }

    #[test]
    fn cleaned_table_round_trips_through_xlsx() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dados_processados.xlsx");
        let rows = vec![
            CleanRecord {
                year: 2019,
                state: "SP".to_string(),
                homicides: Some(100.0),
                latrocinios: None,
                injury_deaths: Some(2.0),
            },
            CleanRecord {
                year: 2020,
                state: "RJ".to_string(),
                homicides: Some(1_000_000.0),
                latrocinios: Some(3.0),
                injury_deaths: None,
            },
        ];
        write_cleaned(&path, &rows).unwrap();

        let cells = read_back(&path);
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0][0], Data::String("ano".to_string()));
        assert_eq!(cells[0][4], Data::String("quantidade_lesao_corporal_morte".to_string()));
        assert_eq!(cells[1][0], Data::Float(2019.0));
        assert_eq!(cells[1][1], Data::String("SP".to_string()));
        assert_eq!(cells[1][3], Data::Empty);
        assert_eq!(cells[2][2], Data::Float(1_000_000.0));
    }

    #[test]
    fn forecast_overwrites_previous_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("previsoes.xlsx");
        let first = vec![ForecastRow {
            year: 2030,
            linear: 1.0,
            random_forest: 2.0,
        }];
        write_forecast(&path, &first).unwrap();
        let second: Vec<ForecastRow> = (2022..2025)
            .map(|year| ForecastRow {
                year,
                linear: 10.0,
                random_forest: 20.0,
            })
            .collect();
        write_forecast(&path, &second).unwrap();

        let cells = read_back(&path);
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[0][1], Data::String("Regressão Linear".to_string()));
        assert_eq!(cells[1][0], Data::Float(2022.0));
        assert_eq!(cells[3][2], Data::Float(20.0));
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing_dir").join("out.xlsx");
        assert!(write_forecast(&path, &[]).is_err());
    }
}
