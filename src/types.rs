use serde::Deserialize;
use tabled::Tabled;

pub const COL_YEAR: &str = "ano";
pub const COL_STATE: &str = "sigla_uf";
pub const COL_HOMICIDE: &str = "quantidade_homicidio_doloso";
pub const COL_LATROCINIO: &str = "quantidade_latrocinio";
pub const COL_INJURY_DEATH: &str = "quantidade_lesao_corporal_morte";

/// Columns the loader keeps; everything else in the sheet is ignored.
pub const ESSENTIAL_COLUMNS: [&str; 5] = [
    COL_YEAR,
    COL_STATE,
    COL_HOMICIDE,
    COL_LATROCINIO,
    COL_INJURY_DEATH,
];

fn display_opt(v: &Option<String>) -> String {
    v.clone().unwrap_or_default()
}

/// One source row, still untyped. Empty cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize, Tabled)]
pub struct RawRow {
    #[serde(rename = "ano")]
    #[tabled(rename = "ano", display_with = "display_opt")]
    pub year: Option<String>,
    #[serde(rename = "sigla_uf")]
    #[tabled(rename = "sigla_uf", display_with = "display_opt")]
    pub state: Option<String>,
    #[serde(rename = "quantidade_homicidio_doloso")]
    #[tabled(rename = "homicidio_doloso", display_with = "display_opt")]
    pub homicides: Option<String>,
    #[serde(rename = "quantidade_latrocinio")]
    #[tabled(rename = "latrocinio", display_with = "display_opt")]
    pub latrocinios: Option<String>,
    #[serde(rename = "quantidade_lesao_corporal_morte")]
    #[tabled(rename = "lesao_corporal_morte", display_with = "display_opt")]
    pub injury_deaths: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanRecord {
    pub year: i32,
    pub state: String,
    pub homicides: Option<f64>,
    pub latrocinios: Option<f64>,
    pub injury_deaths: Option<f64>,
}

impl From<&CleanRecord> for RawRow {
    fn from(r: &CleanRecord) -> Self {
        RawRow {
            year: Some(r.year.to_string()),
            state: Some(r.state.clone()),
            homicides: r.homicides.map(|v| v.to_string()),
            latrocinios: r.latrocinios.map(|v| v.to_string()),
            injury_deaths: r.injury_deaths.map(|v| v.to_string()),
        }
    }
}

/// Per-state totals across all years.
#[derive(Debug, Clone, PartialEq)]
pub struct StateTotal {
    pub state: String,
    pub homicides: f64,
    pub latrocinios: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearTotal {
    pub year: i32,
    pub homicides: f64,
}

#[derive(Debug, Clone, PartialEq, Tabled)]
pub struct ForecastRow {
    #[tabled(rename = "ano")]
    pub year: i32,
    #[tabled(rename = "Regressão Linear", display_with = "display_f64")]
    pub linear: f64,
    #[tabled(rename = "Random Forest", display_with = "display_f64")]
    pub random_forest: f64,
}

fn display_f64(v: &f64) -> String {
    crate::util::format_number(*v, 2)
}

/// Years x states matrix of homicide sums. `cells[row][col]` is `None`
/// when that (year, state) pair never occurs.
#[derive(Debug, Clone, PartialEq)]
pub struct YearStatePivot {
    pub years: Vec<i32>,
    pub states: Vec<String>,
    pub cells: Vec<Vec<Option<f64>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

/// Descriptive statistics for one numeric column.
#[derive(Debug, Clone, Tabled)]
pub struct ColumnSummary {
    #[tabled(rename = "column")]
    pub column: String,
    #[tabled(rename = "count")]
    pub count: usize,
    #[tabled(rename = "mean")]
    pub mean: String,
    #[tabled(rename = "std")]
    pub std: String,
    #[tabled(rename = "min")]
    pub min: String,
    #[tabled(rename = "25%")]
    pub p25: String,
    #[tabled(rename = "50%")]
    pub p50: String,
    #[tabled(rename = "75%")]
    pub p75: String,
    #[tabled(rename = "max")]
    pub max: String,
}
