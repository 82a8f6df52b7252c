use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Spreadsheet read error: {0}")]
    Spreadsheet(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("Missing essential columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("Column '{0}' has no values in any row")]
    EmptyColumn(String),

    #[error("Year column holds no numeric value")]
    InvalidYearColumn,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Chart error: {0}")]
    Chart(String),

    #[error("Forecast error: {0}")]
    Forecast(String),

    #[error("Excel write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
