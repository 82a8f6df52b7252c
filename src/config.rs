// Run configuration.
//
// Every stage receives a `&Config` instead of reading process-wide constants,
// so tests can point the pipeline at temporary directories and pin the
// upper year bound.
use chrono::{Datelike, Local};
use std::path::PathBuf;

pub const DEFAULT_INPUT: &str = "data/Anuário Brasileiro de Segurança Pública.xlsx";
pub const DEFAULT_GEOJSON_URL: &str = "https://raw.githubusercontent.com/codeforamerica/click_that_hood/master/public/data/brazil-states.geojson";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MIN_YEAR: i32 = 2000;

/// Line/series colors, in order of use.
pub const DEFAULT_PALETTE: [&str; 5] = ["#2E86AB", "#F24236", "#FF9F1C", "#4CB944", "#6D597A"];

#[derive(Debug, Clone)]
pub struct Config {
    pub input: PathBuf,
    pub layout: OutputLayout,
    pub geojson_url: String,
    /// GeoJSON feature property holding the state code.
    pub geojson_key: String,
    pub http_timeout_secs: u64,
    pub min_year: i32,
    pub max_year: i32,
    pub palette: Vec<String>,
    pub forest_trees: usize,
    pub forest_seed: u64,
}

impl Config {
    pub fn new(input: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            layout: OutputLayout::new(output_root),
            geojson_url: DEFAULT_GEOJSON_URL.to_string(),
            geojson_key: "sigla".to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            min_year: DEFAULT_MIN_YEAR,
            max_year: current_year(),
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            forest_trees: 100,
            forest_seed: 42,
        }
    }

    pub fn with_max_year(mut self, max_year: i32) -> Self {
        self.max_year = max_year;
        self
    }

    pub fn with_min_year(mut self, min_year: i32) -> Self {
        self.min_year = min_year;
        self
    }

    pub fn with_geojson_url(mut self, url: impl Into<String>) -> Self {
        self.geojson_url = url.into();
        self
    }

    pub fn with_http_timeout(mut self, secs: u64) -> Self {
        self.http_timeout_secs = secs;
        self
    }

    /// Palette entry `idx`, wrapping around.
    pub fn color(&self, idx: usize) -> &str {
        if self.palette.is_empty() {
            return DEFAULT_PALETTE[idx % DEFAULT_PALETTE.len()];
        }
        &self.palette[idx % self.palette.len()]
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT, ".")
    }
}

pub fn current_year() -> i32 {
    Local::now().year()
}

/// Directory tree and artifact file names under the output root.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn temporal_dir(&self) -> PathBuf {
        self.root.join("visualizacoes").join("analise_temporal")
    }

    pub fn geographic_dir(&self) -> PathBuf {
        self.root.join("visualizacoes").join("distribuicao_geografica")
    }

    pub fn maps_dir(&self) -> PathBuf {
        self.root.join("visualizacoes").join("mapas_interativos")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.root.join("dados_processados")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn directories(&self) -> Vec<PathBuf> {
        vec![
            self.temporal_dir(),
            self.geographic_dir(),
            self.maps_dir(),
            self.processed_dir(),
            self.logs_dir(),
        ]
    }

    pub fn correlation_heatmap(&self) -> PathBuf {
        self.temporal_dir().join("heatmap_correlacao.png")
    }

    pub fn time_series(&self) -> PathBuf {
        self.temporal_dir().join("serie_temporal_homicidios.png")
    }

    pub fn forecast_chart(&self) -> PathBuf {
        self.temporal_dir().join("previsao_homicidios.png")
    }

    pub fn choropleth(&self) -> PathBuf {
        self.maps_dir().join("mapa_coropletico.html")
    }

    pub fn state_bars(&self) -> PathBuf {
        self.geographic_dir().join("distribuicao_estados.png")
    }

    pub fn temporal_heatmap(&self) -> PathBuf {
        self.geographic_dir().join("mapa_calor_temporal.png")
    }

    pub fn cleaned_xlsx(&self) -> PathBuf {
        self.processed_dir().join("dados_processados.xlsx")
    }

    pub fn forecast_xlsx(&self) -> PathBuf {
        self.processed_dir().join("previsoes.xlsx")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_places_artifacts_under_root() {
        let layout = OutputLayout::new("/tmp/out");
        assert_eq!(
            layout.choropleth(),
            PathBuf::from("/tmp/out/visualizacoes/mapas_interativos/mapa_coropletico.html")
        );
        assert_eq!(
            layout.forecast_xlsx(),
            PathBuf::from("/tmp/out/dados_processados/previsoes.xlsx")
        );
        assert_eq!(layout.directories().len(), 5);
    }

    #[test]
    fn max_year_is_overridable() {
        let cfg = Config::new("in.xlsx", "out").with_max_year(2021);
        assert_eq!(cfg.max_year, 2021);
        assert_eq!(cfg.min_year, DEFAULT_MIN_YEAR);
    }

    #[test]
    fn palette_wraps() {
        let cfg = Config::default();
        assert_eq!(cfg.color(0), "#2E86AB");
        assert_eq!(cfg.color(5), "#2E86AB");
    }
}
