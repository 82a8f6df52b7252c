use crate::analysis::{
    aggregate_by_state, aggregate_by_year, correlation_matrix, pivot_year_state,
    states_by_homicides_desc,
};
use crate::charts::{self, hex_color};
use crate::choropleth;
use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::types::CleanRecord;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    CorrelationHeatmap,
    TimeSeries,
    Choropleth,
    StateBars,
    TemporalHeatmap,
}

impl Artifact {
    pub fn name(&self) -> &'static str {
        match self {
            Artifact::CorrelationHeatmap => "correlation heatmap",
            Artifact::TimeSeries => "time series",
            Artifact::Choropleth => "choropleth map",
            Artifact::StateBars => "state bar chart",
            Artifact::TemporalHeatmap => "temporal heatmap",
        }
    }
}

#[derive(Debug)]
pub struct ArtifactOutcome {
    pub artifact: Artifact,
    pub path: PathBuf,
    pub result: PipelineResult<()>,
}

#[derive(Debug, Default)]
pub struct VisualizationReport {
    pub outcomes: Vec<ArtifactOutcome>,
}

impl VisualizationReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }
}

fn chart(r: charts::ChartResult) -> PipelineResult<()> {
    r.map_err(|e| PipelineError::Chart(e.to_string()))
}

/// Produce every chart. Each artifact is attempted regardless of how the
/// others went; failures are logged and recorded, never propagated.
pub fn generate_all(data: &[CleanRecord], config: &Config) -> VisualizationReport {
    let layout = &config.layout;
    let mut report = VisualizationReport::default();
    let mut attempt = |artifact: Artifact, path: PathBuf, run: &dyn Fn(&PathBuf) -> PipelineResult<()>| {
        info!(artifact = artifact.name(), "rendering");
        let result = run(&path);
        match &result {
            Ok(()) => info!(artifact = artifact.name(), path = %path.display(), "saved"),
            Err(e) => error!(artifact = artifact.name(), error = %e, "rendering failed"),
        }
        report.outcomes.push(ArtifactOutcome {
            artifact,
            path,
            result,
        });
    };

    attempt(
        Artifact::CorrelationHeatmap,
        layout.correlation_heatmap(),
        &|p| chart(charts::correlation_heatmap(&correlation_matrix(data), p)),
    );

    let line_color = hex_color(config.color(0));
    attempt(Artifact::TimeSeries, layout.time_series(), &|p| {
        chart(charts::time_series(&aggregate_by_year(data), line_color, p))
    });

    let timeout = Duration::from_secs(config.http_timeout_secs);
    attempt(Artifact::Choropleth, layout.choropleth(), &|p| {
        choropleth::write_choropleth(
            &aggregate_by_state(data),
            &config.geojson_url,
            &config.geojson_key,
            timeout,
            p,
        )
    });

    attempt(Artifact::StateBars, layout.state_bars(), &|p| {
        chart(charts::state_bars(&states_by_homicides_desc(data), p))
    });

    attempt(Artifact::TemporalHeatmap, layout.temporal_heatmap(), &|p| {
        chart(charts::temporal_heatmap(&pivot_year_state(data), p))
    });

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::prepare_output_dirs;
    use tempfile::tempdir;

    fn outcome(report: &VisualizationReport, artifact: Artifact) -> &ArtifactOutcome {
        report
            .outcomes
            .iter()
            .find(|o| o.artifact == artifact)
            .unwrap()
    }

    fn data() -> Vec<CleanRecord> {
        [(2019, "SP", 100.0), (2020, "SP", 120.0), (2021, "SP", 90.0), (2020, "RJ", 40.0)]
            .iter()
            .map(|&(year, state, hom)| CleanRecord {
                year,
                state: state.to_string(),
                homicides: Some(hom),
                latrocinios: Some(hom / 10.0),
                injury_deaths: Some(1.0),
            })
            .collect()
    }

    #[test]
    fn geometry_failure_does_not_stop_other_artifacts() {
        let dir = tempdir().unwrap();
        let config = Config::new("unused.xlsx", dir.path())
            .with_max_year(2024)
            .with_geojson_url("http://127.0.0.1:9/brazil-states.geojson")
            .with_http_timeout(2);
        prepare_output_dirs(&config);

        let report = generate_all(&data(), &config);

        assert_eq!(report.outcomes.len(), 5);
        let map = outcome(&report, Artifact::Choropleth);
        assert!(matches!(map.result, Err(PipelineError::Http(_))));
        assert!(!map.path.exists());

        for artifact in [
            Artifact::CorrelationHeatmap,
            Artifact::TimeSeries,
            Artifact::StateBars,
            Artifact::TemporalHeatmap,
        ] {
            let produced = outcome(&report, artifact);
            assert!(produced.result.is_ok(), "{:?}", produced.result);
            assert!(produced.path.exists(), "{}", produced.path.display());
        }
        assert_eq!(report.succeeded(), 4);
    }

    #[test]
    fn empty_table_fails_data_driven_artifacts() {
        let dir = tempdir().unwrap();
        let config = Config::new("unused.xlsx", dir.path())
            .with_geojson_url("http://127.0.0.1:9/x")
            .with_http_timeout(1);
        prepare_output_dirs(&config);

        let report = generate_all(&[], &config);
        assert_eq!(report.outcomes.len(), 5);
        for artifact in [
            Artifact::TimeSeries,
            Artifact::Choropleth,
            Artifact::StateBars,
            Artifact::TemporalHeatmap,
        ] {
            assert!(outcome(&report, artifact).result.is_err());
        }
    }
}
