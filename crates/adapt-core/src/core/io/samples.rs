use crate::core::models::ids::CampaignId;
use crate::core::models::sample::{ArtifactRef, Sample, SampleSeries};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeriesLoadError {
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Non-finite value in row {row} of '{path}'")]
    NonFinite { path: String, row: usize },
}

#[derive(Debug, Deserialize)]
struct SampleRow {
    parameter: f64,
    observable: f64,
    #[serde(default)]
    artifact: Option<String>,
}

/// Reads a `parameter,observable[,artifact]` table into a sample series.
pub fn read_series(path: &Path, campaign: CampaignId) -> Result<SampleSeries, SeriesLoadError> {
    let path_str = path.to_string_lossy().to_string();
    let reader = csv::Reader::from_path(path).map_err(|e| SeriesLoadError::Csv {
        path: path_str.clone(),
        source: e,
    })?;
    collect_rows(reader, campaign, &path_str)
}

pub fn read_series_from<R: Read>(
    source: R,
    campaign: CampaignId,
) -> Result<SampleSeries, SeriesLoadError> {
    collect_rows(csv::Reader::from_reader(source), campaign, "<reader>")
}

fn collect_rows<R: Read>(
    mut reader: csv::Reader<R>,
    campaign: CampaignId,
    path: &str,
) -> Result<SampleSeries, SeriesLoadError> {
    let mut series = SampleSeries::new(campaign);
    for (row, result) in reader.deserialize::<SampleRow>().enumerate() {
        let record = result.map_err(|e| SeriesLoadError::Csv {
            path: path.to_string(),
            source: e,
        })?;
        if !record.parameter.is_finite() || !record.observable.is_finite() {
            return Err(SeriesLoadError::NonFinite {
                path: path.to_string(),
                row: row + 1,
            });
        }
        series.record(Sample::new(
            record.parameter,
            record.observable,
            ArtifactRef::new(record.artifact.unwrap_or_default()),
        ));
    }
    Ok(series)
}
