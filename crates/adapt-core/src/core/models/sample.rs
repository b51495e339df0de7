use super::ids::CampaignId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Reference to an upstream output (a structure, a log) that produced a sample.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(String);

impl ArtifactRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub parameter: f64,
    pub observable: f64,
    pub artifact: ArtifactRef,
}

impl Sample {
    pub fn new(parameter: f64, observable: f64, artifact: ArtifactRef) -> Self {
        Self {
            parameter,
            observable,
            artifact,
        }
    }

    fn order(&self, other: &Self) -> Ordering {
        self.parameter
            .total_cmp(&other.parameter)
            .then_with(|| self.observable.total_cmp(&other.observable))
            .then_with(|| self.artifact.cmp(&other.artifact))
    }
}

/// The samples gathered for one campaign, kept ordered by parameter.
///
/// The series is append-only: samples are never removed or rewritten once
/// recorded. Ordering is total over `(parameter, observable, artifact)`, so
/// the final series does not depend on the order in which samples arrived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleSeries {
    campaign: CampaignId,
    samples: Vec<Sample>,
}

impl SampleSeries {
    pub fn new(campaign: CampaignId) -> Self {
        Self {
            campaign,
            samples: Vec::new(),
        }
    }

    pub fn from_samples(campaign: CampaignId, samples: impl IntoIterator<Item = Sample>) -> Self {
        let mut series = Self::new(campaign);
        for sample in samples {
            series.record(sample);
        }
        series
    }

    pub fn record(&mut self, sample: Sample) {
        let position = self
            .samples
            .partition_point(|existing| existing.order(&sample) != Ordering::Greater);
        self.samples.insert(position, sample);
    }

    pub fn campaign(&self) -> &CampaignId {
        &self.campaign
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// `(parameter, observable)` pairs in ascending parameter order.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.samples
            .iter()
            .map(|s| (s.parameter, s.observable))
            .collect()
    }

    pub fn parameter_range(&self) -> Option<(f64, f64)> {
        let first = self.samples.first()?;
        let last = self.samples.last()?;
        Some((first.parameter, last.parameter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(parameter: f64, observable: f64) -> Sample {
        Sample::new(parameter, observable, ArtifactRef::new(format!("run-{parameter}")))
    }

    #[test]
    fn record_keeps_samples_sorted_by_parameter() {
        let mut series = SampleSeries::new(CampaignId::new("c"));
        series.record(sample(1.5, -0.2));
        series.record(sample(0.5, 0.4));
        series.record(sample(1.0, -0.1));

        let parameters: Vec<f64> = series.samples().iter().map(|s| s.parameter).collect();
        assert_eq!(parameters, vec![0.5, 1.0, 1.5]);
        assert_eq!(series.parameter_range(), Some((0.5, 1.5)));
    }

    #[test]
    fn arrival_order_does_not_change_series() {
        let samples = vec![
            sample(2.0, 0.1),
            sample(1.0, -0.3),
            sample(1.0, -0.5),
            sample(0.5, 0.7),
        ];
        let forward = SampleSeries::from_samples(CampaignId::new("c"), samples.clone());
        let backward =
            SampleSeries::from_samples(CampaignId::new("c"), samples.into_iter().rev());

        assert_eq!(forward, backward);
    }

    #[test]
    fn empty_series_has_no_range() {
        let series = SampleSeries::new(CampaignId::new("c"));
        assert!(series.is_empty());
        assert_eq!(series.parameter_range(), None);
    }
}
