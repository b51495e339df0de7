use super::cache::EvaluationCache;
use super::error::EngineError;
use crate::core::models::grid::GridPoint;
use crate::core::models::ids::CampaignId;
use crate::core::models::sample::{Sample, SampleSeries};
use crate::core::models::structure::StructureGeometry;
use std::collections::BTreeSet;

/// Campaign-scoped state handed to every strategy invocation.
///
/// Strategies only ever receive a shared reference; all mutation goes through
/// the controller.
#[derive(Debug, Clone)]
pub struct CampaignContext {
    campaign: CampaignId,
    series: SampleSeries,
    cache: EvaluationCache,
    in_flight: BTreeSet<GridPoint>,
    remaining_budget: usize,
    round: usize,
    relaxation: Option<Sample>,
    cell_volume: Option<f64>,
    final_geometry: Option<StructureGeometry>,
    abort_requested: bool,
}

impl CampaignContext {
    pub fn new(campaign: CampaignId, search_budget: usize) -> Self {
        Self {
            series: SampleSeries::new(campaign.clone()),
            campaign,
            cache: EvaluationCache::new(),
            in_flight: BTreeSet::new(),
            remaining_budget: search_budget,
            round: 0,
            relaxation: None,
            cell_volume: None,
            final_geometry: None,
            abort_requested: false,
        }
    }

    pub fn with_series(mut self, series: SampleSeries) -> Self {
        self.series = series;
        self
    }

    pub fn with_cache(mut self, cache: EvaluationCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_geometry(mut self, geometry: StructureGeometry) -> Self {
        self.record_geometry(geometry);
        self
    }

    pub fn campaign(&self) -> &CampaignId {
        &self.campaign
    }
    pub fn series(&self) -> &SampleSeries {
        &self.series
    }
    pub fn cache(&self) -> &EvaluationCache {
        &self.cache
    }
    pub fn in_flight(&self) -> &BTreeSet<GridPoint> {
        &self.in_flight
    }
    pub fn remaining_budget(&self) -> usize {
        self.remaining_budget
    }
    pub fn round(&self) -> usize {
        self.round
    }
    pub fn relaxation(&self) -> Option<&Sample> {
        self.relaxation.as_ref()
    }
    pub fn cell_volume(&self) -> Option<f64> {
        self.cell_volume
    }
    pub fn final_geometry(&self) -> Option<&StructureGeometry> {
        self.final_geometry.as_ref()
    }
    pub fn abort_requested(&self) -> bool {
        self.abort_requested
    }

    pub(crate) fn record_sample(&mut self, sample: Sample) {
        self.series.record(sample);
    }

    pub(crate) fn record_evaluation(
        &mut self,
        point: GridPoint,
        value: f64,
    ) -> Result<(), EngineError> {
        self.in_flight.remove(&point);
        self.cache.insert(point, value)
    }

    pub(crate) fn record_relaxation(&mut self, sample: Sample) {
        self.relaxation = Some(sample);
    }

    pub(crate) fn record_geometry(&mut self, geometry: StructureGeometry) {
        if geometry.cell_volume.is_some() {
            self.cell_volume = geometry.cell_volume;
        }
        self.final_geometry = Some(geometry);
    }

    pub(crate) fn mark_in_flight(&mut self, point: GridPoint) -> bool {
        self.in_flight.insert(point)
    }

    pub(crate) fn release_in_flight(&mut self, point: &GridPoint) {
        self.in_flight.remove(point);
    }

    pub(crate) fn consume_budget(&mut self) {
        self.remaining_budget = self.remaining_budget.saturating_sub(1);
    }

    pub(crate) fn advance_round(&mut self) -> usize {
        self.round += 1;
        self.round
    }

    pub(crate) fn request_abort(&mut self) {
        self.abort_requested = true;
    }

    /// Drops the sample series once the final record holds it.
    pub(crate) fn discard_series(&mut self) {
        self.series = SampleSeries::new(self.campaign.clone());
    }
}
