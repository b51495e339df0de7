use super::cache::CacheEntry;
use super::decision::{BestEvaluation, Decision, TerminationReason};
use super::tasks::distance_search::OptimumEstimate;
use super::tasks::site_annotation::SiteAnnotation;
use crate::core::models::ids::CampaignId;
use crate::core::models::sample::Sample;
use serde::Serialize;

/// The single accumulator record of a campaign, persisted once at termination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignRecord {
    pub campaign: CampaignId,
    pub strategy: &'static str,
    pub rounds: usize,
    pub samples: Vec<Sample>,
    pub evaluations: Vec<CacheEntry>,
    pub optimum: Option<OptimumEstimate>,
    pub relaxation: Option<Sample>,
    pub best_evaluation: Option<BestEvaluation>,
    pub final_decision: Option<Decision>,
    pub termination_reason: Option<TerminationReason>,
    pub annotation: Option<SiteAnnotation>,
    pub warnings: Vec<String>,
}

impl CampaignRecord {
    pub fn new(campaign: CampaignId, strategy: &'static str) -> Self {
        Self {
            campaign,
            strategy,
            rounds: 0,
            samples: Vec::new(),
            evaluations: Vec::new(),
            optimum: None,
            relaxation: None,
            best_evaluation: None,
            final_decision: None,
            termination_reason: None,
            annotation: None,
            warnings: Vec::new(),
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
