use crate::core::io::references::element_reference_energy;
use crate::core::models::grid::ParameterGrid;
use crate::core::models::ids::CampaignId;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Derived score reported when no output structure accompanies the optimum.
pub const MISSING_GEOMETRY_SCORE: f64 = 1000.0;

pub const DEFAULT_PROBE_DISTANCES: [f64; 4] = [0.5, 1.0, 1.5, 2.0];

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
    #[error("No reference energy is known for element '{0}'")]
    UnknownElement(String),
}

fn unknown_variant(parameter: &'static str, value: &str, expected: &str) -> ConfigError {
    ConfigError::InvalidValue {
        parameter,
        reason: format!("'{}' is not one of {}", value, expected),
    }
}

/// How the optimum distance is located from a sample series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptimumMethod {
    #[default]
    Standard,
    Polynomial,
    DirectMinimum,
}

impl OptimumMethod {
    pub fn name(&self) -> &'static str {
        match self {
            OptimumMethod::Standard => "standard",
            OptimumMethod::Polynomial => "polynomial",
            OptimumMethod::DirectMinimum => "direct-minimum",
        }
    }
}

impl FromStr for OptimumMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "polynomial" | "poly-fit" | "poly_fit" => Ok(Self::Polynomial),
            "direct-minimum" | "minimum" | "find_min" => Ok(Self::DirectMinimum),
            _ => Err(unknown_variant(
                "method",
                s,
                "standard, polynomial, direct-minimum",
            )),
        }
    }
}

/// What a standard scan without any negative sample produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoCrossingPolicy {
    /// Terminate with "no favorable distance found".
    #[default]
    Terminate,
    /// Continue at the lowest sample, as the scan reports it.
    Sentinel,
}

impl FromStr for NoCrossingPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "terminate" => Ok(Self::Terminate),
            "sentinel" => Ok(Self::Sentinel),
            _ => Err(unknown_variant("no-crossing", s, "terminate, sentinel")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SurrogateKind {
    #[default]
    Forest,
    GradientBoostedTrees,
    GaussianProcess,
}

impl SurrogateKind {
    pub fn name(&self) -> &'static str {
        match self {
            SurrogateKind::Forest => "forest",
            SurrogateKind::GradientBoostedTrees => "gradient-boosted-trees",
            SurrogateKind::GaussianProcess => "gaussian-process",
        }
    }
}

impl FromStr for SurrogateKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forest" => Ok(Self::Forest),
            "gbrt" | "gradient-boosted-trees" => Ok(Self::GradientBoostedTrees),
            "gp" | "gaussian-process" => Ok(Self::GaussianProcess),
            _ => Err(unknown_variant(
                "model",
                s,
                "forest, gradient-boosted-trees, gaussian-process",
            )),
        }
    }
}

/// Scalar loss extracted from a convergence trace. Lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LossMetric {
    #[default]
    TotalElectronicSteps,
    LastFiveDe,
    IonicSteps,
    IonicDe,
}

impl FromStr for LossMetric {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "total-electronic-steps" => Ok(Self::TotalElectronicSteps),
            "last-five-de" => Ok(Self::LastFiveDe),
            "ionic-steps" => Ok(Self::IonicSteps),
            "ionic-de" => Ok(Self::IonicDe),
            _ => Err(unknown_variant(
                "loss-metric",
                s,
                "total-electronic-steps, last-five-de, ionic-steps, ionic-de",
            )),
        }
    }
}

/// Reference energies used to turn an optimum energy into a derived score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyReferences {
    pub substrate_energy: f64,
    pub substrate_volume: Option<f64>,
    pub adsorbate_energy: f64,
}

impl EnergyReferences {
    pub fn new(
        substrate_energy: f64,
        substrate_volume: Option<f64>,
        adsorbate_energy: f64,
    ) -> Self {
        Self {
            substrate_energy,
            substrate_volume,
            adsorbate_energy,
        }
    }

    /// Builds the adsorbate reference from an elemental composition.
    pub fn from_composition(
        substrate_energy: f64,
        substrate_volume: Option<f64>,
        composition: &[(String, usize)],
    ) -> Result<Self, ConfigError> {
        let adsorbate_energy = composition
            .iter()
            .map(|(symbol, count)| {
                element_reference_energy(symbol)
                    .map(|energy| energy * *count as f64)
                    .ok_or_else(|| ConfigError::UnknownElement(symbol.clone()))
            })
            .sum::<Result<f64, ConfigError>>()?;
        Ok(Self::new(substrate_energy, substrate_volume, adsorbate_energy))
    }

    /// Ratio of the output cell to the substrate cell, `None` without an output cell.
    pub fn scale_factor(&self, cell_volume: Option<f64>) -> Option<f64> {
        let volume = cell_volume?;
        Some(match self.substrate_volume {
            Some(reference) if reference > 0.0 => volume / reference,
            _ => 1.0,
        })
    }

    pub fn derived_score(&self, optimum_value: f64, cell_volume: Option<f64>) -> f64 {
        match self.scale_factor(cell_volume) {
            Some(scale) => optimum_value - self.substrate_energy * scale - self.adsorbate_energy,
            None => MISSING_GEOMETRY_SCORE,
        }
    }
}

/// Site and outward normal used to place the probe at a given distance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeSite {
    pub coordinate: Point3<f64>,
    pub normal: Vector3<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistanceSearchConfig {
    pub method: OptimumMethod,
    pub no_crossing: NoCrossingPolicy,
    pub probe_distances: Vec<f64>,
    pub references: Option<EnergyReferences>,
    pub termination_threshold: f64,
    pub probe_site: Option<ProbeSite>,
}

impl Default for DistanceSearchConfig {
    fn default() -> Self {
        Self {
            method: OptimumMethod::default(),
            no_crossing: NoCrossingPolicy::default(),
            probe_distances: DEFAULT_PROBE_DISTANCES.to_vec(),
            references: None,
            termination_threshold: 2.0,
            probe_site: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurrogateSearchConfig {
    pub grid: ParameterGrid,
    pub model: SurrogateKind,
    pub max_tasks_per_round: usize,
    pub initial_points: usize,
    pub exploration_weight: f64,
    pub seed: u64,
    pub loss_metric: LossMetric,
}

impl SurrogateSearchConfig {
    pub fn new(grid: ParameterGrid) -> Self {
        Self {
            grid,
            model: SurrogateKind::default(),
            max_tasks_per_round: 10,
            initial_points: 5,
            exploration_weight: 1.96,
            seed: 0,
            loss_metric: LossMetric::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StrategyConfig {
    Distance(DistanceSearchConfig),
    Surrogate(SurrogateSearchConfig),
}

impl StrategyConfig {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyConfig::Distance(_) => "distance",
            StrategyConfig::Surrogate(_) => "surrogate",
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            StrategyConfig::Distance(cfg) => {
                if cfg.probe_distances.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        parameter: "probe_distances",
                        reason: "at least one probe distance is required".to_string(),
                    });
                }
                if cfg.probe_distances.iter().any(|d| !d.is_finite()) {
                    return Err(ConfigError::InvalidValue {
                        parameter: "probe_distances",
                        reason: "probe distances must be finite".to_string(),
                    });
                }
                if !cfg.termination_threshold.is_finite() {
                    return Err(ConfigError::InvalidValue {
                        parameter: "termination_threshold",
                        reason: "threshold must be finite".to_string(),
                    });
                }
            }
            StrategyConfig::Surrogate(cfg) => {
                if cfg.max_tasks_per_round == 0 {
                    return Err(ConfigError::InvalidValue {
                        parameter: "max_tasks_per_round",
                        reason: "must be at least 1".to_string(),
                    });
                }
                if cfg.exploration_weight.is_nan() || cfg.exploration_weight < 0.0 {
                    return Err(ConfigError::InvalidValue {
                        parameter: "exploration_weight",
                        reason: "must be a non-negative number".to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CampaignConfig {
    pub campaign: CampaignId,
    pub strategy: StrategyConfig,
    /// Number of expansions allowed after the opening round.
    pub search_budget: usize,
    /// Overrides the number of completions a round waits for.
    pub expected_samples_per_round: Option<usize>,
    pub fallback_dir: PathBuf,
    /// Height window used to label surface and boundary positions.
    pub annotation_height: f64,
}

#[derive(Default)]
pub struct CampaignConfigBuilder {
    campaign: Option<CampaignId>,
    strategy: Option<StrategyConfig>,
    search_budget: Option<usize>,
    expected_samples_per_round: Option<usize>,
    fallback_dir: Option<PathBuf>,
    annotation_height: Option<f64>,
}

impl CampaignConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn campaign(mut self, campaign: CampaignId) -> Self {
        self.campaign = Some(campaign);
        self
    }
    pub fn strategy(mut self, strategy: StrategyConfig) -> Self {
        self.strategy = Some(strategy);
        self
    }
    pub fn search_budget(mut self, budget: usize) -> Self {
        self.search_budget = Some(budget);
        self
    }
    pub fn expected_samples_per_round(mut self, count: usize) -> Self {
        self.expected_samples_per_round = Some(count);
        self
    }
    pub fn fallback_dir(mut self, dir: PathBuf) -> Self {
        self.fallback_dir = Some(dir);
        self
    }
    pub fn annotation_height(mut self, height: f64) -> Self {
        self.annotation_height = Some(height);
        self
    }

    pub fn build(self) -> Result<CampaignConfig, ConfigError> {
        let strategy = self
            .strategy
            .ok_or(ConfigError::MissingParameter("strategy"))?;
        strategy.validate()?;

        let annotation_height = self.annotation_height.unwrap_or(0.9);
        if annotation_height.is_nan() || annotation_height < 0.0 {
            return Err(ConfigError::InvalidValue {
                parameter: "annotation_height",
                reason: "must be a non-negative number".to_string(),
            });
        }

        Ok(CampaignConfig {
            campaign: self
                .campaign
                .ok_or(ConfigError::MissingParameter("campaign"))?,
            strategy,
            search_budget: self
                .search_budget
                .ok_or(ConfigError::MissingParameter("search_budget"))?,
            expected_samples_per_round: self.expected_samples_per_round,
            fallback_dir: self.fallback_dir.unwrap_or_else(|| PathBuf::from(".")),
            annotation_height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::grid::{Dimension, Domain, GridValue};

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn builder_requires_strategy_campaign_and_budget() {
        let missing_strategy = CampaignConfigBuilder::new()
            .campaign(CampaignId::new("c"))
            .search_budget(3)
            .build();
        assert_eq!(
            missing_strategy,
            Err(ConfigError::MissingParameter("strategy"))
        );

        let missing_budget = CampaignConfigBuilder::new()
            .campaign(CampaignId::new("c"))
            .strategy(StrategyConfig::Distance(DistanceSearchConfig::default()))
            .build();
        assert_eq!(
            missing_budget,
            Err(ConfigError::MissingParameter("search_budget"))
        );
    }

    #[test]
    fn builder_fills_defaults() {
        let config = CampaignConfigBuilder::new()
            .campaign(CampaignId::new("c"))
            .strategy(StrategyConfig::Distance(DistanceSearchConfig::default()))
            .search_budget(2)
            .build()
            .unwrap();

        assert_eq!(config.annotation_height, 0.9);
        assert_eq!(config.fallback_dir, PathBuf::from("."));
        assert_eq!(config.expected_samples_per_round, None);
        assert_eq!(config.strategy.name(), "distance");
    }

    #[test]
    fn builder_rejects_empty_probe_distances() {
        let result = CampaignConfigBuilder::new()
            .campaign(CampaignId::new("c"))
            .strategy(StrategyConfig::Distance(DistanceSearchConfig {
                probe_distances: vec![],
                ..DistanceSearchConfig::default()
            }))
            .search_budget(1)
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                parameter: "probe_distances",
                ..
            })
        ));
    }

    #[test]
    fn builder_rejects_zero_tasks_per_round() {
        let grid = ParameterGrid::new(vec![Dimension {
            name: "A".to_string(),
            domain: Domain::Values {
                values: vec![GridValue::Int(1), GridValue::Int(2)],
            },
        }])
        .unwrap();
        let mut surrogate = SurrogateSearchConfig::new(grid);
        surrogate.max_tasks_per_round = 0;

        let result = CampaignConfigBuilder::new()
            .campaign(CampaignId::new("c"))
            .strategy(StrategyConfig::Surrogate(surrogate))
            .search_budget(1)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn composition_sums_elemental_references() {
        let refs = EnergyReferences::from_composition(
            -100.0,
            Some(50.0),
            &[("C".to_string(), 1), ("O".to_string(), 2)],
        )
        .unwrap();
        assert!(f64_approx_equal(refs.adsorbate_energy, -7.329 - 2.0 * 7.459));
    }

    #[test]
    fn composition_with_unknown_element_is_rejected() {
        let err = EnergyReferences::from_composition(-100.0, None, &[("Xe".to_string(), 1)])
            .unwrap_err();
        assert_eq!(err, ConfigError::UnknownElement("Xe".to_string()));
    }

    #[test]
    fn derived_score_scales_substrate_by_cell_volume_ratio() {
        let refs = EnergyReferences::new(-100.0, Some(50.0), -10.0);
        let score = refs.derived_score(-215.0, Some(100.0));
        assert!(f64_approx_equal(score, -215.0 + 200.0 + 10.0));
    }

    #[test]
    fn derived_score_without_output_cell_is_sentinel() {
        let refs = EnergyReferences::new(-100.0, Some(50.0), -10.0);
        assert_eq!(refs.derived_score(-500.0, None), MISSING_GEOMETRY_SCORE);
    }

    #[test]
    fn method_names_parse_with_aliases() {
        assert_eq!("poly_fit".parse::<OptimumMethod>(), Ok(OptimumMethod::Polynomial));
        assert_eq!("gbrt".parse::<SurrogateKind>(), Ok(SurrogateKind::GradientBoostedTrees));
        assert_eq!("Sentinel".parse::<NoCrossingPolicy>(), Ok(NoCrossingPolicy::Sentinel));
        assert!("simplex".parse::<OptimumMethod>().is_err());
    }
}
