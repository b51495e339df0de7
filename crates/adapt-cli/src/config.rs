use crate::error::{CliError, Result};
use adaptflow::core::models::grid::{Dimension, ParameterGrid};
use adaptflow::core::models::ids::CampaignId;
use adaptflow::engine::config as core_config;
use nalgebra::{Point3, Vector3};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialCampaignSection {
    id: Option<String>,
    strategy: Option<String>,
    search_budget: Option<usize>,
    expected_samples: Option<usize>,
    fallback_dir: Option<PathBuf>,
    annotation_height: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialReferences {
    substrate_energy: Option<f64>,
    substrate_volume: Option<f64>,
    /// Elemental composition of the adsorbate, e.g. `{ C = 1, O = 1 }`.
    adsorbate: Option<BTreeMap<String, usize>>,
    adsorbate_energy: Option<f64>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct PartialSite {
    coordinate: [f64; 3],
    normal: [f64; 3],
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialDistanceConfig {
    method: Option<String>,
    no_crossing: Option<String>,
    probe_distances: Option<Vec<f64>>,
    termination_threshold: Option<f64>,
    references: Option<PartialReferences>,
    site: Option<PartialSite>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialSurrogateConfig {
    model: Option<String>,
    max_tasks_per_round: Option<usize>,
    initial_points: Option<usize>,
    exploration_weight: Option<f64>,
    seed: Option<u64>,
    loss_metric: Option<String>,
    /// Separate grid definition file; relative paths resolve against the config file.
    grid: Option<PathBuf>,
    dimension: Option<Vec<Dimension>>,
}

/// A campaign file as written by the user, before defaults are applied.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialCampaignFile {
    campaign: Option<PartialCampaignSection>,
    distance: Option<PartialDistanceConfig>,
    surrogate: Option<PartialSurrogateConfig>,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl PartialCampaignFile {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading campaign configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut file: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        file.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(file)
    }

    /// Applies `--set` overrides and a search budget override, then builds
    /// the validated core configuration.
    pub fn merge_with_cli(
        mut self,
        set_values: &[String],
        search_budget: Option<usize>,
    ) -> Result<core_config::CampaignConfig> {
        self.apply_set_values(set_values)?;

        let campaign = self.campaign.take().unwrap_or_default();
        let strategy_name = match campaign.strategy.as_deref() {
            Some(name) => name.to_ascii_lowercase(),
            None if self.surrogate.is_some() && self.distance.is_none() => "surrogate".to_string(),
            None => "distance".to_string(),
        };
        let strategy = match strategy_name.as_str() {
            "distance" => core_config::StrategyConfig::Distance(Self::merge_distance(
                self.distance.take().unwrap_or_default(),
            )?),
            "surrogate" | "global-optimum" => {
                let partial = self.surrogate.take().unwrap_or_default();
                core_config::StrategyConfig::Surrogate(self.merge_surrogate(partial)?)
            }
            other => {
                return Err(CliError::Config(format!(
                    "Unknown campaign strategy '{}'; expected 'distance' or 'surrogate'.",
                    other
                )));
            }
        };

        let mut builder = core_config::CampaignConfigBuilder::new().strategy(strategy);
        if let Some(id) = campaign.id {
            builder = builder.campaign(CampaignId::new(id));
        }
        if let Some(budget) = search_budget.or(campaign.search_budget) {
            builder = builder.search_budget(budget);
        }
        if let Some(count) = campaign.expected_samples {
            builder = builder.expected_samples_per_round(count);
        }
        if let Some(dir) = campaign.fallback_dir {
            builder = builder.fallback_dir(dir);
        }
        if let Some(height) = campaign.annotation_height {
            builder = builder.annotation_height(height);
        }

        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    fn merge_distance(partial: PartialDistanceConfig) -> Result<core_config::DistanceSearchConfig> {
        let defaults = core_config::DistanceSearchConfig::default();
        let references = match partial.references {
            Some(refs) => Some(Self::merge_references(refs)?),
            None => None,
        };
        Ok(core_config::DistanceSearchConfig {
            method: parse_or(partial.method.as_deref(), defaults.method)?,
            no_crossing: parse_or(partial.no_crossing.as_deref(), defaults.no_crossing)?,
            probe_distances: partial.probe_distances.unwrap_or(defaults.probe_distances),
            references,
            termination_threshold: partial
                .termination_threshold
                .unwrap_or(defaults.termination_threshold),
            probe_site: partial.site.map(|site| core_config::ProbeSite {
                coordinate: Point3::from(site.coordinate),
                normal: Vector3::from(site.normal),
            }),
        })
    }

    fn merge_references(partial: PartialReferences) -> Result<core_config::EnergyReferences> {
        let substrate_energy = partial.substrate_energy.ok_or_else(|| {
            CliError::Config("`distance.references` requires `substrate-energy`.".to_string())
        })?;
        match (partial.adsorbate, partial.adsorbate_energy) {
            (Some(composition), None) => {
                let composition: Vec<(String, usize)> = composition.into_iter().collect();
                core_config::EnergyReferences::from_composition(
                    substrate_energy,
                    partial.substrate_volume,
                    &composition,
                )
                .map_err(|e| CliError::Config(e.to_string()))
            }
            (None, Some(energy)) => Ok(core_config::EnergyReferences::new(
                substrate_energy,
                partial.substrate_volume,
                energy,
            )),
            _ => Err(CliError::Config(
                "`distance.references` requires exactly one of `adsorbate` or `adsorbate-energy`."
                    .to_string(),
            )),
        }
    }

    fn merge_surrogate(
        &self,
        partial: PartialSurrogateConfig,
    ) -> Result<core_config::SurrogateSearchConfig> {
        let grid = match (partial.grid, partial.dimension) {
            (Some(path), None) => {
                let path = if path.is_absolute() {
                    path
                } else {
                    self.base_dir.join(path)
                };
                ParameterGrid::load(&path).map_err(|e| CliError::FileParsing {
                    path: path.clone(),
                    source: e.into(),
                })?
            }
            (None, Some(dimensions)) => {
                ParameterGrid::new(dimensions).map_err(|e| CliError::Config(e.to_string()))?
            }
            (Some(_), Some(_)) => {
                return Err(CliError::Config(
                    "`surrogate.grid` and `[[surrogate.dimension]]` are mutually exclusive."
                        .to_string(),
                ));
            }
            (None, None) => {
                return Err(CliError::Config(
                    "A surrogate campaign requires `surrogate.grid` or `[[surrogate.dimension]]`."
                        .to_string(),
                ));
            }
        };

        let defaults = core_config::SurrogateSearchConfig::new(grid);
        Ok(core_config::SurrogateSearchConfig {
            model: parse_or(partial.model.as_deref(), defaults.model)?,
            max_tasks_per_round: partial
                .max_tasks_per_round
                .unwrap_or(defaults.max_tasks_per_round),
            initial_points: partial.initial_points.unwrap_or(defaults.initial_points),
            exploration_weight: partial
                .exploration_weight
                .unwrap_or(defaults.exploration_weight),
            seed: partial.seed.unwrap_or(defaults.seed),
            loss_metric: parse_or(partial.loss_metric.as_deref(), defaults.loss_metric)?,
            ..defaults
        })
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value) = kv_pair.split_once('=').ok_or_else(|| {
                CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                ))
            })?;

            match key {
                "campaign.id" => self.campaign_section().id = Some(value.to_string()),
                "campaign.strategy" => {
                    self.campaign_section().strategy = Some(value.to_string())
                }
                "campaign.search-budget" => {
                    self.campaign_section().search_budget = Some(parse_value(key, value)?)
                }
                "campaign.expected-samples" => {
                    self.campaign_section().expected_samples = Some(parse_value(key, value)?)
                }
                "campaign.fallback-dir" => {
                    self.campaign_section().fallback_dir = Some(PathBuf::from(value))
                }
                "campaign.annotation-height" => {
                    self.campaign_section().annotation_height = Some(parse_value(key, value)?)
                }
                "distance.method" => self.distance_section().method = Some(value.to_string()),
                "distance.no-crossing" => {
                    self.distance_section().no_crossing = Some(value.to_string())
                }
                "distance.termination-threshold" => {
                    self.distance_section().termination_threshold = Some(parse_value(key, value)?)
                }
                "surrogate.model" => self.surrogate_section().model = Some(value.to_string()),
                "surrogate.max-tasks-per-round" => {
                    self.surrogate_section().max_tasks_per_round = Some(parse_value(key, value)?)
                }
                "surrogate.initial-points" => {
                    self.surrogate_section().initial_points = Some(parse_value(key, value)?)
                }
                "surrogate.exploration-weight" => {
                    self.surrogate_section().exploration_weight = Some(parse_value(key, value)?)
                }
                "surrogate.seed" => self.surrogate_section().seed = Some(parse_value(key, value)?),
                "surrogate.loss-metric" => {
                    self.surrogate_section().loss_metric = Some(value.to_string())
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }

    fn campaign_section(&mut self) -> &mut PartialCampaignSection {
        self.campaign.get_or_insert_with(Default::default)
    }

    fn distance_section(&mut self) -> &mut PartialDistanceConfig {
        self.distance.get_or_insert_with(Default::default)
    }

    fn surrogate_section(&mut self) -> &mut PartialSurrogateConfig {
        self.surrogate.get_or_insert_with(Default::default)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid value for {}: {}", key, value)))
}

fn parse_or<T>(value: Option<&str>, default: T) -> Result<T>
where
    T: FromStr<Err = core_config::ConfigError>,
{
    match value {
        Some(s) => s.parse().map_err(|e: core_config::ConfigError| CliError::Config(e.to_string())),
        None => Ok(default),
    }
}
