use super::{emit_json, read_json};
use crate::cli::PlanArgs;
use crate::config::PartialCampaignFile;
use crate::error::{CliError, Result};
use adaptflow::core::models::grid::GridPoint;
use adaptflow::core::models::task::TaskSpec;
use adaptflow::engine::cache::EvaluationCache;
use adaptflow::engine::config::StrategyConfig;
use adaptflow::engine::tasks::surrogate_search;
use std::collections::BTreeSet;
use tracing::info;

pub fn run(args: PlanArgs) -> Result<()> {
    let tasks = execute(&args)?;
    let evaluations = tasks.iter().filter(|t| t.is_heavy()).count();
    if evaluations == 0 {
        println!("Nothing left to evaluate.");
    } else {
        println!("Requesting {} evaluation(s).", evaluations);
    }
    emit_json(&tasks, args.output.as_deref())
}

pub fn execute(args: &PlanArgs) -> Result<Vec<TaskSpec>> {
    let partial_config = PartialCampaignFile::from_file(&args.config)?;
    let config = partial_config.merge_with_cli(&args.set_values, args.budget)?;
    let StrategyConfig::Surrogate(search) = &config.strategy else {
        return Err(CliError::StrategyMismatch {
            command: "plan",
            expected: "surrogate",
            found: config.strategy.name().to_string(),
        });
    };

    let cache = match &args.cache {
        Some(path) => {
            info!("Loading evaluation cache from {:?}", path);
            read_json::<EvaluationCache>(path)?
        }
        None => EvaluationCache::new(),
    };
    info!(
        cached = cache.len(),
        grid = search.grid.point_count(),
        budget = config.search_budget,
        "Planning surrogate round."
    );

    let tasks = surrogate_search::run(
        &search.grid,
        &cache,
        &BTreeSet::<GridPoint>::new(),
        config.search_budget,
        search,
    )?;
    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use adaptflow::core::models::task::TaskKind;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    const CONFIG: &str = r#"
        [campaign]
        id = "scf"
        strategy = "surrogate"
        search-budget = 10

        [surrogate]
        max-tasks-per-round = 2

        [[surrogate.dimension]]
        name = "NELMIN"
        domain = { kind = "int-range", low = 2, high = 4 }
    "#;

    fn args_for(dir: &Path, cache: Option<PathBuf>) -> PlanArgs {
        let config = dir.join("campaign.toml");
        fs::write(&config, CONFIG).unwrap();
        PlanArgs {
            config,
            cache,
            budget: None,
            output: None,
            set_values: Vec::new(),
        }
    }

    #[test]
    fn fresh_campaign_requests_evaluations_with_continuations() {
        let dir = tempdir().unwrap();
        let tasks = execute(&args_for(dir.path(), None)).unwrap();

        assert_eq!(tasks.len(), 4);
        assert_eq!(tasks.iter().filter(|t| t.is_heavy()).count(), 2);
        assert!(matches!(
            tasks[1].kind,
            TaskKind::SurrogateContinuation {
                remaining_budget: 9
            }
        ));
    }

    #[test]
    fn cached_points_are_not_requested_again() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("cache.json");
        fs::write(
            &cache,
            r#"[{"point": [0], "value": 12.0}, {"point": [1], "value": 9.0}]"#,
        )
        .unwrap();

        let tasks = execute(&args_for(dir.path(), Some(cache))).unwrap();

        let requested: Vec<&GridPoint> = tasks.iter().filter_map(|t| t.grid_point()).collect();
        assert_eq!(requested, vec![&GridPoint::new(vec![2])]);
    }

    #[test]
    fn distance_config_is_a_strategy_mismatch() {
        let dir = tempdir().unwrap();
        let mut args = args_for(dir.path(), None);
        args.set_values = vec!["campaign.strategy=distance".to_string()];

        let err = execute(&args).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The 'plan' command needs a surrogate campaign, found 'distance'."
        );
    }

    #[test]
    fn zero_budget_plans_nothing_and_writes_an_empty_list() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("tasks.json");
        let mut args = args_for(dir.path(), None);
        args.budget = Some(0);
        args.output = Some(output.clone());

        run(args).unwrap();

        let written: Vec<TaskSpec> =
            serde_json::from_str(&fs::read_to_string(output).unwrap()).unwrap();
        assert!(written.is_empty());
    }
}
