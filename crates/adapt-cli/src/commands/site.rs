use super::{emit_json, read_json};
use crate::cli::SiteArgs;
use crate::error::{CliError, Result};
use adaptflow::core::models::structure::StructureGeometry;
use adaptflow::engine::tasks::site_annotation::{self, SiteAnnotation};
use tracing::{info, warn};

pub fn run(args: SiteArgs) -> Result<()> {
    let annotation = execute(&args)?;
    emit_json(&annotation, None)
}

pub fn execute(args: &SiteArgs) -> Result<SiteAnnotation> {
    if !args.height.is_finite() || args.height < 0.0 {
        return Err(CliError::Argument(format!(
            "--height must be a non-negative number, got {}",
            args.height
        )));
    }

    info!("Loading structure from {:?}", &args.structure);
    let geometry: StructureGeometry = read_json(&args.structure)?;
    let annotation = site_annotation::run(&geometry, args.height);

    for warning in &annotation.warnings {
        warn!("{}", warning);
    }
    match &annotation.site {
        Some(site) => info!(site = %site.site_type, probe = site.probe, "Classified adsorption site."),
        None => info!("No adsorption site could be classified."),
    }
    Ok(annotation)
}
