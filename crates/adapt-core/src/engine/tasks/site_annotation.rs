use crate::core::geometry::site::{
    NeighborRecord, SiteClassification, adsorption_anchor, classify_adsorption_site,
    nearest_surface_neighbors,
};
use crate::core::geometry::surface::{StructureAnnotation, annotate_structure};
use crate::core::models::structure::StructureGeometry;
use serde::Serialize;
use tracing::{info, instrument, warn};

/// Everything the classifiers could derive from a final structure.
///
/// Each part is computed independently; a part that fails is left empty and
/// the failure is listed in `warnings`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SiteAnnotation {
    pub labels: Option<StructureAnnotation>,
    pub nearest_neighbors: Vec<NeighborRecord>,
    pub anchor: Option<NeighborRecord>,
    pub site: Option<SiteClassification>,
    pub warnings: Vec<String>,
}

#[instrument(skip_all, name = "site_annotation_task", fields(positions = geometry.len()))]
pub fn run(geometry: &StructureGeometry, height_threshold: f64) -> SiteAnnotation {
    let mut annotation = SiteAnnotation::default();

    match annotate_structure(geometry, height_threshold) {
        Ok(labels) => annotation.labels = Some(labels),
        Err(e) => {
            warn!(error = %e, "Skipping surface labelling.");
            annotation.warnings.push(format!("surface labelling skipped: {}", e));
        }
    }

    match nearest_surface_neighbors(
        &geometry.positions,
        &geometry.probe_ids,
        geometry.lattice_repeat,
    ) {
        Ok(records) => annotation.nearest_neighbors = records,
        Err(e) => {
            warn!(error = %e, "Skipping nearest-neighbor search.");
            annotation.warnings.push(format!("nearest neighbors skipped: {}", e));
        }
    }

    annotation.anchor = adsorption_anchor(&annotation.nearest_neighbors);
    if let Some(anchor) = annotation.anchor {
        match classify_adsorption_site(
            &geometry.positions,
            anchor.probe,
            &geometry.probe_ids,
            &geometry.normal,
            geometry.lattice_repeat,
        ) {
            Ok(site) => {
                info!(site = %site.site_type, probe = anchor.probe, "Classified adsorption site.");
                annotation.site = Some(site);
            }
            Err(e) => {
                warn!(error = %e, "Skipping adsorption-site classification.");
                annotation.warnings.push(format!("site classification skipped: {}", e));
            }
        }
    }

    annotation
}
