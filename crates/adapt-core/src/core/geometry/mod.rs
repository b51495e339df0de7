//! Geometric classification of campaign structures.
//!
//! - [`surface`] labels positions by their height along a reference normal.
//! - [`site`] classifies the local environment of an adsorbed probe.
//!
//! Every routine here is pure and depends only on positions, so results are
//! invariant under rigid motions applied to both positions and normal.

pub mod site;
pub mod surface;

use site::SiteType;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("At least 2 positions are required to classify a boundary, got {0}")]
    InsufficientGeometry(usize),

    #[error("Probe {probe} has {found} neighbors within {cutoff:.3} (3 required)")]
    InsufficientNeighbors {
        probe: usize,
        found: usize,
        cutoff: f64,
    },

    #[error("Reference normal has zero length")]
    DegenerateNormal,

    #[error("Position index {index} is out of range for a structure of {len} positions")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Support points of the {site} site are degenerate")]
    DegenerateSupport { site: SiteType },

    #[error("Structure declares no probe positions")]
    NoProbes,
}
