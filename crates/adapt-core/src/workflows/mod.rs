//! # Workflows Module
//!
//! High-level entry points that tie the engine and core layers together into
//! complete campaigns.
//!
//! ## Architecture
//!
//! - **Campaign Controller** ([`campaign`]) - The `Sampling -> Deciding -> Expanding/Terminating`
//!   lifecycle, completion accounting, graph expansion and final record persistence.
//! - **Distance Strategy** ([`distance`]) - Probe round, optimum location and relaxation stage.
//! - **Global Optimum Strategy** ([`global_optimum`]) - Surrogate-guided search over a
//!   discrete parameter grid with memoized evaluations.

pub mod campaign;
pub mod distance;
pub mod global_optimum;
