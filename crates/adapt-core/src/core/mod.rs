//! # Core Module
//!
//! Stateless building blocks of the engine: the data exchanged with the job
//! executor, geometric classification of structures, and file I/O.
//!
//! ## Architecture
//!
//! - **Data Models** ([`models`]) - Samples, parameter grids, task specifications and completions
//! - **Geometry** ([`geometry`]) - Surface labelling and adsorption-site classification
//! - **File I/O** ([`io`]) - Sample tables, campaign record persistence, reference energies
//! - **Utilities** ([`utils`]) - Vector geometry helpers shared by the classifiers
//!
//! Nothing in this layer holds campaign state; the [`crate::engine`] layer owns it.

pub mod geometry;
pub mod io;
pub mod models;
pub mod utils;
