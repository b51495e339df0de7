//! Numeric helpers shared by the search tasks: curve fitting and seeded sampling.

pub mod fitting;
pub mod sampling;
