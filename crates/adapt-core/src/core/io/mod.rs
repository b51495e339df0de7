//! Reading sample tables, storing campaign records, and reference data tables.

pub mod persistence;
pub mod references;
pub mod samples;
