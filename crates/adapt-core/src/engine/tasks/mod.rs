//! Computational units invoked by the campaign strategies.
//!
//! Each task is a pure function of the campaign state it is handed: it reads
//! samples, evaluations or geometry and returns a decision, a batch of task
//! specifications or an annotation. None of them touch the task graph.

pub mod distance_search;
pub mod loss;
pub mod site_annotation;
pub mod surrogate_search;
