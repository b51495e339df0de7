//! # adaptflow Core Library
//!
//! An adaptive workflow expansion engine: campaigns of simulation jobs whose
//! results decide, round by round, whether to finish, to continue with a new
//! parameter, or to grow the running task graph with new work.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same strict three-layer split throughout.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Sample`, `ParameterGrid`,
//!   `TaskSpec`, `Completion`), geometric classifiers for final structures, and
//!   I/O for sample series and campaign records.
//!
//! - **[`engine`]: The Logic Core.** Campaign state, the evaluation cache, the
//!   decision sum type, surrogate models and the pure decision tasks
//!   (`distance_search`, `surrogate_search`, `site_annotation`).
//!
//! - **[`workflows`]: The Public API.** The campaign controller driving the
//!   `Sampling -> Deciding -> Expanding/Terminating` lifecycle, plus the two
//!   decision strategies built on top of the engine tasks.

pub mod core;
pub mod engine;
pub mod workflows;
