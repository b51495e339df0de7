//! # Engine Module
//!
//! The stateful decision layer of adaptflow. It turns completion notifications
//! into samples, invokes a decision strategy once a round has settled, and
//! interprets the returned [`decision::Decision`] as either a final record or
//! a batch of new tasks attached to the running graph.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Campaign, distance search and surrogate search settings
//! - **Campaign State** ([`context`], [`state`], [`cache`]) - Samples, evaluations, in-flight work and lifecycle phase
//! - **Decisions** ([`decision`], [`record`]) - The decision sum type and the per-campaign accumulator record
//! - **Graph Mutation** ([`graph`]) - The seam through which expansions reach the task graph
//! - **Extraction** ([`extract`]) - Turning completions into scalar samples
//! - **Tasks** ([`tasks`]) - Optimum search, surrogate search, loss metrics and site annotation
//! - **Surrogates** ([`surrogate`]) - Regression models ranking unexplored grid points
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress reporting
//! - **Error Handling** ([`error`]) - Engine-specific error types and their fatality

pub mod cache;
pub mod config;
pub mod context;
pub mod decision;
pub mod error;
pub mod extract;
pub mod graph;
pub mod progress;
pub mod record;
pub mod state;
pub mod surrogate;
pub mod tasks;
pub(crate) mod utils;
