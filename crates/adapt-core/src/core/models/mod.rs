//! Plain data carried between the controller, its strategies and the executor.

pub mod completion;
pub mod grid;
pub mod ids;
pub mod sample;
pub mod structure;
pub mod task;
