#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Date-window filtering, incremental aggregation, and report finalization.
//!
//! Records that pass a [`window::DateWindow`] are folded into an
//! [`state::AggregateState`]. States built from different chunks (or
//! different inputs, on different tasks) merge into exactly the state a
//! single pass over all records would have produced, in any order and any
//! grouping. [`finalize::finalize`] derives the user-facing
//! [`crash_report_analytics_models::Report`] from a finished state.

pub mod finalize;
pub mod frequency;
pub mod state;
pub mod window;

pub use finalize::finalize;
pub use state::{AggregateState, PersonTotal, aggregate_batch};
pub use window::{DateWindow, FilterStats, WindowError};
