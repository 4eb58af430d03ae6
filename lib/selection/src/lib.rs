//! # dedupx Selection
//!
//! Canonical-record selection for duplicate groups.
//!
//! Rows that share a `dedupe_id` are candidates for the same real-world
//! record. This crate picks one of them, deterministically, as the group's
//! canonical row.
//!
//! ## Strategies
//!
//! - **Cascading completeness** (`strategy = 1`): rows are compared column by
//!   column in configured order. A present value beats a missing one, a longer
//!   value beats a shorter one; the first difference decides. Rows that never
//!   differ keep the one seen first.
//! - **Weighted sum** (`strategy = 2`): each column has a condition
//!   (`length` or `regex`) and a weight; the row with the highest total wins,
//!   ties keep the one seen first.
//!
//! ## Example
//!
//! ```rust
//! use dedupx_selection::{Condition, DedupeConfig, Selector};
//! use dedupx_core::{Row, Value, GROUP_KEY_COLUMN};
//!
//! let config = DedupeConfig::new("PROJECT", "MasterID", "PREFERREDRECORD", 2)
//!     .column("Title", Condition::length(45.0))
//!     .column("CTSIReview", Condition::length(20.0))
//!     .column("ClinicalTrialStatus", Condition::regex(35.0, "^yes$"));
//!
//! let selector = Selector::from_config(&config).unwrap();
//!
//! let rows = vec![
//!     Row::new().with(GROUP_KEY_COLUMN, 1i64).with("MasterID", 1i64)
//!         .with("Title", "A").with("CTSIReview", None::<&str>).with("ClinicalTrialStatus", "yes"),
//!     Row::new().with(GROUP_KEY_COLUMN, 1i64).with("MasterID", 2i64)
//!         .with("Title", "Alpha").with("CTSIReview", "ok").with("ClinicalTrialStatus", "no"),
//! ];
//!
//! let decisions: Vec<_> = selector
//!     .decisions(rows.into_iter().map(Ok))
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(decisions[0].winning_row_id, Value::Integer(2));
//! ```
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Sorted rows │────>│ Partitioner │────>│  Strategy   │────>│  Decision   │
//! │ (dedupe_id) │     │  (blocks)   │     │ (1 or 2)    │     │    sink     │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                            │
//!                      singletons dropped
//! ```

pub mod comparator;
pub mod driver;
pub mod explain;
pub mod schema;
pub mod strategy;

pub use comparator::{length_score, regex_score, BlockParams, Comparator, PatternMatcher};
pub use driver::{Decisions, Selector};
pub use explain::{Decision, DecisionSink, SelectionStats};
pub use schema::{
    CompiledConfig,
    Condition,
    ConditionType,
    DedupeConfig,
    SchemaError,
    ScoredColumn,
    StrategyKind,
};
pub use strategy::{CascadingCompleteness, Selection, Strategy, WeightedSum};
