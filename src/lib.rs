//! # dedupx
//!
//! Picks one canonical record per duplicate group.
//!
//! Rows sharing a precomputed `dedupe_id` are candidates for the same entity.
//! dedupx ranks each group with a declarative rule and flags the winner in a
//! uniqueness column; groups of one row are flagged directly.
//!
//! ## Quick Start
//!
//! ### As a CLI
//!
//! ```bash
//! dedupx --config dedupe.json --db db.toml
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use dedupx::prelude::*;
//!
//! let config = DedupeConfig::new("PROJECT", "MasterID", "PREFERREDRECORD", 1)
//!     .plain_column("Title")
//!     .plain_column("CTSIReview");
//! let selector = Selector::from_config(&config).unwrap();
//!
//! let rows = vec![
//!     Row::new().with(GROUP_KEY_COLUMN, 7i64).with("MasterID", 1i64)
//!         .with("Title", "Alpha").with("CTSIReview", None::<&str>),
//!     Row::new().with(GROUP_KEY_COLUMN, 7i64).with("MasterID", 2i64)
//!         .with("Title", "Alpha").with("CTSIReview", "ok"),
//! ];
//!
//! let mut decisions: Vec<Decision> = Vec::new();
//! selector.run(rows.into_iter().map(Ok), &mut decisions).unwrap();
//! assert_eq!(decisions[0].winning_row_id, Value::Integer(2));
//! ```
//!
//! ## Crate Structure
//!
//! - `dedupx-core` - Values, rows, blocks and the block partitioner
//! - `dedupx-selection` - Config schema, comparators, strategies, selection driver
//! - `dedupx-storage` - SQLite table adapter and config file loading

// Re-export core types
pub use dedupx_core::{
    partition, Block, BlockPartitioner,
    Error, Result,
    Row, Value, GROUP_KEY_COLUMN,
};

// Re-export selection engine
pub use dedupx_selection::{
    CascadingCompleteness, WeightedSum, Strategy, StrategyKind,
    CompiledConfig, Condition, ConditionType, DedupeConfig, SchemaError,
    Decision, DecisionSink, SelectionStats, Selector,
};

// Re-export storage
pub use dedupx_storage::{load_config, load_db_config, DbConfig, SqliteStore};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Block, Row, Value, GROUP_KEY_COLUMN,
        Error, Result,
        Condition, DedupeConfig, Selector, Decision, DecisionSink, SelectionStats,
        SqliteStore,
    };
}

/// Comparator functions for custom scoring
pub mod comparator {
    pub use dedupx_selection::comparator::{length_score, max_length, regex_score, BlockParams, PatternMatcher};
}
