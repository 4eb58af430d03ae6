//! # dedupx Core
//!
//! Core data model for the dedupx canonical-record selector.
//!
//! This crate provides the fundamental data structures:
//!
//! - [`Value`] - A cell value (null, integer, float or text); empty text is missing
//! - [`Row`] - An ordered column → value mapping for one candidate record
//! - [`Block`] - A non-empty run of rows sharing one duplicate-group key
//! - [`BlockPartitioner`] - Lazy single-pass partitioner over a grouped row stream
//!
//! ## Example
//!
//! ```rust
//! use dedupx_core::{partition, Row, GROUP_KEY_COLUMN};
//!
//! let rows = vec![
//!     Row::new().with(GROUP_KEY_COLUMN, 1i64).with("id", 10i64),
//!     Row::new().with(GROUP_KEY_COLUMN, 1i64).with("id", 11i64),
//!     Row::new().with(GROUP_KEY_COLUMN, 2i64).with("id", 12i64),
//! ];
//!
//! let blocks: Vec<_> = partition(rows).collect::<Result<_, _>>().unwrap();
//! assert_eq!(blocks.len(), 2);
//! assert!(blocks[1].is_singleton());
//! ```

pub mod block;
pub mod error;
pub mod row;
pub mod value;

pub use block::{partition, Block, BlockPartitioner};
pub use error::{Error, Result};
pub use row::{Row, GROUP_KEY_COLUMN};
pub use value::Value;
