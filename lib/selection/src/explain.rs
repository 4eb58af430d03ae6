//! Decisions produced by the selector
//!
//! A [`Decision`] names the canonical row of one multi-row block and, for the
//! weighted strategy, how its score was made up. Decisions are handed to a
//! [`DecisionSink`], the seam where persistence plugs in.

use dedupx_core::{Result, Value};
use serde::Serialize;

/// Canonical-row decision for one block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    /// Group key shared by every row of the block
    pub group_key: Value,
    /// Identifier of the winning row
    pub winning_row_id: Value,
    /// Aggregate score of the winner (weighted strategy only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Number of candidate rows in the block
    pub block_size: usize,
    /// Per-column weighted contributions of the winner
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub explain: Vec<(String, f64)>,
}

impl Decision {
    /// Column that contributed most to the winner's score
    pub fn top_contributing_field(&self) -> Option<&str> {
        self.explain
            .iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(name, _)| name.as_str())
    }
}

/// Receives decisions as they are produced
pub trait DecisionSink {
    fn accept(&mut self, decision: Decision) -> Result<()>;
}

impl DecisionSink for Vec<Decision> {
    fn accept(&mut self, decision: Decision) -> Result<()> {
        self.push(decision);
        Ok(())
    }
}

/// Counters for one selection run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectionStats {
    /// Rows consumed from the input stream
    pub rows: usize,
    /// Blocks emitted by the partitioner, singletons included
    pub blocks: usize,
    /// Singleton blocks that were skipped
    pub singletons: usize,
    /// Decisions handed to the sink
    pub decisions: usize,
    /// Size of the largest block seen
    pub largest_block: usize,
}

impl SelectionStats {
    pub fn record_block(&mut self, size: usize) {
        self.rows += size;
        self.blocks += 1;
        self.largest_block = self.largest_block.max(size);
        if size == 1 {
            self.singletons += 1;
        }
    }

    /// Average rows per resolved (multi-row) block
    pub fn avg_block_size(&self) -> f64 {
        if self.decisions == 0 {
            return 0.0;
        }
        (self.rows - self.singletons) as f64 / self.decisions as f64
    }
}
