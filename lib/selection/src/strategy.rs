//! Ranking strategies
//!
//! A [`Strategy`] picks the canonical row of one block. Two policies exist:
//!
//! - [`CascadingCompleteness`] (strategy `1`): pairwise fold, column by
//!   column, where a present value beats a missing one and a longer value
//!   beats a shorter one.
//! - [`WeightedSum`] (strategy `2`): sum of per-column comparator scores,
//!   highest total wins.
//!
//! Both are deterministic. When nothing separates two rows the row seen
//! first is kept.

use dedupx_core::{Block, Error, Result, Row};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::trace;

use crate::comparator::BlockParams;
use crate::schema::{CompiledConfig, StrategyKind};

/// Winner of one block
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Index of the winning row inside the block
    pub index: usize,
    /// Aggregate score, only for scoring strategies
    pub score: Option<f64>,
    /// Per-column weighted contributions of the winner, in column order
    pub field_scores: Vec<(String, f64)>,
}

/// A policy for picking one row out of a block
pub trait Strategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Pick the winner. Fails only on empty blocks or rows missing a
    /// configured column.
    fn select(&self, block: &Block) -> Result<Selection>;
}

/// Build the strategy named by the compiled config
pub fn for_config(config: Arc<CompiledConfig>) -> Box<dyn Strategy> {
    match config.strategy {
        StrategyKind::Cascading => Box::new(CascadingCompleteness::new(config)),
        StrategyKind::Weighted => Box::new(WeightedSum::new(config)),
    }
}

/// Strategy 1: completeness beats length, evaluated column by column
#[derive(Debug, Clone)]
pub struct CascadingCompleteness {
    config: Arc<CompiledConfig>,
}

impl CascadingCompleteness {
    pub fn new(config: Arc<CompiledConfig>) -> Self {
        Self { config }
    }

    /// Compare two rows. `Greater` means `left` wins, `Less` means `right`
    /// wins, `Equal` means no column separates them.
    pub fn compare(&self, left: &Row, right: &Row) -> Result<Ordering> {
        for column in &self.config.columns {
            let l = left.require(&column.name)?.text_len();
            let r = right.require(&column.name)?.text_len();

            let ord = match (l, r) {
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(&b),
                (None, None) => Ordering::Equal,
            };
            if ord != Ordering::Equal {
                return Ok(ord);
            }
        }
        Ok(Ordering::Equal)
    }
}

impl Strategy for CascadingCompleteness {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Cascading
    }

    fn select(&self, block: &Block) -> Result<Selection> {
        let rows = block.rows();
        if rows.is_empty() {
            return Err(Error::EmptyBlock);
        }

        let mut greatest = 0;
        for (i, row) in rows.iter().enumerate().skip(1) {
            // Left operand keeps ties
            if self.compare(&rows[greatest], row)? == Ordering::Less {
                greatest = i;
            }
        }

        Ok(Selection {
            index: greatest,
            score: None,
            field_scores: Vec::new(),
        })
    }
}

/// Strategy 2: weighted multi-criterion sum
#[derive(Debug, Clone)]
pub struct WeightedSum {
    config: Arc<CompiledConfig>,
}

impl WeightedSum {
    pub fn new(config: Arc<CompiledConfig>) -> Self {
        Self { config }
    }

    /// Score one row against the block's derived parameters.
    ///
    /// Returns `(total, per-column contributions)`.
    pub fn score_row(&self, row: &Row, params: &BlockParams) -> Result<(f64, Vec<(String, f64)>)> {
        let mut total = 0.0;
        let mut field_scores = Vec::with_capacity(self.config.columns.len());

        for (i, column) in self.config.columns.iter().enumerate() {
            let comparator = column.comparator.as_ref().ok_or_else(|| Error::MissingCondition {
                column: column.name.clone(),
            })?;
            let value = row.require(&column.name)?;
            let score = comparator.score(value, params.max_length(i));
            field_scores.push((column.name.clone(), score));
            total += score;
        }

        Ok((total, field_scores))
    }
}

impl Strategy for WeightedSum {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Weighted
    }

    fn select(&self, block: &Block) -> Result<Selection> {
        if block.rows().is_empty() {
            return Err(Error::EmptyBlock);
        }

        let params = BlockParams::compute(&self.config, block)?;

        let mut best: Option<(usize, f64, Vec<(String, f64)>)> = None;
        for (i, row) in block.rows().iter().enumerate() {
            let (score, field_scores) = self.score_row(row, &params)?;
            trace!(group = %block.key(), row = i, score, "scored row");

            // Only a strict improvement replaces the current best
            let replace = match &best {
                None => true,
                Some((_, best_score, _)) => score > *best_score,
            };
            if replace {
                best = Some((i, score, field_scores));
            }
        }

        let (index, score, field_scores) = best.ok_or(Error::EmptyBlock)?;
        Ok(Selection {
            index,
            score: Some(score),
            field_scores,
        })
    }
}
