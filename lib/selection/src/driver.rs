//! Selection driver
//!
//! Glues the block partitioner to the configured strategy. The selector is
//! built from a config once; building it is where configuration errors
//! surface, before any row is read.

use dedupx_core::{Block, BlockPartitioner, Result, Row};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::debug;

use crate::explain::{Decision, DecisionSink, SelectionStats};
use crate::schema::{CompiledConfig, DedupeConfig, StrategyKind};
use crate::strategy::{self, Strategy};

/// Picks the canonical row of every multi-row block in a grouped row stream
pub struct Selector {
    config: Arc<CompiledConfig>,
    strategy: Box<dyn Strategy>,
    strict_grouping: bool,
}

impl Selector {
    /// Validate the config and pick the strategy it names
    pub fn from_config(config: &DedupeConfig) -> Result<Self> {
        let compiled = config.compile()?;
        Ok(Self::new(compiled))
    }

    pub fn new(config: CompiledConfig) -> Self {
        let config = Arc::new(config);
        let strategy = strategy::for_config(config.clone());
        Self {
            config,
            strategy,
            strict_grouping: true,
        }
    }

    /// Trust the caller's grouping instead of tracking closed group keys
    #[must_use]
    pub fn with_strict_grouping(mut self, strict: bool) -> Self {
        self.strict_grouping = strict;
        self
    }

    pub fn config(&self) -> &CompiledConfig {
        &self.config
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    /// Decide one block. Singletons are already canonical and yield `None`
    /// without reaching the strategy.
    pub fn select_block(&self, block: &Block) -> Result<Option<Decision>> {
        if block.is_singleton() {
            return Ok(None);
        }

        let selection = self.strategy.select(block)?;
        let winner = &block.rows()[selection.index];
        let winning_row_id = winner.require(&self.config.id_column)?.clone();

        debug!(
            group = %block.key(),
            winner = %winning_row_id,
            candidates = block.len(),
            score = ?selection.score,
            "selected canonical row"
        );

        Ok(Some(Decision {
            group_key: block.key().clone(),
            winning_row_id,
            score: selection.score,
            block_size: block.len(),
            explain: selection.field_scores,
        }))
    }

    /// Partition a grouped row stream into blocks
    pub fn blocks<I>(&self, rows: I) -> BlockPartitioner<I::IntoIter>
    where
        I: IntoIterator<Item = Result<Row>>,
    {
        if self.strict_grouping {
            BlockPartitioner::new(rows.into_iter())
        } else {
            BlockPartitioner::lenient(rows.into_iter())
        }
    }

    /// Lazily decide every multi-row block of a grouped row stream
    pub fn decisions<I>(&self, rows: I) -> Decisions<'_, I::IntoIter>
    where
        I: IntoIterator<Item = Result<Row>>,
    {
        Decisions {
            selector: self,
            blocks: self.blocks(rows),
        }
    }

    /// Drive a grouped row stream into a sink, stopping at the first error
    pub fn run<I, S>(&self, rows: I, sink: &mut S) -> Result<SelectionStats>
    where
        I: IntoIterator<Item = Result<Row>>,
        S: DecisionSink + ?Sized,
    {
        let mut stats = SelectionStats::default();
        for block in self.blocks(rows) {
            let block = block?;
            stats.record_block(block.len());
            if let Some(decision) = self.select_block(&block)? {
                sink.accept(decision)?;
                stats.decisions += 1;
            }
        }
        Ok(stats)
    }

    /// Decide independent blocks in parallel; output follows input order
    /// with singletons left out.
    pub fn select_blocks_parallel(&self, blocks: &[Block]) -> Result<Vec<Decision>> {
        let decided: Vec<Option<Decision>> = blocks
            .par_iter()
            .map(|block| self.select_block(block))
            .collect::<Result<_>>()?;
        Ok(decided.into_iter().flatten().collect())
    }
}

/// Iterator returned by [`Selector::decisions`]
pub struct Decisions<'a, I> {
    selector: &'a Selector,
    blocks: BlockPartitioner<I>,
}

impl<'a, I> Iterator for Decisions<'a, I>
where
    I: Iterator<Item = Result<Row>>,
{
    type Item = Result<Decision>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let block = match self.blocks.next()? {
                Ok(block) => block,
                Err(e) => return Some(Err(e)),
            };
            match self.selector.select_block(&block) {
                Ok(Some(decision)) => return Some(Ok(decision)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Condition;
    use dedupx_core::{Error, Value, GROUP_KEY_COLUMN};

    fn config(strategy: i64) -> DedupeConfig {
        DedupeConfig::new("PROJECT", "MasterID", "PREFERREDRECORD", strategy)
            .column("Title", Condition::length(45.0))
            .column("CTSIReview", Condition::length(20.0))
            .column("ClinicalTrialStatus", Condition::regex(35.0, "^yes$"))
    }

    fn row(group: i64, id: i64, title: Option<&str>, review: Option<&str>, status: Option<&str>) -> Result<Row> {
        Ok(Row::new()
            .with(GROUP_KEY_COLUMN, group)
            .with("MasterID", id)
            .with("Title", title)
            .with("CTSIReview", review)
            .with("ClinicalTrialStatus", status))
    }

    fn stream() -> Vec<Result<Row>> {
        vec![
            row(1, 10, Some("A"), None, Some("yes")),
            row(1, 11, Some("Alpha"), Some("ok"), Some("no")),
            row(2, 20, Some("Lonely"), None, None),
            row(3, 30, Some("Same"), Some("x"), None),
            row(3, 31, Some("Same"), Some("x"), None),
            row(3, 32, None, Some("x"), Some("yes")),
        ]
    }

    #[test]
    fn test_unknown_strategy_fails_before_rows() {
        assert!(matches!(
            Selector::from_config(&config(7)),
            Err(Error::UnknownStrategy(7))
        ));
    }

    #[test]
    fn test_invalid_regex_fails_fast() {
        let bad = DedupeConfig::new("t", "id", "u", 2).column("s", Condition::regex(1.0, "[oops"));
        assert!(matches!(
            Selector::from_config(&bad),
            Err(Error::InvalidRegex { ref column, .. }) if column == "s"
        ));
    }

    #[test]
    fn test_weighted_decisions() {
        let selector = Selector::from_config(&config(2)).unwrap();
        assert_eq!(selector.strategy_kind(), StrategyKind::Weighted);

        let decisions: Vec<Decision> = selector.decisions(stream()).collect::<Result<_>>().unwrap();
        assert_eq!(decisions.len(), 2);

        assert_eq!(decisions[0].group_key, Value::Integer(1));
        assert_eq!(decisions[0].winning_row_id, Value::Integer(11));
        assert_eq!(decisions[0].score, Some(65.0));
        assert_eq!(decisions[0].top_contributing_field(), Some("Title"));

        assert_eq!(decisions[1].group_key, Value::Integer(3));
        assert_eq!(decisions[1].winning_row_id, Value::Integer(30));
        assert_eq!(decisions[1].block_size, 3);
    }

    #[test]
    fn test_cascading_decisions() {
        let selector = Selector::from_config(&config(1)).unwrap();
        let decisions: Vec<Decision> = selector.decisions(stream()).collect::<Result<_>>().unwrap();

        let winners: Vec<_> = decisions.iter().map(|d| d.winning_row_id.clone()).collect();
        assert_eq!(winners, vec![Value::Integer(11), Value::Integer(30)]);
        assert!(decisions.iter().all(|d| d.score.is_none()));
    }

    #[test]
    fn test_singleton_never_reaches_strategy() {
        let selector = Selector::from_config(&config(2)).unwrap();
        // A singleton missing every scored column would fail if it were scored
        let lone = Row::new().with(GROUP_KEY_COLUMN, 5i64).with("MasterID", 50i64);
        let block = Block::from_rows(vec![lone]).unwrap();
        assert_eq!(selector.select_block(&block).unwrap(), None);
    }

    #[test]
    fn test_run_collects_stats() {
        let selector = Selector::from_config(&config(2)).unwrap();
        let mut sink: Vec<Decision> = Vec::new();
        let stats = selector.run(stream(), &mut sink).unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(stats.rows, 6);
        assert_eq!(stats.blocks, 3);
        assert_eq!(stats.singletons, 1);
        assert_eq!(stats.decisions, 2);
        assert_eq!(stats.largest_block, 3);
    }

    #[test]
    fn test_missing_id_column_is_data_error() {
        let selector = Selector::from_config(&config(2)).unwrap();
        let rows = vec![
            Ok(Row::new()
                .with(GROUP_KEY_COLUMN, 1i64)
                .with("Title", "a")
                .with("CTSIReview", "b")
                .with("ClinicalTrialStatus", "c")),
            Ok(Row::new()
                .with(GROUP_KEY_COLUMN, 1i64)
                .with("Title", "a")
                .with("CTSIReview", "b")
                .with("ClinicalTrialStatus", "c")),
        ];
        let mut sink: Vec<Decision> = Vec::new();
        assert!(matches!(
            selector.run(rows, &mut sink),
            Err(Error::MissingColumn { ref column, .. }) if column == "MasterID"
        ));
    }

    #[test]
    fn test_ungrouped_input_rejected_when_strict() {
        let mut rows = stream();
        rows.push(row(1, 12, Some("late"), None, None));

        let strict = Selector::from_config(&config(2)).unwrap();
        let mut sink: Vec<Decision> = Vec::new();
        assert!(matches!(
            strict.run(rows, &mut sink),
            Err(Error::UngroupedInput { .. })
        ));

        let mut rows = stream();
        rows.push(row(1, 12, Some("late"), None, None));
        let lenient = Selector::from_config(&config(2)).unwrap().with_strict_grouping(false);
        let mut sink: Vec<Decision> = Vec::new();
        let stats = lenient.run(rows, &mut sink).unwrap();
        assert_eq!(stats.blocks, 4);
        assert_eq!(stats.singletons, 2);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let selector = Selector::from_config(&config(2)).unwrap();

        let mut rows = Vec::new();
        for group in 0..200i64 {
            for i in 0..(group % 4 + 1) {
                let title = "t".repeat((group * 7 + i * 3) as usize % 11 + 1);
                rows.push(row(group, group * 10 + i, Some(&title), None, Some("yes")).unwrap());
            }
        }

        let blocks: Vec<Block> = selector
            .blocks(rows.clone().into_iter().map(Ok))
            .collect::<Result<_>>()
            .unwrap();
        let parallel = selector.select_blocks_parallel(&blocks).unwrap();
        let sequential: Vec<Decision> = selector
            .decisions(rows.into_iter().map(Ok))
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(parallel, sequential);
    }
}
