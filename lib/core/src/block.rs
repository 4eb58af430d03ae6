//! Duplicate-group blocks and the streaming partitioner
//!
//! The partitioner turns a row stream that is already grouped by
//! [`GROUP_KEY_COLUMN`](crate::row::GROUP_KEY_COLUMN) (typically via an
//! `ORDER BY dedupe_id` upstream) into maximal runs of rows sharing a key.
//! It never sorts; it only cuts the stream where the key changes.

use crate::error::{Error, Result};
use crate::row::Row;
use crate::value::Value;
use ahash::AHashSet;

/// A non-empty run of rows sharing one group key
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    key: Value,
    rows: Vec<Row>,
}

impl Block {
    /// Create a block under an explicit key.
    ///
    /// An empty row list is a data error, and so is any row whose group key
    /// differs from `key`.
    pub fn new(key: Value, rows: Vec<Row>) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::EmptyBlock);
        }
        for row in &rows {
            let row_key = row.group_key()?;
            if row_key != &key {
                return Err(Error::UngroupedInput {
                    group_key: row_key.to_string(),
                });
            }
        }
        Ok(Self { key, rows })
    }

    /// Build a block from rows, taking the key from the first row and
    /// checking that every other row carries the same key.
    pub fn from_rows(rows: Vec<Row>) -> Result<Self> {
        let key = rows.first().ok_or(Error::EmptyBlock)?.group_key()?.clone();
        for row in &rows[1..] {
            if row.group_key()? != &key {
                return Err(Error::UngroupedInput {
                    group_key: row.group_key()?.to_string(),
                });
            }
        }
        Ok(Self { key, rows })
    }

    #[inline]
    pub fn key(&self) -> &Value {
        &self.key
    }

    #[inline]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Always false; kept for API symmetry with `len`
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// A block of exactly one row has nothing to resolve
    #[inline]
    pub fn is_singleton(&self) -> bool {
        self.rows.len() == 1
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

/// Lazy, single-pass partitioner over a grouped row stream.
///
/// Every maximal run is emitted, singletons included, so concatenating the
/// emitted blocks reproduces the input. Errors from the underlying stream are
/// forwarded as-is and end the partition.
pub struct BlockPartitioner<I> {
    rows: I,
    current_key: Option<Value>,
    pending: Vec<Row>,
    closed: Option<AHashSet<Value>>,
    done: bool,
}

impl<I> BlockPartitioner<I>
where
    I: Iterator<Item = Result<Row>>,
{
    /// Strict partitioner: a key that shows up again after its block was
    /// emitted is reported as [`Error::UngroupedInput`].
    ///
    /// Every closed key is kept until the partitioner is dropped, so memory
    /// grows with the number of groups in the stream. Use [`lenient`] when
    /// the source already guarantees adjacency.
    ///
    /// [`lenient`]: BlockPartitioner::lenient
    pub fn new(rows: I) -> Self {
        Self {
            rows,
            current_key: None,
            pending: Vec::new(),
            closed: Some(AHashSet::new()),
            done: false,
        }
    }

    /// Partitioner that trusts the caller's grouping and keeps no key history
    pub fn lenient(rows: I) -> Self {
        Self {
            closed: None,
            ..Self::new(rows)
        }
    }

    fn close_current(&mut self) -> Option<Block> {
        let key = self.current_key.take()?;
        let rows = std::mem::take(&mut self.pending);
        if let Some(closed) = self.closed.as_mut() {
            closed.insert(key.clone());
        }
        Some(Block { key, rows })
    }
}

impl<I> Iterator for BlockPartitioner<I>
where
    I: Iterator<Item = Result<Row>>,
{
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let row = match self.rows.next() {
                Some(Ok(row)) => row,
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    return self.close_current().map(Ok);
                }
            };

            let key = match row.group_key() {
                Ok(k) => k.clone(),
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            if self.current_key.as_ref() == Some(&key) {
                self.pending.push(row);
                continue;
            }

            if let Some(closed) = &self.closed {
                if closed.contains(&key) {
                    self.done = true;
                    return Some(Err(Error::UngroupedInput {
                        group_key: key.to_string(),
                    }));
                }
            }

            let finished = self.close_current();
            self.current_key = Some(key);
            self.pending.push(row);

            if let Some(block) = finished {
                return Some(Ok(block));
            }
        }
    }
}

/// Partition plain rows (no upstream errors)
pub fn partition<R>(rows: R) -> BlockPartitioner<std::iter::Map<R::IntoIter, fn(Row) -> Result<Row>>>
where
    R: IntoIterator<Item = Row>,
{
    BlockPartitioner::new(rows.into_iter().map(Ok as fn(Row) -> Result<Row>))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::GROUP_KEY_COLUMN;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn row(key: i64, id: i64) -> Row {
        Row::new().with(GROUP_KEY_COLUMN, key).with("id", id)
    }

    fn ids(block: &Block) -> Vec<i64> {
        block
            .rows()
            .iter()
            .map(|r| match r.get("id") {
                Some(Value::Integer(i)) => *i,
                _ => panic!("id missing"),
            })
            .collect()
    }

    #[test]
    fn test_empty_block_rejected() {
        assert!(matches!(Block::new(Value::Integer(1), vec![]), Err(Error::EmptyBlock)));
        assert!(matches!(Block::from_rows(vec![]), Err(Error::EmptyBlock)));
    }

    #[test]
    fn test_new_checks_keys_against_given_key() {
        let block = Block::new(Value::Integer(1), vec![row(1, 1), row(1, 2)]).unwrap();
        assert_eq!(block.key(), &Value::Integer(1));

        assert!(matches!(
            Block::new(Value::Integer(9), vec![row(1, 1), row(2, 2)]),
            Err(Error::UngroupedInput { ref group_key }) if group_key == "1"
        ));
        assert!(matches!(
            Block::new(Value::Integer(1), vec![row(1, 1), row(2, 2)]),
            Err(Error::UngroupedInput { ref group_key }) if group_key == "2"
        ));
        assert!(matches!(
            Block::new(Value::Integer(1), vec![Row::new().with("id", 1i64)]),
            Err(Error::MissingGroupKey { .. })
        ));
    }

    #[test]
    fn test_from_rows_checks_keys() {
        let block = Block::from_rows(vec![row(1, 1), row(1, 2)]).unwrap();
        assert_eq!(block.key(), &Value::Integer(1));
        assert_eq!(block.len(), 2);

        assert!(matches!(
            Block::from_rows(vec![row(1, 1), row(2, 2)]),
            Err(Error::UngroupedInput { .. })
        ));
    }

    #[test]
    fn test_partition_runs() {
        let rows = vec![row(1, 1), row(1, 2), row(2, 3), row(3, 4), row(3, 5), row(3, 6)];
        let blocks: Vec<Block> = partition(rows).collect::<Result<_>>().unwrap();

        assert_eq!(blocks.len(), 3);
        assert_eq!(ids(&blocks[0]), vec![1, 2]);
        assert_eq!(ids(&blocks[1]), vec![3]);
        assert!(blocks[1].is_singleton());
        assert_eq!(ids(&blocks[2]), vec![4, 5, 6]);
    }

    #[test]
    fn test_partition_empty_stream() {
        let blocks: Vec<Block> = partition(Vec::new()).collect::<Result<_>>().unwrap();
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_partition_trailing_block_emitted() {
        let blocks: Vec<Block> = partition(vec![row(9, 1), row(9, 2)])
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(ids(&blocks[0]), vec![1, 2]);
    }

    #[test]
    fn test_strict_detects_ungrouped_input() {
        let rows = vec![row(1, 1), row(2, 2), row(1, 3)];
        let results: Vec<Result<Block>> = partition(rows).collect();

        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(Error::UngroupedInput { ref group_key }) if group_key == "1"
        ));
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_lenient_accepts_reappearing_key() {
        let rows = vec![row(1, 1), row(2, 2), row(1, 3)];
        let blocks: Vec<Block> = BlockPartitioner::lenient(rows.into_iter().map(Ok))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(blocks.len(), 3);
    }

    #[test]
    fn test_missing_group_key_is_error() {
        let rows = vec![row(1, 1), Row::new().with("id", 2i64)];
        let results: Vec<Result<Block>> = partition(rows).collect();
        assert!(matches!(results.last(), Some(Err(Error::MissingGroupKey { .. }))));
    }

    #[test]
    fn test_upstream_error_forwarded() {
        let rows: Vec<Result<Row>> = vec![
            Ok(row(1, 1)),
            Err(Error::Storage("connection lost".to_string())),
            Ok(row(1, 2)),
        ];
        let results: Vec<Result<Block>> = BlockPartitioner::new(rows.into_iter()).collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(Error::Storage(_))));
    }

    #[test]
    fn test_partition_reconstructs_input() {
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..50 {
            let mut rows = Vec::new();
            let mut next_id = 0i64;
            let groups = rng.random_range(0..20);
            for key in 0..groups {
                for _ in 0..rng.random_range(1..5) {
                    rows.push(row(key, next_id));
                    next_id += 1;
                }
            }

            let blocks: Vec<Block> = partition(rows.clone()).collect::<Result<_>>().unwrap();

            let rebuilt: Vec<Row> = blocks.iter().flat_map(|b| b.rows().to_vec()).collect();
            assert_eq!(rebuilt, rows);

            let mut seen = std::collections::HashSet::new();
            for block in &blocks {
                assert!(seen.insert(block.key().clone()), "key split across blocks");
                assert!(block.rows().iter().all(|r| r.group_key().unwrap() == block.key()));
            }
        }
    }
}
