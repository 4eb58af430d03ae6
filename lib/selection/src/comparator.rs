//! Per-field comparators for weighted scoring
//!
//! Each comparator scores one field value against its configured weight.
//! Both are total: a missing value scores 0, nothing here can fail once the
//! configuration has been compiled.

use dedupx_core::{Block, Result, Value};
use regex::{Regex, RegexBuilder};

use crate::schema::CompiledConfig;

/// Length comparator: `len(value) / max_length * weight`, 0 when missing.
///
/// `max_length` is the longest non-missing value of the column in the
/// current block; callers floor it at 1.
pub fn length_score(value: &Value, weight: f64, max_length: usize) -> f64 {
    match value.text_len() {
        Some(len) => len as f64 / max_length.max(1) as f64 * weight,
        None => 0.0,
    }
}

/// Regex comparator: `weight` when the pattern matches at the start of the
/// value, 0 otherwise or when missing.
pub fn regex_score(value: &Value, weight: f64, matcher: &PatternMatcher) -> f64 {
    match value.as_text() {
        Some(text) if matcher.is_match(&text) => weight,
        _ => 0.0,
    }
}

/// Longest non-missing value of `column` across the block, floored at 1
pub fn max_length(block: &Block, column: &str) -> Result<usize> {
    let mut longest = 0;
    for row in block.rows() {
        if let Some(len) = row.require(column)?.text_len() {
            longest = longest.max(len);
        }
    }
    Ok(longest.max(1))
}

/// A compiled, left-anchored pattern.
///
/// Matching starts at the beginning of the value but does not have to
/// consume all of it: `^yes` matches `"yes please"`.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    pattern: String,
    ignore_case: bool,
    regex: Regex,
}

impl PatternMatcher {
    pub fn compile(pattern: &str, ignore_case: bool) -> std::result::Result<Self, regex::Error> {
        let regex = RegexBuilder::new(&format!("^(?:{})", pattern))
            .case_insensitive(ignore_case)
            .build()?;
        Ok(Self {
            pattern: pattern.to_string(),
            ignore_case,
            regex,
        })
    }

    #[inline]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }
}

impl PartialEq for PatternMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.ignore_case == other.ignore_case
    }
}

/// Compiled comparator for one scored column
#[derive(Debug, Clone, PartialEq)]
pub enum Comparator {
    Length { weight: f64 },
    Regex { weight: f64, matcher: PatternMatcher },
}

impl Comparator {
    pub fn weight(&self) -> f64 {
        match self {
            Comparator::Length { weight } | Comparator::Regex { weight, .. } => *weight,
        }
    }

    #[inline]
    pub fn needs_max_length(&self) -> bool {
        matches!(self, Comparator::Length { .. })
    }

    /// Score a value. `max_length` is only read by the length comparator.
    pub fn score(&self, value: &Value, max_length: usize) -> f64 {
        match self {
            Comparator::Length { weight } => length_score(value, *weight, max_length),
            Comparator::Regex { weight, matcher } => regex_score(value, *weight, matcher),
        }
    }
}

/// Parameters derived from one block and discarded with it.
///
/// Holds the `max_length` of every length-scored column, indexed like
/// [`CompiledConfig::columns`]. Computed fresh for each block, so nothing
/// carries over between blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockParams {
    max_lengths: Vec<usize>,
}

impl BlockParams {
    pub fn compute(config: &CompiledConfig, block: &Block) -> Result<Self> {
        let mut max_lengths = Vec::with_capacity(config.columns.len());
        for column in &config.columns {
            let max = match &column.comparator {
                Some(c) if c.needs_max_length() => max_length(block, &column.name)?,
                _ => 1,
            };
            max_lengths.push(max);
        }
        Ok(Self { max_lengths })
    }

    #[inline]
    pub fn max_length(&self, column_index: usize) -> usize {
        self.max_lengths.get(column_index).copied().unwrap_or(1)
    }
}
