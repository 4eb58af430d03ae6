//! Selection configuration
//!
//! [`DedupeConfig`] is the declarative shape loaded from a config file.
//! [`DedupeConfig::compile`] validates it once, compiles every regex, picks
//! the strategy and yields an immutable [`CompiledConfig`]. Nothing scores
//! against an uncompiled config.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::HashSet;
use tracing::warn;

use crate::comparator::{Comparator, PatternMatcher};

/// Declarative selection config
///
/// Every key is required and unknown keys are rejected. `conditions` maps a
/// scored column to its comparator; strategy `1` ignores it, strategy `2`
/// needs an entry for every listed column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DedupeConfig {
    /// Table holding the duplicate rows
    pub table: String,

    /// Row identifier column
    pub id: String,

    /// Flag column set to 1 on the canonical row of each group
    pub uniqueness_column: String,

    /// Scored columns, in evaluation order
    pub columns: Vec<String>,

    /// Comparator configuration keyed by column name
    pub conditions: HashMap<String, Condition>,

    /// `1` = cascading completeness, `2` = weighted sum
    pub strategy: i64,
}

impl DedupeConfig {
    pub fn new(
        table: impl Into<String>,
        id: impl Into<String>,
        uniqueness_column: impl Into<String>,
        strategy: i64,
    ) -> Self {
        Self {
            table: table.into(),
            id: id.into(),
            uniqueness_column: uniqueness_column.into(),
            columns: Vec::new(),
            conditions: HashMap::new(),
            strategy,
        }
    }

    /// Append a scored column with its condition
    #[must_use]
    pub fn column(mut self, name: impl Into<String>, condition: Condition) -> Self {
        let name = name.into();
        self.conditions.insert(name.clone(), condition);
        self.columns.push(name);
        self
    }

    /// Append a column without a condition (only meaningful for strategy 1)
    #[must_use]
    pub fn plain_column(mut self, name: impl Into<String>) -> Self {
        self.columns.push(name.into());
        self
    }

    /// Validate and compile the config
    pub fn compile(&self) -> Result<CompiledConfig, SchemaError> {
        let strategy = StrategyKind::try_from(self.strategy)?;

        for (what, value) in [
            ("table", &self.table),
            ("id", &self.id),
            ("uniqueness_column", &self.uniqueness_column),
        ] {
            if value.trim().is_empty() {
                return Err(SchemaError::EmptyName(what));
            }
        }

        if self.columns.is_empty() {
            return Err(SchemaError::EmptyColumns);
        }

        let mut seen = HashSet::new();
        for name in &self.columns {
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::DuplicateColumn(name.clone()));
            }
        }

        let mut unknown: Vec<_> = self
            .conditions
            .keys()
            .filter(|k| !seen.contains(k.as_str()))
            .collect();
        if !unknown.is_empty() {
            unknown.sort();
            return Err(SchemaError::UnknownConditionColumn(unknown[0].clone()));
        }

        let mut columns = Vec::with_capacity(self.columns.len());
        for name in &self.columns {
            let comparator = match self.conditions.get(name) {
                Some(condition) => Some(condition.compile(name)?),
                None if strategy == StrategyKind::Weighted => {
                    return Err(SchemaError::MissingCondition(name.clone()));
                }
                None => None,
            };
            columns.push(ScoredColumn {
                name: name.clone(),
                comparator,
            });
        }

        Ok(CompiledConfig {
            table: self.table.clone(),
            id_column: self.id.clone(),
            uniqueness_column: self.uniqueness_column.clone(),
            columns,
            strategy,
        })
    }
}

/// Configuration for one scored column
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Condition {
    /// Comparator type (length or regex)
    #[serde(rename = "type")]
    pub kind: ConditionType,

    /// Contribution of this column to the total score; must be positive
    pub weight: f64,

    /// Pattern for regex conditions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,

    #[serde(default = "default_ignore_case")]
    pub ignore_case: bool,
}

fn default_ignore_case() -> bool {
    true
}

impl Condition {
    /// Length condition: longer values score proportionally higher
    pub fn length(weight: f64) -> Self {
        Self {
            kind: ConditionType::Length,
            weight,
            regex: None,
            ignore_case: true,
        }
    }

    /// Regex condition: full weight when the pattern matches from the start
    pub fn regex(weight: f64, pattern: impl Into<String>) -> Self {
        Self {
            kind: ConditionType::Regex,
            weight,
            regex: Some(pattern.into()),
            ignore_case: true,
        }
    }

    #[must_use]
    pub fn case_sensitive(mut self) -> Self {
        self.ignore_case = false;
        self
    }

    fn compile(&self, column: &str) -> Result<Comparator, SchemaError> {
        if !self.weight.is_finite() || self.weight <= 0.0 {
            return Err(SchemaError::InvalidWeight {
                column: column.to_string(),
                weight: self.weight,
            });
        }

        match self.kind {
            ConditionType::Length => {
                if self.regex.is_some() {
                    warn!(column, "regex ignored on a length condition");
                }
                Ok(Comparator::Length { weight: self.weight })
            }
            ConditionType::Regex => {
                let pattern = self
                    .regex
                    .as_deref()
                    .ok_or_else(|| SchemaError::MissingRegex(column.to_string()))?;
                let matcher = PatternMatcher::compile(pattern, self.ignore_case).map_err(|e| {
                    SchemaError::InvalidRegex {
                        column: column.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                Ok(Comparator::Regex {
                    weight: self.weight,
                    matcher,
                })
            }
        }
    }
}

/// Comparator type for a condition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConditionType {
    Length,
    Regex,
}

/// Which ranking policy picks the canonical row
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Strategy 1: completeness first, then length, column by column
    Cascading,
    /// Strategy 2: weighted sum of per-column comparator scores
    Weighted,
}

impl StrategyKind {
    pub fn id(self) -> i64 {
        match self {
            StrategyKind::Cascading => 1,
            StrategyKind::Weighted => 2,
        }
    }
}

impl TryFrom<i64> for StrategyKind {
    type Error = SchemaError;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(StrategyKind::Cascading),
            2 => Ok(StrategyKind::Weighted),
            other => Err(SchemaError::UnknownStrategy(other)),
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Cascading => write!(f, "cascading"),
            StrategyKind::Weighted => write!(f, "weighted"),
        }
    }
}

/// Validated, immutable config ready for scoring
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledConfig {
    pub table: String,
    pub id_column: String,
    pub uniqueness_column: String,
    pub columns: Vec<ScoredColumn>,
    pub strategy: StrategyKind,
}

impl CompiledConfig {
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredColumn {
    pub name: String,
    pub comparator: Option<Comparator>,
}

/// Errors raised while validating a config
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchemaError {
    #[error("Unknown strategy: {0} (expected 1 or 2)")]
    UnknownStrategy(i64),

    #[error("'{0}' cannot be empty")]
    EmptyName(&'static str),

    #[error("At least one column must be listed")]
    EmptyColumns,

    #[error("Column '{0}' is listed twice")]
    DuplicateColumn(String),

    #[error("Column '{0}' has no condition configured")]
    MissingCondition(String),

    #[error("Condition given for unlisted column '{0}'")]
    UnknownConditionColumn(String),

    #[error("Column '{column}' has invalid weight {weight}; weights must be positive")]
    InvalidWeight { column: String, weight: f64 },

    #[error("Column '{0}' is a regex condition without a 'regex' pattern")]
    MissingRegex(String),

    #[error("Column '{column}': invalid regex: {reason}")]
    InvalidRegex { column: String, reason: String },
}

impl From<SchemaError> for dedupx_core::Error {
    fn from(e: SchemaError) -> Self {
        match e {
            SchemaError::UnknownStrategy(id) => dedupx_core::Error::UnknownStrategy(id),
            SchemaError::MissingCondition(column) => dedupx_core::Error::MissingCondition { column },
            SchemaError::InvalidRegex { column, reason } => {
                dedupx_core::Error::InvalidRegex { column, reason }
            }
            other => dedupx_core::Error::InvalidConfig(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project_config(strategy: i64) -> DedupeConfig {
        DedupeConfig::new("PROJECT", "MasterID", "PREFERREDRECORD", strategy)
            .column("Title", Condition::length(45.0))
            .column("CTSIReview", Condition::length(20.0))
            .column("ClinicalTrialStatus", Condition::regex(35.0, "^yes$"))
    }

    #[test]
    fn test_compile_weighted() {
        let compiled = project_config(2).compile().unwrap();
        assert_eq!(compiled.strategy, StrategyKind::Weighted);
        assert_eq!(
            compiled.column_names().collect::<Vec<_>>(),
            vec!["Title", "CTSIReview", "ClinicalTrialStatus"]
        );
        assert!(matches!(
            compiled.columns[2].comparator,
            Some(Comparator::Regex { weight, ref matcher }) if weight == 35.0 && matcher.ignore_case()
        ));
    }

    #[test]
    fn test_unknown_strategy() {
        assert!(matches!(
            project_config(3).compile(),
            Err(SchemaError::UnknownStrategy(3))
        ));
        assert!(matches!(
            project_config(0).compile(),
            Err(SchemaError::UnknownStrategy(0))
        ));
    }

    #[test]
    fn test_weighted_requires_every_condition() {
        let config = project_config(2).plain_column("Notes");
        assert!(matches!(
            config.compile(),
            Err(SchemaError::MissingCondition(ref c)) if c == "Notes"
        ));
    }

    #[test]
    fn test_cascading_allows_plain_columns() {
        let config = DedupeConfig::new("t", "id", "u", 1)
            .plain_column("a")
            .plain_column("b");
        let compiled = config.compile().unwrap();
        assert_eq!(compiled.strategy, StrategyKind::Cascading);
        assert!(compiled.columns.iter().all(|c| c.comparator.is_none()));
    }

    #[test]
    fn test_invalid_weights() {
        for weight in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = DedupeConfig::new("t", "id", "u", 2).column("a", Condition::length(weight));
            assert!(matches!(config.compile(), Err(SchemaError::InvalidWeight { .. })));
        }
    }

    #[test]
    fn test_regex_condition_requires_pattern() {
        let mut condition = Condition::regex(1.0, "x");
        condition.regex = None;
        let config = DedupeConfig::new("t", "id", "u", 2).column("a", condition);
        assert!(matches!(config.compile(), Err(SchemaError::MissingRegex(_))));
    }

    #[test]
    fn test_invalid_regex_names_column() {
        let config = DedupeConfig::new("t", "id", "u", 2).column("Status", Condition::regex(1.0, "(yes"));
        match config.compile() {
            Err(SchemaError::InvalidRegex { column, .. }) => assert_eq!(column, "Status"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_structural_errors() {
        assert!(matches!(
            DedupeConfig::new("t", "id", "u", 1).compile(),
            Err(SchemaError::EmptyColumns)
        ));
        assert!(matches!(
            DedupeConfig::new("t", "id", "u", 1).plain_column("a").plain_column("a").compile(),
            Err(SchemaError::DuplicateColumn(_))
        ));
        assert!(matches!(
            DedupeConfig::new("", "id", "u", 1).plain_column("a").compile(),
            Err(SchemaError::EmptyName("table"))
        ));

        let mut config = DedupeConfig::new("t", "id", "u", 1).plain_column("a");
        config.conditions.insert("b".to_string(), Condition::length(1.0));
        assert!(matches!(
            config.compile(),
            Err(SchemaError::UnknownConditionColumn(ref c)) if c == "b"
        ));
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{
            "strategy": 2,
            "table": "PROJECT",
            "id": "MasterID",
            "uniqueness_column": "PREFERREDRECORD",
            "columns": ["Title", "CTSIReview", "ClinicalTrialStatus"],
            "conditions": {
                "Title": {"type": "length", "weight": 45},
                "CTSIReview": {"type": "length", "weight": 20},
                "ClinicalTrialStatus": {"type": "regex", "weight": 35, "regex": "^yes$"}
            }
        }"#;
        let parsed: DedupeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, project_config(2));
        assert!(parsed.conditions["ClinicalTrialStatus"].ignore_case);
    }

    #[test]
    fn test_json_rejects_unknown_and_missing_keys() {
        let extra = r#"{"strategy": 1, "table": "t", "id": "id", "uniqueness_column": "u",
                        "columns": ["a"], "conditions": {}, "extra": true}"#;
        assert!(serde_json::from_str::<DedupeConfig>(extra).is_err());

        let missing = r#"{"strategy": 1, "table": "t", "id": "id", "columns": ["a"], "conditions": {}}"#;
        assert!(serde_json::from_str::<DedupeConfig>(missing).is_err());
    }

    #[test]
    fn test_toml_shape() {
        let text = r#"
            strategy = 2
            table = "PROJECT"
            id = "MasterID"
            uniqueness_column = "PREFERREDRECORD"
            columns = ["Title", "ClinicalTrialStatus"]

            [conditions.Title]
            type = "length"
            weight = 45.0

            [conditions.ClinicalTrialStatus]
            type = "regex"
            weight = 35.0
            regex = "^yes$"
            ignore_case = false
        "#;
        let parsed: DedupeConfig = toml::from_str(text).unwrap();
        let compiled = parsed.compile().unwrap();
        assert!(matches!(
            compiled.columns[1].comparator,
            Some(Comparator::Regex { ref matcher, .. }) if !matcher.ignore_case()
        ));
    }

    #[test]
    fn test_schema_error_into_core_error() {
        let err: dedupx_core::Error = SchemaError::UnknownStrategy(9).into();
        assert!(matches!(err, dedupx_core::Error::UnknownStrategy(9)));

        let err: dedupx_core::Error = SchemaError::EmptyColumns.into();
        assert!(matches!(err, dedupx_core::Error::InvalidConfig(_)));
    }
}
