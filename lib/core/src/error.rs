use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown strategy: {0} (expected 1 or 2)")]
    UnknownStrategy(i64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Column '{column}' has no condition configured")]
    MissingCondition { column: String },

    #[error("Column '{column}': invalid regex: {reason}")]
    InvalidRegex { column: String, reason: String },

    #[error("Group '{group_key}': row is missing column '{column}'")]
    MissingColumn { group_key: String, column: String },

    #[error("Row has no group key in column '{column}'")]
    MissingGroupKey { column: String },

    #[error("Block cannot be empty")]
    EmptyBlock,

    #[error("Group '{group_key}' reappears after its block was closed; input is not grouped")]
    UngroupedInput { group_key: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
