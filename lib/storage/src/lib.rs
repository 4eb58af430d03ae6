pub mod loader;
pub mod sqlite;

pub use loader::{load_config, load_db_config, DbConfig};
pub use sqlite::{quote_ident, SqliteStore};
