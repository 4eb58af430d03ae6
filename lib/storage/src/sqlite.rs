use dedupx_core::{Error, Result, Row, Value, GROUP_KEY_COLUMN};
use dedupx_selection::{CompiledConfig, Decision};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::{debug, info};

fn storage_err(e: rusqlite::Error) -> Error {
    Error::Storage(e.to_string())
}

/// Double-quote a table/column name after checking it is a plain identifier.
///
/// Names come from config files and are interpolated into SQL, so anything
/// beyond `[A-Za-z_][A-Za-z0-9_]*` is refused.
pub fn quote_ident(name: &str) -> Result<String> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if !valid {
        return Err(Error::InvalidConfig(format!(
            "'{}' is not a valid SQL identifier",
            name
        )));
    }
    Ok(format!("\"{}\"", name))
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Float(f) => SqlValue::Real(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// SQLite-backed table holding the duplicate rows
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(storage_err)?;
        info!("Opened database {:?}", path.as_ref());
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Flag every group that has exactly one row as already canonical
    pub fn mark_singletons_unique(&self, config: &CompiledConfig) -> Result<usize> {
        let table = quote_ident(&config.table)?;
        let flag = quote_ident(&config.uniqueness_column)?;
        let key = quote_ident(GROUP_KEY_COLUMN)?;

        let sql = format!(
            "UPDATE {table} SET {flag} = 1 WHERE {key} IN (
                SELECT p.{key} FROM {table} AS p GROUP BY p.{key} HAVING COUNT(p.{key}) = 1
            )"
        );
        let updated = self.conn.execute(&sql, []).map_err(storage_err)?;
        info!("Marked {} singleton groups as unique", updated);
        Ok(updated)
    }

    /// Stream unresolved rows grouped by `dedupe_id` into `f`.
    ///
    /// Only rows whose flag is still 0 and whose group key is set are read,
    /// and groups that already have a canonical row are skipped so a rerun
    /// never flags a second winner. Rows are ordered by group key, then by
    /// row id, so ties resolve the same way on every run.
    pub fn pending_rows<T, F>(&self, config: &CompiledConfig, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Iterator<Item = Result<Row>>) -> Result<T>,
    {
        let mut names: Vec<String> = Vec::with_capacity(config.columns.len() + 2);
        for name in config
            .column_names()
            .chain([config.id_column.as_str(), GROUP_KEY_COLUMN])
        {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }

        let select_list = names
            .iter()
            .map(|n| quote_ident(n))
            .collect::<Result<Vec<_>>>()?
            .join(", ");
        let table = quote_ident(&config.table)?;
        let flag = quote_ident(&config.uniqueness_column)?;
        let key = quote_ident(GROUP_KEY_COLUMN)?;
        let id = quote_ident(&config.id_column)?;

        let sql = format!(
            "SELECT {select_list} FROM {table}
             WHERE {flag} = 0 AND {key} IS NOT NULL
               AND {key} NOT IN (
                   SELECT d.{key} FROM {table} AS d WHERE d.{flag} = 1 AND d.{key} IS NOT NULL
               )
             ORDER BY {key}, {id}"
        );
        debug!(%sql, "fetching pending rows");

        let mut stmt = self.conn.prepare(&sql).map_err(storage_err)?;
        let mapped = stmt
            .query_map([], |r| {
                let mut row = Row::new();
                for (i, name) in names.iter().enumerate() {
                    row.insert(name.clone(), from_sql(r.get_ref(i)?));
                }
                Ok(row)
            })
            .map_err(storage_err)?;

        let mut rows = mapped.map(|r| r.map_err(storage_err));
        f(&mut rows)
    }

    /// Flag each decision's winning row as canonical, in one transaction
    pub fn apply_decisions(&mut self, config: &CompiledConfig, decisions: &[Decision]) -> Result<usize> {
        let table = quote_ident(&config.table)?;
        let flag = quote_ident(&config.uniqueness_column)?;
        let id = quote_ident(&config.id_column)?;
        let sql = format!("UPDATE {table} SET {flag} = 1 WHERE {id} = ?1");

        let tx = self.conn.transaction().map_err(storage_err)?;
        let mut updated = 0;
        {
            let mut stmt = tx.prepare(&sql).map_err(storage_err)?;
            for decision in decisions {
                updated += stmt
                    .execute(params![to_sql(&decision.winning_row_id)])
                    .map_err(storage_err)?;
            }
        }
        tx.commit().map_err(storage_err)?;

        info!("Marked {} canonical rows across {} groups", updated, decisions.len());
        Ok(updated)
    }

    /// Number of rows currently flagged as canonical
    pub fn count_unique(&self, config: &CompiledConfig) -> Result<usize> {
        let table = quote_ident(&config.table)?;
        let flag = quote_ident(&config.uniqueness_column)?;
        let sql = format!("SELECT COUNT(*) FROM {table} WHERE {flag} = 1");
        let count: i64 = self
            .conn
            .query_row(&sql, [], |r| r.get(0))
            .map_err(storage_err)?;
        Ok(count as usize)
    }
}
