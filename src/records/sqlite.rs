/*!
 * SQLite record store.
 *
 * Implements both `FieldRegistry` and `RecordStore` over one connection.
 * Models come from configuration; when a model lists no fields, they are
 * discovered from the table: a column `title` is translatable when a variant
 * column `title_<language>` exists for a configured language.
 */

use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use rusqlite::types::{ToSql, ToSqlOutput, Value};
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{FieldRegistry, Record, RecordId, RecordStore, RecordUpdate};
use crate::app_config::ModelConfig;
use crate::language_utils::field_suffix;

impl ToSql for RecordId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            RecordId::Int(id) => id.to_sql(),
            RecordId::Text(id) => id.to_sql(),
        }
    }
}

/// Quote an SQL identifier
fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Record store over a SQLite database
pub struct SqliteStore {
    /// Path to the database file
    db_path: PathBuf,
    /// Open connection
    connection: Connection,
    /// Registered models
    models: Vec<ModelConfig>,
    /// Configured languages, used for field discovery
    languages: Vec<String>,
}

impl SqliteStore {
    /// Open the database at `db_path`; it must already exist
    pub fn open<P: AsRef<Path>>(db_path: P, models: Vec<ModelConfig>, languages: Vec<String>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if !db_path.is_file() {
            return Err(anyhow!("Database not found: {}", db_path.display()));
        }

        info!("Opening database at: {:?}", db_path);
        let connection = Connection::open(&db_path)
            .with_context(|| format!("Failed to open database: {:?}", db_path))?;

        Ok(Self {
            db_path,
            connection,
            models,
            languages,
        })
    }

    /// Create an in-memory database (for testing)
    pub fn open_in_memory(models: Vec<ModelConfig>, languages: Vec<String>) -> Result<Self> {
        debug!("Creating in-memory database");
        let connection = Connection::open_in_memory().context("Failed to create in-memory database")?;
        Ok(Self {
            db_path: PathBuf::from(":memory:"),
            connection,
            models,
            languages,
        })
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Underlying connection
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Column names of `table`, in declaration order
    pub fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .connection
            .prepare(&format!("PRAGMA table_info({})", quote(table)))
            .with_context(|| format!("Failed to inspect table {}", table))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        if columns.is_empty() {
            return Err(anyhow!("Table not found: {}", table));
        }
        Ok(columns)
    }
}

impl FieldRegistry for SqliteStore {
    fn models(&self) -> &[ModelConfig] {
        &self.models
    }

    fn translatable_fields(&self, model: &ModelConfig) -> Result<Vec<String>> {
        if !model.fields.is_empty() {
            return Ok(model.fields.clone());
        }

        let columns = self.table_columns(&model.table_name())?;
        let mut fields: Vec<String> = Vec::new();
        for column in &columns {
            for language in &self.languages {
                let suffix = format!("_{}", field_suffix(language));
                if let Some(base) = column.strip_suffix(&suffix) {
                    if columns.iter().any(|c| c == base) && !fields.iter().any(|f| f == base) {
                        fields.push(base.to_string());
                    }
                }
            }
        }
        debug!("{}: discovered fields {:?}", model.label(), fields);
        Ok(fields)
    }

    fn has_variant(&self, model: &ModelConfig, field: &str, language: &str) -> Result<bool> {
        let column = self.variant_column(field, language);
        Ok(self
            .table_columns(&model.table_name())?
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&column)))
    }
}

fn text_value(value: Value) -> Option<String> {
    match value {
        Value::Text(text) => Some(text),
        Value::Integer(n) => Some(n.to_string()),
        Value::Real(n) => Some(n.to_string()),
        Value::Null | Value::Blob(_) => None,
    }
}

impl RecordStore for SqliteStore {
    fn fetch_records(&self, model: &ModelConfig, columns: &[String]) -> Result<Vec<Record>> {
        let table = model.table_name();
        let mut selected = vec![quote(&model.primary_key)];
        selected.extend(columns.iter().map(|c| quote(c)));
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            selected.join(", "),
            quote(&table),
            quote(&model.primary_key)
        );

        let mut stmt = self
            .connection
            .prepare(&sql)
            .with_context(|| format!("Failed to query {}", table))?;
        let rows = stmt.query_map([], |row| {
            let id: Value = row.get(0)?;
            let mut values = HashMap::new();
            for (index, column) in columns.iter().enumerate() {
                values.insert(column.clone(), text_value(row.get(index + 1)?));
            }
            Ok((id, values))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, values) = row?;
            let id = match id {
                Value::Integer(n) => RecordId::Int(n),
                Value::Text(text) => RecordId::Text(text),
                other => {
                    return Err(anyhow!(
                        "Unsupported primary key type in {}: {:?}",
                        table,
                        other.data_type()
                    ));
                }
            };
            records.push(Record { id, values });
        }
        Ok(records)
    }

    fn bulk_update(&mut self, model: &ModelConfig, updates: &[RecordUpdate]) -> Result<usize> {
        if updates.is_empty() {
            return Ok(0);
        }
        let table = model.table_name();
        let tx = self
            .connection
            .transaction()
            .context("Failed to begin transaction")?;

        let mut changed = 0;
        for update in updates {
            let sql = format!(
                "UPDATE {} SET {} = ?1 WHERE {} = ?2",
                quote(&table),
                quote(&update.column),
                quote(&model.primary_key)
            );
            let mut stmt = tx.prepare_cached(&sql)?;
            changed += stmt
                .execute(rusqlite::params![update.value, update.id])
                .with_context(|| format!("Failed to update {} {}", table, update.id))?;
        }

        tx.commit().context("Failed to commit transaction")?;
        debug!("{}: {} row update(s) committed", table, changed);
        Ok(changed)
    }
}
