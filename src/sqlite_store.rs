//! Record store over one SQLite table whose translatable columns hold JSON
//! objects mapping language ids to text (`{"en": "Chair", "de": "Stuhl"}`).
//!
//! This is how Laravel translatable models persist their attributes, so an
//! application database can be synced directly.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

use crowdin_sync_core::record::{LocalizedRecord, RecordStore, StoreError};

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Which table and columns the store reads.
#[derive(Debug, Clone, Default)]
pub struct SqliteTable {
    pub table: String,
    pub key_column: String,
    /// Columns the table declares as translatable.
    pub translatable: Vec<String>,
    /// Extra columns to load and save besides the translatable ones.
    pub fields: Vec<String>,
    pub context_column: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqliteRecord {
    key: Value,
    values: BTreeMap<String, BTreeMap<String, String>>,
    context: Option<String>,
}

fn render(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(r) => Some(r.to_string()),
        Value::Text(s) => Some(s.clone()),
        Value::Blob(b) => Some(String::from_utf8_lossy(b).into_owned()),
    }
}

impl SqliteRecord {
    pub fn values(&self, field: &str) -> Option<&BTreeMap<String, String>> {
        self.values.get(field)
    }
}

impl LocalizedRecord for SqliteRecord {
    fn record_key(&self) -> String {
        render(&self.key).unwrap_or_default()
    }

    fn translation(&self, field: &str, language: &str) -> Option<String> {
        self.values.get(field).and_then(|m| m.get(language)).cloned()
    }

    fn set_translation(&mut self, field: &str, language: &str, text: String) {
        self.values
            .entry(field.to_string())
            .or_default()
            .insert(language.to_string(), text);
    }

    fn context(&self) -> Option<String> {
        self.context.clone()
    }
}

pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
    spec: SqliteTable,
    /// Translatable plus extra columns, deduplicated, in declaration order.
    columns: Vec<String>,
}

fn check_identifier(name: &str) -> Result<(), StoreError> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(format!("invalid SQL identifier: {name:?}").into())
    }
}

/// Parse a stored JSON column. Non-string values are kept as their JSON text.
fn parse_translations(
    column: &str,
    raw: Option<String>,
) -> Result<BTreeMap<String, String>, StoreError> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Ok(BTreeMap::new());
    };
    let parsed: BTreeMap<String, serde_json::Value> = serde_json::from_str(&raw)
        .map_err(|e| format!("column {column} does not hold a JSON object: {e}"))?;
    Ok(parsed
        .into_iter()
        .filter_map(|(language, value)| match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some((language, s)),
            other => Some((language, other.to_string())),
        })
        .collect())
}

impl SqliteRecordStore {
    pub fn open(path: impl AsRef<Path>, spec: SqliteTable) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        Self::with_connection(conn, spec)
    }

    pub fn with_connection(conn: Connection, spec: SqliteTable) -> Result<Self, StoreError> {
        check_identifier(&spec.table)?;
        check_identifier(&spec.key_column)?;
        let mut columns: Vec<String> = Vec::new();
        for column in spec.translatable.iter().chain(spec.fields.iter()) {
            check_identifier(column)?;
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
        if let Some(context) = &spec.context_column {
            check_identifier(context)?;
        }
        debug!(table = %spec.table, columns = ?columns, "Opened SQLite record store");
        Ok(Self {
            conn: Mutex::new(conn),
            spec,
            columns,
        })
    }

    fn load_page(&self, page: usize, size: usize) -> Result<Vec<SqliteRecord>, StoreError> {
        let mut select = vec![format!("\"{}\"", self.spec.key_column)];
        select.extend(self.columns.iter().map(|c| format!("\"{c}\"")));
        if let Some(context) = &self.spec.context_column {
            select.push(format!("\"{context}\""));
        }
        let sql = format!(
            "SELECT {} FROM \"{}\" ORDER BY \"{}\" LIMIT ?1 OFFSET ?2",
            select.join(", "),
            self.spec.table,
            self.spec.key_column
        );

        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        let mut stmt = conn.prepare(&sql)?;
        let column_count = self.columns.len();
        let has_context = self.spec.context_column.is_some();
        let raw_rows = stmt
            .query_map([size as i64, (page * size) as i64], |row| {
                let key: Value = row.get(0)?;
                let mut raw = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    raw.push(row.get::<_, Option<String>>(i + 1)?);
                }
                let context = if has_context {
                    render(&row.get::<_, Value>(column_count + 1)?)
                } else {
                    None
                };
                Ok((key, raw, context))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(raw_rows.len());
        for (key, raw, context) in raw_rows {
            let mut values = BTreeMap::new();
            for (column, raw) in self.columns.iter().zip(raw) {
                values.insert(column.clone(), parse_translations(column, raw)?);
            }
            records.push(SqliteRecord {
                key,
                values,
                context,
            });
        }
        Ok(records)
    }

    fn store(&self, record: &SqliteRecord) -> Result<(), StoreError> {
        if self.columns.is_empty() {
            return Ok(());
        }
        let assignments: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("\"{c}\" = ?{}", i + 1))
            .collect();
        let sql = format!(
            "UPDATE \"{}\" SET {} WHERE \"{}\" = ?{}",
            self.spec.table,
            assignments.join(", "),
            self.spec.key_column,
            self.columns.len() + 1
        );

        let mut params = Vec::with_capacity(self.columns.len() + 1);
        for column in &self.columns {
            let json = match record.values.get(column) {
                Some(map) => serde_json::to_string(map)?,
                None => "{}".to_string(),
            };
            params.push(Value::Text(json));
        }
        params.push(record.key.clone());

        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        conn.execute(&sql, params_from_iter(params.iter()))?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    type Record = SqliteRecord;

    fn record_type(&self) -> &str {
        &self.spec.table
    }

    fn translatable_fields(&self) -> Option<Vec<String>> {
        if self.spec.translatable.is_empty() {
            None
        } else {
            Some(self.spec.translatable.clone())
        }
    }

    async fn chunk(&self, page: usize, size: usize) -> Result<Vec<SqliteRecord>, StoreError> {
        self.load_page(page, size)
    }

    async fn save(&self, record: &SqliteRecord) -> Result<(), StoreError> {
        self.store(record)
    }
}
