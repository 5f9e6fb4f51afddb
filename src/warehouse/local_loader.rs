//! Loads JSON files from the local filesystem into a staging table,
//! following the same column mapping rules as the warehouse COPY command.

use crate::sql::{SqlType, Table};
use crate::statements::{JsonFormat, StagingLoad};
use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum LocalLoadError {
    #[error("Source path does not exist: {0:?}")]
    MissingSource(PathBuf),

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to list files under {path:?}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("Invalid JSON in {path:?}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid jsonpaths document {path:?}: {reason}")]
    JsonPaths { path: PathBuf, reason: String },

    #[error("{path:?}: cannot load {value} into column {table}.{column}")]
    InvalidValue {
        path: PathBuf,
        table: &'static str,
        column: &'static str,
        value: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Key(String),
    Index(usize),
}

/// Parses a jsonpath expression such as `$['artist']`, `$.song.title` or
/// `$['tags'][0]`.
fn parse_json_path(expr: &str) -> Result<Vec<PathSegment>, String> {
    let rest = expr
        .trim()
        .strip_prefix('$')
        .ok_or_else(|| format!("path must start with '$': {}", expr))?;

    let mut segments = Vec::new();
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '.' => {
                let mut key = String::new();
                while let Some(&next) = chars.peek() {
                    if next == '.' || next == '[' {
                        break;
                    }
                    key.push(next);
                    chars.next();
                }
                if key.is_empty() {
                    return Err(format!("empty key in {}", expr));
                }
                segments.push(PathSegment::Key(key));
            }
            '[' => match chars.peek().copied() {
                Some(quote @ ('\'' | '"')) => {
                    chars.next();
                    let mut key = String::new();
                    loop {
                        match chars.next() {
                            Some(c) if c == quote => break,
                            Some(c) => key.push(c),
                            None => return Err(format!("unterminated key in {}", expr)),
                        }
                    }
                    if chars.next() != Some(']') {
                        return Err(format!("expected ']' in {}", expr));
                    }
                    segments.push(PathSegment::Key(key));
                }
                _ => {
                    let mut digits = String::new();
                    loop {
                        match chars.next() {
                            Some(']') => break,
                            Some(c) => digits.push(c),
                            None => return Err(format!("unterminated index in {}", expr)),
                        }
                    }
                    let index = digits
                        .trim()
                        .parse::<usize>()
                        .map_err(|_| format!("invalid index '{}' in {}", digits, expr))?;
                    segments.push(PathSegment::Index(index));
                }
            },
            other => return Err(format!("unexpected '{}' in {}", other, expr)),
        }
    }

    if segments.is_empty() {
        return Err(format!("path selects the whole record: {}", expr));
    }
    Ok(segments)
}

#[derive(Deserialize)]
struct JsonPathsDocument {
    jsonpaths: Vec<String>,
}

enum ColumnMapping {
    /// Column name matched case-insensitively against the record keys.
    Auto,
    /// One path per table column, in column order.
    Paths(Vec<Vec<PathSegment>>),
}

impl ColumnMapping {
    fn from_jsonpaths_file(path: &Path, table: &Table) -> Result<Self, LocalLoadError> {
        let content = fs::read_to_string(path).map_err(|source| LocalLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document: JsonPathsDocument =
            serde_json::from_str(&content).map_err(|source| LocalLoadError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        if document.jsonpaths.len() != table.columns.len() {
            return Err(LocalLoadError::JsonPaths {
                path: path.to_path_buf(),
                reason: format!(
                    "{} paths for {} columns of {}",
                    document.jsonpaths.len(),
                    table.columns.len(),
                    table.name
                ),
            });
        }

        let paths = document
            .jsonpaths
            .iter()
            .map(|expr| parse_json_path(expr))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|reason| LocalLoadError::JsonPaths {
                path: path.to_path_buf(),
                reason,
            })?;
        Ok(ColumnMapping::Paths(paths))
    }

    fn extract<'a>(&self, record: &'a Value, index: usize, column: &str) -> Option<&'a Value> {
        match self {
            ColumnMapping::Auto => record
                .as_object()?
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(column))
                .map(|(_, value)| value),
            ColumnMapping::Paths(paths) => {
                paths[index]
                    .iter()
                    .try_fold(record, |current, segment| match segment {
                        PathSegment::Key(key) => current.get(key.as_str()),
                        PathSegment::Index(i) => current.get(*i),
                    })
            }
        }
    }
}

/// Converts a JSON value to the SQL value stored in a column of the given
/// type. Returns `None` when the value can't be represented.
fn coerce(value: Option<&Value>, sql_type: SqlType) -> Option<SqlValue> {
    let value = match value {
        None | Some(Value::Null) => return Some(SqlValue::Null),
        Some(value) => value,
    };

    // Numeric columns treat empty strings as missing values
    if let Value::String(s) = value {
        if sql_type.is_numeric() && s.trim().is_empty() {
            return Some(SqlValue::Null);
        }
    }

    match sql_type {
        SqlType::Varchar | SqlType::Timestamp => Some(SqlValue::Text(match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })),
        SqlType::Int | SqlType::BigInt => match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(SqlValue::Integer),
            Value::String(s) => s.trim().parse::<i64>().ok().map(SqlValue::Integer),
            Value::Bool(b) => Some(SqlValue::Integer(*b as i64)),
            _ => None,
        },
        SqlType::Float => match value {
            Value::Number(n) => n.as_f64().map(SqlValue::Real),
            Value::String(s) => s.trim().parse::<f64>().ok().map(SqlValue::Real),
            _ => None,
        },
    }
}

fn collect_json_files(source: &Path) -> Result<Vec<PathBuf>, LocalLoadError> {
    if !source.exists() {
        return Err(LocalLoadError::MissingSource(source.to_path_buf()));
    }
    if source.is_file() {
        return Ok(vec![source.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.map_err(|source_err| LocalLoadError::Walk {
            path: source.to_path_buf(),
            source: source_err,
        })?;
        let is_json = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if entry.file_type().is_file() && is_json {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Inserts every JSON record found under `load.source` into `load.table`.
///
/// A file can hold a single object or several concatenated ones (one per
/// line for event logs). All rows are inserted in one transaction.
pub fn load_json_files(conn: &mut Connection, load: &StagingLoad) -> Result<u64, LocalLoadError> {
    let table = load.table;
    let files = collect_json_files(Path::new(&load.source))?;
    let mapping = match &load.format {
        JsonFormat::Auto => ColumnMapping::Auto,
        JsonFormat::JsonPaths(path) => ColumnMapping::from_jsonpaths_file(Path::new(path), table)?,
    };

    let placeholders = (1..=table.columns.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let insert_sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table.name,
        table.column_names().join(", "),
        placeholders
    );

    let tx = conn.transaction()?;
    let mut rows = 0u64;
    {
        let mut stmt = tx.prepare(&insert_sql)?;
        for file in &files {
            let content = fs::read_to_string(file).map_err(|source| LocalLoadError::Io {
                path: file.clone(),
                source,
            })?;

            let mut file_rows = 0;
            for record in serde_json::Deserializer::from_str(&content).into_iter::<Value>() {
                let record = record.map_err(|source| LocalLoadError::Json {
                    path: file.clone(),
                    source,
                })?;

                let mut values = Vec::with_capacity(table.columns.len());
                for (index, column) in table.columns.iter().enumerate() {
                    let raw = mapping.extract(&record, index, column.name);
                    let value = coerce(raw, column.sql_type).ok_or_else(|| {
                        LocalLoadError::InvalidValue {
                            path: file.clone(),
                            table: table.name,
                            column: column.name,
                            value: raw.map(|v| v.to_string()).unwrap_or_default(),
                        }
                    })?;
                    values.push(value);
                }

                stmt.execute(rusqlite::params_from_iter(values.iter()))?;
                file_rows += 1;
            }
            debug!("Loaded {} records from {:?}", file_rows, file);
            rows += file_rows;
        }
    }
    tx.commit()?;

    info!(
        "Loaded {} rows into {} from {} files",
        rows,
        table.name,
        files.len()
    );
    Ok(rows)
}
