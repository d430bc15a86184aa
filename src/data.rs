// Data loading: format inference, materialization statements, settle-all barrier

use crate::engine::ExecutionEngine;
use crate::error::{Result, SpecError};
use crate::registry::Registries;
use crate::sql;
use futures::future::join_all;
use serde_json::{Map, Value};

/// Keys of a data source that are not passed through as reader options
const RESERVED_KEYS: &[&str] = &["format", "file", "query", "select"];

/// Outcome of one submitted materialization statement
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub table: String,
    pub statement: String,
    pub error: Option<String>,
}

/// Every statement submitted for one `data` section, after settlement
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub outcomes: Vec<LoadOutcome>,
}

impl LoadReport {
    pub fn failures(&self) -> impl Iterator<Item = &LoadOutcome> {
        self.outcomes.iter().filter(|o| o.error.is_some())
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Normalize a data entry to its object form
pub fn normalize_source(entry: &Value) -> Result<Map<String, Value>> {
    match entry {
        Value::String(query) => {
            let mut spec = Map::new();
            spec.insert("format".to_string(), Value::from("table"));
            spec.insert("query".to_string(), Value::from(query.as_str()));
            Ok(spec)
        }
        Value::Object(spec) => Ok(spec.clone()),
        other => Err(SpecError::invalid_property("data", other)),
    }
}

/// Explicit `format`, else the `file` extension, else `table`
pub fn infer_format(spec: &Map<String, Value>) -> String {
    if let Some(format) = spec.get("format").and_then(Value::as_str) {
        return format.to_string();
    }
    if let Some(file) = spec.get("file").and_then(Value::as_str) {
        if let Some((_, ext)) = file.rsplit_once('.') {
            return ext.to_string();
        }
    }
    "table".to_string()
}

/// Build `(table, statement)` pairs for every entry that needs materializing
pub fn data_statements(data: &Value, registries: &Registries) -> Result<Vec<(String, String)>> {
    let entries = match data {
        Value::Null => return Ok(Vec::new()),
        Value::Object(entries) => entries,
        other => return Err(SpecError::invalid_property("data", other)),
    };

    let mut statements = Vec::new();
    for (name, entry) in entries {
        let spec = normalize_source(entry)?;
        let format = infer_format(&spec);
        let handler = registries
            .formats
            .get(&format)
            .ok_or_else(|| SpecError::UnrecognizedFormat(Value::Object(spec.clone())))?;
        if let Some(statement) = handler(name.as_str(), &spec)? {
            statements.push((name.clone(), statement));
        }
    }
    Ok(statements)
}

/// Submit every statement of `data` and wait until all of them settle.
///
/// Failed statements are recorded in the report and logged, never returned as
/// errors. Errors come only from interpreting the `data` section itself.
pub async fn load_data(
    data: &Value,
    registries: &Registries,
    engine: &dyn ExecutionEngine,
) -> Result<LoadReport> {
    let statements = data_statements(data, registries)?;

    let pending = statements.into_iter().map(|(table, statement)| async move {
        tracing::debug!(table = %table, statement = %statement, "submitting");
        let error = match engine.exec(&statement).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "data load failed");
                Some(format!("{:#}", e))
            }
        };
        LoadOutcome {
            table,
            statement,
            error,
        }
    });

    Ok(LoadReport {
        outcomes: join_all(pending).await,
    })
}

// =============================================================================
// Format handlers
// =============================================================================

pub fn load_table(name: &str, spec: &Map<String, Value>) -> Result<Option<String>> {
    match spec.get("query") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(query)) => Ok(Some(sql::create_temp_table(name, query))),
        Some(other) => Err(SpecError::invalid_property("query", other)),
    }
}

pub fn load_parquet(name: &str, spec: &Map<String, Value>) -> Result<Option<String>> {
    let source = sql::table_function("read_parquet", required_file(spec)?, &[]);
    materialize(name, spec, &source)
}

pub fn load_csv(name: &str, spec: &Map<String, Value>) -> Result<Option<String>> {
    let mut options = vec![("SAMPLE_SIZE".to_string(), "-1".to_string())];
    for (key, value) in reader_options(spec) {
        match options.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => options.push((key, value)),
        }
    }
    let source = sql::table_function("read_csv_auto", required_file(spec)?, &options);
    materialize(name, spec, &source)
}

pub fn load_json(name: &str, spec: &Map<String, Value>) -> Result<Option<String>> {
    let options: Vec<(String, String)> = reader_options(spec).collect();
    let source = sql::table_function("read_json_auto", required_file(spec)?, &options);
    materialize(name, spec, &source)
}

fn required_file(spec: &Map<String, Value>) -> Result<&str> {
    spec.get("file")
        .and_then(Value::as_str)
        .ok_or_else(|| SpecError::invalid_property("file", &Value::Object(spec.clone())))
}

/// Upper-cased keys with SQL-rendered values, in document order
fn reader_options(spec: &Map<String, Value>) -> impl Iterator<Item = (String, String)> + '_ {
    spec.iter()
        .filter(|(k, _)| !RESERVED_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.to_uppercase(), sql::literal(v)))
}

fn select_list(spec: &Map<String, Value>) -> Result<Vec<String>> {
    match spec.get("select") {
        None | Some(Value::Null) => Ok(vec!["*".to_string()]),
        Some(Value::String(column)) => Ok(vec![column.clone()]),
        Some(Value::Array(columns)) => columns
            .iter()
            .map(|c| {
                c.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| SpecError::invalid_property("select", c))
            })
            .collect(),
        Some(other) => Err(SpecError::invalid_property("select", other)),
    }
}

fn materialize(name: &str, spec: &Map<String, Value>, source: &str) -> Result<Option<String>> {
    let query = sql::select_from(&select_list(spec)?, source);
    Ok(Some(sql::create_temp_table(name, &query)))
}
