// SQL text building for materialization statements and transform expressions

use serde::Serialize;
use serde_json::Value;

/// A SQL expression produced by a transform or an `{expr: ...}` node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expr {
    pub sql: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// True for aggregate functions (count, sum, avg, ...)
    pub aggregate: bool,
}

impl Expr {
    /// Raw SQL text, passed through untouched
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            label: None,
            aggregate: false,
        }
    }

    /// Function call `name(arg, ...)`. String arguments are column references.
    pub fn call(name: &str, args: &[Value]) -> Self {
        let args: Vec<String> = args.iter().map(argument).collect();
        Self::raw(format!("{}({})", name, args.join(", ")))
    }

    pub fn aggregate(name: &str, args: &[Value]) -> Self {
        Self {
            aggregate: true,
            ..Self::call(name, args)
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Double-quoted identifier, with embedded quotes doubled
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quoted string literal, with embedded quotes doubled
pub fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Render a JSON scalar as a SQL literal
pub fn literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_string(s),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(literal).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(_) => quote_string(&value.to_string()),
    }
}

/// Function argument: strings are column references, the rest literals
pub fn argument(value: &Value) -> String {
    match value {
        Value::String(s) => quote_identifier(s),
        other => literal(other),
    }
}

/// `SELECT <columns> FROM <source>`; `*` stays unquoted
pub fn select_from(columns: &[String], source: &str) -> String {
    let columns: Vec<String> = if columns.is_empty() {
        vec!["*".to_string()]
    } else {
        columns
            .iter()
            .map(|c| if c == "*" { c.clone() } else { quote_identifier(c) })
            .collect()
    };
    format!("SELECT {} FROM {}", columns.join(", "), source)
}

pub fn create_temp_table(name: &str, query: &str) -> String {
    format!("CREATE TEMP TABLE IF NOT EXISTS {} AS {}", name, query)
}

/// Table function call such as `read_csv_auto('f.csv', HEADER=TRUE)`
pub fn table_function(function: &str, file: &str, options: &[(String, String)]) -> String {
    let mut args = vec![quote_string(file)];
    args.extend(options.iter().map(|(k, v)| format!("{}={}", k, v)));
    format!("{}({})", function, args.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_literals() {
        assert_eq!(literal(&json!(true)), "TRUE");
        assert_eq!(literal(&json!(false)), "FALSE");
        assert_eq!(literal(&json!(-1)), "-1");
        assert_eq!(literal(&json!("it's")), "'it''s'");
        assert_eq!(literal(&json!(null)), "NULL");
    }

    #[test]
    fn test_call_quotes_columns() {
        let e = Expr::aggregate("avg", &[json!("price")]);
        assert_eq!(e.sql, "avg(\"price\")");
        assert!(e.aggregate);

        let q = Expr::aggregate("quantile", &[json!("price"), json!(0.5)]);
        assert_eq!(q.sql, "quantile(\"price\", 0.5)");
    }

    #[test]
    fn test_select_from() {
        assert_eq!(select_from(&[], "t"), "SELECT * FROM t");
        assert_eq!(
            select_from(&["a".to_string(), "*".to_string()], "t"),
            "SELECT \"a\", * FROM t"
        );
    }

    #[test]
    fn test_table_function() {
        let opts = vec![("SAMPLE_SIZE".to_string(), "-1".to_string())];
        assert_eq!(
            table_function("read_csv_auto", "data/f.csv", &opts),
            "read_csv_auto('data/f.csv', SAMPLE_SIZE=-1)"
        );
    }
}
