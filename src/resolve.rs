use crate::ir::Resolved;
use crate::reactive::{Param, Reactive, Selection};
use crate::registry::{Registry, TransformHandler};
use crate::sql::Expr;
use serde_json::Value;
use std::collections::BTreeMap;

/// Declared names → live reactive instances for one parse context.
///
/// Entries are only ever added; a name keeps its first instance.
#[derive(Debug, Default)]
pub struct Namespace {
    entries: BTreeMap<String, Reactive>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Reactive> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Bind `name` unless already bound; returns the instance now bound
    pub fn bind(&mut self, name: &str, make: impl FnOnce() -> Reactive) -> Reactive {
        self.entries
            .entry(name.to_string())
            .or_insert_with(make)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Name of a `"$name"` or `{param: "name"}` reference
pub fn reference_name(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => s.strip_prefix('$').filter(|name| !name.is_empty()),
        Value::Object(obj) => obj.get("param").and_then(Value::as_str),
        _ => None,
    }
}

/// Resolve a reference against the namespace, creating it with `default`
/// on first use. Non-references pass through as literals.
pub fn resolve_param(
    namespace: &mut Namespace,
    value: &Value,
    default: impl FnOnce() -> Reactive,
) -> Resolved {
    match reference_name(value) {
        Some(name) => Resolved::Reference(namespace.bind(name, default)),
        None => Resolved::Literal(value.clone()),
    }
}

/// Like [`resolve_param`], defaulting to an intersect selection
pub fn resolve_selection(namespace: &mut Namespace, value: &Value) -> Resolved {
    resolve_param(namespace, value, || Reactive::Selection(Selection::intersect()))
}

/// Default for references found in mark channels and plot attributes
pub fn value_param() -> Reactive {
    Reactive::Param(Param::new(Value::Null))
}

/// Interpret `{expr: ..., label?}` or a single-key `{transform: payload}`.
///
/// Returns `None` when the value has neither shape.
pub fn resolve_transform(transforms: &Registry<TransformHandler>, value: &Value) -> Option<Expr> {
    let obj = value.as_object()?;

    if let Some(expr) = obj.get("expr") {
        let sql = match expr {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let expr = Expr::raw(sql);
        return Some(match obj.get("label").and_then(Value::as_str) {
            Some(label) => expr.with_label(label),
            None => expr,
        });
    }

    if obj.len() != 1 {
        return None;
    }
    let (name, payload) = obj.iter().next()?;
    let transform = transforms.get(name)?;

    let args: Vec<Value> = if name == "count" {
        Vec::new()
    } else {
        match payload {
            Value::Array(items) => items.clone(),
            other => vec![other.clone()],
        }
    };
    Some(transform(args.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registries;
    use serde_json::json;

    #[test]
    fn test_reference_names() {
        assert_eq!(reference_name(&json!("$x")), Some("x"));
        assert_eq!(reference_name(&json!({"param": "x"})), Some("x"));
        assert_eq!(reference_name(&json!("x")), None);
        assert_eq!(reference_name(&json!("$")), None);
        assert_eq!(reference_name(&json!(5)), None);
        assert_eq!(reference_name(&json!({"param": 5})), None);
    }

    #[test]
    fn test_same_name_same_instance() {
        let mut ns = Namespace::new();
        let a = resolve_param(&mut ns, &json!("$x"), value_param);
        let b = resolve_param(&mut ns, &json!("$x"), value_param);
        let c = resolve_selection(&mut ns, &json!({"param": "x"}));
        let a = a.as_reference().unwrap();
        assert!(a.same_instance(b.as_reference().unwrap()));
        assert!(a.same_instance(c.as_reference().unwrap()));
        assert_eq!(ns.len(), 1);
    }

    #[test]
    fn test_default_constructor_only_on_first_use() {
        let mut ns = Namespace::new();
        let sel = resolve_selection(&mut ns, &json!("$brush"));
        assert!(sel.as_selection().is_some());
        // already bound as a selection, the value-param default is ignored
        let again = resolve_param(&mut ns, &json!("$brush"), value_param);
        assert!(again.as_selection().is_some());
    }

    #[test]
    fn test_literal_passthrough() {
        let mut ns = Namespace::new();
        let r = resolve_param(&mut ns, &json!({"a": 1}), value_param);
        assert_eq!(r.as_literal(), Some(&json!({"a": 1})));
        assert!(ns.is_empty());
    }

    #[test]
    fn test_transform_matches_direct_call() {
        let r = Registries::default();
        let via_spec = resolve_transform(&r.transforms, &json!({"avg": "col"})).unwrap();
        let avg = r.transforms.get("avg").unwrap();
        assert_eq!(via_spec, avg(&[json!("col")]));
    }

    #[test]
    fn test_transform_array_payload() {
        let r = Registries::default();
        let q = resolve_transform(&r.transforms, &json!({"quantile": ["price", 0.9]})).unwrap();
        assert_eq!(q.sql, "QUANTILE(\"price\", 0.9)");
    }

    #[test]
    fn test_count_gets_no_arguments() {
        let r = Registries::default();
        let c = resolve_transform(&r.transforms, &json!({"count": "ignored"})).unwrap();
        assert_eq!(c.sql, "COUNT(*)");
    }

    #[test]
    fn test_expr_with_label() {
        let r = Registries::default();
        let spec = json!({"expr": "a + b", "label": "total"});
        let e = resolve_transform(&r.transforms, &spec).unwrap();
        assert_eq!(e.sql, "a + b");
        assert_eq!(e.label.as_deref(), Some("total"));
    }

    #[test]
    fn test_no_transform_shape() {
        let r = Registries::default();
        assert!(resolve_transform(&r.transforms, &json!("$x")).is_none());
        assert!(resolve_transform(&r.transforms, &json!({"avg": "a", "sum": "b"})).is_none());
        assert!(resolve_transform(&r.transforms, &json!({"bogus": "a"})).is_none());
    }
}
