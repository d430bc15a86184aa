// Binding of the top-level `params` section into the namespace

use crate::error::{Result, SpecError};
use crate::registry::Registries;
use crate::resolve::Namespace;
use serde_json::Value;

/// Constructor key and initial value of a param entry.
///
/// Objects carrying a `select` key are definitions; anything else is the
/// initial value of a plain `value` param.
fn param_definition(entry: &Value) -> (Option<&str>, Value) {
    match entry {
        Value::Object(obj) if obj.contains_key("select") => (
            obj.get("select").and_then(Value::as_str),
            obj.get("value").cloned().unwrap_or(Value::Null),
        ),
        literal => (Some("value"), literal.clone()),
    }
}

/// Instantiate every declared param and bind it under its name
pub fn bind_params(
    params: &Value,
    registries: &Registries,
    namespace: &mut Namespace,
) -> Result<()> {
    let entries = match params {
        Value::Null => return Ok(()),
        Value::Object(entries) => entries,
        other => return Err(SpecError::invalid_property("params", other)),
    };

    for (name, entry) in entries {
        let (select, value) = param_definition(entry);
        let constructor = select
            .and_then(|s| registries.params.get(s))
            .ok_or_else(|| SpecError::UnrecognizedParamType(entry.clone()))?;

        if namespace.contains(name) {
            tracing::debug!(name = %name, "param already bound, keeping existing instance");
            continue;
        }
        tracing::debug!(name = %name, select = select.unwrap_or_default(), "binding param");
        namespace.bind(name, || constructor(value));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::SelectionKind;
    use serde_json::json;

    fn bind(params: Value) -> Result<Namespace> {
        let mut ns = Namespace::new();
        bind_params(&params, &Registries::default(), &mut ns)?;
        Ok(ns)
    }

    fn selection_kind(ns: &Namespace, name: &str) -> SelectionKind {
        ns.get(name).unwrap().as_selection().unwrap().kind()
    }

    #[test]
    fn test_literal_becomes_value_param() {
        let ns = bind(json!({"bins": 20, "list": [1, 2]})).unwrap();
        assert_eq!(ns.get("bins").unwrap().as_param().unwrap().value(), json!(20));
        assert_eq!(ns.get("list").unwrap().as_param().unwrap().value(), json!([1, 2]));
    }

    #[test]
    fn test_selection_definitions() {
        let ns = bind(json!({
            "brush": {"select": "crossfilter"},
            "pick": {"select": "single"}
        }))
        .unwrap();
        assert_eq!(selection_kind(&ns, "brush"), SelectionKind::Crossfilter);
        assert_eq!(selection_kind(&ns, "pick"), SelectionKind::Single);
    }

    #[test]
    fn test_explicit_value_param() {
        let ns = bind(json!({"p": {"select": "value", "value": "a"}})).unwrap();
        assert_eq!(ns.get("p").unwrap().as_param().unwrap().value(), json!("a"));
    }

    #[test]
    fn test_unknown_param_type() {
        let err = bind(json!({"p": {"select": "bogus", "value": 1}})).unwrap_err();
        match err {
            SpecError::UnrecognizedParamType(fragment) => {
                assert_eq!(fragment, json!({"select": "bogus", "value": 1}))
            }
            other => panic!("Expected UnrecognizedParamType, got {:?}", other),
        }
    }

    #[test]
    fn test_existing_binding_kept() {
        let mut ns = Namespace::new();
        let registries = Registries::default();
        bind_params(&json!({"p": 1}), &registries, &mut ns).unwrap();
        let first = ns.get("p").unwrap().clone();
        bind_params(&json!({"p": 2}), &registries, &mut ns).unwrap();
        assert!(first.same_instance(ns.get("p").unwrap()));
        assert_eq!(first.as_param().unwrap().value(), json!(1));
    }
}
