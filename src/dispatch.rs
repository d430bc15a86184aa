// Directive dispatch: classify a node by its first registered key

use crate::context::ParseContext;
use crate::error::{Result, SpecError};
use crate::ir::{Directive, Options};
use crate::plot;
use serde_json::{Map, Value};
use std::sync::Arc;

pub type DirectiveHandler = fn(&Map<String, Value>, &mut ParseContext) -> Result<Directive>;

/// A `(key, predicate, handler)` entry of the directive table
#[derive(Clone, Copy)]
pub struct DirectiveKind {
    pub key: &'static str,
    pub predicate: fn(&Value) -> bool,
    pub handler: DirectiveHandler,
}

pub fn default_directives() -> Vec<DirectiveKind> {
    vec![
        DirectiveKind { key: "plot", predicate: Value::is_array, handler: plot::interpret_plot },
        DirectiveKind { key: "hconcat", predicate: Value::is_array, handler: interpret_hconcat },
        DirectiveKind { key: "vconcat", predicate: Value::is_array, handler: interpret_vconcat },
        DirectiveKind { key: "hspace", predicate: is_numeric, handler: interpret_hspace },
        DirectiveKind { key: "vspace", predicate: is_numeric, handler: interpret_vspace },
        DirectiveKind { key: "input", predicate: Value::is_string, handler: interpret_input },
    ]
}

fn present<'a>(node: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    node.get(key).filter(|v| !v.is_null())
}

/// Interpret one node of the layout tree.
///
/// The first directive key present in registration order decides the kind;
/// later keys in the same node are ignored unless strict mode is on.
pub fn interpret(node: &Value, ctx: &mut ParseContext) -> Result<Directive> {
    let obj = node
        .as_object()
        .ok_or_else(|| SpecError::InvalidSpecification(node.clone()))?;

    let registries = Arc::clone(ctx.registries_arc());
    let mut matches = registries
        .directives
        .iter()
        .filter(|kind| present(obj, kind.key).is_some());

    let kind = matches
        .next()
        .ok_or_else(|| SpecError::InvalidSpecification(node.clone()))?;

    if ctx.options().strict {
        let others: Vec<&DirectiveKind> = matches.collect();
        if !others.is_empty() {
            let mut keys = vec![kind.key.to_string()];
            keys.extend(others.iter().map(|k| k.key.to_string()));
            return Err(SpecError::AmbiguousSpecification {
                keys,
                fragment: node.clone(),
            });
        }
    }

    let value = &obj[kind.key];
    if !(kind.predicate)(value) {
        return Err(SpecError::invalid_property(kind.key, node));
    }
    (kind.handler)(obj, ctx)
}

fn is_numeric(value: &Value) -> bool {
    as_number(value).is_some()
}

fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn children(
    node: &Map<String, Value>,
    key: &str,
    ctx: &mut ParseContext,
) -> Result<Vec<Directive>> {
    let items = node[key].as_array().map(Vec::as_slice).unwrap_or_default();
    items.iter().map(|child| interpret(child, ctx)).collect()
}

fn interpret_hconcat(node: &Map<String, Value>, ctx: &mut ParseContext) -> Result<Directive> {
    Ok(Directive::HConcat(children(node, "hconcat", ctx)?))
}

fn interpret_vconcat(node: &Map<String, Value>, ctx: &mut ParseContext) -> Result<Directive> {
    Ok(Directive::VConcat(children(node, "vconcat", ctx)?))
}

fn interpret_hspace(node: &Map<String, Value>, _ctx: &mut ParseContext) -> Result<Directive> {
    Ok(Directive::HSpace(as_number(&node["hspace"]).unwrap_or_default()))
}

fn interpret_vspace(node: &Map<String, Value>, _ctx: &mut ParseContext) -> Result<Directive> {
    Ok(Directive::VSpace(as_number(&node["vspace"]).unwrap_or_default()))
}

fn interpret_input(node: &Map<String, Value>, ctx: &mut ParseContext) -> Result<Directive> {
    let name = node["input"].as_str().unwrap_or_default();
    let registries = Arc::clone(ctx.registries_arc());
    let constructor = registries
        .inputs
        .get(name)
        .ok_or_else(|| SpecError::UnrecognizedInput(Value::Object(node.clone())))?;

    let mut options = Options::new();
    for (key, value) in node.iter().filter(|(k, _)| k.as_str() != "input") {
        options.insert(key.as_str(), ctx.resolve_selection(value));
    }
    Ok(Directive::Input(constructor(options)))
}
