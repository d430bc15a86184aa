// Plot interpretation: attributes plus ordered mark/legend/select entries

use crate::context::ParseContext;
use crate::error::{Result, SpecError};
use crate::ir::{DataBinding, Directive, Options, Plot, PlotEntry, Resolved};
use crate::resolve;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Attribute value that bypasses reference resolution
const FIXED: &str = "Fixed";

pub fn interpret_plot(node: &Map<String, Value>, ctx: &mut ParseContext) -> Result<Directive> {
    let mut entries = Vec::new();

    // sibling directive keys lost the dispatch and are not attributes
    let directive_keys: Vec<&'static str> =
        ctx.registries().directives.iter().map(|kind| kind.key).collect();
    for (key, value) in node.iter().filter(|(k, _)| !directive_keys.contains(&k.as_str())) {
        entries.push(parse_attribute(key, value, ctx)?);
    }

    if let Some(items) = node.get("plot").and_then(Value::as_array) {
        for item in items {
            entries.push(parse_entry(item, ctx)?);
        }
    }

    Ok(Directive::Plot(Plot { entries }))
}

fn parse_attribute(key: &str, value: &Value, ctx: &mut ParseContext) -> Result<PlotEntry> {
    let registries = Arc::clone(ctx.registries_arc());
    let handler = registries.attributes.get(key).ok_or_else(|| {
        let mut fragment = Map::new();
        fragment.insert(key.to_string(), value.clone());
        SpecError::UnrecognizedAttribute(Value::Object(fragment))
    })?;

    let resolved = if value.as_str() == Some(FIXED) {
        Resolved::Fixed
    } else {
        ctx.resolve_param(value, resolve::value_param)
    };
    Ok(PlotEntry::Attribute(handler(resolved)))
}

fn parse_entry(entry: &Value, ctx: &mut ParseContext) -> Result<PlotEntry> {
    let obj = entry
        .as_object()
        .ok_or_else(|| SpecError::InvalidPlotEntry(entry.clone()))?;

    let has = |key: &str| obj.get(key).is_some_and(|v| !v.is_null());
    if has("mark") {
        parse_mark(obj, ctx)
    } else if has("legend") {
        parse_legend(obj, ctx)
    } else if has("select") {
        parse_interactor(obj, ctx)
    } else {
        Err(SpecError::InvalidPlotEntry(entry.clone()))
    }
}

/// Every option except `skip`, resolved as a selection reference or literal
fn selection_options(obj: &Map<String, Value>, skip: &str, ctx: &mut ParseContext) -> Options {
    let mut options = Options::new();
    for (key, value) in obj.iter().filter(|(k, _)| k.as_str() != skip) {
        options.insert(key.as_str(), ctx.resolve_selection(value));
    }
    options
}

fn parse_data_binding(data: &Value, ctx: &mut ParseContext) -> Result<DataBinding> {
    let from = data
        .get("from")
        .and_then(Value::as_str)
        .ok_or_else(|| SpecError::invalid_property("data", data))?;
    let obj = data
        .as_object()
        .ok_or_else(|| SpecError::invalid_property("data", data))?;

    Ok(DataBinding {
        from: from.to_string(),
        options: selection_options(obj, "from", ctx),
    })
}

fn parse_mark(obj: &Map<String, Value>, ctx: &mut ParseContext) -> Result<PlotEntry> {
    let registries = Arc::clone(ctx.registries_arc());
    let constructor = obj
        .get("mark")
        .and_then(Value::as_str)
        .and_then(|name| registries.marks.get(name))
        .ok_or_else(|| SpecError::UnrecognizedMarkType(Value::Object(obj.clone())))?;

    let data = match obj.get("data") {
        None | Some(Value::Null) => None,
        Some(data) => Some(parse_data_binding(data, ctx)?),
    };

    let mut options = Options::new();
    for (key, value) in obj.iter().filter(|(k, _)| !matches!(k.as_str(), "mark" | "data")) {
        options.insert(key.as_str(), ctx.resolve_channel(value));
    }
    Ok(PlotEntry::Mark(constructor(data, options)))
}

/// `color` → `legendColor`
fn legend_key(subtype: &str) -> String {
    let mut chars = subtype.chars();
    match chars.next() {
        Some(first) => format!("legend{}{}", first.to_uppercase(), chars.as_str()),
        None => "legend".to_string(),
    }
}

fn parse_legend(obj: &Map<String, Value>, ctx: &mut ParseContext) -> Result<PlotEntry> {
    let registries = Arc::clone(ctx.registries_arc());
    let constructor = obj
        .get("legend")
        .and_then(Value::as_str)
        .and_then(|subtype| registries.legends.get(&legend_key(subtype)))
        .ok_or_else(|| SpecError::UnrecognizedLegendType(Value::Object(obj.clone())))?;

    let options = selection_options(obj, "legend", ctx);
    Ok(PlotEntry::Legend(constructor(options)))
}

fn parse_interactor(obj: &Map<String, Value>, ctx: &mut ParseContext) -> Result<PlotEntry> {
    let registries = Arc::clone(ctx.registries_arc());
    let constructor = obj
        .get("select")
        .and_then(Value::as_str)
        .and_then(|name| registries.selections.get(name))
        .ok_or_else(|| SpecError::UnrecognizedSelectionType(Value::Object(obj.clone())))?;

    let options = selection_options(obj, "select", ctx);
    Ok(PlotEntry::Interactor(constructor(options)))
}
