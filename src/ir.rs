use crate::reactive::{Param, Reactive, Selection};
use crate::sql::Expr;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::sync::Arc;

// =============================================================================
// Resolved option values
// =============================================================================

/// A specification value after reference and transform resolution
#[derive(Debug, Clone)]
pub enum Resolved {
    /// Passed through verbatim
    Literal(Value),
    /// A live namespace entry
    Reference(Reactive),
    /// Transform or raw `{expr: ...}` expression
    Expr(Expr),
    /// The `"Fixed"` attribute marker
    Fixed,
}

impl Resolved {
    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Resolved::Literal(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Reactive> {
        match self {
            Resolved::Reference(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_param(&self) -> Option<&Arc<Param>> {
        self.as_reference().and_then(Reactive::as_param)
    }

    pub fn as_selection(&self) -> Option<&Arc<Selection>> {
        self.as_reference().and_then(Reactive::as_selection)
    }

    pub fn as_expr(&self) -> Option<&Expr> {
        match self {
            Resolved::Expr(e) => Some(e),
            _ => None,
        }
    }
}

impl Serialize for Resolved {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Resolved::Literal(v) => v.serialize(serializer),
            Resolved::Reference(r) => r.serialize(serializer),
            Resolved::Expr(e) => e.serialize(serializer),
            Resolved::Fixed => serializer.serialize_str("Fixed"),
        }
    }
}

/// Resolved options of a directive, in document order
#[derive(Debug, Clone, Default)]
pub struct Options(Vec<(String, Resolved)>);

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Resolved) {
        self.0.push((key.into(), value));
    }

    pub fn get(&self, key: &str) -> Option<&Resolved> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }
}

impl Serialize for Options {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

// =============================================================================
// Plot contents
// =============================================================================

/// Source table of a mark plus its per-column bindings (e.g. `filterBy`)
#[derive(Debug, Clone, Serialize)]
pub struct DataBinding {
    pub from: String,
    pub options: Options,
}

#[derive(Debug, Clone, Serialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub mark_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<DataBinding>,
    pub options: Options,
}

#[derive(Debug, Clone, Serialize)]
pub struct Legend {
    #[serde(rename = "type")]
    pub legend_type: String,
    pub options: Options,
}

/// An interaction (brush, toggle, pan/zoom) attached to a plot
#[derive(Debug, Clone, Serialize)]
pub struct Interactor {
    #[serde(rename = "type")]
    pub select_type: String,
    pub options: Options,
}

#[derive(Debug, Clone, Serialize)]
pub struct Attribute {
    pub name: String,
    pub value: Resolved,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotEntry {
    Attribute(Attribute),
    Mark(Mark),
    Legend(Legend),
    Interactor(Interactor),
}

#[derive(Debug, Clone, Serialize)]
pub struct Plot {
    pub entries: Vec<PlotEntry>,
}

impl Plot {
    pub fn marks(&self) -> impl Iterator<Item = &Mark> {
        self.entries.iter().filter_map(|e| match e {
            PlotEntry::Mark(m) => Some(m),
            _ => None,
        })
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.entries.iter().filter_map(|e| match e {
            PlotEntry::Attribute(a) => Some(a),
            _ => None,
        })
    }
}

// =============================================================================
// Layout tree
// =============================================================================

/// An input widget (menu, slider, search, table)
#[derive(Debug, Clone, Serialize)]
pub struct Widget {
    #[serde(rename = "type")]
    pub input_type: String,
    pub options: Options,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Directive {
    Plot(Plot),
    HConcat(Vec<Directive>),
    VConcat(Vec<Directive>),
    HSpace(f64),
    VSpace(f64),
    Input(Widget),
}

/// Result of parsing a full document
#[derive(Debug, Clone, Serialize)]
pub struct Spec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    pub directive: Directive,
}
