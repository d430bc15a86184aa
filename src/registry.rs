//! Name → handler tables consulted during interpretation.
//!
//! Registries are plain configuration: [`Registries::default`] installs the
//! standard handlers, and the `with_*` builders replace or add entries before
//! a [`ParseContext`](crate::context::ParseContext) is created. Nothing is
//! registered once parsing has started.

use crate::data;
use crate::dispatch::{self, DirectiveKind};
use crate::error::Result;
use crate::ir::{Attribute, DataBinding, Interactor, Legend, Mark, Options, Resolved, Widget};
use crate::reactive::{Param, Reactive, Selection};
use crate::sql::{self, Expr};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

pub type FormatHandler =
    Arc<dyn Fn(&str, &Map<String, Value>) -> Result<Option<String>> + Send + Sync>;
pub type TransformHandler = Arc<dyn Fn(&[Value]) -> Expr + Send + Sync>;
pub type ParamHandler = Arc<dyn Fn(Value) -> Reactive + Send + Sync>;
pub type MarkHandler = Arc<dyn Fn(Option<DataBinding>, Options) -> Mark + Send + Sync>;
pub type LegendHandler = Arc<dyn Fn(Options) -> Legend + Send + Sync>;
pub type InteractorHandler = Arc<dyn Fn(Options) -> Interactor + Send + Sync>;
pub type InputHandler = Arc<dyn Fn(Options) -> Widget + Send + Sync>;
pub type AttributeHandler = Arc<dyn Fn(Resolved) -> Attribute + Send + Sync>;

/// An unordered name → handler table
pub struct Registry<H> {
    entries: BTreeMap<String, H>,
}

impl<H> Default for Registry<H> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<H: Clone> Clone for Registry<H> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<H> Registry<H> {
    pub fn insert(&mut self, name: impl Into<String>, handler: H) {
        self.entries.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Option<&H> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

/// Every table the interpreter dispatches through
#[derive(Clone)]
pub struct Registries {
    pub formats: Registry<FormatHandler>,
    /// Ordered: the first key present in a node wins
    pub directives: Vec<DirectiveKind>,
    pub transforms: Registry<TransformHandler>,
    pub params: Registry<ParamHandler>,
    pub selections: Registry<InteractorHandler>,
    pub attributes: Registry<AttributeHandler>,
    pub legends: Registry<LegendHandler>,
    pub inputs: Registry<InputHandler>,
    pub marks: Registry<MarkHandler>,
}

impl Default for Registries {
    fn default() -> Self {
        Self {
            formats: default_formats(),
            directives: dispatch::default_directives(),
            transforms: default_transforms(),
            params: default_params(),
            selections: default_selections(),
            attributes: default_attributes(),
            legends: default_legends(),
            inputs: default_inputs(),
            marks: default_marks(),
        }
    }
}

impl Registries {
    pub fn with_format<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&str, &Map<String, Value>) -> Result<Option<String>> + Send + Sync + 'static,
    {
        self.formats.insert(name, Arc::new(handler));
        self
    }

    pub fn with_transform<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&[Value]) -> Expr + Send + Sync + 'static,
    {
        self.transforms.insert(name, Arc::new(handler));
        self
    }

    pub fn with_param<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(Value) -> Reactive + Send + Sync + 'static,
    {
        self.params.insert(name, Arc::new(handler));
        self
    }

    pub fn with_selection<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(Options) -> Interactor + Send + Sync + 'static,
    {
        self.selections.insert(name, Arc::new(handler));
        self
    }

    pub fn with_attribute<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(Resolved) -> Attribute + Send + Sync + 'static,
    {
        self.attributes.insert(name, Arc::new(handler));
        self
    }

    pub fn with_legend<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(Options) -> Legend + Send + Sync + 'static,
    {
        self.legends.insert(name, Arc::new(handler));
        self
    }

    pub fn with_input<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(Options) -> Widget + Send + Sync + 'static,
    {
        self.inputs.insert(name, Arc::new(handler));
        self
    }

    pub fn with_mark<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(Option<DataBinding>, Options) -> Mark + Send + Sync + 'static,
    {
        self.marks.insert(name, Arc::new(handler));
        self
    }
}

// =============================================================================
// Defaults
// =============================================================================

fn default_formats() -> Registry<FormatHandler> {
    let mut r: Registry<FormatHandler> = Registry::default();
    r.insert("table", Arc::new(data::load_table));
    r.insert("parquet", Arc::new(data::load_parquet));
    r.insert("csv", Arc::new(data::load_csv));
    r.insert("json", Arc::new(data::load_json));
    r
}

const AGGREGATES: &[(&str, &str)] = &[
    ("argmax", "ARG_MAX"),
    ("argmin", "ARG_MIN"),
    ("avg", "AVG"),
    ("first", "FIRST"),
    ("last", "LAST"),
    ("max", "MAX"),
    ("median", "MEDIAN"),
    ("min", "MIN"),
    ("mode", "MODE"),
    ("product", "PRODUCT"),
    ("quantile", "QUANTILE"),
    ("stddev", "STDDEV"),
    ("stddevPop", "STDDEV_POP"),
    ("sum", "SUM"),
    ("variance", "VARIANCE"),
    ("varPop", "VAR_POP"),
];

fn default_transforms() -> Registry<TransformHandler> {
    let mut r: Registry<TransformHandler> = Registry::default();
    for &(name, function) in AGGREGATES {
        r.insert(name, Arc::new(move |args: &[Value]| Expr::aggregate(function, args)));
    }
    r.insert(
        "count",
        Arc::new(|_: &[Value]| Expr {
            sql: "COUNT(*)".to_string(),
            label: None,
            aggregate: true,
        }),
    );

    // Date parts projected onto a common year so they line up on one axis
    r.insert("dateMonth", Arc::new(|args: &[Value]| date_part(args, "MONTH({}), 1")));
    r.insert("dateMonthDay", Arc::new(|args: &[Value]| date_part(args, "MONTH({}), DAY({})")));
    r.insert("dateDay", Arc::new(|args: &[Value]| date_part(args, "1, DAY({})")));

    r.insert("centroidX", Arc::new(|args: &[Value]| wrap_call("ST_X(ST_Centroid({}))", args)));
    r.insert("centroidY", Arc::new(|args: &[Value]| wrap_call("ST_Y(ST_Centroid({}))", args)));
    r.insert("geojson", Arc::new(|args: &[Value]| wrap_call("ST_AsGeoJSON({})", args)));
    r
}

fn first_column(args: &[Value]) -> String {
    args.first().map(sql::argument).unwrap_or_else(|| "NULL".to_string())
}

fn date_part(args: &[Value], template: &str) -> Expr {
    Expr::raw(format!("MAKE_DATE(2012, {})", template.replace("{}", &first_column(args))))
}

fn wrap_call(template: &str, args: &[Value]) -> Expr {
    Expr::raw(template.replace("{}", &first_column(args)))
}

fn default_params() -> Registry<ParamHandler> {
    let mut r: Registry<ParamHandler> = Registry::default();
    r.insert("value", Arc::new(|v: Value| Reactive::Param(Param::new(v))));
    r.insert("intersect", Arc::new(|_: Value| Reactive::Selection(Selection::intersect())));
    r.insert("union", Arc::new(|_: Value| Reactive::Selection(Selection::union())));
    r.insert("crossfilter", Arc::new(|_: Value| Reactive::Selection(Selection::crossfilter())));
    r.insert("single", Arc::new(|_: Value| Reactive::Selection(Selection::single())));
    r
}

const MARKS: &[&str] = &[
    "area", "areaX", "areaY", "arrow", "axisX", "axisY", "axisFx", "axisFy", "barX", "barY",
    "cell", "cellX", "cellY", "circle", "contour", "denseLine", "density", "densityX",
    "densityY", "dot", "dotX", "dotY", "errorbarX", "errorbarY", "frame", "geo", "graticule",
    "gridX", "gridY", "gridFx", "gridFy", "heatmap", "hexagon", "hexbin", "hexgrid", "image",
    "line", "lineX", "lineY", "link", "raster", "rasterTile", "rect", "rectX", "rectY",
    "regressionY", "ruleX", "ruleY", "sphere", "spike", "text", "textX", "textY", "tickX",
    "tickY", "vector", "vectorX", "vectorY",
];

fn default_marks() -> Registry<MarkHandler> {
    let mut r: Registry<MarkHandler> = Registry::default();
    for &name in MARKS {
        r.insert(
            name,
            Arc::new(move |data: Option<DataBinding>, options: Options| Mark {
                mark_type: name.to_string(),
                data,
                options,
            }),
        );
    }
    r
}

fn default_legends() -> Registry<LegendHandler> {
    let mut r: Registry<LegendHandler> = Registry::default();
    for name in ["legendColor", "legendOpacity", "legendSymbol"] {
        r.insert(
            name,
            Arc::new(move |options: Options| Legend {
                legend_type: name.to_string(),
                options,
            }),
        );
    }
    r
}

const INTERACTORS: &[&str] = &[
    "highlight", "intervalX", "intervalXY", "intervalY", "nearest", "nearestX", "nearestY",
    "pan", "panX", "panY", "panZoom", "panZoomX", "panZoomY", "toggle", "toggleColor",
    "toggleX", "toggleY", "toggleZ",
];

fn default_selections() -> Registry<InteractorHandler> {
    let mut r: Registry<InteractorHandler> = Registry::default();
    for &name in INTERACTORS {
        r.insert(
            name,
            Arc::new(move |options: Options| Interactor {
                select_type: name.to_string(),
                options,
            }),
        );
    }
    r
}

fn default_inputs() -> Registry<InputHandler> {
    let mut r: Registry<InputHandler> = Registry::default();
    for name in ["menu", "search", "slider", "table"] {
        r.insert(
            name,
            Arc::new(move |options: Options| Widget {
                input_type: name.to_string(),
                options,
            }),
        );
    }
    r
}

const PLOT_ATTRIBUTES: &[&str] = &[
    "style", "width", "height", "margin", "marginTop", "marginRight", "marginBottom",
    "marginLeft", "margins", "inset", "align", "aspectRatio", "axis", "ariaLabel",
    "ariaDescription", "clip", "grid", "label", "padding", "round", "name",
    "projectionType", "projectionParallels", "projectionPrecision", "projectionRotate",
    "projectionDomain", "projectionInset", "projectionClip",
];

const POSITION_SCALES: &[&str] = &["x", "y", "fx", "fy"];

const POSITION_SUFFIXES: &[&str] = &[
    "Scale", "Domain", "Range", "Nice", "Inset", "InsetLeft", "InsetRight", "InsetTop",
    "InsetBottom", "Clamp", "Round", "Align", "Padding", "PaddingInner", "PaddingOuter",
    "Axis", "Ticks", "TickSize", "TickSpacing", "TickPadding", "TickFormat", "TickRotate",
    "Grid", "Line", "Label", "LabelAnchor", "LabelArrow", "LabelOffset", "FontVariant",
    "AriaLabel", "AriaDescription", "Reverse", "Zero", "Percent", "Base", "Exponent",
    "Constant",
];

const VISUAL_SCALES: &[&str] = &["color", "opacity", "r", "length", "symbol"];

const VISUAL_SUFFIXES: &[&str] = &[
    "Scale", "Domain", "Range", "Clamp", "N", "Nice", "Scheme", "Unknown", "Interpolate",
    "Pivot", "Symmetric", "Label", "Reverse", "Zero", "TickFormat", "Base", "Exponent",
    "Constant",
];

fn default_attributes() -> Registry<AttributeHandler> {
    let mut r: Registry<AttributeHandler> = Registry::default();
    let mut names: Vec<String> = PLOT_ATTRIBUTES.iter().map(|s| s.to_string()).collect();
    for scale in POSITION_SCALES {
        names.extend(POSITION_SUFFIXES.iter().map(|suffix| format!("{}{}", scale, suffix)));
    }
    for scale in VISUAL_SCALES {
        names.extend(VISUAL_SUFFIXES.iter().map(|suffix| format!("{}{}", scale, suffix)));
    }
    for name in names {
        let attr = name.clone();
        r.insert(
            name,
            Arc::new(move |value: Resolved| Attribute {
                name: attr.clone(),
                value,
            }),
        );
    }
    r
}
