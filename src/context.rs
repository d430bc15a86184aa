use crate::data::{self, LoadReport};
use crate::dispatch;
use crate::engine::ExecutionEngine;
use crate::error::{Result, SpecError};
use crate::ir::{Resolved, Spec};
use crate::params;
use crate::reactive::Reactive;
use crate::registry::Registries;
use crate::resolve::{self, Namespace};
use crate::sql::Expr;
use crate::ParseOptions;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Top-level sections that are not part of the layout tree
const DOCUMENT_KEYS: &[&str] = &["data", "params", "meta"];

/// State of one interpretation session: registries, options and namespace.
///
/// A context may be reused across staged parses; the namespace then carries
/// over and names keep resolving to the same instances. `parse` takes
/// `&mut self`, so parses against one context never interleave.
pub struct ParseContext {
    registries: Arc<Registries>,
    options: ParseOptions,
    namespace: Namespace,
    engine: Arc<dyn ExecutionEngine>,
}

impl ParseContext {
    pub fn new(engine: Arc<dyn ExecutionEngine>) -> Self {
        Self {
            registries: Arc::new(Registries::default()),
            options: ParseOptions::default(),
            namespace: Namespace::new(),
            engine,
        }
    }

    pub fn with_registries(mut self, registries: Registries) -> Self {
        self.registries = Arc::new(registries);
        self
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    pub(crate) fn registries_arc(&self) -> &Arc<Registries> {
        &self.registries
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Interpret a full document.
    ///
    /// The data section is loaded and settled first, then params are bound,
    /// then the directive tree is dispatched.
    pub async fn parse(&mut self, spec: &Value) -> Result<Spec> {
        let root = spec
            .as_object()
            .ok_or_else(|| SpecError::InvalidSpecification(spec.clone()))?;

        let report = self.load_data(root.get("data").unwrap_or(&Value::Null)).await?;
        if !report.all_succeeded() {
            tracing::debug!(
                failed = report.failures().count(),
                "continuing after data load failures"
            );
        }

        params::bind_params(
            root.get("params").unwrap_or(&Value::Null),
            &self.registries,
            &mut self.namespace,
        )?;

        let layout: Map<String, Value> = root
            .iter()
            .filter(|(k, _)| !DOCUMENT_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let directive = dispatch::interpret(&Value::Object(layout), self)?;
        Ok(Spec {
            meta: root.get("meta").cloned(),
            directive,
        })
    }

    pub async fn parse_str(&mut self, json: &str) -> Result<Spec> {
        let spec: Value = serde_json::from_str(json)?;
        self.parse(&spec).await
    }

    /// Materialize a `data` section and wait for every statement to settle
    pub async fn load_data(&self, data: &Value) -> Result<LoadReport> {
        data::load_data(data, &self.registries, self.engine.as_ref()).await
    }

    pub fn resolve_param(&mut self, value: &Value, default: impl FnOnce() -> Reactive) -> Resolved {
        resolve::resolve_param(&mut self.namespace, value, default)
    }

    pub fn resolve_selection(&mut self, value: &Value) -> Resolved {
        resolve::resolve_selection(&mut self.namespace, value)
    }

    pub fn resolve_transform(&self, value: &Value) -> Option<Expr> {
        resolve::resolve_transform(&self.registries.transforms, value)
    }

    /// Transform or expression first, then reference or literal
    pub(crate) fn resolve_channel(&mut self, value: &Value) -> Resolved {
        match self.resolve_transform(value) {
            Some(expr) => Resolved::Expr(expr),
            None => self.resolve_param(value, resolve::value_param),
        }
    }
}

/// Parse `spec` in a fresh context with the default registries
pub async fn parse_spec(spec: &Value, engine: Arc<dyn ExecutionEngine>) -> Result<Spec> {
    ParseContext::new(engine).parse(spec).await
}
