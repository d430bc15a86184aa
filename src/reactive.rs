//! Reactive state shared through the namespace.
//!
//! A [`Param`] is a single value cell; a [`Selection`] aggregates filter
//! clauses contributed by several sources. Both are handed out as `Arc`s so
//! that every reference to the same name observes the same instance.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Call every listener registered so far, without holding the lock, so a
/// listener may subscribe or update the same instance.
fn notify(listeners: &Mutex<Vec<Listener>>, value: &Value) {
    let snapshot: Vec<Listener> = lock(listeners).clone();
    for listener in snapshot {
        listener(value);
    }
}

/// A mutable reactive value cell
pub struct Param {
    value: RwLock<Value>,
    listeners: Mutex<Vec<Listener>>,
}

impl Param {
    pub fn new(value: Value) -> Arc<Self> {
        Arc::new(Self {
            value: RwLock::new(value),
            listeners: Mutex::new(Vec::new()),
        })
    }

    pub fn value(&self) -> Value {
        self.value
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Set a new value and notify subscribers
    pub fn update(&self, value: Value) {
        *self
            .value
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = value.clone();
        notify(&self.listeners, &value);
    }

    pub fn subscribe(&self, listener: impl Fn(&Value) + Send + Sync + 'static) {
        lock(&self.listeners).push(Arc::new(listener));
    }
}

impl std::fmt::Debug for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Param").field("value", &self.value()).finish()
    }
}

impl Serialize for Param {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Param", 1)?;
        s.serialize_field("param", &self.value())?;
        s.end()
    }
}

/// How a selection merges the clauses of its sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionKind {
    Intersect,
    Union,
    Crossfilter,
    Single,
}

/// A filter contribution from one source (usually an interactor or input)
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub source: String,
    /// SQL predicate; `None` clears the source's clause
    pub predicate: Option<String>,
    pub value: Value,
}

/// A reactive aggregator of filter clauses
pub struct Selection {
    kind: SelectionKind,
    clauses: Mutex<Vec<Clause>>,
    listeners: Mutex<Vec<Listener>>,
}

impl Selection {
    pub fn new(kind: SelectionKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            clauses: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
        })
    }

    pub fn intersect() -> Arc<Self> {
        Self::new(SelectionKind::Intersect)
    }

    pub fn union() -> Arc<Self> {
        Self::new(SelectionKind::Union)
    }

    pub fn crossfilter() -> Arc<Self> {
        Self::new(SelectionKind::Crossfilter)
    }

    pub fn single() -> Arc<Self> {
        Self::new(SelectionKind::Single)
    }

    pub fn kind(&self) -> SelectionKind {
        self.kind
    }

    pub fn clauses(&self) -> Vec<Clause> {
        lock(&self.clauses).clone()
    }

    /// Value of the most recently active clause
    pub fn value(&self) -> Value {
        lock(&self.clauses)
            .last()
            .map(|c| c.value.clone())
            .unwrap_or(Value::Null)
    }

    /// Add, replace or clear the clause of `clause.source`
    pub fn update(&self, clause: Clause) {
        let value = clause.value.clone();
        {
            let mut clauses = lock(&self.clauses);
            if self.kind == SelectionKind::Single {
                clauses.clear();
            } else {
                clauses.retain(|c| c.source != clause.source);
            }
            if clause.predicate.is_some() {
                clauses.push(clause);
            }
        }
        notify(&self.listeners, &value);
    }

    pub fn subscribe(&self, listener: impl Fn(&Value) + Send + Sync + 'static) {
        lock(&self.listeners).push(Arc::new(listener));
    }

    /// Combined predicate as seen by `client`. Crossfilter selections skip
    /// the client's own clause.
    pub fn predicate(&self, client: Option<&str>) -> Option<String> {
        let clauses = lock(&self.clauses);
        let skip_own = self.kind == SelectionKind::Crossfilter;
        let parts: Vec<String> = clauses
            .iter()
            .filter(|c| !(skip_own && Some(c.source.as_str()) == client))
            .filter_map(|c| c.predicate.as_ref().map(|p| format!("({})", p)))
            .collect();

        if parts.is_empty() {
            return None;
        }
        let op = match self.kind {
            SelectionKind::Union => " OR ",
            _ => " AND ",
        };
        Some(parts.join(op))
    }
}

impl std::fmt::Debug for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selection")
            .field("kind", &self.kind)
            .field("clauses", &self.clauses())
            .finish()
    }
}

impl Serialize for Selection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Selection", 1)?;
        s.serialize_field("selection", &self.kind)?;
        s.end()
    }
}

/// A live namespace entry
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Reactive {
    Param(Arc<Param>),
    Selection(Arc<Selection>),
}

impl Reactive {
    /// Whether both handles point at the same instance
    pub fn same_instance(&self, other: &Reactive) -> bool {
        match (self, other) {
            (Reactive::Param(a), Reactive::Param(b)) => Arc::ptr_eq(a, b),
            (Reactive::Selection(a), Reactive::Selection(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_param(&self) -> Option<&Arc<Param>> {
        match self {
            Reactive::Param(p) => Some(p),
            Reactive::Selection(_) => None,
        }
    }

    pub fn as_selection(&self) -> Option<&Arc<Selection>> {
        match self {
            Reactive::Selection(s) => Some(s),
            Reactive::Param(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn clause(source: &str, predicate: &str) -> Clause {
        Clause {
            source: source.to_string(),
            predicate: Some(predicate.to_string()),
            value: json!(predicate),
        }
    }

    #[test]
    fn test_param_update_notifies() {
        let p = Param::new(json!(1));
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        p.subscribe(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        p.update(json!(2));
        assert_eq!(p.value(), json!(2));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_may_reenter_instance() {
        let p = Param::new(json!(0));
        let hits = Arc::new(AtomicUsize::new(0));
        let (inner, h) = (Arc::clone(&p), hits.clone());
        p.subscribe(move |v| {
            h.fetch_add(1, Ordering::SeqCst);
            assert_eq!(inner.value(), *v);
            let h = h.clone();
            inner.subscribe(move |_| {
                h.fetch_add(1, Ordering::SeqCst);
            });
        });
        p.update(json!(1));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        // the listener added during the first round runs on the next one
        p.update(json!(2));
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        let s = Selection::intersect();
        let target = Arc::clone(&s);
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        s.subscribe(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
            target.subscribe(|_| {});
            assert!(target.predicate(None).is_some());
        });
        s.update(clause("a", "x > 1"));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_intersect_and_union() {
        let s = Selection::intersect();
        s.update(clause("a", "x > 1"));
        s.update(clause("b", "y < 2"));
        assert_eq!(s.predicate(None).as_deref(), Some("(x > 1) AND (y < 2)"));

        let u = Selection::union();
        u.update(clause("a", "x > 1"));
        u.update(clause("b", "y < 2"));
        assert_eq!(u.predicate(None).as_deref(), Some("(x > 1) OR (y < 2)"));
    }

    #[test]
    fn test_crossfilter_skips_own_clause() {
        let s = Selection::crossfilter();
        s.update(clause("a", "x > 1"));
        s.update(clause("b", "y < 2"));
        assert_eq!(s.predicate(Some("a")).as_deref(), Some("(y < 2)"));
    }

    #[test]
    fn test_single_keeps_one_clause() {
        let s = Selection::single();
        s.update(clause("a", "x > 1"));
        s.update(clause("b", "y < 2"));
        assert_eq!(s.clauses().len(), 1);
        assert_eq!(s.value(), json!("y < 2"));
    }

    #[test]
    fn test_clear_clause() {
        let s = Selection::intersect();
        s.update(clause("a", "x > 1"));
        s.update(Clause { source: "a".into(), predicate: None, value: Value::Null });
        assert!(s.predicate(None).is_none());
    }

    #[test]
    fn test_same_instance() {
        let p = Reactive::Param(Param::new(json!(0)));
        let q = p.clone();
        assert!(p.same_instance(&q));
        assert!(!p.same_instance(&Reactive::Param(Param::new(json!(0)))));
    }
}
