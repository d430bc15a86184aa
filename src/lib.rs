// Library exports for mosaic-spec

pub mod context;
pub mod data;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod ir;
pub mod params;
pub mod plot;
pub mod reactive;
pub mod registry;
pub mod resolve;
pub mod sql;

pub use context::{parse_spec, ParseContext};
pub use engine::{DryRunEngine, ExecutionEngine};
pub use error::{Result, SpecError};
pub use ir::{Directive, Resolved, Spec};
pub use registry::Registries;

use serde::Deserialize;

/// Interpretation settings, loadable from JSON
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ParseOptions {
    /// Reject nodes that carry more than one directive key instead of
    /// honoring the first in registration order
    #[serde(default)]
    pub strict: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let opts: ParseOptions = serde_json::from_str("{}").unwrap();
        assert!(!opts.strict);
        let opts: ParseOptions = serde_json::from_str(r#"{"strict": true}"#).unwrap();
        assert!(opts.strict);
    }
}
