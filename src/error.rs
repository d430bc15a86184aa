use serde_json::Value;

/// Errors raised while interpreting a specification document.
///
/// Every variant carries the offending fragment so the message can be shown
/// to the author of the document. Data-loading failures are not represented
/// here: the loader absorbs them.
#[derive(thiserror::Error, Debug)]
pub enum SpecError {
    #[error("Unrecognized data format type: {0}")]
    UnrecognizedFormat(Value),

    #[error("Unrecognized param type: {0}")]
    UnrecognizedParamType(Value),

    #[error("Invalid property type for '{key}': {fragment}")]
    InvalidPropertyType { key: String, fragment: Value },

    #[error("Invalid specification: {0}")]
    InvalidSpecification(Value),

    #[error("Ambiguous specification, directive keys {keys:?} in: {fragment}")]
    AmbiguousSpecification { keys: Vec<String>, fragment: Value },

    #[error("Unrecognized input: {0}")]
    UnrecognizedInput(Value),

    #[error("Unrecognized mark type: {0}")]
    UnrecognizedMarkType(Value),

    #[error("Unrecognized legend type: {0}")]
    UnrecognizedLegendType(Value),

    #[error("Unrecognized selection type: {0}")]
    UnrecognizedSelectionType(Value),

    #[error("Unrecognized attribute: {0}")]
    UnrecognizedAttribute(Value),

    #[error("Invalid plot entry: {0}")]
    InvalidPlotEntry(Value),

    #[error("Invalid JSON specification: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl SpecError {
    pub(crate) fn invalid_property(key: &str, fragment: &Value) -> Self {
        SpecError::InvalidPropertyType {
            key: key.to_string(),
            fragment: fragment.clone(),
        }
    }

    /// The specification fragment attached to this error, if any.
    pub fn fragment(&self) -> Option<&Value> {
        match self {
            SpecError::UnrecognizedFormat(v)
            | SpecError::UnrecognizedParamType(v)
            | SpecError::InvalidSpecification(v)
            | SpecError::UnrecognizedInput(v)
            | SpecError::UnrecognizedMarkType(v)
            | SpecError::UnrecognizedLegendType(v)
            | SpecError::UnrecognizedSelectionType(v)
            | SpecError::UnrecognizedAttribute(v)
            | SpecError::InvalidPlotEntry(v) => Some(v),
            SpecError::InvalidPropertyType { fragment, .. }
            | SpecError::AmbiguousSpecification { fragment, .. } => Some(fragment),
            SpecError::InvalidJson(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SpecError>;
