use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("Unsupported store type '{tag}' for field '{field}'")]
    UnsupportedType { field: String, tag: String },

    #[error("Unsupported date format '{format}' for field '{field}'")]
    UnsupportedDateFormat { field: String, format: String },

    #[error("Field '{field}' of type {data_type} has no store mapping")]
    UnsupportedDataType { field: String, data_type: String },

    #[error("Field '{field}' appears more than once at the same level")]
    DuplicateField { field: String },

    #[error("Malformed mapping at '{field}': {reason}")]
    MalformedMapping { field: String, reason: String },
}

impl MappingError {
    /// A type with no counterpart on the other side, as opposed to a broken document
    pub fn is_unsupported_type(&self) -> bool {
        matches!(
            self,
            MappingError::UnsupportedType { .. }
                | MappingError::UnsupportedDateFormat { .. }
                | MappingError::UnsupportedDataType { .. }
        )
    }

    pub(crate) fn malformed(field: &str, reason: impl Into<String>) -> Self {
        MappingError::MalformedMapping {
            field: if field.is_empty() { "<root>".to_string() } else { field.to_string() },
            reason: reason.into(),
        }
    }
}
