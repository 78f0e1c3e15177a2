use ppl_plan::CatalogError;
use ppl_registry::RegistryError;
use thiserror::Error;

/// Semantic failure while resolving a query against the catalog
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("Table not found: {0}")]
    UnresolvedTable(String),

    #[error("Column not found: {0}")]
    UnresolvedColumn(String),

    #[error("Ambiguous column reference: {name} (candidates: {})", .candidates.join(", "))]
    AmbiguousColumn { name: String, candidates: Vec<String> },

    #[error("Duplicate column name in {command} output: {name}")]
    DuplicateColumn { command: &'static str, name: String },

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Invalid aggregation: {0}")]
    InvalidAggregation(String),

    #[error("Invalid literal: {0}")]
    InvalidLiteral(String),

    #[error("Invalid {command} command: {reason}")]
    InvalidCommand { command: &'static str, reason: String },

    #[error("Catalog error: {0}")]
    Catalog(CatalogError),
}

impl From<CatalogError> for AnalysisError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::TableNotFound(table) => AnalysisError::UnresolvedTable(table),
            other => AnalysisError::Catalog(other),
        }
    }
}

impl From<RegistryError> for AnalysisError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::FunctionNotFound(name) => AnalysisError::UnknownFunction(name),
            mismatch @ RegistryError::TypeMismatch { .. } => AnalysisError::TypeMismatch(mismatch.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl From<CatalogError> for AnalyzeError {
    fn from(err: CatalogError) -> Self {
        AnalyzeError::Analysis(err.into())
    }
}

impl From<RegistryError> for AnalyzeError {
    fn from(err: RegistryError) -> Self {
        AnalyzeError::Analysis(err.into())
    }
}

pub type Result<T> = std::result::Result<T, AnalyzeError>;
