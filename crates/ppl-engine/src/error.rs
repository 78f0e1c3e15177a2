use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Parse(#[from] ppl_ast::ParseError),

    #[error(transparent)]
    Analyze(#[from] ppl_analyzer::AnalyzeError),

    #[error(transparent)]
    Mapping(#[from] ppl_mapping::MappingError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<ppl_analyzer::AnalysisError> for EngineError {
    fn from(err: ppl_analyzer::AnalysisError) -> Self {
        EngineError::Analyze(err.into())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
