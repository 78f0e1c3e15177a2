//! Semantic analyzer / plan builder for PPL
//!
//! Resolves a parsed [`ppl_ast::Query`] against a [`ppl_plan::Catalog`] and a
//! [`ppl_registry::FunctionRegistry`], producing a typed [`ppl_plan::LogicalPlan`].

mod analyzer;
mod coerce;
mod error;
mod scope;

pub use analyzer::{Analyzer, DEFAULT_HEAD_SIZE};
pub use error::{AnalysisError, AnalyzeError};
