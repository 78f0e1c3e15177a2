//! PPL logical plan and structured type system
//!
//! Engine-agnostic plan representation produced by the analyzer, the schema
//! types shared with the store mapper, and the catalog capability the analyzer
//! resolves tables through. Plans serialize to JSON for hand-off and
//! fingerprint deterministically.

pub mod catalog;
mod explain;
mod expr;
mod plan;
mod types;

pub use catalog::{Catalog, CatalogError, InMemoryCatalog};
pub use explain::explain;
pub use expr::*;
pub use plan::LogicalPlan;
pub use types::*;
