//! Catalog capability consumed by the plan builder

use std::collections::HashMap;
use thiserror::Error;

use crate::types::{DataType, Schema};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("column '{column}' not found in table '{table}'")]
    ColumnNotFound { table: String, column: String },

    #[error("catalog backend error: {0}")]
    Backend(String),
}

/// Trait for resolving table schemas at analysis time
///
/// Implementations are consulted synchronously; any error they return aborts
/// the analysis of the current query.
pub trait Catalog: Send + Sync {
    /// Get schema for a table by name
    fn resolve_table(&self, name: &str) -> Result<Schema, CatalogError>;

    /// Get the type of a top-level column of a table
    fn resolve_column(&self, table: &str, column: &str) -> Result<DataType, CatalogError> {
        let schema = self.resolve_table(table)?;
        schema
            .find_field(column)
            .map(|f| f.data_type.clone())
            .ok_or_else(|| CatalogError::ColumnNotFound {
                table: table.to_string(),
                column: column.to_string(),
            })
    }
}

/// Map-backed catalog, used by the engine facade and in tests
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalog {
    tables: HashMap<String, Schema>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, name: impl Into<String>, schema: Schema) {
        self.tables.insert(name.into(), schema);
    }

    pub fn with_table(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.add_table(name, schema);
        self
    }

    pub fn remove_table(&mut self, name: &str) -> Option<Schema> {
        self.tables.remove(name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Catalog for InMemoryCatalog {
    fn resolve_table(&self, name: &str) -> Result<Schema, CatalogError> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| CatalogError::TableNotFound(name.to_string()))
    }
}
