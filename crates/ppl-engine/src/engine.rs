use ppl_analyzer::Analyzer;
use ppl_ast::Query;
use ppl_mapping::TypeMapper;
use ppl_plan::{InMemoryCatalog, LogicalPlan, Schema};
use ppl_registry::FunctionRegistry;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;

/// Compiles PPL text against indices registered from their mapping documents.
#[derive(Debug, Clone)]
pub struct PplEngine {
    config: Config,
    catalog: InMemoryCatalog,
    registry: FunctionRegistry,
    mapper: TypeMapper,
}

impl PplEngine {
    pub fn new(config: Config) -> Self {
        let mapper = TypeMapper::with_unsupported_types(config.mapping.unsupported_types.iter().cloned());
        Self {
            config,
            catalog: InMemoryCatalog::new(),
            registry: FunctionRegistry::default(),
            mapper,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &InMemoryCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn mapper(&self) -> &TypeMapper {
        &self.mapper
    }

    /// Read `mapping` and expose it as table `name`, replacing any earlier
    /// registration. Returns the schema queries will see.
    pub fn register_index(&mut self, name: impl Into<String>, mapping: &Value) -> Result<Schema> {
        let name = name.into();
        let schema = self.mapper.deserialize(mapping)?;
        info!(index = %name, fields = schema.len(), "Registered index");
        self.catalog.add_table(name, schema.clone());
        Ok(schema)
    }

    pub fn drop_index(&mut self, name: &str) -> bool {
        let dropped = self.catalog.remove_table(name).is_some();
        if dropped {
            info!(index = %name, "Dropped index");
        }
        dropped
    }

    /// Mapping document that would store rows of `schema`
    pub fn create_index_mapping(&self, schema: &Schema) -> Result<Value> {
        Ok(self.mapper.serialize(schema)?)
    }

    pub fn parse(&self, query: &str) -> Result<Query> {
        Ok(ppl_ast::parse(query)?)
    }

    pub fn compile(&self, query: &str) -> Result<LogicalPlan> {
        let ast = self.parse(query)?;
        debug!(commands = ast.pipeline.commands.len(), "Parsed query");

        let plan = Analyzer::new(&self.catalog, &self.registry)
            .with_default_head_size(self.config.planner.default_head_size)
            .analyze(&ast)?;

        info!(
            source = %ast.pipeline.source.name,
            fingerprint = %plan.fingerprint(),
            "Compiled query"
        );
        Ok(plan)
    }

    /// Indented plan tree for `query`
    pub fn explain(&self, query: &str) -> Result<String> {
        let plan = self.compile(query)?;
        Ok(ppl_plan::explain(&plan))
    }
}

impl Default for PplEngine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_and_drop() {
        let mut engine = PplEngine::default();
        let schema = engine
            .register_index("logs", &json!({ "properties": { "msg": { "type": "text" } } }))
            .unwrap();
        assert_eq!(schema.names(), vec!["msg"]);
        assert_eq!(engine.catalog().table_names(), vec!["logs"]);

        assert!(engine.drop_index("logs"));
        assert!(!engine.drop_index("logs"));
    }

    #[test]
    fn test_configured_unsupported_types() {
        let mut config = Config::default();
        config.mapping.unsupported_types = vec!["geo_shape".to_string()];
        let mut engine = PplEngine::new(config);

        let schema = engine
            .register_index(
                "places",
                &json!({ "properties": { "area": { "type": "geo_shape" }, "name": { "type": "keyword" } } }),
            )
            .unwrap();
        assert_eq!(schema.names(), vec!["name"]);
    }
}
