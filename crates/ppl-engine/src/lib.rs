//! PPL engine facade
//!
//! Ties the parser, analyzer and type mapper together behind one entry point:
//!
//! ```
//! use ppl_engine::PplEngine;
//! use serde_json::json;
//!
//! let mut engine = PplEngine::default();
//! engine
//!     .register_index("orders", &json!({
//!         "properties": {
//!             "status": { "type": "keyword" },
//!             "amount": { "type": "double" }
//!         }
//!     }))
//!     .unwrap();
//!
//! let plan = engine.compile("source = orders | where amount > 10 | fields status").unwrap();
//! assert_eq!(plan.schema().names(), vec!["status"]);
//! ```

pub mod config;
mod engine;
mod error;
pub mod logging;

pub use config::{Config, ConfigError, LoggingConfig, MappingConfig, PlannerConfig};
pub use engine::PplEngine;
pub use error::{EngineError, Result};
