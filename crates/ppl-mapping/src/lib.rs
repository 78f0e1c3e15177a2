//! Store mapping documents as structured schemas
//!
//! ```
//! use ppl_mapping::TypeMapper;
//! use ppl_plan::DataType;
//! use serde_json::json;
//!
//! let mapper = TypeMapper::new();
//! let schema = mapper
//!     .deserialize(&json!({ "properties": { "ts": { "type": "date" } } }))
//!     .unwrap();
//! assert_eq!(schema.fields[0].data_type, DataType::Timestamp);
//! ```

mod error;
mod mapper;
mod store_type;

pub use error::MappingError;
pub use mapper::TypeMapper;
pub use store_type::{StoreType, DEFAULT_DATE_FORMAT};
