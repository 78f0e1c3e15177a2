//! Structured type system shared by the plan builder and the store mapper

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    // Primitives
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal { precision: u8, scale: u8 },

    // Text
    String,

    // Binary
    Binary,

    // Temporal
    Date,
    Timestamp,
    Interval,

    // Store-specific
    Ip,
    GeoPoint,

    // Complex
    Array(Box<DataType>),
    Struct(Vec<Field>),
    Map { key: Box<DataType>, value: Box<DataType> },

    // Special
    Null,
}

impl DataType {
    pub fn is_integer(&self) -> bool {
        matches!(self, DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64)
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64 | DataType::Decimal { .. })
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_floating()
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, DataType::Date | DataType::Timestamp)
    }

    /// Types a sort key or comparison can be evaluated on.
    pub fn is_orderable(&self) -> bool {
        self.is_numeric()
            || self.is_temporal()
            || matches!(self, DataType::String | DataType::Bool | DataType::Ip | DataType::Null)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Bool => write!(f, "boolean"),
            DataType::Int8 => write!(f, "byte"),
            DataType::Int16 => write!(f, "short"),
            DataType::Int32 => write!(f, "int"),
            DataType::Int64 => write!(f, "long"),
            DataType::Float32 => write!(f, "float"),
            DataType::Float64 => write!(f, "double"),
            DataType::Decimal { precision, scale } => write!(f, "decimal({precision},{scale})"),
            DataType::String => write!(f, "string"),
            DataType::Binary => write!(f, "binary"),
            DataType::Date => write!(f, "date"),
            DataType::Timestamp => write!(f, "timestamp"),
            DataType::Interval => write!(f, "interval"),
            DataType::Ip => write!(f, "ip"),
            DataType::GeoPoint => write!(f, "geo_point"),
            DataType::Array(element) => write!(f, "array<{element}>"),
            DataType::Struct(fields) => {
                write!(f, "struct<")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.data_type)?;
                }
                write!(f, ">")
            }
            DataType::Map { key, value } => write!(f, "map<{key}, {value}>"),
            DataType::Null => write!(f, "null"),
        }
    }
}

/// Round-trip hints for store mappings whose vocabulary is finer than [`DataType`].
///
/// `keyword` and `text` both become [`DataType::String`], `half_float` and `float`
/// both become [`DataType::Float32`]; the hints let the mapper emit the original
/// store type again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldHints {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub text: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub half_float: bool,

    /// `"<field>.<subfield>"` -> declared store type of the subfield
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub multi_fields: BTreeMap<String, String>,

    /// Target path when the field was declared as an alias
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias_path: Option<String>,
}

impl FieldHints {
    pub fn is_empty(&self) -> bool {
        !self.text && !self.half_float && self.multi_fields.is_empty() && self.alias_path.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "FieldHints::is_empty")]
    pub hints: FieldHints,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
            hints: FieldHints::default(),
        }
    }

    /// Nullable field, the default for everything read from a store mapping.
    pub fn nullable(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(name, data_type, true)
    }

    pub fn with_hints(mut self, hints: FieldHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.data_type)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn find_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Concatenate two schemas, left fields first.
    pub fn join(&self, other: &Schema) -> Schema {
        let mut fields = self.fields.clone();
        fields.extend(other.fields.iter().cloned());
        Schema { fields }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{field}")?;
        }
        write!(f, ")")
    }
}
