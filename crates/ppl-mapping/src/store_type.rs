//! Store type vocabulary and date format classification

use ppl_plan::DataType;
use serde_json::Value;
use std::fmt;

use crate::error::MappingError;

/// Format the store assumes for a `date` field declared without one
pub const DEFAULT_DATE_FORMAT: &str = "strict_date_optional_time||epoch_millis";

const EPOCH_FORMATS: [&str; 2] = ["epoch_millis", "epoch_second"];

/// Type tags a mapping document may declare for a normal field.
///
/// `alias` is not listed; alias entries are resolved separately once their
/// siblings are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreType {
    Boolean,
    Keyword,
    Text,
    Long,
    Integer,
    Short,
    Byte,
    Double,
    Float,
    HalfFloat,
    Date,
    Object,
    Binary,
    Ip,
    GeoPoint,
}

impl StoreType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "boolean" => StoreType::Boolean,
            "keyword" => StoreType::Keyword,
            "text" => StoreType::Text,
            "long" => StoreType::Long,
            "integer" => StoreType::Integer,
            "short" => StoreType::Short,
            "byte" => StoreType::Byte,
            "double" => StoreType::Double,
            "float" => StoreType::Float,
            "half_float" => StoreType::HalfFloat,
            "date" => StoreType::Date,
            "object" => StoreType::Object,
            "binary" => StoreType::Binary,
            "ip" => StoreType::Ip,
            "geo_point" => StoreType::GeoPoint,
            _ => return None,
        })
    }

    pub fn tag(&self) -> &'static str {
        match self {
            StoreType::Boolean => "boolean",
            StoreType::Keyword => "keyword",
            StoreType::Text => "text",
            StoreType::Long => "long",
            StoreType::Integer => "integer",
            StoreType::Short => "short",
            StoreType::Byte => "byte",
            StoreType::Double => "double",
            StoreType::Float => "float",
            StoreType::HalfFloat => "half_float",
            StoreType::Date => "date",
            StoreType::Object => "object",
            StoreType::Binary => "binary",
            StoreType::Ip => "ip",
            StoreType::GeoPoint => "geo_point",
        }
    }

    /// Structured type for every tag except `date`, `text` and `object`,
    /// which need the rest of the field mapping.
    pub fn scalar_type(&self) -> Option<DataType> {
        Some(match self {
            StoreType::Boolean => DataType::Bool,
            StoreType::Keyword => DataType::String,
            StoreType::Long => DataType::Int64,
            StoreType::Integer => DataType::Int32,
            StoreType::Short => DataType::Int16,
            StoreType::Byte => DataType::Int8,
            StoreType::Double => DataType::Float64,
            StoreType::Float | StoreType::HalfFloat => DataType::Float32,
            StoreType::Binary => DataType::Binary,
            StoreType::Ip => DataType::Ip,
            StoreType::GeoPoint => DataType::GeoPoint,
            StoreType::Text | StoreType::Date | StoreType::Object => return None,
        })
    }
}

impl fmt::Display for StoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Classify a `date` field's `format` as a date-only or timestamp column.
pub(crate) fn resolve_date_format(field: &str, format: Option<&Value>) -> Result<DataType, MappingError> {
    let format = match format {
        None => DEFAULT_DATE_FORMAT,
        Some(Value::String(format)) => format.as_str(),
        Some(_) => return Err(MappingError::malformed(field, "date format must be a string")),
    };

    let (epochs, named): (Vec<&str>, Vec<&str>) = format
        .split("||")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .partition(|token| EPOCH_FORMATS.contains(token));

    match (named.as_slice(), epochs.as_slice()) {
        (["date"] | ["strict_date"], []) => Ok(DataType::Date),
        (["strict_date_optional_time"], [] | ["epoch_millis"])
        | (["strict_date_optional_time_nanos"], [])
        | ([], ["epoch_millis"]) => Ok(DataType::Timestamp),
        _ => Err(MappingError::UnsupportedDateFormat {
            field: field.to_string(),
            format: format.to_string(),
        }),
    }
}
