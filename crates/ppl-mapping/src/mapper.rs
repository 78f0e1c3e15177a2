//! Mapping document <-> structured schema translation

use ppl_plan::{DataType, Field, FieldHints, Schema};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::error::MappingError;
use crate::store_type::{resolve_date_format, StoreType};

type Result<T> = std::result::Result<T, MappingError>;

/// Translates store mapping documents into [`Schema`]s and back.
///
/// Fields whose type tag is in the unsupported set are skipped while
/// reading, at every nesting level.
#[derive(Debug, Clone, Default)]
pub struct TypeMapper {
    unsupported: HashSet<String>,
}

impl TypeMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unsupported_types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            unsupported: types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_unsupported(&self, tag: &str) -> bool {
        self.unsupported.contains(tag)
    }

    /// Read a `{"properties": {...}}` document
    pub fn deserialize(&self, mapping: &Value) -> Result<Schema> {
        Ok(Schema::new(self.read_properties(mapping, "")?))
    }

    /// Write `schema` as a `{"properties": {...}}` document
    pub fn serialize(&self, schema: &Schema) -> Result<Value> {
        let properties = write_properties(&schema.fields, "")?;
        Ok(json!({ "properties": properties }))
    }

    fn read_properties(&self, mapping: &Value, parent: &str) -> Result<Vec<Field>> {
        let properties = match mapping.get("properties") {
            None => return Ok(Vec::new()),
            Some(Value::Object(properties)) => properties,
            Some(_) => return Err(MappingError::malformed(parent, "'properties' must be an object")),
        };

        let mut fields = Vec::new();
        let mut aliases = Vec::new();

        for (name, spec) in properties {
            let path = join_path(parent, name);
            if !spec.is_object() {
                return Err(MappingError::malformed(&path, "field mapping must be an object"));
            }
            let tag = match spec.get("type") {
                None => None,
                Some(Value::String(tag)) => Some(tag.as_str()),
                Some(_) => return Err(MappingError::malformed(&path, "'type' must be a string")),
            };

            match tag {
                Some("alias") => aliases.push((name, path, spec)),
                Some(tag) if self.is_unsupported(tag) => {
                    debug!(field = %path, tag, "Dropping field with unsupported type");
                }
                _ => fields.push(self.read_field(name, &path, tag, spec)?),
            }
        }

        let mut resolved = Vec::new();
        for (name, path, spec) in aliases {
            let target_path = spec.get("path").and_then(Value::as_str);
            let target = target_path.and_then(|target| {
                fields
                    .iter()
                    .find(|f| f.name == target || join_path(parent, &f.name) == target)
            });

            match (target_path, target) {
                (Some(target_path), Some(target)) => {
                    let hints = FieldHints {
                        alias_path: Some(target_path.to_string()),
                        ..target.hints.clone()
                    };
                    resolved.push(Field::nullable(name.clone(), target.data_type.clone()).with_hints(hints));
                }
                _ => debug!(field = %path, target = ?target_path, "Dropping alias without a resolvable target"),
            }
        }

        fields.extend(resolved);
        Ok(fields)
    }

    fn read_field(&self, name: &str, path: &str, tag: Option<&str>, spec: &Value) -> Result<Field> {
        let store_type = match tag {
            None => StoreType::Object,
            Some(tag) => StoreType::from_tag(tag).ok_or_else(|| MappingError::UnsupportedType {
                field: path.to_string(),
                tag: tag.to_string(),
            })?,
        };

        let mut hints = FieldHints::default();
        let data_type = match store_type {
            StoreType::Text => {
                hints.text = true;
                hints.multi_fields = read_multi_fields(name, path, spec)?;
                DataType::String
            }
            StoreType::HalfFloat => {
                hints.half_float = true;
                DataType::Float32
            }
            StoreType::Date => resolve_date_format(path, spec.get("format"))?,
            StoreType::Object => DataType::Struct(self.read_properties(spec, path)?),
            other => other
                .scalar_type()
                .ok_or_else(|| MappingError::malformed(path, format!("no structured type for '{other}'")))?,
        };

        Ok(Field::nullable(name, data_type).with_hints(hints))
    }
}

/// `fields` of a text mapping, keyed `"<field>.<sub>"`
fn read_multi_fields(name: &str, path: &str, spec: &Value) -> Result<BTreeMap<String, String>> {
    let subfields = match spec.get("fields") {
        None => return Ok(BTreeMap::new()),
        Some(Value::Object(subfields)) => subfields,
        Some(_) => return Err(MappingError::malformed(path, "'fields' must be an object")),
    };

    subfields
        .iter()
        .map(|(sub, sub_spec)| {
            let tag = sub_spec
                .get("type")
                .and_then(Value::as_str)
                .ok_or_else(|| MappingError::malformed(&join_path(path, sub), "multi-field needs a string 'type'"))?;
            Ok((format!("{name}.{sub}"), tag.to_string()))
        })
        .collect()
}

fn write_properties(fields: &[Field], parent: &str) -> Result<Map<String, Value>> {
    let mut properties = Map::new();
    for field in fields {
        let path = join_path(parent, &field.name);
        let spec = match &field.hints.alias_path {
            Some(target) => json!({ "type": "alias", "path": target }),
            None => write_type(field, &field.data_type, &path)?,
        };
        if properties.insert(field.name.clone(), spec).is_some() {
            return Err(MappingError::DuplicateField { field: path });
        }
    }
    Ok(properties)
}

fn write_type(field: &Field, data_type: &DataType, path: &str) -> Result<Value> {
    let hints = &field.hints;
    let spec = match data_type {
        DataType::Bool => json!({ "type": "boolean" }),
        DataType::String if hints.text => {
            let mut spec = json!({ "type": "text" });
            if !hints.multi_fields.is_empty() {
                let prefix = format!("{}.", field.name);
                let subfields: Map<String, Value> = hints
                    .multi_fields
                    .iter()
                    .map(|(key, tag)| {
                        let sub = key.strip_prefix(&prefix).unwrap_or(key);
                        (sub.to_string(), json!({ "type": tag }))
                    })
                    .collect();
                spec["fields"] = Value::Object(subfields);
            }
            spec
        }
        DataType::String => json!({ "type": "keyword" }),
        DataType::Int8 => json!({ "type": "byte" }),
        DataType::Int16 => json!({ "type": "short" }),
        DataType::Int32 => json!({ "type": "integer" }),
        DataType::Int64 => json!({ "type": "long" }),
        DataType::Float32 if hints.half_float => json!({ "type": "half_float" }),
        DataType::Float32 => json!({ "type": "float" }),
        // Decimal has no store counterpart and widens to double
        DataType::Float64 | DataType::Decimal { .. } => json!({ "type": "double" }),
        DataType::Timestamp => json!({ "type": "date", "format": "strict_date_optional_time_nanos" }),
        DataType::Date => json!({ "type": "date", "format": "strict_date" }),
        DataType::Binary => json!({ "type": "binary", "doc_values": true }),
        DataType::Ip => json!({ "type": "ip" }),
        DataType::GeoPoint => json!({ "type": "geo_point" }),
        DataType::Struct(fields) => {
            let properties = write_properties(fields, path)?;
            json!({ "properties": properties })
        }
        DataType::Map { .. } => json!({ "properties": {} }),
        // The store has no array type; any field may hold several values
        DataType::Array(element) => write_type(field, element, path)?,
        DataType::Interval | DataType::Null => {
            return Err(MappingError::UnsupportedDataType {
                field: path.to_string(),
                data_type: data_type.to_string(),
            })
        }
    };
    Ok(spec)
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(mapping: Value) -> Result<Schema> {
        TypeMapper::new().deserialize(&mapping)
    }

    #[test]
    fn test_scalar_tags() {
        let schema = read(json!({
            "properties": {
                "ok": { "type": "boolean" },
                "name": { "type": "keyword" },
                "big": { "type": "long" },
                "mid": { "type": "integer" },
                "small": { "type": "short" },
                "tiny": { "type": "byte" },
                "ratio": { "type": "double" },
                "score": { "type": "float" },
                "blob": { "type": "binary" },
                "host": { "type": "ip" },
                "where": { "type": "geo_point" }
            }
        }))
        .unwrap();

        let types: Vec<_> = schema.fields.iter().map(|f| f.data_type.clone()).collect();
        assert_eq!(
            types,
            vec![
                DataType::Bool,
                DataType::String,
                DataType::Int64,
                DataType::Int32,
                DataType::Int16,
                DataType::Int8,
                DataType::Float64,
                DataType::Float32,
                DataType::Binary,
                DataType::Ip,
                DataType::GeoPoint,
            ]
        );
        assert!(schema.fields.iter().all(|f| f.nullable && f.hints.is_empty()));
    }

    #[test]
    fn test_text_multi_fields_and_half_float() {
        let schema = read(json!({
            "properties": {
                "title": { "type": "text", "fields": { "raw": { "type": "keyword" } } },
                "weight": { "type": "half_float" }
            }
        }))
        .unwrap();

        let title = &schema.fields[0];
        assert_eq!(title.data_type, DataType::String);
        assert!(title.hints.text);
        assert_eq!(title.hints.multi_fields.get("title.raw").map(String::as_str), Some("keyword"));
        assert!(schema.fields[1].hints.half_float);
    }

    #[test]
    fn test_nested_object_and_absent_type() {
        let schema = read(json!({
            "properties": {
                "geo": {
                    "properties": {
                        "city": { "type": "keyword" },
                        "loc": { "type": "object", "properties": { "lat": { "type": "double" } } }
                    }
                }
            }
        }))
        .unwrap();

        assert_eq!(
            schema.fields[0].data_type,
            DataType::Struct(vec![
                Field::nullable("city", DataType::String),
                Field::nullable("loc", DataType::Struct(vec![Field::nullable("lat", DataType::Float64)])),
            ])
        );
    }

    #[test]
    fn test_unknown_tag_fails() {
        let err = read(json!({ "properties": { "shape": { "type": "geo_shape" } } })).unwrap_err();
        assert_eq!(
            err,
            MappingError::UnsupportedType {
                field: "shape".to_string(),
                tag: "geo_shape".to_string(),
            }
        );
        assert!(err.is_unsupported_type());
    }

    #[test]
    fn test_unknown_tag_reports_nested_path() {
        let err = read(json!({ "properties": { "a": { "properties": { "b": { "type": "nested" } } } } }))
            .unwrap_err();
        assert!(matches!(err, MappingError::UnsupportedType { ref field, .. } if field == "a.b"));
    }

    #[test]
    fn test_unsupported_set_drops_fields_at_every_level() {
        let mapper = TypeMapper::with_unsupported_types(["geo_shape"]);
        let schema = mapper
            .deserialize(&json!({
                "properties": {
                    "shape": { "type": "geo_shape" },
                    "inner": { "properties": { "area": { "type": "geo_shape" }, "id": { "type": "long" } } }
                }
            }))
            .unwrap();

        assert_eq!(
            schema.fields,
            vec![Field::nullable("inner", DataType::Struct(vec![Field::nullable("id", DataType::Int64)]))]
        );
    }

    #[test]
    fn test_aliases_follow_normal_fields() {
        let schema = read(json!({
            "properties": {
                "alt": { "type": "alias", "path": "title" },
                "title": { "type": "text" },
                "ghost": { "type": "alias", "path": "missing" },
                "count": { "type": "long" }
            }
        }))
        .unwrap();

        assert_eq!(schema.names(), vec!["title", "count", "alt"]);
        let alt = &schema.fields[2];
        assert_eq!(alt.data_type, DataType::String);
        assert!(alt.hints.text);
        assert_eq!(alt.hints.alias_path.as_deref(), Some("title"));
    }

    #[test]
    fn test_alias_to_alias_is_dropped() {
        let schema = read(json!({
            "properties": {
                "a": { "type": "alias", "path": "b" },
                "b": { "type": "alias", "path": "c" },
                "c": { "type": "long" }
            }
        }))
        .unwrap();
        assert_eq!(schema.names(), vec!["c", "b"]);
    }

    #[test]
    fn test_empty_and_malformed() {
        assert_eq!(read(json!({})).unwrap(), Schema::empty());

        let err = read(json!({ "properties": [] })).unwrap_err();
        assert!(matches!(err, MappingError::MalformedMapping { ref field, .. } if field == "<root>"));

        let err = read(json!({ "properties": { "a": { "type": 3 } } })).unwrap_err();
        assert!(!err.is_unsupported_type());
    }

    #[test]
    fn test_serialize_shapes() {
        let schema = Schema::new(vec![
            Field::nullable("ts", DataType::Timestamp),
            Field::nullable("day", DataType::Date),
            Field::nullable("blob", DataType::Binary),
            Field::nullable("price", DataType::Decimal { precision: 10, scale: 2 }),
            Field::nullable("tags", DataType::Array(Box::new(DataType::String))),
            Field::nullable(
                "attrs",
                DataType::Map {
                    key: Box::new(DataType::String),
                    value: Box::new(DataType::Int64),
                },
            ),
        ]);

        let doc = TypeMapper::new().serialize(&schema).unwrap();
        assert_eq!(
            doc,
            json!({
                "properties": {
                    "ts": { "type": "date", "format": "strict_date_optional_time_nanos" },
                    "day": { "type": "date", "format": "strict_date" },
                    "blob": { "type": "binary", "doc_values": true },
                    "price": { "type": "double" },
                    "tags": { "type": "keyword" },
                    "attrs": { "properties": {} }
                }
            })
        );
    }

    #[test]
    fn test_serialize_text_and_alias() {
        let mut multi_fields = BTreeMap::new();
        multi_fields.insert("title.raw".to_string(), "keyword".to_string());
        let text = FieldHints {
            text: true,
            multi_fields,
            ..FieldHints::default()
        };
        let schema = Schema::new(vec![
            Field::nullable("title", DataType::String).with_hints(text.clone()),
            Field::nullable("headline", DataType::String).with_hints(FieldHints {
                alias_path: Some("title".to_string()),
                ..text
            }),
        ]);

        let doc = TypeMapper::new().serialize(&schema).unwrap();
        assert_eq!(
            doc,
            json!({
                "properties": {
                    "title": { "type": "text", "fields": { "raw": { "type": "keyword" } } },
                    "headline": { "type": "alias", "path": "title" }
                }
            })
        );
        assert_eq!(TypeMapper::new().deserialize(&doc).unwrap(), schema);
    }

    #[test]
    fn test_serialize_rejects_interval() {
        let schema = Schema::new(vec![Field::nullable(
            "outer",
            DataType::Struct(vec![Field::nullable("span", DataType::Interval)]),
        )]);
        let err = TypeMapper::new().serialize(&schema).unwrap_err();
        assert_eq!(
            err,
            MappingError::UnsupportedDataType {
                field: "outer.span".to_string(),
                data_type: "interval".to_string(),
            }
        );
    }

    #[test]
    fn test_serialize_rejects_repeated_names() {
        // Output of a join where both sides carry `x`
        let schema = Schema::new(vec![
            Field::nullable("x", DataType::Int64),
            Field::nullable("y", DataType::Int64),
            Field::nullable("x", DataType::String),
        ]);
        let err = TypeMapper::new().serialize(&schema).unwrap_err();
        assert_eq!(err, MappingError::DuplicateField { field: "x".to_string() });
        assert!(!err.is_unsupported_type());

        let nested = Schema::new(vec![Field::nullable(
            "geo",
            DataType::Struct(vec![
                Field::nullable("lat", DataType::Float64),
                Field::nullable("lat", DataType::Float32),
            ]),
        )]);
        let err = TypeMapper::new().serialize(&nested).unwrap_err();
        assert_eq!(err, MappingError::DuplicateField { field: "geo.lat".to_string() });
    }

    #[test]
    fn test_key_order_preserved() {
        let schema = read(json!({
            "properties": {
                "zeta": { "type": "long" },
                "alpha": { "type": "long" },
                "mid": { "type": "long" }
            }
        }))
        .unwrap();
        assert_eq!(schema.names(), vec!["zeta", "alpha", "mid"]);

        let doc = TypeMapper::new().serialize(&schema).unwrap();
        let keys: Vec<_> = doc["properties"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }
}
