use ppl_mapping::{MappingError, TypeMapper};
use ppl_plan::{DataType, Field, FieldHints, Schema};
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeMap;

fn arb_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,6}"
}

/// Types that survive a trip through the store vocabulary unchanged
fn arb_scalar_field(name: String) -> impl Strategy<Value = Field> {
    prop_oneof![
        Just(DataType::Bool),
        Just(DataType::String),
        Just(DataType::Int8),
        Just(DataType::Int16),
        Just(DataType::Int32),
        Just(DataType::Int64),
        Just(DataType::Float32),
        Just(DataType::Float64),
        Just(DataType::Date),
        Just(DataType::Timestamp),
        Just(DataType::Binary),
        Just(DataType::Ip),
        Just(DataType::GeoPoint),
    ]
    .prop_flat_map(move |data_type| {
        let name = name.clone();
        (Just(data_type), any::<bool>(), any::<bool>()).prop_map(move |(data_type, hinted, with_raw)| {
            let mut hints = FieldHints::default();
            match data_type {
                DataType::String if hinted => {
                    hints.text = true;
                    if with_raw {
                        hints.multi_fields = BTreeMap::from([(format!("{name}.raw"), "keyword".to_string())]);
                    }
                }
                DataType::Float32 if hinted => hints.half_float = true,
                _ => {}
            }
            Field::nullable(name.clone(), data_type).with_hints(hints)
        })
    })
}

fn arb_fields(depth: u32) -> BoxedStrategy<Vec<Field>> {
    prop::collection::btree_set(arb_name(), 0..5)
        .prop_flat_map(move |names| {
            names
                .into_iter()
                .map(|name| {
                    if depth > 0 {
                        prop_oneof![
                            3 => arb_scalar_field(name.clone()).boxed(),
                            1 => arb_fields(depth - 1)
                                .prop_map(move |fields| Field::nullable(name.clone(), DataType::Struct(fields)))
                                .boxed(),
                        ]
                        .boxed()
                    } else {
                        arb_scalar_field(name).boxed()
                    }
                })
                .collect::<Vec<_>>()
        })
        .boxed()
}

fn arb_schema() -> impl Strategy<Value = Schema> {
    arb_fields(2).prop_map(Schema::new)
}

proptest! {
    #[test]
    fn schema_survives_round_trip(schema in arb_schema()) {
        let mapper = TypeMapper::new();
        let doc = mapper.serialize(&schema).unwrap();
        prop_assert_eq!(mapper.deserialize(&doc).unwrap(), schema);
    }

    #[test]
    fn serialize_is_idempotent(schema in arb_schema()) {
        let mapper = TypeMapper::new();
        let doc = mapper.serialize(&schema).unwrap();
        let again = mapper.serialize(&mapper.deserialize(&doc).unwrap()).unwrap();
        prop_assert_eq!(again, doc);
    }

    #[test]
    fn lossy_types_settle_after_one_trip(precision in 1u8..38, scale in 0u8..10) {
        let mapper = TypeMapper::new();
        let schema = Schema::new(vec![
            Field::nullable("price", DataType::Decimal { precision, scale }),
            Field::nullable("ids", DataType::Array(Box::new(DataType::Int64))),
        ]);
        let first = mapper.deserialize(&mapper.serialize(&schema).unwrap()).unwrap();
        prop_assert_eq!(
            first.fields.iter().map(|f| f.data_type.clone()).collect::<Vec<_>>(),
            vec![DataType::Float64, DataType::Int64]
        );
        let second = mapper.deserialize(&mapper.serialize(&first).unwrap()).unwrap();
        prop_assert_eq!(second, first);
    }
}

#[test]
fn test_store_document_round_trip() {
    let doc = json!({
        "properties": {
            "title": { "type": "text", "fields": { "raw": { "type": "keyword" } } },
            "created": { "type": "date", "format": "strict_date_optional_time_nanos" },
            "day": { "type": "date", "format": "strict_date" },
            "host": { "type": "ip" },
            "geo": { "properties": { "lat": { "type": "double" }, "lon": { "type": "double" } } },
            "name": { "type": "alias", "path": "title" }
        }
    });

    let mapper = TypeMapper::new();
    let schema = mapper.deserialize(&doc).unwrap();
    assert_eq!(mapper.serialize(&schema).unwrap(), doc);
}

#[test]
fn test_default_date_format_normalizes() {
    let mapper = TypeMapper::new();
    let schema = mapper
        .deserialize(&json!({ "properties": { "ts": { "type": "date" } } }))
        .unwrap();
    assert_eq!(
        mapper.serialize(&schema).unwrap(),
        json!({ "properties": { "ts": { "type": "date", "format": "strict_date_optional_time_nanos" } } })
    );
}

#[test]
fn test_repeated_names_are_rejected_not_dropped() {
    let schema = Schema::new(vec![
        Field::nullable("x", DataType::Int64),
        Field::nullable("y", DataType::Int64),
        Field::nullable("x", DataType::String),
        Field::nullable("z", DataType::Int64),
    ]);
    let err = TypeMapper::new().serialize(&schema).unwrap_err();
    assert_eq!(err, MappingError::DuplicateField { field: "x".to_string() });
}
