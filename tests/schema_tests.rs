// tests/schema_tests.rs

mod common;

use bexpr::schema::{
    self, CollectionType, FieldConfiguration, FieldConfigurations, FieldName, IntWidth,
    SchemaError, TypeDescriptor,
};
use bexpr::{MatchOperator, Registry, Selectable, SyncRegistry};
use common::Top;
use std::collections::HashMap;
use std::sync::Arc;

fn top_fields() -> FieldConfigurations {
    schema::generate(&Top::describe()).unwrap()
}

fn field(fields: &FieldConfigurations, name: &str) -> Arc<FieldConfiguration> {
    fields
        .get(&FieldName::from(name))
        .cloned()
        .unwrap_or_else(|| panic!("missing field {}", name))
}

// ============================================================================
// Records
// ============================================================================

#[test]
fn test_record_fields_are_exposed_by_name() {
    let fields = top_fields();
    let mut names: Vec<String> = fields.iter().map(|(name, _)| name.to_string()).collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "Nested",
            "Optional",
            "Tags",
            "TopBool",
            "TopFloat",
            "TopInt",
            "TopString",
            "TopUint8",
            "alias",
            "renamed",
        ]
    );
}

#[test]
fn test_excluded_and_private_fields_are_skipped() {
    let fields = top_fields();
    assert!(fields.get(&FieldName::from("Hidden")).is_none());
    assert!(fields.get(&FieldName::from("internal")).is_none());
    assert!(fields.get(&FieldName::from("Renamed")).is_none());
}

#[test]
fn test_aliases_share_one_configuration() {
    let fields = top_fields();
    let renamed = field(&fields, "renamed");
    let alias = field(&fields, "alias");
    assert!(Arc::ptr_eq(&renamed, &alias));
    assert_eq!(renamed.struct_field_name.as_deref(), Some("Renamed"));
}

#[test]
fn test_tag_name_override() {
    let fields = schema::generate_with_tag(&Top::describe(), "json").unwrap();
    assert!(fields.get(&FieldName::from("Hidden")).is_some());
    assert!(fields.get(&FieldName::from("Renamed")).is_some());
    assert!(fields.get(&FieldName::from("alias")).is_none());
}

// ============================================================================
// Primitive Operations
// ============================================================================

#[test]
fn test_numeric_operations() {
    let fields = top_fields();
    let int = field(&fields, "TopInt");
    assert!(int.supports(MatchOperator::Equal));
    assert!(int.supports(MatchOperator::Less));
    assert!(!int.supports(MatchOperator::In));
    assert!(!int.supports(MatchOperator::Matches));
    assert_eq!(int.collection_type, CollectionType::None);
}

#[test]
fn test_bool_operations() {
    let fields = top_fields();
    let flag = field(&fields, "TopBool");
    let ops: Vec<MatchOperator> = flag.supported_operations.iter().copied().collect();
    assert_eq!(ops, vec![MatchOperator::Equal, MatchOperator::NotEqual]);
}

#[test]
fn test_string_operations() {
    let fields = top_fields();
    let string = field(&fields, "TopString");
    for op in [
        MatchOperator::Equal,
        MatchOperator::In,
        MatchOperator::NotIn,
        MatchOperator::Matches,
        MatchOperator::NotMatches,
        MatchOperator::Greater,
    ] {
        assert!(string.supports(op), "string should support {}", op);
    }
    assert!(!string.supports(MatchOperator::IsEmpty));
}

#[test]
fn test_optional_uses_inner_type() {
    let fields = top_fields();
    let optional = field(&fields, "Optional");
    assert!(optional.supports(MatchOperator::Matches));
}

#[test]
fn test_coercion_follows_width() {
    let fields = top_fields();
    let uint8 = field(&fields, "TopUint8");
    let coerce = uint8.coerce_fn.unwrap();
    assert!(coerce("255").is_ok());
    assert!(coerce("256").is_err());
}

// ============================================================================
// Collections
// ============================================================================

#[test]
fn test_list_of_primitives() {
    let fields = top_fields();
    let tags = field(&fields, "Tags");
    assert_eq!(tags.collection_type, CollectionType::List);
    assert!(tags.supports(MatchOperator::In));
    assert!(tags.supports(MatchOperator::IsEmpty));
    assert!(!tags.supports(MatchOperator::Equal));
    assert!(tags.value_configuration.is_some());
    assert!(tags.index_configuration.is_some());
}

#[test]
fn test_list_of_records() {
    let fields = top_fields();
    let nested = field(&fields, "Nested");
    let slice = field(&nested.sub_fields, "SliceOfStructs");
    assert_eq!(slice.collection_type, CollectionType::List);
    assert!(slice.supports(MatchOperator::IsEmpty));
    assert!(!slice.supports(MatchOperator::In));
    assert!(slice.sub_fields.lookup("X").is_some());
    assert!(slice.sub_fields.lookup("Y").is_some());
}

#[test]
fn test_string_map_has_wildcard_entry() {
    let fields = top_fields();
    let nested = field(&fields, "Nested");
    let map = field(&nested.sub_fields, "Map");
    assert_eq!(map.collection_type, CollectionType::Map);
    assert!(map.supports(MatchOperator::In));
    assert!(map.sub_fields.get(&FieldName::Any).is_some());
    assert!(map.sub_fields.lookup("anything").unwrap().supports(MatchOperator::Matches));
}

#[test]
fn test_map_of_records() {
    let fields = top_fields();
    let nested = field(&fields, "Nested");
    let map = field(&nested.sub_fields, "MapOfStructs");
    let element = map.sub_fields.lookup("a").unwrap();
    assert!(element.sub_fields.lookup("X").is_some());
}

// ============================================================================
// Top Level Types
// ============================================================================

#[test]
fn test_string_keyed_map_top_level() {
    let fields = schema::generate(&HashMap::<String, i64>::describe()).unwrap();
    assert_eq!(fields.len(), 1);
    assert!(fields.lookup("whatever").unwrap().supports(MatchOperator::Less));
}

#[test]
fn test_invalid_top_level_type() {
    let err = schema::generate(&TypeDescriptor::Int(IntWidth::W32)).unwrap_err();
    assert_eq!(
        err,
        SchemaError::InvalidTopLevelType {
            type_name: "i32".to_string()
        }
    );
}

#[test]
fn test_non_string_map_key_top_level() {
    let err = schema::generate(&HashMap::<i32, String>::describe()).unwrap_err();
    assert!(matches!(err, SchemaError::NonStringMapKey { .. }));
}

#[test]
fn test_non_string_map_key_nested_only_supports_emptiness() {
    let descriptor = TypeDescriptor::Record(
        schema::RecordDescriptor::new("R")
            .field("Counts", HashMap::<i32, String>::describe()),
    );
    let fields = schema::generate(&descriptor).unwrap();
    let counts = field(&fields, "Counts");
    let ops: Vec<MatchOperator> = counts.supported_operations.iter().copied().collect();
    assert_eq!(ops, vec![MatchOperator::IsEmpty, MatchOperator::IsNotEmpty]);
}

#[test]
fn test_unsupported_fields_are_left_out() {
    let descriptor = TypeDescriptor::Record(
        schema::RecordDescriptor::new("R")
            .field("Handle", TypeDescriptor::Opaque("File".to_string()))
            .field("Name", TypeDescriptor::String),
    );
    let fields = schema::generate(&descriptor).unwrap();
    assert_eq!(fields.len(), 1);
    assert!(fields.lookup("Name").is_some());
}

// ============================================================================
// Walk and Display
// ============================================================================

#[test]
fn test_walk_visits_nested_paths() {
    let fields = top_fields();
    let mut paths = Vec::new();
    fields.walk(|path, _| {
        let segments: Vec<String> = path.iter().map(ToString::to_string).collect();
        paths.push(segments.join("."));
        true
    });
    assert!(paths.contains(&"Nested.SliceOfStructs.X".to_string()));
    assert!(paths.contains(&"Nested.Map.*".to_string()));
    assert!(paths.contains(&"TopInt".to_string()));
}

#[test]
fn test_walk_stops_early() {
    let fields = top_fields();
    let mut visited = 0;
    let completed = fields.walk(|_, _| {
        visited += 1;
        visited < 2
    });
    assert!(!completed);
    assert_eq!(visited, 2);
}

#[test]
fn test_display() {
    let fields = FieldConfigurations::new()
        .with(
            "a",
            FieldConfiguration::new([MatchOperator::Equal, MatchOperator::NotEqual]),
        )
        .with(
            "b",
            FieldConfiguration::default().with_sub_fields(
                FieldConfigurations::new()
                    .with(FieldName::Any, FieldConfiguration::new([MatchOperator::IsEmpty])),
            ),
        );
    assert_eq!(fields.to_string(), "a: [Equal, Not Equal]\nb: []\nb.*: [Is Empty]\n");
}

// ============================================================================
// Registry
// ============================================================================

#[test]
fn test_sync_registry_generates_once() {
    let registry = SyncRegistry::new();
    let dynamic: &dyn Registry = &registry;

    let first = dynamic.get::<Top>("bexpr").unwrap();
    let second = dynamic.get::<Top>("bexpr").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.len(), 1);

    let other_tag = dynamic.get::<Top>("json").unwrap();
    assert!(!Arc::ptr_eq(&first, &other_tag));
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_sync_registry_concurrent_access() {
    let registry = SyncRegistry::new();
    let results: Vec<Arc<FieldConfigurations>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    let dynamic: &dyn Registry = &registry;
                    dynamic.get::<Top>("bexpr").unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for result in &results[1..] {
        assert!(Arc::ptr_eq(&results[0], result));
    }
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_registry_does_not_cache_failures() {
    let registry = SyncRegistry::new();
    let dynamic: &dyn Registry = &registry;
    assert!(dynamic.get::<i32>("bexpr").is_err());
    assert!(registry.is_empty());
}
