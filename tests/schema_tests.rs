use std::sync::Arc;
use std::thread;

use query_defer::{Record, SchemaRegistry, Value, ValueType};

// ============================================================================
// Cache identity
// ============================================================================

#[test]
fn test_equal_signatures_share_the_schema_object() {
    let registry = SchemaRegistry::new();

    let first = registry.get(&[ValueType::Integer, ValueType::String]);
    let second = registry.get(&[ValueType::Integer, ValueType::String]);

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_signatures_are_order_sensitive() {
    let registry = SchemaRegistry::new();

    let int_string = registry.get(&[ValueType::Integer, ValueType::String]);
    let string_int = registry.get(&[ValueType::String, ValueType::Integer]);

    assert!(!Arc::ptr_eq(&int_string, &string_int));
    assert_eq!(int_string.signature(), "integer:string");
    assert_eq!(string_int.signature(), "string:integer");
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_signatures_are_type_sensitive() {
    let registry = SchemaRegistry::new();

    let integer = registry.get(&[ValueType::Integer]);
    let float = registry.get(&[ValueType::Float]);

    assert!(!Arc::ptr_eq(&integer, &float));
}

#[test]
fn test_array_signatures_carry_element_types() {
    let registry = SchemaRegistry::new();

    let schema = registry.get(&[ValueType::Array(Box::new(ValueType::String))]);

    assert_eq!(schema.signature(), "array(string)");
}

#[test]
fn test_zero_field_schema_is_valid() {
    let registry = SchemaRegistry::new();

    let schema = registry.get(&[]);

    assert_eq!(schema.arity(), 0);
    assert_eq!(schema.signature(), "");

    let record = Record::new(schema, vec![]);
    assert!(record.fields().is_empty());
}

#[test]
fn test_registry_lookup_is_thread_safe() {
    let registry = Arc::new(SchemaRegistry::new());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            thread::spawn(move || registry.get(&[ValueType::String, ValueType::Integer]))
        })
        .collect();

    let schemas: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // No duplicate synthesis: every thread got the same object
    assert_eq!(registry.len(), 1);
    for schema in &schemas[1..] {
        assert!(Arc::ptr_eq(&schemas[0], schema));
    }
}

// ============================================================================
// Records
// ============================================================================

#[test]
fn test_record_fields_are_indexed_in_discovery_order() {
    let registry = SchemaRegistry::new();
    let schema = registry.get(&[ValueType::String, ValueType::Integer]);

    let record = Record::new(
        schema,
        vec![Value::String("Aaronson".to_string()), Value::Integer(42)],
    );

    assert_eq!(record.field(0), &Value::String("Aaronson".to_string()));
    assert_eq!(record.field(1), &Value::Integer(42));
}

#[test]
#[should_panic(expected = "arity")]
fn test_record_arity_mismatch_panics() {
    let registry = SchemaRegistry::new();
    let schema = registry.get(&[ValueType::String, ValueType::Integer]);

    Record::new(schema, vec![Value::String("lonely".to_string())]);
}
