//! Intermediate record schemas and their process-lifetime registry.
//!
//! Each transformation pass synthesizes a flat, tuple-like record shape with
//! one field per delegated sub-expression, in discovery order. Shapes are
//! interned: two passes whose ordered field-type signatures are equal share
//! the same schema object, so records from different queries with the same
//! shape are interchangeable.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::value::{Value, ValueType};

/// A synthesized record shape: ordered field types plus a registry-assigned id.
///
/// Field order is the discovery order of the delegated sub-expressions.
/// Schema ids are an internal detail of the registry that issued them and
/// must not be relied on by callers.
#[derive(Debug, PartialEq, Eq)]
pub struct RecordSchema {
    id: usize,
    field_types: Vec<ValueType>,
}

impl RecordSchema {
    fn new(id: usize, field_types: Vec<ValueType>) -> RecordSchema {
        RecordSchema { id, field_types }
    }

    /// Number of fields.
    pub fn arity(&self) -> usize {
        self.field_types.len()
    }

    /// Field types, in discovery order.
    pub fn field_types(&self) -> &[ValueType] {
        &self.field_types
    }

    /// The ordered, type-qualified signature this schema is cached under,
    /// e.g. `"string:integer"`.
    pub fn signature(&self) -> String {
        signature_of(&self.field_types)
    }
}

/// One intermediate record: a schema and its field values in discovery order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<RecordSchema>,
    fields: Vec<Value>,
}

impl Record {
    /// Packs field values into a record.
    ///
    /// The number of values must match the schema's arity; a mismatch is a
    /// programming-contract violation.
    pub fn new(schema: Arc<RecordSchema>, fields: Vec<Value>) -> Record {
        assert_eq!(
            schema.arity(),
            fields.len(),
            "record field count does not match schema arity"
        );
        Record { schema, fields }
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    /// Field value by discovery index.
    pub fn field(&self, index: usize) -> &Value {
        &self.fields[index]
    }

    /// All field values, in discovery order.
    pub fn fields(&self) -> &[Value] {
        &self.fields
    }
}

/// Lookup-or-create cache of record schemas.
///
/// Keyed by the exact ordered field-type signature; `(integer, string)` and
/// `(string, integer)` are distinct entries. One coarse lock guards the whole
/// lookup-or-create so concurrent passes never synthesize duplicates. Entries
/// are never evicted; the registry lives as long as the pipeline that owns
/// it, shared by reference.
pub struct SchemaRegistry {
    cache: Mutex<HashMap<String, Arc<RecordSchema>>>,
}

impl SchemaRegistry {
    pub fn new() -> SchemaRegistry {
        SchemaRegistry {
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Gets or creates the schema with the given ordered field types.
    ///
    /// Equal signatures always resolve to the same schema object.
    pub fn get(&self, field_types: &[ValueType]) -> Arc<RecordSchema> {
        let key = signature_of(field_types);
        let mut cache = self.cache.lock().expect("schema registry lock poisoned");

        if let Some(existing) = cache.get(&key) {
            return existing.clone();
        }

        let schema = Arc::new(RecordSchema::new(cache.len(), field_types.to_vec()));
        cache.insert(key, schema.clone());
        schema
    }

    /// Number of schemas synthesized so far.
    pub fn len(&self) -> usize {
        self.cache.lock().expect("schema registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        SchemaRegistry::new()
    }
}

fn signature_of(field_types: &[ValueType]) -> String {
    field_types
        .iter()
        .map(ValueType::signature)
        .collect::<Vec<_>>()
        .join(":")
}
