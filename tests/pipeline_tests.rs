use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use query_defer::analyser::{ExpressionAnalyser, NodePath};
use query_defer::cursor::RecordSource;
use query_defer::evaluator::{self, Bindings};
use query_defer::{
    execute_deferred, wrap, BinOp, DeferConfig, DeferError, Expr, MemoryProvider, Param,
    QueryProvider, RecordSchema, SchemaRegistry, Value, ValueType,
};

// ============================================================================
// Test data and helpers
// ============================================================================

fn person_row(first: &str, last: &str, age: i64) -> Value {
    let mut row = HashMap::new();
    row.insert(
        "first_name".to_string(),
        Value::String(first.to_string()),
    );
    row.insert("last_name".to_string(), Value::String(last.to_string()));
    row.insert("age".to_string(), Value::Integer(age));
    Value::Object(row)
}

fn sample_people() -> Vec<Value> {
    vec![
        person_row("Aaron", "Aaronson", 41),
        person_row("Billy", "Bookcase", 17),
        person_row("Claire", "Cheswick", 28),
        person_row("Dahlia", "Deville", 16),
    ]
}

fn person() -> Param {
    Param::new("person", ValueType::Object)
}

/// `format("{0}, {1}", upper(person.last_name), person.first_name)`
fn formatted_name(person: &Param) -> Expr {
    Expr::invoke(
        "format",
        vec![
            Expr::constant(Value::String("{0}, {1}".to_string())),
            Expr::invoke(
                "upper",
                vec![person.to_expr().field("last_name", ValueType::String)],
            ),
            person.to_expr().field("first_name", ValueType::String),
        ],
    )
}

fn memory_provider() -> Arc<MemoryProvider> {
    Arc::new(MemoryProvider::new(sample_people()))
}

/// Provider proxy recording the record signatures it is asked to retrieve.
struct RecordingProvider {
    inner: MemoryProvider,
    requested: Mutex<Vec<String>>,
}

impl RecordingProvider {
    fn new(rows: Vec<Value>) -> RecordingProvider {
        RecordingProvider {
            inner: MemoryProvider::new(rows),
            requested: Mutex::new(Vec::new()),
        }
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl QueryProvider for RecordingProvider {
    fn execute(
        &self,
        expression: &Expr,
        schema: &Arc<RecordSchema>,
    ) -> Result<Box<dyn RecordSource>, DeferError> {
        self.requested.lock().unwrap().push(schema.signature());
        self.inner.execute(expression, schema)
    }
}

/// An analyser that approves nothing: everything is deferred.
struct RejectingAnalyser;

impl ExpressionAnalyser for RejectingAnalyser {
    fn initialise(&mut self, _source_parameter: &Param) {}

    fn should_delegate(&mut self, _path: &NodePath<'_>) -> bool {
        false
    }
}

fn rejecting_config() -> DeferConfig {
    DeferConfig::new(|| Box::new(RejectingAnalyser))
}

// ============================================================================
// Round-trip equivalence
// ============================================================================

#[test]
fn test_formatted_name_round_trip() {
    let p = person();
    let query = Expr::Source.select(p.clone(), formatted_name(&p));

    let results = execute_deferred(memory_provider(), query, None).unwrap();

    assert_eq!(
        results,
        vec![
            Value::String("AARONSON, Aaron".to_string()),
            Value::String("BOOKCASE, Billy".to_string()),
            Value::String("CHESWICK, Claire".to_string()),
            Value::String("DEVILLE, Dahlia".to_string()),
        ]
    );
}

#[test]
fn test_round_trip_matches_direct_evaluation() {
    let p = person();
    let projection = formatted_name(&p);
    let query = Expr::Source.select(p.clone(), projection.clone());

    let deferred = execute_deferred(memory_provider(), query, None).unwrap();

    // Evaluate the original projection directly against each row
    let direct: Vec<Value> = sample_people()
        .into_iter()
        .map(|row| {
            let bindings = Bindings::new().with(p.name.clone(), row);
            evaluator::eval(&projection, &bindings).unwrap()
        })
        .collect();

    assert_eq!(deferred, direct);
}

#[test]
fn test_provider_is_asked_only_for_the_raw_fields() {
    let p = person();
    let query = Expr::Source.select(p.clone(), formatted_name(&p));

    let provider = Arc::new(RecordingProvider::new(sample_people()));
    let results = execute_deferred(provider.clone(), query, None).unwrap();

    assert_eq!(results.len(), 4);
    // Two raw string fields, nothing else
    assert_eq!(provider.requested(), vec!["string:string".to_string()]);
}

// ============================================================================
// Classification variants
// ============================================================================

#[test]
fn test_rejecting_analyser_requests_nothing() {
    let p = person();
    let query = Expr::Source.select(p, Expr::constant(Value::String("fixed".to_string())));

    let provider = Arc::new(RecordingProvider::new(sample_people()));
    let results = execute_deferred(provider.clone(), query, Some(rejecting_config())).unwrap();

    // Zero-field records from the provider; the literal result is recomputed
    // per item during post-processing
    assert_eq!(provider.requested(), vec!["".to_string()]);
    assert_eq!(
        results,
        vec![Value::String("fixed".to_string()); 4]
    );
}

#[test]
fn test_zero_arity_round_trip_with_default_analyser() {
    let p = person();
    let query = Expr::Source.select(
        p,
        Expr::binary(
            BinOp::Add,
            Expr::constant(Value::Integer(40)),
            Expr::constant(Value::Integer(2)),
        ),
    );

    let results = execute_deferred(memory_provider(), query, None).unwrap();

    assert_eq!(results, vec![Value::Integer(42); 4]);
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn test_filter_composed_before_projection() {
    let p = person();
    let adults = Expr::binary(
        BinOp::GreaterEqual,
        p.to_expr().field("age", ValueType::Integer),
        Expr::constant(Value::Integer(18)),
    );
    let query = Expr::Source
        .filter(p.clone(), adults)
        .select(p.clone(), formatted_name(&p));

    let results = execute_deferred(memory_provider(), query, None).unwrap();

    assert_eq!(
        results,
        vec![
            Value::String("AARONSON, Aaron".to_string()),
            Value::String("CHESWICK, Claire".to_string()),
        ]
    );
}

#[test]
fn test_wrapped_query_composes_operators() {
    let p = person();
    let adults = Expr::binary(
        BinOp::GreaterEqual,
        p.to_expr().field("age", ValueType::Integer),
        Expr::constant(Value::Integer(18)),
    );

    let base = wrap(memory_provider(), Expr::Source, DeferConfig::default());
    let query = base
        .filter(p.clone(), adults)
        .select(p.clone(), formatted_name(&p));

    let mut cursor = query.iter().unwrap();
    let mut results = Vec::new();
    while cursor.advance().unwrap() {
        results.push(cursor.current().unwrap().clone());
    }

    assert_eq!(
        results,
        vec![
            Value::String("AARONSON, Aaron".to_string()),
            Value::String("CHESWICK, Claire".to_string()),
        ]
    );
}

// ============================================================================
// Scalar execution
// ============================================================================

#[test]
fn test_scalar_count_is_unsupported() {
    let p = person();
    let query = Expr::Source.select(p.clone(), formatted_name(&p));

    let wrapped = wrap(memory_provider(), query, DeferConfig::default());
    let err = wrapped.count().unwrap_err();

    assert!(matches!(err, DeferError::Unsupported(_)));
}

// ============================================================================
// Schema sharing
// ============================================================================

#[test]
fn test_equal_signatures_share_schemas_across_queries() {
    let registry = Arc::new(SchemaRegistry::new());
    let p = person();

    let first = wrap(
        memory_provider(),
        Expr::Source.select(p.clone(), formatted_name(&p)),
        DeferConfig::default(),
    )
    .with_registry(registry.clone());

    let second = wrap(
        memory_provider(),
        Expr::Source.select(
            p.clone(),
            Expr::invoke(
                "concat",
                vec![
                    p.to_expr().field("first_name", ValueType::String),
                    p.to_expr().field("last_name", ValueType::String),
                ],
            ),
        ),
        DeferConfig::default(),
    )
    .with_registry(registry.clone());

    let mut c1 = first.iter().unwrap();
    while c1.advance().unwrap() {}
    let mut c2 = second.iter().unwrap();
    while c2.advance().unwrap() {}

    // Both projections mapped two string fields; one schema serves both
    assert_eq!(registry.len(), 1);
}

// ============================================================================
// Failures at the pull point
// ============================================================================

#[test]
fn test_post_process_failure_surfaces_on_advance() {
    // upper() requires a string; the failure happens during local
    // reconstruction, per record
    let p = person();
    let query = Expr::Source.select(
        p,
        Expr::invoke("upper", vec![Expr::constant(Value::Integer(3))]),
    );

    let wrapped = wrap(memory_provider(), query, DeferConfig::default());
    let mut cursor = wrapped.iter().unwrap();

    let err = cursor.advance().unwrap_err();
    assert!(matches!(err, DeferError::PostProcess { .. }));
}

#[test]
fn test_bare_parameter_projection_fails_during_post_processing() {
    // The projection body is exactly the lambda's own parameter, which the
    // hard exclusion rule keeps out of delegation; nothing binds it later
    let p = person();
    let query = Expr::Source.select(p.clone(), p.to_expr());

    let wrapped = wrap(memory_provider(), query, DeferConfig::default());
    let mut cursor = wrapped.iter().unwrap();

    let err = cursor.advance().unwrap_err();
    match err {
        DeferError::PostProcess { cause, .. } => {
            assert!(matches!(
                cause,
                query_defer::EvalError::UnboundParameter(_)
            ));
        }
        other => panic!("expected a post-process failure, got {:?}", other),
    }
}
