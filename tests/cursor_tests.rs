use std::rc::Rc;
use std::sync::Arc;

use query_defer::transform::PostProcessFn;
use query_defer::{
    CursorState, DeferError, EvalError, PostProcessCursor, Record, RecordSchema, SchemaRegistry,
    Value, ValueType, VecRecordSource,
};

fn string_schema() -> Arc<RecordSchema> {
    SchemaRegistry::new().get(&[ValueType::String])
}

fn records(values: &[&str]) -> Vec<Record> {
    let schema = string_schema();
    values
        .iter()
        .map(|v| Record::new(schema.clone(), vec![Value::String(v.to_string())]))
        .collect()
}

/// Uppercases the single field, failing on the value "bad".
fn uppercase_post_process() -> PostProcessFn {
    Rc::new(|record: &Record| match record.field(0) {
        Value::String(s) if s == "bad" => {
            Err(EvalError::TypeError("cannot process 'bad'".to_string()))
        }
        Value::String(s) => Ok(Value::String(s.to_uppercase())),
        other => Err(EvalError::TypeError(format!("unexpected field {:?}", other))),
    })
}

fn cursor_over(values: &[&str]) -> PostProcessCursor {
    PostProcessCursor::new(
        Box::new(VecRecordSource::new(records(values))),
        uppercase_post_process(),
    )
}

fn drain(cursor: &mut PostProcessCursor) -> Vec<Value> {
    let mut out = Vec::new();
    while cursor.advance().unwrap() {
        out.push(cursor.current().unwrap().clone());
    }
    out
}

// ============================================================================
// Basic enumeration
// ============================================================================

#[test]
fn test_basic_post_processing() {
    let mut cursor = cursor_over(&["Aaron", "Billy"]);

    let results = drain(&mut cursor);

    assert_eq!(
        results,
        vec![
            Value::String("AARON".to_string()),
            Value::String("BILLY".to_string()),
        ]
    );
    assert_eq!(cursor.state(), CursorState::Ended);
}

#[test]
fn test_state_transitions() {
    let mut cursor = cursor_over(&["Aaron"]);
    assert_eq!(cursor.state(), CursorState::NotStarted);

    assert!(cursor.advance().unwrap());
    assert_eq!(cursor.state(), CursorState::Active);

    assert!(!cursor.advance().unwrap());
    assert_eq!(cursor.state(), CursorState::Ended);

    cursor.reset().unwrap();
    assert_eq!(cursor.state(), CursorState::NotStarted);
}

#[test]
fn test_empty_source_ends_immediately() {
    let mut cursor = cursor_over(&[]);

    assert!(!cursor.advance().unwrap());
    assert_eq!(cursor.state(), CursorState::Ended);
}

// ============================================================================
// Current access rules
// ============================================================================

#[test]
fn test_current_before_advance_fails() {
    let cursor = cursor_over(&["Aaron"]);

    let err = cursor.current().unwrap_err();
    assert!(matches!(err, DeferError::InvalidState(_)));
}

#[test]
fn test_current_after_end_fails() {
    let mut cursor = cursor_over(&["Aaron"]);
    while cursor.advance().unwrap() {}

    let err = cursor.current().unwrap_err();
    assert!(matches!(err, DeferError::InvalidState(_)));
}

// ============================================================================
// Reset
// ============================================================================

#[test]
fn test_reset_replays_from_start() {
    let mut cursor = cursor_over(&["Aaron", "Billy"]);

    cursor.advance().unwrap();
    cursor.reset().unwrap();

    let results = drain(&mut cursor);
    assert_eq!(
        results,
        vec![
            Value::String("AARON".to_string()),
            Value::String("BILLY".to_string()),
        ]
    );
}

#[test]
fn test_reset_after_exhaustion_replays_everything() {
    let mut cursor = cursor_over(&["Aaron", "Billy"]);

    let first_pass = drain(&mut cursor);
    cursor.reset().unwrap();
    let second_pass = drain(&mut cursor);

    assert_eq!(first_pass, second_pass);
}

// ============================================================================
// Failure handling
// ============================================================================

#[test]
fn test_post_process_failure_wraps_the_cause() {
    let mut cursor = cursor_over(&["bad"]);

    let err = cursor.advance().unwrap_err();
    match err {
        DeferError::PostProcess { message, cause } => {
            // One stable error surface: the message carries the cause's own
            assert!(message.contains("cannot process 'bad'"));
            assert!(matches!(cause, EvalError::TypeError(_)));
        }
        other => panic!("expected a post-process failure, got {:?}", other),
    }
}

#[test]
fn test_failure_does_not_disturb_prior_or_later_records() {
    let mut cursor = cursor_over(&["Aaron", "bad", "Billy"]);

    assert!(cursor.advance().unwrap());
    assert_eq!(
        cursor.current().unwrap(),
        &Value::String("AARON".to_string())
    );

    assert!(cursor.advance().is_err());

    // The failed record is skipped on the next pull, not retried
    assert!(cursor.advance().unwrap());
    assert_eq!(
        cursor.current().unwrap(),
        &Value::String("BILLY".to_string())
    );
}

#[test]
fn test_release_is_idempotent() {
    let mut cursor = cursor_over(&["Aaron"]);

    cursor.release();
    cursor.release();
}
