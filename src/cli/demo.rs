//! The formatted-name demo: a projection the provider cannot execute,
//! split so that only the raw name fields are retrieved.

use std::sync::Arc;

use crate::analyser::DataAccessOnlyAnalyser;
use crate::ast::{Expr, Param};
use crate::cli::CliError;
use crate::output::{from_json, to_json};
use crate::pipeline::execute_deferred;
use crate::provider::MemoryProvider;
use crate::schema::SchemaRegistry;
use crate::transform::transform;
use crate::value::{Value, ValueType};

/// Options for the demo run.
pub struct DemoOptions {
    /// JSON input: an array of objects with `first_name` and `last_name`
    pub input: Option<String>,
}

/// Outcome of the demo run.
pub struct DemoReport {
    /// The field-type signature the provider was asked to retrieve
    pub requested_fields: String,

    /// The post-processed projection results
    pub results: Vec<serde_json::Value>,
}

/// Builds the demo query over the given parameter:
/// `format("{0}, {1}", upper(person.last_name), person.first_name)`.
///
/// `format` and `upper` are free functions the provider cannot evaluate, so
/// the engine retrieves the two raw fields and formats locally.
fn formatted_name_projection(person: &Param) -> Expr {
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

/// Runs the demo query against the supplied rows.
pub fn run_demo(options: &DemoOptions) -> Result<DemoReport, CliError> {
    let input = options.input.as_ref().ok_or(CliError::NoInput)?;

    let parsed: serde_json::Value = serde_json::from_str(input)?;
    let rows = match from_json(parsed) {
        Value::Array(rows) => rows,
        _ => return Err(CliError::NotAnArray),
    };

    let person = Param::new("person", ValueType::Object);
    let query = Expr::Source.select(person.clone(), formatted_name_projection(&person));

    // Transform once up front to report what the provider will be asked for
    let registry = SchemaRegistry::new();
    let transformation = transform(&query, &registry, &|| {
        Box::new(DataAccessOnlyAnalyser::new())
    })?;
    let requested_fields = transformation.schema.signature();

    let provider = Arc::new(MemoryProvider::new(rows));
    let results = execute_deferred(provider, query, None)?;

    Ok(DemoReport {
        requested_fields,
        results: results.into_iter().map(to_json).collect(),
    })
}
