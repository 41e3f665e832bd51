//! # query-defer
//!
//! Lets a query built against a data-access provider include projection
//! operations the provider cannot natively execute. Instead of failing, the
//! terminal projection is split in two: a reduced projection the provider
//! *can* run, retrieving exactly the data the computation needs as flat
//! intermediate records, and a reconstruction function applied locally to
//! each record as results are enumerated.
//!
//! Which sub-expressions are delegated is decided by a pluggable
//! [`ExpressionAnalyser`]; the default [`DataAccessOnlyAnalyser`] delegates
//! plain data retrieval (the source item, fields of it, method calls and
//! indexes on it) and defers everything else.
//!
//! ## Quick Start
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use query_defer::{execute_deferred, Expr, MemoryProvider, Param, Value, ValueType};
//!
//! let mut row = HashMap::new();
//! row.insert("first_name".to_string(), Value::String("Aaron".to_string()));
//! row.insert("last_name".to_string(), Value::String("Aaronson".to_string()));
//!
//! // format() and upper() are not data access, so the provider is asked for
//! // the two raw fields and the formatting happens locally per record.
//! let person = Param::new("person", ValueType::Object);
//! let projection = Expr::invoke(
//!     "format",
//!     vec![
//!         Expr::constant(Value::String("{0}, {1}".to_string())),
//!         Expr::invoke(
//!             "upper",
//!             vec![person.to_expr().field("last_name", ValueType::String)],
//!         ),
//!         person.to_expr().field("first_name", ValueType::String),
//!     ],
//! );
//! let query = Expr::Source.select(person.clone(), projection);
//!
//! let provider = Arc::new(MemoryProvider::new(vec![Value::Object(row)]));
//! let results = execute_deferred(provider, query, None).unwrap();
//!
//! assert_eq!(results, vec![Value::String("AARONSON, Aaron".to_string())]);
//! ```
pub mod analyser;
pub mod ast;
#[cfg(feature = "cli")]
pub mod cli;
pub mod cursor;
pub mod error;
pub mod evaluator;
pub mod output;
pub mod pipeline;
pub mod provider;
pub mod schema;
pub mod transform;
pub mod value;

pub use analyser::{Classification, DataAccessOnlyAnalyser, ExpressionAnalyser, NodePath};
pub use ast::{BinOp, Expr, Param};
pub use cursor::{CursorState, PostProcessCursor, RecordSource, VecRecordSource};
pub use error::DeferError;
pub use evaluator::{Bindings, EvalError};
pub use pipeline::{execute_deferred, wrap, DeferConfig, WrappedQuery};
pub use provider::{MemoryProvider, QueryProvider};
pub use schema::{Record, RecordSchema, SchemaRegistry};
pub use transform::{transform, MappedSourceExpression, PostProcessFn, Transformation};
pub use value::{Value, ValueType};
