//! # Query expression trees
//!
//! This module defines the abstract syntax tree for queries handed to the
//! defer engine. A query is an immutable expression tree ending in a single
//! terminal projection (`Select`); the transformer rewrites that tree into a
//! reduced projection for the provider plus a locally-evaluated
//! reconstruction, without ever mutating the source nodes.
//!
//! ## Architecture Overview
//!
//! The AST module is organized into focused submodules:
//!
//! - **[expressions]** - Expression nodes (constants, parameters, access,
//!   operations, query operators)
//! - **[operators]** - Binary operators (comparison, arithmetic, logical,
//!   array indexing)
//! - **[param]** - Declared lambda parameters and placeholders
//!
//! ## Core Concepts
//!
//! ### Query shape
//!
//! Every query starts at the provider's root collection and chains operators,
//! ending in the terminal projection:
//!
//! ```text
//! Source | Where(person => ...) | Select(person => ...)
//! ```
//!
//! ### Building trees
//!
//! Trees are built programmatically with the fluent helpers on [`Expr`]:
//!
//! ```
//! use query_defer::{Expr, Param, ValueType};
//!
//! let person = Param::new("person", ValueType::Object);
//! let query = Expr::Source.select(
//!     person.clone(),
//!     person.to_expr().field("first_name", ValueType::String),
//! );
//! assert!(matches!(query, Expr::Select { .. }));
//! ```
//!
//! ### Rewriting
//!
//! Nodes are never mutated in place. The transformer walks a borrowed tree
//! and produces new nodes, substituting placeholder parameters for the
//! sub-expressions it hands to the provider.
pub mod expressions;
pub mod operators;
pub mod param;

pub use expressions::Expr;
pub use operators::BinOp;
pub use param::Param;
