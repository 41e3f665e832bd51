//! Expression classification.
//!
//! The transformer delegates the delegate-or-defer decision to an
//! [`ExpressionAnalyser`]: the single extension point a data-access backend
//! implements to describe its capability set. The analyser judges each node
//! together with its ancestry ([`NodePath`]) and approves the node either in
//! its entirety or not at all; rejected nodes are descended into and their
//! children judged independently.
//!
//! [`data_access::DataAccessOnlyAnalyser`] is the reference implementation,
//! approving only plain data retrieval from the source item.
pub mod data_access;
pub mod path;

pub use data_access::DataAccessOnlyAnalyser;
pub use path::{Classification, ClassifiedNode, NodePath};

use crate::ast::Param;

/// Decides which expressions are handed to the underlying provider and which
/// are deferred for local post-processing.
///
/// A fresh analyser is created per transformation pass via the configured
/// factory; implementations may memoize per node within a pass but must not
/// carry state across passes.
pub trait ExpressionAnalyser {
    /// Supplies the source-item parameter of the terminal projection - the
    /// object whose data the provider retrieves.
    ///
    /// Called exactly once per pass, before any classification query.
    /// Calling it a second time without a fresh pass is a contract violation.
    fn initialise(&mut self, source_parameter: &Param);

    /// Returns true if the node at the head of the path should be handed to
    /// the provider in its entirety.
    ///
    /// If the node has children, the transformer will ask again per child
    /// when this returns false, so partial delegation happens naturally.
    fn should_delegate(&mut self, path: &NodePath<'_>) -> bool;
}
