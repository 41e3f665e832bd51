use crate::ast::Expr;

/// Pass-local tags attached to nodes during one transformation walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The node is the designated terminal projection call
    TerminalProjection,
    /// The node is the designated projection's lambda; descendants are
    /// inside the terminal projection's body and subject to classification
    ProjectionBody,
    /// The node was approved for delegation to the provider
    SourceExpression,
}

/// A borrowed node decorated with classification tags.
///
/// Created when the walker first visits the node, discarded when the pass
/// completes. The underlying tree is never mutated; tags live here.
#[derive(Debug)]
pub struct ClassifiedNode<'a> {
    expr: &'a Expr,
    classifications: Vec<Classification>,
}

impl<'a> ClassifiedNode<'a> {
    pub fn new(expr: &'a Expr) -> ClassifiedNode<'a> {
        ClassifiedNode {
            expr,
            classifications: Vec::new(),
        }
    }

    pub fn expr(&self) -> &'a Expr {
        self.expr
    }

    /// Tags the node with a classification. Tags are append-only.
    pub fn add(&mut self, classification: Classification) {
        self.classifications.push(classification);
    }

    /// Returns true if the node carries the given classification.
    pub fn has(&self, classification: Classification) -> bool {
        self.classifications.contains(&classification)
    }
}

/// The chain from the tree root to the node currently being visited.
///
/// Pushed and popped as the walker descends and ascends; never persisted
/// past one traversal.
#[derive(Debug, Default)]
pub struct NodePath<'a> {
    nodes: Vec<ClassifiedNode<'a>>,
}

impl<'a> NodePath<'a> {
    pub fn new() -> NodePath<'a> {
        NodePath { nodes: Vec::new() }
    }

    pub fn push(&mut self, expr: &'a Expr) {
        self.nodes.push(ClassifiedNode::new(expr));
    }

    pub fn pop(&mut self) {
        self.nodes.pop();
    }

    /// Number of nodes on the path, the current node included.
    pub fn depth(&self) -> usize {
        self.nodes.len()
    }

    /// The node under judgement.
    pub fn current(&self) -> Option<&ClassifiedNode<'a>> {
        self.nodes.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut ClassifiedNode<'a>> {
        self.nodes.last_mut()
    }

    /// The current node's immediate ancestor.
    pub fn parent(&self) -> Option<&ClassifiedNode<'a>> {
        let len = self.nodes.len();
        if len >= 2 { self.nodes.get(len - 2) } else { None }
    }

    /// Returns true if any strict ancestor of the current node carries the
    /// given classification. Does not check the current node itself.
    pub fn ancestor_has(&self, classification: Classification) -> bool {
        self.nodes
            .iter()
            .rev()
            .skip(1)
            .any(|node| node.has(classification))
    }
}
