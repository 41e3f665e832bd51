//! The tree transformer: splits a terminal projection into a reduced
//! projection for the provider and a local reconstruction.
//!
//! The walker visits the query expression depth-first in pre-order,
//! maintaining a [`NodePath`] of classified ancestors. Under the designated
//! terminal projection, every node is offered to the analyser; approved
//! nodes are registered as mapped source expressions and replaced with
//! placeholder parameters, so the surviving tree is exactly the
//! reconstruction the post-process phase evaluates.

use std::rc::Rc;
use std::sync::Arc;

use crate::analyser::{Classification, ExpressionAnalyser, NodePath};
use crate::ast::{Expr, Param};
use crate::error::DeferError;
use crate::evaluator::{self, Bindings, EvalError};
use crate::schema::{Record, RecordSchema, SchemaRegistry};
use crate::value::{Value, ValueType};

/// Executable reconstruction function applied to each intermediate record.
pub type PostProcessFn = Rc<dyn Fn(&Record) -> Result<Value, EvalError>>;

/// A sub-expression approved for provider evaluation.
///
/// Holds the expression's static value type, the undisturbed sub-tree the
/// provider evaluates, and the placeholder parameter that replaces it in the
/// reconstruction lambda. Identity is the position in the discovery-ordered
/// list on [`Transformation`].
#[derive(Debug, Clone, PartialEq)]
pub struct MappedSourceExpression {
    /// Static value type of the delegated expression
    pub ty: ValueType,

    /// The expression to be passed to the provider
    pub source: Expr,

    /// The parameter used in place of the expression in the reconstruction
    pub placeholder: Param,
}

/// Outcome of one transformation pass. Owned exclusively by the caller.
pub struct Transformation {
    /// The rewritten query expression, suitable for execution by the provider
    pub reduced_expression: Expr,

    /// Shape of the intermediate records the provider yields
    pub schema: Arc<RecordSchema>,

    /// The source-item parameter of the terminal projection
    pub source_parameter: Param,

    /// Delegated sub-expressions, in discovery order (pre-order, left-to-right)
    pub mapped_expressions: Vec<MappedSourceExpression>,

    /// The original projection lambda with placeholders where data was
    /// delegated, parameterised over those placeholders. Kept for inspection;
    /// [`post_process`](Transformation::post_process) is the executable form.
    pub reconstruction: Expr,

    post_process: PostProcessFn,
}

impl Transformation {
    /// Applies the reconstruction to one intermediate record, producing the
    /// originally requested projection result.
    pub fn post_process(&self, record: &Record) -> Result<Value, EvalError> {
        (self.post_process)(record)
    }

    /// The executable reconstruction function.
    pub fn post_process_fn(&self) -> PostProcessFn {
        self.post_process.clone()
    }
}

impl std::fmt::Debug for Transformation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transformation")
            .field("reduced_expression", &self.reduced_expression)
            .field("schema", &self.schema)
            .field("source_parameter", &self.source_parameter)
            .field("mapped_expressions", &self.mapped_expressions)
            .field("reconstruction", &self.reconstruction)
            .finish_non_exhaustive()
    }
}

/// Analyses the query expression and splits its terminal projection.
///
/// The expression must end in exactly one terminal projection; anything
/// composed after it fails with [`DeferError::Structural`]. A fresh analyser
/// is obtained from the factory for this pass.
pub fn transform(
    expression: &Expr,
    registry: &SchemaRegistry,
    analyser_factory: &dyn Fn() -> Box<dyn ExpressionAnalyser>,
) -> Result<Transformation, DeferError> {
    let mut transformer = Transformer {
        path: NodePath::new(),
        analyser: analyser_factory(),
        registry,
        mapped: Vec::new(),
        outcome: None,
    };

    let reduced_expression = transformer.visit(expression)?;

    let outcome = transformer.outcome.ok_or_else(|| {
        DeferError::Structural("query does not end in a terminal projection".to_string())
    })?;

    Ok(Transformation {
        reduced_expression,
        schema: outcome.schema,
        source_parameter: outcome.source_parameter,
        mapped_expressions: transformer.mapped,
        reconstruction: outcome.reconstruction,
        post_process: outcome.post_process,
    })
}

/// Filled in by the designated terminal projection during the walk.
struct SelectOutcome {
    source_parameter: Param,
    schema: Arc<RecordSchema>,
    reconstruction: Expr,
    post_process: PostProcessFn,
}

struct Transformer<'a> {
    path: NodePath<'a>,
    analyser: Box<dyn ExpressionAnalyser>,
    registry: &'a SchemaRegistry,
    mapped: Vec<MappedSourceExpression>,
    outcome: Option<SelectOutcome>,
}

impl<'a> Transformer<'a> {
    fn visit(&mut self, node: &'a Expr) -> Result<Expr, DeferError> {
        // Push/visit/pop kept together so the pop also happens when the
        // visit fails partway down.
        self.path.push(node);
        let result = self.visit_node(node);
        self.path.pop();
        result
    }

    fn visit_node(&mut self, node: &'a Expr) -> Result<Expr, DeferError> {
        // Inside the designated projection's body, offer the node to the
        // analyser; an approved node is replaced wholesale, no descent.
        if self.path.ancestor_has(Classification::ProjectionBody) && self.should_delegate(node) {
            return Ok(self.register_source_expression(node));
        }

        match node {
            Expr::Select { source, projection }
                if !self.path.ancestor_has(Classification::TerminalProjection) =>
            {
                if self.path.depth() != 1 {
                    return Err(DeferError::Structural(
                        "the terminal projection must be the final operation of the query"
                            .to_string(),
                    ));
                }
                self.transform_terminal_select(source, projection)
            }
            _ => self.rebuild(node),
        }
    }

    /// Visits the designated projection's lambda, tagging it so descendants
    /// know they are inside the terminal projection's body. Only there does
    /// classification apply; operators on the source side of the projection
    /// keep their own lambdas untouched.
    fn visit_designated_projection(&mut self, projection: &'a Expr) -> Result<Expr, DeferError> {
        self.path.push(projection);
        if let Some(current) = self.path.current_mut() {
            current.add(Classification::ProjectionBody);
        }
        let result = self.visit_node(projection);
        self.path.pop();
        result
    }

    fn should_delegate(&mut self, node: &'a Expr) -> bool {
        // A lambda's own parameter is never collapsed into a placeholder at
        // the occurrence directly under that lambda; it is passed through
        // for further visitation.
        if let Some(parent) = self.path.parent()
            && let (Expr::Parameter(param), Expr::Lambda { params, .. }) = (node, parent.expr())
            && params.contains(param)
        {
            return false;
        }

        self.analyser.should_delegate(&self.path)
    }

    fn register_source_expression(&mut self, node: &'a Expr) -> Expr {
        if let Some(current) = self.path.current_mut() {
            current.add(Classification::SourceExpression);
        }

        let index = self.mapped.len();
        let ty = node.value_type();
        let placeholder = Param::new(format!("source_expr_{}", index), ty.clone());

        self.mapped.push(MappedSourceExpression {
            ty,
            source: node.clone(),
            placeholder: placeholder.clone(),
        });

        Expr::Parameter(placeholder)
    }

    fn transform_terminal_select(
        &mut self,
        source: &'a Expr,
        projection: &'a Expr,
    ) -> Result<Expr, DeferError> {
        let current = self
            .path
            .current_mut()
            .expect("terminal projection visited with an empty path");
        current.add(Classification::TerminalProjection);

        let source_parameter = match projection {
            Expr::Lambda { params, body: _ } if params.len() == 1 => params[0].clone(),
            Expr::Lambda { .. } => {
                return Err(DeferError::Structural(
                    "terminal projection lambda must declare exactly one parameter".to_string(),
                ));
            }
            _ => {
                return Err(DeferError::Structural(
                    "terminal projection must be a lambda".to_string(),
                ));
            }
        };

        self.analyser.initialise(&source_parameter);

        // Walk both children; the projection body collects the mapped source
        // expressions and comes back with placeholders substituted.
        let reduced_source = self.visit(source)?;
        let transformed_projection = self.visit_designated_projection(projection)?;
        let reconstructed_body = match transformed_projection {
            Expr::Lambda { body, .. } => body,
            _ => unreachable!("visiting a lambda must produce a lambda"),
        };

        // The reconstruction: the original projection body over the ordered
        // placeholders, not yet wired to real values.
        let placeholders: Vec<Param> = self.mapped.iter().map(|m| m.placeholder.clone()).collect();
        let reconstruction = Expr::Lambda {
            params: placeholders,
            body: reconstructed_body,
        };

        // One record field per mapped expression, in discovery order.
        let field_types: Vec<ValueType> = self.mapped.iter().map(|m| m.ty.clone()).collect();
        let schema = self.registry.get(&field_types);

        // The reduced projection packs the undisturbed source expressions
        // into a record; this is what the provider evaluates.
        let record_fields: Vec<Expr> = self.mapped.iter().map(|m| m.source.clone()).collect();
        let reduced_projection = Expr::Lambda {
            params: vec![source_parameter.clone()],
            body: Box::new(Expr::NewRecord {
                schema: schema.clone(),
                fields: record_fields,
            }),
        };

        let post_process = make_post_process(&reconstruction);

        self.outcome = Some(SelectOutcome {
            source_parameter,
            schema,
            reconstruction: reconstruction.clone(),
            post_process,
        });

        Ok(Expr::Select {
            source: Box::new(reduced_source),
            projection: Box::new(reduced_projection),
        })
    }

    fn rebuild(&mut self, node: &'a Expr) -> Result<Expr, DeferError> {
        Ok(match node {
            Expr::Constant(_) | Expr::Parameter(_) | Expr::Source => node.clone(),

            Expr::Field { object, name, ty } => Expr::Field {
                object: Box::new(self.visit(object)?),
                name: name.clone(),
                ty: ty.clone(),
            },

            Expr::Method {
                object,
                name,
                args,
                ty,
            } => Expr::Method {
                object: Box::new(self.visit(object)?),
                name: name.clone(),
                args: self.visit_all(args)?,
                ty: ty.clone(),
            },

            Expr::Invoke { function, args } => Expr::Invoke {
                function: function.clone(),
                args: self.visit_all(args)?,
            },

            Expr::Binary { op, left, right } => Expr::Binary {
                op: *op,
                left: Box::new(self.visit(left)?),
                right: Box::new(self.visit(right)?),
            },

            Expr::Convert { operand, ty } => Expr::Convert {
                operand: Box::new(self.visit(operand)?),
                ty: ty.clone(),
            },

            Expr::Lambda { params, body } => Expr::Lambda {
                params: params.clone(),
                body: Box::new(self.visit(body)?),
            },

            // A nested projection is an ordinary node; only the outermost
            // one is designated.
            Expr::Select { source, projection } => Expr::Select {
                source: Box::new(self.visit(source)?),
                projection: Box::new(self.visit(projection)?),
            },

            Expr::Where { source, predicate } => Expr::Where {
                source: Box::new(self.visit(source)?),
                predicate: Box::new(self.visit(predicate)?),
            },

            Expr::NewRecord { schema, fields } => Expr::NewRecord {
                schema: schema.clone(),
                fields: self.visit_all(fields)?,
            },
        })
    }

    fn visit_all(&mut self, nodes: &'a [Expr]) -> Result<Vec<Expr>, DeferError> {
        nodes.iter().map(|node| self.visit(node)).collect()
    }
}

/// Builds the executable post-process function: extract each record field in
/// discovery order, bind it to its placeholder, evaluate the reconstruction
/// body.
fn make_post_process(reconstruction: &Expr) -> PostProcessFn {
    let (params, body) = match reconstruction.clone() {
        Expr::Lambda { params, body } => (params, body),
        _ => unreachable!("reconstruction is always a lambda"),
    };

    Rc::new(move |record: &Record| {
        let mut bindings = Bindings::new();
        for (param, field) in params.iter().zip(record.fields()) {
            bindings.bind(param.name.clone(), field.clone());
        }
        evaluator::eval(&body, &bindings)
    })
}
