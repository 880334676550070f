use super::Visit;
use hcl::{
    template::{Directive, Element},
    Body, Expression, Identifier, ObjectKey, Operation, Structure, Template, Traversal,
    TraversalOperator,
};

/// Recursively visit all [hcl::Traversal]s that are rooted at a variable
///
/// A standalone variable (`foo`) is visited as a traversal without operators. Variables bound by a `for`
/// expression or directive are not visited inside of it.
pub trait VisitTraversals {
    fn visit_traversals(&self, visitor: &mut dyn Visit<Traversal>);
}

impl VisitTraversals for Body {
    fn visit_traversals(&self, visitor: &mut dyn Visit<Traversal>) {
        for structure in self.iter() {
            match structure {
                Structure::Attribute(attr) => attr.expr.visit_traversals(visitor),
                Structure::Block(block) => block.body.visit_traversals(visitor),
            }
        }
    }
}

impl VisitTraversals for Expression {
    fn visit_traversals(&self, visitor: &mut dyn Visit<Traversal>) {
        match self {
            Expression::Variable(variable) => {
                // a standalone variable is a traversal with no operators...kind of
                let traversal = Traversal::new(
                    Expression::Variable(variable.clone()),
                    Vec::<TraversalOperator>::new(),
                );
                visitor.visit(&traversal);
            }
            Expression::Traversal(traversal) => {
                if let Expression::Variable(_) = &traversal.expr {
                    visitor.visit(traversal);
                } else {
                    // e.g. `func().attr` or `[a, b][0]`
                    traversal.expr.visit_traversals(visitor);
                }

                for operator in &traversal.operators {
                    if let TraversalOperator::Index(index) = operator {
                        index.visit_traversals(visitor);
                    }
                }
            }
            Expression::Array(array) => {
                for expr in array {
                    expr.visit_traversals(visitor);
                }
            }
            Expression::Object(object) => {
                for (key, value) in object.iter() {
                    if let ObjectKey::Expression(key) = key {
                        key.visit_traversals(visitor);
                    }
                    value.visit_traversals(visitor);
                }
            }
            Expression::TemplateExpr(template_expr) => match Template::from_expr(template_expr) {
                Ok(template) => template.visit_traversals(visitor),
                Err(err) => {
                    // evaluation reports the broken template with a location
                    tracing::debug!(%err, "skipping unparsable template");
                }
            },
            Expression::FuncCall(func_call) => {
                for arg in &func_call.args {
                    arg.visit_traversals(visitor);
                }
            }
            Expression::Parenthesis(expr) => {
                expr.visit_traversals(visitor);
            }
            Expression::Conditional(cond) => {
                cond.cond_expr.visit_traversals(visitor);
                cond.true_expr.visit_traversals(visitor);
                cond.false_expr.visit_traversals(visitor);
            }
            Expression::Operation(operation) => match operation.as_ref() {
                Operation::Binary(binop) => {
                    binop.lhs_expr.visit_traversals(visitor);
                    binop.rhs_expr.visit_traversals(visitor);
                }
                Operation::Unary(unop) => {
                    unop.expr.visit_traversals(visitor);
                }
            },
            Expression::ForExpr(forexpr) => {
                // the collection is evaluated outside of the loop scope
                forexpr.collection_expr.visit_traversals(visitor);

                let mut scoped = Scoped::new(
                    visitor,
                    forexpr.key_var.as_ref(),
                    &forexpr.value_var,
                );
                forexpr
                    .key_expr
                    .iter()
                    .for_each(|e| e.visit_traversals(&mut scoped));
                forexpr.value_expr.visit_traversals(&mut scoped);
                forexpr
                    .cond_expr
                    .iter()
                    .for_each(|e| e.visit_traversals(&mut scoped));
            }
            _ => {}
        }
    }
}

impl VisitTraversals for Template {
    fn visit_traversals(&self, visitor: &mut dyn Visit<Traversal>) {
        for element in self.elements() {
            match element {
                Element::Interpolation(interpolation) => {
                    interpolation.expr.visit_traversals(visitor);
                }
                Element::Directive(directive) => match directive {
                    Directive::If(ifdir) => {
                        ifdir.cond_expr.visit_traversals(visitor);
                        ifdir.true_template.visit_traversals(visitor);
                        ifdir
                            .false_template
                            .iter()
                            .for_each(|t| t.visit_traversals(visitor));
                    }
                    Directive::For(fordir) => {
                        fordir.collection_expr.visit_traversals(visitor);

                        let mut scoped =
                            Scoped::new(visitor, fordir.key_var.as_ref(), &fordir.value_var);
                        fordir.template.visit_traversals(&mut scoped);
                    }
                },
                Element::Literal(_) => {}
            }
        }
    }
}

/// Hides variables bound by a `for` expression/directive
struct Scoped<'v> {
    inner: &'v mut dyn Visit<Traversal>,
    locals: Vec<Identifier>,
}

impl<'v> Scoped<'v> {
    fn new(
        inner: &'v mut dyn Visit<Traversal>,
        key_var: Option<&Identifier>,
        value_var: &Identifier,
    ) -> Self {
        let locals = key_var.into_iter().chain([value_var]).cloned().collect();
        Self { inner, locals }
    }
}

impl<'v> Visit<Traversal> for Scoped<'v> {
    fn visit(&mut self, traversal: &Traversal) {
        if let Expression::Variable(var) = &traversal.expr {
            if self
                .locals
                .iter()
                .any(|local| local.as_str() == var.as_str())
            {
                return;
            }
        }

        self.inner.visit(traversal);
    }
}
