//! Textual expressions over one parameter, e.g. `y - tanh(y)`.
//!
//! Parsing is syntax only. Every operator and function name is handed to the trace session,
//! so anything outside its primitive set fails there as an untraceable operation.

use ariadne::{Config, Label, Report, ReportKind, Source};
use chumsky::{pratt::*, prelude::*};
use tracejit::{Symbolic, Term, TraceSession, Value};

pub type Span = SimpleSpan;
pub type ParseError<'code> = Rich<'code, char, Span>;

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub span: Span,
    pub node: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOperator {
    /// Primitive name the operator lowers to.
    pub fn primitive(self) -> &'static str {
        match self {
            BinaryOperator::Add => "add",
            BinaryOperator::Subtract => "subtract",
            BinaryOperator::Multiply => "multiply",
            BinaryOperator::Divide => "divide",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression<'code> {
    Number(f64),
    Vector(Vec<f64>),
    Variable(&'code str),
    Negate(Box<Spanned<Self>>),
    Binary {
        operator: BinaryOperator,
        operand_a: Box<Spanned<Self>>,
        operand_b: Box<Spanned<Self>>,
    },
    Call {
        name: &'code str,
        arguments: Vec<Spanned<Self>>,
    },
}

pub fn parser<'code>()
-> impl Parser<'code, &'code str, Spanned<Expression<'code>>, extra::Err<ParseError<'code>>> {
    let unsigned_number = text::int(10)
        .then(just('.').then(text::digits(10)).or_not())
        .to_slice()
        .from_str::<f64>()
        .unwrapped();

    let signed_number = just('-')
        .or_not()
        .then(text::int(10).then(just('.').then(text::digits(10)).or_not()))
        .to_slice()
        .from_str::<f64>()
        .unwrapped();

    let identifier = any()
        .filter(|character: &char| character.is_ascii_alphabetic() || *character == '_')
        .then(
            any()
                .filter(|character: &char| character.is_ascii_alphanumeric() || *character == '_')
                .repeated(),
        )
        .to_slice();

    recursive(|expression| {
        let vector = signed_number
            .padded()
            .separated_by(just(','))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just('['), just(']'))
            .map(Expression::Vector);

        let call = identifier
            .clone()
            .then(
                expression
                    .clone()
                    .separated_by(just(','))
                    .collect::<Vec<_>>()
                    .delimited_by(just('(').padded(), just(')')),
            )
            .map(|(name, arguments)| Expression::Call { name, arguments });

        let atom = choice((
            unsigned_number.map(Expression::Number),
            vector,
            call,
            identifier.map(Expression::Variable),
        ))
        .map_with(|node, extra| Spanned {
            node,
            span: extra.span(),
        });

        let nested = expression
            .clone()
            .delimited_by(just('('), just(')'));

        atom.or(nested).padded().pratt((
            infix(left(1), just('-').padded(), |l, _, r, extra| {
                binary(BinaryOperator::Subtract, l, r, extra.span())
            }),
            infix(left(1), just('+').padded(), |l, _, r, extra| {
                binary(BinaryOperator::Add, l, r, extra.span())
            }),
            infix(left(2), just('*').padded(), |l, _, r, extra| {
                binary(BinaryOperator::Multiply, l, r, extra.span())
            }),
            infix(left(2), just('/').padded(), |l, _, r, extra| {
                binary(BinaryOperator::Divide, l, r, extra.span())
            }),
            prefix(3, just('-').padded(), |_, operand, extra| Spanned {
                span: extra.span(),
                node: Expression::Negate(Box::new(operand)),
            }),
        ))
    })
    .padded()
    .then_ignore(end())
}

fn binary<'code>(
    operator: BinaryOperator,
    operand_a: Spanned<Expression<'code>>,
    operand_b: Spanned<Expression<'code>>,
    span: Span,
) -> Spanned<Expression<'code>> {
    Spanned {
        span,
        node: Expression::Binary {
            operator,
            operand_a: Box::new(operand_a),
            operand_b: Box::new(operand_b),
        },
    }
}

/// A problem found in the source text, before any tracing happens.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub span: Span,
    pub message: String,
    pub label: String,
}

/// A parsed expression whose only free variable is `parameter`.
#[derive(Debug, Clone)]
pub struct Program<'code> {
    parameter: &'code str,
    body: Spanned<Expression<'code>>,
}

impl<'code> Program<'code> {
    pub fn parse(source: &'code str, parameter: &'code str) -> Result<Self, Vec<Diagnostic>> {
        let body = parser().parse(source).into_result().map_err(|errors| {
            errors
                .into_iter()
                .map(|error| Diagnostic {
                    span: *error.span(),
                    message: error.to_string(),
                    label: error.reason().to_string(),
                })
                .collect::<Vec<_>>()
        })?;

        let mut diagnostics = Vec::new();
        collect_unknown_variables(&body, parameter, &mut diagnostics);
        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }
        Ok(Self { parameter, body })
    }

    pub fn parameter(&self) -> &'code str {
        self.parameter
    }

    /// Replay the expression through the session primitives.
    pub fn lower(&self, session: &mut TraceSession, input: Symbolic) -> tracejit::Result<Term> {
        lower(&self.body, session, input)
    }
}

fn collect_unknown_variables(
    expression: &Spanned<Expression<'_>>,
    parameter: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match &expression.node {
        Expression::Number(_) | Expression::Vector(_) => {}
        Expression::Variable(name) => {
            if *name != parameter {
                diagnostics.push(Diagnostic {
                    span: expression.span,
                    message: format!("Unknown variable '{name}'"),
                    label: format!("the only input is '{parameter}'"),
                });
            }
        }
        Expression::Negate(operand) => collect_unknown_variables(operand, parameter, diagnostics),
        Expression::Binary {
            operand_a,
            operand_b,
            ..
        } => {
            collect_unknown_variables(operand_a, parameter, diagnostics);
            collect_unknown_variables(operand_b, parameter, diagnostics);
        }
        Expression::Call { arguments, .. } => {
            for argument in arguments {
                collect_unknown_variables(argument, parameter, diagnostics);
            }
        }
    }
}

fn lower(
    expression: &Spanned<Expression<'_>>,
    session: &mut TraceSession,
    input: Symbolic,
) -> tracejit::Result<Term> {
    match &expression.node {
        Expression::Number(number) => Ok(Term::from(*number)),
        Expression::Vector(items) => Ok(Value::vector(items.iter().copied()).into()),
        // `Program::parse` rejects every other name
        Expression::Variable(_) => Ok(input.into()),
        Expression::Negate(operand) => {
            let operand = lower(operand, session, input)?;
            session.negate(operand)
        }
        Expression::Binary {
            operator,
            operand_a,
            operand_b,
        } => {
            let a = lower(operand_a, session, input)?;
            let b = lower(operand_b, session, input)?;
            session.call(operator.primitive(), &[a, b])
        }
        Expression::Call { name, arguments } => {
            let arguments = arguments
                .iter()
                .map(|argument| lower(argument, session, input))
                .collect::<tracejit::Result<Vec<_>>>()?;
            session.call(name, &arguments)
        }
    }
}

/// Print diagnostics to stderr as ariadne reports.
pub fn report_errors(diagnostics: &[Diagnostic], filename: &str, source_code: &str, color: bool) {
    for diagnostic in diagnostics {
        let printed = Report::build(ReportKind::Error, (filename, diagnostic.span.into_range()))
            .with_config(Config::default().with_color(color))
            .with_message(&diagnostic.message)
            .with_label(
                Label::new((filename, diagnostic.span.into_range()))
                    .with_message(&diagnostic.label),
            )
            .finish()
            .eprint((filename, Source::from(source_code)));
        if let Err(error) = printed {
            eprintln!("{}: {}", diagnostic.message, error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracejit::{Error, Op, Operand, Shape, compile_with_shape};

    fn parse(source: &str) -> Expression<'_> {
        parser().parse(source).into_result().unwrap().node
    }

    #[test]
    fn parses_tanhshrink() {
        let Expression::Binary {
            operator,
            operand_a,
            operand_b,
        } = parse("y - tanh(y)")
        else {
            panic!("Expected binary expression");
        };
        assert_eq!(operator, BinaryOperator::Subtract);
        assert_eq!(operand_a.node, Expression::Variable("y"));
        match operand_b.node {
            Expression::Call { name, arguments } => {
                assert_eq!(name, "tanh");
                assert_eq!(arguments.len(), 1);
                assert_eq!(arguments[0].node, Expression::Variable("y"));
            }
            other => panic!("Expected call, got {other:?}"),
        }
    }

    #[test]
    fn subtraction_is_left_associative() {
        let Expression::Binary { operand_a, .. } = parse("y - 1 - 2") else {
            panic!("Expected binary expression");
        };
        assert!(matches!(
            operand_a.node,
            Expression::Binary {
                operator: BinaryOperator::Subtract,
                ..
            }
        ));
    }

    #[test]
    fn multiplication_binds_tighter() {
        let Expression::Binary {
            operator,
            operand_b,
            ..
        } = parse("y - y * 2")
        else {
            panic!("Expected binary expression");
        };
        assert_eq!(operator, BinaryOperator::Subtract);
        assert!(matches!(
            operand_b.node,
            Expression::Binary {
                operator: BinaryOperator::Multiply,
                ..
            }
        ));
    }

    #[test]
    fn parses_vectors_and_negation() {
        assert_eq!(parse("[1, -2.5, 3]"), Expression::Vector(vec![1.0, -2.5, 3.0]));
        assert!(matches!(parse("-(y)"), Expression::Negate(_)));
        assert_eq!(parse("  0.25 "), Expression::Number(0.25));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parser().parse("y - ").into_result().is_err());
        assert!(parser().parse("tanh(y").into_result().is_err());
    }

    #[test]
    fn rejects_unknown_variables() {
        let diagnostics = Program::parse("x - tanh(y)", "y").unwrap_err();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Unknown variable 'x'");
        assert_eq!(diagnostics[0].span.into_range(), 0..1);
    }

    #[test]
    fn lowers_to_tanhshrink_graph() {
        let program = Program::parse("y - tanh(y)", "y").unwrap();
        let compiled =
            compile_with_shape(Shape::Vector(2), |session, y| program.lower(session, y)).unwrap();
        let nodes = compiled.graph().nodes();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].op, Op::Tanh(Operand::Input));
        assert_eq!(nodes[1].op, Op::Subtract(Operand::Input, Operand::Node(nodes[0].id)));
    }

    #[test]
    fn unsupported_operators_are_untraceable() {
        let program = Program::parse("y + 1", "y").unwrap();
        let err = compile_with_shape(Shape::Scalar, |session, y| program.lower(session, y))
            .unwrap_err();
        assert_eq!(
            err,
            Error::UntraceableOperation {
                op: "add".to_string(),
                arity: 2,
            }
        );

        let program = Program::parse("exp(y)", "y").unwrap();
        let err = compile_with_shape(Shape::Scalar, |session, y| program.lower(session, y))
            .unwrap_err();
        assert!(matches!(err, Error::UntraceableOperation { .. }));
    }

    #[test]
    fn constant_expression_does_not_compile() {
        let program = Program::parse("5", "y").unwrap();
        let err = compile_with_shape(Shape::Scalar, |session, y| program.lower(session, y))
            .unwrap_err();
        assert_eq!(err, Error::NonSymbolicReturn);
    }
}
