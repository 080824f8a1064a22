//! Tracing and execution failures surface to the caller and leave nothing behind.

mod common;

use tracejit::{Error, NodeId, Operand, Shape, Value, compile, compile_with_shape};

#[test]
fn unsupported_primitive_is_untraceable() {
    let err = compile(|session, y| {
        let t = session.tanh(y)?;
        session.call("sigmoid", &[t])
    })
    .unwrap_err();
    assert_eq!(
        err,
        Error::UntraceableOperation {
            op: "sigmoid".to_string(),
            arity: 1,
        }
    );
    assert_eq!(err.to_string(), "untraceable operation `sigmoid` with 1 operand(s)");
}

#[test]
fn error_from_traced_function_aborts_trace() {
    let err = compile(|session, y| {
        session.tanh(y)?;
        Err(Error::UntraceableOperation {
            op: "print".to_string(),
            arity: 0,
        })
    })
    .unwrap_err();
    assert!(matches!(err, Error::UntraceableOperation { .. }));
}

#[test]
fn result_built_only_from_constants_is_rejected() {
    let err = compile(|session, _y| {
        let a = session.tanh(1.0)?;
        session.subtract(a, 2.0)
    })
    .unwrap_err();
    assert_eq!(err, Error::NonSymbolicReturn);
    assert_eq!(
        err.to_string(),
        "traced function returned a value that does not depend on its input"
    );
}

#[test]
fn scalar_constants_do_not_broadcast() {
    let err = compile_with_shape(Shape::Vector(3), |session, y| session.subtract(y, 1.0))
        .unwrap_err();
    assert_eq!(
        err,
        Error::ShapeMismatch {
            expected: Shape::Vector(3),
            actual: Shape::Scalar,
        }
    );
}

#[test]
fn scalar_graph_rejects_vector_input() {
    let compiled = compile(common::nested).unwrap();
    let err = compiled.run(&Value::vector([0.5])).unwrap_err();
    assert_eq!(err.to_string(), "shape mismatch: expected f64, got f64[1]");
}

#[test]
fn nan_input_propagates() {
    let compiled = compile(common::tanhshrink).unwrap();
    let out = compiled.run(&Value::scalar(f64::NAN)).unwrap();
    assert!(out.as_scalar().unwrap().is_nan());
}

#[test]
fn term_kept_from_earlier_compile_is_rejected() {
    let mut kept = None;
    compile(|session, y| {
        let a = session.tanh(y)?;
        let b = session.tanh(a)?;
        let c = session.tanh(b)?;
        kept = Some(c.clone());
        Ok(c)
    })
    .unwrap();
    let kept = kept.unwrap();

    let err = compile(|session, y| {
        let t = session.tanh(y)?;
        session.subtract(t, kept.clone())
    })
    .unwrap_err();
    assert_eq!(
        err,
        Error::ForeignOperand {
            operand: Operand::Node(NodeId(2)),
            shape: Shape::Scalar,
        }
    );
    assert_eq!(err.to_string(), "operand %2 : f64 does not belong to this trace");
}

#[test]
fn input_kept_from_vector_compile_is_rejected() {
    let mut kept = None;
    compile_with_shape(Shape::Vector(2), |_session, y| {
        kept = Some(y);
        Ok(y.into())
    })
    .unwrap();
    let kept = kept.unwrap();

    let err = compile(|session, _y| session.tanh(kept)).unwrap_err();
    assert_eq!(
        err,
        Error::ForeignOperand {
            operand: Operand::Input,
            shape: Shape::Vector(2),
        }
    );
}
