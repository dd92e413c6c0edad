// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Integration tests for equations built from text

use approx::assert_relative_eq;
use eqkernel::{Bindings, EquationError, Factory, Literal, Value};
use std::f64::consts::{E, PI};

fn gaussian(x: &[f64], sigma: f64) -> Vec<f64> {
    x.iter()
        .map(|x| E.powf(-0.5 * (x / sigma).powi(2)).sqrt())
        .collect()
}

fn grid() -> Vec<f64> {
    (0..20).map(|i| i as f64 * 0.05).collect()
}

fn assert_all_close(actual: &Value, expected: &[f64]) {
    let actual = actual.to_vec();
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert_relative_eq!(*a, *e, epsilon = 1e-12);
    }
}

#[test]
fn test_scalar_equation() {
    let factory = Factory::new();
    let eq = factory.make("A*sin(0.5*x)+divide(B,C)").unwrap();

    for (name, value) in [("A", 1.0), ("x", PI), ("B", 4.0), ("C", 2.0)] {
        eq.arg(name).unwrap().set_value(value).unwrap();
    }
    let expected = 1.0 * (0.5 * PI).sin() + 4.0 / 2.0;
    assert_relative_eq!(eq.call().unwrap().as_scalar().unwrap(), expected);
}

#[test]
fn test_vector_equation() {
    let factory = Factory::new();
    let eq = factory.make("sqrt(e**(-0.5*(x/sigma)**2))").unwrap();
    assert_eq!(eq.arg_names(), vec!["x", "sigma"]);

    eq.arg("x").unwrap().set_value(grid()).unwrap();
    eq.arg("sigma").unwrap().set_value(0.1).unwrap();
    assert_all_close(&eq.call().unwrap(), &gaussian(&grid(), 0.1));
}

#[test]
fn test_equation_with_constants() {
    let factory = Factory::new();
    let eq = factory
        .make_equation_with("sqrt(e**(-0.5*(x/sigma)**2))", true, [("x", grid())])
        .unwrap();

    assert_eq!(eq.arg_names(), vec!["sigma"]);
    assert!(eq.arg("x").is_none());
    let out = eq.call_with(Bindings::new().named("sigma", 0.1)).unwrap();
    assert_all_close(&out, &gaussian(&grid(), 0.1));

    let err = eq.call_with(Bindings::new().named("x", 1.0)).unwrap_err();
    assert!(matches!(err, EquationError::Constraint { .. }));
}

#[test]
fn test_equation_called_as_function() {
    let mut factory = Factory::new();
    let inner = factory
        .make_equation_with("sqrt(e**(-0.5*(x/sigma)**2))", true, [("x", grid())])
        .unwrap();
    factory.register_equation("myfunc", &inner);

    let eq = factory.make("c*myfunc(sigma)").unwrap();
    assert_eq!(eq.arg_names(), vec!["c", "sigma"]);

    let out = eq.call_with(Bindings::new().named("c", 2.0).named("sigma", 0.1)).unwrap();
    let expected: Vec<f64> = gaussian(&grid(), 0.1).iter().map(|v| 2.0 * v).collect();
    assert_all_close(&out, &expected);
}

#[test]
fn test_equation_with_partition() {
    let mut factory = Factory::new();
    let p1 = Literal::partition("p1");
    p1.add_entry(&Literal::argument("v1", 1.0), Vec::<String>::new()).unwrap();
    p1.add_entry(&Literal::argument("v2", 2.0), Vec::<String>::new()).unwrap();
    factory.register_partition("p1", &p1).unwrap();

    let eq = factory.make("A*p1 + B").unwrap();
    eq.arg("A").unwrap().set_value(1.0).unwrap();
    eq.arg("B").unwrap().set_value(4.0).unwrap();
    assert_eq!(eq.call().unwrap(), Value::Scalar((1.0 * 1.0 + 4.0) + (1.0 * 2.0 + 4.0)));
}

#[test]
fn test_equation_with_generator() {
    let mut factory = Factory::new();
    let p1 = Literal::partition("p1");
    p1.add_entry(&Literal::argument("v1", 1.0), Vec::<String>::new()).unwrap();
    p1.add_entry(&Literal::argument("v2", 2.0), Vec::<String>::new()).unwrap();
    let g1 = Literal::generator_of("g1", &p1);
    factory.register_generator("g1", &g1).unwrap();

    let eq = factory.make("A*g1 + B").unwrap();
    eq.arg("A").unwrap().set_value(1.0).unwrap();
    eq.arg("B").unwrap().set_value(4.0).unwrap();
    assert_eq!(eq.call().unwrap(), Value::Scalar(11.0));

    // Membership is re-derived on every call.
    p1.add_entry(&Literal::constant("v3", 3.0), Vec::<String>::new()).unwrap();
    assert_eq!(eq.call().unwrap(), Value::Scalar(11.0 + 7.0));
}

#[test]
fn test_build_args_disabled() {
    let mut factory = Factory::new();
    factory.register_argument("A", 1.0);
    assert!(factory.make_equation("A * 2", false).is_ok());
    let err = factory.make_equation("A * y", false).unwrap_err();
    assert_eq!(err, EquationError::lookup("y"));
}

#[test]
fn test_malformed_text() {
    let factory = Factory::new();
    for text in ["A +", "(A", "A B", "sin()", ")"] {
        let result = factory.make(text);
        assert!(
            matches!(result, Err(EquationError::Parse(_)) | Err(EquationError::Arity { .. })),
            "{:?} gave {:?}",
            text,
            result
        );
    }
}
