//! Macro definition and expansion tests
//!
//! This suite covers:
//! - Template construction at definition time
//! - Structural substitution of unevaluated argument subforms
//! - macroexpand inspection
//! - Expansion arity errors
//! - Non-hygienic capture semantics

use islet::{Error, EvalContext, Evaluator, Node};

fn eval(code: &str) -> Result<Node, Error> {
    let mut evaluator = Evaluator::new();
    evaluator.eval_source(&EvalContext::new(), code)
}

fn assert_eval(code: &str, expected: Node) {
    let result = eval(code);
    assert!(result.is_ok(), "Failed to evaluate {code:?}: {result:?}");
    assert_eq!(result.unwrap(), expected, "for {code:?}");
}

#[test]
fn test_basic_macro() {
    assert_eval(
        "(defmacro my-if (c a b) `(cond (,c ,a) (t ,b)))
         (my-if (> 2 1) 'yes 'no)",
        eval("'yes").unwrap(),
    );
}

#[test]
fn test_defmacro_returns_name() {
    assert_eval("(defmacro m (x) `(+ ,x 1))", eval("'m").unwrap());
}

#[test]
fn test_arguments_substituted_unevaluated() {
    // The argument form runs twice because the template mentions it twice.
    assert_eval(
        "(defglobal hits 0)
         (defmacro twice (form) `(progn ,form ,form))
         (twice (setq hits (+ hits 1)))
         hits",
        Node::Int(2),
    );
}

#[test]
fn test_macroexpand_shows_substitution() {
    assert_eval(
        "(defmacro twice (form) `(progn ,form ,form))
         (macroexpand '(twice (f 1)))",
        eval("'(progn (f 1) (f 1))").unwrap(),
    );
}

#[test]
fn test_macroexpand_passthrough() {
    assert_eval("(macroexpand '(car x))", eval("'(car x)").unwrap());
    assert_eval("(macroexpand 'x)", eval("'x").unwrap());
}

#[test]
fn test_expansion_arity_errors() {
    assert!(matches!(
        eval("(defmacro m (a b) `(+ ,a ,b)) (m 1)"),
        Err(Error::TooFewArguments)
    ));
    assert!(matches!(
        eval("(defmacro m (a) `(+ ,a 1)) (m 1 2)"),
        Err(Error::TooManyArguments)
    ));
}

#[test]
fn test_expansion_is_non_hygienic() {
    // A binding introduced by the expansion captures a symbol the caller
    // mentions, exactly as hand-written code would.
    assert_eval(
        "(defmacro with-x (form) `(let ((x 42)) ,form))
         (with-x x)",
        Node::Int(42),
    );
}

#[test]
fn test_macro_template_built_by_evaluating_body() {
    // The body runs at definition time; list builds the template directly.
    assert_eval(
        "(defmacro add1 (v) (list '+ v 1))
         (add1 4)",
        Node::Int(5),
    );
}

#[test]
fn test_nested_macro_use() {
    assert_eval(
        "(defmacro my-or2 (a b) `(cond (,a) (t ,b)))
         (my-or2 nil (my-or2 7 8))",
        Node::Int(7),
    );
}

#[test]
fn test_macro_value_prints_by_name() {
    let mut evaluator = Evaluator::new();
    let ctx = EvalContext::new();
    evaluator
        .eval_source(&ctx, "(defmacro m (x) `(+ ,x 1))")
        .unwrap();
    let value = evaluator.eval_source(&ctx, "m");
    assert_eq!(value.unwrap().to_princ_string(), "#<macro m>");
}
