//! Condition handling tests
//!
//! This suite covers:
//! - The universal `error` designator
//! - Error-object designators bound in the global frame
//! - Binding the condition in a clause variable
//! - :no-error clauses
//! - Propagation when no clause matches

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
fn test_error_designator_matches_anything() {
    assert_eval(
        "(handler-case (error \"boom\") (error () 'caught))",
        eval("'caught").unwrap(),
    );
    assert_eval(
        "(handler-case (car 1) (error () 'caught))",
        eval("'caught").unwrap(),
    );
}

#[test]
fn test_success_skips_handlers() {
    assert_eval("(handler-case 42 (error () 'caught))", Node::Int(42));
}

#[test]
fn test_specific_designators() {
    assert_eval(
        "(handler-case undefined-var
           (*err-unbound-variable* () 'unbound)
           (error () 'other))",
        eval("'unbound").unwrap(),
    );
    assert_eval(
        "(handler-case (/ 1 0)
           (*err-unbound-variable* () 'unbound)
           (*err-division-by-zero* () 'divzero))",
        eval("'divzero").unwrap(),
    );
    assert_eval(
        "(handler-case (funcall 9)
           (*err-not-callable* () 'nc))",
        eval("'nc").unwrap(),
    );
    assert_eval(
        "(handler-case (car)
           (*err-too-few-arguments* () 'few))",
        eval("'few").unwrap(),
    );
}

#[test]
fn test_first_matching_clause_wins() {
    assert_eval(
        "(handler-case (/ 1 0)
           (error () 'generic)
           (*err-division-by-zero* () 'specific))",
        eval("'generic").unwrap(),
    );
}

#[test]
fn test_condition_bound_to_clause_variable() {
    assert_eval(
        "(handler-case (error \"code ~d\" 7)
           (error (e) (format nil \"got: ~a\" e)))",
        Node::Str("got: code 7".to_string()),
    );
}

#[test]
fn test_no_error_clause_receives_result() {
    assert_eval(
        "(handler-case (+ 1 2)
           (error () 'caught)
           (:no-error (v) (* v 10)))",
        Node::Int(30),
    );
}

#[test]
fn test_no_error_clause_skipped_on_error() {
    assert_eval(
        "(handler-case (error \"x\")
           (:no-error (v) 'fine)
           (error () 'caught))",
        eval("'caught").unwrap(),
    );
}

#[test]
fn test_unmatched_condition_propagates() {
    let err = eval(
        "(handler-case (/ 1 0)
           (*err-unbound-variable* () 'nope))",
    );
    assert!(matches!(err, Err(Error::DivisionByZero)));
}

#[test]
fn test_handlers_do_not_intercept_block_returns() {
    assert_eval(
        "(block b
           (handler-case (return-from b 'through)
             (error () 'swallowed)))",
        eval("'through").unwrap(),
    );
}

#[test]
fn test_handlers_do_not_intercept_throws() {
    assert_eval(
        "(catch 'tag
           (handler-case (throw 'tag 'through)
             (error () 'swallowed)))",
        eval("'through").unwrap(),
    );
}

#[test]
fn test_nested_handlers() {
    assert_eval(
        "(handler-case
             (handler-case (/ 1 0)
               (*err-unbound-variable* () 'inner))
           (*err-division-by-zero* () 'outer))",
        eval("'outer").unwrap(),
    );
}

#[test]
fn test_user_error_formats_message() {
    let err = eval("(error \"bad ~a: ~d\" 'thing 3)").unwrap_err();
    assert_eq!(err.to_string(), "bad thing: 3");
}

#[test]
fn test_condition_is_first_class() {
    assert_eval(
        "(handler-case (error \"x\")
           (error (e) (equal e *err-quit*)))",
        Node::Null,
    );
}
