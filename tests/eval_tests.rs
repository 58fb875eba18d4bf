//! Core evaluation tests
//!
//! This suite covers:
//! - Self-evaluating literals and symbol lookup
//! - Arithmetic, comparison, and predicate builtins
//! - Binding forms (let, let*, defun, closures)
//! - Assignment (setq strict and relaxed)
//! - Iteration and conditionals

use islet::{Error, EvalContext, Evaluator, Node};

/// Helper to execute source in a fresh evaluator
fn eval(code: &str) -> Result<Node, Error> {
    let mut evaluator = Evaluator::new();
    evaluator.eval_source(&EvalContext::new(), code)
}

/// Helper to assert successful evaluation
fn assert_eval(code: &str, expected: Node) {
    let result = eval(code);
    assert!(result.is_ok(), "Failed to evaluate {code:?}: {result:?}");
    assert_eq!(result.unwrap(), expected, "for {code:?}");
}

#[test]
fn test_literals() {
    assert_eval("42", Node::Int(42));
    assert_eval("2.5", Node::Float(2.5));
    assert_eval("\"hello\"", Node::Str("hello".to_string()));
    assert_eval("#\\a", Node::Rune('a'));
    assert_eval("t", Node::True);
    assert_eval("nil", Node::Null);
    assert_eval("()", Node::Null);
}

#[test]
fn test_arithmetic() {
    assert_eval("(+ 1 2 3)", Node::Int(6));
    assert_eval("(- 10 3 2)", Node::Int(5));
    assert_eval("(- 7)", Node::Int(-7));
    assert_eval("(* 2 3 4)", Node::Int(24));
    assert_eval("(/ 7 2)", Node::Int(3));
    assert_eval("(/ 7.0 2)", Node::Float(3.5));
    assert_eval("(+ 1 2.5)", Node::Float(3.5));
    assert_eval("(mod 7 3)", Node::Int(1));
    assert_eval("(mod -7 3)", Node::Int(2));
    assert_eval("(rem -7 3)", Node::Int(-1));
    assert_eval("(1+ 5)", Node::Int(6));
    assert_eval("(1- 5)", Node::Int(4));
    assert_eval("(min 3 1 2)", Node::Int(1));
    assert_eval("(max 3 1 2)", Node::Int(3));
}

#[test]
fn test_generic_add_concatenates_strings() {
    assert_eval("(+ \"foo\" \"bar\")", Node::Str("foobar".to_string()));
}

#[test]
fn test_division_by_zero() {
    assert!(matches!(eval("(/ 1 0)"), Err(Error::DivisionByZero)));
    assert!(matches!(eval("(mod 1 0)"), Err(Error::DivisionByZero)));
}

#[test]
fn test_comparisons() {
    assert_eval("(< 1 2 3)", Node::True);
    assert_eval("(< 1 3 2)", Node::Null);
    assert_eval("(<= 1 1 2)", Node::True);
    assert_eval("(= 2 2 2)", Node::True);
    assert_eval("(= 2 2.0)", Node::True);
    assert_eval("(/= 1 2)", Node::True);
    assert_eval("(> 3 2 1)", Node::True);
}

#[test]
fn test_equality_builtins() {
    assert_eval("(equal '(1 2) '(1 2))", Node::True);
    assert_eval("(eq '(1 2) '(1 2))", Node::Null);
    assert_eval("(equalp \"HI\" \"hi\")", Node::True);
    assert_eval("(equal \"HI\" \"hi\")", Node::Null);
    assert_eval("(equalp 1 1.0)", Node::True);
    assert_eval("(equal 1 1.0)", Node::Null);
}

#[test]
fn test_predicates() {
    assert_eval("(null nil)", Node::True);
    assert_eval("(null 0)", Node::Null);
    assert_eval("(atom 1)", Node::True);
    assert_eval("(atom '(1))", Node::Null);
    assert_eval("(consp '(1))", Node::True);
    assert_eval("(listp nil)", Node::True);
    assert_eval("(numberp 1.5)", Node::True);
    assert_eval("(integerp 1.5)", Node::Null);
    assert_eval("(stringp \"x\")", Node::True);
    assert_eval("(symbolp 'x)", Node::True);
    assert_eval("(keywordp :x)", Node::True);
    assert_eval("(functionp (lambda (x) x))", Node::True);
    assert_eval("(functionp (function car))", Node::True);
    assert_eval("(evenp 4)", Node::True);
    assert_eval("(oddp 4)", Node::Null);
    assert_eval("(zerop 0)", Node::True);
}

#[test]
fn test_truthiness_everything_but_nil() {
    assert_eval("(if 0 'yes 'no)", eval("'yes").unwrap());
    assert_eval("(if \"\" 'yes 'no)", eval("'yes").unwrap());
    assert_eval("(if nil 'yes 'no)", eval("'no").unwrap());
    assert_eval("(if () 'yes 'no)", eval("'no").unwrap());
}

#[test]
fn test_let_evaluates_inits_in_outer_scope() {
    assert_eval("(defglobal x 100) (let ((x 1) (y x)) y)", Node::Int(100));
}

#[test]
fn test_let_star_binds_sequentially() {
    assert_eval("(let* ((x 1) (y (+ x 1))) (+ x y))", Node::Int(3));
}

#[test]
fn test_let_bare_symbol_defaults_to_nil() {
    assert_eval("(let (a (b 2)) (list a b))", eval("'(nil 2)").unwrap());
}

#[test]
fn test_let_shadowing_restores_outer_binding() {
    assert_eval(
        "(defglobal x 1) (let ((x 2)) x)",
        Node::Int(2),
    );
    assert_eval(
        "(defglobal x 1) (let ((x 2)) nil) x",
        Node::Int(1),
    );
}

#[test]
fn test_defun_and_recursion() {
    assert_eval(
        "(defun fact (n) (if (< n 2) 1 (* n (fact (- n 1))))) (fact 6)",
        Node::Int(720),
    );
}

#[test]
fn test_closures_capture_environment() {
    assert_eval(
        "(defun make-counter ()
           (let ((n 0))
             (lambda () (setq n (+ n 1)))))
         (defglobal c (make-counter))
         (funcall c)
         (funcall c)
         (funcall c)",
        Node::Int(3),
    );
}

#[test]
fn test_sibling_closures_share_state() {
    assert_eval(
        "(defglobal pair
           (let ((n 0))
             (list (lambda () (setq n (+ n 1)))
                   (lambda () n))))
         (funcall (car pair))
         (funcall (car pair))
         (funcall (car (cdr pair)))",
        Node::Int(2),
    );
}

#[test]
fn test_lambda_arity_errors() {
    assert!(matches!(
        eval("((lambda (a b) a) 1)"),
        Err(Error::TooFewArguments)
    ));
    assert!(matches!(
        eval("((lambda (a) a) 1 2)"),
        Err(Error::TooManyArguments)
    ));
}

#[test]
fn test_slash_marker_binds_locals_to_nil() {
    assert_eval("((lambda (a / b) (list a b)) 1)", eval("'(1 nil)").unwrap());
}

#[test]
fn test_setq_strict_requires_binding() {
    assert!(matches!(
        eval("(setq nowhere 1)"),
        Err(Error::UnboundVariable { .. })
    ));
    assert_eval("(defglobal x 1) (setq x 2) x", Node::Int(2));
}

#[test]
fn test_setq_relaxed_defines_at_nearest_frame() {
    let mut evaluator = Evaluator::new();
    evaluator.env().set_strict_assign(false);
    let result = evaluator
        .eval_source(&EvalContext::new(), "(setq fresh 41) (+ fresh 1)")
        .unwrap();
    assert_eq!(result, Node::Int(42));
}

#[test]
fn test_setq_multiple_pairs_returns_last() {
    assert_eval(
        "(defglobal a 0) (defglobal b 0) (setq a 1 b (+ a 1)) (list a b)",
        eval("'(1 2)").unwrap(),
    );
}

#[test]
fn test_defvar_evaluates_init_once() {
    assert_eval(
        "(defglobal counter 0)
         (defvar v (setq counter (+ counter 1)))
         (defvar v (setq counter (+ counter 1)))
         counter",
        Node::Int(1),
    );
}

#[test]
fn test_conditionals() {
    assert_eval("(cond (nil 1) (t 2) (t 3))", Node::Int(2));
    assert_eval("(cond (nil 1))", Node::Null);
    assert_eval("(cond (7))", Node::Int(7));
    assert_eval("(when (> 2 1) 1 2)", Node::Int(2));
    assert_eval("(when nil 1)", Node::Null);
    assert_eval("(unless nil 'ran)", eval("'ran").unwrap());
    assert_eval("(case (+ 1 1) ((1) 'one) ((2 3) 'few) (9 'nine))", eval("'few").unwrap());
    assert_eval("(case 9 ((1) 'one) (9 'nine))", eval("'nine").unwrap());
    assert_eval("(case 99 ((1) 'one))", Node::Null);
}

#[test]
fn test_and_or_short_circuit() {
    assert_eval("(and 1 2 3)", Node::Int(3));
    assert_eval("(and 1 nil (error \"boom\"))", Node::Null);
    assert_eval("(or nil 2 (error \"boom\"))", Node::Int(2));
    assert_eval("(or nil nil)", Node::Null);
    assert_eval("(and)", Node::True);
    assert_eval("(or)", Node::Null);
}

#[test]
fn test_iteration() {
    assert_eval(
        "(defglobal sum 0) (dotimes (i 5) (setq sum (+ sum i))) sum",
        Node::Int(10),
    );
    assert_eval(
        "(defglobal sum 0) (dolist (x '(1 2 3)) (setq sum (+ sum x))) sum",
        Node::Int(6),
    );
    assert_eval(
        "(defglobal n 0) (while (< n 5) (setq n (+ n 1))) n",
        Node::Int(5),
    );
}

#[test]
fn test_quote_and_backquote() {
    assert_eval("'(1 2 3)", eval("(list 1 2 3)").unwrap());
    assert_eval("(defglobal x 9) `(a ,x)", eval("(list 'a 9)").unwrap());
    assert_eval("`(1 (2 ,(+ 1 2)))", eval("(list 1 (list 2 3))").unwrap());
}

#[test]
fn test_funcall_apply_mapcar() {
    assert_eval("(funcall (lambda (a b) (+ a b)) 1 2)", Node::Int(3));
    assert_eval("(apply (function +) 1 2 '(3 4))", Node::Int(10));
    assert_eval("(mapcar (function 1+) '(1 2 3))", eval("'(2 3 4)").unwrap());
    assert_eval(
        "(mapcar (lambda (a b) (+ a b)) '(1 2 3) '(10 20))",
        eval("'(11 22)").unwrap(),
    );
}

#[test]
fn test_not_callable() {
    assert!(matches!(eval("(1 2 3)"), Err(Error::NotCallable { .. })));
}

#[test]
fn test_unbound_variable() {
    assert!(matches!(
        eval("missing"),
        Err(Error::UnboundVariable { .. })
    ));
}

#[test]
fn test_dynamic_variables() {
    assert_eval(
        "(defdynamic depth 1)
         (defun probe () (dynamic depth))
         (dynamic-let ((depth 2)) (probe))",
        Node::Int(2),
    );
    assert_eval(
        "(defdynamic depth 1)
         (dynamic-let ((depth 2)) nil)
         (dynamic depth)",
        Node::Int(1),
    );
}

#[test]
fn test_list_builtins() {
    assert_eval("(car '(1 2))", Node::Int(1));
    assert_eval("(cdr '(1 2))", eval("'(2)").unwrap());
    assert_eval("(cons 1 2)", eval("'(1 . 2)").unwrap());
    assert_eval("(append '(1) '(2 3) '(4))", eval("'(1 2 3 4)").unwrap());
    assert_eval("(reverse '(1 2 3))", eval("'(3 2 1)").unwrap());
    assert_eval("(length '(1 2 3))", Node::Int(3));
    assert_eval("(length \"abc\")", Node::Int(3));
    assert_eval("(member 2 '(1 2 3))", eval("'(2 3)").unwrap());
    assert_eval("(member 9 '(1 2 3))", Node::Null);
    assert_eval("(assoc 'b '((a 1) (b 2)))", eval("'(b 2)").unwrap());
    assert_eval("(last '(1 2 3))", eval("'(3)").unwrap());
    assert_eval("(elt '(a b c) 1)", eval("'b").unwrap());
    assert_eval("(elt \"abc\" 1)", Node::Rune('b'));
    assert_eval("(subseq \"hello\" 1 3)", Node::Str("el".to_string()));
    assert_eval("(subseq '(1 2 3 4) 1)", eval("'(2 3 4)").unwrap());
}

#[test]
fn test_structural_mutation() {
    assert_eval(
        "(defglobal x (list 1 2)) (set-car 9 x) x",
        eval("'(9 2)").unwrap(),
    );
    assert_eval(
        "(defglobal x (list 1 2)) (setf (car x) 8 (cdr x) nil) x",
        eval("'(8)").unwrap(),
    );
    assert_eval(
        "(defglobal x (list 1 2)) (replacd x 7) x",
        eval("'(1 . 7)").unwrap(),
    );
}

#[test]
fn test_shared_structure_is_aliased() {
    // Two references to one cons cell observe the same mutation.
    assert_eval(
        "(defglobal inner (list 1))
         (defglobal outer (list inner inner))
         (set-car 9 inner)
         outer",
        eval("'((9) (9))").unwrap(),
    );
}
