//! Property-based fuzzing for the reader and evaluator
//!
//! These tests verify that:
//! 1. The reader never panics on arbitrary input
//! 2. Whatever the reader accepts, the evaluator handles without panicking
//! 3. Printing a parsed form re-reads to an equal form

use std::time::Duration;

use islet::{parse, EvalContext, Evaluator};
use proptest::prelude::*;

/// Tokens that look like S-expression elements
fn sexp_token() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("(".to_string()),
        Just(")".to_string()),
        Just("'".to_string()),
        Just("`".to_string()),
        Just(",".to_string()),
        Just(".".to_string()),
        Just("quote".to_string()),
        Just("if".to_string()),
        Just("let".to_string()),
        Just("lambda".to_string()),
        Just("nil".to_string()),
        Just("t".to_string()),
        Just(":key".to_string()),
        Just("#\\a".to_string()),
        Just("\"str\"".to_string()),
        any::<i64>().prop_map(|n| n.to_string()),
        "[a-z][a-z0-9-]{0,8}",
    ]
}

fn sexp_like_source() -> impl Strategy<Value = String> {
    prop::collection::vec(sexp_token(), 0..40).prop_map(|tokens| tokens.join(" "))
}

proptest! {
    #[test]
    fn reader_never_panics(source in "\\PC{0,300}") {
        let _ = parse(&source);
    }

    #[test]
    fn reader_handles_sexp_like_soup(source in sexp_like_source()) {
        let _ = parse(&source);
    }

    #[test]
    fn evaluator_never_panics_on_parsed_input(source in sexp_like_source()) {
        if let Ok(forms) = parse(&source) {
            let mut evaluator = Evaluator::new();
            let ctx = EvalContext::new().with_timeout(Duration::from_millis(200));
            let _ = evaluator.eval_program(&ctx, &forms);
        }
    }

    #[test]
    fn print_parse_round_trip(source in sexp_like_source()) {
        if let Ok(forms) = parse(&source) {
            for form in &forms {
                let printed = form.to_prin1_string();
                let reparsed = parse(&printed).unwrap();
                prop_assert_eq!(reparsed.len(), 1);
                prop_assert_eq!(&reparsed[0], form);
            }
        }
    }
}
