//! Macro objects and structural expansion
//!
//! A macro stores a parameter list and a template tree. Expansion binds each
//! parameter, positionally, to the corresponding *unevaluated* argument
//! subform, then rebuilds the template with every placeholder leaf replaced
//! by its bound subform. Substitution is purely structural and non-hygienic:
//! symbol capture follows ordinary shadowing rules, exactly as if the
//! programmer had written the expansion by hand.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::runtime::node::{cons, shift};
use crate::runtime::{Node, Symbol};

/// A macro definition: parameters plus the captured template
pub struct MacroDef {
    /// Macro name (for printing and diagnostics)
    pub name: Symbol,
    /// Formal parameters, bound positionally
    pub params: Vec<Symbol>,
    /// Template tree containing placeholder leaves
    pub template: Node,
}

impl MacroDef {
    /// Expands one call: `args` is the unevaluated argument list of the form.
    pub fn expand(&self, args: &Node) -> Result<Node> {
        let mut table = HashMap::new();
        let mut rest = args.clone();
        for &param in &self.params {
            let (subform, tail) = shift(&rest)?;
            table.insert(param, subform);
            rest = tail;
        }
        if !rest.is_null() {
            return Err(Error::TooManyArguments);
        }
        Ok(substitute(&self.template, &table))
    }
}

/// Rebuilds `template` with placeholders replaced by their bound subforms.
/// Non-placeholder structure is preserved untouched.
fn substitute(template: &Node, table: &HashMap<Symbol, Node>) -> Node {
    match template {
        Node::Cons(cell) => {
            let cell = cell.borrow();
            cons(substitute(&cell.car, table), substitute(&cell.cdr, table))
        }
        Node::Placeholder(name) => match table.get(name) {
            Some(bound) => bound.clone(),
            None => template.clone(),
        },
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::node::list_from;

    fn sym(s: &str) -> Node {
        Node::Symbol(Symbol::new(s))
    }

    #[test]
    fn test_expand_substitutes_unevaluated_subforms() {
        // template: (progn $(x) $(x))
        let x = Symbol::new("x");
        let template = list_from(vec![
            sym("progn"),
            Node::Placeholder(x),
            Node::Placeholder(x),
        ]);
        let mac = MacroDef {
            name: Symbol::new("twice"),
            params: vec![x],
            template,
        };
        let arg = list_from(vec![sym("setq"), sym("a"), Node::Int(1)]);
        let args = list_from(vec![arg.clone()]);
        let expansion = mac.expand(&args).unwrap();
        assert_eq!(
            expansion.to_princ_string(),
            "(progn (setq a 1) (setq a 1))"
        );
    }

    #[test]
    fn test_arity_mismatch_is_reported() {
        let x = Symbol::new("x");
        let mac = MacroDef {
            name: Symbol::new("m"),
            params: vec![x],
            template: Node::Placeholder(x),
        };
        assert!(matches!(mac.expand(&Node::Null), Err(Error::TooFewArguments)));
        let two = list_from(vec![Node::Int(1), Node::Int(2)]);
        assert!(matches!(mac.expand(&two), Err(Error::TooManyArguments)));
    }
}
