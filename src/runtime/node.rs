//! Runtime value representation
//!
//! [`Node`] is the universal tagged value type: atoms evaluate to themselves,
//! symbols evaluate by environment lookup, and cons cells are dispatched as
//! forms. Cons cells are shared and freely mutable (`replaca`/`replacd` may
//! create or break cycles at any time), so they are reference-counted rather
//! than single-owner.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::runtime::clos::{ClassDef, GenericGetter, GenericSetter, Instance};
use crate::runtime::environment::StreamRef;
use crate::runtime::evaluator::Lambda;
use crate::runtime::macros::MacroDef;
use crate::runtime::Symbol;
use crate::tools::Builtin;

/// Rendering style: human-readable (`princ`) vs. re-readable (`prin1`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintMode {
    /// Human-readable output: strings without quotes, characters bare
    Princ,
    /// Re-readable output: strings quoted and escaped, character syntax
    Prin1,
}

/// Equality strictness: `eq`/`eql`-like identity, `equal` structure,
/// `equalp` case/type relaxation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqlMode {
    /// Identity-like: cons cells by reference, atoms by exact value
    Strict,
    /// Structural value equality
    Equal,
    /// Structural with case-folded strings/characters and int/float mixing
    Equalp,
}

/// A mutable pair; proper lists are cons chains terminated by `Node::Null`
#[derive(Debug)]
pub struct ConsCell {
    /// First field
    pub car: Node,
    /// Second field
    pub cdr: Node,
}

/// Runtime value
#[derive(Clone)]
pub enum Node {
    /// The null / empty-list singleton, the only false value
    Null,
    /// The boolean-true singleton `t`
    True,
    /// 64-bit integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// Character ("rune")
    Rune(char),
    /// String
    Str(String),
    /// Self-evaluating keyword such as `:reader`
    Keyword(Symbol),
    /// Interned symbol; evaluates by environment lookup
    Symbol(Symbol),
    /// Mutable pair (shared, possibly cyclic)
    Cons(Rc<RefCell<ConsCell>>),
    /// Built-in function registered in the global frame
    Builtin(Rc<Builtin>),
    /// User function closing over its defining environment
    Lambda(Rc<Lambda>),
    /// Macro: parameter list plus captured template
    Macro(Rc<MacroDef>),
    /// Macro-parameter marker substituted during expansion
    Placeholder(Symbol),
    /// Class object produced by `defclass`
    Class(Rc<ClassDef>),
    /// Class instance: class reference plus slot map
    Instance(Rc<RefCell<Instance>>),
    /// Generic slot reader dispatched on the receiver's class
    Getter(Rc<RefCell<GenericGetter>>),
    /// Generic slot writer dispatched on the receiver's class
    Setter(Rc<RefCell<GenericSetter>>),
    /// First-class raised condition, bindable by `handler-case`
    Condition(Rc<Error>),
    /// Writer-capable output destination
    Stream(StreamRef),
}

/// Builds a cons cell.
pub fn cons(car: Node, cdr: Node) -> Node {
    Node::Cons(Rc::new(RefCell::new(ConsCell { car, cdr })))
}

/// Builds a proper list from items.
pub fn list_from(items: Vec<Node>) -> Node {
    let mut node = Node::Null;
    for item in items.into_iter().rev() {
        node = cons(item, node);
    }
    node
}

/// Splits a list into its first element and the rest.
///
/// An exhausted list reports `TooFewArguments` (callers are consuming
/// arguments); a non-cons tail is a type error.
pub fn shift(list: &Node) -> Result<(Node, Node)> {
    match list {
        Node::Null => Err(Error::TooFewArguments),
        Node::Cons(cell) => {
            let cell = cell.borrow();
            Ok((cell.car.clone(), cell.cdr.clone()))
        }
        other => Err(Error::expected("cons", other)),
    }
}

/// Collects a proper list into a vector; dotted tails are type errors.
pub fn list_to_vec(list: &Node) -> Result<Vec<Node>> {
    let mut out = Vec::new();
    let mut node = list.clone();
    while !node.is_null() {
        let (car, cdr) = shift(&node)?;
        out.push(car);
        node = cdr;
    }
    Ok(out)
}

/// Incremental proper-list builder (append in O(1))
#[derive(Default)]
pub struct ListBuilder {
    head: Node,
    tail: Option<Rc<RefCell<ConsCell>>>,
}

impl ListBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        ListBuilder {
            head: Node::Null,
            tail: None,
        }
    }

    /// Appends one element.
    pub fn push(&mut self, value: Node) {
        let cell = Rc::new(RefCell::new(ConsCell {
            car: value,
            cdr: Node::Null,
        }));
        match self.tail.take() {
            None => self.head = Node::Cons(cell.clone()),
            Some(prev) => prev.borrow_mut().cdr = Node::Cons(cell.clone()),
        }
        self.tail = Some(cell);
    }

    /// Finishes the list.
    pub fn build(self) -> Node {
        self.head
    }

    /// Finishes the list with an explicit (possibly dotted) tail.
    pub fn build_with_tail(self, tail: Node) -> Node {
        match self.tail {
            None => tail,
            Some(last) => {
                last.borrow_mut().cdr = tail;
                self.head
            }
        }
    }
}

impl Default for Node {
    fn default() -> Self {
        Node::Null
    }
}

impl Node {
    /// Returns the type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::True => "boolean",
            Node::Int(_) => "integer",
            Node::Float(_) => "float",
            Node::Rune(_) => "character",
            Node::Str(_) => "string",
            Node::Keyword(_) => "keyword",
            Node::Symbol(_) => "symbol",
            Node::Cons(_) => "cons",
            Node::Builtin(_) => "function",
            Node::Lambda(_) => "function",
            Node::Macro(_) => "macro",
            Node::Placeholder(_) => "macro-parameter",
            Node::Class(_) => "class",
            Node::Instance(_) => "instance",
            Node::Getter(_) => "generic-accessor",
            Node::Setter(_) => "generic-mutator",
            Node::Condition(_) => "condition",
            Node::Stream(_) => "stream",
        }
    }

    /// True only for the null singleton.
    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    /// Lisp truthiness: everything except `nil` is true.
    pub fn is_truthy(&self) -> bool {
        !self.is_null()
    }

    /// Extracts a symbol.
    pub fn as_symbol(&self) -> Result<Symbol> {
        match self {
            Node::Symbol(s) => Ok(*s),
            _ => Err(Error::expected("symbol", self)),
        }
    }

    /// Extracts an integer.
    pub fn as_int(&self) -> Result<i64> {
        match self {
            Node::Int(n) => Ok(*n),
            _ => Err(Error::expected("number", self)),
        }
    }

    /// Extracts a numeric value widened to f64.
    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Node::Int(n) => Ok(*n as f64),
            Node::Float(f) => Ok(*f),
            _ => Err(Error::expected("number", self)),
        }
    }

    /// Borrows the string payload.
    pub fn as_str(&self) -> Result<&str> {
        match self {
            Node::Str(s) => Ok(s),
            _ => Err(Error::expected("string", self)),
        }
    }

    /// Extracts a character.
    pub fn as_rune(&self) -> Result<char> {
        match self {
            Node::Rune(c) => Ok(*c),
            _ => Err(Error::expected("character", self)),
        }
    }

    /// Extracts the shared cons cell.
    pub fn as_cons(&self) -> Result<Rc<RefCell<ConsCell>>> {
        match self {
            Node::Cons(cell) => Ok(cell.clone()),
            _ => Err(Error::expected("cons", self)),
        }
    }

    /// Renders in `princ` (human-readable) style.
    pub fn to_princ_string(&self) -> String {
        let mut out = String::new();
        self.print_to(&mut out, PrintMode::Princ);
        out
    }

    /// Renders in `prin1` (re-readable) style.
    pub fn to_prin1_string(&self) -> String {
        let mut out = String::new();
        self.print_to(&mut out, PrintMode::Prin1);
        out
    }

    /// Appends the rendering of this node to `out`.
    pub fn print_to(&self, out: &mut String, mode: PrintMode) {
        match self {
            Node::Null => out.push_str("nil"),
            Node::True => out.push('t'),
            Node::Int(n) => out.push_str(&n.to_string()),
            Node::Float(f) => print_float(out, *f),
            Node::Rune(c) => print_rune(out, *c, mode),
            Node::Str(s) => match mode {
                PrintMode::Princ => out.push_str(s),
                PrintMode::Prin1 => print_quoted_string(out, s),
            },
            Node::Keyword(k) => out.push_str(&k.name()),
            Node::Symbol(s) => out.push_str(&s.name()),
            Node::Placeholder(s) => {
                out.push_str("$(");
                out.push_str(&s.name());
                out.push(')');
            }
            Node::Cons(_) => print_list(out, self, mode),
            Node::Builtin(b) => {
                out.push_str("#<builtin ");
                out.push_str(b.name);
                out.push('>');
            }
            Node::Lambda(l) => l.print_to(out),
            Node::Macro(m) => {
                out.push_str("#<macro ");
                out.push_str(&m.name.name());
                out.push('>');
            }
            Node::Class(c) => {
                out.push_str("#<class ");
                out.push_str(&c.name.name());
                out.push('>');
            }
            Node::Instance(inst) => inst.borrow().print_to(out, mode),
            Node::Getter(g) => {
                out.push_str("#<generic ");
                out.push_str(&g.borrow().name.name());
                out.push('>');
            }
            Node::Setter(s) => {
                out.push_str("#<generic ");
                out.push_str(&s.borrow().name.name());
                out.push('>');
            }
            Node::Condition(err) => out.push_str(&err.to_string()),
            Node::Stream(_) => out.push_str("#<stream>"),
        }
    }

    /// Compares two nodes under the given equality mode.
    pub fn equals(&self, other: &Node, mode: EqlMode) -> bool {
        match (self, other) {
            (Node::Null, Node::Null) => true,
            (Node::True, Node::True) => true,
            (Node::Int(a), Node::Int(b)) => a == b,
            (Node::Float(a), Node::Float(b)) => a == b,
            (Node::Int(a), Node::Float(b)) | (Node::Float(b), Node::Int(a)) => {
                mode == EqlMode::Equalp && (*a as f64) == *b
            }
            (Node::Rune(a), Node::Rune(b)) => {
                a == b
                    || (mode == EqlMode::Equalp
                        && a.to_lowercase().eq(b.to_lowercase()))
            }
            (Node::Str(a), Node::Str(b)) => match mode {
                EqlMode::Equalp => a.eq_ignore_ascii_case(b),
                _ => a == b,
            },
            // Keywords compare case-insensitively in every mode.
            (Node::Keyword(a), Node::Keyword(b)) => a.eq_ignore_case(b),
            (Node::Symbol(a), Node::Symbol(b)) => a == b,
            (Node::Placeholder(a), Node::Placeholder(b)) => a == b,
            (Node::Cons(a), Node::Cons(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                if mode == EqlMode::Strict {
                    return false;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.car.equals(&b.car, mode) && a.cdr.equals(&b.cdr, mode)
            }
            (Node::Builtin(a), Node::Builtin(b)) => Rc::ptr_eq(a, b),
            (Node::Lambda(a), Node::Lambda(b)) => Rc::ptr_eq(a, b),
            (Node::Macro(a), Node::Macro(b)) => Rc::ptr_eq(a, b),
            (Node::Class(a), Node::Class(b)) => Rc::ptr_eq(a, b),
            (Node::Instance(a), Node::Instance(b)) => Rc::ptr_eq(a, b),
            (Node::Getter(a), Node::Getter(b)) => Rc::ptr_eq(a, b),
            (Node::Setter(a), Node::Setter(b)) => Rc::ptr_eq(a, b),
            // "Same or wrapping" cause identity, in both directions.
            (Node::Condition(a), Node::Condition(b)) => {
                a.designates(b) || b.designates(a)
            }
            (Node::Stream(a), Node::Stream(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

fn print_float(out: &mut String, f: f64) {
    if f.is_finite() && f == f.trunc() && f.abs() < 1e16 {
        out.push_str(&format!("{f:.1}"));
    } else {
        out.push_str(&f.to_string());
    }
}

fn print_rune(out: &mut String, c: char, mode: PrintMode) {
    if mode == PrintMode::Princ {
        out.push(c);
        return;
    }
    match c {
        '\t' => out.push_str("#\\tab"),
        '\n' => out.push_str("#\\linefeed"),
        '\r' => out.push_str("#\\return"),
        ' ' => out.push_str("#\\space"),
        c if c.is_alphanumeric() || c.is_ascii_graphic() => {
            out.push_str("#\\");
            out.push(c);
        }
        c => out.push_str(&format!("#\\U{:04X}", c as u32)),
    }
}

fn print_quoted_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn print_list(out: &mut String, list: &Node, mode: PrintMode) {
    out.push('(');
    let mut node = list.clone();
    let mut first = true;
    loop {
        match node {
            Node::Null => break,
            Node::Cons(cell) => {
                if !first {
                    out.push(' ');
                }
                first = false;
                let (car, cdr) = {
                    let cell = cell.borrow();
                    (cell.car.clone(), cell.cdr.clone())
                };
                car.print_to(out, mode);
                node = cdr;
            }
            atom => {
                out.push_str(" . ");
                atom.print_to(out, mode);
                break;
            }
        }
    }
    out.push(')');
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_princ_string())
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_prin1_string())
    }
}

/// `PartialEq` uses structural (`equal`) equality, which is what tests and
/// `case`-style comparisons want by default.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other, EqlMode::Equal)
    }
}

/// Extracts trailing `:keyword value` pairs from an evaluated argument list,
/// preserving order. Used by keyword-accepting builtins.
pub fn split_keyword_args(args: Vec<Node>) -> (Vec<Node>, Vec<(Symbol, Node)>) {
    let mut positional = Vec::new();
    let mut pairs = Vec::new();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg {
            Node::Keyword(k) => {
                let value = iter.next().unwrap_or(Node::Null);
                pairs.push((k, value));
            }
            other => positional.push(other),
        }
    }
    (positional, pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_modes() {
        assert_eq!(Node::Str("hi".into()).to_princ_string(), "hi");
        assert_eq!(Node::Str("hi".into()).to_prin1_string(), "\"hi\"");
        assert_eq!(Node::Rune('a').to_princ_string(), "a");
        assert_eq!(Node::Rune('a').to_prin1_string(), "#\\a");
        assert_eq!(Node::Null.to_princ_string(), "nil");
        assert_eq!(Node::True.to_prin1_string(), "t");
    }

    #[test]
    fn test_list_printing() {
        let l = list_from(vec![Node::Int(1), Node::Int(2), Node::Int(3)]);
        assert_eq!(l.to_princ_string(), "(1 2 3)");
        let dotted = cons(Node::Int(1), Node::Int(2));
        assert_eq!(dotted.to_princ_string(), "(1 . 2)");
    }

    #[test]
    fn test_equality_modes() {
        let a = cons(Node::Int(1), Node::Null);
        let b = cons(Node::Int(1), Node::Null);
        assert!(!a.equals(&b, EqlMode::Strict));
        assert!(a.equals(&b, EqlMode::Equal));
        assert!(a.equals(&a, EqlMode::Strict));

        assert!(!Node::Int(1).equals(&Node::Float(1.0), EqlMode::Equal));
        assert!(Node::Int(1).equals(&Node::Float(1.0), EqlMode::Equalp));
        assert!(!Node::Str("HI".into()).equals(&Node::Str("hi".into()), EqlMode::Equal));
        assert!(Node::Str("HI".into()).equals(&Node::Str("hi".into()), EqlMode::Equalp));
    }

    #[test]
    fn test_list_builder() {
        let mut b = ListBuilder::new();
        b.push(Node::Int(1));
        b.push(Node::Int(2));
        assert_eq!(b.build().to_princ_string(), "(1 2)");

        let mut b = ListBuilder::new();
        b.push(Node::Int(1));
        assert_eq!(b.build_with_tail(Node::Int(2)).to_princ_string(), "(1 . 2)");
    }

    #[test]
    fn test_float_printing() {
        assert_eq!(Node::Float(1.0).to_princ_string(), "1.0");
        assert_eq!(Node::Float(std::f64::consts::PI).to_princ_string().starts_with("3.14"), true);
    }
}
