//! Tree-walking evaluator
//!
//! [`Evaluator`] drives the whole interpreter: atoms evaluate to themselves,
//! symbols by environment lookup, and cons cells as forms. A form's head is
//! checked against the special-form table first; otherwise it is evaluated
//! and applied. Macros intercept application with their arguments still
//! unevaluated, and the expansion is re-entered immediately.
//!
//! Non-local exits (`return-from`, `throw`) propagate as `Err` values and
//! are absorbed by the construct that owns them, so `unwind-protect` cleanup
//! and dynamic-binding teardown run on every exit path for free.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::runtime::clos;
use crate::runtime::context::EvalContext;
use crate::runtime::environment::Environment;
use crate::runtime::macros::MacroDef;
use crate::runtime::node::{list_to_vec, shift, EqlMode, ListBuilder, PrintMode};
use crate::runtime::{Node, Symbol};
use crate::tools;

/// A user-defined function: parameter list, body, and captured environment
pub struct Lambda {
    /// Implicit block name (`defun` names; anonymous lambdas carry `None`)
    pub name: Option<Symbol>,
    /// Formal parameters; parameters after a `/` marker bind to `nil`
    pub params: Vec<Symbol>,
    /// Body forms, evaluated as an implicit `progn`
    pub body: Node,
    /// Definition environment, shared with sibling closures
    pub env: Environment,
}

impl Lambda {
    /// Prints the full `(lambda (params...) body...)` form.
    pub fn print_to(&self, out: &mut String) {
        out.push_str("(lambda (");
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&param.name());
        }
        out.push(')');
        let mut rest = self.body.clone();
        while let Node::Cons(cell) = rest {
            let (car, cdr) = {
                let cell = cell.borrow();
                (cell.car.clone(), cell.cdr.clone())
            };
            out.push(' ');
            car.print_to(out, PrintMode::Prin1);
            rest = cdr;
        }
        out.push(')');
    }
}

/// The interpreter: owns the global environment and evaluates forms in it
pub struct Evaluator {
    env: Environment,
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator::new()
    }
}

impl Evaluator {
    /// Creates an evaluator with the standard library registered.
    pub fn new() -> Self {
        let env = Environment::new();
        tools::register_all(&env);
        Evaluator { env }
    }

    /// The global environment.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Reads and evaluates every form in `source`, returning the last value.
    pub fn eval_source(&mut self, ctx: &EvalContext, source: &str) -> Result<Node> {
        let forms = crate::parser::parse(source)?;
        debug!(forms = forms.len(), "evaluating program");
        self.eval_program(ctx, &forms)
    }

    /// Like [`eval_source`](Self::eval_source) for raw bytes, which must be
    /// valid UTF-8.
    pub fn eval_bytes(&mut self, ctx: &EvalContext, source: &[u8]) -> Result<Node> {
        let text = std::str::from_utf8(source).map_err(|_| Error::SyntaxError {
            line: 0,
            message: "source is not valid UTF-8".to_string(),
        })?;
        self.eval_source(ctx, text)
    }

    /// Evaluates already-parsed top-level forms, returning the last value.
    pub fn eval_program(&mut self, ctx: &EvalContext, forms: &[Node]) -> Result<Node> {
        let env = self.env.clone();
        let mut value = Node::Null;
        for form in forms {
            value = self.eval(ctx, &env, form)?;
        }
        Ok(value)
    }

    /// Evaluates one form in the global environment.
    pub fn eval_form(&mut self, ctx: &EvalContext, form: &Node) -> Result<Node> {
        let env = self.env.clone();
        self.eval(ctx, &env, form)
    }

    /// Evaluates one form in the given environment.
    pub fn eval(&mut self, ctx: &EvalContext, env: &Environment, form: &Node) -> Result<Node> {
        match form {
            Node::Symbol(name) => env.get(*name),
            Node::Cons(_) => self.eval_compound(ctx, env, form),
            other => Ok(other.clone()),
        }
    }

    fn eval_compound(&mut self, ctx: &EvalContext, env: &Environment, form: &Node) -> Result<Node> {
        let (head, tail) = shift(form)?;
        if let Node::Symbol(name) = &head {
            if let Some(value) = self.eval_special_form(ctx, env, *name, &tail)? {
                return Ok(value);
            }
        }
        let target = self.eval(ctx, env, &head)?;
        if let Node::Macro(mac) = &target {
            let expansion = mac.expand(&tail)?;
            trace!(name = %mac.name, "macro expanded");
            return self.eval(ctx, env, &expansion);
        }
        let args = self.eval_args(ctx, env, &tail)?;
        self.apply(ctx, env, &target, args)
    }

    /// Applies an already-evaluated callable to already-evaluated arguments.
    /// This is the entry point `funcall`, `apply`, and `mapcar` go through.
    pub fn apply(
        &mut self,
        ctx: &EvalContext,
        env: &Environment,
        target: &Node,
        args: Vec<Node>,
    ) -> Result<Node> {
        match target {
            Node::Builtin(builtin) => {
                let builtin = builtin.clone();
                builtin.call(self, ctx, env, args)
            }
            Node::Lambda(lambda) => self.apply_lambda(ctx, lambda.clone(), args),
            Node::Getter(getter) => clos::call_getter(getter, args),
            Node::Setter(setter) => clos::call_setter(setter, args),
            other => Err(Error::NotCallable {
                type_name: other.type_name(),
            }),
        }
    }

    fn apply_lambda(&mut self, ctx: &EvalContext, lambda: Rc<Lambda>, args: Vec<Node>) -> Result<Node> {
        let marker = Symbol::new("/");
        let mut vars = HashMap::new();
        let mut supplied = args.into_iter();
        let mut locals = false;
        for &param in &lambda.params {
            if param == marker {
                locals = true;
                continue;
            }
            if locals {
                vars.insert(param, Node::Null);
                continue;
            }
            match supplied.next() {
                Some(value) => vars.insert(param, value),
                None => return Err(Error::TooFewArguments),
            };
        }
        if supplied.next().is_some() {
            return Err(Error::TooManyArguments);
        }
        let call_env = lambda.env.child_with(vars);
        // The function body is an implicit block named after the function.
        match self.eval_body(ctx, &call_env, &lambda.body) {
            Err(Error::EarlyReturn { name, value }) if name == lambda.name => Ok(value),
            other => other,
        }
    }

    fn eval_args(&mut self, ctx: &EvalContext, env: &Environment, list: &Node) -> Result<Vec<Node>> {
        let mut out = Vec::new();
        let mut rest = list.clone();
        while !rest.is_null() {
            let (car, cdr) = shift(&rest)?;
            out.push(self.eval(ctx, env, &car)?);
            rest = cdr;
        }
        Ok(out)
    }

    /// Evaluates body forms as an implicit `progn`; empty bodies yield `nil`.
    pub fn eval_body(&mut self, ctx: &EvalContext, env: &Environment, body: &Node) -> Result<Node> {
        let mut value = Node::Null;
        let mut rest = body.clone();
        while !rest.is_null() {
            let (car, cdr) = shift(&rest)?;
            value = self.eval(ctx, env, &car)?;
            rest = cdr;
        }
        Ok(value)
    }

    /// Dispatches the special forms. Returns `None` when `name` is not a
    /// special form and the caller should fall back to application.
    fn eval_special_form(
        &mut self,
        ctx: &EvalContext,
        env: &Environment,
        name: Symbol,
        tail: &Node,
    ) -> Result<Option<Node>> {
        let text = name.name();
        let value = match text.as_str() {
            "quote" => single_arg(tail)?,
            "backquote" => {
                let form = single_arg(tail)?;
                self.eval_backquote(ctx, env, &form)?
            }
            "if" => self.eval_if(ctx, env, tail)?,
            "cond" => self.eval_cond(ctx, env, tail)?,
            "case" => self.eval_case(ctx, env, tail)?,
            "when" => self.eval_when(ctx, env, tail, true)?,
            "unless" => self.eval_when(ctx, env, tail, false)?,
            "let" => self.eval_let(ctx, env, tail, false)?,
            "let*" => self.eval_let(ctx, env, tail, true)?,
            "lambda" => make_lambda(env, tail, None)?,
            "defun" => self.eval_defun(env, tail)?,
            "defmacro" => self.eval_defmacro(ctx, env, tail)?,
            "defclass" => clos::eval_defclass(env, tail)?,
            "setq" => self.eval_setq(ctx, env, tail)?,
            "setf" => self.eval_setf(ctx, env, tail)?,
            "progn" => self.eval_body(ctx, env, tail)?,
            "and" => self.eval_and(ctx, env, tail)?,
            "or" => self.eval_or(ctx, env, tail)?,
            "while" => self.eval_while(ctx, env, tail)?,
            "dotimes" => self.eval_dotimes(ctx, env, tail)?,
            "dolist" => self.eval_dolist(ctx, env, tail)?,
            "block" => self.eval_block(ctx, env, tail)?,
            "return-from" => return self.eval_return_from(ctx, env, tail).map(Some),
            "catch" => self.eval_catch(ctx, env, tail)?,
            "unwind-protect" => self.eval_unwind_protect(ctx, env, tail)?,
            "handler-case" => self.eval_handler_case(ctx, env, tail)?,
            "defglobal" | "defparameter" => self.eval_defglobal(ctx, env, tail)?,
            "defvar" => self.eval_defvar(ctx, env, tail)?,
            "defdynamic" => self.eval_defdynamic(ctx, env, tail)?,
            "dynamic" => env.get_dynamic(single_arg(tail)?.as_symbol()?)?,
            "dynamic-let" => self.eval_dynamic_let(ctx, env, tail)?,
            "function" => self.eval_function(env, tail)?,
            _ => return Ok(None),
        };
        Ok(Some(value))
    }

    /// `` `form ``: rebuilds the template, evaluating `,subform` leaves.
    fn eval_backquote(&mut self, ctx: &EvalContext, env: &Environment, node: &Node) -> Result<Node> {
        if !matches!(node, Node::Cons(_)) {
            return Ok(node.clone());
        }
        if let Some(inner) = as_unquote(node)? {
            return self.eval(ctx, env, &inner);
        }
        let mut builder = ListBuilder::new();
        let mut rest = node.clone();
        loop {
            match &rest {
                Node::Null => return Ok(builder.build()),
                Node::Cons(_) => {
                    // A dotted `,tail` evaluates into the tail position.
                    if let Some(inner) = as_unquote(&rest)? {
                        let tail = self.eval(ctx, env, &inner)?;
                        return Ok(builder.build_with_tail(tail));
                    }
                    let (car, cdr) = shift(&rest)?;
                    builder.push(self.eval_backquote(ctx, env, &car)?);
                    rest = cdr;
                }
                atom => return Ok(builder.build_with_tail(atom.clone())),
            }
        }
    }

    fn eval_if(&mut self, ctx: &EvalContext, env: &Environment, tail: &Node) -> Result<Node> {
        let (cond, rest) = shift(tail)?;
        let (then, rest) = shift(&rest)?;
        let otherwise = if rest.is_null() {
            None
        } else {
            Some(single_arg(&rest)?)
        };
        if self.eval(ctx, env, &cond)?.is_truthy() {
            self.eval(ctx, env, &then)
        } else if let Some(form) = otherwise {
            self.eval(ctx, env, &form)
        } else {
            Ok(Node::Null)
        }
    }

    fn eval_cond(&mut self, ctx: &EvalContext, env: &Environment, tail: &Node) -> Result<Node> {
        for clause in list_to_vec(tail)? {
            let (test, body) = shift(&clause)?;
            let value = self.eval(ctx, env, &test)?;
            if value.is_truthy() {
                if body.is_null() {
                    return Ok(value);
                }
                return self.eval_body(ctx, env, &body);
            }
        }
        Ok(Node::Null)
    }

    /// `(case key ((v...) body...) (v body...) ...)`. Candidate values are
    /// evaluated and compared with relaxed (`equalp`) equality.
    fn eval_case(&mut self, ctx: &EvalContext, env: &Environment, tail: &Node) -> Result<Node> {
        let (key_form, clauses) = shift(tail)?;
        let key = self.eval(ctx, env, &key_form)?;
        for clause in list_to_vec(&clauses)? {
            let (candidates, body) = shift(&clause)?;
            let hit = match &candidates {
                Node::Cons(_) => {
                    let mut found = false;
                    for candidate in list_to_vec(&candidates)? {
                        let value = self.eval(ctx, env, &candidate)?;
                        if key.equals(&value, EqlMode::Equalp) {
                            found = true;
                            break;
                        }
                    }
                    found
                }
                single => {
                    let value = self.eval(ctx, env, single)?;
                    key.equals(&value, EqlMode::Equalp)
                }
            };
            if hit {
                return self.eval_body(ctx, env, &body);
            }
        }
        Ok(Node::Null)
    }

    fn eval_when(
        &mut self,
        ctx: &EvalContext,
        env: &Environment,
        tail: &Node,
        wanted: bool,
    ) -> Result<Node> {
        let (cond, body) = shift(tail)?;
        if self.eval(ctx, env, &cond)?.is_truthy() == wanted {
            self.eval_body(ctx, env, &body)
        } else {
            Ok(Node::Null)
        }
    }

    /// `let` evaluates every init-form in the enclosing environment before
    /// any binding exists; `let*` binds sequentially so later init-forms see
    /// earlier bindings.
    fn eval_let(
        &mut self,
        ctx: &EvalContext,
        env: &Environment,
        tail: &Node,
        sequential: bool,
    ) -> Result<Node> {
        let (bindings, body) = shift(tail)?;
        if sequential {
            let inner = env.child();
            for binding in list_to_vec(&bindings)? {
                let (name, init) = parse_binding(&binding)?;
                let value = match init {
                    Some(form) => self.eval(ctx, &inner, &form)?,
                    None => Node::Null,
                };
                inner.define(name, value);
            }
            self.eval_body(ctx, &inner, &body)
        } else {
            let mut vars = HashMap::new();
            for binding in list_to_vec(&bindings)? {
                let (name, init) = parse_binding(&binding)?;
                let value = match init {
                    Some(form) => self.eval(ctx, env, &form)?,
                    None => Node::Null,
                };
                vars.insert(name, value);
            }
            let inner = env.child_with(vars);
            self.eval_body(ctx, &inner, &body)
        }
    }

    fn eval_defun(&mut self, env: &Environment, tail: &Node) -> Result<Node> {
        let (name_node, rest) = shift(tail)?;
        let name = name_node.as_symbol()?;
        let lambda = make_lambda(env, &rest, Some(name))?;
        env.define_global(name, lambda);
        Ok(Node::Symbol(name))
    }

    /// `(defmacro name (params...) body...)`: evaluates the body once, with
    /// each parameter bound to a placeholder, to produce the template.
    fn eval_defmacro(&mut self, ctx: &EvalContext, env: &Environment, tail: &Node) -> Result<Node> {
        let (name_node, rest) = shift(tail)?;
        let name = name_node.as_symbol()?;
        let (params_node, body) = shift(&rest)?;
        let mut params = Vec::new();
        let mut vars = HashMap::new();
        for param in list_to_vec(&params_node)? {
            let param = param.as_symbol()?;
            params.push(param);
            vars.insert(param, Node::Placeholder(param));
        }
        let template_env = env.child_with(vars);
        let template = self.eval_body(ctx, &template_env, &body)?;
        let mac = MacroDef {
            name,
            params,
            template,
        };
        env.define_global(name, Node::Macro(Rc::new(mac)));
        Ok(Node::Symbol(name))
    }

    fn eval_setq(&mut self, ctx: &EvalContext, env: &Environment, tail: &Node) -> Result<Node> {
        let mut last = Node::Null;
        let mut rest = tail.clone();
        while !rest.is_null() {
            let (name_node, after) = shift(&rest)?;
            let name = name_node.as_symbol()?;
            let (value_form, after) = shift(&after)?;
            rest = after;
            last = self.eval(ctx, env, &value_form)?;
            env.assign(name, last.clone())?;
        }
        Ok(last)
    }

    fn eval_setf(&mut self, ctx: &EvalContext, env: &Environment, tail: &Node) -> Result<Node> {
        let mut last = Node::Null;
        let mut rest = tail.clone();
        while !rest.is_null() {
            let (place, after) = shift(&rest)?;
            let (value_form, after) = shift(&after)?;
            rest = after;
            let value = self.eval(ctx, env, &value_form)?;
            last = self.assign_place(ctx, env, &place, value)?;
        }
        Ok(last)
    }

    /// Assigns one `setf` place: a variable, `(car x)`, `(cdr x)`,
    /// `(dynamic name)`, or a generic-accessor form.
    fn assign_place(
        &mut self,
        ctx: &EvalContext,
        env: &Environment,
        place: &Node,
        value: Node,
    ) -> Result<Node> {
        match place {
            Node::Symbol(name) => {
                env.assign(*name, value.clone())?;
                Ok(value)
            }
            Node::Cons(_) => {
                let (head, args) = shift(place)?;
                let head = head.as_symbol()?;
                match head.name().as_str() {
                    "car" => {
                        let cell = self.eval(ctx, env, &single_arg(&args)?)?.as_cons()?;
                        cell.borrow_mut().car = value.clone();
                        Ok(value)
                    }
                    "cdr" => {
                        let cell = self.eval(ctx, env, &single_arg(&args)?)?.as_cons()?;
                        cell.borrow_mut().cdr = value.clone();
                        Ok(value)
                    }
                    "dynamic" => {
                        let name = single_arg(&args)?.as_symbol()?;
                        env.set_dynamic(name, value.clone())?;
                        Ok(value)
                    }
                    _ => match env.get(head)? {
                        Node::Getter(getter) => {
                            let setter_name =
                                Symbol::new(&format!("set-{}", getter.borrow().name));
                            let setter = match env.get(setter_name)? {
                                Node::Setter(setter) => setter,
                                other => return Err(Error::expected("generic-mutator", &other)),
                            };
                            let receiver = self.eval(ctx, env, &single_arg(&args)?)?;
                            clos::call_setter(&setter, vec![value, receiver])
                        }
                        other => Err(Error::NotCallable {
                            type_name: other.type_name(),
                        }),
                    },
                }
            }
            other => Err(Error::expected("symbol", other)),
        }
    }

    fn eval_and(&mut self, ctx: &EvalContext, env: &Environment, tail: &Node) -> Result<Node> {
        let mut value = Node::True;
        for form in list_to_vec(tail)? {
            value = self.eval(ctx, env, &form)?;
            if !value.is_truthy() {
                return Ok(Node::Null);
            }
        }
        Ok(value)
    }

    fn eval_or(&mut self, ctx: &EvalContext, env: &Environment, tail: &Node) -> Result<Node> {
        for form in list_to_vec(tail)? {
            let value = self.eval(ctx, env, &form)?;
            if value.is_truthy() {
                return Ok(value);
            }
        }
        Ok(Node::Null)
    }

    fn eval_while(&mut self, ctx: &EvalContext, env: &Environment, tail: &Node) -> Result<Node> {
        let (cond, body) = shift(tail)?;
        let mut last = Node::Null;
        loop {
            ctx.check()?;
            if !self.eval(ctx, env, &cond)?.is_truthy() {
                return Ok(last);
            }
            last = self.eval_body(ctx, env, &body)?;
        }
    }

    fn eval_dotimes(&mut self, ctx: &EvalContext, env: &Environment, tail: &Node) -> Result<Node> {
        let (spec, body) = shift(tail)?;
        let (var_node, rest) = shift(&spec)?;
        let var = var_node.as_symbol()?;
        let count = self.eval(ctx, env, &single_arg(&rest)?)?.as_int()?;
        let inner = env.child();
        let mut last = Node::Null;
        for i in 0..count {
            ctx.check()?;
            inner.define(var, Node::Int(i));
            last = self.eval_body(ctx, &inner, &body)?;
        }
        Ok(last)
    }

    fn eval_dolist(&mut self, ctx: &EvalContext, env: &Environment, tail: &Node) -> Result<Node> {
        let (spec, body) = shift(tail)?;
        let (var_node, rest) = shift(&spec)?;
        let var = var_node.as_symbol()?;
        let items = self.eval(ctx, env, &single_arg(&rest)?)?;
        let inner = env.child();
        let mut last = Node::Null;
        for item in list_to_vec(&items)? {
            ctx.check()?;
            inner.define(var, item);
            last = self.eval_body(ctx, &inner, &body)?;
        }
        Ok(last)
    }

    fn eval_block(&mut self, ctx: &EvalContext, env: &Environment, tail: &Node) -> Result<Node> {
        let (name_node, body) = shift(tail)?;
        let block_name = block_name(&name_node)?;
        match self.eval_body(ctx, env, &body) {
            Err(Error::EarlyReturn { name, value }) if name == block_name => Ok(value),
            other => other,
        }
    }

    fn eval_return_from(&mut self, ctx: &EvalContext, env: &Environment, tail: &Node) -> Result<Node> {
        let (name_node, rest) = shift(tail)?;
        let name = block_name(&name_node)?;
        let value = self.eval_optional(ctx, env, &rest)?;
        Err(Error::EarlyReturn { name, value })
    }

    /// Evaluates an optional single trailing form, defaulting to `nil`.
    fn eval_optional(&mut self, ctx: &EvalContext, env: &Environment, tail: &Node) -> Result<Node> {
        if tail.is_null() {
            Ok(Node::Null)
        } else {
            let form = single_arg(tail)?;
            self.eval(ctx, env, &form)
        }
    }

    fn eval_catch(&mut self, ctx: &EvalContext, env: &Environment, tail: &Node) -> Result<Node> {
        let (tag_form, body) = shift(tail)?;
        let tag = self.eval(ctx, env, &tag_form)?;
        match self.eval_body(ctx, env, &body) {
            Err(Error::Thrown { tag: thrown, value }) if thrown.equals(&tag, EqlMode::Equal) => {
                Ok(value)
            }
            other => other,
        }
    }

    /// `(unwind-protect protected cleanup...)`: cleanup runs on every exit
    /// path. The protected outcome wins; a cleanup failure surfaces only
    /// when the protected form succeeded.
    fn eval_unwind_protect(
        &mut self,
        ctx: &EvalContext,
        env: &Environment,
        tail: &Node,
    ) -> Result<Node> {
        let (protected, cleanup) = shift(tail)?;
        let result = self.eval(ctx, env, &protected);
        let cleanup_result = self.eval_body(ctx, env, &cleanup);
        match result {
            Err(err) => Err(err),
            Ok(value) => cleanup_result.map(|_| value),
        }
    }

    /// `(handler-case form (designator (var?) body...)* )`. The bare symbol
    /// `error` matches every condition; other designators evaluate to a
    /// condition object and match by kind. A `:no-error` clause runs on
    /// success with the result bound.
    fn eval_handler_case(
        &mut self,
        ctx: &EvalContext,
        env: &Environment,
        tail: &Node,
    ) -> Result<Node> {
        let (protected, clause_list) = shift(tail)?;
        let clauses = list_to_vec(&clause_list)?;
        match self.eval(ctx, env, &protected) {
            Ok(value) => {
                for clause in &clauses {
                    let (designator, rest) = shift(clause)?;
                    if is_no_error(&designator) {
                        return self.run_handler_clause(ctx, env, &rest, value);
                    }
                }
                Ok(value)
            }
            Err(err) if err.is_condition() => {
                for clause in &clauses {
                    let (designator, rest) = shift(clause)?;
                    if self.designator_matches(ctx, env, &designator, &err)? {
                        let condition = Node::Condition(Rc::new(err));
                        return self.run_handler_clause(ctx, env, &rest, condition);
                    }
                }
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    fn designator_matches(
        &mut self,
        ctx: &EvalContext,
        env: &Environment,
        designator: &Node,
        err: &Error,
    ) -> Result<bool> {
        match designator {
            Node::Symbol(s) if s.name() == "error" => Ok(true),
            Node::Keyword(_) => Ok(false),
            other => match self.eval(ctx, env, other)? {
                Node::Condition(target) => Ok(err.designates(&target)),
                value => Err(Error::expected("condition", &value)),
            },
        }
    }

    fn run_handler_clause(
        &mut self,
        ctx: &EvalContext,
        env: &Environment,
        rest: &Node,
        bound: Node,
    ) -> Result<Node> {
        let (vars, body) = shift(rest)?;
        let inner = env.child();
        match list_to_vec(&vars)?.as_slice() {
            [] => {}
            [var] => inner.define(var.as_symbol()?, bound),
            _ => {
                return Err(Error::MalformedForm {
                    form: "handler-case",
                    reason: "clause binds at most one variable".to_string(),
                })
            }
        }
        self.eval_body(ctx, &inner, &body)
    }

    fn eval_defglobal(&mut self, ctx: &EvalContext, env: &Environment, tail: &Node) -> Result<Node> {
        let (name_node, rest) = shift(tail)?;
        let name = name_node.as_symbol()?;
        let value = self.eval(ctx, env, &single_arg(&rest)?)?;
        env.define_global(name, value);
        Ok(Node::Symbol(name))
    }

    /// `defvar` evaluates its init-form only when the variable is unbound.
    fn eval_defvar(&mut self, ctx: &EvalContext, env: &Environment, tail: &Node) -> Result<Node> {
        let (name_node, rest) = shift(tail)?;
        let name = name_node.as_symbol()?;
        if env.lookup(name).is_none() {
            let value = self.eval_optional(ctx, env, &rest)?;
            env.define_global(name, value);
        }
        Ok(Node::Symbol(name))
    }

    fn eval_defdynamic(&mut self, ctx: &EvalContext, env: &Environment, tail: &Node) -> Result<Node> {
        let (name_node, rest) = shift(tail)?;
        let name = name_node.as_symbol()?;
        let value = self.eval(ctx, env, &single_arg(&rest)?)?;
        env.define_dynamic(name, value);
        Ok(Node::Symbol(name))
    }

    /// `(dynamic-let ((name form)...) body...)`: pushes a dynamic scope for
    /// the body and pops it on every exit path.
    fn eval_dynamic_let(&mut self, ctx: &EvalContext, env: &Environment, tail: &Node) -> Result<Node> {
        let (bindings, body) = shift(tail)?;
        let mut scope = HashMap::new();
        for binding in list_to_vec(&bindings)? {
            let (name, init) = parse_binding(&binding)?;
            let value = match init {
                Some(form) => self.eval(ctx, env, &form)?,
                None => Node::Null,
            };
            scope.insert(name, value);
        }
        env.push_dynamic(scope);
        let result = self.eval_body(ctx, env, &body);
        env.pop_dynamic();
        result
    }

    fn eval_function(&mut self, env: &Environment, tail: &Node) -> Result<Node> {
        let value = env.get(single_arg(tail)?.as_symbol()?)?;
        match value {
            Node::Lambda(_) | Node::Builtin(_) | Node::Getter(_) | Node::Setter(_) => Ok(value),
            other => Err(Error::expected("function", &other)),
        }
    }
}

/// Builds a lambda from `((params...) body...)`.
pub(crate) fn make_lambda(env: &Environment, tail: &Node, name: Option<Symbol>) -> Result<Node> {
    let (params_node, body) = shift(tail)?;
    let mut params = Vec::new();
    for param in list_to_vec(&params_node)? {
        params.push(param.as_symbol()?);
    }
    Ok(Node::Lambda(Rc::new(Lambda {
        name,
        params,
        body,
        env: env.clone(),
    })))
}

fn single_arg(tail: &Node) -> Result<Node> {
    let (value, rest) = shift(tail)?;
    if !rest.is_null() {
        return Err(Error::TooManyArguments);
    }
    Ok(value)
}

/// Block names: a symbol, or `nil` for the anonymous block.
fn block_name(node: &Node) -> Result<Option<Symbol>> {
    match node {
        Node::Null => Ok(None),
        Node::Symbol(s) => Ok(Some(*s)),
        other => Err(Error::expected("symbol", other)),
    }
}

fn is_no_error(designator: &Node) -> bool {
    matches!(designator, Node::Keyword(k) if k.name().eq_ignore_ascii_case(":no-error"))
}

/// Returns the inner form of `(unquote x)`, or `None` for anything else.
fn as_unquote(node: &Node) -> Result<Option<Node>> {
    if let Node::Cons(cell) = node {
        let is_unquote = matches!(&cell.borrow().car,
            Node::Symbol(s) if s.name() == "unquote");
        if is_unquote {
            let (_, tail) = shift(node)?;
            return Ok(Some(single_arg(&tail)?));
        }
    }
    Ok(None)
}

/// Parses one binding item: a bare symbol or `(name [init-form])`.
fn parse_binding(binding: &Node) -> Result<(Symbol, Option<Node>)> {
    match binding {
        Node::Symbol(name) => Ok((*name, None)),
        _ => {
            let (name_node, rest) = shift(binding)?;
            let name = name_node.as_symbol()?;
            if rest.is_null() {
                Ok((name, None))
            } else {
                Ok((name, Some(single_arg(&rest)?)))
            }
        }
    }
}
