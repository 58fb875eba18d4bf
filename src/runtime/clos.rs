//! Classes, instances, and generic slot accessors
//!
//! `defclass` produces a first-class [`ClassDef`] carrying its superclass
//! list and slot specifications in declaration order. Slot access goes
//! through generic accessor objects shared across classes: each reader or
//! writer name maps class names to slot names, and dispatch walks the
//! receiver's class then its superclasses depth-first, in declaration
//! order, taking the first match.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::runtime::context::EvalContext;
use crate::runtime::environment::Environment;
use crate::runtime::evaluator::Evaluator;
use crate::runtime::node::{list_to_vec, shift, PrintMode};
use crate::runtime::{Node, Symbol};

/// One slot specification from a `defclass` form
pub struct SlotSpec {
    /// Slot name
    pub name: Symbol,
    /// Reader accessor names
    pub readers: Vec<Symbol>,
    /// Writer accessor names (registered under the given name)
    pub writers: Vec<Symbol>,
    /// Default-value form, evaluated lazily at instance creation
    pub initform: Option<Node>,
    /// Initialization keywords accepted by `create`, stored without colon
    pub initargs: Vec<Symbol>,
}

/// A class object: name, superclasses, and slots in declaration order
pub struct ClassDef {
    /// Class name
    pub name: Symbol,
    /// Direct superclasses, in declaration order
    pub supers: Vec<Rc<ClassDef>>,
    /// Direct slots, in declaration order
    pub slots: Vec<SlotSpec>,
    /// Definition environment; init-forms are evaluated here
    pub env: Environment,
}

impl ClassDef {
    /// Depth-first search (self, then supers in order) for a slot that
    /// declares `initarg`. Returns the slot name.
    pub fn find_slot_for_initarg(&self, initarg: Symbol) -> Option<Symbol> {
        for slot in &self.slots {
            if slot.initargs.contains(&initarg) {
                return Some(slot.name);
            }
        }
        for sup in &self.supers {
            if let Some(found) = sup.find_slot_for_initarg(initarg) {
                return Some(found);
            }
        }
        None
    }

    /// Collects all slot names visible on this class, superclasses first,
    /// skipping duplicates. This is the order instances print their slots in.
    pub fn all_slot_names(&self) -> Vec<Symbol> {
        let mut names = Vec::new();
        self.collect_slot_names(&mut names);
        names
    }

    fn collect_slot_names(&self, out: &mut Vec<Symbol>) {
        for sup in &self.supers {
            sup.collect_slot_names(out);
        }
        for slot in &self.slots {
            if !out.contains(&slot.name) {
                out.push(slot.name);
            }
        }
    }
}

/// True when `class` is `target` or inherits from it.
pub fn class_isa(class: &Rc<ClassDef>, target: &Rc<ClassDef>) -> bool {
    if Rc::ptr_eq(class, target) {
        return true;
    }
    class.supers.iter().any(|sup| class_isa(sup, target))
}

/// An instance: its class plus a slot-value map
pub struct Instance {
    /// The instance's class
    pub class: Rc<ClassDef>,
    /// Bound slot values; unbound slots read as `nil`
    pub slots: HashMap<Symbol, Node>,
}

impl Instance {
    /// Prints as `name{slot:value,...}` with slots in class declaration
    /// order, superclasses first. Unbound slots are omitted.
    pub fn print_to(&self, out: &mut String, mode: PrintMode) {
        out.push_str(&self.class.name.name());
        out.push('{');
        let mut first = true;
        for name in self.class.all_slot_names() {
            if let Some(value) = self.slots.get(&name) {
                if !first {
                    out.push(',');
                }
                first = false;
                out.push_str(&name.name());
                out.push(':');
                value.print_to(out, mode);
            }
        }
        out.push('}');
    }
}

/// Generic slot reader: one object per accessor name, shared by every class
/// that declares a slot under it
pub struct GenericGetter {
    /// Accessor name
    pub name: Symbol,
    /// Class name to slot name
    pub classes: HashMap<Symbol, Symbol>,
}

/// Generic slot writer, dispatched like [`GenericGetter`] but called as
/// `(setter value instance)`
pub struct GenericSetter {
    /// Accessor name
    pub name: Symbol,
    /// Class name to slot name
    pub classes: HashMap<Symbol, Symbol>,
}

/// Depth-first accessor dispatch over `class` and its superclasses.
fn dispatch(classes: &HashMap<Symbol, Symbol>, class: &ClassDef) -> Option<Symbol> {
    if let Some(slot) = classes.get(&class.name) {
        return Some(*slot);
    }
    for sup in &class.supers {
        if let Some(slot) = dispatch(classes, sup) {
            return Some(slot);
        }
    }
    None
}

/// Applies a generic reader to `(instance)`.
pub fn call_getter(getter: &Rc<RefCell<GenericGetter>>, args: Vec<Node>) -> Result<Node> {
    let getter = getter.borrow();
    match args.as_slice() {
        [Node::Instance(inst)] => {
            let inst = inst.borrow();
            let slot = dispatch(&getter.classes, &inst.class).ok_or(
                Error::AccessorNotApplicable {
                    accessor: getter.name,
                    class: inst.class.name,
                },
            )?;
            Ok(inst.slots.get(&slot).cloned().unwrap_or(Node::Null))
        }
        [other] => Err(Error::expected("instance", other)),
        [] => Err(Error::TooFewArguments),
        _ => Err(Error::TooManyArguments),
    }
}

/// Applies a generic writer to `(value instance)`. Returns the writer
/// object itself.
pub fn call_setter(setter: &Rc<RefCell<GenericSetter>>, args: Vec<Node>) -> Result<Node> {
    {
        let s = setter.borrow();
        match args.as_slice() {
            [value, Node::Instance(inst)] => {
                let mut inst = inst.borrow_mut();
                let slot = dispatch(&s.classes, &inst.class).ok_or(
                    Error::AccessorNotApplicable {
                        accessor: s.name,
                        class: inst.class.name,
                    },
                )?;
                inst.slots.insert(slot, value.clone());
            }
            [_, other] => return Err(Error::expected("instance", other)),
            [] | [_] => return Err(Error::TooFewArguments),
            _ => return Err(Error::TooManyArguments),
        }
    }
    Ok(Node::Setter(setter.clone()))
}

/// Strips the leading colon from a keyword name so `:w` and `w` name the
/// same initarg.
pub fn keyword_to_plain(key: Symbol) -> Symbol {
    let name = key.name();
    match name.strip_prefix(':') {
        Some(bare) => Symbol::new(bare),
        None => key,
    }
}

fn malformed(reason: impl Into<String>) -> Error {
    Error::MalformedForm {
        form: "defclass",
        reason: reason.into(),
    }
}

/// Evaluates `(defclass name (supers...) (slot-specs...))`, registering the
/// class and its accessors in the global frame. Returns the class name.
pub fn eval_defclass(env: &Environment, tail: &Node) -> Result<Node> {
    let (name_node, rest) = shift(tail)?;
    let class_name = name_node.as_symbol()?;
    let (supers_node, rest) = shift(&rest)?;
    let mut supers = Vec::new();
    for super_name in list_to_vec(&supers_node)? {
        match env.get(super_name.as_symbol()?)? {
            Node::Class(class) => supers.push(class),
            other => return Err(Error::expected("class", &other)),
        }
    }
    let (specs_node, _options) = shift(&rest)?;

    let mut slots = Vec::new();
    for spec in list_to_vec(&specs_node)? {
        slots.push(parse_slot_spec(&spec)?);
    }

    let class = Rc::new(ClassDef {
        name: class_name,
        supers,
        slots,
        env: env.clone(),
    });

    for slot in &class.slots {
        for &reader in &slot.readers {
            register_getter(env, reader, class_name, slot.name)?;
        }
        for &writer in &slot.writers {
            register_setter(env, writer, class_name, slot.name)?;
        }
    }

    env.define_global(class_name, Node::Class(class));
    Ok(Node::Symbol(class_name))
}

/// Parses one slot spec: a bare symbol or
/// `(name {:reader r | :writer w | :accessor a | :initform f | :initarg k}*)`.
fn parse_slot_spec(spec: &Node) -> Result<SlotSpec> {
    if let Node::Symbol(name) = spec {
        return Ok(SlotSpec {
            name: *name,
            readers: Vec::new(),
            writers: Vec::new(),
            initform: None,
            initargs: Vec::new(),
        });
    }
    let (name_node, mut rest) = shift(spec)?;
    let mut slot = SlotSpec {
        name: name_node.as_symbol()?,
        readers: Vec::new(),
        writers: Vec::new(),
        initform: None,
        initargs: Vec::new(),
    };
    while !rest.is_null() {
        let (key, after_key) = shift(&rest)?;
        let key = match key {
            Node::Keyword(k) => k,
            other => return Err(Error::expected("keyword", &other)),
        };
        let (value, after_value) = shift(&after_key)?;
        rest = after_value;
        match key.name().to_ascii_lowercase().as_str() {
            ":reader" => slot.readers.push(value.as_symbol()?),
            ":writer" => slot.writers.push(value.as_symbol()?),
            ":accessor" => {
                let accessor = value.as_symbol()?;
                slot.readers.push(accessor);
                slot.writers.push(Symbol::new(&format!("set-{accessor}")));
            }
            ":initform" => slot.initform = Some(value),
            ":initarg" => slot.initargs.push(match value {
                Node::Keyword(k) => keyword_to_plain(k),
                other => other.as_symbol()?,
            }),
            unknown => {
                return Err(malformed(format!("unknown slot option {unknown}")))
            }
        }
    }
    Ok(slot)
}

fn register_getter(
    env: &Environment,
    accessor: Symbol,
    class: Symbol,
    slot: Symbol,
) -> Result<()> {
    match env.lookup(accessor) {
        Some(Node::Getter(getter)) => {
            getter.borrow_mut().classes.insert(class, slot);
        }
        Some(other) => {
            return Err(malformed(format!(
                "{accessor} is already bound to a {}",
                other.type_name()
            )));
        }
        None => {
            let getter = GenericGetter {
                name: accessor,
                classes: HashMap::from([(class, slot)]),
            };
            env.define_global(accessor, Node::Getter(Rc::new(RefCell::new(getter))));
        }
    }
    Ok(())
}

fn register_setter(
    env: &Environment,
    accessor: Symbol,
    class: Symbol,
    slot: Symbol,
) -> Result<()> {
    match env.lookup(accessor) {
        Some(Node::Setter(setter)) => {
            setter.borrow_mut().classes.insert(class, slot);
        }
        Some(other) => {
            return Err(malformed(format!(
                "{accessor} is already bound to a {}",
                other.type_name()
            )));
        }
        None => {
            let setter = GenericSetter {
                name: accessor,
                classes: HashMap::from([(class, slot)]),
            };
            env.define_global(accessor, Node::Setter(Rc::new(RefCell::new(setter))));
        }
    }
    Ok(())
}

/// Implements `(create class :initarg value ...)`: binds recognized initargs
/// in the order given (unknown ones are ignored), then fills remaining
/// unbound slots from init-forms, superclasses first.
pub fn create_instance(
    evaluator: &mut Evaluator,
    ctx: &EvalContext,
    positional: Vec<Node>,
    pairs: Vec<(Symbol, Node)>,
) -> Result<Node> {
    let class = match positional.as_slice() {
        [Node::Class(class)] => class.clone(),
        [other] => return Err(Error::expected("class", other)),
        _ if positional.is_empty() => return Err(Error::TooFewArguments),
        _ => return Err(Error::TooManyArguments),
    };

    let instance = Rc::new(RefCell::new(Instance {
        class: class.clone(),
        slots: HashMap::new(),
    }));
    for (key, value) in pairs {
        let initarg = keyword_to_plain(key);
        if let Some(slot) = class.find_slot_for_initarg(initarg) {
            instance.borrow_mut().slots.insert(slot, value);
        }
    }
    apply_initforms(evaluator, ctx, &class, &instance)?;
    Ok(Node::Instance(instance))
}

fn apply_initforms(
    evaluator: &mut Evaluator,
    ctx: &EvalContext,
    class: &Rc<ClassDef>,
    instance: &Rc<RefCell<Instance>>,
) -> Result<()> {
    for sup in &class.supers {
        apply_initforms(evaluator, ctx, sup, instance)?;
    }
    for slot in &class.slots {
        let bound = instance.borrow().slots.contains_key(&slot.name);
        if bound {
            continue;
        }
        if let Some(form) = &slot.initform {
            let value = evaluator.eval(ctx, &class.env, form)?;
            instance.borrow_mut().slots.insert(slot.name, value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str, supers: Vec<Rc<ClassDef>>, slots: Vec<SlotSpec>) -> Rc<ClassDef> {
        Rc::new(ClassDef {
            name: Symbol::new(name),
            supers,
            slots,
            env: Environment::new(),
        })
    }

    fn slot(name: &str, initargs: &[&str]) -> SlotSpec {
        SlotSpec {
            name: Symbol::new(name),
            readers: Vec::new(),
            writers: Vec::new(),
            initform: None,
            initargs: initargs.iter().map(|s| Symbol::new(s)).collect(),
        }
    }

    #[test]
    fn test_initarg_search_is_depth_first() {
        let a = class("a", vec![], vec![slot("x", &["k"])]);
        let b = class("b", vec![], vec![slot("y", &["k"])]);
        let c = class("c", vec![a, b], vec![]);
        assert_eq!(
            c.find_slot_for_initarg(Symbol::new("k")),
            Some(Symbol::new("x"))
        );
    }

    #[test]
    fn test_accessor_dispatch_prefers_own_class() {
        let base = class("base", vec![], vec![slot("w", &[])]);
        let derived = class("derived", vec![base.clone()], vec![slot("w2", &[])]);
        let mut classes = HashMap::new();
        classes.insert(Symbol::new("base"), Symbol::new("w"));
        classes.insert(Symbol::new("derived"), Symbol::new("w2"));
        assert_eq!(dispatch(&classes, &derived), Some(Symbol::new("w2")));
        assert_eq!(dispatch(&classes, &base), Some(Symbol::new("w")));
    }

    #[test]
    fn test_class_isa_walks_supers() {
        let a = class("a", vec![], vec![]);
        let b = class("b", vec![a.clone()], vec![]);
        let c = class("c", vec![b.clone()], vec![]);
        assert!(class_isa(&c, &a));
        assert!(class_isa(&c, &c));
        assert!(!class_isa(&a, &c));
    }

    #[test]
    fn test_keyword_to_plain() {
        assert_eq!(keyword_to_plain(Symbol::new(":w")), Symbol::new("w"));
        assert_eq!(keyword_to_plain(Symbol::new("w")), Symbol::new("w"));
    }
}
