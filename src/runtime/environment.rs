//! Environment chain for variable scoping
//!
//! A frame maps symbols to values and links to its parent; lookup walks
//! outward. Frames are created per `let`/`let*`/call/expansion and may be
//! captured by closures, so they are shared (`Rc`) rather than stack-owned.
//! Every frame of one session references the same [`Shared`] record: dynamic
//! bindings and the standard output/error sinks are session-global and do not
//! fork with frame nesting.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::runtime::{Node, Symbol};

/// Writer-capable output sink, swappable at runtime (tests capture output by
/// installing an `Rc<RefCell<Vec<u8>>>`)
pub type StreamRef = Rc<RefCell<dyn Write>>;

/// One lexical scope: bindings plus a parent link
pub struct Frame {
    vars: RefCell<HashMap<Symbol, Node>>,
    parent: Option<Rc<Frame>>,
}

/// Session-wide record shared by every frame of an environment chain
pub struct Shared {
    /// Dynamic-variable binding stack; index 0 is the global dynamic scope
    dynamic: RefCell<Vec<HashMap<Symbol, Node>>>,
    /// Standard output sink
    stdout: RefCell<StreamRef>,
    /// Error output sink
    errout: RefCell<StreamRef>,
    /// Strict assignment: `setq` on an unbound symbol is an error.
    /// Relaxed: silently create the binding at the nearest scope.
    strict_assign: Cell<bool>,
}

/// Cheap-clone handle on a frame chain plus its session record
#[derive(Clone)]
pub struct Environment {
    frame: Rc<Frame>,
    shared: Rc<Shared>,
}

impl Environment {
    /// Creates a root environment writing to the process stdout/stderr.
    pub fn new() -> Self {
        Environment {
            frame: Rc::new(Frame {
                vars: RefCell::new(HashMap::new()),
                parent: None,
            }),
            shared: Rc::new(Shared {
                dynamic: RefCell::new(vec![HashMap::new()]),
                stdout: RefCell::new(Rc::new(RefCell::new(std::io::stdout()))),
                errout: RefCell::new(Rc::new(RefCell::new(std::io::stderr()))),
                strict_assign: Cell::new(true),
            }),
        }
    }

    /// Creates a child frame sharing this session's record.
    pub fn child(&self) -> Environment {
        self.child_with(HashMap::new())
    }

    /// Creates a child frame pre-populated with bindings.
    pub fn child_with(&self, vars: HashMap<Symbol, Node>) -> Environment {
        Environment {
            frame: Rc::new(Frame {
                vars: RefCell::new(vars),
                parent: Some(self.frame.clone()),
            }),
            shared: self.shared.clone(),
        }
    }

    /// Looks a symbol up, walking from this frame outward.
    pub fn lookup(&self, name: Symbol) -> Option<Node> {
        let mut frame = Some(&self.frame);
        while let Some(f) = frame {
            if let Some(value) = f.vars.borrow().get(&name) {
                return Some(value.clone());
            }
            frame = f.parent.as_ref();
        }
        None
    }

    /// Like [`lookup`](Self::lookup), but an unbound symbol is an error.
    pub fn get(&self, name: Symbol) -> Result<Node> {
        self.lookup(name).ok_or(Error::UnboundVariable { name })
    }

    /// Binds a symbol in this frame, shadowing outer bindings.
    pub fn define(&self, name: Symbol, value: Node) {
        self.frame.vars.borrow_mut().insert(name, value);
    }

    /// Binds a symbol in the outermost (global) frame.
    pub fn define_global(&self, name: Symbol, value: Node) {
        let mut frame = &self.frame;
        while let Some(parent) = frame.parent.as_ref() {
            frame = parent;
        }
        frame.vars.borrow_mut().insert(name, value);
    }

    /// `defvar` semantics: binds globally only when no global binding exists.
    pub fn define_global_if_unbound(&self, name: Symbol, value: Node) {
        let mut frame = &self.frame;
        while let Some(parent) = frame.parent.as_ref() {
            frame = parent;
        }
        let mut vars = frame.vars.borrow_mut();
        vars.entry(name).or_insert(value);
    }

    /// Mutates an existing binding in place.
    ///
    /// Strict mode fails with `UnboundVariable` when no frame defines the
    /// symbol; relaxed mode creates the binding at the nearest scope.
    pub fn assign(&self, name: Symbol, value: Node) -> Result<()> {
        let mut frame = Some(&self.frame);
        while let Some(f) = frame {
            let mut vars = f.vars.borrow_mut();
            if vars.contains_key(&name) {
                vars.insert(name, value);
                return Ok(());
            }
            drop(vars);
            frame = f.parent.as_ref();
        }
        if self.shared.strict_assign.get() {
            Err(Error::UnboundVariable { name })
        } else {
            self.define(name, value);
            Ok(())
        }
    }

    /// Switches between strict and relaxed assignment (see [`assign`](Self::assign)).
    pub fn set_strict_assign(&self, strict: bool) {
        self.shared.strict_assign.set(strict);
    }

    // Dynamic (special) variables live in the shared record, not the
    // lexical chain.

    /// Defines a dynamic variable in the global dynamic scope.
    pub fn define_dynamic(&self, name: Symbol, value: Node) {
        let mut stack = self.shared.dynamic.borrow_mut();
        stack[0].insert(name, value);
    }

    /// Reads a dynamic variable, newest binding first.
    pub fn get_dynamic(&self, name: Symbol) -> Result<Node> {
        let stack = self.shared.dynamic.borrow();
        for frame in stack.iter().rev() {
            if let Some(value) = frame.get(&name) {
                return Ok(value.clone());
            }
        }
        Err(Error::UnboundVariable { name })
    }

    /// Updates the newest binding of a dynamic variable.
    pub fn set_dynamic(&self, name: Symbol, value: Node) -> Result<()> {
        let mut stack = self.shared.dynamic.borrow_mut();
        for frame in stack.iter_mut().rev() {
            if frame.contains_key(&name) {
                frame.insert(name, value);
                return Ok(());
            }
        }
        Err(Error::UnboundVariable { name })
    }

    /// Pushes a `dynamic-let` binding frame.
    pub fn push_dynamic(&self, bindings: HashMap<Symbol, Node>) {
        self.shared.dynamic.borrow_mut().push(bindings);
    }

    /// Pops the newest `dynamic-let` frame.
    pub fn pop_dynamic(&self) {
        let mut stack = self.shared.dynamic.borrow_mut();
        if stack.len() > 1 {
            stack.pop();
        }
    }

    /// Returns the session's standard output sink.
    pub fn stdout(&self) -> StreamRef {
        self.shared.stdout.borrow().clone()
    }

    /// Replaces the session's standard output sink.
    pub fn set_stdout(&self, stream: StreamRef) {
        *self.shared.stdout.borrow_mut() = stream;
    }

    /// Returns the session's error output sink.
    pub fn errout(&self) -> StreamRef {
        self.shared.errout.borrow().clone()
    }

    /// Replaces the session's error output sink.
    pub fn set_errout(&self, stream: StreamRef) {
        *self.shared.errout.borrow_mut() = stream;
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
