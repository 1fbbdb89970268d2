//! The "any type" value carried by action variables and host calls
//! (SPEC_FULL.md §3, §9 Design Notes).
//!
//! The original Python implementation leans on a dynamically typed language
//! and a singleton `NullTokenValue` object (`nessaid_cli.tokens._NullTokenValue`).
//! Rust has no such luxury: `Value` is a tagged variant, and `Value::Null` plays
//! the role of that singleton — it compares equal only to itself, like the
//! original, but needs no process-wide instance.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// Any runtime value manipulated by action code: rule arguments, named and
/// positional variables, and the builtin container types.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Set(Vec<Value>),
    /// An opaque value handed back unexamined from a host call.
    Host(Rc<dyn HostValue>),
}

/// A host-defined opaque value that can flow through action variables
/// without the interpreter needing to understand its shape.
pub trait HostValue: std::fmt::Debug {
    fn host_type_name(&self) -> &'static str;
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "<null>"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Set(items) => {
                write!(f, "{{")?;
                for (i, v) in items.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "}}")
            }
            Value::Host(h) => write!(f, "<host:{}>", h.host_type_name()),
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// `append` pushes into a `List` or adds into a `Set`; anything else is a
    /// host-function misuse caught by the builtin dispatcher (§4.6).
    pub fn append(&mut self, item: Value) -> Result<(), String> {
        match self {
            Value::List(items) => {
                items.push(item);
                Ok(())
            }
            Value::Set(items) => {
                if !items.contains(&item) {
                    items.push(item);
                }
                Ok(())
            }
            _ => Err("append() requires a list or set".into()),
        }
    }

    pub fn update_map(&mut self, key: Value, value: Value) -> Result<(), String> {
        match self {
            Value::Map(entries) => {
                if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == key) {
                    slot.1 = value;
                } else {
                    entries.push((key, value));
                }
                Ok(())
            }
            _ => Err("update() requires a map".into()),
        }
    }
}

/// A shared, mutable slot for one variable (named or positional). Cloning a
/// `Cell` clones the handle, not the value, so that an assignment through one
/// alias is observed by every reader — the Rust analogue of rebinding a name
/// in a dynamically typed interpreter (§9 Design Notes).
#[derive(Debug, Clone)]
pub struct Cell(Rc<RefCell<Value>>);

impl Cell {
    pub fn new(value: Value) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    pub fn get(&self) -> Value {
        self.0.borrow().clone()
    }

    pub fn set(&self, value: Value) {
        *self.0.borrow_mut() = value;
    }
}

/// A rule activation's named-variable frame: parameters plus locally assigned
/// `$name` variables (§4.5).
#[derive(Debug, Default)]
pub struct NamedScope {
    variables: HashMap<String, Cell>,
}

impl NamedScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: &str, initial: Value) -> Cell {
        let cell = Cell::new(initial);
        self.variables.insert(name.to_string(), cell.clone());
        cell
    }

    /// Binds `name` to an *existing* cell handle rather than a fresh one, so
    /// that assignments through this name are observed by whoever else holds
    /// the same handle — how a rule-ref argument that is itself `$var`
    /// aliases the caller's variable instead of copying its value (§9
    /// Design Notes).
    pub fn declare_cell(&mut self, name: &str, cell: Cell) {
        self.variables.insert(name.to_string(), cell);
    }

    pub fn get(&self, name: &str) -> Option<&Cell> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }
}
