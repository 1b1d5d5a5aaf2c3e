//! Runtime value types for BeamScript

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::ast::Block;
use crate::environment::Environment;
use crate::error::Result;

/// Shared handle to a scope. Function values keep their declaring scope
/// alive through this handle.
pub type EnvRef = Rc<RefCell<Environment>>;

/// Runtime values in BeamScript
#[derive(Clone)]
pub enum Value {
    Null,

    Boolean(bool),

    /// Numeric value; integers and floats share one representation
    Number(Number),

    String(String),

    /// Property bag built by an object literal
    Object(Rc<Object>),

    /// User-defined function with its closure scope
    Function(Rc<Function>),

    /// Built-in function
    NativeFunction(Rc<NativeFn>),
}

impl Value {
    pub fn int(value: i64) -> Self {
        Value::Number(Number::int(value as f64))
    }

    pub fn float(value: f64) -> Self {
        Value::Number(Number::float(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Value::String(value.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
            Value::NativeFunction(_) => "native function",
        }
    }

    /// Condition semantics for `if` and `while`
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => n.value != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Object(_) | Value::Function(_) | Value::NativeFunction(_) => true,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Rendering used inside object displays, where strings are quoted
    fn repr(&self) -> String {
        match self {
            Value::String(s) => format!("\"{}\"", s),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Object(o) => write!(f, "{}", o),
            Value::Function(func) => write!(f, "<fn {}>", func.name),
            Value::NativeFunction(nf) => write!(f, "<native fn {}>", nf.name),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            Value::Number(n) if n.is_float => write!(f, "Float({})", n),
            Value::Number(n) => write!(f, "Int({})", n),
            other => write!(f, "{}", other),
        }
    }
}

/// Value equality as used by `and`: structural for data, identity for
/// callables. Numbers must agree on `is_float` too, so `2` and `2.0` differ;
/// objects compare property sets without regard to order.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b) || a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::NativeFunction(a), Value::NativeFunction(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// A number and whether it was produced as a float
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Number {
    pub value: f64,
    pub is_float: bool,
}

impl Number {
    pub fn int(value: f64) -> Self {
        Self { value, is_float: false }
    }

    pub fn float(value: f64) -> Self {
        Self { value, is_float: true }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_float && self.value.is_finite() && self.value.fract() == 0.0 {
            write!(f, "{:.1}", self.value)
        } else {
            write!(f, "{}", self.value)
        }
    }
}

/// Object properties in insertion order
#[derive(Debug, Clone, Default)]
pub struct Object {
    properties: Vec<(String, Value)>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a property
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.properties.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.properties.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Property values in insertion order
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.properties.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        // Keys are unique, so equal length plus containment is set equality.
        self.len() == other.len()
            && self
                .properties
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|w| v == w))
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.properties.is_empty() {
            return write!(f, "{{}}");
        }
        let fields: Vec<String> = self
            .properties
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v.repr()))
            .collect();
        write!(f, "{{ {} }}", fields.join(", "))
    }
}

/// User-defined function
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Rc<Block>,
    /// Scope active where the function was declared
    pub closure: EnvRef,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}({})>", self.name, self.params.join(", "))
    }
}

/// Signature shared by every native function: arguments and calling scope
pub type NativeFnPtr = dyn Fn(&[Value], &EnvRef) -> Result<Value>;

/// Native/built-in function
pub struct NativeFn {
    pub name: String,
    pub func: Box<NativeFnPtr>,
}

impl NativeFn {
    pub fn new(
        name: &str,
        func: impl Fn(&[Value], &EnvRef) -> Result<Value> + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            func: Box::new(func),
        }
    }

    pub fn call(&self, args: &[Value], env: &EnvRef) -> Result<Value> {
        (self.func)(args, env)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}
