//! Runtime value model: primitives, functions, classes and instances.
//!
//! Primitives compare by value; functions, classes, instances and host
//! objects compare by identity (`Rc::ptr_eq`).

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::{FunctionDecl, Stmt};
use crate::environment::EnvRef;
use crate::error::RuntimeError;

#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Number(f64),
    String(String),
    Bool(bool),
    Function(Rc<Function>),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
    Host(HostObject),
}

impl Value {
    /// Null, `false`, `0` and `""` are falsy; everything else, `NaN`
    /// included, is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Numeric view used by arithmetic and comparisons: anything that is not
    /// a number reads as `0`.
    pub fn as_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            _ => 0.0,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Function(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
            Value::Host(_) => "object",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Host(a), Value::Host(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),

            Value::Number(n) => write_number(f, *n),

            Value::String(s) => write!(f, "{}", s),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Function(func) => write!(f, "<function {}>", func.name),

            Value::Class(class) => write!(f, "<class {}>", class.name),

            Value::Instance(instance) => write!(f, "<{} instance>", instance.class.name),

            Value::Host(_) => write!(f, "<host object>"),
        }
    }
}

/// 3 → "3", 2.5 → "2.5"; integral values avoid float formatting.
fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_nan() {
        return f.write_str("NaN");
    }

    if n.is_infinite() {
        return f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" });
    }

    if n.fract() == 0.0 && n.abs() < 1e15 {
        let mut buf = itoa::Buffer::new();

        return f.write_str(buf.format(n as i64));
    }

    write!(f, "{}", n)
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Functions
// ─────────────────────────────────────────────────────────────────────────────

/// What runs when a [`Function`] is called.
#[derive(Clone)]
pub enum FunctionBody {
    /// Statements of a scripted function, shared with the declaring AST.
    Script(Rc<Vec<Stmt>>),

    /// Placeholder for a name whose implementation lives outside the
    /// environment (builtins, plugin functions).  Calling it yields `null`.
    Native,
}

#[derive(Clone)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: FunctionBody,
    pub is_static: bool,
    pub is_public: bool,

    /// Environment captured at declaration time.
    pub closure: Option<EnvRef>,
}

impl Function {
    /// A scripted function closing over `closure`.
    pub fn from_decl(decl: &FunctionDecl, closure: EnvRef) -> Self {
        Self {
            name: decl.name.clone(),
            params: decl.params.clone(),
            body: FunctionBody::Script(Rc::clone(&decl.body)),
            is_static: decl.is_static,
            is_public: decl.is_public,
            closure: Some(closure),
        }
    }

    /// A body-less stub that only makes `name` resolvable by lookup.
    pub fn native<S: Into<String>>(name: S, params: Vec<String>) -> Self {
        Self {
            name: name.into(),
            params,
            body: FunctionBody::Native,
            is_static: true,
            is_public: true,
            closure: None,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn is_native(&self) -> bool {
        matches!(self.body, FunctionBody::Native)
    }
}

impl fmt::Debug for Function {
    // The closure is skipped: environments routinely contain the function
    // itself.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("native", &self.is_native())
            .field("is_static", &self.is_static)
            .field("is_public", &self.is_public)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Classes and instances
// ─────────────────────────────────────────────────────────────────────────────

pub struct Class {
    pub name: String,
    pub methods: HashMap<String, Rc<Function>>,

    /// Property defaults copied into every new instance.
    pub properties: HashMap<String, Value>,

    pub is_static: bool,
}

impl Class {
    pub fn new<S: Into<String>>(name: S, is_static: bool) -> Self {
        Self {
            name: name.into(),
            methods: HashMap::new(),
            properties: HashMap::new(),
            is_static,
        }
    }

    /// Create an instance seeded with the property defaults.  Static classes
    /// cannot be instantiated.
    pub fn instantiate(class: &Rc<Class>, line: usize) -> Result<Rc<Instance>, RuntimeError> {
        if class.is_static {
            return Err(RuntimeError::StaticInstantiation {
                class: class.name.clone(),
                line,
            });
        }

        Ok(Rc::new(Instance {
            class: Rc::clone(class),
            fields: RefCell::new(class.properties.clone()),
        }))
    }

    /// Method first, then property default.
    pub fn member(&self, name: &str) -> Option<Value> {
        if let Some(method) = self.methods.get(name) {
            return Some(Value::Function(Rc::clone(method)));
        }

        self.properties.get(name).cloned()
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&String> = self.methods.keys().collect();
        let mut properties: Vec<&String> = self.properties.keys().collect();
        methods.sort();
        properties.sort();

        f.debug_struct("Class")
            .field("name", &self.name)
            .field("methods", &methods)
            .field("properties", &properties)
            .field("is_static", &self.is_static)
            .finish()
    }
}

pub struct Instance {
    pub class: Rc<Class>,
    fields: RefCell<HashMap<String, Value>>,
}

impl Instance {
    /// Field first, then class method.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.fields.borrow().get(name) {
            return Some(value.clone());
        }

        self.class
            .methods
            .get(name)
            .map(|method| Value::Function(Rc::clone(method)))
    }

    pub fn set(&self, name: &str, value: Value) {
        self.fields.borrow_mut().insert(name.to_string(), value);
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.borrow().get(name).cloned()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.fields.borrow();
        let mut names: Vec<&String> = fields.keys().collect();
        names.sort();

        f.debug_struct("Instance")
            .field("class", &self.class.name)
            .field("fields", &names)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Host objects
// ─────────────────────────────────────────────────────────────────────────────

/// Opaque handle to host data.  Scripts can store and pass it around; only
/// the host can look inside.
#[derive(Clone)]
pub struct HostObject(Rc<dyn Any>);

impl HostObject {
    pub fn new<T: Any>(value: T) -> Self {
        Self(Rc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &HostObject) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HostObject(..)")
    }
}
