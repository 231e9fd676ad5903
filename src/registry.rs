//! Host-native functions callable from scripts by name.
//!
//! The registry is owned by an [`Interpreter`](crate::interpreter::Interpreter)
//! and consulted after builtins and plugin functions during call resolution.
//! Failures never escape into the script: an unknown name or a failing
//! callable is reported on the console and the call evaluates to `null`.
//!
//! Typed registration (`register1`..`register3`) converts each argument with
//! [`FromValue`]:
//!
//! | Host type | Accepted script values                                   |
//! |-----------|----------------------------------------------------------|
//! | `f64`     | number, numeric string, `null` → 0                       |
//! | `i64`/`i32` | number (truncated), integer string, `null` → 0         |
//! | `String`  | any value, rendered as `print` would                     |
//! | `bool`    | boolean, `"true"`/`"false"` (any case), number ≠ 0, `null` → false |
//! | `Value`   | anything, unchanged                                      |

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::{debug, info};

use crate::console::ConsoleRef;
use crate::error::NativeError;
use crate::value::Value;

/// Callable shared by registry entries and plugin functions.
pub type NativeFn = Rc<dyn Fn(&[Value]) -> Result<Value, NativeError>>;

// ─────────────────────────────────────────────────────────────────────────────
// Conversion table
// ─────────────────────────────────────────────────────────────────────────────

/// Conversion from a script value to a host parameter type.
pub trait FromValue: Sized {
    const TYPE_NAME: &'static str;

    fn from_value(value: &Value) -> Result<Self, NativeError>;
}

fn conversion_error<T: FromValue>(value: &Value) -> NativeError {
    NativeError::Conversion {
        value: value.to_string(),
        target: T::TYPE_NAME,
    }
}

impl FromValue for f64 {
    const TYPE_NAME: &'static str = "double";

    fn from_value(value: &Value) -> Result<Self, NativeError> {
        match value {
            Value::Null => Ok(0.0),
            Value::Number(n) => Ok(*n),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| conversion_error::<f64>(value)),
            _ => Err(conversion_error::<f64>(value)),
        }
    }
}

impl FromValue for i64 {
    const TYPE_NAME: &'static str = "int";

    fn from_value(value: &Value) -> Result<Self, NativeError> {
        match value {
            Value::Null => Ok(0),
            Value::Number(n) if n.is_finite() => Ok(n.trunc() as i64),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| conversion_error::<i64>(value)),
            _ => Err(conversion_error::<i64>(value)),
        }
    }
}

impl FromValue for i32 {
    const TYPE_NAME: &'static str = "int";

    fn from_value(value: &Value) -> Result<Self, NativeError> {
        let wide: i64 = i64::from_value(value)?;

        i32::try_from(wide).map_err(|_| conversion_error::<i32>(value))
    }
}

impl FromValue for String {
    const TYPE_NAME: &'static str = "string";

    fn from_value(value: &Value) -> Result<Self, NativeError> {
        Ok(value.to_string())
    }
}

impl FromValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_value(value: &Value) -> Result<Self, NativeError> {
        match value {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(*b),
            Value::Number(n) => Ok(*n != 0.0),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            _ => Err(conversion_error::<bool>(value)),
        }
    }
}

impl FromValue for Value {
    const TYPE_NAME: &'static str = "any";

    fn from_value(value: &Value) -> Result<Self, NativeError> {
        Ok(value.clone())
    }
}

/// Conversion from a host return value to a script value.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Number(self)
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Number(self as f64)
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Number(f64::from(self))
    }
}

impl IntoValue for usize {
    fn into_value(self) -> Value {
        Value::Number(self as f64)
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::String(self.to_string())
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Null
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::Null, IntoValue::into_value)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct RegisteredFunction {
    pub name: String,
    pub description: String,

    /// Declared parameter count; `None` for variadic functions.
    pub arity: Option<usize>,

    implementation: NativeFn,
}

impl RegisteredFunction {
    pub fn call(&self, args: &[Value]) -> Result<Value, NativeError> {
        (self.implementation)(args)
    }
}

impl fmt::Debug for RegisteredFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredFunction")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("arity", &self.arity)
            .finish()
    }
}

fn require(name: &str, args: &[Value], expected: usize) -> Result<(), NativeError> {
    if args.len() < expected {
        return Err(NativeError::MissingArguments {
            name: name.to_string(),
            expected,
        });
    }

    Ok(())
}

pub struct FunctionRegistry {
    functions: HashMap<String, RegisteredFunction>,
    console: ConsoleRef,
}

impl FunctionRegistry {
    pub fn new(console: ConsoleRef) -> Self {
        Self {
            functions: HashMap::new(),
            console,
        }
    }

    fn insert(&mut self, name: &str, description: &str, arity: Option<usize>, f: NativeFn) {
        info!("Registering native function '{}' (arity {:?})", name, arity);

        self.functions.insert(
            name.to_string(),
            RegisteredFunction {
                name: name.to_string(),
                description: description.to_string(),
                arity,
                implementation: f,
            },
        );
    }

    /// Register a variadic function that receives the raw argument slice.
    pub fn register<F>(&mut self, name: &str, description: &str, f: F)
    where
        F: Fn(&[Value]) -> Result<Value, NativeError> + 'static,
    {
        self.insert(name, description, None, Rc::new(f));
    }

    pub fn register0<R, F>(&mut self, name: &str, description: &str, f: F)
    where
        R: IntoValue,
        F: Fn() -> R + 'static,
    {
        self.insert(name, description, Some(0), Rc::new(move |_| Ok(f().into_value())));
    }

    pub fn register1<A, R, F>(&mut self, name: &str, description: &str, f: F)
    where
        A: FromValue,
        R: IntoValue,
        F: Fn(A) -> R + 'static,
    {
        let owned: String = name.to_string();

        self.insert(
            name,
            description,
            Some(1),
            Rc::new(move |args| {
                require(&owned, args, 1)?;

                Ok(f(A::from_value(&args[0])?).into_value())
            }),
        );
    }

    pub fn register2<A, B, R, F>(&mut self, name: &str, description: &str, f: F)
    where
        A: FromValue,
        B: FromValue,
        R: IntoValue,
        F: Fn(A, B) -> R + 'static,
    {
        let owned: String = name.to_string();

        self.insert(
            name,
            description,
            Some(2),
            Rc::new(move |args| {
                require(&owned, args, 2)?;

                Ok(f(A::from_value(&args[0])?, B::from_value(&args[1])?).into_value())
            }),
        );
    }

    pub fn register3<A, B, C, R, F>(&mut self, name: &str, description: &str, f: F)
    where
        A: FromValue,
        B: FromValue,
        C: FromValue,
        R: IntoValue,
        F: Fn(A, B, C) -> R + 'static,
    {
        let owned: String = name.to_string();

        self.insert(
            name,
            description,
            Some(3),
            Rc::new(move |args| {
                require(&owned, args, 3)?;

                Ok(f(
                    A::from_value(&args[0])?,
                    B::from_value(&args[1])?,
                    C::from_value(&args[2])?,
                )
                .into_value())
            }),
        );
    }

    /// Call `name`.  Unknown names and failing callables are reported on the
    /// console and yield `null`.
    pub fn call(&self, name: &str, args: &[Value]) -> Value {
        let Some(function) = self.functions.get(name) else {
            debug!("Registry miss for '{}'", name);

            self.console
                .write_line(&format!("Function '{}' not found in registry", name));

            return Value::Null;
        };

        match function.call(args) {
            Ok(value) => value,

            Err(e) => {
                debug!("Native function '{}' failed: {}", name, e);

                self.console
                    .write_line(&format!("Error executing function '{}': {}", name, e));

                Value::Null
            }
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredFunction> {
        self.functions.get(name)
    }

    /// Registered functions, sorted by name.
    pub fn functions(&self) -> Vec<&RegisteredFunction> {
        let mut functions: Vec<&RegisteredFunction> = self.functions.values().collect();
        functions.sort_by(|a, b| a.name.cmp(&b.name));

        functions
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        let removed: bool = self.functions.remove(name).is_some();

        if removed {
            info!("Unregistered native function '{}'", name);
        }

        removed
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.functions())
            .finish()
    }
}
