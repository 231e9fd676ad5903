use crate::error::RuntimeError;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a scope frame.  Closures keep frames alive after the
/// block or call that created them returns.
pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Fresh global frame.
    pub fn new_ref() -> EnvRef {
        Rc::new(RefCell::new(Environment::new()))
    }

    /// Fresh frame nested in `parent`.
    pub fn child(parent: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(parent))))
    }

    /// Bind `name` in this frame, replacing any existing local binding.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str, line: usize) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(RuntimeError::UndefinedVariable {
                name: name.to_string(),
                line,
            })
        }
    }

    /// Rebind `name` in the nearest frame that defines it.
    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(RuntimeError::UndefinedVariable {
                name: name.to_string(),
                line,
            })
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
            || self
                .enclosing
                .as_ref()
                .is_some_and(|enclosing| enclosing.borrow().contains(name))
    }

    /// Local binding only; does not walk the chain.
    pub fn get_local(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Remove a local binding.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }
}
