//! Plugin contract and the manager that tracks loaded plugins.
//!
//! A plugin is a named, versioned bundle of native functions.  Loading one is
//! driven by the [`Interpreter`](crate::interpreter::Interpreter):
//!
//! 1. `Loading plugin: NAME vVERSION` is written to the console.
//! 2. [`Plugin::initialize`] runs against a [`PluginHost`].
//! 3. [`PluginManager::install`] records the plugin and every function from
//!    [`Plugin::functions`], each tagged with its owning plugin.
//! 4. The interpreter binds a native stub per function in the globals.
//!
//! Unloading removes exactly the functions owned by that plugin.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::{debug, info, warn};

use crate::console::ConsoleRef;
use crate::error::{NativeError, Result};
use crate::registry::{FunctionRegistry, NativeFn};
use crate::value::{Function, Value};

/// Declared parameter of a plugin function.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    pub name: String,
    pub type_name: String,
    pub is_optional: bool,
    pub default_value: Option<Value>,
}

impl ParameterInfo {
    pub fn new<N: Into<String>, T: Into<String>>(name: N, type_name: T) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            is_optional: false,
            default_value: None,
        }
    }

    pub fn optional(mut self, default_value: Value) -> Self {
        self.is_optional = true;
        self.default_value = Some(default_value);
        self
    }
}

/// A function exposed to scripts by a plugin.
#[derive(Clone)]
pub struct PluginFunction {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterInfo>,
    pub return_type: String,
    implementation: NativeFn,
}

impl PluginFunction {
    pub fn new<F>(name: &str, description: &str, f: F) -> Self
    where
        F: Fn(&[Value]) -> std::result::Result<Value, NativeError> + 'static,
    {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters: Vec::new(),
            return_type: "object".to_string(),
            implementation: Rc::new(f),
        }
    }

    pub fn param(mut self, parameter: ParameterInfo) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn returns<S: Into<String>>(mut self, return_type: S) -> Self {
        self.return_type = return_type.into();
        self
    }

    pub fn call(&self, args: &[Value]) -> std::result::Result<Value, NativeError> {
        (self.implementation)(args)
    }

    /// Global stub bound under this function's name while the plugin is loaded.
    pub fn stub(&self) -> Function {
        Function::native(
            self.name.clone(),
            self.parameters.iter().map(|p| p.name.clone()).collect(),
        )
    }
}

impl fmt::Debug for PluginFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginFunction")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("return_type", &self.return_type)
            .finish()
    }
}

/// What a plugin may touch while it initializes.
pub trait PluginHost {
    /// Bind `function` in the interpreter's global environment.
    fn define_function(&mut self, name: &str, function: Function);

    fn registry(&mut self) -> &mut FunctionRegistry;

    fn console(&self) -> ConsoleRef;
}

pub trait Plugin {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    fn description(&self) -> &str;

    fn initialize(&mut self, _host: &mut dyn PluginHost) -> Result<()> {
        Ok(())
    }

    /// Functions to expose.  Queried once, right after [`Plugin::initialize`].
    fn functions(&self) -> Vec<PluginFunction>;
}

/// Builds a plugin for `loadPlugin("alias")`.
pub type PluginFactory = Box<dyn Fn(ConsoleRef) -> Box<dyn Plugin>>;

struct OwnedFunction {
    owner: String,
    function: PluginFunction,
}

pub struct PluginManager {
    /// Loaded plugins in load order.
    plugins: Vec<Box<dyn Plugin>>,
    functions: HashMap<String, OwnedFunction>,

    /// Lower-cased alias → factory.
    factories: HashMap<String, PluginFactory>,

    /// Lower-cased alias → name of the plugin it loaded.
    aliases: HashMap<String, String>,

    console: ConsoleRef,
}

/// Result of [`PluginManager::install`].
#[derive(Debug)]
pub struct Installed {
    /// Functions to expose as globals.
    pub exposed: Vec<PluginFunction>,

    /// Functions of a same-named plugin that was replaced, sorted.
    pub replaced: Vec<String>,
}

impl PluginManager {
    pub fn new(console: ConsoleRef) -> Self {
        Self {
            plugins: Vec::new(),
            functions: HashMap::new(),
            factories: HashMap::new(),
            aliases: HashMap::new(),
            console,
        }
    }

    pub fn register_factory(&mut self, alias: &str, factory: PluginFactory) {
        debug!("Plugin factory registered for alias '{}'", alias);

        self.factories.insert(alias.to_lowercase(), factory);
    }

    /// Build a fresh plugin for `alias` (case-insensitive).
    pub fn create(&self, alias: &str) -> Option<Box<dyn Plugin>> {
        let factory = self.factories.get(&alias.to_lowercase())?;

        Some(factory(Rc::clone(&self.console)))
    }

    /// Remember that `alias` loaded the plugin called `name`.
    pub fn record_alias(&mut self, alias: &str, name: &str) {
        self.aliases.insert(alias.to_lowercase(), name.to_string());
    }

    /// Record an initialized plugin and its functions.  A plugin with the
    /// same name is replaced.
    pub fn install(&mut self, plugin: Box<dyn Plugin>) -> Installed {
        let name: String = plugin.name().to_string();

        let replaced: Vec<String> = if self.is_loaded(&name) {
            warn!("Plugin '{}' is already loaded; replacing it", name);
            self.remove(&name)
        } else {
            Vec::new()
        };

        let exposed: Vec<PluginFunction> = plugin.functions();

        for function in &exposed {
            if let Some(previous) = self.functions.get(&function.name) {
                warn!(
                    "Function '{}' of plugin '{}' shadows the one from '{}'",
                    function.name, name, previous.owner
                );
            }

            self.functions.insert(
                function.name.clone(),
                OwnedFunction {
                    owner: name.clone(),
                    function: function.clone(),
                },
            );
        }

        info!("Plugin '{}' installed with {} function(s)", name, exposed.len());

        self.plugins.push(plugin);

        Installed { exposed, replaced }
    }

    /// Plugin name for a name or an alias it was loaded under.
    pub fn resolve_name(&self, name_or_alias: &str) -> Option<String> {
        if self.is_loaded(name_or_alias) {
            return Some(name_or_alias.to_string());
        }

        self.aliases
            .get(&name_or_alias.to_lowercase())
            .filter(|name| self.is_loaded(name))
            .cloned()
    }

    /// Unload by name or alias.  Returns the names of the functions that were
    /// removed, or `None` when nothing matched.
    pub fn unload(&mut self, name_or_alias: &str) -> Option<Vec<String>> {
        let name: String = self.resolve_name(name_or_alias)?;
        let removed: Vec<String> = self.remove(&name);

        self.console
            .write_line(&format!("Plugin {} unloaded", name));

        Some(removed)
    }

    fn remove(&mut self, name: &str) -> Vec<String> {
        self.plugins.retain(|plugin| plugin.name() != name);
        self.aliases.retain(|_, plugin| plugin != name);

        let mut removed: Vec<String> = self
            .functions
            .iter()
            .filter(|(_, owned)| owned.owner == name)
            .map(|(function, _)| function.clone())
            .collect();
        removed.sort();

        for function in &removed {
            self.functions.remove(function);
        }

        info!("Plugin '{}' removed with {} function(s)", name, removed.len());

        removed
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.plugins.iter().any(|plugin| plugin.name() == name)
    }

    /// Names of loaded plugins, in load order.
    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins
            .iter()
            .map(|plugin| plugin.name().to_string())
            .collect()
    }

    pub fn loaded_plugins(&self) -> impl Iterator<Item = &dyn Plugin> {
        self.plugins.iter().map(|plugin| plugin.as_ref())
    }

    pub fn is_function_available(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Plugin owning `function`, if any.
    pub fn owner_of(&self, function: &str) -> Option<&str> {
        self.functions.get(function).map(|owned| owned.owner.as_str())
    }

    /// Every exposed function, sorted by name.
    pub fn available_functions(&self) -> Vec<&PluginFunction> {
        let mut functions: Vec<&PluginFunction> =
            self.functions.values().map(|owned| &owned.function).collect();
        functions.sort_by(|a, b| a.name.cmp(&b.name));

        functions
    }

    /// Call a plugin function.  Failures are reported on the console and
    /// yield `null`.
    pub fn call(&self, name: &str, args: &[Value]) -> Value {
        let Some(owned) = self.functions.get(name) else {
            self.console
                .write_line(&format!("Function {} not found", name));

            return Value::Null;
        };

        debug!("Calling plugin function '{}' of '{}'", name, owned.owner);

        match owned.function.call(args) {
            Ok(value) => value,

            Err(e) => {
                self.console
                    .write_line(&format!("Error executing function {}: {}", name, e));

                Value::Null
            }
        }
    }
}

impl fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginManager")
            .field("plugins", &self.plugin_names())
            .field("functions", &self.available_functions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::BufferConsole;

    struct Fixed {
        name: &'static str,
        functions: Vec<&'static str>,
    }

    impl Plugin for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn version(&self) -> &str {
            "0.1.0"
        }

        fn description(&self) -> &str {
            "test plugin"
        }

        fn functions(&self) -> Vec<PluginFunction> {
            let owner: &'static str = self.name;

            self.functions
                .iter()
                .map(|name| PluginFunction::new(name, "", move |_| Ok(Value::from(owner))))
                .collect()
        }
    }

    fn manager() -> (Rc<BufferConsole>, PluginManager) {
        let console = Rc::new(BufferConsole::new());
        let manager = PluginManager::new(console.clone());

        (console, manager)
    }

    #[test]
    fn unload_removes_only_owned_functions() {
        let (console, mut manager) = manager();

        manager.install(Box::new(Fixed {
            name: "A",
            functions: vec!["shared", "onlyA"],
        }));
        manager.install(Box::new(Fixed {
            name: "B",
            functions: vec!["shared", "onlyB"],
        }));

        assert_eq!(manager.owner_of("shared"), Some("B"));
        assert_eq!(manager.unload("A"), Some(vec!["onlyA".to_string()]));
        assert!(manager.is_function_available("shared"));
        assert!(manager.is_function_available("onlyB"));
        assert_eq!(manager.plugin_names(), vec!["B"]);
        assert_eq!(console.lines(), vec!["Plugin A unloaded"]);
    }

    #[test]
    fn alias_resolves_to_loaded_plugin() {
        let (_, mut manager) = manager();

        manager.register_factory(
            "Fixed",
            Box::new(|_: ConsoleRef| -> Box<dyn Plugin> {
                Box::new(Fixed {
                    name: "Fixed Plugin",
                    functions: vec!["f"],
                })
            }),
        );

        let plugin = manager.create("FIXED").expect("factory is case-insensitive");
        manager.install(plugin);
        manager.record_alias("fixed", "Fixed Plugin");

        assert_eq!(manager.resolve_name("Fixed"), Some("Fixed Plugin".to_string()));
        assert!(manager.unload("fixed").is_some());
        assert_eq!(manager.resolve_name("fixed"), None);
        assert!(!manager.is_function_available("f"));
    }

    #[test]
    fn failing_function_reports_and_yields_null() {
        struct Failing;

        impl Plugin for Failing {
            fn name(&self) -> &str {
                "Failing"
            }

            fn version(&self) -> &str {
                "1"
            }

            fn description(&self) -> &str {
                ""
            }

            fn functions(&self) -> Vec<PluginFunction> {
                vec![PluginFunction::new("boom", "", |_| {
                    Err(NativeError::custom("bad input"))
                })]
            }
        }

        let (console, mut manager) = manager();
        manager.install(Box::new(Failing));

        assert_eq!(manager.call("boom", &[]), Value::Null);
        assert_eq!(console.lines(), vec!["Error executing function boom: bad input"]);
    }
}
