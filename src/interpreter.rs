//! Tree-walking evaluator for SharpScript programs.
//!
//! [`Interpreter::execute`] and [`Interpreter::evaluate`] are mutually
//! recursive.  A `return` travels up as [`Flow::Return`] until the nearest
//! call boundary; runtime faults travel up as [`RuntimeError`] until
//! [`Interpreter::interpret`], which reports the first one and stops.
//!
//! Call resolution for `callee(args)`:
//!
//! | Step | Callee                                   | Handled by            |
//! |------|------------------------------------------|-----------------------|
//! | 1    | identifier naming a builtin              | [`Interpreter`]       |
//! | 2    | identifier naming a plugin function      | [`PluginManager`]     |
//! | 3    | identifier naming a registry function    | [`FunctionRegistry`]  |
//! | 4    | anything evaluating to a function        | scripted call         |

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{AssignOp, BinaryOp, ClassDecl, Expr, ExprKind, Program, Stmt, StmtKind, UnaryOp};
use crate::console::{ConsoleRef, StdConsole};
use crate::environment::{EnvRef, Environment};
use crate::error::{RuntimeError, SharpError};
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::plugin::{Plugin, PluginFactory, PluginHost, PluginManager};
use crate::plugins;
use crate::registry::FunctionRegistry;
use crate::value::{Class, Function, FunctionBody, Value};

/// Convenient alias for evaluator results.
pub type IResult<T> = Result<T, RuntimeError>;

/// Outcome of executing a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Completed; carries the statement's value.
    Normal(Value),

    /// A `return` is unwinding to the enclosing call.
    Return(Value),
}

impl Flow {
    pub fn into_value(self) -> Value {
        match self {
            Flow::Normal(value) | Flow::Return(value) => value,
        }
    }
}

/// Builtin names with the parameter names of their global stubs.
const BUILTINS: [(&str, &[&str]); 6] = [
    ("print", &["value"]),
    ("input", &["prompt"]),
    ("length", &["value"]),
    ("loadPlugin", &["pluginName"]),
    ("unloadPlugin", &["pluginName"]),
    ("listPlugins", &[]),
];

fn is_builtin(name: &str) -> bool {
    BUILTINS.iter().any(|(builtin, _)| *builtin == name)
}

/// [`PluginHost`] handed to a plugin while it initializes.
struct Registration<'i> {
    globals: &'i EnvRef,
    registry: &'i mut FunctionRegistry,
    console: &'i ConsoleRef,
}

impl PluginHost for Registration<'_> {
    fn define_function(&mut self, name: &str, function: Function) {
        debug!("Plugin defined global function '{}'", name);

        self.globals
            .borrow_mut()
            .define(name, Value::Function(Rc::new(function)));
    }

    fn registry(&mut self) -> &mut FunctionRegistry {
        &mut *self.registry
    }

    fn console(&self) -> ConsoleRef {
        Rc::clone(self.console)
    }
}

pub struct Interpreter {
    globals: EnvRef,
    console: ConsoleRef,
    registry: FunctionRegistry,
    plugins: PluginManager,

    /// Global stubs bound for plugin functions, by function name.
    plugin_stubs: HashMap<String, Rc<Function>>,
}

impl Interpreter {
    /// Interpreter talking to stdin/stdout.
    pub fn new() -> Self {
        Self::with_console(Rc::new(StdConsole))
    }

    pub fn with_console(console: ConsoleRef) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef = Environment::new_ref();

        for (name, params) in BUILTINS {
            debug!("Defining builtin '{}'", name);

            let stub = Function::native(name, params.iter().map(|p| p.to_string()).collect());
            globals
                .borrow_mut()
                .define(name, Value::Function(Rc::new(stub)));
        }

        let mut plugins = PluginManager::new(Rc::clone(&console));
        plugins::register_bundled(&mut plugins);

        Self {
            globals,
            registry: FunctionRegistry::new(Rc::clone(&console)),
            plugins,
            plugin_stubs: HashMap::new(),
            console,
        }
    }

    pub fn console(&self) -> &ConsoleRef {
        &self.console
    }

    pub fn globals(&self) -> &EnvRef {
        &self.globals
    }

    /// Bind `function` under `name` in the global environment.
    pub fn register_function(&mut self, name: &str, function: Function) {
        info!("Registering global function '{}'", name);

        self.globals
            .borrow_mut()
            .define(name, Value::Function(Rc::new(function)));
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.registry
    }

    pub fn plugins(&self) -> &PluginManager {
        &self.plugins
    }

    /// Make `loadPlugin(alias)` build plugins with `factory`.
    pub fn register_plugin_factory(&mut self, alias: &str, factory: PluginFactory) {
        self.plugins.register_factory(alias, factory);
    }

    /// Names of the loaded plugins, in load order.
    pub fn loaded_plugins(&self) -> Vec<String> {
        self.plugins.plugin_names()
    }

    // ─── plugins ────────────────────────────────────────────────────────────

    pub fn load_plugin(&mut self, mut plugin: Box<dyn Plugin>) -> Result<(), SharpError> {
        let name: String = plugin.name().to_string();

        self.console
            .write_line(&format!("Loading plugin: {} v{}", name, plugin.version()));

        let mut host = Registration {
            globals: &self.globals,
            registry: &mut self.registry,
            console: &self.console,
        };

        if let Err(e) = plugin.initialize(&mut host) {
            self.console
                .write_line(&format!("Failed to load plugin '{}': {}", name, e));

            return Err(e);
        }

        let installed = self.plugins.install(plugin);
        self.remove_stubs(installed.replaced);

        for function in installed.exposed {
            let stub: Rc<Function> = Rc::new(function.stub());

            self.globals
                .borrow_mut()
                .define(&function.name, Value::Function(Rc::clone(&stub)));
            self.plugin_stubs.insert(function.name.clone(), stub);

            self.console
                .write_line(&format!("  Registered function: {}", function.name));
        }

        self.console
            .write_line(&format!("Plugin {} loaded successfully", name));

        info!("Plugin '{}' loaded", name);

        Ok(())
    }

    /// Load a plugin through a registered factory alias (case-insensitive).
    pub fn load_plugin_by_name(&mut self, alias: &str) -> Result<(), SharpError> {
        let Some(plugin) = self.plugins.create(alias) else {
            let message: String = format!("Plugin '{}' not found", alias);
            self.console.write_line(&message);

            return Err(SharpError::plugin(message));
        };

        let name: String = plugin.name().to_string();

        self.load_plugin(plugin)?;
        self.plugins.record_alias(alias, &name);

        Ok(())
    }

    /// Unload by plugin name or load alias.  Returns whether a plugin was
    /// unloaded.
    pub fn unload_plugin(&mut self, name: &str) -> bool {
        let Some(removed) = self.plugins.unload(name) else {
            debug!("No loaded plugin matches '{}'", name);
            return false;
        };

        self.remove_stubs(removed);

        true
    }

    /// Drop the global stubs of `functions` that are still bound to the
    /// stub this interpreter defined.
    fn remove_stubs(&mut self, functions: Vec<String>) {
        let mut globals = self.globals.borrow_mut();

        for function in functions {
            let Some(stub) = self.plugin_stubs.remove(&function) else {
                continue;
            };

            let still_stub: bool = matches!(
                globals.get_local(&function),
                Some(Value::Function(bound)) if Rc::ptr_eq(bound, &stub)
            );

            if still_stub {
                globals.remove(&function);
            }
        }
    }

    // ─── entry points ───────────────────────────────────────────────────────

    /// Execute `program` against the global environment.  The first runtime
    /// error is written to the console as `Runtime error: ...` and stops the
    /// remaining statements.
    pub fn interpret(&mut self, program: &Program) -> IResult<()> {
        debug!("Interpreting {} statements", program.len());

        let globals: EnvRef = Rc::clone(&self.globals);

        for stmt in &program.statements {
            debug!("Executing statement at {}", stmt.pos);

            match self.execute(stmt, &globals) {
                Ok(Flow::Normal(_)) => {}

                Ok(Flow::Return(value)) => {
                    info!("Top-level return with {}; stopping", value);
                    return Ok(());
                }

                Err(e) => {
                    info!("Interpretation stopped: {}", e);

                    self.console.write_line(&format!("Runtime error: {}", e));

                    return Err(e);
                }
            }
        }

        info!("Interpretation completed successfully");

        Ok(())
    }

    /// Lex, parse and run `source`.  Returns the parse diagnostics followed by
    /// the runtime error, if any.
    pub fn run_source(&mut self, source: &str) -> Vec<SharpError> {
        let tokens = Lexer::new(source).tokenize();
        let mut parser = Parser::new(&tokens);
        let program: Program = parser.parse();
        let mut errors: Vec<SharpError> = parser.take_errors();

        if let Err(e) = self.interpret(&program) {
            errors.push(SharpError::Runtime(e));
        }

        errors
    }

    // ─── statements ─────────────────────────────────────────────────────────

    pub fn execute(&mut self, stmt: &Stmt, env: &EnvRef) -> IResult<Flow> {
        match &stmt.kind {
            StmtKind::Expression(expr) => Ok(Flow::Normal(self.evaluate(expr, env)?)),

            StmtKind::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr, env)?,
                    None => Value::Null,
                };

                debug!("Defining variable '{}' = {}", name, value);

                env.borrow_mut().define(name, value.clone());

                Ok(Flow::Normal(value))
            }

            StmtKind::Return(value) => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr, env)?,
                    None => Value::Null,
                };

                Ok(Flow::Return(value))
            }

            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition, env)?.is_truthy() {
                    self.execute(then_branch, env)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch, env)
                } else {
                    Ok(Flow::Normal(Value::Null))
                }
            }

            StmtKind::While { condition, body } => {
                let mut last: Value = Value::Null;

                while self.evaluate(condition, env)?.is_truthy() {
                    match self.execute(body, env)? {
                        Flow::Normal(value) => last = value,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }

                Ok(Flow::Normal(last))
            }

            StmtKind::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                let loop_env: EnvRef = Environment::child(env);

                if let Some(initializer) = initializer {
                    self.execute(initializer, &loop_env)?;
                }

                let mut last: Value = Value::Null;

                loop {
                    if let Some(condition) = condition {
                        if !self.evaluate(condition, &loop_env)?.is_truthy() {
                            break;
                        }
                    }

                    match self.execute(body, &loop_env)? {
                        Flow::Normal(value) => last = value,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }

                    if let Some(increment) = increment {
                        self.evaluate(increment, &loop_env)?;
                    }
                }

                Ok(Flow::Normal(last))
            }

            StmtKind::Block(statements) => self.execute_block(statements, Environment::child(env)),

            StmtKind::Function(decl) => {
                debug!("Defining function '{}'", decl.name);

                let function = Rc::new(Function::from_decl(decl, Rc::clone(env)));
                env.borrow_mut()
                    .define(&decl.name, Value::Function(Rc::clone(&function)));

                Ok(Flow::Normal(Value::Function(function)))
            }

            StmtKind::Class(decl) => self.execute_class(decl, env),

            StmtKind::Property(decl) => {
                let value: Value = match &decl.initializer {
                    Some(expr) => self.evaluate(expr, env)?,
                    None => Value::Null,
                };

                env.borrow_mut().define(&decl.name, value.clone());

                Ok(Flow::Normal(value))
            }
        }
    }

    /// Run `statements` in `env`.  The Normal value is that of the last
    /// statement.
    pub fn execute_block(&mut self, statements: &[Stmt], env: EnvRef) -> IResult<Flow> {
        let mut last: Value = Value::Null;

        for stmt in statements {
            match self.execute(stmt, &env)? {
                Flow::Normal(value) => last = value,
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }

        Ok(Flow::Normal(last))
    }

    fn execute_class(&mut self, decl: &ClassDecl, env: &EnvRef) -> IResult<Flow> {
        debug!("Declaring class '{}' (static: {})", decl.name, decl.is_static);

        let class_env: EnvRef = Environment::child(env);
        let mut class = Class::new(decl.name.as_str(), decl.is_static);

        for member in &decl.members {
            match &member.kind {
                StmtKind::Function(method) => {
                    class.methods.insert(
                        method.name.clone(),
                        Rc::new(Function::from_decl(method, Rc::clone(&class_env))),
                    );
                }

                StmtKind::Property(property) => {
                    let value: Value = match &property.initializer {
                        Some(expr) => self.evaluate(expr, &class_env)?,
                        None => Value::Null,
                    };

                    class.properties.insert(property.name.clone(), value);
                }

                other => debug!("Ignoring non-member statement in class body: {:?}", other),
            }
        }

        let class = Rc::new(class);
        env.borrow_mut()
            .define(&decl.name, Value::Class(Rc::clone(&class)));

        info!("Class '{}' declared", decl.name);

        Ok(Flow::Normal(Value::Class(class)))
    }

    // ─── expressions ────────────────────────────────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr, env: &EnvRef) -> IResult<Value> {
        let line: usize = expr.line();

        match &expr.kind {
            ExprKind::Number(n) => Ok(Value::Number(*n)),

            ExprKind::Str(s) => Ok(Value::String(s.clone())),

            ExprKind::Bool(b) => Ok(Value::Bool(*b)),

            ExprKind::Null => Ok(Value::Null),

            ExprKind::Identifier(name) => self.lookup(name, env, line),

            ExprKind::Binary { left, op, right } => {
                let left: Value = self.evaluate(left, env)?;
                let right: Value = self.evaluate(right, env)?;

                binary(*op, left, right, line)
            }

            ExprKind::Unary { op, operand } => {
                let value: Value = self.evaluate(operand, env)?;

                Ok(match op {
                    UnaryOp::Negate => Value::Number(-value.as_number()),
                    UnaryOp::Not => Value::Bool(!value.is_truthy()),
                })
            }

            ExprKind::Call { callee, args } => self.call(callee, args, env, line),

            ExprKind::Member { object, name } => {
                let object: Value = self.evaluate(object, env)?;

                member(&object, name, line)
            }

            ExprKind::Assign { target, op, value } => self.assign(target, *op, value, env, line),
        }
    }

    /// Variable lookup.  A class name evaluates to a fresh instance.
    fn lookup(&self, name: &str, env: &EnvRef, line: usize) -> IResult<Value> {
        let value: Value = env.borrow().get(name, line)?;

        match value {
            Value::Class(class) => {
                debug!("Instantiating class '{}'", class.name);
                Class::instantiate(&class, line).map(Value::Instance)
            }

            value => Ok(value),
        }
    }

    fn assign(
        &mut self,
        target: &Expr,
        op: AssignOp,
        value: &Expr,
        env: &EnvRef,
        line: usize,
    ) -> IResult<Value> {
        let value: Value = self.evaluate(value, env)?;

        match &target.kind {
            ExprKind::Identifier(name) => {
                let stored: Value = match op {
                    AssignOp::Assign => value,
                    AssignOp::AddAssign | AssignOp::SubAssign => {
                        let current: Value = env.borrow().get(name, line)?;
                        combine(op, &current, &value)
                    }
                };

                env.borrow_mut().assign(name, stored.clone(), line)?;

                Ok(stored)
            }

            ExprKind::Member { object, name } => {
                let Value::Instance(instance) = self.evaluate(object, env)? else {
                    return Err(RuntimeError::PropertyOnNonObject {
                        name: name.clone(),
                        line,
                    });
                };

                let stored: Value = match op {
                    AssignOp::Assign => value,
                    AssignOp::AddAssign | AssignOp::SubAssign => {
                        let current: Value = instance.field(name).unwrap_or(Value::Number(0.0));
                        combine(op, &current, &value)
                    }
                };

                instance.set(name, stored.clone());

                Ok(stored)
            }

            _ => Err(RuntimeError::InvalidAssignmentTarget { line }),
        }
    }

    // ─── calls ──────────────────────────────────────────────────────────────

    fn call(&mut self, callee: &Expr, args: &[Expr], env: &EnvRef, line: usize) -> IResult<Value> {
        if let ExprKind::Identifier(name) = &callee.kind {
            if is_builtin(name) {
                let args: Vec<Value> = self.evaluate_args(args, env)?;
                return Ok(self.call_builtin(name, &args));
            }

            if self.plugins.is_function_available(name) {
                let args: Vec<Value> = self.evaluate_args(args, env)?;
                return Ok(self.plugins.call(name, &args));
            }

            if self.registry.is_registered(name) {
                let args: Vec<Value> = self.evaluate_args(args, env)?;
                debug!("Dispatching '{}' to the function registry", name);
                return Ok(self.registry.call(name, &args));
            }
        }

        match self.evaluate(callee, env)? {
            Value::Function(function) => self.call_function(&function, args, env, line),
            _ => Err(RuntimeError::NotCallable { line }),
        }
    }

    fn evaluate_args(&mut self, args: &[Expr], env: &EnvRef) -> IResult<Vec<Value>> {
        args.iter().map(|arg| self.evaluate(arg, env)).collect()
    }

    fn call_function(
        &mut self,
        function: &Rc<Function>,
        args: &[Expr],
        env: &EnvRef,
        line: usize,
    ) -> IResult<Value> {
        if args.len() != function.arity() {
            return Err(RuntimeError::Arity {
                expected: function.arity(),
                got: args.len(),
                line,
            });
        }

        debug!("Calling function '{}' with {} argument(s)", function.name, args.len());

        let closure: EnvRef = function
            .closure
            .as_ref()
            .map_or_else(|| Rc::clone(&self.globals), Rc::clone);
        let frame: EnvRef = Environment::child(&closure);

        for (param, arg) in function.params.iter().zip(args) {
            let value: Value = self.evaluate(arg, env)?;
            frame.borrow_mut().define(param, value);
        }

        let body = match &function.body {
            FunctionBody::Script(body) => Rc::clone(body),
            FunctionBody::Native => {
                debug!("Native stub '{}' called directly; yielding null", function.name);
                return Ok(Value::Null);
            }
        };

        let result: Value = self
            .execute_block(&body, Environment::child(&frame))?
            .into_value();

        debug!("Function '{}' returned {}", function.name, result);

        Ok(result)
    }

    fn call_builtin(&mut self, name: &str, args: &[Value]) -> Value {
        debug!("Calling builtin '{}'", name);

        match name {
            "print" => {
                match args.first() {
                    Some(value) => self.console.write_value(value),
                    None => self.console.write_line(""),
                }

                Value::Null
            }

            "input" => {
                if let Some(prompt) = args.first() {
                    self.console.write(&prompt.to_string());
                }

                self.console.read_line().map_or(Value::Null, Value::String)
            }

            "length" => match args.first() {
                Some(Value::String(s)) => Value::Number(s.chars().count() as f64),
                _ => Value::Number(0.0),
            },

            "loadPlugin" => match args.first() {
                Some(alias) => {
                    let loaded = self.load_plugin_by_name(&alias.to_string());

                    if let Err(e) = &loaded {
                        debug!("loadPlugin({}) failed: {}", alias, e);
                    }

                    Value::Bool(loaded.is_ok())
                }
                None => Value::Bool(false),
            },

            "unloadPlugin" => match args.first() {
                Some(plugin) => {
                    self.unload_plugin(&plugin.to_string());
                    Value::Bool(true)
                }
                None => Value::Bool(false),
            },

            "listPlugins" => {
                let names: String = self.plugins.plugin_names().join(", ");

                self.console
                    .write_line(&format!("Loaded plugins: {}", names));

                Value::String(names)
            }

            _ => Value::Null,
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("registry", &self.registry)
            .field("plugins", &self.plugins)
            .finish()
    }
}

// ─── operators ──────────────────────────────────────────────────────────────

fn binary(op: BinaryOp, left: Value, right: Value, line: usize) -> IResult<Value> {
    let (l, r) = (left.as_number(), right.as_number());

    let value: Value = match op {
        BinaryOp::Add => match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            (Value::String(_), _) | (_, Value::String(_)) => {
                Value::String(format!("{}{}", left, right))
            }
            _ => {
                return Err(RuntimeError::TypeMismatch {
                    message: format!(
                        "Operands of '+' must be two numbers or include a string (got {} and {}).",
                        left.type_name(),
                        right.type_name()
                    ),
                    line,
                })
            }
        },

        BinaryOp::Sub => Value::Number(l - r),
        BinaryOp::Mul => Value::Number(l * r),

        BinaryOp::Div => {
            if r == 0.0 {
                return Err(RuntimeError::DivisionByZero { line });
            }

            Value::Number(l / r)
        }

        BinaryOp::Mod => Value::Number(l % r),

        BinaryOp::Less => Value::Bool(l < r),
        BinaryOp::LessEqual => Value::Bool(l <= r),
        BinaryOp::Greater => Value::Bool(l > r),
        BinaryOp::GreaterEqual => Value::Bool(l >= r),

        BinaryOp::Equal => Value::Bool(left == right),
        BinaryOp::NotEqual => Value::Bool(left != right),

        BinaryOp::And => Value::Bool(left.is_truthy() && right.is_truthy()),
        BinaryOp::Or => Value::Bool(left.is_truthy() || right.is_truthy()),
    };

    Ok(value)
}

/// `current += value` / `current -= value`, numerically.
fn combine(op: AssignOp, current: &Value, value: &Value) -> Value {
    match op {
        AssignOp::SubAssign => Value::Number(current.as_number() - value.as_number()),
        _ => Value::Number(current.as_number() + value.as_number()),
    }
}

fn member(object: &Value, name: &str, line: usize) -> IResult<Value> {
    let found: Option<Value> = match object {
        Value::Instance(instance) => {
            return instance.get(name).ok_or_else(|| RuntimeError::MemberNotFound {
                message: format!(
                    "Property '{}' not found in class '{}'.",
                    name, instance.class.name
                ),
                line,
            })
        }

        Value::Class(class) => class.member(name),

        _ => None,
    };

    found.ok_or_else(|| RuntimeError::MemberNotFound {
        message: format!("Property '{}' not found.", name),
        line,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::BufferConsole;

    fn run(source: &str) -> (Rc<BufferConsole>, Vec<SharpError>) {
        let console = Rc::new(BufferConsole::new());
        let mut interpreter = Interpreter::with_console(console.clone());
        let errors = interpreter.run_source(source);

        (console, errors)
    }

    #[test]
    fn modulo_by_zero_is_nan() {
        let (console, errors) = run("print(5 % 0);");

        assert!(errors.is_empty());
        assert_eq!(console.lines(), vec!["NaN"]);
    }

    #[test]
    fn adding_booleans_is_a_type_error() {
        let (console, errors) = run("print(true + 1);");

        assert_eq!(errors.len(), 1);
        assert!(console.output().starts_with("Runtime error: Operands of '+'"));
    }

    #[test]
    fn top_level_return_stops_quietly() {
        let (console, errors) = run("print(1); return 2; print(3);");

        assert!(errors.is_empty());
        assert_eq!(console.lines(), vec!["1"]);
    }

    #[test]
    fn builtins_are_bound_as_stubs() {
        let (console, errors) = run("var p = print; print(p);");

        assert!(errors.is_empty());
        assert_eq!(console.lines(), vec!["<function print>"]);
    }
}
