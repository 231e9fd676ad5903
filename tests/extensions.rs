#[cfg(test)]
mod extension_tests {
    use std::rc::Rc;

    use pretty_assertions::assert_eq;
    use sharp_script as sharp;

    use sharp::console::{BufferConsole, ConsoleRef};
    use sharp::error::{NativeError, SharpError};
    use sharp::interpreter::Interpreter;
    use sharp::plugin::{ParameterInfo, Plugin, PluginFunction, PluginHost};
    use sharp::value::{Function, HostObject, Value};

    fn interpreter() -> (Rc<BufferConsole>, Interpreter) {
        let console = Rc::new(BufferConsole::new());
        let interpreter = Interpreter::with_console(console.clone());

        (console, interpreter)
    }

    /// Plugin whose functions announce themselves on the console.
    struct Announcer {
        name: &'static str,
        functions: Vec<&'static str>,
        console: ConsoleRef,
    }

    impl Announcer {
        fn boxed(name: &'static str, functions: Vec<&'static str>, console: ConsoleRef) -> Box<dyn Plugin> {
            Box::new(Announcer {
                name,
                functions,
                console,
            })
        }
    }

    impl Plugin for Announcer {
        fn name(&self) -> &str {
            self.name
        }

        fn version(&self) -> &str {
            "2.0"
        }

        fn description(&self) -> &str {
            "prints which plugin handled a call"
        }

        fn functions(&self) -> Vec<PluginFunction> {
            self.functions
                .iter()
                .map(|function| {
                    let console: ConsoleRef = self.console.clone();
                    let owner: &'static str = self.name;

                    PluginFunction::new(function, "", move |_| {
                        console.write_line(&format!("handled by {}", owner));
                        Ok(Value::Null)
                    })
                })
                .collect()
        }
    }

    // ─── function registry ──────────────────────────────────────────────────

    #[test]
    fn test_registry_functions_are_callable_from_scripts() {
        let (console, mut interpreter) = interpreter();

        interpreter
            .registry_mut()
            .register2("Add", "Adds two numbers", |a: f64, b: f64| a + b);
        interpreter
            .registry_mut()
            .register1("Shout", "Upper-cases text", |s: String| s.to_uppercase());
        interpreter
            .registry_mut()
            .register1("IsOn", "", |flag: bool| if flag { "on" } else { "off" });

        interpreter.run_source(r#"print(Add(2, 3)); print(Shout("hey")); print(IsOn("TRUE")); print(IsOn(null));"#);

        assert_eq!(console.lines(), vec!["5", "HEY", "on", "off"]);
    }

    #[test]
    fn test_registry_failures_are_soft() {
        let (console, mut interpreter) = interpreter();

        interpreter
            .registry_mut()
            .register1("Twice", "", |n: i64| n * 2);
        interpreter.registry_mut().register("Fail", "", |_| {
            Err(NativeError::custom("host refused"))
        });

        let errors = interpreter.run_source(
            r#"print(Twice("21")); print(Twice("abc")); print(Twice()); print(Fail(1, 2)); print("after");"#,
        );

        assert!(errors.is_empty());
        assert_eq!(
            console.lines(),
            vec![
                "42",
                "Error executing function 'Twice': Cannot convert abc to type int",
                "null",
                "Error executing function 'Twice': Function 'Twice' requires 1 argument(s)",
                "null",
                "Error executing function 'Fail': host refused",
                "null",
                "after",
            ]
        );
    }

    #[test]
    fn test_registry_wins_over_user_function_and_unregister_restores_it() {
        let (console, mut interpreter) = interpreter();

        interpreter
            .registry_mut()
            .register0("Hello", "", || "from registry");

        interpreter.run_source(r#"function Hello() { return "from script"; } print(Hello());"#);
        interpreter.registry_mut().unregister("Hello");
        interpreter.run_source("print(Hello());");

        assert_eq!(console.lines(), vec!["from registry", "from script"]);
        assert!(!interpreter.registry().is_registered("Hello"));
    }

    #[test]
    fn test_registry_listing_includes_descriptions() {
        let (_, mut interpreter) = interpreter();

        interpreter.registry_mut().register0("B", "second", || 2i64);
        interpreter.registry_mut().register0("A", "first", || 1i64);

        let listed: Vec<(&str, &str)> = interpreter
            .registry()
            .functions()
            .into_iter()
            .map(|f| (f.name.as_str(), f.description.as_str()))
            .collect();

        assert_eq!(listed, vec![("A", "first"), ("B", "second")]);
    }

    #[test]
    fn test_host_objects_pass_through_scripts_untouched() {
        #[derive(Debug, PartialEq)]
        struct Connection {
            id: i64,
        }

        let (console, mut interpreter) = interpreter();

        interpreter
            .registry_mut()
            .register0("Open", "", || Value::Host(HostObject::new(Connection { id: 7 })));
        interpreter.registry_mut().register1("ConnectionId", "", |v: Value| match v {
            Value::Host(handle) => handle.downcast_ref::<Connection>().map(|c| c.id),
            _ => None,
        });

        let errors = interpreter.run_source(
            r#"
                var h = Open();
                var same = h;
                print(h == same);
                print(h == Open());
                print(h);
                print(ConnectionId(same));
                print(ConnectionId(1));
            "#,
        );

        assert!(errors.is_empty());
        assert_eq!(
            console.lines(),
            vec!["true", "false", "<host object>", "7", "null"]
        );

        let stored: Value = interpreter
            .globals()
            .borrow()
            .get("h", 0)
            .expect("h is defined");
        let Value::Host(handle) = stored else {
            panic!("expected a host object, got {:?}", stored);
        };

        assert_eq!(handle.downcast_ref::<Connection>(), Some(&Connection { id: 7 }));
        assert_eq!(handle.downcast_ref::<String>(), None);
    }

    // ─── plugins ────────────────────────────────────────────────────────────

    #[test]
    fn test_plugin_function_wins_over_user_function() {
        let (console, mut interpreter) = interpreter();

        interpreter
            .load_plugin(Announcer::boxed("Shadow", vec!["foo"], console.clone()))
            .expect("plugin loads");
        console.clear();

        interpreter.run_source(r#"function foo() { print("handled by script"); } foo();"#);

        assert_eq!(console.lines(), vec!["handled by Shadow"]);
    }

    #[test]
    fn test_builtins_then_plugins_then_registry_then_script() {
        let (console, mut interpreter) = interpreter();

        interpreter.registry_mut().register0("foo", "", || "registry foo");
        interpreter
            .load_plugin(Announcer::boxed("Both", vec!["foo", "length"], console.clone()))
            .expect("plugin loads");
        console.clear();

        interpreter.run_source(
            r#"function foo() { return "script foo"; } print(foo()); print(length("abc"));"#,
        );

        assert_eq!(console.lines(), vec!["handled by Both", "null", "3"]);

        interpreter.unload_plugin("Both");
        console.clear();
        interpreter.run_source("print(foo());");

        assert_eq!(console.lines(), vec!["registry foo"]);
    }

    #[test]
    fn test_reloading_plugin_drops_functions_it_no_longer_exposes() {
        let (console, mut interpreter) = interpreter();

        interpreter
            .load_plugin(Announcer::boxed("P", vec!["a", "b"], console.clone()))
            .expect("first version loads");
        interpreter
            .load_plugin(Announcer::boxed("P", vec!["a"], console.clone()))
            .expect("second version loads");
        console.clear();

        let errors = interpreter.run_source("a(); print(b);");

        assert_eq!(
            console.lines(),
            vec!["handled by P", "Runtime error: Undefined variable 'b'. [line 1]"]
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(interpreter.loaded_plugins(), vec!["P"]);

        assert!(interpreter.unload_plugin("P"));
        console.clear();
        interpreter.run_source("print(a);");

        assert_eq!(
            console.lines(),
            vec!["Runtime error: Undefined variable 'a'. [line 1]"]
        );
    }

    #[test]
    fn test_plugin_load_messages_and_global_stubs() {
        let (console, mut interpreter) = interpreter();

        interpreter
            .load_plugin(Announcer::boxed("Greeter", vec!["greet", "wave"], console.clone()))
            .expect("plugin loads");

        interpreter.run_source("print(greet); listPlugins();");

        assert_eq!(
            console.lines(),
            vec![
                "Loading plugin: Greeter v2.0",
                "  Registered function: greet",
                "  Registered function: wave",
                "Plugin Greeter loaded successfully",
                "<function greet>",
                "Loaded plugins: Greeter",
            ]
        );
        assert_eq!(interpreter.loaded_plugins(), vec!["Greeter"]);
    }

    #[test]
    fn test_unload_keeps_functions_owned_by_other_plugins() {
        let (console, mut interpreter) = interpreter();

        interpreter
            .load_plugin(Announcer::boxed("A", vec!["shared", "onlyA"], console.clone()))
            .expect("A loads");
        interpreter
            .load_plugin(Announcer::boxed("B", vec!["shared", "onlyB"], console.clone()))
            .expect("B loads");
        console.clear();

        let errors = interpreter.run_source(r#"print(unloadPlugin("A")); shared(); onlyB(); onlyA();"#);

        assert_eq!(
            console.lines(),
            vec![
                "Plugin A unloaded",
                "true",
                "handled by B",
                "handled by B",
                "Runtime error: Undefined variable 'onlyA'. [line 1]",
            ]
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(interpreter.loaded_plugins(), vec!["B"]);
    }

    #[test]
    fn test_unloading_unknown_plugin_or_without_argument() {
        let (console, mut interpreter) = interpreter();

        interpreter.run_source(r#"print(unloadPlugin("Nothing")); print(unloadPlugin());"#);

        assert_eq!(console.lines(), vec!["true", "false"]);
        assert!(!interpreter.unload_plugin("Nothing"));
    }

    #[test]
    fn test_plugin_errors_are_reported_and_yield_null() {
        struct Faulty;

        impl Plugin for Faulty {
            fn name(&self) -> &str {
                "Faulty"
            }

            fn version(&self) -> &str {
                "0.0.1"
            }

            fn description(&self) -> &str {
                ""
            }

            fn functions(&self) -> Vec<PluginFunction> {
                vec![PluginFunction::new("explode", "", |_| {
                    Err(NativeError::custom("kaboom"))
                })
                .param(ParameterInfo::new("x", "any").optional(Value::Null))]
            }
        }

        let (console, mut interpreter) = interpreter();
        interpreter.load_plugin(Box::new(Faulty)).expect("loads");
        console.clear();

        interpreter.run_source("print(explode());");

        assert_eq!(
            console.lines(),
            vec!["Error executing function explode: kaboom", "null"]
        );
    }

    #[test]
    fn test_initialize_uses_host_capabilities() {
        struct Wiring;

        impl Plugin for Wiring {
            fn name(&self) -> &str {
                "Wiring"
            }

            fn version(&self) -> &str {
                "1.0"
            }

            fn description(&self) -> &str {
                "registers through the host"
            }

            fn initialize(&mut self, host: &mut dyn PluginHost) -> sharp::error::Result<()> {
                host.registry()
                    .register1("Square", "", |n: f64| n * n);
                host.define_function("marker", Function::native("marker", vec![]));
                host.console().write_line("wired");

                Ok(())
            }

            fn functions(&self) -> Vec<PluginFunction> {
                Vec::new()
            }
        }

        let (console, mut interpreter) = interpreter();
        interpreter.load_plugin(Box::new(Wiring)).expect("loads");
        console.clear();

        interpreter.run_source("print(Square(4)); print(marker);");

        assert_eq!(console.lines(), vec!["16", "<function marker>"]);
    }

    #[test]
    fn test_failed_initialization_aborts_load() {
        struct Broken;

        impl Plugin for Broken {
            fn name(&self) -> &str {
                "Broken"
            }

            fn version(&self) -> &str {
                "1.0"
            }

            fn description(&self) -> &str {
                ""
            }

            fn initialize(&mut self, _host: &mut dyn PluginHost) -> sharp::error::Result<()> {
                Err(SharpError::plugin("missing dependency"))
            }

            fn functions(&self) -> Vec<PluginFunction> {
                vec![PluginFunction::new("never", "", |_| Ok(Value::Null))]
            }
        }

        let (console, mut interpreter) = interpreter();

        assert!(interpreter.load_plugin(Box::new(Broken)).is_err());
        assert_eq!(
            console.lines(),
            vec![
                "Loading plugin: Broken v1.0",
                "Failed to load plugin 'Broken': Plugin error: missing dependency",
            ]
        );
        assert!(interpreter.loaded_plugins().is_empty());
        assert!(!interpreter.plugins().is_function_available("never"));
    }

    #[test]
    fn test_host_factories_resolve_case_insensitively() {
        let (console, mut interpreter) = interpreter();

        interpreter.register_plugin_factory(
            "echo",
            Box::new(|console: ConsoleRef| Announcer::boxed("Echo Plugin", vec!["echo"], console)),
        );

        interpreter.run_source(r#"print(loadPlugin("ECHO")); echo(); print(unloadPlugin("Echo"));"#);

        assert_eq!(
            console.lines(),
            vec![
                "Loading plugin: Echo Plugin v2.0",
                "  Registered function: echo",
                "Plugin Echo Plugin loaded successfully",
                "true",
                "handled by Echo Plugin",
                "Plugin Echo Plugin unloaded",
                "true",
            ]
        );
        assert!(interpreter.loaded_plugins().is_empty());
    }

    // ─── bundled lambda plugin ──────────────────────────────────────────────

    #[test]
    fn test_unknown_plugin_name() {
        let (console, mut interpreter) = interpreter();

        interpreter.run_source(r#"print(loadPlugin("nope"));"#);

        assert_eq!(console.lines(), vec!["Plugin 'nope' not found", "false"]);
        assert!(matches!(
            interpreter.load_plugin_by_name("nope"),
            Err(SharpError::Plugin(message)) if message == "Plugin 'nope' not found"
        ));
    }

    #[test]
    fn test_bundled_plugin_loads_under_any_alias() {
        for alias in ["csharp", "CSharpSyntax", "Lambda"] {
            let (console, mut interpreter) = interpreter();

            interpreter.run_source(&format!("loadPlugin(\"{}\");", alias));

            assert_eq!(
                console.lines(),
                vec![
                    "Loading plugin: Lambda Syntax Plugin v1.0.0",
                    "  Registered function: CreateFunction",
                    "  Registered function: TypeOf",
                    "  Registered function: Cast",
                    "Plugin Lambda Syntax Plugin loaded successfully",
                ],
                "alias {}",
                alias
            );
        }
    }

    #[test]
    fn test_bundled_type_helpers() {
        let (console, mut interpreter) = interpreter();

        interpreter.run_source(
            r#"
            loadPlugin("lambda");
            class K { }
            function f() { }
            print(TypeOf(1));
            print(TypeOf("s"));
            print(TypeOf(true));
            print(TypeOf(null));
            print(TypeOf(f));
            print(TypeOf(K));
            print(TypeOf());
            print(Cast("3.9", "int"));
            print(Cast(2.5, "string") + "!");
            print(Cast("yes", "bool"));
            print(Cast(1, "Boolean"));
            print(Cast("x", "date"));
            print(Cast(1));
            "#,
        );

        assert_eq!(
            console.lines()[5..].to_vec(),
            vec![
                "number", "string", "boolean", "null", "function", "instance", "null", "3",
                "2.5!", "false", "true", "x", "null",
            ]
        );
    }

    #[test]
    fn test_create_function_translates_lambda() {
        let (console, mut interpreter) = interpreter();

        interpreter.run_source(
            r#"
            loadPlugin("csharp");
            print(CreateFunction("Sum", "(a: int, b: int) => { return a + b; }"));
            print(CreateFunction("Only"));
            print(CreateFunction("Bad", "(a) => { return a + ; }"));
            "#,
        );

        assert_eq!(
            console.lines()[5..].to_vec(),
            vec![
                "Created script function:",
                "function Sum(a, b) {",
                "    return a + b;",
                "}",
                "Function Sum created successfully",
                "true",
                "CreateFunction requires 2 arguments: function name and function body",
                "false",
                "Error creating function Bad: [line 2, column 16] Error: Expected expression, found ';'",
                "false",
            ]
        );
    }

    #[test]
    fn test_unloading_bundled_plugin_by_alias_removes_stubs() {
        let (console, mut interpreter) = interpreter();

        let errors = interpreter.run_source(
            r#"loadPlugin("csharp"); print(unloadPlugin("csharp")); listPlugins(); print(TypeOf(1));"#,
        );

        assert_eq!(
            console.lines()[5..].to_vec(),
            vec![
                "Plugin Lambda Syntax Plugin unloaded",
                "true",
                "Loaded plugins: ",
                "Runtime error: Undefined variable 'TypeOf'. [line 1]",
            ]
        );
        assert_eq!(errors.len(), 1);
    }
}
