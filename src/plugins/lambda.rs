//! Lambda Syntax Plugin: typed-lambda translation and small type helpers.
//!
//! | Function          | Result                                               |
//! |-------------------|------------------------------------------------------|
//! | `CreateFunction`  | translates `(a: int) => { return a; }` into script source |
//! | `TypeOf`          | type name of a value                                 |
//! | `Cast`            | value converted to `int`/`number`/`string`/`bool`    |

use log::debug;

use crate::console::ConsoleRef;
use crate::error::Result;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::plugin::{ParameterInfo, Plugin, PluginFunction, PluginHost};
use crate::value::Value;

pub struct LambdaSyntaxPlugin {
    console: ConsoleRef,
    functions: Vec<PluginFunction>,
}

impl LambdaSyntaxPlugin {
    pub fn new(console: ConsoleRef) -> Self {
        Self {
            console,
            functions: Vec::new(),
        }
    }

    fn create_function(console: ConsoleRef) -> PluginFunction {
        PluginFunction::new(
            "CreateFunction",
            "Creates a script function from typed-lambda notation",
            move |args| {
                if args.len() < 2 {
                    console.write_line(
                        "CreateFunction requires 2 arguments: function name and function body",
                    );

                    return Ok(Value::Bool(false));
                }

                let name: String = args[0].to_string();
                let source: String = translate_lambda(&name, &args[1].to_string());

                let tokens = Lexer::new(&source).tokenize();
                let mut parser = Parser::new(&tokens);
                parser.parse();

                if let Some(error) = parser.errors().first() {
                    console.write_line(&format!("Error creating function {}: {}", name, error));

                    return Ok(Value::Bool(false));
                }

                console.write_line(&format!("Created script function:\n{}", source));
                console.write_line(&format!("Function {} created successfully", name));

                Ok(Value::Bool(true))
            },
        )
        .param(ParameterInfo::new("functionName", "string"))
        .param(ParameterInfo::new("functionBody", "string"))
        .returns("bool")
    }

    fn type_of() -> PluginFunction {
        PluginFunction::new("TypeOf", "Returns the type name of a value", |args| {
            Ok(Value::from(args.first().map_or("null", Value::type_name)))
        })
        .param(ParameterInfo::new("value", "any"))
        .returns("string")
    }

    fn cast() -> PluginFunction {
        PluginFunction::new("Cast", "Converts a value to the given type", |args| {
            match args {
                [value, target, ..] => Ok(cast(value, &target.to_string().to_lowercase())),
                _ => Ok(Value::Null),
            }
        })
        .param(ParameterInfo::new("value", "any"))
        .param(ParameterInfo::new("targetType", "string"))
        .returns("any")
    }
}

impl Plugin for LambdaSyntaxPlugin {
    fn name(&self) -> &str {
        "Lambda Syntax Plugin"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn description(&self) -> &str {
        "Typed-lambda notation for defining script functions"
    }

    fn initialize(&mut self, _host: &mut dyn PluginHost) -> Result<()> {
        self.functions = vec![
            Self::create_function(self.console.clone()),
            Self::type_of(),
            Self::cast(),
        ];

        Ok(())
    }

    fn functions(&self) -> Vec<PluginFunction> {
        self.functions.clone()
    }
}

/// `(a: int, b) => { return a; }` → `function NAME(a, b) {\n    return a;\n}`.
pub fn translate_lambda(name: &str, lambda: &str) -> String {
    let mut source: String = format!("function {}(", name);

    if let (Some(open), Some(close)) = (lambda.find('('), lambda.find(')')) {
        if close > open {
            source.push_str(&parameters(&lambda[open + 1..close]).join(", "));
        }
    }

    source.push_str(") {\n");

    if let Some(arrow) = lambda.find("=>") {
        let mut body: &str = lambda[arrow + 2..].trim();

        if body.len() >= 2 && body.starts_with('{') && body.ends_with('}') {
            body = body[1..body.len() - 1].trim();
        }

        let statement: &str = match body.strip_prefix("return") {
            Some(value) => {
                source.push_str("    return ");
                value.trim().trim_end_matches(';')
            }
            None => {
                source.push_str("    ");
                body.trim_end_matches(';')
            }
        };

        source.push_str(statement);
        source.push_str(";\n");
    }

    source.push('}');

    debug!("Translated lambda for '{}':\n{}", name, source);

    source
}

/// Parameter names with their `: type` annotations removed.
fn parameters(list: &str) -> Vec<&str> {
    list.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match part.find(':') {
            Some(colon) if colon > 0 => part[..colon].trim(),
            _ => part,
        })
        .collect()
}

fn cast(value: &Value, target: &str) -> Value {
    match target {
        "int" | "number" => match value {
            Value::Number(n) if n.is_finite() => Value::Number(n.trunc()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_or_else(|_| value.clone(), |n| Value::Number(n.trunc())),
            Value::Bool(b) => Value::Number(if *b { 1.0 } else { 0.0 }),
            Value::Null => Value::Number(0.0),
            _ => value.clone(),
        },

        "string" => Value::String(value.to_string()),

        "bool" | "boolean" => match value {
            Value::String(s) => Value::Bool(s.to_lowercase() == "true"),
            Value::Number(n) => Value::Bool(*n != 0.0),
            Value::Bool(_) => value.clone(),
            Value::Null => Value::Bool(false),
            _ => value.clone(),
        },

        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_typed_lambda_with_block_body() {
        assert_eq!(
            translate_lambda("Sum", "(a: int, b: int) => { return a + b; }"),
            "function Sum(a, b) {\n    return a + b;\n}"
        );
    }

    #[test]
    fn translates_expression_body_and_untyped_parameters() {
        assert_eq!(
            translate_lambda("Show", "(x) => print(x)"),
            "function Show(x) {\n    print(x);\n}"
        );
        assert_eq!(translate_lambda("Empty", "no lambda here"), "function Empty() {\n}");
    }

    #[test]
    fn cast_table() {
        assert_eq!(cast(&Value::from("3.7"), "int"), Value::Number(3.0));
        assert_eq!(cast(&Value::Number(-2.9), "number"), Value::Number(-2.0));
        assert_eq!(cast(&Value::from("abc"), "int"), Value::from("abc"));
        assert_eq!(cast(&Value::Number(5.0), "string"), Value::from("5"));
        assert_eq!(cast(&Value::from("TRUE"), "bool"), Value::Bool(true));
        assert_eq!(cast(&Value::Number(0.0), "boolean"), Value::Bool(false));
        assert_eq!(cast(&Value::Number(1.0), "date"), Value::Number(1.0));
    }
}
