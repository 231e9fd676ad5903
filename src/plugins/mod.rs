//! Plugins shipped with the interpreter, resolvable by `loadPlugin(alias)`.

mod lambda;

pub use lambda::{translate_lambda, LambdaSyntaxPlugin};

use crate::console::ConsoleRef;
use crate::plugin::{Plugin, PluginManager};

/// Aliases under which [`LambdaSyntaxPlugin`] can be loaded.
pub const LAMBDA_ALIASES: [&str; 3] = ["csharp", "csharpsyntax", "lambda"];

fn lambda_syntax(console: ConsoleRef) -> Box<dyn Plugin> {
    Box::new(LambdaSyntaxPlugin::new(console))
}

/// Register factories for every bundled plugin.
pub fn register_bundled(manager: &mut PluginManager) {
    for alias in LAMBDA_ALIASES {
        manager.register_factory(alias, Box::new(lambda_syntax));
    }
}
