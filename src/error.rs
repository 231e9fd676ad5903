//! Centralised error hierarchy for the **SharpScript interpreter**.
//!
//! Parse diagnostics, runtime faults and native-call failures each get their
//! own type so that the recovery policy of every layer can be expressed in the
//! type system:
//!
//! * [`SharpError::Parse`] is recorded by the parser and never aborts parsing.
//! * [`RuntimeError`] unwinds to [`Interpreter::interpret`](crate::interpreter::Interpreter::interpret).
//! * [`NativeError`] is caught at the call site of a registry or plugin
//!   function and turned into a console message plus `null`.
//!
//! The module **does not** print diagnostics itself.

use std::io;
use thiserror::Error;

use log::info;

/// Canonical error type used at the crate boundary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SharpError {
    /// Syntactic (parser) error.
    #[error("[line {line}, column {column}] Error: {message}")]
    Parse {
        /// Human‑readable description.
        message: String,

        /// 1‑based line of the offending token.
        line: usize,

        /// 1‑based column of the offending token.
        column: usize,
    },

    /// Runtime evaluation error.
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// Plugin could not be initialised or resolved.
    #[error("Plugin error: {0}")]
    Plugin(String),

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF‑8 decoding failure when ingesting script files.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl SharpError {
    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, column: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Parse error: line={}, column={}, msg={}",
            line, column, message
        );

        SharpError::Parse {
            message,
            line,
            column,
        }
    }

    /// Helper constructor for plugin failures.
    pub fn plugin<S: Into<String>>(msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Plugin error: msg={}", message);

        SharpError::Plugin(message)
    }
}

/// Faults raised while evaluating a program.  Each variant records the line of
/// the node that failed.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RuntimeError {
    #[error("Undefined variable '{name}'. [line {line}]")]
    UndefinedVariable { name: String, line: usize },

    #[error("Can only call functions. [line {line}]")]
    NotCallable { line: usize },

    #[error("Expected {expected} arguments but got {got}. [line {line}]")]
    Arity {
        expected: usize,
        got: usize,
        line: usize,
    },

    #[error("Invalid assignment target. [line {line}]")]
    InvalidAssignmentTarget { line: usize },

    #[error("{message} [line {line}]")]
    MemberNotFound { message: String, line: usize },

    #[error("Cannot assign to property '{name}' of non-object. [line {line}]")]
    PropertyOnNonObject { name: String, line: usize },

    #[error("Division by zero. [line {line}]")]
    DivisionByZero { line: usize },

    #[error("{message} [line {line}]")]
    TypeMismatch { message: String, line: usize },

    #[error("Cannot create instance of static class '{class}'. [line {line}]")]
    StaticInstantiation { class: String, line: usize },
}

impl RuntimeError {
    /// Line of the node that raised the fault.
    pub fn line(&self) -> usize {
        match self {
            RuntimeError::UndefinedVariable { line, .. }
            | RuntimeError::NotCallable { line }
            | RuntimeError::Arity { line, .. }
            | RuntimeError::InvalidAssignmentTarget { line }
            | RuntimeError::MemberNotFound { line, .. }
            | RuntimeError::PropertyOnNonObject { line, .. }
            | RuntimeError::DivisionByZero { line }
            | RuntimeError::TypeMismatch { line, .. }
            | RuntimeError::StaticInstantiation { line, .. } => *line,
        }
    }
}

/// Failure raised by a host-native callable (registry or plugin function).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum NativeError {
    /// Fewer arguments were supplied than the callable declares.
    #[error("Function '{name}' requires {expected} argument(s)")]
    MissingArguments { name: String, expected: usize },

    /// An argument could not be converted to the declared host type.
    #[error("Cannot convert {value} to type {target}")]
    Conversion { value: String, target: &'static str },

    /// Free-form failure reported by the callable itself.
    #[error("{0}")]
    Custom(String),
}

impl NativeError {
    pub fn custom<S: Into<String>>(msg: S) -> Self {
        NativeError::Custom(msg.into())
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, SharpError>;
