//! Console capability through which scripts talk to the host.
//!
//! The interpreter only ever calls [`Console::write`] / [`Console::write_line`]
//! (for `print`, diagnostics and plugin messages) and [`Console::read_line`]
//! (for `input`).  Methods take `&self` so that one console can be shared by
//! the interpreter, its registry and any plugins.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::rc::Rc;

use log::debug;

use crate::value::Value;

pub trait Console {
    fn write(&self, text: &str);

    fn write_line(&self, text: &str);

    fn write_value(&self, value: &Value) {
        self.write_line(&value.to_string());
    }

    /// Next line of input without its terminator, `None` at end of input.
    fn read_line(&self) -> Option<String>;

    /// Next character of input, `None` at end of input.
    fn read(&self) -> Option<char>;

    fn is_input_redirected(&self) -> bool;
}

/// Shared console handle.
pub type ConsoleRef = Rc<dyn Console>;

/// Console backed by the process's stdin/stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdConsole;

impl Console for StdConsole {
    fn write(&self, text: &str) {
        let mut out = io::stdout().lock();

        // A closed stdout is not something a script can act on.
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }

    fn write_line(&self, text: &str) {
        let mut out = io::stdout().lock();

        let _ = writeln!(out, "{}", text);
    }

    fn read_line(&self) -> Option<String> {
        let mut line = String::new();

        match io::stdin().lock().read_line(&mut line) {
            Ok(0) => None,

            Ok(_) => {
                let trimmed: &str = line.trim_end_matches(['\n', '\r']);

                Some(trimmed.to_string())
            }

            Err(e) => {
                debug!("stdin read failed: {}", e);
                None
            }
        }
    }

    fn read(&self) -> Option<char> {
        let mut byte = [0u8; 1];

        match io::stdin().lock().read(&mut byte) {
            Ok(1) => Some(char::from(byte[0])),
            _ => None,
        }
    }

    fn is_input_redirected(&self) -> bool {
        !io::stdin().is_terminal()
    }
}

/// In-memory console: records everything written and serves queued input.
/// Used by tests and by hosts that want to capture script output.
#[derive(Debug, Default)]
pub struct BufferConsole {
    output: RefCell<String>,
    input: RefCell<VecDeque<String>>,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Console whose `read_line` returns `lines` in order.
    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            output: RefCell::new(String::new()),
            input: RefCell::new(lines.into_iter().map(Into::into).collect()),
        }
    }

    /// Everything written so far.
    pub fn output(&self) -> String {
        self.output.borrow().clone()
    }

    /// Output split into lines (a trailing partial line is included).
    pub fn lines(&self) -> Vec<String> {
        self.output.borrow().lines().map(str::to_string).collect()
    }

    pub fn clear(&self) {
        self.output.borrow_mut().clear();
    }
}

impl Console for BufferConsole {
    fn write(&self, text: &str) {
        self.output.borrow_mut().push_str(text);
    }

    fn write_line(&self, text: &str) {
        let mut output = self.output.borrow_mut();

        output.push_str(text);
        output.push('\n');
    }

    fn read_line(&self) -> Option<String> {
        self.input.borrow_mut().pop_front()
    }

    fn read(&self) -> Option<char> {
        let mut input = self.input.borrow_mut();

        if input.front()?.is_empty() {
            input.pop_front();
            return Some('\n');
        }

        input.front_mut().map(|line| line.remove(0))
    }

    fn is_input_redirected(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_console_records_lines() {
        let console = BufferConsole::new();

        console.write("a");
        console.write_line("b");
        console.write_value(&Value::Number(3.0));

        assert_eq!(console.output(), "ab\n3\n");
        assert_eq!(console.lines(), vec!["ab", "3"]);
    }

    #[test]
    fn buffer_console_serves_input_then_end_of_stream() {
        let console = BufferConsole::with_input(["hi"]);

        assert_eq!(console.read(), Some('h'));
        assert_eq!(console.read_line(), Some("i".to_string()));
        assert_eq!(console.read_line(), None);
        assert_eq!(console.read(), None);
    }
}
