//! Console access for running programs
//!
//! `IO` functions talk to the host through [`Console`] so programs can run
//! against a terminal or against in-memory buffers.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::rc::Rc;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

pub trait Console {
    /// Write one line of program output
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Show `prompt` and read one line of input, without the newline
    fn read_line(&mut self, prompt: &str) -> io::Result<String>;
}

/// Console shared between an interpreter and its nested instances
pub type SharedConsole = Rc<RefCell<dyn Console>>;

/// Standard output plus a line editor for input
#[derive(Default)]
pub struct StdConsole {
    editor: Option<DefaultEditor>,
}

impl StdConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedConsole {
        Rc::new(RefCell::new(Self::new()))
    }
}

impl Console for StdConsole {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", line)?;
        out.flush()
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        if self.editor.is_none() {
            self.editor = Some(DefaultEditor::new().map_err(|err| io::Error::other(err.to_string()))?);
        }
        let Some(editor) = self.editor.as_mut() else {
            return Err(io::Error::other("line editor unavailable"));
        };
        match editor.readline(prompt) {
            Ok(line) => Ok(line),
            Err(ReadlineError::Eof) => Ok(String::new()),
            Err(ReadlineError::Io(err)) => Err(err),
            Err(err) => Err(io::Error::other(err.to_string())),
        }
    }
}

/// In-memory console: scripted input, captured output
#[derive(Debug, Default)]
pub struct BufferConsole {
    pub output: Vec<String>,
    pub prompts: Vec<String>,
    input: VecDeque<String>,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: lines.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

impl Console for BufferConsole {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.output.push(line.to_string());
        Ok(())
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        self.prompts.push(prompt.to_string());
        self.input
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no more input"))
    }
}
