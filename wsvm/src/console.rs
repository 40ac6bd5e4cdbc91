//! Input and output channels of a run.
//!
//! Output is written through and flushed per instruction so that prompts
//! appear before the program blocks on its next read. Input reads block on
//! the underlying reader; end of stream reads as `None`.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::instruction::Value;

/// Result of a numeric read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumberInput {
    Value(Value),
    /// A line was read but it is not a decimal integer.
    Invalid(String),
    Eof,
}

pub struct Console<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Write the low byte of `value` as a raw character.
    pub fn write_char(&mut self, value: Value) -> io::Result<()> {
        self.output.write_all(&[value as u8])?;
        self.output.flush()
    }

    /// Write `value` in ASCII decimal.
    pub fn write_number(&mut self, value: Value) -> io::Result<()> {
        write!(self.output, "{value}")?;
        self.output.flush()
    }

    /// Read exactly one byte.
    pub fn read_char(&mut self) -> io::Result<Option<u8>> {
        let byte = match self.input.fill_buf()? {
            [] => return Ok(None),
            [first, ..] => *first,
        };
        self.input.consume(1);
        Ok(Some(byte))
    }

    /// Read one line and parse it as a decimal integer.
    pub fn read_number(&mut self) -> io::Result<NumberInput> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(NumberInput::Eof);
        }
        let text = line.trim();
        Ok(match text.parse::<Value>() {
            Ok(value) => NumberInput::Value(value),
            Err(_) => NumberInput::Invalid(text.to_string()),
        })
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }
}

/// The process's standard streams.
pub type StdConsole = Console<io::StdinLock<'static>, io::Stdout>;

impl StdConsole {
    pub fn stdio() -> Self {
        Console::new(io::stdin().lock(), io::stdout())
    }
}

/// A cloneable in-memory output sink.
///
/// One handle goes into a runner's console, another stays with the host to
/// read what the program printed.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.inner.lock().clone()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
