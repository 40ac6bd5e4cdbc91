mod console;
mod diagnostics;
mod encoder;
mod error;
mod instruction;
mod lexer;
mod memory;
mod parser;
mod program;
mod runner;
mod span;
mod token;

pub use console::{Console, NumberInput, SharedBuffer, StdConsole};
pub use diagnostics::{Diagnostic, Diagnostics, Location, Severity};
pub use encoder::{SourceBuilder, encode};
pub use error::RuntimeError;
pub use instruction::{Family, Instruction, Label, Value};
pub use lexer::Lexer;
pub use memory::Memory;
pub use parser::{ParseError, ParseErrorKind, Parser, parse, parse_reader};
pub use program::{Located, Program};
pub use runner::{
    Captured, ErrorPolicy, LabelResolution, Outcome, Runner, RunnerSettings, run_captured,
};
pub use span::{Pos, Span};
pub use token::{Token, TokenKind};
