//! Decodes a token stream into [`Instruction`]s.
//!
//! The grammar is a prefix tree over the three tokens: the first one or two
//! tokens select the family, the next selects the command, and some commands
//! are followed by a literal. Numbers are a sign token (space `+`, tab `-`)
//! and a bit run (space 0, tab 1, most significant first) ended by a
//! linefeed; an empty bit run is 0. Labels are a bit run with no sign and must
//! not be empty.
//!
//! A malformed instruction yields one [`ParseError`]; the tokens it consumed
//! are dropped and decoding resumes at the next token.

use std::collections::HashSet;
use std::io::Read;

use crate::diagnostics::{Diagnostic, Diagnostics, Location, Severity};
use crate::instruction::{Instruction, Label, Value};
use crate::lexer::Lexer;
use crate::program::{Located, Program};
use crate::span::{Pos, Span};
use crate::token::{Token, TokenKind};

use TokenKind::{LineFeed as L, Space as S, Tab as T};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The stream ended before the command was complete.
    TruncatedInstruction,
    /// A token prefix that selects no instruction.
    UnknownInstruction { tokens: Vec<TokenKind> },
    /// The stream ended inside a number or label.
    TruncatedLiteral,
    /// A linefeed where the sign of a number was expected.
    InvalidSign,
    EmptyLabel,
    /// The bit run does not fit in a machine integer.
    NumberOverflow { bits: usize },
    /// The source stream failed before its end.
    SourceRead { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub pos: Pos,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, pos: Pos) -> Self {
        Self { kind, pos }
    }

    pub fn code(&self) -> &'static str {
        match self.kind {
            ParseErrorKind::TruncatedInstruction => "truncated-instruction",
            ParseErrorKind::UnknownInstruction { .. } => "unknown-instruction",
            ParseErrorKind::TruncatedLiteral => "truncated-literal",
            ParseErrorKind::InvalidSign => "invalid-sign",
            ParseErrorKind::EmptyLabel => "empty-label",
            ParseErrorKind::NumberOverflow { .. } => "number-overflow",
            ParseErrorKind::SourceRead { .. } => "source-read",
        }
    }

    pub fn message(&self) -> String {
        match &self.kind {
            ParseErrorKind::TruncatedInstruction => {
                "unexpected end of input inside an instruction".to_string()
            }
            ParseErrorKind::UnknownInstruction { tokens } => {
                let letters: String = tokens.iter().map(|t| t.letter()).collect();
                let names: Vec<&str> = tokens.iter().map(|t| t.name()).collect();
                format!("unknown instruction `{letters}` ({})", names.join(" "))
            }
            ParseErrorKind::TruncatedLiteral => {
                "unexpected end of input inside a literal".to_string()
            }
            ParseErrorKind::InvalidSign => {
                "expected a sign (space or tab), found linefeed".to_string()
            }
            ParseErrorKind::EmptyLabel => "label is empty".to_string(),
            ParseErrorKind::NumberOverflow { bits } => {
                format!("number literal of {bits} bits does not fit in 64 bits")
            }
            ParseErrorKind::SourceRead { message } => {
                format!("reading the source failed, the program is incomplete: {message}")
            }
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.message(), self.pos)
    }
}

impl std::error::Error for ParseError {}

impl From<&ParseError> for Diagnostic {
    fn from(err: &ParseError) -> Self {
        Diagnostic::new(
            Severity::Error,
            err.code(),
            err.message(),
            Location::source(err.pos),
        )
    }
}

/// Streaming instruction decoder over any token iterator.
///
/// ```rust
/// use wsvm::{Instruction, Lexer, Parser};
///
/// let parsed: Vec<_> = Parser::new(Lexer::from_bytes(b"   \t\n\t\n\t"))
///     .map(|r| r.map(|located| located.instruction))
///     .collect();
/// assert_eq!(parsed, [Ok(Instruction::Push { value: 1 }), Ok(Instruction::OutputChar)]);
/// ```
pub struct Parser<I: Iterator<Item = Token>> {
    tokens: I,
    last_pos: Pos,
}

impl<I: Iterator<Item = Token>> Parser<I> {
    pub fn new(tokens: I) -> Self {
        Self {
            tokens,
            last_pos: Pos::origin(),
        }
    }

    /// Decode the whole stream, appending every problem to `diagnostics`.
    pub fn parse(self, diagnostics: &mut Diagnostics) -> Program {
        let mut marked: HashSet<Label> = HashSet::new();
        let mut located = Vec::new();

        for result in self {
            match result {
                Ok(item) => {
                    if let Instruction::Mark { label } = &item.instruction {
                        if !marked.insert(label.clone()) {
                            diagnostics.warning(
                                "duplicate-label",
                                format!("label `{label}` is marked more than once; the later mark wins"),
                                Location::source(item.span.start),
                            );
                        }
                    }
                    located.push(item);
                }
                Err(err) => diagnostics.push(Diagnostic::from(&err)),
            }
        }

        located.into_iter().collect()
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.next()?;
        self.last_pos = tok.pos;
        Some(tok)
    }

    fn command(&mut self, start: Pos) -> Result<TokenKind, ParseError> {
        self.advance().map(|t| t.kind).ok_or_else(|| {
            ParseError::new(ParseErrorKind::TruncatedInstruction, start)
        })
    }

    fn literal_token(&mut self) -> Result<Token, ParseError> {
        self.advance().ok_or_else(|| {
            ParseError::new(ParseErrorKind::TruncatedLiteral, self.last_pos)
        })
    }


    fn number(&mut self) -> Result<Value, ParseError> {
        let sign = self.literal_token()?;
        let negative = match sign.kind {
            S => false,
            T => true,
            L => {
                return Err(ParseError::new(ParseErrorKind::InvalidSign, sign.pos));
            }
        };

        // Fold as the bits arrive; an overflowed run is still read up to
        // its linefeed so decoding resumes after it.
        let mut magnitude = Some(0u64);
        let mut bits = 0;
        loop {
            let bit = match self.literal_token()?.kind {
                S => 0,
                T => 1,
                L => break,
            };
            bits += 1;
            magnitude = magnitude
                .and_then(|acc| acc.checked_mul(2))
                .and_then(|acc| acc.checked_add(bit));
        }

        let value = magnitude.and_then(|magnitude| {
            if negative {
                0i64.checked_sub_unsigned(magnitude)
            } else {
                i64::try_from(magnitude).ok()
            }
        });
        value.ok_or_else(|| {
            ParseError::new(ParseErrorKind::NumberOverflow { bits }, sign.pos)
        })
    }

    fn label(&mut self) -> Result<Label, ParseError> {
        let mut bits = String::new();
        loop {
            match self.literal_token()?.kind {
                S => bits.push('0'),
                T => bits.push('1'),
                L => break,
            }
        }
        Label::from_bits(&bits)
            .ok_or_else(|| ParseError::new(ParseErrorKind::EmptyLabel, self.last_pos))
    }

    fn instruction(&mut self, first: Token) -> Result<Located, ParseError> {
        let start = first.pos;
        let instruction = match first.kind {
            S => match self.command(start)? {
                S => Instruction::Push {
                    value: self.number()?,
                },
                T => match self.command(start)? {
                    S => Instruction::Copy { n: self.number()? },
                    T => Instruction::Swap,
                    L => Instruction::Discard,
                },
                L => match self.command(start)? {
                    S => Instruction::Duplicate,
                    T => Instruction::Slide { n: self.number()? },
                    L => {
                        return Err(ParseError::new(
                            ParseErrorKind::UnknownInstruction {
                                tokens: vec![S, L, L],
                            },
                            start,
                        ));
                    }
                },
            },
            T => match self.command(start)? {
                S => match self.command(start)? {
                    S => Instruction::Add,
                    T => Instruction::Sub,
                    L => Instruction::Mul,
                },
                T => match self.command(start)? {
                    S => Instruction::Div,
                    T => Instruction::Mod,
                    L => Instruction::HeapStore,
                },
                L => match self.command(start)? {
                    S => Instruction::HeapRead,
                    T => Instruction::OutputChar,
                    L => Instruction::OutputNum,
                },
            },
            L => match self.command(start)? {
                S => match self.command(start)? {
                    S => Instruction::Mark {
                        label: self.label()?,
                    },
                    T => Instruction::Call {
                        label: self.label()?,
                    },
                    L => Instruction::Jump {
                        label: self.label()?,
                    },
                },
                T => match self.command(start)? {
                    S => Instruction::JumpZero {
                        label: self.label()?,
                    },
                    T => Instruction::JumpNeg {
                        label: self.label()?,
                    },
                    L => Instruction::Return,
                },
                L => match self.command(start)? {
                    S => Instruction::Exit,
                    T => Instruction::InputChar,
                    L => Instruction::InputNum,
                },
            },
        };

        Ok(Located {
            instruction,
            span: Span::new(start, self.last_pos),
        })
    }
}

impl<I: Iterator<Item = Token>> Iterator for Parser<I> {
    type Item = Result<Located, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.advance()?;
        let result = self.instruction(first);
        if let Err(err) = &result {
            log::debug!("skipping malformed instruction: {err}");
        }
        Some(result)
    }
}

/// Parse an in-memory program.
pub fn parse(source: &[u8], diagnostics: &mut Diagnostics) -> Program {
    parse_reader(source, diagnostics)
}

/// Parse a program streamed from any reader.
///
/// A read error ends the stream; whatever was decoded before it is returned
/// and the failure is reported as a `source-read` error.
pub fn parse_reader<R: Read>(reader: R, diagnostics: &mut Diagnostics) -> Program {
    let mut lexer = Lexer::new(reader);
    let program = Parser::new(lexer.by_ref()).parse(diagnostics);
    if let Some((pos, err)) = lexer.take_error() {
        let error = ParseError::new(
            ParseErrorKind::SourceRead {
                message: err.to_string(),
            },
            pos,
        );
        diagnostics.push(Diagnostic::from(&error));
    }
    log::debug!(
        "parsed {} instructions with {} diagnostics",
        program.len(),
        diagnostics.len()
    );
    program
}
