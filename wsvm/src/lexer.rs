/// Streaming lexer for whitespace programs.
///
/// The [`Lexer`] consumes bytes from any [`std::io::Read`] source (a file,
/// `stdin`, a socket, an in-memory buffer) and implements [`Iterator`] over
/// [`Token`]s. Only space, tab and linefeed produce tokens; every other byte
/// is a comment and is skipped, but still advances offset, line and column.
///
/// Bytes are pulled in small chunks, so the lexer works over slow or
/// unbounded streams without holding the whole program in memory.
use std::io::{self, ErrorKind, Read};

use crate::span::Pos;
use crate::token::{Token, TokenKind};

const CHUNK: usize = 4096;

// ═══════════════════════════════════════════════════════════════════
// Read buffer
// ═══════════════════════════════════════════════════════════════════

/// Refillable byte buffer over a `Read` with position tracking.
struct ReadBuf<R: Read> {
    reader: R,
    buf: Box<[u8]>,
    /// Index of the next unread byte in `buf`.
    start: usize,
    /// How many valid bytes are in `buf`.
    filled: usize,
    /// Whether the underlying reader has returned 0 (EOF) or failed.
    reader_eof: bool,
    /// The read failure that ended the stream early, with where it happened.
    error: Option<(Pos, io::Error)>,
    offset: usize,
    line: usize,
    column: usize,
}

impl<R: Read> ReadBuf<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            buf: vec![0u8; CHUNK].into_boxed_slice(),
            start: 0,
            filled: 0,
            reader_eof: false,
            error: None,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Refill once the buffer has been drained.
    fn fill(&mut self) {
        while !self.reader_eof && self.start >= self.filled {
            match self.reader.read(&mut self.buf) {
                Ok(0) => self.reader_eof = true,
                Ok(n) => {
                    self.start = 0;
                    self.filled = n;
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => {
                    log::warn!("source read failed at {}: {err}", self.pos());
                    self.error = Some((self.pos(), err));
                    self.reader_eof = true;
                }
            }
        }
    }

    fn pos(&self) -> Pos {
        Pos::new(self.offset, self.line, self.column)
    }

    /// Consume one byte and return it, updating position tracking.
    fn advance(&mut self) -> Option<u8> {
        self.fill();
        if self.start >= self.filled {
            return None;
        }
        let b = self.buf[self.start];
        self.start += 1;

        self.offset += 1;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(b)
    }
}

// ═══════════════════════════════════════════════════════════════════
// Lexer
// ═══════════════════════════════════════════════════════════════════

/// A streaming lexer over any [`Read`].
///
/// ```rust
/// use wsvm::{Lexer, TokenKind};
///
/// let kinds: Vec<TokenKind> = Lexer::from_bytes(b"push\t \n")
///     .map(|t| t.kind)
///     .collect();
/// assert_eq!(kinds, [TokenKind::Tab, TokenKind::Space, TokenKind::LineFeed]);
/// ```
pub struct Lexer<R: Read> {
    rb: ReadBuf<R>,
    comment_bytes: usize,
}

impl<R: Read> Lexer<R> {
    /// Create a new lexer over the given readable stream.
    pub fn new(reader: R) -> Self {
        Self {
            rb: ReadBuf::new(reader),
            comment_bytes: 0,
        }
    }

    /// Number of non-whitespace bytes skipped so far.
    pub fn comment_bytes(&self) -> usize {
        self.comment_bytes
    }

    /// The read error that cut the stream short, if any. A failed read ends
    /// the token stream just like EOF, so callers check this afterwards.
    pub fn take_error(&mut self) -> Option<(Pos, io::Error)> {
        self.rb.error.take()
    }
}

impl<'a> Lexer<&'a [u8]> {
    /// Create a new lexer from an in-memory byte slice.
    pub fn from_bytes(source: &'a [u8]) -> Self {
        Self::new(source)
    }
}

impl<R: Read> Iterator for Lexer<R> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            let pos = self.rb.pos();
            let byte = self.rb.advance()?;
            match TokenKind::from_byte(byte) {
                Some(kind) => return Some(Token::new(kind, pos)),
                None => self.comment_bytes += 1,
            }
        }
    }
}
