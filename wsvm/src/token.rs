/// Token types produced by the whitespace lexer.
use crate::span::Pos;

/// The three significant bytes of the language. Everything else is comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `0x20`
    Space,
    /// `0x09`
    Tab,
    /// `0x0A`
    LineFeed,
}

impl TokenKind {
    /// Classify a raw byte. Returns `None` for comment bytes.
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b' ' => Some(Self::Space),
            b'\t' => Some(Self::Tab),
            b'\n' => Some(Self::LineFeed),
            _ => None,
        }
    }

    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Space => b' ',
            Self::Tab => b'\t',
            Self::LineFeed => b'\n',
        }
    }

    /// Human-readable name for error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Space => "space",
            Self::Tab => "tab",
            Self::LineFeed => "linefeed",
        }
    }

    /// One-letter form used in listings, e.g. `STL`.
    pub fn letter(self) -> char {
        match self {
            Self::Space => 'S',
            Self::Tab => 'T',
            Self::LineFeed => 'L',
        }
    }
}

/// A token with its source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Pos,
}

impl Token {
    pub fn new(kind: TokenKind, pos: Pos) -> Self {
        Self { kind, pos }
    }
}
