use core::fmt;

use crate::token::TokenKind;

/// Machine integer used for stack slots, heap addresses and heap values.
pub type Value = i64;

/// A flow-control target: a non-empty run of bits, written `0`/`1`.
///
/// Labels are compared bit for bit, so `0` and `00` are different labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(Box<str>);

impl Label {
    /// Build a label from a string of `0` and `1`. Returns `None` for an empty
    /// string or any other character.
    pub fn from_bits(bits: &str) -> Option<Self> {
        if bits.is_empty() || !bits.bytes().all(|b| b == b'0' || b == b'1') {
            return None;
        }
        Some(Self(bits.into()))
    }

    /// Label bits as `0`/`1` characters, most significant first.
    pub fn bits(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`: empty labels cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Instruction family, named after the first token(s) of the encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Stack,
    Arithmetic,
    Heap,
    Flow,
    Io,
}

/// A decoded instruction with its operand resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    // ── Stack ───────────────────────────────────────────────
    Push { value: Value },
    /// Push a copy of the n-th item from the top (0 is the top).
    Copy { n: Value },
    Swap,
    Discard,
    Duplicate,
    /// Keep the top item, drop the `n` items beneath it.
    Slide { n: Value },

    // ── Arithmetic (`a` below `b`, pushes `a op b`) ──────────
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // ── Heap ─────────────────────────────────────────────────
    HeapStore,
    HeapRead,

    // ── Flow ─────────────────────────────────────────────────
    Mark { label: Label },
    Call { label: Label },
    Jump { label: Label },
    JumpZero { label: Label },
    JumpNeg { label: Label },
    Return,
    Exit,

    // ── I/O ──────────────────────────────────────────────────
    OutputChar,
    OutputNum,
    InputChar,
    InputNum,
}

use TokenKind::{LineFeed as L, Space as S, Tab as T};

impl Instruction {
    pub fn family(&self) -> Family {
        match self {
            Self::Push { .. }
            | Self::Copy { .. }
            | Self::Swap
            | Self::Discard
            | Self::Duplicate
            | Self::Slide { .. } => Family::Stack,
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod => {
                Family::Arithmetic
            }
            Self::HeapStore | Self::HeapRead => Family::Heap,
            Self::Mark { .. }
            | Self::Call { .. }
            | Self::Jump { .. }
            | Self::JumpZero { .. }
            | Self::JumpNeg { .. }
            | Self::Return
            | Self::Exit => Family::Flow,
            Self::OutputChar
            | Self::OutputNum
            | Self::InputChar
            | Self::InputNum => Family::Io,
        }
    }

    /// The token prefix that selects this instruction, operand excluded.
    pub fn opcode(&self) -> &'static [TokenKind] {
        match self {
            Self::Push { .. } => &[S, S],
            Self::Copy { .. } => &[S, T, S],
            Self::Swap => &[S, T, T],
            Self::Discard => &[S, T, L],
            Self::Duplicate => &[S, L, S],
            Self::Slide { .. } => &[S, L, T],
            Self::Add => &[T, S, S],
            Self::Sub => &[T, S, T],
            Self::Mul => &[T, S, L],
            Self::Div => &[T, T, S],
            Self::Mod => &[T, T, T],
            Self::HeapStore => &[T, T, L],
            Self::HeapRead => &[T, L, S],
            Self::OutputChar => &[T, L, T],
            Self::OutputNum => &[T, L, L],
            Self::Mark { .. } => &[L, S, S],
            Self::Call { .. } => &[L, S, T],
            Self::Jump { .. } => &[L, S, L],
            Self::JumpZero { .. } => &[L, T, S],
            Self::JumpNeg { .. } => &[L, T, T],
            Self::Return => &[L, T, L],
            Self::Exit => &[L, L, S],
            Self::InputChar => &[L, L, T],
            Self::InputNum => &[L, L, L],
        }
    }

    /// The label operand, for flow instructions that carry one.
    pub fn label(&self) -> Option<&Label> {
        match self {
            Self::Mark { label }
            | Self::Call { label }
            | Self::Jump { label }
            | Self::JumpZero { label }
            | Self::JumpNeg { label } => Some(label),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push { value } => write!(f, "PUSH {value}"),
            Self::Copy { n } => write!(f, "COPY {n}"),
            Self::Swap => write!(f, "SWAP"),
            Self::Discard => write!(f, "DROP"),
            Self::Duplicate => write!(f, "DUP"),
            Self::Slide { n } => write!(f, "SLIDE {n}"),
            Self::Add => write!(f, "ADD"),
            Self::Sub => write!(f, "SUB"),
            Self::Mul => write!(f, "MUL"),
            Self::Div => write!(f, "DIV"),
            Self::Mod => write!(f, "MOD"),
            Self::HeapStore => write!(f, "STORE"),
            Self::HeapRead => write!(f, "RETRIEVE"),
            Self::Mark { label } => write!(f, "LABEL {label}"),
            Self::Call { label } => write!(f, "CALL {label}"),
            Self::Jump { label } => write!(f, "JUMP {label}"),
            Self::JumpZero { label } => write!(f, "JUMP_ZERO {label}"),
            Self::JumpNeg { label } => write!(f, "JUMP_NEG {label}"),
            Self::Return => write!(f, "RETURN"),
            Self::Exit => write!(f, "EXIT"),
            Self::OutputChar => write!(f, "OUTCHAR"),
            Self::OutputNum => write!(f, "OUTNUM"),
            Self::InputChar => write!(f, "INCHAR"),
            Self::InputNum => write!(f, "INNUM"),
        }
    }
}
