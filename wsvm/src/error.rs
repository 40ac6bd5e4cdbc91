use core::fmt;

use crate::instruction::{Label, Value};

/// Faults raised while executing a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// A value was needed but the stack was empty.
    StackUnderflow,
    /// `copy` index outside `0..len`.
    InvalidCopy { n: Value, len: usize },
    /// `slide` count negative or larger than the items under the top.
    InvalidSlide { n: Value, len: usize },
    /// `swap` with fewer than two items.
    SwapUnderflow { len: usize },
    DivisionByZero,
    ModuloByZero,
    UndefinedLabel { label: Label },
    /// `return` with no pending call.
    CallStackUnderflow,
    /// The input or output channel failed.
    Io { message: String },
}

impl RuntimeError {
    /// Stable identifier used as the diagnostic code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::StackUnderflow => "stack-underflow",
            Self::InvalidCopy { .. } => "invalid-copy",
            Self::InvalidSlide { .. } => "invalid-slide",
            Self::SwapUnderflow { .. } => "swap-underflow",
            Self::DivisionByZero => "division-by-zero",
            Self::ModuloByZero => "modulo-by-zero",
            Self::UndefinedLabel { .. } => "undefined-label",
            Self::CallStackUnderflow => "call-stack-underflow",
            Self::Io { .. } => "io",
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackUnderflow => write!(f, "stack underflow"),
            Self::InvalidCopy { n, len } => {
                write!(f, "cannot copy item {n} of a stack of {len}")
            }
            Self::InvalidSlide { n, len } => {
                write!(f, "cannot slide {n} items off a stack of {len}")
            }
            Self::SwapUnderflow { len } => {
                write!(f, "swap needs two items, stack has {len}")
            }
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::ModuloByZero => write!(f, "modulo by zero"),
            Self::UndefinedLabel { label } => {
                write!(f, "undefined label `{label}`")
            }
            Self::CallStackUnderflow => {
                write!(f, "return without a matching call")
            }
            Self::Io { message } => write!(f, "i/o error: {message}"),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<std::io::Error> for RuntimeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}
