use core::fmt;
use std::collections::HashMap;

use crate::instruction::{Instruction, Label};
use crate::span::Span;

/// An instruction together with the source bytes it was decoded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub instruction: Instruction,
    pub span: Span,
}

/// The immutable result of one parse.
///
/// A program is never mutated by execution, so one parse can be shared by
/// any number of runners, including across threads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
    /// Parallel to `instructions`; empty for programs built in memory.
    source_map: Vec<Span>,
}

impl Program {
    /// Build a program with no source positions.
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            instructions,
            source_map: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    /// Source span of the instruction at `index`, if the program was parsed.
    pub fn span(&self, index: usize) -> Option<Span> {
        self.source_map.get(index).copied()
    }

    /// Position of every `Mark`, keyed by label. A label marked twice binds
    /// to its last mark.
    pub fn marks(&self) -> HashMap<Label, usize> {
        self.instructions
            .iter()
            .enumerate()
            .filter_map(|(index, instruction)| match instruction {
                Instruction::Mark { label } => Some((label.clone(), index)),
                _ => None,
            })
            .collect()
    }
}

impl FromIterator<Located> for Program {
    fn from_iter<T: IntoIterator<Item = Located>>(iter: T) -> Self {
        let (instructions, source_map) = iter
            .into_iter()
            .map(|located| (located.instruction, located.span))
            .unzip();
        Self {
            instructions,
            source_map,
        }
    }
}

impl FromIterator<Instruction> for Program {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// IR listing, one `[index] MNEMONIC` line per instruction.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, instruction) in self.instructions.iter().enumerate() {
            writeln!(f, "[{index}] {instruction}")?;
        }
        Ok(())
    }
}
