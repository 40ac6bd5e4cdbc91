use crate::instruction::{Instruction, Label, Value};
use crate::token::TokenKind;

/// Builds whitespace source, one instruction at a time.
///
/// Numbers are written with the minimal bit run (0 is an empty run), so
/// parsing the output gives back exactly the instructions that went in.
#[derive(Debug, Default)]
pub struct SourceBuilder {
    buf: Vec<u8>,
}

impl SourceBuilder {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    // ── emit helpers ───────────────────────────────────────────────

    fn emit(&mut self, token: TokenKind) {
        self.buf.push(token.as_byte());
    }

    fn emit_bit(&mut self, bit: bool) {
        self.emit(if bit { TokenKind::Tab } else { TokenKind::Space });
    }

    fn emit_number(&mut self, value: Value) {
        self.emit_bit(value < 0);
        let magnitude = value.unsigned_abs();
        let width = u64::BITS - magnitude.leading_zeros();
        for shift in (0..width).rev() {
            self.emit_bit((magnitude >> shift) & 1 == 1);
        }
        self.emit(TokenKind::LineFeed);
    }

    fn emit_label(&mut self, label: &Label) {
        for bit in label.bits().bytes() {
            self.emit_bit(bit == b'1');
        }
        self.emit(TokenKind::LineFeed);
    }

    /// Append the encoding of `instruction`.
    pub fn instruction(&mut self, instruction: &Instruction) -> &mut Self {
        for &token in instruction.opcode() {
            self.emit(token);
        }
        match instruction {
            Instruction::Push { value } => self.emit_number(*value),
            Instruction::Copy { n } | Instruction::Slide { n } => self.emit_number(*n),
            other => {
                if let Some(label) = other.label() {
                    self.emit_label(label);
                }
            }
        }
        self
    }

    pub fn push(&mut self, value: Value) -> &mut Self {
        self.instruction(&Instruction::Push { value })
    }

    /// Append raw comment text. Any whitespace in `text` is dropped so the
    /// comment cannot change the program.
    pub fn comment(&mut self, text: &str) -> &mut Self {
        self.buf.extend(
            text.bytes()
                .filter(|&b| TokenKind::from_byte(b).is_none()),
        );
        self
    }
}

/// Encode a whole instruction sequence.
pub fn encode<'a>(instructions: impl IntoIterator<Item = &'a Instruction>) -> Vec<u8> {
    let mut builder = SourceBuilder::new();
    for instruction in instructions {
        builder.instruction(instruction);
    }
    builder.into_bytes()
}
