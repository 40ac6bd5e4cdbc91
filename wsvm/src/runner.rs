//! Fetch/execute loop.
//!
//! A [`Runner`] owns everything one execution mutates: the [`Memory`], the
//! label table, the call stack, the console and the diagnostics. The
//! [`Program`] is only borrowed, so any number of runners can execute the
//! same parse.
//!
//! Instructions never move the program counter themselves. Flow
//! instructions leave a *pending jump* which the loop consumes after the
//! instruction returns; without one, the counter advances by one.
//!
//! # Errors
//!
//! Every runtime fault goes through one place, [`Runner::fault`], which
//! records an Error diagnostic and then applies the [`ErrorPolicy`]:
//!
//! - [`ErrorPolicy::Lenient`] (default) continues with a safe default: a
//!   failed pop reads 0, a failed stack shuffle leaves the stack alone,
//!   division or modulo by zero pushes 0, a jump, call or return that cannot
//!   be resolved falls through to the next instruction.
//! - [`ErrorPolicy::Strict`] stops the run at the faulting instruction.
//!
//! A failing input or output channel stops the run under either policy.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use crate::console::{Console, NumberInput};
use crate::diagnostics::{Diagnostics, Location};
use crate::error::RuntimeError;
use crate::instruction::{Instruction, Label, Value};
use crate::memory::Memory;
use crate::program::Program;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Record the fault and continue with a safe default.
    #[default]
    Lenient,
    /// Record the fault and stop.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelResolution {
    /// Bind every `Mark` before the first step, so forward jumps work.
    #[default]
    Eager,
    /// Bind a label only once its `Mark` has executed.
    OnMark,
}

#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub policy: ErrorPolicy,
    pub labels: LabelResolution,
    pub stack_size: usize,
    pub call_stack_size: usize,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            policy: ErrorPolicy::default(),
            labels: LabelResolution::default(),
            stack_size: 128,
            call_stack_size: 128,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The program counter ran past the last instruction.
    Completed,
    /// An `Exit` instruction executed.
    Exited,
    /// A fault stopped the run at `pc`.
    Aborted { pc: usize },
}

pub struct Runner<'p, R: BufRead, W: Write> {
    program: &'p Program,
    settings: RunnerSettings,
    memory: Memory,
    labels: HashMap<Label, usize>,
    call_stack: Vec<usize>,
    pc: usize,
    pending_jump: Option<usize>,
    halted: bool,
    aborted: bool,
    steps: u64,
    console: Console<R, W>,
    diagnostics: Diagnostics,
}

impl<'p, R: BufRead, W: Write> Runner<'p, R, W> {
    pub fn new(
        program: &'p Program,
        console: Console<R, W>,
        settings: RunnerSettings,
    ) -> Self {
        let labels = match settings.labels {
            LabelResolution::Eager => program.marks(),
            LabelResolution::OnMark => HashMap::new(),
        };
        Self {
            program,
            memory: Memory::with_capacity(settings.stack_size),
            labels,
            call_stack: Vec::with_capacity(settings.call_stack_size),
            pc: 0,
            pending_jump: None,
            halted: false,
            aborted: false,
            steps: 0,
            console,
            diagnostics: Diagnostics::new(),
            settings,
        }
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn pending_jump(&self) -> Option<usize> {
        self.pending_jump
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// True once no further step will execute anything.
    pub fn is_finished(&self) -> bool {
        self.halted || self.aborted || self.pc >= self.program.len()
    }

    /// Number of instructions executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn call_stack(&self) -> &[usize] {
        &self.call_stack
    }

    /// Instruction index bound to `label`, if any.
    pub fn label_target(&self, label: &Label) -> Option<usize> {
        self.labels.get(label).copied()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn console(&self) -> &Console<R, W> {
        &self.console
    }

    /// Hand back the state of the run for inspection.
    pub fn into_parts(self) -> (Memory, Diagnostics, Console<R, W>) {
        (self.memory, self.diagnostics, self.console)
    }

    /// `None` while the run can still make progress.
    pub fn outcome(&self) -> Option<Outcome> {
        if self.aborted {
            Some(Outcome::Aborted { pc: self.pc })
        } else if self.halted {
            Some(Outcome::Exited)
        } else if self.pc >= self.program.len() {
            Some(Outcome::Completed)
        } else {
            None
        }
    }

    /// Run until the program exits, falls off the end or aborts.
    ///
    /// A program that loops forever makes this loop forever.
    pub fn run(&mut self) -> Outcome {
        log::debug!(
            "running {} instructions ({:?}, {:?})",
            self.program.len(),
            self.settings.policy,
            self.settings.labels
        );
        while self.step() {}
        let outcome = self.outcome().unwrap_or(Outcome::Completed);
        log::debug!(
            "run finished: {outcome:?} after {} steps, {} diagnostics",
            self.steps,
            self.diagnostics.len()
        );
        outcome
    }

    /// Execute one instruction. Returns `false` once the run is over.
    pub fn step(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        let program = self.program;
        let Some(instruction) = program.get(self.pc) else {
            return false;
        };
        log::trace!("[{}] {}", self.pc, instruction);

        if let Err(err) = self.execute(instruction) {
            log::debug!("aborting at instruction {}: {err}", self.pc);
            self.aborted = true;
            return false;
        }
        self.steps += 1;

        match self.pending_jump.take() {
            Some(target) => self.pc = target,
            None => self.pc += 1,
        }
        !self.is_finished()
    }

    fn location(&self) -> Location {
        Location::instruction(self.pc, self.program.span(self.pc).map(|s| s.start))
    }

    /// Record `error` and apply the error policy. Under the lenient policy
    /// the run continues with `fallback`.
    fn fault<T>(&mut self, error: RuntimeError, fallback: T) -> Result<T, RuntimeError> {
        log::debug!("fault at instruction {}: {error}", self.pc);
        let location = self.location();
        self.diagnostics
            .error(error.code(), error.to_string(), location);
        match self.settings.policy {
            ErrorPolicy::Lenient => Ok(fallback),
            ErrorPolicy::Strict => Err(error),
        }
    }

    /// Output and input failures stop the run under either policy.
    fn io_fault(&mut self, err: std::io::Error) -> RuntimeError {
        let error = RuntimeError::from(err);
        let location = self.location();
        self.diagnostics
            .error(error.code(), error.to_string(), location);
        error
    }

    fn check(&mut self, result: Result<(), RuntimeError>) -> Result<(), RuntimeError> {
        match result {
            Ok(()) => Ok(()),
            Err(error) => self.fault(error, ()),
        }
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        match self.memory.pop() {
            Ok(value) => Ok(value),
            Err(error) => self.fault(error, 0),
        }
    }

    fn arithmetic(
        &mut self,
        op: fn(Value, Value) -> Result<Value, RuntimeError>,
    ) -> Result<(), RuntimeError> {
        let b = self.pop()?;
        let a = self.pop()?;
        let result = match op(a, b) {
            Ok(value) => value,
            Err(error) => self.fault(error, 0)?,
        };
        self.memory.push(result);
        Ok(())
    }

    fn execute(&mut self, instruction: &Instruction) -> Result<(), RuntimeError> {
        match instruction {
            Instruction::Push { value } => self.memory.push(*value),
            Instruction::Copy { n } => {
                let result = self.memory.copy(*n);
                self.check(result)?;
            }
            Instruction::Swap => {
                let result = self.memory.swap();
                self.check(result)?;
            }
            Instruction::Discard => {
                let result = self.memory.discard();
                self.check(result)?;
            }
            Instruction::Duplicate => {
                let result = self.memory.duplicate();
                self.check(result)?;
            }
            Instruction::Slide { n } => {
                let result = self.memory.slide(*n);
                self.check(result)?;
            }

            Instruction::Add => self.arithmetic(|a, b| Ok(a.wrapping_add(b)))?,
            Instruction::Sub => self.arithmetic(|a, b| Ok(a.wrapping_sub(b)))?,
            Instruction::Mul => self.arithmetic(|a, b| Ok(a.wrapping_mul(b)))?,
            Instruction::Div => self.arithmetic(|a, b| match b {
                0 => Err(RuntimeError::DivisionByZero),
                _ => Ok(a.wrapping_div(b)),
            })?,
            Instruction::Mod => self.arithmetic(|a, b| match b {
                0 => Err(RuntimeError::ModuloByZero),
                _ => Ok(a.wrapping_rem(b)),
            })?,

            Instruction::HeapStore => {
                let value = self.pop()?;
                let address = self.pop()?;
                self.memory.heap_store(address, value);
            }
            Instruction::HeapRead => {
                let address = self.pop()?;
                let value = self.memory.heap_retrieve(address);
                self.memory.push(value);
            }

            Instruction::Mark { label } => self.set_label(label, self.pc),
            Instruction::Call { label } => self.call(label)?,
            Instruction::Jump { label } => self.jump(label)?,
            Instruction::JumpZero { label } => self.jump_if_zero(label)?,
            Instruction::JumpNeg { label } => self.jump_if_negative(label)?,
            Instruction::Return => self.return_from_call()?,
            Instruction::Exit => self.exit(),

            Instruction::OutputChar => {
                let value = self.pop()?;
                if let Err(err) = self.console.write_char(value) {
                    return Err(self.io_fault(err));
                }
            }
            Instruction::OutputNum => {
                let value = self.pop()?;
                if let Err(err) = self.console.write_number(value) {
                    return Err(self.io_fault(err));
                }
            }
            Instruction::InputChar => {
                let address = self.pop()?;
                let value = match self.console.read_char() {
                    Ok(Some(byte)) => Value::from(byte),
                    Ok(None) => {
                        self.input_exhausted();
                        0
                    }
                    Err(err) => return Err(self.io_fault(err)),
                };
                self.memory.heap_store(address, value);
            }
            Instruction::InputNum => {
                let address = self.pop()?;
                let value = match self.console.read_number() {
                    Ok(NumberInput::Value(value)) => value,
                    Ok(NumberInput::Invalid(text)) => {
                        let location = self.location();
                        self.diagnostics.warning(
                            "invalid-number-input",
                            format!("`{text}` is not a number, read 0"),
                            location,
                        );
                        0
                    }
                    Ok(NumberInput::Eof) => {
                        self.input_exhausted();
                        0
                    }
                    Err(err) => return Err(self.io_fault(err)),
                };
                self.memory.heap_store(address, value);
            }
        }
        Ok(())
    }

    fn input_exhausted(&mut self) {
        let location = self.location();
        self.diagnostics
            .notice("input-exhausted", "input is exhausted, read 0", location);
    }

    // ── Control state ───────────────────────────────────────────────

    /// Bind `label` to instruction index `pos`, replacing any earlier binding.
    pub fn set_label(&mut self, label: &Label, pos: usize) {
        self.labels.insert(label.clone(), pos);
    }

    pub fn jump(&mut self, label: &Label) -> Result<(), RuntimeError> {
        match self.label_target(label) {
            Some(target) => {
                self.pending_jump = Some(target);
                Ok(())
            }
            None => self.fault(
                RuntimeError::UndefinedLabel {
                    label: label.clone(),
                },
                (),
            ),
        }
    }

    pub fn jump_if_zero(&mut self, label: &Label) -> Result<(), RuntimeError> {
        if self.pop()? == 0 {
            self.jump(label)?;
        }
        Ok(())
    }

    pub fn jump_if_negative(&mut self, label: &Label) -> Result<(), RuntimeError> {
        if self.pop()? < 0 {
            self.jump(label)?;
        }
        Ok(())
    }

    /// Save the index after the current instruction, then jump.
    pub fn call(&mut self, label: &Label) -> Result<(), RuntimeError> {
        if self.label_target(label).is_some() {
            self.call_stack.push(self.pc + 1);
        }
        self.jump(label)
    }

    pub fn return_from_call(&mut self) -> Result<(), RuntimeError> {
        match self.call_stack.pop() {
            Some(target) => {
                self.pending_jump = Some(target);
                Ok(())
            }
            None => self.fault(RuntimeError::CallStackUnderflow, ()),
        }
    }

    pub fn exit(&mut self) {
        self.halted = true;
    }
}

/// Everything a captured run produced.
#[derive(Debug)]
pub struct Captured {
    pub outcome: Outcome,
    pub output: Vec<u8>,
    pub memory: Memory,
    pub diagnostics: Diagnostics,
}

impl Captured {
    /// Output lossily decoded as UTF-8.
    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Run `program` against an in-memory input, capturing its output.
pub fn run_captured(program: &Program, input: &[u8], settings: RunnerSettings) -> Captured {
    let console = Console::new(input, Vec::new());
    let mut runner = Runner::new(program, console, settings);
    let outcome = runner.run();
    let (memory, diagnostics, console) = runner.into_parts();
    let (_, output) = console.into_inner();
    Captured {
        outcome,
        output,
        memory,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::SharedBuffer;
    use crate::encoder::encode;
    use crate::parser::parse;

    use Instruction::*;

    fn label(bits: &str) -> Label {
        Label::from_bits(bits).unwrap()
    }

    fn run(program: &[Instruction]) -> Captured {
        run_with(program, b"", RunnerSettings::default())
    }

    fn run_with(program: &[Instruction], input: &[u8], settings: RunnerSettings) -> Captured {
        run_captured(&Program::new(program.to_vec()), input, settings)
    }

    fn strict() -> RunnerSettings {
        RunnerSettings {
            policy: ErrorPolicy::Strict,
            ..Default::default()
        }
    }

    #[test]
    fn straight_line_visits_each_instruction_once() {
        let program = Program::new(vec![
            Push { value: 3 },
            Push { value: 4 },
            Swap,
            Duplicate,
            Add,
            HeapRead,
            Discard,
        ]);
        let mut runner = Runner::new(&program, Console::new(&b""[..], Vec::new()), RunnerSettings::default());
        let mut visited = Vec::new();
        while !runner.is_finished() {
            visited.push(runner.pc());
            runner.step();
        }
        assert_eq!(visited, (0..program.len()).collect::<Vec<_>>());
        assert_eq!(runner.steps(), program.len() as u64);
        assert_eq!(runner.outcome(), Some(Outcome::Completed));
        assert_eq!(runner.memory().stack(), &[4]);
    }

    #[test]
    fn arithmetic_pops_b_then_a() {
        let run = run(&[
            Push { value: 10 },
            Push { value: 3 },
            Sub,
            Push { value: 7 },
            Push { value: 2 },
            Div,
            Push { value: 7 },
            Push { value: 3 },
            Mod,
            Push { value: -7 },
            Push { value: 2 },
            Div,
            Push { value: 6 },
            Push { value: -4 },
            Mul,
        ]);
        assert_eq!(run.memory.stack(), &[7, 3, 1, -3, -24]);
        assert!(run.diagnostics.is_empty());
    }

    #[test]
    fn arithmetic_wraps_instead_of_panicking() {
        let run = run(&[
            Push { value: i64::MAX },
            Push { value: 1 },
            Add,
            Push { value: i64::MIN },
            Push { value: -1 },
            Div,
        ]);
        assert_eq!(run.memory.stack(), &[i64::MIN, i64::MIN]);
    }

    #[test]
    fn heap_store_and_retrieve() {
        let run = run(&[
            Push { value: 100 },
            Push { value: 42 },
            HeapStore,
            Push { value: 100 },
            HeapRead,
            Push { value: 5 },
            HeapRead,
        ]);
        assert_eq!(run.memory.stack(), &[42, 0]);
        assert_eq!(run.memory.heap_retrieve(100), 42);
    }

    #[test]
    fn forward_jump_skips_to_mark() {
        let l = label("1");
        let run = run(&[
            Jump { label: l.clone() },
            Push { value: 1 },
            OutputNum,
            Mark { label: l },
            Exit,
        ]);
        assert_eq!(run.outcome, Outcome::Exited);
        assert!(run.output.is_empty());
        assert!(run.diagnostics.is_empty());
    }

    #[test]
    fn forward_jump_needs_eager_binding() {
        let l = label("1");
        let settings = RunnerSettings {
            labels: LabelResolution::OnMark,
            ..Default::default()
        };
        let run = run_with(
            &[Jump { label: l.clone() }, Push { value: 1 }, OutputNum, Mark { label: l }, Exit],
            b"",
            settings,
        );
        assert_eq!(run.diagnostics.count_code("undefined-label"), 1);
        assert_eq!(run.output_string(), "1");
        assert_eq!(run.outcome, Outcome::Exited);
    }

    #[test]
    fn backward_jump_works_when_bound_on_mark() {
        let top = label("0");
        let settings = RunnerSettings {
            labels: LabelResolution::OnMark,
            ..Default::default()
        };
        let run = run_with(
            &[
                Push { value: -3 },
                Mark { label: top.clone() },
                Duplicate,
                OutputNum,
                Push { value: 1 },
                Add,
                Duplicate,
                JumpNeg { label: top },
                Discard,
            ],
            b"",
            settings,
        );
        assert_eq!(run.output_string(), "-3-2-1");
        assert_eq!(run.outcome, Outcome::Completed);
        assert!(run.memory.is_empty());
        assert!(run.diagnostics.is_empty());
    }

    #[test]
    fn countdown_loop() {
        let top = label("0");
        let end = label("1");
        let run = run(&[
            Push { value: 3 },
            Mark { label: top.clone() },
            Duplicate,
            JumpZero { label: end.clone() },
            Duplicate,
            OutputNum,
            Push { value: 1 },
            Sub,
            Jump { label: top },
            Mark { label: end },
            Discard,
        ]);
        assert_eq!(run.output_string(), "321");
        assert_eq!(run.outcome, Outcome::Completed);
        assert!(run.memory.is_empty());
        assert!(run.diagnostics.is_empty());
    }

    #[test]
    fn call_resumes_after_call_site() {
        let sub = label("10");
        let run = run(&[
            Call { label: sub.clone() },
            Push { value: 7 },
            OutputNum,
            Exit,
            Mark { label: sub },
            Push { value: 1 },
            OutputNum,
            Return,
        ]);
        assert_eq!(run.output_string(), "17");
        assert_eq!(run.outcome, Outcome::Exited);
        assert!(run.diagnostics.is_empty());
    }

    #[test]
    fn nested_calls_unwind_in_order() {
        let a = label("0");
        let b = label("1");
        let run = run(&[
            Call { label: a.clone() },
            Exit,
            Mark { label: a },
            Push { value: 1 },
            OutputNum,
            Call { label: b.clone() },
            Push { value: 3 },
            OutputNum,
            Return,
            Mark { label: b },
            Push { value: 2 },
            OutputNum,
            Return,
        ]);
        assert_eq!(run.output_string(), "123");
        assert_eq!(run.outcome, Outcome::Exited);
    }

    #[test]
    fn jump_negative_only_on_negative() {
        let neg = label("1");
        let run = run(&[
            Push { value: 0 },
            JumpNeg { label: neg.clone() },
            Push { value: -1 },
            JumpNeg { label: neg.clone() },
            Push { value: 9 },
            OutputNum,
            Mark { label: neg },
            Push { value: 8 },
            OutputNum,
        ]);
        assert_eq!(run.output_string(), "8");
        assert!(run.memory.is_empty());
    }

    #[test]
    fn division_by_zero_is_one_error_and_continues() {
        let run = run(&[Push { value: 5 }, Push { value: 0 }, Div]);
        assert_eq!(run.outcome, Outcome::Completed);
        assert_eq!(run.diagnostics.error_count(), 1);
        assert_eq!(run.diagnostics.count_code("division-by-zero"), 1);
        assert_eq!(run.memory.stack(), &[0]);
    }

    #[test]
    fn strict_policy_aborts_at_fault() {
        let run = run_with(
            &[Push { value: 5 }, Push { value: 0 }, Mod, Push { value: 1 }],
            b"",
            strict(),
        );
        assert_eq!(run.outcome, Outcome::Aborted { pc: 2 });
        assert_eq!(run.diagnostics.count_code("modulo-by-zero"), 1);
        assert!(run.memory.is_empty());
    }

    #[test]
    fn underflow_reads_zero() {
        let run = run(&[Push { value: 4 }, Add, OutputNum]);
        assert_eq!(run.output_string(), "4");
        assert_eq!(run.diagnostics.count_code("stack-underflow"), 1);
        assert_eq!(run.outcome, Outcome::Completed);
    }

    #[test]
    fn failed_shuffles_leave_stack_alone() {
        let run = run(&[
            Push { value: 1 },
            Swap,
            Copy { n: 1 },
            Slide { n: 1 },
            Discard,
            Discard,
            Duplicate,
        ]);
        assert!(run.memory.is_empty());
        assert_eq!(run.diagnostics.error_count(), 5);
        assert_eq!(run.diagnostics.count_code("swap-underflow"), 1);
        assert_eq!(run.diagnostics.count_code("invalid-copy"), 1);
        assert_eq!(run.diagnostics.count_code("invalid-slide"), 1);
        assert_eq!(run.diagnostics.count_code("stack-underflow"), 2);
    }

    #[test]
    fn undefined_label_falls_through() {
        let run = run(&[
            Call { label: label("111") },
            Push { value: 1 },
            OutputNum,
        ]);
        assert_eq!(run.output_string(), "1");
        assert_eq!(run.diagnostics.count_code("undefined-label"), 1);
    }

    #[test]
    fn failed_call_does_not_push_return_address() {
        let program = Program::new(vec![Call { label: label("0") }]);
        let mut runner = Runner::new(&program, Console::new(&b""[..], Vec::new()), RunnerSettings::default());
        runner.run();
        assert!(runner.call_stack().is_empty());
    }

    #[test]
    fn return_without_call() {
        let run = run(&[Return, Push { value: 2 }, OutputNum]);
        assert_eq!(run.output_string(), "2");
        assert_eq!(run.diagnostics.count_code("call-stack-underflow"), 1);

        let run = run_with(&[Return, Push { value: 2 }], b"", strict());
        assert_eq!(run.outcome, Outcome::Aborted { pc: 0 });
    }

    #[test]
    fn exit_stops_immediately() {
        let run = run(&[Exit, Push { value: 1 }, OutputNum]);
        assert_eq!(run.outcome, Outcome::Exited);
        assert!(run.output.is_empty());
        assert!(run.diagnostics.is_empty());
    }

    #[test]
    fn remarking_rebinds_label() {
        let l = label("1");
        let program = Program::new(vec![Mark { label: l.clone() }, Mark { label: l.clone() }]);
        let mut runner = Runner::new(&program, Console::new(&b""[..], Vec::new()), RunnerSettings::default());
        assert_eq!(runner.label_target(&l), Some(1));
        runner.step();
        assert_eq!(runner.label_target(&l), Some(0));
        runner.step();
        assert_eq!(runner.label_target(&l), Some(1));
    }

    #[test]
    fn pending_jump_is_consumed_once() {
        let l = label("0");
        let program = Program::new(vec![Jump { label: l.clone() }, Exit, Mark { label: l }]);
        let mut runner = Runner::new(&program, Console::new(&b""[..], Vec::new()), RunnerSettings::default());
        assert!(runner.step());
        assert_eq!(runner.pc(), 2);
        assert_eq!(runner.pending_jump(), None);
        assert!(!runner.step());
        assert_eq!(runner.outcome(), Some(Outcome::Completed));
    }

    #[test]
    fn input_char_and_number_store_at_popped_address() {
        let run = run_with(
            &[
                Push { value: 1 },
                InputChar,
                Push { value: 2 },
                InputNum,
                Push { value: 1 },
                HeapRead,
                Push { value: 2 },
                HeapRead,
            ],
            b"A-15\n",
            RunnerSettings::default(),
        );
        assert_eq!(run.memory.stack(), &[65, -15]);
        assert!(run.diagnostics.is_empty());
    }

    #[test]
    fn input_eof_reads_zero_with_notice() {
        let run = run_with(
            &[
                Push { value: 0 },
                Push { value: 9 },
                HeapStore,
                Push { value: 0 },
                InputNum,
                Push { value: 0 },
                HeapRead,
            ],
            b"",
            RunnerSettings::default(),
        );
        assert_eq!(run.memory.stack(), &[0]);
        assert_eq!(run.diagnostics.count_code("input-exhausted"), 1);
        assert!(!run.diagnostics.has_errors());
    }

    #[test]
    fn invalid_number_input_warns() {
        let run = run_with(
            &[Push { value: 3 }, InputNum, Push { value: 3 }, HeapRead],
            b"twelve\n",
            RunnerSettings::default(),
        );
        assert_eq!(run.memory.stack(), &[0]);
        assert_eq!(run.diagnostics.count_code("invalid-number-input"), 1);
    }

    #[test]
    fn output_char_writes_raw_byte() {
        let run = run(&[Push { value: 72 }, OutputChar, Push { value: 105 }, OutputChar]);
        assert_eq!(run.output, b"Hi");
    }

    #[test]
    fn runtime_diagnostics_point_at_source() {
        let mut diags = Diagnostics::new();
        let program = parse(b"   \t \t\n   \n\t\t ", &mut diags);
        assert!(diags.is_empty());
        let run = run_captured(&program, b"", RunnerSettings::default());
        let fault = run.diagnostics.iter().next().unwrap();
        assert_eq!(fault.code, "division-by-zero");
        assert_eq!(fault.location.instruction, Some(2));
        assert_eq!(fault.location.pos.map(|p| p.line), Some(3));
    }

    #[test]
    fn encoded_program_adds_one_and_one() {
        let source = encode(&[Push { value: 1 }, Push { value: 1 }, Add, OutputNum, Exit]);
        let mut diags = Diagnostics::new();
        let program = parse(&source, &mut diags);
        let run = run_captured(&program, b"", RunnerSettings::default());
        assert_eq!(run.output_string(), "2");
        assert_eq!(run.outcome, Outcome::Exited);
        assert!(!diags.has_errors());
        assert!(!run.diagnostics.has_errors());
    }

    #[test]
    fn encoded_division_by_zero_records_one_error() {
        let source = encode(&[Push { value: 5 }, Push { value: 0 }, Div]);
        let mut diags = Diagnostics::new();
        let program = parse(&source, &mut diags);
        let run = run_captured(&program, b"", RunnerSettings::default());
        assert_eq!(run.diagnostics.count_code("division-by-zero"), 1);
        assert_eq!(run.diagnostics.error_count(), 1);
        assert_eq!(run.outcome, Outcome::Completed);
    }

    #[test]
    fn runners_share_one_program_across_threads() {
        let program = Program::new(vec![Push { value: 6 }, Push { value: 7 }, Mul, OutputNum]);
        let sinks = [SharedBuffer::new(), SharedBuffer::new()];
        std::thread::scope(|scope| {
            for sink in &sinks {
                let program = &program;
                let sink = sink.clone();
                scope.spawn(move || {
                    let console = Console::new(std::io::empty(), sink);
                    Runner::new(program, console, RunnerSettings::default()).run()
                });
            }
        });
        for sink in &sinks {
            assert_eq!(sink.to_string_lossy(), "42");
        }
    }

    struct ClosedOutput;

    impl Write for ClosedOutput {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ClosedInput;

    impl std::io::Read for ClosedInput {
        fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::ConnectionReset.into())
        }
    }

    fn run_on<R: BufRead, W: Write>(
        program: &[Instruction],
        console: Console<R, W>,
    ) -> (Outcome, Diagnostics) {
        let program = Program::new(program.to_vec());
        let mut runner = Runner::new(&program, console, RunnerSettings::default());
        let outcome = runner.run();
        let (_, diagnostics, _) = runner.into_parts();
        (outcome, diagnostics)
    }

    #[test]
    fn failed_output_aborts_even_when_lenient() {
        for output in [OutputNum, OutputChar] {
            let (outcome, diags) = run_on(
                &[Push { value: 1 }, output, Push { value: 2 }],
                Console::new(std::io::empty(), ClosedOutput),
            );
            assert_eq!(outcome, Outcome::Aborted { pc: 1 });
            assert_eq!(diags.count_code("io"), 1);
            assert_eq!(diags.error_count(), 1);
        }
    }

    #[test]
    fn failed_input_aborts_even_when_lenient() {
        for input in [InputChar, InputNum] {
            let (outcome, diags) = run_on(
                &[Push { value: 1 }, input, Push { value: 2 }],
                Console::new(std::io::BufReader::new(ClosedInput), Vec::new()),
            );
            assert_eq!(outcome, Outcome::Aborted { pc: 1 });
            assert_eq!(diags.count_code("io"), 1);
            assert_eq!(diags.count_code("input-exhausted"), 0);
        }
    }

    #[test]
    fn fresh_runner_starts_clean() {
        let program = Program::new(vec![Push { value: 1 }, Discard, Discard]);
        let first = run_captured(&program, b"", RunnerSettings::default());
        let second = run_captured(&program, b"", RunnerSettings::default());
        assert_eq!(first.diagnostics.len(), 1);
        assert_eq!(second.diagnostics.len(), 1);
    }
}
