//! The streaming virtual machine
//!
//! Owns every piece of mutable state (registers, sensors, memory, operand
//! stack, video state, execution state) and implements the
//! fetch-decode-execute loop. One call to [`StreamVm::step`] dispatches at
//! most one instruction; [`StreamVm::run`] drives `step` until the machine
//! halts or the step budget runs out.
//!
//! Operand lexemes arrive raw from the assembler and are resolved here,
//! when the instruction executes: an unknown opcode or a malformed
//! operand is a runtime error on the step that reaches it, never before.

use std::fmt;

use crate::assembler::{self, Instr, LabelTable};

/// Number of memory cells
pub const MEMORY_SIZE: usize = 256;

/// Duration reported for every opened video, in seconds. Opening
/// simulates metadata discovery of a three-minute clip.
pub const SIMULATED_DURATION: i64 = 180;

/// Step budget used by [`StreamVm::run`]
pub const DEFAULT_STEP_LIMIT: u64 = 10_000;

/// One of the four writable registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    /// Playback position in seconds
    Pos,
    /// Playback speed multiplier
    Speed,
    /// General purpose register 0
    R0,
    /// General purpose register 1
    R1,
}

impl Register {
    /// Look up a register by name, case-insensitively
    pub fn from_name(name: &str) -> Option<Register> {
        match name.to_uppercase().as_str() {
            "POS" => Some(Register::Pos),
            "SPEED" => Some(Register::Speed),
            "R0" => Some(Register::R0),
            "R1" => Some(Register::R1),
            _ => None,
        }
    }
}

/// A line-oriented output destination for `PRINT`, `PRINTS`, and the
/// streaming log
pub trait Sink {
    fn line(&mut self, text: &str);
}

/// Writes every output line to standard output
#[derive(Debug, Default)]
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn line(&mut self, text: &str) {
        println!("{}", text);
    }
}

/// Collects output lines so tests can assert on them
impl Sink for Vec<String> {
    fn line(&mut self, text: &str) {
        self.push(text.to_string());
    }
}

/// An error raised while executing a program. All runtime errors are
/// fatal to the current run: nothing is retried or silently recovered.
/// The machine stays inspectable through [`StreamVm::state`], with `pc`
/// still pointing at the failing instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// A dispatched instruction had an unrecognized mnemonic
    UnknownOpcode { opcode: String },
    /// A taken branch targeted a label missing from the label table
    UnknownLabel { label: String },
    /// An operand that names no register and parses as no integer
    MalformedOperand { operand: String },
    /// A memory address outside the 256-cell address space
    AddressOutOfRange { address: i64 },
    /// A pop was attempted on an empty operand stack
    StackUnderflow,
    /// `DIV` with a zero divisor
    DivisionByZero,
    /// `PLAY` before any `OPEN`
    NoVideoLoaded,
    /// `run` exhausted its step budget
    StepLimit { limit: u64 },
}

impl std::error::Error for RuntimeError {}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::UnknownOpcode { opcode } => {
                write!(f, "unknown opcode: {}", opcode)
            }
            RuntimeError::UnknownLabel { label } => {
                write!(f, "unknown label: {}", label)
            }
            RuntimeError::MalformedOperand { operand } => {
                write!(
                    f,
                    "malformed operand \"{}\" (neither a register nor an integer)",
                    operand
                )
            }
            RuntimeError::AddressOutOfRange { address } => {
                write!(f, "memory address {} is outside 0..{}", address, MEMORY_SIZE)
            }
            RuntimeError::StackUnderflow => {
                write!(f, "cannot pop from an empty stack")
            }
            RuntimeError::DivisionByZero => {
                write!(f, "division by zero")
            }
            RuntimeError::NoVideoLoaded => {
                write!(f, "no video loaded")
            }
            RuntimeError::StepLimit { limit } => {
                write!(f, "step limit of {} reached (possible infinite loop)", limit)
            }
        }
    }
}

/// A point-in-time copy of the machine state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmState {
    pub pos: i64,
    pub speed: i64,
    pub r0: i64,
    pub r1: i64,
    pub duration: i64,
    pub is_playing: i64,
    pub ended: i64,
    pub stack: Vec<i64>,
    pub pc: usize,
    pub halted: bool,
    pub steps: u64,
    /// Title of the loaded video, if any
    pub video: Option<String>,
}

impl fmt::Display for VmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let video = match &self.video {
            Some(title) => format!("'{}'", title),
            None => "none".to_string(),
        };
        write!(
            f,
            "POS={} SPEED={} R0={} R1={} | DURATION={} IS_PLAYING={} ENDED={} | \
             stack={:?} pc={} steps={} halted={} video={}",
            self.pos, self.speed, self.r0, self.r1,
            self.duration, self.is_playing, self.ended,
            self.stack, self.pc, self.steps, self.halted, video,
        )
    }
}

/// The virtual machine
///
/// Not internally thread-safe; confine an instance to one thread at a
/// time. Output goes through the machine's [`Sink`], which defaults to
/// standard output.
pub struct StreamVm<S: Sink = StdoutSink> {
    // registers
    pos: i64,
    speed: i64,
    r0: i64,
    r1: i64,
    // sensors, written only by streaming instructions
    duration: i64,
    is_playing: i64,
    ended: i64,
    memory: [i64; MEMORY_SIZE],
    stack: Vec<i64>,
    video_title: String,
    video_loaded: bool,
    program: Vec<Instr>,
    labels: LabelTable,
    pc: usize,
    halted: bool,
    steps: u64,
    sink: S,
}

impl StreamVm<StdoutSink> {
    /// Create a machine that prints to standard output
    pub fn new() -> StreamVm<StdoutSink> {
        StreamVm::with_sink(StdoutSink)
    }
}

impl Default for StreamVm<StdoutSink> {
    fn default() -> Self {
        StreamVm::new()
    }
}

impl<S: Sink> StreamVm<S> {
    /// Create a machine writing output lines to the given sink
    pub fn with_sink(sink: S) -> StreamVm<S> {
        StreamVm {
            pos: 0,
            speed: 1,
            r0: 0,
            r1: 0,
            duration: 0,
            is_playing: 0,
            ended: 0,
            memory: [0; MEMORY_SIZE],
            stack: Vec::new(),
            video_title: String::new(),
            video_loaded: false,
            program: Vec::new(),
            labels: LabelTable::new(),
            pc: 0,
            halted: false,
            steps: 0,
            sink,
        }
    }

    /// Access the sink, e.g. to read back captured output
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Assemble and load a program.
    ///
    /// Clears the previous program, label table, operand stack, and
    /// execution state. Registers, sensors, memory, and video state
    /// survive a reload; use [`StreamVm::reset`] for a clean machine.
    /// On a load error the machine is left with an empty program.
    pub fn load_program(&mut self, source: &str) -> Result<(), assembler::Error> {
        self.program.clear();
        self.labels.clear();
        self.stack.clear();
        self.pc = 0;
        self.halted = false;
        self.steps = 0;

        let (program, labels) = assembler::assemble(source)?;
        self.program = program;
        self.labels = labels;
        Ok(())
    }

    /// Restore every register, sensor, memory cell, and the video state
    /// to its initial value, and drop the loaded program
    pub fn reset(&mut self) {
        self.pos = 0;
        self.speed = 1;
        self.r0 = 0;
        self.r1 = 0;
        self.duration = 0;
        self.is_playing = 0;
        self.ended = 0;
        self.memory = [0; MEMORY_SIZE];
        self.stack.clear();
        self.video_title.clear();
        self.video_loaded = false;
        self.program.clear();
        self.labels.clear();
        self.pc = 0;
        self.halted = false;
        self.steps = 0;
    }

    /// Run until halted, with the default step budget
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        self.run_with_limit(DEFAULT_STEP_LIMIT)
    }

    /// Run until halted.
    ///
    /// The budget check happens before each step, so a program that
    /// halts on exactly `max_steps` dispatched instructions succeeds.
    pub fn run_with_limit(&mut self, max_steps: u64) -> Result<(), RuntimeError> {
        while !self.halted {
            if self.steps >= max_steps {
                return Err(RuntimeError::StepLimit { limit: max_steps });
            }
            self.step()?;
        }
        Ok(())
    }

    /// Execute at most one instruction.
    ///
    /// Returns without effect when already halted. Halts without
    /// counting a step when `pc` has run off the program. Otherwise the
    /// step is counted before dispatch, so on an error `steps` includes
    /// the failing instruction and `pc` still points at it.
    pub fn step(&mut self) -> Result<(), RuntimeError> {
        if self.halted {
            return Ok(());
        }
        if self.pc >= self.program.len() {
            self.halted = true;
            return Ok(());
        }

        // cloned because execute needs &mut self
        let instr = self.program[self.pc].clone();
        self.steps += 1;
        self.execute(instr)
    }

    /// Snapshot the current machine state
    pub fn state(&self) -> VmState {
        VmState {
            pos: self.pos,
            speed: self.speed,
            r0: self.r0,
            r1: self.r1,
            duration: self.duration,
            is_playing: self.is_playing,
            ended: self.ended,
            stack: self.stack.clone(),
            pc: self.pc,
            halted: self.halted,
            steps: self.steps,
            video: self.video_loaded.then(|| self.video_title.clone()),
        }
    }

    fn reg(&self, register: Register) -> i64 {
        match register {
            Register::Pos => self.pos,
            Register::Speed => self.speed,
            Register::R0 => self.r0,
            Register::R1 => self.r1,
        }
    }

    fn set_reg(&mut self, register: Register, value: i64) {
        match register {
            Register::Pos => self.pos = value,
            Register::Speed => self.speed = value,
            Register::R0 => self.r0 = value,
            Register::R1 => self.r1 = value,
        }
    }

    /// The literal-or-register rule: a lexeme naming a register reads
    /// the register, anything else must parse as a signed integer
    fn resolve(&self, lexeme: &str) -> Result<i64, RuntimeError> {
        if let Some(register) = Register::from_name(lexeme) {
            return Ok(self.reg(register));
        }
        lexeme.parse::<i64>().map_err(|_| RuntimeError::MalformedOperand {
            operand: lexeme.to_string(),
        })
    }

    /// A lexeme that must name a register
    fn register_named(&self, lexeme: &str) -> Result<Register, RuntimeError> {
        Register::from_name(lexeme).ok_or_else(|| RuntimeError::MalformedOperand {
            operand: lexeme.to_string(),
        })
    }

    /// A lexeme that must parse as an in-range memory address
    fn address(&self, lexeme: &str) -> Result<usize, RuntimeError> {
        let address = lexeme.parse::<i64>().map_err(|_| RuntimeError::MalformedOperand {
            operand: lexeme.to_string(),
        })?;
        if !(0..MEMORY_SIZE as i64).contains(&address) {
            return Err(RuntimeError::AddressOutOfRange { address });
        }
        Ok(address as usize)
    }

    fn pop(&mut self) -> Result<i64, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow)
    }

    /// Pop `b` then `a`, so `a` was pushed first
    fn pop_pair(&mut self) -> Result<(i64, i64), RuntimeError> {
        let b = self.pop()?;
        let a = self.pop()?;
        Ok((a, b))
    }

    /// Branch to a label, validating it on the way
    fn jump(&mut self, label: &str) -> Result<(), RuntimeError> {
        match self.labels.get(label) {
            Some(&target) => {
                self.pc = target;
                Ok(())
            }
            None => Err(RuntimeError::UnknownLabel {
                label: label.to_string(),
            }),
        }
    }

    fn emit(&mut self, line: &str) {
        self.sink.line(line);
    }

    fn execute(&mut self, instr: Instr) -> Result<(), RuntimeError> {
        match instr {
            // stack
            Instr::Push(lexeme) => {
                let value = self.resolve(&lexeme)?;
                self.stack.push(value);
                self.pc += 1;
            }
            Instr::Pop(lexeme) => {
                let value = self.pop()?;
                let register = self.register_named(&lexeme)?;
                self.set_reg(register, value);
                self.pc += 1;
            }
            Instr::Load(lexeme) => {
                let address = self.address(&lexeme)?;
                self.stack.push(self.memory[address]);
                self.pc += 1;
            }
            Instr::Store(lexeme) => {
                let address = self.address(&lexeme)?;
                self.memory[address] = self.pop()?;
                self.pc += 1;
            }

            // arithmetic
            Instr::Add => {
                let (a, b) = self.pop_pair()?;
                self.stack.push(a.wrapping_add(b));
                self.pc += 1;
            }
            Instr::Sub => {
                let (a, b) = self.pop_pair()?;
                self.stack.push(a.wrapping_sub(b));
                self.pc += 1;
            }
            Instr::Mul => {
                let (a, b) = self.pop_pair()?;
                self.stack.push(a.wrapping_mul(b));
                self.pc += 1;
            }
            Instr::Div => {
                let (a, b) = self.pop_pair()?;
                if b == 0 {
                    // restore the operands; the snapshot keeps the
                    // pre-DIV stack
                    self.stack.push(a);
                    self.stack.push(b);
                    return Err(RuntimeError::DivisionByZero);
                }
                self.stack.push(floor_div(a, b));
                self.pc += 1;
            }
            Instr::Neg => {
                let value = self.pop()?;
                self.stack.push(value.wrapping_neg());
                self.pc += 1;
            }

            // comparisons push 1 for true, 0 for false
            Instr::Eq => {
                let (a, b) = self.pop_pair()?;
                self.stack.push((a == b) as i64);
                self.pc += 1;
            }
            Instr::Ne => {
                let (a, b) = self.pop_pair()?;
                self.stack.push((a != b) as i64);
                self.pc += 1;
            }
            Instr::Lt => {
                let (a, b) = self.pop_pair()?;
                self.stack.push((a < b) as i64);
                self.pc += 1;
            }
            Instr::Le => {
                let (a, b) = self.pop_pair()?;
                self.stack.push((a <= b) as i64);
                self.pc += 1;
            }
            Instr::Gt => {
                let (a, b) = self.pop_pair()?;
                self.stack.push((a > b) as i64);
                self.pc += 1;
            }
            Instr::Ge => {
                let (a, b) = self.pop_pair()?;
                self.stack.push((a >= b) as i64);
                self.pc += 1;
            }

            // control flow
            Instr::Goto(label) => {
                self.jump(&label)?;
            }
            Instr::Jumpz(label) => {
                // the condition is consumed whether or not the branch
                // is taken
                let value = self.pop()?;
                if value == 0 {
                    self.jump(&label)?;
                } else {
                    self.pc += 1;
                }
            }
            Instr::Jumpi(label) => {
                let value = self.pop()?;
                if value != 0 {
                    self.jump(&label)?;
                } else {
                    self.pc += 1;
                }
            }
            Instr::Decjz(lexeme, label) => {
                // never touches the stack
                let register = self.register_named(&lexeme)?;
                if self.reg(register) == 0 {
                    self.jump(&label)?;
                } else {
                    self.set_reg(register, self.reg(register).wrapping_sub(1));
                    self.pc += 1;
                }
            }

            // streaming
            Instr::Open(title) => {
                self.video_title = title;
                self.video_loaded = true;
                self.duration = SIMULATED_DURATION;
                self.is_playing = 0;
                self.ended = 0;
                self.pos = 0;
                self.emit(&format!("[STREAM] Opened '{}'", self.video_title));
                self.pc += 1;
            }
            Instr::Play(speed) => {
                if !self.video_loaded {
                    return Err(RuntimeError::NoVideoLoaded);
                }
                self.speed = match &speed {
                    Some(lexeme) => self.resolve(lexeme)?,
                    None => 1,
                };
                self.is_playing = 1;
                self.emit(&format!("[STREAM] Playing at {}x", self.speed));
                self.pc += 1;
            }
            Instr::Pause => {
                self.is_playing = 0;
                self.emit(&format!("[STREAM] Paused at {}s", self.pos));
                self.pc += 1;
            }
            Instr::Stop => {
                self.is_playing = 0;
                self.pos = 0;
                self.emit("[STREAM] Stopped");
                self.pc += 1;
            }
            Instr::Seek(lexeme) => {
                self.pos = self.resolve(&lexeme)?;
                self.emit(&format!("[STREAM] Seeked to {}s", self.pos));
                self.pc += 1;
            }
            Instr::Forward(lexeme) => {
                let delta = self.resolve(&lexeme)?;
                self.pos = self.pos.wrapping_add(delta);
                self.emit(&format!("[STREAM] Forwarded {}s to {}s", delta, self.pos));
                self.pc += 1;
            }
            Instr::Rewind(lexeme) => {
                let delta = self.resolve(&lexeme)?;
                self.pos = self.pos.wrapping_sub(delta).max(0);
                self.emit(&format!("[STREAM] Rewound {}s to {}s", delta, self.pos));
                self.pc += 1;
            }
            Instr::Wait(lexeme) => {
                let time = self.resolve(&lexeme)?;
                if self.is_playing != 0 {
                    self.pos = self.pos.wrapping_add(time.wrapping_mul(self.speed));
                    if self.pos >= self.duration {
                        self.pos = self.duration;
                        self.ended = 1;
                        self.is_playing = 0;
                    }
                }
                self.emit(&format!("[STREAM] Waited {}s (now at {}s)", time, self.pos));
                self.pc += 1;
            }

            // sensors
            Instr::GetPos => {
                self.stack.push(self.pos);
                self.pc += 1;
            }
            Instr::GetDur => {
                self.stack.push(self.duration);
                self.pc += 1;
            }
            Instr::GetEnded => {
                self.stack.push(self.ended);
                self.pc += 1;
            }
            Instr::GetPlaying => {
                self.stack.push(self.is_playing);
                self.pc += 1;
            }

            // output
            Instr::Print => {
                let value = self.pop()?;
                self.emit(&value.to_string());
                self.pc += 1;
            }
            Instr::Prints(text) => {
                self.emit(&text);
                self.pc += 1;
            }

            Instr::Halt => {
                // pc stays on the HALT instruction
                self.emit("[VM] Execution finished");
                self.halted = true;
            }

            Instr::Unknown(opcode) => {
                return Err(RuntimeError::UnknownOpcode { opcode });
            }
        }
        Ok(())
    }
}

/// Division truncated toward negative infinity.
/// `i64::MIN / -1` wraps instead of panicking.
fn floor_div(a: i64, b: i64) -> i64 {
    let quotient = a.wrapping_div(b);
    let remainder = a.wrapping_rem(b);
    if remainder != 0 && (remainder < 0) != (b < 0) {
        quotient - 1
    } else {
        quotient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture_vm() -> StreamVm<Vec<String>> {
        StreamVm::with_sink(Vec::new())
    }

    fn run_source(source: &str) -> StreamVm<Vec<String>> {
        let mut vm = capture_vm();
        vm.load_program(source).expect("program should assemble");
        vm.run().expect("program should run to completion");
        vm
    }

    #[test]
    fn floor_div_matches_reference_semantics() {
        assert_eq!(floor_div(7, 2), 3);
        assert_eq!(floor_div(-7, 2), -4);
        assert_eq!(floor_div(7, -2), -4);
        assert_eq!(floor_div(-7, -2), 3);
        assert_eq!(floor_div(6, 3), 2);
        assert_eq!(floor_div(i64::MIN, -1), i64::MIN);
    }

    #[test]
    fn push_pop_moves_value_into_register() {
        let vm = run_source("PUSH 7\nPOP R0\nHALT");
        let state = vm.state();
        assert_eq!(state.r0, 7);
        assert!(state.stack.is_empty());
    }

    #[test]
    fn register_operands_are_case_insensitive() {
        let vm = run_source("PUSH 3\nPOP r0\nPUSH r0\nPOP R1\nHALT");
        assert_eq!(vm.state().r1, 3);
    }

    #[test]
    fn unknown_opcode_fails_only_when_reached() {
        let vm = run_source("HALT\nFROB 1");
        assert_eq!(vm.state().steps, 1);

        let mut vm = capture_vm();
        vm.load_program("FROB 1").unwrap();
        let err = vm.run().unwrap_err();
        assert_eq!(err, RuntimeError::UnknownOpcode { opcode: "FROB".to_string() });
        let state = vm.state();
        assert_eq!(state.pc, 0);
        assert_eq!(state.steps, 1);
        assert!(!state.halted);
    }

    #[test]
    fn malformed_operand_fails_only_when_reached() {
        let vm = run_source("HALT\nPUSH banana");
        assert_eq!(vm.state().steps, 1);

        let mut vm = capture_vm();
        vm.load_program("PUSH banana").unwrap();
        let err = vm.run().unwrap_err();
        assert_eq!(err, RuntimeError::MalformedOperand { operand: "banana".to_string() });
        let state = vm.state();
        assert_eq!(state.pc, 0);
        assert_eq!(state.steps, 1);
    }

    #[test]
    fn missing_operand_is_malformed_at_runtime() {
        let mut vm = capture_vm();
        vm.load_program("SEEK").unwrap();
        let err = vm.run().unwrap_err();
        assert_eq!(err, RuntimeError::MalformedOperand { operand: String::new() });
    }

    #[test]
    fn pop_requires_a_register_name() {
        let mut vm = capture_vm();
        vm.load_program("PUSH 1\nPOP 5\nHALT").unwrap();
        let err = vm.run().unwrap_err();
        assert_eq!(err, RuntimeError::MalformedOperand { operand: "5".to_string() });
        assert_eq!(vm.state().pc, 1);
    }

    #[test]
    fn memory_addresses_are_checked_when_reached() {
        let vm = run_source("HALT\nSTORE 999");
        assert_eq!(vm.state().steps, 1);

        let mut vm = capture_vm();
        vm.load_program("PUSH 1\nSTORE 256\nHALT").unwrap();
        let err = vm.run().unwrap_err();
        assert_eq!(err, RuntimeError::AddressOutOfRange { address: 256 });

        let mut vm = capture_vm();
        vm.load_program("LOAD -1\nHALT").unwrap();
        let err = vm.run().unwrap_err();
        assert_eq!(err, RuntimeError::AddressOutOfRange { address: -1 });
    }

    #[test]
    fn jumpz_consumes_condition_even_when_not_branching() {
        let vm = run_source("PUSH 1\nJUMPZ nowhere\nHALT");
        assert!(vm.state().stack.is_empty());
    }

    #[test]
    fn decjz_leaves_stack_alone() {
        let vm = run_source("PUSH 9\nDECJZ R0 end\nend:\nHALT");
        assert_eq!(vm.state().stack, vec![9]);
    }

    #[test]
    fn step_on_halted_machine_has_no_effect() {
        let mut vm = capture_vm();
        vm.load_program("HALT").unwrap();
        vm.run().unwrap();
        let steps = vm.state().steps;
        vm.step().unwrap();
        assert_eq!(vm.state().steps, steps);
    }

    #[test]
    fn falling_off_the_end_halts_without_a_step() {
        let mut vm = capture_vm();
        vm.load_program("PUSH 1").unwrap();
        vm.run().unwrap();
        let state = vm.state();
        assert!(state.halted);
        assert_eq!(state.steps, 1);
        assert_eq!(state.pc, 1);
    }

    #[test]
    fn label_at_end_of_program_is_a_valid_target() {
        let vm = run_source("GOTO end\nend:");
        let state = vm.state();
        assert!(state.halted);
        assert_eq!(state.steps, 1);
        assert_eq!(state.pc, 1);
    }

    #[test]
    fn goto_unknown_label_fails_in_place() {
        let mut vm = capture_vm();
        vm.load_program("GOTO nowhere").unwrap();
        let err = vm.run().unwrap_err();
        assert_eq!(err, RuntimeError::UnknownLabel { label: "nowhere".to_string() });
        let state = vm.state();
        assert_eq!(state.pc, 0);
        assert_eq!(state.steps, 1);
        assert!(!state.halted);
    }

    #[test]
    fn play_without_video_fails() {
        let mut vm = capture_vm();
        vm.load_program("PLAY\nHALT").unwrap();
        assert_eq!(vm.run().unwrap_err(), RuntimeError::NoVideoLoaded);
    }

    #[test]
    fn play_speed_defaults_to_one() {
        let vm = run_source("OPEN \"clip\"\nPUSH 4\nPOP SPEED\nPLAY\nHALT");
        let state = vm.state();
        assert_eq!(state.speed, 1);
        assert_eq!(state.is_playing, 1);
    }

    #[test]
    fn wait_while_paused_leaves_position_alone() {
        let vm = run_source("OPEN \"clip\"\nSEEK 10\nWAIT 60\nHALT");
        let state = vm.state();
        assert_eq!(state.pos, 10);
        assert_eq!(state.ended, 0);
    }

    #[test]
    fn seek_and_forward_are_not_clamped() {
        let vm = run_source("OPEN \"clip\"\nSEEK 500\nFORWARD 100\nHALT");
        assert_eq!(vm.state().pos, 600);
    }

    #[test]
    fn rewind_clamps_at_zero() {
        let vm = run_source("OPEN \"clip\"\nSEEK 10\nREWIND 50\nHALT");
        assert_eq!(vm.state().pos, 0);
    }

    #[test]
    fn open_resets_sensors_and_position() {
        let vm = run_source("OPEN \"a\"\nPLAY 2\nWAIT 100\nOPEN \"b\"\nHALT");
        let state = vm.state();
        assert_eq!(state.pos, 0);
        assert_eq!(state.ended, 0);
        assert_eq!(state.is_playing, 0);
        assert_eq!(state.duration, SIMULATED_DURATION);
        assert_eq!(state.video.as_deref(), Some("b"));
    }

    #[test]
    fn print_writes_decimal_lines_to_the_sink() {
        let vm = run_source("PUSH -42\nPRINT\nHALT");
        assert_eq!(vm.sink()[0], "-42");
        assert!(vm.sink()[1].contains("[VM]"));
    }

    #[test]
    fn reload_preserves_registers_and_memory() {
        let mut vm = capture_vm();
        vm.load_program("PUSH 5\nPOP R0\nPUSH 7\nSTORE 3\nHALT").unwrap();
        vm.run().unwrap();

        vm.load_program("LOAD 3\nPOP R1\nHALT").unwrap();
        let state = vm.state();
        assert_eq!(state.steps, 0);
        assert_eq!(state.pc, 0);
        assert!(!state.halted);

        vm.run().unwrap();
        let state = vm.state();
        assert_eq!(state.r0, 5);
        assert_eq!(state.r1, 7);
    }

    #[test]
    fn reset_restores_the_initial_machine() {
        let mut vm = capture_vm();
        vm.load_program("OPEN \"clip\"\nPLAY 3\nWAIT 2\nPUSH 9\nSTORE 0\nHALT").unwrap();
        vm.run().unwrap();
        vm.reset();

        let state = vm.state();
        assert_eq!(state.pos, 0);
        assert_eq!(state.speed, 1);
        assert_eq!(state.duration, 0);
        assert_eq!(state.video, None);
        assert_eq!(state.steps, 0);

        vm.load_program("LOAD 0\nPOP R0\nHALT").unwrap();
        vm.run().unwrap();
        assert_eq!(vm.state().r0, 0);
    }

    #[test]
    fn failed_load_leaves_an_empty_program() {
        let mut vm = capture_vm();
        vm.load_program("PUSH 1\nHALT").unwrap();
        assert!(vm.load_program("dup:\ndup:\nHALT").is_err());
        vm.run().unwrap();
        assert_eq!(vm.state().steps, 0);
    }
}
