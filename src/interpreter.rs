use std::collections::HashMap;

use num_bigint::BigInt;
use num_traits::Zero;
use thiserror::Error;

use crate::instruction::{Comparison, Instruction};

/// Valid memory addresses are `0..MEMORY_SIZE`.
pub const MEMORY_SIZE: usize = 1 << 24;

/// Stored by `Pick` once the input is exhausted.
pub const END_OF_INPUT: i64 = -1;

pub trait Output {
    fn send_int(&mut self, val: &BigInt);
    fn send_char(&mut self, ch: char);
}

pub trait Input {
    /// `Ok(None)` at end of input.
    fn take(&mut self) -> Result<Option<char>, String>;
}

pub trait Log {
    fn log(&mut self, msg: String);
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("memory address to store is out of range: {0}")]
    StoreOutOfRange(BigInt),

    #[error("memory address to load is out of range: {0}")]
    LoadOutOfRange(BigInt),

    #[error("division by zero")]
    DivisionByZero,

    #[error("register '{0}' is read before its declaration has run")]
    Uninitialized(String),

    #[error("jump to undefined label '{0}'")]
    UndefinedLabel(String),

    #[error("{0} is not a character code")]
    InvalidChar(BigInt),

    #[error("input error: {0}")]
    Input(String),
}

pub struct Interpreter<'a, I: Input, O: Output, L: Log> {
    program: &'a [Instruction],
    labels: HashMap<&'a str, usize>,
    registers: HashMap<&'a str, BigInt>,
    memory: HashMap<usize, BigInt>,
    pc: usize,
    input: &'a mut I,
    output: &'a mut O,
    logger: &'a mut L,
}

impl<'a, I: Input, O: Output, L: Log> Interpreter<'a, I, O, L> {
    pub fn new(
        program: &'a [Instruction],
        input: &'a mut I,
        output: &'a mut O,
        logger: &'a mut L,
    ) -> Self {
        // a repeated label resolves to its last occurrence
        let labels = program
            .iter()
            .enumerate()
            .filter_map(|(i, ins)| match ins {
                Instruction::Label(name) => Some((name.as_str(), i)),
                _ => None,
            })
            .collect();

        Self {
            program,
            labels,
            registers: HashMap::new(),
            memory: HashMap::new(),
            pc: 0,
            input,
            output,
            logger,
        }
    }

    pub fn is_halted(&self) -> bool {
        self.pc >= self.program.len()
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Registers whose declaration has run, sorted by name.
    pub fn registers(&self) -> Vec<(&'a str, BigInt)> {
        let mut regs: Vec<_> = self
            .registers
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect();
        regs.sort_unstable();
        regs
    }

    pub fn memory_used(&self) -> usize {
        self.memory.len()
    }

    /// Runs until the program counter falls off the end.
    pub fn run(&mut self) -> Result<usize, RuntimeError> {
        let mut ins_count = 0;

        while !self.is_halted() {
            self.step()?;
            ins_count += 1;
        }

        Ok(ins_count)
    }

    /// Like [`Interpreter::run`], but gives up after `max_steps`.
    pub fn run_for(&mut self, max_steps: usize) -> Result<usize, RuntimeError> {
        let mut ins_count = 0;

        while !self.is_halted() && ins_count < max_steps {
            self.step()?;
            ins_count += 1;
        }

        Ok(ins_count)
    }

    pub fn step(&mut self) -> Result<(), RuntimeError> {
        let program = self.program;
        let Some(ins) = program.get(self.pc) else {
            self.logger.log("Cannot step: program has finished".into());
            return Ok(());
        };

        self.logger
            .log(format!("Fetched instruction: {} at index {}", ins, self.pc));

        self.pc += 1;

        match ins {
            Instruction::Declare { name, value } => self.write(name, value.clone()),
            Instruction::Label(_) => (),
            Instruction::Move { dst, src } => {
                let val = self.read(src)?;
                self.write(dst, val);
            }
            Instruction::Add { dst, src } => self.arith(dst, src, |lhs, rhs| lhs + rhs)?,
            Instruction::Sub { dst, src } => self.arith(dst, src, |lhs, rhs| lhs - rhs)?,
            Instruction::Mul { dst, src } => self.arith(dst, src, |lhs, rhs| lhs * rhs)?,
            Instruction::Div { dst, src } => self.div(dst, src)?,
            Instruction::Store { src, addr } => self.store(src, addr)?,
            Instruction::Load { dst, addr } => self.load(dst, addr)?,
            Instruction::PrintInt(reg) => {
                let val = self.read(reg)?;
                self.logger.log(format!("--> {val} was output"));
                self.output.send_int(&val);
            }
            Instruction::PrintChars(regs) => {
                for reg in regs {
                    let code = self.read(reg)?;
                    let Some(ch) = u32::try_from(&code).ok().and_then(char::from_u32) else {
                        return Err(RuntimeError::InvalidChar(code));
                    };
                    self.logger.log(format!("--> {ch:?} was output"));
                    self.output.send_char(ch);
                }
            }
            Instruction::ReadChar(reg) => {
                let code = match self.input.take().map_err(RuntimeError::Input)? {
                    Some(ch) => BigInt::from(u32::from(ch)),
                    None => BigInt::from(END_OF_INPUT),
                };
                self.logger.log(format!("--> {code} was input"));
                self.write(reg, code);
            }
            Instruction::Compare { op, lhs, rhs } => {
                let holds = self.holds(*op, lhs, rhs)?;
                self.write(lhs, BigInt::from(u8::from(holds)));
            }
            Instruction::JumpIf {
                op,
                lhs,
                rhs,
                label,
            } => {
                if self.holds(*op, lhs, rhs)? {
                    self.jump(label)?;
                }
            }
            Instruction::Jump(label) => self.jump(label)?,
        };

        Ok(())
    }

    fn read(&self, reg: &str) -> Result<BigInt, RuntimeError> {
        self.registers
            .get(reg)
            .cloned()
            .ok_or_else(|| RuntimeError::Uninitialized(reg.to_owned()))
    }

    fn write(&mut self, reg: &'a str, val: BigInt) {
        self.logger.log(format!("--> {reg} = {val}"));
        self.registers.insert(reg, val);
    }

    fn arith(
        &mut self,
        dst: &'a str,
        src: &str,
        op: fn(BigInt, BigInt) -> BigInt,
    ) -> Result<(), RuntimeError> {
        let val = op(self.read(dst)?, self.read(src)?);
        self.write(dst, val);
        Ok(())
    }

    /// Truncates toward zero.
    fn div(&mut self, dst: &'a str, src: &str) -> Result<(), RuntimeError> {
        let (lhs, rhs) = (self.read(dst)?, self.read(src)?);
        if rhs.is_zero() {
            return Err(RuntimeError::DivisionByZero);
        }

        self.write(dst, lhs / rhs);
        Ok(())
    }

    fn address(
        &self,
        reg: &str,
        out_of_range: fn(BigInt) -> RuntimeError,
    ) -> Result<usize, RuntimeError> {
        let addr = self.read(reg)?;
        match usize::try_from(&addr) {
            Ok(index) if index < MEMORY_SIZE => Ok(index),
            _ => Err(out_of_range(addr)),
        }
    }

    fn store(&mut self, src: &str, addr: &str) -> Result<(), RuntimeError> {
        let addr = self.address(addr, RuntimeError::StoreOutOfRange)?;

        let val = self.read(src)?;
        self.logger.log(format!("--> memory[{addr}] = {val}"));
        self.memory.insert(addr, val);
        Ok(())
    }

    fn load(&mut self, dst: &'a str, addr: &str) -> Result<(), RuntimeError> {
        let addr = self.address(addr, RuntimeError::LoadOutOfRange)?;

        let val = self.memory.get(&addr).cloned().unwrap_or_default();
        self.write(dst, val);
        Ok(())
    }

    fn holds(&self, op: Comparison, lhs: &str, rhs: &str) -> Result<bool, RuntimeError> {
        Ok(op.holds(&self.read(lhs)?, &self.read(rhs)?))
    }

    fn jump(&mut self, label: &str) -> Result<(), RuntimeError> {
        let target = *self
            .labels
            .get(label)
            .ok_or_else(|| RuntimeError::UndefinedLabel(label.to_owned()))?;

        self.logger.log(format!("--> jump to {label} ({target})"));
        self.pc = target;
        Ok(())
    }
}
