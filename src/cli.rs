use num_bigint::BigInt;
use tabled::{builder::Builder, settings::Style, Table, Tabled};
use thiserror::Error;

use std::io::{self, Read, Write};
use std::path::Path;
use std::{fs, str};

use crate::instruction::Instruction;
use crate::interpreter::{Input, Interpreter, Log, Output, RuntimeError};
use crate::parse::{NameKind, NameTable};
use crate::to_c::CSource;
use crate::vec_io::NoLog;
use crate::PpapProgram;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Run { trace: bool },
    ToC,
    List,
    Step,
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("parsing failed, nothing was run")]
    ParseFailed,

    #[error("error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("error: {0}")]
    Io(#[from] io::Error),
}

struct ConsoleInput {
    bytes: io::Bytes<io::Stdin>,
}

impl ConsoleInput {
    fn new() -> Self {
        Self {
            bytes: io::stdin().bytes(),
        }
    }

    fn next_byte(&mut self) -> Result<Option<u8>, String> {
        self.bytes.next().transpose().map_err(|e| format!("{e}"))
    }
}

impl Input for ConsoleInput {
    fn take(&mut self) -> Result<Option<char>, String> {
        let Some(first) = self.next_byte()? else {
            return Ok(None);
        };

        let len = match first {
            0x00..=0x7F => 1,
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => return Err(format!("invalid UTF-8 lead byte {first:#04x}")),
        };

        let mut buf = [first, 0, 0, 0];
        for slot in buf.iter_mut().take(len).skip(1) {
            *slot = self
                .next_byte()?
                .ok_or("input ends inside a character")?;
        }

        let text = str::from_utf8(&buf[..len]).map_err(|e| format!("{e}"))?;
        Ok(text.chars().next())
    }
}

struct ConsoleOutput;

impl Output for ConsoleOutput {
    fn send_int(&mut self, val: &BigInt) {
        print!("{val}");
        let _ = io::stdout().flush();
    }

    fn send_char(&mut self, ch: char) {
        print!("{ch}");
        let _ = io::stdout().flush();
    }
}

struct CLILogger;

impl Log for CLILogger {
    fn log(&mut self, msg: String) {
        eprintln!("{msg}");
    }
}

#[derive(Tabled)]
struct InstructionRow {
    index: usize,
    op: &'static str,
    operands: String,
}

#[derive(Tabled)]
struct NameRow<'a> {
    name: &'a str,
    kind: &'static str,
}

impl InstructionRow {
    fn new(index: usize, ins: &Instruction) -> Self {
        Self {
            index,
            op: ins.mnemonic(),
            operands: ins.operands(),
        }
    }
}

/// Reads the whole program text from `path`, or from stdin for `None`/`-`.
pub fn read_source(path: Option<&Path>) -> Result<String, CliError> {
    match path {
        Some(path) if path != Path::new("-") => Ok(fs::read_to_string(path)?),
        _ => {
            let mut source = String::new();
            io::stdin().read_to_string(&mut source)?;
            Ok(source)
        }
    }
}

/// Runs the front end, printing every diagnostic to stderr.
fn compile(source: &str) -> Result<PpapProgram, CliError> {
    let compilation = crate::make_program(source);

    for diagnostic in &compilation.diagnostics {
        eprintln!("{diagnostic}");
    }

    compilation.program.ok_or(CliError::ParseFailed)
}

pub fn run(source: &str, mode: Mode) -> Result<(), CliError> {
    let program = compile(source)?;

    match mode {
        Mode::Run { trace: false } => execute(&program, &mut NoLog, false),
        Mode::Run { trace: true } => execute(&program, &mut CLILogger, true),
        Mode::ToC => {
            print!("{}", CSource::new(&program.instructions));
            Ok(())
        }
        Mode::List => {
            println!("{}", listing(&program.instructions));
            println!("{}", name_table(&program.names));
            Ok(())
        }
        Mode::Step => run_debugger(&program),
    }
}

fn execute<L: Log>(program: &PpapProgram, logger: &mut L, summary: bool) -> Result<(), CliError> {
    let mut input = ConsoleInput::new();
    let mut output = ConsoleOutput;

    let mut interpreter = Interpreter::new(&program.instructions, &mut input, &mut output, logger);
    let ins_count = interpreter.run()?;

    if summary {
        eprintln!("\n--- summary ---");
        eprintln!("instruction count: {ins_count}");
        eprintln!("memory cells used: {}", interpreter.memory_used());
        eprintln!("{}", register_table(&interpreter.registers()));
    }

    Ok(())
}

fn listing(instructions: &[Instruction]) -> String {
    let rows = instructions
        .iter()
        .enumerate()
        .map(|(i, ins)| InstructionRow::new(i, ins));

    Table::new(rows).with(Style::sharp()).to_string()
}

fn name_table(names: &NameTable) -> String {
    let rows = names.entries().into_iter().map(|(name, kind)| NameRow {
        name,
        kind: match kind {
            NameKind::Register => "register",
            NameKind::Label => "label",
        },
    });

    Table::new(rows).with(Style::sharp()).to_string()
}

fn register_table(registers: &[(&str, BigInt)]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["register", "value"]);

    for (name, value) in registers {
        builder.push_record([name.to_string(), value.to_string()]);
    }

    builder.build().with(Style::sharp()).to_string()
}

fn instruction_window(instructions: &[Instruction], pc: usize) -> String {
    const HEIGHT: usize = 15;

    let min = pc
        .saturating_sub(HEIGHT / 2)
        .min(instructions.len().saturating_sub(HEIGHT));

    let mut builder = Builder::default();
    builder.push_record(["pc", "index", "instruction"]);

    for (index, ins) in instructions.iter().enumerate().skip(min).take(HEIGHT) {
        let arrow = if index == pc { ">" } else { "" };
        builder.push_record([arrow.to_owned(), index.to_string(), ins.to_string()]);
    }

    builder.build().with(Style::sharp()).to_string()
}

/// Asks how many instructions to run next. An empty answer means one,
/// end of input means run to the end.
fn prompt_step_count() -> usize {
    loop {
        eprint!(">>> ");
        let _ = io::stderr().flush();

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) => return usize::MAX,
            Ok(_) => (),
            Err(_) => continue,
        }

        let input = input.trim();
        if input.is_empty() {
            return 1;
        }

        if let Ok(n) = input.parse::<usize>() {
            return n.max(1);
        }
    }
}

fn run_debugger(program: &PpapProgram) -> Result<(), CliError> {
    let instructions = &program.instructions;

    let mut input = ConsoleInput::new();
    let mut output = ConsoleOutput;
    let mut logger = CLILogger;

    let mut interpreter = Interpreter::new(instructions, &mut input, &mut output, &mut logger);
    let mut ins_count = 0;
    let mut skip_count = 0;

    while !interpreter.is_halted() {
        if skip_count == 0 {
            eprintln!("\n--- ins #{ins_count} ---");
            eprintln!("{}", instruction_window(instructions, interpreter.pc()));
            eprintln!("{}", register_table(&interpreter.registers()));

            skip_count = prompt_step_count();
        }

        interpreter.step()?;
        ins_count += 1;
        skip_count -= 1;
    }

    let mut builder = Builder::default();
    builder.push_record(["ins_count", "memory cells"]);
    builder.push_record([ins_count.to_string(), interpreter.memory_used().to_string()]);

    eprintln!("\n--- summary ---");
    eprintln!("{}", builder.build().with(Style::sharp()));
    eprintln!("{}", register_table(&interpreter.registers()));

    Ok(())
}
