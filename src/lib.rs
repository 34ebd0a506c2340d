mod diagnostic;
mod instruction;
mod interpreter;
mod lex;
mod parse;
mod to_c;
mod vec_io;

pub mod cli;

pub use diagnostic::Diagnostic;
pub use instruction::{Comparison, Instruction};
pub use interpreter::{
    Input, Interpreter, Log, Output, RuntimeError, END_OF_INPUT, MEMORY_SIZE,
};
pub use lex::{tokenize, Token, TokenKind};
pub use parse::{parse, NameKind, NameTable, ParseInfo, ParseOutput};
pub use to_c::{to_c, CSource};
pub use vec_io::{NoLog, QueueInput, StringOutput, VecLog};

#[derive(Debug)]
pub struct PpapProgram {
    pub instructions: Vec<Instruction>,
    pub names: NameTable,
}

/// The result of running the front end over one source text.
#[derive(Debug)]
pub struct Compilation {
    /// `None` when any line had a syntax error.
    pub program: Option<PpapProgram>,
    /// Lexer and parser diagnostics in the order they were found.
    pub diagnostics: Vec<Diagnostic>,
}

pub fn make_program(source: &str) -> Compilation {
    let (tokens, mut diagnostics) = lex::tokenize(source);
    let output = parse::parse(&tokens);

    diagnostics.extend(output.diagnostics);

    let program = (!output.failed).then(|| PpapProgram {
        instructions: output.info.instructions,
        names: output.info.names,
    });

    Compilation {
        program,
        diagnostics,
    }
}
