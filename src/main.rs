use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser};

use ppap::cli::{self, Mode};

#[derive(Parser)]
#[command(name = "ppap")]
#[command(version)]
#[command(about = "PPAP language interpreter and C translator", long_about = None)]
struct Cli {
    /// Source file; standard input when absent or `-`
    file: Option<PathBuf>,

    #[command(flatten)]
    mode: ModeArgs,
}

/// At most one of these may be given; none means interpret.
#[derive(Args)]
#[group(multiple = false)]
struct ModeArgs {
    /// Print the program translated to C instead of running it
    #[arg(long, visible_alias = "to_c")]
    to_c: bool,

    /// Print the parsed instruction list and name table
    #[arg(long)]
    list: bool,

    /// Step through the program interactively
    #[arg(long)]
    step: bool,

    /// Interpret, logging every executed instruction to stderr
    #[arg(long)]
    trace: bool,
}

impl ModeArgs {
    fn mode(&self) -> Mode {
        if self.to_c {
            Mode::ToC
        } else if self.list {
            Mode::List
        } else if self.step {
            Mode::Step
        } else {
            Mode::Run { trace: self.trace }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = cli::read_source(cli.file.as_deref())
        .and_then(|source| cli::run(&source, cli.mode.mode()));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
