use std::fs;
use std::io::Write;
use std::process::{Command, Stdio};

use ppap::{
    make_program, to_c, Comparison, Diagnostic, Instruction, Interpreter, NoLog, QueueInput,
    RuntimeError, StringOutput,
};

const PPAP_DEMO: &str = include_str!("../demos/ppap.ppap");
const ECHO_DEMO: &str = include_str!("../demos/echo.ppap");

fn instructions(source: &str) -> Vec<Instruction> {
    let compilation = make_program(source);
    match compilation.program {
        Some(program) => program.instructions,
        None => panic!("parse failed: {:?}", compilation.diagnostics),
    }
}

fn interpret(program: &[Instruction], input: &str) -> Result<String, RuntimeError> {
    let mut input = QueueInput::new(input);
    let mut output = StringOutput::default();
    let mut logger = NoLog;

    Interpreter::new(program, &mut input, &mut output, &mut logger).run()?;

    Ok(output.text)
}

fn run(source: &str) -> Result<String, RuntimeError> {
    interpret(&instructions(source), "")
}

#[test]
fn single_declaration() {
    let program = instructions("I have a P\n");

    assert_eq!(
        program,
        vec![Instruction::Declare {
            name: "P".into(),
            value: 1.into()
        }]
    );
    assert_eq!(interpret(&program, "").unwrap(), "");
}

#[test]
fn append_and_print() {
    let src = "I have 5 P\nI have 3 Q\nUh! Append-P-Q\nUh! Print-P\n";
    assert_eq!(run(src).unwrap(), "8");
}

#[test]
fn self_jump_never_halts() {
    let program = instructions("I have no P\nP-P\nUh! Jump-P-P\n");
    let mut input = QueueInput::default();
    let mut output = StringOutput::default();
    let mut logger = NoLog;
    let mut interpreter = Interpreter::new(&program, &mut input, &mut output, &mut logger);

    assert_eq!(interpreter.run_for(100_000).unwrap(), 100_000);
    assert!(!interpreter.is_halted());
}

#[test]
fn inverted_compare_of_equal_values() {
    let src = "
        I have 7 P
        I have 7 Q
        Uh! Compare-P-Q?
        Uh! Print-P
        Uh! Print-Q\n";
    let program = instructions(src);

    assert!(program.contains(&Instruction::Compare {
        op: Comparison::Ne,
        lhs: "P".into(),
        rhs: "Q".into(),
    }));
    assert_eq!(interpret(&program, "").unwrap(), "07");
}

#[test]
fn chop_truncates() {
    assert_eq!(
        run("I have 7 P\nI have 2 Q\nUh! Chop-P-Q\nUh! Print-P\n").unwrap(),
        "3"
    );
    assert_eq!(
        run("I have 7 Pa\nI have no P\nI have 2 Q\nUh! Rip-P-Pa\nUh! Chop-P-Q\nUh! Print-P\n")
            .unwrap(),
        "-3"
    );
}

#[test]
fn register_without_p_still_declares() {
    let compilation = make_program("I have 3 ZZ\nUh! Print-ZZ\n");

    assert_eq!(
        compilation.diagnostics,
        vec![Diagnostic::MissingP {
            line: 1,
            name: "ZZ".into()
        }]
    );

    let program = compilation.program.unwrap();
    assert_eq!(interpret(&program.instructions, "").unwrap(), "3");
}

#[test]
fn syntax_error_poisons_the_whole_parse() {
    let compilation = make_program("I have a P\nUh! Print-P\nUh! Print-P!\nUh! Print-P\n");

    assert!(compilation.program.is_none());
    let messages: Vec<String> = compilation
        .diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect();
    assert_eq!(messages, vec!["line 3: '!' syntax error"]);
}

#[test]
fn unterminated_last_line_runs_nothing() {
    for source in ["I have a P\nUh! Print-P", ""] {
        let compilation = make_program(source);

        assert!(compilation.program.is_none(), "{source:?}");
        let messages: Vec<String> = compilation
            .diagnostics
            .iter()
            .map(|d| d.to_string())
            .collect();
        assert_eq!(messages, vec!["syntax error at eof"]);
    }
}

#[test]
fn integers_do_not_overflow() {
    let src = "I have 4294967296 P\nUh! Multiply-P-P\nUh! Print-P\n";
    assert_eq!(run(src).unwrap(), "18446744073709551616");

    let src = "I have 99999999999999999999 P\nUh! Print-P\n";
    assert_eq!(run(src).unwrap(), "99999999999999999999");
}

#[test]
fn lexical_errors_are_not_fatal() {
    let compilation = make_program("I have a P $\nUh! Print-P\n");

    assert_eq!(
        compilation.diagnostics,
        vec![Diagnostic::IllegalCharacter { line: 1, ch: '$' }]
    );
    let program = compilation.program.unwrap();
    assert_eq!(interpret(&program.instructions, "").unwrap(), "1");
}

#[test]
fn undeclared_lines_vanish_from_the_program() {
    let compilation = make_program("I have a P\nUh! Print-Q\nUh! Print-P\n");

    let program = compilation.program.unwrap();
    assert_eq!(program.instructions.len(), 2);
    assert_eq!(interpret(&program.instructions, "").unwrap(), "1");
    assert_eq!(
        compilation.diagnostics,
        vec![Diagnostic::UndeclaredRegister {
            line: 2,
            name: "Q".into()
        }]
    );
}

#[test]
fn demo_programs() {
    assert_eq!(run(PPAP_DEMO).unwrap(), "PPAP\n321\n");

    let echo = instructions(ECHO_DEMO);
    assert_eq!(interpret(&echo, "pen\u{3042}").unwrap(), "pen\u{3042}4");
    assert_eq!(interpret(&echo, "").unwrap(), "0");
}

#[test]
fn demo_programs_are_clean() {
    for source in [PPAP_DEMO, ECHO_DEMO] {
        assert!(make_program(source).diagnostics.is_empty());
    }
}

/// Compiles the C translation with the system compiler, if there is one,
/// and checks it prints what the interpreter prints.
fn native_output(program: &[Instruction], input: &str, name: &str) -> Option<String> {
    let cc_available = Command::new("cc")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    if !cc_available {
        return None;
    }

    let dir = std::env::temp_dir().join(format!("ppap-{}-{name}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let c_path = dir.join("main.c");
    let exe_path = dir.join("main");
    fs::write(&c_path, to_c(program)).unwrap();

    let status = Command::new("cc")
        .arg("-o")
        .arg(&exe_path)
        .arg(&c_path)
        .status()
        .unwrap();
    assert!(status.success(), "cc failed on {}", c_path.display());

    let mut child = Command::new(&exe_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();

    let _ = fs::remove_dir_all(&dir);
    Some(String::from_utf8(output.stdout).unwrap())
}

#[test]
fn lowered_programs_match_the_interpreter() {
    let cases = [
        ("ppap", PPAP_DEMO, ""),
        ("echo", ECHO_DEMO, "pen\u{e9}\u{3042}"),
        (
            "memory",
            "I have 42 P\nI have 16777215 Ap\nI have no Pp\nUh! Push-P-Ap\nUh! Pull-Pp-Ap\nUh! Print-Pp\nUh! Pull-Pp-Pp\nUh! Print-Pp\n",
            "",
        ),
        (
            "compare",
            "I have 7 P\nI have 9 Q\nUh! Superior-Q-P?\nUh! Print-Q\nUh! Rip-P-Q\nUh! Compare-P-Q\nUh! Print-P\n",
            "",
        ),
        (
            "library-names",
            "I have 3 EOF\nI have 80 FILE\nI have no NULL\nEOF-NULL\nUh! Put-FILE\nUh! Rip-EOF-FILE\nUh! Superior-EOF-NULL-EOF-NULL!\nUh! Print-EOF\n",
            "",
        ),
    ];

    for (name, source, input) in cases {
        let program = instructions(source);
        let interpreted = interpret(&program, input).unwrap();

        if let Some(native) = native_output(&program, input, name) {
            assert_eq!(native, interpreted, "{name}");
        }
    }
}
