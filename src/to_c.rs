//! Lowers an instruction list to a single-function C program.
//!
//! Registers become `long long` locals, labels become `goto` targets and the
//! memory is one `calloc`'d block. Address checks, UTF-8 output and UTF-8
//! input go through small helpers. As long as every value fits in 64 bits
//! the compiled program prints exactly what the interpreter prints, fatal
//! errors included.

use std::collections::HashSet;
use std::fmt;

use crate::instruction::Instruction;

const PREAMBLE: &str = "#include <stdio.h>
#include <stdlib.h>
";

const MEMORY_HELPER: &str = r#"
#define PPAP_MEMORY_SIZE (1 << 24)

static long long ppap_address(long long addr, const char *what)
{
    if (addr < 0 || addr >= PPAP_MEMORY_SIZE) {
        fprintf(stderr, "error: memory address to %s is out of range: %lld\n", what, addr);
        exit(1);
    }
    return addr;
}
"#;

const PUTC_HELPER: &str = r#"
static void ppap_putc(long long c)
{
    if (c < 0 || c > 0x10FFFF || (c >= 0xD800 && c <= 0xDFFF)) {
        fflush(stdout);
        fprintf(stderr, "error: %lld is not a character code\n", c);
        exit(1);
    }
    if (c < 0x80) {
        putchar((int)c);
    } else if (c < 0x800) {
        putchar((int)(0xC0 | (c >> 6)));
        putchar((int)(0x80 | (c & 0x3F)));
    } else if (c < 0x10000) {
        putchar((int)(0xE0 | (c >> 12)));
        putchar((int)(0x80 | ((c >> 6) & 0x3F)));
        putchar((int)(0x80 | (c & 0x3F)));
    } else {
        putchar((int)(0xF0 | (c >> 18)));
        putchar((int)(0x80 | ((c >> 12) & 0x3F)));
        putchar((int)(0x80 | ((c >> 6) & 0x3F)));
        putchar((int)(0x80 | (c & 0x3F)));
    }
}
"#;

const GETC_HELPER: &str = r#"
static long long ppap_getc(void)
{
    int c = getchar();
    if (c == EOF) {
        return -1;
    }
    int extra = c >= 0xF0 ? 3 : c >= 0xE0 ? 2 : c >= 0xC0 ? 1 : 0;
    long long code = extra ? (c & (0x3F >> extra)) : c;
    while (extra-- > 0) {
        int next = getchar();
        if (next == EOF) {
            break;
        }
        code = (code << 6) | (next & 0x3F);
    }
    return code;
}
"#;

const ALLOC_MEMORY: &str = "    long long *memory = calloc(PPAP_MEMORY_SIZE, sizeof(long long));
    if (memory == NULL) {
        fprintf(stderr, \"error: cannot allocate memory\\n\");
        return 1;
    }
";

pub struct CSource<'a> {
    program: &'a [Instruction],
}

impl<'a> CSource<'a> {
    pub fn new(program: &'a [Instruction]) -> Self {
        Self { program }
    }

    fn any(&self, pred: fn(&Instruction) -> bool) -> bool {
        self.program.iter().any(pred)
    }

    /// Declared registers, first declaration first.
    fn registers(&self) -> Vec<&'a str> {
        let mut seen = HashSet::new();

        self.program
            .iter()
            .filter_map(|ins| match ins {
                Instruction::Declare { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .filter(|name| seen.insert(*name))
            .collect()
    }
}

/// A register or label as a C identifier. PPAP names start with an
/// upper-case letter, so the prefix keeps them clear of C keywords, library
/// macros such as `EOF`, and the helpers above.
struct Ident<'a>(&'a str);

impl fmt::Display for Ident<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ppap_{}", self.0.replace('-', "_"))
    }
}

fn statement(f: &mut fmt::Formatter<'_>, ins: &Instruction) -> fmt::Result {
    match ins {
        Instruction::Declare { name, value } => writeln!(f, "    {} = {value}LL;", Ident(name)),
        Instruction::Label(label) => writeln!(f, "\n{}:", Ident(label)),
        Instruction::Move { dst, src } => writeln!(f, "    {} = {};", Ident(dst), Ident(src)),
        Instruction::Add { dst, src } => writeln!(f, "    {} += {};", Ident(dst), Ident(src)),
        Instruction::Sub { dst, src } => writeln!(f, "    {} -= {};", Ident(dst), Ident(src)),
        Instruction::Mul { dst, src } => writeln!(f, "    {} *= {};", Ident(dst), Ident(src)),
        Instruction::Div { dst, src } => writeln!(f, "    {} /= {};", Ident(dst), Ident(src)),
        Instruction::Store { src, addr } => writeln!(
            f,
            "    memory[ppap_address({}, \"store\")] = {};",
            Ident(addr),
            Ident(src)
        ),
        Instruction::Load { dst, addr } => writeln!(
            f,
            "    {} = memory[ppap_address({}, \"load\")];",
            Ident(dst),
            Ident(addr)
        ),
        Instruction::PrintInt(reg) => writeln!(f, "    printf(\"%lld\", {});", Ident(reg)),
        Instruction::PrintChars(regs) => regs
            .iter()
            .try_for_each(|reg| writeln!(f, "    ppap_putc({});", Ident(reg))),
        Instruction::ReadChar(reg) => writeln!(f, "    {} = ppap_getc();", Ident(reg)),
        Instruction::Compare { op, lhs, rhs } => {
            let (lhs, rhs) = (Ident(lhs), Ident(rhs));
            writeln!(f, "    {lhs} = ({lhs} {} {rhs} ? 1 : 0);", op.c_operator())
        }
        Instruction::JumpIf {
            op,
            lhs,
            rhs,
            label,
        } => {
            let (lhs, rhs) = (Ident(lhs), Ident(rhs));
            writeln!(f, "    if ({lhs} {} {rhs}) {{", op.c_operator())?;
            writeln!(f, "        goto {};", Ident(label))?;
            writeln!(f, "    }}")
        }
        Instruction::Jump(label) => writeln!(f, "    goto {};", Ident(label)),
    }
}

impl fmt::Display for CSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let uses_memory = self.any(Instruction::uses_memory);

        f.write_str(PREAMBLE)?;
        if uses_memory {
            f.write_str(MEMORY_HELPER)?;
        }
        if self.any(|ins| matches!(ins, Instruction::PrintChars(_))) {
            f.write_str(PUTC_HELPER)?;
        }
        if self.any(|ins| matches!(ins, Instruction::ReadChar(_))) {
            f.write_str(GETC_HELPER)?;
        }

        writeln!(f, "\nint main(void) {{")?;
        for reg in self.registers() {
            writeln!(f, "    long long {};", Ident(reg))?;
        }
        writeln!(f)?;

        if uses_memory {
            writeln!(f, "{ALLOC_MEMORY}")?;
        }

        for ins in self.program {
            statement(f, ins)?;
        }

        writeln!(f, "    return 0;")?;
        writeln!(f, "}}")
    }
}

pub fn to_c(program: &[Instruction]) -> String {
    CSource::new(program).to_string()
}
