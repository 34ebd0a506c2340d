use std::fmt;

use num_bigint::BigInt;

/// Comparison used by `Compare`/`Superior` commands, both the storing and
/// the jumping forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Ge,
}

impl Comparison {
    pub fn holds<T: Ord + ?Sized>(self, lhs: &T, rhs: &T) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
        }
    }

    pub fn c_operator(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    fn mnemonic(self) -> &'static str {
        match self {
            Self::Eq => "EQ",
            Self::Ne => "NE",
            Self::Gt => "GT",
            Self::Ge => "GE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Declare { name: String, value: BigInt },
    Label(String),
    Move { dst: String, src: String },
    Add { dst: String, src: String },
    Sub { dst: String, src: String },
    Mul { dst: String, src: String },
    Div { dst: String, src: String },
    Store { src: String, addr: String },
    Load { dst: String, addr: String },
    PrintInt(String),
    PrintChars(Vec<String>),
    ReadChar(String),
    /// `lhs := (lhs <op> rhs) as 0/1`
    Compare { op: Comparison, lhs: String, rhs: String },
    JumpIf {
        op: Comparison,
        lhs: String,
        rhs: String,
        label: String,
    },
    Jump(String),
}

impl Instruction {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Declare { .. } => "REGISTER",
            Self::Label(_) => "LABEL",
            Self::Move { .. } => "MOV",
            Self::Add { .. } => "ADD",
            Self::Sub { .. } => "SUB",
            Self::Mul { .. } => "MUL",
            Self::Div { .. } => "DIV",
            Self::Store { .. } => "STORE",
            Self::Load { .. } => "LOAD",
            Self::PrintInt(_) => "PRINT",
            Self::PrintChars(_) => "PUTC",
            Self::ReadChar(_) => "GETC",
            Self::Compare { op, .. } => op.mnemonic(),
            Self::JumpIf { op, .. } => match op {
                Comparison::Eq => "JEQ",
                Comparison::Ne => "JNE",
                Comparison::Gt => "JGT",
                Comparison::Ge => "JGE",
            },
            Self::Jump(_) => "JMP",
        }
    }

    pub fn operands(&self) -> String {
        match self {
            Self::Declare { name, value } => format!("{name} {value}"),
            Self::Label(label) | Self::Jump(label) => label.clone(),
            Self::Move { dst, src }
            | Self::Add { dst, src }
            | Self::Sub { dst, src }
            | Self::Mul { dst, src }
            | Self::Div { dst, src } => format!("{dst} {src}"),
            Self::Store { src, addr } => format!("{src} {addr}"),
            Self::Load { dst, addr } => format!("{dst} {addr}"),
            Self::PrintInt(reg) | Self::ReadChar(reg) => reg.clone(),
            Self::PrintChars(regs) => regs.join(" "),
            Self::Compare { lhs, rhs, .. } => format!("{lhs} {rhs}"),
            Self::JumpIf {
                lhs, rhs, label, ..
            } => format!("{lhs} {rhs} {label}"),
        }
    }

    pub fn uses_memory(&self) -> bool {
        matches!(self, Self::Store { .. } | Self::Load { .. })
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.mnemonic(), self.operands())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparisons() {
        assert!(Comparison::Eq.holds(&7, &7));
        assert!(!Comparison::Ne.holds(&7, &7));
        assert!(!Comparison::Gt.holds(&7, &7));
        assert!(Comparison::Ge.holds(&7, &7));
        assert!(Comparison::Gt.holds(&8, &7));
        assert!(!Comparison::Ge.holds(&-8, &7));

        let big = BigInt::from(u64::MAX) * 4u32;
        assert!(Comparison::Gt.holds(&big, &BigInt::from(i64::MAX)));
    }

    #[test]
    fn display() {
        let jump = Instruction::JumpIf {
            op: Comparison::Ge,
            lhs: "Pen".into(),
            rhs: "Apple".into(),
            label: "Pen-Apple".into(),
        };
        assert_eq!(jump.to_string(), "JGE Pen Apple Pen-Apple");

        let put = Instruction::PrintChars(vec!["P".into(), "Q".into()]);
        assert_eq!(put.to_string(), "PUTC P Q");

        let declare = Instruction::Declare {
            name: "P".into(),
            value: (-3).into(),
        };
        assert_eq!(declare.to_string(), "REGISTER P -3");
    }
}
