use std::collections::HashMap;
use std::iter::Peekable;
use std::slice::Iter;

use num_bigint::BigInt;
use num_traits::{One, Zero};

use crate::diagnostic::Diagnostic;
use crate::instruction::{Comparison, Instruction};
use crate::lex::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Register,
    Label,
}

/// Register and label names seen so far, in one namespace.
#[derive(Debug, Default)]
pub struct NameTable {
    names: HashMap<String, NameKind>,
}

impl NameTable {
    pub fn is_register(&self, name: &str) -> bool {
        self.names.get(name) == Some(&NameKind::Register)
    }

    pub fn is_label(&self, name: &str) -> bool {
        self.names.get(name) == Some(&NameKind::Label)
    }

    /// Every name with its kind, sorted by name.
    pub fn entries(&self) -> Vec<(&str, NameKind)> {
        let mut entries: Vec<_> = self
            .names
            .iter()
            .map(|(name, kind)| (name.as_str(), *kind))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// A second declaration of the same register leaves the entry as is.
    fn declare_register(&mut self, name: &str) {
        self.names
            .entry(name.to_owned())
            .or_insert(NameKind::Register);
    }

    /// Returns false if the name is already taken.
    fn declare_label(&mut self, name: &str) -> bool {
        if self.names.contains_key(name) {
            return false;
        }
        self.names.insert(name.to_owned(), NameKind::Label);
        true
    }
}

#[derive(Debug, Default)]
pub struct ParseInfo {
    pub instructions: Vec<Instruction>,
    pub names: NameTable,
}

#[derive(Debug)]
pub struct ParseOutput {
    pub info: ParseInfo,
    pub diagnostics: Vec<Diagnostic>,
    /// Set by any syntax error. Warnings never set it.
    pub failed: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum LineOutcome {
    Instruction(Instruction),
    /// Blank or comment-only line.
    Nothing,
    /// Well-formed, but references an undeclared register.
    Dropped,
}

struct Parser<'a> {
    it: Peekable<Iter<'a, Token>>,
    info: ParseInfo,
    diagnostics: Vec<Diagnostic>,
    failed: bool,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            it: tokens.iter().peekable(),
            info: ParseInfo::default(),
            diagnostics: vec![],
            failed: false,
        }
    }

    fn make_instructions(mut self) -> ParseOutput {
        // a program has at least one line
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Eof) | None) {
            self.diagnostics.push(Diagnostic::UnexpectedEof);
            self.failed = true;
        }

        while let Some(token) = self.peek() {
            if token.kind == TokenKind::Eof {
                break;
            }

            let line = token.line;
            match self.line() {
                Ok(LineOutcome::Instruction(ins)) => self.add_ins(ins, line),
                Ok(LineOutcome::Nothing | LineOutcome::Dropped) => (),
                Err(e) => {
                    self.diagnostics.push(e);
                    self.failed = true;
                    self.sync();
                }
            }
        }

        ParseOutput {
            info: self.info,
            diagnostics: self.diagnostics,
            failed: self.failed,
        }
    }

    /// Skips the rest of a broken line, including its newline.
    fn sync(&mut self) {
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::NewLine => {
                    self.consume();
                    break;
                }
                _ => {
                    self.consume();
                }
            }
        }
    }

    fn consume(&mut self) -> Option<&'a Token> {
        self.it.next()
    }

    fn peek(&mut self) -> Option<&'a Token> {
        self.it.peek().copied()
    }

    fn check(&mut self, kind: &TokenKind) -> bool {
        matches!(self.peek(), Some(token) if token.kind == *kind)
    }

    fn unexpected(&mut self) -> Diagnostic {
        match self.peek() {
            Some(token) => syntax_error(token),
            None => Diagnostic::UnexpectedEof,
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), Diagnostic> {
        if self.check(&kind) {
            self.consume();
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn add_ins(&mut self, ins: Instruction, line: usize) {
        match &ins {
            Instruction::Declare { name, .. } => self.info.names.declare_register(name),
            Instruction::Label(name) => {
                if !self.info.names.declare_label(name) {
                    self.diagnostics.push(Diagnostic::DuplicateLabel {
                        line,
                        name: name.clone(),
                    });
                }
            }
            _ => (),
        }

        self.info.instructions.push(ins);
    }

    fn skip_space(&mut self) {
        if self.check(&TokenKind::Space) {
            self.consume();
        }
    }

    fn end_of_line(&mut self) -> Result<(), Diagnostic> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::NewLine => {
                self.consume();
                Ok(())
            }
            Some(token) => Err(syntax_error(token)),
            None => Err(Diagnostic::UnexpectedEof),
        }
    }

    fn line(&mut self) -> Result<LineOutcome, Diagnostic> {
        self.skip_space();

        let outcome = match self.peek().map(|token| &token.kind) {
            Some(TokenKind::NewLine | TokenKind::Eof) | None => LineOutcome::Nothing,
            Some(TokenKind::I) => self.declaration()?,
            Some(TokenKind::Register(_)) => self.label_line()?,
            Some(TokenKind::Uh) => {
                self.consume();
                self.expect(TokenKind::Exclamation)?;
                self.expect(TokenKind::Space)?;

                if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Register(_))) {
                    self.label_line()?
                } else {
                    self.command()?
                }
            }
            Some(_) => return Err(self.unexpected()),
        };

        self.skip_space();
        self.end_of_line()?;

        Ok(outcome)
    }

    fn declaration(&mut self) -> Result<LineOutcome, Diagnostic> {
        self.expect(TokenKind::I)?;
        self.expect(TokenKind::Space)?;
        self.expect(TokenKind::Have)?;
        self.expect(TokenKind::Space)?;

        let value = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::No) => Some(BigInt::zero()),
            Some(TokenKind::A) => Some(BigInt::one()),
            Some(TokenKind::Number(n)) => Some(n.clone()),
            _ => None,
        };
        if value.is_some() {
            self.consume();
            self.expect(TokenKind::Space)?;
        }

        let (name, line) = self.register_name()?;
        if !name.to_lowercase().contains('p') {
            self.diagnostics.push(Diagnostic::MissingP {
                line,
                name: name.clone(),
            });
        }

        Ok(LineOutcome::Instruction(Instruction::Declare {
            name,
            value: value.unwrap_or_default(),
        }))
    }

    fn label_line(&mut self) -> Result<LineOutcome, Diagnostic> {
        Ok(match self.label()? {
            Some(label) => LineOutcome::Instruction(Instruction::Label(label)),
            None => LineOutcome::Dropped,
        })
    }

    /// A register token, declared or not.
    fn register_name(&mut self) -> Result<(String, usize), Diagnostic> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Register(name),
                line,
                ..
            }) => {
                self.consume();
                Ok((name.clone(), *line))
            }
            _ => Err(self.unexpected()),
        }
    }

    /// A register reference. `None` means the register is not declared yet,
    /// which is reported but leaves the line syntactically intact.
    fn register(&mut self) -> Result<Option<String>, Diagnostic> {
        let (name, line) = self.register_name()?;

        if self.info.names.is_register(&name) {
            Ok(Some(name))
        } else {
            self.diagnostics
                .push(Diagnostic::UndeclaredRegister { line, name });
            Ok(None)
        }
    }

    /// `REG-REG(-REG)*`
    fn label(&mut self) -> Result<Option<String>, Diagnostic> {
        let mut segments = vec![self.register()?];

        self.expect(TokenKind::Hyphen)?;
        segments.push(self.register()?);

        while self.check(&TokenKind::Hyphen) {
            self.consume();
            segments.push(self.register()?);
        }

        let segments: Option<Vec<String>> = segments.into_iter().collect();
        Ok(segments.map(|s| s.join("-")))
    }

    /// `-REG(-REG)*`
    fn registers(&mut self) -> Result<Option<Vec<String>>, Diagnostic> {
        self.expect(TokenKind::Hyphen)?;
        let mut regs = vec![self.register()?];

        while self.check(&TokenKind::Hyphen) {
            self.consume();
            regs.push(self.register()?);
        }

        Ok(regs.into_iter().collect())
    }

    fn operand(&mut self) -> Result<Option<String>, Diagnostic> {
        self.expect(TokenKind::Hyphen)?;
        self.register()
    }

    fn command(&mut self) -> Result<LineOutcome, Diagnostic> {
        let Some(token) = self.consume() else {
            return Err(Diagnostic::UnexpectedEof);
        };

        let ins = match token.kind {
            TokenKind::Replace => self.binary(|dst, src| Instruction::Move { dst, src })?,
            TokenKind::Append => self.binary(|dst, src| Instruction::Add { dst, src })?,
            TokenKind::Rip => self.binary(|dst, src| Instruction::Sub { dst, src })?,
            TokenKind::Multiply => self.binary(|dst, src| Instruction::Mul { dst, src })?,
            TokenKind::Chop => self.binary(|dst, src| Instruction::Div { dst, src })?,
            TokenKind::Push => self.binary(|src, addr| Instruction::Store { src, addr })?,
            TokenKind::Pull => self.binary(|dst, addr| Instruction::Load { dst, addr })?,
            TokenKind::Print => self.operand()?.map(Instruction::PrintInt),
            TokenKind::Pick => self.operand()?.map(Instruction::ReadChar),
            TokenKind::Put => self.registers()?.map(Instruction::PrintChars),
            TokenKind::Compare => self.comparison(Comparison::Eq, Comparison::Ne)?,
            TokenKind::Superior => self.comparison(Comparison::Gt, Comparison::Ge)?,
            TokenKind::Jump => {
                self.expect(TokenKind::Hyphen)?;
                self.label()?.map(Instruction::Jump)
            }
            _ => return Err(syntax_error(token)),
        };

        Ok(match ins {
            Some(ins) => LineOutcome::Instruction(ins),
            None => LineOutcome::Dropped,
        })
    }

    fn binary<F>(&mut self, make: F) -> Result<Option<Instruction>, Diagnostic>
    where
        F: FnOnce(String, String) -> Instruction,
    {
        let lhs = self.operand()?;
        let rhs = self.operand()?;

        Ok(lhs.zip(rhs).map(|(lhs, rhs)| make(lhs, rhs)))
    }

    /// `-A-B`, `-A-B?`, `-A-B-LABEL!` or `-A-B-LABEL!?`. The `?` picks the
    /// inverted comparison in both the storing and the jumping forms.
    fn comparison(
        &mut self,
        plain: Comparison,
        inverted: Comparison,
    ) -> Result<Option<Instruction>, Diagnostic> {
        let lhs = self.operand()?;
        let rhs = self.operand()?;

        let jump_to = if self.check(&TokenKind::Hyphen) {
            self.consume();
            let label = self.label()?;
            self.expect(TokenKind::Exclamation)?;
            Some(label)
        } else {
            None
        };

        let op = if self.check(&TokenKind::Question) {
            self.consume();
            inverted
        } else {
            plain
        };

        let Some((lhs, rhs)) = lhs.zip(rhs) else {
            return Ok(None);
        };

        Ok(match jump_to {
            None => Some(Instruction::Compare { op, lhs, rhs }),
            Some(Some(label)) => Some(Instruction::JumpIf {
                op,
                lhs,
                rhs,
                label,
            }),
            Some(None) => None,
        })
    }
}

fn syntax_error(token: &Token) -> Diagnostic {
    match token.kind {
        TokenKind::Eof => Diagnostic::UnexpectedEof,
        _ => Diagnostic::SyntaxError {
            line: token.line,
            text: token.display_text().to_owned(),
        },
    }
}

pub fn parse(tokens: &[Token]) -> ParseOutput {
    let parser = Parser::new(tokens);
    parser.make_instructions()
}
