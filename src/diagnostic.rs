use thiserror::Error;

/// Everything the front end has to say about a source text.
///
/// Only [`Diagnostic::SyntaxError`] and [`Diagnostic::UnexpectedEof`] fail a
/// parse; the rest are warnings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    #[error("Illegal character '{ch}'")]
    IllegalCharacter { line: usize, ch: char },

    #[error("line {line}: '{text}' syntax error")]
    SyntaxError { line: usize, text: String },

    #[error("syntax error at eof")]
    UnexpectedEof,

    #[error("line {line}: '{name}' is an undeclared register")]
    UndeclaredRegister { line: usize, name: String },

    #[error("line {line}: '{name}' does not include 'p' or 'P'")]
    MissingP { line: usize, name: String },

    #[error("line {line}: '{name}' label already exists")]
    DuplicateLabel { line: usize, name: String },
}

impl Diagnostic {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::SyntaxError { .. } | Self::UnexpectedEof)
    }
}
