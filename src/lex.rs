use std::iter::Peekable;
use std::str::CharIndices;

use num_bigint::BigInt;
use num_traits::Zero;

use crate::diagnostic::Diagnostic;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // keywords
    I,
    Uh,
    Replace,
    Append,
    Rip,
    Multiply,
    Chop,
    Push,
    Pull,
    Print,
    Put,
    Pick,
    Compare,
    Superior,
    Jump,
    Have,

    // numeric literals
    No,
    A,
    Number(BigInt),

    Register(String),
    Hyphen,
    Space,
    Question,
    Exclamation,
    NewLine,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

impl Token {
    /// Text used when the token is quoted in a diagnostic.
    pub fn display_text(&self) -> &str {
        match self.kind {
            TokenKind::NewLine => "\\n",
            _ => &self.text,
        }
    }
}

struct Lexer<'a> {
    source: &'a str,
    it: Peekable<CharIndices<'a>>,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
    start: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            it: source.char_indices().peekable(),
            tokens: vec![],
            diagnostics: vec![],
            start: 0,
            line: 1,
        }
    }

    fn make_tokens(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        while let Some((start, ch)) = self.consume() {
            self.start = start;

            match ch {
                '#' => self.consume_while(|ch| *ch != '\n'),
                ' ' | '\t' => {
                    self.consume_while(|ch| *ch == ' ' || *ch == '\t');
                    self.add_token(TokenKind::Space);
                }
                '\n' => self.newline(),
                '\r' if matches!(self.peek(), Some('\n')) => {
                    self.consume();
                    self.newline();
                }
                '-' => self.add_token(TokenKind::Hyphen),
                '!' => self.add_token(TokenKind::Exclamation),
                '?' => self.add_token(TokenKind::Question),
                ch if ch.is_ascii_digit() => self.number(),
                ch if ch.is_ascii_uppercase() => self.kw_or_register(),
                ch if ch.is_ascii_lowercase() && self.lower_word() => (),
                ch => self.diagnostics.push(Diagnostic::IllegalCharacter {
                    line: self.line,
                    ch,
                }),
            }
        }

        self.start = self.source.len();
        self.add_token(TokenKind::Eof);

        (self.tokens, self.diagnostics)
    }

    fn consume(&mut self) -> Option<(usize, char)> {
        self.it.next()
    }

    fn peek(&mut self) -> Option<char> {
        self.it.peek().map(|(_, ch)| *ch)
    }

    fn offset(&mut self) -> usize {
        self.it.peek().map_or(self.source.len(), |(i, _)| *i)
    }

    fn lexeme(&mut self) -> &'a str {
        let end = self.offset();
        let source = self.source;
        &source[self.start..end]
    }

    fn add_token(&mut self, kind: TokenKind) {
        let text = self.lexeme().to_owned();
        self.tokens.push(Token {
            kind,
            text,
            line: self.line,
        });
    }

    fn consume_while<F>(&mut self, condition: F)
    where
        F: Fn(&char) -> bool,
    {
        while let Some(ch) = self.peek() {
            if condition(&ch) {
                self.consume();
            } else {
                break;
            }
        }
    }

    fn newline(&mut self) {
        self.add_token(TokenKind::NewLine);
        self.line += 1;
    }

    fn number(&mut self) {
        self.consume_while(|ch| ch.is_ascii_digit());

        let value = self
            .lexeme()
            .bytes()
            .fold(BigInt::zero(), |acc, digit| acc * 10u32 + u32::from(digit - b'0'));
        self.add_token(TokenKind::Number(value));
    }

    fn kw_or_register(&mut self) {
        self.consume_while(|ch| ch.is_ascii_alphanumeric());

        let lexeme = self.lexeme();
        let kind = map_kw(lexeme).unwrap_or_else(|| TokenKind::Register(lexeme.to_owned()));
        self.add_token(kind);
    }

    /// Lower-case words are matched as prefixes, not whole words, so
    /// `nothing` is `no` followed by whatever the rest lexes to.
    fn lower_word(&mut self) -> bool {
        static WORDS: [(&str, TokenKind); 4] = [
            ("have", TokenKind::Have),
            ("an", TokenKind::A),
            ("a", TokenKind::A),
            ("no", TokenKind::No),
        ];

        let source = self.source;
        let rest = &source[self.start..];
        let Some((word, kind)) = WORDS.iter().find(|(word, _)| rest.starts_with(word)) else {
            return false;
        };

        // the first character is already consumed
        for _ in 1..word.len() {
            self.consume();
        }
        self.add_token(kind.clone());

        true
    }
}

fn map_kw(word: &str) -> Option<TokenKind> {
    match word {
        "I" => Some(TokenKind::I),
        "Uh" => Some(TokenKind::Uh),
        "Replace" => Some(TokenKind::Replace),
        "Append" => Some(TokenKind::Append),
        "Rip" => Some(TokenKind::Rip),
        "Multiply" => Some(TokenKind::Multiply),
        "Chop" => Some(TokenKind::Chop),
        "Push" => Some(TokenKind::Push),
        "Pull" => Some(TokenKind::Pull),
        "Print" => Some(TokenKind::Print),
        "Put" => Some(TokenKind::Put),
        "Pick" => Some(TokenKind::Pick),
        "Compare" => Some(TokenKind::Compare),
        "Superior" => Some(TokenKind::Superior),
        "Jump" => Some(TokenKind::Jump),
        _ => None,
    }
}

/// Splits `source` into tokens. Never fails: characters that start no token
/// are reported and skipped. The stream always ends with [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    Lexer::new(source).make_tokens()
}
