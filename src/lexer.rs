use std::fmt;

use thiserror::Error;

use crate::ast::Token;

/// A location in the expression text.
///
/// `line` and `column` are 1-based and count characters, `offset` is the
/// 0-based byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn start() -> Self {
        Position {
            line: 1,
            column: 1,
            offset: 0,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.line, self.column, self.offset)
    }
}

/// A token together with where it starts and ends.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub start: Position,
    pub end: Position,
}

/// Errors raised while tokenizing.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{position}: rule \"{rule}\": {message}")]
pub struct LexError {
    pub position: Position,
    pub rule: &'static str,
    pub message: String,
}

impl LexError {
    fn new(position: Position, rule: &'static str, message: impl Into<String>) -> Self {
        LexError {
            position,
            rule,
            message: message.into(),
        }
    }
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    location: Position,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            location: Position::start(),
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.location.offset += ch.len_utf8();
            if ch == '\n' {
                self.location.line += 1;
                self.location.column = 1;
            } else {
                self.location.column += 1;
            }
            self.position += 1;
        }
    }

    // Only these four count as whitespace in the grammar.
    fn skip_whitespace(&mut self) {
        while let Some(' ' | '\t' | '\r' | '\n') = self.current_char() {
            self.advance();
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '/' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self) -> Result<String, LexError> {
        let mut result = String::new();
        self.advance(); // Consume opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                '"' => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    let escape_at = self.location;
                    self.advance();
                    let decoded = match self.current_char() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('a') => '\u{07}',
                        Some('b') => '\u{08}',
                        Some('f') => '\u{0c}',
                        Some('v') => '\u{0b}',
                        Some('"') => '"',
                        Some('\'') => '\'',
                        Some('\\') => '\\',
                        Some('u') => {
                            self.advance();
                            let decoded = self.read_unicode_escape(escape_at)?;
                            result.push(decoded);
                            continue;
                        }
                        Some(_) => {
                            return Err(LexError::new(
                                escape_at,
                                "string",
                                "Invalid escape sequence",
                            ));
                        }
                        None => break,
                    };
                    result.push(decoded);
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError::new(
            self.location,
            "string",
            "Unterminated string literal",
        ))
    }

    fn read_unicode_escape(&mut self, escape_at: Position) -> Result<char, LexError> {
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = self
                .current_char()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| LexError::new(escape_at, "string", "Invalid escape sequence"))?;
            code = code * 16 + digit;
            self.advance();
        }
        char::from_u32(code)
            .ok_or_else(|| LexError::new(escape_at, "string", "Invalid escape sequence"))
    }

    fn read_raw_string(&mut self) -> Result<String, LexError> {
        let mut result = String::new();
        self.advance(); // Consume opening backtick

        while let Some(ch) = self.current_char() {
            self.advance();
            if ch == '`' {
                return Ok(result);
            }
            result.push(ch);
        }

        Err(LexError::new(
            self.location,
            "string",
            "Unterminated string literal",
        ))
    }

    // -?(0|[1-9][0-9]*)(\.[0-9]+)?
    fn read_number(&mut self) -> Result<Token, LexError> {
        let mut number = String::new();

        if self.current_char() == Some('-') {
            number.push('-');
            self.advance();
        }

        match self.current_char() {
            Some('0') => {
                number.push('0');
                self.advance();
            }
            Some(ch) if ch.is_ascii_digit() => {
                while let Some(ch) = self.current_char().filter(char::is_ascii_digit) {
                    number.push(ch);
                    self.advance();
                }
            }
            _ => return Err(self.invalid_number()),
        }

        if self.current_char() == Some('.') {
            if !self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
                return Err(self.invalid_number());
            }
            number.push('.');
            self.advance();
            while let Some(ch) = self.current_char().filter(char::is_ascii_digit) {
                number.push(ch);
                self.advance();
            }
        }

        match self.current_char() {
            Some(ch) if ch.is_alphanumeric() || ch == '_' || ch == '.' => {
                Err(self.invalid_number())
            }
            _ => Ok(Token::Number(number)),
        }
    }

    fn invalid_number(&self) -> LexError {
        LexError::new(self.location, "number", "Invalid number literal")
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    fn with_optional_equals(&mut self, plain: Token, with_equals: Token) -> Token {
        self.advance();
        if self.current_char() == Some('=') {
            self.advance();
            with_equals
        } else {
            plain
        }
    }

    pub fn next_token(&mut self) -> Result<Spanned, LexError> {
        self.skip_whitespace();
        let start = self.location;

        let token = match self.current_char() {
            None => Token::Eof,
            Some('(') => self.single(Token::LParen),
            Some(')') => self.single(Token::RParen),
            Some('[') => self.single(Token::LBracket),
            Some(']') => self.single(Token::RBracket),
            Some('{') => self.single(Token::LBrace),
            Some('}') => self.single(Token::RBrace),
            Some('.') => self.single(Token::Dot),
            Some(',') => self.single(Token::Comma),
            Some('=') if self.peek_char(1) == Some('=') => {
                self.advance();
                self.single(Token::Equal)
            }
            Some('!') if self.peek_char(1) == Some('=') => {
                self.advance();
                self.single(Token::NotEqual)
            }
            Some('<') => self.with_optional_equals(Token::Less, Token::LessEqual),
            Some('>') => self.with_optional_equals(Token::Greater, Token::GreaterEqual),
            Some('"') => Token::String(self.read_string()?),
            Some('`') => Token::RawString(self.read_raw_string()?),
            Some('_') if !self.peek_char(1).is_some_and(|c| c.is_ascii_alphanumeric()) => {
                self.single(Token::Underscore)
            }
            Some(ch) if ch.is_ascii_digit() || ch == '-' => self.read_number()?,
            Some(ch) if ch.is_ascii_alphabetic() => Token::Identifier(self.read_identifier()),
            Some(ch) => {
                return Err(LexError::new(
                    start,
                    "token",
                    format!("Unexpected character {:?}", ch),
                ));
            }
        };

        Ok(Spanned {
            token,
            start,
            end: self.location,
        })
    }

    /// Tokenizes the whole input, ending with [`Token::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<Spanned>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let spanned = self.next_token()?;
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                return Ok(tokens);
            }
        }
    }
}
