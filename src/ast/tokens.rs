use std::fmt;

/// A lexical token of the expression grammar.
///
/// Keywords (`and`, `or`, `not`, `in`, `contains`, `is`, `empty`, `matches`,
/// `any`, `all`, `as`) are lexed as plain identifiers. Whether a word acts as
/// a keyword depends on where it appears, so the parser decides.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Bare word used for selector segments, keywords and unquoted values.
    ///
    /// Starts with an ASCII letter, followed by letters, digits, `_` or `/`.
    ///
    /// # Examples
    /// ```text
    /// foo
    /// Nested
    /// foo/bar
    /// ```
    Identifier(String),

    /// Double-quoted string with escape sequences already decoded.
    ///
    /// In selector position the contents are read as a JSON pointer.
    ///
    /// # Examples
    /// ```text
    /// "bar"
    /// "line\nbreak"
    /// "/metadata/labels"
    /// ```
    String(String),

    /// Backtick-quoted string, taken verbatim.
    ///
    /// # Examples
    /// ```text
    /// `C:\path`
    /// `ENV`
    /// ```
    RawString(String),

    /// Numeric literal kept as written so coercion can pick the target width.
    ///
    /// # Examples
    /// ```text
    /// 3
    /// -0.2
    /// 11.11
    /// ```
    Number(String),

    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,

    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `.`
    Dot,
    /// `,`
    Comma,
    /// `_`, the placeholder in collection bindings
    Underscore,

    /// End of input
    Eof,
}

impl Token {
    /// Returns true when the token is the identifier `word`.
    pub fn is_keyword(&self, word: &str) -> bool {
        matches!(self, Token::Identifier(name) if name == word)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Identifier(name) => write!(f, "{}", name),
            Token::String(s) => write!(f, "{:?}", s),
            Token::RawString(s) => write!(f, "`{}`", s),
            Token::Number(n) => write!(f, "{}", n),
            Token::Equal => write!(f, "=="),
            Token::NotEqual => write!(f, "!="),
            Token::Less => write!(f, "<"),
            Token::LessEqual => write!(f, "<="),
            Token::Greater => write!(f, ">"),
            Token::GreaterEqual => write!(f, ">="),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Dot => write!(f, "."),
            Token::Comma => write!(f, ","),
            Token::Underscore => write!(f, "_"),
            Token::Eof => write!(f, "EOF"),
        }
    }
}
