use thiserror::Error;

use crate::{
    ast::{
        CollectionBinding, CollectionExpression, CollectionOperator, Expression, MatchExpression,
        MatchOperator, MatchValue, Selector, SelectorType, Token,
    },
    lexer::{LexError, Lexer, Position, Spanned},
};

const EXPECTED_EXPRESSION: &str =
    r#""(", "-", "0", "\"", "`", "not", [ \t\r\n], [1-9] or [a-zA-Z]"#;
const EXPECTED_AFTER_NOT: &str = r#""!=", "(", "-", "0", "==", "\"", "`", "contains", "in", "is", "matches", "not", [ \t\r\n], [1-9] or [a-zA-Z]"#;
const EXPECTED_END: &str = r#""and", "or", [ \t\r\n] or EOF"#;
const EXPECTED_MEMBERSHIP: &str = r#""in", "not" or [ \t\r\n]"#;
const EXPECTED_OPERATOR: &str = r#""!=", "<", "<=", "==", ">", ">=", "contains", "in", "is", "matches", "not" or [ \t\r\n]"#;
const EXPECTED_VALUE: &str = r#""-", "0", "\"", "`", [1-9] or [a-zA-Z]"#;

/// Syntax errors, reported with the position parsing stopped at.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// A specific grammar rule recognised its input but found it malformed.
    #[error("{position}: rule \"{rule}\": {message}")]
    Rule {
        position: Position,
        rule: &'static str,
        message: String,
    },

    /// No rule could continue at this position.
    #[error("{position}: no match found, expected: {expected}")]
    NoMatch {
        position: Position,
        expected: &'static str,
    },
}

impl ParseError {
    pub fn position(&self) -> Position {
        match self {
            ParseError::Rule { position, .. } | ParseError::NoMatch { position, .. } => *position,
        }
    }

    fn rule(position: Position, rule: &'static str, message: impl Into<String>) -> Self {
        ParseError::Rule {
            position,
            rule,
            message: message.into(),
        }
    }
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError::Rule {
            position: e.position,
            rule: e.rule,
            message: e.message,
        }
    }
}

/// Parser limits. Zero disables a limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Maximum number of match expressions in one input.
    pub max_expressions: usize,
}

/// Left-hand operand of a match before its role is known.
enum Operand {
    Path(Vec<String>),
    Quoted(String),
    Raw(String),
    Number(String),
}

impl Operand {
    fn into_selector(self) -> Option<Selector> {
        match self {
            Operand::Path(path) => Some(Selector::new(SelectorType::Bexpr, path)),
            Operand::Quoted(s) => parse_json_pointer(&s)
                .map(|path| Selector::new(SelectorType::JsonPointer, path)),
            _ => None,
        }
    }

    fn into_raw(self) -> String {
        match self {
            Operand::Path(path) => path.join("."),
            Operand::Quoted(s) | Operand::Raw(s) | Operand::Number(s) => s,
        }
    }
}

/// Splits `/a/b~1c` into decoded segments. Empty segments, including a
/// trailing slash, are rejected.
pub fn parse_json_pointer(pointer: &str) -> Option<Vec<String>> {
    let rest = pointer.strip_prefix('/')?;
    rest.split('/')
        .map(|segment| {
            let valid = !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '~' | ':' | '|'));
            valid.then(|| segment.replace("~1", "/").replace("~0", "~"))
        })
        .collect()
}

pub struct Parser {
    tokens: Vec<Spanned>,
    position: usize,
    options: ParseOptions,
    matches: usize,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Result<Self, ParseError> {
        Parser::with_options(lexer, ParseOptions::default())
    }

    pub fn with_options(lexer: Lexer, options: ParseOptions) -> Result<Self, ParseError> {
        Ok(Parser {
            tokens: lexer.tokenize()?,
            position: 0,
            options,
            matches: 0,
        })
    }

    /// Number of match expressions parsed so far.
    pub fn match_count(&self) -> usize {
        self.matches
    }

    fn current(&self) -> &Spanned {
        // tokenize always ends with Eof, and advance never moves past it
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn current_token(&self) -> &Token {
        &self.current().token
    }

    fn peek_token(&self, offset: usize) -> &Token {
        let index = (self.position + offset).min(self.tokens.len() - 1);
        &self.tokens[index].token
    }

    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.current_token()) == std::mem::discriminant(token)
    }

    fn check_keyword(&self, word: &str) -> bool {
        self.current_token().is_keyword(word)
    }

    fn no_match(&self, expected: &'static str) -> ParseError {
        ParseError::NoMatch {
            position: self.current().start,
            expected,
        }
    }

    /// Parses the entire input as one expression.
    pub fn parse(&mut self) -> Result<Expression, ParseError> {
        let expr = self.parse_or()?;
        if !self.check(&Token::Eof) {
            return Err(self.no_match(EXPECTED_END));
        }
        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_and()?;
        while self.check_keyword("or") {
            self.advance();
            let right = self.parse_and()?;
            left = Expression::or(left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_not()?;
        while self.check_keyword("and") {
            self.advance();
            let right = self.parse_not()?;
            left = Expression::and(left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expression, ParseError> {
        if !self.check_keyword("not") {
            return self.parse_collection();
        }
        self.advance();
        // A bare `not` could still have been a selector
        if !matches!(
            self.current_token(),
            Token::Identifier(_)
                | Token::String(_)
                | Token::RawString(_)
                | Token::Number(_)
                | Token::LParen
        ) {
            return Err(self.no_match(EXPECTED_AFTER_NOT));
        }
        match self.parse_not()? {
            // not not X is X
            Expression::Unary { operand, .. } => Ok(*operand),
            operand => Ok(Expression::not(operand)),
        }
    }

    fn starts_collection(&self) -> bool {
        let quantifier = self.check_keyword("any") || self.check_keyword("all");
        let followed_by_selector = match self.peek_token(1) {
            Token::Identifier(word) => {
                !matches!(word.as_str(), "in" | "not" | "contains" | "is" | "matches")
            }
            Token::String(_) => true,
            _ => false,
        };
        quantifier && followed_by_selector
    }

    fn parse_collection(&mut self) -> Result<Expression, ParseError> {
        if !self.starts_collection() {
            return self.parse_primary();
        }

        let operator = if self.check_keyword("any") {
            CollectionOperator::Any
        } else {
            CollectionOperator::All
        };
        self.advance();

        let selector = self.parse_selector()?;

        if !self.check_keyword("as") {
            return Err(self.no_match(r#""as" or [ \t\r\n]"#));
        }
        self.advance();

        let binding = self.parse_binding()?;

        if !self.check(&Token::LBrace) {
            return Err(self.no_match(r#""{" or [ \t\r\n]"#));
        }
        self.advance();

        let inner = self.parse_or()?;

        match self.current_token() {
            Token::RBrace => self.advance(),
            Token::Eof => {
                return Err(ParseError::rule(
                    self.current().start,
                    "collection",
                    "Unmatched braces",
                ));
            }
            _ => return Err(self.no_match(r#""}", "and", "or" or [ \t\r\n]"#)),
        }

        Ok(Expression::Collection(CollectionExpression {
            selector,
            operator,
            binding,
            inner: Box::new(inner),
        }))
    }

    fn parse_binding(&mut self) -> Result<CollectionBinding, ParseError> {
        match self.current_token().clone() {
            Token::Identifier(first) => {
                self.advance();
                if !self.check(&Token::Comma) {
                    return Ok(CollectionBinding::Default(first));
                }
                self.advance();
                match self.current_token().clone() {
                    Token::Underscore => {
                        self.advance();
                        Ok(CollectionBinding::Index(first))
                    }
                    Token::Identifier(second) if second == first => Err(ParseError::rule(
                        self.current().start,
                        "binding",
                        format!(
                            "{:?} cannot be used as a placeholder for both the index and the value",
                            first
                        ),
                    )),
                    Token::Identifier(second) => {
                        self.advance();
                        Ok(CollectionBinding::IndexAndValue {
                            index: first,
                            value: second,
                        })
                    }
                    _ => Err(self.no_match(r#""_" or [a-zA-Z]"#)),
                }
            }
            Token::Underscore => {
                self.advance();
                if !self.check(&Token::Comma) {
                    return Err(self.no_match(r#""," or [ \t\r\n]"#));
                }
                self.advance();
                match self.current_token().clone() {
                    Token::Identifier(value) => {
                        self.advance();
                        Ok(CollectionBinding::Value(value))
                    }
                    _ => Err(self.no_match("[a-zA-Z]")),
                }
            }
            _ => Err(self.no_match(r#""_" or [a-zA-Z]"#)),
        }
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        if !self.check(&Token::LParen) {
            return self.parse_match();
        }
        self.advance();

        let expr = self.parse_or()?;

        match self.current_token() {
            Token::RParen => {
                self.advance();
                Ok(expr)
            }
            Token::Eof => Err(ParseError::rule(
                self.current().start,
                "grouping",
                "Unmatched parentheses",
            )),
            _ => Err(self.no_match(r#"")", "and", "or" or [ \t\r\n]"#)),
        }
    }

    fn parse_match(&mut self) -> Result<Expression, ParseError> {
        let start = self.current().start;
        self.matches += 1;
        if self.options.max_expressions > 0 && self.matches > self.options.max_expressions {
            return Err(ParseError::rule(
                start,
                "match",
                "max number of expressions parsed",
            ));
        }

        let operand = self.parse_operand()?;

        let (operator, selector, value) = match self.current_token().clone() {
            Token::Equal => self.selector_first(operand, MatchOperator::Equal)?,
            Token::NotEqual => self.selector_first(operand, MatchOperator::NotEqual)?,
            Token::Less => self.selector_first(operand, MatchOperator::Less)?,
            Token::LessEqual => self.selector_first(operand, MatchOperator::LessEqual)?,
            Token::Greater => self.selector_first(operand, MatchOperator::Greater)?,
            Token::GreaterEqual => self.selector_first(operand, MatchOperator::GreaterEqual)?,
            Token::Identifier(word) => match word.as_str() {
                "in" => self.value_first(operand, MatchOperator::In)?,
                "contains" => self.selector_first(operand, MatchOperator::In)?,
                "matches" => self.selector_first(operand, MatchOperator::Matches)?,
                "is" => self.parse_emptiness(operand)?,
                "not" => match self.peek_token(1) {
                    Token::Identifier(next) if next == "in" => {
                        self.advance();
                        self.value_first(operand, MatchOperator::NotIn)?
                    }
                    Token::Identifier(next) if next == "contains" => {
                        self.advance();
                        self.selector_first(operand, MatchOperator::NotIn)?
                    }
                    Token::Identifier(next) if next == "matches" => {
                        self.advance();
                        self.selector_first(operand, MatchOperator::NotMatches)?
                    }
                    _ => {
                        self.advance();
                        return Err(self.no_match(r#""contains", "in", "matches" or [ \t\r\n]"#));
                    }
                },
                _ => return Err(self.missing_operator(&operand)),
            },
            _ => return Err(self.missing_operator(&operand)),
        };

        Ok(Expression::Match(MatchExpression {
            selector,
            operator,
            value,
        }))
    }

    fn missing_operator(&self, operand: &Operand) -> ParseError {
        match operand {
            Operand::Path(_) => self.no_match(EXPECTED_OPERATOR),
            Operand::Quoted(s) if parse_json_pointer(s).is_some() => {
                self.no_match(EXPECTED_OPERATOR)
            }
            _ => self.no_match(EXPECTED_MEMBERSHIP),
        }
    }

    /// `<selector> <op> <value>`; the operator token is current.
    fn selector_first(
        &mut self,
        operand: Operand,
        operator: MatchOperator,
    ) -> Result<(MatchOperator, Selector, Option<MatchValue>), ParseError> {
        let Some(selector) = operand.into_selector() else {
            return Err(self.no_match(EXPECTED_MEMBERSHIP));
        };
        self.advance();
        let value = self.parse_value()?;
        Ok((operator, selector, Some(value)))
    }

    /// `<value> [not] in <selector>`; the `in` token is current.
    fn value_first(
        &mut self,
        operand: Operand,
        operator: MatchOperator,
    ) -> Result<(MatchOperator, Selector, Option<MatchValue>), ParseError> {
        self.advance();
        let selector = self.parse_selector()?;
        Ok((operator, selector, Some(MatchValue::new(operand.into_raw()))))
    }

    /// `<selector> is [not] empty`; the `is` token is current.
    fn parse_emptiness(
        &mut self,
        operand: Operand,
    ) -> Result<(MatchOperator, Selector, Option<MatchValue>), ParseError> {
        let Some(selector) = operand.into_selector() else {
            return Err(self.no_match(EXPECTED_MEMBERSHIP));
        };
        self.advance();

        let operator = if self.check_keyword("not") {
            self.advance();
            MatchOperator::IsNotEmpty
        } else {
            MatchOperator::IsEmpty
        };

        if !self.check_keyword("empty") {
            return Err(self.no_match(r#""empty", "not" or [ \t\r\n]"#));
        }
        self.advance();
        Ok((operator, selector, None))
    }

    fn parse_operand(&mut self) -> Result<Operand, ParseError> {
        match self.current_token().clone() {
            Token::Identifier(first) => {
                self.advance();
                Ok(Operand::Path(self.parse_path_rest(first)?))
            }
            Token::String(s) => {
                self.advance();
                Ok(Operand::Quoted(s))
            }
            Token::RawString(s) => {
                self.advance();
                Ok(Operand::Raw(s))
            }
            Token::Number(n) => {
                self.advance();
                Ok(Operand::Number(n))
            }
            _ => Err(self.no_match(EXPECTED_EXPRESSION)),
        }
    }

    fn parse_value(&mut self) -> Result<MatchValue, ParseError> {
        match self.current_token().clone() {
            Token::Identifier(first) => {
                self.advance();
                Ok(MatchValue::new(self.parse_path_rest(first)?.join(".")))
            }
            Token::String(s) | Token::RawString(s) | Token::Number(s) => {
                self.advance();
                Ok(MatchValue::new(s))
            }
            _ => Err(self.no_match(EXPECTED_VALUE)),
        }
    }

    fn parse_selector(&mut self) -> Result<Selector, ParseError> {
        let start = self.current().start;
        match self.current_token().clone() {
            Token::Identifier(first) => {
                self.advance();
                let path = self.parse_path_rest(first)?;
                Ok(Selector::new(SelectorType::Bexpr, path))
            }
            Token::String(s) => match parse_json_pointer(&s) {
                Some(path) => {
                    self.advance();
                    Ok(Selector::new(SelectorType::JsonPointer, path))
                }
                None => Err(ParseError::rule(start, "jsonpointer", "Invalid JSON pointer")),
            },
            _ => Err(ParseError::rule(start, "match", "Invalid selector")),
        }
    }

    /// Dotted segments and bracket indexes following the first identifier.
    fn parse_path_rest(&mut self, first: String) -> Result<Vec<String>, ParseError> {
        let mut path = vec![first];
        loop {
            match self.current_token() {
                Token::Dot => {
                    self.advance();
                    match self.current_token().clone() {
                        Token::Identifier(segment) => {
                            self.advance();
                            path.push(segment);
                        }
                        _ => return Err(self.no_match("[a-zA-Z]")),
                    }
                }
                Token::LBracket => {
                    self.advance();
                    let key = match self.current_token().clone() {
                        Token::String(key) | Token::RawString(key) => key,
                        _ => {
                            return Err(ParseError::rule(
                                self.current().start,
                                "index",
                                "Invalid index",
                            ));
                        }
                    };
                    self.advance();
                    if !self.check(&Token::RBracket) {
                        return Err(ParseError::rule(
                            self.current().start,
                            "index",
                            "Unclosed index expression",
                        ));
                    }
                    self.advance();
                    path.push(key);
                }
                _ => return Ok(path),
            }
        }
    }
}

/// Parses `input` with no limits.
pub fn parse(input: &str) -> Result<Expression, ParseError> {
    parse_with_options(input, ParseOptions::default())
}

pub fn parse_with_options(input: &str, options: ParseOptions) -> Result<Expression, ParseError> {
    let mut parser = Parser::with_options(Lexer::new(input), options)?;
    let expr = parser.parse()?;
    log::trace!(
        "parsed {:?} into {} match expressions",
        input,
        parser.match_count()
    );
    Ok(expr)
}
