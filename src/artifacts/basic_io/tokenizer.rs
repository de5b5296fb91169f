use crate::error::ParseError;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `[A-Za-z][A-Za-z0-9_]*`
    Symbol(String),
    /// `"..."` with `\"` and `\\` escapes, unescaped
    Str(String),
    /// `[...]` hex digits, brackets stripped
    Hex(String),
}

impl Token {
    pub fn describe(&self) -> String {
        match self {
            Token::Symbol(s) => format!("symbol '{}'", s),
            Token::Str(s) => format!("string {:?}", s),
            Token::Hex(h) => format!("hex [{}]", h),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

/// Splits basic-io text into tokens, tracking 1-based line and column
pub struct Tokenizer<'a> {
    input: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    pub fn location(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.input.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, message: &str) -> ParseError {
        ParseError::new(self.line, self.column, message)
    }

    fn skip_whitespace(&mut self) {
        while self.input.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.advance();
        }
    }

    fn symbol(&mut self) -> Token {
        let mut symbol = String::new();
        while let Some(&c) = self.input.peek() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
            symbol.push(c);
            self.advance();
        }
        Token::Symbol(symbol)
    }

    fn hex(&mut self) -> Result<Token, ParseError> {
        self.advance();
        let mut hex = String::new();
        loop {
            match self.input.peek() {
                None => return Err(self.error("input stream ended in hex string")),
                Some(']') => break,
                Some(c) if c.is_ascii_hexdigit() => {
                    hex.push(*c);
                    self.advance();
                }
                Some(_) => return Err(self.error("non-hex character in hex string")),
            }
        }
        self.advance();
        Ok(Token::Hex(hex))
    }

    fn string(&mut self) -> Result<Token, ParseError> {
        self.advance();
        let mut value = String::new();
        loop {
            match self.advance() {
                None => return Err(self.error("input stream ended in string")),
                Some('"') => break,
                Some('\\') => match self.advance() {
                    Some(c @ ('"' | '\\')) => value.push(c),
                    None => return Err(self.error("input stream ended in string")),
                    Some(_) => return Err(self.error("unrecognized character escape")),
                },
                Some(c) => value.push(c),
            }
        }
        Ok(Token::Str(value))
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Spanned, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();
        let (line, column) = self.location();

        let token = match *self.input.peek()? {
            c if c.is_ascii_alphabetic() => Ok(self.symbol()),
            '[' => self.hex(),
            '"' => self.string(),
            c => Err(self.error(&format!("unexpected character {:?}", c))),
        };

        Some(token.map(|token| Spanned {
            token,
            line,
            column,
        }))
    }
}
