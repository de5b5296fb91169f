use crate::artifacts::basic_io::tokenizer::{Spanned, Token, Tokenizer};
use crate::error::ParseError;

/// Cursor over the tokens of a basic-io document
///
/// Stanza boundaries are not syntactically significant: readers drive the
/// parser by the leading symbol of each stanza.
pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end: (usize, usize),
}

impl Parser {
    pub fn new(input: &str) -> Result<Self, ParseError> {
        let mut tokenizer = Tokenizer::new(input);
        let tokens = tokenizer.by_ref().collect::<Result<Vec<_>, _>>()?;
        let end = tokenizer.location();

        Ok(Self {
            tokens,
            pos: 0,
            end,
        })
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// The current token when it is a symbol
    pub fn peek_symbol(&self) -> Option<&str> {
        match self.tokens.get(self.pos) {
            Some(Spanned {
                token: Token::Symbol(symbol),
                ..
            }) => Some(symbol),
            _ => None,
        }
    }

    pub fn is_symbol(&self, want: &str) -> bool {
        self.peek_symbol() == Some(want)
    }

    /// Line and column of the current token (or the end of input)
    pub fn position(&self) -> (usize, usize) {
        match self.tokens.get(self.pos) {
            Some(spanned) => (spanned.line, spanned.column),
            None => self.end,
        }
    }

    pub fn error(&self, message: impl Into<String>) -> ParseError {
        let (line, column) = self.position();
        ParseError::new(line, column, message)
    }

    fn found(&self) -> String {
        match self.tokens.get(self.pos) {
            Some(spanned) => spanned.token.describe(),
            None => "end of input".to_string(),
        }
    }

    fn take(&mut self, kind: &str, pick: fn(&Token) -> Option<&String>) -> Result<String, ParseError> {
        let value = self
            .tokens
            .get(self.pos)
            .and_then(|spanned| pick(&spanned.token))
            .cloned()
            .ok_or_else(|| self.error(format!("wanted {}, got {}", kind, self.found())))?;
        self.pos += 1;
        Ok(value)
    }

    pub fn symbol(&mut self) -> Result<String, ParseError> {
        self.take("symbol", |token| match token {
            Token::Symbol(s) => Some(s),
            _ => None,
        })
    }

    pub fn string(&mut self) -> Result<String, ParseError> {
        self.take("string", |token| match token {
            Token::Str(s) => Some(s),
            _ => None,
        })
    }

    pub fn hex(&mut self) -> Result<String, ParseError> {
        self.take("hex", |token| match token {
            Token::Hex(h) => Some(h),
            _ => None,
        })
    }

    pub fn expect_symbol(&mut self, want: &str) -> Result<(), ParseError> {
        if self.is_symbol(want) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("wanted symbol '{}', got {}", want, self.found())))
        }
    }

    /// Parse the current string token with `convert`, reporting failures at it
    pub fn string_as<T>(
        &mut self,
        convert: impl FnOnce(&str) -> anyhow::Result<T>,
    ) -> Result<T, ParseError> {
        let (line, column) = self.position();
        let raw = self.string()?;
        convert(&raw).map_err(|err| ParseError::new(line, column, err.to_string()))
    }

    /// Parse the current hex token with `convert`, reporting failures at it
    pub fn hex_as<T>(
        &mut self,
        convert: impl FnOnce(&str) -> anyhow::Result<T>,
    ) -> Result<T, ParseError> {
        let (line, column) = self.position();
        let raw = self.hex()?;
        convert(&raw).map_err(|err| ParseError::new(line, column, err.to_string()))
    }
}
