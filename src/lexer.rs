//! Lexer for BeamScript
//!
//! Converts source code into a stream of tokens.

use crate::error::{BeamError, ErrorKind, Result};
use crate::token::{lookup_keyword, Span, Token, TokenKind};

/// The lexer state
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
    line: usize,
    column: usize,
    /// Kind of the most recently emitted token, used to classify `+` and `-`
    last_kind: Option<TokenKind>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer from source code
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
            line: 1,
            column: 1,
            last_kind: None,
        }
    }

    /// Tokenize the entire source
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        while let Some(token) = self.next_token()? {
            self.last_kind = Some(token.kind);
            tokens.push(token);
        }

        tokens.push(Token::new(
            TokenKind::Eof,
            Span::new(self.current_pos, self.current_pos, self.line, self.column),
            String::new(),
        ));

        tracing::debug!(count = tokens.len(), "tokenized source");
        Ok(tokens)
    }

    /// Get the next token
    fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_whitespace_and_comments()?;

        let Some(&(start_pos, ch)) = self.chars.peek() else {
            return Ok(None);
        };

        let start_line = self.line;
        let start_column = self.column;
        let here = |end: usize| Span::new(start_pos, end, start_line, start_column);

        let kind = match ch {
            // Single character tokens
            '(' => { self.advance(); TokenKind::OpenParen }
            ')' => { self.advance(); TokenKind::CloseParen }
            '{' => { self.advance(); TokenKind::OpenBrace }
            '}' => { self.advance(); TokenKind::CloseBrace }
            '[' => { self.advance(); TokenKind::OpenBracket }
            ']' => { self.advance(); TokenKind::CloseBracket }
            ',' => { self.advance(); TokenKind::Comma }
            '.' => { self.advance(); TokenKind::Dot }
            ':' => { self.advance(); TokenKind::Colon }
            ';' => { self.advance(); TokenKind::Semicolon }
            '*' | '/' | '%' | '^' => { self.advance(); TokenKind::BinaryOperator }

            // A sign directly after an operator (or at the very start) is
            // lexed as binary; anywhere else it is lexed as unary.
            '+' | '-' => {
                self.advance();
                match self.last_kind {
                    None | Some(TokenKind::BinaryOperator) => TokenKind::BinaryOperator,
                    Some(_) if ch == '+' => TokenKind::UnaryPlus,
                    Some(_) => TokenKind::UnaryMinus,
                }
            }

            // Runs of identical characters
            '=' => match self.count_run('=') {
                1 => { self.advance(); TokenKind::Equals }
                2 => { self.advance(); self.advance(); TokenKind::DoubleEquals }
                _ => return Err(self.unexpected('=', start_pos, start_line, start_column)),
            },
            '&' => match self.count_run('&') {
                2 => { self.advance(); self.advance(); TokenKind::And }
                _ => return Err(self.unexpected('&', start_pos, start_line, start_column)),
            },
            '|' => match self.count_run('|') {
                2 => { self.advance(); self.advance(); TokenKind::Or }
                _ => return Err(self.unexpected('|', start_pos, start_line, start_column)),
            },

            // Potentially two-character tokens
            '!' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    TokenKind::NotEquals
                } else {
                    TokenKind::Not
                }
            }
            '<' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    TokenKind::LessThanOrEquals
                } else {
                    TokenKind::LessThan
                }
            }
            '>' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    TokenKind::GreaterThanOrEquals
                } else {
                    TokenKind::GreaterThan
                }
            }

            // String literals carry their contents as the lexeme
            '"' | '\'' => {
                let value = self.scan_string(ch)?;
                return Ok(Some(Token::new(TokenKind::String, here(self.current_pos), value)));
            }

            c if c.is_ascii_digit() => self.scan_number()?,

            // Identifiers and keywords
            c if c.is_alphabetic() => self.scan_identifier(),

            _ => return Err(self.unexpected(ch, start_pos, start_line, start_column)),
        };

        let lexeme = self.source[start_pos..self.current_pos].to_string();

        Ok(Some(Token::new(kind, here(self.current_pos), lexeme)))
    }

    /// Advance and return the current character
    fn advance(&mut self) -> Option<char> {
        let (pos, ch) = self.chars.next()?;
        self.current_pos = pos + ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// Peek at the next character without advancing
    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, ch)| ch)
    }

    /// Number of consecutive `ch` starting at the current position
    fn count_run(&self, ch: char) -> usize {
        self.source[self.current_pos..]
            .chars()
            .take_while(|&c| c == ch)
            .count()
    }

    fn unexpected(&mut self, ch: char, start: usize, line: usize, column: usize) -> BeamError {
        self.advance();
        BeamError::new(
            ErrorKind::UnexpectedCharacter(ch),
            Some(Span::new(start, self.current_pos, line, column)),
        )
    }

    /// Skip whitespace, `//` line comments and `/* */` block comments
    fn skip_whitespace_and_comments(&mut self) -> Result<()> {
        while let Some(&(_, ch)) = self.chars.peek() {
            let rest = &self.source[self.current_pos..];
            match ch {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }

                '/' if rest.starts_with("//") => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }

                '/' if rest.starts_with("/*") => {
                    let span = Span::new(self.current_pos, self.current_pos + 2, self.line, self.column);
                    self.advance();
                    self.advance();
                    loop {
                        if self.source[self.current_pos..].starts_with("*/") {
                            self.advance();
                            self.advance();
                            break;
                        }
                        if self.advance().is_none() {
                            return Err(BeamError::new(ErrorKind::UnterminatedComment, Some(span)));
                        }
                    }
                }

                _ => break,
            }
        }
        Ok(())
    }

    /// Scan a string literal closed by the same quote that opened it
    fn scan_string(&mut self, quote: char) -> Result<String> {
        let start_line = self.line;
        let start_column = self.column;
        let start_pos = self.current_pos;

        self.advance();

        let mut value = String::new();
        while let Some(c) = self.advance() {
            if c == quote {
                return Ok(value);
            }
            value.push(c);
        }

        Err(BeamError::new(
            ErrorKind::UnterminatedString,
            Some(Span::new(start_pos, self.current_pos, start_line, start_column)),
        ))
    }

    /// Scan a number literal; one `.` makes it a float
    fn scan_number(&mut self) -> Result<TokenKind> {
        let start = self.current_pos;
        let (line, column) = (self.line, self.column);
        let mut seen_dot = false;

        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.advance();
            } else if c == '.' && !seen_dot {
                seen_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        let text = &self.source[start..self.current_pos];
        if parse_number(text).is_none() {
            return Err(BeamError::new(
                ErrorKind::InvalidNumber(text.to_string()),
                Some(Span::new(start, self.current_pos, line, column)),
            ));
        }

        Ok(if seen_dot { TokenKind::Float } else { TokenKind::Int })
    }

    /// Scan an identifier or keyword
    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.current_pos;

        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() {
                self.advance();
            } else {
                break;
            }
        }

        lookup_keyword(&self.source[start..self.current_pos]).unwrap_or(TokenKind::Identifier)
    }
}

/// Parse the text of an Int or Float token. A trailing `.` reads as `.0`.
pub fn parse_number(text: &str) -> Option<f64> {
    if let Some(stripped) = text.strip_suffix('.') {
        stripped.parse().ok()
    } else {
        text.parse().ok()
    }
}

/// Convenience wrapper around [`Lexer::tokenize`]
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Lexer::new(source).tokenize()
}
