use std::fmt;

use thiserror::Error;

use crate::token::{LiteralValue, Token, TokenType};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("[line {line}] Error: Unexpected character '{character}'.")]
    UnexpectedCharacter { character: char, line: usize },
    #[error("[line {line}] Error: Unterminated string.")]
    UnterminatedString { line: usize },
}

/// Every lexical error found in one pass over the source, in source order.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub struct ScanErrors(pub Vec<ScanError>);

impl ScanErrors {
    pub fn errors(&self) -> &[ScanError] {
        &self.0
    }
}

impl fmt::Display for ScanErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in self.0.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

pub struct Scanner<'a> {
    source: &'a str,
    bytes: &'a [u8],
    line: usize,
    start: usize,
    current: usize,
    tokens: Vec<Token>,
    errors: Vec<ScanError>,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Scanner<'a> {
        Scanner {
            source,
            bytes: source.as_bytes(),
            line: 1,
            start: 0,
            current: 0,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn scan_tokens(mut self) -> Result<Vec<Token>, ScanErrors> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }

        self.start = self.current;
        self.add_token(TokenType::Eof);

        if !self.errors.is_empty() {
            tracing::debug!(errors = self.errors.len(), "scanning failed");
            return Err(ScanErrors(self.errors));
        }

        tracing::debug!(tokens = self.tokens.len(), "scanned source");
        Ok(self.tokens)
    }

    fn scan_token(&mut self) {
        let character = self.advance();

        match character {
            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            '{' => self.add_token(TokenType::LeftBrace),
            '}' => self.add_token(TokenType::RightBrace),
            '.' => self.add_token(TokenType::Dot),
            ',' => self.add_token(TokenType::Comma),
            ';' => self.add_token(TokenType::Semicolon),
            '+' => self.add_token(TokenType::Plus),
            '-' => self.add_token(TokenType::Minus),
            '*' => self.add_token(TokenType::Star),
            '!' => {
                let token_type = match self.match_char('=') {
                    true => TokenType::BangEqual,
                    false => TokenType::Bang,
                };
                self.add_token(token_type)
            }
            '=' => {
                let token_type = match self.match_char('=') {
                    true => TokenType::EqualEqual,
                    false => TokenType::Equal,
                };
                self.add_token(token_type)
            }
            '<' => {
                let token_type = match self.match_char('=') {
                    true => TokenType::LessEqual,
                    false => TokenType::Less,
                };
                self.add_token(token_type)
            }
            '>' => {
                let token_type = match self.match_char('=') {
                    true => TokenType::GreaterEqual,
                    false => TokenType::Greater,
                };
                self.add_token(token_type)
            }
            '/' => {
                if self.match_char('/') {
                    // Comments run to the end of the line.
                    while !self.is_at_end() && self.peek() != '\n' {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenType::Slash)
                }
            }
            ' ' | '\r' | '\t' => {}
            '\n' => {
                self.line += 1;
            }
            '"' => self.string(),
            _ => {
                if is_digit(character) {
                    self.number();
                } else if is_alpha(character) {
                    self.identifier();
                } else {
                    self.unexpected_character();
                }
            }
        }
    }

    fn unexpected_character(&mut self) {
        // Report the whole code point, not just its first byte.
        let character = self.source[self.start..]
            .chars()
            .next()
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        self.current = self.start + character.len_utf8();
        self.errors.push(ScanError::UnexpectedCharacter {
            character,
            line: self.line,
        });
    }

    fn string(&mut self) {
        while !self.is_at_end() && self.peek() != '"' {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if !self.match_char('"') {
            self.errors
                .push(ScanError::UnterminatedString { line: self.line });
            return;
        }

        let lexeme = self.lexeme();
        let value = lexeme[1..(lexeme.len() - 1)].to_string();
        self.add_full_token(TokenType::String, Some(LiteralValue::String(value)));
    }

    fn number(&mut self) {
        while !self.is_at_end() && is_digit(self.peek()) {
            self.advance();
        }

        if !self.is_at_end() && self.peek() == '.' && is_digit(self.peek_next()) {
            self.advance();
            while !self.is_at_end() && is_digit(self.peek()) {
                self.advance();
            }
        }

        // Only ASCII digits with at most one interior dot reach this point.
        let value = self.lexeme().parse::<f64>().unwrap_or_default();
        self.add_full_token(TokenType::Number, Some(LiteralValue::Number(value)));
    }

    fn identifier(&mut self) {
        while !self.is_at_end() && is_alpha_numeric(self.peek()) {
            self.advance();
        }

        let type_ = resolve_keyword_type(self.lexeme()).unwrap_or(TokenType::Identifier);
        self.add_token(type_)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.bytes.len()
    }

    fn peek(&self) -> char {
        self.bytes[self.current] as char
    }

    fn peek_next(&self) -> char {
        match self.bytes.get(self.current + 1) {
            Some(byte) => *byte as char,
            None => '\0',
        }
    }

    fn advance(&mut self) -> char {
        let current = self.peek();
        self.current += 1;
        current
    }

    fn match_char(&mut self, character: char) -> bool {
        if !self.is_at_end() && self.peek() == character {
            self.advance();
            return true;
        }

        false
    }

    fn add_token(&mut self, token_type: TokenType) {
        self.add_full_token(token_type, Option::None)
    }

    fn add_full_token(&mut self, token_type: TokenType, literal: Option<LiteralValue>) {
        self.tokens.push(Token {
            token_type,
            line: self.line,
            literal,
            lexeme: self.lexeme().to_string(),
        })
    }

    fn lexeme(&self) -> &'a str {
        &self.source[self.start..self.current]
    }
}

/// Scans `source` into tokens, terminated by a single `Eof` token.
pub fn scan(source: &str) -> Result<Vec<Token>, ScanErrors> {
    Scanner::new(source).scan_tokens()
}

fn is_digit(character: char) -> bool {
    character.is_ascii_digit()
}

fn is_alpha(character: char) -> bool {
    character.is_ascii_alphabetic() || character == '_'
}

fn is_alpha_numeric(character: char) -> bool {
    is_digit(character) || is_alpha(character)
}

fn resolve_keyword_type(lexeme: &str) -> Option<TokenType> {
    match lexeme {
        "var" => Some(TokenType::Var),
        "fun" => Some(TokenType::Fun),
        "class" => Some(TokenType::Class),
        "this" => Some(TokenType::This),
        "super" => Some(TokenType::Super),
        "if" => Some(TokenType::If),
        "else" => Some(TokenType::Else),
        "for" => Some(TokenType::For),
        "while" => Some(TokenType::While),
        "return" => Some(TokenType::Return),
        "print" => Some(TokenType::Print),
        "and" => Some(TokenType::And),
        "or" => Some(TokenType::Or),
        "true" => Some(TokenType::True),
        "false" => Some(TokenType::False),
        "nil" => Some(TokenType::Nil),
        _ => None,
    }
}
