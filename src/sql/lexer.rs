//! Tokenizer for DDL scripts.
//!
//! Only the handful of keywords that matter for table structure get their own
//! token; every other word comes through as an identifier.

use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Create,
    Alter,
    Add,
    Table,
    Only,
    Primary,
    Key,
    Foreign,
    References,
    Not,
    Null,
    Unique,
    Default,
    On,
    Constraint,
    Index,
    If,
    Exists,
    Check,

    Ident(String),
    Str(String),
    Num(String),

    LParen,
    RParen,
    Comma,
    Semicolon,
    Dot,

    Eof,
}

impl Token {
    fn keyword(word: &str) -> Option<Self> {
        let token = match word.to_ascii_uppercase().as_str() {
            "CREATE" => Self::Create,
            "ALTER" => Self::Alter,
            "ADD" => Self::Add,
            "TABLE" => Self::Table,
            "ONLY" => Self::Only,
            "PRIMARY" => Self::Primary,
            "KEY" => Self::Key,
            "FOREIGN" => Self::Foreign,
            "REFERENCES" => Self::References,
            "NOT" => Self::Not,
            "NULL" => Self::Null,
            "UNIQUE" => Self::Unique,
            "DEFAULT" => Self::Default,
            "ON" => Self::On,
            "CONSTRAINT" => Self::Constraint,
            "INDEX" => Self::Index,
            "IF" => Self::If,
            "EXISTS" => Self::Exists,
            "CHECK" => Self::Check,
            _ => return None,
        };
        Some(token)
    }

    /// The name this token spells when it stands where a column or table
    /// name is expected. Structural keywords (`PRIMARY`, `NOT`, ...) have none;
    /// the rest come back lower-cased.
    pub fn name(&self) -> Option<String> {
        let word = match self {
            Self::Ident(s) => return Some(s.clone()),
            Self::Add => "add",
            Self::Alter => "alter",
            Self::Create => "create",
            Self::Exists => "exists",
            Self::If => "if",
            Self::Index => "index",
            Self::Key => "key",
            Self::Only => "only",
            Self::Table => "table",
            _ => return None,
        };
        Some(word.to_string())
    }

    /// True for an identifier spelled `word`, ignoring case.
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self, Self::Ident(s) if s.eq_ignore_ascii_case(word))
    }
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    fn next_token(&mut self) -> Token {
        loop {
            let Some(&c) = self.chars.peek() else {
                return Token::Eof;
            };
            match c {
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                '-' => {
                    self.chars.next();
                    match self.chars.peek() {
                        Some('-') => self.skip_line(),
                        Some(d) if d.is_ascii_digit() => {
                            let mut num = self.read_number();
                            num.insert(0, '-');
                            return Token::Num(num);
                        }
                        _ => {}
                    }
                }
                '#' => self.skip_line(),
                '/' => {
                    self.chars.next();
                    if self.chars.peek() == Some(&'*') {
                        self.chars.next();
                        self.skip_block_comment();
                    }
                }
                '(' => return self.single(Token::LParen),
                ')' => return self.single(Token::RParen),
                ',' => return self.single(Token::Comma),
                ';' => return self.single(Token::Semicolon),
                '.' => return self.single(Token::Dot),
                '"' | '`' => return Token::Ident(self.read_quoted(c)),
                '[' => return Token::Ident(self.read_bracketed()),
                '\'' => return Token::Str(self.read_quoted(c)),
                c if c.is_ascii_digit() => return Token::Num(self.read_number()),
                c if c.is_alphabetic() || c == '_' => {
                    let word = self.read_word();
                    return Token::keyword(&word).unwrap_or(Token::Ident(word));
                }
                _ => {
                    // Operators and other punctuation carry no structure.
                    self.chars.next();
                }
            }
        }
    }

    fn single(&mut self, token: Token) -> Token {
        self.chars.next();
        token
    }

    fn skip_line(&mut self) {
        for c in self.chars.by_ref() {
            if c == '\n' {
                break;
            }
        }
    }

    fn skip_block_comment(&mut self) {
        let mut star = false;
        for c in self.chars.by_ref() {
            if star && c == '/' {
                break;
            }
            star = c == '*';
        }
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                word.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        word
    }

    fn read_number(&mut self) -> String {
        let mut num = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() || (c == '.' && !num.contains('.')) {
                num.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        num
    }

    /// Quoted identifier or string literal. A doubled quote is an escaped
    /// quote; backslash escapes are honoured inside string literals.
    fn read_quoted(&mut self, quote: char) -> String {
        self.chars.next();
        let mut text = String::new();
        while let Some(c) = self.chars.next() {
            if c == quote {
                if self.chars.peek() == Some(&quote) {
                    self.chars.next();
                    text.push(quote);
                } else {
                    break;
                }
            } else if c == '\\' && quote == '\'' {
                match self.chars.next() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some(other) => text.push(other),
                    None => break,
                }
            } else {
                text.push(c);
            }
        }
        text
    }

    /// SQL Server style `[identifier]`.
    fn read_bracketed(&mut self) -> String {
        self.chars.next();
        self.chars.by_ref().take_while(|&c| c != ']').collect()
    }
}
