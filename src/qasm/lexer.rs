use crate::error::{Position, QError, QResult};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // keywords
    OpenQasm,
    Include,
    QReg,
    CReg,
    Gate,
    Opaque,
    Measure,
    Reset,
    Barrier,
    If,
    Pi,
    U,
    CX,

    Ident(String),
    Real(f64),
    Int(usize),
    Str(String),

    Semicolon,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Arrow,
    EqEq,
    Plus,
    Minus,
    Star,
    Slash,
    Caret,

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::OpenQasm => f.write_str("'OPENQASM'"),
            TokenKind::Include => f.write_str("'include'"),
            TokenKind::QReg => f.write_str("'qreg'"),
            TokenKind::CReg => f.write_str("'creg'"),
            TokenKind::Gate => f.write_str("'gate'"),
            TokenKind::Opaque => f.write_str("'opaque'"),
            TokenKind::Measure => f.write_str("'measure'"),
            TokenKind::Reset => f.write_str("'reset'"),
            TokenKind::Barrier => f.write_str("'barrier'"),
            TokenKind::If => f.write_str("'if'"),
            TokenKind::Pi => f.write_str("'pi'"),
            TokenKind::U => f.write_str("'U'"),
            TokenKind::CX => f.write_str("'CX'"),
            TokenKind::Ident(s) => write!(f, "identifier '{}'", s),
            TokenKind::Real(v) => write!(f, "real {}", v),
            TokenKind::Int(v) => write!(f, "integer {}", v),
            TokenKind::Str(s) => write!(f, "string \"{}\"", s),
            TokenKind::Semicolon => f.write_str("';'"),
            TokenKind::Comma => f.write_str("','"),
            TokenKind::LParen => f.write_str("'('"),
            TokenKind::RParen => f.write_str("')'"),
            TokenKind::LBracket => f.write_str("'['"),
            TokenKind::RBracket => f.write_str("']'"),
            TokenKind::LBrace => f.write_str("'{'"),
            TokenKind::RBrace => f.write_str("'}'"),
            TokenKind::Arrow => f.write_str("'->'"),
            TokenKind::EqEq => f.write_str("'=='"),
            TokenKind::Plus => f.write_str("'+'"),
            TokenKind::Minus => f.write_str("'-'"),
            TokenKind::Star => f.write_str("'*'"),
            TokenKind::Slash => f.write_str("'/'"),
            TokenKind::Caret => f.write_str("'^'"),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Position,
}

fn keyword(word: &str) -> Option<TokenKind> {
    let kind = match word {
        "OPENQASM" => TokenKind::OpenQasm,
        "include" => TokenKind::Include,
        "qreg" => TokenKind::QReg,
        "creg" => TokenKind::CReg,
        "gate" => TokenKind::Gate,
        "opaque" => TokenKind::Opaque,
        "measure" => TokenKind::Measure,
        "reset" => TokenKind::Reset,
        "barrier" => TokenKind::Barrier,
        "if" => TokenKind::If,
        "pi" => TokenKind::Pi,
        "U" => TokenKind::U,
        "CX" => TokenKind::CX,
        _ => return None,
    };
    Some(kind)
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Lexer {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    // skips whitespace and `//` comments. a lone '/' is consumed and its
    // position returned so the caller can emit a division token.
    fn skip_trivia(&mut self) -> Option<Position> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') => {
                    let pos = self.position();
                    self.bump();
                    if self.peek() != Some('/') {
                        return Some(pos);
                    }
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => return None,
            }
        }
    }

    fn number(&mut self, pos: Position) -> QResult<TokenKind> {
        let mut text = String::new();
        let mut real = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else if c == '.' && !real {
                real = true;
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            real = true;
            text.push('e');
            self.bump();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                text.push(sign);
                self.bump();
            }
            let mut digits = 0;
            while let Some(c) = self.peek().filter(|c| c.is_ascii_digit()) {
                text.push(c);
                self.bump();
                digits += 1;
            }
            if digits == 0 {
                return Err(QError::parse(pos, format!("malformed exponent in '{}'", text)));
            }
        }
        if real {
            text.parse::<f64>()
                .map(TokenKind::Real)
                .map_err(|_| QError::parse(pos, format!("malformed real '{}'", text)))
        } else {
            text.parse::<usize>()
                .map(TokenKind::Int)
                .map_err(|_| QError::parse(pos, format!("integer '{}' out of range", text)))
        }
    }

    fn next_token(&mut self) -> QResult<Token> {
        if let Some(pos) = self.skip_trivia() {
            return Ok(Token {
                kind: TokenKind::Slash,
                pos,
            });
        }

        let pos = self.position();
        let c = match self.peek() {
            Some(c) => c,
            None => {
                return Ok(Token {
                    kind: TokenKind::Eof,
                    pos,
                })
            }
        };

        let kind = if c.is_ascii_alphabetic() || c == '_' {
            let mut word = String::new();
            while let Some(c) = self.peek().filter(|c| c.is_ascii_alphanumeric() || *c == '_') {
                word.push(c);
                self.bump();
            }
            keyword(&word).unwrap_or(TokenKind::Ident(word))
        } else if c.is_ascii_digit() || c == '.' {
            self.number(pos)?
        } else if c == '"' {
            self.bump();
            let mut text = String::new();
            loop {
                match self.bump() {
                    Some('"') => break,
                    Some('\n') | None => return Err(QError::parse(pos, "unterminated string literal")),
                    Some(c) => text.push(c),
                }
            }
            TokenKind::Str(text)
        } else {
            self.bump();
            match c {
                ';' => TokenKind::Semicolon,
                ',' => TokenKind::Comma,
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '[' => TokenKind::LBracket,
                ']' => TokenKind::RBracket,
                '{' => TokenKind::LBrace,
                '}' => TokenKind::RBrace,
                '+' => TokenKind::Plus,
                '*' => TokenKind::Star,
                '^' => TokenKind::Caret,
                '-' => {
                    if self.peek() == Some('>') {
                        self.bump();
                        TokenKind::Arrow
                    } else {
                        TokenKind::Minus
                    }
                }
                '=' => {
                    if self.peek() == Some('=') {
                        self.bump();
                        TokenKind::EqEq
                    } else {
                        return Err(QError::parse(pos, "expected '==' after '='"));
                    }
                }
                other => return Err(QError::parse(pos, format!("unexpected character '{}'", other))),
            }
        };
        Ok(Token { kind, pos })
    }
}

/// Splits source text into tokens, always terminated by an `Eof` token.
pub fn tokenize(source: &str) -> QResult<Vec<Token>> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}
