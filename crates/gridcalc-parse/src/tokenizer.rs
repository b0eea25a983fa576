use std::error::Error;
use std::fmt::{self, Display};

use gridcalc_common::{CellErrorKind, letters_to_column};

/// A custom error type for the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizerError {
    pub message: String,
    pub pos: usize,
}

impl fmt::Display for TokenizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenizerError at {}: {}", self.pos, self.message)
    }
}

impl Error for TokenizerError {}

/// The type of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TokenType {
    Number,
    String,
    Boolean,
    CellRef,
    RangeRef,
    /// A word that can only be a function name (or a stray name the parser rejects).
    Identifier,
    Operator,
    LParen,
    RParen,
    Comma,
    Colon,
    /// A literal error token such as `#REF!`.
    ErrorLiteral,
    Eof,
    /// Unrecognized input; always followed by `Eof`.
    Error,
}

impl Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// One endpoint of a lexed cell reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RefPart {
    /// Column letters, uppercased.
    pub letters: String,
    pub digits: String,
    pub col: u32,
    pub row: u32,
    pub col_abs: bool,
    pub row_abs: bool,
}

/// Reference payload of a `CellRef` (no `end`) or `RangeRef` token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RefToken {
    pub start: RefPart,
    pub end: Option<RefPart>,
}

/// A token: its kind, exact source text and byte span.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    pub start: usize,
    pub end: usize,
    pub reference: Option<RefToken>,
}

impl Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} value: {} @{}>", self.token_type, self.value, self.start)
    }
}

impl Token {
    pub fn new(token_type: TokenType, value: impl Into<String>, start: usize, end: usize) -> Self {
        Token {
            token_type,
            value: value.into(),
            start,
            end,
            reference: None,
        }
    }

    pub fn is_operator(&self, op: &str) -> bool {
        self.token_type == TokenType::Operator && self.value == op
    }

    /// True for `CellRef` and `RangeRef`.
    pub fn is_reference(&self) -> bool {
        matches!(self.token_type, TokenType::CellRef | TokenType::RangeRef)
    }
}

/// Lexer over formula text.
///
/// The whole formula is tokenized eagerly on construction; the token stream
/// always ends in exactly one `Eof`. Iterating consumes a cursor which
/// [`Tokenizer::reset`] rewinds.
pub struct Tokenizer {
    formula: String,
    items: Vec<Token>,
    cursor: usize,
}

impl Tokenizer {
    /// Tokenize `formula`. A single leading `=` is skipped.
    pub fn new(formula: &str) -> Self {
        let mut tokenizer = Tokenizer {
            formula: formula.to_string(),
            items: Vec::with_capacity(formula.len() / 2 + 1),
            cursor: 0,
        };
        tokenizer.run();
        tokenizer
    }

    pub fn tokens(&self) -> &[Token] {
        &self.items
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.items
    }

    pub fn source(&self) -> &str {
        &self.formula
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// The first lexing failure, if the stream contains an `Error` token.
    pub fn error(&self) -> Option<TokenizerError> {
        self.items
            .iter()
            .find(|t| t.token_type == TokenType::Error)
            .map(|t| TokenizerError {
                message: if t.value.starts_with('"') {
                    "unterminated string literal".to_string()
                } else {
                    format!("unexpected character {:?}", t.value)
                },
                pos: t.start,
            })
    }

    fn run(&mut self) {
        let bytes = self.formula.as_bytes().to_vec();
        let mut pos = 0;
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if bytes.get(pos) == Some(&b'=') {
            pos += 1;
        }

        while pos < bytes.len() {
            let b = bytes[pos];
            if b.is_ascii_whitespace() {
                pos += 1;
                continue;
            }
            let next = match b {
                b'0'..=b'9' => self.lex_number(&bytes, pos),
                b'.' if bytes.get(pos + 1).is_some_and(u8::is_ascii_digit) => {
                    self.lex_number(&bytes, pos)
                }
                b'"' => self.lex_string(&bytes, pos),
                b'#' => self.lex_error_literal(pos),
                b'$' | b'A'..=b'Z' | b'a'..=b'z' | b'_' => self.lex_word(&bytes, pos),
                b'(' => self.push_simple(TokenType::LParen, pos, pos + 1),
                b')' => self.push_simple(TokenType::RParen, pos, pos + 1),
                b',' => self.push_simple(TokenType::Comma, pos, pos + 1),
                b':' => self.push_simple(TokenType::Colon, pos, pos + 1),
                b'+' | b'-' | b'*' | b'/' | b'^' | b'&' | b'=' => {
                    self.push_simple(TokenType::Operator, pos, pos + 1)
                }
                b'<' => match bytes.get(pos + 1) {
                    Some(b'>') | Some(b'=') => self.push_simple(TokenType::Operator, pos, pos + 2),
                    _ => self.push_simple(TokenType::Operator, pos, pos + 1),
                },
                b'>' => match bytes.get(pos + 1) {
                    Some(b'=') => self.push_simple(TokenType::Operator, pos, pos + 2),
                    _ => self.push_simple(TokenType::Operator, pos, pos + 1),
                },
                _ => None,
            };
            match next {
                Some(end) => pos = end,
                None => {
                    self.push_error(pos);
                    break;
                }
            }
        }

        let len = self.formula.len();
        self.items.push(Token::new(TokenType::Eof, "", len, len));
    }

    fn push_simple(&mut self, token_type: TokenType, start: usize, end: usize) -> Option<usize> {
        let value = self.formula[start..end].to_string();
        self.items.push(Token::new(token_type, value, start, end));
        Some(end)
    }

    fn push_error(&mut self, pos: usize) {
        let ch_len = self.formula[pos..].chars().next().map_or(1, char::len_utf8);
        let value = self.formula[pos..pos + ch_len].to_string();
        self.items
            .push(Token::new(TokenType::Error, value, pos, pos + ch_len));
    }

    fn lex_number(&mut self, bytes: &[u8], start: usize) -> Option<usize> {
        let mut pos = start;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        if bytes.get(pos) == Some(&b'.') {
            pos += 1;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
        }
        // exponent only when digits follow
        if matches!(bytes.get(pos), Some(b'e') | Some(b'E')) {
            let mut exp = pos + 1;
            if matches!(bytes.get(exp), Some(b'+') | Some(b'-')) {
                exp += 1;
            }
            if bytes.get(exp).is_some_and(u8::is_ascii_digit) {
                while exp < bytes.len() && bytes[exp].is_ascii_digit() {
                    exp += 1;
                }
                pos = exp;
            }
        }
        self.push_simple(TokenType::Number, start, pos)
    }

    fn lex_string(&mut self, bytes: &[u8], start: usize) -> Option<usize> {
        let mut pos = start + 1;
        while pos < bytes.len() {
            if bytes[pos] == b'"' {
                if bytes.get(pos + 1) == Some(&b'"') {
                    pos += 2;
                    continue;
                }
                return self.push_simple(TokenType::String, start, pos + 1);
            }
            pos += 1;
        }
        None
    }

    fn lex_error_literal(&mut self, start: usize) -> Option<usize> {
        let rest = &self.formula[start..];
        let kind = CellErrorKind::ALL.into_iter().find(|k| {
            let tok = k.token();
            rest.len() >= tok.len()
                && rest.is_char_boundary(tok.len())
                && rest[..tok.len()].eq_ignore_ascii_case(tok)
        })?;
        let end = start + kind.token().len();
        self.items.push(Token::new(
            TokenType::ErrorLiteral,
            kind.token(),
            start,
            end,
        ));
        Some(end)
    }

    fn lex_word(&mut self, bytes: &[u8], start: usize) -> Option<usize> {
        let word_end = scan_word(bytes, start);

        if bytes[start] != b'$' && bytes.get(word_end) == Some(&b'(') {
            return self.push_simple(TokenType::Identifier, start, word_end);
        }

        if let Some((first, first_end)) = scan_ref_part(bytes, start) {
            if !continues_word(bytes, first_end) {
                // range: A1:B2
                if bytes.get(first_end) == Some(&b':') {
                    if let Some((second, second_end)) = scan_ref_part(bytes, first_end + 1) {
                        if !continues_word(bytes, second_end) {
                            let mut token = Token::new(
                                TokenType::RangeRef,
                                &self.formula[start..second_end],
                                start,
                                second_end,
                            );
                            token.reference = Some(RefToken {
                                start: first,
                                end: Some(second),
                            });
                            self.items.push(token);
                            return Some(second_end);
                        }
                    }
                }
                let mut token =
                    Token::new(TokenType::CellRef, &self.formula[start..first_end], start, first_end);
                token.reference = Some(RefToken {
                    start: first,
                    end: None,
                });
                self.items.push(token);
                return Some(first_end);
            }
        }

        if bytes[start] == b'$' {
            return None;
        }

        let word = &self.formula[start..word_end];
        if word.eq_ignore_ascii_case("TRUE") || word.eq_ignore_ascii_case("FALSE") {
            return self.push_simple(TokenType::Boolean, start, word_end);
        }
        self.push_simple(TokenType::Identifier, start, word_end)
    }
}

impl Iterator for Tokenizer {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let token = self.items.get(self.cursor).cloned()?;
        self.cursor += 1;
        Some(token)
    }
}

impl TryFrom<&str> for Tokenizer {
    type Error = TokenizerError;

    /// Strict construction: fails when the formula contains unlexable input.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let tokenizer = Tokenizer::new(value);
        match tokenizer.error() {
            Some(err) => Err(err),
            None => Ok(tokenizer),
        }
    }
}

/// Identifier characters: letters, digits, `_` and `.` (for names like `LOG10`).
fn scan_word(bytes: &[u8], start: usize) -> usize {
    let mut pos = start;
    while pos < bytes.len()
        && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_' || bytes[pos] == b'.')
    {
        pos += 1;
    }
    pos
}

fn continues_word(bytes: &[u8], pos: usize) -> bool {
    bytes
        .get(pos)
        .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_' || *b == b'.' || *b == b'(' || *b == b'$')
}

/// Match `$?[A-Za-z]+$?[0-9]+` at `start`.
fn scan_ref_part(bytes: &[u8], start: usize) -> Option<(RefPart, usize)> {
    let mut pos = start;
    let col_abs = bytes.get(pos) == Some(&b'$');
    if col_abs {
        pos += 1;
    }
    let letters_start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
        pos += 1;
    }
    if pos == letters_start {
        return None;
    }
    let letters_end = pos;
    let row_abs = bytes.get(pos) == Some(&b'$');
    if row_abs {
        pos += 1;
    }
    let digits_start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    if pos == digits_start {
        return None;
    }

    let letters = std::str::from_utf8(&bytes[letters_start..letters_end])
        .ok()?
        .to_ascii_uppercase();
    let digits = std::str::from_utf8(&bytes[digits_start..pos]).ok()?.to_string();
    let col = letters_to_column(&letters)?;
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((
        RefPart {
            letters,
            digits,
            col,
            row,
            col_abs,
            row_abs,
        },
        pos,
    ))
}
