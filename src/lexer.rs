//! Module `lexer` implements a one‑pass lexer for SharpScript.
//!
//! It transforms a `&str` into a sequence of `Token<'a>`s, skipping whitespace
//! and `//` line comments, and emitting exactly one `EOF` token at the end.
//! The lexer is a `FusedIterator`; [`Lexer::tokenize`] drains it eagerly.
//!
//! # Token Recognition
//!
//! - Delimiters: `(` `)` `{` `}` `[` `]` `;` `,` `.` `:`.
//! - Operators with one character of lookahead: `+=` `-=` `==` `!=` `<=` `>=`
//!   `&&` `||`, otherwise the single-character form.
//! - Numbers: a digit followed by any run of digits and dots.  Validation is
//!   left to the parser.
//! - Strings: `"` … `"`.  A backslash skips the following character, which is
//!   kept verbatim (escapes are not decoded).  An unterminated string runs to
//!   the end of input.
//! - Identifiers/keywords: letter or underscore followed by alphanumerics or
//!   underscores, resolved via the perfect‑hash `KEYWORDS` map.
//! - Anything else becomes a one-character `IDENTIFIER` token.  There is no
//!   lexical error; the anomaly is logged at `warn` level.
//!
//! Line and column advance per consumed character; a newline bumps the line
//! and resets the column to 1.

use crate::token::{Token, TokenType};
use log::{debug, info, warn};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "var"      => TokenType::VAR,
    "function" => TokenType::FUNCTION,
    "class"    => TokenType::CLASS,
    "static"   => TokenType::STATIC,
    "public"   => TokenType::PUBLIC,
    "private"  => TokenType::PRIVATE,
    "return"   => TokenType::RETURN,
    "if"       => TokenType::IF,
    "else"     => TokenType::ELSE,
    "while"    => TokenType::WHILE,
    "for"      => TokenType::FOR,
    "true"     => TokenType::TRUE,
    "false"    => TokenType::FALSE,
    "null"     => TokenType::NULL,
    "new"      => TokenType::NEW,
    "this"     => TokenType::THIS,
    "base"     => TokenType::BASE,
};

/// Look up a keyword by its exact spelling.
pub fn keyword(ident: &str) -> Option<TokenType> {
    KEYWORDS.get(ident).copied()
}

/// A single pass lexer that converts source text into a sequence of
/// [`Token`]s.  The lifetime `'a` ties every emitted token’s `lexeme` slice
/// back to the original source.
pub struct Lexer<'a> {
    src: &'a str,
    start: usize,               // byte index of the first char of the current lexeme
    curr: usize,                // byte index one past the last char examined
    line: usize,                // 1‑based line counter
    column: usize,              // 1‑based column of `curr`
    start_line: usize,          // position of `start`
    start_column: usize,
    pending: Option<TokenType>, // recognised token kind waiting to be emitted
    finished: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer over `src`.
    #[inline]
    pub fn new(src: &'a str) -> Self {
        info!("Lexer created over {} bytes", src.len());

        Self {
            src,
            start: 0,
            curr: 0,
            line: 1,
            column: 1,
            start_line: 1,
            start_column: 1,
            pending: None,
            finished: false,
        }
    }

    /// Consume the whole input and return every token, `EOF` included.
    pub fn tokenize(self) -> Vec<Token<'a>> {
        let tokens: Vec<Token<'a>> = self.collect();

        info!("Tokenized {} tokens", tokens.len());

        tokens
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.src.len()
    }

    /// Advance one character and return it.  Callers guard with
    /// [`is_at_end`](Self::is_at_end).
    #[inline(always)]
    fn advance(&mut self) -> char {
        let c = self.src[self.curr..].chars().next().unwrap_or('\0');
        self.curr += c.len_utf8();

        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        c
    }

    /// Peek at the current character without consuming it.  Returns `'\0'`
    /// past EOF.
    #[inline(always)]
    fn peek(&self) -> char {
        self.src[self.curr..].chars().next().unwrap_or('\0')
    }

    /// Conditionally consume a character **iff** it matches `expected`.
    #[inline(always)]
    fn match_char(&mut self, expected: char) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Pick between a two-character operator and its one-character form.
    #[inline(always)]
    fn either(&mut self, second: char, double: TokenType, single: TokenType) -> TokenType {
        if self.match_char(second) {
            double
        } else {
            single
        }
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* lexeme starting at `self.curr`.  If it produces a token
    /// the kind is stored in `self.pending`; whitespace and comments leave
    /// `pending` empty.
    fn scan_token(&mut self) {
        let c = self.advance();

        let tt = match c {
            // ── delimiters ───────────────────────────────────────────────
            '(' => TokenType::LEFT_PAREN,
            ')' => TokenType::RIGHT_PAREN,
            '{' => TokenType::LEFT_BRACE,
            '}' => TokenType::RIGHT_BRACE,
            '[' => TokenType::LEFT_BRACKET,
            ']' => TokenType::RIGHT_BRACKET,
            ';' => TokenType::SEMICOLON,
            ',' => TokenType::COMMA,
            '.' => TokenType::DOT,
            ':' => TokenType::COLON,
            '*' => TokenType::STAR,
            '%' => TokenType::PERCENT,

            // ── one-or-two character operators ───────────────────────────
            '+' => self.either('=', TokenType::PLUS_EQUAL, TokenType::PLUS),
            '-' => self.either('=', TokenType::MINUS_EQUAL, TokenType::MINUS),
            '=' => self.either('=', TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            '!' => self.either('=', TokenType::BANG_EQUAL, TokenType::BANG),
            '<' => self.either('=', TokenType::LESS_EQUAL, TokenType::LESS),
            '>' => self.either('=', TokenType::GREATER_EQUAL, TokenType::GREATER),

            '&' if self.match_char('&') => TokenType::AND_AND,
            '|' if self.match_char('|') => TokenType::OR_OR,

            // ── comments (// … until newline) ────────────────────────────
            '/' => {
                if self.peek() == '/' {
                    self.skip_comment();
                    return;
                }

                TokenType::SLASH
            }

            '"' => self.parse_string(),

            c if c.is_ascii_digit() => self.parse_number(),

            c if c.is_alphabetic() || c == '_' => self.parse_identifier(),

            // ── whitespace ───────────────────────────────────────────────
            c if c.is_whitespace() => return,

            // ── unknown character → one-character identifier ─────────────
            other => {
                warn!(
                    "Unrecognised character {:?} at {}:{} passed through as identifier",
                    other, self.start_line, self.start_column
                );

                TokenType::IDENTIFIER
            }
        };

        self.pending = Some(tt);
    }

    /// Skip a `//` comment up to (not including) the next newline.
    fn skip_comment(&mut self) {
        let rest: &str = &self.src[self.curr..];

        let len: usize = memchr(b'\n', rest.as_bytes()).unwrap_or(rest.len());

        self.column += rest[..len].chars().count();
        self.curr += len;
    }

    /// Scan a double‑quoted string.  `self.start` points at the opening `"`.
    fn parse_string(&mut self) -> TokenType {
        while !self.is_at_end() && self.peek() != '"' {
            if self.advance() == '\\' && !self.is_at_end() {
                self.advance(); // escaped char kept verbatim
            }
        }

        if self.is_at_end() {
            debug!("Unterminated string starting at line {}", self.start_line);
        } else {
            self.advance(); // closing quote
        }

        TokenType::STRING
    }

    /// Scan a run of digits and dots.
    fn parse_number(&mut self) -> TokenType {
        while self.peek().is_ascii_digit() || self.peek() == '.' {
            self.advance();
        }

        TokenType::NUMBER
    }

    /// Scan an identifier and decide if it is a **keyword**.
    fn parse_identifier(&mut self) -> TokenType {
        while {
            let c: char = self.peek();
            c.is_alphanumeric() || c == '_'
        } {
            self.advance();
        }

        keyword(&self.src[self.start..self.curr]).unwrap_or(TokenType::IDENTIFIER)
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            // 1. EOF guard – emit exactly one EOF then terminate.
            if self.is_at_end() {
                self.finished = true;
                return Some(Token::new(TokenType::EOF, "", self.line, self.column));
            }

            // 2. Reset per‑token state.
            self.start = self.curr;
            self.start_line = self.line;
            self.start_column = self.column;
            self.pending = None;

            self.scan_token();

            // 3. If a real token was recognised, build and return it.
            if let Some(tt) = self.pending.take() {
                let lexeme: &'a str = &self.src[self.start..self.curr];

                return Some(Token::new(tt, lexeme, self.start_line, self.start_column));
            }
            // Otherwise it was whitespace / comment → continue loop.
        }
    }
}

impl<'a> FusedIterator for Lexer<'a> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_table_is_exact() {
        assert_eq!(keyword("function"), Some(TokenType::FUNCTION));
        assert_eq!(keyword("base"), Some(TokenType::BASE));
        assert_eq!(keyword("Function"), None);
        assert_eq!(keyword("fun"), None);
    }

    #[test]
    fn lexer_is_fused_after_eof() {
        let mut lexer = Lexer::new("x");

        assert_eq!(lexer.next().map(|t| t.token_type), Some(TokenType::IDENTIFIER));
        assert_eq!(lexer.next().map(|t| t.token_type), Some(TokenType::EOF));
        assert!(lexer.next().is_none());
        assert!(lexer.next().is_none());
    }

    #[test]
    fn comment_at_end_of_input_still_yields_eof() {
        let tokens = Lexer::new("var // trailing").tokenize();

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].token_type, TokenType::EOF);
        assert_eq!(tokens[1].column, 16);
    }
}
