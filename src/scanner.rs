//! Module `scanner` implements a one-pass, streaming UTF-8 lexer for the Mico
//! language.
//!
//! It transforms a byte slice (`&[u8]`) into a sequence of `Token<'a>`s,
//! skipping whitespace and comments, and emitting exactly one `EOF` token at
//! the end. Designed as a `FusedIterator`, it can be chained safely with other
//! iterator adapters.
//!
//! # Public API
//!
//! - `Scanner::new(src: &'a [u8]) -> Scanner<'a>`
//!   Create a new lexer over the input buffer.
//!
//! - `impl Iterator for Scanner<'a>`
//!   Yields `Result<Token<'a>, MicoError>` on each `.next()`, where
//!   `Ok(token)` is a scanned token and `Err` reports a lexing error with
//!   position information.
//!
//! # Notes
//!
//! - Bulk comment skipping via `memchr` for rapid new-line search.
//! - Zero-allocation lexeme slicing: tokens reference the original buffer
//!   (string/char literals with escapes are the exception).
//! - Keywords resolve through a compile-time perfect-hash `KEYWORDS` map.

use crate::error::{MicoError, Result};
use crate::token::{Position, Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile-time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"let"      => TokenType::LET,
    b"fn"       => TokenType::FN,
    b"if"       => TokenType::IF,
    b"else"     => TokenType::ELSE,
    b"elif"     => TokenType::ELIF,
    b"return"   => TokenType::RETURN,
    b"true"     => TokenType::TRUE,
    b"false"    => TokenType::FALSE,
    b"null"     => TokenType::NULL,
    b"for"      => TokenType::FOR,
    b"in"       => TokenType::IN,
    b"break"    => TokenType::BREAK,
    b"continue" => TokenType::CONTINUE,
    b"module"   => TokenType::MODULE,
    b"quote"    => TokenType::QUOTE,
    b"unquote"  => TokenType::UNQUOTE,
};

/// A single pass **scanner / lexer** that converts raw UTF-8 bytes into a
/// sequence of [`Token`]s. The lifetime `'a` ties every emitted token's
/// `lexeme` slice back to the original source buffer.
pub struct Scanner<'a> {
    src: &'a [u8],              // entire source (possibly memory-mapped)
    start: usize,               // index of the *first* byte of the current lexeme
    curr: usize,                // index *one past* the last byte examined
    line: usize,                // 1-based line counter (\n increments)
    line_start: usize,          // byte offset of the current line's first byte
    pending: Option<TokenType>, // recognised token kind waiting to be emitted
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `src`.
    #[inline]
    pub fn new(src: &'a [u8]) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            start: 0,
            curr: 0,
            line: 1,
            line_start: 0,
            pending: None,
        }
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    /// Return the length of the input slice.
    #[inline(always)]
    const fn len(&self) -> usize {
        self.src.len()
    }

    /// Are we at (or past) the end of input?
    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.len()
    }

    /// Advance one byte and return it. *Panics* if called at EOF — higher
    /// level code always guards with [`is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.src[self.curr];
        self.curr += 1;
        b
    }

    /// Peek at the current byte without consuming it. Returns `0` if past EOF
    /// to avoid branching at call-site.
    #[inline(always)]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.src[self.curr]
        }
    }

    /// Peek one byte beyond [`peek`]. Safe at EOF.
    #[inline(always)]
    fn peek_next(&self) -> u8 {
        if self.curr + 1 >= self.len() {
            0
        } else {
            self.src[self.curr + 1]
        }
    }

    /// Conditionally consume a byte **iff** it matches `expected`.
    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    /// 1-based column of the current lexeme start.
    #[inline(always)]
    fn column(&self) -> usize {
        self.start - self.line_start + 1
    }

    /// Position of the current lexeme start. Named to stay clear of
    /// `Iterator::position`, which wins method resolution on `&mut self`.
    #[inline(always)]
    fn lexeme_position(&self) -> Position {
        Position::new(self.line, self.column())
    }

    #[inline(always)]
    fn newline(&mut self) {
        self.line += 1;
        self.line_start = self.curr;
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* token starting at `self.curr`. If the lexeme produces
    /// an actual token the kind is stored in `self.pending`. Whitespace and
    /// comments are skipped by returning `Ok(())` with `pending = None`.
    fn scan_token(&mut self) -> Result<()> {
        let b = self.advance();

        match b {
            // ── single-character punctuators ──────────────────────────────
            b'(' => self.pending = Some(TokenType::LEFT_PAREN),
            b')' => self.pending = Some(TokenType::RIGHT_PAREN),
            b'{' => self.pending = Some(TokenType::LEFT_BRACE),
            b'}' => self.pending = Some(TokenType::RIGHT_BRACE),
            b'[' => self.pending = Some(TokenType::LEFT_BRACKET),
            b']' => self.pending = Some(TokenType::RIGHT_BRACKET),
            b',' => self.pending = Some(TokenType::COMMA),
            b';' => self.pending = Some(TokenType::SEMICOLON),
            b':' => self.pending = Some(TokenType::COLON),
            b'+' => self.pending = Some(TokenType::PLUS),
            b'-' => self.pending = Some(TokenType::MINUS),
            b'*' => self.pending = Some(TokenType::STAR),
            b'%' => self.pending = Some(TokenType::PERCENT),

            // ── dots: '.', '..', '...' ───────────────────────────────────
            b'.' => {
                let tt = if self.match_byte(b'.') {
                    if self.match_byte(b'.') {
                        TokenType::ELLIPSIS
                    } else {
                        TokenType::DOT_DOT
                    }
                } else {
                    TokenType::DOT
                };

                self.pending = Some(tt);
            }

            // ── one/two-character operators ──────────────────────────────
            b'!' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::BANG_EQUAL
                } else {
                    TokenType::BANG
                };

                self.pending = Some(tt);
            }

            b'=' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::EQUAL_EQUAL
                } else {
                    TokenType::EQUAL
                };

                self.pending = Some(tt);
            }

            b'<' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::LESS_EQUAL
                } else {
                    TokenType::LESS
                };

                self.pending = Some(tt);
            }

            b'>' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::GREATER_EQUAL
                } else {
                    TokenType::GREATER
                };

                self.pending = Some(tt);
            }

            b'&' => {
                if self.match_byte(b'&') {
                    self.pending = Some(TokenType::AND_AND);
                } else {
                    return Err(MicoError::lex(
                        self.line,
                        self.column(),
                        "Unexpected character: & (did you mean '&&'?)",
                    ));
                }
            }

            b'|' => {
                let tt = if self.match_byte(b'|') {
                    TokenType::OR_OR
                } else {
                    TokenType::PIPE
                };

                self.pending = Some(tt);
            }

            // ── whitespace / newline ─────────────────────────────────────
            b' ' | b'\r' | b'\t' => {
                return Ok(()); // skip insignificants
            }

            b'\n' => {
                self.newline();

                return Ok(());
            }

            // ── comments (// … until newline) ────────────────────────────
            b'/' => {
                if self.match_byte(b'/') {
                    // Fast-forward to next newline using `memchr`.
                    // If none found, skip to EOF.
                    if let Some(pos) = memchr(b'\n', &self.src[self.curr..]) {
                        self.curr += pos;
                    } else {
                        self.curr = self.len();
                    }

                    return Ok(());
                }

                self.pending = Some(TokenType::SLASH);
            }

            // ── string literal " … " ─────────────────────────────────────
            b'"' => {
                return self.parse_string();
            }

            // ── character literal ' … ' ──────────────────────────────────
            b'\'' => {
                return self.parse_char();
            }

            // ── raw byte string b" … " / identifier starting with b ──────
            b'b' if self.peek() == b'"' => {
                self.advance(); // consume opening quote

                return self.parse_rawstring();
            }

            // ── number literal (digit-leading) ───────────────────────────
            b'0'..=b'9' => {
                self.parse_number();
            }

            // ── identifiers / keywords (alpha or underscore-leading) ─────
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                self.parse_identifier();
            }

            // ── unexpected character ─────────────────────────────────────
            _ => {
                return Err(MicoError::lex(
                    self.line,
                    self.column(),
                    format!("Unexpected character: {}", b as char),
                ));
            }
        }

        Ok(())
    }

    /// Decode one (possibly escaped) character of a quoted literal.
    /// `self.curr` points at the character; on return it points past it.
    fn parse_escape(&mut self) -> Result<char> {
        let b = self.advance();

        if b != b'\\' {
            // Multi-byte UTF-8 sequences are decoded from the raw slice.
            if b < 0x80 {
                return Ok(b as char);
            }

            let rest = &self.src[self.curr - 1..];
            let window = &rest[..rest.len().min(4)];
            let s = match std::str::from_utf8(window) {
                Ok(s) => s,
                Err(e) if e.valid_up_to() > 0 => {
                    // SAFETY: the prefix up to valid_up_to is checked UTF-8.
                    unsafe { std::str::from_utf8_unchecked(&window[..e.valid_up_to()]) }
                }
                Err(_) => {
                    return Err(MicoError::lex(
                        self.line,
                        self.column(),
                        "Invalid UTF-8 in literal",
                    ));
                }
            };
            let c = s.chars().next().unwrap_or('\u{fffd}');
            self.curr += c.len_utf8() - 1;

            return Ok(c);
        }

        let e = self.advance();

        let c = match e {
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'0' => '\0',
            b'\\' => '\\',
            b'"' => '"',
            b'\'' => '\'',
            _ => {
                return Err(MicoError::lex(
                    self.line,
                    self.column(),
                    format!("Unknown escape sequence: \\{}", e as char),
                ));
            }
        };

        Ok(c)
    }

    /// Parse a double-quoted string literal with escape resolution.
    fn parse_string(&mut self) -> Result<()> {
        let mut out = String::new();

        while !self.is_at_end() && self.peek() != b'"' {
            if self.peek() == b'\n' {
                self.advance();
                self.newline();
                out.push('\n');
                continue;
            }

            out.push(self.parse_escape()?);
        }

        if self.is_at_end() {
            return Err(MicoError::lex(self.line, self.column(), "Unterminated string."));
        }

        self.advance(); // consume closing quote

        self.pending = Some(TokenType::STRING(out));

        Ok(())
    }

    /// Parse a single-quoted character literal.
    fn parse_char(&mut self) -> Result<()> {
        if self.is_at_end() || self.peek() == b'\'' {
            return Err(MicoError::lex(self.line, self.column(), "Empty character literal."));
        }

        let c = self.parse_escape()?;

        if !self.match_byte(b'\'') {
            return Err(MicoError::lex(
                self.line,
                self.column(),
                "Unterminated character literal.",
            ));
        }

        self.pending = Some(TokenType::CHAR(c));

        Ok(())
    }

    /// Parse a raw byte-string literal. No escape processing beyond `\"`.
    fn parse_rawstring(&mut self) -> Result<()> {
        let mut out: Vec<u8> = Vec::new();

        while !self.is_at_end() && self.peek() != b'"' {
            let b = self.advance();

            if b == b'\n' {
                self.newline();
            }

            if b == b'\\' && self.peek() == b'"' {
                out.push(self.advance());
                continue;
            }

            out.push(b);
        }

        if self.is_at_end() {
            return Err(MicoError::lex(
                self.line,
                self.column(),
                "Unterminated raw string.",
            ));
        }

        self.advance(); // consume closing quote

        self.pending = Some(TokenType::RAWSTRING(out));

        Ok(())
    }

    /// Parse a numeric literal (`123`, `3.14`). Integral lexemes become
    /// `INT`, fractional ones `FLOAT`. A trailing `..` is *not* consumed so
    /// interval expressions like `0..3` lex as INT DOT_DOT INT.
    fn parse_number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        let mut is_float = false;

        // Optional fractional part; `1..2` must keep the dots.
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            is_float = true;
            self.advance(); // consume "."

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let slice: &[u8] = &self.src[self.start..self.curr];
        let s: &str = unsafe { std::str::from_utf8_unchecked(slice) };

        if is_float {
            let n: f64 = s.parse::<f64>().unwrap_or(0.0); // digits checked above
            self.pending = Some(TokenType::FLOAT(n));
        } else {
            // Overflowing integer literals degrade to floats.
            match s.parse::<i64>() {
                Ok(n) => self.pending = Some(TokenType::INT(n)),
                Err(_) => self.pending = Some(TokenType::FLOAT(s.parse::<f64>().unwrap_or(0.0))),
            }
        }
    }

    /// Parse an identifier and decide if it is a **keyword** or a generic
    /// `IDENTIFIER` token.
    fn parse_identifier(&mut self) {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        let slice: &[u8] = &self.src[self.start..self.curr];

        let tt: TokenType = KEYWORDS
            .get(slice)
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER);

        self.pending = Some(tt);
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        // Loop until we either emit a token, hit EOF, or see an error.
        while self.curr <= self.len() {
            // 1. EOF guard — emit exactly one EOF then terminate.
            if self.curr == self.len() {
                self.curr += 1; // ensure fused semantics
                self.start = self.len();
                return Some(Ok(Token::new(TokenType::EOF, "", self.lexeme_position())));
            }

            // 2. Reset per-token state.
            self.start = self.curr;
            self.pending = None;

            let pos = self.lexeme_position();

            // 3. Attempt to scan a token.
            if let Err(e) = self.scan_token() {
                return Some(Err(e));
            }

            // 4. If a real token was recognised, build and return it.
            if let Some(tt) = self.pending.take() {
                let slice: &[u8] = &self.src[self.start..self.curr];
                let lex: &str = std::str::from_utf8(slice).unwrap_or("");
                debug!("Scanned token ({:?}) at {}", tt, pos);

                return Some(Ok(Token::new(tt, lex, pos)));
            }
            // Otherwise it was whitespace / comment → continue loop.
        }

        None // already yielded EOF
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
