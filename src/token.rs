use log::{debug, info};
use serde::Serialize;
use std::fmt;
use std::mem;

/// A line/column pair attached to every token and AST node for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct Position {
    /// 1-based line number in the source.
    pub line: usize,

    /// 1-based column number in the source.
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The different kinds of tokens recognized by the Mico scanner.
///
/// Variants without data represent punctuators, operators or keywords.
/// `STRING(String)`, `RAWSTRING(Vec<u8>)`, `INT(i64)`, `FLOAT(f64)` and
/// `CHAR(char)` carry their literal values. `IDENTIFIER` is used for
/// user-defined names. `EOF` marks the end of input.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Serialize)]
pub enum TokenType {
    /// '('
    LEFT_PAREN,

    /// ')'
    RIGHT_PAREN,

    /// '{'
    LEFT_BRACE,

    /// '}'
    RIGHT_BRACE,

    /// '['
    LEFT_BRACKET,

    /// ']'
    RIGHT_BRACKET,

    /// ','
    COMMA,

    /// ';'
    SEMICOLON,

    /// ':'
    COLON,

    /// '.'
    DOT,

    /// '..'
    DOT_DOT,

    /// '...'
    ELLIPSIS,

    /// '+'
    PLUS,

    /// '-'
    MINUS,

    /// '*'
    STAR,

    /// '/'
    SLASH,

    /// '%'
    PERCENT,

    /// '!'
    BANG,

    /// '!='
    BANG_EQUAL,

    /// '='
    EQUAL,

    /// '=='
    EQUAL_EQUAL,

    /// '>'
    GREATER,

    /// '>='
    GREATER_EQUAL,

    /// '<'
    LESS,

    /// '<='
    LESS_EQUAL,

    /// '&&'
    AND_AND,

    /// '||'
    OR_OR,

    /// '|'
    PIPE,

    /// A user-defined identifier
    IDENTIFIER,

    /// A string literal (contents without quotes, escapes resolved)
    STRING(String),

    /// A raw byte-string literal: `b"..."`
    RAWSTRING(Vec<u8>),

    /// A character literal: `'a'`
    CHAR(char),

    /// An integer literal
    INT(i64),

    /// A floating point literal
    #[serde(rename = "FLOAT")]
    FLOAT(f64),

    /// 'let'
    LET,

    /// 'fn'
    FN,

    /// 'if'
    IF,

    /// 'else'
    ELSE,

    /// 'elif'
    ELIF,

    /// 'return'
    RETURN,

    /// 'true'
    TRUE,

    /// 'false'
    FALSE,

    /// 'null'
    NULL,

    /// 'for'
    FOR,

    /// 'in'
    IN,

    /// 'break'
    BREAK,

    /// 'continue'
    CONTINUE,

    /// 'module'
    MODULE,

    /// 'quote'
    QUOTE,

    /// 'unquote'
    UNQUOTE,

    /// End-of-file marker
    EOF,
}

impl PartialEq for TokenType {
    /// Two TokenTypes are equal if they share the same variant
    /// (ignoring any inner data). Uses `mem::discriminant` to compare.
    fn eq(&self, other: &Self) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

/// A scanned token, including its type, the original lexeme,
/// and the position where it was found.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Token<'a> {
    /// The category of this token.
    pub token_type: TokenType,

    /// The exact substring from the source that produced this token.
    pub lexeme: &'a str,

    /// Source position of the first byte of the lexeme.
    pub pos: Position,
}

impl<'a> Token<'a> {
    /// Create a new Token with the given type, lexeme, and position.
    pub fn new(token_type: TokenType, lexeme: &'a str, pos: Position) -> Self {
        debug!(
            "Creating token: type={:?}, lexeme={}, pos={}",
            token_type, lexeme, pos
        );

        Self {
            token_type,
            lexeme,
            pos,
        }
    }
}

impl<'a> fmt::Display for Token<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ── 1. decide literal string (may borrow or inline-format) ──────────
        let literal_str: String = match &self.token_type {
            TokenType::STRING(s) => s.clone(),
            TokenType::RAWSTRING(b) => format!("{:?}", b),
            TokenType::CHAR(c) => c.to_string(),
            TokenType::INT(n) => {
                let mut buf: itoa::Buffer = itoa::Buffer::new();
                buf.format(*n).to_string()
            }
            TokenType::FLOAT(n) => {
                if n.fract() == 0.0 {
                    format!("{:.1}", n)
                } else {
                    n.to_string()
                }
            }
            _ => "null".to_string(),
        };

        // ── 2. variant name without payloads ───────────────────────────────
        let variant: &'static str = match self.token_type {
            TokenType::STRING(_) => "STRING",
            TokenType::RAWSTRING(_) => "RAWSTRING",
            TokenType::CHAR(_) => "CHAR",
            TokenType::INT(_) => "INT",
            TokenType::FLOAT(_) => "FLOAT",
            TokenType::LEFT_PAREN => "LEFT_PAREN",
            TokenType::RIGHT_PAREN => "RIGHT_PAREN",
            TokenType::LEFT_BRACE => "LEFT_BRACE",
            TokenType::RIGHT_BRACE => "RIGHT_BRACE",
            TokenType::LEFT_BRACKET => "LEFT_BRACKET",
            TokenType::RIGHT_BRACKET => "RIGHT_BRACKET",
            TokenType::COMMA => "COMMA",
            TokenType::SEMICOLON => "SEMICOLON",
            TokenType::COLON => "COLON",
            TokenType::DOT => "DOT",
            TokenType::DOT_DOT => "DOT_DOT",
            TokenType::ELLIPSIS => "ELLIPSIS",
            TokenType::PLUS => "PLUS",
            TokenType::MINUS => "MINUS",
            TokenType::STAR => "STAR",
            TokenType::SLASH => "SLASH",
            TokenType::PERCENT => "PERCENT",
            TokenType::BANG => "BANG",
            TokenType::BANG_EQUAL => "BANG_EQUAL",
            TokenType::EQUAL => "EQUAL",
            TokenType::EQUAL_EQUAL => "EQUAL_EQUAL",
            TokenType::GREATER => "GREATER",
            TokenType::GREATER_EQUAL => "GREATER_EQUAL",
            TokenType::LESS => "LESS",
            TokenType::LESS_EQUAL => "LESS_EQUAL",
            TokenType::AND_AND => "AND_AND",
            TokenType::OR_OR => "OR_OR",
            TokenType::PIPE => "PIPE",
            TokenType::IDENTIFIER => "IDENTIFIER",
            TokenType::LET => "LET",
            TokenType::FN => "FN",
            TokenType::IF => "IF",
            TokenType::ELSE => "ELSE",
            TokenType::ELIF => "ELIF",
            TokenType::RETURN => "RETURN",
            TokenType::TRUE => "TRUE",
            TokenType::FALSE => "FALSE",
            TokenType::NULL => "NULL",
            TokenType::FOR => "FOR",
            TokenType::IN => "IN",
            TokenType::BREAK => "BREAK",
            TokenType::CONTINUE => "CONTINUE",
            TokenType::MODULE => "MODULE",
            TokenType::QUOTE => "QUOTE",
            TokenType::UNQUOTE => "UNQUOTE",
            TokenType::EOF => "EOF",
        };

        info!("Formatted token: {} {} {}", variant, self.lexeme, literal_str);

        write!(f, "{} {} {}", variant, self.lexeme, literal_str)
    }
}
