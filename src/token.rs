use log::debug;
use serde::Serialize;
use std::fmt;

/// The different kinds of tokens recognized by the SharpScript lexer.
///
/// Tokens carry no payload: numbers and strings keep their raw lexeme and
/// are converted by the parser, so a malformed number such as `1.2.3` is
/// reported as a parse error rather than a lexical one.
/// `EOF` marks the end of input.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenType {
    // ── delimiters ───────────────────────────────────────────────────────
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

    /// ';'
    SEMICOLON,

    /// ','
    COMMA,

    /// '.'
    DOT,

    /// ':'
    COLON,

    // ── operators ────────────────────────────────────────────────────────
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

    /// '='
    EQUAL,

    /// '=='
    EQUAL_EQUAL,

    /// '!'
    BANG,

    /// '!='
    BANG_EQUAL,

    /// '<'
    LESS,

    /// '<='
    LESS_EQUAL,

    /// '>'
    GREATER,

    /// '>='
    GREATER_EQUAL,

    /// '&&'
    AND_AND,

    /// '||'
    OR_OR,

    /// '+='
    PLUS_EQUAL,

    /// '-='
    MINUS_EQUAL,

    // ── literals ─────────────────────────────────────────────────────────
    /// A user‑defined identifier, or a pass-through unknown character.
    IDENTIFIER,

    /// A string literal; the lexeme includes the quotes.
    STRING,

    /// A numeric literal; the lexeme is parsed by the parser.
    NUMBER,

    // ── keywords ─────────────────────────────────────────────────────────
    VAR,
    FUNCTION,
    CLASS,
    STATIC,
    PUBLIC,
    PRIVATE,
    RETURN,
    IF,
    ELSE,
    WHILE,
    FOR,
    TRUE,
    FALSE,
    NULL,
    NEW,
    THIS,
    BASE,

    /// End‑of‑file marker
    EOF,
}

impl TokenType {
    /// Upper-case variant name, as printed by `sharp tokenize`.
    pub fn name(self) -> &'static str {
        match self {
            TokenType::LEFT_PAREN => "LEFT_PAREN",
            TokenType::RIGHT_PAREN => "RIGHT_PAREN",
            TokenType::LEFT_BRACE => "LEFT_BRACE",
            TokenType::RIGHT_BRACE => "RIGHT_BRACE",
            TokenType::LEFT_BRACKET => "LEFT_BRACKET",
            TokenType::RIGHT_BRACKET => "RIGHT_BRACKET",
            TokenType::SEMICOLON => "SEMICOLON",
            TokenType::COMMA => "COMMA",
            TokenType::DOT => "DOT",
            TokenType::COLON => "COLON",
            TokenType::PLUS => "PLUS",
            TokenType::MINUS => "MINUS",
            TokenType::STAR => "STAR",
            TokenType::SLASH => "SLASH",
            TokenType::PERCENT => "PERCENT",
            TokenType::EQUAL => "EQUAL",
            TokenType::EQUAL_EQUAL => "EQUAL_EQUAL",
            TokenType::BANG => "BANG",
            TokenType::BANG_EQUAL => "BANG_EQUAL",
            TokenType::LESS => "LESS",
            TokenType::LESS_EQUAL => "LESS_EQUAL",
            TokenType::GREATER => "GREATER",
            TokenType::GREATER_EQUAL => "GREATER_EQUAL",
            TokenType::AND_AND => "AND_AND",
            TokenType::OR_OR => "OR_OR",
            TokenType::PLUS_EQUAL => "PLUS_EQUAL",
            TokenType::MINUS_EQUAL => "MINUS_EQUAL",
            TokenType::IDENTIFIER => "IDENTIFIER",
            TokenType::STRING => "STRING",
            TokenType::NUMBER => "NUMBER",
            TokenType::VAR => "VAR",
            TokenType::FUNCTION => "FUNCTION",
            TokenType::CLASS => "CLASS",
            TokenType::STATIC => "STATIC",
            TokenType::PUBLIC => "PUBLIC",
            TokenType::PRIVATE => "PRIVATE",
            TokenType::RETURN => "RETURN",
            TokenType::IF => "IF",
            TokenType::ELSE => "ELSE",
            TokenType::WHILE => "WHILE",
            TokenType::FOR => "FOR",
            TokenType::TRUE => "TRUE",
            TokenType::FALSE => "FALSE",
            TokenType::NULL => "NULL",
            TokenType::NEW => "NEW",
            TokenType::THIS => "THIS",
            TokenType::BASE => "BASE",
            TokenType::EOF => "EOF",
        }
    }
}

/// 1-based source coordinates of a token or AST node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A scanned token, including its type, the original lexeme,
/// and the position of its first character.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Token<'a> {
    /// The category of this token.
    pub token_type: TokenType,

    /// The exact substring from the source that produced this token.
    pub lexeme: &'a str,

    /// 1‑based line number in the source.
    pub line: usize,

    /// 1‑based column (in characters) of the first character.
    pub column: usize,
}

impl<'a> Token<'a> {
    /// Create a new Token with the given type, lexeme, and position.
    pub fn new(token_type: TokenType, lexeme: &'a str, line: usize, column: usize) -> Self {
        debug!(
            "Creating new token: type={:?}, lexeme={}, line={}, column={}",
            token_type, lexeme, line, column
        );

        Self {
            token_type,
            lexeme,
            line,
            column,
        }
    }

    #[inline]
    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

impl<'a> fmt::Display for Token<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}:{}]",
            self.token_type.name(),
            self.lexeme,
            self.line,
            self.column
        )
    }
}
