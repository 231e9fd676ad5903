/*!
Recursive-descent parser for SharpScript.

Time & Space
------------
Every token is consumed once via `advance()`, so a parse is **Θ(n)** in the
number of tokens; error recovery only skips tokens forward.  Call-stack depth
grows with syntactic nesting.

### Logging Policy

| Location                     | Level  | Purpose                                   |
|------------------------------|--------|-------------------------------------------|
| `Parser::new`, `parse`       | `info` | Lifecycle milestones.                     |
| `statement`, `class_member`  | `debug`| High‑level descent into grammar branches. |
| Recovered errors             | `warn` | The statement that was dropped.           |

--------------------------------------------------------------------------------
Grammar (EBNF)
--------------

```text
program        → statement* EOF ;
statement      → varDecl | classDecl | funDecl | returnStmt | ifStmt
               | whileStmt | forStmt | block | exprStmt ;
varDecl        → "var" IDENT ( "=" expression )? ";" ;
classDecl      → "static"? "class" IDENT "{" member* "}" ;
member         → ( "public" | "private" | "static" )? ( funDecl | property ) ;
property       → IDENT ( "=" expression )? ";" ;
funDecl        → "function" IDENT "(" parameters? ")" block ;
returnStmt     → "return" expression? ";"? ;      // ';' optional before '}' / EOF
ifStmt         → "if" "(" expression ")" statement ( "else" statement )? ;
whileStmt      → "while" "(" expression ")" statement ;
forStmt        → "for" "(" ( varDecl | exprStmt | ";" )
                 expression? ";" expression? ")" statement ;
block          → "{" statement* "}" ;
exprStmt       → expression ";" ;
parameters     → IDENT ( "," IDENT )* ;
expression     → assignment ;
assignment     → ( call "." IDENT | IDENT ) ( "=" | "+=" | "-=" ) assignment
               | logic_or ;
logic_or       → logic_and ( "||" logic_and )* ;
logic_and      → equality ( "&&" equality )* ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
term           → factor ( ( "-" | "+" ) factor )* ;
factor         → unary ( ( "/" | "*" | "%" ) unary )* ;
unary          → ( "!" | "-" ) unary | call ;
call           → primary ( "(" arguments? ")" | "." IDENT )* ;
arguments      → expression ( "," expression )* ;
primary        → NUMBER | STRING | "true" | "false" | "null"
               | "new" IDENT | "this" | IDENT | "(" expression ")" ;
```

Error recovery
--------------
A statement that fails to parse is recorded in [`Parser::errors`], the parser
[synchronizes](Parser::synchronize) to the next statement boundary and keeps
going.  This happens at the top level, inside blocks and inside class bodies,
so a single malformed statement never hides the statements after it.
*/

use std::rc::Rc;

use crate::ast::{
    AssignOp, BinaryOp, ClassDecl, Expr, ExprKind, FunctionDecl, Program, PropertyDecl, Stmt,
    StmtKind, UnaryOp,
};
use crate::error::{Result, SharpError};
use crate::token::{Position, Token, TokenType};

use log::{debug, info, warn};

/// Returned by `peek` when the token slice does not end in `EOF`.
static EOF_TOKEN: Token<'static> = Token {
    token_type: TokenType::EOF,
    lexeme: "",
    line: 0,
    column: 0,
};

/// Operand parser used by the left-associative binary levels.
type Operand<'a> = fn(&mut Parser<'a>) -> Result<Expr>;

/// Top‑level parser over an immutable slice of tokens.
pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    current: usize,
    errors: Vec<SharpError>,
}

impl<'a> Parser<'a> {
    /// Construct a new parser.
    pub fn new(tokens: &'a [Token<'a>]) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        Self {
            tokens,
            current: 0,
            errors: Vec::new(),
        }
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program.  Malformed statements are dropped and
    /// reported through [`errors`](Self::errors).
    pub fn parse(&mut self) -> Program {
        info!("Beginning parse phase");

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        info!(
            "Parsed {} statement(s) with {} error(s)",
            statements.len(),
            self.errors.len()
        );

        Program::new(statements)
    }

    /// Diagnostics collected so far.
    pub fn errors(&self) -> &[SharpError] {
        &self.errors
    }

    /// Move the collected diagnostics out of the parser.
    pub fn take_errors(&mut self) -> Vec<SharpError> {
        std::mem::take(&mut self.errors)
    }

    // ──────────────────────── statement rules ─────────────────────

    /// Parse one statement, recovering from a failure by synchronizing.
    fn declaration(&mut self) -> Option<Stmt> {
        match self.statement() {
            Ok(stmt) => Some(stmt),

            Err(e) => {
                warn!("Dropping malformed statement: {}", e);

                self.errors.push(e);
                self.synchronize();

                None
            }
        }
    }

    fn statement(&mut self) -> Result<Stmt> {
        debug!("Entering statement at {:?}", self.peek().token_type);

        if self.matches(TokenType::VAR) {
            self.var_declaration()
        } else if self.matches(TokenType::STATIC) {
            let pos: Position = self.previous().position();

            self.consume(TokenType::CLASS, "Expected 'class' after 'static'")?;
            self.class_declaration(true, pos)
        } else if self.matches(TokenType::CLASS) {
            let pos: Position = self.previous().position();

            self.class_declaration(false, pos)
        } else if self.matches(TokenType::FUNCTION) {
            self.function(false, false)
        } else if self.matches(TokenType::RETURN) {
            self.return_statement()
        } else if self.matches(TokenType::IF) {
            self.if_statement()
        } else if self.matches(TokenType::WHILE) {
            self.while_statement()
        } else if self.matches(TokenType::FOR) {
            self.for_statement()
        } else if self.matches(TokenType::LEFT_BRACE) {
            let pos: Position = self.previous().position();

            Ok(Stmt::new(StmtKind::Block(self.block()?), pos))
        } else {
            self.expression_statement()
        }
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let pos: Position = self.previous().position();
        let name: &Token<'_> = self.consume(TokenType::IDENTIFIER, "Expected variable name")?;

        let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::SEMICOLON,
            "Expected ';' after variable declaration",
        )?;

        Ok(Stmt::new(
            StmtKind::Var {
                name: name.lexeme.to_string(),
                initializer,
            },
            pos,
        ))
    }

    fn class_declaration(&mut self, is_static: bool, pos: Position) -> Result<Stmt> {
        let name: &Token<'_> = self.consume(TokenType::IDENTIFIER, "Expected class name")?;

        self.consume(TokenType::LEFT_BRACE, "Expected '{' after class name")?;

        let mut members: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            match self.class_member() {
                Ok(member) => members.push(member),

                Err(e) => {
                    warn!("Dropping malformed member of class '{}': {}", name.lexeme, e);

                    self.errors.push(e);
                    self.synchronize();
                }
            }
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after class body")?;

        Ok(Stmt::new(
            StmtKind::Class(ClassDecl {
                name: name.lexeme.to_string(),
                members,
                is_static,
            }),
            pos,
        ))
    }

    fn class_member(&mut self) -> Result<Stmt> {
        debug!("Entering class member at {:?}", self.peek().token_type);

        if self.matches(TokenType::FUNCTION) {
            return self.function(false, false);
        }

        if self.matches(TokenType::PUBLIC) || self.matches(TokenType::PRIVATE) {
            let is_public: bool = self.previous().token_type == TokenType::PUBLIC;

            if self.matches(TokenType::FUNCTION) {
                return self.function(is_public, false);
            }

            return self.property(is_public, false);
        }

        if self.matches(TokenType::STATIC) {
            if self.matches(TokenType::FUNCTION) {
                return self.function(false, true);
            }

            return self.property(false, true);
        }

        self.property(false, false)
    }

    fn property(&mut self, is_public: bool, is_static: bool) -> Result<Stmt> {
        let name: &Token<'_> = self.consume(TokenType::IDENTIFIER, "Expected member name")?;

        let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::SEMICOLON,
            "Expected ';' after property declaration",
        )?;

        Ok(Stmt::new(
            StmtKind::Property(PropertyDecl {
                name: name.lexeme.to_string(),
                initializer,
                is_static,
                is_public,
            }),
            name.position(),
        ))
    }

    fn function(&mut self, is_public: bool, is_static: bool) -> Result<Stmt> {
        let name: &Token<'_> = self.consume(TokenType::IDENTIFIER, "Expected function name")?;

        self.consume(TokenType::LEFT_PAREN, "Expected '(' after function name")?;

        let mut params: Vec<String> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                let param: &Token<'_> =
                    self.consume(TokenType::IDENTIFIER, "Expected parameter name")?;

                params.push(param.lexeme.to_string());

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after parameters")?;
        self.consume(TokenType::LEFT_BRACE, "Expected '{' before function body")?;

        let body: Vec<Stmt> = self.block()?;

        Ok(Stmt::new(
            StmtKind::Function(FunctionDecl {
                name: name.lexeme.to_string(),
                params,
                body: Rc::new(body),
                is_static,
                is_public,
            }),
            name.position(),
        ))
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let pos: Position = self.previous().position();

        let value: Option<Expr> = if self.check(TokenType::SEMICOLON)
            || self.check(TokenType::RIGHT_BRACE)
            || self.is_at_end()
        {
            None
        } else {
            Some(self.expression()?)
        };

        if !self.matches(TokenType::SEMICOLON)
            && !self.check(TokenType::RIGHT_BRACE)
            && !self.is_at_end()
        {
            return Err(self.error_at_current("Expected ';' after return value"));
        }

        Ok(Stmt::new(StmtKind::Return(value), pos))
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        let pos: Position = self.previous().position();

        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'if'")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after if condition")?;

        let then_branch: Box<Stmt> = Box::new(self.statement()?);
        let else_branch: Option<Box<Stmt>> = if self.matches(TokenType::ELSE) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::new(
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            },
            pos,
        ))
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        let pos: Position = self.previous().position();

        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'while'")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after while condition")?;

        let body: Box<Stmt> = Box::new(self.statement()?);

        Ok(Stmt::new(StmtKind::While { condition, body }, pos))
    }

    fn for_statement(&mut self) -> Result<Stmt> {
        let pos: Position = self.previous().position();

        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'for'")?;

        let initializer: Option<Box<Stmt>> = if self.matches(TokenType::SEMICOLON) {
            None
        } else if self.matches(TokenType::VAR) {
            Some(Box::new(self.var_declaration()?))
        } else {
            Some(Box::new(self.expression_statement()?))
        };

        let condition: Option<Expr> = if self.check(TokenType::SEMICOLON) {
            None
        } else {
            Some(self.expression()?)
        };

        self.consume(TokenType::SEMICOLON, "Expected ';' after loop condition")?;

        let increment: Option<Expr> = if self.check(TokenType::RIGHT_PAREN) {
            None
        } else {
            Some(self.expression()?)
        };

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after for clauses")?;

        let body: Box<Stmt> = Box::new(self.statement()?);

        Ok(Stmt::new(
            StmtKind::For {
                initializer,
                condition,
                increment,
                body,
            },
            pos,
        ))
    }

    /// Statements up to the closing `}`; the opening brace is already
    /// consumed.  A block left open at end of input is closed implicitly.
    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        if !self.matches(TokenType::RIGHT_BRACE) {
            debug!("Block closed implicitly at end of input");
        }

        Ok(statements)
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr: Expr = self.expression()?;
        let pos: Position = expr.pos;

        self.consume(TokenType::SEMICOLON, "Expected ';' after expression")?;

        Ok(Stmt::new(StmtKind::Expression(expr), pos))
    }

    // ─────────────────────── expression rules ─────────────────────

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr: Expr = self.logical_or()?;

        let op: AssignOp = if self.matches(TokenType::EQUAL) {
            AssignOp::Assign
        } else if self.matches(TokenType::PLUS_EQUAL) {
            AssignOp::AddAssign
        } else if self.matches(TokenType::MINUS_EQUAL) {
            AssignOp::SubAssign
        } else {
            return Ok(expr);
        };

        let equals: &Token<'_> = self.previous();
        let value: Expr = self.assignment()?;

        if !matches!(expr.kind, ExprKind::Identifier(_) | ExprKind::Member { .. }) {
            return Err(SharpError::parse(
                equals.line,
                equals.column,
                "Invalid assignment target",
            ));
        }

        Ok(Expr::new(
            ExprKind::Assign {
                target: Box::new(expr),
                op,
                value: Box::new(value),
            },
            equals.position(),
        ))
    }

    fn logical_or(&mut self) -> Result<Expr> {
        self.left_assoc(Self::logical_and, &[(TokenType::OR_OR, BinaryOp::Or)])
    }

    fn logical_and(&mut self) -> Result<Expr> {
        self.left_assoc(Self::equality, &[(TokenType::AND_AND, BinaryOp::And)])
    }

    fn equality(&mut self) -> Result<Expr> {
        self.left_assoc(
            Self::comparison,
            &[
                (TokenType::BANG_EQUAL, BinaryOp::NotEqual),
                (TokenType::EQUAL_EQUAL, BinaryOp::Equal),
            ],
        )
    }

    fn comparison(&mut self) -> Result<Expr> {
        self.left_assoc(
            Self::term,
            &[
                (TokenType::GREATER, BinaryOp::Greater),
                (TokenType::GREATER_EQUAL, BinaryOp::GreaterEqual),
                (TokenType::LESS, BinaryOp::Less),
                (TokenType::LESS_EQUAL, BinaryOp::LessEqual),
            ],
        )
    }

    fn term(&mut self) -> Result<Expr> {
        self.left_assoc(
            Self::factor,
            &[
                (TokenType::MINUS, BinaryOp::Sub),
                (TokenType::PLUS, BinaryOp::Add),
            ],
        )
    }

    fn factor(&mut self) -> Result<Expr> {
        self.left_assoc(
            Self::unary,
            &[
                (TokenType::SLASH, BinaryOp::Div),
                (TokenType::STAR, BinaryOp::Mul),
                (TokenType::PERCENT, BinaryOp::Mod),
            ],
        )
    }

    /// One precedence level: `operand ( op operand )*`, folded to the left.
    fn left_assoc(
        &mut self,
        operand: Operand<'a>,
        operators: &[(TokenType, BinaryOp)],
    ) -> Result<Expr> {
        let mut expr: Expr = operand(self)?;

        while let Some(op) = self.match_operator(operators) {
            let pos: Position = self.previous().position();
            let right: Expr = operand(self)?;

            expr = Expr::new(
                ExprKind::Binary {
                    left: Box::new(expr),
                    op,
                    right: Box::new(right),
                },
                pos,
            );
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        let op: UnaryOp = if self.matches(TokenType::BANG) {
            UnaryOp::Not
        } else if self.matches(TokenType::MINUS) {
            UnaryOp::Negate
        } else {
            return self.call();
        };

        let pos: Position = self.previous().position();
        let operand: Expr = self.unary()?;

        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            pos,
        ))
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.matches(TokenType::LEFT_PAREN) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenType::DOT) {
                let name: &Token<'_> =
                    self.consume(TokenType::IDENTIFIER, "Expected property name after '.'")?;

                expr = Expr::new(
                    ExprKind::Member {
                        object: Box::new(expr),
                        name: name.lexeme.to_string(),
                    },
                    name.position(),
                );
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut args: Vec<Expr> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                args.push(self.expression()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        let paren: &Token<'_> =
            self.consume(TokenType::RIGHT_PAREN, "Expected ')' after arguments")?;

        Ok(Expr::new(
            ExprKind::Call {
                callee: Box::new(callee),
                args,
            },
            paren.position(),
        ))
    }

    fn primary(&mut self) -> Result<Expr> {
        let token: &Token<'_> = self.peek();
        let pos: Position = token.position();

        let kind: ExprKind = match token.token_type {
            TokenType::FALSE => ExprKind::Bool(false),
            TokenType::TRUE => ExprKind::Bool(true),
            TokenType::NULL => ExprKind::Null,

            TokenType::NUMBER => match token.lexeme.parse::<f64>() {
                Ok(n) => ExprKind::Number(n),
                Err(_) => {
                    return Err(SharpError::parse(
                        token.line,
                        token.column,
                        format!("Invalid number literal '{}'", token.lexeme),
                    ));
                }
            },

            TokenType::STRING => ExprKind::Str(string_contents(token.lexeme).to_string()),

            TokenType::NEW => {
                self.advance();

                let name: &Token<'_> =
                    self.consume(TokenType::IDENTIFIER, "Expected class name after 'new'")?;

                return Ok(Expr::new(ExprKind::Identifier(name.lexeme.to_string()), pos));
            }

            TokenType::THIS => ExprKind::Identifier("this".to_string()),

            TokenType::IDENTIFIER => ExprKind::Identifier(token.lexeme.to_string()),

            TokenType::LEFT_PAREN => {
                self.advance();

                let expr: Expr = self.expression()?;

                self.consume(TokenType::RIGHT_PAREN, "Expected ')' after expression")?;

                return Ok(expr);
            }

            TokenType::EOF => {
                return Err(self.error_at_current("Expected expression, found end of input"));
            }

            _ => {
                return Err(self.error_at_current(&format!(
                    "Expected expression, found '{}'",
                    token.lexeme
                )));
            }
        };

        self.advance();

        Ok(Expr::new(kind, pos))
    }

    // ────────────────────── utility helpers ───────────────────────

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    #[inline]
    fn match_operator(&mut self, operators: &[(TokenType, BinaryOp)]) -> Option<BinaryOp> {
        let (_, op) = operators.iter().find(|(tt, _)| self.check(*tt))?;
        let op: BinaryOp = *op;

        self.advance();

        Some(op)
    }

    #[inline(always)]
    fn consume(&mut self, ttype: TokenType, message: &str) -> Result<&'a Token<'a>> {
        if self.check(ttype) {
            return Ok(self.advance());
        }

        debug!(
            "consume({:?}) failed at {:?} '{}'",
            ttype,
            self.peek().token_type,
            self.peek().lexeme
        );

        Err(self.error_at_current(message))
    }

    fn error_at_current(&self, message: &str) -> SharpError {
        let token: &Token<'_> = self.peek();

        SharpError::parse(token.line, token.column, message)
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == ttype
    }

    #[inline(always)]
    fn advance(&mut self) -> &'a Token<'a> {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::EOF
    }

    #[inline(always)]
    fn peek(&self) -> &'a Token<'a> {
        self.tokens.get(self.current).unwrap_or(&EOF_TOKEN)
    }

    #[inline(always)]
    fn previous(&self) -> &'a Token<'a> {
        self.current
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .unwrap_or(&EOF_TOKEN)
    }

    /// Discards tokens until it thinks it is at a statement boundary: just
    /// past a `;`, or in front of a statement keyword.  Always consumes at
    /// least one token.
    fn synchronize(&mut self) {
        self.advance(); // skip the token that caused the error

        while !self.is_at_end() {
            if self.previous().token_type == TokenType::SEMICOLON {
                return;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FUNCTION
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::RETURN => return,
                _ => {}
            }

            self.advance();
        }
    }
}

/// Strip the surrounding quotes from a string lexeme.  An unterminated
/// string has no closing quote to remove; a trailing `\"` is an escaped
/// quote, not a closing one.
fn string_contents(lexeme: &str) -> &str {
    let inner: &str = lexeme.strip_prefix('"').unwrap_or(lexeme);

    let Some(body) = inner.strip_suffix('"') else {
        return inner;
    };

    let escapes: usize = body.chars().rev().take_while(|c| *c == '\\').count();

    if escapes % 2 == 0 {
        body
    } else {
        inner
    }
}
