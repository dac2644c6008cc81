/*!
Recursive-descent parser for Mico.

Grammar (EBNF — condensed)
--------------------------

```text
program        → statement* EOF ;
statement      → letStmt | returnStmt | "break" | "continue"
               | moduleStmt | exprStmt ;
letStmt        → "let" IDENT "=" expression terminator ;
returnStmt     → "return" expression? terminator ;
moduleStmt     → "module" IDENT block terminator ;
exprStmt       → expression terminator ;
block          → "{" statement* "}" ;
terminator     → ";" | lookahead("}") | lookahead(EOF) ;

expression     → assignment ;
assignment     → pipe ( "=" assignment )? ;
pipe           → logic_or ( "|" logic_or )* ;
logic_or       → logic_and ( "||" logic_and )* ;
logic_and      → equality ( "&&" equality )* ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → range ( ( ">" | ">=" | "<" | "<=" ) range )* ;
range          → term ( ".." term )? ;
term           → factor ( ( "-" | "+" ) factor )* ;
factor         → unary ( ( "/" | "*" | "%" ) unary )* ;
unary          → ( "!" | "-" ) unary | postfix ;
postfix        → primary ( "(" arguments? ")" | "[" expression "]"
               | "." IDENT )* ;
arguments      → argument ( "," argument )* ;
argument       → "..." expression | expression ;
primary        → INT | FLOAT | STRING | RAWSTRING | CHAR | "true" | "false"
               | "null" | IDENT | "(" expression ")" | arrayLit | tableLit
               | fnLit | ifExpr | forExpr | "quote" "(" expression ")"
               | "unquote" "(" expression ")" ;
arrayLit       → "[" ( expression ( "," expression )* )? "]" ;
tableLit       → "{" ( expression ":" expression ),* "}" ;
fnLit          → "fn" "(" params? ")" block ;
params         → ( IDENT "," )* ( IDENT | "..." IDENT ) ;
ifExpr         → "if" expression block ( "elif" expression block )*
               ( "else" block )? ;
forExpr        → "for" IDENT ( "," IDENT )? "in" expression block ;
```

Expression parsing uses precedence climbing, one method per level, each
consuming tokens left to right in a single pass (Θ(n) over the stream).

Assignment targets are validated structurally after parsing the left side
(identifier, subscript or dotted access); anything else is a parse error.
*/

use crate::ast::{InfixOp, Node, NodeKind, Param, PrefixOp};
use crate::error::{MicoError, Result};
use crate::token::{Token, TokenType};

use log::{debug, info};

/// Top-level parser over an immutable slice of tokens.
pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    current: usize,
}

impl<'a> Parser<'a> {
    /// Construct a new parser.
    pub fn new(tokens: &'a [Token<'a>]) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        Self { tokens, current: 0 }
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program and return its statement list.
    pub fn parse(&mut self) -> Result<Vec<Node>> {
        info!("Beginning parse phase");

        let mut statements: Vec<Node> = Vec::new();

        while !self.is_at_end() {
            statements.push(self.statement()?);
        }

        Ok(statements)
    }

    /// Parse a single expression (REPL / `eval` subcommand entry point).
    pub fn parse_expression(&mut self) -> Result<Node> {
        let expr = self.expression()?;
        self.terminator()?;
        Ok(expr)
    }

    // ──────────────────────── statement rules ─────────────────────

    fn statement(&mut self) -> Result<Node> {
        debug!("Entering statement at {}", self.peek().pos);

        let result = if self.matches(TokenType::LET) {
            self.let_statement()
        } else if self.matches(TokenType::RETURN) {
            self.return_statement()
        } else if self.matches(TokenType::BREAK) {
            let pos = self.previous().pos;
            self.terminator()
                .map(|()| Node::new(NodeKind::Break, pos))
        } else if self.matches(TokenType::CONTINUE) {
            let pos = self.previous().pos;
            self.terminator()
                .map(|()| Node::new(NodeKind::Continue, pos))
        } else if self.matches(TokenType::MODULE) {
            self.module_statement()
        } else {
            self.expression_statement()
        };

        if result.is_err() {
            self.synchronize();
        }

        result
    }

    fn let_statement(&mut self) -> Result<Node> {
        let pos = self.previous().pos;

        let name = self
            .consume(TokenType::IDENTIFIER, "Expected variable name")?
            .lexeme
            .to_string();

        self.consume(TokenType::EQUAL, "Expected '=' after variable name")?;

        let value = self.expression()?;
        self.terminator()?;

        Ok(Node::new(
            NodeKind::Let {
                name,
                value: Box::new(value),
            },
            pos,
        ))
    }

    fn return_statement(&mut self) -> Result<Node> {
        let pos = self.previous().pos;

        let value = if self.check(TokenType::SEMICOLON)
            || self.check(TokenType::RIGHT_BRACE)
            || self.is_at_end()
        {
            None
        } else {
            Some(Box::new(self.expression()?))
        };

        self.terminator()?;
        Ok(Node::new(NodeKind::Return(value), pos))
    }

    fn module_statement(&mut self) -> Result<Node> {
        let pos = self.previous().pos;

        let name = self
            .consume(TokenType::IDENTIFIER, "Expected module name")?
            .lexeme
            .to_string();

        self.consume(TokenType::LEFT_BRACE, "Expected '{' before module body")?;
        let body = self.block()?;
        self.terminator()?;

        Ok(Node::new(NodeKind::Module { name, body }, pos))
    }

    fn expression_statement(&mut self) -> Result<Node> {
        let expr = self.expression()?;
        self.terminator()?;
        Ok(expr)
    }

    /// Statement terminator: a semicolon, or a lookahead of `}` / EOF.
    fn terminator(&mut self) -> Result<()> {
        if self.matches(TokenType::SEMICOLON) {
            // eat any run of semicolons
            while self.matches(TokenType::SEMICOLON) {}
            return Ok(());
        }

        if self.check(TokenType::RIGHT_BRACE) || self.is_at_end() {
            return Ok(());
        }

        let tok = self.peek();
        Err(MicoError::parse(
            tok.pos.line,
            tok.pos.column,
            "Expected ';' after statement",
        ))
    }

    fn block(&mut self) -> Result<Vec<Node>> {
        let mut statements: Vec<Node> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            statements.push(self.statement()?);
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after block")?;
        Ok(statements)
    }

    // ─────────────────────── expression rules ─────────────────────

    fn expression(&mut self) -> Result<Node> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Node> {
        let expr = self.pipe()?;

        if self.matches(TokenType::EQUAL) {
            let equals = self.previous();
            let value = self.assignment()?;

            // Structural validation of the assignment target.
            match &expr.kind {
                NodeKind::Ident(_)
                | NodeKind::Index { .. }
                | NodeKind::Infix {
                    op: InfixOp::Dot, ..
                } => {
                    let pos = expr.pos;
                    return Ok(Node::new(
                        NodeKind::Assign {
                            target: Box::new(expr),
                            value: Box::new(value),
                        },
                        pos,
                    ));
                }

                _ => {
                    return Err(MicoError::parse(
                        equals.pos.line,
                        equals.pos.column,
                        "Invalid assignment target",
                    ));
                }
            }
        }

        Ok(expr)
    }

    fn pipe(&mut self) -> Result<Node> {
        let mut expr = self.logical_or()?;

        while self.matches(TokenType::PIPE) {
            let pos = self.previous().pos;
            let right = self.logical_or()?;

            expr = Node::new(
                NodeKind::Infix {
                    op: InfixOp::Pipe,
                    left: Box::new(expr),
                    right: Box::new(right),
                },
                pos,
            );
        }

        Ok(expr)
    }

    fn logical_or(&mut self) -> Result<Node> {
        let mut expr = self.logical_and()?;

        while self.matches(TokenType::OR_OR) {
            let pos = self.previous().pos;
            let right = self.logical_and()?;

            expr = Node::new(
                NodeKind::Infix {
                    op: InfixOp::Or,
                    left: Box::new(expr),
                    right: Box::new(right),
                },
                pos,
            );
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Node> {
        let mut expr = self.equality()?;

        while self.matches(TokenType::AND_AND) {
            let pos = self.previous().pos;
            let right = self.equality()?;

            expr = Node::new(
                NodeKind::Infix {
                    op: InfixOp::And,
                    left: Box::new(expr),
                    right: Box::new(right),
                },
                pos,
            );
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Node> {
        let mut expr = self.comparison()?;

        loop {
            let op = if self.matches(TokenType::EQUAL_EQUAL) {
                InfixOp::Eq
            } else if self.matches(TokenType::BANG_EQUAL) {
                InfixOp::Ne
            } else {
                break;
            };

            let pos = self.previous().pos;
            let right = self.comparison()?;
            expr = Node::new(
                NodeKind::Infix {
                    op,
                    left: Box::new(expr),
                    right: Box::new(right),
                },
                pos,
            );
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Node> {
        let mut expr = self.range()?;

        loop {
            let op = if self.matches(TokenType::LESS) {
                InfixOp::Lt
            } else if self.matches(TokenType::LESS_EQUAL) {
                InfixOp::Le
            } else if self.matches(TokenType::GREATER) {
                InfixOp::Gt
            } else if self.matches(TokenType::GREATER_EQUAL) {
                InfixOp::Ge
            } else {
                break;
            };

            let pos = self.previous().pos;
            let right = self.range()?;
            expr = Node::new(
                NodeKind::Infix {
                    op,
                    left: Box::new(expr),
                    right: Box::new(right),
                },
                pos,
            );
        }

        Ok(expr)
    }

    fn range(&mut self) -> Result<Node> {
        let expr = self.term()?;

        if self.matches(TokenType::DOT_DOT) {
            let pos = self.previous().pos;
            let right = self.term()?;

            return Ok(Node::new(
                NodeKind::Infix {
                    op: InfixOp::Range,
                    left: Box::new(expr),
                    right: Box::new(right),
                },
                pos,
            ));
        }

        Ok(expr)
    }

    fn term(&mut self) -> Result<Node> {
        let mut expr = self.factor()?;

        loop {
            let op = if self.matches(TokenType::PLUS) {
                InfixOp::Add
            } else if self.matches(TokenType::MINUS) {
                InfixOp::Sub
            } else {
                break;
            };

            let pos = self.previous().pos;
            let right = self.factor()?;
            expr = Node::new(
                NodeKind::Infix {
                    op,
                    left: Box::new(expr),
                    right: Box::new(right),
                },
                pos,
            );
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Node> {
        let mut expr = self.unary()?;

        loop {
            let op = if self.matches(TokenType::STAR) {
                InfixOp::Mul
            } else if self.matches(TokenType::SLASH) {
                InfixOp::Div
            } else if self.matches(TokenType::PERCENT) {
                InfixOp::Mod
            } else {
                break;
            };

            let pos = self.previous().pos;
            let right = self.unary()?;
            expr = Node::new(
                NodeKind::Infix {
                    op,
                    left: Box::new(expr),
                    right: Box::new(right),
                },
                pos,
            );
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Node> {
        let op = if self.matches(TokenType::BANG) {
            Some(PrefixOp::Not)
        } else if self.matches(TokenType::MINUS) {
            Some(PrefixOp::Neg)
        } else {
            None
        };

        if let Some(op) = op {
            let pos = self.previous().pos;
            let right = self.unary()?;
            return Ok(Node::new(
                NodeKind::Prefix {
                    op,
                    right: Box::new(right),
                },
                pos,
            ));
        }

        self.postfix()
    }

    fn postfix(&mut self) -> Result<Node> {
        let mut expr = self.primary()?;

        loop {
            if self.matches(TokenType::LEFT_PAREN) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenType::LEFT_BRACKET) {
                let pos = self.previous().pos;
                let index = self.expression()?;
                self.consume(TokenType::RIGHT_BRACKET, "Expected ']' after index")?;

                expr = Node::new(
                    NodeKind::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    },
                    pos,
                );
            } else if self.matches(TokenType::DOT) {
                let pos = self.previous().pos;
                let name = self.consume(TokenType::IDENTIFIER, "Expected name after '.'")?;
                let right = Node::new(NodeKind::Ident(name.lexeme.to_string()), name.pos);

                expr = Node::new(
                    NodeKind::Infix {
                        op: InfixOp::Dot,
                        left: Box::new(expr),
                        right: Box::new(right),
                    },
                    pos,
                );
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Node) -> Result<Node> {
        let pos = self.previous().pos;
        let mut args: Vec<Node> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if args.len() >= 255 {
                    let tok = self.peek();
                    return Err(MicoError::parse(
                        tok.pos.line,
                        tok.pos.column,
                        "Cannot have more than 255 arguments",
                    ));
                }

                if self.matches(TokenType::ELLIPSIS) {
                    let spread_pos = self.previous().pos;
                    let inner = self.expression()?;
                    args.push(Node::new(NodeKind::Spread(Box::new(inner)), spread_pos));
                } else {
                    args.push(self.expression()?);
                }

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after arguments")?;

        Ok(Node::new(
            NodeKind::Call {
                callee: Box::new(callee),
                args,
            },
            pos,
        ))
    }

    fn primary(&mut self) -> Result<Node> {
        let tok = self.peek();
        let pos = tok.pos;

        match &tok.token_type {
            TokenType::TRUE => {
                self.advance();
                Ok(Node::new(NodeKind::Bool(true), pos))
            }
            TokenType::FALSE => {
                self.advance();
                Ok(Node::new(NodeKind::Bool(false), pos))
            }
            TokenType::NULL => {
                self.advance();
                Ok(Node::new(NodeKind::Null, pos))
            }
            TokenType::INT(n) => {
                let n = *n;
                self.advance();
                Ok(Node::new(NodeKind::Int(n), pos))
            }
            TokenType::FLOAT(n) => {
                let n = *n;
                self.advance();
                Ok(Node::new(NodeKind::Float(n), pos))
            }
            TokenType::STRING(s) => {
                let s = s.clone();
                self.advance();
                Ok(Node::new(NodeKind::Str(s), pos))
            }
            TokenType::RAWSTRING(b) => {
                let b = b.clone();
                self.advance();
                Ok(Node::new(NodeKind::Bytes(b), pos))
            }
            TokenType::CHAR(c) => {
                let c = *c;
                self.advance();
                Ok(Node::new(NodeKind::Char(c), pos))
            }
            TokenType::IDENTIFIER => {
                self.advance();
                Ok(Node::new(
                    NodeKind::Ident(self.previous().lexeme.to_string()),
                    pos,
                ))
            }
            TokenType::LEFT_PAREN => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenType::RIGHT_PAREN, "Expected ')' after expression")?;
                Ok(expr)
            }
            TokenType::LEFT_BRACKET => {
                self.advance();
                self.array_literal(pos)
            }
            TokenType::LEFT_BRACE => {
                self.advance();
                self.table_literal(pos)
            }
            TokenType::FN => {
                self.advance();
                self.function_literal(pos)
            }
            TokenType::IF => {
                self.advance();
                self.if_expression(pos)
            }
            TokenType::FOR => {
                self.advance();
                self.for_expression(pos)
            }
            TokenType::QUOTE => {
                self.advance();
                self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'quote'")?;
                let inner = self.expression()?;
                self.consume(TokenType::RIGHT_PAREN, "Expected ')' after quoted expression")?;
                Ok(Node::new(NodeKind::Quote(Box::new(inner)), pos))
            }
            TokenType::UNQUOTE => {
                self.advance();
                self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'unquote'")?;
                let inner = self.expression()?;
                self.consume(
                    TokenType::RIGHT_PAREN,
                    "Expected ')' after unquoted expression",
                )?;
                Ok(Node::new(NodeKind::Unquote(Box::new(inner)), pos))
            }

            _ => Err(MicoError::parse(
                pos.line,
                pos.column,
                "Expected expression",
            )),
        }
    }

    fn array_literal(&mut self, pos: crate::token::Position) -> Result<Node> {
        let mut items: Vec<Node> = Vec::new();

        if !self.check(TokenType::RIGHT_BRACKET) {
            loop {
                items.push(self.expression()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }

                // allow trailing comma
                if self.check(TokenType::RIGHT_BRACKET) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_BRACKET, "Expected ']' after array literal")?;
        Ok(Node::new(NodeKind::Array(items), pos))
    }

    fn table_literal(&mut self, pos: crate::token::Position) -> Result<Node> {
        let mut pairs: Vec<(Node, Node)> = Vec::new();

        if !self.check(TokenType::RIGHT_BRACE) {
            loop {
                let key = self.expression()?;
                self.consume(TokenType::COLON, "Expected ':' after table key")?;
                let value = self.expression()?;
                pairs.push((key, value));

                if !self.matches(TokenType::COMMA) {
                    break;
                }

                if self.check(TokenType::RIGHT_BRACE) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after table literal")?;
        Ok(Node::new(NodeKind::Table(pairs), pos))
    }

    fn function_literal(&mut self, pos: crate::token::Position) -> Result<Node> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'fn'")?;

        let mut params: Vec<Param> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= 255 {
                    let tok = self.peek();
                    return Err(MicoError::parse(
                        tok.pos.line,
                        tok.pos.column,
                        "Cannot have more than 255 parameters",
                    ));
                }

                let ellipsis = self.matches(TokenType::ELLIPSIS);
                let name = self
                    .consume(TokenType::IDENTIFIER, "Expected parameter name")?
                    .lexeme
                    .to_string();

                params.push(Param { name, ellipsis });

                if ellipsis && self.check(TokenType::COMMA) {
                    let tok = self.peek();
                    return Err(MicoError::parse(
                        tok.pos.line,
                        tok.pos.column,
                        "Ellipsis parameter must be last",
                    ));
                }

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after parameters")?;
        self.consume(TokenType::LEFT_BRACE, "Expected '{' before function body")?;
        let body = self.block()?;

        Ok(Node::new(NodeKind::Function { params, body }, pos))
    }

    fn if_expression(&mut self, pos: crate::token::Position) -> Result<Node> {
        let mut branches: Vec<(Node, Vec<Node>)> = Vec::new();

        let cond = self.expression()?;
        self.consume(TokenType::LEFT_BRACE, "Expected '{' after condition")?;
        branches.push((cond, self.block()?));

        while self.matches(TokenType::ELIF) {
            let cond = self.expression()?;
            self.consume(TokenType::LEFT_BRACE, "Expected '{' after condition")?;
            branches.push((cond, self.block()?));
        }

        let alternative = if self.matches(TokenType::ELSE) {
            self.consume(TokenType::LEFT_BRACE, "Expected '{' after 'else'")?;
            Some(self.block()?)
        } else {
            None
        };

        Ok(Node::new(
            NodeKind::If {
                branches,
                alternative,
            },
            pos,
        ))
    }

    fn for_expression(&mut self, pos: crate::token::Position) -> Result<Node> {
        let mut names: Vec<String> = Vec::new();

        names.push(
            self.consume(TokenType::IDENTIFIER, "Expected loop variable name")?
                .lexeme
                .to_string(),
        );

        if self.matches(TokenType::COMMA) {
            names.push(
                self.consume(TokenType::IDENTIFIER, "Expected loop variable name")?
                    .lexeme
                    .to_string(),
            );
        }

        self.consume(TokenType::IN, "Expected 'in' after loop variables")?;

        let source = self.expression()?;
        self.consume(TokenType::LEFT_BRACE, "Expected '{' before loop body")?;
        let body = self.block()?;

        Ok(Node::new(
            NodeKind::For {
                names,
                source: Box::new(source),
                body,
            },
            pos,
        ))
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

    #[inline(always)]
    fn consume(&mut self, ttype: TokenType, message: &str) -> Result<&'a Token<'a>> {
        if self.check(ttype) {
            return Ok(self.advance());
        }

        let tok = self.peek();
        Err(MicoError::parse(tok.pos.line, tok.pos.column, message))
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return ttype == TokenType::EOF;
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
        matches!(self.peek().token_type, TokenType::EOF)
    }

    #[inline(always)]
    fn peek(&self) -> &'a Token<'a> {
        &self.tokens[self.current]
    }

    #[inline(always)]
    fn previous(&self) -> &'a Token<'a> {
        &self.tokens[self.current - 1]
    }

    /// Discards tokens until it thinks it is at a statement boundary.
    fn synchronize(&mut self) {
        self.advance(); // skip the token that caused the error

        while !self.is_at_end() {
            if matches!(self.previous().token_type, TokenType::SEMICOLON) {
                return;
            }

            match self.peek().token_type {
                TokenType::LET
                | TokenType::FN
                | TokenType::FOR
                | TokenType::IF
                | TokenType::MODULE
                | TokenType::RETURN
                | TokenType::BREAK
                | TokenType::CONTINUE => return,
                _ => {}
            }

            self.advance();
        }
    }
}
