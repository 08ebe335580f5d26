use std::rc::Rc;

use crate::{
    ast::{
        BinaryOp, CatchClause, Expr, ExprKind, FunctionDecl, Literal, LogicalOp, Program, Stmt,
        StmtKind, UnaryOp,
    },
    diagnostics::{Diagnostic, DiagnosticKind, SourceSpan},
    lexer::{Keyword, Lexer, Token, TokenKind},
};

/// Statements, expressions and operator chains nested this deep are rejected
/// with a `RangeError` instead of recursing further.
pub const MAX_NESTING_DEPTH: usize = 256;

pub fn parse_program(source: &str) -> Result<Program, Diagnostic> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    current: usize,
    /// Enclosing `while` statements within the current function body.
    loop_depth: usize,
    function_depth: usize,
    /// Current syntactic nesting, bounded by [`MAX_NESTING_DEPTH`].
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            loop_depth: 0,
            function_depth: 0,
            depth: 0,
        }
    }

    fn parse_program(&mut self) -> Result<Program, Diagnostic> {
        let mut items = Vec::new();
        while !self.check(TokenKind::Eof) {
            items.push(self.parse_statement()?);
        }
        Ok(Program { items })
    }

    fn parse_block_items(&mut self) -> Result<Vec<Stmt>, Diagnostic> {
        let mut items = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            items.push(self.parse_statement()?);
        }
        self.consume(TokenKind::RBrace)?;
        Ok(items)
    }

    fn parse_block(&mut self) -> Result<(Vec<Stmt>, SourceSpan), Diagnostic> {
        let start = self.consume(TokenKind::LBrace)?.span;
        let items = self.parse_block_items()?;
        Ok((items, start.to(self.previous().span)))
    }

    /// Body of `if`/`while`: either a braced block or a single statement.
    fn parse_body(&mut self) -> Result<(Vec<Stmt>, SourceSpan), Diagnostic> {
        if self.check(TokenKind::LBrace) {
            self.parse_block()
        } else {
            let stmt = self.parse_statement()?;
            let span = stmt.span;
            Ok((vec![stmt], span))
        }
    }

    fn parse_statement(&mut self) -> Result<Stmt, Diagnostic> {
        self.nested(Self::parse_any_statement)
    }

    fn parse_any_statement(&mut self) -> Result<Stmt, Diagnostic> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Keyword(Keyword::Var) | TokenKind::Keyword(Keyword::Let) => {
                self.parse_var_decl(true)
            }
            TokenKind::Keyword(Keyword::Const) => self.parse_var_decl(false),
            TokenKind::Keyword(Keyword::Function) => self.parse_function_declaration(),
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::While) => self.parse_while(),
            TokenKind::Keyword(Keyword::Try) => self.parse_try(),
            TokenKind::Keyword(Keyword::Throw) => self.parse_throw(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return(),
            TokenKind::Keyword(Keyword::Break) => {
                if self.loop_depth == 0 {
                    return Err(self.error(&token, "Illegal break statement"));
                }
                self.advance();
                self.consume_optional_semicolon();
                Ok(Stmt {
                    kind: StmtKind::Break,
                    span: token.span,
                })
            }
            TokenKind::Keyword(Keyword::Continue) => {
                if self.loop_depth == 0 {
                    return Err(self.error(
                        &token,
                        "Illegal continue statement: no surrounding iteration statement",
                    ));
                }
                self.advance();
                self.consume_optional_semicolon();
                Ok(Stmt {
                    kind: StmtKind::Continue,
                    span: token.span,
                })
            }
            TokenKind::Semicolon => {
                self.advance();
                Ok(Stmt {
                    kind: StmtKind::Empty,
                    span: token.span,
                })
            }
            TokenKind::LBrace => {
                let (items, span) = self.parse_block()?;
                Ok(Stmt {
                    kind: StmtKind::Block(items),
                    span,
                })
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_var_decl(&mut self, mutable: bool) -> Result<Stmt, Diagnostic> {
        let start = self.advance().span;
        let name_token = self.consume(TokenKind::Identifier)?;
        let initializer = if self.matches(TokenKind::Assign) {
            Some(self.parse_expression()?)
        } else if !mutable {
            return Err(self.error(
                &name_token,
                "Missing initializer in const declaration",
            ));
        } else {
            None
        };
        self.consume_optional_semicolon();
        let end = initializer
            .as_ref()
            .map(|expr| expr.span)
            .unwrap_or(name_token.span);
        Ok(Stmt {
            kind: StmtKind::VarDecl {
                name: name_token.lexeme,
                mutable,
                initializer,
            },
            span: start.to(end),
        })
    }

    fn parse_function_declaration(&mut self) -> Result<Stmt, Diagnostic> {
        let start = self.consume_keyword(Keyword::Function)?.span;
        let name = self.consume(TokenKind::Identifier)?;
        let decl = self.parse_function_rest(Some(name.lexeme), start)?;
        Ok(Stmt {
            span: decl.span,
            kind: StmtKind::Function(Rc::new(decl)),
        })
    }

    fn parse_function_rest(
        &mut self,
        name: Option<String>,
        start: SourceSpan,
    ) -> Result<FunctionDecl, Diagnostic> {
        self.consume(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                params.push(self.consume(TokenKind::Identifier)?.lexeme);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen)?;
        let enclosing_loops = std::mem::take(&mut self.loop_depth);
        self.function_depth += 1;
        let body = self.parse_block();
        self.function_depth -= 1;
        self.loop_depth = enclosing_loops;
        let (body, span) = body?;
        Ok(FunctionDecl {
            name,
            params,
            body,
            span: start.to(span),
        })
    }

    fn parse_condition(&mut self) -> Result<Expr, Diagnostic> {
        self.consume(TokenKind::LParen)?;
        let condition = self.parse_expression()?;
        self.consume(TokenKind::RParen)?;
        Ok(condition)
    }

    fn parse_if(&mut self) -> Result<Stmt, Diagnostic> {
        let start = self.consume_keyword(Keyword::If)?.span;
        let condition = self.parse_condition()?;
        let (then_branch, mut end) = self.parse_body()?;
        let else_branch = if self.matches_keyword(Keyword::Else) {
            let (branch, span) = self.parse_body()?;
            end = span;
            Some(branch)
        } else {
            None
        };
        Ok(Stmt {
            span: start.to(end),
            kind: StmtKind::If {
                condition,
                then_branch,
                else_branch,
            },
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, Diagnostic> {
        let start = self.consume_keyword(Keyword::While)?.span;
        let condition = self.parse_condition()?;
        self.loop_depth += 1;
        let body = self.parse_body();
        self.loop_depth -= 1;
        let (body, span) = body?;
        Ok(Stmt {
            span: start.to(span),
            kind: StmtKind::While { condition, body },
        })
    }

    fn parse_try(&mut self) -> Result<Stmt, Diagnostic> {
        let start = self.consume_keyword(Keyword::Try)?.span;
        let (block, mut end) = self.parse_block()?;
        let handler = if self.matches_keyword(Keyword::Catch) {
            let binding = if self.matches(TokenKind::LParen) {
                let name = self.consume(TokenKind::Identifier)?.lexeme;
                self.consume(TokenKind::RParen)?;
                Some(name)
            } else {
                None
            };
            let (body, span) = self.parse_block()?;
            end = span;
            Some(CatchClause { binding, body })
        } else {
            None
        };
        let finalizer = if self.matches_keyword(Keyword::Finally) {
            let (body, span) = self.parse_block()?;
            end = span;
            Some(body)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            let token = self.peek().clone();
            return Err(self.error(&token, "Missing catch or finally after try"));
        }
        Ok(Stmt {
            span: start.to(end),
            kind: StmtKind::Try {
                block,
                handler,
                finalizer,
            },
        })
    }

    fn parse_throw(&mut self) -> Result<Stmt, Diagnostic> {
        let start = self.consume_keyword(Keyword::Throw)?.span;
        let value = self.parse_expression()?;
        self.consume_optional_semicolon();
        Ok(Stmt {
            span: start.to(value.span),
            kind: StmtKind::Throw(value),
        })
    }

    fn parse_return(&mut self) -> Result<Stmt, Diagnostic> {
        if self.function_depth == 0 {
            let token = self.peek().clone();
            return Err(self.error(&token, "Illegal return statement"));
        }
        let token = self.consume_keyword(Keyword::Return)?;
        let expr = if self.check(TokenKind::Semicolon)
            || self.check(TokenKind::RBrace)
            || self.check(TokenKind::Eof)
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_optional_semicolon();
        let end = expr.as_ref().map(|e| e.span).unwrap_or(token.span);
        Ok(Stmt {
            span: token.span.to(end),
            kind: StmtKind::Return(expr),
        })
    }

    fn parse_expression_statement(&mut self) -> Result<Stmt, Diagnostic> {
        let expr = self.parse_expression()?;
        self.consume_optional_semicolon();
        Ok(Stmt {
            span: expr.span,
            kind: StmtKind::Expr(expr),
        })
    }

    fn parse_expression(&mut self) -> Result<Expr, Diagnostic> {
        self.nested(Self::parse_assignment)
    }

    fn parse_assignment(&mut self) -> Result<Expr, Diagnostic> {
        let expr = self.parse_or()?;
        if self.matches(TokenKind::Assign) {
            let equals = self.previous().clone();
            let value = self.parse_expression()?;
            match expr.kind {
                ExprKind::Variable(_) | ExprKind::Index { .. } | ExprKind::Field { .. } => {
                    Ok(Expr {
                        span: expr.span.to(value.span),
                        kind: ExprKind::Assign {
                            target: Box::new(expr),
                            value: Box::new(value),
                        },
                    })
                }
                _ => Err(self.error(&equals, "Invalid left-hand side in assignment")),
            }
        } else {
            Ok(expr)
        }
    }

    fn parse_or(&mut self) -> Result<Expr, Diagnostic> {
        self.fold_logical(TokenKind::DoublePipe, LogicalOp::Or, Self::parse_and)
    }

    fn parse_and(&mut self) -> Result<Expr, Diagnostic> {
        self.fold_logical(
            TokenKind::DoubleAmpersand,
            LogicalOp::And,
            Self::parse_equality,
        )
    }

    fn parse_equality(&mut self) -> Result<Expr, Diagnostic> {
        self.fold_binary(
            &[
                (TokenKind::EqualEqual, BinaryOp::Equal),
                (TokenKind::BangEqual, BinaryOp::NotEqual),
                (TokenKind::EqualEqualEqual, BinaryOp::StrictEqual),
                (TokenKind::BangEqualEqual, BinaryOp::StrictNotEqual),
            ],
            Self::parse_comparison,
        )
    }

    fn parse_comparison(&mut self) -> Result<Expr, Diagnostic> {
        self.fold_binary(
            &[
                (TokenKind::LessEqual, BinaryOp::LessEqual),
                (TokenKind::GreaterEqual, BinaryOp::GreaterEqual),
                (TokenKind::Less, BinaryOp::Less),
                (TokenKind::Greater, BinaryOp::Greater),
            ],
            Self::parse_term,
        )
    }

    fn parse_term(&mut self) -> Result<Expr, Diagnostic> {
        self.fold_binary(
            &[
                (TokenKind::Plus, BinaryOp::Add),
                (TokenKind::Minus, BinaryOp::Sub),
            ],
            Self::parse_factor,
        )
    }

    fn parse_factor(&mut self) -> Result<Expr, Diagnostic> {
        self.fold_binary(
            &[
                (TokenKind::Star, BinaryOp::Mul),
                (TokenKind::Slash, BinaryOp::Div),
                (TokenKind::Percent, BinaryOp::Mod),
            ],
            Self::parse_unary,
        )
    }

    /// Left-associative chain of `table` operators. Every fold deepens the
    /// tree by one, so folds count against the nesting limit until the chain
    /// ends.
    fn fold_binary(
        &mut self,
        table: &[(TokenKind, BinaryOp)],
        operand: fn(&mut Self) -> Result<Expr, Diagnostic>,
    ) -> Result<Expr, Diagnostic> {
        let base = self.depth;
        let mut expr = operand(self)?;
        while let Some(op) = self.match_operator(table) {
            self.descend()?;
            let right = operand(self)?;
            expr = binary(op, expr, right);
        }
        self.depth = base;
        Ok(expr)
    }

    fn fold_logical(
        &mut self,
        token: TokenKind,
        op: LogicalOp,
        operand: fn(&mut Self) -> Result<Expr, Diagnostic>,
    ) -> Result<Expr, Diagnostic> {
        let base = self.depth;
        let mut expr = operand(self)?;
        while self.matches(token.clone()) {
            self.descend()?;
            let right = operand(self)?;
            expr = logical(op, expr, right);
        }
        self.depth = base;
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, Diagnostic> {
        let op = if self.matches(TokenKind::Minus) {
            UnaryOp::Negate
        } else if self.matches(TokenKind::Bang) {
            UnaryOp::Not
        } else if self.matches_keyword(Keyword::Typeof) {
            UnaryOp::TypeOf
        } else if self.matches_keyword(Keyword::New) {
            let start = self.previous().span;
            let mut expr = self.parse_call()?;
            expr.span = start.to(expr.span);
            return Ok(expr);
        } else {
            return self.parse_call();
        };
        let operator = self.previous().span;
        let right = self.nested(Self::parse_unary)?;
        Ok(Expr {
            span: operator.to(right.span),
            kind: ExprKind::Unary {
                op,
                expr: Box::new(right),
            },
        })
    }

    fn parse_call(&mut self) -> Result<Expr, Diagnostic> {
        let base = self.depth;
        let mut expr = self.parse_primary()?;
        loop {
            if self.check(TokenKind::LParen)
                || self.check(TokenKind::LBracket)
                || self.check(TokenKind::Dot)
            {
                self.descend()?;
            }
            if self.matches(TokenKind::LParen) {
                let mut args = Vec::new();
                if !self.check(TokenKind::RParen) {
                    loop {
                        args.push(self.parse_expression()?);
                        if !self.matches(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                let paren = self.consume(TokenKind::RParen)?;
                expr = Expr {
                    span: expr.span.to(paren.span),
                    kind: ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                };
            } else if self.matches(TokenKind::LBracket) {
                let index = self.parse_expression()?;
                let bracket = self.consume(TokenKind::RBracket)?;
                expr = Expr {
                    span: expr.span.to(bracket.span),
                    kind: ExprKind::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    },
                };
            } else if self.matches(TokenKind::Dot) {
                let property = self.consume_property_name()?;
                expr = Expr {
                    span: expr.span.to(property.span),
                    kind: ExprKind::Field {
                        target: Box::new(expr),
                        field: property.lexeme,
                    },
                };
            } else {
                break;
            }
        }
        self.depth = base;
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, Diagnostic> {
        let token = self.peek().clone();
        let literal = match &token.kind {
            TokenKind::Keyword(Keyword::True) => Some(Literal::Bool(true)),
            TokenKind::Keyword(Keyword::False) => Some(Literal::Bool(false)),
            TokenKind::Keyword(Keyword::Null) => Some(Literal::Null),
            TokenKind::Keyword(Keyword::Undefined) => Some(Literal::Undefined),
            TokenKind::Number => Some(number_literal(&token)?),
            TokenKind::String => Some(Literal::String(token.lexeme.clone())),
            _ => None,
        };
        if let Some(literal) = literal {
            self.advance();
            return Ok(Expr {
                span: token.span,
                kind: ExprKind::Literal(literal),
            });
        }

        match &token.kind {
            TokenKind::Identifier => {
                self.advance();
                Ok(Expr {
                    span: token.span,
                    kind: ExprKind::Variable(token.lexeme),
                })
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                let rparen = self.consume(TokenKind::RParen)?;
                Ok(Expr {
                    span: token.span.to(rparen.span),
                    kind: ExprKind::Group(Box::new(inner)),
                })
            }
            TokenKind::LBracket => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check(TokenKind::RBracket) {
                    loop {
                        elements.push(self.parse_expression()?);
                        if !self.matches(TokenKind::Comma) || self.check(TokenKind::RBracket) {
                            break;
                        }
                    }
                }
                let rbracket = self.consume(TokenKind::RBracket)?;
                Ok(Expr {
                    span: token.span.to(rbracket.span),
                    kind: ExprKind::ArrayLiteral(elements),
                })
            }
            TokenKind::LBrace => self.parse_object_literal(),
            TokenKind::Keyword(Keyword::Function) => {
                self.advance();
                let name = if self.check(TokenKind::Identifier) {
                    Some(self.advance().lexeme)
                } else {
                    None
                };
                let decl = self.parse_function_rest(name, token.span)?;
                Ok(Expr {
                    span: decl.span,
                    kind: ExprKind::Function(Rc::new(decl)),
                })
            }
            _ => Err(self.unexpected(&token)),
        }
    }

    fn parse_object_literal(&mut self) -> Result<Expr, Diagnostic> {
        let lbrace = self.consume(TokenKind::LBrace)?;
        let mut entries = Vec::new();
        while !self.check(TokenKind::RBrace) {
            let key = self.consume_property_name()?;
            self.consume(TokenKind::Colon)?;
            let value = self.parse_expression()?;
            entries.push((key.lexeme, value));
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        let rbrace = self.consume(TokenKind::RBrace)?;
        Ok(Expr {
            span: lbrace.span.to(rbrace.span),
            kind: ExprKind::ObjectLiteral(entries),
        })
    }

    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, Diagnostic>,
    ) -> Result<T, Diagnostic> {
        self.descend()?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn descend(&mut self) -> Result<(), Diagnostic> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(
                Diagnostic::new(DiagnosticKind::Nesting, "Maximum call stack size exceeded")
                    .with_span(self.peek().span),
            );
        }
        self.depth += 1;
        Ok(())
    }

    fn match_operator(&mut self, table: &[(TokenKind, BinaryOp)]) -> Option<BinaryOp> {
        let (_, op) = table.iter().find(|(kind, _)| self.check(kind.clone()))?;
        self.advance();
        Some(*op)
    }

    fn consume_optional_semicolon(&mut self) {
        let _ = self.matches(TokenKind::Semicolon);
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn matches_keyword(&mut self, keyword: Keyword) -> bool {
        self.matches(TokenKind::Keyword(keyword))
    }

    fn consume(&mut self, kind: TokenKind) -> Result<Token, Diagnostic> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(self.peek()))
        }
    }

    fn consume_keyword(&mut self, keyword: Keyword) -> Result<Token, Diagnostic> {
        self.consume(TokenKind::Keyword(keyword))
    }

    /// Property names may be identifiers, keywords, strings or numbers.
    fn consume_property_name(&mut self) -> Result<Token, Diagnostic> {
        match self.peek().kind {
            TokenKind::Identifier
            | TokenKind::Keyword(_)
            | TokenKind::String
            | TokenKind::Number => Ok(self.advance()),
            _ => Err(self.unexpected(self.peek())),
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous().clone()
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn peek(&self) -> &Token {
        // The lexer always terminates the stream with an Eof token.
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn unexpected(&self, token: &Token) -> Diagnostic {
        let message = match token.kind {
            TokenKind::Eof => "Unexpected end of input".to_string(),
            TokenKind::String => "Unexpected string".to_string(),
            TokenKind::Number => "Unexpected number".to_string(),
            TokenKind::Identifier => format!("Unexpected identifier '{}'", token.lexeme),
            _ => format!("Unexpected token '{}'", token.lexeme),
        };
        self.error(token, &message)
    }

    fn error(&self, token: &Token, message: &str) -> Diagnostic {
        Diagnostic::new(DiagnosticKind::Parser, message).with_span(token.span)
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr {
        span: left.span.to(right.span),
        kind: ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
    }
}

fn logical(op: LogicalOp, left: Expr, right: Expr) -> Expr {
    Expr {
        span: left.span.to(right.span),
        kind: ExprKind::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
    }
}

fn number_literal(token: &Token) -> Result<Literal, Diagnostic> {
    let text = token.lexeme.replace('_', "");
    let literal = if text.contains(['.', 'e', 'E']) {
        text.parse().ok().map(Literal::Float)
    } else {
        text.parse()
            .ok()
            .map(Literal::Int)
            .or_else(|| text.parse().ok().map(Literal::Float))
    };
    literal.ok_or_else(|| {
        Diagnostic::new(DiagnosticKind::Parser, "Invalid or unexpected token").with_span(token.span)
    })
}
