//! Parser for BeamScript
//!
//! Converts tokens into an Abstract Syntax Tree by recursive descent. There
//! is no error recovery: the first error aborts parsing.
//!
//! Expression precedence, lowest to highest:
//! assignment, object literal, logical, unary, comparison, additive,
//! multiplicative, power, call/member, primary.

use crate::ast::{
    BinaryOp, Block, DeclKind, Declarator, Expr, LogicalOp, Program, Property, Stmt, UnaryOp,
};
use crate::error::{BeamError, ErrorKind, Result};
use crate::lexer::{parse_number, Lexer};
use crate::token::{Token, TokenKind};

/// The parser state
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    /// Create a new parser from tokens. The sequence must end with `Eof`.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    /// Parse the tokens into a program
    pub fn parse(&mut self) -> Result<Program> {
        let mut body = Vec::new();

        self.skip_semicolons();
        while !self.is_at_end() {
            body.push(self.statement()?);
            self.skip_semicolons();
        }

        tracing::debug!(statements = body.len(), "parsed program");
        Ok(Program::new(body))
    }

    // ==================== Statements ====================

    fn statement(&mut self) -> Result<Stmt> {
        match self.peek().kind {
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::Var | TokenKind::Declare | TokenKind::Const => self.variable_declaration(),
            TokenKind::Def => self.function_declaration(),
            _ => Ok(Stmt::Expression { expr: self.expression()? }),
        }
    }

    fn variable_declaration(&mut self) -> Result<Stmt> {
        let span = self.peek().span;
        let constant = self.match_token(TokenKind::Const);

        let kind = if self.match_token(TokenKind::Var) {
            DeclKind::Var
        } else if self.match_token(TokenKind::Declare) {
            DeclKind::Declare
        } else {
            return Err(self.error_expected("expected 'var' or 'declare' after 'const'"));
        };

        let mut declarations = Vec::new();
        loop {
            let name = self.expect_ident("expected variable name")?;

            let init = if self.match_token(TokenKind::Equals) {
                Some(self.expression()?)
            } else if constant {
                return Err(BeamError::new(
                    ErrorKind::ConstWithoutInitializer(name.lexeme),
                    Some(name.span),
                ));
            } else {
                None
            };

            declarations.push(Declarator { name: name.lexeme, init, span: name.span });

            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }

        Ok(Stmt::VariableDeclaration { declarations, kind, constant, span })
    }

    fn function_declaration(&mut self) -> Result<Stmt> {
        let span = self.advance().span; // consume 'def'

        let name = self.expect_ident("expected function name after 'def'")?.lexeme;

        self.expect(TokenKind::OpenParen, "expected '(' after function name")?;
        let args = self.arguments()?;
        self.expect(TokenKind::CloseParen, "expected ')' after parameters")?;

        let params = args
            .into_iter()
            .map(|arg| match arg {
                Expr::Identifier { name, .. } => Ok(name),
                other => Err(BeamError::new(ErrorKind::InvalidParameter, Some(other.span()))),
            })
            .collect::<Result<Vec<_>>>()?;

        self.expect(TokenKind::OpenBrace, "expected '{' before function body")?;
        let body = self.block()?;
        self.expect(TokenKind::CloseBrace, "expected '}' after function body")?;

        Ok(Stmt::FunctionDeclaration { name, params, body, span })
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        let span = self.advance().span; // consume 'if'

        let condition = self.expression()?;

        self.expect(TokenKind::OpenBrace, "expected '{' after if condition")?;
        let consequent = self.block()?;
        self.expect(TokenKind::CloseBrace, "expected '}' after if body")?;

        let alternate = if self.match_token(TokenKind::Else) {
            if self.check(TokenKind::If) {
                Some(Box::new(self.if_statement()?))
            } else {
                self.expect(TokenKind::OpenBrace, "expected '{' after else")?;
                let block = self.block()?;
                self.expect(TokenKind::CloseBrace, "expected '}' after else body")?;
                Some(Box::new(Stmt::Block(block)))
            }
        } else {
            None
        };

        Ok(Stmt::If { condition, consequent, alternate, span })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        let span = self.advance().span; // consume 'while'

        let condition = self.expression()?;

        self.expect(TokenKind::OpenBrace, "expected '{' after while condition")?;
        let body = self.block()?;
        self.expect(TokenKind::CloseBrace, "expected '}' after while body")?;

        Ok(Stmt::While { condition, body, span })
    }

    /// Statements up to (not including) the closing `}`
    fn block(&mut self) -> Result<Block> {
        let span = self.previous().span;
        let mut body = Vec::new();

        self.skip_semicolons();
        while !self.check(TokenKind::CloseBrace) && !self.is_at_end() {
            body.push(self.statement()?);
            self.skip_semicolons();
        }

        Ok(Block { body, span })
    }

    // ==================== Expressions ====================

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let target = self.object_literal()?;

        if self.match_token(TokenKind::Equals) {
            let value = self.assignment()?;
            let span = target.span().to(value.span());
            return Ok(Expr::Assignment {
                target: Box::new(target),
                value: Box::new(value),
                span,
            });
        }

        Ok(target)
    }

    fn object_literal(&mut self) -> Result<Expr> {
        if !self.check(TokenKind::OpenBrace) {
            return self.logical();
        }
        let span = self.advance().span;

        let mut properties = Vec::new();
        while !self.check(TokenKind::CloseBrace) && !self.is_at_end() {
            let key = self.expect_ident("expected object literal key")?.lexeme;

            let value = if self.match_token(TokenKind::Colon) {
                Some(self.expression()?)
            } else {
                None
            };
            properties.push(Property { key, value });

            if !self.check(TokenKind::CloseBrace) {
                self.expect(TokenKind::Comma, "expected ',' or '}' after property")?;
            }
        }

        let end = self.expect(TokenKind::CloseBrace, "expected '}' to close object literal")?.span;
        Ok(Expr::ObjectLiteral { properties, span: span.to(end) })
    }

    fn logical(&mut self) -> Result<Expr> {
        let mut left = self.unary()?;

        loop {
            let op = if self.match_token(TokenKind::And) {
                LogicalOp::And
            } else if self.match_token(TokenKind::Or) {
                LogicalOp::Or
            } else {
                break;
            };

            let right = self.unary()?;
            let span = left.span().to(right.span());
            left = Expr::Logical {
                left: Box::new(left),
                op,
                right: Box::new(right),
                span,
            };
        }

        Ok(left)
    }

    /// A prefix operator applies to a whole comparison: `-a + b` is `-(a + b)`.
    fn unary(&mut self) -> Result<Expr> {
        let op = match self.peek().kind {
            TokenKind::Not => UnaryOp::Not,
            TokenKind::UnaryPlus => UnaryOp::Plus,
            TokenKind::UnaryMinus => UnaryOp::Neg,
            _ => return self.comparison(),
        };
        let span = self.advance().span;
        let operand = self.comparison()?;

        Ok(Expr::Unary {
            op,
            span: span.to(operand.span()),
            operand: Box::new(operand),
        })
    }

    fn comparison(&mut self) -> Result<Expr> {
        self.binary_level(Self::additive, |token| {
            token.kind.is_comparison()
        })
    }

    /// `+` and `-` are matched by text: the lexer may have tagged them unary.
    fn additive(&mut self) -> Result<Expr> {
        self.binary_level(Self::multiplicative, |token| {
            matches!(
                token.kind,
                TokenKind::BinaryOperator | TokenKind::UnaryPlus | TokenKind::UnaryMinus
            ) && matches!(token.lexeme.as_str(), "+" | "-")
        })
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        self.binary_level(Self::power, |token| {
            token.kind == TokenKind::BinaryOperator && matches!(token.lexeme.as_str(), "*" | "/" | "%")
        })
    }

    fn power(&mut self) -> Result<Expr> {
        self.binary_level(Self::call_member, |token| {
            token.kind == TokenKind::BinaryOperator && token.lexeme == "^"
        })
    }

    /// Left-associative loop shared by the binary precedence levels
    fn binary_level(
        &mut self,
        next: fn(&mut Self) -> Result<Expr>,
        accepts: fn(&Token) -> bool,
    ) -> Result<Expr> {
        let mut left = next(self)?;

        while accepts(self.peek()) {
            let token = self.advance().clone();
            let op = BinaryOp::from_lexeme(&token.lexeme).ok_or_else(|| {
                BeamError::new(ErrorKind::UnexpectedToken(token.lexeme.clone()), Some(token.span))
            })?;

            let right = next(self)?;
            let span = left.span().to(right.span());
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
                span,
            };
        }

        Ok(left)
    }

    fn call_member(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.match_token(TokenKind::OpenParen) {
                let args = self.arguments()?;
                let end = self.expect(TokenKind::CloseParen, "expected ')' after arguments")?.span;
                let span = expr.span().to(end);
                expr = Expr::Call { callee: Box::new(expr), args, span };
            } else if self.match_token(TokenKind::Dot) {
                let name = self.expect_ident("expected identifier after '.'")?;
                let span = expr.span().to(name.span);
                let property = Expr::Identifier { name: name.lexeme, span: name.span };
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: Box::new(property),
                    computed: false,
                    span,
                };
            } else if self.match_token(TokenKind::OpenBracket) {
                let property = self.expression()?;
                let end = self.expect(TokenKind::CloseBracket, "expected ']' after computed member")?.span;
                let span = expr.span().to(end);
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: Box::new(property),
                    computed: true,
                    span,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Comma-separated expressions up to (not including) the closing `)`
    fn arguments(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();

        if !self.check(TokenKind::CloseParen) {
            loop {
                args.push(self.expression()?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }

        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr> {
        let token = self.peek().clone();

        let expr = match token.kind {
            TokenKind::Identifier => Expr::Identifier { name: token.lexeme, span: token.span },
            TokenKind::String => Expr::StringLiteral { value: token.lexeme, span: token.span },
            TokenKind::Null => Expr::NullLiteral { span: token.span },
            TokenKind::Int | TokenKind::Float => {
                let value = parse_number(&token.lexeme).ok_or_else(|| {
                    BeamError::new(ErrorKind::InvalidNumber(token.lexeme.clone()), Some(token.span))
                })?;
                Expr::NumericLiteral {
                    value,
                    is_float: token.kind == TokenKind::Float,
                    span: token.span,
                }
            }
            TokenKind::OpenParen => {
                self.advance();
                let expr = self.expression()?;
                self.expect(TokenKind::CloseParen, "expected ')' after expression")?;
                return Ok(expr);
            }
            _ => {
                return Err(BeamError::new(
                    ErrorKind::UnexpectedToken(describe(&token)),
                    Some(token.span),
                ))
            }
        };

        self.advance();
        Ok(expr)
    }

    // ==================== Helpers ====================

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<Token> {
        if self.check(kind) {
            Ok(self.advance().clone())
        } else {
            Err(self.error_expected(message))
        }
    }

    fn expect_ident(&mut self, message: &str) -> Result<Token> {
        self.expect(TokenKind::Identifier, message)
    }

    fn error_expected(&self, message: &str) -> BeamError {
        BeamError::new(
            ErrorKind::ExpectedToken(message.to_string(), describe(self.peek())),
            Some(self.peek().span),
        )
    }

    fn skip_semicolons(&mut self) {
        while self.match_token(TokenKind::Semicolon) {}
    }
}

fn describe(token: &Token) -> String {
    if token.lexeme.is_empty() {
        token.kind.to_string()
    } else {
        token.lexeme.clone()
    }
}

/// Tokenize and parse source text into a program
pub fn parse(source: &str) -> Result<Program> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_ok(source: &str) -> Program {
        parse(source).unwrap()
    }

    fn parse_err(source: &str) -> ErrorKind {
        parse(source).unwrap_err().kind
    }

    fn single_expr(source: &str) -> Expr {
        let mut program = parse_ok(source);
        assert_eq!(program.body.len(), 1);
        match program.body.remove(0) {
            Stmt::Expression { expr } => expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_variable_declaration() {
        let program = parse_ok("declare x = 42, y");
        match &program.body[0] {
            Stmt::VariableDeclaration { declarations, kind, constant, .. } => {
                assert_eq!(*kind, DeclKind::Declare);
                assert!(!constant);
                assert_eq!(declarations.len(), 2);
                assert_eq!(declarations[0].name, "x");
                assert!(declarations[0].init.is_some());
                assert_eq!(declarations[1].name, "y");
                assert!(declarations[1].init.is_none());
            }
            other => panic!("expected variable declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_const_declaration() {
        let program = parse_ok("const var limit = 10");
        assert!(matches!(
            &program.body[0],
            Stmt::VariableDeclaration { constant: true, kind: DeclKind::Var, .. }
        ));
    }

    #[test]
    fn test_const_rules() {
        assert_eq!(parse_err("const declare y"), ErrorKind::ConstWithoutInitializer("y".into()));
        assert!(matches!(parse_err("const y = 1"), ErrorKind::ExpectedToken(..)));
    }

    #[test]
    fn test_function() {
        let program = parse_ok("def add(a, b) { a + b }");
        match &program.body[0] {
            Stmt::FunctionDeclaration { name, params, body, .. } => {
                assert_eq!(name, "add");
                assert_eq!(params, &["a", "b"]);
                assert_eq!(body.body.len(), 1);
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_function_parameters_must_be_identifiers() {
        assert_eq!(parse_err("def f(a, 1) { a }"), ErrorKind::InvalidParameter);
    }

    #[test]
    fn test_missing_closing_brace() {
        assert!(matches!(parse_err("while x < 3 { x = x + 1"), ErrorKind::ExpectedToken(..)));
    }

    #[test]
    fn test_else_if_chain() {
        let program = parse_ok("if a { 1 } else if b { 2 } else { 3 }");
        match &program.body[0] {
            Stmt::If { alternate: Some(alt), .. } => match alt.as_ref() {
                Stmt::If { alternate: Some(last), .. } => {
                    assert!(matches!(last.as_ref(), Stmt::Block(_)))
                }
                other => panic!("expected nested if, got {:?}", other),
            },
            other => panic!("expected if statement, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        match single_expr("1 + 2 * 3 ^ 2") {
            Expr::Binary { op: BinaryOp::Add, right, .. } => match *right {
                Expr::Binary { op: BinaryOp::Mul, right, .. } => {
                    assert!(matches!(*right, Expr::Binary { op: BinaryOp::Pow, .. }))
                }
                other => panic!("expected multiplication, got {:?}", other),
            },
            other => panic!("expected addition, got {:?}", other),
        }
    }

    #[test]
    fn test_unary_wraps_comparison() {
        match single_expr("x = -a + 1") {
            Expr::Assignment { value, .. } => match *value {
                Expr::Unary { op: UnaryOp::Neg, operand, .. } => {
                    assert!(matches!(*operand, Expr::Binary { op: BinaryOp::Add, .. }))
                }
                other => panic!("expected negation, got {:?}", other),
            },
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_logical_binds_looser_than_not() {
        match single_expr("a and not b") {
            Expr::Logical { op: LogicalOp::And, right, .. } => {
                assert!(matches!(*right, Expr::Unary { op: UnaryOp::Not, .. }))
            }
            other => panic!("expected logical and, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_is_right_associative() {
        match single_expr("a = b = 3") {
            Expr::Assignment { target, value, .. } => {
                assert!(matches!(*target, Expr::Identifier { ref name, .. } if name == "a"));
                assert!(matches!(*value, Expr::Assignment { .. }));
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_any_assignment_target_parses() {
        assert!(matches!(single_expr("o.a = 1"), Expr::Assignment { .. }));
    }

    #[test]
    fn test_object_literal() {
        match single_expr("{ a: 1, b, c: { d } }") {
            Expr::ObjectLiteral { properties, .. } => {
                let keys: Vec<_> = properties.iter().map(|p| p.key.as_str()).collect();
                assert_eq!(keys, vec!["a", "b", "c"]);
                assert!(properties[1].value.is_none());
                assert!(matches!(properties[2].value, Some(Expr::ObjectLiteral { .. })));
            }
            other => panic!("expected object literal, got {:?}", other),
        }
    }

    #[test]
    fn test_object_literal_requires_separator() {
        assert!(matches!(parse_err("{ a: 1 b: 2 }"), ErrorKind::ExpectedToken(..)));
    }

    #[test]
    fn test_member_chain() {
        match single_expr("con.out[key]") {
            Expr::Member { object, computed: true, .. } => {
                assert!(matches!(*object, Expr::Member { computed: false, .. }))
            }
            other => panic!("expected computed member, got {:?}", other),
        }
        assert!(matches!(parse_err("a.1"), ErrorKind::ExpectedToken(..)));
    }

    #[test]
    fn test_chained_calls() {
        match single_expr("f(1)(2, 3)") {
            Expr::Call { callee, args, .. } => {
                assert_eq!(args.len(), 2);
                assert!(matches!(*callee, Expr::Call { .. }));
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_grouping_is_unwrapped() {
        assert!(matches!(single_expr("(((7)))"), Expr::NumericLiteral { is_float: false, .. }));
    }

    #[test]
    fn test_semicolons_separate_statements() {
        let program = parse_ok("declare i = 0; while i < 3 { i = i + 1; }; i");
        assert_eq!(program.body.len(), 3);
    }

    #[test]
    fn test_unexpected_token() {
        assert_eq!(parse_err(")"), ErrorKind::UnexpectedToken(")".into()));
        assert_eq!(parse_err("declare x ="), ErrorKind::UnexpectedToken("end of input".into()));
    }
}
