use crate::frontend::parser_error::ParserError;
use crate::frontend::token::{Token, TokenKind};
use crate::lang::ast::{BinaryOp, Expr, FunctionDecl, Program, Stmt, UnaryOp};

/// Recursive-descent parser for flint.
///
/// The parser consumes a scanned token stream and produces a `Program`:
/// - `globals`: top-level `let` bindings
/// - `functions`: `fn` declarations in source order
/// - `trailing`: bare expressions after the declarations (test input only)
///
/// Expressions follow the precedence ladder `|| < && < (== !=) <
/// (< <= > >=) < (+ -) < (* /) < unary < primary`, all binary levels
/// left-associative. On the first unexpected token the parser returns a
/// line-numbered `ParserError` and the pipeline aborts; there is no
/// recovery.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Line of the most recently consumed token, so errors at end of
    /// input still report a useful location.
    last_line: usize,
}

impl Parser {
    /// Creates a new parser from scanner output.
    ///
    /// Comment tokens are filtered out up front; they can appear anywhere
    /// a statement can and carry no meaning past the scanner.
    pub fn new(tokens: Vec<Token>) -> Self {
        let tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|t| t.kind != TokenKind::Comment)
            .collect();
        Parser {
            tokens,
            pos: 0,
            last_line: 1,
        }
    }

    /// Parses a complete program.
    pub fn parse(&mut self) -> Result<Program, ParserError> {
        let mut program = Program::default();

        while let Some(token) = self.current() {
            match token.kind {
                TokenKind::Let => {
                    let stmt = self.parse_let()?;
                    program.globals.push(stmt);
                }
                TokenKind::Fn => {
                    let decl = self.parse_function()?;
                    program.functions.push(decl);
                }
                _ => {
                    let expr = self.basic_expression()?;
                    program.trailing.push(expr);
                }
            }
        }

        Ok(program)
    }

    // ------------------------------------------------------------------
    // Token cursor
    // ------------------------------------------------------------------

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if let Some(t) = &token {
            self.last_line = t.line;
        }
        self.pos += 1;
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().map(|t| t.kind == kind).unwrap_or(false)
    }

    fn check_next(&self, kind: TokenKind) -> bool {
        self.tokens
            .get(self.pos + 1)
            .map(|t| t.kind == kind)
            .unwrap_or(false)
    }

    /// Consumes the current token if it has the expected kind, otherwise
    /// returns a `ParserError` with `message`.
    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<Token, ParserError> {
        if self.check(kind) {
            // check() guarantees a token is present
            Ok(self.advance().ok_or_else(|| self.error(message))?)
        } else {
            Err(self.error(message))
        }
    }

    /// Constructs a `ParserError` at the current token's line, or at the
    /// last consumed token's line when input has run out.
    fn error(&self, message: &str) -> ParserError {
        let line = self
            .current()
            .map(|t| t.line)
            .unwrap_or(self.last_line);
        ParserError::new(message, line)
    }

    // ------------------------------------------------------------------
    // Declarations and statements
    // ------------------------------------------------------------------

    /// Parses a function declaration:
    ///
    /// ```text
    /// fn name(p1, p2) { stmt* }
    /// ```
    fn parse_function(&mut self) -> Result<FunctionDecl, ParserError> {
        self.advance(); // consume 'fn'

        let name = self.expect(TokenKind::Identifier, "expected function name after 'fn'")?;
        self.expect(TokenKind::LeftParen, "expected '(' after function name")?;

        let mut params = Vec::new();
        if self.check(TokenKind::Identifier) {
            loop {
                let param = self.expect(TokenKind::Identifier, "expected parameter name")?;
                params.push(param);
                if self.check(TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(
            TokenKind::RightParen,
            "parameters must be separated by ',' and closed with ')'",
        )?;

        self.expect(TokenKind::LeftBrace, "function body must start with '{'")?;
        let body = self.parse_block()?;

        Ok(FunctionDecl { name, params, body })
    }

    /// Parses statements until the closing `}` of the current block.
    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParserError> {
        let mut statements = Vec::new();

        loop {
            match self.current() {
                Some(token) if token.kind == TokenKind::RightBrace => {
                    self.advance();
                    return Ok(statements);
                }
                Some(_) => {
                    let stmt = self.parse_stmt()?;
                    statements.push(stmt);
                }
                None => {
                    return Err(self.error("unexpected end of input, expected '}'"));
                }
            }
        }
    }

    /// Parses a single statement inside a function or `if` body.
    fn parse_stmt(&mut self) -> Result<Stmt, ParserError> {
        let token = self
            .current()
            .ok_or_else(|| self.error("unexpected end of input"))?;

        match token.kind {
            TokenKind::Let => self.parse_let(),
            TokenKind::Return => self.parse_return(),
            TokenKind::If => self.parse_if(),
            TokenKind::Identifier => {
                if self.check_next(TokenKind::LeftParen) {
                    let call = self.parse_call()?;
                    self.expect(TokenKind::Semicolon, "call must end with ';'")?;
                    Ok(Stmt::Call(call))
                } else if self.check_next(TokenKind::Equal) {
                    self.parse_assign()
                } else {
                    Err(self.error("expected '(' or '=' after identifier"))
                }
            }
            _ => {
                let lexeme = token.lexeme.clone();
                Err(self.error(&format!("unexpected token '{}'", lexeme)))
            }
        }
    }

    /// Parses a new binding:
    ///
    /// ```text
    /// let name = expr;
    /// let name = f(a, b);
    /// ```
    fn parse_let(&mut self) -> Result<Stmt, ParserError> {
        self.advance(); // consume 'let'

        let name = self.expect(TokenKind::Identifier, "expected variable name after 'let'")?;
        self.expect(TokenKind::Equal, "expected '=' after variable name")?;
        let init = self.parse_initializer()?;
        self.expect(
            TokenKind::Semicolon,
            "variable definition must end with ';'",
        )?;

        Ok(Stmt::Let { name, init })
    }

    /// Parses an assignment to an already-bound name: `name = expr;`.
    fn parse_assign(&mut self) -> Result<Stmt, ParserError> {
        let name = self.expect(TokenKind::Identifier, "expected variable name")?;
        self.expect(TokenKind::Equal, "expected '=' in assignment")?;
        let value = self.parse_initializer()?;
        self.expect(TokenKind::Semicolon, "assignment must end with ';'")?;

        Ok(Stmt::Assign { name, value })
    }

    /// The right-hand side of a binding: a function call when the input
    /// looks like `ident (`, otherwise a basic expression.
    fn parse_initializer(&mut self) -> Result<Expr, ParserError> {
        if self.check(TokenKind::Identifier) && self.check_next(TokenKind::LeftParen) {
            self.parse_call()
        } else {
            self.basic_expression()
        }
    }

    /// Parses a function call: `name(a1, a2)`.
    fn parse_call(&mut self) -> Result<Expr, ParserError> {
        let name = self.expect(TokenKind::Identifier, "expected function name")?;
        self.expect(TokenKind::LeftParen, "expected '(' after function name")?;

        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                args.push(self.basic_expression()?);
                if self.check(TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(
            TokenKind::RightParen,
            "arguments must be separated by ',' and closed with ')'",
        )?;

        Ok(Expr::Call { name, args })
    }

    /// Parses a return statement. The operand is a single identifier or
    /// number token; the distinction is made on the token kind.
    fn parse_return(&mut self) -> Result<Stmt, ParserError> {
        self.advance(); // consume 'return'

        let value = match self.current().map(|t| t.kind) {
            Some(TokenKind::Identifier) | Some(TokenKind::Number) => {
                self.advance().ok_or_else(|| self.error("unexpected end of input"))?
            }
            _ => {
                return Err(self.error("return accepts a variable name or a number"));
            }
        };
        self.expect(TokenKind::Semicolon, "return must end with ';'")?;

        Ok(Stmt::Return { value })
    }

    /// Parses an `if` statement:
    ///
    /// ```text
    /// if (cond) { stmt* }
    /// ```
    ///
    /// The condition is an equality-level expression; there is no `else`.
    fn parse_if(&mut self) -> Result<Stmt, ParserError> {
        self.advance(); // consume 'if'

        self.expect(TokenKind::LeftParen, "expected '(' after 'if'")?;
        let cond = self.equality_expression()?;
        self.expect(TokenKind::RightParen, "expected ')' after condition")?;
        self.expect(TokenKind::LeftBrace, "expected '{' after condition")?;
        let body = self.parse_block()?;

        Ok(Stmt::If { cond, body })
    }

    // ------------------------------------------------------------------
    // Expression ladder (lowest to highest precedence)
    // ------------------------------------------------------------------

    fn basic_expression(&mut self) -> Result<Expr, ParserError> {
        self.or_expression()
    }

    fn or_expression(&mut self) -> Result<Expr, ParserError> {
        self.binary_level(TokenKind::BarBar, None, Self::and_expression)
    }

    fn and_expression(&mut self) -> Result<Expr, ParserError> {
        self.binary_level(TokenKind::AndAnd, None, Self::equality_expression)
    }

    fn equality_expression(&mut self) -> Result<Expr, ParserError> {
        self.binary_level(
            TokenKind::EqualEqual,
            Some(TokenKind::BangEqual),
            Self::comparison_expression,
        )
    }

    fn comparison_expression(&mut self) -> Result<Expr, ParserError> {
        let mut left = self.addition_expression()?;
        while self.check(TokenKind::Less)
            || self.check(TokenKind::LessEqual)
            || self.check(TokenKind::Greater)
            || self.check(TokenKind::GreaterEqual)
        {
            left = self.fold_binary(left, Self::addition_expression)?;
        }
        Ok(left)
    }

    fn addition_expression(&mut self) -> Result<Expr, ParserError> {
        self.binary_level(
            TokenKind::Plus,
            Some(TokenKind::Minus),
            Self::multiplication_expression,
        )
    }

    fn multiplication_expression(&mut self) -> Result<Expr, ParserError> {
        self.binary_level(TokenKind::Star, Some(TokenKind::Slash), Self::unary_expression)
    }

    /// Shared driver for a left-associative binary level with one or two
    /// operator kinds.
    fn binary_level(
        &mut self,
        first: TokenKind,
        second: Option<TokenKind>,
        next: fn(&mut Self) -> Result<Expr, ParserError>,
    ) -> Result<Expr, ParserError> {
        let mut left = next(self)?;
        while self.check(first) || second.map(|k| self.check(k)).unwrap_or(false) {
            left = self.fold_binary(left, next)?;
        }
        Ok(left)
    }

    /// Consumes the operator token at the cursor, parses the right
    /// operand, and folds both into a `Binary` node.
    fn fold_binary(
        &mut self,
        left: Expr,
        next: fn(&mut Self) -> Result<Expr, ParserError>,
    ) -> Result<Expr, ParserError> {
        let token = self
            .advance()
            .ok_or_else(|| self.error("unexpected end of input"))?;
        let op = BinaryOp::from_kind(token.kind)
            .ok_or_else(|| self.error(&format!("'{}' is not a binary operator", token.lexeme)))?;
        let right = next(self)?;
        Ok(Expr::Binary {
            op,
            token,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn unary_expression(&mut self) -> Result<Expr, ParserError> {
        if self.check(TokenKind::Bang) || self.check(TokenKind::Minus) {
            let token = self
                .advance()
                .ok_or_else(|| self.error("unexpected end of input"))?;
            let op = if token.kind == TokenKind::Bang {
                UnaryOp::Not
            } else {
                UnaryOp::Negate
            };
            let operand = self.unary_expression()?;
            return Ok(Expr::Unary {
                op,
                token,
                operand: Box::new(operand),
            });
        }
        self.primary_expression()
    }

    fn primary_expression(&mut self) -> Result<Expr, ParserError> {
        let token = self
            .current()
            .ok_or_else(|| self.error("unexpected end of input, expected an expression"))?;

        match token.kind {
            TokenKind::Number
            | TokenKind::Str
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Nil => {
                let token = self.advance().ok_or_else(|| self.error("unexpected end of input"))?;
                Ok(Expr::Literal(token))
            }
            TokenKind::Identifier => {
                let token = self.advance().ok_or_else(|| self.error("unexpected end of input"))?;
                Ok(Expr::Variable(token))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.basic_expression()?;
                self.expect(TokenKind::RightParen, "expected ')' after expression")?;
                Ok(expr)
            }
            _ => {
                let lexeme = token.lexeme.clone();
                Err(self.error(&format!("unexpected token '{}'", lexeme)))
            }
        }
    }
}
