use crate::frontend::lexer::{Span, Spanned};
use crate::frontend::parser_error::{ParserError, SyntaxErrors};
use crate::frontend::token::Token;
use crate::lang::{
    Assignee, BinaryOp, Block, BlockId, Expr, FieldAccess, IdentId, Identifier, IfStatement,
    Program, Stmt, UnaryOp,
};

/// Largest argument list a `Call` instruction can encode.
pub const MAX_CALL_ARGUMENTS: usize = 255;

/// Deepest AST the parser will build. Later passes recurse over the tree, so
/// this also bounds their stack use.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Recursive-descent parser.
///
/// The parser consumes a stream of lexed `Spanned` tokens and produces a `Program`.
///
/// Notes:
/// - Comments and newlines are filtered out in `Parser::new`.
/// - Every `Block` gets a fresh `BlockId` and every identifier occurrence a
///   fresh `IdentId`, both counted from zero per parse.
/// - A statement that fails to parse is recorded and skipped; parsing resumes
///   at the next statement so one run reports as many errors as possible.
pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Span of the most recently consumed token.
    ///
    /// Used to provide stable source locations for errors that occur after
    /// advancing past the last token or at end-of-file.
    last_span: Option<Span>,
    errors: Vec<ParserError>,
    next_block_id: u32,
    next_ident_id: u32,
    /// Depth of the node being built: open blocks, parentheses, unary
    /// operators and operands folded into binary or postfix chains.
    depth: usize,
}

type ParseResult<T> = Result<T, ParserError>;

impl Parser {
    /// Creates a new parser from lexer output.
    ///
    /// The parser filters out `Token::Comment(_)` and `Token::Newline` to simplify
    /// parsing. (This keeps line/col information intact, since spans come from
    /// the lexer output.)
    pub fn new(tokens: Vec<Spanned>) -> Self {
        let tokens: Vec<Spanned> = tokens
            .into_iter()
            .filter(|t| !matches!(t.token, Token::Comment(_) | Token::Newline))
            .collect();
        Parser {
            tokens,
            pos: 0,
            last_span: None,
            errors: Vec::new(),
            next_block_id: 0,
            next_ident_id: 0,
            depth: 0,
        }
    }

    /// Returns the current token without consuming it.
    fn current(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    /// Advances the token stream by one and returns the consumed token.
    fn advance(&mut self) -> Option<&Spanned> {
        let token = self.tokens.get(self.pos);
        if let Some(s) = token {
            self.last_span = Some(s.span);
        }
        self.pos += 1;
        token
    }

    /// Peeks the current token kind without consuming it.
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    /// Span of the current token, or the best fallback near it.
    fn current_span(&self) -> Span {
        self.current()
            .map(|s| s.span)
            .or(self.last_span)
            .unwrap_or(Span { line: 1, col: 1 })
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), None | Some(Token::Eof))
    }

    /// Consumes `token` if it is next.
    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes `token` or fails with `message`.
    fn expect(&mut self, token: &Token, message: &str) -> ParseResult<Span> {
        if self.check(token) {
            let span = self.current_span();
            self.advance();
            Ok(span)
        } else {
            Err(self.error(message))
        }
    }

    /// Constructs a `ParserError` at the most relevant location.
    ///
    /// The found token is appended so messages read "expected ';', found '}'".
    fn error(&self, message: &str) -> ParserError {
        let span = self.current_span();
        let message = match self.peek() {
            Some(Token::Eof) | None => format!("{}, found end of input", message),
            Some(token) => format!("{}, found '{}'", message, token),
        };
        ParserError {
            message,
            line: span.line,
            col: span.col,
        }
    }

    fn new_identifier(&mut self, name: String, span: Span) -> Identifier {
        let id = IdentId(self.next_ident_id);
        self.next_ident_id += 1;
        Identifier { id, name, span }
    }

    fn new_block_id(&mut self) -> BlockId {
        let id = BlockId(self.next_block_id);
        self.next_block_id += 1;
        id
    }

    fn deepen(&mut self, what: &str) -> ParseResult<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error(&format!(
                "{} nested too deeply (limit {})",
                what, MAX_NESTING_DEPTH
            )));
        }
        self.depth += 1;
        Ok(())
    }

    /// Runs `parse` one level deeper, restoring the depth whatever the outcome.
    fn nested<T>(
        &mut self,
        what: &str,
        parse: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let base = self.depth;
        let result = self.deepen(what).and_then(|()| parse(self));
        self.depth = base;
        result
    }

    fn expect_identifier(&mut self, message: &str) -> ParseResult<Identifier> {
        let span = self.current_span();
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.advance();
                Ok(self.new_identifier(name, span))
            }
            _ => Err(self.error(message)),
        }
    }

    /// Parses a complete program.
    ///
    /// Returns every recorded syntax error if any statement failed.
    pub fn parse(&mut self) -> Result<Program, SyntaxErrors> {
        let mut statements = Vec::new();

        while !self.at_eof() {
            if self.check(&Token::RBrace) {
                let error = self.error("unmatched '}'");
                self.errors.push(error);
                self.advance();
                continue;
            }
            if let Some(statement) = self.parse_statement_recovering() {
                statements.push(statement);
            }
        }

        if self.errors.is_empty() {
            Ok(Program { statements })
        } else {
            Err(SyntaxErrors {
                errors: std::mem::take(&mut self.errors),
            })
        }
    }

    /// Parses one statement; on failure records the error and skips ahead.
    fn parse_statement_recovering(&mut self) -> Option<Stmt> {
        let start = self.pos;
        match self.parse_statement() {
            Ok(statement) => Some(statement),
            Err(error) => {
                self.errors.push(error);
                self.synchronize();
                if self.pos == start && !self.at_eof() {
                    self.advance();
                }
                None
            }
        }
    }

    /// Skips tokens up to a plausible statement boundary.
    fn synchronize(&mut self) {
        while let Some(token) = self.peek() {
            match token {
                Token::Eof | Token::RBrace => return,
                Token::Semi => {
                    self.advance();
                    return;
                }
                t if t.starts_statement() => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Parses statements up to (not including) the closing `}`.
    fn parse_statements_until_brace(&mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.check(&Token::RBrace) && !self.at_eof() {
            if let Some(statement) = self.parse_statement_recovering() {
                statements.push(statement);
            }
        }
        statements
    }

    /// Parses a braced statement list: `{ statement* }`.
    fn parse_braced_statements(&mut self, context: &str) -> ParseResult<Vec<Stmt>> {
        self.expect(&Token::LBrace, &format!("expected '{{' {}", context))?;
        self.nested("blocks", |parser| {
            let statements = parser.parse_statements_until_brace();
            parser.expect(&Token::RBrace, "expected '}' to close block")?;
            Ok(statements)
        })
    }

    fn parse_block(&mut self, context: &str) -> ParseResult<Block> {
        let id = self.new_block_id();
        let statements = self.parse_braced_statements(context)?;
        Ok(Block { id, statements })
    }

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        match self.peek() {
            Some(Token::Var) => self.parse_variable_declaration(),
            Some(Token::Fn) => self.parse_function_declaration(),
            Some(Token::If) => self.parse_if(),
            Some(Token::While) => self.parse_while(),
            Some(Token::Return) => self.parse_return(),
            Some(Token::LBrace) => Ok(Stmt::Block(self.parse_block("to open block")?)),
            _ => self.parse_assignment_or_expression(),
        }
    }

    /// `var <name> = <expr> ;`
    fn parse_variable_declaration(&mut self) -> ParseResult<Stmt> {
        self.advance(); // consume 'var'
        let name = self.expect_identifier("expected variable name after 'var'")?;
        self.expect(&Token::Assign, "expected '=' after variable name")?;
        let value = self.parse_expression()?;
        self.expect(&Token::Semi, "expected ';' after variable declaration")?;
        Ok(Stmt::VariableDeclaration { name, value })
    }

    /// `fn <name> ( <params> ) { <body> }`
    fn parse_function_declaration(&mut self) -> ParseResult<Stmt> {
        self.advance(); // consume 'fn'
        let name = self.expect_identifier("expected function name after 'fn'")?;
        self.expect(&Token::LParen, "expected '(' after function name")?;

        let mut params = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                params.push(self.expect_identifier("expected parameter name")?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen, "expected ')' after parameters")?;
        if params.len() > MAX_CALL_ARGUMENTS {
            return Err(ParserError {
                message: format!(
                    "function '{}' has {} parameters, at most {} are allowed",
                    name.name,
                    params.len(),
                    MAX_CALL_ARGUMENTS
                ),
                line: name.span.line,
                col: name.span.col,
            });
        }

        let body = self.parse_braced_statements("before function body")?;
        Ok(Stmt::FunctionDeclaration { name, params, body })
    }

    /// `if (c) {..} (else if (c) {..})* (else {..})?`
    fn parse_if(&mut self) -> ParseResult<Stmt> {
        self.advance(); // consume 'if'
        let mut branches = vec![self.parse_condition_and_block("if")?];
        let mut else_block = None;

        while self.eat(&Token::Else) {
            if self.eat(&Token::If) {
                branches.push(self.parse_condition_and_block("if")?);
            } else {
                else_block = Some(self.parse_block("after 'else'")?);
                break;
            }
        }

        Ok(Stmt::If(IfStatement {
            branches,
            else_block,
        }))
    }

    fn parse_condition_and_block(&mut self, keyword: &str) -> ParseResult<(Expr, Block)> {
        self.expect(&Token::LParen, &format!("expected '(' after '{}'", keyword))?;
        let condition = self.parse_expression()?;
        self.expect(&Token::RParen, "expected ')' after condition")?;
        let body = self.parse_block(&format!("after '{}' condition", keyword))?;
        Ok((condition, body))
    }

    /// `while (c) {..}`
    fn parse_while(&mut self) -> ParseResult<Stmt> {
        self.advance(); // consume 'while'
        let (condition, body) = self.parse_condition_and_block("while")?;
        Ok(Stmt::While { condition, body })
    }

    /// `return <expr>? ;`
    fn parse_return(&mut self) -> ParseResult<Stmt> {
        let span = self.current_span();
        self.advance(); // consume 'return'
        let value = if self.check(&Token::Semi) {
            Expr::Null
        } else {
            self.parse_expression()?
        };
        self.expect(&Token::Semi, "expected ';' after return value")?;
        Ok(Stmt::Return { value, span })
    }

    /// `<expr> = <expr> ;` or `<expr> ;`
    fn parse_assignment_or_expression(&mut self) -> ParseResult<Stmt> {
        let target_span = self.current_span();
        let expr = self.parse_expression()?;

        if self.eat(&Token::Assign) {
            let assignee = match expr {
                Expr::Identifier(identifier) => Assignee::Identifier(identifier),
                Expr::FieldAccess(access) => Assignee::FieldAccess(access),
                _ => {
                    return Err(ParserError {
                        message: "invalid assignment target".to_string(),
                        line: target_span.line,
                        col: target_span.col,
                    });
                }
            };
            let value = self.parse_expression()?;
            self.expect(&Token::Semi, "expected ';' after assignment")?;
            return Ok(Stmt::Assignment { assignee, value });
        }

        self.expect(&Token::Semi, "expected ';' after expression")?;
        Ok(Stmt::Expression(expr))
    }

    pub(crate) fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.nested("expression", Self::parse_or)
    }

    /// Parses one left-associative precedence level.
    fn parse_binary_level(
        &mut self,
        operators: &[(Token, BinaryOp)],
        next: fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let base = self.depth;
        let result = self.parse_binary_chain(operators, next);
        self.depth = base;
        result
    }

    /// Each folded operator makes the tree one level deeper.
    fn parse_binary_chain(
        &mut self,
        operators: &[(Token, BinaryOp)],
        next: fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let mut left = next(self)?;
        loop {
            let span = self.current_span();
            let op = match self.peek() {
                Some(token) => operators
                    .iter()
                    .find(|(candidate, _)| candidate == token)
                    .map(|(_, op)| *op),
                None => None,
            };
            let Some(op) = op else {
                break;
            };
            self.advance();
            self.deepen("expression")?;
            let right = next(self)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        self.parse_binary_level(&[(Token::OrOr, BinaryOp::Or)], Self::parse_and)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        self.parse_binary_level(&[(Token::AndAnd, BinaryOp::And)], Self::parse_equality)
    }

    fn parse_equality(&mut self) -> ParseResult<Expr> {
        self.parse_binary_level(
            &[
                (Token::EqEq, BinaryOp::Equal),
                (Token::NotEq, BinaryOp::NotEqual),
            ],
            Self::parse_comparison,
        )
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        self.parse_binary_level(
            &[
                (Token::Lt, BinaryOp::Less),
                (Token::LtEq, BinaryOp::LessEqual),
                (Token::Gt, BinaryOp::Greater),
                (Token::GtEq, BinaryOp::GreaterEqual),
            ],
            Self::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        self.parse_binary_level(
            &[
                (Token::Plus, BinaryOp::Add),
                (Token::Minus, BinaryOp::Subtract),
            ],
            Self::parse_multiplicative,
        )
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        self.parse_binary_level(
            &[
                (Token::Star, BinaryOp::Multiply),
                (Token::Slash, BinaryOp::Divide),
            ],
            Self::parse_unary,
        )
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let span = self.current_span();
        let op = match self.peek() {
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Negate,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.nested("expression", Self::parse_unary)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
            span,
        })
    }

    /// Calls and field accesses chained onto a primary expression.
    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let base = self.depth;
        let result = self.parse_postfix_chain();
        self.depth = base;
        result
    }

    fn parse_postfix_chain(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.check(&Token::LParen) || self.check(&Token::Dot) {
                self.deepen("expression")?;
            }
            if self.check(&Token::LParen) {
                let span = self.current_span();
                self.advance();
                let arguments = self.parse_arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    arguments,
                    span,
                };
            } else if self.eat(&Token::Dot) {
                let field = self.expect_identifier("expected field name after '.'")?;
                expr = Expr::FieldAccess(FieldAccess {
                    receiver: Box::new(expr),
                    field,
                });
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// Parses `args? )` after an opening parenthesis.
    fn parse_arguments(&mut self) -> ParseResult<Vec<Expr>> {
        let start = self.current_span();
        let mut arguments = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                arguments.push(self.parse_expression()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen, "expected ')' after arguments")?;

        if arguments.len() > MAX_CALL_ARGUMENTS {
            return Err(ParserError {
                message: format!(
                    "call has {} arguments, at most {} are allowed",
                    arguments.len(),
                    MAX_CALL_ARGUMENTS
                ),
                line: start.line,
                col: start.col,
            });
        }
        Ok(arguments)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let span = self.current_span();
        let expr = match self.peek() {
            Some(Token::Integer(n)) => Expr::Number(*n),
            Some(Token::String(s)) => Expr::String(s.clone()),
            Some(Token::Bool(b)) => Expr::Boolean(*b),
            Some(Token::Null) => Expr::Null,
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.advance();
                return Ok(Expr::Identifier(self.new_identifier(name, span)));
            }
            Some(Token::LParen) => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&Token::RParen, "expected ')' after expression")?;
                return Ok(inner);
            }
            _ => return Err(self.error("expected expression")),
        };
        self.advance();
        Ok(expr)
    }
}

/// Tokenizes and parses `source` in one step.
pub fn parse_source(source: &str) -> Result<Program, SyntaxErrors> {
    let tokens = crate::frontend::lexer::Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse()
}
