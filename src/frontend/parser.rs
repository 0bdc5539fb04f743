use crate::frontend::{
    ast::{
        Assignment, BinaryOperatorKind, Block, Call, ConstantDeclaration, ElseIf, Expression,
        ExpressionKind, FunctionDefinition, Identifier, If, Item, ItemKind, Module, NodeId,
        Statement, StatementKind, UnaryOperatorKind, VariableDeclaration,
    },
    lexer::{Keyword, Lexer, Span, SyntaxError, Token, TokenKind},
    SourceFile,
};

#[derive(Debug)]
pub struct Parser<'source> {
    lexer: Lexer<'source>,
    next_node_id: u32,
}

impl<'source> Parser<'source> {
    pub fn parse_module(source_file: &'source SourceFile) -> Result<Module, SyntaxError> {
        let mut parser = Self {
            lexer: Lexer::new(source_file),
            next_node_id: 0,
        };

        let mut module = Module { items: Vec::new() };

        while parser.lexer.peek()?.is_some() {
            module.items.push(parser.parse_module_item()?);
        }

        Ok(module)
    }

    fn create_node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    fn eof_span(&self) -> Span {
        let end = self.lexer.source().contents.len();
        Span::new(end.saturating_sub(1), end)
    }

    fn error(&self, span: Span, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(message, span)
    }

    fn expect_peek(&mut self, expecting: &str) -> Result<Token, SyntaxError> {
        self.lexer.peek()?.ok_or_else(|| {
            self.error(
                self.eof_span(),
                format!("Expected {expecting} but reached end of file"),
            )
        })
    }

    fn expect_next(&mut self, expecting: &str) -> Result<Token, SyntaxError> {
        self.lexer.next()?.ok_or_else(|| {
            self.error(
                self.eof_span(),
                format!("Expected {expecting} but reached end of file"),
            )
        })
    }

    fn expect_next_to_be(&mut self, kind: TokenKind) -> Result<Token, SyntaxError> {
        let token = self.expect_next(&format!("{kind:?}"))?;

        if token.kind != kind {
            return Err(self.error(
                token.span,
                format!(
                    "Expected {:?} but found {:?} ({})",
                    kind,
                    token.kind,
                    self.lexer.source().value_of_span(token.span)
                ),
            ));
        }

        Ok(token)
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<Token, SyntaxError> {
        self.expect_next_to_be(TokenKind::Keyword(keyword))
    }

    /// Consumes the next token when it matches `kind`.
    fn eat(&mut self, kind: TokenKind) -> Result<bool, SyntaxError> {
        if self.lexer.peek()?.is_some_and(|t| t.kind == kind) {
            self.lexer.next()?;
            return Ok(true);
        }

        Ok(false)
    }

    fn parse_module_item(&mut self) -> Result<Item, SyntaxError> {
        let peeked = self.expect_peek("module item")?;

        let is_public = if peeked.kind == TokenKind::Keyword(Keyword::Pub) {
            self.expect_keyword(Keyword::Pub)?;
            true
        } else {
            false
        };

        let peeked = self.expect_peek("declaration or function definition")?;

        let (span, kind) = match peeked.kind {
            TokenKind::Keyword(Keyword::Var) => {
                let decl = self.parse_variable_declaration()?;
                (decl.span, ItemKind::Variable(Box::new(decl)))
            }
            TokenKind::Keyword(Keyword::Const) => {
                let decl = self.parse_constant_declaration()?;
                (decl.span, ItemKind::Constant(Box::new(decl)))
            }
            TokenKind::Keyword(Keyword::Func) => {
                let func = self.parse_function_definition()?;
                (func.span, ItemKind::Function(Box::new(func)))
            }
            _ => {
                return Err(self.error(
                    peeked.span,
                    format!(
                        "Expected declaration or function definition in module but found: {} ({:?})",
                        self.lexer.source().value_of_span(peeked.span),
                        peeked.kind
                    ),
                ));
            }
        };

        Ok(Item {
            id: self.create_node_id(),
            span,
            is_public,
            kind,
        })
    }

    fn parse_identifier(&mut self) -> Result<Identifier, SyntaxError> {
        let token = self.expect_next_to_be(TokenKind::Identifier)?;

        Ok(Identifier {
            id: self.create_node_id(),
            span: token.span,
            name: self.lexer.source().value_of_span(token.span).to_owned(),
        })
    }

    /// var name [type] [= expr]
    fn parse_variable_declaration(&mut self) -> Result<VariableDeclaration, SyntaxError> {
        let var_keyword = self.expect_keyword(Keyword::Var)?;
        let name = self.parse_identifier()?;

        let ty = if self
            .lexer
            .peek()?
            .is_some_and(|t| t.kind == TokenKind::Identifier)
        {
            Some(self.parse_identifier()?)
        } else {
            None
        };

        let value = if self.eat(TokenKind::Equals)? {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let end = value
            .as_ref()
            .map(|v| v.span.end)
            .or_else(|| ty.as_ref().map(|t| t.span.end))
            .unwrap_or(name.span.end);

        self.eat(TokenKind::Semicolon)?;

        Ok(VariableDeclaration {
            id: self.create_node_id(),
            span: Span::new(var_keyword.span.start, end),
            name,
            ty,
            value,
        })
    }

    /// const name [type] = expr
    fn parse_constant_declaration(&mut self) -> Result<ConstantDeclaration, SyntaxError> {
        let const_keyword = self.expect_keyword(Keyword::Const)?;
        let name = self.parse_identifier()?;

        let ty = if self
            .lexer
            .peek()?
            .is_some_and(|t| t.kind == TokenKind::Identifier)
        {
            Some(self.parse_identifier()?)
        } else {
            None
        };

        self.expect_next_to_be(TokenKind::Equals)?;
        let value = self.parse_expression()?;
        let end = value.span.end;

        self.eat(TokenKind::Semicolon)?;

        Ok(ConstantDeclaration {
            id: self.create_node_id(),
            span: Span::new(const_keyword.span.start, end),
            name,
            ty,
            value,
        })
    }

    /// func name() [type] {}
    fn parse_function_definition(&mut self) -> Result<FunctionDefinition, SyntaxError> {
        let func_keyword = self.expect_keyword(Keyword::Func)?;
        let name = self.parse_identifier()?;

        self.expect_next_to_be(TokenKind::OpenParen)?;
        self.expect_next_to_be(TokenKind::CloseParen)?;

        let return_type = if self
            .lexer
            .peek()?
            .is_some_and(|t| t.kind == TokenKind::Identifier)
        {
            Some(self.parse_identifier()?)
        } else {
            None
        };

        let body = self.parse_block()?;

        Ok(FunctionDefinition {
            id: self.create_node_id(),
            span: Span::new(func_keyword.span.start, body.span.end),
            name,
            return_type,
            body,
        })
    }

    fn parse_block(&mut self) -> Result<Block, SyntaxError> {
        let open_brace = self.expect_next_to_be(TokenKind::OpenBrace)?;

        let mut statements = Vec::new();

        while self
            .expect_peek("statement or closing brace")?
            .kind
            != TokenKind::CloseBrace
        {
            statements.push(self.parse_statement()?);
        }

        let close_brace = self.expect_next_to_be(TokenKind::CloseBrace)?;

        Ok(Block {
            id: self.create_node_id(),
            span: Span::new(open_brace.span.start, close_brace.span.end),
            statements,
        })
    }

    fn parse_statement(&mut self) -> Result<Statement, SyntaxError> {
        let peeked = self.expect_peek("statement")?;

        let (span, kind) = match peeked.kind {
            TokenKind::Keyword(Keyword::Var) => {
                let decl = self.parse_variable_declaration()?;
                (decl.span, StatementKind::Variable(Box::new(decl)))
            }
            TokenKind::Keyword(Keyword::Const) => {
                let decl = self.parse_constant_declaration()?;
                (decl.span, StatementKind::Constant(Box::new(decl)))
            }
            TokenKind::Keyword(Keyword::If) => {
                let if_statement = self.parse_if()?;
                (if_statement.span, StatementKind::If(Box::new(if_statement)))
            }
            TokenKind::Keyword(Keyword::Return) => {
                let return_keyword = self.expect_keyword(Keyword::Return)?;

                let peeked = self.expect_peek("semicolon, closing brace, or expression")?;

                let value = (peeked.kind != TokenKind::Semicolon
                    && peeked.kind != TokenKind::CloseBrace)
                    .then(|| self.parse_expression())
                    .transpose()?;

                let end = value
                    .as_ref()
                    .map(|v| v.span.end)
                    .unwrap_or(return_keyword.span.end);

                self.eat(TokenKind::Semicolon)?;

                (
                    Span::new(return_keyword.span.start, end),
                    StatementKind::Return(value),
                )
            }
            TokenKind::OpenBrace => {
                let block = self.parse_block()?;
                (block.span, StatementKind::Block(Box::new(block)))
            }
            TokenKind::Identifier => return self.parse_assignment_or_call(),
            TokenKind::Semicolon => {
                let semicolon = self.expect_next_to_be(TokenKind::Semicolon)?;

                return Ok(Statement {
                    id: self.create_node_id(),
                    span: semicolon.span,
                    kind: StatementKind::Block(Box::new(Block {
                        id: self.create_node_id(),
                        span: semicolon.span,
                        statements: Vec::new(),
                    })),
                });
            }
            _ => {
                return Err(self.error(
                    peeked.span,
                    format!(
                        "Expected statement but found {:?} ({})",
                        peeked.kind,
                        self.lexer.source().value_of_span(peeked.span)
                    ),
                ));
            }
        };

        Ok(Statement {
            id: self.create_node_id(),
            span,
            kind,
        })
    }

    /// A statement opening with an identifier is either an assignment
    /// (`name op= expr`) or a call (`name(...)`).
    fn parse_assignment_or_call(&mut self) -> Result<Statement, SyntaxError> {
        let target = self.parse_identifier()?;

        let peeked = self.expect_peek("assignment operator or call")?;

        if peeked.kind == TokenKind::OpenParen {
            let call = self.parse_call_arguments(target)?;
            self.eat(TokenKind::Semicolon)?;

            return Ok(Statement {
                id: self.create_node_id(),
                span: call.span,
                kind: StatementKind::Call(Box::new(call)),
            });
        }

        if !peeked.kind.is_assignment_operator() {
            return Err(self.error(
                peeked.span,
                format!(
                    "Expected assignment operator or call but found {:?} ({})",
                    peeked.kind,
                    self.lexer.source().value_of_span(peeked.span)
                ),
            ));
        }

        let operator_token = self.expect_next("assignment operator")?;
        let operator = match operator_token.kind {
            TokenKind::Equals => None,
            TokenKind::PlusEquals => Some(BinaryOperatorKind::Add),
            TokenKind::MinusEquals => Some(BinaryOperatorKind::Subtract),
            TokenKind::MultiplyEquals => Some(BinaryOperatorKind::Multiply),
            TokenKind::DivideEquals => Some(BinaryOperatorKind::Divide),
            TokenKind::ModulusEquals => Some(BinaryOperatorKind::Modulus),
            TokenKind::BitwiseAndEquals => Some(BinaryOperatorKind::BitwiseAnd),
            TokenKind::BitwiseOrEquals => Some(BinaryOperatorKind::BitwiseOr),
            TokenKind::BitwiseXorEquals => Some(BinaryOperatorKind::BitwiseXor),
            TokenKind::ShiftLeftEquals => Some(BinaryOperatorKind::ShiftLeft),
            TokenKind::ShiftRightEquals => Some(BinaryOperatorKind::ShiftRight),
            _ => unreachable!("checked by is_assignment_operator"),
        };

        let value = self.parse_expression()?;
        let span = Span::new(target.span.start, value.span.end);

        self.eat(TokenKind::Semicolon)?;

        Ok(Statement {
            id: self.create_node_id(),
            span,
            kind: StatementKind::Assignment(Box::new(Assignment {
                id: self.create_node_id(),
                span,
                target,
                operator,
                value,
            })),
        })
    }

    /// if cond {} else if cond {} else {}
    fn parse_if(&mut self) -> Result<If, SyntaxError> {
        let if_keyword = self.expect_keyword(Keyword::If)?;
        let condition = self.parse_expression()?;
        let then_block = self.parse_block()?;

        let mut else_ifs = Vec::new();
        let mut else_block = None;
        let mut end = then_block.span.end;

        while self.eat(TokenKind::Keyword(Keyword::Else))? {
            if self
                .expect_peek("if keyword or block")?
                .kind
                == TokenKind::Keyword(Keyword::If)
            {
                let else_if_keyword = self.expect_keyword(Keyword::If)?;
                let condition = self.parse_expression()?;
                let block = self.parse_block()?;
                end = block.span.end;

                else_ifs.push(ElseIf {
                    id: self.create_node_id(),
                    span: Span::new(else_if_keyword.span.start, end),
                    condition,
                    block,
                });
            } else {
                let block = self.parse_block()?;
                end = block.span.end;
                else_block = Some(block);
                break;
            }
        }

        Ok(If {
            id: self.create_node_id(),
            span: Span::new(if_keyword.span.start, end),
            condition,
            then_block,
            else_ifs,
            else_block,
        })
    }

    /// expression  -> logical_or
    /// logical_or  -> logical_and ( "||" logical_and )*
    /// logical_and -> comparison ( "&&" comparison )*
    /// comparison  -> bitwise_or ( ( "!=" | "==" | "<" | "<=" | ">" | ">=" ) bitwise_or )*
    /// bitwise_or  -> bitwise_xor ( "|" bitwise_xor )*
    /// bitwise_xor -> bitwise_and ( "^" bitwise_and )*
    /// bitwise_and -> bit_shift ( "&" bit_shift )*
    /// bit_shift   -> term ( ( "<<" | ">>" ) term )*
    /// term        -> factor ( ( "-" | "+" ) factor )*
    /// factor      -> unary ( ( "/" | "*" | "%" ) unary )*
    /// unary       -> ( "!" | "~" | "-" | "+" ) unary | atom
    /// atom        -> IDENTIFIER ( "(" arguments ")" )? | NUMBER | "(" expression ")"
    pub fn parse_expression(&mut self) -> Result<Expression, SyntaxError> {
        self.parse_logical_or_expression()
    }

    fn binary_node(
        &mut self,
        operator: BinaryOperatorKind,
        lhs: Expression,
        rhs: Expression,
    ) -> Expression {
        Expression {
            id: self.create_node_id(),
            span: Span::new(lhs.span.start, rhs.span.end),
            kind: ExpressionKind::Binary {
                operator,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        }
    }

    fn parse_logical_or_expression(&mut self) -> Result<Expression, SyntaxError> {
        let mut expression = self.parse_logical_and_expression()?;

        while self.eat(TokenKind::LogicalOr)? {
            let rhs = self.parse_logical_and_expression()?;
            expression = self.binary_node(BinaryOperatorKind::LogicalOr, expression, rhs);
        }

        Ok(expression)
    }

    fn parse_logical_and_expression(&mut self) -> Result<Expression, SyntaxError> {
        let mut expression = self.parse_comparison_expression()?;

        while self.eat(TokenKind::LogicalAnd)? {
            let rhs = self.parse_comparison_expression()?;
            expression = self.binary_node(BinaryOperatorKind::LogicalAnd, expression, rhs);
        }

        Ok(expression)
    }

    fn parse_comparison_expression(&mut self) -> Result<Expression, SyntaxError> {
        let mut expression = self.parse_bitwise_or_expression()?;

        while self
            .lexer
            .peek()?
            .is_some_and(|t| t.kind.is_comparison_operator())
        {
            let operator_token = self.expect_next("comparison operator")?;
            let operator = match operator_token.kind {
                TokenKind::DoubleEquals => BinaryOperatorKind::Equals,
                TokenKind::NotEquals => BinaryOperatorKind::NotEquals,
                TokenKind::LessThan => BinaryOperatorKind::LessThan,
                TokenKind::LessThanOrEqualTo => BinaryOperatorKind::LessThanOrEqualTo,
                TokenKind::GreaterThan => BinaryOperatorKind::GreaterThan,
                TokenKind::GreaterThanOrEqualTo => BinaryOperatorKind::GreaterThanOrEqualTo,
                _ => unreachable!("checked by is_comparison_operator"),
            };

            let rhs = self.parse_bitwise_or_expression()?;
            expression = self.binary_node(operator, expression, rhs);
        }

        Ok(expression)
    }

    fn parse_bitwise_or_expression(&mut self) -> Result<Expression, SyntaxError> {
        let mut expression = self.parse_bitwise_xor_expression()?;

        while self.eat(TokenKind::BitwiseOr)? {
            let rhs = self.parse_bitwise_xor_expression()?;
            expression = self.binary_node(BinaryOperatorKind::BitwiseOr, expression, rhs);
        }

        Ok(expression)
    }

    fn parse_bitwise_xor_expression(&mut self) -> Result<Expression, SyntaxError> {
        let mut expression = self.parse_bitwise_and_expression()?;

        while self.eat(TokenKind::BitwiseXor)? {
            let rhs = self.parse_bitwise_and_expression()?;
            expression = self.binary_node(BinaryOperatorKind::BitwiseXor, expression, rhs);
        }

        Ok(expression)
    }

    fn parse_bitwise_and_expression(&mut self) -> Result<Expression, SyntaxError> {
        let mut expression = self.parse_bit_shift_expression()?;

        while self.eat(TokenKind::BitwiseAnd)? {
            let rhs = self.parse_bit_shift_expression()?;
            expression = self.binary_node(BinaryOperatorKind::BitwiseAnd, expression, rhs);
        }

        Ok(expression)
    }

    fn parse_bit_shift_expression(&mut self) -> Result<Expression, SyntaxError> {
        let mut expression = self.parse_term_expression()?;

        while self
            .lexer
            .peek()?
            .is_some_and(|t| t.kind.is_bit_shift_operator())
        {
            let operator_token = self.expect_next("bit shift operator")?;
            let operator = match operator_token.kind {
                TokenKind::ShiftLeft => BinaryOperatorKind::ShiftLeft,
                TokenKind::ShiftRight => BinaryOperatorKind::ShiftRight,
                _ => unreachable!("checked by is_bit_shift_operator"),
            };

            let rhs = self.parse_term_expression()?;
            expression = self.binary_node(operator, expression, rhs);
        }

        Ok(expression)
    }

    fn parse_term_expression(&mut self) -> Result<Expression, SyntaxError> {
        let mut expression = self.parse_factor_expression()?;

        while self
            .lexer
            .peek()?
            .is_some_and(|t| t.kind.is_term_operator())
        {
            let operator_token = self.expect_next("term operator")?;
            let operator = match operator_token.kind {
                TokenKind::Plus => BinaryOperatorKind::Add,
                TokenKind::Minus => BinaryOperatorKind::Subtract,
                _ => unreachable!("checked by is_term_operator"),
            };

            let rhs = self.parse_factor_expression()?;
            expression = self.binary_node(operator, expression, rhs);
        }

        Ok(expression)
    }

    fn parse_factor_expression(&mut self) -> Result<Expression, SyntaxError> {
        let mut expression = self.parse_unary_expression()?;

        while self
            .lexer
            .peek()?
            .is_some_and(|t| t.kind.is_factor_operator())
        {
            let operator_token = self.expect_next("factor operator")?;
            let operator = match operator_token.kind {
                TokenKind::Asterisk => BinaryOperatorKind::Multiply,
                TokenKind::Divide => BinaryOperatorKind::Divide,
                TokenKind::Modulus => BinaryOperatorKind::Modulus,
                _ => unreachable!("checked by is_factor_operator"),
            };

            let rhs = self.parse_unary_expression()?;
            expression = self.binary_node(operator, expression, rhs);
        }

        Ok(expression)
    }

    fn parse_unary_expression(&mut self) -> Result<Expression, SyntaxError> {
        let peeked = self.expect_peek("expression")?;

        if !peeked.kind.is_unary_operator() {
            return self.parse_atom_expression();
        }

        let operator_token = self.expect_next("unary operator")?;
        let operator = match operator_token.kind {
            TokenKind::Plus => UnaryOperatorKind::Plus,
            TokenKind::Minus => UnaryOperatorKind::Negate,
            TokenKind::Tilde => UnaryOperatorKind::BitwiseNot,
            TokenKind::Bang => UnaryOperatorKind::Not,
            _ => unreachable!("checked by is_unary_operator"),
        };

        let operand = self.parse_unary_expression()?;

        Ok(Expression {
            id: self.create_node_id(),
            span: Span::new(operator_token.span.start, operand.span.end),
            kind: ExpressionKind::Unary {
                operator,
                operand: Box::new(operand),
            },
        })
    }

    fn parse_atom_expression(&mut self) -> Result<Expression, SyntaxError> {
        let peeked = self.expect_peek("expression")?;

        match peeked.kind {
            TokenKind::IntegerLiteral => {
                let token = self.expect_next_to_be(TokenKind::IntegerLiteral)?;
                let text = self.lexer.source().value_of_span(token.span);

                let value = text.parse::<u64>().map_err(|_| {
                    self.error(token.span, format!("Integer literal out of range: {text}"))
                })?;

                Ok(Expression {
                    id: self.create_node_id(),
                    span: token.span,
                    kind: ExpressionKind::IntegerLiteral(value),
                })
            }
            TokenKind::Identifier => {
                let identifier = self.parse_identifier()?;

                if self
                    .lexer
                    .peek()?
                    .is_some_and(|t| t.kind == TokenKind::OpenParen)
                {
                    let call = self.parse_call_arguments(identifier)?;

                    return Ok(Expression {
                        id: self.create_node_id(),
                        span: call.span,
                        kind: ExpressionKind::Call(Box::new(call)),
                    });
                }

                Ok(Expression {
                    id: self.create_node_id(),
                    span: identifier.span,
                    kind: ExpressionKind::Identifier(identifier.name),
                })
            }
            TokenKind::OpenParen => {
                self.expect_next_to_be(TokenKind::OpenParen)?;
                let expression = self.parse_expression()?;
                self.expect_next_to_be(TokenKind::CloseParen)?;

                Ok(expression)
            }
            _ => Err(self.error(
                peeked.span,
                format!(
                    "Expected expression but found {:?} ({})",
                    peeked.kind,
                    self.lexer.source().value_of_span(peeked.span)
                ),
            )),
        }
    }

    fn parse_call_arguments(&mut self, callee: Identifier) -> Result<Call, SyntaxError> {
        self.expect_next_to_be(TokenKind::OpenParen)?;

        let mut arguments = Vec::new();

        if self.expect_peek("argument or closing paren")?.kind != TokenKind::CloseParen {
            arguments.push(self.parse_expression()?);

            while self.eat(TokenKind::Comma)? {
                arguments.push(self.parse_expression()?);
            }
        }

        let close_paren = self.expect_next_to_be(TokenKind::CloseParen)?;

        Ok(Call {
            id: self.create_node_id(),
            span: Span::new(callee.span.start, close_paren.span.end),
            callee,
            arguments,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::Parser;
    use crate::frontend::{
        ast::{BinaryOperatorKind, ExpressionKind, ItemKind, StatementKind},
        SourceFile, SourceFileOrigin,
    };

    fn parse(contents: &str) -> crate::frontend::ast::Module {
        let source = SourceFile {
            contents: contents.to_owned(),
            origin: SourceFileOrigin::Memory,
        };
        Parser::parse_module(&source).expect("parsing failed")
    }

    #[test]
    fn module_items() {
        let module = parse("pub var a int32 = 3\nconst b = 4\nfunc main() {}\n");

        assert_eq!(module.items.len(), 3);
        assert!(module.items[0].is_public);
        assert!(matches!(module.items[0].kind, ItemKind::Variable(_)));
        assert!(matches!(module.items[1].kind, ItemKind::Constant(_)));
        assert!(matches!(module.items[2].kind, ItemKind::Function(_)));
    }

    #[test]
    fn term_and_factor_precedence() {
        let module = parse("var a int32 = 1 + 2 * 3");

        let ItemKind::Variable(decl) = &module.items[0].kind else {
            panic!("expected variable declaration");
        };

        let ExpressionKind::Binary { operator, rhs, .. } = &decl.value.as_ref().unwrap().kind
        else {
            panic!("expected binary expression");
        };

        assert_eq!(*operator, BinaryOperatorKind::Add);
        assert!(matches!(
            rhs.kind,
            ExpressionKind::Binary {
                operator: BinaryOperatorKind::Multiply,
                ..
            }
        ));
    }

    #[test]
    fn parenthesised_grouping() {
        let module = parse("var a int32 = (1 + 2) * 3");

        let ItemKind::Variable(decl) = &module.items[0].kind else {
            panic!("expected variable declaration");
        };

        let ExpressionKind::Binary { operator, lhs, .. } = &decl.value.as_ref().unwrap().kind
        else {
            panic!("expected binary expression");
        };

        assert_eq!(*operator, BinaryOperatorKind::Multiply);
        assert!(matches!(
            lhs.kind,
            ExpressionKind::Binary {
                operator: BinaryOperatorKind::Add,
                ..
            }
        ));
    }

    #[test]
    fn if_else_chains() {
        let module = parse(
            "func main() {\n  if a > 1 {\n    a = 1\n  } else if a > 0 {\n    a = 2\n  } else {\n    a = 3\n  }\n}",
        );

        let ItemKind::Function(func) = &module.items[0].kind else {
            panic!("expected function");
        };

        let StatementKind::If(if_statement) = &func.body.statements[0].kind else {
            panic!("expected if statement");
        };

        assert_eq!(if_statement.else_ifs.len(), 1);
        assert!(if_statement.else_block.is_some());
    }

    #[test]
    fn compound_assignment_operator_is_recorded() {
        let module = parse("func main() { a += 2 }");

        let ItemKind::Function(func) = &module.items[0].kind else {
            panic!("expected function");
        };

        let StatementKind::Assignment(assignment) = &func.body.statements[0].kind else {
            panic!("expected assignment");
        };

        assert_eq!(assignment.operator, Some(BinaryOperatorKind::Add));
    }

    #[test]
    fn missing_brace_is_an_error() {
        let source = SourceFile {
            contents: "func main() { a = 1".to_owned(),
            origin: SourceFileOrigin::Memory,
        };

        assert!(Parser::parse_module(&source).is_err());
    }
}
