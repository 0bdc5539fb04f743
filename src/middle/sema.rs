//! Semantic analysis: walks the syntax tree, builds the scope tree, resolves
//! names to arena handles, folds constant expressions, and produces the typed
//! IR the backend consumes. Errors are accumulated and reported in a batch so
//! a single pass surfaces as many problems as possible.

use hashbrown::HashMap;
use thiserror::Error;

use crate::{
    frontend::{
        ast::{self, BinaryOperatorKind, UnaryOperatorKind},
        lexer::Span,
    },
    middle::ir::{
        self, BinaryOp, BlockStep, ConstantValue, Declare, Expression, Function, FunctionId,
        IfStep, Kind, Module, Scope, ScopeId, Step, Symbol, Ty, UnaryOp,
    },
};

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SemanticError {
    pub message: String,
    pub span: Span,
}

pub fn analyze(ast: &ast::Module) -> Result<Module, Vec<SemanticError>> {
    let mut analyzer = Analyzer::new();

    analyzer.process_module(ast);

    if analyzer.errors.is_empty() {
        Ok(analyzer.module)
    } else {
        Err(analyzer.errors)
    }
}

struct Analyzer {
    module: Module,
    errors: Vec<SemanticError>,
}

impl Analyzer {
    fn new() -> Self {
        let mut scopes = crate::index::IndexVec::new();
        let root_scope = scopes.push(Scope {
            parent: None,
            symbols: HashMap::new(),
        });

        Self {
            module: Module {
                scopes,
                variables: Default::default(),
                functions: Default::default(),
                root_scope,
                declarations: Vec::new(),
                exports: Vec::new(),
            },
            errors: Vec::new(),
        }
    }

    fn error(&mut self, span: Span, message: impl Into<String>) {
        self.errors.push(SemanticError {
            message: message.into(),
            span,
        });
    }

    fn create_scope(&mut self, parent: ScopeId) -> ScopeId {
        self.module.scopes.push(Scope {
            parent: Some(parent),
            symbols: HashMap::new(),
        })
    }

    fn lookup(&self, mut scope: ScopeId, name: &str) -> Option<Symbol> {
        loop {
            let current = &self.module.scopes[scope];

            if let Some(symbol) = current.symbols.get(name) {
                return Some(*symbol);
            }

            scope = current.parent?;
        }
    }

    fn lookup_type(&mut self, identifier: &ast::Identifier) -> Option<Ty> {
        match Kind::from_name(&identifier.name) {
            Some(kind) => Some(Ty::Named(kind)),
            None => {
                self.error(
                    identifier.span,
                    format!("expected '{}' to be a type", identifier.name),
                );
                None
            }
        }
    }

    fn process_module(&mut self, ast: &ast::Module) {
        // Function names become visible before any body is analyzed, so a
        // declaration initializer can never call forward but bodies can.
        let mut bodies = Vec::new();

        for item in &ast.items {
            match &item.kind {
                ast::ItemKind::Function(func) => {
                    if self.is_declared_here(self.module.root_scope, &func.name.name) {
                        self.error(
                            func.name.span,
                            format!("cannot redeclare identifier '{}'", func.name.name),
                        );
                        continue;
                    }

                    let returns = func.return_type.as_ref().and_then(|t| self.lookup_type(t));
                    let scope = self.create_scope(self.module.root_scope);

                    let id = self.module.functions.push(Function {
                        name: func.name.name.clone(),
                        scope,
                        steps: Vec::new(),
                        returns,
                    });

                    self.module.scopes[self.module.root_scope]
                        .symbols
                        .insert(func.name.name.clone(), Symbol::Function(id));

                    if item.is_public {
                        self.module.exports.push(func.name.name.clone());
                    }

                    bodies.push((id, func.as_ref()));
                }
                ast::ItemKind::Variable(decl) => {
                    if let Some(declare) =
                        self.declare_variable(self.module.root_scope, decl)
                    {
                        if item.is_public {
                            self.module.exports.push(declare.name.clone());
                        }

                        self.module.declarations.push(declare);
                    }
                }
                ast::ItemKind::Constant(decl) => {
                    self.declare_constant(self.module.root_scope, decl);

                    if item.is_public {
                        self.module.exports.push(decl.name.name.clone());
                    }
                }
            }
        }

        for (id, func) in bodies {
            let scope = self.module.functions[id].scope;
            let returns = self.module.functions[id].returns;
            let steps = self.handle_block_statements(scope, &func.body, returns);
            self.module.functions[id].steps = steps;
        }
    }

    fn is_declared_here(&self, scope: ScopeId, name: &str) -> bool {
        self.module.scopes[scope].symbols.contains_key(name)
    }

    fn declare_variable(
        &mut self,
        scope: ScopeId,
        decl: &ast::VariableDeclaration,
    ) -> Option<Declare> {
        if self.is_declared_here(scope, &decl.name.name) {
            self.error(
                decl.name.span,
                format!("cannot redeclare identifier '{}'", decl.name.name),
            );
            return None;
        }

        let mut ty = decl.ty.as_ref().and_then(|t| self.lookup_type(t));

        let value = match &decl.value {
            Some(value_node) => {
                let value = self.pre_evaluate(scope, value_node)?;
                let value_ty = self.module.expression_type(&value);

                match ty {
                    None => {
                        ty = Some(match value_ty {
                            Ty::UntypedInt { .. } => {
                                if value_ty.assignable_to(Some(Ty::Named(Kind::Int32))) {
                                    Ty::Named(Kind::Int32)
                                } else if value_ty.assignable_to(Some(Ty::Named(Kind::Int64))) {
                                    Ty::Named(Kind::Int64)
                                } else {
                                    Ty::Named(Kind::Uint64)
                                }
                            }
                            named => named,
                        });
                    }
                    Some(target) => {
                        if !value_ty.assignable_to(Some(target)) {
                            self.error(
                                value_node.span,
                                format!(
                                    "type {} is unassignable to {}",
                                    value_ty.name(),
                                    target.name()
                                ),
                            );
                        }
                    }
                }

                Some(value)
            }
            None => None,
        };

        let Some(ty) = ty else {
            self.error(
                decl.span,
                format!(
                    "unable to infer a type for '{}'; declare one or initialize it",
                    decl.name.name
                ),
            );
            return None;
        };

        let id = self.module.variables.push(ir::Variable {
            name: decl.name.name.clone(),
            ty,
            initial_value: value,
        });

        self.module.scopes[scope]
            .symbols
            .insert(decl.name.name.clone(), Symbol::Variable(id));

        Some(Declare {
            name: decl.name.name.clone(),
            variable: id,
        })
    }

    fn declare_constant(&mut self, scope: ScopeId, decl: &ast::ConstantDeclaration) {
        if self.is_declared_here(scope, &decl.name.name) {
            self.error(
                decl.name.span,
                format!("cannot redeclare identifier '{}'", decl.name.name),
            );
            return;
        }

        let ty = decl.ty.as_ref().and_then(|t| self.lookup_type(t));

        let Some(value) = self.pre_evaluate(scope, &decl.value) else {
            return;
        };

        let Expression::Constant(mut constant) = value else {
            self.error(decl.value.span, "value is not a constant");
            return;
        };

        if let Some(target) = ty {
            if !constant.ty.assignable_to(Some(target)) {
                self.error(
                    decl.value.span,
                    format!(
                        "not assignable to type '{}': '{}'",
                        target.name(),
                        constant.ty.name()
                    ),
                );
                return;
            }

            constant.ty = target;
        }

        self.module.scopes[scope]
            .symbols
            .insert(decl.name.name.clone(), Symbol::Constant(constant));
    }

    fn handle_block_statements(
        &mut self,
        scope: ScopeId,
        block: &ast::Block,
        returns: Option<Ty>,
    ) -> Vec<Step> {
        let mut steps = Vec::new();

        for statement in &block.statements {
            match &statement.kind {
                ast::StatementKind::Variable(decl) => {
                    if let Some(declare) = self.declare_variable(scope, decl) {
                        steps.push(Step::Declare(declare));
                    }
                }
                ast::StatementKind::Constant(decl) => {
                    self.declare_constant(scope, decl);
                }
                ast::StatementKind::Assignment(assignment) => {
                    if let Some(step) = self.handle_assignment(scope, assignment) {
                        steps.push(step);
                    }
                }
                ast::StatementKind::If(if_statement) => {
                    if let Some(step) = self.handle_if(scope, if_statement, returns) {
                        steps.push(step);
                    }
                }
                ast::StatementKind::Block(inner) => {
                    let child = self.create_scope(scope);
                    let inner_steps = self.handle_block_statements(child, inner, returns);

                    steps.push(Step::Block(BlockStep {
                        scope: child,
                        steps: inner_steps,
                    }));
                }
                ast::StatementKind::Call(call) => {
                    if let Some((function, arguments)) = self.handle_call(scope, call) {
                        steps.push(Step::Call {
                            function,
                            arguments,
                        });
                    }
                }
                ast::StatementKind::Return(value) => {
                    steps.push(self.handle_return(scope, statement.span, value, returns));
                    // Anything after a return in the same block is unreachable
                    return steps;
                }
            }
        }

        steps
    }

    fn handle_assignment(
        &mut self,
        scope: ScopeId,
        assignment: &ast::Assignment,
    ) -> Option<Step> {
        let target = match self.lookup(scope, &assignment.target.name) {
            Some(Symbol::Variable(id)) => id,
            Some(_) => {
                self.error(
                    assignment.target.span,
                    format!(
                        "unable to assign value to target '{}'",
                        assignment.target.name
                    ),
                );
                return None;
            }
            None => {
                self.error(
                    assignment.target.span,
                    format!("unable to resolve name: {}", assignment.target.name),
                );
                return None;
            }
        };

        let mut value = self.pre_evaluate(scope, &assignment.value)?;

        // Compound assignment desugars to `target = target op value`
        if let Some(operator) = assignment.operator {
            let op = self.lower_binary_operator(operator, assignment.span)?;

            value = Expression::Binary {
                op,
                left: Box::new(Expression::VariableRef(target)),
                right: Box::new(value),
            };
        }

        let value_ty = self.module.expression_type(&value);
        let target_ty = self.module.variables[target].ty;

        if !value_ty.assignable_to(Some(target_ty)) {
            self.error(
                assignment.value.span,
                format!(
                    "unable to assign value of type {} to value of type {}",
                    value_ty.name(),
                    target_ty.name()
                ),
            );
            return None;
        }

        Some(Step::Assign { target, value })
    }

    fn handle_return(
        &mut self,
        scope: ScopeId,
        span: Span,
        value: &Option<ast::Expression>,
        returns: Option<Ty>,
    ) -> Step {
        let value = match value {
            Some(node) => {
                if returns.is_none() {
                    self.error(span, "unexpected return value; function returns nothing");
                }

                let value = self.pre_evaluate(scope, node);

                if let Some(value) = &value {
                    let ty = self.module.expression_type(value);

                    if !ty.assignable_to(returns) {
                        self.error(
                            node.span,
                            format!(
                                "invalid return: expected value of type '{}'; received value of type '{}'",
                                returns.map(|t| t.name()).unwrap_or_default(),
                                ty.name()
                            ),
                        );
                    }
                }

                value
            }
            None => None,
        };

        Step::Return(value)
    }

    fn handle_if(
        &mut self,
        scope: ScopeId,
        if_statement: &ast::If,
        returns: Option<Ty>,
    ) -> Option<Step> {
        let condition = self.pre_evaluate(scope, &if_statement.condition)?;

        // A constant condition collapses to the taken branch; the untaken
        // branches are unreachable and never lowered.
        if let Expression::Constant(constant) = &condition {
            if constant.value != 0 {
                return Some(self.child_block(scope, &if_statement.then_block, returns));
            }

            if let Some((first, rest)) = if_statement.else_ifs.split_first() {
                let nested = ast::If {
                    id: first.id,
                    span: first.span,
                    condition: clone_expression(&first.condition),
                    then_block: clone_block(&first.block),
                    else_ifs: rest.iter().map(clone_else_if).collect(),
                    else_block: if_statement.else_block.as_ref().map(clone_block),
                };

                return self.handle_if(scope, &nested, returns);
            }

            if let Some(else_block) = &if_statement.else_block {
                return Some(self.child_block(scope, else_block, returns));
            }

            return None;
        }

        let then_block = self.child_block_step(scope, &if_statement.then_block, returns);

        let mut else_ifs = Vec::new();
        for else_if in &if_statement.else_ifs {
            let Some(condition) = self.pre_evaluate(scope, &else_if.condition) else {
                continue;
            };

            else_ifs.push(IfStep {
                condition,
                then_block: self.child_block_step(scope, &else_if.block, returns),
                else_ifs: Vec::new(),
                else_block: None,
            });
        }

        let else_block = if_statement
            .else_block
            .as_ref()
            .map(|block| self.child_block_step(scope, block, returns));

        Some(Step::If(IfStep {
            condition,
            then_block,
            else_ifs,
            else_block,
        }))
    }

    fn child_block(&mut self, scope: ScopeId, block: &ast::Block, returns: Option<Ty>) -> Step {
        Step::Block(self.child_block_step(scope, block, returns))
    }

    fn child_block_step(
        &mut self,
        scope: ScopeId,
        block: &ast::Block,
        returns: Option<Ty>,
    ) -> BlockStep {
        let child = self.create_scope(scope);
        let steps = self.handle_block_statements(child, block, returns);

        BlockStep {
            scope: child,
            steps,
        }
    }

    fn handle_call(
        &mut self,
        scope: ScopeId,
        call: &ast::Call,
    ) -> Option<(FunctionId, Vec<Expression>)> {
        let function = match self.lookup(scope, &call.callee.name) {
            Some(Symbol::Function(id)) => id,
            Some(_) => {
                self.error(call.callee.span, "not a function");
                return None;
            }
            None => {
                self.error(
                    call.callee.span,
                    format!("unable to resolve name: {}", call.callee.name),
                );
                return None;
            }
        };

        if !call.arguments.is_empty() {
            self.error(
                call.span,
                "incorrect number of arguments for function; expected 0",
            );
            return None;
        }

        Some((function, Vec::new()))
    }

    fn lower_binary_operator(
        &mut self,
        operator: BinaryOperatorKind,
        span: Span,
    ) -> Option<BinaryOp> {
        Some(match operator {
            BinaryOperatorKind::Add => BinaryOp::Add,
            BinaryOperatorKind::Subtract => BinaryOp::Subtract,
            BinaryOperatorKind::Multiply => BinaryOp::Multiply,
            BinaryOperatorKind::Divide => BinaryOp::Divide,
            BinaryOperatorKind::Modulus => BinaryOp::Modulus,
            BinaryOperatorKind::BitwiseAnd => BinaryOp::BitwiseAnd,
            BinaryOperatorKind::BitwiseOr => BinaryOp::BitwiseOr,
            BinaryOperatorKind::BitwiseXor => BinaryOp::BitwiseXor,
            BinaryOperatorKind::ShiftLeft => BinaryOp::ShiftLeft,
            BinaryOperatorKind::ShiftRight => BinaryOp::ShiftRight,
            BinaryOperatorKind::Equals => BinaryOp::Equals,
            BinaryOperatorKind::NotEquals => BinaryOp::NotEquals,
            BinaryOperatorKind::LessThan => BinaryOp::LessThan,
            BinaryOperatorKind::LessThanOrEqualTo => BinaryOp::LessThanOrEqualTo,
            BinaryOperatorKind::GreaterThan => BinaryOp::GreaterThan,
            BinaryOperatorKind::GreaterThanOrEqualTo => BinaryOp::GreaterThanOrEqualTo,
            BinaryOperatorKind::LogicalAnd | BinaryOperatorKind::LogicalOr => {
                self.error(
                    span,
                    format!("operator {operator} requires constant operands"),
                );
                return None;
            }
        })
    }

    fn pre_evaluate(&mut self, scope: ScopeId, node: &ast::Expression) -> Option<Expression> {
        match &node.kind {
            ast::ExpressionKind::IntegerLiteral(value) => {
                if *value > i64::MAX as u64 {
                    self.error(node.span, format!("integer literal out of range: {value}"));
                    return None;
                }

                let value = *value as i64;

                Some(Expression::Constant(ConstantValue {
                    value,
                    ty: Ty::untyped(value),
                }))
            }
            ast::ExpressionKind::Identifier(name) => match self.lookup(scope, name) {
                Some(Symbol::Variable(id)) => Some(Expression::VariableRef(id)),
                Some(Symbol::Constant(constant)) => Some(Expression::Constant(constant)),
                Some(Symbol::Function(_)) => {
                    self.error(
                        node.span,
                        format!("expected '{name}' to be a type or variable"),
                    );
                    None
                }
                None => {
                    self.error(node.span, format!("unable to resolve name: {name}"));
                    None
                }
            },
            ast::ExpressionKind::Unary { operator, operand } => {
                let operand = self.pre_evaluate(scope, operand)?;

                if let Expression::Constant(constant) = operand {
                    return Some(resolve_unary_operation(constant, *operator));
                }

                let op = match operator {
                    UnaryOperatorKind::Plus => return Some(operand),
                    UnaryOperatorKind::Negate => UnaryOp::Negate,
                    UnaryOperatorKind::BitwiseNot => UnaryOp::BitwiseNot,
                    UnaryOperatorKind::Not => {
                        self.error(node.span, "operator ! requires a constant operand");
                        return None;
                    }
                };

                Some(Expression::Unary {
                    op,
                    operand: Box::new(operand),
                })
            }
            ast::ExpressionKind::Binary { operator, lhs, rhs } => {
                self.evaluate_binary_expression(scope, node.span, *operator, lhs, rhs)
            }
            ast::ExpressionKind::Call(call) => {
                let (function, arguments) = self.handle_call(scope, call)?;

                Some(Expression::Call {
                    function,
                    arguments,
                })
            }
        }
    }

    fn evaluate_binary_expression(
        &mut self,
        scope: ScopeId,
        span: Span,
        operator: BinaryOperatorKind,
        lhs: &ast::Expression,
        rhs: &ast::Expression,
    ) -> Option<Expression> {
        let left = self.pre_evaluate(scope, lhs)?;
        let right = self.pre_evaluate(scope, rhs)?;

        let left_ty = self.module.expression_type(&left);
        let right_ty = self.module.expression_type(&right);

        if !right_ty.assignable_to(Some(left_ty)) {
            self.error(
                span,
                format!(
                    "type mismatch: unable to resolve {} {} {}",
                    left_ty.name(),
                    operator,
                    right_ty.name()
                ),
            );
            return None;
        }

        if let (Expression::Constant(l), Expression::Constant(r)) = (&left, &right) {
            // Short-circuit selection mirrors runtime truthiness
            if operator == BinaryOperatorKind::LogicalAnd {
                return Some(if l.value == 0 { left } else { right });
            }

            if operator == BinaryOperatorKind::LogicalOr {
                return Some(if l.value == 0 { right } else { left });
            }

            return self.resolve_binary_operation(*l, *r, operator, span);
        }

        let op = self.lower_binary_operator(operator, span)?;

        Some(Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn resolve_binary_operation(
        &mut self,
        left: ConstantValue,
        right: ConstantValue,
        operator: BinaryOperatorKind,
        span: Span,
    ) -> Option<Expression> {
        let (l, r) = (left.value, right.value);

        let comparison = |outcome: bool| ConstantValue {
            value: outcome as i64,
            ty: Ty::untyped(outcome as i64),
        };

        let value = match operator {
            BinaryOperatorKind::Add => l.wrapping_add(r),
            BinaryOperatorKind::Subtract => l.wrapping_sub(r),
            BinaryOperatorKind::Multiply => l.wrapping_mul(r),
            BinaryOperatorKind::Divide => {
                if r == 0 {
                    self.error(span, "division by zero");
                    return None;
                }
                l.wrapping_div(r)
            }
            BinaryOperatorKind::Modulus => {
                if r == 0 {
                    self.error(span, "division by zero");
                    return None;
                }
                l.wrapping_rem(r)
            }
            BinaryOperatorKind::BitwiseAnd => l & r,
            BinaryOperatorKind::BitwiseOr => l | r,
            BinaryOperatorKind::BitwiseXor => l ^ r,
            BinaryOperatorKind::ShiftLeft | BinaryOperatorKind::ShiftRight => {
                if !(0..64).contains(&r) {
                    self.error(span, format!("invalid shift amount: {r}"));
                    return None;
                }

                if operator == BinaryOperatorKind::ShiftLeft {
                    l.wrapping_shl(r as u32)
                } else {
                    l.wrapping_shr(r as u32)
                }
            }
            BinaryOperatorKind::Equals => return Some(Expression::Constant(comparison(l == r))),
            BinaryOperatorKind::NotEquals => {
                return Some(Expression::Constant(comparison(l != r)))
            }
            BinaryOperatorKind::LessThan => return Some(Expression::Constant(comparison(l < r))),
            BinaryOperatorKind::LessThanOrEqualTo => {
                return Some(Expression::Constant(comparison(l <= r)))
            }
            BinaryOperatorKind::GreaterThan => {
                return Some(Expression::Constant(comparison(l > r)))
            }
            BinaryOperatorKind::GreaterThanOrEqualTo => {
                return Some(Expression::Constant(comparison(l >= r)))
            }
            BinaryOperatorKind::LogicalAnd | BinaryOperatorKind::LogicalOr => {
                unreachable!("short-circuited by the caller")
            }
        };

        let ty = match left.ty {
            Ty::UntypedInt { .. } => Ty::untyped(value),
            named => named,
        };

        Some(Expression::Constant(ConstantValue { value, ty }))
    }

}

fn resolve_unary_operation(operand: ConstantValue, operator: UnaryOperatorKind) -> Expression {
    let value = match operator {
        UnaryOperatorKind::Plus => operand.value,
        UnaryOperatorKind::Negate => operand.value.wrapping_neg(),
        UnaryOperatorKind::BitwiseNot => !operand.value,
        UnaryOperatorKind::Not => {
            let value = (operand.value == 0) as i64;

            return Expression::Constant(ConstantValue {
                value,
                ty: Ty::untyped(value),
            });
        }
    };

    let ty = match operand.ty {
        Ty::UntypedInt { .. } => Ty::untyped(value),
        named => named,
    };

    Expression::Constant(ConstantValue { value, ty })
}

fn clone_expression(expression: &ast::Expression) -> ast::Expression {
    ast::Expression {
        id: expression.id,
        span: expression.span,
        kind: match &expression.kind {
            ast::ExpressionKind::IntegerLiteral(v) => ast::ExpressionKind::IntegerLiteral(*v),
            ast::ExpressionKind::Identifier(name) => {
                ast::ExpressionKind::Identifier(name.clone())
            }
            ast::ExpressionKind::Unary { operator, operand } => ast::ExpressionKind::Unary {
                operator: *operator,
                operand: Box::new(clone_expression(operand)),
            },
            ast::ExpressionKind::Binary { operator, lhs, rhs } => ast::ExpressionKind::Binary {
                operator: *operator,
                lhs: Box::new(clone_expression(lhs)),
                rhs: Box::new(clone_expression(rhs)),
            },
            ast::ExpressionKind::Call(call) => ast::ExpressionKind::Call(Box::new(clone_call(call))),
        },
    }
}

fn clone_call(call: &ast::Call) -> ast::Call {
    ast::Call {
        id: call.id,
        span: call.span,
        callee: ast::Identifier {
            id: call.callee.id,
            span: call.callee.span,
            name: call.callee.name.clone(),
        },
        arguments: call.arguments.iter().map(clone_expression).collect(),
    }
}

fn clone_block(block: &ast::Block) -> ast::Block {
    ast::Block {
        id: block.id,
        span: block.span,
        statements: block.statements.iter().map(clone_statement).collect(),
    }
}

fn clone_else_if(else_if: &ast::ElseIf) -> ast::ElseIf {
    ast::ElseIf {
        id: else_if.id,
        span: else_if.span,
        condition: clone_expression(&else_if.condition),
        block: clone_block(&else_if.block),
    }
}

fn clone_statement(statement: &ast::Statement) -> ast::Statement {
    ast::Statement {
        id: statement.id,
        span: statement.span,
        kind: match &statement.kind {
            ast::StatementKind::Variable(decl) => {
                ast::StatementKind::Variable(Box::new(ast::VariableDeclaration {
                    id: decl.id,
                    span: decl.span,
                    name: clone_identifier(&decl.name),
                    ty: decl.ty.as_ref().map(clone_identifier),
                    value: decl.value.as_ref().map(clone_expression),
                }))
            }
            ast::StatementKind::Constant(decl) => {
                ast::StatementKind::Constant(Box::new(ast::ConstantDeclaration {
                    id: decl.id,
                    span: decl.span,
                    name: clone_identifier(&decl.name),
                    ty: decl.ty.as_ref().map(clone_identifier),
                    value: clone_expression(&decl.value),
                }))
            }
            ast::StatementKind::Assignment(assignment) => {
                ast::StatementKind::Assignment(Box::new(ast::Assignment {
                    id: assignment.id,
                    span: assignment.span,
                    target: clone_identifier(&assignment.target),
                    operator: assignment.operator,
                    value: clone_expression(&assignment.value),
                }))
            }
            ast::StatementKind::If(if_statement) => {
                ast::StatementKind::If(Box::new(ast::If {
                    id: if_statement.id,
                    span: if_statement.span,
                    condition: clone_expression(&if_statement.condition),
                    then_block: clone_block(&if_statement.then_block),
                    else_ifs: if_statement.else_ifs.iter().map(clone_else_if).collect(),
                    else_block: if_statement.else_block.as_ref().map(clone_block),
                }))
            }
            ast::StatementKind::Block(block) => {
                ast::StatementKind::Block(Box::new(clone_block(block)))
            }
            ast::StatementKind::Call(call) => {
                ast::StatementKind::Call(Box::new(clone_call(call)))
            }
            ast::StatementKind::Return(value) => {
                ast::StatementKind::Return(value.as_ref().map(clone_expression))
            }
        },
    }
}

fn clone_identifier(identifier: &ast::Identifier) -> ast::Identifier {
    ast::Identifier {
        id: identifier.id,
        span: identifier.span,
        name: identifier.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::analyze;
    use crate::{
        frontend::{parser::Parser, SourceFile, SourceFileOrigin},
        middle::ir::{Expression, Kind, Module, Step, Ty},
    };

    fn check(contents: &str) -> Result<Module, Vec<super::SemanticError>> {
        let source = SourceFile {
            contents: contents.to_owned(),
            origin: SourceFileOrigin::Memory,
        };
        let ast = Parser::parse_module(&source).expect("parsing failed");
        analyze(&ast)
    }

    #[test]
    fn constant_initializers_fold() {
        let module = check("var a int32 = 3 * 4 + 1\nfunc main() {}").unwrap();

        let var = &module.variables.raw[0];
        let Some(Expression::Constant(constant)) = &var.initial_value else {
            panic!("expected folded constant");
        };

        assert_eq!(constant.value, 13);
        assert_eq!(var.ty, Ty::Named(Kind::Int32));
    }

    #[test]
    fn constant_condition_selects_branch() {
        let module = check(
            "var a int32 = 0\nfunc main() {\n  if 1 {\n    a = 5\n  } else {\n    a = 9\n  }\n}",
        )
        .unwrap();

        let main = module.lookup_function("main").unwrap();
        let steps = &module.functions[main].steps;

        assert_eq!(steps.len(), 1);
        let Step::Block(block) = &steps[0] else {
            panic!("expected the taken branch as a block");
        };
        assert!(matches!(block.steps[0], Step::Assign { .. }));
    }

    #[test]
    fn named_constants_resolve() {
        let module = check("const step = 4\nvar a int32 = step + 1\nfunc main() {}").unwrap();

        let Some(Expression::Constant(constant)) = &module.variables.raw[0].initial_value else {
            panic!("expected folded constant");
        };

        assert_eq!(constant.value, 5);
    }

    #[test]
    fn compound_assignment_desugars() {
        let module =
            check("var a int32 = 0\nfunc main() {\n  a += 2\n}").unwrap();

        let main = module.lookup_function("main").unwrap();
        let Step::Assign { value, .. } = &module.functions[main].steps[0] else {
            panic!("expected assignment");
        };

        assert!(matches!(value, Expression::Binary { .. }));
    }

    #[test]
    fn errors_accumulate() {
        let errors = check(
            "var a int8 = 300\nvar a int32 = 2\nfunc main() {\n  c = 3\n}",
        )
        .unwrap_err();

        assert_eq!(errors.len(), 3, "expected 3 errors, got {errors:?}");
    }

    #[test]
    fn type_mismatch_is_reported() {
        let errors = check("var a int8 = 300\nfunc main() {}").unwrap_err();

        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("unassignable"));
    }

    #[test]
    fn division_by_zero_in_fold() {
        let errors = check("var a int32 = 1 / 0\nfunc main() {}").unwrap_err();

        assert!(errors[0].message.contains("division by zero"));
    }
}
