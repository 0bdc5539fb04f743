//! The syntax tree produced by the parser. Nodes carry a [`NodeId`] and a
//! [`Span`] so later stages can report positions without re-walking text.

use crate::frontend::lexer::Span;

#[derive(Debug)]
pub struct Module {
    /// Top level items in the module, in source order
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Debug)]
pub struct Item {
    pub id: NodeId,
    pub span: Span,
    /// Set when the item was prefixed with the `pub` keyword
    pub is_public: bool,
    pub kind: ItemKind,
}

#[derive(Debug)]
pub enum ItemKind {
    Variable(Box<VariableDeclaration>),
    Constant(Box<ConstantDeclaration>),
    Function(Box<FunctionDefinition>),
}

/// `var name [type] [= expr]`
#[derive(Debug)]
pub struct VariableDeclaration {
    pub id: NodeId,
    pub span: Span,
    pub name: Identifier,
    pub ty: Option<Identifier>,
    pub value: Option<Expression>,
}

/// `const name [type] = expr`
#[derive(Debug)]
pub struct ConstantDeclaration {
    pub id: NodeId,
    pub span: Span,
    pub name: Identifier,
    pub ty: Option<Identifier>,
    pub value: Expression,
}

/// `func name() { ... }`
#[derive(Debug)]
pub struct FunctionDefinition {
    pub id: NodeId,
    pub span: Span,
    pub name: Identifier,
    pub return_type: Option<Identifier>,
    pub body: Block,
}

#[derive(Debug)]
pub struct Identifier {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
}

#[derive(Debug)]
pub struct Block {
    pub id: NodeId,
    pub span: Span,
    pub statements: Vec<Statement>,
}

#[derive(Debug)]
pub struct Statement {
    pub id: NodeId,
    pub span: Span,
    pub kind: StatementKind,
}

#[derive(Debug)]
pub enum StatementKind {
    Variable(Box<VariableDeclaration>),
    Constant(Box<ConstantDeclaration>),
    Assignment(Box<Assignment>),
    If(Box<If>),
    Block(Box<Block>),
    Call(Box<Call>),
    Return(Option<Expression>),
}

#[derive(Debug)]
pub struct Assignment {
    pub id: NodeId,
    pub span: Span,
    pub target: Identifier,
    /// `None` is a plain `=`; otherwise the compound operator to desugar
    pub operator: Option<BinaryOperatorKind>,
    pub value: Expression,
}

#[derive(Debug)]
pub struct If {
    pub id: NodeId,
    pub span: Span,
    pub condition: Expression,
    pub then_block: Block,
    pub else_ifs: Vec<ElseIf>,
    pub else_block: Option<Block>,
}

#[derive(Debug)]
pub struct ElseIf {
    pub id: NodeId,
    pub span: Span,
    pub condition: Expression,
    pub block: Block,
}

#[derive(Debug)]
pub struct Call {
    pub id: NodeId,
    pub span: Span,
    pub callee: Identifier,
    pub arguments: Vec<Expression>,
}

#[derive(Debug)]
pub struct Expression {
    pub id: NodeId,
    pub span: Span,
    pub kind: ExpressionKind,
}

#[derive(Debug)]
pub enum ExpressionKind {
    IntegerLiteral(u64),
    Identifier(String),
    Unary {
        operator: UnaryOperatorKind,
        operand: Box<Expression>,
    },
    Binary {
        operator: BinaryOperatorKind,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Call(Box<Call>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperatorKind {
    Plus,       // +
    Negate,     // -
    BitwiseNot, // ~
    Not,        // !
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperatorKind {
    Add,        // +
    Subtract,   // -
    Multiply,   // *
    Divide,     // /
    Modulus,    // %
    BitwiseAnd, // &
    BitwiseOr,  // |
    BitwiseXor, // ^
    ShiftLeft,  // <<
    ShiftRight, // >>
    LogicalAnd, // &&
    LogicalOr,  // ||
    Equals,     // ==
    NotEquals,  // !=
    LessThan,   // <
    LessThanOrEqualTo,    // <=
    GreaterThan,          // >
    GreaterThanOrEqualTo, // >=
}

impl BinaryOperatorKind {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Equals
                | Self::NotEquals
                | Self::LessThan
                | Self::LessThanOrEqualTo
                | Self::GreaterThan
                | Self::GreaterThanOrEqualTo
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, Self::LogicalAnd | Self::LogicalOr)
    }
}

impl core::fmt::Display for BinaryOperatorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulus => "%",
            Self::BitwiseAnd => "&",
            Self::BitwiseOr => "|",
            Self::BitwiseXor => "^",
            Self::ShiftLeft => "<<",
            Self::ShiftRight => ">>",
            Self::LogicalAnd => "&&",
            Self::LogicalOr => "||",
            Self::Equals => "==",
            Self::NotEquals => "!=",
            Self::LessThan => "<",
            Self::LessThanOrEqualTo => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqualTo => ">=",
        })
    }
}

impl core::fmt::Display for UnaryOperatorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Plus => "+",
            Self::Negate => "-",
            Self::BitwiseNot => "~",
            Self::Not => "!",
        })
    }
}
