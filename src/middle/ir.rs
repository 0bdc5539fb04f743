//! The typed intermediate representation consumed by the backend. Names have
//! been resolved to arena handles, constants folded, and every expression
//! carries enough information to compute its type without a symbol table.

use hashbrown::HashMap;

use crate::index::{simple_index, IndexVec};

simple_index! {
    pub struct ScopeId;
}

simple_index! {
    pub struct VariableId;
}

simple_index! {
    pub struct FunctionId;
}

#[derive(Debug)]
pub struct Module {
    pub scopes: IndexVec<ScopeId, Scope>,
    pub variables: IndexVec<VariableId, Variable>,
    pub functions: IndexVec<FunctionId, Function>,
    pub root_scope: ScopeId,
    /// Module-level declarations, in source order
    pub declarations: Vec<Declare>,
    /// Names of `pub` items
    pub exports: Vec<String>,
}

impl Module {
    pub fn lookup_function(&self, name: &str) -> Option<FunctionId> {
        let scope = &self.scopes[self.root_scope];

        match scope.symbols.get(name) {
            Some(Symbol::Function(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn expression_type(&self, expression: &Expression) -> Ty {
        match expression {
            Expression::Constant(constant) => constant.ty,
            Expression::VariableRef(id) => self.variables[*id].ty,
            Expression::Unary { operand, .. } => self.expression_type(operand),
            Expression::Binary { op, left, .. } => {
                if op.is_comparison() {
                    Ty::Named(Kind::Int32)
                } else {
                    self.expression_type(left)
                }
            }
            Expression::Call { function, .. } => self.functions[*function]
                .returns
                .unwrap_or(Ty::Named(Kind::Int32)),
        }
    }
}

#[derive(Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub symbols: HashMap<String, Symbol>,
}

#[derive(Debug, Clone, Copy)]
pub enum Symbol {
    Variable(VariableId),
    Function(FunctionId),
    Constant(ConstantValue),
}

#[derive(Debug)]
pub struct Variable {
    pub name: String,
    pub ty: Ty,
    pub initial_value: Option<Expression>,
}

#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub scope: ScopeId,
    pub steps: Vec<Step>,
    pub returns: Option<Ty>,
}

/// A module-level `var` declaration
#[derive(Debug, Clone)]
pub struct Declare {
    pub name: String,
    pub variable: VariableId,
}

#[derive(Debug)]
pub enum Step {
    Declare(Declare),
    Assign {
        target: VariableId,
        value: Expression,
    },
    Block(BlockStep),
    If(IfStep),
    Call {
        function: FunctionId,
        arguments: Vec<Expression>,
    },
    Return(Option<Expression>),
}

#[derive(Debug)]
pub struct BlockStep {
    pub scope: ScopeId,
    pub steps: Vec<Step>,
}

#[derive(Debug)]
pub struct IfStep {
    pub condition: Expression,
    pub then_block: BlockStep,
    pub else_ifs: Vec<IfStep>,
    pub else_block: Option<BlockStep>,
}

#[derive(Debug, Clone)]
pub enum Expression {
    Constant(ConstantValue),
    VariableRef(VariableId),
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Call {
        function: FunctionId,
        arguments: Vec<Expression>,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct ConstantValue {
    pub value: i64,
    pub ty: Ty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Negate,
    BitwiseNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    ShiftLeft,
    ShiftRight,
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
}

impl BinaryOp {
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
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
}

impl Kind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
        }
    }

    pub fn from_name(name: &str) -> Option<Kind> {
        Some(match name {
            "int8" => Self::Int8,
            "int16" => Self::Int16,
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "uint8" => Self::Uint8,
            "uint16" => Self::Uint16,
            "uint32" => Self::Uint32,
            "uint64" => Self::Uint64,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ty {
    Named(Kind),
    /// An integer constant that has not yet committed to a width. Carries the
    /// number of significant bits and whether the value is negative, which
    /// together decide assignability.
    UntypedInt { bits: u8, negative: bool },
}

impl Ty {
    pub fn untyped(value: i64) -> Ty {
        let negative = value < 0;
        let magnitude = value.unsigned_abs();

        Ty::UntypedInt {
            bits: (64 - magnitude.leading_zeros()) as u8,
            negative,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Ty::Named(kind) => kind.name().to_owned(),
            Ty::UntypedInt { .. } => "untyped int".to_owned(),
        }
    }

    pub fn assignable_to(&self, target: Option<Ty>) -> bool {
        let Some(target) = target else {
            return true;
        };

        match *self {
            Ty::Named(kind) => matches!(target, Ty::Named(t) if t == kind),
            Ty::UntypedInt { bits, negative } => match target {
                Ty::UntypedInt { .. } => true,
                Ty::Named(Kind::Uint8) => !negative && bits <= 8,
                Ty::Named(Kind::Uint16) => !negative && bits <= 16,
                Ty::Named(Kind::Uint32) => !negative && bits <= 32,
                Ty::Named(Kind::Uint64) => !negative && bits <= 64,
                Ty::Named(Kind::Int8) => bits < 8,
                Ty::Named(Kind::Int16) => bits < 16,
                Ty::Named(Kind::Int32) => bits < 32,
                Ty::Named(Kind::Int64) => bits < 64,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Kind, Ty};

    #[test]
    fn untyped_int_width_rules() {
        assert!(Ty::untyped(127).assignable_to(Some(Ty::Named(Kind::Int8))));
        assert!(!Ty::untyped(128).assignable_to(Some(Ty::Named(Kind::Int8))));
        assert!(Ty::untyped(255).assignable_to(Some(Ty::Named(Kind::Uint8))));
        assert!(!Ty::untyped(-1).assignable_to(Some(Ty::Named(Kind::Uint32))));
        assert!(Ty::untyped(-1).assignable_to(Some(Ty::Named(Kind::Int32))));
        assert!(Ty::untyped(i32::MAX as i64).assignable_to(Some(Ty::Named(Kind::Int32))));
        assert!(!Ty::untyped(i32::MAX as i64 + 1).assignable_to(Some(Ty::Named(Kind::Int32))));
    }

    #[test]
    fn named_types_only_match_themselves() {
        assert!(Ty::Named(Kind::Int32).assignable_to(Some(Ty::Named(Kind::Int32))));
        assert!(!Ty::Named(Kind::Int32).assignable_to(Some(Ty::Named(Kind::Int64))));
        assert!(Ty::Named(Kind::Int64).assignable_to(None));
    }
}
