//! Placeable entities. The polymorphism of the device zoo is a tagged
//! [`EntityKind`] with a uniform footprint projection; combinator behavior
//! payloads live on the variants. Entities are owned by an arena and referred
//! to everywhere else by handle, with blueprint numbers handed out lazily on
//! first reference.

use crate::{
    backend::{
        geometry::{Bounds, Direction, Position},
        graph::NetworkId,
        signal::Signal,
    },
    index::{simple_index, IndexVec},
};

simple_index! {
    pub struct EntityId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOperation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
    Power,
    ShiftLeft,
    ShiftRight,
    And,
    Or,
    Xor,
}

impl ArithmeticOperation {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulus => "%",
            Self::Power => "^",
            Self::ShiftLeft => "<<",
            Self::ShiftRight => ">>",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "≠",
            Self::Lt => "<",
            Self::Le => "≤",
            Self::Gt => ">",
            Self::Ge => "≥",
        }
    }
}

/// The second input of an arithmetic or decider combinator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Signal(&'static Signal),
    Constant(i32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArithmeticBehavior {
    pub first_signal: &'static Signal,
    pub second: Operand,
    pub operation: ArithmeticOperation,
    pub output_signal: &'static Signal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeciderBehavior {
    pub first_signal: &'static Signal,
    pub second: Operand,
    pub comparator: Comparator,
    pub output_signal: &'static Signal,
    pub copy_count_from_input: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantFilter {
    pub signal: &'static Signal,
    pub count: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LampBehavior {
    pub first_signal: &'static Signal,
    pub comparator: Comparator,
    pub constant: i32,
    pub use_colors: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    Arithmetic(ArithmeticBehavior),
    Decider(DeciderBehavior),
    Constant(Vec<ConstantFilter>),
    Substation { neighbors: Vec<EntityId> },
    Roboport,
    Lamp(LampBehavior),
}

impl EntityKind {
    pub fn blueprint_name(&self) -> &'static str {
        match self {
            Self::Arithmetic(_) => "arithmetic-combinator",
            Self::Decider(_) => "decider-combinator",
            Self::Constant(_) => "constant-combinator",
            Self::Substation { .. } => "substation",
            Self::Roboport => "roboport",
            Self::Lamp(_) => "lamp",
        }
    }

    /// Half-extents `(length, width)` of the footprint for a direction.
    pub fn size(&self, direction: Direction) -> (f64, f64) {
        match self {
            Self::Arithmetic(_) | Self::Decider(_) => {
                if direction.is_vertical() {
                    (1.0, 0.5)
                } else {
                    (0.5, 1.0)
                }
            }
            Self::Constant(_) | Self::Lamp(_) => (0.5, 0.5),
            Self::Substation { .. } => (1.0, 1.0),
            Self::Roboport => (2.0, 2.0),
        }
    }

    /// Arithmetic and decider combinators have a separate output connector.
    pub fn has_secondary_connector(&self) -> bool {
        matches!(self, Self::Arithmetic(_) | Self::Decider(_))
    }

    pub fn has_connectors(&self) -> bool {
        matches!(
            self,
            Self::Arithmetic(_) | Self::Decider(_) | Self::Constant(_)
        )
    }
}

/// One side of a combinator: the wires already attached, plus the network
/// membership per color that the placer will have to realize.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Connector {
    pub red: Vec<Wire>,
    pub green: Vec<Wire>,
    pub red_net: Option<NetworkId>,
    pub green_net: Option<NetworkId>,
}

/// A wire to a peer connector, stored by blueprint number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wire {
    pub entity_number: u32,
    pub circuit: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectorSlot {
    Primary,
    Secondary,
}

impl ConnectorSlot {
    pub fn circuit_id(self) -> u8 {
        match self {
            Self::Primary => 1,
            Self::Secondary => 2,
        }
    }
}

/// An entity-side attachment point of a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub entity: EntityId,
    pub slot: ConnectorSlot,
}

#[derive(Debug)]
pub struct Entity {
    /// Blueprint number, assigned lazily by the arena
    number: Option<u32>,
    /// Set once the placer (or the power grid) has located the entity
    pub position: Option<Position>,
    pub direction: Direction,
    pub kind: EntityKind,
    pub primary: Connector,
    pub secondary: Connector,
}

impl Entity {
    pub fn bounds(&self) -> Bounds {
        let (l, w) = self.kind.size(self.direction);

        self.position
            .expect("bounds of an unplaced entity")
            .bounds(l, w)
    }

    pub fn connector(&self, slot: ConnectorSlot) -> &Connector {
        match slot {
            ConnectorSlot::Primary => &self.primary,
            ConnectorSlot::Secondary => &self.secondary,
        }
    }

    pub fn connector_mut(&mut self, slot: ConnectorSlot) -> &mut Connector {
        match slot {
            ConnectorSlot::Primary => &mut self.primary,
            ConnectorSlot::Secondary => &mut self.secondary,
        }
    }

    pub fn is_placed(&self) -> bool {
        self.position.is_some()
    }
}

#[derive(Debug, Default)]
pub struct EntityArena {
    entities: IndexVec<EntityId, Entity>,
    next_number: u32,
}

impl EntityArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, kind: EntityKind) -> EntityId {
        self.entities.push(Entity {
            number: None,
            position: None,
            direction: Direction::North,
            kind,
            primary: Connector::default(),
            secondary: Connector::default(),
        })
    }

    /// The entity's blueprint number, assigning the next free one on first
    /// reference. Numbers are 1-based and never reused.
    pub fn number(&mut self, id: EntityId) -> u32 {
        if let Some(number) = self.entities[id].number {
            return number;
        }

        self.next_number += 1;
        self.entities[id].number = Some(self.next_number);
        self.next_number
    }

    pub fn assigned_number(&self, id: EntityId) -> Option<u32> {
        self.entities[id].number
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> {
        self.entities.indices()
    }
}

impl core::ops::Index<EntityId> for EntityArena {
    type Output = Entity;

    fn index(&self, id: EntityId) -> &Entity {
        &self.entities[id]
    }
}

impl core::ops::IndexMut<EntityId> for EntityArena {
    fn index_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id]
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::backend::signal;

    #[test]
    fn numbers_are_lazy_and_stable() {
        let mut arena = EntityArena::new();
        let a = arena.create(EntityKind::Roboport);
        let b = arena.create(EntityKind::Roboport);

        assert_eq!(arena.assigned_number(a), None);
        // Reference b first: it gets the lower number
        assert_eq!(arena.number(b), 1);
        assert_eq!(arena.number(a), 2);
        assert_eq!(arena.number(b), 1);
    }

    #[test]
    fn footprints_follow_direction() {
        let kind = EntityKind::Arithmetic(ArithmeticBehavior {
            first_signal: &signal::CHECK,
            second: Operand::Constant(0),
            operation: ArithmeticOperation::Or,
            output_signal: &signal::CHECK,
        });

        assert_eq!(kind.size(Direction::North), (1.0, 0.5));
        assert_eq!(kind.size(Direction::East), (0.5, 1.0));
        assert_eq!(EntityKind::Roboport.size(Direction::East), (2.0, 2.0));
        assert_eq!(
            EntityKind::Constant(Vec::new()).size(Direction::North),
            (0.5, 0.5)
        );
    }

    #[test]
    fn wire_format_symbols() {
        assert_eq!(ArithmeticOperation::Power.symbol(), "^");
        assert_eq!(ArithmeticOperation::ShiftLeft.symbol(), "<<");
        assert_eq!(ArithmeticOperation::And.symbol(), "AND");
        assert_eq!(Comparator::Ne.symbol(), "≠");
        assert_eq!(Comparator::Le.symbol(), "≤");
        assert_eq!(Comparator::Ge.symbol(), "≥");
    }
}
