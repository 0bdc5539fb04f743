//! The logic graph: colored circuit networks over combinator connectors, the
//! tick chain, and the four-decider memory cells. The lowering builds this
//! graph; the placer later realizes every network geometrically.
//!
//! Entities and networks live in two arenas and reference each other only
//! through handles, so the whole graph is plain owned data.

use log::trace;
use thiserror::Error;

use crate::{
    backend::{
        entity::{
            ArithmeticBehavior, ArithmeticOperation, Comparator, ConstantFilter, ConnectorSlot,
            DeciderBehavior, Endpoint, EntityArena, EntityId, EntityKind, Operand,
        },
        signal::{self, Signal},
    },
    index::{simple_index, IndexVec},
};

simple_index! {
    pub struct NetworkId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireColor {
    Red,
    Green,
}

impl WireColor {
    pub fn opposite(self) -> WireColor {
        match self {
            WireColor::Red => WireColor::Green,
            WireColor::Green => WireColor::Red,
        }
    }
}

#[derive(Debug)]
pub struct Network {
    pub color: WireColor,
    /// Connector endpoints registered while building the graph
    pub members: Vec<Endpoint>,
    /// Endpoints the placer has committed so far, in placement order
    pub placed: Vec<Endpoint>,
    next_cell_id: i32,
}

/// How many ticks the forward scan for free memory-op slots may cover before
/// the compiler gives up.
const MEM_OP_SCAN_LIMIT: usize = 65_536;

#[derive(Debug, Clone, Error)]
pub enum ScheduleError {
    #[error("no free memory-op tick within {MEM_OP_SCAN_LIMIT} ticks of tick {start}")]
    Overflow { start: usize },
}

/// One stage of the tick chain. The ticker's combinator emits a `check` pulse
/// one simulation tick after its driver fires.
#[derive(Debug, Clone, Copy)]
pub struct Ticker {
    pub entity: EntityId,
    /// Set when a memory operation (or a control tick) owns this tick,
    /// keeping a second memory read/write off it
    pub is_mem_op: bool,
}

/// A persistent 32-bit register: four deciders around a shared cell network,
/// addressed by `id` through the `G`/`S`/`V` signals.
#[derive(Debug, Clone, Copy)]
pub struct Cell {
    pub id: i32,
    pub net: NetworkId,
    pub get: EntityId,
    pub set: EntityId,
    pub sto: EntityId,
    pub tmp: EntityId,
}

#[derive(Debug, Default)]
pub struct Graph {
    pub entities: EntityArena,
    pub networks: IndexVec<NetworkId, Network>,
    pub tickers: Vec<Ticker>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_network(&mut self, color: WireColor) -> NetworkId {
        self.networks.push(Network {
            color,
            members: Vec::new(),
            placed: Vec::new(),
            next_cell_id: 0,
        })
    }

    /// Expressions alternate colors through each stage so sibling temporaries
    /// cannot interfere at a combinator's input nexus.
    pub fn create_subnet(&mut self, parent: NetworkId) -> NetworkId {
        let color = self.networks[parent].color.opposite();
        self.create_network(color)
    }

    pub fn color(&self, net: NetworkId) -> WireColor {
        self.networks[net].color
    }

    fn next_cell_id(&mut self, net: NetworkId) -> i32 {
        let network = &mut self.networks[net];
        network.next_cell_id += 1;
        network.next_cell_id
    }

    /// Moves every member of `b` onto `a`. Both networks must share a color;
    /// this happens when two expression branches land on the same tick and
    /// can share a carrier.
    pub fn merge(&mut self, a: NetworkId, b: NetworkId) {
        assert_eq!(
            self.networks[a].color, self.networks[b].color,
            "merged networks must share a color"
        );

        let color = self.networks[a].color;
        let members = std::mem::take(&mut self.networks[b].members);

        for endpoint in &members {
            let connector = self.entities[endpoint.entity].connector_mut(endpoint.slot);

            match color {
                WireColor::Red => connector.red_net = Some(a),
                WireColor::Green => connector.green_net = Some(a),
            }
        }

        self.networks[a].members.extend(members);
    }

    fn register(&mut self, net: NetworkId, entity: EntityId, slot: ConnectorSlot) {
        let color = self.networks[net].color;
        let connector = self.entities[entity].connector_mut(slot);

        match color {
            WireColor::Red => {
                assert!(connector.red_net.is_none(), "red side already connected");
                connector.red_net = Some(net);
            }
            WireColor::Green => {
                assert!(
                    connector.green_net.is_none(),
                    "green side already connected"
                );
                connector.green_net = Some(net);
            }
        }

        self.networks[net].members.push(Endpoint { entity, slot });
    }

    /// Registers the entity's input side on `net`.
    pub fn connect_input(&mut self, net: NetworkId, entity: EntityId) {
        self.register(net, entity, ConnectorSlot::Primary);
    }

    /// Registers the entity's output side on `net`. For dual-connector
    /// combinators that is the secondary connector; constant emitters output
    /// through their only connector.
    pub fn connect_output(&mut self, net: NetworkId, entity: EntityId) {
        let slot = if self.entities[entity].kind.has_secondary_connector() {
            ConnectorSlot::Secondary
        } else {
            ConnectorSlot::Primary
        };

        self.register(net, entity, slot);
    }

    /* Entity constructors */

    pub fn arithmetic(
        &mut self,
        first_signal: &'static Signal,
        second: Operand,
        operation: ArithmeticOperation,
        output_signal: &'static Signal,
    ) -> EntityId {
        self.entities.create(EntityKind::Arithmetic(ArithmeticBehavior {
            first_signal,
            second,
            operation,
            output_signal,
        }))
    }

    pub fn decider(
        &mut self,
        first_signal: &'static Signal,
        second: Operand,
        comparator: Comparator,
        output_signal: &'static Signal,
        copy_count_from_input: bool,
    ) -> EntityId {
        self.entities.create(EntityKind::Decider(DeciderBehavior {
            first_signal,
            second,
            comparator,
            output_signal,
            copy_count_from_input,
        }))
    }

    pub fn emitter(&mut self, filters: Vec<ConstantFilter>) -> EntityId {
        self.entities.create(EntityKind::Constant(filters))
    }

    fn ticker_entity(&mut self) -> EntityId {
        self.arithmetic(
            &signal::CHECK,
            Operand::Constant(0),
            ArithmeticOperation::Or,
            &signal::CHECK,
        )
    }

    /* Tickers */

    /// The ticker at `tick`, extending (and chaining) the tick line as
    /// needed. Returns `None` when `exclude_mem_op` is set and the tick is
    /// already owned by a memory operation.
    pub fn get_ticker(&mut self, tick: usize, exclude_mem_op: bool) -> Option<usize> {
        if tick < self.tickers.len() {
            if exclude_mem_op && self.tickers[tick].is_mem_op {
                return None;
            }

            return Some(tick);
        }

        let old_len = self.tickers.len();

        for n in old_len..=tick {
            let entity = self.ticker_entity();

            self.tickers.push(Ticker {
                entity,
                is_mem_op: false,
            });

            if n > 0 {
                let net = self
                    .get_ticker_network(n - 1, WireColor::Red, false)
                    .expect("ticker chain extension cannot fail");
                self.connect_input(net, entity);
            }
        }

        if exclude_mem_op {
            self.tickers[tick].is_mem_op = true;
        }

        Some(tick)
    }

    /// The output network of ticker `tick` in the requested color, created
    /// lazily.
    pub fn get_ticker_network(
        &mut self,
        tick: usize,
        color: WireColor,
        exclude_mem_op: bool,
    ) -> Option<NetworkId> {
        let tick = self.get_ticker(tick, exclude_mem_op)?;
        let entity = self.tickers[tick].entity;

        let connector = &self.entities[entity].secondary;
        let existing = match color {
            WireColor::Red => connector.red_net,
            WireColor::Green => connector.green_net,
        };

        if let Some(net) = existing {
            return Some(net);
        }

        let net = self.create_network(color);
        self.connect_output(net, entity);

        Some(net)
    }

    /// Appends a control ticker to the chain without chaining its input; the
    /// caller decides what fires it. Returns the new tick, the output network
    /// of the previously-last ticker, and the new ticker's input network.
    pub fn add_control_tick(&mut self, color: WireColor) -> (usize, NetworkId, NetworkId) {
        assert!(!self.tickers.is_empty(), "control tick before any ticker");

        let end = self
            .get_ticker_network(self.tickers.len() - 1, color, false)
            .expect("ticker chain extension cannot fail");

        let entity = self.ticker_entity();

        self.tickers.push(Ticker {
            entity,
            is_mem_op: true,
        });

        let tick = self.tickers.len() - 1;

        let next = self.create_network(color);
        self.connect_input(next, entity);

        (tick, end, next)
    }

    /// The smallest tick at or after `tick` with enough consecutive free
    /// memory-op slots: two for a read, three for a write. The chosen slots
    /// are marked as occupied.
    pub fn next_safe_mem_op_tick(
        &mut self,
        tick: usize,
        is_read: bool,
    ) -> Result<usize, ScheduleError> {
        let start = tick;

        for tick in start..start + MEM_OP_SCAN_LIMIT {
            if self.get_ticker(tick, true).is_none() {
                continue;
            }

            if self.get_ticker(tick + 1, true).is_none() {
                continue;
            }

            if !is_read {
                if self.get_ticker(tick + 2, true).is_none() {
                    continue;
                }

                self.tickers[tick + 2].is_mem_op = true;
            }

            self.tickers[tick].is_mem_op = true;
            self.tickers[tick + 1].is_mem_op = true;

            trace!(
                "reserved mem-op ticks starting at {tick} ({})",
                if is_read { "read" } else { "write" }
            );

            return Ok(tick);
        }

        Err(ScheduleError::Overflow { start })
    }

    /// Carries `sig` forward one tick per stage from `net` at `start` until
    /// it lands in `into` at `end`.
    pub fn preserve_until(
        &mut self,
        net: NetworkId,
        into: NetworkId,
        sig: &'static Signal,
        start: usize,
        end: usize,
    ) {
        assert!(start < end, "preservation range must be non-empty");

        let mut net = net;
        let mut last = None;

        for tick in start..end {
            let stage = self.arithmetic(
                sig,
                Operand::Signal(&signal::CHECK),
                ArithmeticOperation::Multiply,
                sig,
            );

            let gate_color = self.color(net).opposite();
            let tnet = self
                .get_ticker_network(tick, gate_color, false)
                .expect("ticker chain extension cannot fail");

            self.connect_input(tnet, stage);
            self.connect_input(net, stage);

            if tick + 1 < end {
                net = self.create_network(WireColor::Red);
                self.connect_output(net, stage);
            }

            last = Some(stage);
        }

        let last = last.expect("non-empty preservation range");
        self.connect_output(into, last);
    }

    /* Memory cells */

    /// Builds the four deciders of a cell on `net` and hands back its handle.
    pub fn create_cell(&mut self, net: NetworkId) -> Cell {
        let set_net = self.create_subnet(net);
        let sto_net = self.create_network(WireColor::Red);
        let get_net = self.create_subnet(net);

        let id = self.next_cell_id(net);

        // get: on a matching read address, emit the held value onto the cell
        // network
        let get = self.decider(
            &signal::SIG_G,
            Operand::Constant(id),
            Comparator::Eq,
            &signal::SIG_V,
            true,
        );
        self.connect_input(net, get);
        self.connect_input(get_net, get);
        self.connect_output(net, get);

        // set: on a matching write address, pass the write request through to
        // the staging subnet
        let set = self.decider(
            &signal::SIG_S,
            Operand::Constant(id),
            Comparator::Eq,
            &signal::EVERYTHING,
            true,
        );
        self.connect_input(net, set);
        self.connect_output(set_net, set);

        // sto: while no write is in flight, circulate the held value
        let sto = self.decider(
            &signal::SIG_S,
            Operand::Constant(0),
            Comparator::Eq,
            &signal::SIG_V,
            true,
        );
        self.connect_input(sto_net, sto);
        self.connect_input(set_net, sto);
        self.connect_output(sto_net, sto);
        self.connect_output(get_net, sto);

        // tmp: stage an in-flight write for one tick
        let tmp = self.decider(
            &signal::SIG_S,
            Operand::Constant(0),
            Comparator::Ne,
            &signal::SIG_V,
            true,
        );
        self.connect_input(set_net, tmp);
        self.connect_output(set_net, tmp);

        Cell {
            id,
            net,
            get,
            set,
            sto,
            tmp,
        }
    }

    /// Issues the 3-tick read sequence: address the cell at the scheduled
    /// tick, then two ticks later copy its `V` output onto `target` as
    /// `target_signal`. Returns the tick at which the value is available.
    pub fn read_cell(
        &mut self,
        tick: usize,
        cell: Cell,
        target_signal: &'static Signal,
        target: NetworkId,
    ) -> Result<usize, ScheduleError> {
        let tick = self.next_safe_mem_op_tick(tick, true)?;

        let dispatch_net = self
            .get_ticker_network(tick, WireColor::Red, false)
            .expect("ticker chain extension cannot fail");
        let read_color = self.color(cell.net).opposite();
        let read_net = self
            .get_ticker_network(tick + 2, read_color, false)
            .expect("ticker chain extension cannot fail");

        // check × id → G addresses the cell
        let dispatch = self.arithmetic(
            &signal::CHECK,
            Operand::Constant(cell.id),
            ArithmeticOperation::Multiply,
            &signal::SIG_G,
        );
        self.connect_input(dispatch_net, dispatch);
        self.connect_output(cell.net, dispatch);

        // check × V → target_signal copies the answer out
        let read = self.arithmetic(
            &signal::CHECK,
            Operand::Signal(&signal::SIG_V),
            ArithmeticOperation::Multiply,
            target_signal,
        );
        self.connect_input(cell.net, read);
        self.connect_input(read_net, read);
        self.connect_output(target, read);

        Ok(tick + 3)
    }

    /// Issues the write sequence for a value riding on `net` as `sig` since
    /// `origin_tick`, preserving it forward when the scheduler defers the
    /// write. Returns the tick after the write lands.
    pub fn set_cell(
        &mut self,
        origin_tick: usize,
        net: NetworkId,
        sig: &'static Signal,
        cell: Cell,
    ) -> Result<usize, ScheduleError> {
        let tick = self.next_safe_mem_op_tick(origin_tick, false)?;

        let gate_color = self.color(net).opposite();
        let gate_net = self
            .get_ticker_network(tick, gate_color, false)
            .expect("ticker chain extension cannot fail");

        let net = if origin_tick != tick {
            let carried = self.create_network(self.color(net));
            self.preserve_until(net, carried, sig, origin_tick, tick);
            carried
        } else {
            net
        };

        // check × id → S addresses the cell for writing
        let dispatch = self.arithmetic(
            &signal::CHECK,
            Operand::Constant(cell.id),
            ArithmeticOperation::Multiply,
            &signal::SIG_S,
        );
        self.connect_input(gate_net, dispatch);
        self.connect_output(cell.net, dispatch);

        // check × sig → V carries the value in
        let write = self.arithmetic(
            &signal::CHECK,
            Operand::Signal(sig),
            ArithmeticOperation::Multiply,
            &signal::SIG_V,
        );
        self.connect_input(net, write);
        self.connect_input(gate_net, write);
        self.connect_output(cell.net, write);

        Ok(tick + 1)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::backend::entity::EntityKind;

    #[test]
    fn ticker_chain_extends_and_links() {
        let mut graph = Graph::new();

        assert_eq!(graph.get_ticker(3, false), Some(3));
        assert_eq!(graph.tickers.len(), 4);

        // Each ticker past the first is driven by its predecessor's red
        // output network
        for n in 1..4 {
            let entity = graph.tickers[n].entity;
            let input = &graph.entities[entity].primary;
            let driver = graph.tickers[n - 1].entity;
            let driver_out = graph.entities[driver].secondary.red_net;

            assert!(driver_out.is_some());
            assert_eq!(input.red_net, driver_out);
        }
    }

    #[test]
    fn ticker_networks_are_lazy_and_cached() {
        let mut graph = Graph::new();

        let a = graph.get_ticker_network(0, WireColor::Green, false).unwrap();
        let b = graph.get_ticker_network(0, WireColor::Green, false).unwrap();
        assert_eq!(a, b);

        let red = graph.get_ticker_network(0, WireColor::Red, false).unwrap();
        assert_ne!(a, red);
    }

    #[test]
    fn mem_op_reservation_widths() {
        let mut graph = Graph::new();

        // A read claims ticks {t, t+1}
        let t = graph.next_safe_mem_op_tick(0, true).unwrap();
        assert_eq!(t, 0);
        assert!(graph.tickers[0].is_mem_op);
        assert!(graph.tickers[1].is_mem_op);

        // The next read slides past the claimed slots
        let t = graph.next_safe_mem_op_tick(0, true).unwrap();
        assert_eq!(t, 2);

        // A write claims three consecutive ticks
        let t = graph.next_safe_mem_op_tick(0, false).unwrap();
        assert_eq!(t, 4);
        assert!(graph.tickers[4].is_mem_op);
        assert!(graph.tickers[5].is_mem_op);
        assert!(graph.tickers[6].is_mem_op);
    }

    #[test]
    fn excluded_ticker_returns_none() {
        let mut graph = Graph::new();

        graph.get_ticker(0, false);
        graph.tickers[0].is_mem_op = true;

        assert_eq!(graph.get_ticker(0, true), None);
        assert_eq!(graph.get_ticker(0, false), Some(0));
    }

    #[test]
    fn preserve_builds_one_stage_per_tick() {
        let mut graph = Graph::new();

        let source = graph.create_network(WireColor::Green);
        let sink = graph.create_network(WireColor::Green);

        let before = graph.entities.len();
        graph.preserve_until(source, sink, &signal::SIG_L, 1, 4);

        let stages: Vec<_> = graph
            .entities
            .ids()
            .skip(before)
            .filter(|id| {
                matches!(&graph.entities[*id].kind, EntityKind::Arithmetic(b)
                    if b.operation == ArithmeticOperation::Multiply
                        && b.first_signal == &signal::SIG_L)
            })
            .collect();

        assert_eq!(stages.len(), 3);

        // The final stage lands in the sink
        let last = *stages.last().unwrap();
        assert_eq!(graph.entities[last].secondary.green_net, Some(sink));
    }

    #[test]
    fn cell_is_four_deciders_with_expected_conditions() {
        let mut graph = Graph::new();

        let net = graph.create_network(WireColor::Red);
        let cell = graph.create_cell(net);

        assert_eq!(cell.id, 1);

        let expect_decider = |id: EntityId| match &graph.entities[id].kind {
            EntityKind::Decider(behavior) => behavior.clone(),
            other => panic!("expected decider, found {other:?}"),
        };

        let get = expect_decider(cell.get);
        assert_eq!(get.first_signal, &signal::SIG_G);
        assert_eq!(get.second, Operand::Constant(1));
        assert_eq!(get.comparator, Comparator::Eq);
        assert_eq!(get.output_signal, &signal::SIG_V);

        let set = expect_decider(cell.set);
        assert_eq!(set.first_signal, &signal::SIG_S);
        assert_eq!(set.output_signal, &signal::EVERYTHING);

        let sto = expect_decider(cell.sto);
        assert_eq!(sto.second, Operand::Constant(0));
        assert_eq!(sto.comparator, Comparator::Eq);

        let tmp = expect_decider(cell.tmp);
        assert_eq!(tmp.comparator, Comparator::Ne);

        // Cell ids increment per network
        let second = graph.create_cell(net);
        assert_eq!(second.id, 2);
    }

    #[test]
    fn read_costs_three_ticks() {
        let mut graph = Graph::new();

        let net = graph.create_network(WireColor::Red);
        let cell = graph.create_cell(net);
        let out = graph.create_network(WireColor::Green);

        let done = graph.read_cell(0, cell, &signal::SIG_A, out).unwrap();
        assert_eq!(done, 3);
    }

    #[test]
    fn deferred_write_preserves_the_value() {
        let mut graph = Graph::new();

        let net = graph.create_network(WireColor::Red);
        let cell = graph.create_cell(net);

        // Claim tick 0 and 1 so the write gets deferred past them
        graph.next_safe_mem_op_tick(0, true).unwrap();

        let value_net = graph.create_network(WireColor::Green);
        let before = graph.entities.len();
        let done = graph.set_cell(0, value_net, &signal::SIG_I, cell).unwrap();

        assert_eq!(done, 3);

        // Two preservation stages carry the value from tick 0 to tick 2
        let stages = graph
            .entities
            .ids()
            .skip(before)
            .filter(|id| {
                matches!(&graph.entities[*id].kind, EntityKind::Arithmetic(b)
                    if b.first_signal == &signal::SIG_I
                        && b.operation == ArithmeticOperation::Multiply
                        && b.second == Operand::Signal(&signal::CHECK))
            })
            .count();

        assert_eq!(stages, 2);
    }

    #[test]
    fn merge_moves_members_and_rebinds() {
        let mut graph = Graph::new();

        let a = graph.create_network(WireColor::Green);
        let b = graph.create_network(WireColor::Green);

        let e = graph.emitter(vec![]);
        graph.connect_output(b, e);

        graph.merge(a, b);

        assert_eq!(graph.networks[a].members.len(), 1);
        assert!(graph.networks[b].members.is_empty());
        assert_eq!(graph.entities[e].primary.green_net, Some(a));
    }
}
