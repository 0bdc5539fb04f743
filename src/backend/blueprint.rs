//! The wire format: a `'0'` version byte followed by base64 of zlib of the
//! blueprint JSON. The serde model below mirrors the game's schema field for
//! field; conversion from the entity arena happens right before encoding so
//! the rest of the backend never touches serialization concerns.

use std::io::{self, Write};

use base64::{engine::general_purpose::STANDARD, write::EncoderWriter, Engine};
use flate2::{write::ZlibEncoder, Compression};
use serde::Serialize;

use crate::backend::{
    entity::{Connector, ConstantFilter, EntityArena, EntityId, EntityKind, Operand, Wire},
    geometry::Position,
    plot::Plot,
    signal::{self, Signal},
};

pub const BLUEPRINT_VERSION: u64 = 281479274168320;

#[derive(Debug, Serialize)]
struct Blueprint {
    blueprint: BlueprintData,
}

#[derive(Debug, Serialize)]
struct BlueprintData {
    icons: Vec<BlueprintIcon>,
    entities: Vec<BlueprintEntity>,
    item: &'static str,
    version: u64,
}

#[derive(Debug, Serialize)]
struct BlueprintIcon {
    signal: &'static Signal,
    index: u32,
}

#[derive(Debug, Serialize)]
struct BlueprintEntity {
    entity_number: u32,
    #[serde(skip_serializing_if = "is_zero")]
    direction: u8,
    position: Position,
    name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    connections: Option<Connections>,
    #[serde(skip_serializing_if = "Option::is_none")]
    control_behavior: Option<ControlBehavior>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    neighbours: Vec<u32>,
}

fn is_zero(v: &u8) -> bool {
    *v == 0
}

#[derive(Debug, Serialize)]
struct Connections {
    #[serde(rename = "1", skip_serializing_if = "Option::is_none")]
    primary: Option<ConnectorJson>,
    #[serde(rename = "2", skip_serializing_if = "Option::is_none")]
    secondary: Option<ConnectorJson>,
}

#[derive(Debug, Serialize)]
struct ConnectorJson {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    red: Vec<WireJson>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    green: Vec<WireJson>,
}

#[derive(Debug, Serialize)]
struct WireJson {
    entity_id: u32,
    /// Omitted for the default primary circuit
    #[serde(skip_serializing_if = "Option::is_none")]
    circuit_id: Option<u8>,
}

#[derive(Debug, Default, Serialize)]
struct ControlBehavior {
    #[serde(skip_serializing_if = "Option::is_none")]
    arithmetic_conditions: Option<ArithmeticConditions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    decider_conditions: Option<DeciderConditions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filters: Option<Vec<Filter>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    circuit_condition: Option<CircuitCondition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    use_colors: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ArithmeticConditions {
    first_signal: &'static Signal,
    #[serde(skip_serializing_if = "Option::is_none")]
    second_signal: Option<&'static Signal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    constant: Option<i32>,
    operation: &'static str,
    output_signal: &'static Signal,
}

#[derive(Debug, Serialize)]
struct DeciderConditions {
    first_signal: &'static Signal,
    #[serde(skip_serializing_if = "Option::is_none")]
    constant: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    second_signal: Option<&'static Signal>,
    comparator: &'static str,
    output_signal: &'static Signal,
    copy_count_from_input: bool,
}

#[derive(Debug, Serialize)]
struct CircuitCondition {
    first_signal: &'static Signal,
    #[serde(skip_serializing_if = "Option::is_none")]
    constant: Option<i32>,
    comparator: &'static str,
}

#[derive(Debug, Serialize)]
struct Filter {
    signal: &'static Signal,
    count: i32,
    index: u32,
}

/// Splits an operand the way the wire format wants it: a signal or a
/// constant, with zero constants left to the game's default.
fn split_operand(operand: Operand) -> (Option<&'static Signal>, Option<i32>) {
    match operand {
        Operand::Signal(signal) => (Some(signal), None),
        Operand::Constant(0) => (None, None),
        Operand::Constant(value) => (None, Some(value)),
    }
}

fn wires_json(wires: &[Wire]) -> Vec<WireJson> {
    wires
        .iter()
        .map(|wire| WireJson {
            entity_id: wire.entity_number,
            circuit_id: (wire.circuit != 1).then_some(wire.circuit),
        })
        .collect()
}

fn connector_json(connector: &Connector) -> Option<ConnectorJson> {
    if connector.red.is_empty() && connector.green.is_empty() {
        return None;
    }

    Some(ConnectorJson {
        red: wires_json(&connector.red),
        green: wires_json(&connector.green),
    })
}

fn filters_json(filters: &[ConstantFilter]) -> Vec<Filter> {
    filters
        .iter()
        .enumerate()
        .map(|(i, filter)| Filter {
            signal: filter.signal,
            count: filter.count,
            index: i as u32 + 1,
        })
        .collect()
}

fn entity_json(arena: &EntityArena, id: EntityId) -> BlueprintEntity {
    let entity = &arena[id];

    let connections = match entity.kind.has_connectors() {
        true => {
            let primary = connector_json(&entity.primary);
            let secondary = connector_json(&entity.secondary);

            (primary.is_some() || secondary.is_some()).then_some(Connections { primary, secondary })
        }
        false => None,
    };

    let control_behavior = match &entity.kind {
        EntityKind::Arithmetic(behavior) => {
            let (second_signal, constant) = split_operand(behavior.second);

            Some(ControlBehavior {
                arithmetic_conditions: Some(ArithmeticConditions {
                    first_signal: behavior.first_signal,
                    second_signal,
                    constant,
                    operation: behavior.operation.symbol(),
                    output_signal: behavior.output_signal,
                }),
                ..Default::default()
            })
        }
        EntityKind::Decider(behavior) => {
            let (second_signal, constant) = split_operand(behavior.second);

            Some(ControlBehavior {
                decider_conditions: Some(DeciderConditions {
                    first_signal: behavior.first_signal,
                    constant,
                    second_signal,
                    comparator: behavior.comparator.symbol(),
                    output_signal: behavior.output_signal,
                    copy_count_from_input: behavior.copy_count_from_input,
                }),
                ..Default::default()
            })
        }
        EntityKind::Constant(filters) => Some(ControlBehavior {
            filters: Some(filters_json(filters)),
            ..Default::default()
        }),
        EntityKind::Lamp(behavior) => Some(ControlBehavior {
            circuit_condition: Some(CircuitCondition {
                first_signal: behavior.first_signal,
                constant: (behavior.constant != 0).then_some(behavior.constant),
                comparator: behavior.comparator.symbol(),
            }),
            use_colors: Some(behavior.use_colors),
            ..Default::default()
        }),
        EntityKind::Substation { .. } | EntityKind::Roboport => None,
    };

    let neighbours = match &entity.kind {
        EntityKind::Substation { neighbors } => neighbors
            .iter()
            .map(|peer| {
                arena
                    .assigned_number(*peer)
                    .expect("neighbored substations are numbered")
            })
            .collect(),
        _ => Vec::new(),
    };

    BlueprintEntity {
        entity_number: arena
            .assigned_number(id)
            .expect("placed entities are numbered"),
        direction: entity.direction.value(),
        position: entity.position.expect("placed entities have positions"),
        name: entity.kind.blueprint_name(),
        connections,
        control_behavior,
        neighbours,
    }
}

fn build(arena: &EntityArena, plot: &Plot) -> Blueprint {
    Blueprint {
        blueprint: BlueprintData {
            icons: vec![BlueprintIcon {
                signal: &signal::EVERYTHING,
                index: 1,
            }],
            entities: plot
                .placements
                .iter()
                .map(|id| entity_json(arena, *id))
                .collect(),
            item: "blueprint",
            version: BLUEPRINT_VERSION,
        },
    }
}

/// The raw (uncompressed) blueprint JSON, for `-e json` debugging.
pub fn to_json(arena: &EntityArena, plot: &Plot) -> serde_json::Value {
    serde_json::to_value(build(arena, plot)).expect("blueprint model serializes")
}

/// Writes the encoded blueprint: version byte, then base64 of zlib of JSON.
/// The encoder stack is finalized innermost-first.
pub fn write_blueprint<W: Write>(arena: &EntityArena, plot: &Plot, mut out: W) -> io::Result<()> {
    out.write_all(b"0")?;

    let base64 = EncoderWriter::new(&mut out, &STANDARD);
    let mut zlib = ZlibEncoder::new(base64, Compression::default());

    serde_json::to_writer(&mut zlib, &build(arena, plot)).map_err(io::Error::from)?;

    let mut base64 = zlib.finish()?;
    base64.finish()?;

    Ok(())
}

/// Decodes an encoded blueprint back to its JSON payload, reversing
/// [`write_blueprint`].
pub fn decode(data: &[u8]) -> io::Result<serde_json::Value> {
    let payload = data
        .strip_prefix(b"0")
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing version prefix"))?;

    let compressed = STANDARD
        .decode(payload)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let decoder = flate2::read::ZlibDecoder::new(compressed.as_slice());

    serde_json::from_reader(decoder).map_err(io::Error::from)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::backend::{graph::Graph, placer};

    fn empty_build() -> (Graph, Plot) {
        let mut graph = Graph::new();
        let plot = placer::place(&mut graph).unwrap();
        (graph, plot)
    }

    #[test]
    fn empty_build_decodes_to_hub_and_substations() {
        let (graph, plot) = empty_build();

        let mut bytes = Vec::new();
        write_blueprint(&graph.entities, &plot, &mut bytes).unwrap();

        assert_eq!(bytes[0], b'0');

        let value = decode(&bytes).unwrap();
        let blueprint = &value["blueprint"];

        assert_eq!(blueprint["item"], "blueprint");
        assert_eq!(blueprint["version"].as_u64(), Some(BLUEPRINT_VERSION));
        assert_eq!(
            blueprint["icons"][0]["signal"]["name"],
            "signal-everything"
        );

        let entities = blueprint["entities"].as_array().unwrap();
        assert_eq!(entities.len(), 3);

        assert_eq!(entities[0]["name"], "roboport");
        assert_eq!(entities[0]["position"]["x"].as_f64(), Some(0.0));
        assert_eq!(entities[0]["position"]["y"].as_f64(), Some(0.0));

        assert_eq!(entities[1]["name"], "substation");
        assert_eq!(entities[1]["position"]["y"].as_f64(), Some(3.0));
        assert_eq!(entities[2]["position"]["y"].as_f64(), Some(-3.0));

        // Mutual neighbors by entity number
        let first = entities[1]["entity_number"].as_u64().unwrap();
        let second = entities[2]["entity_number"].as_u64().unwrap();
        assert_eq!(entities[1]["neighbours"][0].as_u64(), Some(second));
        assert_eq!(entities[2]["neighbours"][0].as_u64(), Some(first));
    }

    #[test]
    fn entity_numbers_are_unique_and_contiguous_from_one() {
        let (graph, plot) = empty_build();
        let value = to_json(&graph.entities, &plot);

        let mut numbers: Vec<u64> = value["blueprint"]["entities"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["entity_number"].as_u64().unwrap())
            .collect();
        numbers.sort_unstable();

        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn encoding_is_deterministic() {
        let (graph, plot) = empty_build();

        let mut first = Vec::new();
        write_blueprint(&graph.entities, &plot, &mut first).unwrap();

        let mut second = Vec::new();
        write_blueprint(&graph.entities, &plot, &mut second).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn lamp_control_behavior_shape() {
        use crate::backend::{
            entity::{Comparator, EntityKind, LampBehavior},
            geometry::{Direction, Position},
        };

        let mut graph = Graph::new();
        let mut plot = Plot::bootstrap(&mut graph.entities);

        let lamp = graph.entities.create(EntityKind::Lamp(LampBehavior {
            first_signal: &signal::SIG_A,
            comparator: Comparator::Gt,
            constant: 0,
            use_colors: false,
        }));
        plot.place(
            &mut graph.entities,
            lamp,
            Position::new(4.5, 4.5),
            Direction::North,
        );

        let value = to_json(&graph.entities, &plot);
        let entities = value["blueprint"]["entities"].as_array().unwrap();
        let lamp_json = entities.iter().find(|e| e["name"] == "lamp").unwrap();

        assert_eq!(
            lamp_json["control_behavior"]["circuit_condition"]["first_signal"]["name"],
            "signal-A"
        );
        assert_eq!(
            lamp_json["control_behavior"]["circuit_condition"]["comparator"],
            ">"
        );
        assert_eq!(lamp_json["control_behavior"]["use_colors"], false);
    }

    #[test]
    fn default_direction_is_omitted() {
        let (graph, plot) = empty_build();
        let value = to_json(&graph.entities, &plot);

        for entity in value["blueprint"]["entities"].as_array().unwrap() {
            assert!(entity.get("direction").is_none());
        }
    }
}
