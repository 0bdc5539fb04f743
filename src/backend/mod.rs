//! The back end: lowers the typed IR to a combinator graph, places the graph
//! on the plot, and encodes the result as a portable blueprint string.

use std::io;

use thiserror::Error;

use crate::middle::ir::Module;

pub mod blueprint;
pub mod entity;
pub mod geometry;
pub mod graph;
pub mod lower;
pub mod placer;
pub mod plot;
pub mod signal;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Lowering(#[from] lower::LoweringError),
    #[error(transparent)]
    Placement(#[from] placer::PlaceError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The placed form of a compiled module, ready for encoding.
pub struct CompiledModule {
    pub graph: graph::Graph,
    pub plot: plot::Plot,
}

/// Lowers and places a module.
pub fn compile_module(module: &Module) -> Result<CompiledModule, CompileError> {
    let mut graph = lower::lower_module(module)?;
    let mut plot = placer::place(&mut graph)?;

    plot.ensure_outer_power(&mut graph.entities);

    Ok(CompiledModule { graph, plot })
}

impl CompiledModule {
    /// Encodes the blueprint into `out`.
    pub fn save<W: io::Write>(&self, out: W) -> io::Result<()> {
        blueprint::write_blueprint(&self.graph.entities, &self.plot, out)
    }

    /// The raw blueprint JSON, pre-encoding.
    pub fn to_json(&self) -> serde_json::Value {
        blueprint::to_json(&self.graph.entities, &self.plot)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{blueprint, compile_module, CompiledModule};
    use crate::{
        frontend::{parser::Parser, SourceFile, SourceFileOrigin},
        middle::sema,
    };

    fn compile(contents: &str) -> CompiledModule {
        let source = SourceFile {
            contents: contents.to_owned(),
            origin: SourceFileOrigin::Memory,
        };
        let ast = Parser::parse_module(&source).expect("parsing failed");
        let module = sema::analyze(&ast).expect("analysis failed");
        compile_module(&module).expect("compilation failed")
    }

    #[test]
    fn empty_main_is_just_the_hub() {
        let compiled = compile("func main() {}");
        let value = compiled.to_json();

        let entities = value["blueprint"]["entities"].as_array().unwrap();
        assert_eq!(entities.len(), 3);
        assert_eq!(entities[0]["name"], "roboport");
        assert_eq!(entities[1]["name"], "substation");
        assert_eq!(entities[2]["name"], "substation");
    }

    #[test]
    fn round_trip_matches_placement() {
        let compiled = compile("var a int32 = 42\nfunc main() {\n  a = a + 1\n}");

        let mut bytes = Vec::new();
        compiled.save(&mut bytes).unwrap();

        let decoded = blueprint::decode(&bytes).unwrap();
        let entities = decoded["blueprint"]["entities"].as_array().unwrap();

        assert_eq!(entities.len(), compiled.plot.placements.len());

        // Ids are unique
        let mut numbers: Vec<u64> = entities
            .iter()
            .map(|e| e["entity_number"].as_u64().unwrap())
            .collect();
        let total = numbers.len();
        numbers.sort_unstable();
        numbers.dedup();
        assert_eq!(numbers.len(), total);
    }

    #[test]
    fn deterministic_compilation() {
        let source = "var a int32 = 7\nvar b int32 = 9\nfunc main() {\n  a = a * b + 2\n  if a > 60 {\n    b = 0\n  }\n}";

        let mut first = Vec::new();
        compile(source).save(&mut first).unwrap();

        let mut second = Vec::new();
        compile(source).save(&mut second).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn every_combinator_is_powered() {
        let compiled = compile(
            "var a int32 = 1\nvar b int32 = 2\nfunc main() {\n  a = a + b\n  b = a * 3\n  a = b - a\n}",
        );

        let arena = &compiled.graph.entities;

        let substations: Vec<_> = compiled
            .plot
            .placements
            .iter()
            .filter(|id| {
                matches!(
                    arena[**id].kind,
                    super::entity::EntityKind::Substation { .. }
                )
            })
            .collect();

        for id in &compiled.plot.placements {
            if !arena[*id].kind.has_connectors() {
                continue;
            }

            let pos = arena[*id].position.unwrap();

            let powered = substations.iter().any(|s| {
                let supply = arena[**s].position.unwrap().bounds(9.0, 9.0);
                supply.contains(pos)
            });

            assert!(powered, "combinator at {pos:?} is outside every supply area");
        }
    }

    #[test]
    fn if_else_compiles_end_to_end() {
        let compiled = compile(
            "var a int32 = 0\nvar c int32 = 1\nfunc main() {\n  if c {\n    a = 5\n  } else {\n    a = 9\n  }\n}",
        );

        let value = compiled.to_json();
        let entities = value["blueprint"]["entities"].as_array().unwrap();

        // Both branch gates are present in the output
        let gates = entities
            .iter()
            .filter(|e| {
                e["control_behavior"]["decider_conditions"]["first_signal"]["name"] == "signal-C"
            })
            .count();

        assert_eq!(gates, 2);
    }
}
