//! Lowers the typed IR into the logic graph: declarations become memory
//! cells, expressions become chains of combinators on alternating wire
//! colors, and control flow becomes gated control ticks.

use hashbrown::HashMap;
use log::debug;
use thiserror::Error;

use crate::{
    backend::{
        entity::{ArithmeticOperation, Comparator, ConstantFilter, Operand},
        graph::{Cell, Graph, NetworkId, ScheduleError, WireColor},
        signal::{self, Signal},
    },
    middle::ir::{
        BinaryOp, BlockStep, Expression, IfStep, Kind, Module, Step, Ty, UnaryOp, VariableId,
    },
};

#[derive(Debug, Clone, Error)]
pub enum LoweringError {
    #[error("unsupported type for '{name}': {ty} (only int32 is supported)")]
    UnsupportedType { name: String, ty: String },
    #[error("unsupported step: {0}")]
    UnsupportedStep(&'static str),
    #[error("unsupported expression: {0}")]
    UnsupportedExpression(&'static str),
    #[error("module has no 'main' function")]
    MissingMain,
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// Lowers a whole module and returns the finished graph.
pub fn lower_module(module: &Module) -> Result<Graph, LoweringError> {
    let mut lowering = Lowering {
        graph: Graph::new(),
        module,
        cells: HashMap::new(),
    };

    lowering.run()?;

    Ok(lowering.graph)
}

struct Lowering<'ir> {
    graph: Graph,
    module: &'ir Module,
    cells: HashMap<VariableId, Cell>,
}

impl<'ir> Lowering<'ir> {
    fn run(&mut self) -> Result<(), LoweringError> {
        // Bootstrap the tick line before anything schedules against it
        self.graph.get_ticker_network(1, WireColor::Red, false);

        let primary_net = self.graph.create_network(WireColor::Red);

        let mut init_steps = Vec::with_capacity(self.module.declarations.len());

        for declaration in &self.module.declarations {
            let variable = &self.module.variables[declaration.variable];

            self.require_int32(&variable.name, variable.ty)?;

            let cell = self.graph.create_cell(primary_net);
            self.cells.insert(declaration.variable, cell);

            if let Some(value) = &variable.initial_value {
                init_steps.push((cell, value));
            }
        }

        let mut tick = 0;

        for (cell, value) in init_steps {
            let net = self.graph.create_network(WireColor::Green);
            tick = self.extract_value(value, tick, net, &signal::SIG_I)?;
            tick = self.graph.set_cell(tick, net, &signal::SIG_I, cell)?;
        }

        let main = self
            .module
            .lookup_function("main")
            .ok_or(LoweringError::MissingMain)?;

        for step in &self.module.functions[main].steps {
            tick = self.exec_step(step, primary_net, tick)?;
        }

        debug!(
            "lowered module: {} entities, {} networks, {} ticks",
            self.graph.entities.len(),
            self.graph.networks.len(),
            self.graph.tickers.len()
        );

        Ok(())
    }

    fn require_int32(&self, name: &str, ty: Ty) -> Result<(), LoweringError> {
        if ty != Ty::Named(Kind::Int32) {
            return Err(LoweringError::UnsupportedType {
                name: name.to_owned(),
                ty: ty.name(),
            });
        }

        Ok(())
    }

    fn exec_step(
        &mut self,
        step: &Step,
        net: NetworkId,
        tick: usize,
    ) -> Result<usize, LoweringError> {
        match step {
            Step::Declare(declaration) => {
                let variable = &self.module.variables[declaration.variable];
                self.require_int32(&variable.name, variable.ty)?;

                let cell = self.graph.create_cell(net);
                self.cells.insert(declaration.variable, cell);

                let mut tick = tick;

                if let Some(value) = &variable.initial_value {
                    let subnet = self.graph.create_network(WireColor::Green);
                    tick = self.extract_value(value, tick, subnet, &signal::SIG_I)?;
                    tick = self.graph.set_cell(tick, subnet, &signal::SIG_I, cell)?;
                }

                Ok(tick)
            }
            Step::Assign { target, value } => {
                let cell = *self
                    .cells
                    .get(target)
                    .ok_or(LoweringError::UnsupportedStep("assignment to a non-cell"))?;

                let subnet = self.graph.create_network(WireColor::Green);
                let tick = self.extract_value(value, tick, subnet, &signal::SIG_A)?;

                Ok(self.graph.set_cell(tick, subnet, &signal::SIG_A, cell)?)
            }
            Step::Block(block) => self.exec_block(block, net, tick),
            Step::If(if_step) => self.exec_if(
                &if_step.condition,
                &if_step.then_block,
                &if_step.else_ifs,
                if_step.else_block.as_ref(),
                net,
                tick,
            ),
            Step::Return(None) => Ok(tick),
            Step::Return(Some(_)) => Err(LoweringError::UnsupportedStep("returning a value")),
            Step::Call { .. } => Err(LoweringError::UnsupportedStep("function calls")),
        }
    }

    fn exec_block(
        &mut self,
        block: &BlockStep,
        net: NetworkId,
        mut tick: usize,
    ) -> Result<usize, LoweringError> {
        for step in &block.steps {
            tick = self.exec_step(step, net, tick)?;
        }

        Ok(tick)
    }

    /// Gates a branch behind its condition. Two deciders watch the condition
    /// network on the post-condition tick: `C ≠ 0` fires the branch ticker,
    /// `C == 0` fires whatever runs when the branch is skipped (the next
    /// alternative, or the convergence ticker directly).
    fn exec_if(
        &mut self,
        condition: &Expression,
        then_block: &BlockStep,
        else_ifs: &[IfStep],
        else_block: Option<&BlockStep>,
        net: NetworkId,
        tick: usize,
    ) -> Result<usize, LoweringError> {
        let cond_net = self.graph.create_network(WireColor::Green);
        let tick = self.extract_value(condition, tick, cond_net, &signal::SIG_C)?;

        let gate_color = self.graph.color(cond_net).opposite();
        let gate_net = self
            .graph
            .get_ticker_network(tick, gate_color, false)
            .expect("ticker chain extension cannot fail");

        let (branch_tick, _, branch_start) = self.graph.add_control_tick(gate_color);

        let taken = self.graph.decider(
            &signal::SIG_C,
            Operand::Constant(0),
            Comparator::Ne,
            &signal::CHECK,
            true,
        );
        let skipped = self.graph.decider(
            &signal::SIG_C,
            Operand::Constant(0),
            Comparator::Eq,
            &signal::CHECK,
            true,
        );

        self.graph.connect_input(cond_net, taken);
        self.graph.connect_input(cond_net, skipped);
        self.graph.connect_input(gate_net, taken);
        self.graph.connect_input(gate_net, skipped);
        self.graph.connect_output(branch_start, taken);

        self.exec_block(then_block, net, branch_tick)?;
        let then_exit = self.graph.tickers.len() - 1;

        if else_ifs.is_empty() && else_block.is_none() {
            // No alternative: the skip path goes straight to convergence
            let (conv_tick, _, conv_in) = self.graph.add_control_tick(gate_color);

            self.graph.connect_output(conv_in, skipped);

            let then_chain = self
                .graph
                .get_ticker_network(conv_tick - 1, self.graph.color(cond_net), false)
                .expect("ticker chain extension cannot fail");
            let conv_entity = self.graph.tickers[conv_tick].entity;
            self.graph.connect_input(then_chain, conv_entity);

            return Ok(conv_tick);
        }

        // With an alternative, the skip path fires the alternative's ticker
        // instead, and the taken branch bridges over it to convergence.
        let (else_tick, _, else_start) = self.graph.add_control_tick(gate_color);
        self.graph.connect_output(else_start, skipped);

        if let Some((first, rest)) = else_ifs.split_first() {
            self.exec_if(
                &first.condition,
                &first.then_block,
                rest,
                else_block,
                net,
                else_tick,
            )?;
        } else {
            let else_block = else_block.expect("alternative exists");
            self.exec_block(else_block, net, else_tick)?;
        }

        let (conv_tick, _, conv_in) = self.graph.add_control_tick(gate_color);

        // The alternative's exit chains into convergence on the opposite color
        let else_chain = self
            .graph
            .get_ticker_network(conv_tick - 1, self.graph.color(cond_net), false)
            .expect("ticker chain extension cannot fail");
        let conv_entity = self.graph.tickers[conv_tick].entity;
        self.graph.connect_input(else_chain, conv_entity);

        // The taken branch's exit relays onto the convergence input network
        let bridge = self.graph.arithmetic(
            &signal::CHECK,
            Operand::Constant(0),
            ArithmeticOperation::Or,
            &signal::CHECK,
        );
        let then_exit_net = self
            .graph
            .get_ticker_network(then_exit, gate_color, false)
            .expect("ticker chain extension cannot fail");
        self.graph.connect_input(then_exit_net, bridge);
        self.graph.connect_output(conv_in, bridge);

        Ok(conv_tick)
    }

    /// Extracts `expression` so its value rides `dest` as `sink` from the
    /// returned tick onward.
    fn extract_value(
        &mut self,
        expression: &Expression,
        tick: usize,
        dest: NetworkId,
        sink: &'static Signal,
    ) -> Result<usize, LoweringError> {
        match expression {
            Expression::Constant(constant) => {
                let emitter = self.graph.emitter(vec![ConstantFilter {
                    signal: sink,
                    count: constant.value as i32,
                }]);

                self.graph.connect_output(dest, emitter);

                Ok(tick)
            }
            Expression::VariableRef(id) => {
                let cell = *self
                    .cells
                    .get(id)
                    .ok_or(LoweringError::UnsupportedExpression("unresolved variable"))?;

                Ok(self.graph.read_cell(tick, cell, sink, dest)?)
            }
            Expression::Unary { op, operand } => match op {
                UnaryOp::Plus => self.extract_value(operand, tick, dest, sink),
                UnaryOp::Negate => {
                    let subnet = self.graph.create_subnet(dest);
                    let negate = self.graph.arithmetic(
                        &signal::SIG_S,
                        Operand::Constant(-1),
                        ArithmeticOperation::Multiply,
                        sink,
                    );
                    self.graph.connect_input(subnet, negate);
                    self.graph.connect_output(dest, negate);

                    Ok(self.extract_value(operand, tick, subnet, &signal::SIG_S)? + 1)
                }
                UnaryOp::BitwiseNot => {
                    let subnet = self.graph.create_subnet(dest);
                    let invert = self.graph.arithmetic(
                        &signal::SIG_T,
                        Operand::Constant(-1),
                        ArithmeticOperation::Xor,
                        sink,
                    );
                    self.graph.connect_input(subnet, invert);
                    self.graph.connect_output(dest, invert);

                    Ok(self.extract_value(operand, tick, subnet, &signal::SIG_T)? + 1)
                }
            },
            Expression::Binary { op, left, right } => {
                self.extract_binary(*op, left, right, tick, dest, sink)
            }
            Expression::Call { .. } => {
                Err(LoweringError::UnsupportedExpression("function calls"))
            }
        }
    }

    /// Left and right extract from the same starting tick onto sibling
    /// subnets; the earlier side is preserved forward (or the subnets merged
    /// when they tie), then a single combinator applies the operation.
    fn extract_binary(
        &mut self,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
        tick: usize,
        dest: NetworkId,
        sink: &'static Signal,
    ) -> Result<usize, LoweringError> {
        let left_net = self.graph.create_subnet(dest);
        let right_net = self.graph.create_subnet(dest);

        let left_tick = self.extract_value(left, tick, left_net, &signal::SIG_L)?;
        let right_tick = self.extract_value(right, tick, right_net, &signal::SIG_R)?;

        let (carrier, tick) = if left_tick < right_tick {
            self.graph
                .preserve_until(left_net, right_net, &signal::SIG_L, left_tick, right_tick);
            (right_net, right_tick)
        } else if right_tick < left_tick {
            self.graph
                .preserve_until(right_net, left_net, &signal::SIG_R, right_tick, left_tick);
            (left_net, left_tick)
        } else {
            self.graph.merge(right_net, left_net);
            (right_net, right_tick)
        };

        let combinator = if let Some(comparator) = comparison_for(op) {
            self.graph.decider(
                &signal::SIG_L,
                Operand::Signal(&signal::SIG_R),
                comparator,
                sink,
                false,
            )
        } else {
            self.graph.arithmetic(
                &signal::SIG_L,
                Operand::Signal(&signal::SIG_R),
                arithmetic_for(op),
                sink,
            )
        };

        self.graph.connect_input(carrier, combinator);
        self.graph.connect_output(dest, combinator);

        Ok(tick + 1)
    }
}

fn comparison_for(op: BinaryOp) -> Option<Comparator> {
    Some(match op {
        BinaryOp::Equals => Comparator::Eq,
        BinaryOp::NotEquals => Comparator::Ne,
        BinaryOp::LessThan => Comparator::Lt,
        BinaryOp::LessThanOrEqualTo => Comparator::Le,
        BinaryOp::GreaterThan => Comparator::Gt,
        BinaryOp::GreaterThanOrEqualTo => Comparator::Ge,
        _ => return None,
    })
}

fn arithmetic_for(op: BinaryOp) -> ArithmeticOperation {
    match op {
        BinaryOp::Add => ArithmeticOperation::Add,
        BinaryOp::Subtract => ArithmeticOperation::Subtract,
        BinaryOp::Multiply => ArithmeticOperation::Multiply,
        BinaryOp::Divide => ArithmeticOperation::Divide,
        BinaryOp::Modulus => ArithmeticOperation::Modulus,
        BinaryOp::BitwiseAnd => ArithmeticOperation::And,
        BinaryOp::BitwiseOr => ArithmeticOperation::Or,
        BinaryOp::BitwiseXor => ArithmeticOperation::Xor,
        BinaryOp::ShiftLeft => ArithmeticOperation::ShiftLeft,
        BinaryOp::ShiftRight => ArithmeticOperation::ShiftRight,
        _ => unreachable!("comparisons are handled by comparison_for"),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::lower_module;
    use crate::{
        backend::{
            entity::{Comparator, EntityKind, Operand},
            graph::Graph,
            signal,
        },
        frontend::{parser::Parser, SourceFile, SourceFileOrigin},
        middle::sema,
    };

    fn lower(contents: &str) -> Graph {
        let source = SourceFile {
            contents: contents.to_owned(),
            origin: SourceFileOrigin::Memory,
        };
        let ast = Parser::parse_module(&source).expect("parsing failed");
        let module = sema::analyze(&ast).expect("analysis failed");
        lower_module(&module).expect("lowering failed")
    }

    fn count_kind(graph: &Graph, pred: impl Fn(&EntityKind) -> bool) -> usize {
        graph
            .entities
            .ids()
            .filter(|id| pred(&graph.entities[*id].kind))
            .count()
    }

    #[test]
    fn single_constant_declaration() {
        let graph = lower("var a int32 = 42\nfunc main() {}");

        // One cell: exactly four deciders
        assert_eq!(
            count_kind(&graph, |k| matches!(k, EntityKind::Decider(_))),
            4
        );

        // One constant emitter holding I=42
        let emitters: Vec<_> = graph
            .entities
            .ids()
            .filter_map(|id| match &graph.entities[id].kind {
                EntityKind::Constant(filters) => Some(filters.clone()),
                _ => None,
            })
            .collect();

        assert_eq!(emitters.len(), 1);
        assert_eq!(emitters[0].len(), 1);
        assert_eq!(emitters[0][0].signal, &signal::SIG_I);
        assert_eq!(emitters[0][0].count, 42);

        // Write dispatch multipliers exist: check×id→S and check×I→V
        let dispatches = count_kind(&graph, |k| {
            matches!(k, EntityKind::Arithmetic(b)
                if b.output_signal == &signal::SIG_S && b.second == Operand::Constant(1))
        });
        assert_eq!(dispatches, 1);

        let writes = count_kind(&graph, |k| {
            matches!(k, EntityKind::Arithmetic(b)
                if b.output_signal == &signal::SIG_V
                    && b.second == Operand::Signal(&signal::SIG_I))
        });
        assert_eq!(writes, 1);
    }

    #[test]
    fn binary_op_assignment() {
        // The frontend folds constant operands, so the unfolded shape is
        // built directly: a = 1 + 2.
        let module = unfolded_addition_module();
        let graph = lower_module(&module).expect("lowering failed");

        // Emitters for both operands on their operand signals
        let mut filters: Vec<_> = graph
            .entities
            .ids()
            .filter_map(|id| match &graph.entities[id].kind {
                EntityKind::Constant(filters) => Some((filters[0].signal.name, filters[0].count)),
                _ => None,
            })
            .collect();
        filters.sort_unstable();

        assert_eq!(filters, vec![("signal-L", 1), ("signal-R", 2)]);

        // One adder L+R
        let adders = count_kind(&graph, |k| {
            matches!(k, EntityKind::Arithmetic(b)
                if b.first_signal == &signal::SIG_L
                    && b.second == Operand::Signal(&signal::SIG_R))
        });
        assert_eq!(adders, 1);

        // The assignment writes through signal A
        let writes = count_kind(&graph, |k| {
            matches!(k, EntityKind::Arithmetic(b)
                if b.output_signal == &signal::SIG_V
                    && b.second == Operand::Signal(&signal::SIG_A))
        });
        assert_eq!(writes, 1);
    }

    /// `var a int32` plus `main() { a = 1 + 2 }` with the addition left
    /// unfolded.
    fn unfolded_addition_module() -> crate::middle::ir::Module {
        use crate::{
            index::IndexVec,
            middle::ir::{
                BinaryOp, ConstantValue, Declare, Expression, Function, Kind, Module, Scope, Step,
                Symbol, Ty, Variable,
            },
        };
        use hashbrown::HashMap;

        let mut scopes = IndexVec::new();
        let mut variables = IndexVec::new();
        let mut functions = IndexVec::new();

        let variable = variables.push(Variable {
            name: "a".to_owned(),
            ty: Ty::Named(Kind::Int32),
            initial_value: None,
        });

        let root_scope = scopes.push(Scope {
            parent: None,
            symbols: HashMap::new(),
        });
        let main_scope = scopes.push(Scope {
            parent: Some(root_scope),
            symbols: HashMap::new(),
        });

        let constant = |value: i64| {
            Box::new(Expression::Constant(ConstantValue {
                value,
                ty: Ty::untyped(value),
            }))
        };

        let main = functions.push(Function {
            name: "main".to_owned(),
            scope: main_scope,
            steps: vec![Step::Assign {
                target: variable,
                value: Expression::Binary {
                    op: BinaryOp::Add,
                    left: constant(1),
                    right: constant(2),
                },
            }],
            returns: None,
        });

        scopes[root_scope]
            .symbols
            .insert("a".to_owned(), Symbol::Variable(variable));
        scopes[root_scope]
            .symbols
            .insert("main".to_owned(), Symbol::Function(main));

        Module {
            scopes,
            variables,
            functions,
            root_scope,
            declarations: vec![Declare {
                name: "a".to_owned(),
                variable,
            }],
            exports: Vec::new(),
        }
    }

    #[test]
    fn comparison_lowers_to_fixed_output_decider() {
        let graph = lower("var a int32 = 0\nvar b int32 = 0\nfunc main() {\n  a = a < b\n}");

        let comparisons = graph
            .entities
            .ids()
            .filter(|id| {
                matches!(&graph.entities[*id].kind, EntityKind::Decider(b)
                    if b.comparator == Comparator::Lt && !b.copy_count_from_input)
            })
            .count();

        assert_eq!(comparisons, 1);
    }

    #[test]
    fn if_else_produces_gate_pair() {
        let graph = lower(
            "var a int32 = 0\nvar c int32 = 0\nfunc main() {\n  if c {\n    a = 5\n  } else {\n    a = 9\n  }\n}",
        );

        let gates_ne = count_kind(&graph, |k| {
            matches!(k, EntityKind::Decider(b)
                if b.first_signal == &signal::SIG_C
                    && b.comparator == Comparator::Ne
                    && b.output_signal == &signal::CHECK)
        });
        let gates_eq = count_kind(&graph, |k| {
            matches!(k, EntityKind::Decider(b)
                if b.first_signal == &signal::SIG_C
                    && b.comparator == Comparator::Eq
                    && b.output_signal == &signal::CHECK)
        });

        assert_eq!(gates_ne, 1);
        assert_eq!(gates_eq, 1);
    }

    #[test]
    fn non_int32_declaration_is_rejected() {
        let source = SourceFile {
            contents: "var a int64 = 1\nfunc main() {}".to_owned(),
            origin: SourceFileOrigin::Memory,
        };
        let ast = Parser::parse_module(&source).unwrap();
        let module = sema::analyze(&ast).unwrap();

        let error = lower_module(&module).unwrap_err();
        assert!(error.to_string().contains("only int32"));
    }

    #[test]
    fn nested_expression_ticks_advance() {
        // A read (3 ticks) on one side forces preservation of the constant
        // side; the result lands one tick later.
        let graph = lower("var a int32 = 1\nfunc main() {\n  a = a + 2\n}");

        // Preservation stages carry L or R across the imbalance
        let preserved = count_kind(&graph, |k| {
            matches!(k, EntityKind::Arithmetic(b)
                if b.second == Operand::Signal(&signal::CHECK)
                    && (b.first_signal == &signal::SIG_L || b.first_signal == &signal::SIG_R))
        });

        assert!(preserved > 0, "expected preservation stages");
    }
}
