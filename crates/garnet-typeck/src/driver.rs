//! The deferred-node fixpoint loop.
//!
//! After the first top-down pass, deferred nodes are retried cycle by cycle.
//! The number of counted cycles is bounded by the initial deferred count plus
//! one; a cycle that leaves the deferred set unchanged is a stall. Before
//! giving up, one extra pass runs with pending declarations no longer
//! blocking call resolution.
//!
//! A strict run stops at the stall and reports every unresolved node. A
//! best-effort run instead poisons the first node that still defers and
//! keeps going, then poisons whatever is left once the loop ends, so every
//! node ends up with a type.

use serde::Serialize;
use tracing::{debug, info};

use crate::ast::NodeId;
use crate::engine::Engine;
use crate::error::{CompileFailure, UnresolvedNode};

/// Where the driver stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverState {
    Running,
    /// Every node resolved.
    Converged,
    /// The loop made no progress. In best-effort mode the stuck nodes were
    /// typed as errors.
    Stalled,
    /// Stalled in strict mode.
    Failed,
}

impl Engine {
    /// Type the tree under `root` to a fixpoint.
    pub fn resolve(&mut self, root: NodeId, strict: bool) -> Result<DriverState, CompileFailure> {
        self.state = DriverState::Running;
        self.declare_root(root);
        self.infer(root, true);

        let bound = self.deferred.len() + 1;
        let mut cycles = 0;
        let mut gave_up = false;
        debug!(deferred = self.deferred.len(), bound, "initial pass done");

        while self.state == DriverState::Running {
            if self.deferred.is_empty() {
                self.state = if gave_up { DriverState::Stalled } else { DriverState::Converged };
                break;
            }
            if cycles >= bound {
                self.state = DriverState::Stalled;
                break;
            }
            let before = self.deferred_ids().clone();
            self.run_cycle();
            if self.deferred_ids() != &before {
                cycles += 1;
                debug!(cycle = cycles, deferred = self.deferred.len(), "cycle done");
                continue;
            }
            if self.options.last_chance && !self.last_chance {
                debug!(deferred = self.deferred.len(), "no progress, last chance pass");
                self.last_chance = true;
                self.run_cycle();
                if self.deferred_ids() != &before {
                    continue;
                }
            }
            if !strict {
                debug!(deferred = self.deferred.len(), "no progress, poisoning the first stuck node");
                self.error_next = true;
                self.run_cycle();
                let poisoned = !self.error_next;
                self.error_next = false;
                if poisoned {
                    gave_up = true;
                    continue;
                }
            }
            self.state = DriverState::Stalled;
        }

        if self.state == DriverState::Stalled {
            if strict {
                self.state = DriverState::Failed;
                let failure = self.compile_failure();
                info!(unresolved = failure.unresolved.len(), "type inference failed");
                return Err(failure);
            }
            for id in self.take_deferred() {
                let id = self.ast.current(id);
                if !self.ast.is_resolved(id) {
                    self.give_up(id);
                }
            }
        }
        info!(state = ?self.state, cycles, errors = self.errors.len(), "type inference done");
        Ok(self.state)
    }

    /// Re-infer every deferred node once.
    fn run_cycle(&mut self) {
        for id in self.take_deferred() {
            let id = self.ast.current(id);
            if self.ast.is_resolved(id) {
                continue;
            }
            let expression = self.ast.is_expression(id);
            self.infer(id, expression);
        }
        self.prune_deferred();
    }

    /// Describe every node still unresolved, with its ancestor chain.
    pub(crate) fn compile_failure(&self) -> CompileFailure {
        let unresolved = self
            .deferred
            .iter()
            .map(|id| {
                let id = self.ast.current(*id);
                UnresolvedNode {
                    description: self.ast.describe(id),
                    span: self.ast.span(id),
                    ancestors: self.ast.ancestors(id).into_iter().map(|a| self.ast.describe(a)).collect(),
                }
            })
            .collect();
        CompileFailure { unresolved }
    }
}
