//! Garnet type checker: deferred fixpoint inference over a JVM-style class
//! model.
//!
//! Garnet source looks dynamic but compiles to statically typed bytecode.
//! This crate assigns a type to every node of a script's AST. Inference is
//! pull-based: a node whose dependencies are not known yet is deferred, and
//! the driver retries deferred nodes until nothing changes. Along the way it
//! resolves every call site to a concrete member, using Java-style overload
//! selection.
//!
//! # Architecture
//!
//! - [`ty`]: type representation, primitives, widening
//! - [`context`]: the class table (platform classes plus declared ones)
//! - [`builtins`]: `java.lang`, `java.io` and `java.util` classes
//! - [`ast`]: the arena tree the checker annotates
//! - [`scope`]: lexical scopes, captures, imports
//! - [`tables`]: learned local, field, method and macro types
//! - [`lookup`]: overload resolution and member binding
//! - [`macros`]: macro expanders
//! - [`engine`], [`infer`]: the per-node inference protocol and its rules
//! - [`driver`]: the fixpoint loop
//! - [`error`], [`diagnostics`]: type errors and their rendering

pub mod ast;
pub mod builtins;
pub mod context;
pub mod diagnostics;
pub mod driver;
pub mod engine;
pub mod error;
mod infer;
pub mod lookup;
pub mod macros;
pub mod member;
pub mod scope;
pub mod tables;
pub mod ty;

use garnet_common::Diagnostic;
use serde::{Deserialize, Serialize};
use tracing::debug_span;

use crate::ast::{Ast, NodeId};
use crate::context::TypeContext;
use crate::diagnostics::{render_diagnostic, DiagnosticOptions};
use crate::driver::DriverState;
use crate::engine::Engine;
use crate::error::{CompileFailure, InternalError, TypeError};
use crate::macros::MacroRegistry;
use crate::member::MemberDescriptor;
use crate::scope::{ScopeId, Scopes};
use crate::tables::SymbolTables;
use crate::ty::Ty;

/// Checker configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeckOptions {
    /// Fail with a [`CompileFailure`] when the driver stalls.
    pub strict: bool,
    /// Name of the class that holds top-level script code.
    pub script_class: String,
    /// Run one extra pass, ignoring pending declarations, before stalling.
    pub last_chance: bool,
}

impl Default for TypeckOptions {
    fn default() -> Self {
        TypeckOptions {
            strict: true,
            script_class: "Script".to_string(),
            last_chance: true,
        }
    }
}

impl TypeckOptions {
    /// Read options from JSON; missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Everything the checker learned about one script.
pub struct TypeckResult {
    pub ast: Ast,
    pub root: NodeId,
    /// Hard type errors, in the order they were found.
    pub errors: Vec<TypeError>,
    pub internal_errors: Vec<InternalError>,
    pub state: DriverState,
    /// Set when the strict driver stalled.
    pub failure: Option<CompileFailure>,
    pub ctx: TypeContext,
    pub tables: SymbolTables,
    pub scopes: Scopes,
    /// The type of the script body, if it resolved.
    pub result_type: Option<Ty>,
}

impl TypeckResult {
    pub fn converged(&self) -> bool {
        self.state == DriverState::Converged
    }

    /// Queries are only meaningful once every node has its final type.
    fn require_converged(&self, id: NodeId) -> Result<NodeId, InternalError> {
        let id = self.ast.current(id);
        if self.converged() {
            Ok(id)
        } else {
            Err(InternalError::NotConverged { node: self.ast.describe(id) })
        }
    }

    /// The final type of `id` (or of the node that replaced it).
    pub fn resolved_type(&self, id: NodeId) -> Result<&Ty, InternalError> {
        let id = self.require_converged(id)?;
        self.ast
            .ty(id)
            .ok_or_else(|| InternalError::Unresolved { node: self.ast.describe(id) })
    }

    /// The member a call site was bound to.
    pub fn member(&self, id: NodeId) -> Option<MemberDescriptor> {
        self.ast.member(self.ast.current(id)).map(MemberDescriptor::from)
    }

    /// Like [`TypeckResult::member`], but an error before convergence or for
    /// a node that is not a bound call.
    pub fn member_descriptor(&self, id: NodeId) -> Result<MemberDescriptor, InternalError> {
        let id = self.require_converged(id)?;
        self.ast
            .member(id)
            .map(MemberDescriptor::from)
            .ok_or_else(|| InternalError::Unresolved { node: self.ast.describe(id) })
    }

    /// The innermost scope `id` is evaluated in.
    pub fn scope_of(&self, id: NodeId) -> Result<ScopeId, InternalError> {
        let id = self.require_converged(id)?;
        self.ast
            .ancestors(id)
            .into_iter()
            .find_map(|ancestor| self.scopes.scope_of_node(ancestor))
            .or_else(|| self.scopes.scope_of_node(id))
            .ok_or_else(|| InternalError::Unresolved { node: self.ast.describe(id) })
    }

    /// Type of a top-level script local.
    pub fn script_local(&self, name: &str) -> Option<&Ty> {
        let scope = self.scopes.scope_of_node(self.root)?;
        self.tables.local_type(scope, name)
    }

    /// Errors and unresolved nodes as plain diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut out: Vec<Diagnostic> = self.errors.iter().map(TypeError::to_diagnostic).collect();
        if let Some(failure) = &self.failure {
            for node in &failure.unresolved {
                out.push(Diagnostic::error(format!("could not infer typing for {}", node.description), node.span));
            }
        }
        out
    }

    pub fn diagnostics_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.diagnostics())
    }

    /// Render every type error with ariadne.
    pub fn render_errors(&self, source: &str, filename: &str, options: &DiagnosticOptions) -> Vec<String> {
        self.errors
            .iter()
            .map(|err| render_diagnostic(err, source, filename, options))
            .collect()
    }
}

/// Type-check a script with the built-in macros.
pub fn check(ast: Ast, root: NodeId, options: &TypeckOptions) -> TypeckResult {
    check_with_macros(ast, root, options, MacroRegistry::with_builtins())
}

/// Type-check a script with a caller-supplied macro registry.
pub fn check_with_macros(ast: Ast, root: NodeId, options: &TypeckOptions, macros: MacroRegistry) -> TypeckResult {
    let _span = debug_span!("typeck", script = %options.script_class).entered();
    let mut engine = Engine::new(ast, options.clone(), macros);
    let failure = engine.resolve(root, options.strict).err();
    let state = engine.state;
    let result_type = engine.ast.ty(engine.ast.current(root)).cloned();
    let Engine { ctx, ast, scopes, tables, errors, internal, .. } = engine;
    TypeckResult {
        ast,
        root,
        errors,
        internal_errors: internal,
        state,
        failure,
        ctx,
        tables,
        scopes,
        result_type,
    }
}
