//! Macro expansion.
//!
//! A macro is declared on a type like a method (name plus parameter types)
//! and competes with methods during member resolution. When a call binds to
//! a macro, the registered [`MacroExpander`] builds a replacement subtree in
//! the same [`Ast`]; the engine swaps it into the call's parent slot and
//! infers it in the call's place.

use std::fmt;
use std::rc::Rc;

use garnet_common::Span;
use rustc_hash::FxHashMap;

use crate::ast::{Ast, NodeId, NodeKind};
use crate::context::{TypeContext, OBJECT};
use crate::member::Visibility;
use crate::tables::{MacroSig, SymbolTables};
use crate::ty::{Prim, Ty};

/// The call site handed to an expander.
#[derive(Clone, Debug, PartialEq)]
pub struct MacroCall {
    pub node: NodeId,
    pub name: String,
    /// Explicit receiver, `None` for self calls.
    pub target: Option<NodeId>,
    pub args: Vec<NodeId>,
    pub block: Option<NodeId>,
    pub span: Span,
}

impl MacroCall {
    pub(crate) fn from_node(ast: &Ast, node: NodeId) -> Option<MacroCall> {
        let span = ast.span(node);
        match ast.kind(node) {
            NodeKind::Call { target, name, args, block } => Some(MacroCall {
                node,
                name: name.clone(),
                target: Some(*target),
                args: args.clone(),
                block: *block,
                span,
            }),
            NodeKind::SelfCall { name, args, block } => Some(MacroCall {
                node,
                name: name.clone(),
                target: None,
                args: args.clone(),
                block: *block,
                span,
            }),
            _ => None,
        }
    }
}

/// Builds the expansion of a macro call.
pub trait MacroExpander {
    /// Allocate the replacement subtree and return its root. The call's
    /// argument nodes may be reused as children of the expansion.
    fn expand(&self, ast: &mut Ast, call: &MacroCall) -> Result<NodeId, String>;
}

impl<F> MacroExpander for F
where
    F: Fn(&mut Ast, &MacroCall) -> Result<NodeId, String>,
{
    fn expand(&self, ast: &mut Ast, call: &MacroCall) -> Result<NodeId, String> {
        self(ast, call)
    }
}

/// Expanders by macro name.
#[derive(Clone, Default)]
pub struct MacroRegistry {
    expanders: FxHashMap<String, Rc<dyn MacroExpander>>,
}

impl fmt::Debug for MacroRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.expanders.keys().collect();
        names.sort();
        f.debug_struct("MacroRegistry").field("expanders", &names).finish()
    }
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the `puts` and `print` expanders.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("puts", |ast: &mut Ast, call: &MacroCall| print_to_stdout(ast, call, "println"));
        registry.register("print", |ast: &mut Ast, call: &MacroCall| print_to_stdout(ast, call, "print"));
        registry
    }

    pub fn register(&mut self, name: &str, expander: impl MacroExpander + 'static) {
        self.expanders.insert(name.to_string(), Rc::new(expander));
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn MacroExpander>> {
        self.expanders.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.expanders.contains_key(name)
    }
}

/// `puts x` becomes `System.out.println(x)`.
fn print_to_stdout(ast: &mut Ast, call: &MacroCall, method: &str) -> Result<NodeId, String> {
    if call.args.len() > 1 {
        return Err(format!("{} takes at most one argument", call.name));
    }
    let system = ast.constant("java.lang.System");
    ast.set_span(system, call.span);
    let out = ast.call(system, "out", Vec::new());
    ast.set_span(out, call.span);
    let print = ast.call(out, method, call.args.clone());
    Ok(ast.set_span(print, call.span))
}

/// Declare the builtin macros' signatures on `java.lang.Object`.
pub fn register_builtin_macros(ctx: &mut TypeContext, tables: &mut SymbolTables) {
    let object = ctx.intern(OBJECT, false, false);
    let mut params: Vec<Vec<Ty>> = vec![vec![object.clone()]];
    params.extend(Prim::ALL.iter().map(|p| vec![Ty::Prim(*p)]));
    for name in ["puts", "print"] {
        for p in &params {
            tables.learn_macro(MacroSig {
                owner: object.clone(),
                name: name.to_string(),
                params: p.clone(),
                visibility: Visibility::Public,
            });
        }
    }
    tables.learn_macro(MacroSig {
        owner: object,
        name: "puts".to_string(),
        params: Vec::new(),
        visibility: Visibility::Public,
    });
}
