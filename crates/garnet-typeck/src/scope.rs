//! Lexical scopes.
//!
//! Scopes are created once, when the checker first sees a scope-introducing
//! node, and kept in an arena for the whole run so that a node revisited on
//! a later pass finds the same scope again. Method and class bodies are hard
//! scopes: locals never leak across them. Closures and rescue clauses are
//! soft: they see, and may capture, the locals of their lexical parent.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::NodeId;
use crate::context::{ClassInfo, TypeContext};
use crate::ty::Ty;

/// Index of a scope in [`Scopes`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Script,
    Class,
    Method,
    Closure,
    Rescue,
}

impl ScopeKind {
    /// Whether locals of the parent are visible inside.
    pub fn is_soft(self) -> bool {
        matches!(self, ScopeKind::Closure | ScopeKind::Rescue)
    }
}

#[derive(Clone, Debug)]
pub struct Scope {
    pub node: NodeId,
    pub kind: ScopeKind,
    parent: Option<ScopeId>,
    self_type: Option<Ty>,
    locals: Vec<String>,
    declared: FxHashSet<String>,
    captured: FxHashSet<String>,
    imports: FxHashMap<String, String>,
    packages: Vec<String>,
    package: Option<String>,
    binding_type: Option<Ty>,
}

impl Scope {
    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    /// Names declared directly in this scope, in declaration order.
    pub fn locals(&self) -> &[String] {
        &self.locals
    }

    pub fn has_local(&self, name: &str) -> bool {
        self.declared.contains(name)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Scopes {
    scopes: Vec<Scope>,
    by_node: FxHashMap<NodeId, ScopeId>,
    bindings: u32,
}

impl Scopes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the scope introduced by `node`, or return the existing one.
    pub fn enter(&mut self, node: NodeId, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        if let Some(id) = self.by_node.get(&node) {
            return *id;
        }
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            node,
            kind,
            parent,
            self_type: None,
            locals: Vec::new(),
            declared: FxHashSet::default(),
            captured: FxHashSet::default(),
            imports: FxHashMap::default(),
            packages: Vec::new(),
            package: None,
            binding_type: None,
        });
        self.by_node.insert(node, id);
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn scope_of_node(&self, node: NodeId) -> Option<ScopeId> {
        self.by_node.get(&node).copied()
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.get(id).parent
    }

    /// The parent whose locals are visible from `id`, if any.
    fn lexical_parent(&self, id: ScopeId) -> Option<ScopeId> {
        let scope = self.get(id);
        if scope.kind.is_soft() {
            scope.parent
        } else {
            None
        }
    }

    // ── Self type ──────────────────────────────────────────────────────

    pub fn set_self_type(&mut self, id: ScopeId, ty: Ty) {
        self.get_mut(id).self_type = Some(ty);
    }

    /// The type of `self`, inherited from the nearest scope that sets one.
    pub fn self_type(&self, id: ScopeId) -> Option<Ty> {
        let mut cur = Some(id);
        while let Some(s) = cur {
            if let Some(ty) = &self.get(s).self_type {
                return Some(ty.clone());
            }
            cur = self.parent(s);
        }
        None
    }

    // ── Locals ─────────────────────────────────────────────────────────

    /// Declare `name` directly in `id`, shadowing any outer local.
    pub fn declare(&mut self, id: ScopeId, name: &str) {
        let scope = self.get_mut(id);
        if scope.declared.insert(name.to_string()) {
            scope.locals.push(name.to_string());
        }
    }

    /// Whether `name` is visible from `id`.
    pub fn has_local(&self, id: ScopeId, name: &str) -> bool {
        self.lookup_scope(id, name).is_some()
    }

    fn lookup_scope(&self, id: ScopeId, name: &str) -> Option<ScopeId> {
        let mut cur = Some(id);
        while let Some(s) = cur {
            if self.get(s).declared.contains(name) {
                return Some(s);
            }
            cur = self.lexical_parent(s);
        }
        None
    }

    /// The scope that owns `name` as seen from `id`: the nearest declaring
    /// scope along soft edges, or `id` itself for a fresh name.
    pub fn containing_scope(&self, id: ScopeId, name: &str) -> ScopeId {
        self.lookup_scope(id, name).unwrap_or(id)
    }

    /// Record a use of `name` from `id`. A use that crosses a closure
    /// boundary marks the owning local as captured.
    pub fn note_use(&mut self, id: ScopeId, name: &str) {
        let Some(owner) = self.lookup_scope(id, name) else {
            return;
        };
        if owner == id {
            return;
        }
        let mut crosses = false;
        let mut cur = Some(id);
        while let Some(s) = cur {
            if s == owner {
                break;
            }
            if self.get(s).kind == ScopeKind::Closure {
                crosses = true;
            }
            cur = self.lexical_parent(s);
        }
        if crosses {
            self.get_mut(owner).captured.insert(name.to_string());
        }
    }

    pub fn is_captured(&self, id: ScopeId, name: &str) -> bool {
        let owner = self.containing_scope(id, name);
        self.get(owner).captured.contains(name)
    }

    /// Captured locals of `id`, sorted by name.
    pub fn captured(&self, id: ScopeId) -> Vec<String> {
        let mut names: Vec<String> = self.get(id).captured.iter().cloned().collect();
        names.sort();
        names
    }

    /// The nearest enclosing hard scope (method, class or script body).
    pub fn hard_scope(&self, id: ScopeId) -> ScopeId {
        let mut cur = id;
        while let Some(p) = self.lexical_parent(cur) {
            cur = p;
        }
        cur
    }

    /// The synthesized class holding captured locals for closures created
    /// under `id`. Allocated on first request, then stable.
    pub fn binding_type(&mut self, id: ScopeId, ctx: &mut TypeContext) -> Ty {
        let owner = self.hard_scope(id);
        if let Some(ty) = &self.get(owner).binding_type {
            return ty.clone();
        }
        let base = self
            .self_type(owner)
            .and_then(|t| t.class_name().map(str::to_string))
            .unwrap_or_else(|| "Script".to_string());
        let name = format!("{}$Binding{}", base, self.bindings);
        self.bindings += 1;
        let object = ctx.object();
        let mut info = ClassInfo::new(name.clone()).extends(object);
        info.user_defined = true;
        let ty = ctx.declare_class(info);
        self.get_mut(owner).binding_type = Some(ty.clone());
        ty
    }

    pub fn has_binding(&self, id: ScopeId) -> bool {
        self.get(self.hard_scope(id)).binding_type.is_some()
    }

    // ── Imports ────────────────────────────────────────────────────────

    /// Record `import full as short`. A short name of `*` adds `full` as a
    /// wildcard search package.
    pub fn import(&mut self, id: ScopeId, full: &str, short: &str) {
        let scope = self.get_mut(id);
        if short == "*" {
            if !scope.packages.iter().any(|p| p == full) {
                scope.packages.push(full.to_string());
            }
        } else if full != short {
            scope.imports.insert(short.to_string(), full.to_string());
        }
    }

    pub fn set_package(&mut self, id: ScopeId, package: &str) {
        self.get_mut(id).package = Some(package.to_string());
    }

    pub fn package(&self, id: ScopeId) -> Option<&str> {
        let mut cur = Some(id);
        while let Some(s) = cur {
            if let Some(p) = self.get(s).package.as_deref() {
                return Some(p);
            }
            cur = self.parent(s);
        }
        None
    }

    /// Aliases visible from `id`; inner imports win.
    pub fn imports(&self, id: ScopeId) -> FxHashMap<String, String> {
        let mut chain = Vec::new();
        let mut cur = Some(id);
        while let Some(s) = cur {
            chain.push(s);
            cur = self.parent(s);
        }
        let mut out = FxHashMap::default();
        for s in chain.into_iter().rev() {
            for (k, v) in &self.get(s).imports {
                out.insert(k.clone(), v.clone());
            }
        }
        out
    }

    /// Wildcard packages visible from `id`, innermost first, with the
    /// enclosing package last.
    pub fn search_packages(&self, id: ScopeId) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut cur = Some(id);
        while let Some(s) = cur {
            for p in &self.get(s).packages {
                if !out.contains(p) {
                    out.push(p.clone());
                }
            }
            cur = self.parent(s);
        }
        if let Some(p) = self.package(id) {
            if !out.iter().any(|x| x == p) {
                out.push(p.to_string());
            }
        }
        out
    }
}
