//! The inference engine: shared state plus the `infer` protocol.
//!
//! `infer(node)` either resolves the node for good (its type slot is written
//! once and never changes), registers it as deferred and returns `None`, or
//! records a hard error and resolves the node to the poison type.
//!
//! A node may also be *held*: it stays deferred but hands a provisional type
//! to its parent. An `if` with one known branch is held, and so is every
//! node whose value was computed from a held child, so nothing built on a
//! provisional type is written to a type slot before its inputs are final.
//! Per-kind rules live in `infer.rs`; the fixpoint loop lives in `driver.rs`.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::ast::{Ast, ClassDef, MethodDef, NodeId, NodeKind, TypeName};
use crate::context::{ClassInfo, TypeContext};
use crate::driver::DriverState;
use crate::error::{InternalError, TypeError};
use crate::macros::{register_builtin_macros, MacroRegistry};
use crate::member::Visibility;
use crate::scope::{ScopeId, ScopeKind, Scopes};
use crate::tables::{MacroSig, MethodKey, MethodSig, SymbolTables};
use crate::ty::Ty;
use crate::TypeckOptions;

/// Outcome of one inference attempt on one node.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Step {
    Done(Ty),
    /// Known so far, but still waiting on a dependency.
    Provisional(Ty),
    Defer,
    /// The node was rewritten; infer this node in its place.
    Replace(NodeId),
}

pub struct Engine {
    pub(crate) ctx: TypeContext,
    pub(crate) ast: Ast,
    pub(crate) scopes: Scopes,
    pub(crate) tables: SymbolTables,
    pub(crate) macros: MacroRegistry,
    pub(crate) errors: Vec<TypeError>,
    pub(crate) internal: Vec<InternalError>,
    pub(crate) options: TypeckOptions,
    /// Pending declarations no longer block call resolution.
    pub(crate) last_chance: bool,
    /// Poison the next node that defers instead of queueing it.
    pub(crate) error_next: bool,
    pub(crate) state: DriverState,
    /// Some child inferred since the innermost `infer` began was held.
    tentative: bool,
    pub(crate) deferred: Vec<NodeId>,
    deferred_set: FxHashSet<NodeId>,
    root_scope: Option<ScopeId>,
    declared: FxHashSet<NodeId>,
    class_types: FxHashMap<NodeId, Ty>,
    class_fixups: Vec<(NodeId, ScopeId)>,
    pub(crate) method_owners: FxHashMap<NodeId, Ty>,
    signatures: FxHashMap<MethodKey, NodeId>,
    learned: FxHashSet<NodeId>,
    pending_cleared: FxHashSet<NodeId>,
}

impl Engine {
    pub fn new(ast: Ast, options: TypeckOptions, macros: MacroRegistry) -> Self {
        let mut ctx = TypeContext::with_builtins();
        let mut tables = SymbolTables::new();
        register_builtin_macros(&mut ctx, &mut tables);
        Engine {
            ctx,
            ast,
            scopes: Scopes::new(),
            tables,
            macros,
            errors: Vec::new(),
            internal: Vec::new(),
            options,
            last_chance: false,
            error_next: false,
            state: DriverState::Running,
            tentative: false,
            deferred: Vec::new(),
            deferred_set: FxHashSet::default(),
            root_scope: None,
            declared: FxHashSet::default(),
            class_types: FxHashMap::default(),
            class_fixups: Vec::new(),
            method_owners: FxHashMap::default(),
            signatures: FxHashMap::default(),
            learned: FxHashSet::default(),
            pending_cleared: FxHashSet::default(),
        }
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn tables(&self) -> &SymbolTables {
        &self.tables
    }

    pub fn scopes(&self) -> &Scopes {
        &self.scopes
    }

    /// Where the last [`Engine::resolve`] stopped.
    pub fn state(&self) -> DriverState {
        self.state
    }

    // ── The infer protocol ─────────────────────────────────────────────

    /// Infer `id`. `expression` says whether the parent consumes its value.
    ///
    /// Returns `None` when a dependency is still unknown; the node is then
    /// queued for the driver. A held node is queued too, but its provisional
    /// type is returned. Calling this on a resolved node returns the stored
    /// type without touching any table.
    pub fn infer(&mut self, id: NodeId, expression: bool) -> Option<Ty> {
        let id = self.ast.current(id);
        if let Some(ty) = self.ast.ty(id) {
            return Some(ty.clone());
        }
        self.ast.set_expression(id, expression);
        let outer = std::mem::take(&mut self.tentative);
        let (ty, held) = match self.infer_node(id, expression) {
            Ok(Step::Done(ty)) if self.tentative => (Some(self.hold(id, ty)), true),
            Ok(Step::Done(ty)) => (Some(self.finish(id, ty)), false),
            Ok(Step::Provisional(ty)) => (Some(self.hold(id, ty)), true),
            Ok(Step::Defer) if self.error_next => {
                self.error_next = false;
                (Some(self.give_up(id)), false)
            }
            Ok(Step::Defer) => {
                self.defer(id);
                (None, false)
            }
            Ok(Step::Replace(new)) => {
                self.apply_replacement(id, new);
                match self.infer(new, expression) {
                    Some(ty) if self.tentative => (Some(self.hold(id, ty)), true),
                    Some(ty) => (Some(self.finish(id, ty)), false),
                    None => (None, false),
                }
            }
            Err(err) => {
                debug!(node = %self.ast.describe(id), error = %err, "type error");
                let ty = Ty::error(err.to_string());
                self.errors.push(err);
                (Some(self.finish(id, ty)), false)
            }
        };
        self.tentative = outer || held;
        ty
    }

    /// Infer every node in `ids`, attempting all of them even when an
    /// earlier one is unknown.
    pub(crate) fn infer_all(&mut self, ids: &[NodeId], expression: bool) -> Option<Vec<Ty>> {
        let results: Vec<Option<Ty>> = ids.iter().map(|id| self.infer(*id, expression)).collect();
        results.into_iter().collect()
    }

    /// Queue `id` again but let its parent use `ty` for now.
    fn hold(&mut self, id: NodeId, ty: Ty) -> Ty {
        trace!(node = %self.ast.describe(id), %ty, "provisional");
        self.ast.set_provisional(id, ty.clone());
        self.defer(id);
        ty
    }

    /// Resolve an unresolvable node to the poison type, with one error.
    pub(crate) fn give_up(&mut self, id: NodeId) -> Ty {
        let err = TypeError::Uninferable { node: self.ast.describe(id), span: self.ast.span(id) };
        debug!(node = %self.ast.describe(id), "giving up on node");
        let ty = Ty::error(err.to_string());
        self.errors.push(err);
        self.finish(id, ty)
    }

    fn finish(&mut self, id: NodeId, ty: Ty) -> Ty {
        let ty = self.ast.resolve(id, ty).clone();
        if self.method_owners.contains_key(&id) {
            self.finish_pending(id);
        }
        trace!(node = %self.ast.describe(id), %ty, "resolved");
        ty
    }

    pub(crate) fn defer(&mut self, id: NodeId) {
        if self.deferred_set.insert(id) {
            trace!(node = %self.ast.describe(id), "deferred");
            self.deferred.push(id);
        }
    }

    /// Take the deferred set for one driver cycle.
    pub(crate) fn take_deferred(&mut self) -> Vec<NodeId> {
        self.deferred_set.clear();
        std::mem::take(&mut self.deferred)
    }

    /// Drop queue entries whose node got resolved some other way.
    pub(crate) fn prune_deferred(&mut self) {
        let ast = &self.ast;
        self.deferred.retain(|n| !ast.is_resolved(ast.current(*n)));
        self.deferred_set = self.deferred.iter().copied().collect();
    }

    pub(crate) fn deferred_ids(&self) -> &FxHashSet<NodeId> {
        &self.deferred_set
    }

    fn apply_replacement(&mut self, old: NodeId, new: NodeId) {
        if !self.ast.replace(old, new) {
            self.internal.push(InternalError::DetachedNode { node: self.ast.describe(old) });
        }
        let scope = self.scope_of(new);
        self.declare(new, scope);
        self.fix_classes();
        debug!(old = %self.ast.describe(old), new = %self.ast.describe(new), "replaced node");
    }

    // ── Scope helpers ──────────────────────────────────────────────────

    /// The scope `id` is evaluated in: the scope of its nearest
    /// scope-introducing ancestor.
    pub(crate) fn scope_of(&self, id: NodeId) -> ScopeId {
        for ancestor in self.ast.ancestors(id) {
            if let Some(scope) = self.scopes.scope_of_node(ancestor) {
                return scope;
            }
        }
        self.scopes
            .scope_of_node(id)
            .or(self.root_scope)
            .unwrap_or(ScopeId(0))
    }

    pub(crate) fn self_type(&mut self, scope: ScopeId) -> Ty {
        match self.scopes.self_type(scope) {
            Some(ty) => ty,
            None => {
                let script = self.ctx.class_type(&self.options.script_class);
                self.ctx.meta(&script)
            }
        }
    }

    /// Resolve a written type name from `scope`, trying the enclosing class's
    /// nested classes first.
    pub(crate) fn lookup_type(&mut self, scope: ScopeId, name: &TypeName) -> Option<Ty> {
        if let Some(outer) = self.scopes.self_type(scope) {
            if let Some(outer_name) = outer.class_name() {
                let nested = format!("{}${}", outer_name, name.name);
                if self.ctx.has_class(&nested) {
                    return Some(self.ctx.intern(&nested, name.array, false));
                }
            }
        }
        let imports = self.scopes.imports(scope);
        let packages = self.scopes.search_packages(scope);
        self.ctx.find_type(&name.name, name.array, &imports, &packages)
    }

    pub(crate) fn resolve_type_name(&mut self, scope: ScopeId, name: &TypeName, id: NodeId) -> Result<Ty, TypeError> {
        self.lookup_type(scope, name).ok_or_else(|| TypeError::UnknownType {
            name: name.to_string(),
            span: self.ast.span(id),
        })
    }

    // ── Declarations ───────────────────────────────────────────────────

    /// The declaration pass over the whole tree: creates scopes, registers
    /// classes, pending method names, locals, imports and macros.
    pub(crate) fn declare_root(&mut self, root: NodeId) {
        let scope = self.scopes.enter(root, ScopeKind::Script, None);
        self.root_scope = Some(scope);
        let object = self.ctx.object();
        let mut info = ClassInfo::new(self.options.script_class.clone()).extends(object);
        info.user_defined = true;
        let script = self.ctx.declare_class(info);
        let meta = self.ctx.meta(&script);
        self.scopes.set_self_type(scope, meta);
        self.declared.insert(root);
        for child in self.ast.children(root) {
            self.declare(child, scope);
        }
        self.fix_classes();
    }

    pub(crate) fn declare(&mut self, id: NodeId, scope: ScopeId) {
        if !self.declared.insert(id) {
            return;
        }
        let kind = self.ast.kind(id).clone();
        let mut inner = scope;
        match &kind {
            NodeKind::ClassDef(def) => inner = self.declare_class(id, def, scope),
            NodeKind::MethodDef(def) => inner = self.declare_method(id, def, scope),
            NodeKind::Closure { args, .. } => {
                inner = self.scopes.enter(id, ScopeKind::Closure, Some(scope));
                for arg in args {
                    if let NodeKind::Argument { name, .. } = self.ast.kind(*arg) {
                        let name = name.clone();
                        self.scopes.declare(inner, &name);
                    }
                }
            }
            NodeKind::RescueClause { name, .. } => {
                inner = self.scopes.enter(id, ScopeKind::Rescue, Some(scope));
                if let Some(name) = name {
                    self.scopes.declare(inner, name);
                }
            }
            NodeKind::LocalAssign { name, .. } | NodeKind::LocalDecl { name, .. } => {
                let owner = self.scopes.containing_scope(scope, name);
                self.scopes.declare(owner, name);
            }
            NodeKind::Import { full, short } => self.scopes.import(scope, full, short),
            NodeKind::MacroDef { name, params, .. } => self.declare_macro(name, params, scope),
            _ => {}
        }
        for child in kind.children() {
            self.declare(child, inner);
        }
    }

    fn declare_class(&mut self, id: NodeId, def: &ClassDef, scope: ScopeId) -> ScopeId {
        let enclosing = self.scopes.get(scope).kind;
        let outer = self.scopes.self_type(scope).and_then(|t| t.class_name().map(str::to_string));
        let full = match (enclosing, outer) {
            (ScopeKind::Class, Some(outer)) => {
                if let Some(info) = self.ctx.class_mut(&outer) {
                    if !info.inner_classes.contains(&def.name) {
                        info.inner_classes.push(def.name.clone());
                    }
                }
                format!("{}${}", outer, def.name)
            }
            _ => match self.scopes.package(scope) {
                Some(package) if !def.name.contains('.') => format!("{}.{}", package, def.name),
                _ => def.name.clone(),
            },
        };
        let mut info = ClassInfo::new(full);
        info.user_defined = true;
        info.is_interface = def.is_interface;
        info.is_abstract = def.is_abstract;
        let ty = self.ctx.declare_class(info);
        debug!(class = %ty, "declared class");
        let inner = self.scopes.enter(id, ScopeKind::Class, Some(scope));
        let meta = self.ctx.meta(&ty);
        self.scopes.set_self_type(inner, meta);
        self.class_types.insert(id, ty);
        self.class_fixups.push((id, scope));
        inner
    }

    /// Attach superclasses and interfaces once every class name is known.
    fn fix_classes(&mut self) {
        for (id, scope) in std::mem::take(&mut self.class_fixups) {
            let NodeKind::ClassDef(def) = self.ast.kind(id).clone() else {
                continue;
            };
            let Some(ty) = self.class_types.get(&id).cloned() else {
                continue;
            };
            let superclass = match &def.superclass {
                Some(name) => match self.resolve_type_name(scope, name, id) {
                    Ok(sup) => Some(sup),
                    Err(err) => {
                        self.errors.push(err);
                        None
                    }
                },
                None => None,
            };
            let superclass = match superclass {
                Some(sup) => Some(sup),
                None if def.is_interface => None,
                None => Some(self.ctx.object()),
            };
            let mut interfaces = Vec::new();
            for name in &def.interfaces {
                match self.resolve_type_name(scope, name, id) {
                    Ok(iface) => interfaces.push(iface),
                    Err(err) => self.errors.push(err),
                }
            }
            if let Some(info) = ty.class_name().and_then(|n| self.ctx.class_mut(n)) {
                if info.superclass.is_none() {
                    info.superclass = superclass;
                }
                for iface in interfaces {
                    if !info.interfaces.contains(&iface) {
                        info.interfaces.push(iface);
                    }
                }
            }
        }
    }

    fn declare_method(&mut self, id: NodeId, def: &MethodDef, scope: ScopeId) -> ScopeId {
        let self_ty = self.self_type(scope);
        let class = self.ctx.unmeta(&self_ty);
        let at_script_level = self.scopes.get(scope).kind == ScopeKind::Script;
        let owner = if def.is_static || at_script_level {
            self.ctx.meta(&class)
        } else {
            class
        };
        self.tables.add_pending(&owner, &def.name);
        trace!(%owner, name = %def.name, "pending method");
        self.method_owners.insert(id, owner.clone());
        let inner = self.scopes.enter(id, ScopeKind::Method, Some(scope));
        self.scopes.set_self_type(inner, owner);
        for arg in &def.args {
            if let NodeKind::Argument { name, .. } = self.ast.kind(*arg) {
                let name = name.clone();
                self.scopes.declare(inner, &name);
            }
        }
        inner
    }

    fn declare_macro(&mut self, name: &str, params: &[TypeName], scope: ScopeId) {
        let self_ty = self.self_type(scope);
        let owner = self.ctx.unmeta(&self_ty);
        let mut resolved = Vec::new();
        for p in params {
            match self.lookup_type(scope, p) {
                Some(ty) => resolved.push(ty),
                // Reported when the definition itself is inferred.
                None => return,
            }
        }
        self.tables.learn_macro(MacroSig {
            owner,
            name: name.to_string(),
            params: resolved,
            visibility: Visibility::Public,
        });
    }

    // ── Method signatures ──────────────────────────────────────────────

    /// Learn a method's signature, once per definition node.
    pub(crate) fn learn_signature(
        &mut self,
        id: NodeId,
        name: &str,
        params: &[Ty],
        sig: MethodSig,
    ) -> Result<(), TypeError> {
        let Some(owner) = self.method_owners.get(&id).cloned() else {
            return Ok(());
        };
        if self.learned.contains(&id) {
            // Learned from a provisional body; the final type must agree.
            return match self.tables.method_type(&owner, name, params) {
                Some(existing) if existing.ret != sig.ret && !sig.ret.is_error() => Err(TypeError::ConflictingSignature {
                    owner,
                    name: name.to_string(),
                    params: params.to_vec(),
                    existing: existing.ret.clone(),
                    found: sig.ret,
                    span: self.ast.span(id),
                }),
                _ => Ok(()),
            };
        }
        let key = MethodKey { owner: owner.clone(), name: name.to_string(), params: params.to_vec() };
        if let Some(other) = self.signatures.get(&key) {
            if *other != id {
                return Err(TypeError::DuplicateMethod {
                    owner,
                    name: name.to_string(),
                    params: params.to_vec(),
                    span: self.ast.span(id),
                });
            }
        }
        let ret = sig.ret.clone();
        self.tables
            .learn_method_type(&owner, name, params, sig)
            .map_err(|conflict| TypeError::ConflictingSignature {
                owner: owner.clone(),
                name: name.to_string(),
                params: params.to_vec(),
                existing: conflict.existing,
                found: ret.clone(),
                span: self.ast.span(id),
            })?;
        debug!(%owner, name, params = %crate::ty::format_params(params), %ret, "learned method");
        self.signatures.insert(key, id);
        self.learned.insert(id);
        self.finish_pending(id);
        Ok(())
    }

    /// Clear the pending entry of a method definition, once.
    fn finish_pending(&mut self, id: NodeId) {
        if !self.pending_cleared.insert(id) {
            return;
        }
        let Some(owner) = self.method_owners.get(&id).cloned() else {
            return;
        };
        if let NodeKind::MethodDef(def) = self.ast.kind(id) {
            let name = def.name.clone();
            self.tables.finish_pending(&owner, &name);
        }
    }

    /// Whether a not-yet-learned definition of `name` could still affect a
    /// lookup on `owner`.
    pub(crate) fn blocked_by_pending(&mut self, owner: &Ty, name: &str) -> bool {
        let (owner, name) = if name == "new" && owner.is_meta() {
            (self.ctx.unmeta(owner), "initialize")
        } else {
            (owner.clone(), name)
        };
        let mut types = vec![owner.clone()];
        types.extend(self.ctx.ancestors(&owner));
        types.iter().any(|t| self.tables.is_pending(t, name))
    }
}
