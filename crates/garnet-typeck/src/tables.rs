//! Symbol tables: what has been learned so far about locals, fields,
//! methods and macros.
//!
//! Every entry is write-once. Re-learning a compatible type keeps the first
//! type; an incompatible one is reported as a [`Conflict`] for the caller to
//! turn into a diagnostic.

use rustc_hash::FxHashMap;

use crate::context::TypeContext;
use crate::member::Visibility;
use crate::scope::ScopeId;
use crate::ty::Ty;

/// A second, incompatible type for an existing entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conflict {
    pub existing: Ty,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodKey {
    /// Instance type for instance methods, meta type for static methods.
    pub owner: Ty,
    pub name: String,
    pub params: Vec<Ty>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodSig {
    pub ret: Ty,
    pub throws: Vec<Ty>,
    pub visibility: Visibility,
    pub is_abstract: bool,
}

impl MethodSig {
    pub fn new(ret: Ty) -> Self {
        MethodSig { ret, throws: Vec::new(), visibility: Visibility::Public, is_abstract: false }
    }
}

/// A macro declared on a type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MacroSig {
    pub owner: Ty,
    pub name: String,
    pub params: Vec<Ty>,
    pub visibility: Visibility,
}

#[derive(Clone, Debug, Default)]
pub struct SymbolTables {
    locals: FxHashMap<(ScopeId, String), Ty>,
    fields: FxHashMap<(Ty, String), Ty>,
    methods: FxHashMap<MethodKey, MethodSig>,
    overloads: FxHashMap<(Ty, String), Vec<Vec<Ty>>>,
    macros: FxHashMap<(Ty, String), Vec<MacroSig>>,
    pending: FxHashMap<(Ty, String), u32>,
}

/// Keep `existing` if `new` fits into it, otherwise report a conflict.
fn merge(ctx: &mut TypeContext, existing: &Ty, new: &Ty) -> Result<Ty, Conflict> {
    if existing == new || ctx.assignable_from(existing, new) {
        Ok(existing.clone())
    } else {
        Err(Conflict { existing: existing.clone() })
    }
}

impl SymbolTables {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Locals ─────────────────────────────────────────────────────────

    pub fn local_type(&self, scope: ScopeId, name: &str) -> Option<&Ty> {
        self.locals.get(&(scope, name.to_string()))
    }

    /// Record the type of a local. Returns the type the local now has.
    pub fn learn_local_type(
        &mut self,
        ctx: &mut TypeContext,
        scope: ScopeId,
        name: &str,
        ty: Ty,
    ) -> Result<Ty, Conflict> {
        let key = (scope, name.to_string());
        match self.locals.get(&key) {
            Some(existing) => merge(ctx, existing, &ty),
            None => {
                self.locals.insert(key, ty.clone());
                Ok(ty)
            }
        }
    }

    /// Every local of `scope`, sorted by name.
    pub fn locals_of(&self, scope: ScopeId) -> Vec<(&str, &Ty)> {
        let mut out: Vec<(&str, &Ty)> = self
            .locals
            .iter()
            .filter(|((s, _), _)| *s == scope)
            .map(|((_, n), t)| (n.as_str(), t))
            .collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }

    // ── Fields ─────────────────────────────────────────────────────────

    /// Type of a field learned on `owner` (meta type for static fields).
    pub fn field_type(&self, owner: &Ty, name: &str) -> Option<&Ty> {
        self.fields.get(&(owner.clone(), name.to_string()))
    }

    pub fn learn_field_type(
        &mut self,
        ctx: &mut TypeContext,
        owner: &Ty,
        name: &str,
        ty: Ty,
    ) -> Result<Ty, Conflict> {
        let key = (owner.clone(), name.to_string());
        match self.fields.get(&key) {
            Some(existing) => merge(ctx, existing, &ty),
            None => {
                self.fields.insert(key, ty.clone());
                Ok(ty)
            }
        }
    }

    // ── Methods ────────────────────────────────────────────────────────

    pub fn method_type(&self, owner: &Ty, name: &str, params: &[Ty]) -> Option<&MethodSig> {
        let key = MethodKey { owner: owner.clone(), name: name.to_string(), params: params.to_vec() };
        self.methods.get(&key)
    }

    /// Record a method signature. Learning the same return type again is a
    /// no-op; a different one is a conflict.
    pub fn learn_method_type(
        &mut self,
        owner: &Ty,
        name: &str,
        params: &[Ty],
        sig: MethodSig,
    ) -> Result<Ty, Conflict> {
        let key = MethodKey { owner: owner.clone(), name: name.to_string(), params: params.to_vec() };
        if let Some(existing) = self.methods.get(&key) {
            if existing.ret == sig.ret || sig.ret.is_error() || existing.ret.is_error() {
                return Ok(existing.ret.clone());
            }
            return Err(Conflict { existing: existing.ret.clone() });
        }
        let ret = sig.ret.clone();
        self.methods.insert(key, sig);
        self.overloads
            .entry((owner.clone(), name.to_string()))
            .or_default()
            .push(params.to_vec());
        Ok(ret)
    }

    /// Learned overloads of `name` on exactly `owner`, in learning order.
    pub fn methods_named(&self, owner: &Ty, name: &str) -> Vec<(Vec<Ty>, MethodSig)> {
        let Some(lists) = self.overloads.get(&(owner.clone(), name.to_string())) else {
            return Vec::new();
        };
        lists
            .iter()
            .filter_map(|params| {
                self.method_type(owner, name, params)
                    .map(|sig| (params.clone(), sig.clone()))
            })
            .collect()
    }

    // ── Macros ─────────────────────────────────────────────────────────

    pub fn learn_macro(&mut self, sig: MacroSig) {
        let entry = self.macros.entry((sig.owner.clone(), sig.name.clone())).or_default();
        if !entry.iter().any(|m| m.params == sig.params) {
            entry.push(sig);
        }
    }

    pub fn macros_named(&self, owner: &Ty, name: &str) -> &[MacroSig] {
        self.macros
            .get(&(owner.clone(), name.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // ── Pending declarations ───────────────────────────────────────────

    /// Note a method definition of `name` on `owner` whose signature is not
    /// yet known.
    pub fn add_pending(&mut self, owner: &Ty, name: &str) {
        *self.pending.entry((owner.clone(), name.to_string())).or_default() += 1;
    }

    pub fn finish_pending(&mut self, owner: &Ty, name: &str) {
        let key = (owner.clone(), name.to_string());
        if let Some(count) = self.pending.get_mut(&key) {
            *count -= 1;
            if *count == 0 {
                self.pending.remove(&key);
            }
        }
    }

    pub fn is_pending(&self, owner: &Ty, name: &str) -> bool {
        self.pending.contains_key(&(owner.clone(), name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locals_keep_their_first_type() {
        let mut ctx = TypeContext::with_builtins();
        let mut tables = SymbolTables::new();
        let s = ScopeId(0);
        assert_eq!(tables.learn_local_type(&mut ctx, s, "a", Ty::long()), Ok(Ty::long()));
        assert_eq!(tables.learn_local_type(&mut ctx, s, "a", Ty::int()), Ok(Ty::long()));
        let string = ctx.string();
        assert_eq!(
            tables.learn_local_type(&mut ctx, s, "a", string),
            Err(Conflict { existing: Ty::long() })
        );
        assert_eq!(tables.local_type(s, "a"), Some(&Ty::long()));
    }

    #[test]
    fn locals_accept_null_for_references() {
        let mut ctx = TypeContext::with_builtins();
        let mut tables = SymbolTables::new();
        let string = ctx.string();
        tables.learn_local_type(&mut ctx, ScopeId(0), "s", string.clone()).unwrap();
        assert_eq!(tables.learn_local_type(&mut ctx, ScopeId(0), "s", Ty::Null), Ok(string));
    }

    #[test]
    fn method_types_are_write_once() {
        let mut ctx = TypeContext::new();
        let owner = ctx.class_type("Foo");
        let mut tables = SymbolTables::new();
        let params = [Ty::int()];
        assert_eq!(tables.learn_method_type(&owner, "f", &params, MethodSig::new(Ty::int())), Ok(Ty::int()));
        assert_eq!(tables.learn_method_type(&owner, "f", &params, MethodSig::new(Ty::int())), Ok(Ty::int()));
        assert!(tables.learn_method_type(&owner, "f", &params, MethodSig::new(Ty::double())).is_err());
        assert_eq!(tables.methods_named(&owner, "f").len(), 1);
        assert!(tables.method_type(&owner, "f", &[Ty::long()]).is_none());
    }

    #[test]
    fn pending_counts_down() {
        let mut ctx = TypeContext::new();
        let owner = ctx.class_type("Foo");
        let mut tables = SymbolTables::new();
        tables.add_pending(&owner, "f");
        tables.add_pending(&owner, "f");
        tables.finish_pending(&owner, "f");
        assert!(tables.is_pending(&owner, "f"));
        tables.finish_pending(&owner, "f");
        assert!(!tables.is_pending(&owner, "f"));
    }

    #[test]
    fn macros_dedupe_by_parameters() {
        let mut ctx = TypeContext::new();
        let owner = ctx.class_type("Foo");
        let mut tables = SymbolTables::new();
        let sig = MacroSig { owner: owner.clone(), name: "m".into(), params: vec![], visibility: Visibility::Public };
        tables.learn_macro(sig.clone());
        tables.learn_macro(sig);
        assert_eq!(tables.macros_named(&owner, "m").len(), 1);
    }
}
