//! Member and overload resolution.
//!
//! Given a receiver type, a name and the argument types at a call site,
//! [`resolve_member`] picks the member the call binds to. Methods are tried
//! first (exact signature, then applicability by widening with a
//! most-specific choice), then same-named macros compete with the method
//! result, then varargs expansion, then the implicit field accessors
//! (`name` reads, `name_set` writes), then nested classes. Boxing
//! conversions are not modelled.

use tracing::trace;

use crate::context::{MethodInfo, TypeContext};
use crate::error::LookupError;
use crate::member::{Member, MemberKind, Visibility};
use crate::tables::SymbolTables;
use crate::ty::Ty;

/// One call site's lookup request.
#[derive(Clone, Copy, Debug)]
pub struct MemberQuery<'a> {
    pub receiver: &'a Ty,
    pub name: &'a str,
    pub args: &'a [Ty],
    /// Argument types offered to same-named macros, if macros may compete.
    pub macro_args: Option<&'a [Ty]>,
    /// Look on the static side even if `receiver` is an instance type.
    pub is_meta: bool,
    /// Self type of the calling scope, for access checks.
    pub caller: Option<&'a Ty>,
}

/// Resolve a call site to a member.
///
/// `Ok(None)` means nothing matched; the caller decides whether that is an
/// error or a reason to wait.
pub fn resolve_member(
    ctx: &mut TypeContext,
    tables: &SymbolTables,
    query: &MemberQuery<'_>,
) -> Result<Option<Member>, LookupError> {
    let receiver = if query.receiver.is_null() {
        ctx.object()
    } else {
        query.receiver.clone()
    };
    let is_meta = query.is_meta || receiver.is_meta();
    let instance = ctx.unmeta(&receiver);
    let owner = if is_meta { ctx.meta(&instance) } else { instance.clone() };
    let name = query.name;

    let candidates = if is_meta && name == "new" {
        constructors(ctx, tables, &instance)
    } else {
        gather_methods(ctx, tables, &owner, name, is_meta)
    };
    let (visible, hidden): (Vec<Member>, Vec<Member>) = candidates
        .into_iter()
        .partition(|m| is_accessible(ctx, m, query.caller));
    trace!(%owner, name, visible = visible.len(), hidden = hidden.len(), "member candidates");

    let method = select(ctx, name, &visible, query.args)?;
    let macro_hit = match query.macro_args {
        Some(macro_args) => {
            let macros: Vec<Member> = gather_macros(ctx, tables, &instance, name)
                .into_iter()
                .filter(|m| is_accessible(ctx, m, query.caller))
                .collect();
            select(ctx, name, &macros, macro_args)?
        }
        None => None,
    };
    match (method, macro_hit) {
        (Some(m), Some(mac)) => {
            trace!(name, "method and macro both match");
            return Err(LookupError::Ambiguous { name: name.to_string(), candidates: vec![m, mac] });
        }
        (Some(m), None) | (None, Some(m)) => return Ok(Some(m)),
        (None, None) => {}
    }

    if let Some(m) = select_varargs(ctx, name, &visible, query.args)? {
        trace!(name, "matched by varargs expansion");
        return Ok(Some(m));
    }
    if let Some(m) = field_accessor(ctx, &owner, name, query.args, is_meta, query.caller)? {
        return Ok(Some(m));
    }
    if let Some(m) = inner_class(ctx, &instance, name, query.args, is_meta) {
        return Ok(Some(m));
    }

    // Report a match that only failed the access check.
    let hidden_hit = match select(ctx, name, &hidden, query.args) {
        Ok(Some(m)) => Some(m),
        Ok(None) => select_varargs(ctx, name, &hidden, query.args).ok().flatten(),
        Err(LookupError::Ambiguous { candidates, .. }) => candidates.into_iter().next(),
        Err(_) => None,
    };
    if let Some(m) = hidden_hit {
        return Err(LookupError::Inaccessible(m));
    }
    trace!(%owner, name, "no member found");
    Ok(None)
}

/// Whether `member` may be used from code whose self type is `caller`.
pub fn is_accessible(ctx: &mut TypeContext, member: &Member, caller: Option<&Ty>) -> bool {
    if member.visibility == Visibility::Public {
        return true;
    }
    let Some(caller) = caller else {
        return false;
    };
    let caller = ctx.unmeta(caller);
    let declaring = ctx.unmeta(&member.declaring);
    let same_package = TypeContext::package_of(&caller) == TypeContext::package_of(&declaring);
    match member.visibility {
        Visibility::Public => true,
        Visibility::Private => caller == declaring,
        Visibility::Package => same_package,
        Visibility::Protected => same_package || ctx.is_subtype(&caller, &declaring),
    }
}

// ── Candidate gathering ────────────────────────────────────────────────

fn push_unique(out: &mut Vec<Member>, member: Member) {
    // A subclass definition with the same parameters overrides.
    if !out.iter().any(|m| m.params == member.params) {
        out.push(member);
    }
}

/// Methods named `name` on `owner` and its ancestors, nearest first.
fn gather_methods(
    ctx: &mut TypeContext,
    tables: &SymbolTables,
    owner: &Ty,
    name: &str,
    is_meta: bool,
) -> Vec<Member> {
    let kind = if is_meta { MemberKind::StaticMethod } else { MemberKind::Method };
    let mut types = vec![owner.clone()];
    types.extend(ctx.ancestors(owner));
    let mut out = Vec::new();
    for t in types {
        let declaring = ctx.unmeta(&t);
        for (params, sig) in tables.methods_named(&t, name) {
            let mut m = Member::new(declaring.clone(), name, params, sig.ret, kind);
            m.visibility = sig.visibility;
            m.is_abstract = sig.is_abstract;
            m.throws = sig.throws;
            push_unique(&mut out, m);
        }
        let platform: Vec<MethodInfo> = ctx
            .class_of(&t)
            .map(|c| {
                c.methods
                    .iter()
                    .filter(|m| m.name == name && m.is_static == is_meta)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        for info in platform {
            let mut m = Member::new(declaring.clone(), name, info.params, info.ret, kind);
            m.visibility = info.visibility;
            m.is_abstract = info.is_abstract;
            m.varargs = info.varargs;
            m.throws = info.throws;
            push_unique(&mut out, m);
        }
    }
    out
}

/// Constructors of `instance`. A user class that declares none gets the
/// implicit public no-argument constructor.
fn constructors(ctx: &TypeContext, tables: &SymbolTables, instance: &Ty) -> Vec<Member> {
    let mut out = Vec::new();
    for (params, sig) in tables.methods_named(instance, "initialize") {
        let mut m = Member::new(instance.clone(), "initialize", params, instance.clone(), MemberKind::Constructor);
        m.visibility = sig.visibility;
        m.throws = sig.throws;
        push_unique(&mut out, m);
    }
    let Some(info) = ctx.class_of(instance) else {
        return out;
    };
    for c in &info.constructors {
        let mut m = Member::new(instance.clone(), "initialize", c.params.clone(), instance.clone(), MemberKind::Constructor);
        m.visibility = c.visibility;
        m.varargs = c.varargs;
        m.throws = c.throws.clone();
        push_unique(&mut out, m);
    }
    if out.is_empty() && info.user_defined && !info.is_interface && !tables.is_pending(instance, "initialize") {
        out.push(Member::new(instance.clone(), "initialize", Vec::new(), instance.clone(), MemberKind::Constructor));
    }
    out
}

/// Macros named `name` on `instance` and its ancestors. Macros are not
/// split into static and instance sides.
fn gather_macros(ctx: &mut TypeContext, tables: &SymbolTables, instance: &Ty, name: &str) -> Vec<Member> {
    let mut types = vec![instance.clone()];
    types.extend(ctx.ancestors(instance));
    let mut out = Vec::new();
    for t in types {
        for sig in tables.macros_named(&t, name) {
            let mut m = Member::new(t.clone(), name, sig.params.clone(), Ty::Void, MemberKind::Macro);
            m.visibility = sig.visibility;
            push_unique(&mut out, m);
        }
    }
    out
}

// ── Selection ──────────────────────────────────────────────────────────

/// `a` accepts no call site that `b` does not.
fn more_specific(ctx: &mut TypeContext, a: &[Ty], b: &[Ty]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| ctx.convertible(x, y))
}

fn applicable(ctx: &mut TypeContext, formals: &[Ty], args: &[Ty]) -> bool {
    formals.len() == args.len() && args.iter().zip(formals).all(|(a, f)| ctx.convertible(a, f))
}

/// Exact match, then most specific applicable candidate.
fn select(
    ctx: &mut TypeContext,
    name: &str,
    candidates: &[Member],
    args: &[Ty],
) -> Result<Option<Member>, LookupError> {
    if let Some(exact) = candidates.iter().find(|m| m.params == args) {
        trace!(name, member = %exact, "exact match");
        return Ok(Some(exact.clone()));
    }
    let mut hits = Vec::new();
    for m in candidates {
        if applicable(ctx, &m.params, args) {
            hits.push((m.clone(), m.params.clone()));
        }
    }
    most_specific(ctx, name, hits)
}

/// Applicability with the trailing array parameter spread over the
/// remaining arguments.
fn select_varargs(
    ctx: &mut TypeContext,
    name: &str,
    candidates: &[Member],
    args: &[Ty],
) -> Result<Option<Member>, LookupError> {
    let mut hits = Vec::new();
    for m in candidates.iter().filter(|m| m.varargs && !m.params.is_empty()) {
        let fixed = m.params.len() - 1;
        if args.len() < fixed {
            continue;
        }
        let Some(element) = ctx.component(&m.params[fixed]) else {
            continue;
        };
        let mut formals = m.params[..fixed].to_vec();
        formals.extend(std::iter::repeat(element).take(args.len() - fixed));
        if applicable(ctx, &formals, args) {
            hits.push((m.clone(), formals));
        }
    }
    most_specific(ctx, name, hits)
}

/// Reduce applicable candidates to the maximally specific one.
///
/// Ties among abstract methods pick the first gathered (nearest in the
/// hierarchy); a single concrete method beats abstract ones.
fn most_specific(
    ctx: &mut TypeContext,
    name: &str,
    hits: Vec<(Member, Vec<Ty>)>,
) -> Result<Option<Member>, LookupError> {
    if hits.len() <= 1 {
        return Ok(hits.into_iter().next().map(|(m, _)| m));
    }
    let mut maximal = Vec::new();
    for (i, (m, formals)) in hits.iter().enumerate() {
        let dominated = hits.iter().enumerate().any(|(j, (_, other))| {
            j != i && more_specific(ctx, other, formals) && !more_specific(ctx, formals, other)
        });
        if !dominated {
            maximal.push(m.clone());
        }
    }
    if maximal.len() == 1 || maximal.iter().all(|m| m.is_abstract) {
        return Ok(maximal.into_iter().next());
    }
    let concrete: Vec<&Member> = maximal.iter().filter(|m| !m.is_abstract).collect();
    if concrete.len() == 1 {
        return Ok(Some(concrete[0].clone()));
    }
    trace!(name, count = maximal.len(), "ambiguous overloads");
    Err(LookupError::Ambiguous { name: name.to_string(), candidates: maximal })
}

// ── Fallbacks ──────────────────────────────────────────────────────────

/// `obj.name` reads and `obj.name_set(v)` writes a visible field.
fn field_accessor(
    ctx: &mut TypeContext,
    owner: &Ty,
    name: &str,
    args: &[Ty],
    is_meta: bool,
    caller: Option<&Ty>,
) -> Result<Option<Member>, LookupError> {
    let (field_name, setter) = match name.strip_suffix("_set") {
        Some(f) => (f, true),
        None => (name, false),
    };
    if (setter && args.len() != 1) || (!setter && !args.is_empty()) {
        return Ok(None);
    }
    let mut types = vec![owner.clone()];
    types.extend(ctx.ancestors(owner));
    let mut found = None;
    for t in &types {
        let field = ctx.class_of(t).and_then(|c| {
            c.fields
                .iter()
                .find(|f| f.name == field_name && f.is_static == is_meta)
                .cloned()
        });
        if let Some(field) = field {
            found = Some((ctx.unmeta(t), field));
            break;
        }
    }
    let Some((declaring, field)) = found else {
        return Ok(None);
    };
    let kind = match (setter, is_meta) {
        (false, false) => MemberKind::FieldRead,
        (false, true) => MemberKind::StaticFieldRead,
        (true, false) => MemberKind::FieldWrite,
        (true, true) => MemberKind::StaticFieldWrite,
    };
    let params = if setter { vec![field.ty.clone()] } else { Vec::new() };
    let mut member = Member::new(declaring, name, params, field.ty.clone(), kind);
    member.visibility = field.visibility;
    if setter {
        if field.is_final {
            return Err(LookupError::FinalFieldWrite(member));
        }
        if !ctx.convertible(&args[0], &field.ty) {
            return Ok(None);
        }
    }
    if !is_accessible(ctx, &member, caller) {
        return Err(LookupError::Inaccessible(member));
    }
    trace!(member = %member, "field accessor");
    Ok(Some(member))
}

/// `Outer.Inner` on the static side names a nested class.
fn inner_class(ctx: &mut TypeContext, instance: &Ty, name: &str, args: &[Ty], is_meta: bool) -> Option<Member> {
    if !is_meta || !args.is_empty() {
        return None;
    }
    let outer = instance.class_name()?.to_string();
    let declared = ctx
        .class_of(instance)
        .map(|c| c.inner_classes.iter().any(|n| n == name))
        .unwrap_or(false);
    let full = format!("{}${}", outer, name);
    if !declared || !ctx.has_class(&full) {
        return None;
    }
    let inner = ctx.class_type(&full);
    let ret = ctx.meta(&inner);
    Some(Member::new(instance.clone(), name, Vec::new(), ret, MemberKind::InnerClass))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ClassInfo, FieldInfo};
    use crate::tables::{MacroSig, MethodSig};
    use crate::ty::Prim;

    fn query<'a>(receiver: &'a Ty, name: &'a str, args: &'a [Ty]) -> MemberQuery<'a> {
        MemberQuery { receiver, name, args, macro_args: None, is_meta: false, caller: None }
    }

    #[test]
    fn exact_match_wins() {
        let mut ctx = TypeContext::with_builtins();
        let tables = SymbolTables::new();
        let ps = ctx.class_type("java.io.PrintStream");
        let args = [Ty::int()];
        let m = resolve_member(&mut ctx, &tables, &query(&ps, "println", &args)).unwrap().unwrap();
        assert_eq!(m.params, vec![Ty::int()]);
        assert_eq!(m.ret, Ty::Void);
    }

    #[test]
    fn widening_picks_the_most_specific_overload() {
        let mut ctx = TypeContext::with_builtins();
        let foo = ctx.class_type("Foo");
        let mut tables = SymbolTables::new();
        let short = Ty::Prim(Prim::Short);
        tables.learn_method_type(&foo, "f", &[Ty::int()], MethodSig::new(Ty::int())).unwrap();
        tables.learn_method_type(&foo, "f", &[short.clone()], MethodSig::new(short.clone())).unwrap();
        let byte = [Ty::Prim(Prim::Byte)];
        let m = resolve_member(&mut ctx, &tables, &query(&foo, "f", &byte)).unwrap().unwrap();
        assert_eq!(m.params, vec![short]);
    }

    #[test]
    fn incomparable_overloads_are_ambiguous() {
        let mut ctx = TypeContext::with_builtins();
        let foo = ctx.class_type("Foo");
        let object = ctx.object();
        let string = ctx.string();
        let mut tables = SymbolTables::new();
        tables
            .learn_method_type(&foo, "g", &[object.clone(), string.clone()], MethodSig::new(Ty::Void))
            .unwrap();
        tables
            .learn_method_type(&foo, "g", &[string.clone(), object], MethodSig::new(Ty::Void))
            .unwrap();
        let args = [string.clone(), string];
        let err = resolve_member(&mut ctx, &tables, &query(&foo, "g", &args)).unwrap_err();
        assert!(matches!(err, LookupError::Ambiguous { ref candidates, .. } if candidates.len() == 2));
    }

    #[test]
    fn error_arguments_match_any_parameter() {
        let mut ctx = TypeContext::with_builtins();
        let string = ctx.string();
        let tables = SymbolTables::new();
        let args = [Ty::error("bad")];
        let m = resolve_member(&mut ctx, &tables, &query(&string, "concat", &args)).unwrap();
        assert!(m.is_some());
    }

    #[test]
    fn varargs_spread_trailing_arguments() {
        let mut ctx = TypeContext::with_builtins();
        let arrays = ctx.class_type("java.util.Arrays");
        let meta = ctx.meta(&arrays);
        let string = ctx.string();
        let tables = SymbolTables::new();
        let args = [string.clone(), string.clone(), string];
        let m = resolve_member(&mut ctx, &tables, &query(&meta, "asList", &args)).unwrap().unwrap();
        assert!(m.varargs);
        assert_eq!(m.ret.to_string(), "java.util.List");
    }

    #[test]
    fn static_field_reads_and_final_writes() {
        let mut ctx = TypeContext::with_builtins();
        let system = ctx.class_type("java.lang.System");
        let meta = ctx.meta(&system);
        let tables = SymbolTables::new();
        let m = resolve_member(&mut ctx, &tables, &query(&meta, "out", &[])).unwrap().unwrap();
        assert_eq!(m.kind, MemberKind::StaticFieldRead);
        assert_eq!(m.ret.to_string(), "java.io.PrintStream");
        let ps = [m.ret.clone()];
        let err = resolve_member(&mut ctx, &tables, &query(&meta, "out_set", &ps)).unwrap_err();
        assert!(matches!(err, LookupError::FinalFieldWrite(_)));
    }

    #[test]
    fn instance_field_setter() {
        let mut ctx = TypeContext::with_builtins();
        let object = ctx.object();
        ctx.declare_class(
            ClassInfo::new("pkg.Point")
                .extends(object)
                .field(FieldInfo::new("x", Ty::int())),
        );
        let point = ctx.class_type("pkg.Point");
        let tables = SymbolTables::new();
        let args = [Ty::Prim(Prim::Short)];
        let m = resolve_member(&mut ctx, &tables, &query(&point, "x_set", &args)).unwrap().unwrap();
        assert_eq!(m.kind, MemberKind::FieldWrite);
        assert_eq!(m.params, vec![Ty::int()]);
    }

    #[test]
    fn inner_classes_resolve_on_the_static_side() {
        let mut ctx = TypeContext::with_builtins();
        let map = ctx.class_type("java.util.Map");
        let meta = ctx.meta(&map);
        let tables = SymbolTables::new();
        let m = resolve_member(&mut ctx, &tables, &query(&meta, "Entry", &[])).unwrap().unwrap();
        assert_eq!(m.kind, MemberKind::InnerClass);
        assert_eq!(m.ret.to_string(), "java.util.Map$Entry.class");
    }

    #[test]
    fn private_members_are_reported_as_inaccessible() {
        let mut ctx = TypeContext::with_builtins();
        let object = ctx.object();
        ctx.declare_class(
            ClassInfo::new("a.Secret")
                .extends(object)
                .method(MethodInfo::new("hide", vec![], Ty::Void).visibility(Visibility::Private)),
        );
        let secret = ctx.class_type("a.Secret");
        let other = ctx.class_type("b.Other");
        let tables = SymbolTables::new();
        let mut q = query(&secret, "hide", &[]);
        q.caller = Some(&other);
        assert!(matches!(
            resolve_member(&mut ctx, &tables, &q),
            Err(LookupError::Inaccessible(_))
        ));
        q.caller = Some(&secret);
        assert!(resolve_member(&mut ctx, &tables, &q).unwrap().is_some());
    }

    #[test]
    fn macro_and_method_matching_together_is_ambiguous() {
        let mut ctx = TypeContext::with_builtins();
        let foo = ctx.class_type("Foo");
        let mut tables = SymbolTables::new();
        tables.learn_method_type(&foo, "m", &[Ty::int()], MethodSig::new(Ty::Void)).unwrap();
        tables.learn_macro(MacroSig {
            owner: foo.clone(),
            name: "m".into(),
            params: vec![Ty::int()],
            visibility: Visibility::Public,
        });
        let args = [Ty::int()];
        let mut q = query(&foo, "m", &args);
        q.macro_args = Some(&args);
        assert!(matches!(
            resolve_member(&mut ctx, &tables, &q),
            Err(LookupError::Ambiguous { .. })
        ));
        q.macro_args = None;
        assert_eq!(
            resolve_member(&mut ctx, &tables, &q).unwrap().map(|m| m.kind),
            Some(MemberKind::Method)
        );
    }

    #[test]
    fn user_classes_get_a_default_constructor() {
        let mut ctx = TypeContext::with_builtins();
        let object = ctx.object();
        let mut info = ClassInfo::new("Foo").extends(object);
        info.user_defined = true;
        let foo = ctx.declare_class(info);
        let meta = ctx.meta(&foo);
        let tables = SymbolTables::new();
        let m = resolve_member(&mut ctx, &tables, &query(&meta, "new", &[])).unwrap().unwrap();
        assert_eq!(m.kind, MemberKind::Constructor);
        assert_eq!(m.ret, foo);
    }

    #[test]
    fn abstract_ties_resolve_to_the_concrete_method() {
        let mut ctx = TypeContext::with_builtins();
        let list = ctx.class_type("java.util.ArrayList");
        let tables = SymbolTables::new();
        let m = resolve_member(&mut ctx, &tables, &query(&list, "size", &[])).unwrap().unwrap();
        assert!(!m.is_abstract);
        assert_eq!(m.declaring, list);
    }
}
