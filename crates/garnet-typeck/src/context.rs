//! The type context: class table, type interning and the subtyping rules.
//!
//! Every class, interface and primitive the checker knows about is described
//! by a [`ClassInfo`]. Types are interned here so that any two lookups of the
//! same `(name, array, meta)` return equal handles sharing one allocation.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::member::Visibility;
use crate::ty::{Prim, Ty, TypeKey};

pub const OBJECT: &str = "java.lang.Object";
pub const STRING: &str = "java.lang.String";
pub const THROWABLE: &str = "java.lang.Throwable";
pub const EXCEPTION: &str = "java.lang.Exception";
pub const RUNTIME_EXCEPTION: &str = "java.lang.RuntimeException";

/// A method or constructor declared on a known class.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodInfo {
    pub name: String,
    pub params: Vec<Ty>,
    pub ret: Ty,
    pub is_static: bool,
    pub visibility: Visibility,
    pub is_abstract: bool,
    pub varargs: bool,
    pub throws: Vec<Ty>,
}

impl MethodInfo {
    pub fn new(name: impl Into<String>, params: Vec<Ty>, ret: Ty) -> Self {
        MethodInfo {
            name: name.into(),
            params,
            ret,
            is_static: false,
            visibility: Visibility::Public,
            is_abstract: false,
            varargs: false,
            throws: Vec::new(),
        }
    }

    pub fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn abstract_(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn varargs(mut self) -> Self {
        self.varargs = true;
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn throws(mut self, ty: Ty) -> Self {
        self.throws.push(ty);
        self
    }
}

/// A field declared on a known class.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    pub ty: Ty,
    pub is_static: bool,
    pub is_final: bool,
    pub visibility: Visibility,
}

impl FieldInfo {
    pub fn new(name: impl Into<String>, ty: Ty) -> Self {
        FieldInfo {
            name: name.into(),
            ty,
            is_static: false,
            is_final: false,
            visibility: Visibility::Public,
        }
    }

    pub fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn final_(mut self) -> Self {
        self.is_final = true;
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}

/// Everything known about one class or interface.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassInfo {
    pub name: String,
    pub superclass: Option<Ty>,
    pub interfaces: Vec<Ty>,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub is_final: bool,
    /// Declared in the program being checked rather than provided by the
    /// platform. User classes get an implicit no-argument constructor.
    pub user_defined: bool,
    pub methods: Vec<MethodInfo>,
    pub constructors: Vec<MethodInfo>,
    pub fields: Vec<FieldInfo>,
    /// Simple names of nested classes, registered as `Outer$Inner`.
    pub inner_classes: Vec<String>,
}

impl ClassInfo {
    pub fn new(name: impl Into<String>) -> Self {
        ClassInfo {
            name: name.into(),
            superclass: None,
            interfaces: Vec::new(),
            is_interface: false,
            is_abstract: false,
            is_final: false,
            user_defined: false,
            methods: Vec::new(),
            constructors: Vec::new(),
            fields: Vec::new(),
            inner_classes: Vec::new(),
        }
    }

    pub fn extends(mut self, superclass: Ty) -> Self {
        self.superclass = Some(superclass);
        self
    }

    pub fn implements(mut self, interface: Ty) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn interface(mut self) -> Self {
        self.is_interface = true;
        self.is_abstract = true;
        self
    }

    pub fn abstract_(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn final_(mut self) -> Self {
        self.is_final = true;
        self
    }

    pub fn method(mut self, method: MethodInfo) -> Self {
        self.methods.push(method);
        self
    }

    pub fn constructor(mut self, params: Vec<Ty>) -> Self {
        self.constructors.push(MethodInfo::new("initialize", params, Ty::Void));
        self
    }

    pub fn field(mut self, field: FieldInfo) -> Self {
        self.fields.push(field);
        self
    }

    pub fn inner(mut self, simple_name: impl Into<String>) -> Self {
        self.inner_classes.push(simple_name.into());
        self
    }
}

/// The class table plus type interning.
#[derive(Debug, Default)]
pub struct TypeContext {
    interned: FxHashMap<TypeKey, Ty>,
    classes: FxHashMap<String, ClassInfo>,
}

impl TypeContext {
    /// An empty context with no classes at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context preloaded with the platform classes.
    pub fn with_builtins() -> Self {
        let mut ctx = Self::new();
        crate::builtins::register_builtins(&mut ctx);
        ctx
    }

    // ── Interning ──────────────────────────────────────────────────────

    /// The unique handle for `(name, array, meta)`.
    pub fn intern(&mut self, name: &str, array: bool, meta: bool) -> Ty {
        let key = TypeKey { name: name.to_string(), array, meta };
        if let Some(ty) = self.interned.get(&key) {
            return ty.clone();
        }
        let ty = Ty::from_key(Rc::new(key.clone()));
        self.interned.insert(key, ty.clone());
        ty
    }

    pub fn class_type(&mut self, name: &str) -> Ty {
        if let Some(p) = Prim::from_name(name) {
            return Ty::Prim(p);
        }
        self.intern(name, false, false)
    }

    pub fn object(&mut self) -> Ty {
        self.intern(OBJECT, false, false)
    }

    pub fn string(&mut self) -> Ty {
        self.intern(STRING, false, false)
    }

    /// The static-side type of `ty`. Primitives get a meta type too so that
    /// their operator methods can be looked up uniformly.
    pub fn meta(&mut self, ty: &Ty) -> Ty {
        match ty {
            Ty::Ref(key) => self.intern(&key.name, key.array, true),
            Ty::Prim(p) => self.intern(p.name(), false, true),
            other => other.clone(),
        }
    }

    /// The instance-side type behind a meta type.
    pub fn unmeta(&mut self, ty: &Ty) -> Ty {
        match ty {
            Ty::Ref(key) if key.meta => {
                if !key.array {
                    if let Some(p) = Prim::from_name(&key.name) {
                        return Ty::Prim(p);
                    }
                }
                self.intern(&key.name, key.array, false)
            }
            other => other.clone(),
        }
    }

    pub fn array_of(&mut self, ty: &Ty) -> Ty {
        match ty {
            Ty::Prim(p) => self.intern(p.name(), true, false),
            Ty::Ref(key) => self.intern(&key.name, true, false),
            other => other.clone(),
        }
    }

    /// The element type of an array type.
    pub fn component(&mut self, ty: &Ty) -> Option<Ty> {
        match ty {
            Ty::Ref(key) if key.array => {
                let name = key.name.clone();
                Some(self.class_type(&name))
            }
            _ => None,
        }
    }

    // ── Class table ────────────────────────────────────────────────────

    /// Register a class. A class already present keeps its existing entry
    /// unless the new one is user-defined and the old one is not.
    pub fn declare_class(&mut self, info: ClassInfo) -> Ty {
        let name = info.name.clone();
        let replace = match self.classes.get(&name) {
            None => true,
            Some(existing) => info.user_defined && !existing.user_defined,
        };
        if replace {
            self.classes.insert(name.clone(), info);
        }
        self.class_type(&name)
    }

    pub fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    pub fn class_mut(&mut self, name: &str) -> Option<&mut ClassInfo> {
        self.classes.get_mut(name)
    }

    /// The class behind a non-array class or meta type.
    pub fn class_of(&self, ty: &Ty) -> Option<&ClassInfo> {
        match ty {
            Ty::Ref(key) if !key.array => self.classes.get(&key.name),
            Ty::Prim(p) => self.classes.get(p.name()),
            _ => None,
        }
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Resolve a source-level type name.
    ///
    /// Tries primitives and `void`, explicit imports, the fully qualified
    /// name, each wildcard-imported package and finally `java.lang`.
    pub fn find_type(
        &mut self,
        name: &str,
        array: bool,
        imports: &FxHashMap<String, String>,
        packages: &[String],
    ) -> Option<Ty> {
        if name == "void" && !array {
            return Some(Ty::Void);
        }
        if let Some(p) = Prim::from_name(name) {
            let base = Ty::Prim(p);
            return Some(if array { self.array_of(&base) } else { base });
        }
        let full = imports.get(name).map(String::as_str).unwrap_or(name);
        let mut found = None;
        if self.classes.contains_key(full) {
            found = Some(full.to_string());
        } else {
            for package in packages {
                let candidate = format!("{}.{}", package, full);
                if self.classes.contains_key(&candidate) {
                    found = Some(candidate);
                    break;
                }
            }
            if found.is_none() {
                let candidate = format!("java.lang.{}", full);
                if self.classes.contains_key(&candidate) {
                    found = Some(candidate);
                }
            }
        }
        found.map(|n| self.intern(&n, array, false))
    }

    // ── Hierarchy ──────────────────────────────────────────────────────

    /// Direct superclass. Arrays extend `Object`; a meta type's superclass
    /// is the meta type of the instance superclass.
    pub fn superclass(&mut self, ty: &Ty) -> Option<Ty> {
        match ty {
            Ty::Ref(key) if key.array => {
                if key.meta {
                    None
                } else {
                    Some(self.object())
                }
            }
            Ty::Ref(key) => {
                let sup = self.classes.get(&key.name)?.superclass.clone()?;
                if key.meta {
                    Some(self.meta(&sup))
                } else {
                    Some(sup)
                }
            }
            _ => None,
        }
    }

    pub fn interfaces(&self, ty: &Ty) -> Vec<Ty> {
        match ty {
            Ty::Ref(key) if !key.array && !key.meta => self
                .classes
                .get(&key.name)
                .map(|c| c.interfaces.clone())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Every proper supertype of `ty`: the superclass chain first, then all
    /// interfaces breadth-first. Interfaces end with `Object`. Meta types
    /// only follow the superclass chain.
    pub fn ancestors(&mut self, ty: &Ty) -> Vec<Ty> {
        let mut out: Vec<Ty> = Vec::new();
        let mut chain = vec![ty.clone()];
        let mut cur = ty.clone();
        while let Some(sup) = self.superclass(&cur) {
            if out.contains(&sup) || &sup == ty {
                break;
            }
            out.push(sup.clone());
            chain.push(sup.clone());
            cur = sup;
        }
        if !ty.is_meta() {
            let mut queue: Vec<Ty> = chain.iter().flat_map(|t| self.interfaces(t)).collect();
            let mut i = 0;
            while i < queue.len() {
                let iface = queue[i].clone();
                i += 1;
                if out.contains(&iface) || &iface == ty {
                    continue;
                }
                queue.extend(self.interfaces(&iface));
                out.push(iface);
            }
            let object = self.object();
            if self.is_interface(ty) && !out.contains(&object) {
                out.push(object);
            }
        }
        out
    }

    pub fn is_interface(&self, ty: &Ty) -> bool {
        self.class_of(ty).map(|c| c.is_interface).unwrap_or(false)
    }

    pub fn is_abstract(&self, ty: &Ty) -> bool {
        self.class_of(ty).map(|c| c.is_abstract).unwrap_or(false)
    }

    /// The package part of a class name, or `""` for the default package.
    pub fn package_of(ty: &Ty) -> &str {
        match ty.class_name() {
            Some(name) => name.rsplit_once('.').map(|(p, _)| p).unwrap_or(""),
            None => "",
        }
    }

    /// Whether `sub` is `sup` or inherits from it.
    pub fn is_subtype(&mut self, sub: &Ty, sup: &Ty) -> bool {
        sub == sup || self.ancestors(sub).contains(sup)
    }

    // ── Assignability ──────────────────────────────────────────────────

    /// Whether a value of type `source` may be stored where `target` is
    /// expected. The poison type and `<unreachable>` are assignable both
    /// ways so that one failure never produces a second error.
    pub fn assignable_from(&mut self, target: &Ty, source: &Ty) -> bool {
        if target == source {
            return true;
        }
        match (target, source) {
            (Ty::Error(_), _) | (_, Ty::Error(_)) => true,
            (_, Ty::Unreachable(_)) | (Ty::Unreachable(_), _) => true,
            (Ty::Prim(t), Ty::Prim(s)) => s.widens_to(*t),
            (Ty::Ref(t), Ty::Null) => !t.meta,
            (Ty::Ref(t), Ty::Block) => {
                !t.array && !t.meta && (self.is_interface(target) || self.is_abstract(target))
            }
            (Ty::Ref(t), Ty::Ref(s)) => {
                if t.meta != s.meta {
                    return false;
                }
                if !t.meta && !t.array && t.name == OBJECT {
                    return true;
                }
                if t.array || s.array {
                    if !(t.array && s.array) {
                        return false;
                    }
                    let (tc, sc) = match (self.component(target), self.component(source)) {
                        (Some(tc), Some(sc)) => (tc, sc),
                        _ => return false,
                    };
                    if tc.is_primitive() || sc.is_primitive() {
                        return tc == sc;
                    }
                    return self.assignable_from(&tc, &sc);
                }
                self.is_subtype(source, target)
            }
            _ => false,
        }
    }

    /// Method-invocation conversion for overload applicability: identity,
    /// primitive widening or reference widening. No boxing.
    pub fn convertible(&mut self, from: &Ty, to: &Ty) -> bool {
        if from.is_error() || to.is_error() {
            return true;
        }
        match (from, to) {
            (Ty::Prim(f), Ty::Prim(t)) => f.widens_to(*t),
            (Ty::Prim(_), _) | (_, Ty::Prim(_)) => false,
            _ => self.assignable_from(to, from),
        }
    }

    /// Whether either type is assignable to the other.
    pub fn compatible(&mut self, a: &Ty, b: &Ty) -> bool {
        self.assignable_from(a, b) || self.assignable_from(b, a)
    }

    /// The join of two branch types. If `a` is assignable to `b` the result
    /// is `b`, if `b` is assignable to `a` it is `a`. `<unreachable>` and the
    /// poison type yield the other side. `None` means incompatible.
    pub fn narrow(&mut self, a: &Ty, b: &Ty) -> Option<Ty> {
        if a.is_unreachable() || a.is_error() {
            return Some(b.clone());
        }
        if b.is_unreachable() || b.is_error() {
            return Some(a.clone());
        }
        if self.assignable_from(b, a) {
            Some(b.clone())
        } else if self.assignable_from(a, b) {
            Some(a.clone())
        } else {
            None
        }
    }

    /// Binary numeric promotion on two primitive types.
    pub fn widen_arith(a: &Ty, b: &Ty) -> Option<Ty> {
        match (a, b) {
            (Ty::Prim(x), Ty::Prim(y)) => x.promote(*y).map(Ty::Prim),
            _ => None,
        }
    }
}
