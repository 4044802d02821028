//! The annotated syntax tree.
//!
//! Nodes live in a [`la_arena::Arena`] and refer to each other by [`NodeId`].
//! Each node carries a parent back-reference plus the checker's per-node
//! state: a write-once inferred type, the member a call resolved to, a
//! provisional branch type, and a forwarding id when the node was replaced
//! by a rewrite or macro expansion.

use std::fmt;

use garnet_common::Span;
use la_arena::{Arena, Idx};

use crate::member::{Member, Visibility};
use crate::ty::Ty;

pub type NodeId = Idx<Node>;

/// A type as written in source: a possibly-qualified name plus array flag.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeName {
    pub name: String,
    pub array: bool,
}

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        TypeName { name: name.into(), array: false }
    }

    pub fn array(name: impl Into<String>) -> Self {
        TypeName { name: name.into(), array: true }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.array {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassDef {
    pub name: String,
    pub superclass: Option<TypeName>,
    pub interfaces: Vec<TypeName>,
    pub body: Option<NodeId>,
    pub is_interface: bool,
    pub is_abstract: bool,
}

impl ClassDef {
    pub fn new(name: impl Into<String>) -> Self {
        ClassDef {
            name: name.into(),
            superclass: None,
            interfaces: Vec::new(),
            body: None,
            is_interface: false,
            is_abstract: false,
        }
    }

    pub fn extends(mut self, superclass: TypeName) -> Self {
        self.superclass = Some(superclass);
        self
    }

    pub fn implements(mut self, interface: TypeName) -> Self {
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

    pub fn body(mut self, body: NodeId) -> Self {
        self.body = Some(body);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MethodDef {
    pub name: String,
    /// `Argument` nodes.
    pub args: Vec<NodeId>,
    pub return_type: Option<TypeName>,
    pub body: Option<NodeId>,
    pub is_static: bool,
    pub visibility: Visibility,
    pub is_abstract: bool,
    pub throws: Vec<TypeName>,
}

impl MethodDef {
    pub fn new(name: impl Into<String>) -> Self {
        MethodDef {
            name: name.into(),
            args: Vec::new(),
            return_type: None,
            body: None,
            is_static: false,
            visibility: Visibility::Public,
            is_abstract: false,
            throws: Vec::new(),
        }
    }

    pub fn args(mut self, args: Vec<NodeId>) -> Self {
        self.args = args;
        self
    }

    pub fn returns(mut self, ty: TypeName) -> Self {
        self.return_type = Some(ty);
        self
    }

    pub fn body(mut self, body: NodeId) -> Self {
        self.body = Some(body);
        self
    }

    pub fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn abstract_(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn throws(mut self, ty: TypeName) -> Self {
        self.throws.push(ty);
        self
    }
}

/// `while`, `until` and `begin ... end while` loops.
#[derive(Clone, Debug, PartialEq)]
pub struct LoopDef {
    pub init: Option<NodeId>,
    pub condition: NodeId,
    pub pre: Option<NodeId>,
    pub body: Option<NodeId>,
    pub post: Option<NodeId>,
    /// Test the condition before the first iteration.
    pub check_first: bool,
    /// Loop while the condition is false (`until`).
    pub negative: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Script { body: NodeId },
    Body(Vec<NodeId>),
    Fixnum(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
    SelfRef,
    Constant(TypeName),
    Local(String),
    LocalAssign { name: String, value: NodeId },
    LocalDecl { name: String, ty: TypeName },
    Field { name: String, is_static: bool },
    FieldAssign { name: String, value: NodeId, is_static: bool },
    FieldDecl { name: String, ty: TypeName, is_static: bool },
    Call { target: NodeId, name: String, args: Vec<NodeId>, block: Option<NodeId> },
    /// A call with an implicit `self` receiver.
    SelfCall { name: String, args: Vec<NodeId>, block: Option<NodeId> },
    Super { args: Vec<NodeId> },
    Cast { ty: TypeName, value: NodeId },
    If { condition: NodeId, then_body: Option<NodeId>, else_body: Option<NodeId> },
    Loop(LoopDef),
    Rescue { body: NodeId, clauses: Vec<NodeId>, else_body: Option<NodeId> },
    RescueClause { types: Vec<TypeName>, name: Option<String>, body: NodeId },
    Ensure { body: NodeId, clause: NodeId },
    Raise { args: Vec<NodeId> },
    Return { value: Option<NodeId> },
    Break,
    Next,
    Redo,
    ClassDef(ClassDef),
    MethodDef(MethodDef),
    Argument { name: String, ty: Option<TypeName> },
    MacroDef { name: String, params: Vec<TypeName>, is_static: bool },
    Closure { args: Vec<NodeId>, body: NodeId },
    Import { full: String, short: String },
}

impl NodeKind {
    /// Child node ids in evaluation order.
    pub fn children(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        match self {
            NodeKind::Script { body } => out.push(*body),
            NodeKind::Body(stmts) => out.extend(stmts.iter().copied()),
            NodeKind::LocalAssign { value, .. } | NodeKind::FieldAssign { value, .. } => out.push(*value),
            NodeKind::Cast { value, .. } => out.push(*value),
            NodeKind::Call { target, args, block, .. } => {
                out.push(*target);
                out.extend(args.iter().copied());
                out.extend(*block);
            }
            NodeKind::SelfCall { args, block, .. } => {
                out.extend(args.iter().copied());
                out.extend(*block);
            }
            NodeKind::Super { args } | NodeKind::Raise { args } => out.extend(args.iter().copied()),
            NodeKind::If { condition, then_body, else_body } => {
                out.push(*condition);
                out.extend(*then_body);
                out.extend(*else_body);
            }
            NodeKind::Loop(l) => {
                out.extend(l.init);
                out.push(l.condition);
                out.extend(l.pre);
                out.extend(l.body);
                out.extend(l.post);
            }
            NodeKind::Rescue { body, clauses, else_body } => {
                out.push(*body);
                out.extend(clauses.iter().copied());
                out.extend(*else_body);
            }
            NodeKind::RescueClause { body, .. } => out.push(*body),
            NodeKind::Ensure { body, clause } => {
                out.push(*body);
                out.push(*clause);
            }
            NodeKind::Return { value } => out.extend(*value),
            NodeKind::ClassDef(def) => out.extend(def.body),
            NodeKind::MethodDef(def) => {
                out.extend(def.args.iter().copied());
                out.extend(def.body);
            }
            NodeKind::Closure { args, body } => {
                out.extend(args.iter().copied());
                out.push(*body);
            }
            NodeKind::Fixnum(_)
            | NodeKind::Float(_)
            | NodeKind::Str(_)
            | NodeKind::Bool(_)
            | NodeKind::Null
            | NodeKind::SelfRef
            | NodeKind::Constant(_)
            | NodeKind::Local(_)
            | NodeKind::LocalDecl { .. }
            | NodeKind::Field { .. }
            | NodeKind::FieldDecl { .. }
            | NodeKind::Break
            | NodeKind::Next
            | NodeKind::Redo
            | NodeKind::Argument { .. }
            | NodeKind::MacroDef { .. }
            | NodeKind::Import { .. } => {}
        }
        out
    }

    /// Mutable access to every child slot, for in-place replacement.
    fn child_slots(&mut self) -> Vec<&mut NodeId> {
        let mut out: Vec<&mut NodeId> = Vec::new();
        match self {
            NodeKind::Script { body } => out.push(body),
            NodeKind::Body(stmts) => out.extend(stmts.iter_mut()),
            NodeKind::LocalAssign { value, .. } | NodeKind::FieldAssign { value, .. } => out.push(value),
            NodeKind::Cast { value, .. } => out.push(value),
            NodeKind::Call { target, args, block, .. } => {
                out.push(target);
                out.extend(args.iter_mut());
                out.extend(block.as_mut());
            }
            NodeKind::SelfCall { args, block, .. } => {
                out.extend(args.iter_mut());
                out.extend(block.as_mut());
            }
            NodeKind::Super { args } | NodeKind::Raise { args } => out.extend(args.iter_mut()),
            NodeKind::If { condition, then_body, else_body } => {
                out.push(condition);
                out.extend(then_body.as_mut());
                out.extend(else_body.as_mut());
            }
            NodeKind::Loop(l) => {
                out.extend(l.init.as_mut());
                out.push(&mut l.condition);
                out.extend(l.pre.as_mut());
                out.extend(l.body.as_mut());
                out.extend(l.post.as_mut());
            }
            NodeKind::Rescue { body, clauses, else_body } => {
                out.push(body);
                out.extend(clauses.iter_mut());
                out.extend(else_body.as_mut());
            }
            NodeKind::RescueClause { body, .. } => out.push(body),
            NodeKind::Ensure { body, clause } => {
                out.push(body);
                out.push(clause);
            }
            NodeKind::Return { value } => out.extend(value.as_mut()),
            NodeKind::ClassDef(def) => out.extend(def.body.as_mut()),
            NodeKind::MethodDef(def) => {
                out.extend(def.args.iter_mut());
                out.extend(def.body.as_mut());
            }
            NodeKind::Closure { args, body } => {
                out.extend(args.iter_mut());
                out.push(body);
            }
            _ => {}
        }
        out
    }

    /// Short label used in logs and unresolved-node reports.
    pub fn describe(&self) -> String {
        match self {
            NodeKind::Script { .. } => "Script".into(),
            NodeKind::Body(_) => "Body".into(),
            NodeKind::Fixnum(v) => format!("Fixnum({})", v),
            NodeKind::Float(v) => format!("Float({})", v),
            NodeKind::Str(s) => format!("String({:?})", s),
            NodeKind::Bool(b) => format!("Boolean({})", b),
            NodeKind::Null => "Null".into(),
            NodeKind::SelfRef => "Self".into(),
            NodeKind::Constant(t) => format!("Constant({})", t),
            NodeKind::Local(n) => format!("Local({})", n),
            NodeKind::LocalAssign { name, .. } => format!("LocalAssignment({})", name),
            NodeKind::LocalDecl { name, .. } => format!("LocalDeclaration({})", name),
            NodeKind::Field { name, .. } => format!("Field({})", name),
            NodeKind::FieldAssign { name, .. } => format!("FieldAssignment({})", name),
            NodeKind::FieldDecl { name, .. } => format!("FieldDeclaration({})", name),
            NodeKind::Call { name, .. } => format!("Call({})", name),
            NodeKind::SelfCall { name, .. } => format!("FunctionalCall({})", name),
            NodeKind::Super { .. } => "Super".into(),
            NodeKind::Cast { ty, .. } => format!("Cast({})", ty),
            NodeKind::If { .. } => "If".into(),
            NodeKind::Loop(_) => "Loop".into(),
            NodeKind::Rescue { .. } => "Rescue".into(),
            NodeKind::RescueClause { .. } => "RescueClause".into(),
            NodeKind::Ensure { .. } => "Ensure".into(),
            NodeKind::Raise { .. } => "Raise".into(),
            NodeKind::Return { .. } => "Return".into(),
            NodeKind::Break => "Break".into(),
            NodeKind::Next => "Next".into(),
            NodeKind::Redo => "Redo".into(),
            NodeKind::ClassDef(def) => format!("ClassDefinition({})", def.name),
            NodeKind::MethodDef(def) => format!("MethodDefinition({})", def.name),
            NodeKind::Argument { name, .. } => format!("Argument({})", name),
            NodeKind::MacroDef { name, .. } => format!("MacroDefinition({})", name),
            NodeKind::Closure { .. } => "Closure".into(),
            NodeKind::Import { full, .. } => format!("Import({})", full),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    parent: Option<NodeId>,
    ty: Option<Ty>,
    provisional: Option<Ty>,
    member: Option<Member>,
    replaced_by: Option<NodeId>,
    expression: bool,
}

impl Node {
    fn new(kind: NodeKind, span: Span) -> Self {
        Node {
            kind,
            span,
            parent: None,
            ty: None,
            provisional: None,
            member: None,
            replaced_by: None,
            expression: true,
        }
    }
}

/// Arena owning every node of one compilation unit.
#[derive(Clone, Debug, Default)]
pub struct Ast {
    nodes: Arena<Node>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, kind: NodeKind) -> NodeId {
        self.alloc_at(kind, Span::default())
    }

    /// Allocate a node and point its children's parent links at it.
    pub fn alloc_at(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let children = kind.children();
        let id = self.nodes.alloc(Node::new(kind, span));
        for child in children {
            self.nodes[child].parent = Some(id);
        }
        id
    }

    pub fn set_span(&mut self, id: NodeId, span: Span) -> NodeId {
        self.nodes[id].span = span;
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id].kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id].span
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes[id].kind.children()
    }

    /// Parents of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            out.push(p);
            cur = self.parent(p);
        }
        out
    }

    pub fn describe(&self, id: NodeId) -> String {
        self.nodes[id].kind.describe()
    }

    // ── Checker state ──────────────────────────────────────────────────

    /// The inferred type, once resolved.
    pub fn ty(&self, id: NodeId) -> Option<&Ty> {
        self.nodes[id].ty.as_ref()
    }

    pub fn is_resolved(&self, id: NodeId) -> bool {
        self.nodes[id].ty.is_some()
    }

    /// Record the inferred type. The first write wins.
    pub(crate) fn resolve(&mut self, id: NodeId, ty: Ty) -> &Ty {
        let slot = &mut self.nodes[id].ty;
        slot.get_or_insert(ty)
    }

    pub fn member(&self, id: NodeId) -> Option<&Member> {
        self.nodes[id].member.as_ref()
    }

    pub(crate) fn set_member(&mut self, id: NodeId, member: Member) {
        self.nodes[id].member = Some(member);
    }

    pub(crate) fn provisional(&self, id: NodeId) -> Option<&Ty> {
        self.nodes[id].provisional.as_ref()
    }

    pub(crate) fn set_provisional(&mut self, id: NodeId, ty: Ty) {
        self.nodes[id].provisional = Some(ty);
    }

    /// Whether the node's value is consumed by its parent.
    pub fn is_expression(&self, id: NodeId) -> bool {
        self.nodes[id].expression
    }

    pub(crate) fn set_expression(&mut self, id: NodeId, expression: bool) {
        self.nodes[id].expression = expression;
    }

    pub fn replacement(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].replaced_by
    }

    /// Follow replacement links to the node currently standing in for `id`.
    pub fn current(&self, id: NodeId) -> NodeId {
        let mut cur = id;
        while let Some(next) = self.nodes[cur].replaced_by {
            cur = next;
        }
        cur
    }

    /// Substitute `new` for `old` in `old`'s parent. Returns `false` if
    /// `old` has no parent or the parent no longer holds it.
    pub(crate) fn replace(&mut self, old: NodeId, new: NodeId) -> bool {
        let Some(parent) = self.nodes[old].parent else {
            return false;
        };
        let mut swapped = false;
        for slot in self.nodes[parent].kind.child_slots() {
            if *slot == old {
                *slot = new;
                swapped = true;
            }
        }
        if swapped {
            let expression = self.nodes[old].expression;
            let node = &mut self.nodes[new];
            node.parent = Some(parent);
            node.expression = expression;
            self.nodes[old].replaced_by = Some(new);
        }
        swapped
    }

    /// Overwrite a node's kind in place, re-parenting the new children.
    pub(crate) fn set_kind(&mut self, id: NodeId, kind: NodeKind) {
        let children = kind.children();
        self.nodes[id].kind = kind;
        for child in children {
            self.nodes[child].parent = Some(id);
        }
    }

    // ── Builders ───────────────────────────────────────────────────────

    pub fn script(&mut self, stmts: Vec<NodeId>) -> NodeId {
        let body = self.body(stmts);
        self.alloc(NodeKind::Script { body })
    }

    pub fn body(&mut self, stmts: Vec<NodeId>) -> NodeId {
        self.alloc(NodeKind::Body(stmts))
    }

    pub fn fixnum(&mut self, value: i64) -> NodeId {
        self.alloc(NodeKind::Fixnum(value))
    }

    pub fn float(&mut self, value: f64) -> NodeId {
        self.alloc(NodeKind::Float(value))
    }

    pub fn string(&mut self, value: &str) -> NodeId {
        self.alloc(NodeKind::Str(value.to_string()))
    }

    pub fn boolean(&mut self, value: bool) -> NodeId {
        self.alloc(NodeKind::Bool(value))
    }

    pub fn null(&mut self) -> NodeId {
        self.alloc(NodeKind::Null)
    }

    pub fn self_ref(&mut self) -> NodeId {
        self.alloc(NodeKind::SelfRef)
    }

    pub fn constant(&mut self, name: &str) -> NodeId {
        self.alloc(NodeKind::Constant(TypeName::new(name)))
    }

    pub fn local(&mut self, name: &str) -> NodeId {
        self.alloc(NodeKind::Local(name.to_string()))
    }

    pub fn assign(&mut self, name: &str, value: NodeId) -> NodeId {
        self.alloc(NodeKind::LocalAssign { name: name.to_string(), value })
    }

    pub fn local_decl(&mut self, name: &str, ty: TypeName) -> NodeId {
        self.alloc(NodeKind::LocalDecl { name: name.to_string(), ty })
    }

    pub fn field(&mut self, name: &str) -> NodeId {
        self.alloc(NodeKind::Field { name: name.to_string(), is_static: false })
    }

    pub fn static_field(&mut self, name: &str) -> NodeId {
        self.alloc(NodeKind::Field { name: name.to_string(), is_static: true })
    }

    pub fn field_assign(&mut self, name: &str, value: NodeId) -> NodeId {
        self.alloc(NodeKind::FieldAssign { name: name.to_string(), value, is_static: false })
    }

    pub fn static_field_assign(&mut self, name: &str, value: NodeId) -> NodeId {
        self.alloc(NodeKind::FieldAssign { name: name.to_string(), value, is_static: true })
    }

    pub fn field_decl(&mut self, name: &str, ty: TypeName) -> NodeId {
        self.alloc(NodeKind::FieldDecl { name: name.to_string(), ty, is_static: false })
    }

    pub fn call(&mut self, target: NodeId, name: &str, args: Vec<NodeId>) -> NodeId {
        self.alloc(NodeKind::Call { target, name: name.to_string(), args, block: None })
    }

    pub fn call_with_block(&mut self, target: NodeId, name: &str, args: Vec<NodeId>, block: NodeId) -> NodeId {
        self.alloc(NodeKind::Call { target, name: name.to_string(), args, block: Some(block) })
    }

    pub fn fcall(&mut self, name: &str, args: Vec<NodeId>) -> NodeId {
        self.alloc(NodeKind::SelfCall { name: name.to_string(), args, block: None })
    }

    pub fn fcall_with_block(&mut self, name: &str, args: Vec<NodeId>, block: NodeId) -> NodeId {
        self.alloc(NodeKind::SelfCall { name: name.to_string(), args, block: Some(block) })
    }

    pub fn super_call(&mut self, args: Vec<NodeId>) -> NodeId {
        self.alloc(NodeKind::Super { args })
    }

    pub fn cast(&mut self, ty: TypeName, value: NodeId) -> NodeId {
        self.alloc(NodeKind::Cast { ty, value })
    }

    pub fn if_(&mut self, condition: NodeId, then_body: Option<NodeId>, else_body: Option<NodeId>) -> NodeId {
        self.alloc(NodeKind::If { condition, then_body, else_body })
    }

    pub fn while_(&mut self, condition: NodeId, body: NodeId) -> NodeId {
        self.loop_(LoopDef {
            init: None,
            condition,
            pre: None,
            body: Some(body),
            post: None,
            check_first: true,
            negative: false,
        })
    }

    pub fn loop_(&mut self, def: LoopDef) -> NodeId {
        self.alloc(NodeKind::Loop(def))
    }

    pub fn rescue(&mut self, body: NodeId, clauses: Vec<NodeId>, else_body: Option<NodeId>) -> NodeId {
        self.alloc(NodeKind::Rescue { body, clauses, else_body })
    }

    pub fn rescue_clause(&mut self, types: Vec<TypeName>, name: Option<&str>, body: NodeId) -> NodeId {
        self.alloc(NodeKind::RescueClause { types, name: name.map(str::to_string), body })
    }

    pub fn ensure(&mut self, body: NodeId, clause: NodeId) -> NodeId {
        self.alloc(NodeKind::Ensure { body, clause })
    }

    pub fn raise(&mut self, args: Vec<NodeId>) -> NodeId {
        self.alloc(NodeKind::Raise { args })
    }

    pub fn ret(&mut self, value: Option<NodeId>) -> NodeId {
        self.alloc(NodeKind::Return { value })
    }

    pub fn break_(&mut self) -> NodeId {
        self.alloc(NodeKind::Break)
    }

    pub fn next(&mut self) -> NodeId {
        self.alloc(NodeKind::Next)
    }

    pub fn redo(&mut self) -> NodeId {
        self.alloc(NodeKind::Redo)
    }

    pub fn class_def(&mut self, def: ClassDef) -> NodeId {
        self.alloc(NodeKind::ClassDef(def))
    }

    pub fn method(&mut self, def: MethodDef) -> NodeId {
        self.alloc(NodeKind::MethodDef(def))
    }

    /// An instance method with untyped return.
    pub fn def(&mut self, name: &str, args: Vec<NodeId>, body: NodeId) -> NodeId {
        self.method(MethodDef::new(name).args(args).body(body))
    }

    pub fn arg(&mut self, name: &str, ty: TypeName) -> NodeId {
        self.alloc(NodeKind::Argument { name: name.to_string(), ty: Some(ty) })
    }

    pub fn block_arg(&mut self, name: &str) -> NodeId {
        self.alloc(NodeKind::Argument { name: name.to_string(), ty: None })
    }

    pub fn macro_def(&mut self, name: &str, params: Vec<TypeName>) -> NodeId {
        self.alloc(NodeKind::MacroDef { name: name.to_string(), params, is_static: false })
    }

    pub fn closure(&mut self, args: Vec<NodeId>, body: NodeId) -> NodeId {
        self.alloc(NodeKind::Closure { args, body })
    }

    pub fn import(&mut self, full: &str, short: &str) -> NodeId {
        self.alloc(NodeKind::Import { full: full.to_string(), short: short.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_point_back_at_parent() {
        let mut ast = Ast::new();
        let one = ast.fixnum(1);
        let two = ast.fixnum(2);
        let recv = ast.local("a");
        let call = ast.call(recv, "+", vec![one, two]);
        assert_eq!(ast.parent(one), Some(call));
        assert_eq!(ast.parent(recv), Some(call));
        assert_eq!(ast.children(call), vec![recv, one, two]);
    }

    #[test]
    fn resolve_is_write_once() {
        let mut ast = Ast::new();
        let one = ast.fixnum(1);
        ast.resolve(one, Ty::int());
        ast.resolve(one, Ty::double());
        assert_eq!(ast.ty(one), Some(&Ty::int()));
    }

    #[test]
    fn replace_swaps_the_parent_slot() {
        let mut ast = Ast::new();
        let old = ast.fcall("a", vec![]);
        let root = ast.script(vec![old]);
        let new = ast.local("a");
        assert!(ast.replace(old, new));
        let body = ast.children(root)[0];
        assert_eq!(ast.children(body), vec![new]);
        assert_eq!(ast.parent(new), Some(body));
        assert_eq!(ast.current(old), new);
    }

    #[test]
    fn replace_without_parent_fails() {
        let mut ast = Ast::new();
        let lone = ast.fixnum(1);
        let other = ast.fixnum(2);
        assert!(!ast.replace(lone, other));
        assert_eq!(ast.current(lone), lone);
    }

    #[test]
    fn describe_names_the_node() {
        let mut ast = Ast::new();
        let body = ast.body(vec![]);
        let def = ast.def("bar", vec![], body);
        assert_eq!(ast.describe(def), "MethodDefinition(bar)");
        let t = ast.constant("String");
        assert_eq!(ast.describe(t), "Constant(String)");
    }
}
