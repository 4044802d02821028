//! Inference rules, one per node kind.
//!
//! Each rule either produces a final type, asks to be deferred because a
//! dependency is still unknown, or rewrites its node. Rules never cache
//! anything themselves: `Engine::infer` owns the write-once type slot.

use tracing::{debug, trace};

use crate::ast::{LoopDef, MethodDef, NodeId, NodeKind, TypeName};
use crate::context::{RUNTIME_EXCEPTION, THROWABLE};
use crate::engine::{Engine, Step};
use crate::error::TypeError;
use crate::lookup::{resolve_member, MemberQuery};
use crate::macros::MacroCall;
use crate::member::MemberKind;
use crate::scope::ScopeId;
use crate::tables::MethodSig;
use crate::ty::{ControlFlow, Ty};

fn step(ty: Option<Ty>) -> Step {
    ty.map_or(Step::Defer, Step::Done)
}

/// The first poison type among a receiver and its arguments.
fn first_error(receiver: &Ty, args: &[Ty]) -> Option<Ty> {
    if receiver.is_error() {
        return Some(receiver.clone());
    }
    args.iter().find(|t| t.is_error()).cloned()
}

impl Engine {
    pub(crate) fn infer_node(&mut self, id: NodeId, expression: bool) -> Result<Step, TypeError> {
        let kind = self.ast.kind(id).clone();
        match kind {
            NodeKind::Script { body } => Ok(step(self.infer(body, expression))),
            NodeKind::Body(stmts) => Ok(self.infer_body(&stmts, expression)),
            NodeKind::Fixnum(value) => {
                let ty = if i32::try_from(value).is_ok() { Ty::int() } else { Ty::long() };
                Ok(Step::Done(ty))
            }
            NodeKind::Float(_) => Ok(Step::Done(Ty::double())),
            NodeKind::Str(_) => Ok(Step::Done(self.ctx.string())),
            NodeKind::Bool(_) => Ok(Step::Done(Ty::boolean())),
            NodeKind::Null => Ok(Step::Done(Ty::Null)),
            NodeKind::SelfRef => {
                let scope = self.scope_of(id);
                Ok(Step::Done(self.self_type(scope)))
            }
            NodeKind::Constant(name) => {
                let scope = self.scope_of(id);
                let ty = self.resolve_type_name(scope, &name, id)?;
                Ok(Step::Done(self.ctx.meta(&ty)))
            }
            NodeKind::Local(name) => self.infer_local(id, &name),
            NodeKind::LocalAssign { name, value } => self.infer_local_assign(id, &name, value),
            NodeKind::LocalDecl { name, ty } => self.infer_local_decl(id, &name, &ty),
            NodeKind::Field { name, is_static } => self.infer_field(id, &name, is_static),
            NodeKind::FieldAssign { name, value, is_static } => {
                self.infer_field_assign(id, &name, value, is_static)
            }
            NodeKind::FieldDecl { name, ty, is_static } => self.infer_field_decl(id, &name, &ty, is_static),
            NodeKind::Call { target, name, args, block } => self.infer_call(id, target, &name, &args, block),
            NodeKind::SelfCall { name, args, block } => self.infer_self_call(id, &name, &args, block),
            NodeKind::Super { args } => self.infer_super(id, &args),
            NodeKind::Cast { ty, value } => self.infer_cast(id, &ty, value),
            NodeKind::If { condition, then_body, else_body } => {
                self.infer_if(id, condition, then_body, else_body, expression)
            }
            NodeKind::Loop(def) => Ok(self.infer_loop(&def)),
            NodeKind::Rescue { body, clauses, else_body } => {
                self.infer_rescue(id, body, &clauses, else_body, expression)
            }
            NodeKind::RescueClause { types, name, body } => {
                self.infer_rescue_clause(id, &types, name.as_deref(), body, expression)
            }
            NodeKind::Ensure { body, clause } => {
                let body_ty = self.infer(body, expression);
                let clause_ty = self.infer(clause, false);
                Ok(match (body_ty, clause_ty) {
                    (Some(ty), Some(_)) => Step::Done(ty),
                    _ => Step::Defer,
                })
            }
            NodeKind::Raise { args } => self.infer_raise(id, &args),
            NodeKind::Return { value } => {
                if let Some(value) = value {
                    if self.infer(value, true).is_none() {
                        return Ok(Step::Defer);
                    }
                }
                Ok(Step::Done(Ty::Unreachable(ControlFlow::Return)))
            }
            NodeKind::Break => Ok(Step::Done(Ty::Unreachable(ControlFlow::Break))),
            NodeKind::Next => Ok(Step::Done(Ty::Unreachable(ControlFlow::Next))),
            NodeKind::Redo => Ok(Step::Done(Ty::Unreachable(ControlFlow::Redo))),
            NodeKind::ClassDef(def) => Ok(match def.body {
                Some(body) => self.infer(body, false).map_or(Step::Defer, |_| Step::Done(Ty::Void)),
                None => Step::Done(Ty::Void),
            }),
            NodeKind::MethodDef(def) => self.infer_method(id, &def),
            NodeKind::Argument { name, ty } => self.infer_argument(id, &name, ty.as_ref()),
            NodeKind::MacroDef { name, params, .. } => {
                if !self.macros.contains(&name) {
                    return Err(TypeError::UnknownMacro { name, span: self.ast.span(id) });
                }
                let scope = self.scope_of(id);
                for param in &params {
                    self.resolve_type_name(scope, param, id)?;
                }
                Ok(Step::Done(Ty::Void))
            }
            NodeKind::Closure { args, body } => {
                let args = self.infer_all(&args, true);
                let body = self.infer(body, true);
                Ok(match (args, body) {
                    (Some(_), Some(_)) => Step::Done(Ty::Block),
                    _ => Step::Defer,
                })
            }
            NodeKind::Import { .. } => Ok(Step::Done(Ty::Void)),
        }
    }

    /// A sequence: every statement is attempted; the value is the last one's.
    fn infer_body(&mut self, stmts: &[NodeId], expression: bool) -> Step {
        let Some(last) = stmts.len().checked_sub(1) else {
            return Step::Done(Ty::Void);
        };
        let mut unknown = false;
        let mut result = Ty::Void;
        for (i, stmt) in stmts.iter().enumerate() {
            match self.infer(*stmt, expression && i == last) {
                Some(ty) if i == last => result = ty,
                Some(_) => {}
                None => unknown = true,
            }
        }
        if unknown {
            return Step::Defer;
        }
        if expression || result.is_unreachable() {
            Step::Done(result)
        } else {
            Step::Done(Ty::Void)
        }
    }

    // ── Locals and fields ──────────────────────────────────────────────

    fn note_local_use(&mut self, scope: ScopeId, name: &str) {
        self.scopes.note_use(scope, name);
        if self.scopes.is_captured(scope, name) {
            self.scopes.binding_type(scope, &mut self.ctx);
        }
    }

    fn infer_local(&mut self, id: NodeId, name: &str) -> Result<Step, TypeError> {
        let scope = self.scope_of(id);
        if !self.scopes.has_local(scope, name) {
            return Err(TypeError::UndefinedLocal { name: name.to_string(), span: self.ast.span(id) });
        }
        self.note_local_use(scope, name);
        let owner = self.scopes.containing_scope(scope, name);
        if let Some(ty) = self.tables.local_type(owner, name) {
            return Ok(Step::Done(ty.clone()));
        }
        if self.last_chance {
            // Only ever assigned null.
            let object = self.ctx.object();
            let ty = match self.tables.learn_local_type(&mut self.ctx, owner, name, object) {
                Ok(ty) => ty,
                Err(conflict) => conflict.existing,
            };
            debug!(local = name, %ty, "defaulted local");
            return Ok(Step::Done(ty));
        }
        Ok(Step::Defer)
    }

    fn infer_local_assign(&mut self, id: NodeId, name: &str, value: NodeId) -> Result<Step, TypeError> {
        let scope = self.scope_of(id);
        let owner = self.scopes.containing_scope(scope, name);
        if !self.scopes.has_local(scope, name) {
            self.scopes.declare(owner, name);
        }
        self.note_local_use(scope, name);
        let Some(value_ty) = self.infer(value, true) else {
            return Ok(Step::Defer);
        };
        if value_ty.is_unreachable() {
            return Ok(Step::Done(value_ty));
        }
        if value_ty.is_null() && self.tables.local_type(owner, name).is_none() {
            return Ok(Step::Done(Ty::Null));
        }
        match self.tables.learn_local_type(&mut self.ctx, owner, name, value_ty.clone()) {
            Ok(ty) => {
                trace!(local = name, %ty, "learned local");
                Ok(Step::Done(ty))
            }
            Err(conflict) => Err(TypeError::IncompatibleLocal {
                name: name.to_string(),
                existing: conflict.existing,
                found: value_ty,
                span: self.ast.span(id),
            }),
        }
    }

    fn infer_local_decl(&mut self, id: NodeId, name: &str, ty: &TypeName) -> Result<Step, TypeError> {
        let scope = self.scope_of(id);
        let declared = self.resolve_type_name(scope, ty, id)?;
        let owner = self.scopes.containing_scope(scope, name);
        match self.tables.learn_local_type(&mut self.ctx, owner, name, declared.clone()) {
            Ok(ty) => Ok(Step::Done(ty)),
            Err(conflict) => Err(TypeError::IncompatibleLocal {
                name: name.to_string(),
                existing: conflict.existing,
                found: declared,
                span: self.ast.span(id),
            }),
        }
    }

    /// Fields live on the class, or on its static side.
    fn field_owner(&mut self, id: NodeId, is_static: bool) -> Ty {
        let scope = self.scope_of(id);
        let self_ty = self.self_type(scope);
        let class = self.ctx.unmeta(&self_ty);
        if is_static || self_ty.is_meta() {
            self.ctx.meta(&class)
        } else {
            class
        }
    }

    fn infer_field(&mut self, id: NodeId, name: &str, is_static: bool) -> Result<Step, TypeError> {
        let owner = self.field_owner(id, is_static);
        Ok(match self.tables.field_type(&owner, name) {
            Some(ty) => Step::Done(ty.clone()),
            None => Step::Defer,
        })
    }

    fn infer_field_assign(&mut self, id: NodeId, name: &str, value: NodeId, is_static: bool) -> Result<Step, TypeError> {
        let owner = self.field_owner(id, is_static);
        let Some(value_ty) = self.infer(value, true) else {
            return Ok(Step::Defer);
        };
        if value_ty.is_unreachable() {
            return Ok(Step::Done(value_ty));
        }
        if value_ty.is_null() && self.tables.field_type(&owner, name).is_none() {
            return Ok(Step::Done(Ty::Null));
        }
        match self.tables.learn_field_type(&mut self.ctx, &owner, name, value_ty.clone()) {
            Ok(ty) => {
                trace!(%owner, field = name, %ty, "learned field");
                Ok(Step::Done(ty))
            }
            Err(conflict) => Err(TypeError::IncompatibleField {
                name: name.to_string(),
                existing: conflict.existing,
                found: value_ty,
                span: self.ast.span(id),
            }),
        }
    }

    fn infer_field_decl(&mut self, id: NodeId, name: &str, ty: &TypeName, is_static: bool) -> Result<Step, TypeError> {
        let scope = self.scope_of(id);
        let declared = self.resolve_type_name(scope, ty, id)?;
        let owner = self.field_owner(id, is_static);
        match self.tables.learn_field_type(&mut self.ctx, &owner, name, declared.clone()) {
            Ok(_) => Ok(Step::Done(Ty::Void)),
            Err(conflict) => Err(TypeError::IncompatibleField {
                name: name.to_string(),
                existing: conflict.existing,
                found: declared,
                span: self.ast.span(id),
            }),
        }
    }

    // ── Calls ──────────────────────────────────────────────────────────

    /// Arguments plus the optional block, `None` while any is unknown.
    fn infer_arguments(&mut self, args: &[NodeId], block: Option<NodeId>) -> Option<Vec<Ty>> {
        let arg_tys = self.infer_all(args, true);
        let block_ty = match block {
            Some(block) => self.infer(block, true).map(Some),
            None => Some(None),
        };
        let mut arg_tys = arg_tys?;
        if block_ty?.is_some() {
            arg_tys.push(Ty::Block);
        }
        Some(arg_tys)
    }

    fn infer_call(
        &mut self,
        id: NodeId,
        target: NodeId,
        name: &str,
        args: &[NodeId],
        block: Option<NodeId>,
    ) -> Result<Step, TypeError> {
        let receiver = self.infer(target, true);
        let arg_tys = self.infer_arguments(args, block);
        let (Some(receiver), Some(arg_tys)) = (receiver, arg_tys) else {
            return Ok(Step::Defer);
        };
        if let Some(poison) = first_error(&receiver, &arg_tys) {
            return Ok(Step::Done(poison));
        }
        let is_meta = receiver.is_meta();
        self.dispatch(id, &receiver, name, &arg_tys, is_meta, false)
    }

    fn infer_self_call(
        &mut self,
        id: NodeId,
        name: &str,
        args: &[NodeId],
        block: Option<NodeId>,
    ) -> Result<Step, TypeError> {
        let scope = self.scope_of(id);
        let span = self.ast.span(id);
        if args.is_empty() && block.is_none() && self.scopes.has_local(scope, name) {
            trace!(name, "self call is a local read");
            let local = self.ast.alloc_at(NodeKind::Local(name.to_string()), span);
            return Ok(Step::Replace(local));
        }
        if args.len() == 1 && block.is_none() && self.lookup_type(scope, &TypeName::new(name)).is_some() {
            trace!(name, "self call is a cast");
            let cast = self.ast.alloc_at(NodeKind::Cast { ty: TypeName::new(name), value: args[0] }, span);
            return Ok(Step::Replace(cast));
        }
        let receiver = self.self_type(scope);
        let Some(arg_tys) = self.infer_arguments(args, block) else {
            return Ok(Step::Defer);
        };
        if let Some(poison) = first_error(&receiver, &arg_tys) {
            return Ok(Step::Done(poison));
        }
        let is_meta = receiver.is_meta();
        self.dispatch(id, &receiver, name, &arg_tys, is_meta, !is_meta)
    }

    fn infer_super(&mut self, id: NodeId, args: &[NodeId]) -> Result<Step, TypeError> {
        let span = self.ast.span(id);
        let method = self.ast.ancestors(id).into_iter().find_map(|a| match self.ast.kind(a) {
            NodeKind::MethodDef(def) => Some(def.name.clone()),
            _ => None,
        });
        let Some(method) = method else {
            return Err(TypeError::SuperOutsideMethod { span });
        };
        let scope = self.scope_of(id);
        let self_ty = self.self_type(scope);
        let class = self.ctx.unmeta(&self_ty);
        let Some(superclass) = self.ctx.superclass(&class) else {
            return Err(TypeError::SuperOutsideMethod { span });
        };
        let Some(arg_tys) = self.infer_arguments(args, None) else {
            return Ok(Step::Defer);
        };
        if let Some(poison) = first_error(&superclass, &arg_tys) {
            return Ok(Step::Done(poison));
        }
        if method == "initialize" {
            let meta = self.ctx.meta(&superclass);
            return self.dispatch(id, &meta, "new", &arg_tys, true, false);
        }
        let receiver = if self_ty.is_meta() { self.ctx.meta(&superclass) } else { superclass };
        let is_meta = receiver.is_meta();
        self.dispatch(id, &receiver, &method, &arg_tys, is_meta, false)
    }

    /// Bind a call site to a member, expand it as a macro, or report why not.
    /// `static_fallback` retries on the static side when an instance lookup
    /// finds nothing.
    fn dispatch(
        &mut self,
        id: NodeId,
        receiver: &Ty,
        name: &str,
        args: &[Ty],
        is_meta: bool,
        static_fallback: bool,
    ) -> Result<Step, TypeError> {
        let span = self.ast.span(id);
        let scope = self.scope_of(id);
        let meta = self.ctx.meta(receiver);
        let owner = if is_meta { meta.clone() } else { receiver.clone() };
        let mut blocked = self.blocked_by_pending(&owner, name);
        if static_fallback {
            blocked = blocked || self.blocked_by_pending(&meta, name);
        }
        if blocked && !self.last_chance {
            trace!(%owner, name, "waiting on pending declaration");
            return Ok(Step::Defer);
        }

        let caller = self.scopes.self_type(scope);
        let query = MemberQuery {
            receiver,
            name,
            args,
            macro_args: Some(args),
            is_meta,
            caller: caller.as_ref(),
        };
        let mut found = resolve_member(&mut self.ctx, &self.tables, &query)
            .map_err(|err| TypeError::from_lookup(err, caller.as_ref(), span))?;
        if found.is_none() && static_fallback {
            let query = MemberQuery { receiver: &meta, is_meta: true, ..query };
            found = resolve_member(&mut self.ctx, &self.tables, &query)
                .map_err(|err| TypeError::from_lookup(err, caller.as_ref(), span))?;
        }

        match found {
            Some(member) if member.kind == MemberKind::Macro => self.expand_macro(id, &member.name),
            Some(member) => {
                trace!(%member, "bound call");
                let ret = member.ret.clone();
                self.ast.set_member(id, member);
                Ok(Step::Done(ret))
            }
            // Still pending in the last chance pass: leave it for the stall report.
            None if blocked => Ok(Step::Defer),
            None => Err(TypeError::NoMatchingMember {
                receiver: self.ctx.unmeta(receiver),
                name: name.to_string(),
                args: args.to_vec(),
                is_static: is_meta,
                span,
            }),
        }
    }

    fn expand_macro(&mut self, id: NodeId, name: &str) -> Result<Step, TypeError> {
        let span = self.ast.span(id);
        let Some(expander) = self.macros.get(name) else {
            return Err(TypeError::UnknownMacro { name: name.to_string(), span });
        };
        let Some(call) = MacroCall::from_node(&self.ast, id) else {
            return Err(TypeError::MacroExpansion {
                name: name.to_string(),
                message: "not a call site".to_string(),
                span,
            });
        };
        match expander.expand(&mut self.ast, &call) {
            Ok(expansion) => {
                debug!(name, node = %self.ast.describe(id), "expanded macro");
                Ok(Step::Replace(expansion))
            }
            Err(message) => Err(TypeError::MacroExpansion { name: name.to_string(), message, span }),
        }
    }

    fn infer_cast(&mut self, id: NodeId, ty: &TypeName, value: NodeId) -> Result<Step, TypeError> {
        let value_ty = self.infer(value, true);
        let scope = self.scope_of(id);
        let target = self.resolve_type_name(scope, ty, id)?;
        let Some(value_ty) = value_ty else {
            return Ok(Step::Defer);
        };
        if value_ty.is_error() || value_ty.is_unreachable() {
            return Ok(Step::Done(target));
        }
        let allowed = match (&value_ty, &target) {
            (Ty::Prim(from), Ty::Prim(to)) => from.is_numeric() == to.is_numeric(),
            (Ty::Null, to) => to.is_reference(),
            (from, to) if from.is_reference() && to.is_reference() => {
                self.ctx.compatible(from, to) || self.ctx.is_interface(from) || self.ctx.is_interface(to)
            }
            _ => false,
        };
        if allowed {
            Ok(Step::Done(target))
        } else {
            Err(TypeError::InvalidCast { from: value_ty, to: target, span: self.ast.span(id) })
        }
    }

    // ── Control flow ───────────────────────────────────────────────────

    fn infer_if(
        &mut self,
        id: NodeId,
        condition: NodeId,
        then_body: Option<NodeId>,
        else_body: Option<NodeId>,
        expression: bool,
    ) -> Result<Step, TypeError> {
        let condition = self.infer(condition, true);
        let then_ty = then_body.map(|b| self.infer(b, expression));
        let else_ty = else_body.map(|b| self.infer(b, expression));

        if !expression {
            if condition.is_none() || matches!(then_ty, Some(None)) || matches!(else_ty, Some(None)) {
                return Ok(Step::Defer);
            }
            return Ok(Step::Done(match (then_ty.flatten(), else_ty.flatten()) {
                (Some(a), Some(b)) if a.is_unreachable() && b.is_unreachable() => a,
                _ => Ty::Void,
            }));
        }

        match (then_ty, else_ty) {
            (Some(Some(a)), Some(Some(b))) => match self.ctx.narrow(&a, &b) {
                Some(joined) if condition.is_some() => Ok(Step::Done(joined)),
                Some(joined) => Ok(Step::Provisional(joined)),
                None => Err(TypeError::IncompatibleBranches { then_ty: a, else_ty: b, span: self.ast.span(id) }),
            },
            // A missing branch takes the other branch's type.
            (Some(Some(ty)), None) | (None, Some(Some(ty))) if condition.is_some() => Ok(Step::Done(ty)),
            // Unreachable and null branches say nothing about the other one.
            (Some(Some(ty)), Some(None)) | (Some(None), Some(Some(ty)))
                if !ty.is_unreachable() && !ty.is_null() =>
            {
                Ok(Step::Provisional(ty))
            }
            (None, None) if condition.is_some() => Ok(Step::Done(Ty::Void)),
            _ => Ok(Step::Defer),
        }
    }

    fn infer_loop(&mut self, def: &LoopDef) -> Step {
        let condition = self.infer(def.condition, true).is_some();
        let mut known = condition;
        for part in [def.init, def.pre, def.body, def.post].into_iter().flatten() {
            known &= self.infer(part, false).is_some();
        }
        if known {
            Step::Done(Ty::Void)
        } else {
            Step::Defer
        }
    }

    fn infer_rescue(
        &mut self,
        id: NodeId,
        body: NodeId,
        clauses: &[NodeId],
        else_body: Option<NodeId>,
        expression: bool,
    ) -> Result<Step, TypeError> {
        let body_ty = self.infer(body, expression);
        let clause_tys = self.infer_all(clauses, expression);
        let else_ty = else_body.map(|b| self.infer(b, expression));
        let (Some(body_ty), Some(clause_tys)) = (body_ty, clause_tys) else {
            return Ok(Step::Defer);
        };
        let main = match else_ty {
            Some(None) => return Ok(Step::Defer),
            Some(Some(ty)) => ty,
            None => body_ty,
        };
        if !expression {
            return Ok(Step::Done(Ty::Void));
        }
        let mut joined = main;
        for clause in clause_tys {
            joined = match self.ctx.narrow(&joined, &clause) {
                Some(ty) => ty,
                None => {
                    return Err(TypeError::IncompatibleBranches {
                        then_ty: joined,
                        else_ty: clause,
                        span: self.ast.span(id),
                    })
                }
            };
        }
        Ok(Step::Done(joined))
    }

    fn infer_rescue_clause(
        &mut self,
        id: NodeId,
        types: &[TypeName],
        name: Option<&str>,
        body: NodeId,
        expression: bool,
    ) -> Result<Step, TypeError> {
        let outer = self.scope_of(id);
        let mut caught = Vec::new();
        for ty in types {
            caught.push(self.resolve_type_name(outer, ty, id)?);
        }
        if let Some(name) = name {
            let scope = self.scopes.scope_of_node(id).unwrap_or(outer);
            let bound = match caught.as_slice() {
                [single] => single.clone(),
                _ => self.ctx.class_type(THROWABLE),
            };
            if let Err(conflict) = self.tables.learn_local_type(&mut self.ctx, scope, name, bound.clone()) {
                return Err(TypeError::IncompatibleLocal {
                    name: name.to_string(),
                    existing: conflict.existing,
                    found: bound,
                    span: self.ast.span(id),
                });
            }
        }
        Ok(step(self.infer(body, expression)))
    }

    /// `raise "msg"` and `raise Cls, args` construct the exception in place.
    fn rewrite_raise(&mut self, id: NodeId, args: &[NodeId]) -> Vec<NodeId> {
        let (target, ctor_args) = match args {
            [single] if matches!(self.ast.kind(*single), NodeKind::Str(_)) => (None, vec![*single]),
            [first, rest @ ..] if matches!(self.ast.kind(*first), NodeKind::Constant(_)) => {
                (Some(*first), rest.to_vec())
            }
            _ => return args.to_vec(),
        };
        let span = self.ast.span(id);
        let target = match target {
            Some(target) => target,
            None => self.ast.alloc_at(NodeKind::Constant(TypeName::new(RUNTIME_EXCEPTION)), span),
        };
        let call = self.ast.alloc_at(
            NodeKind::Call { target, name: "new".to_string(), args: ctor_args, block: None },
            span,
        );
        self.ast.set_kind(id, NodeKind::Raise { args: vec![call] });
        let scope = self.scope_of(id);
        self.declare(call, scope);
        trace!(node = %self.ast.describe(id), "raise builds its exception");
        vec![call]
    }

    fn infer_raise(&mut self, id: NodeId, args: &[NodeId]) -> Result<Step, TypeError> {
        let args = self.rewrite_raise(id, args);
        let raised = Ty::Unreachable(ControlFlow::Raise);
        let Some(first) = args.first() else {
            return Ok(Step::Done(raised));
        };
        let Some(exception) = self.infer(*first, true) else {
            return Ok(Step::Defer);
        };
        if exception.is_error() {
            return Ok(Step::Done(raised));
        }
        let throwable = self.ctx.class_type(THROWABLE);
        if !self.ctx.assignable_from(&throwable, &exception) {
            return Err(TypeError::InvalidRaise { found: exception, span: self.ast.span(id) });
        }
        Ok(Step::Done(raised))
    }

    // ── Definitions ────────────────────────────────────────────────────

    /// Types of every `return` belonging to `method`, provisional ones
    /// included; `None` while any is unknown. Nested definitions and
    /// closures are skipped.
    fn return_types(&self, method: NodeId) -> Option<Vec<Ty>> {
        fn walk(engine: &Engine, id: NodeId, out: &mut Vec<Ty>) -> bool {
            let id = engine.ast.current(id);
            match engine.ast.kind(id) {
                NodeKind::MethodDef(_) | NodeKind::ClassDef(_) | NodeKind::Closure { .. } => return true,
                NodeKind::Return { value } => {
                    let Some(value) = value else {
                        out.push(Ty::Void);
                        return engine.ast.is_resolved(id);
                    };
                    let value = engine.ast.current(*value);
                    let ty = engine.ast.ty(value).or_else(|| engine.ast.provisional(value));
                    match ty {
                        Some(ty) => out.push(ty.clone()),
                        None => return false,
                    }
                    return true;
                }
                _ => {}
            }
            engine.ast.children(id).into_iter().all(|c| walk(engine, c, out))
        }
        let mut out = Vec::new();
        let complete = self.ast.children(method).into_iter().all(|c| walk(self, c, &mut out));
        complete.then_some(out)
    }

    fn infer_method(&mut self, id: NodeId, def: &MethodDef) -> Result<Step, TypeError> {
        let span = self.ast.span(id);
        let params = self.infer_all(&def.args, true);
        let scope = self.scopes.scope_of_node(id).unwrap_or_else(|| self.scope_of(id));
        let is_constructor = def.name == "initialize";
        let declared = match &def.return_type {
            _ if is_constructor => Some(Ty::Void),
            Some(name) => Some(self.resolve_type_name(scope, name, id)?),
            None => None,
        };
        let mut throws = Vec::new();
        for name in &def.throws {
            throws.push(self.resolve_type_name(scope, name, id)?);
        }
        let Some(params) = params else {
            return Ok(Step::Defer);
        };
        let signature = |ret: Ty| MethodSig {
            ret,
            throws: throws.clone(),
            visibility: def.visibility,
            is_abstract: def.is_abstract,
        };
        // A declared signature is usable by callers before the body is done.
        if let Some(ret) = &declared {
            self.learn_signature(id, &def.name, &params, signature(ret.clone()))?;
        }

        let body_expression = !matches!(declared, Some(Ty::Void));
        let body_ty = match def.body {
            Some(body) => self.infer(body, body_expression),
            None => Some(declared.clone().unwrap_or(Ty::Void)),
        };
        let returns = self.return_types(id);
        let (Some(body_ty), Some(returns)) = (body_ty, returns) else {
            return Ok(Step::Defer);
        };

        let mut inferred = body_ty;
        for ret in returns {
            inferred = match self.ctx.narrow(&inferred, &ret) {
                Some(ty) => ty,
                None => {
                    return Err(TypeError::ReturnMismatch {
                        method: def.name.clone(),
                        expected: inferred,
                        found: ret,
                        span,
                    })
                }
            };
        }
        if inferred.is_unreachable() {
            inferred = Ty::Void;
        } else if inferred.is_null() {
            inferred = self.ctx.object();
        }

        let ret = match declared {
            Some(declared) => {
                if !declared.is_void() && !self.ctx.assignable_from(&declared, &inferred) {
                    return Err(TypeError::ReturnMismatch {
                        method: def.name.clone(),
                        expected: declared,
                        found: inferred,
                        span,
                    });
                }
                declared
            }
            None => inferred,
        };
        self.learn_signature(id, &def.name, &params, signature(ret.clone()))?;
        Ok(Step::Done(ret))
    }

    fn infer_argument(&mut self, id: NodeId, name: &str, ty: Option<&TypeName>) -> Result<Step, TypeError> {
        let scope = self.scope_of(id);
        let ty = match ty {
            Some(name) => self.resolve_type_name(scope, name, id)?,
            None => self.ctx.object(),
        };
        match self.tables.learn_local_type(&mut self.ctx, scope, name, ty.clone()) {
            Ok(ty) => Ok(Step::Done(ty)),
            Err(conflict) => Err(TypeError::IncompatibleLocal {
                name: name.to_string(),
                existing: conflict.existing,
                found: ty,
                span: self.ast.span(id),
            }),
        }
    }
}
