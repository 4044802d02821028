//! End-to-end inference tests over hand-built scripts.
//!
//! Each test builds a small AST the way the parser would, runs the checker
//! with default options and inspects node types, learned tables and errors.

use garnet_typeck::ast::{Ast, ClassDef, MethodDef, NodeId, TypeName};
use garnet_typeck::driver::DriverState;
use garnet_typeck::engine::Engine;
use garnet_typeck::macros::MacroRegistry;
use garnet_typeck::member::Visibility;
use garnet_typeck::ty::Ty;
use garnet_typeck::{check, TypeckOptions, TypeckResult};

// ── Helpers ────────────────────────────────────────────────────────────

fn run(ast: Ast, root: NodeId) -> TypeckResult {
    check(ast, root, &TypeckOptions::default())
}

fn assert_clean(result: &TypeckResult) {
    assert!(result.converged(), "driver stopped in {:?}", result.state);
    assert!(result.errors.is_empty(), "unexpected errors: {:?}", result.errors);
    assert!(result.internal_errors.is_empty(), "internal errors: {:?}", result.internal_errors);
}

/// `def bar(x:int); 1.0; end`, `def baz; bar(1); end`, then `baz`.
fn forward_reference(bar_first: bool) -> (TypeckResult, NodeId, NodeId) {
    let mut ast = Ast::new();
    let x = ast.arg("x", TypeName::new("int"));
    let value = ast.float(1.0);
    let bar_body = ast.body(vec![value]);
    let bar = ast.def("bar", vec![x], bar_body);

    let one = ast.fixnum(1);
    let call = ast.fcall("bar", vec![one]);
    let baz_body = ast.body(vec![call]);
    let baz = ast.def("baz", vec![], baz_body);

    let use_baz = ast.fcall("baz", vec![]);
    let stmts = if bar_first { vec![bar, baz, use_baz] } else { vec![baz, bar, use_baz] };
    let root = ast.script(stmts);
    (run(ast, root), call, use_baz)
}

// ── Locals ─────────────────────────────────────────────────────────────

#[test]
fn local_takes_the_type_of_its_assignment() {
    let mut ast = Ast::new();
    let one = ast.fixnum(1);
    let assign = ast.assign("a", one);
    let read = ast.local("a");
    let root = ast.script(vec![assign, read]);

    let result = run(ast, root);
    assert_clean(&result);
    assert_eq!(result.resolved_type(read).unwrap(), &Ty::int());
    assert_eq!(result.script_local("a"), Some(&Ty::int()));
    assert_eq!(result.result_type, Some(Ty::int()));
}

#[test]
fn large_fixnum_is_long() {
    let mut ast = Ast::new();
    let big = ast.fixnum(1 << 40);
    let root = ast.script(vec![big]);

    let result = run(ast, root);
    assert_clean(&result);
    assert_eq!(result.resolved_type(big).unwrap(), &Ty::long());
}

#[test]
fn reassigning_an_unrelated_type_is_an_error() {
    let mut ast = Ast::new();
    let one = ast.fixnum(1);
    let first = ast.assign("a", one);
    let text = ast.string("s");
    let second = ast.assign("a", text);
    let root = ast.script(vec![first, second]);

    let result = run(ast, root);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(
        result.errors[0].to_string(),
        "cannot assign java.lang.String to local a of type int"
    );
    assert!(result.resolved_type(second).unwrap().is_error());
    assert_eq!(result.script_local("a"), Some(&Ty::int()));
}

#[test]
fn local_assigned_only_null_defaults_to_object() {
    let mut ast = Ast::new();
    let null = ast.null();
    let assign = ast.assign("a", null);
    let read = ast.local("a");
    let root = ast.script(vec![assign, read]);

    let result = run(ast, root);
    assert_clean(&result);
    assert_eq!(result.resolved_type(read).unwrap().to_string(), "java.lang.Object");
}

#[test]
fn reading_an_unknown_local_is_an_error() {
    let mut ast = Ast::new();
    let read = ast.local("missing");
    let root = ast.script(vec![read]);

    let result = run(ast, root);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].to_string(), "undefined local variable missing");
}

#[test]
fn zero_argument_self_call_reads_a_local() {
    let mut ast = Ast::new();
    let one = ast.fixnum(1);
    let assign = ast.assign("a", one);
    let call = ast.fcall("a", vec![]);
    let root = ast.script(vec![assign, call]);

    let result = run(ast, root);
    assert_clean(&result);
    assert_ne!(result.ast.current(call), call);
    assert_eq!(result.ast.describe(result.ast.current(call)), "Local(a)");
    assert_eq!(result.resolved_type(call).unwrap(), &Ty::int());
}

#[test]
fn single_argument_call_named_after_a_type_is_a_cast() {
    let mut ast = Ast::new();
    let one = ast.fixnum(1);
    let assign = ast.assign("a", one);
    let read = ast.local("a");
    let call = ast.fcall("long", vec![read]);
    let root = ast.script(vec![assign, call]);

    let result = run(ast, root);
    assert_clean(&result);
    assert_eq!(result.resolved_type(call).unwrap(), &Ty::long());
}

// ── Methods ────────────────────────────────────────────────────────────

#[test]
fn forward_reference_resolves_in_either_order() {
    for bar_first in [true, false] {
        let (result, call, use_baz) = forward_reference(bar_first);
        assert_clean(&result);
        assert_eq!(result.resolved_type(call).unwrap(), &Ty::double());
        assert_eq!(result.resolved_type(use_baz).unwrap(), &Ty::double());
        let member = result.member(call).unwrap();
        assert_eq!(member.name, "bar");
        assert_eq!(member.params, vec!["int".to_string()]);
    }
}

#[test]
fn method_signatures_land_in_the_tables() {
    let (mut result, _, _) = forward_reference(false);
    let script = result.ctx.class_type("Script");
    let meta = result.ctx.meta(&script);
    let sig = result.tables.method_type(&meta, "baz", &[]).unwrap();
    assert_eq!(sig.ret, Ty::double());
    assert!(!result.tables.is_pending(&meta, "baz"));
}

#[test]
fn early_return_joins_with_the_body() {
    // def pick(flag:boolean); if flag; return 1; end; 2.5; end
    let mut ast = Ast::new();
    let flag = ast.arg("flag", TypeName::new("boolean"));
    let cond = ast.local("flag");
    let one = ast.fixnum(1);
    let ret = ast.ret(Some(one));
    let then_body = ast.body(vec![ret]);
    let iff = ast.if_(cond, Some(then_body), None);
    let tail = ast.float(2.5);
    let body = ast.body(vec![iff, tail]);
    let pick = ast.def("pick", vec![flag], body);
    let root = ast.script(vec![pick]);

    let result = run(ast, root);
    assert_clean(&result);
    assert_eq!(result.resolved_type(pick).unwrap(), &Ty::double());
    assert_eq!(result.resolved_type(iff).unwrap(), &Ty::Void);
}

#[test]
fn declared_return_type_must_fit_the_body() {
    let mut ast = Ast::new();
    let text = ast.string("nope");
    let body = ast.body(vec![text]);
    let def = ast.method(MethodDef::new("count").returns(TypeName::new("int")).body(body));
    let root = ast.script(vec![def]);

    let result = run(ast, root);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(
        result.errors[0].to_string(),
        "invalid return type java.lang.String in method count, expected int"
    );
}

#[test]
fn method_that_only_raises_returns_void() {
    let mut ast = Ast::new();
    let message = ast.string("boom");
    let raise = ast.raise(vec![message]);
    let body = ast.body(vec![raise]);
    let fail = ast.def("fail", vec![], body);
    let root = ast.script(vec![fail]);

    let result = run(ast, root);
    assert_clean(&result);
    assert_eq!(result.resolved_type(fail).unwrap(), &Ty::Void);
    assert!(result.resolved_type(raise).unwrap().is_unreachable());
    let ctor = result.ast.children(raise)[0];
    let member = result.member(ctor).unwrap();
    assert_eq!(member.declaring, "java.lang.RuntimeException");
    assert_eq!(member.params, vec!["java.lang.String".to_string()]);
}

#[test]
fn raising_a_non_throwable_is_an_error() {
    let mut ast = Ast::new();
    let one = ast.fixnum(1);
    let raise = ast.raise(vec![one]);
    let root = ast.script(vec![raise]);

    let result = run(ast, root);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].to_string(), "cannot raise int: not a java.lang.Throwable");
}

#[test]
fn duplicate_definitions_are_reported() {
    let mut ast = Ast::new();
    let a = ast.fixnum(1);
    let first_body = ast.body(vec![a]);
    let first = ast.def("twice", vec![], first_body);
    let b = ast.fixnum(2);
    let second_body = ast.body(vec![b]);
    let second = ast.def("twice", vec![], second_body);
    let root = ast.script(vec![first, second]);

    let result = run(ast, root);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].to_string(), "duplicate method Script.class.twice()");
}

// ── Control flow ───────────────────────────────────────────────────────

#[test]
fn if_expression_widens_to_the_common_type() {
    let mut ast = Ast::new();
    let cond = ast.boolean(true);
    let one = ast.fixnum(1);
    let then_body = ast.body(vec![one]);
    let two = ast.float(2.0);
    let else_body = ast.body(vec![two]);
    let iff = ast.if_(cond, Some(then_body), Some(else_body));
    let root = ast.script(vec![iff]);

    let result = run(ast, root);
    assert_clean(&result);
    assert_eq!(result.resolved_type(iff).unwrap(), &Ty::double());
}

#[test]
fn if_expression_with_unrelated_branches_is_an_error() {
    let mut ast = Ast::new();
    let cond = ast.boolean(true);
    let one = ast.float(1.0);
    let then_body = ast.body(vec![one]);
    let text = ast.string("");
    let else_body = ast.body(vec![text]);
    let iff = ast.if_(cond, Some(then_body), Some(else_body));
    let root = ast.script(vec![iff]);

    let result = run(ast, root);
    assert_eq!(result.errors.len(), 1);
    assert!(result.resolved_type(iff).unwrap().is_error());
}

#[test]
fn branch_resolved_in_a_later_cycle_is_still_checked() {
    // def pick(flag:boolean); if flag; 1; else; later; end; end
    // def later; ''; end
    let mut ast = Ast::new();
    let flag = ast.arg("flag", TypeName::new("boolean"));
    let cond = ast.local("flag");
    let one = ast.fixnum(1);
    let then_body = ast.body(vec![one]);
    let later_call = ast.fcall("later", vec![]);
    let else_body = ast.body(vec![later_call]);
    let iff = ast.if_(cond, Some(then_body), Some(else_body));
    let pick_body = ast.body(vec![iff]);
    let pick = ast.def("pick", vec![flag], pick_body);
    let text = ast.string("");
    let later_body = ast.body(vec![text]);
    let later = ast.def("later", vec![], later_body);
    let root = ast.script(vec![pick, later]);

    let result = run(ast, root);
    assert!(result.converged());
    assert_eq!(result.errors.len(), 1, "{:?}", result.errors);
    assert_eq!(
        result.errors[0].to_string(),
        "if statement with incompatible result types int and java.lang.String"
    );
    assert!(result.resolved_type(iff).unwrap().is_error());
    assert!(result.resolved_type(pick).unwrap().is_error());
}

#[test]
fn statement_if_does_not_join_its_branches() {
    let mut ast = Ast::new();
    let cond = ast.boolean(true);
    let one = ast.float(1.0);
    let then_body = ast.body(vec![one]);
    let text = ast.string("");
    let else_body = ast.body(vec![text]);
    let iff = ast.if_(cond, Some(then_body), Some(else_body));
    let tail = ast.fixnum(0);
    let root = ast.script(vec![iff, tail]);

    let result = run(ast, root);
    assert_clean(&result);
    assert_eq!(result.resolved_type(iff).unwrap(), &Ty::Void);
}

#[test]
fn while_loop_is_void() {
    let mut ast = Ast::new();
    let cond = ast.boolean(false);
    let brk = ast.break_();
    let body = ast.body(vec![brk]);
    let lp = ast.while_(cond, body);
    let root = ast.script(vec![lp]);

    let result = run(ast, root);
    assert_clean(&result);
    assert_eq!(result.resolved_type(lp).unwrap(), &Ty::Void);
    assert!(result.resolved_type(brk).unwrap().is_unreachable());
}

#[test]
fn rescue_binds_the_caught_exception() {
    // begin; 1; rescue IllegalArgumentException => e; e.getMessage; 2; end
    let mut ast = Ast::new();
    let one = ast.fixnum(1);
    let body = ast.body(vec![one]);
    let e = ast.local("e");
    let message = ast.call(e, "getMessage", vec![]);
    let two = ast.fixnum(2);
    let clause_body = ast.body(vec![message, two]);
    let clause = ast.rescue_clause(vec![TypeName::new("IllegalArgumentException")], Some("e"), clause_body);
    let rescue = ast.rescue(body, vec![clause], None);
    let root = ast.script(vec![rescue]);

    let result = run(ast, root);
    assert_clean(&result);
    assert_eq!(result.resolved_type(rescue).unwrap(), &Ty::int());
    assert_eq!(result.resolved_type(e).unwrap().to_string(), "java.lang.IllegalArgumentException");
    assert_eq!(result.resolved_type(message).unwrap().to_string(), "java.lang.String");
}

// ── Classes ────────────────────────────────────────────────────────────

#[test]
fn fields_and_constructors_of_a_user_class() {
    // class Foo; def initialize; @x = 1; end; def x; @x; end; end
    // Foo.new.x
    let mut ast = Ast::new();
    let one = ast.fixnum(1);
    let store = ast.field_assign("x", one);
    let init_body = ast.body(vec![store]);
    let init = ast.def("initialize", vec![], init_body);
    let load = ast.field("x");
    let getter_body = ast.body(vec![load]);
    let getter = ast.def("x", vec![], getter_body);
    let class_body = ast.body(vec![getter, init]);
    let class = ast.class_def(ClassDef::new("Foo").body(class_body));

    let foo = ast.constant("Foo");
    let new = ast.call(foo, "new", vec![]);
    let call = ast.call(new, "x", vec![]);
    let root = ast.script(vec![class, call]);

    let result = run(ast, root);
    assert_clean(&result);
    assert_eq!(result.resolved_type(new).unwrap().to_string(), "Foo");
    assert_eq!(result.resolved_type(call).unwrap(), &Ty::int());
    assert_eq!(result.resolved_type(init).unwrap(), &Ty::Void);
}

#[test]
fn instance_code_reaches_static_methods_of_its_class() {
    // class Foo; def self.helper; 2; end; def go; helper; end; end
    let mut ast = Ast::new();
    let two = ast.fixnum(2);
    let helper_body = ast.body(vec![two]);
    let helper = ast.method(MethodDef::new("helper").static_().body(helper_body));
    let call = ast.fcall("helper", vec![]);
    let go_body = ast.body(vec![call]);
    let go = ast.def("go", vec![], go_body);
    let class_body = ast.body(vec![go, helper]);
    let class = ast.class_def(ClassDef::new("Foo").body(class_body));
    let root = ast.script(vec![class]);

    let result = run(ast, root);
    assert_clean(&result);
    assert_eq!(result.resolved_type(call).unwrap(), &Ty::int());
    assert!(result.member(call).unwrap().kind.is_static());
}

#[test]
fn private_methods_are_hidden_from_other_classes() {
    let mut ast = Ast::new();
    let one = ast.fixnum(1);
    let secret_body = ast.body(vec![one]);
    let secret = ast.method(
        MethodDef::new("secret")
            .visibility(Visibility::Private)
            .body(secret_body),
    );
    let class_body = ast.body(vec![secret]);
    let class = ast.class_def(ClassDef::new("Vault").body(class_body));
    let vault = ast.constant("Vault");
    let new = ast.call(vault, "new", vec![]);
    let call = ast.call(new, "secret", vec![]);
    let root = ast.script(vec![class, call]);

    let result = run(ast, root);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(
        result.errors[0].to_string(),
        "private Vault.secret() is not accessible from Script.class"
    );
}

#[test]
fn protected_methods_reach_subclasses_but_not_strangers() {
    // class acme.Base; protected def helper; 1; end; end
    // class Kid < acme.Base; def go; helper; end; end
    // acme.Base.new.helper
    let mut ast = Ast::new();
    let one = ast.fixnum(1);
    let helper_body = ast.body(vec![one]);
    let helper = ast.method(
        MethodDef::new("helper")
            .visibility(Visibility::Protected)
            .body(helper_body),
    );
    let base_body = ast.body(vec![helper]);
    let base = ast.class_def(ClassDef::new("acme.Base").body(base_body));

    let inherited = ast.fcall("helper", vec![]);
    let go_body = ast.body(vec![inherited]);
    let go = ast.def("go", vec![], go_body);
    let kid_body = ast.body(vec![go]);
    let kid = ast.class_def(
        ClassDef::new("Kid")
            .extends(TypeName::new("acme.Base"))
            .body(kid_body),
    );

    let class = ast.constant("acme.Base");
    let new = ast.call(class, "new", vec![]);
    let outside = ast.call(new, "helper", vec![]);
    let root = ast.script(vec![base, kid, outside]);

    let result = run(ast, root);
    assert_eq!(result.errors.len(), 1, "{:?}", result.errors);
    assert_eq!(
        result.errors[0].to_string(),
        "protected acme.Base.helper() is not accessible from Script.class"
    );
    assert_eq!(result.resolved_type(go).unwrap(), &Ty::int());
    assert_eq!(result.member(inherited).unwrap().declaring, "acme.Base");
}

#[test]
fn package_methods_are_visible_inside_their_package_only() {
    // class acme.Box; package def peek; 2; end; end
    // class acme.Reader; def look; acme.Box.new.peek; end; end
    // acme.Box.new.peek
    let mut ast = Ast::new();
    let two = ast.fixnum(2);
    let peek_body = ast.body(vec![two]);
    let peek = ast.method(
        MethodDef::new("peek")
            .visibility(Visibility::Package)
            .body(peek_body),
    );
    let box_body = ast.body(vec![peek]);
    let boxed = ast.class_def(ClassDef::new("acme.Box").body(box_body));

    let class = ast.constant("acme.Box");
    let new = ast.call(class, "new", vec![]);
    let inside = ast.call(new, "peek", vec![]);
    let look_body = ast.body(vec![inside]);
    let look = ast.def("look", vec![], look_body);
    let reader_body = ast.body(vec![look]);
    let reader = ast.class_def(ClassDef::new("acme.Reader").body(reader_body));

    let class = ast.constant("acme.Box");
    let new = ast.call(class, "new", vec![]);
    let outside = ast.call(new, "peek", vec![]);
    let root = ast.script(vec![boxed, reader, outside]);

    let result = run(ast, root);
    assert_eq!(result.errors.len(), 1, "{:?}", result.errors);
    assert_eq!(
        result.errors[0].to_string(),
        "package acme.Box.peek() is not accessible from Script.class"
    );
    assert_eq!(result.resolved_type(look).unwrap(), &Ty::int());
    assert!(result.resolved_type(outside).unwrap().is_error());
}

#[test]
fn static_code_cannot_call_instance_methods() {
    // class Foo; def inst; 1; end; def self.stat; inst; end; end
    let mut ast = Ast::new();
    let one = ast.fixnum(1);
    let inst_body = ast.body(vec![one]);
    let inst = ast.def("inst", vec![], inst_body);
    let call = ast.fcall("inst", vec![]);
    let stat_body = ast.body(vec![call]);
    let stat = ast.method(MethodDef::new("stat").static_().body(stat_body));
    let class_body = ast.body(vec![inst, stat]);
    let class = ast.class_def(ClassDef::new("Foo").body(class_body));
    let root = ast.script(vec![class]);

    let result = run(ast, root);
    assert_eq!(result.errors.len(), 1, "{:?}", result.errors);
    assert_eq!(result.errors[0].to_string(), "Cannot find static method inst() on Foo");
    assert!(result.resolved_type(call).unwrap().is_error());
}

#[test]
fn super_calls_the_superclass_method() {
    // class Base; def size; 1; end; end
    // class Derived < Base; def size; super; end; end
    let mut ast = Ast::new();
    let one = ast.fixnum(1);
    let base_size_body = ast.body(vec![one]);
    let base_size = ast.def("size", vec![], base_size_body);
    let base_body = ast.body(vec![base_size]);
    let base = ast.class_def(ClassDef::new("Base").body(base_body));

    let sup = ast.super_call(vec![]);
    let derived_size_body = ast.body(vec![sup]);
    let derived_size = ast.def("size", vec![], derived_size_body);
    let derived_body = ast.body(vec![derived_size]);
    let derived = ast.class_def(
        ClassDef::new("Derived")
            .extends(TypeName::new("Base"))
            .body(derived_body),
    );
    let root = ast.script(vec![derived, base]);

    let result = run(ast, root);
    assert_clean(&result);
    assert_eq!(result.resolved_type(derived_size).unwrap(), &Ty::int());
    assert_eq!(result.member(sup).unwrap().declaring, "Base");
}

// ── Closures ───────────────────────────────────────────────────────────

#[test]
fn closure_captures_an_outer_local() {
    // def run(r:Runnable); end
    // a = 1
    // run { puts a }
    let mut ast = Ast::new();
    let r = ast.arg("r", TypeName::new("Runnable"));
    let run_body = ast.body(vec![]);
    let run_def = ast.def("run", vec![r], run_body);
    let one = ast.fixnum(1);
    let assign = ast.assign("a", one);
    let read = ast.local("a");
    let puts = ast.fcall("puts", vec![read]);
    let block_body = ast.body(vec![puts]);
    let block = ast.closure(vec![], block_body);
    let call = ast.fcall_with_block("run", vec![], block);
    let root = ast.script(vec![run_def, assign, call]);

    let result = run(ast, root);
    assert_clean(&result);
    assert_eq!(result.resolved_type(block).unwrap(), &Ty::Block);
    assert_eq!(result.resolved_type(call).unwrap(), &Ty::Void);
    let script_scope = result.scopes.scope_of_node(root).unwrap();
    assert_eq!(result.scopes.captured(script_scope), vec!["a".to_string()]);
    assert!(result.scopes.has_binding(script_scope));
}

// ── Protocol ───────────────────────────────────────────────────────────

#[test]
fn inferring_a_resolved_node_again_returns_the_same_type() {
    let mut ast = Ast::new();
    let one = ast.fixnum(1);
    let assign = ast.assign("a", one);
    let read = ast.local("a");
    let root = ast.script(vec![assign, read]);

    let mut engine = Engine::new(ast, TypeckOptions::default(), MacroRegistry::with_builtins());
    engine.resolve(root, true).unwrap();
    let first = engine.infer(read, true);
    let second = engine.infer(read, false);
    assert_eq!(first, Some(Ty::int()));
    assert_eq!(first, second);
}

#[test]
fn reinferring_after_the_fixpoint_learns_nothing_new() {
    // a = 1; def twice(x:int); x * 2; end; b = twice(a)
    let mut ast = Ast::new();
    let one = ast.fixnum(1);
    let assign_a = ast.assign("a", one);
    let x = ast.arg("x", TypeName::new("int"));
    let read_x = ast.local("x");
    let two = ast.fixnum(2);
    let product = ast.call(read_x, "*", vec![two]);
    let body = ast.body(vec![product]);
    let twice = ast.def("twice", vec![x], body);
    let read_a = ast.local("a");
    let call = ast.fcall("twice", vec![read_a]);
    let assign_b = ast.assign("b", call);
    let root = ast.script(vec![assign_a, twice, assign_b]);

    let mut engine = Engine::new(ast, TypeckOptions::default(), MacroRegistry::with_builtins());
    assert_eq!(engine.resolve(root, true).unwrap(), DriverState::Converged);

    let script = engine.scopes().scope_of_node(root).unwrap();
    let locals = |engine: &Engine| -> Vec<(String, Ty)> {
        engine
            .tables()
            .locals_of(script)
            .into_iter()
            .map(|(name, ty)| (name.to_string(), ty.clone()))
            .collect()
    };
    let ids: Vec<NodeId> = engine.ast().iter().map(|(id, _)| id).collect();
    let types = |engine: &Engine| -> Vec<Option<Ty>> { ids.iter().map(|id| engine.ast().ty(*id).cloned()).collect() };

    let locals_before = locals(&engine);
    let types_before = types(&engine);
    let member_before = engine.ast().member(call).cloned();
    for id in &ids {
        let expression = engine.ast().is_expression(*id);
        engine.infer(*id, expression);
    }
    assert_eq!(locals(&engine), locals_before);
    assert_eq!(types(&engine), types_before);
    assert_eq!(engine.ast().member(call).cloned(), member_before);
    assert_eq!(locals_before, vec![("a".to_string(), Ty::int()), ("b".to_string(), Ty::int())]);
}

#[test]
fn call_with_no_candidate_is_a_hard_error() {
    let mut ast = Ast::new();
    let one = ast.fixnum(1);
    let call = ast.fcall("undefined_for_now", vec![]);
    let root = ast.script(vec![one, call]);
    let options = TypeckOptions { strict: false, ..TypeckOptions::default() };

    let result = check(ast, root, &options);
    assert!(result.converged());
    assert_eq!(result.resolved_type(one).unwrap(), &Ty::int());
    assert!(result.resolved_type(call).unwrap().is_error());
}
