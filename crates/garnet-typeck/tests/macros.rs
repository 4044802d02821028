//! Macro binding and expansion through the checker.

use garnet_typeck::ast::{Ast, NodeId, NodeKind, TypeName};
use garnet_typeck::macros::{MacroCall, MacroRegistry};
use garnet_typeck::ty::Ty;
use garnet_typeck::{check, check_with_macros, TypeckOptions};

#[test]
fn puts_expands_into_a_bound_println() {
    let mut ast = Ast::new();
    let one = ast.fixnum(1);
    let puts = ast.fcall("puts", vec![one]);
    let root = ast.script(vec![puts]);

    let result = check(ast, root, &TypeckOptions::default());
    assert!(result.converged());
    assert!(result.errors.is_empty(), "{:?}", result.errors);

    let expansion = result.ast.current(puts);
    assert_ne!(expansion, puts);
    assert_eq!(result.ast.describe(expansion), "Call(println)");
    assert_eq!(result.resolved_type(puts).unwrap(), &Ty::Void);

    let member = result.member(expansion).unwrap();
    assert_eq!(member.declaring, "java.io.PrintStream");
    assert_eq!(member.params, vec!["int".to_string()]);
}

#[test]
fn user_macro_replaces_its_call_site() {
    // macro def twice(int); twice(21)  =>  21 * 2
    let mut registry = MacroRegistry::with_builtins();
    registry.register("twice", |ast: &mut Ast, call: &MacroCall| -> Result<NodeId, String> {
        let [value] = call.args.as_slice() else {
            return Err("twice takes one argument".to_string());
        };
        let two = ast.fixnum(2);
        Ok(ast.alloc_at(
            NodeKind::Call { target: *value, name: "*".to_string(), args: vec![two], block: None },
            call.span,
        ))
    });

    let mut ast = Ast::new();
    let def = ast.macro_def("twice", vec![TypeName::new("int")]);
    let value = ast.fixnum(21);
    let call = ast.fcall("twice", vec![value]);
    let root = ast.script(vec![def, call]);

    let result = check_with_macros(ast, root, &TypeckOptions::default(), registry);
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(result.resolved_type(call).unwrap(), &Ty::int());
    assert_eq!(result.resolved_type(def).unwrap(), &Ty::Void);
    assert_eq!(result.ast.describe(result.ast.current(call)), "Call(*)");
}

#[test]
fn macro_without_an_expander_is_reported() {
    let mut ast = Ast::new();
    let def = ast.macro_def("nope", vec![]);
    let root = ast.script(vec![def]);

    let result = check(ast, root, &TypeckOptions::default());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].to_string(), "no expander registered for macro nope");
}

#[test]
fn failing_expander_becomes_a_type_error() {
    let mut registry = MacroRegistry::new();
    registry.register("explode", |_ast: &mut Ast, _call: &MacroCall| -> Result<NodeId, String> {
        Err("refusing to expand".to_string())
    });

    let mut ast = Ast::new();
    let def = ast.macro_def("explode", vec![]);
    let call = ast.fcall("explode", vec![]);
    let root = ast.script(vec![def, call]);

    let result = check_with_macros(ast, root, &TypeckOptions::default(), registry);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(
        result.errors[0].to_string(),
        "error expanding macro explode: refusing to expand"
    );
    assert!(result.resolved_type(call).unwrap().is_error());
}

#[test]
fn method_and_macro_of_the_same_shape_are_ambiguous() {
    // def puts(x:int); end; puts 1
    let mut ast = Ast::new();
    let x = ast.arg("x", TypeName::new("int"));
    let body = ast.body(vec![]);
    let def = ast.def("puts", vec![x], body);
    let one = ast.fixnum(1);
    let call = ast.fcall("puts", vec![one]);
    let root = ast.script(vec![def, call]);

    let result = check(ast, root, &TypeckOptions::default());
    assert_eq!(result.errors.len(), 1);
    let message = result.errors[0].to_string();
    assert!(message.starts_with("ambiguous call to puts: "), "{message}");
    assert!(message.contains("Script.puts(int)"), "{message}");
}
