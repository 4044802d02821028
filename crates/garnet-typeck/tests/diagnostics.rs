//! Rendering of type errors: messages, plain diagnostics, JSON and ariadne
//! reports.

use garnet_common::{LineIndex, Span};
use garnet_typeck::ast::Ast;
use garnet_typeck::diagnostics::DiagnosticOptions;
use garnet_typeck::{check, TypeckOptions, TypeckResult};

/// An `if` whose branches are a double and a String, spanned over `SOURCE`.
const SOURCE: &str = "if true\n  1.0\nelse\n  ''\nend\n";

fn incompatible_if() -> TypeckResult {
    let mut ast = Ast::new();
    let cond = ast.boolean(true);
    ast.set_span(cond, Span::new(3, 7));
    let one = ast.float(1.0);
    ast.set_span(one, Span::new(10, 13));
    let then_body = ast.body(vec![one]);
    let text = ast.string("");
    ast.set_span(text, Span::new(21, 23));
    let else_body = ast.body(vec![text]);
    let iff = ast.if_(cond, Some(then_body), Some(else_body));
    ast.set_span(iff, Span::new(0, 27));
    let root = ast.script(vec![iff]);
    check(ast, root, &TypeckOptions::default())
}

#[test]
fn incompatible_branches_message() {
    let result = incompatible_if();
    insta::assert_snapshot!(
        result.errors[0].to_string(),
        @"if statement with incompatible result types double and java.lang.String"
    );
}

#[test]
fn diagnostics_carry_spans_and_positions() {
    let result = incompatible_if();
    let diags = result.diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].span, Span::new(0, 27));
    let index = LineIndex::new(SOURCE);
    insta::assert_snapshot!(
        diags[0].located(&index),
        @"1:1: error: if statement with incompatible result types double and java.lang.String"
    );
}

#[test]
fn diagnostics_serialize_to_json() {
    let mut ast = Ast::new();
    let read = ast.local("zz");
    ast.set_span(read, Span::new(0, 2));
    let root = ast.script(vec![read]);
    let result = check(ast, root, &TypeckOptions::default());

    insta::assert_snapshot!(
        result.diagnostics_json().unwrap(),
        @r#"[{"severity":"error","message":"undefined local variable zz","span":{"start":0,"end":2}}]"#
    );
}

#[test]
fn ariadne_report_names_code_and_help() {
    let result = incompatible_if();
    let rendered = result.render_errors(SOURCE, "branches.gt", &DiagnosticOptions::colorless());
    assert_eq!(rendered.len(), 1);
    let report = &rendered[0];
    assert!(report.contains("E0101"), "{report}");
    assert!(report.contains("if statement with incompatible result types"), "{report}");
    assert!(report.contains("then branch is double, else branch is java.lang.String"), "{report}");
    assert!(report.contains("make both branches produce related types"), "{report}");
}
