//! Ariadne rendering for type errors.
//!
//! Every `TypeError` becomes one report with an error code, the error's own
//! message, a label on its span and, where there is an obvious next step, a
//! help line.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};

use crate::error::TypeError;

/// Rendering switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiagnosticOptions {
    pub color: bool,
}

impl DiagnosticOptions {
    /// Plain text output, used by snapshot tests.
    pub fn colorless() -> Self {
        DiagnosticOptions { color: false }
    }
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        DiagnosticOptions { color: true }
    }
}

// ── Error Codes ────────────────────────────────────────────────────────

fn error_code(err: &TypeError) -> &'static str {
    match err {
        TypeError::IncompatibleBranches { .. } => "E0101",
        TypeError::ReturnMismatch { .. } => "E0102",
        TypeError::IncompatibleLocal { .. } => "E0103",
        TypeError::IncompatibleField { .. } => "E0104",
        TypeError::DuplicateMethod { .. } => "E0105",
        TypeError::ConflictingSignature { .. } => "E0106",
        TypeError::NoMatchingMember { .. } => "E0107",
        TypeError::AmbiguousCall { .. } => "E0108",
        TypeError::InaccessibleMember { .. } => "E0109",
        TypeError::FinalFieldWrite { .. } => "E0110",
        TypeError::UnknownType { .. } => "E0111",
        TypeError::UndefinedLocal { .. } => "E0112",
        TypeError::InvalidRaise { .. } => "E0113",
        TypeError::InvalidCast { .. } => "E0114",
        TypeError::SuperOutsideMethod { .. } => "E0115",
        TypeError::MacroExpansion { .. } => "E0116",
        TypeError::UnknownMacro { .. } => "E0117",
        TypeError::Uninferable { .. } => "E0118",
    }
}

/// Short text for the primary label.
fn label_text(err: &TypeError) -> String {
    match err {
        TypeError::IncompatibleBranches { then_ty, else_ty, .. } => {
            format!("then branch is {}, else branch is {}", then_ty, else_ty)
        }
        TypeError::ReturnMismatch { expected, found, .. } => format!("expected {}, found {}", expected, found),
        TypeError::IncompatibleLocal { existing, found, .. } | TypeError::IncompatibleField { existing, found, .. } => {
            format!("already {}, assigned {}", existing, found)
        }
        TypeError::DuplicateMethod { .. } => "defined again here".to_string(),
        TypeError::ConflictingSignature { existing, found, .. } => {
            format!("returns {} here, {} elsewhere", found, existing)
        }
        TypeError::NoMatchingMember { .. } => "no applicable member".to_string(),
        TypeError::AmbiguousCall { candidates, .. } => format!("{} candidates apply", candidates.len()),
        TypeError::InaccessibleMember { .. } => "not visible here".to_string(),
        TypeError::FinalFieldWrite { .. } => "field is final".to_string(),
        TypeError::UnknownType { .. } => "unknown type".to_string(),
        TypeError::UndefinedLocal { .. } => "undefined".to_string(),
        TypeError::InvalidRaise { found, .. } => format!("{} is not Throwable", found),
        TypeError::InvalidCast { from, to, .. } => format!("{} to {}", from, to),
        TypeError::SuperOutsideMethod { .. } => "no superclass method to call".to_string(),
        TypeError::MacroExpansion { .. } => "expansion failed".to_string(),
        TypeError::UnknownMacro { .. } => "no expander registered".to_string(),
        TypeError::Uninferable { .. } => "type depends on itself".to_string(),
    }
}

fn help_text(err: &TypeError) -> Option<String> {
    match err {
        TypeError::IncompatibleBranches { .. } => Some("make both branches produce related types".to_string()),
        TypeError::AmbiguousCall { candidates, .. } => Some(format!("candidates: {}", candidates.join(", "))),
        TypeError::UnknownType { .. } => Some("check the spelling or add an import".to_string()),
        TypeError::UndefinedLocal { name, .. } => Some(format!("assign `{}` before reading it", name)),
        TypeError::DuplicateMethod { .. } => Some("rename one definition or change its parameters".to_string()),
        TypeError::Uninferable { .. } => Some("declare a return type to break the cycle".to_string()),
        _ => None,
    }
}

/// Clamp a range into `source`, widening empty ranges to one character.
fn clamp(range: Range<usize>, source_len: usize) -> Range<usize> {
    let start = range.start.min(source_len);
    let end = range.end.min(source_len).max(start);
    if start == end {
        start..end.saturating_add(1).min(source_len)
    } else {
        start..end
    }
}

/// Render one type error against its source text.
pub fn render_diagnostic(error: &TypeError, source: &str, filename: &str, options: &DiagnosticOptions) -> String {
    let config = Config::default().with_color(options.color);
    let span = clamp(error.span().to_range(source.len()), source.len());

    let mut builder = Report::build(ReportKind::Error, span.clone())
        .with_code(error_code(error))
        .with_message(error.to_string())
        .with_config(config)
        .with_label(
            Label::new(span)
                .with_message(label_text(error))
                .with_color(Color::Red),
        );
    if let Some(help) = help_text(error) {
        builder.set_help(help);
    }
    if !filename.is_empty() {
        builder.set_note(format!("in {}", filename));
    }

    let mut buf = Vec::new();
    if builder.finish().write(Source::from(source), &mut buf).is_err() {
        return format!("error[{}]: {}", error_code(error), error);
    }
    String::from_utf8_lossy(&buf).into_owned()
}
