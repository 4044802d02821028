//! Type error types.
//!
//! Three channels are kept apart: [`TypeError`] for definite problems in the
//! program being checked, [`LookupError`] for the failure side of member
//! resolution (converted into a `TypeError` by the call that asked), and
//! [`InternalError`] for misuse of the engine itself. [`CompileFailure`] is
//! what the strict driver returns when nodes remain unresolved.

use std::fmt;

use garnet_common::{Diagnostic, Span};

use crate::member::Member;
use crate::ty::{format_params, Ty};

/// A definite type error, detected with full information available.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeError {
    /// Both branches of an expression `if` resolved, to unrelated types.
    IncompatibleBranches { then_ty: Ty, else_ty: Ty, span: Span },
    /// A method body (or `return`) does not fit the declared return type.
    ReturnMismatch { method: String, expected: Ty, found: Ty, span: Span },
    /// A local already typed `existing` is assigned an unrelated type.
    IncompatibleLocal { name: String, existing: Ty, found: Ty, span: Span },
    /// A field already typed `existing` is assigned an unrelated type.
    IncompatibleField { name: String, existing: Ty, found: Ty, span: Span },
    /// A second definition with an identical signature.
    DuplicateMethod { owner: Ty, name: String, params: Vec<Ty>, span: Span },
    /// The same signature was learned with two different return types.
    ConflictingSignature { owner: Ty, name: String, params: Vec<Ty>, existing: Ty, found: Ty, span: Span },
    /// No method, macro, field accessor or inner class matches.
    NoMatchingMember { receiver: Ty, name: String, args: Vec<Ty>, is_static: bool, span: Span },
    /// More than one maximally specific candidate.
    AmbiguousCall { name: String, candidates: Vec<String>, span: Span },
    /// A candidate matched but is not visible from the calling class.
    InaccessibleMember { member: String, caller: String, span: Span },
    /// A setter call targets a `final` field.
    FinalFieldWrite { owner: Ty, field: String, span: Span },
    /// A type name that does not resolve through imports or packages.
    UnknownType { name: String, span: Span },
    /// A local read with no visible declaration or assignment.
    UndefinedLocal { name: String, span: Span },
    /// `raise` of something that is not a `Throwable`.
    InvalidRaise { found: Ty, span: Span },
    /// A cast between unrelated types.
    InvalidCast { from: Ty, to: Ty, span: Span },
    /// `super` outside a method of a class with a superclass.
    SuperOutsideMethod { span: Span },
    /// A macro expander reported failure.
    MacroExpansion { name: String, message: String, span: Span },
    /// A macro declaration with no registered expander.
    UnknownMacro { name: String, span: Span },
    /// A node the best-effort driver gave up on.
    Uninferable { node: String, span: Span },
}

impl TypeError {
    pub fn span(&self) -> Span {
        match self {
            TypeError::IncompatibleBranches { span, .. }
            | TypeError::ReturnMismatch { span, .. }
            | TypeError::IncompatibleLocal { span, .. }
            | TypeError::IncompatibleField { span, .. }
            | TypeError::DuplicateMethod { span, .. }
            | TypeError::ConflictingSignature { span, .. }
            | TypeError::NoMatchingMember { span, .. }
            | TypeError::AmbiguousCall { span, .. }
            | TypeError::InaccessibleMember { span, .. }
            | TypeError::FinalFieldWrite { span, .. }
            | TypeError::UnknownType { span, .. }
            | TypeError::UndefinedLocal { span, .. }
            | TypeError::InvalidRaise { span, .. }
            | TypeError::InvalidCast { span, .. }
            | TypeError::SuperOutsideMethod { span }
            | TypeError::MacroExpansion { span, .. }
            | TypeError::UnknownMacro { span, .. }
            | TypeError::Uninferable { span, .. } => *span,
        }
    }

    /// The backend-facing record.
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.to_string(), self.span())
    }

    /// Build the error for a failed member lookup.
    pub(crate) fn from_lookup(err: LookupError, caller: Option<&Ty>, span: Span) -> TypeError {
        match err {
            LookupError::Ambiguous { name, candidates } => TypeError::AmbiguousCall {
                name,
                candidates: candidates.iter().map(|m| m.to_string()).collect(),
                span,
            },
            LookupError::Inaccessible(member) => TypeError::InaccessibleMember {
                member: format!("{} {}", member.visibility, member),
                caller: caller.map(|c| c.to_string()).unwrap_or_else(|| "<toplevel>".into()),
                span,
            },
            LookupError::FinalFieldWrite(member) => TypeError::FinalFieldWrite {
                owner: member.declaring,
                field: member.name.trim_end_matches("_set").to_string(),
                span,
            },
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::IncompatibleBranches { then_ty, else_ty, .. } => write!(
                f,
                "if statement with incompatible result types {} and {}",
                then_ty, else_ty
            ),
            TypeError::ReturnMismatch { method, expected, found, .. } => write!(
                f,
                "invalid return type {} in method {}, expected {}",
                found, method, expected
            ),
            TypeError::IncompatibleLocal { name, existing, found, .. } => write!(
                f,
                "cannot assign {} to local {} of type {}",
                found, name, existing
            ),
            TypeError::IncompatibleField { name, existing, found, .. } => write!(
                f,
                "cannot assign {} to field {} of type {}",
                found, name, existing
            ),
            TypeError::DuplicateMethod { owner, name, params, .. } => write!(
                f,
                "duplicate method {}.{}({})",
                owner,
                name,
                format_params(params)
            ),
            TypeError::ConflictingSignature { owner, name, params, existing, found, .. } => write!(
                f,
                "conflicting return types for {}.{}({}): {} and {}",
                owner,
                name,
                format_params(params),
                existing,
                found
            ),
            TypeError::NoMatchingMember { receiver, name, args, is_static, .. } => write!(
                f,
                "Cannot find {} method {}({}) on {}",
                if *is_static { "static" } else { "instance" },
                name,
                format_params(args),
                receiver
            ),
            TypeError::AmbiguousCall { name, candidates, .. } => write!(
                f,
                "ambiguous call to {}: {}",
                name,
                candidates.join(", ")
            ),
            TypeError::InaccessibleMember { member, caller, .. } => {
                write!(f, "{} is not accessible from {}", member, caller)
            }
            TypeError::FinalFieldWrite { owner, field, .. } => {
                write!(f, "cannot assign to final field {}.{}", owner, field)
            }
            TypeError::UnknownType { name, .. } => write!(f, "cannot find class {}", name),
            TypeError::UndefinedLocal { name, .. } => write!(f, "undefined local variable {}", name),
            TypeError::InvalidRaise { found, .. } => {
                write!(f, "cannot raise {}: not a java.lang.Throwable", found)
            }
            TypeError::InvalidCast { from, to, .. } => write!(f, "cannot cast {} to {}", from, to),
            TypeError::SuperOutsideMethod { .. } => {
                write!(f, "super used outside a method with a superclass")
            }
            TypeError::MacroExpansion { name, message, .. } => {
                write!(f, "error expanding macro {}: {}", name, message)
            }
            TypeError::UnknownMacro { name, .. } => {
                write!(f, "no expander registered for macro {}", name)
            }
            TypeError::Uninferable { node, .. } => write!(f, "could not infer typing for {}", node),
        }
    }
}

impl std::error::Error for TypeError {}

/// The failure side of member resolution.
#[derive(Clone, Debug, PartialEq)]
pub enum LookupError {
    Ambiguous { name: String, candidates: Vec<Member> },
    Inaccessible(Member),
    FinalFieldWrite(Member),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::Ambiguous { name, candidates } => {
                write!(f, "ambiguous call to {} ({} candidates)", name, candidates.len())
            }
            LookupError::Inaccessible(m) => write!(f, "{} is not accessible", m),
            LookupError::FinalFieldWrite(m) => write!(f, "{} writes a final field", m),
        }
    }
}

impl std::error::Error for LookupError {}

/// Misuse of the engine, never a problem in the checked program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InternalError {
    /// A result was queried while nodes were still unresolved.
    NotConverged { node: String },
    /// A node id that does not belong to this tree or has no result.
    Unresolved { node: String },
    /// A replacement target with no parent slot.
    DetachedNode { node: String },
}

impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InternalError::NotConverged { node } => {
                write!(f, "queried {} before inference converged", node)
            }
            InternalError::Unresolved { node } => write!(f, "{} has no inferred type", node),
            InternalError::DetachedNode { node } => {
                write!(f, "cannot replace {}: it has no parent", node)
            }
        }
    }
}

impl std::error::Error for InternalError {}

/// One node the driver could not resolve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnresolvedNode {
    pub description: String,
    pub span: Span,
    /// Descriptions of the enclosing nodes, nearest first.
    pub ancestors: Vec<String>,
}

/// The strict driver's failure: every node still deferred at the end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileFailure {
    pub unresolved: Vec<UnresolvedNode>,
}

impl fmt::Display for CompileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not infer typing for nodes:")?;
        for node in &self.unresolved {
            write!(f, "\n  {}", node.description)?;
            for ancestor in &node.ancestors {
                write!(f, "\n    in {}", ancestor)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for CompileFailure {}
