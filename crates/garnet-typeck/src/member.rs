//! Resolved member descriptors.
//!
//! A [`Member`] is what overload resolution hands back for a call site: the
//! declaring type, the formal parameter types, the return type and enough
//! flags for the code generator to pick the right invocation form.

use std::fmt;

use serde::Serialize;

use crate::ty::{format_params, Ty};

/// Access level of a method, field or macro.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Package,
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Package => "package",
            Visibility::Private => "private",
        };
        write!(f, "{}", s)
    }
}

/// What kind of member a call site resolved to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Method,
    StaticMethod,
    Constructor,
    FieldRead,
    FieldWrite,
    StaticFieldRead,
    StaticFieldWrite,
    Macro,
    InnerClass,
}

impl MemberKind {
    pub fn is_static(self) -> bool {
        matches!(
            self,
            MemberKind::StaticMethod
                | MemberKind::StaticFieldRead
                | MemberKind::StaticFieldWrite
                | MemberKind::InnerClass
        )
    }

    pub fn is_field_access(self) -> bool {
        matches!(
            self,
            MemberKind::FieldRead
                | MemberKind::FieldWrite
                | MemberKind::StaticFieldRead
                | MemberKind::StaticFieldWrite
        )
    }
}

/// A resolved method, constructor, field accessor, macro or inner class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    pub declaring: Ty,
    pub name: String,
    pub params: Vec<Ty>,
    pub ret: Ty,
    pub kind: MemberKind,
    pub visibility: Visibility,
    pub is_abstract: bool,
    /// The last parameter is an array that may be passed element-wise.
    pub varargs: bool,
    pub throws: Vec<Ty>,
}

impl Member {
    pub fn new(declaring: Ty, name: impl Into<String>, params: Vec<Ty>, ret: Ty, kind: MemberKind) -> Self {
        Member {
            declaring,
            name: name.into(),
            params,
            ret,
            kind,
            visibility: Visibility::Public,
            is_abstract: false,
            varargs: false,
            throws: Vec::new(),
        }
    }

    /// `name(p1, p2)`.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, format_params(&self.params))
    }

    pub fn is_static(&self) -> bool {
        self.kind.is_static()
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring, self.signature())
    }
}

/// Serializable view of a [`Member`] for tooling output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MemberDescriptor {
    pub declaring: String,
    pub name: String,
    pub params: Vec<String>,
    pub ret: String,
    pub kind: MemberKind,
    pub visibility: Visibility,
    pub varargs: bool,
}

impl From<&Member> for MemberDescriptor {
    fn from(m: &Member) -> Self {
        MemberDescriptor {
            declaring: m.declaring.to_string(),
            name: m.name.clone(),
            params: m.params.iter().map(|p| p.to_string()).collect(),
            ret: m.ret.to_string(),
            kind: m.kind,
            visibility: m.visibility,
            varargs: m.varargs,
        }
    }
}
