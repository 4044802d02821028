//! Type representation for the Garnet type system.
//!
//! A [`Ty`] is a small, clonable, equality-comparable handle. Class, array and
//! meta (static-side) types share one shape, [`TypeKey`], interned by the
//! [`TypeContext`](crate::context::TypeContext) so that every distinct
//! `(name, array, meta)` tuple is created once. Primitives, `void`, `null`,
//! the unreachable marker, the closure marker and the poison type are
//! distinguished variants rather than ordinary class types.

use std::fmt;
use std::rc::Rc;

/// A JVM primitive type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Prim {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl Prim {
    pub const ALL: [Prim; 8] = [
        Prim::Boolean,
        Prim::Byte,
        Prim::Short,
        Prim::Char,
        Prim::Int,
        Prim::Long,
        Prim::Float,
        Prim::Double,
    ];

    pub const NUMERIC: [Prim; 7] = [
        Prim::Byte,
        Prim::Short,
        Prim::Char,
        Prim::Int,
        Prim::Long,
        Prim::Float,
        Prim::Double,
    ];

    /// Look up a primitive by its source-level name.
    pub fn from_name(name: &str) -> Option<Prim> {
        Some(match name {
            "boolean" => Prim::Boolean,
            "byte" => Prim::Byte,
            "short" => Prim::Short,
            "char" => Prim::Char,
            "int" => Prim::Int,
            "long" => Prim::Long,
            "float" => Prim::Float,
            "double" => Prim::Double,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Prim::Boolean => "boolean",
            Prim::Byte => "byte",
            Prim::Short => "short",
            Prim::Char => "char",
            Prim::Int => "int",
            Prim::Long => "long",
            Prim::Float => "float",
            Prim::Double => "double",
        }
    }

    pub fn is_numeric(self) -> bool {
        self != Prim::Boolean
    }

    pub fn is_integral(self) -> bool {
        matches!(self, Prim::Byte | Prim::Short | Prim::Char | Prim::Int | Prim::Long)
    }

    /// Whether a value of this type converts to `target` by a widening
    /// primitive conversion (or identity).
    ///
    /// The order is `byte -> short -> int -> long -> float -> double` with
    /// `char -> int`; `byte`/`short` and `char` never convert into each other,
    /// and nothing ever narrows.
    pub fn widens_to(self, target: Prim) -> bool {
        use Prim::*;
        if self == target {
            return true;
        }
        match self {
            Byte => matches!(target, Short | Int | Long | Float | Double),
            Short | Char => matches!(target, Int | Long | Float | Double),
            Int => matches!(target, Long | Float | Double),
            Long => matches!(target, Float | Double),
            Float => target == Double,
            Double | Boolean => false,
        }
    }

    /// Binary numeric promotion: the type an arithmetic operator on `self`
    /// and `other` computes in. `None` if either side is not numeric.
    pub fn promote(self, other: Prim) -> Option<Prim> {
        use Prim::*;
        if !self.is_numeric() || !other.is_numeric() {
            return None;
        }
        Some(if self == Double || other == Double {
            Double
        } else if self == Float || other == Float {
            Float
        } else if self == Long || other == Long {
            Long
        } else {
            Int
        })
    }
}

/// Identity of a class, array, or meta type: a fully-qualified name plus the
/// array and meta flags. Two keys are the same type iff all three match.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey {
    pub name: String,
    pub array: bool,
    pub meta: bool,
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.array {
            write!(f, "[]")?;
        }
        if self.meta {
            write!(f, ".class")?;
        }
        Ok(())
    }
}

/// Why a node never completes normally.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ControlFlow {
    Raise,
    Return,
    Break,
    Next,
    Redo,
}

/// The poison type. Carries the messages of the failure that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ErrorTy(Rc<[String]>);

impl ErrorTy {
    pub fn messages(&self) -> &[String] {
        &self.0
    }
}

/// A Garnet type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    /// A primitive (`int`, `double`, ...). Never an array or meta type.
    Prim(Prim),
    /// A class, interface, array, or meta type.
    Ref(Rc<TypeKey>),
    /// No value (`void`).
    Void,
    /// The type of the `nil` literal.
    Null,
    /// The type of control transfers (`raise`, `return`, `break`, ...).
    /// Absorbed by any other type when branches are joined.
    Unreachable(ControlFlow),
    /// The type of a closure literal passed as a block argument.
    Block,
    /// Resolved-but-invalid. Matches anything so one failure does not cascade.
    Error(ErrorTy),
}

impl Ty {
    pub fn int() -> Ty {
        Ty::Prim(Prim::Int)
    }

    pub fn long() -> Ty {
        Ty::Prim(Prim::Long)
    }

    pub fn double() -> Ty {
        Ty::Prim(Prim::Double)
    }

    pub fn boolean() -> Ty {
        Ty::Prim(Prim::Boolean)
    }

    /// Create a poison type with a single message.
    pub fn error(message: impl Into<String>) -> Ty {
        Ty::Error(ErrorTy(Rc::from(vec![message.into()])))
    }

    /// Create a poison type carrying several messages.
    pub fn error_with(messages: Vec<String>) -> Ty {
        Ty::Error(ErrorTy(Rc::from(messages)))
    }

    pub(crate) fn from_key(key: Rc<TypeKey>) -> Ty {
        Ty::Ref(key)
    }

    pub fn key(&self) -> Option<&TypeKey> {
        match self {
            Ty::Ref(key) => Some(key),
            _ => None,
        }
    }

    /// The class name behind this type, ignoring array/meta flags.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Ty::Ref(key) => Some(&key.name),
            Ty::Prim(p) => Some(p.name()),
            _ => None,
        }
    }

    pub fn as_prim(&self) -> Option<Prim> {
        match self {
            Ty::Prim(p) => Some(*p),
            _ => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Ty::Prim(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Ty::Ref(key) if key.array)
    }

    pub fn is_meta(&self) -> bool {
        matches!(self, Ty::Ref(key) if key.meta)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Ty::Error(_))
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, Ty::Unreachable(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Ty::Void)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Ty::Null)
    }

    /// Whether values of this type are object references.
    pub fn is_reference(&self) -> bool {
        matches!(self, Ty::Ref(_) | Ty::Null | Ty::Block)
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Prim(p) => write!(f, "{}", p.name()),
            Ty::Ref(key) => write!(f, "{}", key),
            Ty::Void => write!(f, "void"),
            Ty::Null => write!(f, "null"),
            Ty::Unreachable(_) => write!(f, "<unreachable>"),
            Ty::Block => write!(f, "<block>"),
            Ty::Error(_) => write!(f, "<error>"),
        }
    }
}

/// Render a parameter list as `a, b, c`.
pub fn format_params(params: &[Ty]) -> String {
    params
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_is_one_directional() {
        assert!(Prim::Byte.widens_to(Prim::Short));
        assert!(Prim::Short.widens_to(Prim::Int));
        assert!(Prim::Char.widens_to(Prim::Int));
        assert!(Prim::Int.widens_to(Prim::Long));
        assert!(Prim::Long.widens_to(Prim::Float));
        assert!(Prim::Float.widens_to(Prim::Double));
        assert!(!Prim::Int.widens_to(Prim::Short));
        assert!(!Prim::Double.widens_to(Prim::Float));
    }

    #[test]
    fn byte_and_short_are_incomparable_to_char() {
        assert!(!Prim::Byte.widens_to(Prim::Char));
        assert!(!Prim::Short.widens_to(Prim::Char));
        assert!(!Prim::Char.widens_to(Prim::Short));
        assert!(!Prim::Char.widens_to(Prim::Byte));
    }

    #[test]
    fn boolean_converts_to_nothing_else() {
        for p in Prim::NUMERIC {
            assert!(!Prim::Boolean.widens_to(p));
            assert!(!p.widens_to(Prim::Boolean));
        }
    }

    #[test]
    fn promotion_picks_the_wider_operand() {
        assert_eq!(Prim::Byte.promote(Prim::Short), Some(Prim::Int));
        assert_eq!(Prim::Int.promote(Prim::Long), Some(Prim::Long));
        assert_eq!(Prim::Long.promote(Prim::Float), Some(Prim::Float));
        assert_eq!(Prim::Char.promote(Prim::Double), Some(Prim::Double));
        assert_eq!(Prim::Boolean.promote(Prim::Int), None);
    }

    #[test]
    fn display() {
        let key = TypeKey { name: "java.lang.String".into(), array: true, meta: false };
        assert_eq!(Ty::from_key(Rc::new(key)).to_string(), "java.lang.String[]");
        let meta = TypeKey { name: "Foo".into(), array: false, meta: true };
        assert_eq!(Ty::from_key(Rc::new(meta)).to_string(), "Foo.class");
        assert_eq!(Ty::double().to_string(), "double");
        assert_eq!(Ty::error("x").to_string(), "<error>");
    }

    #[test]
    fn error_types_keep_their_messages() {
        let err = Ty::error_with(vec!["a".into(), "b".into()]);
        match err {
            Ty::Error(e) => assert_eq!(e.messages(), ["a".to_string(), "b".to_string()]),
            _ => unreachable!(),
        }
    }
}
