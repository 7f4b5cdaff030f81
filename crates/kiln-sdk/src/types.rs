//! Type identifiers
//!
//! Classes are identified by a [`ClassId`] handed out by the
//! [`ClassRegistry`](crate::ClassRegistry). The built-in core classes occupy
//! fixed ids so that values can name their runtime class without a registry.
//!
//! Primitive types only appear in declarations (formal parameters, field
//! types). At runtime every primitive value reports its boxed class, which is
//! why [`Type::normalized`] collapses a primitive onto its boxed representative.

use std::fmt;

/// Stable identifier of a registered class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    /// Root of the class hierarchy
    pub const OBJECT: Self = Self(0);
    /// Abstract superclass of the numeric boxes
    pub const NUMBER: Self = Self(1);
    /// Boxed `boolean`
    pub const BOOLEAN: Self = Self(2);
    /// Boxed `char`
    pub const CHARACTER: Self = Self(3);
    /// Boxed `byte`
    pub const BYTE: Self = Self(4);
    /// Boxed `short`
    pub const SHORT: Self = Self(5);
    /// Boxed `int`
    pub const INTEGER: Self = Self(6);
    /// Boxed `long`
    pub const LONG: Self = Self(7);
    /// Boxed `float`
    pub const FLOAT: Self = Self(8);
    /// Boxed `double`
    pub const DOUBLE: Self = Self(9);
    /// Readable character sequence interface
    pub const CHAR_SEQUENCE: Self = Self(10);
    /// Ordering interface
    pub const COMPARABLE: Self = Self(11);
    /// Immutable string
    pub const STRING: Self = Self(12);
    /// Iterable interface
    pub const ITERABLE: Self = Self(13);
    /// Collection interface
    pub const COLLECTION: Self = Self(14);
    /// Ordered, index-addressable container interface
    pub const LIST: Self = Self(15);
    /// Keyed container interface
    pub const MAP: Self = Self(16);
    /// Built-in growable list
    pub const ARRAY_LIST: Self = Self(17);
    /// Built-in hash map
    pub const HASH_MAP: Self = Self(18);

    /// Number of ids reserved for the core classes
    pub(crate) const BUILTIN_COUNT: u32 = 19;

    /// Create from a raw id
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw id
    pub const fn raw(self) -> u32 {
        self.0
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }

    /// Whether this id belongs to one of the core classes
    pub const fn is_builtin(self) -> bool {
        self.0 < Self::BUILTIN_COUNT
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Primitive (unboxed) types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// `boolean`
    Boolean,
    /// `char`
    Char,
    /// `byte`
    Byte,
    /// `short`
    Short,
    /// `int`
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
}

impl Primitive {
    /// All primitive types
    pub const ALL: [Primitive; 8] = [
        Primitive::Boolean,
        Primitive::Char,
        Primitive::Byte,
        Primitive::Short,
        Primitive::Int,
        Primitive::Long,
        Primitive::Float,
        Primitive::Double,
    ];

    /// The boxed representative class of this primitive
    pub const fn boxed(self) -> ClassId {
        match self {
            Primitive::Boolean => ClassId::BOOLEAN,
            Primitive::Char => ClassId::CHARACTER,
            Primitive::Byte => ClassId::BYTE,
            Primitive::Short => ClassId::SHORT,
            Primitive::Int => ClassId::INTEGER,
            Primitive::Long => ClassId::LONG,
            Primitive::Float => ClassId::FLOAT,
            Primitive::Double => ClassId::DOUBLE,
        }
    }

    /// The primitive boxed by a class, if any
    pub const fn from_boxed(class: ClassId) -> Option<Primitive> {
        match class {
            ClassId::BOOLEAN => Some(Primitive::Boolean),
            ClassId::CHARACTER => Some(Primitive::Char),
            ClassId::BYTE => Some(Primitive::Byte),
            ClassId::SHORT => Some(Primitive::Short),
            ClassId::INTEGER => Some(Primitive::Int),
            ClassId::LONG => Some(Primitive::Long),
            ClassId::FLOAT => Some(Primitive::Float),
            ClassId::DOUBLE => Some(Primitive::Double),
            _ => None,
        }
    }

    /// Source-level name
    pub const fn name(self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Char => "char",
            Primitive::Byte => "byte",
            Primitive::Short => "short",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
        }
    }

    /// Whether this is a numeric type (`char` excluded)
    pub const fn is_numeric(self) -> bool {
        !matches!(self, Primitive::Boolean | Primitive::Char)
    }

    // Position on the widening ladder byte < short < int < long < float < double.
    // `char` sits beside `short`: both widen to `int` but not to each other.
    const fn rank(self) -> u32 {
        match self {
            Primitive::Boolean => 0,
            Primitive::Byte => 0,
            Primitive::Short | Primitive::Char => 1,
            Primitive::Int => 2,
            Primitive::Long => 3,
            Primitive::Float => 4,
            Primitive::Double => 5,
        }
    }

    /// Number of widening steps needed to convert `self` to `to`.
    ///
    /// Returns `Some(0)` for identity and `None` when no widening primitive
    /// conversion exists.
    pub fn widening_distance(self, to: Primitive) -> Option<u32> {
        if self == to {
            return Some(0);
        }
        let allowed = match (self, to) {
            (Primitive::Boolean, _) | (_, Primitive::Boolean) => false,
            (_, Primitive::Char) | (_, Primitive::Byte) => false,
            (Primitive::Char, Primitive::Short) => false,
            (Primitive::Byte, Primitive::Short) => true,
            _ => to.rank() > self.rank(),
        };
        if allowed {
            Some(to.rank() - self.rank())
        } else {
            None
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A declared or runtime type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// Unboxed primitive (declarations only)
    Primitive(Primitive),
    /// Registered class, interface or array class
    Class(ClassId),
    /// Type of a `null` argument at a call site
    Null,
}

impl Type {
    /// `boolean`
    pub const BOOLEAN: Type = Type::Primitive(Primitive::Boolean);
    /// `char`
    pub const CHAR: Type = Type::Primitive(Primitive::Char);
    /// `byte`
    pub const BYTE: Type = Type::Primitive(Primitive::Byte);
    /// `short`
    pub const SHORT: Type = Type::Primitive(Primitive::Short);
    /// `int`
    pub const INT: Type = Type::Primitive(Primitive::Int);
    /// `long`
    pub const LONG: Type = Type::Primitive(Primitive::Long);
    /// `float`
    pub const FLOAT: Type = Type::Primitive(Primitive::Float);
    /// `double`
    pub const DOUBLE: Type = Type::Primitive(Primitive::Double);
    /// `Object`
    pub const OBJECT: Type = Type::Class(ClassId::OBJECT);
    /// `String`
    pub const STRING: Type = Type::Class(ClassId::STRING);
    /// Return type of methods that produce nothing
    pub const VOID: Type = Type::Null;

    /// Class type
    pub const fn class(id: ClassId) -> Self {
        Type::Class(id)
    }

    /// Collapse a primitive onto its boxed representative; other types are unchanged
    pub const fn normalized(self) -> Type {
        match self {
            Type::Primitive(p) => Type::Class(p.boxed()),
            other => other,
        }
    }

    /// Whether this is an unboxed primitive
    pub const fn is_primitive(&self) -> bool {
        matches!(self, Type::Primitive(_))
    }

    /// The class id after normalization (`None` for [`Type::Null`])
    pub const fn as_class(&self) -> Option<ClassId> {
        match self.normalized() {
            Type::Class(id) => Some(id),
            _ => None,
        }
    }

    /// The primitive kind of a primitive or boxed type
    pub const fn primitive_kind(&self) -> Option<Primitive> {
        match *self {
            Type::Primitive(p) => Some(p),
            Type::Class(id) => Primitive::from_boxed(id),
            Type::Null => None,
        }
    }

    /// Whether values of this type are booleans (primitive or boxed)
    pub const fn is_boolean(&self) -> bool {
        matches!(self.primitive_kind(), Some(Primitive::Boolean))
    }
}

impl From<Primitive> for Type {
    fn from(p: Primitive) -> Self {
        Type::Primitive(p)
    }
}

impl From<ClassId> for Type {
    fn from(id: ClassId) -> Self {
        Type::Class(id)
    }
}

/// Modifier flags for class members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// Public visibility
    pub is_public: bool,
    /// Static member
    pub is_static: bool,
    /// Final (immutable) member
    pub is_final: bool,
    /// Enum constant field
    pub is_enum_constant: bool,
}

impl Modifiers {
    /// Public instance member
    pub const PUBLIC: Self = Self {
        is_public: true,
        is_static: false,
        is_final: false,
        is_enum_constant: false,
    };

    /// Non-public instance member
    pub const PRIVATE: Self = Self {
        is_public: false,
        is_static: false,
        is_final: false,
        is_enum_constant: false,
    };

    /// Same flags, marked static
    pub const fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Same flags, marked final
    pub const fn with_final(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Same flags, marked as an enum constant (implies static final)
    pub const fn with_enum_constant(mut self) -> Self {
        self.is_enum_constant = true;
        self.is_static = true;
        self.is_final = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boxing_is_total() {
        for p in Primitive::ALL {
            assert_eq!(Primitive::from_boxed(p.boxed()), Some(p));
            assert_eq!(Type::Primitive(p).normalized(), Type::Class(p.boxed()));
        }
        assert_eq!(Primitive::from_boxed(ClassId::STRING), None);
    }

    #[test]
    fn test_widening() {
        assert_eq!(Primitive::Int.widening_distance(Primitive::Int), Some(0));
        assert_eq!(Primitive::Int.widening_distance(Primitive::Long), Some(1));
        assert_eq!(Primitive::Int.widening_distance(Primitive::Double), Some(3));
        assert_eq!(Primitive::Byte.widening_distance(Primitive::Short), Some(1));
        assert_eq!(Primitive::Char.widening_distance(Primitive::Int), Some(1));

        assert_eq!(Primitive::Long.widening_distance(Primitive::Int), None);
        assert_eq!(Primitive::Char.widening_distance(Primitive::Short), None);
        assert_eq!(Primitive::Short.widening_distance(Primitive::Char), None);
        assert_eq!(Primitive::Byte.widening_distance(Primitive::Char), None);
        assert_eq!(Primitive::Boolean.widening_distance(Primitive::Int), None);
    }

    #[test]
    fn test_type_helpers() {
        assert!(Type::INT.is_primitive());
        assert!(!Type::STRING.is_primitive());
        assert_eq!(Type::INT.as_class(), Some(ClassId::INTEGER));
        assert_eq!(Type::Null.as_class(), None);
        assert!(Type::Class(ClassId::BOOLEAN).is_boolean());
        assert_eq!(Type::Class(ClassId::LONG).primitive_kind(), Some(Primitive::Long));
    }

    #[test]
    fn test_enum_constant_modifiers() {
        let m = Modifiers::PUBLIC.with_enum_constant();
        assert!(m.is_static && m.is_final && m.is_enum_constant);
    }
}
